use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ReplConfig {
    pub prompt: String,
    pub history_file: Option<String>,
    /// How long to wait for a replica to reflect a request before reporting it ignored
    pub settle_timeout: Duration,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            prompt: "duet-ttt> ".to_string(),
            history_file: Some(".duet_ttt_history".to_string()),
            settle_timeout: Duration::from_millis(250),
        }
    }
}
