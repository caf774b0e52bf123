//! Read-only projection of the game state for presentation

use crate::game::{Board, GameState, Marker, ParticipantId, Square, Winner};

/// What the viewer should be told about the game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    YourTurn,
    OpponentsTurn,
    Won,
    Lost,
    Tie,
    /// Viewer is not one of the two players
    Observing,
}

/// Snapshot handed to the presentation layer after every state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameView {
    pub board: Board,
    pub winner: Winner,
    pub whose_turn: ParticipantId,
    pub your_marker: Option<Marker>,
    pub status: Status,
    enabled: [bool; 9],
}

impl GameView {
    pub fn project(state: &GameState, viewer: &ParticipantId) -> Self {
        let your_marker = state.marker_of(viewer);
        let status = match (&state.winner, your_marker) {
            (_, None) => Status::Observing,
            (Winner::Tie, _) => Status::Tie,
            (Winner::Player(winner), _) if winner == viewer => Status::Won,
            (Winner::Player(_), _) => Status::Lost,
            (Winner::None, _) if state.whose_turn == *viewer => Status::YourTurn,
            (Winner::None, _) => Status::OpponentsTurn,
        };

        let mut enabled = [false; 9];
        if status == Status::YourTurn {
            for square in state.board.empty_squares() {
                enabled[square.index()] = true;
            }
        }

        Self {
            board: state.board,
            winner: state.winner.clone(),
            whose_turn: state.whose_turn.clone(),
            your_marker,
            status,
            enabled,
        }
    }

    /// Whether a tap on `square` would be accepted
    pub fn is_enabled(&self, square: Square) -> bool {
        self.enabled[square.index()]
    }

    pub fn is_finished(&self) -> bool {
        !self.winner.is_none()
    }
}
