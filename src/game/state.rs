//! The replicated game state and its pure transitions

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DuetError, GameResult};
use super::board::{Board, Marker, Square};
use super::participant::ParticipantId;

/// Result of a game instance.
///
/// On the wire: `null` while in progress, `"tie"`, or the winner's identifier.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Winner {
    #[default]
    None,
    Tie,
    Player(ParticipantId),
}

impl Winner {
    pub fn is_none(&self) -> bool {
        matches!(self, Winner::None)
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Winner::None => write!(f, "none"),
            Winner::Tie => write!(f, "tie"),
            Winner::Player(id) => write!(f, "{}", id),
        }
    }
}

impl Serialize for Winner {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Winner::None => serializer.serialize_none(),
            Winner::Tie => serializer.serialize_str("tie"),
            Winner::Player(id) => serializer.serialize_str(id.as_str()),
        }
    }
}

impl<'de> Deserialize<'de> for Winner {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(Winner::None),
            Some(value) if value == "tie" => Ok(Winner::Tie),
            Some(value) => ParticipantId::new(value)
                .map(Winner::Player)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Logical lifecycle state of one replica
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No game; waiting for an opponent
    Idle,
    InProgress,
    Finished,
}

/// Why a requested move was not applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveRejection {
    NoGame,
    OutOfRange(usize),
    SquareOccupied(Square),
    GameFinished,
    NotYourTurn,
    NotAPlayer,
}

impl fmt::Display for MoveRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveRejection::NoGame => write!(f, "no game in progress"),
            MoveRejection::OutOfRange(index) => write!(f, "cell {} is off the board", index),
            MoveRejection::SquareOccupied(square) => write!(f, "{:?} is already taken", square),
            MoveRejection::GameFinished => write!(f, "game already finished"),
            MoveRejection::NotYourTurn => write!(f, "not your turn"),
            MoveRejection::NotAPlayer => write!(f, "not a player in this game"),
        }
    }
}

/// Terminal condition for a board under the given marker assignment
pub fn evaluate(board: &Board, using_x: &ParticipantId, using_o: &ParticipantId) -> Winner {
    match board.line_owner() {
        Some(Marker::X) => Winner::Player(using_x.clone()),
        Some(Marker::O) => Winner::Player(using_o.clone()),
        None if board.is_full() => Winner::Tie,
        None => Winner::None,
    }
}

/// Game state shared over the channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub using_x: ParticipantId,
    pub using_o: ParticipantId,
    pub whose_turn: ParticipantId,
    pub board: Board,
    pub winner: Winner,
}

impl GameState {
    /// Fresh game with an empty board; the X holder opens
    pub fn new(using_x: ParticipantId, using_o: ParticipantId) -> GameResult<Self> {
        if using_x == using_o {
            return Err(DuetError::Validation {
                message: format!("Both markers assigned to {}", using_x),
                field: Some("usingX".to_string()),
            });
        }
        Ok(Self {
            whose_turn: using_x.clone(),
            using_x,
            using_o,
            board: Board::new(),
            winner: Winner::None,
        })
    }

    /// Assign markers uniformly at random between the two participants
    pub fn originate<R: Rng + ?Sized>(
        self_id: &ParticipantId,
        opponent: &ParticipantId,
        rng: &mut R,
    ) -> GameResult<Self> {
        if rng.gen_bool(0.5) {
            Self::new(opponent.clone(), self_id.clone())
        } else {
            Self::new(self_id.clone(), opponent.clone())
        }
    }

    pub fn phase(&self) -> Phase {
        if self.winner.is_none() {
            Phase::InProgress
        } else {
            Phase::Finished
        }
    }

    pub fn is_finished(&self) -> bool {
        !self.winner.is_none()
    }

    pub fn marker_of(&self, participant: &ParticipantId) -> Option<Marker> {
        if *participant == self.using_x {
            Some(Marker::X)
        } else if *participant == self.using_o {
            Some(Marker::O)
        } else {
            None
        }
    }

    pub fn holder_of(&self, marker: Marker) -> &ParticipantId {
        match marker {
            Marker::X => &self.using_x,
            Marker::O => &self.using_o,
        }
    }

    pub fn opponent_of(&self, participant: &ParticipantId) -> Option<&ParticipantId> {
        self.marker_of(participant).map(|marker| self.holder_of(marker.other()))
    }

    /// Recompute the winner from the board
    pub fn evaluate(&self) -> Winner {
        evaluate(&self.board, &self.using_x, &self.using_o)
    }

    /// Successor state after `player` marks `square`.
    ///
    /// Leaves `self` untouched; the caller adopts the returned state.
    pub fn apply_move(&self, player: &ParticipantId, square: Square) -> Result<GameState, MoveRejection> {
        let marker = self.marker_of(player).ok_or(MoveRejection::NotAPlayer)?;
        if self.is_finished() {
            return Err(MoveRejection::GameFinished);
        }
        if self.whose_turn != *player {
            return Err(MoveRejection::NotYourTurn);
        }

        let mut next = self.clone();
        next.board
            .place(square, marker)
            .map_err(|_| MoveRejection::SquareOccupied(square))?;
        next.whose_turn = self.holder_of(marker.other()).clone();
        next.winner = next.evaluate();
        Ok(next)
    }

    /// Check the structural invariants of a state
    pub fn validate(&self) -> GameResult<()> {
        if self.using_x == self.using_o {
            return Err(DuetError::Validation {
                message: "Both markers are held by the same participant".to_string(),
                field: Some("usingO".to_string()),
            });
        }

        if self.winner.is_none() && self.marker_of(&self.whose_turn).is_none() {
            return Err(DuetError::Validation {
                message: format!("{} is not playing in this game", self.whose_turn),
                field: Some("whoseTurn".to_string()),
            });
        }

        let x_count = self.board.count(Marker::X);
        let o_count = self.board.count(Marker::O);
        if x_count < o_count || x_count > o_count + 1 {
            return Err(DuetError::Validation {
                message: format!("Impossible marker counts: {} X and {} O", x_count, o_count),
                field: Some("board".to_string()),
            });
        }

        if self.winner != self.evaluate() {
            return Err(DuetError::Validation {
                message: format!("Winner {} does not match the board", self.winner),
                field: Some("winner".to_string()),
            });
        }

        Ok(())
    }
}
