//! Board, markers and winning lines

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DuetError, GameResult};

/// A marker placed on the board. `X` always opens a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marker {
    X,
    O,
}

impl Marker {
    pub fn other(self) -> Marker {
        match self {
            Marker::X => Marker::O,
            Marker::O => Marker::X,
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::X => write!(f, "X"),
            Marker::O => write!(f, "O"),
        }
    }
}

/// One of the nine cells, row-major
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Square {
    TopLeft,
    TopMid,
    TopRight,
    MidLeft,
    MidMid,
    MidRight,
    BottomLeft,
    BottomMid,
    BottomRight,
}

impl Square {
    pub const ALL: [Square; 9] = [
        Square::TopLeft,
        Square::TopMid,
        Square::TopRight,
        Square::MidLeft,
        Square::MidMid,
        Square::MidRight,
        Square::BottomLeft,
        Square::BottomMid,
        Square::BottomRight,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<usize> for Square {
    type Error = DuetError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Square::ALL.get(index).copied().ok_or_else(|| DuetError::Validation {
            message: format!("Cell index {} is outside 0..=8", index),
            field: Some("cell".to_string()),
        })
    }
}

/// Cell triples that win the game, checked in this order
pub const WINNING_LINES: [[usize; 3]; 8] = [
    // Rows
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    // Columns
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    // Diagonals
    [0, 4, 8],
    [2, 4, 6],
];

/// Nine cells, each empty or holding a marker.
///
/// Serialized as a JSON array of `null`, `"x"` or `"o"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board([Option<Marker>; 9]);

impl Board {
    /// An all-empty board
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cells(cells: [Option<Marker>; 9]) -> Self {
        Self(cells)
    }

    pub fn cells(&self) -> &[Option<Marker>; 9] {
        &self.0
    }

    pub fn get(&self, square: Square) -> Option<Marker> {
        self.0[square.index()]
    }

    pub fn is_empty_at(&self, square: Square) -> bool {
        self.get(square).is_none()
    }

    /// Place a marker on an empty cell. Occupied cells are never overwritten.
    pub fn place(&mut self, square: Square, marker: Marker) -> GameResult<()> {
        if !self.is_empty_at(square) {
            return Err(DuetError::Validation {
                message: format!("Cell {:?} is already taken", square),
                field: Some("cell".to_string()),
            });
        }
        self.0[square.index()] = Some(marker);
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.0.iter().all(Option::is_some)
    }

    pub fn empty_squares(&self) -> impl Iterator<Item = Square> + '_ {
        Square::ALL.into_iter().filter(|square| self.is_empty_at(*square))
    }

    pub fn count(&self, marker: Marker) -> usize {
        self.0.iter().filter(|cell| **cell == Some(marker)).count()
    }

    /// Marker owning the first complete line, X before O within a line
    pub fn line_owner(&self) -> Option<Marker> {
        for line in WINNING_LINES {
            let cells = line.map(|i| self.0[i]);
            for marker in [Marker::X, Marker::O] {
                if cells.iter().all(|cell| *cell == Some(marker)) {
                    return Some(marker);
                }
            }
        }
        None
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, cells) in self.0.chunks(3).enumerate() {
            if row > 0 {
                writeln!(f, "---+---+---")?;
            }
            let rendered: Vec<String> = cells
                .iter()
                .enumerate()
                .map(|(col, cell)| match cell {
                    Some(marker) => format!(" {} ", marker),
                    None => format!(" {} ", row * 3 + col),
                })
                .collect();
            writeln!(f, "{}", rendered.join("|"))?;
        }
        Ok(())
    }
}
