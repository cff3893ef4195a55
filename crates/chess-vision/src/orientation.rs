//! Which corner of the rectified image holds a1.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use shakmaty::{File, Rank, Square};

use crate::error::VisionError;
use crate::probabilities::NUM_SQUARES;

/// Corner of the captured image that corresponds to a1.
///
/// All four are rotations of the same physical board, so each maps the
/// classifier's row-major index (row 0 = top of image) onto a distinct
/// permutation of the 64 squares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Orientation {
    /// White plays from the bottom of the image.
    #[default]
    BottomLeft,
    /// Board turned a quarter counter-clockwise: the a-file runs along the bottom edge.
    BottomRight,
    /// Board turned a quarter clockwise: the a-file runs along the top edge.
    TopLeft,
    /// Black plays from the bottom of the image.
    TopRight,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::BottomLeft,
        Orientation::BottomRight,
        Orientation::TopLeft,
        Orientation::TopRight,
    ];

    /// Square shown at capture index `index`, `None` past the last square.
    pub fn square_at(self, index: usize) -> Option<Square> {
        (index < NUM_SQUARES).then(|| self.locate(index))
    }

    /// Every square in capture order.
    pub fn squares(self) -> impl Iterator<Item = Square> {
        (0..NUM_SQUARES).map(move |index| self.locate(index))
    }

    fn locate(self, index: usize) -> Square {
        let row = (index / 8) as u32;
        let col = (index % 8) as u32;
        let (file, rank) = match self {
            Orientation::BottomLeft => (col, 7 - row),
            Orientation::BottomRight => (7 - row, 7 - col),
            Orientation::TopLeft => (row, col),
            Orientation::TopRight => (7 - col, row),
        };
        Square::from_coords(File::new(file), Rank::new(rank))
    }

    /// Inverse of [`Orientation::square_at`].
    pub fn index_of(self, square: Square) -> usize {
        let file = square.file() as usize;
        let rank = square.rank() as usize;
        let (row, col) = match self {
            Orientation::BottomLeft => (7 - rank, file),
            Orientation::BottomRight => (7 - file, 7 - rank),
            Orientation::TopLeft => (file, rank),
            Orientation::TopRight => (rank, 7 - file),
        };
        row * 8 + col
    }

    pub fn code(self) -> &'static str {
        match self {
            Orientation::BottomLeft => "BL",
            Orientation::BottomRight => "BR",
            Orientation::TopLeft => "TL",
            Orientation::TopRight => "TR",
        }
    }
}

impl FromStr for Orientation {
    type Err = VisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BL" => Ok(Orientation::BottomLeft),
            "BR" => Ok(Orientation::BottomRight),
            "TL" => Ok(Orientation::TopLeft),
            "TR" => Ok(Orientation::TopRight),
            _ => Err(VisionError::Orientation(s.to_string())),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
