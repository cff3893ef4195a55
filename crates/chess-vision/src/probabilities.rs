//! Classifier output: one distribution per captured square.

use serde::{Deserialize, Serialize};

use crate::error::VisionError;
use crate::piece_class::PieceClass;

pub const NUM_CLASSES: usize = 13;
pub const NUM_SQUARES: usize = 64;

/// Distribution over the 13 labels for a single square, laid out in
/// [`PieceClass`] order. Only relative ordering matters; values need not
/// sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SquareProbabilities([f32; NUM_CLASSES]);

impl SquareProbabilities {
    pub fn new(values: [f32; NUM_CLASSES]) -> Self {
        Self(values)
    }

    /// `confidence` on `class`, the rest spread evenly over the other labels.
    pub fn peaked(class: PieceClass, confidence: f32) -> Self {
        let rest = (1.0 - confidence) / (NUM_CLASSES - 1) as f32;
        let mut values = [rest; NUM_CLASSES];
        values[class.index()] = confidence;
        Self(values)
    }

    pub fn get(&self, class: PieceClass) -> f32 {
        self.0[class.index()]
    }

    pub fn values(&self) -> &[f32; NUM_CLASSES] {
        &self.0
    }

    /// Most probable label. Exact ties go to empty, then by role from pawn
    /// up to king, then white before black.
    pub fn most_likely(&self) -> PieceClass {
        let mut best = PieceClass::Empty;
        for class in PieceClass::ALL {
            let (value, best_value) = (self.get(class), self.get(best));
            if value > best_value || (value == best_value && class.tie_rank() < best.tie_rank()) {
                best = class;
            }
        }
        best
    }

    fn is_finite(&self) -> bool {
        self.0.iter().all(|value| value.is_finite())
    }
}

/// All 64 distributions of one captured frame, in the classifier's
/// row-major order (top-left of the rectified image first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SquareProbabilities>", into = "Vec<SquareProbabilities>")]
pub struct FrameProbabilities {
    squares: Vec<SquareProbabilities>,
}

impl FrameProbabilities {
    pub fn new(squares: Vec<SquareProbabilities>) -> Result<Self, VisionError> {
        if squares.len() != NUM_SQUARES {
            return Err(VisionError::FrameSize {
                expected: NUM_SQUARES,
                actual: squares.len(),
            });
        }
        if let Some(index) = squares.iter().position(|probs| !probs.is_finite()) {
            return Err(VisionError::NonFinite { index });
        }
        Ok(Self { squares })
    }

    /// Distribution of the square at `index` in capture order.
    pub fn square(&self, index: usize) -> &SquareProbabilities {
        &self.squares[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &SquareProbabilities> {
        self.squares.iter()
    }
}

impl TryFrom<Vec<SquareProbabilities>> for FrameProbabilities {
    type Error = VisionError;

    fn try_from(squares: Vec<SquareProbabilities>) -> Result<Self, Self::Error> {
        FrameProbabilities::new(squares)
    }
}

impl From<FrameProbabilities> for Vec<SquareProbabilities> {
    fn from(frame: FrameProbabilities) -> Self {
        frame.squares
    }
}
