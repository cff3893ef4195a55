//! Board-state decision core.
//!
//! Turns 64 independent per-square piece probabilities into one committed
//! board position and, given the previous position, the single move that
//! connects the two. shakmaty is the rules engine throughout.

pub mod board_state;
pub mod decoder;
pub mod disambiguator;
pub mod error;
pub mod orientation;
pub mod piece_class;
pub mod probabilities;
pub mod validator;

pub use board_state::BoardState;
pub use decoder::decode;
pub use disambiguator::{DetectedMove, Disambiguator, Inference, DEFAULT_MIN_MOVE_GAIN};
pub use error::VisionError;
pub use orientation::Orientation;
pub use piece_class::PieceClass;
pub use probabilities::{FrameProbabilities, SquareProbabilities, NUM_CLASSES, NUM_SQUARES};
pub use validator::{is_physically_valid, validate, InvalidBoard};
