//! Core error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VisionError {
    #[error("Expected {expected} square distributions, got {actual}")]
    FrameSize { expected: usize, actual: usize },

    #[error("Square {index} holds a non-finite probability")]
    NonFinite { index: usize },

    #[error("Invalid board FEN '{fen}': {reason}")]
    BoardFen { fen: String, reason: String },

    #[error("Invalid FEN '{0}'")]
    Fen(String),

    #[error("Position rejected by rules engine: {0}")]
    Position(String),

    #[error("Unknown a1 position '{0}' (expected BL, BR, TL or TR)")]
    Orientation(String),
}
