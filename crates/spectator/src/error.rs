//! Session error types

use chess_vision::VisionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpectatorError {
    #[error("Configuration error: {0}")]
    Config(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    InvalidSetting { name: &'static str, value: String },

    #[error("Starting position error: {0}")]
    StartingPosition(String),

    #[error("Stockfish error: {0}")]
    Stockfish(String),

    #[error("PGN error: {0}")]
    Pgn(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Vision error: {0}")]
    Vision(#[from] VisionError),
}

/// Why one frame could not be evaluated. Never fatal to the session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("capture failed: {0}")]
    Capture(String),

    #[error("board corners not found")]
    BoardNotFound,

    #[error("classifier failed: {0}")]
    Classifier(String),

    #[error("no more recorded frames")]
    Exhausted,

    #[error("malformed frame: {0}")]
    Malformed(String),
}

impl From<VisionError> for FrameError {
    fn from(err: VisionError) -> Self {
        FrameError::Malformed(err.to_string())
    }
}
