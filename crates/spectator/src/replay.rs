//! Pre-recorded classifier output, served one frame per read.
//!
//! The file is a JSON array. Each entry is either a frame (64 arrays of 13
//! probabilities, capture order) or `{"failure": "..."}` for a capture that
//! failed upstream.

use std::collections::VecDeque;
use std::path::Path;

use chess_vision::{BoardState, FrameProbabilities, Orientation, SquareProbabilities, VisionError};
use serde::Deserialize;

use crate::collaborators::BoardReader;
use crate::error::{FrameError, SpectatorError};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RecordedFrame {
    Probabilities(FrameProbabilities),
    Failure { failure: String },
}

#[derive(Debug, Default)]
pub struct ReplayReader {
    frames: VecDeque<RecordedFrame>,
}

impl ReplayReader {
    pub fn new(frames: impl IntoIterator<Item = RecordedFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SpectatorError> {
        let frames: Vec<RecordedFrame> = serde_json::from_str(json)?;
        Ok(Self::new(frames))
    }

    pub async fn load(path: &Path) -> Result<Self, SpectatorError> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl BoardReader for ReplayReader {
    async fn read_board(&mut self) -> Result<FrameProbabilities, FrameError> {
        match self.frames.pop_front() {
            Some(RecordedFrame::Probabilities(frame)) => Ok(frame),
            Some(RecordedFrame::Failure { failure }) => Err(FrameError::Capture(failure)),
            None => Err(FrameError::Exhausted),
        }
    }
}

/// A frame whose most likely label on every square matches `board_fen`,
/// with `confidence` on that label and the rest spread evenly.
pub fn synthetic_frame(
    board_fen: &str,
    orientation: Orientation,
    confidence: f32,
) -> Result<FrameProbabilities, VisionError> {
    let state: BoardState = board_fen.parse()?;
    let squares = orientation
        .squares()
        .map(|square| SquareProbabilities::peaked(state.piece_at(square), confidence))
        .collect();
    FrameProbabilities::new(squares)
}
