//! Capabilities the session consumes and the directives it emits.
//!
//! Camera, corner detection, the neural classifier, and the LED/LCD/audio
//! hardware all live behind these traits. The session only ever sees a
//! complete frame of probabilities or a [`FrameError`].

use chess_vision::{FrameProbabilities, NUM_SQUARES};
use serde::{Deserialize, Serialize};
use shakmaty::{Chess, Color};
use tracing::info;

use crate::error::{FrameError, SpectatorError};

/// One rectified, cropped square image in capture order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquareCrop {
    pub width: u32,
    pub height: u32,
    /// Packed RGB rows.
    pub rgb: Vec<u8>,
}

/// Camera plus corner detection plus cropping.
#[allow(async_fn_in_trait)]
pub trait FrameSource {
    async fn capture(&mut self) -> Result<Vec<SquareCrop>, FrameError>;
}

/// Turns 64 crops into 64 distributions, or fails as a whole.
#[allow(async_fn_in_trait)]
pub trait PieceClassifier {
    async fn classify(&mut self, crops: &[SquareCrop]) -> Result<FrameProbabilities, FrameError>;
}

/// What the session polls once per cycle.
#[allow(async_fn_in_trait)]
pub trait BoardReader {
    async fn read_board(&mut self) -> Result<FrameProbabilities, FrameError>;
}

/// Capture a frame, then classify it.
pub struct ClassifiedCapture<S, C> {
    source: S,
    classifier: C,
}

impl<S, C> ClassifiedCapture<S, C> {
    pub fn new(source: S, classifier: C) -> Self {
        Self { source, classifier }
    }
}

impl<S: FrameSource, C: PieceClassifier> BoardReader for ClassifiedCapture<S, C> {
    async fn read_board(&mut self) -> Result<FrameProbabilities, FrameError> {
        let crops = self.source.capture().await?;
        if crops.len() != NUM_SQUARES {
            return Err(FrameError::Malformed(format!(
                "expected {NUM_SQUARES} square crops, got {}",
                crops.len()
            )));
        }
        self.classifier.classify(&crops).await
    }
}

/// Evaluator score, from the side to move's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Score {
    Cp(i32),
    /// Mate in N; negative when the side to move is being mated.
    Mate(i32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateLine {
    /// First move of the line, UCI.
    pub uci: String,
    pub score: Score,
}

/// Ranked candidate lines for a position, best first.
#[allow(async_fn_in_trait)]
pub trait PositionEvaluator {
    async fn evaluate(&mut self, position: &Chess) -> Result<Vec<CandidateLine>, SpectatorError>;

    /// Release the backend.
    async fn quit(&mut self);
}

/// `None` is a disabled evaluator: no lines, nothing to release.
impl<E: PositionEvaluator> PositionEvaluator for Option<E> {
    async fn evaluate(&mut self, position: &Chess) -> Result<Vec<CandidateLine>, SpectatorError> {
        match self {
            Some(evaluator) => evaluator.evaluate(position).await,
            None => Ok(Vec::new()),
        }
    }

    async fn quit(&mut self) {
        if let Some(evaluator) = self {
            evaluator.quit().await;
        }
    }
}

/// Render, audio, LED and LCD instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    ShowBoard {
        board_fen: String,
        /// UCI of the move that produced this board.
        last_move: Option<String>,
    },
    /// LCD text such as `12... Nf6`, plus the bare SAN for audio.
    AnnounceMove { text: String, san: String },
    /// Indicator lights, 0 (black winning) to 8 (white winning).
    SetLights(u8),
    CriticalMoment,
    Harry,
    Checkmate { winner: Color },
    Stalemate,
    /// Lights off, displays cleared.
    Shutdown,
}

pub trait SignalSink {
    fn emit(&mut self, directive: Directive);
}

/// Logs every directive; the default sink when no hardware is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl SignalSink for TracingSink {
    fn emit(&mut self, directive: Directive) {
        info!(?directive, "Directive");
    }
}

/// Collects directives in order.
impl SignalSink for Vec<Directive> {
    fn emit(&mut self, directive: Directive) {
        self.push(directive);
    }
}
