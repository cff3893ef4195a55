//! Game session around the board-state core: configuration, the
//! collaborator seams, evaluator signals, PGN bookkeeping and the
//! session state machine.

pub mod collaborators;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod pgn;
pub mod replay;
pub mod session;
pub mod stockfish;

pub use collaborators::{
    BoardReader, CandidateLine, ClassifiedCapture, Directive, FrameSource, PieceClassifier,
    PositionEvaluator, Score, SignalSink, SquareCrop, TracingSink,
};
pub use config::SpectatorConfig;
pub use error::{FrameError, SpectatorError};
pub use pgn::{GameRecord, GameResult};
pub use replay::{synthetic_frame, RecordedFrame, ReplayReader};
pub use session::{CycleReport, FrameOutcome, MoveReport, NoMoveReason, Session, SessionState};
pub use stockfish::StockfishEngine;
