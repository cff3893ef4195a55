#![allow(dead_code)]

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use chess_vision::{BoardState, FrameProbabilities, Orientation, PieceClass, SquareProbabilities};
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, Square};

pub const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR";
pub const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR";

/// Generate a unique suffix based on timestamp to avoid file collisions.
pub fn unique_suffix() -> String {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}", std::process::id(), ts % 1_000_000_000)
}

pub fn temp_pgn(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("spectator-{name}-{}.pgn", unique_suffix()))
}

pub fn position(fen: &str) -> Chess {
    let fen: Fen = fen.parse().unwrap();
    fen.into_position(CastlingMode::Standard).unwrap()
}

/// Frame whose argmax matches `board_fen`, seen from `orientation`.
pub fn frame(board_fen: &str, orientation: Orientation) -> FrameProbabilities {
    spectator::synthetic_frame(board_fen, orientation, 0.9).unwrap()
}

/// Frame matching `board_fen` except for the listed squares, which are
/// misread with the given label and confidence.
pub fn noisy_frame(board_fen: &str, noise: &[(Square, PieceClass, f32)]) -> FrameProbabilities {
    let state: BoardState = board_fen.parse().unwrap();
    let orientation = Orientation::BottomLeft;
    let squares = orientation
        .squares()
        .map(|square| match noise.iter().find(|(s, _, _)| *s == square) {
            Some((_, class, confidence)) => SquareProbabilities::peaked(*class, *confidence),
            None => SquareProbabilities::peaked(state.piece_at(square), 0.9),
        })
        .collect();
    FrameProbabilities::new(squares).unwrap()
}
