//! Reconcile a noisy frame with the previous position.
//!
//! Every legal move from the previous position is scored by how well the
//! board it produces agrees with the classifier. The previous board itself
//! is scored the same way as the "nothing moved" hypothesis; a move is only
//! reported when it beats that hypothesis by a margin. Squares a move does
//! not touch contribute equally to both, so noise there cannot flip the
//! decision.

use std::cmp::Ordering;

use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::{
    Bitboard, Board, CastlingMode, Chess, Color, EnPassantMode, FromSetup, Move, Position,
    PositionError, Setup, Square,
};
use tracing::{debug, warn};

use crate::board_state::{square_index, BoardState};
use crate::decoder::{self, SquareTable};
use crate::error::VisionError;
use crate::orientation::Orientation;
use crate::probabilities::FrameProbabilities;
use crate::validator;

/// Minimum score advantage of a move over "nothing moved".
pub const DEFAULT_MIN_MOVE_GAIN: f32 = 0.5;

/// A move the frame supports, with its display forms.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedMove {
    pub mv: Move,
    /// UCI-like from/to/promotion form, e.g. `e2e4`, `e7e8q`, `e1g1`.
    pub uci: String,
    /// SAN in the position the move was found in, with `+`/`#` suffix.
    pub san: String,
    /// Found only after handing the turn to the other side.
    pub mirrored: bool,
    /// Agreement of the resulting board with the frame.
    pub score: f32,
    /// `score` minus the score of the unchanged board.
    pub gain: f32,
}

/// Result of one pass: the board to commit and the move, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Inference {
    pub board: BoardState,
    pub detected: Option<DetectedMove>,
}

impl Inference {
    fn board_only(board: BoardState) -> Self {
        Self { board, detected: None }
    }
}

struct Candidate {
    mv: Move,
    board: BoardState,
    score: f32,
}

impl Candidate {
    fn is_quiet(&self) -> bool {
        !self.mv.is_capture() && !self.mv.is_promotion()
    }

    fn scan_key(&self) -> (Option<usize>, usize, Option<u8>) {
        (
            self.mv.from().map(square_index),
            square_index(self.mv.to()),
            self.mv.promotion().map(|role| role as u8),
        )
    }

    /// `Greater` means `self` is preferred: higher score, then quiet moves,
    /// then earlier in board-scan order.
    fn rank(&self, other: &Candidate) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.is_quiet().cmp(&other.is_quiet()))
            .then_with(|| other.scan_key().cmp(&self.scan_key()))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Disambiguator {
    min_move_gain: f32,
}

impl Default for Disambiguator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_MOVE_GAIN)
    }
}

impl Disambiguator {
    pub fn new(min_move_gain: f32) -> Self {
        Self { min_move_gain }
    }

    pub fn min_move_gain(&self) -> f32 {
        self.min_move_gain
    }

    /// Decide the current board given the tracked previous position.
    ///
    /// Without a usable previous position the raw per-square decode is
    /// returned. When no move is supported, `must_detect_move` keeps the
    /// previous board; otherwise the raw decode is returned.
    pub fn infer(
        &self,
        frame: &FrameProbabilities,
        orientation: Orientation,
        previous: Option<&Chess>,
        must_detect_move: bool,
    ) -> Inference {
        let table = decoder::by_square(frame, orientation);
        let raw = decoder::decode_table(&table);

        let Some(previous) = previous else {
            return Inference::board_only(raw);
        };
        if let Err(reason) = validator::validate(previous.board()) {
            warn!(%reason, "Ignoring previous position, not showable with one physical set");
            return Inference::board_only(raw);
        }

        let unchanged = BoardState::from_board(previous.board());
        let unchanged_score = decoder::score(&unchanged, &table);

        let found = self
            .best_move(previous, &table, unchanged_score, false)
            .or_else(|| {
                let passed = with_turn_passed(previous)?;
                self.best_move(&passed, &table, unchanged_score, true)
            });

        match found {
            Some((detected, board)) => Inference {
                board,
                detected: Some(detected),
            },
            None if must_detect_move => Inference::board_only(unchanged),
            None => Inference::board_only(raw),
        }
    }

    /// Same as [`Disambiguator::infer`], for a previous FEN string.
    ///
    /// A full FEN supplies turn and castling rights. A board-only FEN does
    /// not, so a potentially-legal context is assumed: white to move when
    /// that is legal, castling allowed wherever king and rook stand on
    /// their home squares.
    pub fn infer_from_fen(
        &self,
        frame: &FrameProbabilities,
        orientation: Orientation,
        previous_fen: Option<&str>,
        must_detect_move: bool,
    ) -> Result<Inference, VisionError> {
        let previous = match previous_fen {
            Some(fen) => {
                let state: BoardState = fen.parse()?;
                match validator::validate(&state.to_board()) {
                    Ok(()) if fen.split_whitespace().count() > 1 => Some(full_position(fen)?),
                    Ok(()) => position_from_board(&state.to_board()),
                    Err(reason) => {
                        warn!(%reason, fen, "Ignoring previous FEN, not showable with one physical set");
                        None
                    }
                }
            }
            None => None,
        };
        Ok(self.infer(frame, orientation, previous.as_ref(), must_detect_move))
    }

    fn best_move(
        &self,
        position: &Chess,
        table: &SquareTable,
        unchanged_score: f32,
        mirrored: bool,
    ) -> Option<(DetectedMove, BoardState)> {
        let mut best: Option<Candidate> = None;
        for mv in position.legal_moves() {
            let mut after = position.clone();
            after.play_unchecked(mv);
            if let Err(reason) = validator::validate(after.board()) {
                debug!(
                    uci = %mv.to_uci(CastlingMode::Standard),
                    %reason,
                    "Skipping candidate, not showable with one physical set"
                );
                continue;
            }
            let board = BoardState::from_board(after.board());
            let candidate = Candidate {
                score: decoder::score(&board, table),
                mv,
                board,
            };
            let better = best
                .as_ref()
                .map_or(true, |current| candidate.rank(current) == Ordering::Greater);
            if better {
                best = Some(candidate);
            }
        }

        let best = best?;
        let gain = best.score - unchanged_score;
        // NaN on either side rejects the move.
        let beats_unchanged = matches!(
            gain.partial_cmp(&self.min_move_gain),
            Some(Ordering::Greater | Ordering::Equal)
        );
        if !beats_unchanged {
            debug!(
                mirrored,
                gain,
                min_gain = self.min_move_gain,
                "Best candidate does not beat the unchanged board"
            );
            return None;
        }

        let detected = DetectedMove {
            uci: best.mv.to_uci(CastlingMode::Standard).to_string(),
            san: SanPlus::from_move(position.clone(), best.mv).to_string(),
            mirrored,
            score: best.score,
            gain,
            mv: best.mv,
        };
        debug!(uci = %detected.uci, gain, mirrored, "Candidate move accepted");
        Some((detected, best.board))
    }
}

fn full_position(fen: &str) -> Result<Chess, VisionError> {
    let parsed: Fen = fen.parse().map_err(|_| VisionError::Fen(fen.to_string()))?;
    parsed
        .into_position::<Chess>(CastlingMode::Standard)
        .or_else(PositionError::ignore_too_much_material)
        .map_err(|e| VisionError::Position(e.to_string()))
}

/// The same position with the other side to move.
fn with_turn_passed(position: &Chess) -> Option<Chess> {
    let mut setup = position.to_setup(EnPassantMode::Legal);
    setup.turn = !setup.turn;
    setup.ep_square = None;
    Chess::from_setup(setup, CastlingMode::Standard)
        .or_else(PositionError::ignore_invalid_castling_rights)
        .ok()
}

fn position_from_board(board: &Board) -> Option<Chess> {
    let home_rooks = Bitboard::from(Square::A1)
        | Bitboard::from(Square::H1)
        | Bitboard::from(Square::A8)
        | Bitboard::from(Square::H8);

    [Color::White, Color::Black].into_iter().find_map(|turn| {
        let mut setup = Setup::empty();
        setup.board = board.clone();
        setup.turn = turn;
        setup.castling_rights = board.rooks() & home_rooks;
        Chess::from_setup(setup, CastlingMode::Standard)
            .or_else(PositionError::ignore_invalid_castling_rights)
            .or_else(PositionError::ignore_too_much_material)
            .ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece_class::PieceClass;
    use crate::probabilities::{SquareProbabilities, NUM_SQUARES};

    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR";

    fn frame_showing(fen: &str, confidence: f32) -> FrameProbabilities {
        let state: BoardState = fen.parse().unwrap();
        let orientation = Orientation::BottomLeft;
        let squares = orientation
            .squares()
            .map(|square| SquareProbabilities::peaked(state.piece_at(square), confidence))
            .collect();
        FrameProbabilities::new(squares).unwrap()
    }

    fn position(fen: &str) -> Chess {
        let fen: Fen = fen.parse().unwrap();
        fen.into_position(CastlingMode::Standard).unwrap()
    }

    #[test]
    fn test_detects_pawn_push() {
        let frame = frame_showing(AFTER_E4, 0.9);
        let start = Chess::default();
        let inference = Disambiguator::default().infer(&frame, Orientation::BottomLeft, Some(&start), true);

        let detected = inference.detected.expect("move");
        assert_eq!(detected.uci, "e2e4");
        assert_eq!(detected.san, "e4");
        assert!(!detected.mirrored);
        assert_eq!(inference.board.board_fen(), AFTER_E4);
    }

    #[test]
    fn test_unchanged_board_detects_nothing() {
        let frame = frame_showing("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR", 0.9);
        let start = Chess::default();
        let disambiguator = Disambiguator::default();

        let kept = disambiguator.infer(&frame, Orientation::BottomLeft, Some(&start), true);
        assert_eq!(kept.detected, None);
        assert_eq!(kept.board, BoardState::from_board(start.board()));
    }

    #[test]
    fn test_must_detect_keeps_previous_board_on_garbage() {
        // Empty board: no legal move explains it.
        let frame = frame_showing("8/8/8/8/8/8/8/8", 0.9);
        let start = Chess::default();
        let disambiguator = Disambiguator::default();

        let kept = disambiguator.infer(&frame, Orientation::BottomLeft, Some(&start), true);
        assert_eq!(kept.detected, None);
        assert_eq!(kept.board.board_fen(), "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR");

        let raw = disambiguator.infer(&frame, Orientation::BottomLeft, Some(&start), false);
        assert_eq!(raw.detected, None);
        assert_eq!(raw.board.board_fen(), "8/8/8/8/8/8/8/8");
    }

    #[test]
    fn test_castling_detected_with_uci_king_move() {
        let before = position("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1");
        let frame = frame_showing("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R4RK1", 0.9);
        let inference = Disambiguator::default().infer(&frame, Orientation::BottomLeft, Some(&before), true);
        let detected = inference.detected.expect("castling");
        assert_eq!(detected.uci, "e1g1");
        assert_eq!(detected.san, "O-O");
    }

    #[test]
    fn test_wrong_side_move_found_by_mirrored_pass() {
        // White to move in the tracked position, but black's reply is shown.
        let start = Chess::default();
        let frame = frame_showing("rnbqkbnr/pppp1ppp/8/4p3/8/8/PPPPPPPP/RNBQKBNR", 0.9);
        let inference = Disambiguator::default().infer(&frame, Orientation::BottomLeft, Some(&start), true);
        let detected = inference.detected.expect("mirrored move");
        assert_eq!(detected.uci, "e7e5");
        assert!(detected.mirrored);
    }

    #[test]
    fn test_promotion_piece_read_from_frame() {
        let before = position("8/4P1k1/8/8/8/8/8/4K3 w - - 0 1");
        let frame = frame_showing("4N3/6k1/8/8/8/8/8/4K3", 0.9);
        let inference = Disambiguator::default().infer(&frame, Orientation::BottomLeft, Some(&before), true);
        assert_eq!(inference.detected.expect("underpromotion").uci, "e7e8n");
    }

    #[test]
    fn test_candidate_needing_a_third_queen_is_skipped() {
        // Two queens already out: a third cannot come from the same set.
        let before = position("7k/4P3/8/8/8/8/8/2QQK3 w - - 0 1");
        let frame = frame_showing("4Q2k/8/8/8/8/8/8/2QQK3", 0.9);
        let inference = Disambiguator::default().infer(&frame, Orientation::BottomLeft, Some(&before), true);

        let detected = inference.detected.expect("an underpromotion still explains the empty e7");
        assert_eq!(detected.uci, "e7e8n");
        assert_eq!(inference.board.board_fen(), "4N2k/8/8/8/8/8/8/2QQK3");
        assert!(validator::is_physically_valid(&inference.board));
    }

    #[test]
    fn test_nan_margin_accepts_nothing() {
        let frame = frame_showing(AFTER_E4, 0.9);
        let start = Chess::default();
        let inference = Disambiguator::new(f32::NAN).infer(&frame, Orientation::BottomLeft, Some(&start), true);
        assert_eq!(inference.detected, None);
        assert_eq!(inference.board, BoardState::from_board(start.board()));
    }

    #[test]
    fn test_san_marks_check() {
        let before = position("4k3/8/8/8/8/8/8/R3K3 w - - 0 1");
        let frame = frame_showing("R3k3/8/8/8/8/8/8/4K3", 0.9);
        let inference = Disambiguator::default().infer(&frame, Orientation::BottomLeft, Some(&before), true);
        assert_eq!(inference.detected.expect("rook lift").san, "Ra8+");
    }

    #[test]
    fn test_tie_prefers_quiet_move() {
        let white_rook_takes = position("4k3/8/8/8/8/8/r7/R3K3 w - - 0 1");
        // Frame shows nothing informative: every square uniform.
        let squares = vec![SquareProbabilities::new([0.1; 13]); NUM_SQUARES];
        let frame = FrameProbabilities::new(squares).unwrap();
        let inference = Disambiguator::new(-1.0).infer(&frame, Orientation::BottomLeft, Some(&white_rook_takes), true);
        let detected = inference.detected.expect("some move");
        assert!(!detected.mv.is_capture());
    }

    #[test]
    fn test_invalid_previous_fen_falls_back_to_raw() {
        let frame = frame_showing(AFTER_E4, 0.9);
        let inference = Disambiguator::default()
            .infer_from_fen(&frame, Orientation::BottomLeft, Some("4k3/8/8/8/8/8/8/QQQ1K3"), true)
            .unwrap();
        assert_eq!(inference.detected, None);
        assert_eq!(inference.board.board_fen(), AFTER_E4);
    }

    #[test]
    fn test_board_only_previous_fen_infers_context() {
        let frame = frame_showing(AFTER_E4, 0.9);
        let inference = Disambiguator::default()
            .infer_from_fen(
                &frame,
                Orientation::BottomLeft,
                Some("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR"),
                true,
            )
            .unwrap();
        assert_eq!(inference.detected.map(|d| d.uci), Some("e2e4".to_string()));

        let malformed = Disambiguator::default().infer_from_fen(&frame, Orientation::BottomLeft, Some("8/8"), true);
        assert!(malformed.is_err());
    }

    #[test]
    fn test_full_previous_fen_keeps_turn() {
        // Black to move: e2e4 only turns up once the turn is passed.
        let frame = frame_showing(AFTER_E4, 0.9);
        let inference = Disambiguator::default()
            .infer_from_fen(
                &frame,
                Orientation::BottomLeft,
                Some("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1"),
                true,
            )
            .unwrap();
        let detected = inference.detected.expect("found with the turn passed");
        assert_eq!(detected.uci, "e2e4");
        assert!(detected.mirrored);

        let bad_turn = Disambiguator::default().infer_from_fen(
            &frame,
            Orientation::BottomLeft,
            Some("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1"),
            true,
        );
        assert!(matches!(bad_turn, Err(VisionError::Fen(_))));
    }

    #[test]
    fn test_idempotent() {
        let frame = frame_showing(AFTER_E4, 0.6);
        let start = Chess::default();
        let disambiguator = Disambiguator::default();
        let first = disambiguator.infer(&frame, Orientation::BottomLeft, Some(&start), true);
        let second = disambiguator.infer(&frame, Orientation::BottomLeft, Some(&start), true);
        assert_eq!(first, second);
    }

    #[test]
    fn test_noisy_irrelevant_squares_do_not_matter() {
        let state: BoardState = AFTER_E4.parse().unwrap();
        let orientation = Orientation::BottomLeft;
        let squares = orientation
            .squares()
            .map(|square| {
                let class = state.piece_at(square);
                if square.rank() == shakmaty::Rank::Sixth {
                    // Misread as black knights everywhere on the sixth rank.
                    SquareProbabilities::peaked(PieceClass::BlackKnight, 0.8)
                } else {
                    SquareProbabilities::peaked(class, 0.9)
                }
            })
            .collect();
        let frame = FrameProbabilities::new(squares).unwrap();
        let inference = Disambiguator::default().infer(&frame, orientation, Some(&Chess::default()), true);
        assert_eq!(inference.detected.map(|d| d.uci), Some("e2e4".to_string()));
        assert_eq!(inference.board, state);
    }
}
