/// End-to-end decisions of the board-state core: fresh decode, move
/// detection, forced moves under noise, and untrustworthy history.

mod common;

use chess_vision::{decode, Disambiguator, Orientation, PieceClass};
use common::{frame, noisy_frame, position, AFTER_E4, START};
use shakmaty::{Chess, Square};

#[test]
fn test_fresh_start_decodes_standard_position() {
    let inference = Disambiguator::default().infer(&frame(START, Orientation::BottomLeft), Orientation::BottomLeft, None, true);
    assert_eq!(inference.board.board_fen(), START);
    assert!(inference.detected.is_none());
}

#[test]
fn test_e4_detected_from_start() {
    let start = Chess::default();
    let inference = Disambiguator::default().infer(&frame(AFTER_E4, Orientation::BottomLeft), Orientation::BottomLeft, Some(&start), true);
    let detected = inference.detected.expect("e2e4");
    assert_eq!(detected.uci, "e2e4");
    assert_eq!(inference.board.board_fen(), AFTER_E4);
}

#[test]
fn test_e4_detected_in_every_orientation() {
    let start = Chess::default();
    for orientation in Orientation::ALL {
        let inference = Disambiguator::default().infer(&frame(AFTER_E4, orientation), orientation, Some(&start), true);
        assert_eq!(inference.detected.map(|d| d.uci), Some("e2e4".to_string()), "{orientation}");
    }
}

#[test]
fn test_only_legal_move_survives_noise() {
    // White king in the corner, checked by a rook: Kg2 is the only move... h2 is
    // covered by the rook on h8, g1 by the bishop on c5.
    let before = position("6kr/8/8/2b5/8/8/8/7K w - - 0 1");
    assert_eq!(shakmaty::Position::legal_moves(&before).len(), 1);

    let after = "6kr/8/8/2b5/8/8/6K1/8";
    let frame = noisy_frame(
        after,
        &[
            (Square::A4, PieceClass::WhiteQueen, 0.85),
            (Square::D2, PieceClass::BlackKnight, 0.7),
            (Square::F7, PieceClass::WhiteBishop, 0.9),
        ],
    );

    let inference = Disambiguator::default().infer(&frame, Orientation::BottomLeft, Some(&before), true);
    assert_eq!(inference.detected.map(|d| d.uci), Some("h1g2".to_string()));
    assert_eq!(inference.board.board_fen(), after);
}

#[test]
fn test_three_white_queens_previous_is_ignored() {
    let shown = frame(AFTER_E4, Orientation::BottomLeft);
    let inference = Disambiguator::default()
        .infer_from_fen(&shown, Orientation::BottomLeft, Some("4k3/8/8/8/8/8/8/QQQ1K3"), true)
        .unwrap();
    assert!(inference.detected.is_none());
    assert_eq!(inference.board, decode(&shown, Orientation::BottomLeft));
}

#[test]
fn test_repeated_inference_is_identical() {
    let start = Chess::default();
    let shown = noisy_frame(AFTER_E4, &[(Square::C6, PieceClass::BlackPawn, 0.6)]);
    let disambiguator = Disambiguator::default();
    let first = disambiguator.infer(&shown, Orientation::BottomLeft, Some(&start), true);
    let second = disambiguator.infer(&shown, Orientation::BottomLeft, Some(&start), true);
    assert_eq!(first, second);
}

#[test]
fn test_must_detect_keeps_previous_board_exactly() {
    let start = Chess::default();
    // Two pieces vanish at once: no single move explains it.
    let shown = frame("rnbqkbnr/pppppppp/8/8/8/8/PPPP2PP/RNBQKBNR", Orientation::BottomLeft);
    let inference = Disambiguator::default().infer(&shown, Orientation::BottomLeft, Some(&start), true);
    assert!(inference.detected.is_none());
    assert_eq!(inference.board.board_fen(), START);
}
