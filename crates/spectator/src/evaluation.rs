//! Signals derived from evaluator output: indicator lights, critical
//! moments and the h-pawn push.

use shakmaty::{Color, File, Move, Role};

use crate::collaborators::{CandidateLine, Score};

/// Win-percentage gap between the best and second-best line.
pub const DEFAULT_CRITICAL_GAP: f64 = 25.0;

pub const MAX_LIGHTS: u8 = 8;
pub const NEUTRAL_LIGHTS: u8 = 4;

const WIN_PERCENT_PER_LIGHT: f64 = 100.0 / MAX_LIGHTS as f64;

/// Logistic centipawn-to-win-chance curve, as used by lichess.
pub fn win_percent(score: Score) -> f64 {
    match score {
        Score::Cp(cp) => {
            let cp = f64::from(cp.clamp(-1000, 1000));
            50.0 + 50.0 * (2.0 / (1.0 + (-0.00368208 * cp).exp()) - 1.0)
        }
        Score::Mate(n) if n > 0 => 100.0,
        Score::Mate(_) => 0.0,
    }
}

/// White's win percentage from the best line, if any.
pub fn white_win_percent(lines: &[CandidateLine], turn: Color) -> Option<f64> {
    let best = win_percent(lines.first()?.score);
    Some(match turn {
        Color::White => best,
        Color::Black => 100.0 - best,
    })
}

/// 0 (black winning) ..= 8 (white winning); 4 when nothing is known.
pub fn light_count(lines: &[CandidateLine], turn: Color) -> u8 {
    match white_win_percent(lines, turn) {
        Some(white) => (white / WIN_PERCENT_PER_LIGHT).round().clamp(0.0, f64::from(MAX_LIGHTS)) as u8,
        None => NEUTRAL_LIGHTS,
    }
}

/// Lights for a finished game.
pub fn terminal_lights(winner: Option<Color>) -> u8 {
    match winner {
        Some(Color::White) => MAX_LIGHTS,
        Some(Color::Black) => 0,
        None => NEUTRAL_LIGHTS,
    }
}

/// Only one move keeps the evaluation: the best line beats the runner-up
/// by at least `gap` win percent. Forced positions are never critical.
pub fn is_critical(lines: &[CandidateLine], legal_moves: usize, gap: f64) -> bool {
    if legal_moves <= 1 {
        return false;
    }
    match lines {
        [best, second, ..] => win_percent(best.score) - win_percent(second.score) >= gap,
        _ => false,
    }
}

/// Non-capturing h-pawn advance that leaves the mover no worse than even.
///
/// `lines_after` evaluate the position after the move, so they speak for
/// the opponent. Without an evaluation nothing is flagged.
pub fn is_harry(mv: &Move, lines_after: &[CandidateLine]) -> bool {
    let h_pawn_push = matches!(
        mv,
        Move::Normal { role: Role::Pawn, from, to, capture: None, .. }
            if from.file() == File::H && to.file() == File::H
    );
    if !h_pawn_push {
        return false;
    }
    match lines_after.first() {
        Some(best) => 100.0 - win_percent(best.score) >= 50.0,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::{Chess, Position, Square};

    fn line(uci: &str, score: Score) -> CandidateLine {
        CandidateLine { uci: uci.to_string(), score }
    }

    fn find_move(pos: &Chess, from: Square, to: Square) -> Move {
        pos.legal_moves()
            .into_iter()
            .find(|m| m.from() == Some(from) && m.to() == to)
            .unwrap()
    }

    #[test]
    fn test_win_percent_curve() {
        assert!((win_percent(Score::Cp(0)) - 50.0).abs() < 1e-9);
        assert!(win_percent(Score::Cp(300)) > 75.0);
        assert!(win_percent(Score::Cp(-300)) < 25.0);
        assert_eq!(win_percent(Score::Mate(2)), 100.0);
        assert_eq!(win_percent(Score::Mate(-1)), 0.0);
    }

    #[test]
    fn test_light_count() {
        assert_eq!(light_count(&[], Color::White), NEUTRAL_LIGHTS);
        assert_eq!(light_count(&[line("e2e4", Score::Cp(0))], Color::White), 4);
        assert_eq!(light_count(&[line("e2e4", Score::Mate(3))], Color::White), 8);
        // Black to move and mating: white is lost.
        assert_eq!(light_count(&[line("d8h4", Score::Mate(1))], Color::Black), 0);
        assert_eq!(terminal_lights(Some(Color::White)), 8);
        assert_eq!(terminal_lights(None), 4);
    }

    #[test]
    fn test_critical_needs_gap_and_choice() {
        let lines = [line("a", Score::Cp(200)), line("b", Score::Cp(-200))];
        assert!(is_critical(&lines, 20, DEFAULT_CRITICAL_GAP));
        assert!(!is_critical(&lines, 1, DEFAULT_CRITICAL_GAP));

        let close = [line("a", Score::Cp(30)), line("b", Score::Cp(20))];
        assert!(!is_critical(&close, 20, DEFAULT_CRITICAL_GAP));
        assert!(!is_critical(&lines[..1], 20, DEFAULT_CRITICAL_GAP));
    }

    #[test]
    fn test_harry_requires_h_pawn_and_sound_position() {
        let pos = Chess::default();
        let h4 = find_move(&pos, Square::H2, Square::H4);
        let e4 = find_move(&pos, Square::E2, Square::E4);

        // Opponent thinks it is slightly worse: mover is fine.
        let after = [line("e7e5", Score::Cp(-20))];
        assert!(is_harry(&h4, &after));
        assert!(!is_harry(&e4, &after));

        let refuted = [line("e7e5", Score::Cp(150))];
        assert!(!is_harry(&h4, &refuted));
        assert!(!is_harry(&h4, &[]));
    }
}
