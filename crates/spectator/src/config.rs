//! Session configuration from environment variables

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chess_vision::{Orientation, DEFAULT_MIN_MOVE_GAIN};

use crate::error::SpectatorError;
use crate::evaluation::DEFAULT_CRITICAL_GAP;

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Clone, Debug)]
pub struct SpectatorConfig {
    /// Full FEN of the first position
    pub starting_fen: String,

    /// Corner of the captured image holding a1
    pub orientation: Orientation,

    /// Keep the previous board when no move is supported
    pub must_detect_move: bool,

    /// Rewrite detected promotions to queen promotions
    pub auto_promotion_to_queen: bool,

    /// Minimum dwell between two evaluated frames
    pub board_update_interval: Duration,

    /// Score margin a move needs over "nothing moved"
    pub min_move_gain: f32,

    /// Path to Stockfish binary, evaluation disabled when unset
    pub stockfish_path: Option<String>,

    /// Nodes per position for Stockfish analysis
    pub nodes_per_position: u32,

    /// Candidate lines requested from the evaluator
    pub multipv: u32,

    /// Win-percentage gap between the two best lines that marks a critical moment
    pub critical_gap: f64,

    /// Where the move history is written after every move
    pub pgn_path: PathBuf,

    /// Previously saved game to continue
    pub resume_pgn: Option<PathBuf>,
}

impl Default for SpectatorConfig {
    fn default() -> Self {
        Self {
            starting_fen: STANDARD_START_FEN.to_string(),
            orientation: Orientation::BottomLeft,
            must_detect_move: true,
            auto_promotion_to_queen: true,
            board_update_interval: Duration::from_secs(3),
            min_move_gain: DEFAULT_MIN_MOVE_GAIN,
            stockfish_path: None,
            nodes_per_position: 100_000,
            multipv: 3,
            critical_gap: DEFAULT_CRITICAL_GAP,
            pgn_path: PathBuf::from("saved_game.pgn"),
            resume_pgn: None,
        }
    }
}

impl SpectatorConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, SpectatorError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`SpectatorConfig::load`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SpectatorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let starting_fen = get("STARTING_FEN").unwrap_or(defaults.starting_fen);
        let orientation = parse_setting(&get, "A1_POSITION", defaults.orientation)?;
        let must_detect_move = parse_flag(&get, "MUST_DETECT_MOVE", defaults.must_detect_move)?;
        let auto_promotion_to_queen =
            parse_flag(&get, "AUTO_PROMOTION_TO_QUEEN", defaults.auto_promotion_to_queen)?;

        let board_update_interval = match get("BOARD_UPDATE_INTERVAL_SECS") {
            Some(value) => value
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .ok_or(SpectatorError::InvalidSetting {
                    name: "BOARD_UPDATE_INTERVAL_SECS",
                    value,
                })?,
            None => defaults.board_update_interval,
        };

        let min_move_gain = parse_margin(&get, "MIN_MOVE_GAIN", defaults.min_move_gain)?;
        let stockfish_path = get("STOCKFISH_PATH");
        let nodes_per_position = parse_setting(&get, "NODES_PER_POSITION", defaults.nodes_per_position)?;

        let multipv = parse_setting(&get, "MULTIPV", defaults.multipv)?;
        if multipv == 0 {
            return Err(SpectatorError::Config("MULTIPV must be at least 1"));
        }

        let critical_gap = parse_margin(&get, "CRITICAL_GAP", defaults.critical_gap)?;
        let pgn_path = get("PGN_PATH").map(PathBuf::from).unwrap_or(defaults.pgn_path);
        let resume_pgn = get("RESUME_PGN").map(PathBuf::from);

        Ok(Self {
            starting_fen,
            orientation,
            must_detect_move,
            auto_promotion_to_queen,
            board_update_interval,
            min_move_gain,
            stockfish_path,
            nodes_per_position,
            multipv,
            critical_gap,
            pgn_path,
            resume_pgn,
        })
    }
}

fn parse_setting<T, G>(get: &G, name: &'static str, default: T) -> Result<T, SpectatorError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| SpectatorError::InvalidSetting { name, value }),
        None => Ok(default),
    }
}

/// Finite and not negative.
fn parse_margin<T, G>(get: &G, name: &'static str, default: T) -> Result<T, SpectatorError>
where
    T: FromStr + Into<f64> + Copy,
    G: Fn(&str) -> Option<String>,
{
    let margin = parse_setting(get, name, default)?;
    let value: f64 = margin.into();
    if value.is_finite() && value >= 0.0 {
        Ok(margin)
    } else {
        Err(SpectatorError::InvalidSetting {
            name,
            value: get(name).unwrap_or_default(),
        })
    }
}

fn parse_flag<G>(get: &G, name: &'static str, default: bool) -> Result<bool, SpectatorError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(SpectatorError::InvalidSetting { name, value }),
        },
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<SpectatorConfig, SpectatorError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SpectatorConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.starting_fen, STANDARD_START_FEN);
        assert_eq!(config.orientation, Orientation::BottomLeft);
        assert!(config.must_detect_move);
        assert!(config.auto_promotion_to_queen);
        assert_eq!(config.board_update_interval, Duration::from_secs(3));
        assert_eq!(config.stockfish_path, None);
        assert_eq!(config.multipv, 3);
        assert_eq!(config.pgn_path, PathBuf::from("saved_game.pgn"));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("A1_POSITION", "tr"),
            ("MUST_DETECT_MOVE", "false"),
            ("BOARD_UPDATE_INTERVAL_SECS", "1.5"),
            ("STOCKFISH_PATH", "/usr/bin/stockfish"),
            ("NODES_PER_POSITION", "5000"),
        ])
        .unwrap();
        assert_eq!(config.orientation, Orientation::TopRight);
        assert!(!config.must_detect_move);
        assert_eq!(config.board_update_interval, Duration::from_millis(1500));
        assert_eq!(config.stockfish_path.as_deref(), Some("/usr/bin/stockfish"));
        assert_eq!(config.nodes_per_position, 5000);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(matches!(
            load(&[("A1_POSITION", "middle")]),
            Err(SpectatorError::InvalidSetting { name: "A1_POSITION", .. })
        ));
        assert!(load(&[("MUST_DETECT_MOVE", "maybe")]).is_err());
        assert!(load(&[("BOARD_UPDATE_INTERVAL_SECS", "-2")]).is_err());
        assert!(load(&[("NODES_PER_POSITION", "lots")]).is_err());
        assert!(matches!(load(&[("MULTIPV", "0")]), Err(SpectatorError::Config(_))));
    }

    #[test]
    fn test_margins_must_be_finite_and_not_negative() {
        for name in ["MIN_MOVE_GAIN", "CRITICAL_GAP"] {
            for value in ["NaN", "inf", "-inf", "-1", "1e400"] {
                assert!(
                    matches!(load(&[(name, value)]), Err(SpectatorError::InvalidSetting { name: n, .. }) if n == name),
                    "{name}={value}"
                );
            }
        }

        let config = load(&[("MIN_MOVE_GAIN", "0"), ("CRITICAL_GAP", "12.5")]).unwrap();
        assert_eq!(config.min_move_gain, 0.0);
        assert_eq!(config.critical_gap, 12.5);
    }
}
