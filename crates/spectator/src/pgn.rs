//! Move history and PGN export/import.
//!
//! Import is the same lightweight regex approach used for game archives:
//! headers, comments and variations are stripped and the remaining SAN
//! tokens are replayed through the rules engine.

use std::fmt;
use std::path::Path;

use regex::Regex;
use shakmaty::fen::Fen;
use shakmaty::san::{San, SanPlus};
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Position};

use crate::error::SpectatorError;

const STANDARD_START_BOARD: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
}

impl GameResult {
    /// Decisive mate or stalemate; other draws are not tracked.
    pub fn of(position: &Chess) -> Option<GameResult> {
        if position.is_checkmate() {
            Some(match position.turn() {
                Color::White => GameResult::BlackWins,
                Color::Black => GameResult::WhiteWins,
            })
        } else if position.is_stalemate() {
            Some(GameResult::Draw)
        } else {
            None
        }
    }

    pub fn winner(self) -> Option<Color> {
        match self {
            GameResult::WhiteWins => Some(Color::White),
            GameResult::BlackWins => Some(Color::Black),
            GameResult::Draw => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            GameResult::WhiteWins => "1-0",
            GameResult::BlackWins => "0-1",
            GameResult::Draw => "1/2-1/2",
        }
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// `12. e4` for white, `12... e5` for black.
pub fn move_text(position_before: &Chess, san: &str) -> String {
    let number = position_before.fullmoves();
    match position_before.turn() {
        Color::White => format!("{number}. {san}"),
        Color::Black => format!("{number}... {san}"),
    }
}

/// Moves played since the session's first position.
#[derive(Debug, Clone)]
pub struct GameRecord {
    start: Chess,
    start_fen: String,
    sans: Vec<String>,
    result: Option<GameResult>,
}

impl GameRecord {
    pub fn new(start: Chess) -> Self {
        let start_fen = Fen::from_position(&start, EnPassantMode::Legal).to_string();
        Self {
            start,
            start_fen,
            sans: Vec::new(),
            result: None,
        }
    }

    pub fn start(&self) -> &Chess {
        &self.start
    }

    pub fn sans(&self) -> &[String] {
        &self.sans
    }

    pub fn len(&self) -> usize {
        self.sans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sans.is_empty()
    }

    pub fn result(&self) -> Option<GameResult> {
        self.result
    }

    pub fn push(&mut self, san: String) {
        self.sans.push(san);
    }

    pub fn finish(&mut self, result: GameResult) {
        self.result = Some(result);
    }

    fn from_standard_start(&self) -> bool {
        self.start_fen == STANDARD_START_BOARD
    }

    /// PGN text of the game so far. Ongoing games end with `*`.
    pub fn to_pgn(&self) -> String {
        let result = self.result.map_or("*", GameResult::token);
        let mut pgn = String::new();
        pgn.push_str("[Event \"Spectated game\"]\n");
        pgn.push_str(&format!("[Result \"{result}\"]\n"));
        if !self.from_standard_start() {
            pgn.push_str("[Variant \"From Position\"]\n");
            pgn.push_str("[SetUp \"1\"]\n");
            pgn.push_str(&format!("[FEN \"{}\"]\n", self.start_fen));
        }
        pgn.push('\n');

        let mut tokens = Vec::with_capacity(self.sans.len() * 3 / 2 + 1);
        let mut number = self.start.fullmoves().get();
        let mut turn = self.start.turn();
        for (ply, san) in self.sans.iter().enumerate() {
            match turn {
                Color::White => tokens.push(format!("{number}.")),
                Color::Black if ply == 0 => tokens.push(format!("{number}...")),
                Color::Black => {}
            }
            tokens.push(san.clone());
            if turn == Color::Black {
                number += 1;
            }
            turn = !turn;
        }
        tokens.push(result.to_string());
        pgn.push_str(&tokens.join(" "));
        pgn.push('\n');
        pgn
    }

    pub async fn save(&self, path: &Path) -> Result<(), SpectatorError> {
        tokio::fs::write(path, self.to_pgn()).await?;
        Ok(())
    }

    /// Rebuild a record from PGN text, returning it with the position
    /// reached after its last move.
    pub fn from_pgn(pgn: &str) -> Result<(GameRecord, Chess), SpectatorError> {
        let start = match extract_header(pgn, "FEN")? {
            Some(fen) => {
                let fen: Fen = fen
                    .parse()
                    .map_err(|e| SpectatorError::Pgn(format!("Bad FEN header {fen:?}: {e}")))?;
                fen.into_position::<Chess>(CastlingMode::Standard)
                    .map_err(|e| SpectatorError::Pgn(format!("Illegal FEN header: {e}")))?
            }
            None => Chess::default(),
        };

        let mut record = GameRecord::new(start.clone());
        let mut position = start;
        for token in extract_moves(pgn)? {
            let san: San = token
                .parse()
                .map_err(|_| SpectatorError::Pgn(format!("Unreadable move {token:?}")))?;
            let mv = san
                .to_move(&position)
                .map_err(|_| SpectatorError::Pgn(format!("Illegal move {token:?}")))?;
            record.push(SanPlus::from_move_and_play_unchecked(&mut position, mv).to_string());
        }
        if let Some(result) = GameResult::of(&position) {
            record.finish(result);
        }
        Ok((record, position))
    }
}

fn regex(pattern: &str) -> Result<Regex, SpectatorError> {
    Regex::new(pattern).map_err(|e| SpectatorError::Pgn(format!("Bad pattern: {e}")))
}

/// Extract SAN moves from PGN text (after removing headers, comments, variations).
fn extract_moves(pgn: &str) -> Result<Vec<String>, SpectatorError> {
    let no_headers = regex(r"\[[^\]]*\]")?.replace_all(pgn, "");
    let no_comments = regex(r"\{[^}]*\}")?.replace_all(&no_headers, "");
    let no_variations = regex(r"\([^)]*\)")?.replace_all(&no_comments, "");

    let move_re = regex(r"[KQRBN]?[a-h]?[1-8]?x?[a-h][1-8](?:=[QRBN])?[+#]?|O-O-O|O-O")?;
    Ok(move_re
        .find_iter(&no_variations)
        .map(|m| m.as_str().to_string())
        .collect())
}

/// Extract a string value from a PGN header.
fn extract_header(pgn: &str, header_name: &str) -> Result<Option<String>, SpectatorError> {
    let re = regex(&format!(r#"\[{}\s+"([^"]*)"\]"#, regex::escape(header_name)))?;
    Ok(re
        .captures(pgn)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|value| !value.is_empty()))
}
