//! Stockfish engine wrapper using UCI protocol (async I/O)

use std::process::Stdio;

use shakmaty::fen::Fen;
use shakmaty::{Chess, EnPassantMode};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::debug;

use crate::collaborators::{CandidateLine, PositionEvaluator, Score};
use crate::error::SpectatorError;

/// Stockfish engine instance
pub struct StockfishEngine {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    nodes: u32,
    multipv: u32,
}

impl StockfishEngine {
    /// Spawn a new Stockfish process and initialize UCI
    pub async fn new(path: &str, nodes: u32, multipv: u32) -> Result<Self, SpectatorError> {
        let mut process = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SpectatorError::Stockfish(format!("Failed to spawn Stockfish: {e}")))?;

        let stdin = process
            .stdin
            .take()
            .ok_or(SpectatorError::Stockfish("Stockfish stdin unavailable".into()))?;
        let stdout = process
            .stdout
            .take()
            .map(BufReader::new)
            .ok_or(SpectatorError::Stockfish("Stockfish stdout unavailable".into()))?;

        let mut engine = Self {
            process,
            stdin,
            stdout,
            nodes,
            multipv: multipv.max(1),
        };

        engine.send("uci").await?;
        engine.wait_for("uciok").await?;

        engine.send("setoption name Threads value 1").await?;
        engine.send("setoption name Hash value 64").await?;
        engine
            .send(&format!("setoption name MultiPV value {}", engine.multipv))
            .await?;
        engine.send("isready").await?;
        engine.wait_for("readyok").await?;

        Ok(engine)
    }

    /// Send a command to Stockfish
    async fn send(&mut self, cmd: &str) -> Result<(), SpectatorError> {
        debug!(cmd, "SF <");
        self.stdin
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| SpectatorError::Stockfish(format!("Failed to write to Stockfish: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| SpectatorError::Stockfish(format!("Failed to flush stdin: {e}")))?;
        Ok(())
    }

    async fn read_line(&mut self, line: &mut String) -> Result<(), SpectatorError> {
        line.clear();
        let read = self
            .stdout
            .read_line(line)
            .await
            .map_err(|e| SpectatorError::Stockfish(format!("Failed to read from Stockfish: {e}")))?;
        if read == 0 {
            return Err(SpectatorError::Stockfish("Stockfish closed its output".into()));
        }
        debug!(line = line.trim(), "SF >");
        Ok(())
    }

    /// Wait for a specific response line
    async fn wait_for(&mut self, expected: &str) -> Result<(), SpectatorError> {
        let mut line = String::new();
        loop {
            self.read_line(&mut line).await?;
            if line.trim() == expected {
                return Ok(());
            }
        }
    }

    /// Analyse `fen` and return up to `multipv` lines, best first.
    pub async fn analyse(&mut self, fen: &str) -> Result<Vec<CandidateLine>, SpectatorError> {
        self.send(&format!("position fen {fen}")).await?;
        self.send(&format!("go nodes {}", self.nodes)).await?;

        let mut lines: Vec<Option<CandidateLine>> = vec![None; self.multipv as usize];
        let mut line = String::new();
        loop {
            self.read_line(&mut line).await?;
            let trimmed = line.trim();

            if trimmed.starts_with("info") && trimmed.contains(" pv ") {
                // Later (deeper) info lines overwrite earlier ones.
                let index = parse_multipv_index(trimmed).unwrap_or(1).saturating_sub(1) as usize;
                if let (Some(slot), Some(parsed)) = (lines.get_mut(index), parse_line(trimmed)) {
                    *slot = Some(parsed);
                }
            } else if trimmed.starts_with("bestmove") {
                break;
            }
        }

        Ok(lines.into_iter().flatten().collect())
    }

    /// Send quit command and wait for process to exit
    pub async fn shutdown(&mut self) {
        let _ = self.send("quit").await;
        let _ = self.process.wait().await;
    }
}

impl Drop for StockfishEngine {
    fn drop(&mut self) {
        // Best-effort synchronous kill in drop
        let _ = self.process.start_kill();
    }
}

impl PositionEvaluator for StockfishEngine {
    async fn evaluate(&mut self, position: &Chess) -> Result<Vec<CandidateLine>, SpectatorError> {
        let fen = Fen::from_position(position, EnPassantMode::Legal).to_string();
        self.analyse(&fen).await
    }

    async fn quit(&mut self) {
        self.shutdown().await;
    }
}

/// Score and first PV move of one info line
fn parse_line(line: &str) -> Option<CandidateLine> {
    let uci = parse_pv(line).into_iter().next()?;
    let score = match (parse_cp(line), parse_mate(line)) {
        (_, Some(mate)) => Score::Mate(mate),
        (Some(cp), None) => Score::Cp(cp),
        (None, None) => return None,
    };
    Some(CandidateLine { uci, score })
}

/// Parse centipawn score from info line
fn parse_cp(line: &str) -> Option<i32> {
    parse_after(line, "cp")
}

/// Parse mate score from info line
fn parse_mate(line: &str) -> Option<i32> {
    parse_after(line, "mate")
}

/// Parse multipv index from info line
fn parse_multipv_index(line: &str) -> Option<u32> {
    parse_after(line, "multipv")
}

fn parse_after<T: std::str::FromStr>(line: &str, keyword: &str) -> Option<T> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == keyword && i + 1 < parts.len() {
            return parts[i + 1].parse().ok();
        }
    }
    None
}

/// Parse PV moves from info line
fn parse_pv(line: &str) -> Vec<String> {
    let mut in_pv = false;
    let mut moves = Vec::new();

    for part in line.split_whitespace() {
        if part == "pv" {
            in_pv = true;
            continue;
        }
        if in_pv {
            if part.starts_with("bmc") || part == "string" {
                break;
            }
            moves.push(part.to_string());
        }
    }

    moves
}
