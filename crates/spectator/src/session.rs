//! One game, end to end.
//!
//! The session exclusively owns the rules-engine position and the move
//! history. Each call to [`Session::tick`] is one decision cycle: read a
//! frame, disambiguate it against the current position, and either apply
//! exactly one legal move or leave everything untouched.

use std::time::Instant;

use chess_vision::{validate, BoardState, DetectedMove, Disambiguator, InvalidBoard};
use shakmaty::fen::Fen;
use shakmaty::san::{San, SanPlus};
use shakmaty::{CastlingMode, Chess, Move, Position, Role};
use tracing::{debug, error, info, warn};

use crate::collaborators::{BoardReader, CandidateLine, Directive, PositionEvaluator, SignalSink};
use crate::config::SpectatorConfig;
use crate::error::{FrameError, SpectatorError};
use crate::evaluation::{is_critical, is_harry, light_count, terminal_lights};
use crate::pgn::{move_text, GameRecord, GameResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the operator to finish setting up the camera.
    AwaitingCalibration,
    AwaitingCapture,
    EvaluatingFrame,
    MoveApplied,
    NoMoveDetected,
    /// Checkmate or stalemate; only quitting remains.
    GameOver,
    Quitting,
}

/// Result of evaluating one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// A board was decoded. Without a move it is the raw decode, shown but
    /// never committed.
    Success {
        board: BoardState,
        detected: Option<DetectedMove>,
    },
    InputFailure(FrameError),
    /// No legal move explains the frame.
    AmbiguousDecode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NoMoveReason {
    InputFailure(FrameError),
    Ambiguous,
    /// Raw decode differs from the position but no move explains it.
    Unconfirmed(BoardState),
    /// Proposed move failed the legality check for the side to move.
    Rejected { uci: String, mirrored: bool },
    /// Legal move whose board one physical set cannot show.
    ImpossibleBoard { uci: String, reason: InvalidBoard },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveReport {
    pub uci: String,
    pub san: String,
    /// `12. e4` or `12... e5`.
    pub text: String,
    pub board_fen: String,
    pub lights: u8,
    pub critical: bool,
    pub harry: bool,
    pub result: Option<GameResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleReport {
    /// Nothing to do in this state.
    Inactive(SessionState),
    /// Debounce interval not elapsed yet.
    Idle,
    MoveApplied(MoveReport),
    NoMoveDetected {
        reason: NoMoveReason,
        /// SAN of every legal move in the unchanged position.
        legal_moves: Vec<String>,
    },
}

pub struct Session<R, E, S> {
    config: SpectatorConfig,
    disambiguator: Disambiguator,
    reader: R,
    evaluator: E,
    sink: S,
    position: Chess,
    record: GameRecord,
    state: SessionState,
    last_update: Option<Instant>,
}

/// Parse and sanity-check the first position of a session.
pub fn starting_position(fen: &str) -> Result<Chess, SpectatorError> {
    let parsed: Fen = fen
        .parse()
        .map_err(|e| SpectatorError::StartingPosition(format!("{fen:?}: {e}")))?;
    let position: Chess = parsed
        .into_position(CastlingMode::Standard)
        .map_err(|e| SpectatorError::StartingPosition(format!("{fen:?}: {e}")))?;
    check_playable(&position)?;
    Ok(position)
}

/// Play `mv` on a copy, keeping the result only if one physical set can
/// show it. Returns the new position and the move's SAN.
fn play_checked(position: &Chess, mv: Move) -> Result<(Chess, String), InvalidBoard> {
    let mut after = position.clone();
    let san = SanPlus::from_move_and_play_unchecked(&mut after, mv).to_string();
    validate(after.board())?;
    Ok((after, san))
}

fn check_playable(position: &Chess) -> Result<(), SpectatorError> {
    validate(position.board()).map_err(|reason| SpectatorError::StartingPosition(reason.to_string()))?;
    if position.legal_moves().is_empty() {
        return Err(SpectatorError::StartingPosition(
            "no legal moves in the starting position".into(),
        ));
    }
    Ok(())
}

impl<R, E, S> Session<R, E, S>
where
    R: BoardReader,
    E: PositionEvaluator,
    S: SignalSink,
{
    /// Create the session, resuming a saved game when configured, and
    /// show the first position with its evaluation.
    pub async fn start(
        config: SpectatorConfig,
        reader: R,
        evaluator: E,
        sink: S,
    ) -> Result<Self, SpectatorError> {
        let (record, position) = match &config.resume_pgn {
            Some(path) => {
                let pgn = tokio::fs::read_to_string(path).await?;
                let (record, position) = GameRecord::from_pgn(&pgn)?;
                check_playable(&position)?;
                info!(path = %path.display(), moves = record.len(), "Resuming saved game");
                (record, position)
            }
            None => {
                let position = starting_position(&config.starting_fen)?;
                (GameRecord::new(position.clone()), position)
            }
        };

        let mut session = Self {
            disambiguator: Disambiguator::new(config.min_move_gain),
            config,
            reader,
            evaluator,
            sink,
            position,
            record,
            state: SessionState::AwaitingCalibration,
            last_update: None,
        };
        session.show_start().await;
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn position(&self) -> &Chess {
        &self.position
    }

    pub fn board(&self) -> BoardState {
        BoardState::from_board(self.position.board())
    }

    pub fn record(&self) -> &GameRecord {
        &self.record
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Operator finished calibrating; captures start after one interval.
    pub fn calibrate(&mut self, now: Instant) {
        if self.state == SessionState::AwaitingCalibration {
            info!("Calibration done, watching the board");
            self.state = SessionState::AwaitingCapture;
            self.last_update = Some(now);
        }
    }

    /// Back to calibration, e.g. when the camera was bumped.
    pub fn pause(&mut self) {
        if self.state == SessionState::AwaitingCapture {
            info!("Paused for calibration");
            self.state = SessionState::AwaitingCalibration;
        }
    }

    /// A capture is allowed at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        self.state == SessionState::AwaitingCapture
            && self
                .last_update
                .map_or(true, |last| now.saturating_duration_since(last) >= self.config.board_update_interval)
    }

    /// Run one decision cycle if the debounce interval has elapsed.
    pub async fn tick(&mut self, now: Instant) -> CycleReport {
        if self.state != SessionState::AwaitingCapture {
            return CycleReport::Inactive(self.state);
        }
        if !self.is_due(now) {
            return CycleReport::Idle;
        }

        self.state = SessionState::EvaluatingFrame;
        let outcome = self.evaluate_frame().await;
        self.last_update = Some(now);

        let report = match outcome {
            FrameOutcome::Success {
                detected: Some(detected),
                ..
            } => match self.apply(detected).await {
                Ok(report) => CycleReport::MoveApplied(report),
                Err(reason) => self.no_move(reason),
            },
            FrameOutcome::Success { board, detected: None } => self.no_move(NoMoveReason::Unconfirmed(board)),
            FrameOutcome::InputFailure(err) => self.no_move(NoMoveReason::InputFailure(err)),
            FrameOutcome::AmbiguousDecode => self.no_move(NoMoveReason::Ambiguous),
        };

        if self.state != SessionState::GameOver {
            self.state = SessionState::AwaitingCapture;
        }
        report
    }

    /// Read and disambiguate one frame without touching session state.
    pub async fn evaluate_frame(&mut self) -> FrameOutcome {
        let frame = match self.reader.read_board().await {
            Ok(frame) => frame,
            Err(err) => return FrameOutcome::InputFailure(err),
        };

        let inference = self.disambiguator.infer(
            &frame,
            self.config.orientation,
            Some(&self.position),
            self.config.must_detect_move,
        );
        match inference.detected {
            Some(detected) => FrameOutcome::Success {
                board: inference.board,
                detected: Some(detected),
            },
            None if inference.board == self.board() => FrameOutcome::AmbiguousDecode,
            None => FrameOutcome::Success {
                board: inference.board,
                detected: None,
            },
        }
    }

    async fn apply(&mut self, detected: DetectedMove) -> Result<MoveReport, NoMoveReason> {
        self.state = SessionState::MoveApplied;
        let mv = self.promotion_choice(detected.mv);

        let uci = mv.to_uci(CastlingMode::Standard).to_string();
        if !self.position.is_legal(mv) {
            if detected.mirrored {
                warn!(%uci, "Move found for the side not on turn, ignoring");
            } else {
                error!(%uci, fen = %self.fen(), "Rules engine rejected a proposed move");
            }
            return Err(NoMoveReason::Rejected {
                uci,
                mirrored: detected.mirrored,
            });
        }

        let (after, san) = play_checked(&self.position, mv).map_err(|reason| {
            error!(%uci, %reason, "Move leads to a board one set cannot show");
            NoMoveReason::ImpossibleBoard {
                uci: uci.clone(),
                reason,
            }
        })?;
        let text = move_text(&self.position, &san);
        self.position = after;
        self.record.push(san.clone());
        let board_fen = self.board().board_fen();
        info!(%uci, %san, board = %board_fen, gain = detected.gain, "Move applied");

        let result = GameResult::of(&self.position);
        if let Some(result) = result {
            self.record.finish(result);
        }
        if let Err(err) = self.record.save(&self.config.pgn_path).await {
            warn!(error = %err, path = %self.config.pgn_path.display(), "Failed to write PGN");
        }

        self.sink.emit(Directive::ShowBoard {
            board_fen: board_fen.clone(),
            last_move: Some(uci.clone()),
        });
        self.sink.emit(Directive::AnnounceMove {
            text: text.clone(),
            san: san.clone(),
        });

        let (lights, critical, harry) = match result {
            Some(result) => {
                info!(%result, "Game over");
                self.state = SessionState::GameOver;
                let lights = terminal_lights(result.winner());
                self.sink.emit(Directive::SetLights(lights));
                self.sink.emit(match result.winner() {
                    Some(winner) => Directive::Checkmate { winner },
                    None => Directive::Stalemate,
                });
                (lights, false, false)
            }
            None => {
                let lines = self.evaluate_position().await;
                let (lights, critical) = self.emit_evaluation(&lines);
                // A critical moment takes the announcement slot.
                let harry = !critical && is_harry(&mv, &lines);
                if harry {
                    self.sink.emit(Directive::Harry);
                }
                (lights, critical, harry)
            }
        };

        Ok(MoveReport {
            uci,
            san,
            text,
            board_fen,
            lights,
            critical,
            harry,
            result,
        })
    }

    /// Queen instead of the detected promotion piece when configured, unless
    /// the set has no queen left for it.
    fn promotion_choice(&self, detected: Move) -> Move {
        let Move::Normal {
            role,
            from,
            capture,
            to,
            promotion: Some(piece),
        } = detected
        else {
            return detected;
        };
        if !self.config.auto_promotion_to_queen || piece == Role::Queen {
            return detected;
        }
        let queened = Move::Normal {
            role,
            from,
            capture,
            to,
            promotion: Some(Role::Queen),
        };
        if self.position.is_legal(queened) && play_checked(&self.position, queened).is_err() {
            info!(
                uci = %detected.to_uci(CastlingMode::Standard),
                "No spare queen, keeping the detected promotion"
            );
            return detected;
        }
        queened
    }

    fn no_move(&mut self, reason: NoMoveReason) -> CycleReport {
        self.state = SessionState::NoMoveDetected;
        let legal_moves: Vec<String> = self
            .position
            .legal_moves()
            .iter()
            .map(|mv| San::from_move(&self.position, *mv).to_string())
            .collect();
        info!(?reason, "No move detected, board unchanged");
        debug!(legal = %legal_moves.join(" "), "Legal moves");
        CycleReport::NoMoveDetected { reason, legal_moves }
    }

    async fn evaluate_position(&mut self) -> Vec<CandidateLine> {
        match self.evaluator.evaluate(&self.position).await {
            Ok(lines) => lines,
            Err(err) => {
                warn!(error = %err, "Position evaluation failed");
                Vec::new()
            }
        }
    }

    /// Lights plus critical-moment signal for the current position.
    fn emit_evaluation(&mut self, lines: &[CandidateLine]) -> (u8, bool) {
        let lights = light_count(lines, self.position.turn());
        let critical = is_critical(lines, self.position.legal_moves().len(), self.config.critical_gap);
        self.sink.emit(Directive::SetLights(lights));
        if critical {
            info!("Critical moment");
            self.sink.emit(Directive::CriticalMoment);
        }
        (lights, critical)
    }

    async fn show_start(&mut self) {
        self.sink.emit(Directive::ShowBoard {
            board_fen: self.board().board_fen(),
            last_move: None,
        });
        let lines = self.evaluate_position().await;
        self.emit_evaluation(&lines);
    }

    fn fen(&self) -> String {
        Fen::from_position(&self.position, shakmaty::EnPassantMode::Legal).to_string()
    }

    /// Flush history, release the evaluator, and hand back the PGN.
    pub async fn quit(&mut self) -> Result<String, SpectatorError> {
        if self.state == SessionState::Quitting {
            return Ok(self.record.to_pgn());
        }
        self.state = SessionState::Quitting;
        self.sink.emit(Directive::Shutdown);

        let saved = if self.record.is_empty() {
            Ok(())
        } else {
            self.record.save(&self.config.pgn_path).await
        };
        self.evaluator.quit().await;
        saved?;

        info!(moves = self.record.len(), "Session closed");
        Ok(self.record.to_pgn())
    }
}
