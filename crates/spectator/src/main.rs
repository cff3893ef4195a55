//! Spectator
//!
//! Watches a physical game through pre-recorded classifier frames, tracks
//! the position move by move, and writes the PGN as it goes.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use spectator::{
    CycleReport, FrameError, NoMoveReason, ReplayReader, Session, SessionState, SpectatorConfig,
    SpectatorError, StockfishEngine, TracingSink,
};
use tracing::info;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Parse --frames path/to/frames.json from CLI args
fn parse_frames_path() -> Option<PathBuf> {
    let args: Vec<String> = std::env::args().collect();
    args.iter()
        .position(|arg| arg == "--frames")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    let config = SpectatorConfig::load()?;
    info!(
        orientation = %config.orientation,
        must_detect_move = config.must_detect_move,
        interval_secs = config.board_update_interval.as_secs_f64(),
        stockfish = config.stockfish_path.as_deref().unwrap_or("disabled"),
        "Spectator config loaded"
    );

    let frames = parse_frames_path().ok_or(SpectatorError::Config("--frames <path> is required"))?;
    let reader = ReplayReader::load(&frames).await?;
    info!(path = %frames.display(), frames = reader.remaining(), "Loaded recorded frames");

    let evaluator = match &config.stockfish_path {
        Some(path) => Some(StockfishEngine::new(path, config.nodes_per_position, config.multipv).await?),
        None => None,
    };

    let mut session = Session::start(config, reader, evaluator, TracingSink).await?;
    session.calibrate(Instant::now());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut poll = tokio::time::interval(POLL_INTERVAL);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Quit requested");
                break;
            }
            _ = poll.tick() => {
                match session.tick(Instant::now()).await {
                    CycleReport::NoMoveDetected {
                        reason: NoMoveReason::InputFailure(FrameError::Exhausted),
                        ..
                    } => {
                        info!("No more recorded frames");
                        break;
                    }
                    CycleReport::Inactive(SessionState::GameOver) => break,
                    _ => {}
                }
            }
        }
    }

    let pgn = session.quit().await?;
    if !session.record().is_empty() {
        println!("{pgn}");
    }
    Ok(())
}
