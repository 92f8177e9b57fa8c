//! Brickfall headless runner
//!
//! Plays the simulation on autopilot for a fixed wall-clock span, saves the
//! session, and prints the final frame as JSON.

use std::{
    error::Error,
    path::PathBuf,
    time::{Duration, Instant},
};

use brickfall::{GameLoop, GameSession, Settings, SharedSession, sim::GameEvent};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Run the block breaker simulation headless", version)]
struct Args {
    /// JSON settings file (defaults when missing)
    #[arg(long)]
    config: Option<PathBuf>,
    /// How long to run, in seconds
    #[arg(long, default_value_t = 10)]
    seconds: u64,
    /// Ignore any existing save
    #[arg(long)]
    fresh: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let mut game_loop = GameLoop::new(settings.fps)?;

    let mut session = GameSession::new(settings);
    if !args.fresh {
        // A bad save already fell back to a fresh game
        if let Err(err) = session.load() {
            log::warn!("Ignoring unreadable save: {err}");
        }
    }
    session.set_autopilot(true);

    let (shared, events) = SharedSession::new(session);
    game_loop.start(shared.clone())?;

    let deadline = Instant::now() + Duration::from_secs(args.seconds);
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match events.recv_timeout(remaining) {
            Ok(event) => {
                log::debug!("{event:?}");
                if matches!(event, GameEvent::GameOver { .. } | GameEvent::GameWon { .. }) {
                    break;
                }
            }
            Err(_) => break,
        }
    }
    game_loop.stop();

    let frame = shared.frame();
    shared.with(|session| {
        if frame.phase.is_finished() {
            // Nothing to resume
            session.store().delete()
        } else {
            session.save()
        }
    })?;
    log::info!(
        "Finished on level {} with score {} and {} lives",
        frame.level,
        frame.score,
        frame.lives
    );
    println!("{}", serde_json::to_string_pretty(frame.as_ref())?);
    Ok(())
}
