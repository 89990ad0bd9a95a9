mod config;
mod control;
mod error;
mod game;
mod grid;
mod render;
mod snake;
mod term;

use std::{
    fs::File,
    process::exit,
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::control::Control;
use crate::error::GameError;
use crate::game::{play_with_input, Outcome};
use crate::term::{TermCanvas, TermKeys, TermSession};

pub type TermInt = u16;
pub type Coords = (u16, u16);

fn main() -> Result<()> {
    let config = Config::from_env().context("failed to read configuration")?;
    init_tracing(&config)?;

    let outcome = run(&config)?;

    if outcome.interrupted {
        println!("use sigint exit! score: {}", outcome.score);
    } else if outcome.dead {
        println!("You're dead! score: {}", outcome.score);
    } else {
        println!("score: {}", outcome.score);
    }
    Ok(())
}

fn run(config: &Config) -> Result<Outcome> {
    let session = Arc::new(TermSession::enter().context("cannot start without raw mode")?);
    // The signal handler keeps its own handle, so restore on every way out
    // of this function rather than on the last drop.
    let _restore = session.guard();

    let control = Arc::new(Control::new(config));
    install_signal_handler(Arc::clone(&session), Arc::clone(&control))?;

    let canvas = Arc::new(Mutex::new(TermCanvas::new()));
    let outcome = play_with_input(config, control, TermKeys, canvas)?;
    info!(score = outcome.score, "shut down");
    Ok(outcome)
}

/// The first SIGINT/SIGTERM asks both threads to stop. A second one, if the
/// game is still running, restores the terminal and exits on the spot.
fn install_signal_handler(session: Arc<TermSession>, control: Arc<Control>) -> Result<()> {
    ctrlc::set_handler(move || {
        if !control.interrupt() {
            info!("termination signal, shutting down");
            return;
        }
        session.restore();
        println!("use sigint exit!");
        exit(0);
    })
    .map_err(GameError::from)?;
    Ok(())
}

/// Logs go to `SNAKE_LOG` when set; stdout belongs to the board.
fn init_tracing(config: &Config) -> Result<()> {
    let path = match &config.log_file {
        Some(path) => path,
        None => return Ok(()),
    };

    let file = File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(())
}
