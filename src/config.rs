use std::{env, path::PathBuf};

use crate::error::{GameError, Result};
use crate::{Coords, TermInt};

pub const SEED_ENV: &str = "SNAKE_SEED";
pub const LOG_ENV: &str = "SNAKE_LOG";

/// Tunables for one game. The defaults describe the classic 40x30 board.
#[derive(Debug, Clone)]
pub struct Config {
    pub width: TermInt,
    pub height: TermInt,
    pub initial_length: TermInt,
    pub origin: Coords,
    pub tick_interval_ms: u64,
    pub min_tick_interval_ms: u64,
    pub tick_step_ms: u64,
    /// Number of foods eaten between two full border redraws.
    pub resync_every: u32,
    pub seed: Option<u64>,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            width: 40,
            height: 30,
            initial_length: 3,
            origin: (0, 0),
            tick_interval_ms: 100,
            min_tick_interval_ms: 20,
            tick_step_ms: 10,
            resync_every: 3,
            seed: None,
            log_file: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Some(raw) = env::var_os(SEED_ENV) {
            let raw = raw.to_string_lossy();
            let seed = raw
                .trim()
                .parse::<u64>()
                .map_err(|err| GameError::Config(format!("{}={:?}: {}", SEED_ENV, raw, err)))?;
            config.seed = Some(seed);
        }

        config.log_file = env::var_os(LOG_ENV).filter(|v| !v.is_empty()).map(PathBuf::from);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.initial_length < 2 {
            return Err(GameError::Config(format!(
                "initial snake length must be at least 2, got {}",
                self.initial_length
            )));
        }
        if self.height == 0 || self.width <= self.initial_length {
            return Err(GameError::Config(format!(
                "a {}x{} grid cannot hold a snake of length {}",
                self.width, self.height, self.initial_length
            )));
        }
        if self.origin.0 >= self.width || self.origin.1 >= self.height {
            return Err(GameError::Config(format!(
                "snake origin {:?} lies outside the grid",
                self.origin
            )));
        }
        if self.min_tick_interval_ms == 0 || self.tick_interval_ms < self.min_tick_interval_ms {
            return Err(GameError::Config(format!(
                "tick interval {}ms is below the floor of {}ms",
                self.tick_interval_ms, self.min_tick_interval_ms
            )));
        }
        if self.resync_every == 0 {
            return Err(GameError::Config("resync_every must be positive".into()));
        }
        Ok(())
    }
}
