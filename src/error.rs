use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("failed to configure terminal: {0}")]
    Terminal(#[source] io::Error),
    #[error("failed to draw: {0}")]
    Draw(#[source] io::Error),
    #[error("failed to read keyboard input: {0}")]
    Input(#[source] io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error("input thread panicked")]
    InputPanicked,
}

pub type Result<T> = std::result::Result<T, GameError>;
