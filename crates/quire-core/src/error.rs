use thiserror::Error;

use crate::state::ManuscriptState;

#[derive(Error, Debug)]
pub enum QuireError {
    #[error("Cannot apply {decision} to a manuscript in {state}")]
    InvalidTransition {
        state: ManuscriptState,
        decision: String,
    },

    #[error("Unknown code: {0}")]
    UnknownCode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, QuireError>;
