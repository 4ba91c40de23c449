use std::{io, path::PathBuf};

use thiserror::Error;
use tokio::task::JoinError;

pub type Result<T> = std::result::Result<T, PlaygroundError>;

#[derive(Debug, Error)]
pub enum PlaygroundError {
    #[error("failed to start execution context: {0}")]
    Runtime(#[source] io::Error),

    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),

    #[error("failed to read config at {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config at {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("launcher is not running")]
    LauncherClosed,

    #[error("launcher already started")]
    AlreadyStarted,

    #[error("task did not finish: {0}")]
    Join(#[from] JoinError),

    /// Raised on purpose inside a task body and caught there.
    #[error("simulated failure in {0}")]
    Simulated(String),
}
