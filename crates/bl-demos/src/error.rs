//! Error types for the demo layer.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can end a demo early, from a bad config file to a lost link.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to read config file: {path}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("Config validation failed: {0}")]
    Validation(String),

    #[error("Registry error: {0}")]
    Registry(#[from] bl_registry::RegistryError),

    #[error("Failed to spawn {name} thread")]
    Spawn {
        name: String,
        source: std::io::Error,
    },

    #[error("Worker thread {0} panicked")]
    WorkerPanicked(String),

    #[error("Demo already started")]
    AlreadyStarted,
}

/// Result type for bl-demos operations.
pub type AppResult<T> = Result<T, AppError>;
