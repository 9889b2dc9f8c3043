//! Worker error types

use arbiter_sdk::SdkError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to read {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Decision engine error: {0}")]
    Engine(#[from] SdkError),
}

pub type Result<T> = std::result::Result<T, WorkerError>;
