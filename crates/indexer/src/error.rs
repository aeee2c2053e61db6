use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Processor is missing required stage: {0}")]
    MissingStage(&'static str),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl IndexerError {
    /// Scan errors that mean "the root is unusable" rather than a systemic fault.
    pub const fn is_bad_root(&self) -> bool {
        matches!(self, Self::DirectoryNotFound(_) | Self::NotADirectory(_))
    }
}

/// Errors raised while constructing configuration values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("allowed extension set must not be empty")]
    EmptyExtensions,
}
