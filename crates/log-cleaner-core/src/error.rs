use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid file pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Log directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Error reading directory tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("{0}")]
    Other(String),
}
