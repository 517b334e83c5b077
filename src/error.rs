use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No recognized content format in the response: {0}")]
    ResponseShape(String),

    #[error("Empty code was generated")]
    EmptyArtifact,

    #[error("Generation service error (status {}): {body}", .status.map(|s| s.to_string()).unwrap_or_else(|| "none".to_string()))]
    Service { status: Option<u16>, body: String },

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl From<notify::Error> for CompilerError {
    fn from(err: notify::Error) -> Self {
        CompilerError::Watch(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CompilerError>;
