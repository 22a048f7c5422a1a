use thiserror::Error;

pub type Result<T> = std::result::Result<T, GitownError>;

#[derive(Error, Debug)]
pub enum GitownError {
    #[error("git executable not found: {0}")]
    GitMissing(String),
    #[error("Git error: {0}")]
    Git(String),
    #[error("Command timed out after {0}s: {1}")]
    Timeout(u64, String),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Run error: {0}")]
    Run(String),
}
