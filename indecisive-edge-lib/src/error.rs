use thiserror::Error;

/// Errors that can occur in the edge gateway
#[derive(Error, Debug)]
pub enum EdgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Locale settings error: {0}")]
    Locale(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid URI: {0}")]
    InvalidUri(#[from] http::uri::InvalidUri),
}

pub type Result<T> = std::result::Result<T, EdgeError>;
