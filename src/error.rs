use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Worker {worker_id} failed: {source}")]
    Worker {
        worker_id: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("Worker panicked: {0}")]
    Panic(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Returns true if this error only signals cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
