use thiserror::Error;

pub type RampartResult<T> = Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Throttled by AWS: {0}")]
    Throttling(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("aws cli exited with status {status}: {stderr}")]
    Aws { status: i32, stderr: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl Error {
    /// Whether a batch loop may record this error per-group and continue.
    ///
    /// Credential, validation, and config errors are fatal for the whole
    /// invocation; per-group API failures are not.
    pub fn is_batch_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Permission(_) | Error::Throttling(_) | Error::NotFound(_) | Error::Aws { .. }
        )
    }
}
