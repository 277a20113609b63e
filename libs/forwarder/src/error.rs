use std::fmt;
use std::io;

use thiserror::Error;

use crate::transcript::Transcript;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to apply deadline: {0}")]
    DeadlineApplicationFailed(#[source] io::Error),

    #[error("write failed: {0}")]
    WriteFailed(#[source] io::Error),

    #[error("read failed: {0}")]
    ReadFailed(#[source] io::Error),

    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Invalid url: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Custom(String),
}

impl Error {
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Whether the failure was caused by the call's deadline elapsing
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::DeadlineApplicationFailed(e)
            | Error::WriteFailed(e)
            | Error::ReadFailed(e)
            | Error::Io(e) => e.kind() == io::ErrorKind::TimedOut,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A failed request together with every transcript line produced before the failure
#[derive(Debug)]
pub struct RequestFailure {
    pub transcript: Transcript,
    pub error: Error,
}

impl RequestFailure {
    pub fn new(transcript: Transcript, error: Error) -> Self {
        Self { transcript, error }
    }

    pub fn is_timeout(&self) -> bool {
        self.error.is_timeout()
    }

    pub fn into_parts(self) -> (Transcript, Error) {
        (self.transcript, self.error)
    }
}

impl fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if !self.transcript.is_empty() {
            write!(f, "\n{}", self.transcript)?;
        }
        Ok(())
    }
}

impl std::error::Error for RequestFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
