//! Error taxonomy for the retrieval pipeline.
//!
//! Every failure path of [`crate::retrieve`] returns one of these variants.
//! A filter that removes every line is *not* an error; it is reported as
//! [`crate::models::RetrievalOutcome::NoMatch`].

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Path or pattern refused by the validator. No I/O was performed.
    #[error("invalid request for '{payload}': {reason}")]
    ValidationRejected { payload: String, reason: String },

    /// Target file does not exist.
    #[error("log file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// Target exists but could not be read (permissions, directory, I/O error).
    #[error("failed to read last {window_lines} lines of {}: {source}", .path.display())]
    ReadFailure {
        path: PathBuf,
        window_lines: usize,
        #[source]
        source: std::io::Error,
    },

    /// Target could not be resolved or probed (permissions, I/O error)
    /// outside of a tail read.
    #[error("cannot access {}: {source}", .path.display())]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Extraction succeeded but produced no bytes (empty file).
    #[error("log file is empty: {}", .path.display())]
    EmptyWindow { path: PathBuf },

    /// Extraction did not finish within the configured deadline.
    #[error("extraction of {} timed out after {secs}s", .path.display())]
    Timeout { path: PathBuf, secs: u64 },

    /// All retrieval slots stayed busy for the whole deadline.
    #[error("too many concurrent retrievals, gave up after {secs}s")]
    Busy { secs: u64 },

    /// Corrupt block, truncated data, or length mismatch.
    #[error("codec error: {0}")]
    Codec(String),
}

impl RetrievalError {
    pub(crate) fn rejected(payload: &str, reason: impl Into<String>) -> Self {
        RetrievalError::ValidationRejected {
            payload: payload.to_string(),
            reason: reason.into(),
        }
    }

    /// Map an I/O error on `path` to `NotFound` or `ReadFailure`.
    pub(crate) fn from_io(path: PathBuf, window_lines: usize, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            RetrievalError::NotFound { path }
        } else {
            RetrievalError::ReadFailure {
                path,
                window_lines,
                source: err,
            }
        }
    }

    /// Map an I/O error outside of extraction to `NotFound` or `Inaccessible`.
    pub(crate) fn inaccessible(path: PathBuf, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            RetrievalError::NotFound { path }
        } else {
            RetrievalError::Inaccessible { path, source: err }
        }
    }
}

pub type Result<T> = std::result::Result<T, RetrievalError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_io_mapping() {
        let path = PathBuf::from("/data/app.log");

        let err = RetrievalError::inaccessible(path.clone(), Error::from(ErrorKind::NotFound));
        assert!(matches!(err, RetrievalError::NotFound { .. }));

        let err = RetrievalError::inaccessible(
            path.clone(),
            Error::from(ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, RetrievalError::Inaccessible { .. }));
        assert!(err.to_string().starts_with("cannot access /data/app.log"));
        assert!(!err.to_string().contains("lines"));

        let err = RetrievalError::from_io(path, 25, Error::from(ErrorKind::PermissionDenied));
        assert!(err.to_string().contains("last 25 lines"));
    }
}
