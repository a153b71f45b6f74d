//! Error types for the tail-file library.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for tailing operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors when opening, reading or seeking the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File watching errors from the notify crate.
    #[error("File watcher error: {0}")]
    Watcher(#[from] notify::Error),

    /// The file was opened but its metadata could not be read.
    #[error("Failed to stat {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File path errors.
    #[error("Invalid file path: {message}")]
    InvalidPath { message: String },

    /// The followed file was truncated or replaced. Reopen the path to continue.
    #[error("File rotated: {}", path.display())]
    Rotated { path: PathBuf },

    /// The file has been closed.
    #[error("File closed")]
    Closed,
}

impl Error {
    /// Returns true if this error signals that the file should be reopened.
    pub fn is_rotated(&self) -> bool {
        matches!(self, Error::Rotated { .. })
    }

    /// Returns true if the handle was closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::Closed)
    }
}

/// A convenient Result type for tailing operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_io_error_conversion() {
        let io_error = IoError::new(ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();

        match error {
            Error::Io(_) => {}
            _ => panic!("Expected Error::Io variant"),
        }

        assert!(error.to_string().contains("I/O error"));
        assert!(error.to_string().contains("File not found"));
    }

    #[test]
    fn test_watcher_error_conversion() {
        let notify_error = notify::Error::generic("Test watcher error");
        let error: Error = notify_error.into();

        match error {
            Error::Watcher(_) => {}
            _ => panic!("Expected Error::Watcher variant"),
        }

        assert!(error.to_string().contains("File watcher error"));
        assert!(error.to_string().contains("Test watcher error"));
    }

    #[test]
    fn test_stat_error_keeps_source() {
        let error = Error::Stat {
            path: PathBuf::from("/var/log/app.log"),
            source: IoError::new(ErrorKind::PermissionDenied, "Access denied"),
        };

        assert_eq!(
            error.to_string(),
            "Failed to stat /var/log/app.log: Access denied"
        );
        let source = std::error::Error::source(&error).expect("stat error has a source");
        assert_eq!(source.to_string(), "Access denied");
    }

    #[test]
    fn test_invalid_path_error() {
        let error = Error::InvalidPath {
            message: "path has no file name".to_string(),
        };

        assert_eq!(error.to_string(), "Invalid file path: path has no file name");
    }

    #[test]
    fn test_rotated_error() {
        let error = Error::Rotated {
            path: PathBuf::from("/var/log/app.log"),
        };

        assert_eq!(error.to_string(), "File rotated: /var/log/app.log");
        assert!(error.is_rotated());
        assert!(!error.is_closed());
    }

    #[test]
    fn test_closed_error() {
        let error = Error::Closed;
        assert_eq!(error.to_string(), "File closed");
        assert!(error.is_closed());
        assert!(!error.is_rotated());
        assert_eq!(format!("{:?}", error), "Closed");
    }

    #[test]
    fn test_error_chain_with_io_error() {
        let io_error = IoError::new(ErrorKind::PermissionDenied, "Access denied");
        let error: Error = io_error.into();

        match &error {
            Error::Io(inner) => {
                assert_eq!(inner.kind(), ErrorKind::PermissionDenied);
                assert_eq!(inner.to_string(), "Access denied");
            }
            _ => panic!("Expected Error::Io variant"),
        }
    }

    #[test]
    fn test_error_send_sync_traits() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
