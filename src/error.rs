//! Error types for listmonk-backup
//!
//! The run distinguishes four failure classes:
//! - configuration problems, fatal before any network call
//! - transport failures on an API call, isolated to the resource being backed up
//! - local I/O failures while writing backups or reports
//! - mail delivery failures, reported separately through [`MailError`] and never fatal
//!
//! A failed media download is not an error value at all: the client returns `None`
//! and the synchronizer marks the item as having no local copy.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for listmonk-backup operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for listmonk-backup
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "LISTMONK_URL")
        key: Option<String>,
    },

    /// Connection-level failure talking to the remote API (DNS, refused, TLS, timeout)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A collection endpoint answered with a non-success status
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        /// Endpoint that was requested (e.g., "campaigns")
        endpoint: String,
        /// HTTP status code returned by the server
        status: u16,
    },

    /// Response body did not match the shape declared for the endpoint
    #[error("unexpected response shape from {endpoint}: expected {expected}")]
    UnexpectedShape {
        /// Endpoint whose body was malformed
        endpoint: String,
        /// Description of the expected JSON path (e.g., "data.results array")
        expected: &'static str,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Could not create a directory or write a file at a known path
    #[error("failed to write {path}: {source}")]
    WriteFailed {
        /// The file or directory that could not be written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// CSV serialization failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Build a configuration error tied to a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Build a [`Error::WriteFailed`] for `path`
    pub fn write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::WriteFailed {
            path: path.into(),
            source,
        }
    }
}

/// Errors from the mail sender collaborator
///
/// Mail delivery happens after the report is saved, so none of these abort a run.
#[derive(Debug, Error)]
pub enum MailError {
    /// No recipient configured
    #[error("no recipient defined in MAIL_TO")]
    MissingRecipient,

    /// A sender or recipient address could not be parsed
    #[error("invalid mail address {address:?}: {reason}")]
    InvalidAddress {
        /// The address as configured
        address: String,
        /// Parser message
        reason: String,
    },

    /// The message could not be assembled
    #[error("failed to build message: {0}")]
    Build(String),

    /// The SMTP exchange failed
    #[error("SMTP delivery failed: {0}")]
    Transport(String),
}
