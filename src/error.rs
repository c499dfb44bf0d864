//! Error types for building TLS context options.

use std::path::PathBuf;
use thiserror::Error;

use crate::backend::BackendError;

/// Result type alias using [`TlsOptionsError`].
pub type Result<T, E = TlsOptionsError> = std::result::Result<T, E>;

/// Why a raw caller-supplied value could not be copied into an owned buffer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversionFailure {
    /// Text inputs must be UTF-8.
    #[error("not valid UTF-8 at byte offset {0}")]
    InvalidUtf8(usize),
    /// Text inputs are handed to the backend as native strings.
    #[error("contains a NUL byte at offset {0}")]
    InteriorNul(usize),
}

/// Error type returned while building or querying TLS context options.
#[derive(Debug, Error)]
pub enum TlsOptionsError {
    /// A raw input could not be copied into a buffer owned by the options.
    #[error("failed to get {field} string: {reason}")]
    Conversion {
        /// Name of the input field.
        field: &'static str,
        /// What was wrong with it.
        reason: ConversionFailure,
    },
    /// A custom key operation was given both a certificate path and
    /// certificate contents.
    #[error(
        "Custom key operation handler: cannot have both certificate file path and certificate contents!"
    )]
    MutuallyExclusiveConfig,
    /// A custom key operation was given no certificate at all.
    #[error("Custom key operation handler: No certificate set!")]
    MissingCertificate,
    /// The certificate file for a custom key operation could not be read.
    #[error("Custom key operation handler: failed to read certificate file {}: {source}", path.display())]
    FileIo {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The TLS backend rejected the supplied material.
    #[error("{operation} failed: {source}")]
    BackendInit {
        /// Name of the backend operation that failed.
        operation: &'static str,
        /// Backend-specific cause.
        #[source]
        source: BackendError,
    },
    /// An enumerated value from the caller was out of range.
    #[error("{what} is out of range: {value}")]
    InvalidArgument {
        /// Which enumeration the value was meant to belong to.
        what: &'static str,
        /// The offending raw value.
        value: i32,
    },
}

impl TlsOptionsError {
    pub(crate) fn conversion(field: &'static str, reason: ConversionFailure) -> Self {
        Self::Conversion { field, reason }
    }

    pub(crate) fn backend(operation: &'static str) -> impl FnOnce(BackendError) -> Self {
        move |source| Self::BackendInit { operation, source }
    }
}
