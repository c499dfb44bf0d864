//! Client identities whose private key never enters this process.
//!
//! With a custom key operation the caller supplies a certificate and a
//! [`KeyOperationHandler`] which performs signatures on the TLS stack's
//! behalf, for example by forwarding them to an HSM or a remote signing
//! service.
//!
//! The certificate can be given inline or as a path to a PEM file, but
//! not both. A file is read in full when the options are built and the
//! bytes are released as soon as the backend has consumed them.

use rustls::{SignatureAlgorithm, SignatureScheme};
use std::borrow::Cow;
use std::sync::Arc;
use thiserror::Error;

use crate::buffer::{Buffer, OwnedText};
use crate::error::{Result, TlsOptionsError};

/// Error returned by a [`KeyOperationHandler`].
#[derive(Debug, Error)]
#[error("key operation failed: {0}")]
pub struct KeyOperationError(pub String);

/// Performs private key operations for a client identity.
pub trait KeyOperationHandler: Send + Sync + std::fmt::Debug {
    /// Algorithm of the key, as found in the certificate.
    fn algorithm(&self) -> SignatureAlgorithm;

    /// Signature schemes the handler can produce, most preferred first.
    fn supported_schemes(&self) -> &[SignatureScheme];

    /// Sign `message` using `scheme`, which is always one of
    /// [`KeyOperationHandler::supported_schemes`].
    fn sign(
        &self,
        scheme: SignatureScheme,
        message: &[u8],
    ) -> Result<Vec<u8>, KeyOperationError>;
}

/// Raw description of a custom key operation identity, borrowed from the
/// caller for the duration of the build.
#[derive(Clone, Debug)]
pub struct CustomKeyOperationInputs<'a> {
    /// Performs the signatures.
    pub handler: Arc<dyn KeyOperationHandler>,
    /// Path to a PEM certificate chain.
    pub certificate_file_path: Option<&'a [u8]>,
    /// PEM certificate chain.
    pub certificate_file_contents: Option<&'a [u8]>,
}

impl<'a> CustomKeyOperationInputs<'a> {
    /// A descriptor with no certificate yet.
    pub fn new(handler: Arc<dyn KeyOperationHandler>) -> Self {
        Self {
            handler,
            certificate_file_path: None,
            certificate_file_contents: None,
        }
    }

    /// Read the certificate chain from a PEM file.
    pub fn with_certificate_file_path(mut self, path: &'a [u8]) -> Self {
        self.certificate_file_path = Some(path);
        self
    }

    /// Use this PEM certificate chain.
    pub fn with_certificate_file_contents(mut self, contents: &'a [u8]) -> Self {
        self.certificate_file_contents = Some(contents);
        self
    }
}

/// Where the certificate of a custom key operation identity comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CertificateSource {
    /// PEM certificate chain given directly.
    Inline(Buffer),
    /// PEM certificate chain in a file.
    Path(OwnedText),
}

impl CertificateSource {
    /// Choose between the path and the inline contents. Exactly one must
    /// be present.
    pub fn from_inputs(inputs: &CustomKeyOperationInputs<'_>) -> Result<Self> {
        match (
            inputs.certificate_file_path,
            inputs.certificate_file_contents,
        ) {
            (Some(_), Some(_)) => Err(TlsOptionsError::MutuallyExclusiveConfig),
            (None, None) => Err(TlsOptionsError::MissingCertificate),
            (None, Some(contents)) => Ok(Self::Inline(Buffer::from_raw(
                "certificateFileContents",
                contents,
            )?)),
            (Some(path), None) => Ok(Self::Path(OwnedText::from_raw(
                "certificateFilePath",
                path,
            )?)),
        }
    }

    /// The certificate bytes. A path is read synchronously into a
    /// temporary buffer owned by the returned value.
    pub fn load(&self) -> Result<Cow<'_, [u8]>> {
        match self {
            Self::Inline(buffer) => Ok(Cow::Borrowed(buffer.as_bytes())),
            Self::Path(path) => std::fs::read(path.as_path())
                .map(Cow::Owned)
                .map_err(|source| TlsOptionsError::FileIo {
                    path: path.as_path().to_path_buf(),
                    source,
                }),
        }
    }
}
