//! Interface to the TLS implementation that consumes the options.
//!
//! A [`TlsBackend`] owns the knowledge of how client identities, trust
//! stores and protocol settings are represented for one TLS library. The
//! builder in [`crate::options`] drives it through a fixed sequence of
//! calls on a backend-specific [`TlsBackend::Options`] value and finally
//! hands the result to [`TlsBackend::create_context`].
//!
//! Every `init_client_*` operation starts from a freshly initialised
//! client configuration: whatever trust store override, ALPN list or
//! protocol settings were previously applied to the options are reset to
//! the backend's defaults. Callers must therefore apply trust overrides
//! and common settings after the identity.
//!
//! Releasing backend resources is the job of `Drop` on
//! [`TlsBackend::Options`] and [`TlsBackend::Context`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::alpn::AlpnList;
use crate::identity::Pkcs11Options;
use crate::key_operation::KeyOperationHandler;
use crate::version::{TlsCipherPreference, TlsVersion};

pub mod rustls;

/// Reasons a backend can reject configuration material.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Wrapper for rustls::Error
    #[error("{0}")]
    TLSError(#[from] ::rustls::Error),
    /// PEM input could not be decoded.
    #[error("malformed PEM: {0}")]
    Pem(#[source] std::io::Error),
    /// A file named by the configuration could not be read.
    #[error("{}: {source}", path.display())]
    Io {
        /// File or directory that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// PEM input contained no certificates.
    #[error("no certificates found")]
    NoCertificates,
    /// PEM input contained no private key.
    #[error("no private key found")]
    NoPrivateKey,
    /// The ALPN list was malformed or exceeds a backend limit.
    #[error("invalid ALPN list: {0}")]
    InvalidAlpn(String),
    /// The backend has no way to honour this cipher preference.
    #[error("cipher preference {0} is not supported")]
    CipherPreferenceUnsupported(TlsCipherPreference),
    /// The backend does not implement this kind of client identity.
    #[error("{0} is not supported by this TLS backend")]
    Unsupported(&'static str),
    /// Any other rejection.
    #[error("{0}")]
    Rejected(String),
}

impl BackendError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| Self::Io { path, source }
    }
}

/// A TLS implementation able to turn client configuration into a usable
/// context.
pub trait TlsBackend {
    /// The backend's mutable client options, released on drop.
    type Options;
    /// What [`TlsBackend::create_context`] produces.
    type Context;

    /// Options for a client with no identity, the default trust store and
    /// peer verification enabled.
    fn init_client_default(&self) -> Self::Options;

    /// Reset `options` to a client presenting the PEM `certificate` chain
    /// and PEM `private_key`.
    fn init_client_mtls(
        &self,
        options: &mut Self::Options,
        certificate: &[u8],
        private_key: &[u8],
    ) -> Result<(), BackendError>;

    /// Like [`TlsBackend::init_client_mtls`] but reading the PEM material
    /// from files.
    fn init_client_mtls_from_path(
        &self,
        options: &mut Self::Options,
        certificate_path: &Path,
        private_key_path: &Path,
    ) -> Result<(), BackendError>;

    /// Reset `options` to a client whose key lives in a PKCS#11 token.
    fn init_client_mtls_with_pkcs11(
        &self,
        options: &mut Self::Options,
        pkcs11: &Pkcs11Options,
    ) -> Result<(), BackendError>;

    /// Reset `options` to a client presenting the PEM `certificate` chain
    /// and delegating private key operations to `handler`.
    fn init_client_mtls_with_custom_key_operation(
        &self,
        options: &mut Self::Options,
        handler: &Arc<dyn KeyOperationHandler>,
        certificate: &[u8],
    ) -> Result<(), BackendError>;

    /// Reset `options` to a client using the identity in a PKCS#12 archive.
    fn init_client_mtls_pkcs12_from_path(
        &self,
        options: &mut Self::Options,
        path: &Path,
        password: &[u8],
    ) -> Result<(), BackendError>;

    /// Reset `options` to a client using a certificate from the operating
    /// system's store, such as `CurrentUser\MY\<thumbprint>` on Windows.
    fn init_client_mtls_from_system_store(
        &self,
        options: &mut Self::Options,
        store_path: &str,
    ) -> Result<(), BackendError>;

    /// Replace the default trust store with the PEM certificates in `ca`.
    fn override_trust_store(
        &self,
        options: &mut Self::Options,
        ca: &[u8],
    ) -> Result<(), BackendError>;

    /// Replace the default trust store with certificates from a PEM file,
    /// a directory of PEM files, or both. At least one is given.
    fn override_trust_store_from_path(
        &self,
        options: &mut Self::Options,
        ca_dir: Option<&Path>,
        ca_file: Option<&Path>,
    ) -> Result<(), BackendError>;

    /// Set the lowest protocol version to negotiate.
    fn set_minimum_tls_version(&self, options: &mut Self::Options, version: TlsVersion);

    /// Select a cipher suite bundle.
    fn set_cipher_preference(&self, options: &mut Self::Options, preference: TlsCipherPreference);

    /// Enable or disable verification of the server's certificate.
    fn set_verify_peer(&self, options: &mut Self::Options, verify_peer: bool);

    /// Offer the protocols in `alpn`, in order.
    fn set_alpn_list(&self, options: &mut Self::Options, alpn: &AlpnList)
    -> Result<(), BackendError>;

    /// Whether this backend can negotiate ALPN at all.
    fn is_alpn_available(&self) -> bool;

    /// Whether `preference` can be honoured by this backend.
    fn is_cipher_preference_supported(&self, preference: TlsCipherPreference) -> bool;

    /// Create a TLS client context from finished options.
    fn create_context(&self, options: &Self::Options) -> Result<Self::Context, BackendError>;
}
