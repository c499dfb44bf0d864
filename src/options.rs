//! The TLS client configuration and the builder which produces it.
//!
//! [`TlsContextOptions::build`] takes raw, caller-owned inputs, copies
//! everything it needs and drives a [`TlsBackend`] through identity
//! initialisation, trust override and common settings, in that order.
//! The first failure aborts the build; everything acquired up to that
//! point is owned by locals and released as the error propagates.
//!
//! ```
//! use tls_context_options::{RustlsBackend, TlsContextOptions, TlsContextOptionsInputs, TlsVersion};
//!
//! let backend = RustlsBackend::new();
//! let options = TlsContextOptions::build(
//!     &backend,
//!     &TlsContextOptionsInputs {
//!         alpn: Some(b"h2;http/1.1"),
//!         minimum_tls_version: TlsVersion::Tls1_2,
//!         ..Default::default()
//!     },
//! )
//! .unwrap();
//! let client_config = options.create_context(&backend).unwrap();
//! assert_eq!(client_config.alpn_protocols, [b"h2".to_vec(), b"http/1.1".to_vec()]);
//! ```

use std::fmt;

use crate::alpn::AlpnList;
use crate::backend::TlsBackend;
use crate::buffer::OwnedText;
use crate::error::{Result, TlsOptionsError};
use crate::identity::{IdentitySource, Pkcs11Inputs};
use crate::key_operation::CustomKeyOperationInputs;
use crate::trust::TrustOverride;
use crate::version::{TlsCipherPreference, TlsVersion};

/// Everything the caller can supply, borrowed for the duration of
/// [`TlsContextOptions::build`].
///
/// Byte fields hold the caller's native strings as they arrive from the
/// host. Nothing here outlives the build.
#[derive(Clone)]
pub struct TlsContextOptionsInputs<'a> {
    /// Lowest protocol version to negotiate.
    pub minimum_tls_version: TlsVersion,
    /// Cipher suite bundle.
    pub cipher_preference: TlsCipherPreference,
    /// Whether to verify the server's certificate. Defaults to true.
    pub verify_peer: bool,
    /// Semicolon separated ALPN protocols, such as `h2;http/1.1`.
    pub alpn: Option<&'a [u8]>,
    /// PEM client certificate chain.
    pub certificate: Option<&'a [u8]>,
    /// PEM client private key.
    pub private_key: Option<&'a [u8]>,
    /// Path to the PEM client certificate chain.
    pub certificate_path: Option<&'a [u8]>,
    /// Path to the PEM client private key.
    pub private_key_path: Option<&'a [u8]>,
    /// PEM certificate authorities.
    pub ca: Option<&'a [u8]>,
    /// Path to a PEM file of certificate authorities.
    pub ca_file: Option<&'a [u8]>,
    /// Path to a directory of PEM certificate authorities.
    pub ca_dir: Option<&'a [u8]>,
    /// Client key held in a PKCS#11 token.
    pub pkcs11: Option<&'a Pkcs11Inputs<'a>>,
    /// Client key operations performed by the caller.
    pub custom_key_operation: Option<&'a CustomKeyOperationInputs<'a>>,
    /// Path to a PKCS#12 archive holding the client identity.
    pub pkcs12_path: Option<&'a [u8]>,
    /// Password of the PKCS#12 archive.
    pub pkcs12_password: Option<&'a [u8]>,
    /// Location of the client certificate in the system store.
    pub windows_cert_store_path: Option<&'a [u8]>,
}

impl Default for TlsContextOptionsInputs<'_> {
    fn default() -> Self {
        Self {
            minimum_tls_version: TlsVersion::default(),
            cipher_preference: TlsCipherPreference::default(),
            verify_peer: true,
            alpn: None,
            certificate: None,
            private_key: None,
            certificate_path: None,
            private_key_path: None,
            ca: None,
            ca_file: None,
            ca_dir: None,
            pkcs11: None,
            custom_key_operation: None,
            pkcs12_path: None,
            pkcs12_password: None,
            windows_cert_store_path: None,
        }
    }
}

/// A finished TLS client configuration.
///
/// Owns copies of all the material it was built from together with the
/// backend options carrying it. Dropping it wipes the secret material.
pub struct TlsContextOptions<B: TlsBackend> {
    options: B::Options,
    identity: IdentitySource,
    trust: TrustOverride,
    alpn: Option<(OwnedText, AlpnList)>,
    minimum_tls_version: TlsVersion,
    cipher_preference: TlsCipherPreference,
    verify_peer: bool,
}

impl<B: TlsBackend> TlsContextOptions<B> {
    /// Build a configuration from `inputs`.
    ///
    /// The identity is initialised first because doing so resets the
    /// backend's trust store; the trust override and common settings
    /// follow.
    pub fn build(backend: &B, inputs: &TlsContextOptionsInputs<'_>) -> Result<Self> {
        let mut options = backend.init_client_default();

        let identity = IdentitySource::from_inputs(inputs)?;
        log::debug!("Client identity: {:?}", identity.kind());
        identity.initialize(backend, &mut options)?;

        let trust = TrustOverride::from_inputs(inputs)?;
        log::debug!("Trust store: {:?}", trust);
        trust.apply(backend, &mut options)?;

        backend.set_minimum_tls_version(&mut options, inputs.minimum_tls_version);
        backend.set_cipher_preference(&mut options, inputs.cipher_preference);
        backend.set_verify_peer(&mut options, inputs.verify_peer);

        let alpn = match inputs.alpn {
            Some(raw) => {
                let text = OwnedText::from_raw("alpnList", raw)?;
                let list = AlpnList::parse(text.as_str())
                    .map_err(TlsOptionsError::backend("set_alpn_list"))?;
                backend
                    .set_alpn_list(&mut options, &list)
                    .map_err(TlsOptionsError::backend("set_alpn_list"))?;
                Some((text, list))
            }
            None => None,
        };

        Ok(Self {
            options,
            identity,
            trust,
            alpn,
            minimum_tls_version: inputs.minimum_tls_version,
            cipher_preference: inputs.cipher_preference,
            verify_peer: inputs.verify_peer,
        })
    }

    /// The selected client identity.
    pub fn identity(&self) -> &IdentitySource {
        &self.identity
    }

    /// The trust store override.
    pub fn trust(&self) -> &TrustOverride {
        &self.trust
    }

    /// The ALPN protocols, if any were given.
    pub fn alpn(&self) -> Option<&AlpnList> {
        self.alpn.as_ref().map(|(_, list)| list)
    }

    /// The ALPN list as it was supplied.
    pub fn alpn_text(&self) -> Option<&str> {
        self.alpn.as_ref().map(|(text, _)| text.as_str())
    }

    /// Lowest protocol version to negotiate.
    pub fn minimum_tls_version(&self) -> TlsVersion {
        self.minimum_tls_version
    }

    /// Cipher suite bundle.
    pub fn cipher_preference(&self) -> TlsCipherPreference {
        self.cipher_preference
    }

    /// Whether the server's certificate is verified.
    pub fn verify_peer(&self) -> bool {
        self.verify_peer
    }

    /// The backend's view of the configuration.
    pub fn backend_options(&self) -> &B::Options {
        &self.options
    }

    /// Create a TLS client context.
    pub fn create_context(&self, backend: &B) -> Result<B::Context> {
        backend
            .create_context(&self.options)
            .map_err(TlsOptionsError::backend("create_context"))
    }
}

impl<B: TlsBackend> fmt::Debug for TlsContextOptions<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsContextOptions")
            .field("identity", &self.identity)
            .field("trust", &self.trust)
            .field("alpn", &self.alpn_text())
            .field("minimum_tls_version", &self.minimum_tls_version)
            .field("cipher_preference", &self.cipher_preference)
            .field("verify_peer", &self.verify_peer)
            .finish_non_exhaustive()
    }
}
