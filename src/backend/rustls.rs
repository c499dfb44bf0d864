//! [`TlsBackend`] producing a rustls [`ClientConfig`].
//!
//! rustls has no PKCS#11, PKCS#12 or operating system certificate store
//! support, so those identities are rejected with
//! [`BackendError::Unsupported`]. Everything else maps directly:
//!
//! | Setting             | rustls                                           |
//! |---------------------|--------------------------------------------------|
//! | default trust store | Mozilla roots from `webpki-roots`                |
//! | minimum version     | TLS 1.3 only if requested, otherwise 1.2 and 1.3 |
//! | cipher preference   | key exchange groups of the [`CryptoProvider`]    |
//! | custom key operation| [`SigningKey`] delegating to the handler         |
//!
//! ```
//! use tls_context_options::backend::TlsBackend;
//! use tls_context_options::RustlsBackend;
//!
//! let backend = RustlsBackend::new();
//! let options = backend.init_client_default();
//! let client_config = backend.create_context(&options).unwrap();
//! assert!(!client_config.client_auth_cert_resolver.has_certs());
//! ```

use rustls::client::ResolvesClientCert;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{
    CryptoProvider, WebPkiSupportedAlgorithms, verify_tls12_signature, verify_tls13_signature,
};
use rustls::sign::{CertifiedKey, Signer, SigningKey};
use rustls::{
    ClientConfig, DigitallySignedStruct, NamedGroup, RootCertStore, SignatureAlgorithm,
    SignatureScheme, SupportedProtocolVersion,
};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;
use zeroize::Zeroizing;

use super::{BackendError, TlsBackend};
use crate::alpn::AlpnList;
use crate::identity::Pkcs11Options;
use crate::key_operation::KeyOperationHandler;
use crate::version::{TlsCipherPreference, TlsVersion};

/// Room in the ClientHello extensions block (u16 length) left for
/// everything other than ALPN: key shares, SNI, resumption tickets.
const OTHER_EXTENSIONS_RESERVE: usize = 16 * 1024;

/// Largest ProtocolNameList rustls can send. The extension adds a type,
/// a length and the list length on top of the list itself.
const MAX_ALPN_LIST_LEN: usize = 0xffff - OTHER_EXTENSIONS_RESERVE - 6;

static TLS13_ONLY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS13];

#[derive(Clone, Debug)]
enum Trust {
    Default,
    Custom(Arc<RootCertStore>),
}

/// Client options for [`RustlsBackend`].
#[derive(Clone, Debug)]
pub struct RustlsOptions {
    identity: Option<Arc<CertifiedKey>>,
    trust: Trust,
    minimum_tls_version: TlsVersion,
    cipher_preference: TlsCipherPreference,
    verify_peer: bool,
    alpn_protocols: Vec<Vec<u8>>,
}

impl Default for RustlsOptions {
    fn default() -> Self {
        Self {
            identity: None,
            trust: Trust::Default,
            minimum_tls_version: TlsVersion::default(),
            cipher_preference: TlsCipherPreference::default(),
            verify_peer: true,
            alpn_protocols: Vec::new(),
        }
    }
}

impl RustlsOptions {
    fn with_identity(key: CertifiedKey) -> Self {
        if let Some(leaf) = key.cert.first() {
            log::info!("Client certificate: {}", subject(leaf));
        }
        Self {
            identity: Some(Arc::new(key)),
            ..Self::default()
        }
    }

    /// The leaf certificate presented to servers, if any.
    pub fn client_certificate(&self) -> Option<&CertificateDer<'static>> {
        self.identity.as_ref().and_then(|key| key.cert.first())
    }

    /// The certificate authorities replacing the default trust store.
    pub fn custom_trust(&self) -> Option<&RootCertStore> {
        match &self.trust {
            Trust::Default => None,
            Trust::Custom(roots) => Some(roots),
        }
    }

    /// ALPN protocols offered, most preferred first.
    pub fn alpn_protocols(&self) -> &[Vec<u8>] {
        &self.alpn_protocols
    }

    /// Whether the server's certificate chain is verified.
    pub fn verify_peer(&self) -> bool {
        self.verify_peer
    }

    /// Lowest protocol version requested.
    pub fn minimum_tls_version(&self) -> TlsVersion {
        self.minimum_tls_version
    }

    /// Cipher suite bundle requested.
    pub fn cipher_preference(&self) -> TlsCipherPreference {
        self.cipher_preference
    }
}

fn subject(cert: &CertificateDer<'_>) -> String {
    X509Certificate::from_der(cert.as_ref())
        .map(|(_, c)| c.subject().to_string())
        .unwrap_or_else(|_| String::from("<unparsable certificate>"))
}

fn parse_certificates(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>, BackendError> {
    let certs = rustls_pemfile::certs(&mut Cursor::new(pem))
        .collect::<Result<Vec<_>, _>>()
        .map_err(BackendError::Pem)?;
    if certs.is_empty() {
        return Err(BackendError::NoCertificates);
    }
    Ok(certs)
}

fn add_pem_roots(roots: &mut RootCertStore, pem: &[u8]) -> Result<usize, BackendError> {
    let certs = rustls_pemfile::certs(&mut Cursor::new(pem))
        .collect::<Result<Vec<_>, _>>()
        .map_err(BackendError::Pem)?;
    let (added, ignored) = roots.add_parsable_certificates(certs);
    if ignored > 0 {
        log::warn!("Ignored {} unparsable CA certificates", ignored);
    }
    Ok(added)
}

fn default_roots() -> RootCertStore {
    RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    }
}

fn protocol_versions(minimum: TlsVersion) -> &'static [&'static SupportedProtocolVersion] {
    match minimum {
        TlsVersion::Tls1_3 => TLS13_ONLY,
        _ => rustls::DEFAULT_VERSIONS,
    }
}

/// A [`TlsBackend`] built on rustls.
#[derive(Clone, Debug)]
pub struct RustlsBackend {
    provider: Arc<CryptoProvider>,
}

impl Default for RustlsBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RustlsBackend {
    /// Use the process-global default [`CryptoProvider`] if there is one,
    /// otherwise the aws-lc-rs provider.
    pub fn new() -> Self {
        Self::with_provider(
            CryptoProvider::get_default()
                .cloned()
                .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider())),
        )
    }

    /// Use `provider` for keys, signatures and key exchange.
    pub fn with_provider(provider: Arc<CryptoProvider>) -> Self {
        Self { provider }
    }

    /// The provider configured in.
    pub fn crypto_provider(&self) -> &Arc<CryptoProvider> {
        &self.provider
    }

    fn certified_key(
        &self,
        certificate: &[u8],
        private_key: &[u8],
    ) -> Result<CertifiedKey, BackendError> {
        let chain = parse_certificates(certificate)?;
        let key = rustls_pemfile::private_key(&mut Cursor::new(private_key))
            .map_err(BackendError::Pem)?
            .ok_or(BackendError::NoPrivateKey)?;
        let key = self.provider.key_provider.load_private_key(key)?;
        let certified_key = CertifiedKey::new(chain, key);
        certified_key.keys_match()?;
        Ok(certified_key)
    }

    /// The provider to build a client with for `preference`.
    fn provider_for(
        &self,
        preference: TlsCipherPreference,
    ) -> Result<CryptoProvider, BackendError> {
        let mut provider = CryptoProvider::clone(&self.provider);
        match preference {
            TlsCipherPreference::SystemDefault | TlsCipherPreference::Tlsv1_2_2025_07 => {}
            TlsCipherPreference::PqDefault | TlsCipherPreference::PqTlsv1_2_2024_10 => {
                let Some(index) = provider
                    .kx_groups
                    .iter()
                    .position(|group| group.name() == NamedGroup::X25519MLKEM768)
                else {
                    return Err(BackendError::CipherPreferenceUnsupported(preference));
                };
                if preference == TlsCipherPreference::PqTlsv1_2_2024_10 {
                    let group = provider.kx_groups.remove(index);
                    provider.kx_groups.insert(0, group);
                }
            }
            _ => return Err(BackendError::CipherPreferenceUnsupported(preference)),
        }
        Ok(provider)
    }
}

impl TlsBackend for RustlsBackend {
    type Options = RustlsOptions;
    type Context = Arc<ClientConfig>;

    fn init_client_default(&self) -> RustlsOptions {
        RustlsOptions::default()
    }

    fn init_client_mtls(
        &self,
        options: &mut RustlsOptions,
        certificate: &[u8],
        private_key: &[u8],
    ) -> Result<(), BackendError> {
        *options = RustlsOptions::with_identity(self.certified_key(certificate, private_key)?);
        Ok(())
    }

    fn init_client_mtls_from_path(
        &self,
        options: &mut RustlsOptions,
        certificate_path: &Path,
        private_key_path: &Path,
    ) -> Result<(), BackendError> {
        let certificate =
            std::fs::read(certificate_path).map_err(BackendError::io(certificate_path))?;
        let private_key = Zeroizing::new(
            std::fs::read(private_key_path).map_err(BackendError::io(private_key_path))?,
        );
        self.init_client_mtls(options, &certificate, &private_key)
    }

    fn init_client_mtls_with_pkcs11(
        &self,
        _: &mut RustlsOptions,
        _: &Pkcs11Options,
    ) -> Result<(), BackendError> {
        Err(BackendError::Unsupported("PKCS#11"))
    }

    fn init_client_mtls_with_custom_key_operation(
        &self,
        options: &mut RustlsOptions,
        handler: &Arc<dyn KeyOperationHandler>,
        certificate: &[u8],
    ) -> Result<(), BackendError> {
        let chain = parse_certificates(certificate)?;
        let key = Arc::new(HandlerSigningKey(Arc::clone(handler)));
        *options = RustlsOptions::with_identity(CertifiedKey::new(chain, key));
        Ok(())
    }

    fn init_client_mtls_pkcs12_from_path(
        &self,
        _: &mut RustlsOptions,
        _: &Path,
        _: &[u8],
    ) -> Result<(), BackendError> {
        Err(BackendError::Unsupported("PKCS#12"))
    }

    fn init_client_mtls_from_system_store(
        &self,
        _: &mut RustlsOptions,
        _: &str,
    ) -> Result<(), BackendError> {
        Err(BackendError::Unsupported("system certificate store"))
    }

    fn override_trust_store(
        &self,
        options: &mut RustlsOptions,
        ca: &[u8],
    ) -> Result<(), BackendError> {
        let mut roots = RootCertStore::empty();
        if add_pem_roots(&mut roots, ca)? == 0 {
            return Err(BackendError::NoCertificates);
        }
        options.trust = Trust::Custom(Arc::new(roots));
        Ok(())
    }

    fn override_trust_store_from_path(
        &self,
        options: &mut RustlsOptions,
        ca_dir: Option<&Path>,
        ca_file: Option<&Path>,
    ) -> Result<(), BackendError> {
        let mut roots = RootCertStore::empty();
        if let Some(file) = ca_file {
            let pem = std::fs::read(file).map_err(BackendError::io(file))?;
            if add_pem_roots(&mut roots, &pem)? == 0 {
                log::warn!("No root certificates loaded from file {}", file.display());
            }
        }
        if let Some(dir) = ca_dir {
            for entry in std::fs::read_dir(dir).map_err(BackendError::io(dir))? {
                let path = entry.map_err(BackendError::io(dir))?.path();
                if !path.is_file() {
                    continue;
                }
                let pem = std::fs::read(&path).map_err(BackendError::io(&path))?;
                match add_pem_roots(&mut roots, &pem) {
                    Ok(0) => log::warn!("No root certificates in {}", path.display()),
                    Ok(_) => (),
                    Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
                }
            }
        }
        if roots.is_empty() {
            return Err(BackendError::NoCertificates);
        }
        options.trust = Trust::Custom(Arc::new(roots));
        Ok(())
    }

    fn set_minimum_tls_version(&self, options: &mut RustlsOptions, version: TlsVersion) {
        if matches!(
            version,
            TlsVersion::Ssl3 | TlsVersion::Tls1_0 | TlsVersion::Tls1_1
        ) {
            log::warn!(
                "Minimum version {} requested but rustls negotiates TLS 1.2 at the lowest",
                version
            );
        }
        options.minimum_tls_version = version;
    }

    fn set_cipher_preference(&self, options: &mut RustlsOptions, preference: TlsCipherPreference) {
        options.cipher_preference = preference;
    }

    fn set_verify_peer(&self, options: &mut RustlsOptions, verify_peer: bool) {
        options.verify_peer = verify_peer;
    }

    fn set_alpn_list(
        &self,
        options: &mut RustlsOptions,
        alpn: &AlpnList,
    ) -> Result<(), BackendError> {
        if alpn.encoded_len() > MAX_ALPN_LIST_LEN {
            return Err(BackendError::InvalidAlpn(format!(
                "{} protocol names encode to {} bytes; a ClientHello has room for {}",
                alpn.len(),
                alpn.encoded_len(),
                MAX_ALPN_LIST_LEN
            )));
        }
        options.alpn_protocols = alpn.iter_bytes().map(<[u8]>::to_vec).collect();
        Ok(())
    }

    fn is_alpn_available(&self) -> bool {
        true
    }

    fn is_cipher_preference_supported(&self, preference: TlsCipherPreference) -> bool {
        self.provider_for(preference).is_ok()
    }

    fn create_context(&self, options: &RustlsOptions) -> Result<Arc<ClientConfig>, BackendError> {
        let provider = Arc::new(self.provider_for(options.cipher_preference)?);
        let builder = ClientConfig::builder_with_provider(Arc::clone(&provider))
            .with_protocol_versions(protocol_versions(options.minimum_tls_version))?;
        let builder = if options.verify_peer {
            builder.with_root_certificates(match &options.trust {
                Trust::Default => Arc::new(default_roots()),
                Trust::Custom(roots) => Arc::clone(roots),
            })
        } else {
            log::warn!("Server certificate chains will not be verified");
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(SkipChainVerification(
                    provider.signature_verification_algorithms,
                )))
        };
        let mut config = match &options.identity {
            Some(key) => {
                builder.with_client_cert_resolver(Arc::new(FixedClientIdentity(Arc::clone(key))))
            }
            None => builder.with_no_client_auth(),
        };
        config.alpn_protocols = options.alpn_protocols.clone();
        log::info!(
            "TLS client context created (client certificate: {}, cipher preference: {})",
            if options.identity.is_some() { "yes" } else { "no" },
            options.cipher_preference,
        );
        Ok(Arc::new(config))
    }
}

/// Presents the same identity whatever the server asks for.
#[derive(Debug)]
struct FixedClientIdentity(Arc<CertifiedKey>);

impl ResolvesClientCert for FixedClientIdentity {
    fn resolve(
        &self,
        _root_hint_subjects: &[&[u8]],
        _sigschemes: &[SignatureScheme],
    ) -> Option<Arc<CertifiedKey>> {
        Some(Arc::clone(&self.0))
    }

    fn has_certs(&self) -> bool {
        true
    }
}

/// Accepts any server certificate chain but still checks that the server
/// holds the key for the certificate it presented.
#[derive(Debug)]
struct SkipChainVerification(WebPkiSupportedAlgorithms);

impl ServerCertVerifier for SkipChainVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.supported_schemes()
    }
}

#[derive(Debug)]
struct HandlerSigningKey(Arc<dyn KeyOperationHandler>);

impl SigningKey for HandlerSigningKey {
    fn choose_scheme(&self, offered: &[SignatureScheme]) -> Option<Box<dyn Signer>> {
        self.0
            .supported_schemes()
            .iter()
            .find(|scheme| offered.contains(scheme))
            .map(|&scheme| {
                Box::new(HandlerSigner {
                    handler: Arc::clone(&self.0),
                    scheme,
                }) as Box<dyn Signer>
            })
    }

    fn algorithm(&self) -> SignatureAlgorithm {
        self.0.algorithm()
    }
}

#[derive(Debug)]
struct HandlerSigner {
    handler: Arc<dyn KeyOperationHandler>,
    scheme: SignatureScheme,
}

impl Signer for HandlerSigner {
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, rustls::Error> {
        self.handler
            .sign(self.scheme, message)
            .map_err(|e| rustls::Error::General(e.to_string()))
    }

    fn scheme(&self) -> SignatureScheme {
        self.scheme
    }
}
