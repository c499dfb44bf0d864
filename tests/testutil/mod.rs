#![allow(dead_code)]

use rustls::crypto::CryptoProvider;
use rustls::pki_types::ServerName;
use rustls::server::WebPkiClientVerifier;
use rustls::sign::SigningKey;
use rustls::{
    ClientConfig, ClientConnection, RootCertStore, ServerConfig, ServerConnection,
    SignatureAlgorithm, SignatureScheme,
};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tls_context_options::{KeyOperationError, KeyOperationHandler, RustlsBackend};

pub const CA_CERT: &[u8] = include_bytes!("../../testdata/ca.pem");
pub const OTHER_CA_CERT: &[u8] = include_bytes!("../../testdata/other_ca.pem");
pub const CLIENT_CERT: &[u8] = include_bytes!("../../testdata/client.pem");
pub const CLIENT_KEY: &[u8] = include_bytes!("../../testdata/client.key");
pub const SERVER_CERT: &[u8] = include_bytes!("../../testdata/server.pem");
pub const SERVER_KEY: &[u8] = include_bytes!("../../testdata/server.key");

pub fn testdata_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join(name)
}

pub fn provider() -> Arc<CryptoProvider> {
    Arc::clone(RustlsBackend::new().crypto_provider())
}

fn ca_roots() -> Arc<RootCertStore> {
    let mut roots = RootCertStore::empty();
    roots.add_parsable_certificates(
        rustls_pemfile::certs(&mut Cursor::new(CA_CERT))
            .collect::<Result<Vec<_>, _>>()
            .unwrap(),
    );
    Arc::new(roots)
}

/// A server for `localhost` whose certificate is signed by [`CA_CERT`].
/// With `require_client_cert` it only accepts clients holding a
/// certificate signed by the same CA.
pub fn server_config(require_client_cert: bool, alpn: &[&[u8]]) -> Arc<ServerConfig> {
    let builder = ServerConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()
        .unwrap();
    let builder = if require_client_cert {
        builder.with_client_cert_verifier(
            WebPkiClientVerifier::builder_with_provider(ca_roots(), provider())
                .build()
                .unwrap(),
        )
    } else {
        builder.with_no_client_auth()
    };
    let mut sc = builder
        .with_single_cert(
            rustls_pemfile::certs(&mut Cursor::new(SERVER_CERT))
                .collect::<Result<Vec<_>, _>>()
                .unwrap(),
            rustls_pemfile::private_key(&mut Cursor::new(SERVER_KEY))
                .unwrap()
                .unwrap(),
        )
        .unwrap();
    sc.alpn_protocols = alpn.iter().map(|p| p.to_vec()).collect();
    Arc::new(sc)
}

/// Which side of a handshake gave up.
#[derive(Debug)]
pub enum Refused {
    Client(rustls::Error),
    Server(rustls::Error),
}

fn pump(
    from: &mut dyn FnMut(&mut Vec<u8>) -> bool,
    to: &mut dyn FnMut(&mut &[u8]) -> Result<(), rustls::Error>,
) -> Result<(), rustls::Error> {
    let mut buf = Vec::new();
    while from(&mut buf) {}
    let mut rd = &buf[..];
    while !rd.is_empty() {
        to(&mut rd)?;
    }
    Ok(())
}

/// Run a handshake between `cc` and `sc` entirely in memory.
pub fn handshake(
    cc: Arc<ClientConfig>,
    sc: Arc<ServerConfig>,
) -> Result<(ClientConnection, ServerConnection), Refused> {
    let mut client =
        ClientConnection::new(cc, ServerName::try_from("localhost").unwrap()).unwrap();
    let mut server = ServerConnection::new(sc).unwrap();
    for _ in 0..20 {
        pump(
            &mut |buf| client.wants_write() && client.write_tls(buf).unwrap() > 0,
            &mut |rd| {
                server.read_tls(rd).unwrap();
                server.process_new_packets().map(|_| ())
            },
        )
        .map_err(Refused::Server)?;
        pump(
            &mut |buf| server.wants_write() && server.write_tls(buf).unwrap() > 0,
            &mut |rd| {
                client.read_tls(rd).unwrap();
                client.process_new_packets().map(|_| ())
            },
        )
        .map_err(Refused::Client)?;
        if !client.is_handshaking() && !server.is_handshaking() {
            return Ok((client, server));
        }
    }
    panic!("handshake did not complete");
}

/// Signs with a software key, counting the signatures it makes.
#[derive(Debug)]
pub struct SoftwareSigner {
    key: Arc<dyn SigningKey>,
    schemes: Vec<SignatureScheme>,
    pub signatures: AtomicUsize,
}

impl SoftwareSigner {
    pub fn new(pem: &[u8]) -> Self {
        let der = rustls_pemfile::private_key(&mut Cursor::new(pem))
            .unwrap()
            .unwrap();
        Self {
            key: provider().key_provider.load_private_key(der).unwrap(),
            schemes: vec![SignatureScheme::ECDSA_NISTP256_SHA256],
            signatures: AtomicUsize::new(0),
        }
    }

    pub fn signatures(&self) -> usize {
        self.signatures.load(Ordering::Relaxed)
    }
}

impl KeyOperationHandler for SoftwareSigner {
    fn algorithm(&self) -> SignatureAlgorithm {
        self.key.algorithm()
    }

    fn supported_schemes(&self) -> &[SignatureScheme] {
        &self.schemes
    }

    fn sign(&self, scheme: SignatureScheme, message: &[u8]) -> Result<Vec<u8>, KeyOperationError> {
        let signer = self
            .key
            .choose_scheme(&[scheme])
            .ok_or_else(|| KeyOperationError(format!("{:?} is not supported", scheme)))?;
        let signature = signer
            .sign(message)
            .map_err(|e| KeyOperationError(e.to_string()))?;
        self.signatures.fetch_add(1, Ordering::Relaxed);
        Ok(signature)
    }
}
