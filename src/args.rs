//! Command line flags describing a TLS client.
//!
//! # Command line flags
//!
//! | Flag                        | Default  | Meaning                 |
//! |-----------------------------|----------|-------------------------|
//! | `--cert-path`               | None     | PEM client certificate chain |
//! | `--key-path`                | None     | PEM client private key |
//! | `--cacert`                  | None     | PEM file of trusted certificate authorities |
//! | `--ca-dir`                  | None     | Directory of PEM files of trusted certificate authorities |
//! | `--pkcs12-path`             | None     | PKCS#12 archive holding the client identity |
//! | `--pkcs12-password-file`    | None     | File containing the PKCS#12 password |
//! | `--windows-cert-store-path` | None     | Client certificate in the system store |
//! | `--alpn`                    | None     | Semicolon separated ALPN protocols |
//! | `--min-tls-version`         | default  | Lowest protocol version to negotiate |
//! | `--cipher-preference`       | default  | Cipher suite bundle |
//! | `--insecure-skip-verify`    | false    | Do not verify the server's certificate |
//!
//! ```
//! use clap::Parser;
//! use tls_context_options::{Args, RustlsBackend, TlsContextOptions};
//!
//! #[derive(Parser)]
//! struct Flags {
//!     #[command(flatten)]
//!     tls: Args,
//! }
//!
//! let flags = Flags::parse_from(["prog", "--alpn", "h2", "--min-tls-version", "tls1.3"]);
//! let loaded = flags.tls.load().unwrap();
//! let options = TlsContextOptions::build(&RustlsBackend::new(), &loaded.inputs()).unwrap();
//! assert_eq!(options.alpn_text(), Some("h2"));
//! ```

use std::path::PathBuf;
use thiserror::Error;

use crate::buffer::SecretBuffer;
use crate::options::TlsContextOptionsInputs;
use crate::version::{TlsCipherPreference, TlsVersion};

/// Error type for [`Args::load`].
#[derive(Debug, Error)]
pub enum ArgsError {
    /// The PKCS#12 password file could not be read.
    #[error("failed to read PKCS#12 password file {}: {source}", path.display())]
    PasswordFile {
        /// The file named on the command line.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Command line arguments for a TLS client. Key material is given as
/// pathnames to files on disk.
#[derive(clap::Args, Debug, Default)]
#[group(id = "tls_context_options_args")]
pub struct Args {
    #[arg(long, help = "Path to TLS client certificate chain in PEM format.")]
    cert_path: Option<PathBuf>,

    #[arg(long, help = "Path to TLS client private key in PEM format.")]
    key_path: Option<PathBuf>,

    #[arg(
        long,
        help = "Path to TLS root certificates for verifying servers, in PEM format. If neither this nor --ca-dir is set, the default roots are used."
    )]
    cacert: Option<PathBuf>,

    #[arg(
        long,
        help = "Directory of TLS root certificates for verifying servers, in PEM format."
    )]
    ca_dir: Option<PathBuf>,

    #[arg(long, help = "Path to a PKCS#12 archive holding the TLS client identity.")]
    pkcs12_path: Option<PathBuf>,

    #[arg(long, help = "Path to a file containing the password for --pkcs12-path.")]
    pkcs12_password_file: Option<PathBuf>,

    #[arg(
        long,
        help = "Location of the TLS client certificate in the system certificate store, such as CurrentUser\\MY\\<thumbprint>."
    )]
    windows_cert_store_path: Option<String>,

    #[arg(long, help = "Semicolon separated ALPN protocols, such as h2;http/1.1.")]
    alpn: Option<String>,

    #[arg(long, default_value_t, help = "Lowest TLS version to negotiate.")]
    min_tls_version: TlsVersion,

    #[arg(long, default_value_t, help = "Cipher suite preference.")]
    cipher_preference: TlsCipherPreference,

    #[arg(long, help = "Do not verify the server's TLS certificate.")]
    insecure_skip_verify: bool,
}

fn path_bytes(path: &Option<PathBuf>) -> Option<Vec<u8>> {
    path.as_ref()
        .map(|p| p.as_os_str().as_encoded_bytes().to_vec())
}

impl Args {
    /// Read the files which the options need as contents rather than as
    /// paths.
    pub fn load(&self) -> Result<ArgsInputs, ArgsError> {
        let pkcs12_password = self
            .pkcs12_password_file
            .as_ref()
            .map(|path| {
                let mut password = std::fs::read(path).map_err(|source| ArgsError::PasswordFile {
                    path: path.clone(),
                    source,
                })?;
                while matches!(password.last(), Some(b'\n' | b'\r')) {
                    password.pop();
                }
                Ok(SecretBuffer::from_vec(password))
            })
            .transpose()?;
        Ok(ArgsInputs {
            certificate_path: path_bytes(&self.cert_path),
            private_key_path: path_bytes(&self.key_path),
            ca_file: path_bytes(&self.cacert),
            ca_dir: path_bytes(&self.ca_dir),
            pkcs12_path: path_bytes(&self.pkcs12_path),
            pkcs12_password,
            windows_cert_store_path: self.windows_cert_store_path.clone(),
            alpn: self.alpn.clone(),
            minimum_tls_version: self.min_tls_version,
            cipher_preference: self.cipher_preference,
            verify_peer: !self.insecure_skip_verify,
        })
    }
}

/// Owned inputs produced by [`Args::load`].
#[derive(Debug)]
pub struct ArgsInputs {
    certificate_path: Option<Vec<u8>>,
    private_key_path: Option<Vec<u8>>,
    ca_file: Option<Vec<u8>>,
    ca_dir: Option<Vec<u8>>,
    pkcs12_path: Option<Vec<u8>>,
    pkcs12_password: Option<SecretBuffer>,
    windows_cert_store_path: Option<String>,
    alpn: Option<String>,
    minimum_tls_version: TlsVersion,
    cipher_preference: TlsCipherPreference,
    verify_peer: bool,
}

impl ArgsInputs {
    /// Inputs for [`TlsContextOptions::build`](crate::TlsContextOptions::build).
    pub fn inputs(&self) -> TlsContextOptionsInputs<'_> {
        TlsContextOptionsInputs {
            minimum_tls_version: self.minimum_tls_version,
            cipher_preference: self.cipher_preference,
            verify_peer: self.verify_peer,
            alpn: self.alpn.as_deref().map(str::as_bytes),
            certificate_path: self.certificate_path.as_deref(),
            private_key_path: self.private_key_path.as_deref(),
            ca_file: self.ca_file.as_deref(),
            ca_dir: self.ca_dir.as_deref(),
            pkcs12_path: self.pkcs12_path.as_deref(),
            pkcs12_password: self.pkcs12_password.as_ref().map(SecretBuffer::expose),
            windows_cert_store_path: self.windows_cert_store_path.as_deref().map(str::as_bytes),
            ..Default::default()
        }
    }
}
