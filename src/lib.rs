//! Client TLS configuration built from mutually exclusive credential
//! sources.
//!
//! A TLS client may prove its identity in several ways: a certificate and
//! private key given inline or as files, a key held in a PKCS#11 token, a
//! caller-supplied signing operation, a PKCS#12 archive or a certificate
//! from the operating system's store. It may also replace the default set
//! of trusted certificate authorities and tune protocol settings.
//! [`TlsContextOptions::build`] takes all of these as raw inputs, picks
//! exactly one identity, applies everything to a [`TlsBackend`] in the
//! order the backend requires and returns an immutable configuration
//! from which TLS client contexts are created.
//!
//! Everything is copied out of the caller's inputs during the build. Key
//! material and passwords are held in [`SecretBuffer`]s which are wiped
//! when the options are dropped.
//!
//! ```
//! use tls_context_options::{
//!     IdentityKind, RustlsBackend, TlsContextOptions, TlsContextOptionsInputs,
//! };
//!
//! let backend = RustlsBackend::new();
//! let options = TlsContextOptions::build(
//!     &backend,
//!     &TlsContextOptionsInputs {
//!         alpn: Some(b"h2"),
//!         ..Default::default()
//!     },
//! )
//! .unwrap();
//! assert_eq!(options.identity().kind(), IdentityKind::None);
//! let client_config = options.create_context(&backend).unwrap();
//! # let _ = client_config;
//! ```
//!
//! For hosts which cannot hold Rust values, [`OptionsRegistry`] hands out
//! integer [`OptionsHandle`]s instead.
//!
//! # Feature Flags
//!
//! - `args` (default): [`Args`], command line flags for a TLS client.
//!   Requires [clap](https://crates.io/crates/clap).

#![warn(missing_docs)]

pub mod alpn;
#[cfg(feature = "args")]
pub mod args;
pub mod backend;
pub mod buffer;
pub mod capability;
pub mod error;
pub mod handle;
pub mod identity;
pub mod key_operation;
pub mod options;
pub mod trust;
pub mod version;

#[cfg(test)]
mod testdata;
#[cfg(test)]
mod testutil;

pub use alpn::AlpnList;
#[cfg(feature = "args")]
pub use args::{Args, ArgsError, ArgsInputs};
pub use backend::rustls::{RustlsBackend, RustlsOptions};
pub use backend::{BackendError, TlsBackend};
pub use buffer::{Buffer, OwnedText, SecretBuffer};
pub use capability::{is_alpn_available, is_cipher_preference_supported};
pub use error::{ConversionFailure, Result, TlsOptionsError};
pub use handle::{OptionsHandle, OptionsRegistry};
pub use identity::{IdentityKind, IdentitySource, Pkcs11Inputs, Pkcs11Options};
pub use key_operation::{
    CertificateSource, CustomKeyOperationInputs, KeyOperationError, KeyOperationHandler,
};
pub use options::{TlsContextOptions, TlsContextOptionsInputs};
pub use trust::TrustOverride;
pub use version::{TlsCipherPreference, TlsVersion};

pub use rustls;
