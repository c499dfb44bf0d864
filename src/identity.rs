//! How the client proves its identity to the server.
//!
//! Callers are expected to supply the inputs for at most one identity
//! mechanism, but nothing upstream enforces that. When several are
//! present, the first complete group in this order wins and the others
//! are ignored:
//!
//! 1. inline certificate and private key
//! 2. certificate path and private key path
//! 3. PKCS#11 options
//! 4. custom key operation
//! 5. PKCS#12 path and password
//! 6. system certificate store path
//!
//! If no group is complete the client has no identity and only verifies
//! the server.

use std::fmt;
use std::sync::Arc;

use crate::backend::TlsBackend;
use crate::buffer::{Buffer, OwnedText, SecretBuffer};
use crate::error::{Result, TlsOptionsError};
use crate::key_operation::{CertificateSource, CustomKeyOperationInputs, KeyOperationHandler};
use crate::options::TlsContextOptionsInputs;

/// Raw PKCS#11 options, borrowed from the caller for the duration of the
/// build.
#[derive(Clone, Default)]
pub struct Pkcs11Inputs<'a> {
    /// Path of the PKCS#11 module to load.
    pub library_path: Option<&'a [u8]>,
    /// User PIN for logging into the token.
    pub user_pin: Option<&'a [u8]>,
    /// Slot containing the token.
    pub slot_id: Option<u64>,
    /// Label of the token.
    pub token_label: Option<&'a [u8]>,
    /// Label of the private key object on the token.
    pub private_key_object_label: Option<&'a [u8]>,
    /// Path to the PEM certificate chain.
    pub certificate_file_path: Option<&'a [u8]>,
    /// PEM certificate chain.
    pub certificate_file_contents: Option<&'a [u8]>,
}

/// PKCS#11 options owned by the TLS context options.
#[derive(Debug)]
pub struct Pkcs11Options {
    /// Path of the PKCS#11 module to load.
    pub library_path: Option<OwnedText>,
    /// User PIN for logging into the token.
    pub user_pin: Option<SecretBuffer>,
    /// Slot containing the token.
    pub slot_id: Option<u64>,
    /// Label of the token.
    pub token_label: Option<OwnedText>,
    /// Label of the private key object on the token.
    pub private_key_object_label: Option<OwnedText>,
    /// Path to the PEM certificate chain.
    pub certificate_file_path: Option<OwnedText>,
    /// PEM certificate chain.
    pub certificate_file_contents: Option<Buffer>,
}

fn text(field: &'static str, raw: Option<&[u8]>) -> Result<Option<OwnedText>> {
    raw.map(|r| OwnedText::from_raw(field, r)).transpose()
}

impl Pkcs11Options {
    /// Copy the caller's options.
    pub fn from_inputs(inputs: &Pkcs11Inputs<'_>) -> Result<Self> {
        Ok(Self {
            library_path: text("pkcs11LibraryPath", inputs.library_path)?,
            user_pin: inputs
                .user_pin
                .map(|pin| SecretBuffer::from_raw("userPin", pin))
                .transpose()?,
            slot_id: inputs.slot_id,
            token_label: text("tokenLabel", inputs.token_label)?,
            private_key_object_label: text(
                "privateKeyObjectLabel",
                inputs.private_key_object_label,
            )?,
            certificate_file_path: text("certificateFilePath", inputs.certificate_file_path)?,
            certificate_file_contents: inputs
                .certificate_file_contents
                .map(|c| Buffer::from_raw("certificateFileContents", c))
                .transpose()?,
        })
    }
}

/// The kinds of identity, in selection priority order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IdentityKind {
    /// Inline PEM certificate and private key.
    InlineCertAndKey,
    /// PEM certificate and private key files.
    PathCertAndKey,
    /// Key held in a PKCS#11 token.
    Pkcs11,
    /// Signatures delegated to a [`KeyOperationHandler`].
    CustomKeyOperation,
    /// PKCS#12 archive.
    Pkcs12,
    /// Operating system certificate store.
    WindowsCertStorePath,
    /// No client identity.
    None,
}

/// A complete identity group, still borrowed from the caller.
enum Group<'a> {
    Inline {
        certificate: &'a [u8],
        private_key: &'a [u8],
    },
    Path {
        certificate_path: &'a [u8],
        private_key_path: &'a [u8],
    },
    Pkcs11(&'a Pkcs11Inputs<'a>),
    Custom(&'a CustomKeyOperationInputs<'a>),
    Pkcs12 {
        path: &'a [u8],
        password: &'a [u8],
    },
    SystemStore(&'a [u8]),
}

impl Group<'_> {
    fn kind(&self) -> IdentityKind {
        match self {
            Self::Inline { .. } => IdentityKind::InlineCertAndKey,
            Self::Path { .. } => IdentityKind::PathCertAndKey,
            Self::Pkcs11(_) => IdentityKind::Pkcs11,
            Self::Custom(_) => IdentityKind::CustomKeyOperation,
            Self::Pkcs12 { .. } => IdentityKind::Pkcs12,
            Self::SystemStore(_) => IdentityKind::WindowsCertStorePath,
        }
    }

    fn copy(self) -> Result<IdentitySource> {
        Ok(match self {
            Self::Inline {
                certificate,
                private_key,
            } => IdentitySource::InlineCertAndKey {
                certificate: Buffer::from_raw("certificate", certificate)?,
                private_key: SecretBuffer::from_raw("privateKey", private_key)?,
            },
            Self::Path {
                certificate_path,
                private_key_path,
            } => IdentitySource::PathCertAndKey {
                certificate_path: OwnedText::from_raw("certificatePath", certificate_path)?,
                private_key_path: OwnedText::from_raw("privateKeyPath", private_key_path)?,
            },
            Self::Pkcs11(pkcs11) => {
                IdentitySource::Pkcs11(Box::new(Pkcs11Options::from_inputs(pkcs11)?))
            }
            Self::Custom(custom) => IdentitySource::CustomKeyOperation {
                handler: Arc::clone(&custom.handler),
                certificate: CertificateSource::from_inputs(custom)?,
            },
            Self::Pkcs12 { path, password } => IdentitySource::Pkcs12 {
                path: OwnedText::from_raw("pkcs12Path", path)?,
                password: SecretBuffer::from_raw("pkcs12Password", password)?,
            },
            Self::SystemStore(path) => IdentitySource::WindowsCertStorePath {
                path: OwnedText::from_raw("windowsCertStorePath", path)?,
            },
        })
    }
}

/// One row of the identity selection table: the group `inputs` hold for
/// that identity, or `None` if it is incomplete.
type Rule = for<'a> fn(&TlsContextOptionsInputs<'a>) -> Option<Group<'a>>;

fn inline<'a>(i: &TlsContextOptionsInputs<'a>) -> Option<Group<'a>> {
    Some(Group::Inline {
        certificate: i.certificate?,
        private_key: i.private_key?,
    })
}

fn path<'a>(i: &TlsContextOptionsInputs<'a>) -> Option<Group<'a>> {
    Some(Group::Path {
        certificate_path: i.certificate_path?,
        private_key_path: i.private_key_path?,
    })
}

fn pkcs11<'a>(i: &TlsContextOptionsInputs<'a>) -> Option<Group<'a>> {
    i.pkcs11.map(Group::Pkcs11)
}

fn custom<'a>(i: &TlsContextOptionsInputs<'a>) -> Option<Group<'a>> {
    i.custom_key_operation.map(Group::Custom)
}

fn pkcs12<'a>(i: &TlsContextOptionsInputs<'a>) -> Option<Group<'a>> {
    Some(Group::Pkcs12 {
        path: i.pkcs12_path?,
        password: i.pkcs12_password?,
    })
}

fn system_store<'a>(i: &TlsContextOptionsInputs<'a>) -> Option<Group<'a>> {
    i.windows_cert_store_path.map(Group::SystemStore)
}

const RULES: [Rule; 6] = [inline, path, pkcs11, custom, pkcs12, system_store];

fn complete_groups<'a, 'i>(
    inputs: &'i TlsContextOptionsInputs<'a>,
) -> impl Iterator<Item = Group<'a>> + 'i {
    RULES.iter().filter_map(move |rule| rule(inputs))
}

/// Which identity `inputs` select, without copying anything.
pub fn select(inputs: &TlsContextOptionsInputs<'_>) -> IdentityKind {
    complete_groups(inputs)
        .next()
        .map_or(IdentityKind::None, |group| group.kind())
}

/// A client identity, with all its material owned.
pub enum IdentitySource {
    /// Inline PEM certificate chain and private key.
    InlineCertAndKey {
        /// PEM certificate chain.
        certificate: Buffer,
        /// PEM private key.
        private_key: SecretBuffer,
    },
    /// PEM certificate chain and private key in files.
    PathCertAndKey {
        /// Path to the PEM certificate chain.
        certificate_path: OwnedText,
        /// Path to the PEM private key.
        private_key_path: OwnedText,
    },
    /// Key held in a PKCS#11 token.
    Pkcs11(Box<Pkcs11Options>),
    /// Signatures delegated to a handler.
    CustomKeyOperation {
        /// Performs the signatures.
        handler: Arc<dyn KeyOperationHandler>,
        /// Where the certificate chain comes from.
        certificate: CertificateSource,
    },
    /// PKCS#12 archive.
    Pkcs12 {
        /// Path to the archive.
        path: OwnedText,
        /// Password protecting the archive.
        password: SecretBuffer,
    },
    /// Operating system certificate store.
    WindowsCertStorePath {
        /// Store location and certificate selector.
        path: OwnedText,
    },
    /// No client identity.
    None,
}

impl IdentitySource {
    /// Select an identity from `inputs` and copy its material.
    ///
    /// Nothing is handed to any backend yet; in particular a custom key
    /// operation with a missing or doubly-specified certificate is
    /// rejected here.
    pub fn from_inputs(inputs: &TlsContextOptionsInputs<'_>) -> Result<Self> {
        let mut candidates = complete_groups(inputs);
        let Some(selected) = candidates.next() else {
            return Ok(Self::None);
        };
        for ignored in candidates {
            log::debug!(
                "Client identity {:?} takes precedence; ignoring {:?}",
                selected.kind(),
                ignored.kind()
            );
        }
        selected.copy()
    }

    /// Which kind of identity this is.
    pub fn kind(&self) -> IdentityKind {
        match self {
            Self::InlineCertAndKey { .. } => IdentityKind::InlineCertAndKey,
            Self::PathCertAndKey { .. } => IdentityKind::PathCertAndKey,
            Self::Pkcs11(_) => IdentityKind::Pkcs11,
            Self::CustomKeyOperation { .. } => IdentityKind::CustomKeyOperation,
            Self::Pkcs12 { .. } => IdentityKind::Pkcs12,
            Self::WindowsCertStorePath { .. } => IdentityKind::WindowsCertStorePath,
            Self::None => IdentityKind::None,
        }
    }

    /// Initialise `options` with this identity. This resets any trust
    /// store override already present on `options`.
    pub fn initialize<B: TlsBackend>(&self, backend: &B, options: &mut B::Options) -> Result<()> {
        match self {
            Self::InlineCertAndKey {
                certificate,
                private_key,
            } => backend
                .init_client_mtls(options, certificate.as_bytes(), private_key.expose())
                .map_err(TlsOptionsError::backend("init_client_mtls")),
            Self::PathCertAndKey {
                certificate_path,
                private_key_path,
            } => backend
                .init_client_mtls_from_path(
                    options,
                    certificate_path.as_path(),
                    private_key_path.as_path(),
                )
                .map_err(TlsOptionsError::backend("init_client_mtls_from_path")),
            Self::Pkcs11(pkcs11) => backend
                .init_client_mtls_with_pkcs11(options, pkcs11)
                .map_err(TlsOptionsError::backend("init_client_mtls_with_pkcs11")),
            Self::CustomKeyOperation {
                handler,
                certificate,
            } => {
                let certificate = certificate.load()?;
                backend
                    .init_client_mtls_with_custom_key_operation(options, handler, &certificate)
                    .map_err(TlsOptionsError::backend(
                        "init_client_mtls_with_custom_key_operation",
                    ))
            }
            Self::Pkcs12 { path, password } => backend
                .init_client_mtls_pkcs12_from_path(options, path.as_path(), password.expose())
                .map_err(TlsOptionsError::backend("init_client_mtls_pkcs12_from_path")),
            Self::WindowsCertStorePath { path } => backend
                .init_client_mtls_from_system_store(options, path.as_str())
                .map_err(TlsOptionsError::backend("init_client_mtls_from_system_store")),
            Self::None => Ok(()),
        }
    }
}

impl fmt::Debug for IdentitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InlineCertAndKey {
                certificate,
                private_key,
            } => f
                .debug_struct("InlineCertAndKey")
                .field("certificate", certificate)
                .field("private_key", private_key)
                .finish(),
            Self::PathCertAndKey {
                certificate_path,
                private_key_path,
            } => f
                .debug_struct("PathCertAndKey")
                .field("certificate_path", certificate_path)
                .field("private_key_path", private_key_path)
                .finish(),
            Self::Pkcs11(pkcs11) => f.debug_tuple("Pkcs11").field(pkcs11).finish(),
            Self::CustomKeyOperation {
                handler,
                certificate,
            } => f
                .debug_struct("CustomKeyOperation")
                .field("handler", handler)
                .field("certificate", certificate)
                .finish(),
            Self::Pkcs12 { path, password } => f
                .debug_struct("Pkcs12")
                .field("path", path)
                .field("password", password)
                .finish(),
            Self::WindowsCertStorePath { path } => {
                f.debug_struct("WindowsCertStorePath").field("path", path).finish()
            }
            Self::None => f.write_str("None"),
        }
    }
}
