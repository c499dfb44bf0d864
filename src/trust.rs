//! Replacing the backend's default certificate authorities.
//!
//! A trust override is applied only after the client identity has been
//! initialised, because identity initialisation resets the trust store.

use crate::backend::TlsBackend;
use crate::buffer::{Buffer, OwnedText};
use crate::error::{Result, TlsOptionsError};
use crate::options::TlsContextOptionsInputs;

/// Which certificate authorities the client trusts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TrustOverride {
    /// The backend's default trust store.
    #[default]
    BackendDefault,
    /// PEM certificate authorities given inline.
    InlinePem(Buffer),
    /// PEM certificate authorities from a file, a directory, or both.
    FromPath {
        /// PEM bundle file.
        ca_file: Option<OwnedText>,
        /// Directory of PEM files.
        ca_dir: Option<OwnedText>,
    },
}

impl TrustOverride {
    /// Select and copy the trust override. An inline bundle takes
    /// precedence over paths.
    pub fn from_inputs(inputs: &TlsContextOptionsInputs<'_>) -> Result<Self> {
        if let Some(ca) = inputs.ca {
            if inputs.ca_file.is_some() || inputs.ca_dir.is_some() {
                log::debug!("Inline CA bundle takes precedence; ignoring CA file and directory");
            }
            return Ok(Self::InlinePem(Buffer::from_raw("caRoot", ca)?));
        }
        if inputs.ca_file.is_none() && inputs.ca_dir.is_none() {
            return Ok(Self::BackendDefault);
        }
        Ok(Self::FromPath {
            ca_file: inputs
                .ca_file
                .map(|raw| OwnedText::from_raw("caFile", raw))
                .transpose()?,
            ca_dir: inputs
                .ca_dir
                .map(|raw| OwnedText::from_raw("caPath", raw))
                .transpose()?,
        })
    }

    /// Apply the override to `options`.
    pub fn apply<B: TlsBackend>(&self, backend: &B, options: &mut B::Options) -> Result<()> {
        match self {
            Self::BackendDefault => Ok(()),
            Self::InlinePem(ca) => backend
                .override_trust_store(options, ca.as_bytes())
                .map_err(TlsOptionsError::backend("override_trust_store")),
            Self::FromPath { ca_file, ca_dir } => backend
                .override_trust_store_from_path(
                    options,
                    ca_dir.as_ref().map(OwnedText::as_path),
                    ca_file.as_ref().map(OwnedText::as_path),
                )
                .map_err(TlsOptionsError::backend("override_trust_store_from_path")),
        }
    }
}
