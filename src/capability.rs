//! Questions about the backend which do not need any options.

use crate::backend::TlsBackend;
use crate::error::Result;
use crate::version::TlsCipherPreference;

/// Whether `backend` can negotiate ALPN.
pub fn is_alpn_available<B: TlsBackend>(backend: &B) -> bool {
    backend.is_alpn_available()
}

/// Whether `backend` supports the cipher preference with raw value
/// `preference`. Values outside the enumeration are an
/// [`InvalidArgument`](crate::TlsOptionsError::InvalidArgument) error.
pub fn is_cipher_preference_supported<B: TlsBackend>(backend: &B, preference: i32) -> Result<bool> {
    let preference = TlsCipherPreference::try_from(preference)?;
    Ok(backend.is_cipher_preference_supported(preference))
}
