//! Owned copies of caller-supplied material.
//!
//! Everything the options keep is copied out of the caller's memory when
//! they are built. Key material and passwords go into [`SecretBuffer`],
//! which overwrites its contents with zeros when dropped; certificates go
//! into plain [`Buffer`]s and paths and lists into [`OwnedText`].
//!
//! The raw values arrive from a host marshaling layer as native strings,
//! so all three types accept only UTF-8 without interior NUL bytes. A
//! value is validated before anything is copied: either the whole buffer
//! is created or none of it is.

use std::fmt;
use std::path::Path;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{ConversionFailure, Result, TlsOptionsError};

fn check_text(raw: &[u8]) -> Result<&str, ConversionFailure> {
    let text =
        std::str::from_utf8(raw).map_err(|e| ConversionFailure::InvalidUtf8(e.valid_up_to()))?;
    match raw.iter().position(|b| *b == 0) {
        Some(offset) => Err(ConversionFailure::InteriorNul(offset)),
        None => Ok(text),
    }
}

/// An owned byte buffer for material that is not secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Buffer(Box<[u8]>);

impl Buffer {
    /// Copy `raw` into a new buffer. `field` names the input in errors.
    pub fn from_raw(field: &'static str, raw: &[u8]) -> Result<Self> {
        check_text(raw).map_err(|reason| TlsOptionsError::conversion(field, reason))?;
        Ok(Self(raw.into()))
    }

    /// Contents of the buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Buffer({} bytes)", self.0.len())
    }
}

/// An owned byte buffer for key material and passwords.
///
/// The contents are overwritten with zeros before the memory is released.
/// Neither `Debug` nor any other formatting shows the contents.
pub struct SecretBuffer(Zeroizing<Vec<u8>>);

impl SecretBuffer {
    /// Copy `raw` into a new secret buffer. `field` names the input in errors.
    pub fn from_raw(field: &'static str, raw: &[u8]) -> Result<Self> {
        check_text(raw).map_err(|reason| TlsOptionsError::conversion(field, reason))?;
        Ok(Self(Zeroizing::new(raw.to_vec())))
    }

    /// Take ownership of bytes which are already secret, such as the
    /// contents of a password file.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Contents of the buffer.
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Zeroize for SecretBuffer {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl ZeroizeOnDrop for SecretBuffer {}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretBuffer(<redacted>)")
    }
}

/// An owned string, used for paths and the ALPN list.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OwnedText(Box<str>);

impl OwnedText {
    /// Copy `raw` into a new string. `field` names the input in errors.
    pub fn from_raw(field: &'static str, raw: &[u8]) -> Result<Self> {
        let text = check_text(raw).map_err(|reason| TlsOptionsError::conversion(field, reason))?;
        Ok(Self(text.into()))
    }

    /// The text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The text, interpreted as a filesystem path.
    pub fn as_path(&self) -> &Path {
        Path::new(&*self.0)
    }
}

impl AsRef<str> for OwnedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for OwnedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for OwnedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_are_independent_of_the_source() {
        let mut raw = b"-----BEGIN CERTIFICATE-----".to_vec();
        let buffer = Buffer::from_raw("certificate", &raw).expect("valid text");
        raw[0] = b'x';
        assert_eq!(buffer.as_bytes()[0], b'-');
        assert_eq!(buffer.len(), 27);
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        match OwnedText::from_raw("certificatePath", b"/tmp/\xff.pem") {
            Err(TlsOptionsError::Conversion { field, reason }) => {
                assert_eq!(field, "certificatePath");
                assert_eq!(reason, ConversionFailure::InvalidUtf8(5));
            }
            other => panic!("expected a conversion error, got {:?}", other),
        }
    }

    #[test]
    fn interior_nul_is_rejected() {
        assert!(matches!(
            SecretBuffer::from_raw("pkcs12Password", b"pass\0word"),
            Err(TlsOptionsError::Conversion {
                field: "pkcs12Password",
                reason: ConversionFailure::InteriorNul(4),
            })
        ));
    }

    #[test]
    fn secret_is_redacted_and_wipeable() {
        let mut secret = SecretBuffer::from_raw("privateKey", b"hunter2").expect("valid text");
        assert_eq!(secret.expose(), b"hunter2");
        assert_eq!(format!("{:?}", secret), "SecretBuffer(<redacted>)");
        secret.zeroize();
        assert!(secret.is_empty());
    }

    #[test]
    fn empty_input_is_a_valid_buffer() {
        let text = OwnedText::from_raw("alpnList", b"").expect("empty is fine");
        assert_eq!(text.as_str(), "");
    }
}
