//! Application-Layer Protocol Negotiation lists.

use crate::backend::BackendError;

/// Separator between protocol names in the textual list form.
pub const SEPARATOR: char = ';';

/// Largest encoded ProtocolNameList (RFC 7301): a u16 length prefix
/// covers every name together with its one byte length.
pub const MAX_ENCODED_LEN: usize = 0xffff;

/// An ordered list of ALPN protocol names, most preferred first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlpnList(Vec<String>);

impl AlpnList {
    /// Parse a list of the form `"h2;http/1.1"`.
    ///
    /// Every entry must be between 1 and 255 bytes long and the encoded
    /// list must fit in [`MAX_ENCODED_LEN`] (RFC 7301).
    pub fn parse(list: &str) -> Result<Self, BackendError> {
        let parsed = list
            .split(SEPARATOR)
            .map(|protocol| match protocol.len() {
                0 => Err(BackendError::InvalidAlpn(format!(
                    "empty protocol name in {:?}",
                    list
                ))),
                1..=255 => Ok(protocol.to_owned()),
                _ => Err(BackendError::InvalidAlpn(format!(
                    "protocol name longer than 255 bytes in {:?}",
                    list
                ))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)?;
        if parsed.encoded_len() > MAX_ENCODED_LEN {
            return Err(BackendError::InvalidAlpn(format!(
                "{} protocol names encode to {} bytes, more than {}",
                parsed.len(),
                parsed.encoded_len(),
                MAX_ENCODED_LEN
            )));
        }
        Ok(parsed)
    }

    /// Size of the ProtocolNameList body on the wire.
    pub fn encoded_len(&self) -> usize {
        self.0.iter().map(|protocol| protocol.len() + 1).sum()
    }

    /// Protocol names in preference order.
    pub fn protocols(&self) -> &[String] {
        &self.0
    }

    /// Iterate over the protocol names as they go on the wire.
    pub fn iter_bytes(&self) -> impl Iterator<Item = &[u8]> {
        self.0.iter().map(String::as_bytes)
    }

    /// Number of protocols.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true for a successfully parsed list.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_preference_order() {
        let list = AlpnList::parse("h2;http/1.1").expect("valid list");
        assert_eq!(list.protocols(), ["h2", "http/1.1"]);
        assert_eq!(
            list.iter_bytes().collect::<Vec<_>>(),
            [b"h2".as_slice(), b"http/1.1".as_slice()]
        );
    }

    #[test]
    fn single_entry() {
        assert_eq!(AlpnList::parse("h2").expect("valid").len(), 1);
    }

    #[test]
    fn rejects_empty_entries() {
        for bad in ["", "h2;", ";h2", "h2;;http/1.1"] {
            assert!(
                matches!(AlpnList::parse(bad), Err(BackendError::InvalidAlpn(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn rejects_overlong_entries() {
        let long = "x".repeat(256);
        assert!(AlpnList::parse(&long).is_err());
        assert!(AlpnList::parse(&long[..255]).is_ok());
    }

    #[test]
    fn encoded_list_limit() {
        let name = "x".repeat(255);
        let fits = vec![name.as_str(); MAX_ENCODED_LEN / 256].join(";");
        let list = AlpnList::parse(&fits).expect("fits");
        assert_eq!(list.encoded_len(), 255 * 256);

        let too_many = vec![name.as_str(); MAX_ENCODED_LEN / 256 + 1].join(";");
        assert!(matches!(
            AlpnList::parse(&too_many),
            Err(BackendError::InvalidAlpn(_))
        ));
        assert_eq!(AlpnList::parse("h2;http/1.1").expect("valid").encoded_len(), 12);
    }
}
