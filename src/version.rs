//! Minimum protocol versions and cipher suite preferences.
//!
//! Both are carried across the host boundary as plain integers; the
//! `TryFrom<i32>` conversions are the only place their range is checked.

use std::fmt;
use std::str::FromStr;

use crate::error::TlsOptionsError;

/// Minimum TLS protocol version a client is willing to negotiate.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum TlsVersion {
    /// SSL 3.0
    Ssl3 = 0,
    /// TLS 1.0
    Tls1_0 = 1,
    /// TLS 1.1
    Tls1_1 = 2,
    /// TLS 1.2
    Tls1_2 = 3,
    /// TLS 1.3
    Tls1_3 = 4,
    /// Whatever the backend considers safe.
    #[default]
    SystemDefault = 128,
}

impl TlsVersion {
    const ALL: [TlsVersion; 6] = [
        Self::Ssl3,
        Self::Tls1_0,
        Self::Tls1_1,
        Self::Tls1_2,
        Self::Tls1_3,
        Self::SystemDefault,
    ];

    /// Name used on the command line and in log messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ssl3 => "ssl3",
            Self::Tls1_0 => "tls1.0",
            Self::Tls1_1 => "tls1.1",
            Self::Tls1_2 => "tls1.2",
            Self::Tls1_3 => "tls1.3",
            Self::SystemDefault => "default",
        }
    }
}

impl TryFrom<i32> for TlsVersion {
    type Error = TlsOptionsError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|v| *v as i32 == value)
            .ok_or(TlsOptionsError::InvalidArgument {
                what: "TlsVersion",
                value,
            })
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TlsVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        Self::ALL
            .into_iter()
            .find(|v| v.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown TLS version {:?}", s))
    }
}

/// A named bundle of cipher suites and key exchange groups, selectable as
/// a unit.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum TlsCipherPreference {
    /// The backend's own defaults.
    #[default]
    SystemDefault = 0,
    /// Deprecated KMS post-quantum policy.
    KmsPqTlsv1_0_2019_06 = 1,
    /// Deprecated KMS post-quantum policy using SIKE.
    KmsPqSikeTlsv1_0_2019_11 = 2,
    /// Deprecated KMS post-quantum policy.
    KmsPqTlsv1_0_2020_02 = 3,
    /// Deprecated KMS post-quantum policy using SIKE.
    KmsPqSikeTlsv1_0_2020_02 = 4,
    /// Deprecated KMS post-quantum policy.
    KmsPqTlsv1_0_2020_07 = 5,
    /// Hybrid post-quantum key exchange, TLS 1.0 and later.
    PqTlsv1_0_2021_05 = 6,
    /// Hybrid ML-KEM key exchange, TLS 1.2 and later.
    PqTlsv1_2_2024_10 = 7,
    /// The backend's recommended post-quantum policy.
    PqDefault = 8,
    /// TLS 1.2 and later with forward-secret AEAD suites only.
    Tlsv1_2_2025_07 = 9,
}

impl TlsCipherPreference {
    /// One past the largest valid raw value.
    pub const END_RANGE: i32 = 10;

    const ALL: [TlsCipherPreference; 10] = [
        Self::SystemDefault,
        Self::KmsPqTlsv1_0_2019_06,
        Self::KmsPqSikeTlsv1_0_2019_11,
        Self::KmsPqTlsv1_0_2020_02,
        Self::KmsPqSikeTlsv1_0_2020_02,
        Self::KmsPqTlsv1_0_2020_07,
        Self::PqTlsv1_0_2021_05,
        Self::PqTlsv1_2_2024_10,
        Self::PqDefault,
        Self::Tlsv1_2_2025_07,
    ];

    /// Name used on the command line and in log messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::SystemDefault => "default",
            Self::KmsPqTlsv1_0_2019_06 => "kms-pq-tls-1-0-2019-06",
            Self::KmsPqSikeTlsv1_0_2019_11 => "kms-pq-sike-tls-1-0-2019-11",
            Self::KmsPqTlsv1_0_2020_02 => "kms-pq-tls-1-0-2020-02",
            Self::KmsPqSikeTlsv1_0_2020_02 => "kms-pq-sike-tls-1-0-2020-02",
            Self::KmsPqTlsv1_0_2020_07 => "kms-pq-tls-1-0-2020-07",
            Self::PqTlsv1_0_2021_05 => "pq-tls-1-0-2021-05",
            Self::PqTlsv1_2_2024_10 => "pq-tls-1-2-2024-10",
            Self::PqDefault => "pq-default",
            Self::Tlsv1_2_2025_07 => "tls-1-2-2025-07",
        }
    }
}

impl TryFrom<i32> for TlsCipherPreference {
    type Error = TlsOptionsError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if !(0..Self::END_RANGE).contains(&value) {
            return Err(TlsOptionsError::InvalidArgument {
                what: "TlsCipherPreference",
                value,
            });
        }
        Ok(Self::ALL[value as usize])
    }
}

impl fmt::Display for TlsCipherPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TlsCipherPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown cipher preference {:?}", s))
    }
}
