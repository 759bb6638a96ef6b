//! Account Identity
//!
//! A 32-byte public account key, written as base-58 text.
//!
//! ## Curve membership
//! A spendable account key is a compressed ed25519 point. Program-derived
//! addresses are deliberately *off* the curve: they decode fine but no private
//! key exists for them, so tokens sent there are only movable by a program.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Identity length in bytes
pub const IDENTITY_LEN: usize = 32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Invalid base58 encoding: {0}")]
    InvalidEncoding(String),

    #[error("Invalid identity length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// Public account identifier
///
/// Equality is byte-exact.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity([u8; IDENTITY_LEN]);

impl Identity {
    pub const fn new(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }

    #[inline]
    pub fn to_bytes(self) -> [u8; IDENTITY_LEN] {
        self.0
    }

    /// Check whether the key is a valid compressed ed25519 point
    pub fn is_on_curve(&self) -> bool {
        VerifyingKey::from_bytes(&self.0).is_ok()
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    /// Strict decode: no trimming, exactly 32 bytes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // 32 bytes never need more than 44 base58 chars
        if s.is_empty() || s.len() > 44 {
            return Err(IdentityError::InvalidEncoding(format!(
                "unexpected text length {}",
                s.len()
            )));
        }

        let decoded = bs58::decode(s)
            .into_vec()
            .map_err(|e| IdentityError::InvalidEncoding(e.to_string()))?;

        let bytes: [u8; IDENTITY_LEN] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| IdentityError::InvalidLength(decoded.len()))?;

        Ok(Self(bytes))
    }
}

impl From<VerifyingKey> for Identity {
    fn from(key: VerifyingKey) -> Self {
        Self(key.to_bytes())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.to_base58())
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Identity::from_str(&s).map_err(serde::de::Error::custom)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base58_roundtrip() {
        let (_, id) = test_keys::keypair();
        let text = id.to_string();
        assert_eq!(Identity::from_str(&text).unwrap(), id);
    }

    #[test]
    fn test_system_program_id_decodes_to_zero() {
        let id = Identity::from_str("11111111111111111111111111111111").unwrap();
        assert_eq!(id.as_bytes(), &[0u8; 32]);
    }

    #[test]
    fn test_reject_bad_alphabet() {
        // '0', 'O', 'I', 'l' are not in the base58 alphabet
        let err = Identity::from_str("0OIl0OIl0OIl0OIl0OIl0OIl0OIl0OIl").unwrap_err();
        assert!(matches!(err, IdentityError::InvalidEncoding(_)));
    }

    #[test]
    fn test_reject_wrong_length() {
        let short = bs58::encode([7u8; 31]).into_string();
        assert_eq!(
            Identity::from_str(&short).unwrap_err(),
            IdentityError::InvalidLength(31)
        );
    }

    #[test]
    fn test_reject_empty_and_padded() {
        let (_, id) = test_keys::keypair();
        assert!(Identity::from_str("").is_err());
        assert!(Identity::from_str(&format!(" {}", id)).is_err());
        assert!(Identity::from_str(&format!("{} ", id)).is_err());
    }

    #[test]
    fn test_curve_membership() {
        let (_, id) = test_keys::keypair();
        assert!(id.is_on_curve());
        assert!(!test_keys::off_curve().is_on_curve());
    }

    #[test]
    fn test_serde_as_base58_string() {
        let (_, id) = test_keys::keypair();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
