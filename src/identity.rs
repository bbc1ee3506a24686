//! Bottle identity: the key pair minted onto a physical item.
//!
//! A bottle's on-chain identifier is a regular account address derived from a
//! random 256-bit secp256k1 scalar, exactly like any wallet account.  The
//! private key exists only in transient state and on the printed label; it is
//! never persisted by this crate.

use std::fmt;

use alloy_primitives::Address;
use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("private key must be 64 hex characters with an optional 0x prefix")]
    InvalidFormat,
    #[error("private key is not a valid secp256k1 scalar")]
    OutOfRange,
}

/// A bottle's private key.  Debug output is redacted; the raw hex form is
/// only reachable through [`BottleKey::to_hex`].
#[derive(Clone)]
pub struct BottleKey {
    inner: SigningKey,
}

impl BottleKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        Self {
            inner: SigningKey::random(&mut OsRng),
        }
    }

    /// Parse a key from its textual form: exactly 64 hex characters,
    /// case-insensitive, with an optional `0x` prefix.  This is the shape of
    /// a scanned label payload.
    pub fn from_hex(text: &str) -> Result<Self, KeyError> {
        let trimmed = text.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.len() != 64 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(KeyError::InvalidFormat);
        }
        let bytes = Zeroizing::new(hex::decode(digits).map_err(|_| KeyError::InvalidFormat)?);
        let inner = SigningKey::from_slice(&bytes).map_err(|_| KeyError::OutOfRange)?;
        Ok(Self { inner })
    }

    /// `0x`-prefixed lowercase hex; this is the QR payload and round-trips
    /// through [`BottleKey::from_hex`].
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("0x{}", hex::encode(self.inner.to_bytes())))
    }

    /// Derive the account address: keccak256 of the uncompressed public key,
    /// last 20 bytes.  Pure and deterministic in the key.
    pub fn address(&self) -> Address {
        let point = self.inner.verifying_key().to_encoded_point(false);
        // skip the 0x04 SEC1 tag byte
        Address::from_raw_public_key(&point.as_bytes()[1..])
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.inner
    }
}

impl fmt::Debug for BottleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BottleKey(<redacted>)")
    }
}

/// Where an identity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    Generated,
    Imported,
}

/// A bottle's cryptographic identity.
///
/// Imported identities (the "existing address" path) carry no private key:
/// registration and minting work, but no label can be produced and no
/// ownership transfer can be signed.
#[derive(Debug, Clone)]
pub struct BottleIdentity {
    pub address: Address,
    pub source: IdentitySource,
    key: Option<BottleKey>,
}

impl BottleIdentity {
    /// Mint a fresh identity with a random key pair.
    pub fn generate() -> Self {
        let key = BottleKey::generate();
        Self {
            address: key.address(),
            source: IdentitySource::Generated,
            key: Some(key),
        }
    }

    /// Identity for an existing on-chain address; no private key available.
    pub fn from_address(address: Address) -> Self {
        Self {
            address,
            source: IdentitySource::Imported,
            key: None,
        }
    }

    /// Identity reconstructed from a scanned key.
    pub fn from_key(key: BottleKey) -> Self {
        Self {
            address: key.address(),
            source: IdentitySource::Imported,
            key: Some(key),
        }
    }

    pub fn key(&self) -> Option<&BottleKey> {
        self.key.as_ref()
    }
}
