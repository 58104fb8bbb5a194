//! ED25519 key pairs in the encodings the ledger tooling exchanges.
//!
//! Private keys are carried as 32-byte seeds, public keys as 32-byte
//! compressed points, both hex-encoded. The DER-wrapped hex form emitted by
//! common ledger SDKs is accepted on input and stripped down to the raw key.

use std::fmt;

use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use thiserror::Error;

/// DER prefix on an encoded ED25519 private key (PKCS#8).
const PRIVATE_DER_PREFIX: &str = "302e020100300506032b657004220420";
/// DER prefix on an encoded ED25519 public key (SPKI).
const PUBLIC_DER_PREFIX: &str = "302a300506032b6570032100";

/// Failure decoding key material from its hex form.
///
/// `PartialEq` only: the wrapped [`hex::FromHexError`] does not implement
/// `Eq`, and comparisons here are for tests and error matching.
#[derive(Debug, Error, PartialEq)]
pub enum KeyError {
    /// The input was not valid hexadecimal.
    #[error("key is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    /// The decoded input was not exactly 32 bytes.
    #[error("key must decode to 32 bytes, got {actual}")]
    Length { actual: usize },
    /// The bytes decode but do not form a usable ed25519 public key.
    #[error("bytes do not form a valid ed25519 public key")]
    InvalidKeyMaterial,
}

/// An ED25519 signing key.
///
/// `Debug` never reveals the seed; use [`PrivateKey::to_hex`] when the
/// caller explicitly wants the secret (for example `tokenflow keygen`).
#[derive(Clone)]
pub struct PrivateKey {
    signing: SigningKey,
}

impl PrivateKey {
    /// Generate a fresh key from the operating system's entropy source.
    pub fn generate() -> Self {
        Self { signing: SigningKey::generate(&mut OsRng) }
    }

    /// Decode a key from hex, accepting either the raw 32-byte seed or the
    /// DER-wrapped form SDK tooling prints.
    pub fn from_hex(input: &str) -> Result<Self, KeyError> {
        let seed = decode_key_hex(input, PRIVATE_DER_PREFIX)?;
        Ok(Self { signing: SigningKey::from_bytes(&seed) })
    }

    /// The raw seed, hex encoded.
    pub fn to_hex(&self) -> String {
        hex::encode(self.signing.to_bytes())
    }

    /// The matching public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing.verifying_key())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// An ED25519 verification key, used wherever the ledger records an
/// account or file key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    /// Decode a key from hex, accepting raw or DER-wrapped input.
    pub fn from_hex(input: &str) -> Result<Self, KeyError> {
        let bytes = decode_key_hex(input, PUBLIC_DER_PREFIX)?;
        let key = VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidKeyMaterial)?;
        Ok(Self(key))
    }

    /// The compressed point, hex encoded.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_bytes())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

fn decode_key_hex(input: &str, der_prefix: &str) -> Result<[u8; 32], KeyError> {
    let lowered = input.trim().to_ascii_lowercase();
    let stripped = lowered.strip_prefix("0x").unwrap_or(&lowered);
    let raw = stripped.strip_prefix(der_prefix).unwrap_or(stripped);
    let bytes = hex::decode(raw)?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| KeyError::Length { actual })
}
