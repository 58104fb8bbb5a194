//! Typed stand-ins for contract-call parameters and return values.
//!
//! The workflow passes entity addresses and unsigned integers into contract
//! functions and reads the same kinds back. These types model that exchange
//! as structured values; byte-level calldata encoding belongs to whatever
//! client sits behind the ledger seam, not to this workspace.

use std::fmt;

use thiserror::Error;

use crate::EntityId;

/// A value passed to or returned from a contract function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionValue {
    /// A 20-byte entity address.
    Address(SolidityAddress),
    /// An unsigned integer. Named for the ABI slot width; the ledger in this
    /// workspace never produces values beyond `u128`.
    Uint256(u128),
}

impl fmt::Display for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(address) => address.fmt(f),
            Self::Uint256(value) => value.fmt(f),
        }
    }
}

/// Failure pulling a typed value out of parameters or results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    /// No value exists at the requested position.
    #[error("no value at index {index}")]
    Missing { index: usize },
    /// The value at the position has a different type.
    #[error("value at index {index} is not {expected}")]
    WrongType { index: usize, expected: &'static str },
    /// A textual address did not decode to 20 bytes of hex.
    #[error("invalid solidity address {input:?}")]
    InvalidAddress { input: String },
}

fn address_at(values: &[FunctionValue], index: usize) -> Result<SolidityAddress, AbiError> {
    match values.get(index) {
        Some(FunctionValue::Address(address)) => Ok(*address),
        Some(_) => Err(AbiError::WrongType { index, expected: "an address" }),
        None => Err(AbiError::Missing { index }),
    }
}

fn uint256_at(values: &[FunctionValue], index: usize) -> Result<u128, AbiError> {
    match values.get(index) {
        Some(FunctionValue::Uint256(value)) => Ok(*value),
        Some(_) => Err(AbiError::WrongType { index, expected: "a uint256" }),
        None => Err(AbiError::Missing { index }),
    }
}

/// Ordered argument list for a contract call, built fluently:
///
/// ```
/// use tokenflow_types::{FunctionParameters, TokenId};
///
/// let params = FunctionParameters::new()
///     .add_address(TokenId::new(1001).to_solidity_address())
///     .add_uint256(200);
/// assert_eq!(params.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FunctionParameters {
    values: Vec<FunctionValue>,
}

impl FunctionParameters {
    /// An empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an address argument.
    pub fn add_address(mut self, address: SolidityAddress) -> Self {
        self.values.push(FunctionValue::Address(address));
        self
    }

    /// Append an unsigned integer argument.
    pub fn add_uint256(mut self, value: u128) -> Self {
        self.values.push(FunctionValue::Uint256(value));
        self
    }

    /// Address argument at `index`.
    pub fn address(&self, index: usize) -> Result<SolidityAddress, AbiError> {
        address_at(&self.values, index)
    }

    /// Unsigned integer argument at `index`.
    pub fn uint256(&self, index: usize) -> Result<u128, AbiError> {
        uint256_at(&self.values, index)
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Decoded return values of a contract call, read positionally the same way
/// arguments are written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FunctionResult {
    values: Vec<FunctionValue>,
}

impl FunctionResult {
    /// Wrap already-decoded return values.
    pub fn new(values: Vec<FunctionValue>) -> Self {
        Self { values }
    }

    /// A result carrying a single value.
    pub fn single(value: FunctionValue) -> Self {
        Self { values: vec![value] }
    }

    /// Address return value at `index`.
    pub fn address(&self, index: usize) -> Result<SolidityAddress, AbiError> {
        address_at(&self.values, index)
    }

    /// Unsigned integer return value at `index`.
    pub fn uint256(&self, index: usize) -> Result<u128, AbiError> {
        uint256_at(&self.values, index)
    }
}

/// The 20-byte address form of a ledger entity: big-endian shard (4 bytes),
/// realm (8 bytes), and entity number (8 bytes). Displayed as 40 lowercase
/// hex characters without a `0x` prefix, matching SDK conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SolidityAddress(pub [u8; 20]);

impl SolidityAddress {
    /// Decode an address from 40 hex characters, with or without `0x`.
    pub fn from_hex(input: &str) -> Result<Self, AbiError> {
        let stripped = input.strip_prefix("0x").unwrap_or(input);
        let bytes = hex::decode(stripped)
            .map_err(|_| AbiError::InvalidAddress { input: input.to_string() })?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| AbiError::InvalidAddress { input: input.to_string() })?;
        Ok(Self(bytes))
    }

    /// Split the address back into its entity id parts.
    pub fn to_entity_id(self) -> EntityId {
        let mut shard = [0u8; 4];
        let mut realm = [0u8; 8];
        let mut num = [0u8; 8];
        shard.copy_from_slice(&self.0[0..4]);
        realm.copy_from_slice(&self.0[4..12]);
        num.copy_from_slice(&self.0[12..20]);
        EntityId::new(
            u64::from(u32::from_be_bytes(shard)),
            u64::from_be_bytes(realm),
            u64::from_be_bytes(num),
        )
    }
}

impl fmt::Display for SolidityAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
