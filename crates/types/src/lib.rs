//! Shared type definitions for the tokenflow workspace.
//!
//! This crate holds the vocabulary every other crate speaks: ledger entity
//! identifiers (`shard.realm.num` triplets), hbar currency amounts, receipt
//! status codes, token metadata, ED25519 key material, and the typed
//! contract-function parameter/result values used at the contract-call seam.
//! Nothing in here talks to a network; these are plain values with parsing,
//! formatting, and conversion rules.

use std::error::Error;
use std::fmt;
use std::str::FromStr;

pub mod abi;
pub mod keys;

pub use abi::{AbiError, FunctionParameters, FunctionResult, FunctionValue, SolidityAddress};
pub use keys::{KeyError, PrivateKey, PublicKey};

use serde::{Deserialize, Serialize};

/// Numeric triplet identifying any entity on the ledger.
///
/// Rendered as `shard.realm.num` (for example `0.0.1001`). The shard occupies
/// four bytes in the 20-byte solidity form, so values above `u32::MAX` are not
/// representable there; realm and num get eight bytes each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    /// Shard the entity lives in.
    pub shard: u64,
    /// Realm within the shard.
    pub realm: u64,
    /// Entity number, unique within the realm.
    pub num: u64,
}

impl EntityId {
    /// Build an identifier from its three parts.
    pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
        Self { shard, realm, num }
    }

    /// The 20-byte form used when an entity id is passed as a contract
    /// parameter: 4-byte shard, 8-byte realm, 8-byte num, all big-endian.
    pub fn to_solidity_address(self) -> SolidityAddress {
        let mut bytes = [0u8; 20];
        bytes[0..4].copy_from_slice(&(self.shard as u32).to_be_bytes());
        bytes[4..12].copy_from_slice(&self.realm.to_be_bytes());
        bytes[12..20].copy_from_slice(&self.num.to_be_bytes());
        SolidityAddress(bytes)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

impl FromStr for EntityId {
    type Err = ParseEntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(shard), Some(realm), Some(num), None) => {
                let shard = shard.parse().map_err(|_| ParseEntityIdError)?;
                let realm = realm.parse().map_err(|_| ParseEntityIdError)?;
                let num = num.parse().map_err(|_| ParseEntityIdError)?;
                Ok(Self { shard, realm, num })
            }
            _ => Err(ParseEntityIdError),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseEntityIdError;

impl fmt::Display for ParseEntityIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid entity id; expected 'shard.realm.num'")
    }
}

impl Error for ParseEntityIdError {}

macro_rules! entity_id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub EntityId);

        impl $name {
            /// Build an id in the default shard and realm (`0.0.num`).
            pub const fn new(num: u64) -> Self {
                Self(EntityId::new(0, 0, num))
            }

            /// The 20-byte contract-parameter form of this id.
            pub fn to_solidity_address(self) -> SolidityAddress {
                self.0.to_solidity_address()
            }

            /// Rebuild an id from its 20-byte contract-parameter form.
            pub fn from_solidity_address(address: SolidityAddress) -> Self {
                Self(address.to_entity_id())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = ParseEntityIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }

        impl From<EntityId> for $name {
            fn from(id: EntityId) -> Self {
                Self(id)
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

entity_id_type!(
    /// Identifier of a ledger account.
    AccountId
);
entity_id_type!(
    /// Identifier of a token definition.
    TokenId
);
entity_id_type!(
    /// Identifier of a stored file (used to stage contract bytecode).
    FileId
);
entity_id_type!(
    /// Identifier of a deployed smart contract.
    ContractId
);

/// Number of tinybars in one hbar.
pub const TINYBARS_PER_HBAR: i64 = 100_000_000;

/// An hbar currency amount, stored in tinybars.
///
/// Used for account starting balances, query payments, and transaction fee
/// caps. Negative amounts only appear as transient arithmetic results.
/// Serializes as a plain tinybar count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Hbar(i64);

impl Hbar {
    /// Zero hbars.
    pub const ZERO: Hbar = Hbar(0);

    /// An amount given in whole hbars. Saturates at the tinybar limits, so
    /// absurd configuration values surface as unpayable fees downstream.
    pub const fn from_hbars(hbars: i64) -> Self {
        Self(hbars.saturating_mul(TINYBARS_PER_HBAR))
    }

    /// An amount given in tinybars.
    pub const fn from_tinybars(tinybars: i64) -> Self {
        Self(tinybars)
    }

    /// The amount in tinybars.
    pub const fn tinybars(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Hbar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % TINYBARS_PER_HBAR == 0 {
            write!(f, "{} hbar", self.0 / TINYBARS_PER_HBAR)
        } else {
            write!(f, "{} tinybar", self.0)
        }
    }
}

impl Serialize for Hbar {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for Hbar {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i64::deserialize(deserializer).map(Hbar)
    }
}

/// Outcome code carried on a transaction receipt or query response.
///
/// The set below covers the codes this workspace's ledger surface can
/// produce; it is not the full code table of any particular network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    /// The transaction reached consensus and applied cleanly.
    Success,
    /// The authorizing key does not match the entity being operated on.
    InvalidSignature,
    /// The paying or referenced account does not exist.
    InvalidAccountId,
    /// The referenced token does not exist.
    InvalidTokenId,
    /// The referenced file does not exist.
    InvalidFileId,
    /// The referenced contract does not exist.
    InvalidContractId,
    /// The payer cannot cover the hbar cost of the operation.
    InsufficientPayerBalance,
    /// A token debit exceeds the sender's balance.
    InsufficientTokenBalance,
    /// The supplied gas limit is below what the call requires.
    InsufficientGas,
    /// The fee cap on the transaction is below the charged fee.
    InsufficientTxFee,
    /// A read-only call was submitted without an adequate query payment.
    InsufficientQueryPayment,
    /// The account has not associated with the token it would hold.
    TokenNotAssociatedToAccount,
    /// The account is already associated with the token.
    TokenAlreadyAssociatedToAccount,
    /// The signed amounts in a transfer list do not sum to zero.
    InvalidAccountAmounts,
    /// A single message exceeded the per-message size ceiling.
    TransactionOversize,
    /// The staged bytecode file was empty at deployment time.
    ContractBytecodeEmpty,
    /// The contract ran and reverted.
    ContractRevertExecuted,
    /// A delegated transfer exceeds the spender's approved allowance.
    SpenderDoesNotHaveAllowance,
}

impl ReceiptStatus {
    /// Whether this code means the operation applied.
    pub fn is_success(self) -> bool {
        matches!(self, ReceiptStatus::Success)
    }
}

impl fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::Success => "SUCCESS",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::InvalidAccountId => "INVALID_ACCOUNT_ID",
            Self::InvalidTokenId => "INVALID_TOKEN_ID",
            Self::InvalidFileId => "INVALID_FILE_ID",
            Self::InvalidContractId => "INVALID_CONTRACT_ID",
            Self::InsufficientPayerBalance => "INSUFFICIENT_PAYER_BALANCE",
            Self::InsufficientTokenBalance => "INSUFFICIENT_TOKEN_BALANCE",
            Self::InsufficientGas => "INSUFFICIENT_GAS",
            Self::InsufficientTxFee => "INSUFFICIENT_TX_FEE",
            Self::InsufficientQueryPayment => "INSUFFICIENT_QUERY_PAYMENT",
            Self::TokenNotAssociatedToAccount => "TOKEN_NOT_ASSOCIATED_TO_ACCOUNT",
            Self::TokenAlreadyAssociatedToAccount => "TOKEN_ALREADY_ASSOCIATED_TO_ACCOUNT",
            Self::InvalidAccountAmounts => "INVALID_ACCOUNT_AMOUNTS",
            Self::TransactionOversize => "TRANSACTION_OVERSIZE",
            Self::ContractBytecodeEmpty => "CONTRACT_BYTECODE_EMPTY",
            Self::ContractRevertExecuted => "CONTRACT_REVERT_EXECUTED",
            Self::SpenderDoesNotHaveAllowance => "SPENDER_DOES_NOT_HAVE_ALLOWANCE",
        };
        f.write_str(code)
    }
}

/// Kind of token defined on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    /// Interchangeable units with a shared supply.
    FungibleCommon,
    /// Individually numbered units (not exercised by the demo workflow).
    NonFungibleUnique,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FungibleCommon => f.write_str("FUNGIBLE_COMMON"),
            Self::NonFungibleUnique => f.write_str("NON_FUNGIBLE_UNIQUE"),
        }
    }
}

/// Metadata describing a token definition, as returned by an info query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Identifier assigned at creation.
    pub token_id: TokenId,
    /// Human-readable token name.
    pub name: String,
    /// Short ticker symbol.
    pub symbol: String,
    /// Fungible or non-fungible.
    pub token_type: TokenType,
    /// Number of decimal places a unit is divisible into.
    pub decimals: u32,
    /// Total number of minted units.
    pub total_supply: u64,
    /// Account holding the initial supply.
    pub treasury_account_id: AccountId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_parses_and_displays() {
        let id: EntityId = "0.0.1234".parse().expect("valid id");
        assert_eq!(id, EntityId::new(0, 0, 1234));
        assert_eq!(id.to_string(), "0.0.1234");
    }

    #[test]
    fn entity_id_rejects_malformed_input() {
        assert!("".parse::<EntityId>().is_err());
        assert!("0.0".parse::<EntityId>().is_err());
        assert!("0.0.12.3".parse::<EntityId>().is_err());
        assert!("a.b.c".parse::<EntityId>().is_err());
        assert!("0.0.-5".parse::<EntityId>().is_err());
    }

    #[test]
    fn typed_ids_round_trip_through_solidity_addresses() {
        let token = TokenId::new(4021);
        let address = token.to_solidity_address();
        assert_eq!(address.to_string(), format!("{:040x}", 4021));
        assert_eq!(TokenId::from_solidity_address(address), token);
    }

    #[test]
    fn typed_ids_serialize_as_strings() {
        let account = AccountId::new(77);
        let json = serde_json::to_string(&account).expect("serialize");
        assert_eq!(json, "\"0.0.77\"");
        let back: AccountId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, account);
    }

    #[test]
    fn hbar_conversions_and_display() {
        assert_eq!(Hbar::from_hbars(10).tinybars(), 1_000_000_000);
        assert_eq!(Hbar::from_hbars(10).to_string(), "10 hbar");
        assert_eq!(Hbar::from_tinybars(5).to_string(), "5 tinybar");
        assert!(Hbar::from_hbars(2) > Hbar::from_tinybars(199_999_999));
    }

    #[test]
    fn hbar_amounts_saturate_at_the_tinybar_limits() {
        assert_eq!(Hbar::from_hbars(i64::MAX).tinybars(), i64::MAX);
        assert_eq!(Hbar::from_hbars(i64::MIN).tinybars(), i64::MIN);
        // The last representable whole-hbar amount still converts exactly.
        assert_eq!(
            Hbar::from_hbars(92_233_720_368).tinybars(),
            92_233_720_368 * TINYBARS_PER_HBAR
        );
    }

    #[test]
    fn hbar_serializes_as_tinybars() {
        let json = serde_json::to_string(&Hbar::from_hbars(2)).expect("serialize");
        assert_eq!(json, "200000000");
        let back: Hbar = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, Hbar::from_hbars(2));
    }

    #[test]
    fn receipt_status_codes_render_like_the_network() {
        assert_eq!(ReceiptStatus::Success.to_string(), "SUCCESS");
        assert_eq!(
            ReceiptStatus::TokenNotAssociatedToAccount.to_string(),
            "TOKEN_NOT_ASSOCIATED_TO_ACCOUNT"
        );
        assert!(ReceiptStatus::Success.is_success());
        assert!(!ReceiptStatus::InvalidSignature.is_success());
    }

    #[test]
    fn token_types_display_both_kinds() {
        assert_eq!(TokenType::FungibleCommon.to_string(), "FUNGIBLE_COMMON");
        assert_eq!(TokenType::NonFungibleUnique.to_string(), "NON_FUNGIBLE_UNIQUE");
    }
}
