//! # Scenario Documents
//!
//! A scenario is the data that parameterizes one end-to-end demo run: what
//! token to create, how the recipient account is funded, which amounts move,
//! and the gas and fee ceilings for the contract steps. Scenarios are plain
//! YAML documents; every field has a default, so an empty mapping is already
//! a complete runnable scenario and a document only needs to state what it
//! changes.
//!
//! ```rust
//! use tokenflow_engine::Scenario;
//!
//! let scenario = Scenario::from_yaml(
//!     r#"
//! token:
//!   symbol: "WIDGET"
//! transfer:
//!   native_amount: 200
//! "#,
//! )?;
//! assert_eq!(scenario.token.symbol, "WIDGET");
//! assert_eq!(scenario.token.name, "Demo Token");
//! # Ok::<(), tokenflow_engine::EngineError>(())
//! ```

use serde::{Deserialize, Serialize};
use tokenflow_types::Hbar;

use crate::error::EngineError;

/// Parameters for one end-to-end run, typically loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Scenario {
    /// The fungible token the run creates.
    pub token: TokenSettings,
    /// The account the run creates to receive tokens.
    pub recipient: RecipientSettings,
    /// The amounts the run moves.
    pub transfer: TransferSettings,
    /// Bytecode upload, deployment, and call limits.
    pub contract: ContractSettings,
}

impl Scenario {
    /// Parse a scenario from a YAML document. Unknown fields are rejected so
    /// a typo fails loudly instead of silently falling back to a default.
    pub fn from_yaml(text: &str) -> Result<Self, EngineError> {
        Ok(serde_yaml::from_str(text)?)
    }
}

/// Definition of the fungible token the run creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TokenSettings {
    /// Human-readable token name.
    pub name: String,
    /// Short ticker symbol.
    pub symbol: String,
    /// Decimal places a unit divides into. The demo token is indivisible.
    pub decimals: u32,
    /// Units minted to the treasury at creation.
    pub initial_supply: u64,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            name: "Demo Token".into(),
            symbol: "DEMO".into(),
            decimals: 0,
            initial_supply: 1_000,
        }
    }
}

/// Funding for the recipient account the run creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecipientSettings {
    /// Starting balance transferred from the operator, in whole hbars.
    pub initial_balance_hbar: i64,
}

impl RecipientSettings {
    /// The starting balance as an [`Hbar`] amount.
    pub fn initial_balance(&self) -> Hbar {
        Hbar::from_hbars(self.initial_balance_hbar)
    }
}

impl Default for RecipientSettings {
    fn default() -> Self {
        Self { initial_balance_hbar: 10 }
    }
}

/// Token amounts the run moves between the treasury and the recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransferSettings {
    /// Units moved with a native token transfer before the contract is
    /// deployed. Omit to skip that step entirely.
    pub native_amount: Option<u64>,
    /// Units moved through the contract's `transfer` function.
    pub contract_amount: u64,
    /// Allowance granted with `approve`; `transferFrom` then spends all of it.
    pub approve_amount: u64,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self { native_amount: None, contract_amount: 200, approve_amount: 200 }
    }
}

/// Gas and fee ceilings for the bytecode upload and contract steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContractSettings {
    /// Gas limit for the deployment transaction.
    pub deploy_gas: u64,
    /// Gas limit for read-only calls.
    pub query_gas: u64,
    /// Gas limit for state-changing calls.
    pub execute_gas: u64,
    /// Payment attached to each read-only call, in whole hbars.
    pub query_payment_hbar: i64,
    /// Fee ceiling for state-changing calls, in whole hbars.
    pub execute_fee_cap_hbar: i64,
    /// Fee ceiling for each bytecode append, in whole hbars.
    pub append_fee_cap_hbar: i64,
    /// Most upload chunks the bytecode may be split into.
    pub max_chunks: usize,
    /// Halt the run if the contract reports a token address other than the
    /// one this run created. Off by default; the address is always reported.
    pub verify_token_address: bool,
}

impl ContractSettings {
    /// The read-only call payment as an [`Hbar`] amount.
    pub fn query_payment(&self) -> Hbar {
        Hbar::from_hbars(self.query_payment_hbar)
    }

    /// The state-changing call fee ceiling as an [`Hbar`] amount.
    pub fn execute_fee_cap(&self) -> Hbar {
        Hbar::from_hbars(self.execute_fee_cap_hbar)
    }

    /// The per-append fee ceiling as an [`Hbar`] amount.
    pub fn append_fee_cap(&self) -> Hbar {
        Hbar::from_hbars(self.append_fee_cap_hbar)
    }
}

impl Default for ContractSettings {
    fn default() -> Self {
        Self {
            deploy_gas: 3_000_000,
            query_gas: 100_000,
            execute_gas: 4_000_000,
            query_payment_hbar: 10,
            execute_fee_cap_hbar: 10,
            append_fee_cap_hbar: 2,
            max_chunks: 5,
            verify_token_address: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mapping_is_a_complete_scenario() {
        let scenario = Scenario::from_yaml("{}").expect("parse");
        assert_eq!(scenario.token.name, "Demo Token");
        assert_eq!(scenario.token.symbol, "DEMO");
        assert_eq!(scenario.token.initial_supply, 1_000);
        assert_eq!(scenario.recipient.initial_balance(), Hbar::from_hbars(10));
        assert_eq!(scenario.transfer.native_amount, None);
        assert_eq!(scenario.transfer.contract_amount, 200);
        assert_eq!(scenario.contract.max_chunks, 5);
        assert!(!scenario.contract.verify_token_address);
    }

    #[test]
    fn documents_override_only_what_they_state() {
        let scenario = Scenario::from_yaml(
            r#"
token:
  name: "Widget Credits"
  symbol: "WIDGET"
  initial_supply: 5000
transfer:
  native_amount: 250
contract:
  verify_token_address: true
"#,
        )
        .expect("parse");
        assert_eq!(scenario.token.name, "Widget Credits");
        assert_eq!(scenario.token.decimals, 0);
        assert_eq!(scenario.transfer.native_amount, Some(250));
        assert_eq!(scenario.transfer.approve_amount, 200);
        assert!(scenario.contract.verify_token_address);
        assert_eq!(scenario.contract.deploy_gas, 3_000_000);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = Scenario::from_yaml("token:\n  ticker: DEMO\n").unwrap_err();
        assert!(error.to_string().contains("invalid scenario document"));
    }
}
