//! # Run Plans
//!
//! A plan is the ordered list of steps one run will execute, derived from a
//! [`Scenario`] before anything touches the ledger. Every amount, gas limit,
//! and fee ceiling is already resolved into the step, and each step names the
//! identity that signs it, so the runner needs no configuration of its own
//! and a plan can be inspected or serialized as-is.
//!
//! ```rust
//! use tokenflow_engine::{Plan, Scenario};
//!
//! let plan = Plan::build(&Scenario::default(), 6 * 1024)?;
//! assert_eq!(plan.steps.first().map(|step| step.id.as_str()), Some("create-token"));
//! # Ok::<(), tokenflow_engine::EngineError>(())
//! ```

use serde::{Deserialize, Serialize};
use tokenflow_ledger::MAX_CHUNK_BYTES;
use tokenflow_types::Hbar;

use crate::error::EngineError;
use crate::scenario::Scenario;

/// Step identifiers, in the order a full plan runs them.
pub mod step {
    pub const CREATE_TOKEN: &str = "create-token";
    pub const QUERY_TOKEN: &str = "query-token";
    pub const CREATE_ACCOUNT: &str = "create-account";
    pub const ASSOCIATE_TOKEN: &str = "associate-token";
    pub const NATIVE_TRANSFER: &str = "native-transfer";
    pub const UPLOAD_BYTECODE: &str = "upload-bytecode";
    pub const DEPLOY_CONTRACT: &str = "deploy-contract";
    pub const VERIFY_TOKEN_ADDRESS: &str = "verify-token-address";
    pub const BALANCES_INITIAL: &str = "balances-initial";
    pub const CONTRACT_TRANSFER: &str = "contract-transfer";
    pub const BALANCES_AFTER_TRANSFER: &str = "balances-after-transfer";
    pub const APPROVE_ALLOWANCE: &str = "approve-allowance";
    pub const TRANSFER_FROM: &str = "transfer-from";
    pub const BALANCES_FINAL: &str = "balances-final";
}

/// Which identity signs and pays for a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepActor {
    /// The operator the runner was constructed with.
    Operator,
    /// The recipient account created earlier in the run.
    Recipient,
}

/// One operation of a run, with its parameters fully resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
pub enum StepKind {
    /// Create the fungible token with the operator as treasury.
    CreateToken { name: String, symbol: String, decimals: u32, initial_supply: u64 },
    /// Query the created token's metadata back.
    QueryToken,
    /// Create the recipient account under a freshly generated key.
    CreateAccount { initial_balance: Hbar },
    /// Associate the recipient account with the token.
    AssociateToken,
    /// Move units from the treasury with a native transfer.
    NativeTransfer { amount: u64 },
    /// Stage the contract bytecode as a file, appending chunk by chunk. The
    /// chunk ceiling rides along so the runner holds whatever bytecode it is
    /// handed to the same limit, wherever the plan came from.
    UploadBytecode { total_bytes: usize, chunks: usize, max_chunks: usize, append_fee_cap: Hbar },
    /// Deploy the staged bytecode, pointing the contract at the token.
    DeployContract { gas: u64 },
    /// Read the token address the contract reports, optionally halting on a
    /// mismatch with the token this run created.
    VerifyTokenAddress { gas: u64, payment: Hbar, assert_match: bool },
    /// Read treasury and recipient balances through the contract.
    ReadBalances { gas: u64, payment: Hbar },
    /// Move units through the contract's `transfer` function.
    ContractTransfer { amount: u64, gas: u64, fee_cap: Hbar },
    /// Grant the recipient an allowance with `approve`.
    ApproveAllowance { amount: u64, gas: u64, fee_cap: Hbar },
    /// Spend the allowance as the recipient with `transferFrom`.
    TransferFrom { amount: u64, gas: u64, fee_cap: Hbar },
}

/// A single planned step: what runs, under which identity, and as what id in
/// the run report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedStep {
    /// Identifier the step reports under; unique within a plan.
    pub id: String,
    /// Identity that signs and pays for the step.
    pub actor: StepActor,
    /// The operation itself.
    #[serde(flatten)]
    pub kind: StepKind,
}

/// An ordered list of planned steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Plan {
    /// The steps, in execution order.
    pub steps: Vec<PlannedStep>,
}

impl Plan {
    /// Derive the step list for a scenario and a bytecode blob of the given
    /// size. Fails without touching the ledger when the bytecode would need
    /// more chunks than the scenario allows.
    pub fn build(scenario: &Scenario, bytecode_len: usize) -> Result<Self, EngineError> {
        let chunks = bytecode_len.div_ceil(MAX_CHUNK_BYTES);
        if chunks > scenario.contract.max_chunks {
            return Err(EngineError::ChunkLimit {
                chunks,
                max_chunks: scenario.contract.max_chunks,
            });
        }

        let contract = &scenario.contract;
        let read_balances = || StepKind::ReadBalances {
            gas: contract.query_gas,
            payment: contract.query_payment(),
        };

        let mut steps = vec![
            planned(
                step::CREATE_TOKEN,
                StepActor::Operator,
                StepKind::CreateToken {
                    name: scenario.token.name.clone(),
                    symbol: scenario.token.symbol.clone(),
                    decimals: scenario.token.decimals,
                    initial_supply: scenario.token.initial_supply,
                },
            ),
            planned(step::QUERY_TOKEN, StepActor::Operator, StepKind::QueryToken),
            planned(
                step::CREATE_ACCOUNT,
                StepActor::Operator,
                StepKind::CreateAccount { initial_balance: scenario.recipient.initial_balance() },
            ),
            planned(step::ASSOCIATE_TOKEN, StepActor::Recipient, StepKind::AssociateToken),
        ];
        if let Some(amount) = scenario.transfer.native_amount {
            steps.push(planned(
                step::NATIVE_TRANSFER,
                StepActor::Operator,
                StepKind::NativeTransfer { amount },
            ));
        }
        steps.push(planned(
            step::UPLOAD_BYTECODE,
            StepActor::Operator,
            StepKind::UploadBytecode {
                total_bytes: bytecode_len,
                chunks,
                max_chunks: contract.max_chunks,
                append_fee_cap: contract.append_fee_cap(),
            },
        ));
        steps.push(planned(
            step::DEPLOY_CONTRACT,
            StepActor::Operator,
            StepKind::DeployContract { gas: contract.deploy_gas },
        ));
        steps.push(planned(
            step::VERIFY_TOKEN_ADDRESS,
            StepActor::Operator,
            StepKind::VerifyTokenAddress {
                gas: contract.query_gas,
                payment: contract.query_payment(),
                assert_match: contract.verify_token_address,
            },
        ));
        steps.push(planned(step::BALANCES_INITIAL, StepActor::Operator, read_balances()));
        steps.push(planned(
            step::CONTRACT_TRANSFER,
            StepActor::Operator,
            StepKind::ContractTransfer {
                amount: scenario.transfer.contract_amount,
                gas: contract.execute_gas,
                fee_cap: contract.execute_fee_cap(),
            },
        ));
        steps.push(planned(step::BALANCES_AFTER_TRANSFER, StepActor::Operator, read_balances()));
        steps.push(planned(
            step::APPROVE_ALLOWANCE,
            StepActor::Operator,
            StepKind::ApproveAllowance {
                amount: scenario.transfer.approve_amount,
                gas: contract.execute_gas,
                fee_cap: contract.execute_fee_cap(),
            },
        ));
        steps.push(planned(
            step::TRANSFER_FROM,
            StepActor::Recipient,
            StepKind::TransferFrom {
                amount: scenario.transfer.approve_amount,
                gas: contract.execute_gas,
                fee_cap: contract.execute_fee_cap(),
            },
        ));
        steps.push(planned(step::BALANCES_FINAL, StepActor::Operator, read_balances()));

        Ok(Self { steps })
    }
}

fn planned(id: &str, actor: StepActor, kind: StepKind) -> PlannedStep {
    PlannedStep { id: id.into(), actor, kind }
}

/// Split bytecode into upload-sized chunks. An empty slice yields no chunks,
/// which a later deployment attempt will reject.
pub fn chunk_bytecode(bytecode: &[u8]) -> Vec<&[u8]> {
    bytecode.chunks(MAX_CHUNK_BYTES).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(plan: &Plan) -> Vec<&str> {
        plan.steps.iter().map(|step| step.id.as_str()).collect()
    }

    #[test]
    fn default_scenario_plans_without_the_native_transfer() {
        let plan = Plan::build(&Scenario::default(), 1_000).expect("plan");
        assert_eq!(
            ids(&plan),
            vec![
                step::CREATE_TOKEN,
                step::QUERY_TOKEN,
                step::CREATE_ACCOUNT,
                step::ASSOCIATE_TOKEN,
                step::UPLOAD_BYTECODE,
                step::DEPLOY_CONTRACT,
                step::VERIFY_TOKEN_ADDRESS,
                step::BALANCES_INITIAL,
                step::CONTRACT_TRANSFER,
                step::BALANCES_AFTER_TRANSFER,
                step::APPROVE_ALLOWANCE,
                step::TRANSFER_FROM,
                step::BALANCES_FINAL,
            ]
        );
    }

    #[test]
    fn native_amount_adds_the_transfer_step_after_association() {
        let mut scenario = Scenario::default();
        scenario.transfer.native_amount = Some(200);
        let plan = Plan::build(&scenario, 1_000).expect("plan");
        let ids = ids(&plan);
        let associate = ids.iter().position(|id| *id == step::ASSOCIATE_TOKEN).expect("associate");
        assert_eq!(ids[associate + 1], step::NATIVE_TRANSFER);
    }

    #[test]
    fn recipient_signs_association_and_delegated_spend() {
        let plan = Plan::build(&Scenario::default(), 1_000).expect("plan");
        for step in &plan.steps {
            let expected = match step.id.as_str() {
                step::ASSOCIATE_TOKEN | step::TRANSFER_FROM => StepActor::Recipient,
                _ => StepActor::Operator,
            };
            assert_eq!(step.actor, expected, "actor for {}", step.id);
        }
    }

    #[test]
    fn chunk_math_rounds_up_and_respects_the_limit() {
        let plan = Plan::build(&Scenario::default(), MAX_CHUNK_BYTES + 1).expect("plan");
        let upload = plan
            .steps
            .iter()
            .find(|step| step.id == step::UPLOAD_BYTECODE)
            .expect("upload step");
        assert!(matches!(upload.kind, StepKind::UploadBytecode { chunks: 2, max_chunks: 5, .. }));

        let oversized = 5 * MAX_CHUNK_BYTES + 1;
        let error = Plan::build(&Scenario::default(), oversized).unwrap_err();
        assert!(
            matches!(error, EngineError::ChunkLimit { chunks: 6, max_chunks: 5 }),
            "unexpected error: {error}"
        );
    }

    #[test]
    fn chunking_splits_on_the_append_boundary() {
        let bytecode = vec![0xab; 2 * MAX_CHUNK_BYTES + 17];
        let chunks = chunk_bytecode(&bytecode);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), MAX_CHUNK_BYTES);
        assert_eq!(chunks[1].len(), MAX_CHUNK_BYTES);
        assert_eq!(chunks[2].len(), 17);
        assert!(chunk_bytecode(&[]).is_empty());
    }

    #[test]
    fn plans_serialize_with_flattened_operations() {
        let plan = Plan::build(&Scenario::default(), 100).expect("plan");
        let value = serde_json::to_value(&plan).expect("serialize");
        let first = &value["steps"][0];
        assert_eq!(first["id"], "create-token");
        assert_eq!(first["actor"], "operator");
        assert_eq!(first["operation"], "create-token");
        assert_eq!(first["symbol"], "DEMO");

        let back: Plan = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, plan);
    }
}
