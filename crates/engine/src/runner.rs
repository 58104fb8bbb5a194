//! Workflow runner that executes a plan against a ledger.
//!
//! The runner is deliberately stateless between runs: it holds the ledger
//! handle and the operator identity, and everything a run produces lives in
//! a per-run state that dies with the [`RunReport`]. Each step declares which
//! identity signs it, so nothing here mutates a global operator; the recipient
//! steps simply sign with the key generated when that account was created.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::{info, warn};

use tokenflow_ledger::{
    AccountCreate, ContractCall, ContractCreate, ContractExecute, FileAppend, LedgerClient,
    Operator, TokenCreate, TokenTransfer, erc20,
};
use tokenflow_types::{
    AccountId, ContractId, FileId, FunctionParameters, Hbar, PrivateKey, TokenId, TokenType,
};

use crate::error::EngineError;
use crate::plan::{Plan, PlannedStep, StepActor, StepKind, chunk_bytecode};
use crate::report::{RunOutcome, RunReport, StepReport, StepStatus};
use crate::scenario::Scenario;

/// Executes plans step by step against a [`LedgerClient`].
pub struct WorkflowRunner {
    ledger: Arc<dyn LedgerClient>,
    operator: Operator,
}

/// Everything a run produces as it goes. Later steps read what earlier steps
/// created; the runner never carries state across runs.
#[derive(Default)]
struct RunState {
    token_id: Option<TokenId>,
    recipient: Option<Operator>,
    file_id: Option<FileId>,
    contract_id: Option<ContractId>,
}

impl RunState {
    fn token_id(&self) -> Result<TokenId, EngineError> {
        self.token_id.ok_or(EngineError::MissingPrerequisite { what: "a created token" })
    }

    fn recipient(&self) -> Result<&Operator, EngineError> {
        self.recipient
            .as_ref()
            .ok_or(EngineError::MissingPrerequisite { what: "the recipient account" })
    }

    fn file_id(&self) -> Result<FileId, EngineError> {
        self.file_id.ok_or(EngineError::MissingPrerequisite { what: "a staged bytecode file" })
    }

    fn contract_id(&self) -> Result<ContractId, EngineError> {
        self.contract_id.ok_or(EngineError::MissingPrerequisite { what: "a deployed contract" })
    }
}

impl WorkflowRunner {
    /// A runner that signs operator steps as `operator` and submits to
    /// `ledger`.
    pub fn new(ledger: Arc<dyn LedgerClient>, operator: Operator) -> Self {
        Self { ledger, operator }
    }

    /// Plan and execute a scenario in one call. Fails before any ledger call
    /// when the bytecode cannot be uploaded within the scenario's chunk
    /// limit; any failure after that is recorded in the returned report.
    pub async fn run(&self, scenario: &Scenario, bytecode: &[u8]) -> Result<RunReport, EngineError> {
        let plan = Plan::build(scenario, bytecode.len())?;
        Ok(self.run_plan(&plan, bytecode).await)
    }

    /// Execute an already-built plan. The first failing step halts the run;
    /// the steps after it are reported as skipped. The upload step holds the
    /// supplied bytecode to the chunk ceiling recorded in the plan, so a plan
    /// assembled by hand cannot sidestep the limit.
    pub async fn run_plan(&self, plan: &Plan, bytecode: &[u8]) -> RunReport {
        let started_at = Utc::now();
        let mut state = RunState::default();
        let mut steps = Vec::with_capacity(plan.steps.len());
        let mut halted_at: Option<String> = None;

        for planned in &plan.steps {
            if halted_at.is_some() {
                steps.push(StepReport {
                    id: planned.id.clone(),
                    actor: planned.actor,
                    status: StepStatus::Skipped,
                    detail: Value::Null,
                    error: None,
                    duration_ms: 0,
                });
                continue;
            }

            info!(step = %planned.id, actor = ?planned.actor, "running step");
            let clock = Instant::now();
            let result = self.execute_step(planned, &mut state, bytecode).await;
            let duration_ms = clock.elapsed().as_millis().try_into().unwrap_or(u64::MAX);

            match result {
                Ok(detail) => steps.push(StepReport {
                    id: planned.id.clone(),
                    actor: planned.actor,
                    status: StepStatus::Succeeded,
                    detail,
                    error: None,
                    duration_ms,
                }),
                Err(error) => {
                    warn!(step = %planned.id, %error, "step failed; halting run");
                    halted_at = Some(planned.id.clone());
                    steps.push(StepReport {
                        id: planned.id.clone(),
                        actor: planned.actor,
                        status: StepStatus::Failed,
                        detail: Value::Null,
                        error: Some(error.to_string()),
                        duration_ms,
                    });
                }
            }
        }

        RunReport {
            started_at,
            finished_at: Utc::now(),
            outcome: match halted_at {
                Some(step) => RunOutcome::Halted { step },
                None => RunOutcome::Completed,
            },
            steps,
        }
    }

    async fn execute_step(
        &self,
        planned: &PlannedStep,
        state: &mut RunState,
        bytecode: &[u8],
    ) -> Result<Value, EngineError> {
        // Cloned so the recipient borrow does not pin `state` across arms
        // that write back into it.
        let signer = match planned.actor {
            StepActor::Operator => self.operator.clone(),
            StepActor::Recipient => state.recipient()?.clone(),
        };

        match &planned.kind {
            StepKind::CreateToken { name, symbol, decimals, initial_supply } => {
                let token_id = self
                    .ledger
                    .create_token(
                        &signer,
                        TokenCreate {
                            name: name.clone(),
                            symbol: symbol.clone(),
                            token_type: TokenType::FungibleCommon,
                            decimals: *decimals,
                            initial_supply: *initial_supply,
                            treasury_account_id: self.operator.account_id,
                            admin_key: self.operator.public_key(),
                            supply_key: self.operator.public_key(),
                        },
                    )
                    .await?;
                state.token_id = Some(token_id);
                Ok(json!({ "token_id": token_id }))
            }
            StepKind::QueryToken => {
                let info = self.ledger.token_info(&signer, state.token_id()?).await?;
                Ok(serde_json::to_value(&info).unwrap_or(Value::Null))
            }
            StepKind::CreateAccount { initial_balance } => {
                let key = PrivateKey::generate();
                let account_id = self
                    .ledger
                    .create_account(
                        &signer,
                        AccountCreate { key: key.public_key(), initial_balance: *initial_balance },
                    )
                    .await?;
                state.recipient = Some(Operator::new(account_id, key));
                Ok(json!({ "account_id": account_id, "initial_balance": initial_balance }))
            }
            StepKind::AssociateToken => {
                let token_id = state.token_id()?;
                let account_id = state.recipient()?.account_id;
                let status = self.ledger.associate_token(&signer, account_id, &[token_id]).await?;
                Ok(json!({ "account_id": account_id, "status": status.to_string() }))
            }
            StepKind::NativeTransfer { amount } => {
                let token_id = state.token_id()?;
                let to = state.recipient()?.account_id;
                let transfer = TokenTransfer::new(token_id)
                    .debit(self.operator.account_id, *amount)
                    .credit(to, *amount);
                let status = self.ledger.transfer_token(&signer, transfer).await?;
                Ok(json!({ "to": to, "amount": amount, "status": status.to_string() }))
            }
            StepKind::UploadBytecode { max_chunks, append_fee_cap, .. } => {
                // Checked again here so a plan that was not derived from this
                // bytecode still fails before the file is staged.
                let chunks = chunk_bytecode(bytecode);
                if chunks.len() > *max_chunks {
                    return Err(EngineError::ChunkLimit {
                        chunks: chunks.len(),
                        max_chunks: *max_chunks,
                    });
                }
                let file_id =
                    self.ledger.create_file(&signer, vec![self.operator.public_key()]).await?;
                state.file_id = Some(file_id);
                for chunk in &chunks {
                    self.ledger
                        .append_file(
                            &signer,
                            FileAppend {
                                file_id,
                                contents: chunk.to_vec(),
                                max_fee: *append_fee_cap,
                            },
                        )
                        .await?;
                }
                Ok(json!({ "file_id": file_id, "chunks": chunks.len(), "bytes": bytecode.len() }))
            }
            StepKind::DeployContract { gas } => {
                let token_id = state.token_id()?;
                let contract_id = self
                    .ledger
                    .create_contract(
                        &signer,
                        ContractCreate {
                            bytecode_file_id: state.file_id()?,
                            gas: *gas,
                            constructor_parameters: FunctionParameters::new()
                                .add_address(token_id.to_solidity_address()),
                        },
                    )
                    .await?;
                state.contract_id = Some(contract_id);
                Ok(json!({ "contract_id": contract_id }))
            }
            StepKind::VerifyTokenAddress { gas, payment, assert_match } => {
                let expected = state.token_id()?.to_solidity_address();
                let result = self
                    .ledger
                    .call_contract(
                        &signer,
                        ContractCall {
                            contract_id: state.contract_id()?,
                            gas: *gas,
                            function: erc20::TOKEN_ADDRESS.into(),
                            parameters: FunctionParameters::new(),
                            payment: *payment,
                        },
                    )
                    .await?;
                let actual = result.address(0)?;
                let matches = actual == expected;
                if *assert_match && !matches {
                    return Err(EngineError::TokenAddressMismatch { expected, actual });
                }
                Ok(json!({ "token_address": actual.to_string(), "matches": matches }))
            }
            StepKind::ReadBalances { gas, payment } => {
                let contract_id = state.contract_id()?;
                let treasury =
                    self.balance_of(&signer, contract_id, self.operator.account_id, *gas, *payment)
                        .await?;
                let recipient_account = state.recipient()?.account_id;
                let recipient =
                    self.balance_of(&signer, contract_id, recipient_account, *gas, *payment)
                        .await?;
                Ok(json!({ "treasury_units": treasury, "recipient_units": recipient }))
            }
            StepKind::ContractTransfer { amount, gas, fee_cap } => {
                let to = state.recipient()?.account_id;
                let status = self
                    .ledger
                    .execute_contract(
                        &signer,
                        ContractExecute {
                            contract_id: state.contract_id()?,
                            gas: *gas,
                            function: erc20::TRANSFER.into(),
                            parameters: FunctionParameters::new()
                                .add_address(to.to_solidity_address())
                                .add_uint256(u128::from(*amount)),
                            max_fee: *fee_cap,
                        },
                    )
                    .await?;
                Ok(json!({ "to": to, "amount": amount, "status": status.to_string() }))
            }
            StepKind::ApproveAllowance { amount, gas, fee_cap } => {
                let spender = state.recipient()?.account_id;
                let status = self
                    .ledger
                    .execute_contract(
                        &signer,
                        ContractExecute {
                            contract_id: state.contract_id()?,
                            gas: *gas,
                            function: erc20::APPROVE.into(),
                            parameters: FunctionParameters::new()
                                .add_address(spender.to_solidity_address())
                                .add_uint256(u128::from(*amount)),
                            max_fee: *fee_cap,
                        },
                    )
                    .await?;
                Ok(json!({ "spender": spender, "amount": amount, "status": status.to_string() }))
            }
            StepKind::TransferFrom { amount, gas, fee_cap } => {
                // Funds flow from the treasury to the recipient; the actor
                // configured on the step is the spender.
                let from = self.operator.account_id;
                let to = state.recipient()?.account_id;
                let status = self
                    .ledger
                    .execute_contract(
                        &signer,
                        ContractExecute {
                            contract_id: state.contract_id()?,
                            gas: *gas,
                            function: erc20::TRANSFER_FROM.into(),
                            parameters: FunctionParameters::new()
                                .add_address(from.to_solidity_address())
                                .add_address(to.to_solidity_address())
                                .add_uint256(u128::from(*amount)),
                            max_fee: *fee_cap,
                        },
                    )
                    .await?;
                Ok(json!({ "from": from, "to": to, "amount": amount, "status": status.to_string() }))
            }
        }
    }

    async fn balance_of(
        &self,
        signer: &Operator,
        contract_id: ContractId,
        account_id: AccountId,
        gas: u64,
        payment: Hbar,
    ) -> Result<u64, EngineError> {
        let result = self
            .ledger
            .call_contract(
                signer,
                ContractCall {
                    contract_id,
                    gas,
                    function: erc20::BALANCE_OF.into(),
                    parameters: FunctionParameters::new()
                        .add_address(account_id.to_solidity_address()),
                    payment,
                },
            )
            .await?;
        Ok(result.uint256(0)?.try_into().unwrap_or(u64::MAX))
    }
}
