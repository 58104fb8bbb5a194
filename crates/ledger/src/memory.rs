//! Deterministic in-process implementation of the ledger seam.
//!
//! `InMemoryLedger` behaves like a tiny single-node network: entity numbers
//! are handed out sequentially, every submission is authorized against the
//! registered account key, fees are debited in tinybars, and rule violations
//! come back as the same receipt status codes a public network would return.
//! It backs the scenario tests and the CLI sandbox.

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::Mutex;
use tracing::debug;

use tokenflow_types::{
    AccountId, ContractId, FileId, FunctionParameters, FunctionResult, FunctionValue, Hbar,
    PublicKey, ReceiptStatus, SolidityAddress, TokenId, TokenInfo, TokenType,
};

use crate::client::{
    AccountCreate, ContractCall, ContractCreate, ContractExecute, FileAppend, LedgerClient,
    TokenCreate, TokenTransfer, erc20, ops,
};
use crate::error::LedgerError;
use crate::operator::Operator;

/// Largest payload a single file-append message may carry. Uploads beyond
/// this must be split into multiple appends by the caller.
pub const MAX_CHUNK_BYTES: usize = 4096;

/// First entity number handed out; lower numbers are reserved the way public
/// networks reserve them for system accounts.
const FIRST_ENTITY_NUM: u64 = 1000;

/// Flat fee debited from the payer for each state-changing submission.
const NODE_FEE: Hbar = Hbar::from_tinybars(100_000);

/// Smallest query payment a read-only contract call is accepted with.
const MIN_QUERY_PAYMENT: Hbar = Hbar::from_tinybars(100_000);

/// Gas floor for deploying a contract.
const DEPLOY_GAS_FLOOR: u64 = 1_000_000;

/// Gas floor for calling into a deployed contract.
const CALL_GAS_FLOOR: u64 = 50_000;

struct AccountState {
    key: PublicKey,
    tinybars: i64,
}

struct TokenState {
    name: String,
    symbol: String,
    token_type: TokenType,
    decimals: u32,
    total_supply: u64,
    treasury: AccountId,
    /// Unit balances per account; an entry existing is what "associated"
    /// means, so a zero balance and "not associated" stay distinguishable.
    balances: IndexMap<AccountId, u64>,
}

impl TokenState {
    fn info(&self, token_id: TokenId) -> TokenInfo {
        TokenInfo {
            token_id,
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            token_type: self.token_type,
            decimals: self.decimals,
            total_supply: self.total_supply,
            treasury_account_id: self.treasury,
        }
    }
}

struct FileState {
    keys: Vec<PublicKey>,
    contents: Vec<u8>,
}

struct ContractState {
    /// Token the deployed facade wraps, fixed by the constructor argument.
    token_id: TokenId,
    /// Approved amounts keyed by (owner, spender).
    allowances: IndexMap<(AccountId, AccountId), u64>,
}

struct World {
    next_entity: u64,
    accounts: IndexMap<AccountId, AccountState>,
    tokens: IndexMap<TokenId, TokenState>,
    files: IndexMap<FileId, FileState>,
    contracts: IndexMap<ContractId, ContractState>,
}

impl World {
    fn new() -> Self {
        Self {
            next_entity: FIRST_ENTITY_NUM,
            accounts: IndexMap::new(),
            tokens: IndexMap::new(),
            files: IndexMap::new(),
            contracts: IndexMap::new(),
        }
    }

    fn allocate_num(&mut self) -> u64 {
        let num = self.next_entity;
        self.next_entity += 1;
        num
    }

    /// The operator account must exist and the presented key must be the one
    /// registered for it. Stands in for signature verification.
    fn authorize(&self, operator: &Operator, operation: &'static str) -> Result<(), LedgerError> {
        let Some(account) = self.accounts.get(&operator.account_id) else {
            return Err(LedgerError::receipt(operation, ReceiptStatus::InvalidAccountId));
        };
        if account.key != operator.public_key() {
            return Err(LedgerError::receipt(operation, ReceiptStatus::InvalidSignature));
        }
        Ok(())
    }

    fn charge(
        &mut self,
        payer: AccountId,
        amount: Hbar,
        operation: &'static str,
    ) -> Result<(), LedgerError> {
        let Some(account) = self.accounts.get_mut(&payer) else {
            return Err(LedgerError::receipt(operation, ReceiptStatus::InvalidAccountId));
        };
        if account.tinybars < amount.tinybars() {
            return Err(LedgerError::receipt(operation, ReceiptStatus::InsufficientPayerBalance));
        }
        account.tinybars -= amount.tinybars();
        Ok(())
    }

    fn resolve_account(
        &self,
        address: SolidityAddress,
        operation: &'static str,
    ) -> Result<AccountId, LedgerError> {
        let account_id = AccountId::from_solidity_address(address);
        if !self.accounts.contains_key(&account_id) {
            return Err(LedgerError::receipt(operation, ReceiptStatus::InvalidAccountId));
        }
        Ok(account_id)
    }

    /// Move `amount` units between two associated accounts. The receiving
    /// side is checked before any balance changes so a failure never leaves
    /// the transfer half-applied.
    fn move_token_units(
        &mut self,
        token_id: TokenId,
        from: AccountId,
        to: AccountId,
        amount: u64,
        operation: &'static str,
    ) -> Result<(), LedgerError> {
        let Some(token) = self.tokens.get_mut(&token_id) else {
            return Err(LedgerError::receipt(operation, ReceiptStatus::InvalidTokenId));
        };
        if !token.balances.contains_key(&to) {
            return Err(LedgerError::receipt(
                operation,
                ReceiptStatus::TokenNotAssociatedToAccount,
            ));
        }
        let Some(from_balance) = token.balances.get_mut(&from) else {
            return Err(LedgerError::receipt(
                operation,
                ReceiptStatus::TokenNotAssociatedToAccount,
            ));
        };
        if *from_balance < amount {
            return Err(LedgerError::receipt(operation, ReceiptStatus::InsufficientTokenBalance));
        }
        *from_balance -= amount;
        if let Some(to_balance) = token.balances.get_mut(&to) {
            *to_balance += amount;
        }
        Ok(())
    }
}

fn address_argument(
    parameters: &FunctionParameters,
    index: usize,
    operation: &'static str,
) -> Result<SolidityAddress, LedgerError> {
    parameters
        .address(index)
        .map_err(|_| LedgerError::receipt(operation, ReceiptStatus::ContractRevertExecuted))
}

fn uint_argument(
    parameters: &FunctionParameters,
    index: usize,
    operation: &'static str,
) -> Result<u64, LedgerError> {
    let value = parameters
        .uint256(index)
        .map_err(|_| LedgerError::receipt(operation, ReceiptStatus::ContractRevertExecuted))?;
    u64::try_from(value)
        .map_err(|_| LedgerError::receipt(operation, ReceiptStatus::ContractRevertExecuted))
}

/// In-memory ledger network. Cheap to construct per test; a seeded genesis
/// account plays the role the network's funded system accounts play on a
/// public network.
pub struct InMemoryLedger {
    world: Mutex<World>,
}

impl InMemoryLedger {
    /// An empty network with no accounts. Every call fails authorization
    /// until an account exists, so most callers want [`Self::with_account`].
    pub fn new() -> Self {
        Self { world: Mutex::new(World::new()) }
    }

    /// A network seeded with one funded account, typically the operator the
    /// workflow will run under.
    pub fn with_account(account_id: AccountId, key: PublicKey, balance: Hbar) -> Self {
        let mut world = World::new();
        world.accounts.insert(account_id, AccountState { key, tinybars: balance.tinybars() });
        Self { world: Mutex::new(world) }
    }

    /// Current hbar balance of an account, if it exists.
    pub async fn hbar_balance(&self, account_id: AccountId) -> Option<Hbar> {
        let world = self.world.lock().await;
        world.accounts.get(&account_id).map(|account| Hbar::from_tinybars(account.tinybars))
    }

    /// Current token balance of an account; `None` when the token does not
    /// exist or the account is not associated with it.
    pub async fn token_balance(&self, token_id: TokenId, account_id: AccountId) -> Option<u64> {
        let world = self.world.lock().await;
        world.tokens.get(&token_id).and_then(|token| token.balances.get(&account_id)).copied()
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn create_token(
        &self,
        operator: &Operator,
        request: TokenCreate,
    ) -> Result<TokenId, LedgerError> {
        let mut world = self.world.lock().await;
        world.authorize(operator, ops::TOKEN_CREATE)?;
        // The treasury signs a token create; with one signer per submission
        // that means the treasury must be the operator itself.
        if request.treasury_account_id != operator.account_id {
            return Err(LedgerError::receipt(ops::TOKEN_CREATE, ReceiptStatus::InvalidSignature));
        }
        world.charge(operator.account_id, NODE_FEE, ops::TOKEN_CREATE)?;

        let token_id = TokenId::new(world.allocate_num());
        let mut balances = IndexMap::new();
        balances.insert(request.treasury_account_id, request.initial_supply);
        world.tokens.insert(
            token_id,
            TokenState {
                name: request.name,
                symbol: request.symbol,
                token_type: request.token_type,
                decimals: request.decimals,
                total_supply: request.initial_supply,
                treasury: request.treasury_account_id,
                balances,
            },
        );
        debug!(token = %token_id, "created token");
        Ok(token_id)
    }

    async fn token_info(
        &self,
        operator: &Operator,
        token_id: TokenId,
    ) -> Result<TokenInfo, LedgerError> {
        let world = self.world.lock().await;
        world.authorize(operator, ops::TOKEN_INFO)?;
        let Some(token) = world.tokens.get(&token_id) else {
            return Err(LedgerError::receipt(ops::TOKEN_INFO, ReceiptStatus::InvalidTokenId));
        };
        Ok(token.info(token_id))
    }

    async fn create_account(
        &self,
        operator: &Operator,
        request: AccountCreate,
    ) -> Result<AccountId, LedgerError> {
        let mut world = self.world.lock().await;
        world.authorize(operator, ops::ACCOUNT_CREATE)?;
        if request.initial_balance < Hbar::ZERO {
            return Err(LedgerError::receipt(
                ops::ACCOUNT_CREATE,
                ReceiptStatus::InvalidAccountAmounts,
            ));
        }
        // Fee and funding come out of the payer together so a shortfall
        // cannot take the fee and then abandon the funding.
        let total = Hbar::from_tinybars(
            NODE_FEE.tinybars().saturating_add(request.initial_balance.tinybars()),
        );
        world.charge(operator.account_id, total, ops::ACCOUNT_CREATE)?;

        let account_id = AccountId::new(world.allocate_num());
        world.accounts.insert(
            account_id,
            AccountState { key: request.key, tinybars: request.initial_balance.tinybars() },
        );
        debug!(account = %account_id, "created account");
        Ok(account_id)
    }

    async fn associate_token(
        &self,
        operator: &Operator,
        account_id: AccountId,
        token_ids: &[TokenId],
    ) -> Result<ReceiptStatus, LedgerError> {
        let mut world = self.world.lock().await;
        world.authorize(operator, ops::TOKEN_ASSOCIATE)?;
        // Association is authorized by the account being associated.
        if account_id != operator.account_id {
            return Err(LedgerError::receipt(
                ops::TOKEN_ASSOCIATE,
                ReceiptStatus::InvalidSignature,
            ));
        }
        for token_id in token_ids {
            let Some(token) = world.tokens.get(token_id) else {
                return Err(LedgerError::receipt(
                    ops::TOKEN_ASSOCIATE,
                    ReceiptStatus::InvalidTokenId,
                ));
            };
            if token.balances.contains_key(&account_id) {
                return Err(LedgerError::receipt(
                    ops::TOKEN_ASSOCIATE,
                    ReceiptStatus::TokenAlreadyAssociatedToAccount,
                ));
            }
        }
        world.charge(operator.account_id, NODE_FEE, ops::TOKEN_ASSOCIATE)?;
        for token_id in token_ids {
            if let Some(token) = world.tokens.get_mut(token_id) {
                token.balances.insert(account_id, 0);
            }
        }
        debug!(account = %account_id, tokens = token_ids.len(), "associated tokens");
        Ok(ReceiptStatus::Success)
    }

    async fn transfer_token(
        &self,
        operator: &Operator,
        transfer: TokenTransfer,
    ) -> Result<ReceiptStatus, LedgerError> {
        let mut world = self.world.lock().await;
        world.authorize(operator, ops::TOKEN_TRANSFER)?;
        if transfer.net() != 0 {
            return Err(LedgerError::receipt(
                ops::TOKEN_TRANSFER,
                ReceiptStatus::InvalidAccountAmounts,
            ));
        }

        // Fold the entry list into one signed delta per account. Widened so
        // repeated near-limit entries cannot overflow the accumulator.
        let mut deltas: IndexMap<AccountId, i128> = IndexMap::new();
        for entry in &transfer.transfers {
            if !world.accounts.contains_key(&entry.account_id) {
                return Err(LedgerError::receipt(
                    ops::TOKEN_TRANSFER,
                    ReceiptStatus::InvalidAccountId,
                ));
            }
            if entry.amount < 0 && entry.account_id != operator.account_id {
                return Err(LedgerError::receipt(
                    ops::TOKEN_TRANSFER,
                    ReceiptStatus::InvalidSignature,
                ));
            }
            *deltas.entry(entry.account_id).or_insert(0) += i128::from(entry.amount);
        }

        // Validate every delta before the fee is taken or any balance moves.
        {
            let Some(token) = world.tokens.get(&transfer.token_id) else {
                return Err(LedgerError::receipt(
                    ops::TOKEN_TRANSFER,
                    ReceiptStatus::InvalidTokenId,
                ));
            };
            for (account_id, delta) in &deltas {
                let Some(balance) = token.balances.get(account_id) else {
                    return Err(LedgerError::receipt(
                        ops::TOKEN_TRANSFER,
                        ReceiptStatus::TokenNotAssociatedToAccount,
                    ));
                };
                if i128::from(*balance) + *delta < 0 {
                    return Err(LedgerError::receipt(
                        ops::TOKEN_TRANSFER,
                        ReceiptStatus::InsufficientTokenBalance,
                    ));
                }
            }
        }
        world.charge(operator.account_id, NODE_FEE, ops::TOKEN_TRANSFER)?;
        if let Some(token) = world.tokens.get_mut(&transfer.token_id) {
            for (account_id, delta) in &deltas {
                if let Some(balance) = token.balances.get_mut(account_id) {
                    *balance = (i128::from(*balance) + *delta) as u64;
                }
            }
        }
        debug!(token = %transfer.token_id, parties = deltas.len(), "applied token transfer");
        Ok(ReceiptStatus::Success)
    }

    async fn create_file(
        &self,
        operator: &Operator,
        keys: Vec<PublicKey>,
    ) -> Result<FileId, LedgerError> {
        let mut world = self.world.lock().await;
        world.authorize(operator, ops::FILE_CREATE)?;
        world.charge(operator.account_id, NODE_FEE, ops::FILE_CREATE)?;

        let file_id = FileId::new(world.allocate_num());
        world.files.insert(file_id, FileState { keys, contents: Vec::new() });
        debug!(file = %file_id, "created file");
        Ok(file_id)
    }

    async fn append_file(
        &self,
        operator: &Operator,
        append: FileAppend,
    ) -> Result<ReceiptStatus, LedgerError> {
        let mut world = self.world.lock().await;
        world.authorize(operator, ops::FILE_APPEND)?;
        {
            let Some(file) = world.files.get(&append.file_id) else {
                return Err(LedgerError::receipt(ops::FILE_APPEND, ReceiptStatus::InvalidFileId));
            };
            if !file.keys.iter().any(|key| *key == operator.public_key()) {
                return Err(LedgerError::receipt(ops::FILE_APPEND, ReceiptStatus::InvalidSignature));
            }
        }
        if append.contents.len() > MAX_CHUNK_BYTES {
            return Err(LedgerError::receipt(ops::FILE_APPEND, ReceiptStatus::TransactionOversize));
        }
        if NODE_FEE > append.max_fee {
            return Err(LedgerError::receipt(ops::FILE_APPEND, ReceiptStatus::InsufficientTxFee));
        }
        world.charge(operator.account_id, NODE_FEE, ops::FILE_APPEND)?;
        if let Some(file) = world.files.get_mut(&append.file_id) {
            file.contents.extend_from_slice(&append.contents);
        }
        Ok(ReceiptStatus::Success)
    }

    async fn create_contract(
        &self,
        operator: &Operator,
        request: ContractCreate,
    ) -> Result<ContractId, LedgerError> {
        let mut world = self.world.lock().await;
        world.authorize(operator, ops::CONTRACT_CREATE)?;
        if request.gas < DEPLOY_GAS_FLOOR {
            return Err(LedgerError::receipt(ops::CONTRACT_CREATE, ReceiptStatus::InsufficientGas));
        }
        {
            let Some(file) = world.files.get(&request.bytecode_file_id) else {
                return Err(LedgerError::receipt(
                    ops::CONTRACT_CREATE,
                    ReceiptStatus::InvalidFileId,
                ));
            };
            if file.contents.is_empty() {
                return Err(LedgerError::receipt(
                    ops::CONTRACT_CREATE,
                    ReceiptStatus::ContractBytecodeEmpty,
                ));
            }
        }
        let token_address =
            address_argument(&request.constructor_parameters, 0, ops::CONTRACT_CREATE)?;
        let token_id = TokenId::from_solidity_address(token_address);
        if !world.tokens.contains_key(&token_id) {
            return Err(LedgerError::receipt(ops::CONTRACT_CREATE, ReceiptStatus::InvalidTokenId));
        }
        world.charge(operator.account_id, NODE_FEE, ops::CONTRACT_CREATE)?;

        let contract_id = ContractId::new(world.allocate_num());
        world.contracts.insert(contract_id, ContractState { token_id, allowances: IndexMap::new() });
        debug!(contract = %contract_id, token = %token_id, "deployed contract");
        Ok(contract_id)
    }

    async fn call_contract(
        &self,
        operator: &Operator,
        call: ContractCall,
    ) -> Result<FunctionResult, LedgerError> {
        let mut world = self.world.lock().await;
        world.authorize(operator, ops::CONTRACT_CALL)?;
        if call.payment < MIN_QUERY_PAYMENT {
            return Err(LedgerError::receipt(
                ops::CONTRACT_CALL,
                ReceiptStatus::InsufficientQueryPayment,
            ));
        }
        if call.gas < CALL_GAS_FLOOR {
            return Err(LedgerError::receipt(ops::CONTRACT_CALL, ReceiptStatus::InsufficientGas));
        }
        let token_id = {
            let Some(contract) = world.contracts.get(&call.contract_id) else {
                return Err(LedgerError::receipt(
                    ops::CONTRACT_CALL,
                    ReceiptStatus::InvalidContractId,
                ));
            };
            contract.token_id
        };
        world.charge(operator.account_id, call.payment, ops::CONTRACT_CALL)?;

        match call.function.as_str() {
            erc20::TOKEN_ADDRESS => Ok(FunctionResult::single(FunctionValue::Address(
                token_id.to_solidity_address(),
            ))),
            erc20::BALANCE_OF => {
                let address = address_argument(&call.parameters, 0, ops::CONTRACT_CALL)?;
                let account_id = AccountId::from_solidity_address(address);
                let balance = world
                    .tokens
                    .get(&token_id)
                    .and_then(|token| token.balances.get(&account_id))
                    .copied()
                    .unwrap_or(0);
                Ok(FunctionResult::single(FunctionValue::Uint256(u128::from(balance))))
            }
            _ => Err(LedgerError::receipt(
                ops::CONTRACT_CALL,
                ReceiptStatus::ContractRevertExecuted,
            )),
        }
    }

    async fn execute_contract(
        &self,
        operator: &Operator,
        execute: ContractExecute,
    ) -> Result<ReceiptStatus, LedgerError> {
        let mut world = self.world.lock().await;
        world.authorize(operator, ops::CONTRACT_EXECUTE)?;
        if execute.gas < CALL_GAS_FLOOR {
            return Err(LedgerError::receipt(ops::CONTRACT_EXECUTE, ReceiptStatus::InsufficientGas));
        }
        if NODE_FEE > execute.max_fee {
            return Err(LedgerError::receipt(
                ops::CONTRACT_EXECUTE,
                ReceiptStatus::InsufficientTxFee,
            ));
        }
        let token_id = {
            let Some(contract) = world.contracts.get(&execute.contract_id) else {
                return Err(LedgerError::receipt(
                    ops::CONTRACT_EXECUTE,
                    ReceiptStatus::InvalidContractId,
                ));
            };
            contract.token_id
        };
        // The fee stays spent even when the function itself reverts.
        world.charge(operator.account_id, NODE_FEE, ops::CONTRACT_EXECUTE)?;
        let sender = operator.account_id;

        match execute.function.as_str() {
            erc20::TRANSFER => {
                let to_address = address_argument(&execute.parameters, 0, ops::CONTRACT_EXECUTE)?;
                let amount = uint_argument(&execute.parameters, 1, ops::CONTRACT_EXECUTE)?;
                let to = world.resolve_account(to_address, ops::CONTRACT_EXECUTE)?;
                world.move_token_units(token_id, sender, to, amount, ops::CONTRACT_EXECUTE)?;
                debug!(token = %token_id, from = %sender, to = %to, amount, "contract transfer");
            }
            erc20::APPROVE => {
                let spender_address =
                    address_argument(&execute.parameters, 0, ops::CONTRACT_EXECUTE)?;
                let amount = uint_argument(&execute.parameters, 1, ops::CONTRACT_EXECUTE)?;
                let spender = world.resolve_account(spender_address, ops::CONTRACT_EXECUTE)?;
                if let Some(contract) = world.contracts.get_mut(&execute.contract_id) {
                    contract.allowances.insert((sender, spender), amount);
                }
                debug!(owner = %sender, spender = %spender, amount, "recorded allowance");
            }
            erc20::TRANSFER_FROM => {
                let from_address =
                    address_argument(&execute.parameters, 0, ops::CONTRACT_EXECUTE)?;
                let to_address = address_argument(&execute.parameters, 1, ops::CONTRACT_EXECUTE)?;
                let amount = uint_argument(&execute.parameters, 2, ops::CONTRACT_EXECUTE)?;
                let from = world.resolve_account(from_address, ops::CONTRACT_EXECUTE)?;
                let to = world.resolve_account(to_address, ops::CONTRACT_EXECUTE)?;

                let allowance = world
                    .contracts
                    .get(&execute.contract_id)
                    .and_then(|contract| contract.allowances.get(&(from, sender)))
                    .copied()
                    .unwrap_or(0);
                if allowance < amount {
                    return Err(LedgerError::receipt(
                        ops::CONTRACT_EXECUTE,
                        ReceiptStatus::SpenderDoesNotHaveAllowance,
                    ));
                }
                world.move_token_units(token_id, from, to, amount, ops::CONTRACT_EXECUTE)?;
                if let Some(contract) = world.contracts.get_mut(&execute.contract_id) {
                    contract.allowances.insert((from, sender), allowance - amount);
                }
                debug!(token = %token_id, from = %from, to = %to, amount, spender = %sender, "delegated transfer");
            }
            _ => {
                return Err(LedgerError::receipt(
                    ops::CONTRACT_EXECUTE,
                    ReceiptStatus::ContractRevertExecuted,
                ));
            }
        }
        Ok(ReceiptStatus::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokenflow_types::PrivateKey;

    const GENESIS_BALANCE: Hbar = Hbar::from_hbars(1_000);
    const QUERY_PAYMENT: Hbar = Hbar::from_hbars(10);
    const EXECUTE_FEE_CAP: Hbar = Hbar::from_hbars(10);

    fn genesis_operator() -> Operator {
        Operator::new(AccountId::new(2), PrivateKey::generate())
    }

    fn ledger_for(operator: &Operator) -> InMemoryLedger {
        InMemoryLedger::with_account(operator.account_id, operator.public_key(), GENESIS_BALANCE)
    }

    async fn create_demo_token(ledger: &InMemoryLedger, operator: &Operator) -> TokenId {
        ledger
            .create_token(
                operator,
                TokenCreate {
                    name: "Demo Token".into(),
                    symbol: "DEMO".into(),
                    token_type: TokenType::FungibleCommon,
                    decimals: 0,
                    initial_supply: 1_000,
                    treasury_account_id: operator.account_id,
                    admin_key: operator.public_key(),
                    supply_key: operator.public_key(),
                },
            )
            .await
            .expect("create token")
    }

    async fn create_recipient(ledger: &InMemoryLedger, operator: &Operator) -> Operator {
        let key = PrivateKey::generate();
        let account_id = ledger
            .create_account(
                operator,
                AccountCreate { key: key.public_key(), initial_balance: Hbar::from_hbars(10) },
            )
            .await
            .expect("create account");
        Operator::new(account_id, key)
    }

    async fn deploy_wrapper(
        ledger: &InMemoryLedger,
        operator: &Operator,
        token_id: TokenId,
    ) -> ContractId {
        let file_id =
            ledger.create_file(operator, vec![operator.public_key()]).await.expect("create file");
        ledger
            .append_file(
                operator,
                FileAppend {
                    file_id,
                    contents: vec![0x60, 0x80, 0x60, 0x40],
                    max_fee: Hbar::from_hbars(2),
                },
            )
            .await
            .expect("append bytecode");
        ledger
            .create_contract(
                operator,
                ContractCreate {
                    bytecode_file_id: file_id,
                    gas: 3_000_000,
                    constructor_parameters: FunctionParameters::new()
                        .add_address(token_id.to_solidity_address()),
                },
            )
            .await
            .expect("deploy contract")
    }

    async fn balance_of(
        ledger: &InMemoryLedger,
        operator: &Operator,
        contract_id: ContractId,
        account_id: AccountId,
    ) -> u128 {
        ledger
            .call_contract(
                operator,
                ContractCall {
                    contract_id,
                    gas: 100_000,
                    function: erc20::BALANCE_OF.into(),
                    parameters: FunctionParameters::new()
                        .add_address(account_id.to_solidity_address()),
                    payment: QUERY_PAYMENT,
                },
            )
            .await
            .expect("balanceOf")
            .uint256(0)
            .expect("uint result")
    }

    fn execute_request(contract_id: ContractId, function: &str, parameters: FunctionParameters) -> ContractExecute {
        ContractExecute {
            contract_id,
            gas: 4_000_000,
            function: function.into(),
            parameters,
            max_fee: EXECUTE_FEE_CAP,
        }
    }

    #[tokio::test]
    async fn token_create_mints_supply_to_treasury() {
        let operator = genesis_operator();
        let ledger = ledger_for(&operator);
        let token_id = create_demo_token(&ledger, &operator).await;

        let info = ledger.token_info(&operator, token_id).await.expect("token info");
        assert_eq!(info.total_supply, 1_000);
        assert_eq!(info.treasury_account_id, operator.account_id);
        assert_eq!(info.symbol, "DEMO");
        assert_eq!(ledger.token_balance(token_id, operator.account_id).await, Some(1_000));
    }

    #[tokio::test]
    async fn account_create_funds_the_new_account_from_the_payer() {
        let operator = genesis_operator();
        let ledger = ledger_for(&operator);
        let recipient = create_recipient(&ledger, &operator).await;

        assert_eq!(
            ledger.hbar_balance(recipient.account_id).await,
            Some(Hbar::from_hbars(10))
        );
        // 10 hbar funded the account and the node fee came on top.
        let operator_left = ledger.hbar_balance(operator.account_id).await.expect("operator");
        assert!(operator_left < Hbar::from_hbars(990));
        assert!(operator_left > Hbar::from_hbars(989));
    }

    #[tokio::test]
    async fn absurd_funding_requests_are_unpayable() {
        let operator = genesis_operator();
        let ledger = ledger_for(&operator);

        // Saturated at the tinybar limit, the request fails the balance
        // check like any other shortfall.
        let err = ledger
            .create_account(
                &operator,
                AccountCreate {
                    key: PrivateKey::generate().public_key(),
                    initial_balance: Hbar::from_hbars(i64::MAX),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(ReceiptStatus::InsufficientPayerBalance));
        assert_eq!(ledger.hbar_balance(operator.account_id).await, Some(GENESIS_BALANCE));
    }

    #[tokio::test]
    async fn calls_from_unknown_or_mismatched_identities_are_rejected() {
        let operator = genesis_operator();
        let ledger = ledger_for(&operator);

        let ghost = Operator::new(AccountId::new(9_999), PrivateKey::generate());
        let err = ledger.token_info(&ghost, TokenId::new(1)).await.unwrap_err();
        assert_eq!(err.status(), Some(ReceiptStatus::InvalidAccountId));

        let imposter = Operator::new(operator.account_id, PrivateKey::generate());
        let err = create_recipient_err(&ledger, &imposter).await;
        assert_eq!(err.status(), Some(ReceiptStatus::InvalidSignature));
    }

    async fn create_recipient_err(ledger: &InMemoryLedger, operator: &Operator) -> LedgerError {
        ledger
            .create_account(
                operator,
                AccountCreate {
                    key: PrivateKey::generate().public_key(),
                    initial_balance: Hbar::ZERO,
                },
            )
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn native_transfer_requires_association_first() {
        let operator = genesis_operator();
        let ledger = ledger_for(&operator);
        let token_id = create_demo_token(&ledger, &operator).await;
        let recipient = create_recipient(&ledger, &operator).await;

        let transfer = TokenTransfer::new(token_id)
            .debit(operator.account_id, 200)
            .credit(recipient.account_id, 200);
        let err = ledger.transfer_token(&operator, transfer.clone()).await.unwrap_err();
        assert_eq!(err.status(), Some(ReceiptStatus::TokenNotAssociatedToAccount));

        let status = ledger
            .associate_token(&recipient, recipient.account_id, &[token_id])
            .await
            .expect("associate");
        assert!(status.is_success());

        ledger.transfer_token(&operator, transfer).await.expect("transfer applies");
        assert_eq!(ledger.token_balance(token_id, operator.account_id).await, Some(800));
        assert_eq!(ledger.token_balance(token_id, recipient.account_id).await, Some(200));
    }

    #[tokio::test]
    async fn association_is_self_service_and_single_shot() {
        let operator = genesis_operator();
        let ledger = ledger_for(&operator);
        let token_id = create_demo_token(&ledger, &operator).await;
        let recipient = create_recipient(&ledger, &operator).await;

        // The operator cannot associate someone else's account.
        let err = ledger
            .associate_token(&operator, recipient.account_id, &[token_id])
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(ReceiptStatus::InvalidSignature));

        ledger
            .associate_token(&recipient, recipient.account_id, &[token_id])
            .await
            .expect("first association");
        let err = ledger
            .associate_token(&recipient, recipient.account_id, &[token_id])
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(ReceiptStatus::TokenAlreadyAssociatedToAccount));
    }

    #[tokio::test]
    async fn unbalanced_and_unsigned_transfers_are_rejected() {
        let operator = genesis_operator();
        let ledger = ledger_for(&operator);
        let token_id = create_demo_token(&ledger, &operator).await;
        let recipient = create_recipient(&ledger, &operator).await;
        ledger
            .associate_token(&recipient, recipient.account_id, &[token_id])
            .await
            .expect("associate");

        let lopsided = TokenTransfer::new(token_id)
            .debit(operator.account_id, 150)
            .credit(recipient.account_id, 100);
        let err = ledger.transfer_token(&operator, lopsided).await.unwrap_err();
        assert_eq!(err.status(), Some(ReceiptStatus::InvalidAccountAmounts));

        // Debiting an account the operator does not control is a missing
        // signature, even when the list balances.
        let stolen = TokenTransfer::new(token_id)
            .debit(recipient.account_id, 50)
            .credit(operator.account_id, 50);
        let err = ledger.transfer_token(&operator, stolen).await.unwrap_err();
        assert_eq!(err.status(), Some(ReceiptStatus::InvalidSignature));
    }

    #[tokio::test]
    async fn oversized_transfers_fail_validation_instead_of_overflowing() {
        let operator = genesis_operator();
        let ledger = ledger_for(&operator);
        let token_id = create_demo_token(&ledger, &operator).await;
        let recipient = create_recipient(&ledger, &operator).await;
        ledger
            .associate_token(&recipient, recipient.account_id, &[token_id])
            .await
            .expect("associate");

        // Each amount clamps at the i64 limit and the folded per-account
        // deltas go past it; the answer is still a receipt, never a wrap.
        let transfer = TokenTransfer::new(token_id)
            .credit(recipient.account_id, u64::MAX)
            .credit(recipient.account_id, u64::MAX)
            .debit(operator.account_id, u64::MAX)
            .debit(operator.account_id, 1u64 << 63);
        let err = ledger.transfer_token(&operator, transfer).await.unwrap_err();
        assert_eq!(err.status(), Some(ReceiptStatus::InsufficientTokenBalance));
    }

    #[tokio::test]
    async fn file_staging_enforces_keys_size_and_fee_caps() {
        let operator = genesis_operator();
        let ledger = ledger_for(&operator);
        let recipient = create_recipient(&ledger, &operator).await;

        let file_id =
            ledger.create_file(&operator, vec![operator.public_key()]).await.expect("file");

        let err = ledger
            .append_file(
                &recipient,
                FileAppend { file_id, contents: vec![1], max_fee: Hbar::from_hbars(2) },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(ReceiptStatus::InvalidSignature));

        let err = ledger
            .append_file(
                &operator,
                FileAppend {
                    file_id,
                    contents: vec![0; MAX_CHUNK_BYTES + 1],
                    max_fee: Hbar::from_hbars(2),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(ReceiptStatus::TransactionOversize));

        let err = ledger
            .append_file(
                &operator,
                FileAppend { file_id, contents: vec![1], max_fee: Hbar::ZERO },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(ReceiptStatus::InsufficientTxFee));

        ledger
            .append_file(
                &operator,
                FileAppend { file_id, contents: vec![1, 2, 3], max_fee: Hbar::from_hbars(2) },
            )
            .await
            .expect("append");
        ledger
            .append_file(
                &operator,
                FileAppend { file_id, contents: vec![4, 5], max_fee: Hbar::from_hbars(2) },
            )
            .await
            .expect("second append");
    }

    #[tokio::test]
    async fn deploy_checks_gas_bytecode_and_constructor_token() {
        let operator = genesis_operator();
        let ledger = ledger_for(&operator);
        let token_id = create_demo_token(&ledger, &operator).await;
        let file_id =
            ledger.create_file(&operator, vec![operator.public_key()]).await.expect("file");

        let request = ContractCreate {
            bytecode_file_id: file_id,
            gas: 3_000_000,
            constructor_parameters: FunctionParameters::new()
                .add_address(token_id.to_solidity_address()),
        };

        let err = ledger
            .create_contract(&operator, ContractCreate { gas: 1_000, ..request.clone() })
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(ReceiptStatus::InsufficientGas));

        // Nothing staged yet.
        let err = ledger.create_contract(&operator, request.clone()).await.unwrap_err();
        assert_eq!(err.status(), Some(ReceiptStatus::ContractBytecodeEmpty));

        ledger
            .append_file(
                &operator,
                FileAppend { file_id, contents: vec![0xfe], max_fee: Hbar::from_hbars(2) },
            )
            .await
            .expect("append");

        let err = ledger
            .create_contract(
                &operator,
                ContractCreate {
                    constructor_parameters: FunctionParameters::new()
                        .add_address(TokenId::new(4_242).to_solidity_address()),
                    ..request.clone()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(ReceiptStatus::InvalidTokenId));

        ledger.create_contract(&operator, request).await.expect("deploys");
    }

    #[tokio::test]
    async fn reads_report_token_address_and_balances() {
        let operator = genesis_operator();
        let ledger = ledger_for(&operator);
        let token_id = create_demo_token(&ledger, &operator).await;
        let recipient = create_recipient(&ledger, &operator).await;
        let contract_id = deploy_wrapper(&ledger, &operator, token_id).await;

        let result = ledger
            .call_contract(
                &operator,
                ContractCall {
                    contract_id,
                    gas: 100_000,
                    function: erc20::TOKEN_ADDRESS.into(),
                    parameters: FunctionParameters::new(),
                    payment: QUERY_PAYMENT,
                },
            )
            .await
            .expect("tokenAddress");
        assert_eq!(result.address(0).expect("address"), token_id.to_solidity_address());

        assert_eq!(balance_of(&ledger, &operator, contract_id, operator.account_id).await, 1_000);
        // Unassociated accounts simply read as zero.
        assert_eq!(balance_of(&ledger, &operator, contract_id, recipient.account_id).await, 0);

        let err = ledger
            .call_contract(
                &operator,
                ContractCall {
                    contract_id,
                    gas: 100_000,
                    function: erc20::TOKEN_ADDRESS.into(),
                    parameters: FunctionParameters::new(),
                    payment: Hbar::ZERO,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(ReceiptStatus::InsufficientQueryPayment));

        let err = ledger
            .call_contract(
                &operator,
                ContractCall {
                    contract_id,
                    gas: 100_000,
                    function: "decimals".into(),
                    parameters: FunctionParameters::new(),
                    payment: QUERY_PAYMENT,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(ReceiptStatus::ContractRevertExecuted));
    }

    #[tokio::test]
    async fn contract_transfer_approve_and_transfer_from_move_real_balances() {
        let operator = genesis_operator();
        let ledger = ledger_for(&operator);
        let token_id = create_demo_token(&ledger, &operator).await;
        let recipient = create_recipient(&ledger, &operator).await;
        let contract_id = deploy_wrapper(&ledger, &operator, token_id).await;

        let transfer_params = FunctionParameters::new()
            .add_address(recipient.account_id.to_solidity_address())
            .add_uint256(200);

        // The wrapper moves real token units, so association still gates it.
        let err = ledger
            .execute_contract(
                &operator,
                execute_request(contract_id, erc20::TRANSFER, transfer_params.clone()),
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(ReceiptStatus::TokenNotAssociatedToAccount));

        ledger
            .associate_token(&recipient, recipient.account_id, &[token_id])
            .await
            .expect("associate");
        ledger
            .execute_contract(
                &operator,
                execute_request(contract_id, erc20::TRANSFER, transfer_params),
            )
            .await
            .expect("transfer");
        assert_eq!(balance_of(&ledger, &operator, contract_id, operator.account_id).await, 800);
        assert_eq!(balance_of(&ledger, &operator, contract_id, recipient.account_id).await, 200);

        // Delegated spend without an allowance is refused.
        let delegated = FunctionParameters::new()
            .add_address(operator.account_id.to_solidity_address())
            .add_address(recipient.account_id.to_solidity_address())
            .add_uint256(200);
        let err = ledger
            .execute_contract(
                &recipient,
                execute_request(contract_id, erc20::TRANSFER_FROM, delegated.clone()),
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(ReceiptStatus::SpenderDoesNotHaveAllowance));

        ledger
            .execute_contract(
                &operator,
                execute_request(
                    contract_id,
                    erc20::APPROVE,
                    FunctionParameters::new()
                        .add_address(recipient.account_id.to_solidity_address())
                        .add_uint256(200),
                ),
            )
            .await
            .expect("approve");
        ledger
            .execute_contract(
                &recipient,
                execute_request(contract_id, erc20::TRANSFER_FROM, delegated.clone()),
            )
            .await
            .expect("transferFrom");
        assert_eq!(balance_of(&ledger, &operator, contract_id, operator.account_id).await, 600);
        assert_eq!(balance_of(&ledger, &operator, contract_id, recipient.account_id).await, 400);

        // The allowance was consumed; a second delegated spend fails.
        let err = ledger
            .execute_contract(
                &recipient,
                execute_request(contract_id, erc20::TRANSFER_FROM, delegated),
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(ReceiptStatus::SpenderDoesNotHaveAllowance));

        // Draining more than the remaining balance is refused natively too.
        let err = ledger
            .execute_contract(
                &operator,
                execute_request(
                    contract_id,
                    erc20::TRANSFER,
                    FunctionParameters::new()
                        .add_address(recipient.account_id.to_solidity_address())
                        .add_uint256(601),
                ),
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(ReceiptStatus::InsufficientTokenBalance));
    }
}
