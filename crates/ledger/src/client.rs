//! The client trait the workflow engine drives, plus its request types.

use async_trait::async_trait;
use tokenflow_types::{
    AccountId, ContractId, FileId, FunctionParameters, FunctionResult, Hbar, PublicKey,
    ReceiptStatus, TokenId, TokenInfo, TokenType,
};

use crate::error::LedgerError;
use crate::operator::Operator;

/// Operation names, as used in error reports, log lines, and the recording
/// test doubles that assert call ordering.
pub mod ops {
    pub const TOKEN_CREATE: &str = "token-create";
    pub const TOKEN_INFO: &str = "token-info";
    pub const ACCOUNT_CREATE: &str = "account-create";
    pub const TOKEN_ASSOCIATE: &str = "token-associate";
    pub const TOKEN_TRANSFER: &str = "token-transfer";
    pub const FILE_CREATE: &str = "file-create";
    pub const FILE_APPEND: &str = "file-append";
    pub const CONTRACT_CREATE: &str = "contract-create";
    pub const CONTRACT_CALL: &str = "contract-call";
    pub const CONTRACT_EXECUTE: &str = "contract-execute";
}

/// Function names exported by the ERC-20 style demo contract. The workflow
/// calls these; the in-memory ledger dispatches on the same names.
pub mod erc20 {
    pub const TOKEN_ADDRESS: &str = "tokenAddress";
    pub const BALANCE_OF: &str = "balanceOf";
    pub const TRANSFER: &str = "transfer";
    pub const APPROVE: &str = "approve";
    pub const TRANSFER_FROM: &str = "transferFrom";
}

/// Request to define a new token.
#[derive(Debug, Clone)]
pub struct TokenCreate {
    /// Human-readable token name.
    pub name: String,
    /// Short ticker symbol.
    pub symbol: String,
    /// Fungible or non-fungible.
    pub token_type: TokenType,
    /// Decimal places per unit.
    pub decimals: u32,
    /// Units minted to the treasury at creation.
    pub initial_supply: u64,
    /// Account that receives the initial supply.
    pub treasury_account_id: AccountId,
    /// Key allowed to update the token definition.
    pub admin_key: PublicKey,
    /// Key allowed to mint and burn supply.
    pub supply_key: PublicKey,
}

/// Request to create an account with a starting hbar balance funded by the
/// operator.
#[derive(Debug, Clone)]
pub struct AccountCreate {
    /// Key that will control the new account.
    pub key: PublicKey,
    /// Opening balance, debited from the operator.
    pub initial_balance: Hbar,
}

/// One signed balance change within a token transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferEntry {
    /// Account whose balance changes.
    pub account_id: AccountId,
    /// Signed delta in token units; negative debits, positive credits.
    pub amount: i64,
}

/// A native token transfer: a list of signed per-account deltas. The ledger,
/// not the caller, enforces that the deltas sum to zero.
#[derive(Debug, Clone)]
pub struct TokenTransfer {
    /// Token whose units move.
    pub token_id: TokenId,
    /// Per-account deltas, in the order they were added.
    pub transfers: Vec<TransferEntry>,
}

impl TokenTransfer {
    /// Start an empty transfer list for `token_id`.
    pub fn new(token_id: TokenId) -> Self {
        Self { token_id, transfers: Vec::new() }
    }

    /// Add a debit of `amount` units from `account_id`. Amounts beyond
    /// `i64::MAX` saturate; the ledger rejects them against the balance.
    pub fn debit(mut self, account_id: AccountId, amount: u64) -> Self {
        let amount = i64::try_from(amount).unwrap_or(i64::MAX);
        self.transfers.push(TransferEntry { account_id, amount: -amount });
        self
    }

    /// Add a credit of `amount` units to `account_id`. Amounts beyond
    /// `i64::MAX` saturate.
    pub fn credit(mut self, account_id: AccountId, amount: u64) -> Self {
        self.transfers.push(TransferEntry {
            account_id,
            amount: i64::try_from(amount).unwrap_or(i64::MAX),
        });
        self
    }

    /// Sum of all signed deltas, widened so no entry list can overflow it.
    /// Zero for a well-formed transfer.
    pub fn net(&self) -> i128 {
        self.transfers.iter().map(|entry| i128::from(entry.amount)).sum()
    }
}

/// Request to append one chunk of bytes to a staged file.
#[derive(Debug, Clone)]
pub struct FileAppend {
    /// File being extended.
    pub file_id: FileId,
    /// Bytes for this chunk; a single append may not exceed the per-message
    /// size ceiling.
    pub contents: Vec<u8>,
    /// Cap on the fee the caller is willing to pay.
    pub max_fee: Hbar,
}

/// Request to deploy a contract from staged bytecode.
#[derive(Debug, Clone)]
pub struct ContractCreate {
    /// File holding the complete bytecode.
    pub bytecode_file_id: FileId,
    /// Gas limit for running the constructor.
    pub gas: u64,
    /// Constructor arguments.
    pub constructor_parameters: FunctionParameters,
}

/// A read-only contract call, paid for with an explicit query payment.
#[derive(Debug, Clone)]
pub struct ContractCall {
    /// Contract to call.
    pub contract_id: ContractId,
    /// Gas limit for the call.
    pub gas: u64,
    /// Function name, as the contract exports it.
    pub function: String,
    /// Call arguments.
    pub parameters: FunctionParameters,
    /// Payment offered for the query.
    pub payment: Hbar,
}

/// A state-changing contract call.
#[derive(Debug, Clone)]
pub struct ContractExecute {
    /// Contract to call.
    pub contract_id: ContractId,
    /// Gas limit for the call.
    pub gas: u64,
    /// Function name, as the contract exports it.
    pub function: String,
    /// Call arguments.
    pub parameters: FunctionParameters,
    /// Cap on the fee the caller is willing to pay.
    pub max_fee: Hbar,
}

/// The external collaborator the workflow runner sequences calls against.
///
/// Implementations own transaction construction, signing, submission, and
/// receipt polling. A creation call returns the new entity's id; operations
/// without a created entity return the receipt status (always `SUCCESS` on
/// the `Ok` path; non-success statuses surface as [`LedgerError::Receipt`]).
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Define a new token; returns its id.
    async fn create_token(
        &self,
        operator: &Operator,
        request: TokenCreate,
    ) -> Result<TokenId, LedgerError>;

    /// Fetch a token's definition and current supply.
    async fn token_info(
        &self,
        operator: &Operator,
        token_id: TokenId,
    ) -> Result<TokenInfo, LedgerError>;

    /// Create an account; returns its id.
    async fn create_account(
        &self,
        operator: &Operator,
        request: AccountCreate,
    ) -> Result<AccountId, LedgerError>;

    /// Associate `account_id` with each listed token. The operator must be
    /// the account being associated.
    async fn associate_token(
        &self,
        operator: &Operator,
        account_id: AccountId,
        token_ids: &[TokenId],
    ) -> Result<ReceiptStatus, LedgerError>;

    /// Apply a balanced list of token balance deltas.
    async fn transfer_token(
        &self,
        operator: &Operator,
        transfer: TokenTransfer,
    ) -> Result<ReceiptStatus, LedgerError>;

    /// Create an empty file writable by holders of `keys`.
    async fn create_file(
        &self,
        operator: &Operator,
        keys: Vec<PublicKey>,
    ) -> Result<FileId, LedgerError>;

    /// Append one chunk to a staged file.
    async fn append_file(
        &self,
        operator: &Operator,
        append: FileAppend,
    ) -> Result<ReceiptStatus, LedgerError>;

    /// Deploy a contract from staged bytecode; returns its id.
    async fn create_contract(
        &self,
        operator: &Operator,
        request: ContractCreate,
    ) -> Result<ContractId, LedgerError>;

    /// Run a read-only contract function and decode its return values.
    async fn call_contract(
        &self,
        operator: &Operator,
        call: ContractCall,
    ) -> Result<FunctionResult, LedgerError>;

    /// Run a state-changing contract function.
    async fn execute_contract(
        &self,
        operator: &Operator,
        execute: ContractExecute,
    ) -> Result<ReceiptStatus, LedgerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_builder_records_signed_deltas_in_order() {
        let transfer = TokenTransfer::new(TokenId::new(5000))
            .debit(AccountId::new(2), 200)
            .credit(AccountId::new(3), 200);

        assert_eq!(
            transfer.transfers,
            vec![
                TransferEntry { account_id: AccountId::new(2), amount: -200 },
                TransferEntry { account_id: AccountId::new(3), amount: 200 },
            ]
        );
        assert_eq!(transfer.net(), 0);
    }

    #[test]
    fn unbalanced_transfers_are_representable() {
        // The ledger, not the builder, rejects these; the builder only reports.
        let lopsided = TokenTransfer::new(TokenId::new(5000)).debit(AccountId::new(2), 150);
        assert_eq!(lopsided.net(), -150);
    }

    #[test]
    fn oversized_amounts_saturate_instead_of_wrapping() {
        let transfer = TokenTransfer::new(TokenId::new(5000))
            .credit(AccountId::new(3), u64::MAX)
            .credit(AccountId::new(4), u64::MAX)
            .debit(AccountId::new(2), 1u64 << 63);

        assert_eq!(transfer.transfers[0].amount, i64::MAX);
        assert_eq!(transfer.transfers[2].amount, -i64::MAX);
        assert_eq!(transfer.net(), i128::from(i64::MAX));
    }
}
