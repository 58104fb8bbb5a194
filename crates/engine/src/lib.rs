//! # Tokenflow Engine
//!
//! The engine turns a [`Scenario`] into an ordered [`Plan`] of ledger
//! operations and executes that plan with a [`WorkflowRunner`], producing a
//! [`RunReport`] with one record per step.
//!
//! ## Key Ideas
//!
//! - **Scenario**: YAML-loadable parameters; every field has a default
//! - **Plan**: the derived step list, with amounts, gas, fees, and the
//!   signing identity resolved into each step
//! - **Runner**: executes steps against any [`tokenflow_ledger::LedgerClient`],
//!   halting at the first failure and reporting the rest as skipped
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use tokenflow_engine::{Scenario, WorkflowRunner};
//! use tokenflow_ledger::{InMemoryLedger, Operator};
//! use tokenflow_types::{AccountId, Hbar, PrivateKey};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), tokenflow_engine::EngineError> {
//! let operator = Operator::new(AccountId::new(2), PrivateKey::generate());
//! let ledger = Arc::new(InMemoryLedger::with_account(
//!     operator.account_id,
//!     operator.public_key(),
//!     Hbar::from_hbars(1_000),
//! ));
//! let runner = WorkflowRunner::new(ledger, operator);
//! let report = runner.run(&Scenario::default(), &[0x60, 0x80]).await?;
//! assert!(report.is_success());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod plan;
pub mod report;
pub mod runner;
pub mod scenario;

pub use error::EngineError;
pub use plan::{Plan, PlannedStep, StepActor, StepKind, chunk_bytecode, step};
pub use report::{RunOutcome, RunReport, StepReport, StepStatus};
pub use runner::WorkflowRunner;
pub use scenario::{
    ContractSettings, RecipientSettings, Scenario, TokenSettings, TransferSettings,
};
