//! Ledger client seam and simulated network for the tokenflow workspace.
//!
//! The [`LedgerClient`] trait is the boundary the workflow engine drives:
//! token lifecycle, account creation, association, native transfers, bytecode
//! staging, contract deployment, and contract calls. Every method takes the
//! authorizing [`Operator`] explicitly, so "who signs this" is an argument
//! rather than client state that callers mutate between submissions.
//!
//! [`InMemoryLedger`] implements the trait as a deterministic in-process
//! network with Hedera-style receipt status codes. It backs the scenario
//! tests and gives the CLI a sandbox to run the demo workflow against;
//! transaction encoding, signing, and transport belong to real SDK clients
//! behind the same trait.

pub mod client;
pub mod error;
pub mod memory;
pub mod operator;

pub use client::{
    AccountCreate, ContractCall, ContractCreate, ContractExecute, FileAppend, LedgerClient,
    TokenCreate, TokenTransfer, TransferEntry, erc20, ops,
};
pub use error::LedgerError;
pub use memory::{InMemoryLedger, MAX_CHUNK_BYTES};
pub use operator::Operator;
