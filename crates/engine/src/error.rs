//! Error type shared by scenario parsing, planning, and execution.

use thiserror::Error;
use tokenflow_ledger::LedgerError;
use tokenflow_types::{AbiError, SolidityAddress};

/// Failures surfaced while loading a scenario, building a plan, or running it.
///
/// Planning errors (`Scenario`, `ChunkLimit`) are returned before a single
/// ledger call is made; the upload step raises `ChunkLimit` again when an
/// already-built plan is executed against bytecode over its recorded ceiling.
/// The remaining variants occur inside a step; the runner records them on the
/// step report and halts the run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The scenario document could not be parsed.
    #[error("invalid scenario document: {0}")]
    Scenario(#[from] serde_yaml::Error),

    /// The bytecode needs more upload chunks than the configured ceiling.
    #[error("bytecode needs {chunks} upload chunks but the limit is {max_chunks}")]
    ChunkLimit { chunks: usize, max_chunks: usize },

    /// The deployed contract reports a token other than the one this run created.
    #[error("contract reports token address {actual} but this run created {expected}")]
    TokenAddressMismatch { expected: SolidityAddress, actual: SolidityAddress },

    /// A step needed run state that no earlier step produced. Only reachable
    /// with a hand-assembled plan; built plans order their steps correctly.
    #[error("step needs {what}, which no earlier step produced")]
    MissingPrerequisite { what: &'static str },

    /// A contract call returned a result the step could not decode.
    #[error("undecodable contract result: {0}")]
    Decode(#[from] AbiError),

    /// The ledger rejected or failed a submission.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl EngineError {
    /// The receipt status carried by a ledger rejection, when that is what
    /// this error is.
    pub fn receipt_status(&self) -> Option<tokenflow_types::ReceiptStatus> {
        match self {
            EngineError::Ledger(error) => error.status(),
            _ => None,
        }
    }
}
