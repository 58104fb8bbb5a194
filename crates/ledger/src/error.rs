//! Error taxonomy for ledger clients.

use thiserror::Error;
use tokenflow_types::ReceiptStatus;

/// Failure reported by a ledger client.
///
/// Anything the network itself rejects (validation, authorization, fees,
/// association rules, contract reverts) arrives as [`LedgerError::Receipt`]
/// carrying the status code; [`LedgerError::Transport`] covers requests that
/// never produced a receipt at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The network answered with a non-success receipt or query status.
    #[error("{operation} failed with status {status}")]
    Receipt {
        /// Operation name as submitted (see [`crate::ops`]).
        operation: &'static str,
        /// Status code the network returned.
        status: ReceiptStatus,
    },
    /// The request never reached consensus (connection loss, timeout, ...).
    #[error("transport failure during {operation}: {message}")]
    Transport {
        /// Operation name as submitted.
        operation: &'static str,
        /// Human-readable description from the transport layer.
        message: String,
    },
}

impl LedgerError {
    /// A receipt-status failure for `operation`.
    pub fn receipt(operation: &'static str, status: ReceiptStatus) -> Self {
        Self::Receipt { operation, status }
    }

    /// A transport failure for `operation`.
    pub fn transport(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Transport { operation, message: message.into() }
    }

    /// The receipt status, when the network produced one.
    pub fn status(&self) -> Option<ReceiptStatus> {
        match self {
            Self::Receipt { status, .. } => Some(*status),
            Self::Transport { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_errors_render_operation_and_code() {
        let err = LedgerError::receipt("token-associate", ReceiptStatus::TokenNotAssociatedToAccount);
        assert_eq!(
            err.to_string(),
            "token-associate failed with status TOKEN_NOT_ASSOCIATED_TO_ACCOUNT"
        );
        assert_eq!(err.status(), Some(ReceiptStatus::TokenNotAssociatedToAccount));
    }

    #[test]
    fn transport_errors_carry_no_status() {
        let err = LedgerError::transport("token-create", "connection reset");
        assert_eq!(err.to_string(), "transport failure during token-create: connection reset");
        assert_eq!(err.status(), None);
    }
}
