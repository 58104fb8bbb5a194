//! The identity that authorizes a ledger call.

use tokenflow_types::{AccountId, PrivateKey, PublicKey};

/// A payer account and the key that signs on its behalf.
///
/// Passed by reference to every [`LedgerClient`](crate::LedgerClient) method.
/// Keeping the operator per-call instead of as mutable client state means at
/// most one identity can apply to any submission, and reordering steps can
/// never leave a stale signer in place.
#[derive(Debug, Clone)]
pub struct Operator {
    /// Account paying for and authorizing the call.
    pub account_id: AccountId,
    /// Signing key for that account.
    pub key: PrivateKey,
}

impl Operator {
    /// Pair an account with its signing key.
    pub fn new(account_id: AccountId, key: PrivateKey) -> Self {
        Self { account_id, key }
    }

    /// Verification half of the signing key.
    pub fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }
}
