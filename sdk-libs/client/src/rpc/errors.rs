use solana_pubkey::Pubkey;
use thiserror::Error;

/// Failures reported by the signer/broadcaster.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The ledger no longer retains a root the proof was computed against.
    #[error("Root of tree {tree} is stale")]
    StaleRoot { tree: Pubkey },

    #[error("Transaction rejected: {0}")]
    Rejected(String),

    #[error("Transport error: {0}")]
    Transport(String),
}
