use solana_pubkey::Pubkey;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexerError {
    #[error("Invalid response data")]
    InvalidResponseData,
    #[error("Indexer at slot {current} is not synced to slot {required}")]
    IndexerNotSyncedToSlot { required: u64, current: u64 },
    #[error("Root of tree {tree} is no longer in the root history")]
    StaleRoot { tree: Pubkey },
    #[error("Proof returned {actual} root indices, expected {expected}")]
    ProofLengthMismatch { expected: usize, actual: usize },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Account not found")]
    AccountNotFound,
    #[error("Address already exists in tree {tree}")]
    AddressAlreadyExists { tree: Pubkey },
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

impl IndexerError {
    /// Failures which may succeed when the same request is issued again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IndexerError::IndexerNotSyncedToSlot { .. } | IndexerError::Transport(_)
        )
    }
}
