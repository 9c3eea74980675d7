use std::io;

use solana_pubkey::Pubkey;
use thiserror::Error;
use zkc_compressed_account::CompressedAccountError;

use crate::{indexer::IndexerError, pack::PackError, rpc::SubmitError};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid field element: {0}")]
    InvalidFieldElement(CompressedAccountError),

    #[error("Hashing failed: {0}")]
    HashFailed(CompressedAccountError),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: u64, available: u64 },

    #[error("Proof fetch failed: {0}")]
    ProofFetchFailed(IndexerError),

    #[error("Root of tree {tree} is stale, restart the operation")]
    StaleRoot { tree: Pubkey },

    #[error("Packing invariant violated: {0}")]
    PackingInvariantViolation(String),

    #[error("Value {value} of {field} exceeds its encoded width")]
    EncodingOverflow { field: &'static str, value: u64 },

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Submission failed: {0}")]
    SubmissionFailed(SubmitError),

    #[error("IoError: {0}")]
    Io(#[from] io::Error),
}

impl ClientError {
    /// Indexer lag and transport failures may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::ProofFetchFailed(e) => e.is_retryable(),
            ClientError::SubmissionFailed(SubmitError::Transport(_)) => true,
            _ => false,
        }
    }

    /// The operation has to be restarted from account selection.
    pub fn requires_restart(&self) -> bool {
        matches!(self, ClientError::StaleRoot { .. })
    }
}

impl From<CompressedAccountError> for ClientError {
    fn from(err: CompressedAccountError) -> Self {
        match err {
            CompressedAccountError::InvalidFieldElementLength(_)
            | CompressedAccountError::FieldElementOutOfRange => {
                ClientError::InvalidFieldElement(err)
            }
            CompressedAccountError::InvalidSeeds | CompressedAccountError::InvalidTreeType(_) => {
                ClientError::InvalidParameters(err.to_string())
            }
            CompressedAccountError::InvalidProofLength(_) => {
                ClientError::ProofFetchFailed(IndexerError::InvalidResponseData)
            }
            CompressedAccountError::HashError(_) => ClientError::HashFailed(err),
        }
    }
}

impl From<IndexerError> for ClientError {
    fn from(err: IndexerError) -> Self {
        match err {
            IndexerError::StaleRoot { tree } => ClientError::StaleRoot { tree },
            err => ClientError::ProofFetchFailed(err),
        }
    }
}

impl From<PackError> for ClientError {
    fn from(err: PackError) -> Self {
        match err {
            PackError::IndexOverflow(value) => ClientError::EncodingOverflow {
                field: "account index",
                value: value as u64,
            },
            err => ClientError::PackingInvariantViolation(err.to_string()),
        }
    }
}

impl From<SubmitError> for ClientError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::StaleRoot { tree } => ClientError::StaleRoot { tree },
            err => ClientError::SubmissionFailed(err),
        }
    }
}
