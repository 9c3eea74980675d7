use tracing::{debug, warn};
use zkc_compressed_account::CompressedLeaf;

use crate::{
    error::ClientError,
    indexer::{AddressWithTree, Indexer, IndexerError, IndexerRpcConfig, ValidityProofWithContext},
};

/// Requests one validity proof per operation and binds the response to the
/// request positionally.
pub struct ProofCoordinator<'a, I: Indexer + ?Sized> {
    indexer: &'a I,
    config: Option<IndexerRpcConfig>,
}

impl<'a, I: Indexer + ?Sized> ProofCoordinator<'a, I> {
    pub fn new(indexer: &'a I, config: Option<IndexerRpcConfig>) -> Self {
        Self { indexer, config }
    }

    /// Requests a proof for exactly `leaves`, in order, and `new_addresses`.
    ///
    /// No request is issued when there is nothing to prove.
    pub async fn request(
        &self,
        leaves: &[CompressedLeaf],
        new_addresses: &[AddressWithTree],
    ) -> Result<ValidityProofWithContext, ClientError> {
        if leaves.is_empty() && new_addresses.is_empty() {
            return Ok(ValidityProofWithContext::default());
        }
        let hashes: Vec<[u8; 32]> = leaves.iter().map(|leaf| leaf.hash.to_bytes()).collect();
        debug!(
            "requesting validity proof for {} accounts and {} addresses",
            hashes.len(),
            new_addresses.len()
        );
        let response = self
            .indexer
            .get_validity_proof(hashes.clone(), new_addresses.to_vec(), self.config)
            .await
            .map_err(|e| {
                if let IndexerError::StaleRoot { tree } = &e {
                    warn!("Validity proof references a stale root of tree {}", tree);
                }
                e
            })?;
        let proof = response.value;

        let expected = hashes.len() + new_addresses.len();
        if proof.len() != expected
            || proof.accounts.len() != hashes.len()
            || proof.addresses.len() != new_addresses.len()
        {
            warn!(
                "Validity proof has {} inputs, requested {}",
                proof.len(),
                expected
            );
            return Err(ClientError::ProofFetchFailed(
                IndexerError::ProofLengthMismatch {
                    expected,
                    actual: proof.len(),
                },
            ));
        }
        let accounts_aligned = proof
            .accounts
            .iter()
            .zip(hashes.iter())
            .all(|(inputs, hash)| inputs.hash == *hash);
        let addresses_aligned = proof
            .addresses
            .iter()
            .zip(new_addresses.iter())
            .all(|(inputs, requested)| inputs.address == requested.address);
        if !accounts_aligned || !addresses_aligned {
            warn!("Validity proof inputs are not in request order");
            return Err(ClientError::ProofFetchFailed(
                IndexerError::InvalidResponseData,
            ));
        }
        let needs_proof = !proof.addresses.is_empty()
            || proof
                .accounts
                .iter()
                .zip(leaves.iter())
                .any(|(account, leaf)| {
                    !(leaf.prove_by_index || account.root_index.proof_by_index())
                });
        if needs_proof && proof.proof.is_none() {
            warn!("Validity proof is missing");
            return Err(ClientError::ProofFetchFailed(
                IndexerError::InvalidResponseData,
            ));
        }
        Ok(proof)
    }
}
