use async_trait::async_trait;
use solana_pubkey::Pubkey;
use zkc_compressed_account::CompressedLeaf;

use super::{
    AddressWithTree, Hash, IndexerError, IndexerRpcConfig, ItemsWithCursor, PaginatedOptions,
    Response, ValidityProofWithContext,
};

/// Read access to compressed state and validity proofs.
#[async_trait]
pub trait Indexer: Send + Sync {
    /// Returns the slot the indexer has processed up to.
    async fn get_indexer_slot(&self) -> Result<u64, IndexerError>;

    /// Returns one page of the compressed accounts owned by `owner`.
    async fn get_compressed_accounts_by_owner(
        &self,
        owner: &Pubkey,
        options: Option<PaginatedOptions>,
        config: Option<IndexerRpcConfig>,
    ) -> Result<Response<ItemsWithCursor<CompressedLeaf>>, IndexerError>;

    /// Returns a single validity proof for the inclusion of `hashes` and the
    /// non-inclusion of `new_addresses_with_trees`.
    ///
    /// Proof inputs are returned in request order.
    async fn get_validity_proof(
        &self,
        hashes: Vec<Hash>,
        new_addresses_with_trees: Vec<AddressWithTree>,
        config: Option<IndexerRpcConfig>,
    ) -> Result<Response<ValidityProofWithContext>, IndexerError>;
}
