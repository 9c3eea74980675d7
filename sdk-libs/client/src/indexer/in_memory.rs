//! In-process [`Indexer`] backed by plain collections.
//!
//! Keeps the live leaves of registered state trees and the addresses of
//! registered address trees. Proofs are not computed, root indices and proof
//! bytes are derived deterministically from the request.

use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use solana_instruction::Instruction;
use solana_pubkey::Pubkey;
use tokio::sync::RwLock;
use tracing::{debug, trace};
use zkc_compressed_account::{
    address::derive_address_from_seed,
    constants::{ADDRESS_MERKLE_TREE_ROOTS, STATE_MERKLE_TREE_ROOTS},
    hashv_to_bn254_field_size_be, keccak_hashv,
    instruction_data::CompressedProof,
    CompressedAccount, CompressedLeaf, FieldElement, NextTreeInfo, Pubkey as WirePubkey, TreeInfo,
};

use super::{
    AccountProofInputs, AddressProofInputs, AddressWithTree, Base58Conversions, Context, Hash, Indexer, IndexerError, IndexerRpcConfig, ItemsWithCursor,
    PaginatedOptions, Response, RootIndex, ValidityProofWithContext,
};
use crate::{constants::SYSTEM_ACCOUNTS_LEN, instruction::decode_invoke_data};

pub const DEFAULT_PAGE_LIMIT: u16 = 1000;

#[derive(Debug, Clone)]
struct StateTreeBundle {
    tree_info: TreeInfo,
    next_leaf_index: u32,
}

#[derive(Debug, Clone)]
struct AddressTreeBundle {
    tree_info: TreeInfo,
    addresses: HashSet<[u8; 32]>,
}

#[derive(Debug, Clone, Default)]
struct IndexerState {
    slot: u64,
    state_trees: HashMap<Pubkey, StateTreeBundle>,
    /// Output queue to tree.
    queues: HashMap<Pubkey, Pubkey>,
    address_trees: HashMap<Pubkey, AddressTreeBundle>,
    /// Unspent leaves in insertion order.
    leaves: Vec<CompressedLeaf>,
    fail_next_proof: Option<IndexerError>,
}

impl IndexerState {
    fn resolve_state_tree(&self, pubkey: &Pubkey) -> Result<Pubkey, IndexerError> {
        if self.state_trees.contains_key(pubkey) {
            return Ok(*pubkey);
        }
        self.queues
            .get(pubkey)
            .copied()
            .ok_or_else(|| IndexerError::InvalidParameters(format!("unknown state tree {}", pubkey)))
    }

    fn append(&mut self, account: CompressedAccount, tree: &Pubkey) -> Result<CompressedLeaf, IndexerError> {
        let bundle = self
            .state_trees
            .get_mut(tree)
            .ok_or_else(|| IndexerError::InvalidParameters(format!("unknown state tree {}", tree)))?;
        let leaf_index = bundle.next_leaf_index;
        bundle.next_leaf_index = leaf_index
            .checked_add(1)
            .ok_or_else(|| IndexerError::InvalidParameters(format!("state tree {} is full", tree)))?;
        let mut leaf = CompressedLeaf::new(account, bundle.tree_info, leaf_index)
            .map_err(|e| IndexerError::InvalidParameters(e.to_string()))?;
        // Batched trees keep new leaves in the output queue.
        leaf.prove_by_index = bundle.tree_info.is_batched();
        trace!("appended leaf {} to tree {}", leaf_index, tree);
        self.leaves.push(leaf.clone());
        Ok(leaf)
    }

    fn nullify(&mut self, hash: &[u8; 32]) -> Result<CompressedLeaf, IndexerError> {
        let position = self
            .leaves
            .iter()
            .position(|leaf| leaf.hash.as_bytes() == hash)
            .ok_or(IndexerError::AccountNotFound)?;
        Ok(self.leaves.remove(position))
    }
}

/// Deterministic root index of a leaf, so responses can be checked against
/// the request position by position.
pub fn root_index_for_leaf(leaf_index: u64) -> u16 {
    ((leaf_index + 1) % STATE_MERKLE_TREE_ROOTS as u64) as u16
}

#[derive(Debug, Default)]
pub struct InMemoryIndexer {
    state: RwLock<IndexerState>,
    proof_requests: AtomicUsize,
}

impl InMemoryIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_state_tree(&self, tree_info: TreeInfo) -> Result<(), IndexerError> {
        if !tree_info.tree_type.is_state_tree() {
            return Err(IndexerError::InvalidParameters(format!(
                "{:?} is not a state tree",
                tree_info.tree_type
            )));
        }
        let mut state = self.state.write().await;
        let tree = Pubkey::from(tree_info.tree);
        state.queues.insert(Pubkey::from(tree_info.queue), tree);
        state.state_trees.insert(
            tree,
            StateTreeBundle {
                tree_info,
                next_leaf_index: 0,
            },
        );
        Ok(())
    }

    pub async fn add_address_tree(&self, tree_info: TreeInfo) -> Result<(), IndexerError> {
        if !tree_info.is_address_tree() {
            return Err(IndexerError::InvalidParameters(format!(
                "{:?} is not an address tree",
                tree_info.tree_type
            )));
        }
        self.state.write().await.address_trees.insert(
            Pubkey::from(tree_info.tree),
            AddressTreeBundle {
                tree_info,
                addresses: HashSet::new(),
            },
        );
        Ok(())
    }

    /// Links `tree` to its successor. Leaves of `tree` stay spendable,
    /// new state is routed to `next`.
    pub async fn roll_over_state_tree(
        &self,
        tree: &Pubkey,
        next: NextTreeInfo,
    ) -> Result<(), IndexerError> {
        let mut state = self.state.write().await;
        let bundle = state
            .state_trees
            .get_mut(tree)
            .ok_or_else(|| IndexerError::InvalidParameters(format!("unknown state tree {}", tree)))?;
        bundle.tree_info.next_tree_info = Some(next);
        let tree_info = bundle.tree_info;
        for leaf in state
            .leaves
            .iter_mut()
            .filter(|leaf| Pubkey::from(leaf.tree_info.tree) == *tree)
        {
            leaf.tree_info = tree_info;
        }
        let next_tree = Pubkey::from(next.tree);
        state.queues.insert(Pubkey::from(next.queue), next_tree);
        state
            .state_trees
            .entry(next_tree)
            .or_insert_with(|| StateTreeBundle {
                tree_info: next.into(),
                next_leaf_index: 0,
            });
        Ok(())
    }

    /// Appends `account` to `tree` as a new leaf.
    pub async fn insert_account(
        &self,
        account: CompressedAccount,
        tree: &Pubkey,
    ) -> Result<CompressedLeaf, IndexerError> {
        self.state.write().await.append(account, tree)
    }

    /// Appends a leaf holding `lamports` for `owner`.
    pub async fn mint(
        &self,
        owner: &Pubkey,
        lamports: u64,
        tree: &Pubkey,
    ) -> Result<CompressedLeaf, IndexerError> {
        self.insert_account(CompressedAccount::new(owner.into(), lamports), tree)
            .await
    }

    pub async fn leaves(&self) -> Vec<CompressedLeaf> {
        self.state.read().await.leaves.clone()
    }

    pub async fn balance(&self, owner: &Pubkey) -> u64 {
        self.state
            .read()
            .await
            .leaves
            .iter()
            .filter(|leaf| Pubkey::from(leaf.account.owner) == *owner)
            .map(|leaf| leaf.lamports())
            .sum()
    }

    pub async fn advance_slot(&self, slots: u64) {
        self.state.write().await.slot += slots;
    }

    /// The next proof request fails with `error`.
    pub async fn fail_next_proof_with(&self, error: IndexerError) {
        self.state.write().await.fail_next_proof = Some(error);
    }

    pub fn proof_request_count(&self) -> usize {
        self.proof_requests.load(Ordering::SeqCst)
    }

    /// Applies a light system program `invoke` instruction: nullifies its
    /// inputs, appends its outputs and inserts its new addresses.
    ///
    /// Nothing is applied if any part of the instruction is invalid.
    pub async fn apply_instruction(&self, instruction: &Instruction) -> Result<(), IndexerError> {
        let inputs = decode_invoke_data(&instruction.data)
            .map_err(|e| IndexerError::InvalidParameters(e.to_string()))?;
        if !inputs.is_balanced() {
            return Err(IndexerError::InvalidParameters(
                "lamports are not conserved".to_string(),
            ));
        }
        let remaining_accounts = instruction
            .accounts
            .get(SYSTEM_ACCOUNTS_LEN..)
            .ok_or_else(|| IndexerError::InvalidParameters("missing system accounts".to_string()))?;
        let account_at = |index: u8| {
            remaining_accounts
                .get(usize::from(index))
                .map(|meta| meta.pubkey)
                .ok_or_else(|| {
                    IndexerError::InvalidParameters(format!("account index {} out of range", index))
                })
        };

        let mut guard = self.state.write().await;
        let mut state = (*guard).clone();
        for input in inputs.input_compressed_accounts_with_merkle_context.iter() {
            let tree = account_at(input.merkle_context.merkle_tree_pubkey_index)?;
            let hash = input
                .compressed_account
                .hash(&tree.into(), input.merkle_context.leaf_index)
                .map_err(|e| IndexerError::InvalidParameters(e.to_string()))?;
            state.nullify(&hash)?;
        }
        for new_address in inputs.new_address_params.iter() {
            let tree = account_at(new_address.address_merkle_tree_account_index)?;
            let address = derive_address_from_seed(&new_address.seed, &tree.into());
            let bundle = state
                .address_trees
                .get_mut(&tree)
                .ok_or_else(|| {
                    IndexerError::InvalidParameters(format!("unknown address tree {}", tree))
                })?;
            if !bundle.addresses.insert(address.to_bytes()) {
                return Err(IndexerError::AddressAlreadyExists { tree });
            }
        }
        for output in inputs.output_compressed_accounts.iter() {
            let tree = state.resolve_state_tree(&account_at(output.merkle_tree_index)?)?;
            state.append(output.compressed_account.clone(), &tree)?;
        }
        state.slot += 1;
        debug!(
            "applied instruction at slot {}: {} inputs, {} outputs, {} addresses",
            state.slot,
            inputs.input_compressed_accounts_with_merkle_context.len(),
            inputs.output_compressed_accounts.len(),
            inputs.new_address_params.len()
        );
        *guard = state;
        Ok(())
    }
}

fn check_slot(state: &IndexerState, config: Option<IndexerRpcConfig>) -> Result<(), IndexerError> {
    let config = config.unwrap_or_default();
    if state.slot < config.slot {
        return Err(IndexerError::IndexerNotSyncedToSlot {
            required: config.slot,
            current: state.slot,
        });
    }
    Ok(())
}

fn mock_root(tree: &WirePubkey, root_index: u16) -> [u8; 32] {
    hashv_to_bn254_field_size_be(&[tree.as_bytes().as_slice(), &root_index.to_le_bytes()])
}

fn mock_proof(hashes: &[Hash], addresses: &[AddressWithTree]) -> CompressedProof {
    let mut inputs: Vec<&[u8]> = hashes.iter().map(|hash| hash.as_slice()).collect();
    inputs.extend(addresses.iter().map(|address| address.address.as_slice()));
    let a = keccak_hashv(&inputs);
    let c = keccak_hashv(&[a.as_slice()]);
    let mut b = [0u8; 64];
    b[..32].copy_from_slice(&a);
    b[32..].copy_from_slice(&c);
    CompressedProof { a, b, c }
}

#[async_trait]
impl Indexer for InMemoryIndexer {
    async fn get_indexer_slot(&self) -> Result<u64, IndexerError> {
        Ok(self.state.read().await.slot)
    }

    async fn get_compressed_accounts_by_owner(
        &self,
        owner: &Pubkey,
        options: Option<PaginatedOptions>,
        config: Option<IndexerRpcConfig>,
    ) -> Result<Response<ItemsWithCursor<CompressedLeaf>>, IndexerError> {
        let state = self.state.read().await;
        check_slot(&state, config)?;
        let options = options.unwrap_or_default();
        let limit = usize::from(options.limit.unwrap_or(DEFAULT_PAGE_LIMIT));
        if limit == 0 {
            return Err(IndexerError::InvalidParameters(
                "limit must be positive".to_string(),
            ));
        }

        let owned: Vec<&CompressedLeaf> = state
            .leaves
            .iter()
            .filter(|leaf| Pubkey::from(leaf.account.owner) == *owner)
            .collect();
        let start = match options.cursor {
            Some(cursor) => {
                let after = <FieldElement as Base58Conversions>::from_base58(&cursor)
                    .map_err(|_| {
                        IndexerError::InvalidParameters(format!("malformed cursor {}", cursor))
                    })?;
                owned
                    .iter()
                    .position(|leaf| leaf.hash == after)
                    .map(|position| position + 1)
                    .ok_or_else(|| {
                        IndexerError::InvalidParameters(format!("unknown cursor {}", cursor))
                    })?
            }
            None => 0,
        };
        let items: Vec<CompressedLeaf> = owned
            .iter()
            .skip(start)
            .take(limit)
            .map(|leaf| (*leaf).clone())
            .collect();
        let cursor = if start + items.len() < owned.len() {
            items.last().map(|leaf| leaf.hash.to_base58())
        } else {
            None
        };

        Ok(Response {
            context: Context { slot: state.slot },
            value: ItemsWithCursor { items, cursor },
        })
    }

    async fn get_validity_proof(
        &self,
        hashes: Vec<Hash>,
        new_addresses_with_trees: Vec<AddressWithTree>,
        config: Option<IndexerRpcConfig>,
    ) -> Result<Response<ValidityProofWithContext>, IndexerError> {
        self.proof_requests.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.write().await;
        check_slot(&state, config)?;
        if let Some(error) = state.fail_next_proof.take() {
            return Err(error);
        }

        let accounts = hashes
            .iter()
            .map(|hash| {
                let leaf = state
                    .leaves
                    .iter()
                    .find(|leaf| leaf.hash.as_bytes() == hash)
                    .ok_or(IndexerError::AccountNotFound)?;
                let root_index = if leaf.prove_by_index {
                    RootIndex::new_none()
                } else {
                    RootIndex::new_some(root_index_for_leaf(leaf.leaf_index))
                };
                Ok(AccountProofInputs {
                    hash: *hash,
                    root: mock_root(&leaf.tree_info.tree, root_index.root_index().unwrap_or_default()),
                    root_index,
                    leaf_index: leaf.leaf_index,
                    tree_info: leaf.tree_info,
                })
            })
            .collect::<Result<Vec<_>, IndexerError>>()?;

        let addresses = new_addresses_with_trees
            .iter()
            .map(|address| {
                FieldElement::new(address.address).map_err(|e| {
                    IndexerError::InvalidParameters(format!(
                        "address {}: {}",
                        address.address.to_base58(),
                        e
                    ))
                })?;
                let bundle = state.address_trees.get(&address.tree).ok_or_else(|| {
                    IndexerError::InvalidParameters(format!("unknown address tree {}", address.tree))
                })?;
                if bundle.addresses.contains(&address.address) {
                    return Err(IndexerError::AddressAlreadyExists { tree: address.tree });
                }
                let root_index = (bundle.addresses.len() % ADDRESS_MERKLE_TREE_ROOTS) as u16;
                Ok(AddressProofInputs {
                    address: address.address,
                    root: mock_root(&bundle.tree_info.tree, root_index),
                    root_index,
                    tree_info: bundle.tree_info,
                })
            })
            .collect::<Result<Vec<_>, IndexerError>>()?;

        let needs_proof = !addresses.is_empty()
            || accounts
                .iter()
                .any(|account| !account.root_index.proof_by_index());
        let proof = needs_proof.then(|| mock_proof(&hashes, &new_addresses_with_trees));
        trace!(
            "validity proof for {} accounts and {} addresses at slot {}",
            accounts.len(),
            addresses.len(),
            state.slot
        );

        Ok(Response {
            context: Context { slot: state.slot },
            value: ValidityProofWithContext {
                proof,
                accounts,
                addresses,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use zkc_compressed_account::TreeType;

    use super::*;

    fn state_tree(tree_type: TreeType) -> TreeInfo {
        TreeInfo::new(WirePubkey::new_unique(), WirePubkey::new_unique(), tree_type)
    }

    #[tokio::test]
    async fn test_paging_with_cursor() {
        let indexer = InMemoryIndexer::new();
        let tree_info = state_tree(TreeType::StateV1);
        indexer.add_state_tree(tree_info).await.unwrap();
        let owner = Pubkey::new_unique();
        let tree = Pubkey::from(tree_info.tree);
        for lamports in 1..=5 {
            indexer.mint(&owner, lamports, &tree).await.unwrap();
        }
        indexer.mint(&Pubkey::new_unique(), 100, &tree).await.unwrap();

        let mut cursor = None;
        let mut seen = Vec::new();
        loop {
            let page = indexer
                .get_compressed_accounts_by_owner(
                    &owner,
                    Some(PaginatedOptions::new(cursor, Some(2))),
                    None,
                )
                .await
                .unwrap()
                .value;
            assert!(page.items.len() <= 2);
            seen.extend(page.items.iter().map(|leaf| leaf.lamports()));
            cursor = page.cursor;
            if cursor.is_none() {
                break;
            }
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_rejects_malformed_cursor() {
        let indexer = InMemoryIndexer::new();
        let owner = Pubkey::new_unique();
        for cursor in [[u8::MAX; 32].to_base58(), "0OIl".to_string()] {
            let result = indexer
                .get_compressed_accounts_by_owner(
                    &owner,
                    Some(PaginatedOptions::new(Some(cursor), None)),
                    None,
                )
                .await;
            assert!(matches!(result, Err(IndexerError::InvalidParameters(_))));
        }
    }

    #[tokio::test]
    async fn test_not_synced_to_slot() {
        let indexer = InMemoryIndexer::new();
        indexer.advance_slot(3).await;
        let result = indexer
            .get_validity_proof(vec![], vec![], Some(IndexerRpcConfig::new(10)))
            .await;
        assert_eq!(
            result,
            Err(IndexerError::IndexerNotSyncedToSlot {
                required: 10,
                current: 3
            })
        );
        assert_eq!(indexer.proof_request_count(), 1);
    }

    #[tokio::test]
    async fn test_proof_root_indices_and_prove_by_index() {
        let indexer = InMemoryIndexer::new();
        let v1 = state_tree(TreeType::StateV1);
        let v2 = state_tree(TreeType::StateV2);
        indexer.add_state_tree(v1).await.unwrap();
        indexer.add_state_tree(v2).await.unwrap();
        let owner = Pubkey::new_unique();
        let a = indexer.mint(&owner, 1, &v1.tree.into()).await.unwrap();
        let b = indexer.mint(&owner, 2, &v1.tree.into()).await.unwrap();
        let c = indexer.mint(&owner, 3, &v2.tree.into()).await.unwrap();
        assert!(c.prove_by_index);

        let proof = indexer
            .get_validity_proof(
                vec![b.hash.to_bytes(), c.hash.to_bytes(), a.hash.to_bytes()],
                vec![],
                None,
            )
            .await
            .unwrap()
            .value;
        assert_eq!(proof.get_root_indices(), vec![Some(2), None, Some(1)]);
        assert!(proof.proof.is_some());

        let by_index_only = indexer
            .get_validity_proof(vec![c.hash.to_bytes()], vec![], None)
            .await
            .unwrap()
            .value;
        assert!(by_index_only.proof.is_none());
    }

    #[tokio::test]
    async fn test_fail_next_proof_once() {
        let indexer = InMemoryIndexer::new();
        let tree = Pubkey::new_unique();
        indexer
            .fail_next_proof_with(IndexerError::StaleRoot { tree })
            .await;
        assert_eq!(
            indexer.get_validity_proof(vec![], vec![], None).await,
            Err(IndexerError::StaleRoot { tree })
        );
        assert!(indexer.get_validity_proof(vec![], vec![], None).await.is_ok());
        assert_eq!(indexer.proof_request_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_hash() {
        let indexer = InMemoryIndexer::new();
        assert_eq!(
            indexer.get_validity_proof(vec![[1u8; 32]], vec![], None).await,
            Err(IndexerError::AccountNotFound)
        );
    }

    #[tokio::test]
    async fn test_rollover_updates_leaves() {
        let indexer = InMemoryIndexer::new();
        let old = state_tree(TreeType::StateV1);
        indexer.add_state_tree(old).await.unwrap();
        let owner = Pubkey::new_unique();
        indexer.mint(&owner, 7, &old.tree.into()).await.unwrap();
        let next = NextTreeInfo {
            cpi_context: None,
            queue: WirePubkey::new_unique(),
            tree: WirePubkey::new_unique(),
            tree_type: TreeType::StateV1,
        };
        indexer
            .roll_over_state_tree(&old.tree.into(), next)
            .await
            .unwrap();
        let leaves = indexer.leaves().await;
        assert_eq!(leaves[0].tree_info.next_tree_info, Some(next));
        assert_eq!(leaves[0].tree_info.output_tree().tree, next.tree);
        let minted = indexer.mint(&owner, 1, &next.tree.into()).await.unwrap();
        assert_eq!(minted.leaf_index, 0);
        assert_eq!(indexer.balance(&owner).await, 8);
    }
}
