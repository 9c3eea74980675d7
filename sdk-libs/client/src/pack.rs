//! Packing of public keys into the remaining accounts of an instruction.
//!
//! Instruction data references trees, queues and other accounts by their
//! `u8` position in the remaining accounts rather than by public key.

use std::collections::HashMap;

use solana_instruction::AccountMeta;
use solana_pubkey::Pubkey;
use thiserror::Error;
use tracing::trace;
use zkc_compressed_account::{
    instruction_data::{PackedAddressTreeInfo, PackedStateTreeInfo},
    CompressedLeaf, TreeInfo, TreeType,
};

use crate::indexer::ValidityProofWithContext;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PackError {
    #[error("Account index {0} does not fit into u8")]
    IndexOverflow(usize),
    #[error("Duplicate key {0} in packed accounts")]
    DuplicateKey(Pubkey),
    #[error("Index {index} out of range for {len} packed accounts")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Tree type {0:?} cannot receive outputs")]
    InvalidPackTreeType(TreeType),
    #[error("Proof covers {proof} accounts, {leaves} leaves were packed")]
    ProofMismatch { proof: usize, leaves: usize },
    #[error("Proof input {position} does not belong to the leaf packed at that position")]
    HashMismatch { position: usize },
    #[error("Leaf index {0} does not fit into u32")]
    LeafIndexOverflow(u64),
}

/// Deduplicated, ordered set of accounts.
///
/// Indices are assigned in first-seen order. Inserting a key twice returns
/// the existing index and merges signer and writable flags.
#[derive(Default, Debug, Clone)]
pub struct PackedAccounts {
    next_index: usize,
    map: HashMap<Pubkey, (usize, AccountMeta)>,
}

impl PackedAccounts {
    /// Returns the index of the provided `pubkey` in the collection.
    ///
    /// If the provided `pubkey` is not a part of the collection, it gets
    /// inserted with a `next_index`.
    ///
    /// If the provided `pubkey` already exists in the collection, its already
    /// existing index is returned.
    pub fn insert_or_get(&mut self, pubkey: Pubkey) -> Result<u8, PackError> {
        self.insert_or_get_config(pubkey, false, true)
    }

    pub fn insert_or_get_read_only(&mut self, pubkey: Pubkey) -> Result<u8, PackError> {
        self.insert_or_get_config(pubkey, false, false)
    }

    pub fn insert_or_get_config(
        &mut self,
        pubkey: Pubkey,
        is_signer: bool,
        is_writable: bool,
    ) -> Result<u8, PackError> {
        if let Some((index, meta)) = self.map.get_mut(&pubkey) {
            meta.is_signer |= is_signer;
            meta.is_writable |= is_writable;
            return u8::try_from(*index).map_err(|_| PackError::IndexOverflow(*index));
        }
        let index = u8::try_from(self.next_index)
            .map_err(|_| PackError::IndexOverflow(self.next_index))?;
        self.map.insert(
            pubkey,
            (
                self.next_index,
                AccountMeta {
                    pubkey,
                    is_signer,
                    is_writable,
                },
            ),
        );
        self.next_index += 1;
        Ok(index)
    }

    pub fn get(&self, pubkey: &Pubkey) -> Option<u8> {
        self.map
            .get(pubkey)
            .and_then(|(index, _)| u8::try_from(*index).ok())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Packed keys in index order.
    pub fn keys(&self) -> Vec<Pubkey> {
        self.to_account_metas()
            .into_iter()
            .map(|meta| meta.pubkey)
            .collect()
    }

    /// Converts the collection of accounts to a vector of
    /// [`AccountMeta`](solana_instruction::AccountMeta), which can be used
    /// as remaining accounts in instructions.
    pub fn to_account_metas(&self) -> Vec<AccountMeta> {
        let mut packed_accounts = self.map.values().collect::<Vec<_>>();
        // hash maps are not sorted so we need to sort manually and collect into a vector again
        packed_accounts.sort_by_key(|(index, _)| *index);
        packed_accounts
            .into_iter()
            .map(|(_, meta)| meta.clone())
            .collect()
    }

    /// Checks that indices are dense, unique and each fits into a `u8`.
    pub fn validate(&self) -> Result<(), PackError> {
        let len = self.map.len();
        let mut seen = vec![false; len];
        for (pubkey, (index, _)) in self.map.iter() {
            let slot = seen.get_mut(*index).ok_or(PackError::IndexOutOfRange {
                index: *index,
                len,
            })?;
            if *slot {
                return Err(PackError::DuplicateKey(*pubkey));
            }
            *slot = true;
        }
        if len > usize::from(u8::MAX) + 1 {
            return Err(PackError::IndexOverflow(len - 1));
        }
        Ok(())
    }

    /// Get the index of the output tree in the packed accounts.
    /// For StateV1, it returns the index of the tree account.
    /// For StateV2, it returns the index of the queue account.
    /// (For V2 trees new state is inserted into the output queue.
    /// The forester updates the tree from the queue asynchronously.)
    pub fn pack_output_tree_index(&mut self, tree_info: &TreeInfo) -> Result<u8, PackError> {
        match tree_info.tree_type {
            TreeType::StateV1 => self.insert_or_get(tree_info.tree.into()),
            TreeType::StateV2 => self.insert_or_get(tree_info.queue.into()),
            tree_type => Err(PackError::InvalidPackTreeType(tree_type)),
        }
    }
}

/// Packs the trees and queues of `leaves` and binds each leaf to the root
/// index at the same position in `proof`.
///
/// For every leaf the tree is inserted before the queue.
pub fn pack_input_accounts(
    packed_accounts: &mut PackedAccounts,
    leaves: &[CompressedLeaf],
    proof: &ValidityProofWithContext,
) -> Result<Vec<PackedStateTreeInfo>, PackError> {
    if leaves.len() != proof.accounts.len() {
        return Err(PackError::ProofMismatch {
            proof: proof.accounts.len(),
            leaves: leaves.len(),
        });
    }
    leaves
        .iter()
        .zip(proof.accounts.iter())
        .enumerate()
        .map(|(position, (leaf, proof_inputs))| {
            if proof_inputs.hash != leaf.hash.to_bytes() {
                return Err(PackError::HashMismatch { position });
            }
            let merkle_tree_pubkey_index =
                packed_accounts.insert_or_get(leaf.tree_info.tree.into())?;
            let queue_pubkey_index = packed_accounts.insert_or_get(leaf.tree_info.queue.into())?;
            let leaf_index = u32::try_from(leaf.leaf_index)
                .map_err(|_| PackError::LeafIndexOverflow(leaf.leaf_index))?;
            let prove_by_index = leaf.prove_by_index || proof_inputs.root_index.proof_by_index();
            // Leaves proven by index carry no root.
            let root_index = if prove_by_index {
                0
            } else {
                proof_inputs.root_index.root_index().unwrap_or_default()
            };
            let packed = PackedStateTreeInfo {
                root_index,
                prove_by_index,
                merkle_tree_pubkey_index,
                queue_pubkey_index,
                leaf_index,
            };
            trace!(
                "packed leaf {} tree {} queue {} root {}",
                leaf_index,
                merkle_tree_pubkey_index,
                queue_pubkey_index,
                packed.root_index
            );
            Ok(packed)
        })
        .collect()
}

/// Packs the address trees and queues of the new addresses in `proof`.
pub fn pack_new_address_tree_infos(
    packed_accounts: &mut PackedAccounts,
    proof: &ValidityProofWithContext,
) -> Result<Vec<PackedAddressTreeInfo>, PackError> {
    proof
        .addresses
        .iter()
        .map(|address| {
            Ok(PackedAddressTreeInfo {
                address_merkle_tree_pubkey_index: packed_accounts
                    .insert_or_get(address.tree_info.tree.into())?,
                address_queue_pubkey_index: packed_accounts
                    .insert_or_get(address.tree_info.queue.into())?,
                root_index: address.root_index,
            })
        })
        .collect()
}
