use borsh::{BorshDeserialize, BorshSerialize};

use super::data::NewAddressParamsPacked;
use crate::compressed_account::PackedMerkleContext;

/// Position of a state tree, its queue and a leaf inside the packed
/// remaining accounts, plus the root the validity proof was computed against.
#[derive(Debug, Clone, Copy, BorshSerialize, BorshDeserialize, PartialEq, Eq, Default)]
pub struct PackedStateTreeInfo {
    pub root_index: u16,
    pub prove_by_index: bool,
    pub merkle_tree_pubkey_index: u8,
    pub queue_pubkey_index: u8,
    pub leaf_index: u32,
}

impl PackedStateTreeInfo {
    pub fn merkle_context(&self) -> PackedMerkleContext {
        PackedMerkleContext {
            merkle_tree_pubkey_index: self.merkle_tree_pubkey_index,
            queue_pubkey_index: self.queue_pubkey_index,
            leaf_index: self.leaf_index,
            prove_by_index: self.prove_by_index,
        }
    }
}

#[derive(Debug, Clone, Copy, BorshSerialize, BorshDeserialize, PartialEq, Eq, Default)]
pub struct PackedAddressTreeInfo {
    pub address_merkle_tree_pubkey_index: u8,
    pub address_queue_pubkey_index: u8,
    pub root_index: u16,
}

impl PackedAddressTreeInfo {
    pub fn into_new_address_params_packed(self, seed: [u8; 32]) -> NewAddressParamsPacked {
        NewAddressParamsPacked {
            seed,
            address_queue_account_index: self.address_queue_pubkey_index,
            address_merkle_tree_account_index: self.address_merkle_tree_pubkey_index,
            address_merkle_tree_root_index: self.root_index,
        }
    }
}
