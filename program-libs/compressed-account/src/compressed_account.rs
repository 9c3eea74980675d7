use ark_bn254::Fr;
use borsh::{BorshDeserialize, BorshSerialize};
use light_poseidon::{Poseidon, PoseidonBytesHasher};

use crate::{
    hash_to_bn254_field_size_be, tree_info::TreeInfo, CompressedAccountError, FieldElement,
    Pubkey,
};

#[derive(Debug, PartialEq, Eq, Default, Clone, BorshSerialize, BorshDeserialize)]
pub struct CompressedAccountData {
    pub discriminator: [u8; 8],
    pub data: Vec<u8>,
    pub data_hash: [u8; 32],
}

#[derive(Debug, PartialEq, Eq, Default, Clone, BorshSerialize, BorshDeserialize)]
pub struct CompressedAccount {
    pub owner: Pubkey,
    pub lamports: u64,
    pub address: Option<FieldElement>,
    pub data: Option<CompressedAccountData>,
}

impl CompressedAccount {
    pub fn new(owner: Pubkey, lamports: u64) -> Self {
        Self {
            owner,
            lamports,
            address: None,
            data: None,
        }
    }

    /// Hashes the account with already field-sized owner and tree hashes.
    ///
    /// Inputs, in order: owner, leaf index (le), tree, lamports prefixed with
    /// 1 if non-zero, address if present, discriminator prefixed with 2 and
    /// data hash if data is present.
    pub fn hash_with_hashed_values(
        &self,
        owner_hashed: &[u8; 32],
        merkle_tree_hashed: &[u8; 32],
        leaf_index: u32,
    ) -> Result<[u8; 32], CompressedAccountError> {
        let capacity = 3
            + std::cmp::min(self.lamports, 1) as usize
            + self.address.is_some() as usize
            + self.data.is_some() as usize * 2;
        let mut vec: Vec<&[u8]> = Vec::with_capacity(capacity);
        vec.push(owner_hashed.as_slice());

        let leaf_index = leaf_index.to_le_bytes();
        vec.push(leaf_index.as_slice());

        vec.push(merkle_tree_hashed.as_slice());

        // The 1 prefix keeps lamports and discriminator inputs distinct.
        let mut lamports_bytes = [1, 0, 0, 0, 0, 0, 0, 0, 0];
        if self.lamports != 0 {
            lamports_bytes[1..].copy_from_slice(&self.lamports.to_le_bytes());
            vec.push(lamports_bytes.as_slice());
        }

        if let Some(address) = self.address.as_ref() {
            vec.push(address.as_bytes().as_slice());
        }

        let mut discriminator_bytes = [2, 0, 0, 0, 0, 0, 0, 0, 0];
        if let Some(data) = &self.data {
            discriminator_bytes[1..].copy_from_slice(data.discriminator.as_slice());
            vec.push(discriminator_bytes.as_slice());
            vec.push(data.data_hash.as_slice());
        }
        poseidon_hashv(&vec)
    }

    pub fn hash(
        &self,
        merkle_tree_pubkey: &Pubkey,
        leaf_index: u32,
    ) -> Result<[u8; 32], CompressedAccountError> {
        self.hash_with_hashed_values(
            &hash_pubkey(&self.owner)?,
            &hash_pubkey(merkle_tree_pubkey)?,
            leaf_index,
        )
    }
}

pub fn hash_pubkey(pubkey: &Pubkey) -> Result<[u8; 32], CompressedAccountError> {
    hash_to_bn254_field_size_be(pubkey.as_bytes())
        .map(|(hash, _)| hash)
        .ok_or_else(|| CompressedAccountError::HashError("no bump found".to_string()))
}

pub fn poseidon_hashv(vals: &[&[u8]]) -> Result<[u8; 32], CompressedAccountError> {
    let mut hasher = Poseidon::<Fr>::new_circom(vals.len())
        .map_err(|e| CompressedAccountError::HashError(e.to_string()))?;
    hasher
        .hash_bytes_be(vals)
        .map_err(|e| CompressedAccountError::HashError(e.to_string()))
}

#[derive(Debug, Clone, Copy, BorshSerialize, BorshDeserialize, PartialEq, Eq, Default)]
pub struct PackedMerkleContext {
    pub merkle_tree_pubkey_index: u8,
    pub queue_pubkey_index: u8,
    pub leaf_index: u32,
    pub prove_by_index: bool,
}

#[derive(Debug, PartialEq, Eq, Default, Clone, BorshSerialize, BorshDeserialize)]
pub struct PackedCompressedAccountWithMerkleContext {
    pub compressed_account: CompressedAccount,
    pub merkle_context: PackedMerkleContext,
    /// Index of the root used in inclusion validity proof.
    pub root_index: u16,
    /// Placeholder to mark accounts read-only unimplemented set to false.
    pub read_only: bool,
}

#[derive(Debug, PartialEq, Eq, Default, Clone, BorshSerialize, BorshDeserialize)]
pub struct OutputCompressedAccountWithPackedContext {
    pub compressed_account: CompressedAccount,
    pub merkle_tree_index: u8,
}

/// A compressed account as it sits in a state tree.
///
/// Leaves are returned by the indexer and never mutated. Spending a leaf
/// nullifies it and creates new output accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedLeaf {
    pub account: CompressedAccount,
    pub hash: FieldElement,
    pub tree_info: TreeInfo,
    pub leaf_index: u64,
    pub prove_by_index: bool,
    pub read_only: bool,
}

impl CompressedLeaf {
    pub fn new(
        account: CompressedAccount,
        tree_info: TreeInfo,
        leaf_index: u32,
    ) -> Result<Self, CompressedAccountError> {
        let hash = FieldElement::new(account.hash(&tree_info.tree, leaf_index)?)?;
        Ok(Self {
            account,
            hash,
            tree_info,
            leaf_index: leaf_index.into(),
            prove_by_index: false,
            read_only: false,
        })
    }

    pub fn owner(&self) -> &Pubkey {
        &self.account.owner
    }

    pub fn lamports(&self) -> u64 {
        self.account.lamports
    }

    pub fn address(&self) -> Option<FieldElement> {
        self.account.address
    }

    /// Recomputes the leaf hash and compares it with the stored one.
    pub fn verify_hash(&self) -> Result<bool, CompressedAccountError> {
        let leaf_index = u32::try_from(self.leaf_index).map_err(|_| {
            CompressedAccountError::HashError(format!(
                "leaf index {} exceeds u32",
                self.leaf_index
            ))
        })?;
        let hash = self.account.hash(&self.tree_info.tree, leaf_index)?;
        Ok(hash == self.hash.to_bytes())
    }
}
