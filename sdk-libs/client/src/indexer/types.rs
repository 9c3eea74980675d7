use solana_pubkey::Pubkey;
use zkc_compressed_account::{instruction_data::CompressedProof, TreeInfo};

pub type Address = [u8; 32];
pub type Hash = [u8; 32];

/// New address to prove non-inclusion for, together with its address tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressWithTree {
    pub address: Address,
    pub tree: Pubkey,
}

/// Root an account is proven against.
///
/// Accounts which are still in an output queue are proven by index and
/// have no root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RootIndex {
    proof_by_index: bool,
    root_index: u16,
}

impl RootIndex {
    pub fn new_none() -> Self {
        Self {
            proof_by_index: true,
            root_index: 0,
        }
    }

    pub fn new_some(root_index: u16) -> Self {
        Self {
            proof_by_index: false,
            root_index,
        }
    }

    pub fn proof_by_index(&self) -> bool {
        self.proof_by_index
    }

    pub fn root_index(&self) -> Option<u16> {
        if !self.proof_by_index {
            Some(self.root_index)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountProofInputs {
    pub hash: Hash,
    pub root: [u8; 32],
    pub root_index: RootIndex,
    pub leaf_index: u64,
    pub tree_info: TreeInfo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressProofInputs {
    pub address: Address,
    pub root: [u8; 32],
    pub root_index: u16,
    pub tree_info: TreeInfo,
}

/// Validity proof and the roots it was computed against.
///
/// `accounts` and `addresses` are in request order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidityProofWithContext {
    pub proof: Option<CompressedProof>,
    pub accounts: Vec<AccountProofInputs>,
    pub addresses: Vec<AddressProofInputs>,
}

impl ValidityProofWithContext {
    pub fn get_root_indices(&self) -> Vec<Option<u16>> {
        self.accounts
            .iter()
            .map(|account| account.root_index.root_index())
            .collect()
    }

    pub fn get_address_root_indices(&self) -> Vec<u16> {
        self.addresses
            .iter()
            .map(|address| address.root_index)
            .collect()
    }

    /// Root indices of all proven hashes followed by all new addresses.
    /// Accounts proven by index contribute root index 0.
    pub fn root_indices(&self) -> Vec<u16> {
        self.get_root_indices()
            .into_iter()
            .map(|root_index| root_index.unwrap_or_default())
            .chain(self.get_address_root_indices())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.accounts.len() + self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use zkc_compressed_account::{Pubkey as WirePubkey, TreeType};

    use super::*;

    fn tree_info() -> TreeInfo {
        TreeInfo::new(
            WirePubkey::new_unique(),
            WirePubkey::new_unique(),
            TreeType::StateV1,
        )
    }

    #[test]
    fn test_root_index() {
        assert_eq!(RootIndex::new_none().root_index(), None);
        assert!(RootIndex::new_none().proof_by_index());
        assert_eq!(RootIndex::new_some(5).root_index(), Some(5));
        assert!(!RootIndex::new_some(5).proof_by_index());
    }

    #[test]
    fn test_root_indices_order() {
        let account = |hash: u8, root_index| AccountProofInputs {
            hash: [hash; 32],
            root: [0; 32],
            root_index,
            leaf_index: 0,
            tree_info: tree_info(),
        };
        let proof = ValidityProofWithContext {
            proof: None,
            accounts: vec![
                account(1, RootIndex::new_some(10)),
                account(2, RootIndex::new_none()),
                account(3, RootIndex::new_some(12)),
            ],
            addresses: vec![AddressProofInputs {
                address: [4; 32],
                root: [0; 32],
                root_index: 7,
                tree_info: tree_info(),
            }],
        };
        assert_eq!(proof.get_root_indices(), vec![Some(10), None, Some(12)]);
        assert_eq!(proof.root_indices(), vec![10, 0, 12, 7]);
        assert_eq!(proof.len(), 4);
    }
}
