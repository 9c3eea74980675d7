use borsh::{BorshDeserialize, BorshSerialize};

use crate::{CompressedAccountError, Pubkey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, BorshSerialize, BorshDeserialize)]
#[repr(u64)]
pub enum TreeType {
    #[default]
    StateV1 = 1,
    AddressV1 = 2,
    StateV2 = 3,
    AddressV2 = 4,
}

impl TreeType {
    /// Batched trees insert into an output queue and are updated
    /// asynchronously by a forester.
    pub fn is_batched(&self) -> bool {
        matches!(self, TreeType::StateV2 | TreeType::AddressV2)
    }

    pub fn is_address_tree(&self) -> bool {
        matches!(self, TreeType::AddressV1 | TreeType::AddressV2)
    }

    pub fn is_state_tree(&self) -> bool {
        !self.is_address_tree()
    }
}

impl TryFrom<u64> for TreeType {
    type Error = CompressedAccountError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TreeType::StateV1),
            2 => Ok(TreeType::AddressV1),
            3 => Ok(TreeType::StateV2),
            4 => Ok(TreeType::AddressV2),
            _ => Err(CompressedAccountError::InvalidTreeType(value)),
        }
    }
}

/// Successor of a tree which has been rolled over.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash)]
pub struct NextTreeInfo {
    pub cpi_context: Option<Pubkey>,
    pub queue: Pubkey,
    pub tree: Pubkey,
    pub tree_type: TreeType,
}

/// Identity of a Merkle tree and its queue.
///
/// Batched and address properties are derived from `tree_type`.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash)]
pub struct TreeInfo {
    pub cpi_context: Option<Pubkey>,
    pub next_tree_info: Option<NextTreeInfo>,
    pub queue: Pubkey,
    pub tree: Pubkey,
    pub tree_type: TreeType,
}

impl TreeInfo {
    pub fn new(tree: Pubkey, queue: Pubkey, tree_type: TreeType) -> Self {
        Self {
            cpi_context: None,
            next_tree_info: None,
            queue,
            tree,
            tree_type,
        }
    }

    pub fn is_batched(&self) -> bool {
        self.tree_type.is_batched()
    }

    pub fn is_address_tree(&self) -> bool {
        self.tree_type.is_address_tree()
    }

    /// Tree which receives new state. A rolled over tree forwards new
    /// state to its successor.
    pub fn output_tree(&self) -> TreeInfo {
        match self.next_tree_info {
            Some(next) => TreeInfo {
                cpi_context: next.cpi_context,
                next_tree_info: None,
                queue: next.queue,
                tree: next.tree,
                tree_type: next.tree_type,
            },
            None => TreeInfo {
                next_tree_info: None,
                ..*self
            },
        }
    }

    /// Account new state is appended to.
    /// For StateV1, it is the tree account.
    /// For StateV2, it is the output queue account.
    pub fn output_pubkey(&self) -> Result<Pubkey, CompressedAccountError> {
        match self.tree_type {
            TreeType::StateV1 => Ok(self.tree),
            TreeType::StateV2 => Ok(self.queue),
            other => Err(CompressedAccountError::InvalidTreeType(other as u64)),
        }
    }
}

impl From<NextTreeInfo> for TreeInfo {
    fn from(next: NextTreeInfo) -> Self {
        TreeInfo {
            cpi_context: next.cpi_context,
            next_tree_info: None,
            queue: next.queue,
            tree: next.tree,
            tree_type: next.tree_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_flags() {
        assert!(!TreeType::StateV1.is_batched());
        assert!(TreeType::StateV2.is_batched());
        assert!(!TreeType::AddressV1.is_batched());
        assert!(TreeType::AddressV2.is_batched());
        assert!(TreeType::AddressV1.is_address_tree());
        assert!(TreeType::AddressV2.is_address_tree());
        assert!(!TreeType::StateV1.is_address_tree());
        assert!(!TreeType::StateV2.is_address_tree());
    }

    #[test]
    fn test_tree_type_from_u64() {
        for tree_type in [
            TreeType::StateV1,
            TreeType::AddressV1,
            TreeType::StateV2,
            TreeType::AddressV2,
        ] {
            assert_eq!(TreeType::try_from(tree_type as u64), Ok(tree_type));
        }
        assert_eq!(
            TreeType::try_from(0),
            Err(CompressedAccountError::InvalidTreeType(0))
        );
    }

    #[test]
    fn test_output_tree_follows_rollover() {
        let mut tree_info = TreeInfo::new(
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            TreeType::StateV1,
        );
        assert_eq!(tree_info.output_tree(), tree_info);

        let next = NextTreeInfo {
            cpi_context: None,
            queue: Pubkey::new_unique(),
            tree: Pubkey::new_unique(),
            tree_type: TreeType::StateV2,
        };
        tree_info.next_tree_info = Some(next);
        let output = tree_info.output_tree();
        assert_eq!(output.tree, next.tree);
        assert_eq!(output.output_pubkey(), Ok(next.queue));
    }

    #[test]
    fn test_output_pubkey() {
        let tree = Pubkey::new_unique();
        let queue = Pubkey::new_unique();
        assert_eq!(
            TreeInfo::new(tree, queue, TreeType::StateV1).output_pubkey(),
            Ok(tree)
        );
        assert_eq!(
            TreeInfo::new(tree, queue, TreeType::StateV2).output_pubkey(),
            Ok(queue)
        );
        assert_eq!(
            TreeInfo::new(tree, queue, TreeType::AddressV1).output_pubkey(),
            Err(CompressedAccountError::InvalidTreeType(2))
        );
    }
}
