use borsh::{BorshDeserialize, BorshSerialize};

#[derive(Debug, PartialEq, Eq, Default, Clone, Copy, BorshSerialize, BorshDeserialize)]
pub struct NewAddressParamsPacked {
    pub seed: [u8; 32],
    pub address_queue_account_index: u8,
    pub address_merkle_tree_account_index: u8,
    pub address_merkle_tree_root_index: u16,
}
