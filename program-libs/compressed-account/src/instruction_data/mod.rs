pub mod compressed_proof;
pub mod data;
pub mod invoke;
pub mod packed_tree_info;

pub use compressed_proof::CompressedProof;
pub use data::NewAddressParamsPacked;
pub use invoke::InstructionDataInvoke;
pub use packed_tree_info::{PackedAddressTreeInfo, PackedStateTreeInfo};
