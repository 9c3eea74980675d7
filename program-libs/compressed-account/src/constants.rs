/// Anchor discriminator of the light system program `invoke` instruction.
pub const INVOKE_DISCRIMINATOR: [u8; 8] = [26, 16, 169, 7, 21, 202, 242, 25];

pub const STATE_MERKLE_TREE_ROOTS: usize = 2400;
pub const ADDRESS_MERKLE_TREE_ROOTS: usize = 2400;

/// Serialized size of a compressed Groth16 proof (a, b, c).
pub const COMPRESSED_PROOF_SIZE: usize = 128;
