use ark_ff::PrimeField;
use num_bigint::BigUint;
use sha3::{Digest, Keccak256};
use thiserror::Error;

pub mod address;
pub mod compressed_account;
pub mod constants;
pub mod field_element;
pub mod instruction_data;
pub mod pubkey;
pub mod tree_info;

pub use compressed_account::{CompressedAccount, CompressedAccountData, CompressedLeaf};
pub use field_element::FieldElement;
pub use pubkey::Pubkey;
pub use tree_info::{NextTreeInfo, TreeInfo, TreeType};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CompressedAccountError {
    #[error("Invalid field element length {0}, expected 32 bytes")]
    InvalidFieldElementLength(usize),
    #[error("Field element is not smaller than the bn254 field modulus")]
    FieldElementOutOfRange,
    #[error("Invalid tree type {0}")]
    InvalidTreeType(u64),
    #[error("Hash error: {0}")]
    HashError(String),
    #[error("Invalid seeds")]
    InvalidSeeds,
    #[error("Invalid proof length {0}, expected 128 bytes")]
    InvalidProofLength(usize),
}

/// The bn254 scalar field modulus as an unsigned big integer.
pub fn bn254_modulus() -> BigUint {
    ark_bn254::Fr::MODULUS.into()
}

pub fn is_smaller_than_bn254_field_size_be(bytes: &[u8; 32]) -> bool {
    let bigint = BigUint::from_bytes_be(bytes);
    bigint < bn254_modulus()
}

/// Keccak-256 over the concatenation of `bytes`.
pub fn keccak_hashv(bytes: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for slice in bytes {
        hasher.update(slice);
    }
    hasher.finalize().into()
}

pub fn hash_to_bn254_field_size_be(bytes: &[u8]) -> Option<([u8; 32], u8)> {
    let mut bump_seed = [u8::MAX];
    // Loops with decreasing bump seed to find a valid hash which is less than
    // bn254 Fr modulo field size.
    for _ in 0..u8::MAX {
        {
            let mut hashed_value: [u8; 32] = keccak_hashv(&[bytes, bump_seed.as_ref()]);
            // Truncates to 31 bytes so that value is less than bn254 Fr modulo
            // field size.
            hashed_value[0] = 0;
            if is_smaller_than_bn254_field_size_be(&hashed_value) {
                return Some((hashed_value, bump_seed[0]));
            }
        }
        bump_seed[0] -= 1;
    }
    None
}

/// Hashes the provided `bytes` with Keccak256 and truncates the result to
/// 31 bytes, which always fits the bn254 prime field.
pub fn hashv_to_bn254_field_size_be(bytes: &[&[u8]]) -> [u8; 32] {
    let mut hashed_value: [u8; 32] = keccak_hashv(bytes);
    hashed_value[0] = 0;
    hashed_value
}

#[cfg(test)]
mod tests {
    use num_traits::One;
    use solana_pubkey::Pubkey;

    use super::*;

    fn to_be_array(value: &BigUint) -> [u8; 32] {
        let bytes = value.to_bytes_be();
        let mut array = [0u8; 32];
        array[32 - bytes.len()..].copy_from_slice(&bytes);
        array
    }

    #[test]
    fn test_is_smaller_than_bn254_field_size_be() {
        let modulus = bn254_modulus();
        assert!(!is_smaller_than_bn254_field_size_be(&to_be_array(&modulus)));

        let bigint = modulus.clone() - BigUint::one();
        assert!(is_smaller_than_bn254_field_size_be(&to_be_array(&bigint)));

        let bigint = modulus + BigUint::one();
        assert!(!is_smaller_than_bn254_field_size_be(&to_be_array(&bigint)));
    }

    #[test]
    fn test_modulus_matches_decimal_constant() {
        let expected = BigUint::parse_bytes(
            b"21888242871839275222246405745257275088548364400416034343698204186575808495617",
            10,
        )
        .unwrap();
        assert_eq!(bn254_modulus(), expected);
    }

    #[test]
    fn test_hash_to_bn254_field_size_be() {
        for _ in 0..1_000 {
            let input_bytes = Pubkey::new_unique().to_bytes();
            let (hashed_value, bump) = hash_to_bn254_field_size_be(input_bytes.as_slice())
                .expect("Failed to find a hash within BN254 field size");
            assert_eq!(bump, 255);
            assert!(is_smaller_than_bn254_field_size_be(&hashed_value));
        }
    }

    #[test]
    fn test_hashv_to_bn254_field_size_be() {
        let max_input = [[u8::MAX; 32]; 16];
        let max_input = max_input.iter().map(|x| x.as_slice()).collect::<Vec<_>>();
        let hashed_value = hashv_to_bn254_field_size_be(max_input.as_slice());
        assert_eq!(hashed_value[0], 0);
        assert!(is_smaller_than_bn254_field_size_be(&hashed_value));
    }

    #[test]
    fn test_keccak_empty_input() {
        // keccak256("")
        let expected = [
            0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7,
            0x03, 0xc0, 0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04,
            0x5d, 0x85, 0xa4, 0x70,
        ];
        assert_eq!(keccak_hashv(&[]), expected);
    }
}
