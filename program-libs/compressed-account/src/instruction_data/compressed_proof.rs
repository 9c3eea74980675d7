use borsh::{BorshDeserialize, BorshSerialize};

use crate::{constants::COMPRESSED_PROOF_SIZE, CompressedAccountError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct CompressedProof {
    pub a: [u8; 32],
    pub b: [u8; 64],
    pub c: [u8; 32],
}

impl Default for CompressedProof {
    fn default() -> Self {
        Self {
            a: [0; 32],
            b: [0; 64],
            c: [0; 32],
        }
    }
}

impl CompressedProof {
    /// Splits opaque proof bytes as returned by a prover into a, b and c.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CompressedAccountError> {
        if bytes.len() != COMPRESSED_PROOF_SIZE {
            return Err(CompressedAccountError::InvalidProofLength(bytes.len()));
        }
        let mut proof = Self::default();
        proof.a.copy_from_slice(&bytes[0..32]);
        proof.b.copy_from_slice(&bytes[32..96]);
        proof.c.copy_from_slice(&bytes[96..128]);
        Ok(proof)
    }

    pub fn to_bytes(&self) -> [u8; COMPRESSED_PROOF_SIZE] {
        let mut bytes = [0u8; COMPRESSED_PROOF_SIZE];
        bytes[0..32].copy_from_slice(&self.a);
        bytes[32..96].copy_from_slice(&self.b);
        bytes[96..128].copy_from_slice(&self.c);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes() {
        let bytes: Vec<u8> = (0..128u8).collect();
        let proof = CompressedProof::from_bytes(&bytes).unwrap();
        assert_eq!(proof.a[0], 0);
        assert_eq!(proof.b[0], 32);
        assert_eq!(proof.c[31], 127);
        assert_eq!(proof.to_bytes().to_vec(), bytes);

        let mut serialized = Vec::new();
        proof.serialize(&mut serialized).unwrap();
        assert_eq!(serialized, bytes);
    }

    #[test]
    fn test_from_bytes_wrong_length() {
        assert_eq!(
            CompressedProof::from_bytes(&[0u8; 127]),
            Err(CompressedAccountError::InvalidProofLength(127))
        );
    }
}
