use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use num_bigint::BigUint;
use solana_pubkey::Pubkey as SolanaPubkey;

use crate::{is_smaller_than_bn254_field_size_be, CompressedAccountError, Pubkey};

/// A 32 byte big-endian value strictly smaller than the bn254 scalar field
/// modulus.
///
/// Leaf hashes and addresses are field elements. Every constructor checks the
/// modulus bound, so a `FieldElement` that exists is always valid.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize)]
pub struct FieldElement([u8; 32]);

impl FieldElement {
    pub const ZERO: FieldElement = FieldElement([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Result<Self, CompressedAccountError> {
        if !is_smaller_than_bn254_field_size_be(&bytes) {
            return Err(CompressedAccountError::FieldElementOutOfRange);
        }
        Ok(Self(bytes))
    }

    pub fn from_be_slice(bytes: &[u8]) -> Result<Self, CompressedAccountError> {
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CompressedAccountError::InvalidFieldElementLength(bytes.len()))?;
        Self::new(array)
    }

    pub fn from_biguint(value: &BigUint) -> Result<Self, CompressedAccountError> {
        let bytes = value.to_bytes_be();
        if bytes.len() > 32 {
            return Err(CompressedAccountError::FieldElementOutOfRange);
        }
        let mut array = [0u8; 32];
        array[32 - bytes.len()..].copy_from_slice(&bytes);
        Self::new(array)
    }

    pub fn from_pubkey(pubkey: &Pubkey) -> Result<Self, CompressedAccountError> {
        Self::new(pubkey.to_bytes())
    }

    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.0)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        let mut array = [0u8; 32];
        array[24..].copy_from_slice(&value.to_be_bytes());
        Self(array)
    }
}

impl TryFrom<[u8; 32]> for FieldElement {
    type Error = CompressedAccountError;

    fn try_from(bytes: [u8; 32]) -> Result<Self, Self::Error> {
        Self::new(bytes)
    }
}

impl TryFrom<&[u8]> for FieldElement {
    type Error = CompressedAccountError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_be_slice(bytes)
    }
}

impl TryFrom<&SolanaPubkey> for FieldElement {
    type Error = CompressedAccountError;

    fn try_from(pubkey: &SolanaPubkey) -> Result<Self, Self::Error> {
        Self::new(pubkey.to_bytes())
    }
}

impl From<FieldElement> for [u8; 32] {
    fn from(value: FieldElement) -> Self {
        value.0
    }
}

// Deserialization goes through the checked constructor.
impl BorshDeserialize for FieldElement {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        let bytes = <[u8; 32]>::deserialize_reader(reader)?;
        Self::new(bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement({})", self.to_base58())
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}
