use zkc_compressed_account::FieldElement;

use crate::indexer::error::IndexerError;

pub trait Base58Conversions {
    fn to_base58(&self) -> String;
    fn from_base58(s: &str) -> Result<Self, IndexerError>
    where
        Self: Sized;
}

impl Base58Conversions for [u8; 32] {
    fn to_base58(&self) -> String {
        bs58::encode(self).into_string()
    }

    fn from_base58(s: &str) -> Result<Self, IndexerError> {
        decode_base58_to_fixed_array(s)
    }
}

impl Base58Conversions for FieldElement {
    fn to_base58(&self) -> String {
        bs58::encode(self.as_bytes()).into_string()
    }

    fn from_base58(s: &str) -> Result<Self, IndexerError> {
        let bytes = decode_base58_to_fixed_array(s)?;
        FieldElement::new(bytes).map_err(|_| IndexerError::InvalidResponseData)
    }
}

pub fn decode_base58_to_fixed_array<const N: usize>(input: &str) -> Result<[u8; N], IndexerError> {
    let mut buffer = [0u8; N];
    let decoded_len = bs58::decode(input)
        .onto(&mut buffer)
        .map_err(|_| IndexerError::InvalidResponseData)?;

    if decoded_len != N {
        return Err(IndexerError::InvalidResponseData);
    }

    Ok(buffer)
}
