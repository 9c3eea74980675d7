use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_pubkey::Pubkey as SolanaPubkey;

/// Wire representation of a public key inside instruction data.
///
/// Kept separate from [`solana_pubkey::Pubkey`] so that the borsh layout of
/// instruction data does not depend on the borsh version of the Solana crates.
#[derive(
    Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, BorshDeserialize, BorshSerialize,
)]
#[repr(C)]
pub struct Pubkey(pub(crate) [u8; 32]);

impl Pubkey {
    pub const fn new_from_array(array: [u8; 32]) -> Self {
        Self(array)
    }

    pub fn new_unique() -> Self {
        Self(SolanaPubkey::new_unique().to_bytes())
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl From<[u8; 32]> for Pubkey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<SolanaPubkey> for Pubkey {
    fn from(pubkey: SolanaPubkey) -> Self {
        Self(pubkey.to_bytes())
    }
}

impl From<&SolanaPubkey> for Pubkey {
    fn from(pubkey: &SolanaPubkey) -> Self {
        Self(pubkey.to_bytes())
    }
}

impl From<Pubkey> for SolanaPubkey {
    fn from(pubkey: Pubkey) -> Self {
        SolanaPubkey::new_from_array(pubkey.to_bytes())
    }
}

impl From<&Pubkey> for SolanaPubkey {
    fn from(pubkey: &Pubkey) -> Self {
        SolanaPubkey::new_from_array(pubkey.to_bytes())
    }
}
