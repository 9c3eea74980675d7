use borsh::{BorshDeserialize, BorshSerialize};

use super::{compressed_proof::CompressedProof, data::NewAddressParamsPacked};
use crate::compressed_account::{
    OutputCompressedAccountWithPackedContext, PackedCompressedAccountWithMerkleContext,
};

/// Arguments of the light system program `invoke` instruction.
///
/// Field order is the wire order.
#[derive(Debug, PartialEq, Eq, Default, Clone, BorshDeserialize, BorshSerialize)]
pub struct InstructionDataInvoke {
    pub proof: Option<CompressedProof>,
    pub input_compressed_accounts_with_merkle_context:
        Vec<PackedCompressedAccountWithMerkleContext>,
    pub output_compressed_accounts: Vec<OutputCompressedAccountWithPackedContext>,
    pub relay_fee: Option<u64>,
    pub new_address_params: Vec<NewAddressParamsPacked>,
    pub compress_or_decompress_lamports: Option<u64>,
    pub is_compress: bool,
}

impl InstructionDataInvoke {
    pub fn input_lamports(&self) -> Option<u64> {
        self.input_compressed_accounts_with_merkle_context
            .iter()
            .try_fold(0u64, |sum, account| {
                sum.checked_add(account.compressed_account.lamports)
            })
    }

    pub fn output_lamports(&self) -> Option<u64> {
        self.output_compressed_accounts
            .iter()
            .try_fold(0u64, |sum, account| {
                sum.checked_add(account.compressed_account.lamports)
            })
    }

    /// Lamports are conserved: inputs plus compressed lamports equal outputs
    /// plus decompressed lamports.
    pub fn is_balanced(&self) -> bool {
        let (Some(inputs), Some(outputs)) = (self.input_lamports(), self.output_lamports()) else {
            return false;
        };
        let amount = self.compress_or_decompress_lamports.unwrap_or(0);
        if self.is_compress {
            inputs.checked_add(amount) == Some(outputs)
        } else {
            outputs.checked_add(amount) == Some(inputs)
        }
    }
}
