use std::io;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_instruction::{AccountMeta, Instruction};
use solana_pubkey::Pubkey;
use zkc_compressed_account::{
    constants::INVOKE_DISCRIMINATOR, instruction_data::InstructionDataInvoke,
};

use crate::{
    constants::{
        ACCOUNT_COMPRESSION_AUTHORITY_PDA, ACCOUNT_COMPRESSION_PROGRAM_ID, LIGHT_SYSTEM_PROGRAM_ID,
        NOOP_PROGRAM_ID, REGISTERED_PROGRAM_PDA, SOL_POOL_PDA, SYSTEM_ACCOUNTS_LEN,
        SYSTEM_PROGRAM_ID,
    },
    error::ClientError,
    pack::PackedAccounts,
};

/// Program-level accounts which precede the packed accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemAccountMetaConfig {
    /// Invoked program. Absent optional accounts are represented by its id.
    pub self_program: Pubkey,
    /// Lamports are moved in or out of the sol pool.
    pub sol_pool_pda: bool,
    /// Receives decompressed lamports.
    pub decompression_recipient: Option<Pubkey>,
}

impl Default for SystemAccountMetaConfig {
    fn default() -> Self {
        Self::new(LIGHT_SYSTEM_PROGRAM_ID)
    }
}

impl SystemAccountMetaConfig {
    pub fn new(self_program: Pubkey) -> Self {
        Self {
            self_program,
            sol_pool_pda: false,
            decompression_recipient: None,
        }
    }

    pub fn new_with_sol_pool(self_program: Pubkey) -> Self {
        Self {
            sol_pool_pda: true,
            ..Self::new(self_program)
        }
    }
}

pub fn get_light_system_account_metas(
    fee_payer: &Pubkey,
    authority: &Pubkey,
    config: &SystemAccountMetaConfig,
) -> Vec<AccountMeta> {
    let mut account_metas = Vec::with_capacity(SYSTEM_ACCOUNTS_LEN);

    // fee_payer (mut, signer)
    account_metas.push(AccountMeta::new(*fee_payer, true));
    // authority (signer)
    account_metas.push(AccountMeta::new_readonly(*authority, true));
    account_metas.push(AccountMeta::new_readonly(REGISTERED_PROGRAM_PDA, false));
    account_metas.push(AccountMeta::new_readonly(NOOP_PROGRAM_ID, false));
    account_metas.push(AccountMeta::new_readonly(
        ACCOUNT_COMPRESSION_AUTHORITY_PDA,
        false,
    ));
    account_metas.push(AccountMeta::new_readonly(
        ACCOUNT_COMPRESSION_PROGRAM_ID,
        false,
    ));
    // Anchor represents None optional accounts as the program ID being invoked
    if config.sol_pool_pda {
        account_metas.push(AccountMeta::new(SOL_POOL_PDA, false));
    } else {
        account_metas.push(AccountMeta::new_readonly(config.self_program, false));
    }
    match config.decompression_recipient {
        Some(recipient) => account_metas.push(AccountMeta::new(recipient, false)),
        None => account_metas.push(AccountMeta::new_readonly(config.self_program, false)),
    }
    account_metas.push(AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false));
    account_metas
}

/// Serializes `inputs` as discriminator, little-endian `u32` length and
/// borsh encoded instruction data.
pub fn encode_invoke_data(inputs: &InstructionDataInvoke) -> Result<Vec<u8>, ClientError> {
    let inputs = inputs.try_to_vec()?;
    let len = u32::try_from(inputs.len()).map_err(|_| ClientError::EncodingOverflow {
        field: "instruction data length",
        value: inputs.len() as u64,
    })?;

    let mut data = Vec::with_capacity(8 + 4 + inputs.len());
    data.extend_from_slice(&INVOKE_DISCRIMINATOR);
    data.extend_from_slice(&len.to_le_bytes());
    data.extend(inputs);
    Ok(data)
}

pub fn decode_invoke_data(data: &[u8]) -> Result<InstructionDataInvoke, ClientError> {
    let invalid = |message: &str| ClientError::Io(io::Error::new(io::ErrorKind::InvalidData, message));
    if data.len() < 12 || data[..8] != INVOKE_DISCRIMINATOR {
        return Err(invalid("invalid invoke discriminator"));
    }
    let mut len = [0u8; 4];
    len.copy_from_slice(&data[8..12]);
    let len = u32::from_le_bytes(len) as usize;
    if data.len() - 12 != len {
        return Err(invalid("invalid invoke data length"));
    }
    Ok(InstructionDataInvoke::try_from_slice(&data[12..])?)
}

/// Every account index in `inputs` refers to a packed account.
fn check_account_indices(
    inputs: &InstructionDataInvoke,
    packed_accounts: &PackedAccounts,
) -> Result<(), ClientError> {
    let len = packed_accounts.len();
    let input_indices = inputs
        .input_compressed_accounts_with_merkle_context
        .iter()
        .flat_map(|input| {
            [
                input.merkle_context.merkle_tree_pubkey_index,
                input.merkle_context.queue_pubkey_index,
            ]
        });
    let output_indices = inputs
        .output_compressed_accounts
        .iter()
        .map(|output| output.merkle_tree_index);
    let address_indices = inputs.new_address_params.iter().flat_map(|params| {
        [
            params.address_merkle_tree_account_index,
            params.address_queue_account_index,
        ]
    });
    match input_indices
        .chain(output_indices)
        .chain(address_indices)
        .find(|index| usize::from(*index) >= len)
    {
        Some(index) => Err(ClientError::PackingInvariantViolation(format!(
            "index {} out of range for {} packed accounts",
            index, len
        ))),
        None => Ok(()),
    }
}

/// Pairs encoded instruction data with the ordered account list.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstructionAssembler {
    config: SystemAccountMetaConfig,
}

impl InstructionAssembler {
    pub fn new(config: SystemAccountMetaConfig) -> Self {
        Self { config }
    }

    pub fn assemble(
        &self,
        fee_payer: &Pubkey,
        authority: &Pubkey,
        inputs: &InstructionDataInvoke,
        packed_accounts: &PackedAccounts,
    ) -> Result<Instruction, ClientError> {
        packed_accounts.validate()?;
        check_account_indices(inputs, packed_accounts)?;

        let data = encode_invoke_data(inputs)?;
        let accounts = [
            get_light_system_account_metas(fee_payer, authority, &self.config),
            packed_accounts.to_account_metas(),
        ]
        .concat();

        Ok(Instruction {
            program_id: self.config.self_program,
            accounts,
            data,
        })
    }
}
