//! Sequencing of selection, proof request, packing and assembly for a
//! single operation.
//!
//! An [`OperationOrchestrator`] runs exactly one operation. Its state only
//! moves forward, a failure leaves it in the state that failed and the
//! caller starts over with a new instance.

use solana_instruction::{AccountMeta, Instruction};
use solana_pubkey::Pubkey;
use tracing::debug;
use zkc_compressed_account::{
    address::derive_address,
    compressed_account::{
        OutputCompressedAccountWithPackedContext, PackedCompressedAccountWithMerkleContext,
    },
    instruction_data::InstructionDataInvoke,
    CompressedAccount, CompressedLeaf, FieldElement, TreeInfo,
};

use crate::{
    constants::LIGHT_SYSTEM_PROGRAM_ID,
    error::ClientError,
    indexer::{AddressWithTree, Indexer, IndexerRpcConfig},
    instruction::{InstructionAssembler, SystemAccountMetaConfig},
    pack::{pack_input_accounts, pack_new_address_tree_infos, PackedAccounts},
    proof::ProofCoordinator,
    rpc::{submit, Submitter},
    selection::{fetch_and_select, DescendingGreedy, SelectionConfig, SelectionPolicy},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Move lamports into a new compressed account.
    Compress,
    /// Move lamports out of compressed accounts.
    Decompress,
    /// Move lamports between owners.
    Transfer,
    /// Create a compressed account with a unique address.
    CreateAccount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Selecting,
    ProvingRequested,
    Packing,
    Assembled,
    HandedOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationConfig {
    pub indexer: IndexerRpcConfig,
    pub selection: SelectionConfig,
    /// Invoked program. Addresses are derived for this program.
    pub program_id: Pubkey,
    /// Receives outputs of operations without inputs.
    pub output_tree: Option<TreeInfo>,
}

impl Default for OperationConfig {
    fn default() -> Self {
        Self {
            indexer: IndexerRpcConfig::default(),
            selection: SelectionConfig::default(),
            program_id: LIGHT_SYSTEM_PROGRAM_ID,
            output_tree: None,
        }
    }
}

/// Result of an operation, ready for signing and broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledInstruction {
    pub kind: OperationKind,
    pub instruction: Instruction,
    /// Keys which have to sign the transaction.
    pub signers: Vec<Pubkey>,
    /// Spent leaves in instruction order.
    pub inputs: Vec<CompressedLeaf>,
    /// Lamports returned to the authority as a new leaf.
    pub change: u64,
    /// Address of a created account.
    pub address: Option<FieldElement>,
}

#[derive(Debug, Clone, Copy)]
struct NewAddress {
    address: FieldElement,
    seed: [u8; 32],
    tree_info: TreeInfo,
}

/// Everything an operation needs besides the selected inputs.
#[derive(Debug)]
struct OperationRequest {
    kind: OperationKind,
    fee_payer: Pubkey,
    authority: Pubkey,
    /// Amount selected from the authority's leaves.
    target: u64,
    fixed_accounts: Vec<AccountMeta>,
    outputs: Vec<CompressedAccount>,
    output_tree: Option<TreeInfo>,
    new_address: Option<NewAddress>,
    compress_or_decompress_lamports: Option<u64>,
    is_compress: bool,
    system_accounts: SystemAccountMetaConfig,
}

pub struct OperationOrchestrator<'a, I: Indexer + ?Sized, P: SelectionPolicy = DescendingGreedy> {
    indexer: &'a I,
    policy: P,
    config: OperationConfig,
    state: OperationState,
    kind: Option<OperationKind>,
}

impl<'a, I: Indexer + ?Sized> OperationOrchestrator<'a, I, DescendingGreedy> {
    pub fn new(indexer: &'a I, config: OperationConfig) -> Self {
        Self::with_policy(indexer, config, DescendingGreedy)
    }
}

impl<'a, I: Indexer + ?Sized, P: SelectionPolicy> OperationOrchestrator<'a, I, P> {
    pub fn with_policy(indexer: &'a I, config: OperationConfig, policy: P) -> Self {
        Self {
            indexer,
            policy,
            config,
            state: OperationState::Selecting,
            kind: None,
        }
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    pub fn kind(&self) -> Option<OperationKind> {
        self.kind
    }

    /// Creates a compressed account of `lamports` for `recipient`, paid by
    /// `fee_payer`.
    pub async fn compress(
        &mut self,
        fee_payer: &Pubkey,
        recipient: &Pubkey,
        lamports: u64,
        output_tree: Option<TreeInfo>,
    ) -> Result<AssembledInstruction, ClientError> {
        let request = OperationRequest {
            kind: OperationKind::Compress,
            fee_payer: *fee_payer,
            authority: *fee_payer,
            target: 0,
            fixed_accounts: vec![AccountMeta::new_readonly(*recipient, false)],
            outputs: vec![CompressedAccount::new(recipient.into(), lamports)],
            output_tree,
            new_address: None,
            compress_or_decompress_lamports: Some(lamports),
            is_compress: true,
            system_accounts: SystemAccountMetaConfig::new_with_sol_pool(self.config.program_id),
        };
        self.run(request).await
    }

    /// Spends leaves of `owner` worth at least `lamports` and pays
    /// `lamports` out to `recipient`.
    pub async fn decompress(
        &mut self,
        fee_payer: &Pubkey,
        owner: &Pubkey,
        recipient: &Pubkey,
        lamports: u64,
        output_tree: Option<TreeInfo>,
    ) -> Result<AssembledInstruction, ClientError> {
        let request = OperationRequest {
            kind: OperationKind::Decompress,
            fee_payer: *fee_payer,
            authority: *owner,
            target: lamports,
            fixed_accounts: vec![
                AccountMeta::new_readonly(*owner, true),
                AccountMeta::new(*recipient, false),
            ],
            outputs: vec![],
            output_tree,
            new_address: None,
            compress_or_decompress_lamports: Some(lamports),
            is_compress: false,
            system_accounts: SystemAccountMetaConfig {
                decompression_recipient: Some(*recipient),
                ..SystemAccountMetaConfig::new_with_sol_pool(self.config.program_id)
            },
        };
        self.run(request).await
    }

    /// Moves `amount` from leaves of `from` to a new leaf of `to`.
    pub async fn transfer(
        &mut self,
        fee_payer: &Pubkey,
        from: &Pubkey,
        to: &Pubkey,
        amount: u64,
        output_tree: Option<TreeInfo>,
    ) -> Result<AssembledInstruction, ClientError> {
        let request = OperationRequest {
            kind: OperationKind::Transfer,
            fee_payer: *fee_payer,
            authority: *from,
            target: amount,
            fixed_accounts: vec![
                AccountMeta::new_readonly(*from, true),
                AccountMeta::new_readonly(*to, false),
            ],
            outputs: vec![CompressedAccount::new(to.into(), amount)],
            output_tree,
            new_address: None,
            compress_or_decompress_lamports: None,
            is_compress: false,
            system_accounts: SystemAccountMetaConfig::new(self.config.program_id),
        };
        self.run(request).await
    }

    /// Creates an account of `owner` at the address derived from `seeds` in
    /// `address_tree`, funded with `lamports` from leaves of `owner`.
    pub async fn create_account(
        &mut self,
        fee_payer: &Pubkey,
        owner: &Pubkey,
        seeds: &[&[u8]],
        address_tree: TreeInfo,
        lamports: u64,
        output_tree: Option<TreeInfo>,
    ) -> Result<AssembledInstruction, ClientError> {
        if !address_tree.is_address_tree() {
            return Err(ClientError::InvalidParameters(format!(
                "{:?} is not an address tree",
                address_tree.tree_type
            )));
        }
        let (address, seed) =
            derive_address(seeds, &address_tree.tree, &self.config.program_id.into())?;
        let mut account = CompressedAccount::new(owner.into(), lamports);
        account.address = Some(address);

        let request = OperationRequest {
            kind: OperationKind::CreateAccount,
            fee_payer: *fee_payer,
            authority: *owner,
            target: lamports,
            fixed_accounts: vec![AccountMeta::new_readonly(*owner, true)],
            outputs: vec![account],
            output_tree,
            new_address: Some(NewAddress {
                address,
                seed,
                tree_info: address_tree,
            }),
            compress_or_decompress_lamports: None,
            is_compress: false,
            system_accounts: SystemAccountMetaConfig::new(self.config.program_id),
        };
        self.run(request).await
    }

    /// Hands an assembled instruction to `submitter`.
    pub async fn hand_off<S: Submitter + ?Sized>(
        &mut self,
        submitter: &S,
        assembled: &AssembledInstruction,
    ) -> Result<String, ClientError> {
        if self.state != OperationState::Assembled {
            return Err(ClientError::InvalidParameters(format!(
                "cannot hand off an operation in state {:?}",
                self.state
            )));
        }
        self.transition(OperationState::HandedOff, assembled.inputs.len(), assembled.change);
        submit(submitter, assembled).await
    }

    fn transition(&mut self, next: OperationState, inputs: usize, change: u64) {
        debug!(
            "{:?}: {:?} -> {:?}, {} inputs, change {}",
            self.kind, self.state, next, inputs, change
        );
        self.state = next;
    }

    async fn run(&mut self, request: OperationRequest) -> Result<AssembledInstruction, ClientError> {
        if self.kind.is_some() {
            return Err(ClientError::InvalidParameters(format!(
                "operation {:?} already started",
                self.kind
            )));
        }
        self.kind = Some(request.kind);
        debug!(
            "{:?}: selecting {} lamports of {}",
            request.kind, request.target, request.authority
        );

        let selection = fetch_and_select(
            self.indexer,
            &request.authority,
            request.target,
            &self.config.selection,
            Some(self.config.indexer),
            &self.policy,
        )
        .await?;
        // The selected leaves are proven and packed as they are now.
        let inputs = selection.accounts;
        let change = selection.change;
        self.transition(OperationState::ProvingRequested, inputs.len(), change);

        let new_addresses: Vec<AddressWithTree> = request
            .new_address
            .iter()
            .map(|new_address| AddressWithTree {
                address: new_address.address.to_bytes(),
                tree: new_address.tree_info.tree.into(),
            })
            .collect();
        let proof = ProofCoordinator::new(self.indexer, Some(self.config.indexer))
            .request(&inputs, &new_addresses)
            .await?;
        self.transition(OperationState::Packing, inputs.len(), change);

        let mut packed_accounts = PackedAccounts::default();
        for meta in request.fixed_accounts.iter() {
            packed_accounts.insert_or_get_config(meta.pubkey, meta.is_signer, meta.is_writable)?;
        }
        let input_tree_infos = pack_input_accounts(&mut packed_accounts, &inputs, &proof)?;
        let address_tree_infos = pack_new_address_tree_infos(&mut packed_accounts, &proof)?;

        let mut outputs = request.outputs;
        if change > 0 {
            outputs.push(CompressedAccount::new(request.authority.into(), change));
        }
        let output_compressed_accounts = if outputs.is_empty() {
            Vec::new()
        } else {
            let output_tree = request
                .output_tree
                .or_else(|| inputs.first().map(|leaf| leaf.tree_info))
                .or(self.config.output_tree)
                .ok_or_else(|| {
                    ClientError::InvalidParameters("no output tree for new accounts".to_string())
                })?
                .output_tree();
            let merkle_tree_index = packed_accounts.pack_output_tree_index(&output_tree)?;
            outputs
                .into_iter()
                .map(|compressed_account| OutputCompressedAccountWithPackedContext {
                    compressed_account,
                    merkle_tree_index,
                })
                .collect()
        };

        let input_compressed_accounts_with_merkle_context = inputs
            .iter()
            .zip(input_tree_infos.iter())
            .map(|(leaf, tree_info)| PackedCompressedAccountWithMerkleContext {
                compressed_account: leaf.account.clone(),
                merkle_context: tree_info.merkle_context(),
                root_index: tree_info.root_index,
                read_only: false,
            })
            .collect();
        let new_address_params = address_tree_infos
            .into_iter()
            .zip(request.new_address.iter())
            .map(|(tree_info, new_address)| tree_info.into_new_address_params_packed(new_address.seed))
            .collect();

        let data = InstructionDataInvoke {
            proof: proof.proof,
            input_compressed_accounts_with_merkle_context,
            output_compressed_accounts,
            relay_fee: None,
            new_address_params,
            compress_or_decompress_lamports: request.compress_or_decompress_lamports,
            is_compress: request.is_compress,
        };
        if !data.is_balanced() {
            return Err(ClientError::PackingInvariantViolation(format!(
                "{:?} does not conserve lamports",
                request.kind
            )));
        }

        let instruction = InstructionAssembler::new(request.system_accounts).assemble(
            &request.fee_payer,
            &request.authority,
            &data,
            &packed_accounts,
        )?;
        self.transition(OperationState::Assembled, inputs.len(), change);

        let mut signers = vec![request.fee_payer];
        if request.authority != request.fee_payer {
            signers.push(request.authority);
        }
        Ok(AssembledInstruction {
            kind: request.kind,
            instruction,
            signers,
            inputs,
            change,
            address: request.new_address.map(|new_address| new_address.address),
        })
    }
}
