//! Client-side assembly of light system program transactions.
//!
//! An operation selects compressed accounts of an owner, requests a single
//! validity proof for them, packs every referenced public key into the
//! remaining accounts and encodes the `invoke` instruction.

pub mod constants;
pub mod error;
pub mod indexer;
pub mod instruction;
pub mod operation;
pub mod pack;
pub mod proof;
pub mod rpc;
pub mod selection;

pub use error::ClientError;
pub use instruction::{InstructionAssembler, SystemAccountMetaConfig};
pub use operation::{
    AssembledInstruction, OperationConfig, OperationKind, OperationOrchestrator, OperationState,
};
pub use pack::PackedAccounts;
pub use proof::ProofCoordinator;
pub use selection::{DescendingGreedy, Selection, SelectionConfig, SelectionPolicy};
pub use zkc_compressed_account;
