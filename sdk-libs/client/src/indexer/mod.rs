pub mod in_memory;

mod base58;
mod config;
mod error;
mod indexer_trait;
mod response;
mod types;

pub use base58::Base58Conversions;
pub use config::IndexerRpcConfig;
pub use error::IndexerError;
pub use in_memory::InMemoryIndexer;
pub use indexer_trait::Indexer;
pub use response::{Context, ItemsWithCursor, Response};
pub use types::{
    AccountProofInputs, Address, AddressProofInputs, AddressWithTree, Hash, RootIndex,
    ValidityProofWithContext,
};
mod options;
pub use options::*;
