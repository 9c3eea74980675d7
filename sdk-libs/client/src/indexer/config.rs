#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexerRpcConfig {
    /// Responses from an indexer behind this slot are rejected.
    pub slot: u64,
}

impl IndexerRpcConfig {
    pub fn new(slot: u64) -> Self {
        Self { slot }
    }
}
