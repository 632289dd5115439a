use serde::{Serialize, Deserialize};

/// Point-in-time figures for one index, for the host's size estimates and monitoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub segment_count: usize,
    pub live_docs: u64,
    pub deleted_docs: u64,
    pub buffered_docs: usize,

    pub ram_size_bytes: u64,
    pub disk_size_bytes: u64,

    pub writer_generation: u64,
    pub searcher_generation: u64,
    pub active_searchers: usize,
}

impl IndexStats {
    /// Size the host reports for the index: persisted bytes plus what still sits in RAM.
    pub fn estimated_size(&self) -> u64 {
        self.disk_size_bytes + self.ram_size_bytes
    }
}
