use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::core::error::Result;
use crate::storage::wal::SyncMode;

/// Directory under the data root that holds every column index.
pub const INDEX_ROOT_DIR: &str = "index-root";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub data_root: PathBuf,

    // Reopen thread
    pub target_max_stale_ms: u64,   // nobody waiting
    pub target_min_stale_ms: u64,   // a searcher waits on a newer generation

    // Searcher
    pub search_result_cap: usize,
    pub max_readers: usize,

    // Writer
    pub writer_batch_size: usize,   // buffered docs before the buffer is sealed
    pub wal_sync: SyncMode,
    pub max_segments_per_tier: usize,   // commit merges past this many segments
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            data_root: PathBuf::from("./data"),
            target_max_stale_ms: 1000,
            target_min_stale_ms: 100,
            search_result_cap: 100,
            max_readers: 64,
            writer_batch_size: 10_000,
            wal_sync: SyncMode::Batch,
            max_segments_per_tier: 10,
        }
    }
}

impl IndexConfig {
    pub fn with_data_root(data_root: impl Into<PathBuf>) -> Self {
        IndexConfig {
            data_root: data_root.into(),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// `<data_root>/index-root/<table>/<index>`
    pub fn index_path(&self, table: &str, index: &str) -> PathBuf {
        self.data_root.join(INDEX_ROOT_DIR).join(table).join(index)
    }

    pub fn max_stale(&self) -> Duration {
        Duration::from_millis(self.target_max_stale_ms)
    }

    pub fn min_stale(&self) -> Duration {
        Duration::from_millis(self.target_min_stale_ms)
    }
}
