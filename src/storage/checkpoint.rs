use std::fs::{self, File};
use std::io::Write;
use chrono::{DateTime, Utc};
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, Result};
use crate::storage::layout::StorageLayout;
use crate::storage::segment::SegmentId;

/// Committed state of an index: which segments are live, which of their documents
/// are deleted, and the first WAL file that is not yet reflected in them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub wal_sequence: u64,
    pub segments: Vec<SegmentEntry>,
    pub timestamp: DateTime<Utc>,
    pub generation: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentEntry {
    pub id: SegmentId,
    pub doc_count: u32,
    deletes: Vec<u8>,  // serialized roaring bitmap
}

impl SegmentEntry {
    pub fn new(id: SegmentId, doc_count: u32, deletes: &RoaringBitmap) -> Result<Self> {
        let mut bytes = Vec::with_capacity(deletes.serialized_size());
        deletes.serialize_into(&mut bytes)?;
        Ok(SegmentEntry { id, doc_count, deletes: bytes })
    }

    pub fn deletes(&self) -> Result<RoaringBitmap> {
        RoaringBitmap::deserialize_from(self.deletes.as_slice())
            .map_err(|e| Error::decode(format!("delete bitmap of segment {}: {}", self.id.0, e)))
    }
}

impl Checkpoint {
    /// Load checkpoint from disk
    pub fn load(storage: &StorageLayout) -> Result<Option<Self>> {
        let path = storage.checkpoint_path();
        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read(path)?;
        let checkpoint = bincode::deserialize(&data)?;
        Ok(Some(checkpoint))
    }

    /// Save checkpoint to disk, replacing the previous one atomically
    pub fn save(&self, storage: &StorageLayout) -> Result<()> {
        let data = bincode::serialize(self)?;
        let path = storage.checkpoint_path();
        let tmp_path = path.with_extension("bin.tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&data)?;
            file.sync_all()?;
        }
        fs::rename(tmp_path, path)?;
        Ok(())
    }
}
