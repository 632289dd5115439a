use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::Document;
use crate::index::inverted::Term;
use crate::query::ast::Query;
use crate::storage::layout::StorageLayout;

const BATCH_SYNC_BYTES: u64 = 1024 * 1024;
const MAX_ENTRY_BYTES: usize = 64 * 1024 * 1024;

/// Write-ahead log for durability
pub struct Wal {
    file: File,
    sequence: u64,
    sync_mode: SyncMode,
    unsynced: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    Immediate,  // fsync after every write
    Batch,      // fsync every megabyte and on commit
    None,       // fsync on commit only
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalEntry {
    pub operation: Operation,
    pub timestamp: DateTime<Utc>,
}

/// Writer mutations, replayed in order on open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Operation {
    Add(Document),
    Update(Term, Document),
    DeleteTerm(Term),
    DeleteQuery(Query),
}

impl Wal {
    pub fn open(storage: &StorageLayout, sequence: u64, sync_mode: SyncMode) -> Result<Self> {
        let path = storage.wal_path(sequence);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        Ok(Wal {
            file,
            sequence,
            sync_mode,
            unsynced: 0,
        })
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    // [ LEN u32 LE ][ CRC32 u32 LE ][ bincode WalEntry ]
    pub fn append(&mut self, operation: &Operation) -> Result<()> {
        let entry = WalEntry {
            operation: operation.clone(),
            timestamp: Utc::now(),
        };
        let data = bincode::serialize(&entry)?;

        let mut frame = Vec::with_capacity(8 + data.len());
        frame.extend_from_slice(&(data.len() as u32).to_le_bytes());
        frame.extend_from_slice(&crc32fast::hash(&data).to_le_bytes());
        frame.extend_from_slice(&data);
        self.file.write_all(&frame)?;
        self.unsynced += frame.len() as u64;

        match self.sync_mode {
            SyncMode::Immediate => self.sync()?,
            SyncMode::Batch if self.unsynced >= BATCH_SYNC_BYTES => self.sync()?,
            _ => {}
        }

        Ok(())
    }

    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Start a fresh log file and drop every older one. Only safe once the state
    /// the older files describe has been checkpointed.
    pub fn rotate(&mut self, storage: &StorageLayout) -> Result<u64> {
        self.sync()?;
        let next = Wal::open(storage, self.sequence + 1, self.sync_mode)?;
        *self = next;

        for sequence in Wal::find_wal_files(storage)? {
            if sequence < self.sequence {
                fs::remove_file(storage.wal_path(sequence))?;
            }
        }
        Ok(self.sequence)
    }

    /// Read all entries of one log file. A torn or corrupt tail (crash during
    /// append) ends the replay of that file.
    pub fn read_entries(path: &Path) -> Result<Vec<WalEntry>> {
        let mut data = Vec::new();
        File::open(path)?.read_to_end(&mut data)?;

        let mut entries = Vec::new();
        let mut offset = 0;
        while offset < data.len() {
            let Some(frame) = data.get(offset..offset + 8) else {
                warn!(path = %path.display(), offset, "torn WAL frame header, stopping replay");
                break;
            };
            let len = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
            let crc = u32::from_le_bytes([frame[4], frame[5], frame[6], frame[7]]);

            if len > MAX_ENTRY_BYTES {
                return Err(Error::new(
                    ErrorKind::Decode,
                    format!("WAL entry of {} bytes at offset {} in {}", len, offset, path.display()),
                ));
            }
            let Some(payload) = data.get(offset + 8..offset + 8 + len) else {
                warn!(path = %path.display(), offset, "torn WAL entry, stopping replay");
                break;
            };
            if crc32fast::hash(payload) != crc {
                warn!(path = %path.display(), offset, "WAL entry failed checksum, stopping replay");
                break;
            }

            entries.push(bincode::deserialize::<WalEntry>(payload)?);
            offset += 8 + len;
        }

        Ok(entries)
    }

    /// Find all WAL files, oldest first
    pub fn find_wal_files(storage: &StorageLayout) -> Result<Vec<u64>> {
        let mut sequences = Vec::new();

        for entry in fs::read_dir(storage.wal_dir())? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("log") {
                continue;
            }
            // wal_00000000.log
            let sequence = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_prefix("wal_"))
                .and_then(|s| s.parse::<u64>().ok());
            if let Some(sequence) = sequence {
                sequences.push(sequence);
            }
        }

        sequences.sort_unstable();
        Ok(sequences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn storage() -> (tempfile::TempDir, StorageLayout) {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageLayout::new(dir.path().to_path_buf()).unwrap();
        (dir, storage)
    }

    #[test]
    fn entries_replay_in_order() {
        let (_dir, storage) = storage();
        let mut wal = Wal::open(&storage, 0, SyncMode::Immediate).unwrap();
        wal.append(&Operation::Add(Document::new())).unwrap();
        wal.append(&Operation::DeleteTerm(Term::new("full_key", "a:b:1"))).unwrap();

        let entries = Wal::read_entries(&storage.wal_path(0)).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(matches!(entries[0].operation, Operation::Add(_)));
        assert!(matches!(&entries[1].operation, Operation::DeleteTerm(t) if t.text == "a:b:1"));
    }

    #[test]
    fn torn_tail_is_ignored() {
        let (_dir, storage) = storage();
        let mut wal = Wal::open(&storage, 3, SyncMode::Batch).unwrap();
        wal.append(&Operation::DeleteQuery(Query::MatchAll)).unwrap();
        wal.sync().unwrap();

        let mut file = OpenOptions::new().append(true).open(storage.wal_path(3)).unwrap();
        file.write_all(&[42, 0, 0, 0, 1, 2]).unwrap();

        let entries = Wal::read_entries(&storage.wal_path(3)).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn rotate_drops_older_files() {
        let (_dir, storage) = storage();
        let mut wal = Wal::open(&storage, 0, SyncMode::None).unwrap();
        wal.append(&Operation::Add(Document::new())).unwrap();
        Wal::open(&storage, 1, SyncMode::None).unwrap();

        assert_eq!(wal.rotate(&storage).unwrap(), 1);
        assert_eq!(Wal::find_wal_files(&storage).unwrap(), vec![1]);
    }
}
