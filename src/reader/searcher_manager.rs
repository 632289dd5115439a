use std::ops::Deref;
use std::sync::Arc;
use parking_lot::{Condvar, Mutex, RwLock};
use crate::core::error::Result;
use crate::reader::snapshot::Snapshot;
use crate::writer::index_writer::IndexWriter;

/// Hands out the current snapshot to searchers and swaps in a new one on refresh.
/// At most `max_readers` snapshots are held at once; further acquirers wait.
pub struct SearcherManager {
    current: RwLock<Arc<Snapshot>>,
    active: Mutex<usize>,
    released: Condvar,
    max_readers: usize,
}

/// Held snapshot. Releases its reader slot when dropped.
pub struct SearcherGuard<'a> {
    manager: &'a SearcherManager,
    snapshot: Arc<Snapshot>,
}

impl SearcherManager {
    pub fn new(initial: Snapshot, max_readers: usize) -> Self {
        SearcherManager {
            current: RwLock::new(Arc::new(initial)),
            active: Mutex::new(0),
            released: Condvar::new(),
            max_readers: max_readers.max(1),
        }
    }

    pub fn acquire(&self) -> SearcherGuard<'_> {
        let mut active = self.active.lock();
        while *active >= self.max_readers {
            self.released.wait(&mut active);
        }
        *active += 1;
        drop(active);

        SearcherGuard {
            manager: self,
            snapshot: self.current.read().clone(),
        }
    }

    fn release(&self) {
        let mut active = self.active.lock();
        *active -= 1;
        self.released.notify_one();
    }

    /// Generation of the snapshot new searchers get
    pub fn generation(&self) -> u64 {
        self.current.read().generation
    }

    pub fn active_searchers(&self) -> usize {
        *self.active.lock()
    }

    /// Swap in a fresh snapshot if the writer moved past the current one.
    /// Returns whether a swap happened.
    pub fn maybe_refresh(&self, writer: &IndexWriter) -> Result<bool> {
        if writer.generation() == self.generation() {
            return Ok(false);
        }
        let (generation, segments) = writer.refresh()?;
        let mut current = self.current.write();
        // A concurrent refresh may already have installed something newer
        if generation < current.generation {
            return Ok(false);
        }
        *current = Arc::new(Snapshot::new(generation, segments));
        Ok(true)
    }

    /// Drop the current snapshot; searchers holding it keep it alive until release.
    pub fn close(&self) {
        let generation = self.generation();
        *self.current.write() = Arc::new(Snapshot::new(generation, Vec::new()));
    }
}

impl Deref for SearcherGuard<'_> {
    type Target = Snapshot;

    fn deref(&self) -> &Snapshot {
        &self.snapshot
    }
}

impl Drop for SearcherGuard<'_> {
    fn drop(&mut self) {
        self.manager.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;
    use crate::analysis::analyzer::Analyzer;
    use crate::core::types::Document;
    use crate::storage::layout::StorageLayout;
    use crate::writer::index_writer::WriterConfig;

    #[test]
    fn guards_release_their_slot() {
        let manager = SearcherManager::new(Snapshot::default(), 2);
        {
            let _a = manager.acquire();
            let _b = manager.acquire();
            assert_eq!(manager.active_searchers(), 2);
        }
        assert_eq!(manager.active_searchers(), 0);
    }

    #[test]
    fn acquire_waits_for_a_free_slot() {
        let manager = Arc::new(SearcherManager::new(Snapshot::default(), 1));
        let guard = manager.acquire();

        let waiter = {
            let manager = manager.clone();
            thread::spawn(move || {
                let generation = manager.acquire().generation;
                generation
            })
        };
        thread::sleep(Duration::from_millis(20));
        assert_eq!(manager.active_searchers(), 1);
        drop(guard);
        assert_eq!(waiter.join().unwrap(), 0);
    }

    #[test]
    fn refresh_follows_writer_generation() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageLayout::new(dir.path().to_path_buf()).unwrap();
        let (writer, _) = IndexWriter::open(storage, Arc::new(Analyzer::english()), WriterConfig::default()).unwrap();
        let manager = SearcherManager::new(Snapshot::default(), 4);

        let old = manager.acquire();
        assert!(!manager.maybe_refresh(&writer).unwrap());
        writer.add_document(Document::new()).unwrap();
        assert!(manager.maybe_refresh(&writer).unwrap());

        assert_eq!(manager.generation(), 1);
        assert_eq!(manager.acquire().live_docs(), 1);
        assert_eq!(old.live_docs(), 0);
    }
}
