use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use tracing::warn;
use crate::analysis::analyzer::Analyzer;
use crate::core::config::IndexConfig;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::events::{EventSink, IndexEvent};
use crate::core::stats::IndexStats;
use crate::core::types::Document;
use crate::index::inverted::Term;
use crate::query::ast::Query;
use crate::reader::reopen::ReopenThread;
use crate::reader::searcher_manager::SearcherManager;
use crate::reader::snapshot::Snapshot;
use crate::search::results::SearchResults;
use crate::search::sort::Sort;
use crate::storage::file_lock::FileLock;
use crate::storage::layout::StorageLayout;
use crate::storage::merge_policy::TieredMergePolicy;
use crate::writer::index_writer::{CommitInfo, IndexWriter, WriterConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Uninitialized,
    Open,
    Closing,
    Closed,
}

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub limit: usize,
    pub sort: Option<Sort>,
    /// Bounds both the wait for `min_generation` and the segment scan.
    pub timeout: Option<Duration>,
    /// Wait until the reopen thread has made this writer generation visible.
    pub min_generation: Option<u64>,
}

impl SearchOptions {
    pub fn new(limit: usize) -> Self {
        SearchOptions {
            limit,
            ..Default::default()
        }
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_min_generation(mut self, generation: u64) -> Self {
        self.min_generation = Some(generation);
        self
    }
}

/// A live full-text index over one directory. Owns the writer, the searcher
/// manager, the reopen thread and the directory lock; all of them are released
/// by [`SearchIndex::close`].
///
/// Writes become searchable after the next reopen (at most `target_max_stale`
/// later) or immediately after [`SearchIndex::commit`].
pub struct SearchIndex {
    path: PathBuf,
    state: RwLock<IndexState>,
    writer: Arc<IndexWriter>,
    searchers: Arc<SearcherManager>,
    reopen: ReopenThread,
    lock: Mutex<Option<FileLock>>,
    sink: Arc<dyn EventSink>,
}

impl SearchIndex {
    pub fn open(path: &Path, config: &IndexConfig, sink: Arc<dyn EventSink>) -> Result<Self> {
        let storage = StorageLayout::new(path.to_path_buf())?;
        let lock = FileLock::acquire(&storage)?;

        let writer_config = WriterConfig {
            batch_size: config.writer_batch_size,
            sync_mode: config.wal_sync,
            merge_policy: TieredMergePolicy {
                max_segments_per_tier: config.max_segments_per_tier,
                ..Default::default()
            },
        };
        let analyzer = Arc::new(Analyzer::english());
        let (writer, recovery) = IndexWriter::open(storage, analyzer, writer_config)?;
        let writer = Arc::new(writer);

        let (generation, segments) = writer.refresh()?;
        let searchers = Arc::new(SearcherManager::new(
            Snapshot::new(generation, segments),
            config.max_readers,
        ));

        let reopen = {
            let writer = writer.clone();
            let searchers = searchers.clone();
            let sink = sink.clone();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            ReopenThread::start(
                &name,
                config.max_stale(),
                config.min_stale(),
                generation,
                move || {
                    let started = Instant::now();
                    if searchers.maybe_refresh(&writer)? {
                        sink.emit(IndexEvent::ReopenCompleted {
                            generation: searchers.generation(),
                            took: started.elapsed(),
                        });
                    }
                    Ok(searchers.generation())
                },
            )?
        };

        sink.emit(IndexEvent::Opened {
            path: path.to_path_buf(),
            segments: recovery.segments,
            replayed: recovery.replayed,
        });

        Ok(SearchIndex {
            path: path.to_path_buf(),
            state: RwLock::new(IndexState::Open),
            writer,
            searchers,
            reopen,
            lock: Mutex::new(Some(lock)),
            sink,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> IndexState {
        *self.state.read()
    }

    /// Held for the whole operation, so `close` never overlaps in-flight work.
    fn ensure_open(&self) -> Result<RwLockReadGuard<'_, IndexState>> {
        let state = self.state.read();
        if *state != IndexState::Open {
            return Err(Error::invalid_state(format!(
                "index {} is {:?}",
                self.path.display(),
                *state
            )));
        }
        Ok(state)
    }

    pub fn insert(&self, doc: Document) -> Result<u64> {
        let _open = self.ensure_open()?;
        let generation = self.writer.add_document(doc)?;
        self.sink.emit(IndexEvent::DocumentWritten { generation, replaced: false });
        Ok(generation)
    }

    /// Atomically delete every document carrying `term` and add `doc`.
    pub fn update(&self, term: Term, doc: Document) -> Result<u64> {
        let _open = self.ensure_open()?;
        let generation = self.writer.update_document(term, doc)?;
        self.sink.emit(IndexEvent::DocumentWritten { generation, replaced: true });
        Ok(generation)
    }

    pub fn delete_term(&self, term: Term) -> Result<u64> {
        let _open = self.ensure_open()?;
        let generation = self.writer.delete_term(term)?;
        self.sink.emit(IndexEvent::Deleted { generation });
        Ok(generation)
    }

    pub fn delete_query(&self, query: Query) -> Result<u64> {
        let _open = self.ensure_open()?;
        let generation = self.writer.delete_query(query)?;
        self.sink.emit(IndexEvent::Deleted { generation });
        Ok(generation)
    }

    /// Make every accepted write durable and visible to new searchers.
    pub fn commit(&self) -> Result<CommitInfo> {
        let _open = self.ensure_open()?;
        let info = self.writer.commit()?;
        self.searchers.maybe_refresh(&self.writer)?;
        self.reopen.refreshed(self.searchers.generation());

        self.sink.emit(IndexEvent::Committed {
            segments: info.segments,
            live_docs: info.live_docs,
        });
        Ok(info)
    }

    pub fn search(&self, query: &Query, limit: usize, sort: Option<&Sort>) -> Result<Vec<Document>> {
        let options = SearchOptions {
            limit,
            sort: sort.cloned(),
            ..Default::default()
        };
        Ok(self.search_with(query, &options)?.documents)
    }

    /// Search once the writer generation `generation` is visible.
    pub fn search_fresh(
        &self,
        query: &Query,
        limit: usize,
        sort: Option<&Sort>,
        generation: u64,
    ) -> Result<Vec<Document>> {
        let options = SearchOptions {
            limit,
            sort: sort.cloned(),
            timeout: None,
            min_generation: Some(generation),
        };
        Ok(self.search_with(query, &options)?.documents)
    }

    pub fn search_with(&self, query: &Query, options: &SearchOptions) -> Result<SearchResults> {
        let _open = self.ensure_open()?;
        let started = Instant::now();
        let deadline = options.timeout.map(|t| started + t);

        if let Some(generation) = options.min_generation {
            if !self.reopen.wait_for_generation(generation, options.timeout) {
                return Err(Error::new(
                    ErrorKind::Timeout,
                    format!("generation {} not visible after {:?}", generation, started.elapsed()),
                ));
            }
        }

        // Released on drop, on every path
        let searcher = self.searchers.acquire();
        let results = searcher.search(query, options.limit, options.sort.as_ref(), deadline)?;

        self.sink.emit(IndexEvent::SearchExecuted {
            hits: results.documents.len(),
            took: started.elapsed(),
        });
        Ok(results)
    }

    /// Writer generation of the latest accepted write
    pub fn generation(&self) -> u64 {
        self.writer.generation()
    }

    /// Stop the reopen thread, release searchers, commit buffered work and release
    /// the directory lock, in that order. Closing twice is an error.
    pub fn close(&self) -> Result<()> {
        {
            let mut state = self.state.write();
            if *state != IndexState::Open {
                return Err(Error::invalid_state(format!(
                    "cannot close index {}: it is {:?}",
                    self.path.display(),
                    *state
                )));
            }
            *state = IndexState::Closing;
        }

        self.reopen.stop();
        self.searchers.close();
        let committed = self.writer.commit();
        self.lock.lock().take();

        *self.state.write() = IndexState::Closed;
        self.sink.emit(IndexEvent::Closed { path: self.path.clone() });
        committed.map(|_| ())
    }

    /// Close (if still open) and delete the index directory.
    pub fn remove_index(&self) -> Result<()> {
        if self.state() == IndexState::Open {
            self.close()?;
        }
        if self.path.exists() {
            fs::remove_dir_all(&self.path)?;
        }
        self.sink.emit(IndexEvent::Removed { path: self.path.clone() });
        Ok(())
    }

    pub fn ram_size_bytes(&self) -> u64 {
        self.writer.ram_size_bytes() as u64
    }

    pub fn estimated_size(&self) -> Result<u64> {
        Ok(self.stats()?.estimated_size())
    }

    pub fn stats(&self) -> Result<IndexStats> {
        let disk_size_bytes = if self.path.exists() {
            self.writer.storage().segments_size()?
        } else {
            0
        };
        let searcher = self.searchers.acquire();

        Ok(IndexStats {
            segment_count: searcher.segments.len(),
            live_docs: searcher.live_docs(),
            deleted_docs: searcher.deleted_docs(),
            buffered_docs: self.writer.buffered_docs(),
            ram_size_bytes: self.ram_size_bytes(),
            disk_size_bytes,
            writer_generation: self.writer.generation(),
            searcher_generation: searcher.generation,
            // includes the guard held here
            active_searchers: self.searchers.active_searchers().saturating_sub(1),
        })
    }
}

impl Drop for SearchIndex {
    fn drop(&mut self) {
        if self.state() == IndexState::Open {
            if let Err(e) = self.close() {
                warn!(path = %self.path.display(), error = %e, "closing index on drop failed");
            }
        }
    }
}
