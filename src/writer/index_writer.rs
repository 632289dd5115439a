use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use chrono::Utc;
use parking_lot::Mutex;
use roaring::RoaringBitmap;
use tracing::debug;
use crate::analysis::analyzer::Analyzer;
use crate::core::error::Result;
use crate::core::types::Document;
use crate::index::inverted::{InvertedIndex, Term};
use crate::query::ast::Query;
use crate::query::matcher::{self, SegmentMatcher};
use crate::reader::snapshot::SegmentSnapshot;
use crate::storage::checkpoint::{Checkpoint, SegmentEntry};
use crate::storage::layout::StorageLayout;
use crate::storage::merge_policy::{MergePolicy, TieredMergePolicy};
use crate::storage::segment::{Segment, SegmentId};
use crate::storage::segment_reader::SegmentReader;
use crate::storage::segment_writer::SegmentWriter;
use crate::storage::wal::{Operation, SyncMode, Wal};

#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub batch_size: usize,   // buffered docs before the buffer is sealed into a segment
    pub sync_mode: SyncMode,
    pub merge_policy: TieredMergePolicy,  // applied on every commit
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig {
            batch_size: 10_000,
            sync_mode: SyncMode::Batch,
            merge_policy: TieredMergePolicy::default(),
        }
    }
}

/// What an open found on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct Recovery {
    pub segments: usize,
    pub replayed: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CommitInfo {
    pub generation: u64,
    pub segments: usize,
    pub live_docs: u64,
}

#[derive(Debug, Clone)]
enum DeleteTarget {
    Term(Term),
    Query(Query),
}

impl DeleteTarget {
    fn validate(operation: &Operation) -> Result<()> {
        match operation {
            Operation::DeleteQuery(query) => matcher::validate(query),
            _ => Ok(()),
        }
    }

    fn matches(&self, index: &InvertedIndex) -> Result<RoaringBitmap> {
        let matcher = SegmentMatcher::new(index);
        match self {
            DeleteTarget::Term(term) => matcher.matches(&Query::term(&term.field, &term.text)),
            DeleteTarget::Query(query) => matcher.matches(query),
        }
    }
}

/// A delete that arrived while documents were buffered. It applies only to the
/// first `upto` buffered documents; later ones were added after it.
#[derive(Debug, Clone)]
struct BufferedDelete {
    target: DeleteTarget,
    upto: usize,
}

struct WriterState {
    wal: Wal,
    buffer: Vec<Document>,
    buffer_bytes: usize,
    buffered_deletes: Vec<BufferedDelete>,
    segments: Vec<SegmentSnapshot>,
}

/// Single writer of one index. Every mutation is WAL-logged, applied under one
/// lock, and advances the tracked generation; readers see it after the next
/// [`IndexWriter::refresh`].
pub struct IndexWriter {
    state: Mutex<WriterState>,
    generation: AtomicU64,
    analyzer: Arc<Analyzer>,
    storage: StorageLayout,
    config: WriterConfig,
}

impl IndexWriter {
    /// Load the last checkpoint, replay newer WAL files and start a fresh log.
    pub fn open(storage: StorageLayout, analyzer: Arc<Analyzer>, config: WriterConfig) -> Result<(Self, Recovery)> {
        let checkpoint = Checkpoint::load(&storage)?;
        let (wal_start, generation) = checkpoint
            .as_ref()
            .map(|c| (c.wal_sequence, c.generation))
            .unwrap_or((0, 0));

        let mut segments = Vec::new();
        for entry in checkpoint.iter().flat_map(|c| &c.segments) {
            let segment = SegmentReader::read(&storage, entry.id)?;
            segments.push(SegmentSnapshot::new(Arc::new(segment), entry.deletes()?, true));
        }
        remove_orphan_segments(&storage, &segments)?;

        let wal_files: Vec<u64> = Wal::find_wal_files(&storage)?
            .into_iter()
            .filter(|s| *s >= wal_start)
            .collect();
        let next_sequence = wal_files.last().map(|s| s + 1).unwrap_or(wal_start);

        let wal = Wal::open(&storage, next_sequence, config.sync_mode)?;
        let writer = IndexWriter {
            state: Mutex::new(WriterState {
                wal,
                buffer: Vec::new(),
                buffer_bytes: 0,
                buffered_deletes: Vec::new(),
                segments,
            }),
            generation: AtomicU64::new(generation),
            analyzer,
            storage,
            config,
        };

        let mut recovery = Recovery {
            segments: writer.state.lock().segments.len(),
            replayed: 0,
        };
        {
            let mut state = writer.state.lock();
            for sequence in wal_files {
                for entry in Wal::read_entries(&writer.storage.wal_path(sequence))? {
                    writer.apply(&mut state, entry.operation)?;
                    writer.generation.fetch_add(1, Ordering::AcqRel);
                    recovery.replayed += 1;
                }
            }
        }

        Ok((writer, recovery))
    }

    /// Generation of the latest accepted mutation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn add_document(&self, doc: Document) -> Result<u64> {
        self.log_and_apply(Operation::Add(doc))
    }

    /// Delete every document carrying `term`, then add `doc`, as one operation.
    pub fn update_document(&self, term: Term, doc: Document) -> Result<u64> {
        self.log_and_apply(Operation::Update(term, doc))
    }

    pub fn delete_term(&self, term: Term) -> Result<u64> {
        self.log_and_apply(Operation::DeleteTerm(term))
    }

    pub fn delete_query(&self, query: Query) -> Result<u64> {
        self.log_and_apply(Operation::DeleteQuery(query))
    }

    fn log_and_apply(&self, operation: Operation) -> Result<u64> {
        // Hold lock for entire operation so WAL order is apply order
        let mut state = self.state.lock();
        // A logged operation must apply, here and on replay
        DeleteTarget::validate(&operation)?;
        state.wal.append(&operation)?;
        self.apply(&mut state, operation)?;
        Ok(self.generation.fetch_add(1, Ordering::AcqRel) + 1)
    }

    fn apply(&self, state: &mut WriterState, operation: Operation) -> Result<()> {
        match operation {
            Operation::Add(doc) => self.buffer_document(state, doc),
            Operation::Update(term, doc) => {
                self.delete(state, DeleteTarget::Term(term))?;
                self.buffer_document(state, doc)
            }
            Operation::DeleteTerm(term) => self.delete(state, DeleteTarget::Term(term)),
            Operation::DeleteQuery(query) => self.delete(state, DeleteTarget::Query(query)),
        }
    }

    fn buffer_document(&self, state: &mut WriterState, doc: Document) -> Result<()> {
        state.buffer_bytes += doc.approx_bytes();
        state.buffer.push(doc);
        if state.buffer.len() >= self.config.batch_size.max(1) {
            self.seal(state)?;
        }
        Ok(())
    }

    fn delete(&self, state: &mut WriterState, target: DeleteTarget) -> Result<()> {
        // Match everything before touching any bitmap, so a failure changes nothing
        let mut updates = Vec::new();
        for (position, view) in state.segments.iter().enumerate() {
            let mut hits = target.matches(&view.segment.index)?;
            hits -= &*view.deletes;
            if !hits.is_empty() {
                updates.push((position, hits));
            }
        }
        for (position, hits) in updates {
            let view = &mut state.segments[position];
            // Copy on write: snapshots holding the old bitmap are unaffected
            let mut deletes = (*view.deletes).clone();
            deletes |= hits;
            view.deletes = Arc::new(deletes);
        }

        if !state.buffer.is_empty() {
            let upto = state.buffer.len();
            state.buffered_deletes.push(BufferedDelete { target, upto });
        }
        Ok(())
    }

    /// Turn the buffer into an in-memory segment, resolving buffered deletes.
    fn seal(&self, state: &mut WriterState) -> Result<()> {
        if state.buffer.is_empty() {
            state.buffered_deletes.clear();
            return Ok(());
        }

        let segment = Segment::build(&state.buffer, &self.analyzer);
        let mut deletes = RoaringBitmap::new();
        // Buffer and pending deletes stay intact until every delete resolved
        for buffered in &state.buffered_deletes {
            let mut hits = buffered.target.matches(&segment.index)?;
            hits.remove_range(buffered.upto as u32..);
            deletes |= hits;
        }
        state.buffered_deletes.clear();

        state.segments.push(SegmentSnapshot::new(Arc::new(segment), deletes, false));
        state.buffer.clear();
        state.buffer_bytes = 0;
        Ok(())
    }

    /// Seal the buffer and hand out the current segment views, tagged with the
    /// generation they include.
    pub fn refresh(&self) -> Result<(u64, Vec<SegmentSnapshot>)> {
        let mut state = self.state.lock();
        self.seal(&mut state)?;
        Ok((self.generation(), state.segments.clone()))
    }

    /// Persist everything accepted so far. Blocks until segments, checkpoint and
    /// log rotation are on disk.
    pub fn commit(&self) -> Result<CommitInfo> {
        let mut state = self.state.lock();
        self.seal(&mut state)?;

        // Fully deleted segments are dropped rather than persisted
        let (live, dead): (Vec<_>, Vec<_>) = state
            .segments
            .drain(..)
            .partition(|view| view.live_docs() > 0);
        state.segments = live;
        let retired = self.merge(&mut state);

        let writer = SegmentWriter::new(&self.storage);
        for view in state.segments.iter_mut().filter(|v| !v.persisted) {
            writer.write(&view.segment)?;
            view.persisted = true;
        }

        let generation = self.generation();
        let checkpoint = Checkpoint {
            wal_sequence: state.wal.sequence() + 1,
            segments: state
                .segments
                .iter()
                .map(|v| SegmentEntry::new(v.segment.id, v.segment.doc_count(), &v.deletes))
                .collect::<Result<Vec<_>>>()?,
            timestamp: Utc::now(),
            generation,
        };
        checkpoint.save(&self.storage)?;
        state.wal.rotate(&self.storage)?;

        for view in dead.iter().chain(&retired).filter(|v| v.persisted) {
            let path = self.storage.segment_path(&view.segment.id);
            if path.exists() {
                fs::remove_file(path)?;
            }
        }

        Ok(CommitInfo {
            generation,
            segments: state.segments.len(),
            live_docs: state.segments.iter().map(SegmentSnapshot::live_docs).sum(),
        })
    }

    /// Fold segments together while the merge policy asks for it. Deletions of
    /// the sources are dropped with their documents. Returns the merged-away
    /// segments; their files go once the next checkpoint no longer names them.
    fn merge(&self, state: &mut WriterState) -> Vec<SegmentSnapshot> {
        let policy = &self.config.merge_policy;
        let mut retired = Vec::new();

        while policy.should_merge(&state.segments) {
            let selected = policy.select_segments_to_merge(&state.segments);
            let Some(&first) = selected.first() else {
                break;
            };

            let merged = {
                let parts: Vec<_> = selected
                    .iter()
                    .map(|&position| {
                        let view = &state.segments[position];
                        (view.segment.as_ref(), view.deletes.as_ref())
                    })
                    .collect();
                Segment::merge(&parts)
            };
            debug!(sources = selected.len(), docs = merged.doc_count(), "merged segments");

            // Back to front, so the remaining positions stay valid
            for &position in selected.iter().rev() {
                retired.push(state.segments.remove(position));
            }
            state.segments.insert(first, SegmentSnapshot::new(Arc::new(merged), RoaringBitmap::new(), false));
        }
        retired
    }

    /// Heap held by buffered documents and segments not yet written to disk.
    pub fn ram_size_bytes(&self) -> usize {
        let state = self.state.lock();
        state.buffer_bytes
            + state
                .segments
                .iter()
                .filter(|v| !v.persisted)
                .map(|v| v.segment.metadata.ram_bytes)
                .sum::<usize>()
    }

    pub fn buffered_docs(&self) -> usize {
        self.state.lock().buffer.len()
    }

    pub fn storage(&self) -> &StorageLayout {
        &self.storage
    }
}

fn remove_orphan_segments(storage: &StorageLayout, live: &[SegmentSnapshot]) -> Result<()> {
    let known: HashSet<SegmentId> = live.iter().map(|v| v.segment.id).collect();
    for entry in fs::read_dir(&storage.segments_dir)? {
        let path = entry?.path();
        let id = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.split('.').next())
            .and_then(|stem| uuid::Uuid::parse_str(stem).ok())
            .map(SegmentId);
        match id {
            Some(id) if known.contains(&id) && path.extension().and_then(|e| e.to_str()) == Some("seg") => {}
            Some(_) => fs::remove_file(&path)?,
            None => {}
        }
    }
    Ok(())
}
