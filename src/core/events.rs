use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Structured events emitted by an index. Passed to an [`EventSink`] owned by
/// whoever opened the index; the core never logs through global state.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexEvent {
    Opened { path: PathBuf, segments: usize, replayed: usize },
    DocumentWritten { generation: u64, replaced: bool },
    Deleted { generation: u64 },
    Committed { segments: usize, live_docs: u64 },
    ReopenCompleted { generation: u64, took: Duration },
    SearchExecuted { hits: usize, took: Duration },
    Closed { path: PathBuf },
    Removed { path: PathBuf },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: IndexEvent);
}

/// Default sink: forwards every event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: IndexEvent) {
        match event {
            IndexEvent::Opened { path, segments, replayed } => {
                info!(path = %path.display(), segments, replayed, "index opened")
            }
            IndexEvent::DocumentWritten { generation, replaced } => {
                debug!(generation, replaced, "document written")
            }
            IndexEvent::Deleted { generation } => debug!(generation, "documents deleted"),
            IndexEvent::Committed { segments, live_docs } => {
                info!(segments, live_docs, "index committed")
            }
            IndexEvent::ReopenCompleted { generation, took } => {
                debug!(generation, took_us = took.as_micros() as u64, "reopen completed")
            }
            IndexEvent::SearchExecuted { hits, took } => {
                debug!(hits, took_us = took.as_micros() as u64, "search executed")
            }
            IndexEvent::Closed { path } => info!(path = %path.display(), "index closed"),
            IndexEvent::Removed { path } => info!(path = %path.display(), "index removed"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: IndexEvent) {}
}
