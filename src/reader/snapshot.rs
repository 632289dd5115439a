use std::sync::Arc;
use std::time::Instant;
use roaring::RoaringBitmap;
use crate::core::error::{Error, ErrorKind, Result};
use crate::query::ast::Query;
use crate::query::matcher::SegmentMatcher;
use crate::search::results::{SearchResults, TopDocsCollector};
use crate::search::sort::Sort;
use crate::storage::segment::Segment;

/// A segment together with the deletions visible at one point in time. Deletion
/// bitmaps are copy-on-write: the writer swaps in a new `Arc`, readers keep theirs.
#[derive(Debug, Clone)]
pub struct SegmentSnapshot {
    pub segment: Arc<Segment>,
    pub deletes: Arc<RoaringBitmap>,
    pub persisted: bool,
}

impl SegmentSnapshot {
    pub fn new(segment: Arc<Segment>, deletes: RoaringBitmap, persisted: bool) -> Self {
        SegmentSnapshot {
            segment,
            deletes: Arc::new(deletes),
            persisted,
        }
    }

    pub fn live_docs(&self) -> u64 {
        self.segment.doc_count() as u64 - self.deletes.len()
    }
}

/// Point-in-time view of the index
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub generation: u64,
    pub segments: Vec<SegmentSnapshot>,
}

impl Snapshot {
    pub fn new(generation: u64, segments: Vec<SegmentSnapshot>) -> Self {
        Snapshot { generation, segments }
    }

    pub fn live_docs(&self) -> u64 {
        self.segments.iter().map(SegmentSnapshot::live_docs).sum()
    }

    pub fn deleted_docs(&self) -> u64 {
        self.segments.iter().map(|s| s.deletes.len()).sum()
    }

    /// Run `query` over every segment, oldest first. The deadline is checked
    /// between segments.
    pub fn search(
        &self,
        query: &Query,
        limit: usize,
        sort: Option<&Sort>,
        deadline: Option<Instant>,
    ) -> Result<SearchResults> {
        let started = Instant::now();
        let mut collector = TopDocsCollector::new(limit, sort);
        let mut total_hits = 0;

        for view in &self.segments {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(Error::new(
                    ErrorKind::Timeout,
                    format!("search timed out after {:?}", started.elapsed()),
                ));
            }

            let mut hits = SegmentMatcher::new(&view.segment.index).matches(query)?;
            hits -= &*view.deletes;
            total_hits += hits.len();

            for ordinal in hits.iter() {
                if !collector.wants_more() {
                    break;
                }
                if let Some(document) = view.segment.documents.get(ordinal as usize) {
                    collector.collect(document);
                }
            }
        }

        Ok(SearchResults {
            documents: collector.into_documents(),
            total_hits,
            took: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::analysis::analyzer::Analyzer;
    use crate::core::types::{Document, Field, FieldOptions, FieldValue};
    use crate::search::sort::SortField;

    fn segment(keys: &[&str]) -> Arc<Segment> {
        let docs: Vec<Document> = keys
            .iter()
            .map(|k| {
                let mut doc = Document::new();
                doc.add(Field::new("key", FieldValue::Str(k.to_string()), FieldOptions::KEYWORD_STORED));
                doc.add(Field::new("value", FieldValue::Str("shared text".into()), FieldOptions::TEXT));
                doc
            })
            .collect();
        Arc::new(Segment::build(&docs, &Analyzer::english()))
    }

    fn keys(results: &SearchResults) -> Vec<&str> {
        results.documents.iter().map(|d| d.get_str("key").unwrap()).collect()
    }

    #[test]
    fn deletes_hide_documents() {
        let deletes: RoaringBitmap = [1u32].into_iter().collect();
        let snapshot = Snapshot::new(1, vec![
            SegmentSnapshot::new(segment(&["c", "a"]), RoaringBitmap::new(), true),
            SegmentSnapshot::new(segment(&["d", "b"]), deletes, false),
        ]);

        let query = Query::term("value", "share");
        let results = snapshot.search(&query, 10, None, None).unwrap();
        assert_eq!(keys(&results), vec!["c", "a", "d"]);
        assert_eq!(results.total_hits, 3);
        assert_eq!(snapshot.live_docs(), 3);
        assert_eq!(snapshot.deleted_docs(), 1);

        let sort = Sort::by(SortField::new("key"));
        let sorted = snapshot.search(&query, 2, Some(&sort), None).unwrap();
        assert_eq!(keys(&sorted), vec!["a", "c"]);
    }

    #[test]
    fn expired_deadline_times_out() {
        let snapshot = Snapshot::new(1, vec![SegmentSnapshot::new(segment(&["a"]), RoaringBitmap::new(), true)]);
        let deadline = Instant::now() - Duration::from_millis(1);
        let err = snapshot.search(&Query::MatchAll, 10, None, Some(deadline)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
    }
}
