use std::time::Duration;
use crate::core::types::Document;
use crate::search::sort::{Sort, SortKey};

/// Search results container
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub documents: Vec<Document>,  // Stored fields only
    pub total_hits: u64,           // Matches before the limit was applied
    pub took: Duration,
}

struct Hit {
    key: Option<SortKey>,
    seq: u64,
    document: Document,
}

/// Top-N collector. Unsorted, it keeps the first `limit` hits in index order and
/// asks the caller to stop once full; sorted, it keeps the best `limit` by sort
/// key with index order breaking ties.
pub struct TopDocsCollector<'s> {
    sort: Option<&'s Sort>,
    limit: usize,
    hits: Vec<Hit>,
    seq: u64,
}

impl<'s> TopDocsCollector<'s> {
    pub fn new(limit: usize, sort: Option<&'s Sort>) -> Self {
        TopDocsCollector {
            sort,
            limit,
            hits: Vec::with_capacity(limit.min(1024)),
            seq: 0,
        }
    }

    /// Whether further hits can still change the result.
    pub fn wants_more(&self) -> bool {
        self.sort.is_some() || self.hits.len() < self.limit
    }

    pub fn collect(&mut self, document: &Document) {
        if self.limit == 0 || !self.wants_more() {
            return;
        }
        let key = self.sort.map(|s| s.key(document));
        self.hits.push(Hit {
            key,
            seq: self.seq,
            document: document.clone(),
        });
        self.seq += 1;

        // Amortized pruning keeps memory at O(limit)
        if self.hits.len() >= self.limit.saturating_mul(2).max(64) {
            self.prune();
        }
    }

    fn prune(&mut self) {
        if let Some(sort) = self.sort {
            self.hits.sort_by(|a, b| match (&a.key, &b.key) {
                (Some(x), Some(y)) => sort.compare(x, y).then(a.seq.cmp(&b.seq)),
                _ => a.seq.cmp(&b.seq),
            });
        }
        self.hits.truncate(self.limit);
    }

    pub fn into_documents(mut self) -> Vec<Document> {
        self.prune();
        self.hits.into_iter().map(|h| h.document).collect()
    }
}
