use chrono::{DateTime, Utc};
use roaring::RoaringBitmap;
use uuid::Uuid;
use serde::{Deserialize, Serialize};
use crate::analysis::analyzer::Analyzer;
use crate::core::types::{DocOrdinal, Document};
use crate::index::inverted::InvertedIndex;

/// Unique segment identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub Uuid);

impl SegmentId {
    pub fn new() -> Self {
        SegmentId(Uuid::new_v4())
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        SegmentId::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentMetadata {
    pub created_at: DateTime<Utc>,
    pub doc_count: u32,
    pub ram_bytes: usize,
}

/// Immutable index segment: stored documents plus their inverted index.
/// Ordinal `n` of the index is `documents[n]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub metadata: SegmentMetadata,
    pub documents: Vec<Document>,  // stored fields only
    pub index: InvertedIndex,
}

impl Segment {
    pub fn build(documents: &[Document], analyzer: &Analyzer) -> Self {
        let index = InvertedIndex::build(documents, analyzer);
        let stored: Vec<Document> = documents.iter().map(Document::stored_only).collect();
        let ram_bytes = documents.iter().map(Document::approx_bytes).sum();

        Segment {
            id: SegmentId::new(),
            metadata: SegmentMetadata {
                created_at: Utc::now(),
                doc_count: stored.len() as u32,
                ram_bytes,
            },
            documents: stored,
            index,
        }
    }

    /// One segment holding the live documents of `parts`, in part order. Deleted
    /// documents are not carried over, so the result starts with no deletions.
    pub fn merge(parts: &[(&Segment, &RoaringBitmap)]) -> Self {
        let mut documents = Vec::new();
        let mut remaps = Vec::with_capacity(parts.len());
        let mut ram_bytes = 0;

        for (segment, deletes) in parts {
            let remap: Vec<Option<DocOrdinal>> = segment
                .documents
                .iter()
                .enumerate()
                .map(|(ordinal, document)| {
                    if deletes.contains(ordinal as DocOrdinal) {
                        return None;
                    }
                    documents.push(document.clone());
                    Some(documents.len() as DocOrdinal - 1)
                })
                .collect();

            // Only the live share of the source's footprint moves over
            let live = remap.iter().filter(|r| r.is_some()).count();
            if !remap.is_empty() {
                ram_bytes += segment.metadata.ram_bytes * live / remap.len();
            }
            remaps.push(remap);
        }

        let indexes: Vec<&InvertedIndex> = parts.iter().map(|(segment, _)| &segment.index).collect();
        let index = InvertedIndex::merge(&indexes, &remaps, documents.len() as u32);

        Segment {
            id: SegmentId::new(),
            metadata: SegmentMetadata {
                created_at: Utc::now(),
                doc_count: documents.len() as u32,
                ram_bytes,
            },
            documents,
            index,
        }
    }

    pub fn doc_count(&self) -> u32 {
        self.metadata.doc_count
    }
}

/// Segment file header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentHeader {
    pub version: u32,     // Format version
    pub doc_count: u32,   // Number of documents
    pub checksum: u32,    // CRC32 of the compressed body
    pub body_len: u64,    // Compressed body length
}

impl SegmentHeader {
    pub const VERSION: u32 = 1;
    pub const SIZE: usize = 20; // bincode fixint encoding of the four fields

    pub fn new(doc_count: u32) -> Self {
        SegmentHeader {
            version: Self::VERSION,
            doc_count,
            checksum: 0,
            body_len: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::core::types::{Field, FieldOptions, FieldValue};
    use crate::index::inverted::Term;

    fn doc(key: &str, text: &str) -> Document {
        let mut doc = Document::new();
        doc.add(Field::new("full_key", FieldValue::Str(key.into()), FieldOptions::KEYWORD_STORED));
        doc.add(Field::new("value", FieldValue::Str(text.into()), FieldOptions::TEXT));
        doc
    }

    #[test]
    fn merge_keeps_live_documents_in_order() {
        let analyzer = Analyzer::english();
        let first = Segment::build(&[doc("a", "one"), doc("b", "two")], &analyzer);
        let second = Segment::build(&[doc("c", "three")], &analyzer);
        let mut deletes = RoaringBitmap::new();
        deletes.insert(0);

        let merged = Segment::merge(&[(&first, &deletes), (&second, &RoaringBitmap::new())]);

        assert_eq!(merged.doc_count(), 2);
        let keys: Vec<_> = merged.documents.iter().map(|d| d.get_str("full_key").unwrap()).collect();
        assert_eq!(keys, vec!["b", "c"]);
        assert!(merged.index.postings(&Term::new("value", "one")).is_none());
        assert_eq!(merged.index.postings(&Term::new("full_key", "c")).unwrap().docs().iter().collect::<Vec<_>>(), vec![1]);
        assert_ne!(merged.id, first.id);
    }

    #[test]
    fn header_size_matches_encoding() {
        let header = SegmentHeader::new(3);
        assert_eq!(bincode::serialize(&header).unwrap().len(), SegmentHeader::SIZE);
    }
}
