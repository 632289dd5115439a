use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use crate::core::types::DocOrdinal;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc: DocOrdinal,
    pub positions: Vec<u32>,  // Token positions for phrase queries
}

/// Posting list for a term
/// Note: Sorted by doc ordinal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostingList {
    pub postings: Vec<Posting>,
}

impl PostingList {
    pub fn new() -> Self {
        PostingList { postings: Vec::new() }
    }

    pub fn add_posting(&mut self, posting: Posting) {
        // Documents arrive in ordinal order, so this is almost always a push
        match self.postings.binary_search_by_key(&posting.doc, |p| p.doc) {
            Ok(pos) => self.postings[pos] = posting,
            Err(pos) => self.postings.insert(pos, posting),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn doc_freq(&self) -> u32 {
        self.postings.len() as u32
    }

    pub fn get(&self, doc: DocOrdinal) -> Option<&Posting> {
        self.postings
            .binary_search_by_key(&doc, |p| p.doc)
            .ok()
            .map(|pos| &self.postings[pos])
    }

    pub fn docs(&self) -> RoaringBitmap {
        let mut bitmap = RoaringBitmap::new();
        for posting in &self.postings {
            bitmap.insert(posting.doc);
        }
        bitmap
    }
}
