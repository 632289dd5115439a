use std::collections::{BTreeMap, HashMap};
use std::fmt;
use serde::{Deserialize, Serialize};
use crate::analysis::analyzer::Analyzer;
use crate::core::types::{DocOrdinal, Document, FieldValue};
use crate::index::posting::{Posting, PostingList};

/// A single indexed term of a field. Identity deletes and updates address
/// documents through terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Term {
    pub field: String,
    pub text: String,
}

impl Term {
    pub fn new(field: &str, text: &str) -> Self {
        Term {
            field: field.to_string(),
            text: text.to_string(),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.text)
    }
}

/// Postings and doc values of one field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldIndex {
    /// Sorted term dictionary, so prefix and wildcard scans can walk a range.
    pub terms: BTreeMap<String, PostingList>,
    /// Numeric values, ordered by doc ordinal.
    pub numeric: Vec<(DocOrdinal, FieldValue)>,
}

impl FieldIndex {
    pub fn postings(&self, term: &str) -> Option<&PostingList> {
        self.terms.get(term)
    }

    /// Terms starting with `prefix`, in term order.
    pub fn terms_with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a PostingList)> + 'a {
        self.terms
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .take_while(move |(term, _)| term.starts_with(prefix))
    }
}

/// Inverted index of one segment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvertedIndex {
    pub fields: HashMap<String, FieldIndex>,
    pub doc_count: u32,
    pub total_tokens: u64,
}

impl InvertedIndex {
    pub fn new() -> Self {
        InvertedIndex::default()
    }

    /// Build the index of a batch of documents; ordinals follow slice order.
    pub fn build(documents: &[Document], analyzer: &Analyzer) -> Self {
        let mut index = InvertedIndex::new();
        for (ordinal, document) in documents.iter().enumerate() {
            index.add_document(ordinal as DocOrdinal, document, analyzer);
        }
        index
    }

    pub fn add_document(&mut self, doc: DocOrdinal, document: &Document, analyzer: &Analyzer) {
        for field in document.fields.iter().filter(|f| f.options.indexed) {
            let field_index = self.fields.entry(field.name.clone()).or_default();

            match &field.value {
                FieldValue::Str(text) if field.options.tokenized => {
                    let tokens = analyzer.analyze(text);
                    self.total_tokens += tokens.len() as u64;

                    // Group tokens by term
                    let mut term_positions: HashMap<String, Vec<u32>> = HashMap::new();
                    for token in tokens {
                        term_positions.entry(token.text).or_default().push(token.position);
                    }
                    for (term, positions) in term_positions {
                        field_index
                            .terms
                            .entry(term)
                            .or_default()
                            .add_posting(Posting { doc, positions });
                    }
                }
                FieldValue::Str(text) => {
                    self.total_tokens += 1;
                    field_index
                        .terms
                        .entry(text.clone())
                        .or_default()
                        .add_posting(Posting { doc, positions: vec![0] });
                }
                numeric => field_index.numeric.push((doc, numeric.clone())),
            }
        }
        self.doc_count = self.doc_count.max(doc + 1);
    }

    /// Concatenate segment indexes. `remaps[i][old]` is the merged ordinal of
    /// document `old` of `parts[i]`, or `None` when it is dropped; merged
    /// ordinals must grow with `i` and `old`, so postings stay sorted.
    pub fn merge(parts: &[&InvertedIndex], remaps: &[Vec<Option<DocOrdinal>>], doc_count: u32) -> Self {
        let mut merged = InvertedIndex::new();
        merged.doc_count = doc_count;

        for (part, remap) in parts.iter().zip(remaps) {
            let renumber = |doc: DocOrdinal| remap.get(doc as usize).copied().flatten();

            for (name, field) in &part.fields {
                for (term, list) in &field.terms {
                    let mut live = PostingList::new();
                    for posting in &list.postings {
                        if let Some(doc) = renumber(posting.doc) {
                            merged.total_tokens += posting.positions.len() as u64;
                            live.add_posting(Posting { doc, positions: posting.positions.clone() });
                        }
                    }
                    if live.is_empty() {
                        continue;
                    }
                    let target = merged.fields.entry(name.clone()).or_default();
                    target.terms.entry(term.clone()).or_default().postings.extend(live.postings);
                }

                let numeric: Vec<_> = field
                    .numeric
                    .iter()
                    .filter_map(|(doc, value)| renumber(*doc).map(|doc| (doc, value.clone())))
                    .collect();
                if !numeric.is_empty() {
                    merged.fields.entry(name.clone()).or_default().numeric.extend(numeric);
                }
            }
        }
        merged
    }

    pub fn field(&self, name: &str) -> Option<&FieldIndex> {
        self.fields.get(name)
    }

    pub fn postings(&self, term: &Term) -> Option<&PostingList> {
        self.field(&term.field)?.postings(&term.text)
    }

    pub fn term_count(&self) -> usize {
        self.fields.values().map(|f| f.terms.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Field, FieldOptions};

    fn doc(key: &str, body: &str, ts: i64) -> Document {
        let mut doc = Document::new();
        doc.add(Field::new("full_key", FieldValue::Str(key.into()), FieldOptions::KEYWORD));
        doc.add(Field::new("value", FieldValue::Str(body.into()), FieldOptions::TEXT));
        doc.add(Field::new("timestamp", FieldValue::Long(ts), FieldOptions::NUMERIC));
        doc
    }

    #[test]
    fn builds_postings_keywords_and_doc_values() {
        let analyzer = Analyzer::english();
        let index = InvertedIndex::build(
            &[doc("a:1", "Running dogs run", 10), doc("b:1", "A lazy cat", 20)],
            &analyzer,
        );

        assert_eq!(index.doc_count, 2);
        let run = index.postings(&Term::new("value", "run")).unwrap();
        assert_eq!(run.postings, vec![Posting { doc: 0, positions: vec![0, 2] }]);
        assert_eq!(index.postings(&Term::new("full_key", "b:1")).unwrap().doc_freq(), 1);
        assert!(index.postings(&Term::new("value", "a")).is_none());
        assert_eq!(
            index.field("timestamp").unwrap().numeric,
            vec![(0, FieldValue::Long(10)), (1, FieldValue::Long(20))]
        );
    }

    #[test]
    fn prefix_walks_a_term_range() {
        let analyzer = Analyzer::english();
        let index = InvertedIndex::build(&[doc("k", "cat catalog dog cattle", 1)], &analyzer);
        let field = index.field("value").unwrap();
        let terms: Vec<&str> = field.terms_with_prefix("cat").map(|(t, _)| t.as_str()).collect();
        assert_eq!(terms, vec!["cat", "catalog", "cattl"]);
    }

    #[test]
    fn merge_renumbers_and_drops_deleted_docs() {
        let analyzer = Analyzer::english();
        let first = InvertedIndex::build(&[doc("a", "red fox", 1), doc("b", "red hen", 2)], &analyzer);
        let second = InvertedIndex::build(&[doc("c", "blue fox", 3)], &analyzer);

        // drop "a"
        let merged = InvertedIndex::merge(
            &[&first, &second],
            &[vec![None, Some(0)], vec![Some(1)]],
            2,
        );

        assert_eq!(merged.doc_count, 2);
        assert!(merged.postings(&Term::new("full_key", "a")).is_none());
        assert_eq!(merged.postings(&Term::new("value", "red")).unwrap().docs().iter().collect::<Vec<_>>(), vec![0]);
        assert_eq!(merged.postings(&Term::new("value", "fox")).unwrap().docs().iter().collect::<Vec<_>>(), vec![1]);
        assert_eq!(
            merged.field("timestamp").unwrap().numeric,
            vec![(0, FieldValue::Long(2)), (1, FieldValue::Long(3))]
        );
        // full_key + two value terms per surviving doc
        assert_eq!(merged.total_tokens, 6);
    }
}
