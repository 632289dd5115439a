use regex::Regex;
use roaring::RoaringBitmap;
use crate::core::error::{Error, ErrorKind, Result};
use crate::index::inverted::{FieldIndex, InvertedIndex};
use crate::query::ast::{BoolQuery, PhraseQuery, Query, RangeQuery, WildcardQuery};

/// Evaluates queries against the inverted index of one segment. Results are segment
/// ordinals; deletions are applied by the caller.
pub struct SegmentMatcher<'a> {
    index: &'a InvertedIndex,
}

impl<'a> SegmentMatcher<'a> {
    pub fn new(index: &'a InvertedIndex) -> Self {
        SegmentMatcher { index }
    }

    pub fn matches(&self, query: &Query) -> Result<RoaringBitmap> {
        match query {
            Query::MatchAll => Ok(self.all_docs()),
            Query::Term(term) => Ok(self
                .field(&term.field)
                .and_then(|f| f.postings(&term.value))
                .map(|p| p.docs())
                .unwrap_or_default()),
            Query::Phrase(phrase) => Ok(self.matches_phrase(phrase)),
            Query::Bool(bool_query) => self.matches_bool(bool_query),
            Query::Range(range) => Ok(self.matches_range(range)),
            Query::Prefix(prefix) => {
                let mut docs = RoaringBitmap::new();
                if let Some(field) = self.field(&prefix.field) {
                    for (_, postings) in field.terms_with_prefix(&prefix.prefix) {
                        docs |= postings.docs();
                    }
                }
                Ok(docs)
            }
            Query::Wildcard(wildcard) => self.matches_wildcard(wildcard),
        }
    }

    fn field(&self, name: &str) -> Option<&'a FieldIndex> {
        self.index.field(name)
    }

    fn all_docs(&self) -> RoaringBitmap {
        let mut docs = RoaringBitmap::new();
        docs.insert_range(0..self.index.doc_count);
        docs
    }

    fn matches_phrase(&self, phrase: &PhraseQuery) -> RoaringBitmap {
        let Some(field) = self.field(&phrase.field) else {
            return RoaringBitmap::new();
        };
        let mut lists = Vec::with_capacity(phrase.terms.len());
        for (term, offset) in &phrase.terms {
            match field.postings(term) {
                Some(list) => lists.push((list, *offset)),
                None => return RoaringBitmap::new(),
            }
        }
        let Some(((first, first_offset), rest)) = lists.split_first() else {
            return RoaringBitmap::new();
        };

        let mut candidates = first.docs();
        for (list, _) in rest {
            candidates &= list.docs();
        }

        let mut docs = RoaringBitmap::new();
        for doc in candidates.iter() {
            let Some(anchor) = first.get(doc) else { continue };
            // Every term must sit at its offset relative to some start position
            let found = anchor.positions.iter().any(|&pos| {
                let Some(start) = pos.checked_sub(*first_offset) else {
                    return false;
                };
                rest.iter().all(|(list, offset)| {
                    list.get(doc)
                        .is_some_and(|p| p.positions.binary_search(&(start + offset)).is_ok())
                })
            });
            if found {
                docs.insert(doc);
            }
        }
        docs
    }

    fn matches_bool(&self, bool_query: &BoolQuery) -> Result<RoaringBitmap> {
        // Pure negative queries match nothing
        if bool_query.must.is_empty() && bool_query.should.is_empty() {
            return Ok(RoaringBitmap::new());
        }

        let mut docs = if bool_query.must.is_empty() {
            let mut any = RoaringBitmap::new();
            for clause in &bool_query.should {
                any |= self.matches(clause)?;
            }
            any
        } else {
            // Should clauses only affect scoring once a must clause exists
            let mut all: Option<RoaringBitmap> = None;
            for clause in &bool_query.must {
                let matched = self.matches(clause)?;
                all = Some(match all {
                    Some(acc) => acc & matched,
                    None => matched,
                });
            }
            all.unwrap_or_default()
        };

        for clause in &bool_query.must_not {
            if docs.is_empty() {
                break;
            }
            docs -= self.matches(clause)?;
        }
        Ok(docs)
    }

    fn matches_range(&self, range: &RangeQuery) -> RoaringBitmap {
        let mut docs = RoaringBitmap::new();
        if let Some(field) = self.field(&range.field) {
            for (doc, value) in &field.numeric {
                if range.contains(value) {
                    docs.insert(*doc);
                }
            }
        }
        docs
    }

    fn matches_wildcard(&self, query: &WildcardQuery) -> Result<RoaringBitmap> {
        let mut docs = RoaringBitmap::new();
        let Some(field) = self.field(&query.field) else {
            return Ok(docs);
        };

        // Only terms sharing the literal head of the pattern can match
        let literal_len = query.pattern.find(['*', '?']).unwrap_or(query.pattern.len());
        let literal = &query.pattern[..literal_len];
        let regex = wildcard_regex(&query.pattern)?;

        for (term, postings) in field.terms_with_prefix(literal) {
            if regex.is_match(term) {
                docs |= postings.docs();
            }
        }
        Ok(docs)
    }
}

/// Fails on queries that cannot be evaluated against any segment, such as a
/// wildcard whose pattern does not compile.
pub fn validate(query: &Query) -> Result<()> {
    match query {
        Query::Wildcard(wildcard) => wildcard_regex(&wildcard.pattern).map(|_| ()),
        Query::Bool(bool_query) => bool_query
            .must
            .iter()
            .chain(&bool_query.should)
            .chain(&bool_query.must_not)
            .try_for_each(validate),
        _ => Ok(()),
    }
}

/// `*` matches any run of characters, `?` exactly one; everything else is literal.
fn wildcard_regex(pattern: &str) -> Result<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    let mut literal = String::new();
    for c in pattern.chars() {
        match c {
            '*' | '?' => {
                expr.push_str(&regex::escape(&literal));
                literal.clear();
                expr.push_str(if c == '*' { ".*" } else { "." });
            }
            _ => literal.push(c),
        }
    }
    expr.push_str(&regex::escape(&literal));
    expr.push('$');

    Regex::new(&expr)
        .map_err(|e| Error::new(ErrorKind::Parse, format!("invalid wildcard '{}': {}", pattern, e)))
}
