use serde::{Serialize, Deserialize};
use crate::core::types::FieldValue;

/// Main query enum representing all query types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    Term(TermQuery),         // Exact indexed term
    Phrase(PhraseQuery),     // Adjacent analyzed terms
    Bool(BoolQuery),         // Boolean combinations
    Range(RangeQuery),       // Numeric range
    Prefix(PrefixQuery),
    Wildcard(WildcardQuery), // * and ? patterns
    MatchAll,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermQuery {
    pub field: String,
    pub value: String,
}

/// Terms must occur at consecutive positions (modulo removed stop words, which keep
/// their position gap).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseQuery {
    pub field: String,
    pub terms: Vec<(String, u32)>,  // term, relative position
}

/// Boolean query with must/should/must_not clauses
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoolQuery {
    pub must: Vec<Query>,      // All must match (AND)
    pub should: Vec<Query>,    // At least one must match (OR) when there is no must clause
    pub must_not: Vec<Query>,  // None must match (NOT)
}

/// Range query over a numeric field. Unset bounds are open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeQuery {
    pub field: String,
    pub gt: Option<FieldValue>,
    pub gte: Option<FieldValue>,
    pub lt: Option<FieldValue>,
    pub lte: Option<FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefixQuery {
    pub field: String,
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WildcardQuery {
    pub field: String,
    pub pattern: String, // * matches any run, ? one character
}

impl Query {
    pub fn term(field: &str, value: &str) -> Query {
        Query::Term(TermQuery {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

impl BoolQuery {
    pub fn new() -> Self {
        BoolQuery::default()
    }

    pub fn with_must(mut self, query: Query) -> Self {
        self.must.push(query);
        self
    }

    pub fn with_should(mut self, query: Query) -> Self {
        self.should.push(query);
        self
    }

    pub fn with_must_not(mut self, query: Query) -> Self {
        self.must_not.push(query);
        self
    }
}

impl RangeQuery {
    fn open(field: &str) -> Self {
        RangeQuery { field: field.to_string(), gt: None, gte: None, lt: None, lte: None }
    }

    /// `min..max` with per-end inclusiveness; a `None` end is unbounded.
    pub fn new(
        field: &str,
        min: Option<FieldValue>,
        max: Option<FieldValue>,
        min_inclusive: bool,
        max_inclusive: bool,
    ) -> Self {
        let mut range = RangeQuery::open(field);
        if min_inclusive {
            range.gte = min;
        } else {
            range.gt = min;
        }
        if max_inclusive {
            range.lte = max;
        } else {
            range.lt = max;
        }
        range
    }

    /// Single-point range `[value, value]`.
    pub fn point(field: &str, value: FieldValue) -> Self {
        RangeQuery::new(field, Some(value.clone()), Some(value), true, true)
    }

    pub fn contains(&self, value: &FieldValue) -> bool {
        use std::cmp::Ordering::*;
        let check = |bound: &Option<FieldValue>, ok: &[std::cmp::Ordering]| match bound {
            None => true,
            Some(b) => value.cmp_numeric(b).is_some_and(|o| ok.contains(&o)),
        };
        check(&self.gt, &[Greater])
            && check(&self.gte, &[Greater, Equal])
            && check(&self.lt, &[Less])
            && check(&self.lte, &[Less, Equal])
    }
}
