use crate::core::types::{Document, Field, FieldOptions, FieldValue};
use crate::query::ast::{Query, RangeQuery};
use crate::row::decorated::DecoratedColumn;

pub const FIELD_NAME: &str = "timestamp";

/// Write timestamp of the cell, indexed for range deletes.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimestampMapper;

impl TimestampMapper {
    pub fn field(&self, column: &DecoratedColumn<'_>) -> Field {
        Field::new(FIELD_NAME, FieldValue::Long(column.timestamp()), FieldOptions::NUMERIC)
    }

    pub fn point(&self, timestamp: i64) -> Query {
        Query::Range(RangeQuery::point(FIELD_NAME, FieldValue::Long(timestamp)))
    }

    /// A `None` bound leaves that end open.
    pub fn query(
        &self,
        min: Option<i64>,
        max: Option<i64>,
        min_inclusive: bool,
        max_inclusive: bool,
    ) -> Query {
        Query::Range(RangeQuery::new(
            FIELD_NAME,
            min.map(FieldValue::Long),
            max.map(FieldValue::Long),
            min_inclusive,
            max_inclusive,
        ))
    }

    /// The timestamp carried by `document`. Searcher hits do not carry it, since
    /// the field is not stored.
    pub fn value(&self, document: &Document) -> Option<i64> {
        document.get(FIELD_NAME).and_then(|f| f.value.as_long())
    }
}
