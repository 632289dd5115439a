use std::fmt;
use serde::{Deserialize, Serialize};
use crate::core::error::Result;
use crate::row::column::Column;

/// A row of the primary store, as the host returns it for an index hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub partition_key: Vec<u8>,
    pub columns: Vec<Column>,
}

impl Row {
    pub fn new(partition_key: Vec<u8>, columns: Vec<Column>) -> Self {
        Row { partition_key, columns }
    }
}

/// Reads rows back from the primary store.
pub trait RowFetcher: Send + Sync {
    /// Cells of partition `partition_key` whose names fall in `start..=finish`.
    /// `None` when the store no longer holds anything there.
    fn fetch_row(&self, partition_key: &[u8], start: &[u8], finish: &[u8]) -> Result<Option<Row>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Eq => "=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
        };
        f.write_str(symbol)
    }
}

/// One predicate of a host query: `column <operator> value`, value in store bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexExpression {
    pub column: Vec<u8>,
    pub operator: Operator,
    pub value: Vec<u8>,
}

impl IndexExpression {
    pub fn new(column: &[u8], operator: Operator, value: Vec<u8>) -> Self {
        IndexExpression {
            column: column.to_vec(),
            operator,
            value,
        }
    }

    pub fn equal_to(column: &str, value: Vec<u8>) -> Self {
        IndexExpression::new(column.as_bytes(), Operator::Eq, value)
    }
}
