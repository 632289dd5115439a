use std::sync::Arc;
use crate::analysis::analyzer::Analyzer;
use crate::core::error::Result;
use crate::core::types::Document;
use crate::index::inverted::Term;
use crate::mapping::clustering_key::ClusteringKeyMapper;
use crate::mapping::full_key::FullKeyMapper;
use crate::mapping::partition_key::PartitionKeyMapper;
use crate::mapping::timestamp::TimestampMapper;
use crate::mapping::token::TokenMapper;
use crate::mapping::value::ValueMapper;
use crate::query::ast::Query;
use crate::row::decorated::DecoratedColumn;
use crate::row::schema::ColumnDefinition;
use crate::search::sort::Sort;

/// Turns decorated columns of one indexed column into search documents, and
/// predicate values into queries over those documents.
pub struct ColumnMapper {
    full_key: FullKeyMapper,
    token: TokenMapper,
    partition_key: PartitionKeyMapper,
    clustering_key: ClusteringKeyMapper,
    value: ValueMapper,
    timestamp: TimestampMapper,
}

impl ColumnMapper {
    pub fn new(definition: &ColumnDefinition, analyzer: Arc<Analyzer>) -> Self {
        ColumnMapper {
            full_key: FullKeyMapper,
            token: TokenMapper,
            partition_key: PartitionKeyMapper,
            clustering_key: ClusteringKeyMapper,
            value: ValueMapper::new(definition.validator, analyzer),
            timestamp: TimestampMapper,
        }
    }

    /// All six fields or an error; a document is never built without its value.
    pub fn document(&self, column: &DecoratedColumn<'_>) -> Result<Document> {
        let mut document = Document::new();
        document.add(self.full_key.field(column)?);
        document.add(self.token.field(column));
        document.add(self.partition_key.field(column));
        document.add(self.clustering_key.field(column)?);
        document.add(self.value.field(column)?);
        document.add(self.timestamp.field(column));
        Ok(document)
    }

    /// Identity term of the cell version.
    pub fn term(&self, column: &DecoratedColumn<'_>) -> Result<Term> {
        self.full_key.term(column)
    }

    pub fn query(&self, value: &[u8]) -> Result<Query> {
        self.value.query(value)
    }

    /// Documents written at or before `timestamp`.
    pub fn query_before(&self, timestamp: i64) -> Query {
        self.timestamp.query(None, Some(timestamp), false, true)
    }

    /// Token order, then clustering order: the store's own row order.
    pub fn sort(&self) -> Sort {
        Sort::by(self.token.sort()).then(self.clustering_key.sort())
    }

    pub fn partition_key(&self, document: &Document) -> Result<Vec<u8>> {
        self.partition_key.bytes(document)
    }

    pub fn clustering_key(&self, document: &Document) -> Result<Vec<u8>> {
        self.clustering_key.bytes(document)
    }
}
