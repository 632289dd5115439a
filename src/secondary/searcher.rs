use std::sync::Arc;
use tracing::debug;
use crate::codec::bytes;
use crate::codec::marshal::KeyShape;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::index::SearchIndex;
use crate::mapping::column_mapper::ColumnMapper;
use crate::secondary::host::{IndexExpression, Operator, Row, RowFetcher};

/// Answers host queries for one indexed column: picks the predicate this index
/// can serve, searches, and resolves every hit back into a store row.
pub struct ColumnIndexSearcher {
    column: Vec<u8>,
    mapper: Arc<ColumnMapper>,
    index: Arc<SearchIndex>,
    fetcher: Arc<dyn RowFetcher>,
    name_shape: KeyShape,
    last_column_name: Vec<u8>,
    result_cap: usize,
}

impl ColumnIndexSearcher {
    pub fn new(
        column: Vec<u8>,
        mapper: Arc<ColumnMapper>,
        index: Arc<SearchIndex>,
        fetcher: Arc<dyn RowFetcher>,
        name_shape: KeyShape,
        last_column_name: Vec<u8>,
        result_cap: usize,
    ) -> Self {
        ColumnIndexSearcher {
            column,
            mapper,
            index,
            fetcher,
            name_shape,
            last_column_name,
            result_cap,
        }
    }

    /// Rows matching the indexing predicate of `clause`, in token then
    /// clustering order, at most `result_cap` of them.
    pub fn search(&self, clause: &[IndexExpression]) -> Result<Vec<Row>> {
        let expression = self.select_indexing_predicate(clause).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidArgument,
                format!(
                    "no equality predicate on column '{}'",
                    String::from_utf8_lossy(&self.column)
                ),
            )
        })?;

        let query = self.mapper.query(&expression.value)?;
        let documents = self.index.search(&query, self.result_cap, Some(&self.mapper.sort()))?;

        let mut rows = Vec::with_capacity(documents.len());
        for document in &documents {
            let partition_key = self.mapper.partition_key(document)?;
            let start = self.mapper.clustering_key(document)?;
            let finish = self.slice_finish(&start)?;
            match self.fetcher.fetch_row(&partition_key, &start, &finish)? {
                Some(row) => rows.push(row),
                None => debug!(
                    partition_key = %bytes::to_hex(&partition_key),
                    "indexed row no longer in the store"
                ),
            }
        }
        Ok(rows)
    }

    pub fn is_indexing(&self, clause: &[IndexExpression]) -> bool {
        self.select_indexing_predicate(clause).is_some()
    }

    /// First equality predicate on this column.
    pub fn select_indexing_predicate<'c>(&self, clause: &'c [IndexExpression]) -> Option<&'c IndexExpression> {
        clause
            .iter()
            .find(|e| e.operator == Operator::Eq && e.column == self.column)
    }

    // Same clustering prefix, closed by the greatest column name of the row
    fn slice_finish(&self, clustering_key: &[u8]) -> Result<Vec<u8>> {
        let mut components = bytes::split(clustering_key, &self.name_shape)?;
        if let Some(last) = components.last_mut() {
            *last = self.last_column_name.clone();
        }
        bytes::build(&components)
    }
}
