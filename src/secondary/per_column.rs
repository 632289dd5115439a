use std::sync::Arc;
use tracing::{debug, info};
use crate::analysis::analyzer::Analyzer;
use crate::codec::bytes;
use crate::core::config::IndexConfig;
use crate::core::error::Result;
use crate::core::events::EventSink;
use crate::core::index::{IndexState, SearchIndex};
use crate::mapping::column_mapper::ColumnMapper;
use crate::row::column::Column;
use crate::row::decorated::DecoratedColumn;
use crate::row::partitioner::Partitioner;
use crate::row::schema::{ColumnDefinition, ColumnRole, KeySchema};
use crate::secondary::host::{IndexExpression, Row, RowFetcher};
use crate::secondary::searcher::ColumnIndexSearcher;

/// Everything the host hands over when it creates an index on a column.
pub struct IndexContext {
    pub table: String,
    pub schema: KeySchema,
    pub column: ColumnDefinition,
    pub partitioner: Arc<dyn Partitioner>,
    pub fetcher: Arc<dyn RowFetcher>,
    pub config: IndexConfig,
    pub sink: Arc<dyn EventSink>,
}

/// Full-text index of one column of a table. The host calls it from its write
/// path and its query path; a failed index write is reported back and the
/// store's own write stands.
pub struct PerColumnIndex {
    table: String,
    index_name: String,
    schema: KeySchema,
    definition: ColumnDefinition,
    partitioner: Arc<dyn Partitioner>,
    mapper: Arc<ColumnMapper>,
    index: Arc<SearchIndex>,
    searcher: ColumnIndexSearcher,
}

impl PerColumnIndex {
    pub fn init(context: IndexContext) -> Result<Self> {
        let IndexContext {
            table,
            schema,
            column,
            partitioner,
            fetcher,
            config,
            sink,
        } = context;

        schema.validate(&column)?;
        let index_name = column
            .index_name
            .clone()
            .unwrap_or_else(|| format!("{}_{}_idx", table, column.name_text()));

        let path = config.index_path(&table, &index_name);
        let mapper = Arc::new(ColumnMapper::new(&column, Arc::new(Analyzer::english())));
        let index = Arc::new(SearchIndex::open(&path, &config, sink)?);

        // With no regular columns the slice closes on the empty column name
        let last_column_name = schema.last_regular_column_name().unwrap_or_default().to_vec();
        let searcher = ColumnIndexSearcher::new(
            column.name.clone(),
            mapper.clone(),
            index.clone(),
            fetcher,
            schema.name_shape.clone(),
            last_column_name,
            config.search_result_cap,
        );

        info!(table = %table, column = %column.name_text(), index = %index_name, path = %path.display(), "column index initialized");

        Ok(PerColumnIndex {
            table,
            index_name,
            schema,
            definition: column,
            partitioner,
            mapper,
            index,
            searcher,
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn column(&self) -> &ColumnDefinition {
        &self.definition
    }

    pub fn search_index(&self) -> &SearchIndex {
        &self.index
    }

    pub fn searcher(&self) -> &ColumnIndexSearcher {
        &self.searcher
    }

    /// Whether cells named `cell_name` feed this index. Row markers (empty
    /// column component) belong to key column indexes.
    pub fn indexes(&self, cell_name: &[u8]) -> Result<bool> {
        let components = bytes::split(cell_name, &self.schema.name_shape)?;
        Ok(match components.last() {
            Some(last) if last.is_empty() => self.definition.role != ColumnRole::Regular,
            Some(last) => *last == self.definition.name,
            None => false,
        })
    }

    pub fn insert(&self, partition_key: &[u8], column: &Column) -> Result<()> {
        let decorated = self.decorate(partition_key, column);
        let document = self.mapper.document(&decorated)?;
        self.index.insert(document)?;
        debug!(index = %self.index_name, column = %decorated, "inserted column");
        Ok(())
    }

    /// Replaces the document of the same cell version.
    pub fn update(&self, partition_key: &[u8], column: &Column) -> Result<()> {
        let decorated = self.decorate(partition_key, column);
        let term = self.mapper.term(&decorated)?;
        let document = self.mapper.document(&decorated)?;
        self.index.update(term, document)?;
        debug!(index = %self.index_name, column = %decorated, "updated column");
        Ok(())
    }

    pub fn delete(&self, partition_key: &[u8], column: &Column) -> Result<()> {
        let decorated = self.decorate(partition_key, column);
        let term = self.mapper.term(&decorated)?;
        self.index.delete_term(term)?;
        debug!(index = %self.index_name, column = %decorated, "deleted column");
        Ok(())
    }

    pub fn search(&self, clause: &[IndexExpression]) -> Result<Vec<Row>> {
        self.searcher.search(clause)
    }

    pub fn is_indexing(&self, clause: &[IndexExpression]) -> bool {
        self.searcher.is_indexing(clause)
    }

    pub fn commit(&self) -> Result<()> {
        self.index.commit()?;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        info!(index = %self.index_name, "reloading");
        self.commit()
    }

    pub fn force_blocking_flush(&self) -> Result<()> {
        info!(index = %self.index_name, "flushing");
        self.commit()
    }

    /// Drops every document written at or before `truncated_at` and commits.
    pub fn truncate_blocking(&self, truncated_at: i64) -> Result<()> {
        info!(index = %self.index_name, truncated_at, "truncating");
        self.index.delete_query(self.mapper.query_before(truncated_at))?;
        self.commit()
    }

    /// Release the index without deleting it. No-op once closed.
    pub fn invalidate(&self) -> Result<()> {
        info!(index = %self.index_name, "invalidating");
        if self.index.state() == IndexState::Open {
            self.index.close()?;
        }
        Ok(())
    }

    pub fn remove_index(&self) -> Result<()> {
        info!(table = %self.table, index = %self.index_name, "removing index");
        self.index.remove_index()
    }

    /// Bytes held by buffered, not yet flushed documents.
    pub fn live_size(&self) -> u64 {
        self.index.ram_size_bytes()
    }

    pub fn estimated_size(&self) -> Result<u64> {
        self.index.estimated_size()
    }

    fn decorate<'a>(&'a self, partition_key: &[u8], column: &Column) -> DecoratedColumn<'a> {
        DecoratedColumn::new(
            partition_key.to_vec(),
            column.clone(),
            &self.schema,
            &self.definition,
            self.partitioner.as_ref(),
        )
    }
}
