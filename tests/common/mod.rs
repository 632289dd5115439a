#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use parking_lot::Mutex;
use colindex::codec::bytes;
use colindex::codec::marshal::{KeyShape, ValueType};
use colindex::core::config::IndexConfig;
use colindex::core::error::Result;
use colindex::core::events::{EventSink, IndexEvent, NoopSink};
use colindex::row::column::Column;
use colindex::row::partitioner::{ByteOrderedPartitioner, Partitioner};
use colindex::row::schema::{ColumnDefinition, KeySchema};
use colindex::secondary::host::{Row, RowFetcher};
use colindex::secondary::per_column::{IndexContext, PerColumnIndex};

/// Primary store stand-in: partition key -> cells.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<Vec<u8>, Vec<Column>>>,
}

impl MemoryStore {
    pub fn put(&self, partition_key: &[u8], column: Column) {
        let mut rows = self.rows.lock();
        let cells = rows.entry(partition_key.to_vec()).or_default();
        cells.retain(|c| c.name != column.name);
        cells.push(column);
        cells.sort_by(|a, b| a.name.cmp(&b.name));
    }
}

impl RowFetcher for MemoryStore {
    fn fetch_row(&self, partition_key: &[u8], start: &[u8], finish: &[u8]) -> Result<Option<Row>> {
        let rows = self.rows.lock();
        let Some(cells) = rows.get(partition_key) else {
            return Ok(None);
        };
        let columns: Vec<Column> = cells
            .iter()
            .filter(|c| c.name.as_slice() >= start && c.name.as_slice() <= finish)
            .cloned()
            .collect();
        if columns.is_empty() {
            return Ok(None);
        }
        Ok(Some(Row::new(partition_key.to_vec(), columns)))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<IndexEvent>>,
}

impl EventSink for RecordingSink {
    fn emit(&self, event: IndexEvent) {
        self.events.lock().push(event);
    }
}

/// `posts(user text PRIMARY KEY (user, kind), body text, score bigint, price decimal)`
pub fn schema() -> KeySchema {
    KeySchema {
        key_shape: KeyShape::Simple(ValueType::Utf8),
        name_shape: KeyShape::Composite(vec![ValueType::Utf8, ValueType::Utf8]),
        columns: vec![
            ColumnDefinition::partition_key("user", ValueType::Utf8, 0),
            ColumnDefinition::clustering_key("kind", ValueType::Utf8, 0),
            ColumnDefinition::regular("body", ValueType::Utf8),
            ColumnDefinition::regular("score", ValueType::Long),
            ColumnDefinition::regular("price", ValueType::Decimal),
        ],
    }
}

pub fn cell_name(kind: &str, column: &str) -> Vec<u8> {
    bytes::build(&[kind.as_bytes(), column.as_bytes()]).unwrap()
}

pub fn cell(kind: &str, column: &str, value: &[u8], timestamp: i64) -> Column {
    Column::new(cell_name(kind, column), value.to_vec(), timestamp)
}

pub struct Fixture {
    pub config: IndexConfig,
    pub store: Arc<MemoryStore>,
    pub sink: Arc<dyn EventSink>,
}

impl Fixture {
    pub fn new(data_root: &Path) -> Self {
        Fixture {
            config: IndexConfig::with_data_root(data_root),
            store: Arc::new(MemoryStore::default()),
            sink: Arc::new(NoopSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn index(&self, column: &str) -> Result<PerColumnIndex> {
        self.index_with(column, Arc::new(ByteOrderedPartitioner))
    }

    pub fn index_with(&self, column: &str, partitioner: Arc<dyn Partitioner>) -> Result<PerColumnIndex> {
        let schema = schema();
        let definition = schema
            .column(column.as_bytes())
            .cloned()
            .unwrap_or_else(|| panic!("no column {}", column));
        PerColumnIndex::init(IndexContext {
            table: "posts".to_string(),
            schema,
            column: definition,
            partitioner,
            fetcher: self.store.clone(),
            config: self.config.clone(),
            sink: self.sink.clone(),
        })
    }

    /// Write to the store and mirror into the index, as the host write path does.
    pub fn write(&self, index: &PerColumnIndex, user: &str, column: Column) {
        self.store.put(user.as_bytes(), column.clone());
        index.insert(user.as_bytes(), &column).unwrap();
    }
}

/// `(user, kind)` of each row, in result order.
pub fn row_keys(rows: &[Row]) -> Vec<(String, String)> {
    rows.iter()
        .map(|row| {
            let name = &row.columns[0].name;
            let components = bytes::split(name, &schema().name_shape).unwrap();
            (
                String::from_utf8(row.partition_key.clone()).unwrap(),
                String::from_utf8(components[0].clone()).unwrap(),
            )
        })
        .collect()
}
