pub mod core;
pub mod codec;
pub mod row;
pub mod mapping;
pub mod secondary;
pub mod storage;
pub mod analysis;
pub mod index;
pub mod search;
pub mod query;
pub mod writer;
pub mod reader;

// ┌──────────────────────────────────────────────────────────────────────────────┐
// │                          COLINDEX ARCHITECTURE                               │
// └──────────────────────────────────────────────────────────────────────────────┘
//
//   host write path                                   host query path
//   (partition key, Column)                           [IndexExpression]
//           │                                                 │
//           ▼                                                 ▼
// ┌──────────────────────┐                       ┌──────────────────────────┐
// │ secondary::          │                       │ secondary::              │
// │   PerColumnIndex     │──────────────────────▶│   ColumnIndexSearcher    │
// └──────────┬───────────┘                       └────────────┬─────────────┘
//            │ row::DecoratedColumn                           │ value bytes
//            ▼                                                ▼
// ┌──────────────────────────────────────────────────────────────────────────────┐
// │ mapping::ColumnMapper                                                        │
// │   full_key │ token │ partition_key │ clustering_key │ value │ timestamp      │
// │   (codec::bytes for composites and hex, codec::marshal for typed values)    │
// └──────────────────────────────────┬───────────────────────────────────────────┘
//                                    │ Document / Term / Query / Sort
//                                    ▼
// ┌──────────────────────────────────────────────────────────────────────────────┐
// │ core::index::SearchIndex                                                     │
// │  ┌────────────────────┐   ┌──────────────────────┐   ┌────────────────────┐  │
// │  │ writer::IndexWriter│   │ reader::             │   │ reader::           │  │
// │  │  buffer + deletes  │──▶│   SearcherManager    │◀──│   ReopenThread     │  │
// │  │  generations       │   │  Arc<Snapshot> pool  │   │  max/min stale     │  │
// │  └─────────┬──────────┘   └──────────┬───────────┘   └────────────────────┘  │
// │            │                         │ query::matcher over index::inverted   │
// │            ▼                         ▼ search::results top-N collector       │
// │  ┌──────────────────────────────────────────────────────────────────────┐    │
// │  │ storage: segments/*.seg │ wal/wal_*.log │ meta/checkpoint.bin │ .lock │    │
// │  └──────────────────────────────────────────────────────────────────────┘    │
// └──────────────────────────────────────────────────────────────────────────────┘
