pub mod checkpoint;
pub mod file_lock;
pub mod layout;
pub mod merge_policy;
pub mod segment;
pub mod segment_reader;
pub mod segment_writer;
pub mod wal;
