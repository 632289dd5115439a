pub mod clustering_key;
pub mod column_mapper;
pub mod full_key;
pub mod partition_key;
pub mod timestamp;
pub mod token;
pub mod value;
