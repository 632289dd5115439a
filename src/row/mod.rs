pub mod column;
pub mod decorated;
pub mod partitioner;
pub mod schema;
