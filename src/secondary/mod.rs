pub mod host;
pub mod per_column;
pub mod searcher;
