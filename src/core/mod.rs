pub mod types;
pub mod config;
pub mod error;
pub mod events;
pub mod index;
pub mod stats;
