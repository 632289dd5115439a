pub mod reopen;
pub mod searcher_manager;
pub mod snapshot;
