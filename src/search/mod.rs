pub mod results;
pub mod sort;
