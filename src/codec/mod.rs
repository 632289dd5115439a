pub mod bytes;
pub mod marshal;
