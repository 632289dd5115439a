use serde::{Serialize, Deserialize};

/// A single cell write event as the store hands it over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Full cell name: clustering components plus the column name, composite encoded.
    pub name: Vec<u8>,
    pub value: Vec<u8>,
    pub timestamp: i64,
}

impl Column {
    pub fn new(name: Vec<u8>, value: Vec<u8>, timestamp: i64) -> Self {
        Column { name, value, timestamp }
    }
}
