use crate::codec::bytes;
use crate::core::error::Result;
use crate::core::types::{Document, Field, FieldOptions, FieldValue};
use crate::mapping::partition_key::stored_hex;
use crate::row::decorated::DecoratedColumn;
use crate::search::sort::SortField;

pub const FIELD_NAME: &str = "clustering_key";

/// Cell name with its column component erased. Stored, and sortable because
/// hex keeps the composite byte order.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClusteringKeyMapper;

impl ClusteringKeyMapper {
    pub fn field(&self, column: &DecoratedColumn<'_>) -> Result<Field> {
        let clustering_key = column.clustering_key()?;
        Ok(Field::new(
            FIELD_NAME,
            FieldValue::Str(bytes::to_hex(&clustering_key)),
            FieldOptions::KEYWORD_STORED,
        ))
    }

    pub fn bytes(&self, document: &Document) -> Result<Vec<u8>> {
        stored_hex(document, FIELD_NAME)
    }

    pub fn sort(&self) -> SortField {
        SortField::new(FIELD_NAME)
    }
}
