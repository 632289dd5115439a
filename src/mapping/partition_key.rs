use crate::codec::bytes;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{Document, Field, FieldOptions, FieldValue};
use crate::row::decorated::DecoratedColumn;

pub const FIELD_NAME: &str = "partition_key";

/// Raw partition key, hex encoded and stored so hits can be resolved to rows.
#[derive(Debug, Default, Clone, Copy)]
pub struct PartitionKeyMapper;

impl PartitionKeyMapper {
    pub fn field(&self, column: &DecoratedColumn<'_>) -> Field {
        Field::new(
            FIELD_NAME,
            FieldValue::Str(bytes::to_hex(column.partition_key())),
            FieldOptions::KEYWORD_STORED,
        )
    }

    pub fn bytes(&self, document: &Document) -> Result<Vec<u8>> {
        stored_hex(document, FIELD_NAME)
    }
}

/// Decodes a stored hex field back into its bytes.
pub(crate) fn stored_hex(document: &Document, field: &str) -> Result<Vec<u8>> {
    let text = document
        .get_str(field)
        .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("document has no stored '{}' field", field)))?;
    bytes::from_hex(text)
}
