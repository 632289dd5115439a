use crate::codec::bytes;
use crate::core::types::{Field, FieldOptions, FieldValue};
use crate::row::decorated::DecoratedColumn;
use crate::search::sort::SortField;

pub const FIELD_NAME: &str = "token";

/// Partitioner token of the row, hex encoded so that string order is token order.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenMapper;

impl TokenMapper {
    pub fn field(&self, column: &DecoratedColumn<'_>) -> Field {
        let token = column.token();
        Field::new(
            FIELD_NAME,
            FieldValue::Str(bytes::to_hex(token.as_bytes())),
            FieldOptions::KEYWORD_STORED,
        )
    }

    pub fn sort(&self) -> SortField {
        SortField::new(FIELD_NAME)
    }
}
