use crate::core::error::Result;
use crate::core::types::{Field, FieldOptions, FieldValue};
use crate::index::inverted::Term;
use crate::row::decorated::DecoratedColumn;

pub const FIELD_NAME: &str = "full_key";

/// Identity of a cell version. Indexed as a single term so updates and deletes
/// can address the document; never stored.
#[derive(Debug, Default, Clone, Copy)]
pub struct FullKeyMapper;

impl FullKeyMapper {
    pub fn field(&self, column: &DecoratedColumn<'_>) -> Result<Field> {
        Ok(Field::new(
            FIELD_NAME,
            FieldValue::Str(column.identifying_string()?),
            FieldOptions::KEYWORD,
        ))
    }

    pub fn term(&self, column: &DecoratedColumn<'_>) -> Result<Term> {
        Ok(Term::new(FIELD_NAME, &column.identifying_string()?))
    }
}
