use std::sync::Arc;
use crate::analysis::analyzer::Analyzer;
use crate::codec::marshal::{TypedValue, ValueType};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{Field, FieldOptions, FieldValue};
use crate::query::ast::{Query, RangeQuery};
use crate::query::parser::QueryParser;
use crate::row::decorated::DecoratedColumn;

pub const FIELD_NAME: &str = "value";

/// How column values of one type are written to and queried from the `value` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueEncoding {
    /// Analyzed text, queried through the query parser
    Text,
    /// 64-bit integer; timestamps become epoch millis
    Long,
    /// 32-bit integer; booleans become 0/1
    Int,
    Double,
    Float,
    /// Exact single-term string
    Keyword,
    /// No encoding exists; every document or query build fails
    Unsupported(ValueType),
}

impl ValueEncoding {
    pub fn for_type(value_type: ValueType) -> ValueEncoding {
        match value_type {
            ValueType::Ascii | ValueType::Utf8 => ValueEncoding::Text,
            ValueType::Long | ValueType::Counter | ValueType::Timestamp => ValueEncoding::Long,
            ValueType::Int32 | ValueType::Varint | ValueType::Boolean => ValueEncoding::Int,
            ValueType::Double => ValueEncoding::Double,
            ValueType::Float => ValueEncoding::Float,
            ValueType::Uuid | ValueType::TimeUuid | ValueType::Inet => ValueEncoding::Keyword,
            ValueType::Decimal | ValueType::Bytes => ValueEncoding::Unsupported(value_type),
        }
    }

    fn options(&self) -> FieldOptions {
        match self {
            ValueEncoding::Text => FieldOptions::TEXT,
            ValueEncoding::Keyword => FieldOptions::KEYWORD,
            _ => FieldOptions::NUMERIC,
        }
    }
}

/// The one type-sensitive mapper. The encoding is chosen once, when the column
/// is bound, and every call dispatches on it.
pub struct ValueMapper {
    validator: ValueType,
    encoding: ValueEncoding,
    parser: QueryParser,
}

impl ValueMapper {
    pub fn new(validator: ValueType, analyzer: Arc<Analyzer>) -> Self {
        ValueMapper {
            validator,
            encoding: ValueEncoding::for_type(validator),
            parser: QueryParser::new(FIELD_NAME, analyzer).with_leading_wildcard(true),
        }
    }

    pub fn field(&self, column: &DecoratedColumn<'_>) -> Result<Field> {
        self.check_supported()?;
        let value = self.encode(&column.value()?)?;
        Ok(Field::new(FIELD_NAME, value, self.encoding.options()))
    }

    /// Query matching documents whose value equals `bytes`. Numbers match a
    /// closed point range, text goes through the query parser, keywords match
    /// the exact term.
    pub fn query(&self, bytes: &[u8]) -> Result<Query> {
        self.check_supported()?;
        match self.encode(bytes)? {
            FieldValue::Str(text) if self.encoding == ValueEncoding::Text => self.parser.parse(&text),
            FieldValue::Str(text) => Ok(Query::term(FIELD_NAME, &text)),
            number => Ok(Query::Range(RangeQuery::point(FIELD_NAME, number))),
        }
    }

    fn check_supported(&self) -> Result<()> {
        match self.encoding {
            ValueEncoding::Unsupported(value_type) => Err(Error::unsupported(format!(
                "{:?} values cannot be indexed",
                value_type
            ))),
            _ => Ok(()),
        }
    }

    fn encode(&self, bytes: &[u8]) -> Result<FieldValue> {
        let typed = self.validator.compose(bytes)?;
        let value = match (self.encoding, typed) {
            (ValueEncoding::Text, TypedValue::Text(text)) => FieldValue::Str(text),
            (ValueEncoding::Long, TypedValue::Long(v)) => FieldValue::Long(v),
            (ValueEncoding::Long, TypedValue::Timestamp(ts)) => FieldValue::Long(ts.timestamp_millis()),
            (ValueEncoding::Int, TypedValue::Int(v)) => FieldValue::Int(v),
            (ValueEncoding::Int, TypedValue::Boolean(b)) => FieldValue::Int(b as i32),
            (ValueEncoding::Int, TypedValue::Varint(v)) => FieldValue::Int(
                i32::try_from(v).map_err(|_| Error::decode(format!("varint {} does not fit in 32 bits", v)))?,
            ),
            (ValueEncoding::Double, TypedValue::Double(v)) => FieldValue::Double(v),
            (ValueEncoding::Float, TypedValue::Float(v)) => FieldValue::Float(v),
            (ValueEncoding::Keyword, TypedValue::Uuid(id)) => FieldValue::Str(id.to_string()),
            (ValueEncoding::Keyword, TypedValue::Inet(ip)) => FieldValue::Str(ip.to_string()),
            (encoding, typed) => {
                return Err(Error::new(
                    ErrorKind::Internal,
                    format!("{:?} encoding cannot hold {:?}", encoding, typed),
                ))
            }
        };
        Ok(value)
    }
}
