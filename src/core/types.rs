use std::cmp::Ordering;
use std::fmt;
use serde::{Serialize, Deserialize};

/// Position of a document inside its segment.
pub type DocOrdinal = u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Str(String),
    Long(i64),
    Int(i32),
    Double(f64),
    Float(f32),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            FieldValue::Long(v) => Some(*v),
            FieldValue::Int(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, FieldValue::Str(_))
    }

    /// Orders two numeric values. Integers compare exactly, anything involving a
    /// floating point value compares as `f64`. Strings never compare here.
    pub fn cmp_numeric(&self, other: &FieldValue) -> Option<Ordering> {
        match (self.as_long(), other.as_long()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => self.as_f64()?.partial_cmp(&other.as_f64()?),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Long(v) => Some(*v as f64),
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Double(v) => Some(*v),
            FieldValue::Float(v) => Some(*v as f64),
            FieldValue::Str(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(s) => f.write_str(s),
            FieldValue::Long(v) => write!(f, "{}", v),
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Double(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// How a field is written to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOptions {
    pub indexed: bool,
    pub stored: bool,
    pub tokenized: bool,
}

impl FieldOptions {
    /// Exact single-term string, not retrievable.
    pub const KEYWORD: FieldOptions = FieldOptions { indexed: true, stored: false, tokenized: false };
    /// Exact single-term string, retrievable from hits.
    pub const KEYWORD_STORED: FieldOptions = FieldOptions { indexed: true, stored: true, tokenized: false };
    /// Analyzed full text.
    pub const TEXT: FieldOptions = FieldOptions { indexed: true, stored: false, tokenized: true };
    /// Numeric value indexed for range queries.
    pub const NUMERIC: FieldOptions = FieldOptions { indexed: true, stored: false, tokenized: false };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
    pub options: FieldOptions,
}

impl Field {
    pub fn new(name: &str, value: FieldValue, options: FieldOptions) -> Self {
        Field {
            name: name.to_string(),
            value,
            options,
        }
    }
}

/// A search document. Built once per write event and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    pub fields: Vec<Field>,
}

impl Document {
    pub fn new() -> Self {
        Document { fields: Vec::new() }
    }

    pub fn add(&mut self, field: Field) {
        self.fields.push(field);
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|f| f.value.as_str())
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Rough heap footprint, used for RAM accounting of buffered documents.
    pub fn approx_bytes(&self) -> usize {
        self.fields
            .iter()
            .map(|f| {
                let value = match &f.value {
                    FieldValue::Str(s) => s.len(),
                    _ => 8,
                };
                std::mem::size_of::<Field>() + f.name.len() + value
            })
            .sum()
    }

    /// The view a searcher hands back: stored fields only.
    pub fn stored_only(&self) -> Document {
        Document {
            fields: self.fields.iter().filter(|f| f.options.stored).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_comparison_mixes_widths() {
        assert_eq!(FieldValue::Long(3).cmp_numeric(&FieldValue::Int(3)), Some(Ordering::Equal));
        assert_eq!(FieldValue::Float(1.5).cmp_numeric(&FieldValue::Double(2.0)), Some(Ordering::Less));
        assert_eq!(FieldValue::Str("1".into()).cmp_numeric(&FieldValue::Long(1)), None);
        assert_eq!(
            FieldValue::Long(i64::MAX).cmp_numeric(&FieldValue::Long(i64::MAX - 1)),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn stored_only_drops_index_only_fields() {
        let mut doc = Document::new();
        doc.add(Field::new("a", FieldValue::Str("x".into()), FieldOptions::KEYWORD_STORED));
        doc.add(Field::new("b", FieldValue::Long(1), FieldOptions::NUMERIC));
        let stored = doc.stored_only();
        assert_eq!(stored.field_names().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(stored.get_str("a"), Some("x"));
    }
}
