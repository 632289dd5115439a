use std::cmp::Ordering;
use serde::{Deserialize, Serialize};
use crate::core::types::{Document, FieldValue};

/// One sort criterion over a stored field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    pub reverse: bool,
}

impl SortField {
    pub fn new(field: &str) -> Self {
        SortField {
            field: field.to_string(),
            reverse: false,
        }
    }

    pub fn reversed(mut self) -> Self {
        self.reverse = !self.reverse;
        self
    }
}

/// Lexicographic sort over several stored fields. Ties keep index order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sort {
    pub fields: Vec<SortField>,
}

/// Values of the sort fields of one hit, in sort field order.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey(pub Vec<Option<FieldValue>>);

impl Sort {
    pub fn new(fields: Vec<SortField>) -> Self {
        Sort { fields }
    }

    pub fn by(field: SortField) -> Self {
        Sort { fields: vec![field] }
    }

    pub fn then(mut self, field: SortField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn key(&self, document: &Document) -> SortKey {
        SortKey(
            self.fields
                .iter()
                .map(|f| document.get(&f.field).map(|field| field.value.clone()))
                .collect(),
        )
    }

    pub fn compare(&self, a: &SortKey, b: &SortKey) -> Ordering {
        for ((field, x), y) in self.fields.iter().zip(&a.0).zip(&b.0) {
            let ordering = compare_values(x.as_ref(), y.as_ref());
            let ordering = if field.reverse { ordering.reverse() } else { ordering };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

// Missing values first, then numbers, then strings
fn compare_values(a: Option<&FieldValue>, b: Option<&FieldValue>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(FieldValue::Str(x)), Some(FieldValue::Str(y))) => x.cmp(y),
        (Some(FieldValue::Str(_)), Some(_)) => Ordering::Greater,
        (Some(_), Some(FieldValue::Str(_))) => Ordering::Less,
        (Some(x), Some(y)) => x.cmp_numeric(y).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Field, FieldOptions};

    fn doc(token: &str, ck: Option<&str>) -> Document {
        let mut doc = Document::new();
        doc.add(Field::new("token", FieldValue::Str(token.into()), FieldOptions::KEYWORD_STORED));
        if let Some(ck) = ck {
            doc.add(Field::new("clustering_key", FieldValue::Str(ck.into()), FieldOptions::KEYWORD_STORED));
        }
        doc
    }

    #[test]
    fn compares_fields_in_order() {
        let sort = Sort::by(SortField::new("token")).then(SortField::new("clustering_key"));
        let a = sort.key(&doc("01", Some("b")));
        let b = sort.key(&doc("01", Some("c")));
        let c = sort.key(&doc("02", Some("a")));
        let missing = sort.key(&doc("01", None));

        assert_eq!(sort.compare(&a, &b), Ordering::Less);
        assert_eq!(sort.compare(&b, &c), Ordering::Less);
        assert_eq!(sort.compare(&missing, &a), Ordering::Less);
        assert_eq!(sort.compare(&a, &a), Ordering::Equal);

        let reversed = Sort::by(SortField::new("token").reversed());
        assert_eq!(reversed.compare(&reversed.key(&doc("01", None)), &reversed.key(&doc("02", None))), Ordering::Greater);
    }
}
