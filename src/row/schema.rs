use serde::{Serialize, Deserialize};
use crate::codec::marshal::{KeyShape, ValueType};
use crate::core::error::{Error, ErrorKind, Result};

/// What part of the store's row a column definition describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnRole {
    PartitionKey,
    ClusteringKey,
    Regular,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Raw column name, as it appears as the last component of a cell name.
    pub name: Vec<u8>,
    pub validator: ValueType,
    pub role: ColumnRole,
    /// Component position inside the partition key or cell name, for key roles.
    pub component_index: Option<usize>,
    pub index_name: Option<String>,
}

impl ColumnDefinition {
    pub fn regular(name: &str, validator: ValueType) -> Self {
        ColumnDefinition {
            name: name.as_bytes().to_vec(),
            validator,
            role: ColumnRole::Regular,
            component_index: None,
            index_name: None,
        }
    }

    pub fn partition_key(name: &str, validator: ValueType, component_index: usize) -> Self {
        ColumnDefinition {
            name: name.as_bytes().to_vec(),
            validator,
            role: ColumnRole::PartitionKey,
            component_index: Some(component_index),
            index_name: None,
        }
    }

    pub fn clustering_key(name: &str, validator: ValueType, component_index: usize) -> Self {
        ColumnDefinition {
            name: name.as_bytes().to_vec(),
            validator,
            role: ColumnRole::ClusteringKey,
            component_index: Some(component_index),
            index_name: None,
        }
    }

    pub fn with_index_name(mut self, index_name: &str) -> Self {
        self.index_name = Some(index_name.to_string());
        self
    }

    pub fn name_text(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }
}

/// Key layout of a table, supplied by the host when an index is initialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySchema {
    pub key_shape: KeyShape,
    /// Cell name layout: clustering components followed by the column name.
    pub name_shape: KeyShape,
    pub columns: Vec<ColumnDefinition>,
}

impl KeySchema {
    pub fn column(&self, name: &[u8]) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn regular_columns(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.columns.iter().filter(|c| c.role == ColumnRole::Regular)
    }

    /// Greatest regular column name in byte order; closes a slice over one logical row.
    pub fn last_regular_column_name(&self) -> Option<&[u8]> {
        self.regular_columns().map(|c| c.name.as_slice()).max()
    }

    /// Checks that `column` agrees with the key layout. Run once at index init so that
    /// no per-row decoration can hit a role/validator mismatch.
    pub fn validate(&self, column: &ColumnDefinition) -> Result<()> {
        let KeyShape::Composite(name_types) = &self.name_shape else {
            return Err(config_error("cell names must use a composite shape"));
        };
        if name_types.is_empty() {
            return Err(config_error("composite cell name shape has no components"));
        }

        match column.role {
            ColumnRole::Regular => Ok(()),
            ColumnRole::PartitionKey => {
                let index = column
                    .component_index
                    .ok_or_else(|| config_error("partition key column without component index"))?;
                match self.key_shape.component_type(index) {
                    Some(t) if t == column.validator => Ok(()),
                    Some(t) => Err(config_error(&format!(
                        "partition key component {} is {:?}, column declares {:?}",
                        index, t, column.validator
                    ))),
                    None => Err(config_error(&format!("partition key has no component {}", index))),
                }
            }
            ColumnRole::ClusteringKey => {
                let index = column
                    .component_index
                    .ok_or_else(|| config_error("clustering key column without component index"))?;
                // the last name component is the column name, never a clustering column
                if index + 1 >= name_types.len() {
                    return Err(config_error(&format!("cell name has no clustering component {}", index)));
                }
                if name_types[index] != column.validator {
                    return Err(config_error(&format!(
                        "clustering component {} is {:?}, column declares {:?}",
                        index, name_types[index], column.validator
                    )));
                }
                Ok(())
            }
        }
    }
}

fn config_error(context: &str) -> Error {
    Error::new(ErrorKind::InvalidArgument, context)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> KeySchema {
        KeySchema {
            key_shape: KeyShape::Composite(vec![ValueType::Utf8, ValueType::Int32]),
            name_shape: KeyShape::Composite(vec![ValueType::Timestamp, ValueType::Utf8]),
            columns: vec![
                ColumnDefinition::partition_key("user", ValueType::Utf8, 0),
                ColumnDefinition::partition_key("bucket", ValueType::Int32, 1),
                ColumnDefinition::clustering_key("at", ValueType::Timestamp, 0),
                ColumnDefinition::regular("body", ValueType::Utf8),
                ColumnDefinition::regular("score", ValueType::Long),
            ],
        }
    }

    #[test]
    fn schema_columns_validate() {
        let schema = schema();
        for column in &schema.columns {
            schema.validate(column).unwrap();
        }
        assert_eq!(schema.last_regular_column_name(), Some(b"score".as_slice()));
    }

    #[test]
    fn mismatched_validator_is_config_error() {
        let schema = schema();
        let bad = ColumnDefinition::partition_key("bucket", ValueType::Long, 1);
        assert_eq!(schema.validate(&bad).unwrap_err().kind, ErrorKind::InvalidArgument);
        let bad = ColumnDefinition::clustering_key("at", ValueType::Utf8, 1);
        assert_eq!(schema.validate(&bad).unwrap_err().kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn simple_cell_names_are_rejected() {
        let mut schema = schema();
        schema.name_shape = KeyShape::Simple(ValueType::Utf8);
        let column = ColumnDefinition::regular("body", ValueType::Utf8);
        assert_eq!(schema.validate(&column).unwrap_err().kind, ErrorKind::InvalidArgument);
    }
}
