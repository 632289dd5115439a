use std::borrow::Cow;
use std::fmt;
use crate::codec::bytes;
use crate::codec::marshal::{KeyShape, TypedValue};
use crate::core::error::{Error, Result};
use crate::row::column::Column;
use crate::row::partitioner::{Partitioner, Token};
use crate::row::schema::{ColumnDefinition, ColumnRole, KeySchema};

/// A [`Column`] decorated with the partition key it belongs to and the schema that
/// explains its bytes.
pub struct DecoratedColumn<'a> {
    partition_key: Vec<u8>,
    column: Column,
    schema: &'a KeySchema,
    definition: &'a ColumnDefinition,
    partitioner: &'a dyn Partitioner,
}

impl<'a> DecoratedColumn<'a> {
    pub fn new(
        partition_key: Vec<u8>,
        column: Column,
        schema: &'a KeySchema,
        definition: &'a ColumnDefinition,
        partitioner: &'a dyn Partitioner,
    ) -> Self {
        DecoratedColumn {
            partition_key,
            column,
            schema,
            definition,
            partitioner,
        }
    }

    pub fn column(&self) -> &Column {
        &self.column
    }

    pub fn definition(&self) -> &ColumnDefinition {
        self.definition
    }

    pub fn role(&self) -> ColumnRole {
        self.definition.role
    }

    pub fn key_shape(&self) -> &KeyShape {
        &self.schema.key_shape
    }

    pub fn name_shape(&self) -> &KeyShape {
        &self.schema.name_shape
    }

    /// The storage engine row key.
    pub fn partition_key(&self) -> &[u8] {
        &self.partition_key
    }

    pub fn partition_key_text(&self) -> Result<String> {
        bytes::to_text(&self.partition_key, &self.schema.key_shape)
    }

    /// Full cell name, as the storage engine sees it.
    pub fn name(&self) -> &[u8] {
        &self.column.name
    }

    pub fn name_text(&self) -> Result<String> {
        bytes::to_text(&self.column.name, &self.schema.name_shape)
    }

    /// The cell name with its column-name component replaced by an empty component.
    /// Sorts before every cell of the same logical row, so it works as a slice start.
    pub fn clustering_key(&self) -> Result<Vec<u8>> {
        let mut components = bytes::split(&self.column.name, &self.schema.name_shape)?;
        if components.pop().is_none() {
            return Err(Error::decode("cell name has no components"));
        }
        components.push(Vec::new());
        bytes::build(&components)
    }

    /// The bytes the index is about: a key component for key columns, the cell value
    /// for regular ones.
    pub fn value(&self) -> Result<Cow<'_, [u8]>> {
        match self.definition.role {
            ColumnRole::PartitionKey => {
                let components = bytes::split(&self.partition_key, &self.schema.key_shape)?;
                Ok(Cow::Owned(self.component(components)?))
            }
            ColumnRole::ClusteringKey => {
                let components = bytes::split(&self.column.name, &self.schema.name_shape)?;
                Ok(Cow::Owned(self.component(components)?))
            }
            ColumnRole::Regular => Ok(Cow::Borrowed(&self.column.value)),
        }
    }

    fn component(&self, mut components: Vec<Vec<u8>>) -> Result<Vec<u8>> {
        let index = self.definition.component_index.unwrap_or(0);
        if index >= components.len() {
            return Err(Error::decode(format!(
                "key has {} components, column '{}' reads component {}",
                components.len(),
                self.definition.name_text(),
                index
            )));
        }
        Ok(components.swap_remove(index))
    }

    pub fn value_typed(&self) -> Result<TypedValue> {
        self.definition.validator.compose(&self.value()?)
    }

    pub fn timestamp(&self) -> i64 {
        self.column.timestamp
    }

    pub fn token(&self) -> Token {
        self.partitioner.token(&self.partition_key)
    }

    /// `partition key text : cell name text : timestamp`, unique per cell version.
    pub fn identifying_string(&self) -> Result<String> {
        Ok(format!(
            "{}:{}:{}",
            self.partition_key_text()?,
            self.name_text()?,
            self.column.timestamp
        ))
    }
}

impl fmt::Display for DecoratedColumn<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = self
            .partition_key_text()
            .unwrap_or_else(|_| bytes::to_hex(&self.partition_key));
        let name = self.name_text().unwrap_or_else(|_| bytes::to_hex(&self.column.name));
        let value = self
            .value_typed()
            .map(|v| v.to_string())
            .unwrap_or_else(|_| bytes::to_hex(&self.column.value));
        write!(
            f,
            "DecoratedColumn [partitionKey={}, name={}, value={}, timestamp={}]",
            key, name, value, self.column.timestamp
        )
    }
}
