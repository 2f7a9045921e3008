//! Cached result schema and its Arrow form.

use crate::error::ConversionError;
use crate::transport::messages::{FieldSchema, ResultsMetadata};
use crate::types::{ColumnType, TypeMapper, Value};
use arrow_schema::{Field, Schema};
use std::collections::HashMap;

/// A decoded row keyed by column name.
pub type Row = HashMap<String, Value>;

/// Ordered `(name, declared type)` pairs describing a result.
///
/// Declared types stay as reported by the server; an unknown type only
/// fails when a value of that column is converted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSchema {
    fields: Vec<FieldSchema>,
}

impl ColumnSchema {
    /// Create a schema from field schemas.
    pub fn new(fields: Vec<FieldSchema>) -> Self {
        Self { fields }
    }

    /// Column names in result order.
    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Declared type names in result order.
    pub fn declared_types(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.type_name.as_str()).collect()
    }

    /// Field schemas in result order.
    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse every declared type.
    ///
    /// # Errors
    /// Returns `ConversionError::UnsupportedColumnType` for the first unknown type.
    pub fn column_types(&self) -> Result<Vec<ColumnType>, ConversionError> {
        self.fields.iter().map(|f| f.type_name.parse()).collect()
    }

    /// Convert one row of raw fields into a mapping by column name.
    ///
    /// # Errors
    /// Returns `ConversionError::SchemaMismatch` when the field count differs
    /// from the column count, or the first conversion failure.
    pub fn decode_row(&self, fields: &[String], into: &mut Row) -> Result<(), ConversionError> {
        if fields.len() != self.fields.len() {
            return Err(ConversionError::SchemaMismatch(format!(
                "row has {} fields but schema has {} columns",
                fields.len(),
                self.fields.len()
            )));
        }

        for (raw, field) in fields.iter().zip(&self.fields) {
            let value = TypeMapper::convert(raw, &field.type_name)?;
            into.insert(field.name.clone(), value);
        }

        Ok(())
    }

    /// Build the Arrow schema for this result.
    ///
    /// # Errors
    /// Returns `ConversionError` if any column type cannot be mapped
    pub fn to_arrow_schema(&self) -> Result<Schema, ConversionError> {
        let fields: Result<Vec<Field>, ConversionError> = self
            .fields
            .iter()
            .map(|f| {
                let column_type: ColumnType = f.type_name.parse()?;
                let metadata = HashMap::from([(
                    "beeswax:type".to_string(),
                    column_type.to_string(),
                )]);
                Ok(Field::new(&f.name, TypeMapper::to_arrow(column_type), true)
                    .with_metadata(metadata))
            })
            .collect();

        Ok(Schema::new(fields?))
    }
}

impl From<ResultsMetadata> for ColumnSchema {
    fn from(metadata: ResultsMetadata) -> Self {
        Self::new(metadata.field_schemas)
    }
}
