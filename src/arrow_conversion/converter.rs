//! Converter from decoded result rows to Arrow RecordBatch.
//!
//! Rows arrive row-major as split text fields; the converter transposes them
//! and builds one typed array per column.

use crate::error::ConversionError;
use crate::types::{ColumnSchema, ColumnType};
use arrow::array::RecordBatch;
use arrow::datatypes::Schema;
use std::sync::Arc;

use super::builders::build_array;

/// Converter for transforming split rows into Arrow RecordBatch.
#[derive(Debug, Clone)]
pub struct ArrowConverter {
    schema: Arc<Schema>,
    column_types: Vec<ColumnType>,
}

impl ArrowConverter {
    /// Create a converter for a result schema.
    ///
    /// # Errors
    /// Returns `ConversionError` if a declared type has no Arrow mapping.
    pub fn new(schema: &ColumnSchema) -> Result<Self, ConversionError> {
        Ok(Self {
            schema: Arc::new(schema.to_arrow_schema()?),
            column_types: schema.column_types()?,
        })
    }

    /// Get the Arrow schema for this converter.
    pub fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    /// Convert split rows into a RecordBatch.
    ///
    /// # Errors
    /// Returns `ConversionError` if a row has the wrong number of fields or
    /// a value fails to parse.
    pub fn convert_rows(&self, rows: &[Vec<String>]) -> Result<RecordBatch, ConversionError> {
        if rows.is_empty() {
            return Ok(RecordBatch::new_empty(Arc::clone(&self.schema)));
        }

        let num_columns = self.column_types.len();
        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != num_columns {
                return Err(ConversionError::SchemaMismatch(format!(
                    "Row {} has {} columns, expected {}",
                    row_idx,
                    row.len(),
                    num_columns
                )));
            }
        }

        let arrays = self
            .column_types
            .iter()
            .enumerate()
            .map(|(col_idx, column_type)| {
                let values: Vec<&str> = rows.iter().map(|r| r[col_idx].as_str()).collect();
                build_array(*column_type, &values, col_idx)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RecordBatch::try_new(Arc::clone(&self.schema), arrays)?)
    }
}
