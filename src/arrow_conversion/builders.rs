//! Array builders for converting raw text columns to Arrow arrays.

use crate::error::ConversionError;
use crate::types::{ColumnType, TypeMapper, Value};
use arrow::array::{
    ArrayRef, BooleanBuilder, Float64Builder, Int32Builder, Int64Builder, StringBuilder,
    TimestampSecondBuilder,
};
use std::sync::Arc;

/// Text the service writes for SQL NULL in non-string columns.
pub const NULL_LITERAL: &str = "NULL";

/// Build an Arrow array from one column of raw fields.
///
/// # Arguments
/// * `column_type` - Declared type of the column
/// * `values` - Raw fields of the column, one per row
/// * `column` - Column index for error reporting
pub fn build_array(
    column_type: ColumnType,
    values: &[&str],
    column: usize,
) -> Result<ArrayRef, ConversionError> {
    match column_type {
        ColumnType::String => Ok(build_string_array(values)),
        ColumnType::TinyInt | ColumnType::SmallInt | ColumnType::Int => {
            let mut builder = Int32Builder::with_capacity(values.len());
            for raw in values {
                match convert(raw, column_type, column)? {
                    Some(Value::Int32(i)) => builder.append_value(i),
                    _ => builder.append_null(),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        ColumnType::BigInt => {
            let mut builder = Int64Builder::with_capacity(values.len());
            for raw in values {
                match convert(raw, column_type, column)? {
                    Some(Value::Int64(i)) => builder.append_value(i),
                    _ => builder.append_null(),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        ColumnType::Float | ColumnType::Double | ColumnType::Decimal => {
            let mut builder = Float64Builder::with_capacity(values.len());
            for raw in values {
                match convert(raw, column_type, column)? {
                    Some(Value::Float64(f)) => builder.append_value(f),
                    _ => builder.append_null(),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        ColumnType::Timestamp => {
            let mut builder = TimestampSecondBuilder::with_capacity(values.len());
            for raw in values {
                match convert(raw, column_type, column)? {
                    Some(Value::Timestamp(ts)) => builder.append_value(ts.and_utc().timestamp()),
                    _ => builder.append_null(),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        ColumnType::Boolean => {
            let mut builder = BooleanBuilder::with_capacity(values.len());
            for raw in values {
                match convert(raw, column_type, column)? {
                    Some(Value::Boolean(b)) => builder.append_value(b),
                    _ => builder.append_null(),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
    }
}

/// Strings are copied as-is; `NULL` is only special for typed columns.
fn build_string_array(values: &[&str]) -> ArrayRef {
    let bytes = values.iter().map(|v| v.len()).sum();
    let mut builder = StringBuilder::with_capacity(values.len(), bytes);
    for raw in values {
        builder.append_value(raw);
    }
    Arc::new(builder.finish())
}

fn convert(
    raw: &str,
    column_type: ColumnType,
    column: usize,
) -> Result<Option<Value>, ConversionError> {
    if raw == NULL_LITERAL {
        return Ok(None);
    }
    TypeMapper::convert_typed(raw, column_type)
        .map(Some)
        .map_err(|e| match e {
            ConversionError::ValueConversionFailed {
                value,
                target,
                message,
            } => ConversionError::ValueConversionFailed {
                value,
                target,
                message: format!("column {}: {}", column, message),
            },
            other => other,
        })
}
