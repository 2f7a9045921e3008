//! Conversion of raw text fields into typed values.

use crate::error::ConversionError;
use arrow_schema::{DataType, TimeUnit};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Text layout of `timestamp` fields, used for display.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Accepted input layout: [`TIMESTAMP_FORMAT`] with optional fractional seconds.
const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Column type as declared in the result schema.
///
/// Type names parse case-insensitively with surrounding whitespace ignored,
/// so `BIGINT` and `bigint` are the same column type. Servers report them in
/// lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Decimal,
    Timestamp,
    Boolean,
}

impl FromStr for ColumnType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(ColumnType::String),
            "tinyint" => Ok(ColumnType::TinyInt),
            "smallint" => Ok(ColumnType::SmallInt),
            "int" => Ok(ColumnType::Int),
            "bigint" => Ok(ColumnType::BigInt),
            "float" => Ok(ColumnType::Float),
            "double" => Ok(ColumnType::Double),
            "decimal" => Ok(ColumnType::Decimal),
            "timestamp" => Ok(ColumnType::Timestamp),
            "boolean" => Ok(ColumnType::Boolean),
            _ => Err(ConversionError::UnsupportedColumnType {
                column_type: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::String => "string",
            ColumnType::TinyInt => "tinyint",
            ColumnType::SmallInt => "smallint",
            ColumnType::Int => "int",
            ColumnType::BigInt => "bigint",
            ColumnType::Float => "float",
            ColumnType::Double => "double",
            ColumnType::Decimal => "decimal",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// A typed field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Timestamp(NaiveDateTime),
    Boolean(bool),
}

impl Value {
    /// Get the text if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get an integer value widened to 64 bits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(i) => Some(i64::from(*i)),
            Value::Int64(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the float if this is a float value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(f) => Some(*f),
            _ => None,
        }
    }

    /// Get the boolean if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the timestamp if this is a timestamp value.
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Int32(i) => write!(f, "{}", i),
            Value::Int64(i) => write!(f, "{}", i),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Type mapper for raw fields and Arrow types.
pub struct TypeMapper;

impl TypeMapper {
    /// Convert a raw field according to its declared column type.
    ///
    /// # Errors
    /// Returns `ConversionError::UnsupportedColumnType` for unknown type names
    /// and `ConversionError::ValueConversionFailed` when the text does not parse.
    pub fn convert(raw: &str, declared_type: &str) -> Result<Value, ConversionError> {
        let column_type: ColumnType = declared_type.parse()?;
        Self::convert_typed(raw, column_type)
    }

    /// Convert a raw field for an already parsed column type.
    pub fn convert_typed(raw: &str, column_type: ColumnType) -> Result<Value, ConversionError> {
        let fail = |message: String| ConversionError::ValueConversionFailed {
            value: raw.to_string(),
            target: column_type.to_string(),
            message,
        };

        match column_type {
            ColumnType::String => Ok(Value::Text(raw.to_string())),
            ColumnType::TinyInt | ColumnType::SmallInt | ColumnType::Int => raw
                .parse::<i32>()
                .map(Value::Int32)
                .map_err(|e| fail(e.to_string())),
            ColumnType::BigInt => raw
                .parse::<i64>()
                .map(Value::Int64)
                .map_err(|e| fail(e.to_string())),
            ColumnType::Float | ColumnType::Double | ColumnType::Decimal => raw
                .parse::<f64>()
                .map(Value::Float64)
                .map_err(|e| fail(e.to_string())),
            ColumnType::Timestamp => NaiveDateTime::parse_from_str(raw, TIMESTAMP_PARSE_FORMAT)
                .map(Value::Timestamp)
                .map_err(|e| fail(e.to_string())),
            ColumnType::Boolean => Ok(Value::Boolean(raw == "true")),
        }
    }

    /// Arrow type used when exporting a column of this type.
    pub fn to_arrow(column_type: ColumnType) -> DataType {
        match column_type {
            ColumnType::String => DataType::Utf8,
            ColumnType::TinyInt | ColumnType::SmallInt | ColumnType::Int => DataType::Int32,
            ColumnType::BigInt => DataType::Int64,
            ColumnType::Float | ColumnType::Double | ColumnType::Decimal => DataType::Float64,
            ColumnType::Timestamp => DataType::Timestamp(TimeUnit::Second, None),
            ColumnType::Boolean => DataType::Boolean,
        }
    }
}

/// Convert a raw field according to its declared column type.
///
/// Shorthand for [`TypeMapper::convert`].
pub fn convert_raw_value(raw: &str, declared_type: &str) -> Result<Value, ConversionError> {
    TypeMapper::convert(raw, declared_type)
}
