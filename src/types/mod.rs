//! Column types, typed values and result schemas.

mod mapping;
mod schema;

pub use mapping::{convert_raw_value, ColumnType, TypeMapper, Value, TIMESTAMP_FORMAT};
pub use schema::{ColumnSchema, Row};
