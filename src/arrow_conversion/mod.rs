//! Arrow export of query results.
//!
//! Rows fetched as delimited text are converted to Arrow columnar batches
//! using the result's declared column types.

mod builders;
mod converter;

pub use builders::{build_array, NULL_LITERAL};
pub use converter::ArrowConverter;
