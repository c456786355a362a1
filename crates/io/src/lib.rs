// File I/O operations

pub mod csv;
pub mod json;

pub use crate::csv::CsvError;
pub use crate::json::JsonError;
