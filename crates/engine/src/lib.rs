pub mod priority;
pub mod rules;
pub mod store;
pub mod table;
pub mod validation;

pub use priority::{PriorityError, PriorityKey, PriorityTemplate, PriorityWeights};
pub use rules::{Rule, RuleBook, RuleError, RuleKind};
pub use store::{CellErrors, TableStore};
pub use table::{Alignment, CellCoord, Table};
pub use validation::{validate_cell, ColumnRule, ColumnRules};

/// Errors from constructing or editing a table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("row {row} has {found} fields, expected {expected}")]
    Misaligned {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("cell {coord} is outside the table ({rows} rows x {cols} columns)")]
    OutOfBounds {
        coord: CellCoord,
        rows: usize,
        cols: usize,
    },
}
