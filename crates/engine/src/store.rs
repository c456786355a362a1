//! Table store: the current table plus the error map for failing cells.

use std::collections::BTreeMap;

use crate::table::{CellCoord, Table};
use crate::validation::ColumnRules;
use crate::TableError;

/// Error map keyed by cell coordinate, in row-major order.
pub type CellErrors = BTreeMap<CellCoord, String>;

#[derive(Debug, Clone, Default)]
pub struct TableStore {
    table: Table,
    errors: CellErrors,
    rules: ColumnRules,
}

impl TableStore {
    pub fn new(rules: ColumnRules) -> Self {
        Self {
            table: Table::default(),
            errors: CellErrors::new(),
            rules,
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn errors(&self) -> &CellErrors {
        &self.errors
    }

    pub fn column_rules(&self) -> &ColumnRules {
        &self.rules
    }

    pub fn error_at(&self, coord: CellCoord) -> Option<&str> {
        self.errors.get(&coord).map(String::as_str)
    }

    /// Replace the table with a freshly uploaded one. Errors are cleared, not
    /// recomputed; call [`TableStore::validate_all`] to populate them.
    pub fn load_table(&mut self, table: Table) {
        log::debug!(
            "loading table: {} rows x {} cols",
            table.row_count(),
            table.col_count()
        );
        self.table = table;
        self.errors.clear();
    }

    /// Set one cell and revalidate it. Returns the cell's error, if any.
    ///
    /// On an out-of-bounds coordinate nothing changes.
    pub fn edit_cell(
        &mut self,
        row: usize,
        col: usize,
        value: impl Into<String>,
    ) -> Result<Option<String>, TableError> {
        let coord = CellCoord::new(row, col);
        let value = value.into();
        let error = {
            let header = self.table.header(col).unwrap_or_default();
            self.rules.validate(&value, header)
        };
        self.table.set(coord, value)?;

        match &error {
            Some(msg) => {
                self.errors.insert(coord, msg.clone());
            }
            None => {
                self.errors.remove(&coord);
            }
        }
        Ok(error)
    }

    /// Swap in a table produced elsewhere (an AI round-trip) and revalidate
    /// every cell, so the error map is never stale after a replacement.
    pub fn replace_table(&mut self, table: Table) {
        log::info!(
            "replacing table: {}x{} -> {}x{}",
            self.table.row_count(),
            self.table.col_count(),
            table.row_count(),
            table.col_count()
        );
        self.table = table;
        self.validate_all();
    }

    /// Recompute the full error map. Returns the number of failing cells.
    pub fn validate_all(&mut self) -> usize {
        self.errors = self
            .table
            .cells()
            .filter_map(|(coord, header, value)| {
                self.rules.validate(value, header).map(|msg| (coord, msg))
            })
            .collect();
        self.errors.len()
    }
}
