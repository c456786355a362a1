//! In-memory table: one header row plus data rows of string fields.
//!
//! Every constructor that accepts external rows goes through [`Table::from_rows`],
//! which enforces that each row has exactly one field per header according to
//! an [`Alignment`] policy.

use serde::{Deserialize, Serialize};

use crate::TableError;

/// How a table constructor treats rows whose width differs from the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    /// Any width mismatch is rejected.
    #[default]
    Strict,
    /// Short rows are padded with empty fields and surplus empty trailing
    /// fields are dropped. Surplus non-empty fields are still rejected.
    Pad,
}

/// A (row, column) index pair into the data rows. Headers are not addressable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellCoord {
    pub row: usize,
    pub col: usize,
}

impl CellCoord {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl std::fmt::Display for CellCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.row, self.col)
    }
}

/// A header row and string data rows; every row is exactly as wide as the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table, checking every row against the header width.
    pub fn from_rows(
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
        alignment: Alignment,
    ) -> Result<Self, TableError> {
        let width = headers.len();
        let mut aligned = Vec::with_capacity(rows.len());

        for (idx, mut row) in rows.into_iter().enumerate() {
            if row.len() != width {
                match alignment {
                    Alignment::Strict => {
                        return Err(TableError::Misaligned {
                            row: idx,
                            expected: width,
                            found: row.len(),
                        });
                    }
                    Alignment::Pad => {
                        if row.len() < width {
                            row.resize(width, String::new());
                        } else if row[width..].iter().all(|f| f.trim().is_empty()) {
                            row.truncate(width);
                        } else {
                            return Err(TableError::Misaligned {
                                row: idx,
                                expected: width,
                                found: row.len(),
                            });
                        }
                    }
                }
            }
            aligned.push(row);
        }

        Ok(Self { headers, rows: aligned })
    }

    /// Convenience for literals in tests and callers that already hold aligned data.
    pub fn new<H, R, S>(headers: H, rows: R) -> Result<Self, TableError>
    where
        H: IntoIterator<Item = S>,
        R: IntoIterator<Item = Vec<S>>,
        S: Into<String>,
    {
        let headers = headers.into_iter().map(Into::into).collect();
        let rows = rows
            .into_iter()
            .map(|r| r.into_iter().map(Into::into).collect())
            .collect();
        Self::from_rows(headers, rows, Alignment::Strict)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, coord: CellCoord) -> Option<&str> {
        self.rows
            .get(coord.row)
            .and_then(|r| r.get(coord.col))
            .map(String::as_str)
    }

    pub fn header(&self, col: usize) -> Option<&str> {
        self.headers.get(col).map(String::as_str)
    }

    /// Index of the first header equal to `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Overwrite a single cell. Returns the previous value.
    pub(crate) fn set(&mut self, coord: CellCoord, value: String) -> Result<String, TableError> {
        let rows = self.rows.len();
        let cols = self.headers.len();
        let cell = self
            .rows
            .get_mut(coord.row)
            .and_then(|r| r.get_mut(coord.col))
            .ok_or(TableError::OutOfBounds { coord, rows, cols })?;
        Ok(std::mem::replace(cell, value))
    }

    /// Iterate every cell as (coordinate, header, value).
    pub fn cells(&self) -> impl Iterator<Item = (CellCoord, &str, &str)> {
        self.rows.iter().enumerate().flat_map(move |(r, row)| {
            row.iter().enumerate().map(move |(c, value)| {
                (CellCoord::new(r, c), self.headers[c].as_str(), value.as_str())
            })
        })
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<String>>) {
        (self.headers, self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn test_strict_rejects_short_row() {
        let err = Table::from_rows(s(&["A", "B"]), vec![s(&["1"])], Alignment::Strict).unwrap_err();
        assert_eq!(err, TableError::Misaligned { row: 0, expected: 2, found: 1 });
    }

    #[test]
    fn test_pad_fills_short_row() {
        let t = Table::from_rows(s(&["A", "B", "C"]), vec![s(&["1"])], Alignment::Pad).unwrap();
        assert_eq!(t.rows()[0], s(&["1", "", ""]));
    }

    #[test]
    fn test_pad_drops_empty_surplus() {
        let t = Table::from_rows(s(&["A", "B"]), vec![s(&["1", "2", "", " "])], Alignment::Pad).unwrap();
        assert_eq!(t.rows()[0], s(&["1", "2"]));
    }

    #[test]
    fn test_pad_rejects_nonempty_surplus() {
        let err = Table::from_rows(s(&["A"]), vec![s(&["1"]), s(&["1", "x"])], Alignment::Pad).unwrap_err();
        assert_eq!(err, TableError::Misaligned { row: 1, expected: 1, found: 2 });
    }

    #[test]
    fn test_set_out_of_bounds() {
        let mut t = Table::new(["A"], [vec!["1"]]).unwrap();
        assert!(t.set(CellCoord::new(0, 1), "x".into()).is_err());
        assert!(t.set(CellCoord::new(1, 0), "x".into()).is_err());
        assert_eq!(t.set(CellCoord::new(0, 0), "x".into()).unwrap(), "1");
        assert_eq!(t.get(CellCoord::new(0, 0)), Some("x"));
    }

    #[test]
    fn test_cells_iterates_row_major() {
        let t = Table::new(["A", "B"], [vec!["1", "2"], vec!["3", "4"]]).unwrap();
        let seen: Vec<_> = t.cells().map(|(c, h, v)| (c.row, c.col, h.to_string(), v.to_string())).collect();
        assert_eq!(seen[1], (0, 1, "B".to_string(), "2".to_string()));
        assert_eq!(seen[2], (1, 0, "A".to_string(), "3".to_string()));
        assert_eq!(seen.len(), 4);
    }
}
