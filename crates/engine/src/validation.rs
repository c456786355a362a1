//! Cell validation
//!
//! Every cell must be non-blank. A small set of designated columns carry an
//! extra constraint: a whole-number range (the priority column) or well-formed
//! JSON (the attributes column).
//!
//! ## Column Matching
//!
//! Column names match case-sensitively and exactly. "PriorityLevel" and
//! "prioritylevel" are different columns; headers are not trimmed.
//!
//! Validation is a pure function of (value, column, rules): it never looks at
//! neighbouring cells, so re-running it on an unchanged cell always yields the
//! same answer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default name of the integer priority column.
pub const PRIORITY_COLUMN: &str = "PriorityLevel";

/// Default name of the JSON attributes column.
pub const ATTRIBUTES_COLUMN: &str = "AttributesJSON";

pub const PRIORITY_MIN: i64 = 1;
pub const PRIORITY_MAX: i64 = 5;

// ============================================================================
// Core Types
// ============================================================================

/// Constraint applied to every cell of one column, on top of the blank check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnRule {
    /// Integer within `[min, max]` inclusive.
    WholeNumber { min: i64, max: i64 },
    /// Any well-formed JSON text.
    Json,
}

/// Per-column constraints, keyed by exact header name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRules {
    rules: BTreeMap<String, ColumnRule>,
}

impl Default for ColumnRules {
    fn default() -> Self {
        Self::new()
            .with_rule(
                PRIORITY_COLUMN,
                ColumnRule::WholeNumber { min: PRIORITY_MIN, max: PRIORITY_MAX },
            )
            .with_rule(ATTRIBUTES_COLUMN, ColumnRule::Json)
    }
}

impl ColumnRules {
    /// No designated columns: only the blank check applies.
    pub fn new() -> Self {
        Self { rules: BTreeMap::new() }
    }

    pub fn with_rule(mut self, column: impl Into<String>, rule: ColumnRule) -> Self {
        self.rules.insert(column.into(), rule);
        self
    }

    pub fn get(&self, column: &str) -> Option<&ColumnRule> {
        self.rules.get(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnRule)> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Validate one cell. Returns the error message, or None when valid.
    pub fn validate(&self, value: &str, column: &str) -> Option<String> {
        if value.trim().is_empty() {
            return Some(format!("Missing value in {}", column));
        }

        match self.rules.get(column)? {
            ColumnRule::WholeNumber { min, max } => match value.trim().parse::<i64>() {
                Ok(n) if n >= *min && n <= *max => None,
                _ => Some(format!("{} must be between {} and {}", column, min, max)),
            },
            ColumnRule::Json => match serde_json::from_str::<serde_json::Value>(value) {
                Ok(_) => None,
                Err(_) => Some("Invalid JSON".to_string()),
            },
        }
    }
}

/// Validate one cell against the default column rules.
pub fn validate_cell(value: &str, column: &str) -> Option<String> {
    ColumnRules::default().validate(value, column)
}
