//! Data Alchemist route envelopes
//!
//! JSON shapes for the five AI data routes. A request names a table as
//! `headers` plus `data` rows; every response carries `success`, and failures
//! carry a single `error` string.
//!
//! | route             | request                      | success body                  |
//! |-------------------|------------------------------|-------------------------------|
//! | `convert-rule`    | `{prompt}`                   | `{rule, rules}`               |
//! | `fix-data`        | `{headers, data}`            | `{headers, data}`             |
//! | `modify-data`     | `{headers, data, prompt}`    | `{headers, updatedData}`      |
//! | `validate-ai`     | `{headers, data}`            | `{findings}`                  |
//! | `recommend-rules` | `{headers, data}`            | `{suggestions}`               |
//!
//! Tables arriving through a request go through the same alignment check as
//! any other table; ragged rows are rejected before the model is called.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use alchemist_engine::{Alignment, Rule, Table, TableError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    ConvertRule,
    FixData,
    ModifyData,
    ValidateAi,
    RecommendRules,
}

impl Route {
    pub const ALL: [Route; 5] = [
        Route::ConvertRule,
        Route::FixData,
        Route::ModifyData,
        Route::ValidateAi,
        Route::RecommendRules,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Route::ConvertRule => "convert-rule",
            Route::FixData => "fix-data",
            Route::ModifyData => "modify-data",
            Route::ValidateAi => "validate-ai",
            Route::RecommendRules => "recommend-rules",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRoute(pub String);

impl fmt::Display for UnknownRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let known: Vec<&str> = Route::ALL.iter().map(Route::as_str).collect();
        write!(f, "unknown route \"{}\" (expected one of: {})", self.0, known.join(", "))
    }
}

impl std::error::Error for UnknownRoute {}

impl FromStr for Route {
    type Err = UnknownRoute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches('/');
        Route::ALL
            .into_iter()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| UnknownRoute(s.to_string()))
    }
}

// =============================================================================
// Requests
// =============================================================================

/// `fix-data`, `validate-ai` and `recommend-rules` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRequest {
    pub headers: Vec<String>,
    #[serde(default)]
    pub data: Vec<Vec<String>>,
}

impl TableRequest {
    pub fn into_table(self) -> Result<Table, TableError> {
        Table::from_rows(self.headers, self.data, Alignment::Strict)
    }
}

/// `modify-data` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyRequest {
    pub headers: Vec<String>,
    #[serde(default)]
    pub data: Vec<Vec<String>>,
    #[serde(default)]
    pub prompt: String,
}

impl ModifyRequest {
    /// Split into the table and the instruction text.
    pub fn into_parts(self) -> Result<(Table, String), TableError> {
        let table = Table::from_rows(self.headers, self.data, Alignment::Strict)?;
        Ok((table, self.prompt))
    }
}

/// `convert-rule` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertRuleRequest {
    #[serde(default)]
    pub prompt: String,
}

// =============================================================================
// Responses
// =============================================================================

/// Route response. Serialized without a variant tag; the shape identifies it.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RouteResponse {
    Rules {
        success: bool,
        /// First converted rule
        rule: Rule,
        rules: Vec<Rule>,
    },
    Table {
        success: bool,
        headers: Vec<String>,
        data: Vec<Vec<String>>,
    },
    Modified {
        success: bool,
        headers: Vec<String>,
        #[serde(rename = "updatedData")]
        updated_data: Vec<Vec<String>>,
    },
    Findings {
        success: bool,
        findings: String,
    },
    Suggestions {
        success: bool,
        suggestions: String,
    },
    Failure {
        success: bool,
        error: String,
    },
}

impl RouteResponse {
    /// Converted rules; an empty list is reported as a failure.
    pub fn rules(rules: Vec<Rule>) -> Self {
        match rules.first() {
            Some(first) => RouteResponse::Rules {
                success: true,
                rule: first.clone(),
                rules,
            },
            None => RouteResponse::failure("no rules in response"),
        }
    }

    pub fn table(table: Table) -> Self {
        let (headers, data) = table.into_parts();
        RouteResponse::Table { success: true, headers, data }
    }

    pub fn modified(table: Table) -> Self {
        let (headers, updated_data) = table.into_parts();
        RouteResponse::Modified { success: true, headers, updated_data }
    }

    pub fn findings(text: impl Into<String>) -> Self {
        RouteResponse::Findings { success: true, findings: text.into() }
    }

    pub fn suggestions(text: impl Into<String>) -> Self {
        RouteResponse::Suggestions { success: true, suggestions: text.into() }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        RouteResponse::Failure { success: false, error: error.into() }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, RouteResponse::Failure { .. })
    }
}
