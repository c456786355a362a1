//! Allocation rules
//!
//! A rule is one of four fixed kinds. The two binary kinds (`co-run`,
//! `not-co-run`) relate two targets; the unary kinds (`phase-window`,
//! `slot-requirement`) constrain one target and may carry a free-form value.
//!
//! Rules enter the book from two places: a manual form, and text returned by
//! the model. Both go through the same shape check, and a batch is appended
//! all-or-nothing.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("unknown rule type \"{0}\" (expected co-run, not-co-run, phase-window or slot-requirement)")]
    UnknownKind(String),
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("failed to parse rule: {0}")]
    Parse(String),
}

/// The fixed set of rule kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    CoRun,
    NotCoRun,
    PhaseWindow,
    SlotRequirement,
}

impl RuleKind {
    pub const ALL: [RuleKind; 4] = [
        RuleKind::CoRun,
        RuleKind::NotCoRun,
        RuleKind::PhaseWindow,
        RuleKind::SlotRequirement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::CoRun => "co-run",
            RuleKind::NotCoRun => "not-co-run",
            RuleKind::PhaseWindow => "phase-window",
            RuleKind::SlotRequirement => "slot-requirement",
        }
    }

    /// Binary kinds need a second target.
    pub fn is_binary(&self) -> bool {
        matches!(self, RuleKind::CoRun | RuleKind::NotCoRun)
    }
}

impl FromStr for RuleKind {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        RuleKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| RuleError::UnknownKind(s.to_string()))
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rules from outside the process enter through [`Rule::from_json_value`],
/// which enforces the per-kind shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Rule {
    CoRun {
        target1: String,
        target2: String,
    },
    NotCoRun {
        target1: String,
        target2: String,
    },
    PhaseWindow {
        target1: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    SlotRequirement {
        target1: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
}

impl Rule {
    /// Build a rule from loose fields, enforcing the per-kind shape.
    ///
    /// `target2` is required for binary kinds and ignored otherwise;
    /// `value` is kept only for unary kinds.
    pub fn build(
        kind: RuleKind,
        target1: &str,
        target2: Option<&str>,
        value: Option<&str>,
    ) -> Result<Rule, RuleError> {
        let target1 = non_blank(Some(target1)).ok_or(RuleError::MissingField("target1"))?;
        let value = non_blank(value);

        if kind.is_binary() {
            let target2 = non_blank(target2).ok_or(RuleError::MissingField("target2"))?;
            return Ok(match kind {
                RuleKind::CoRun => Rule::CoRun { target1, target2 },
                _ => Rule::NotCoRun { target1, target2 },
            });
        }
        Ok(match kind {
            RuleKind::PhaseWindow => Rule::PhaseWindow { target1, value },
            _ => Rule::SlotRequirement { target1, value },
        })
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            Rule::CoRun { .. } => RuleKind::CoRun,
            Rule::NotCoRun { .. } => RuleKind::NotCoRun,
            Rule::PhaseWindow { .. } => RuleKind::PhaseWindow,
            Rule::SlotRequirement { .. } => RuleKind::SlotRequirement,
        }
    }

    pub fn target1(&self) -> &str {
        match self {
            Rule::CoRun { target1, .. }
            | Rule::NotCoRun { target1, .. }
            | Rule::PhaseWindow { target1, .. }
            | Rule::SlotRequirement { target1, .. } => target1,
        }
    }

    pub fn target2(&self) -> Option<&str> {
        match self {
            Rule::CoRun { target2, .. } | Rule::NotCoRun { target2, .. } => Some(target2),
            _ => None,
        }
    }

    /// Parse model output: a single rule object or a non-empty array of them.
    ///
    /// The whole text must be JSON. Every element must match the rule shape;
    /// one bad element rejects the whole batch.
    pub fn parse_many(text: &str) -> Result<Vec<Rule>, RuleError> {
        let value: serde_json::Value = serde_json::from_str(text.trim())
            .map_err(|e| RuleError::Parse(format!("not JSON: {}", e)))?;
        let rules = Self::from_json_value(&value)?;
        if rules.is_empty() {
            return Err(RuleError::Parse("no rules in response".to_string()));
        }
        Ok(rules)
    }

    /// Shape-check an already parsed JSON value (object or array).
    pub fn from_json_value(value: &serde_json::Value) -> Result<Vec<Rule>, RuleError> {
        match value {
            serde_json::Value::Array(items) => items.iter().map(Self::from_json_object).collect(),
            serde_json::Value::Object(_) => Ok(vec![Self::from_json_object(value)?]),
            other => Err(RuleError::Parse(format!(
                "expected a rule object or array, got {}",
                json_kind(other)
            ))),
        }
    }

    fn from_json_object(value: &serde_json::Value) -> Result<Rule, RuleError> {
        let obj = value
            .as_object()
            .ok_or_else(|| RuleError::Parse(format!("expected a rule object, got {}", json_kind(value))))?;

        let kind: RuleKind = obj
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or(RuleError::MissingField("type"))?
            .parse()?;

        let target1 = scalar_text(obj.get("target1"), "target1")?;
        let target2 = scalar_text(obj.get("target2"), "target2")?;
        let value = scalar_text(obj.get("value"), "value")?;

        Rule::build(
            kind,
            target1.as_deref().unwrap_or_default(),
            target2.as_deref(),
            value.as_deref(),
        )
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rule::CoRun { target1, target2 } | Rule::NotCoRun { target1, target2 } => {
                write!(f, "{} -> {} & {}", self.kind(), target1, target2)
            }
            Rule::PhaseWindow { target1, value } | Rule::SlotRequirement { target1, value } => {
                write!(f, "{} -> {}", self.kind(), target1)?;
                if let Some(v) = value {
                    write!(f, " ({})", v)?;
                }
                Ok(())
            }
        }
    }
}

fn non_blank(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Strings pass through; numbers and booleans are rendered as text.
fn scalar_text(value: Option<&serde_json::Value>, field: &'static str) -> Result<Option<String>, RuleError> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(serde_json::Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(RuleError::Parse(format!(
            "{} must be a string, got {}",
            field,
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

// ============================================================================
// Rule book
// ============================================================================

/// Ordered, append-only list of rules for the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RuleBook {
    rules: Vec<Rule>,
}

impl RuleBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Add a rule from manual form input. The list is unchanged on error.
    pub fn add_manual(
        &mut self,
        kind: &str,
        target1: &str,
        target2: Option<&str>,
    ) -> Result<&Rule, RuleError> {
        self.add_manual_with_value(kind, target1, target2, None)
    }

    pub fn add_manual_with_value(
        &mut self,
        kind: &str,
        target1: &str,
        target2: Option<&str>,
        value: Option<&str>,
    ) -> Result<&Rule, RuleError> {
        let kind: RuleKind = kind.parse()?;
        let rule = Rule::build(kind, target1, target2, value)?;
        log::debug!("adding manual rule: {}", rule);
        self.rules.push(rule);
        Ok(&self.rules[self.rules.len() - 1])
    }

    /// Add rules from model output text. All rules are appended, or none.
    /// Returns how many were added.
    pub fn add_from_text(&mut self, text: &str) -> Result<usize, RuleError> {
        let parsed = Rule::parse_many(text)?;
        Ok(self.extend(parsed))
    }

    /// Append rules that were already shape-checked.
    pub fn extend(&mut self, rules: Vec<Rule>) -> usize {
        let added = rules.len();
        self.rules.extend(rules);
        added
    }
}
