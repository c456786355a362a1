// JSON import/export for the rule list and priority weights

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use alchemist_engine::{PriorityWeights, Rule, RuleBook, RuleError};

#[derive(Debug, thiserror::Error)]
pub enum JsonError {
    #[error("{0}")]
    Io(String),
    #[error("invalid JSON in {path}: {message}")]
    Parse { path: String, message: String },
    #[error("invalid rule in {path}: {source}")]
    Rule { path: String, source: RuleError },
}

/// Load a saved rule list. A missing file is an empty list.
pub fn load_rules(path: &Path) -> Result<RuleBook, JsonError> {
    if !path.exists() {
        return Ok(RuleBook::new());
    }
    let value: serde_json::Value = read_json(path)?;
    let rules = Rule::from_json_value(&value).map_err(|source| JsonError::Rule {
        path: path.display().to_string(),
        source,
    })?;

    let mut book = RuleBook::new();
    book.extend(rules);
    Ok(book)
}

/// Save the rule list as a pretty-printed JSON array.
pub fn save_rules(book: &RuleBook, path: &Path) -> Result<(), JsonError> {
    write_json(book, path)
}

/// Export weights as `priorities.json`.
pub fn export_priorities(weights: &PriorityWeights, path: &Path) -> Result<(), JsonError> {
    write_json(weights, path)
}

/// Load weights; values are renormalized to sum to 100.
pub fn load_priorities(path: &Path) -> Result<PriorityWeights, JsonError> {
    read_json(path)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, JsonError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| JsonError::Io(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&text).map_err(|e| JsonError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn write_json<T: serde::Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), JsonError> {
    let file = File::create(path).map_err(|e| JsonError::Io(format!("{}: {}", path.display(), e)))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, value).map_err(|e| JsonError::Io(e.to_string()))
}
