// Application settings
// Loaded from ~/.config/data-alchemist/settings.json (override with ALCHEMIST_SETTINGS)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use alchemist_engine::validation::{
    ATTRIBUTES_COLUMN, PRIORITY_COLUMN, PRIORITY_MAX, PRIORITY_MIN,
};
use alchemist_engine::{ColumnRule, ColumnRules};

/// Environment variable that points at an alternate settings file
pub const SETTINGS_ENV: &str = "ALCHEMIST_SETTINGS";

/// AI provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AIProvider {
    /// AI features disabled
    None,
    /// OpenAI chat completions (or any compatible endpoint)
    #[default]
    #[serde(rename = "openai")]
    OpenAI,
}

impl AIProvider {
    /// Returns true if AI features are enabled
    pub fn is_enabled(&self) -> bool {
        !matches!(self, AIProvider::None)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AIProvider::None => "none",
            AIProvider::OpenAI => "openai",
        }
    }

    /// Returns the default model for this provider
    pub fn default_model(&self) -> &'static str {
        match self {
            AIProvider::None => "",
            AIProvider::OpenAI => "gpt-3.5-turbo",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            AIProvider::None => "",
            AIProvider::OpenAI => "https://api.openai.com",
        }
    }
}

/// Sampling temperature per AI operation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Temperatures {
    pub validate: f32,
    pub fix: f32,
    pub modify: f32,
    pub convert_rule: f32,
    pub recommend_rules: f32,
}

impl Default for Temperatures {
    fn default() -> Self {
        Self {
            validate: 0.3,
            fix: 0.2,
            modify: 0.3,
            convert_rule: 0.0,
            recommend_rules: 0.4,
        }
    }
}

/// AI-specific settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AISettings {
    /// Selected AI provider
    pub provider: AIProvider,

    /// Model identifier (empty = provider default)
    pub model: String,

    /// API base URL (None = provider default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Request timeout in seconds (0 = no timeout)
    pub timeout_secs: u64,

    pub temperatures: Temperatures,
}

impl Default for AISettings {
    fn default() -> Self {
        Self {
            provider: AIProvider::OpenAI,
            model: String::new(),
            base_url: None,
            timeout_secs: 60,
            temperatures: Temperatures::default(),
        }
    }
}

impl AISettings {
    /// Get the effective model (user-specified or provider default)
    pub fn effective_model(&self) -> &str {
        if self.model.is_empty() {
            self.provider.default_model()
        } else {
            &self.model
        }
    }

    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }
}

/// Which columns carry extra cell constraints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    pub priority_column: String,
    pub priority_min: i64,
    pub priority_max: i64,
    pub json_column: String,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            priority_column: PRIORITY_COLUMN.to_string(),
            priority_min: PRIORITY_MIN,
            priority_max: PRIORITY_MAX,
            json_column: ATTRIBUTES_COLUMN.to_string(),
        }
    }
}

impl ValidationSettings {
    /// Build the per-column rule table. Blank column names are skipped.
    pub fn column_rules(&self) -> ColumnRules {
        let mut rules = ColumnRules::new();
        if !self.priority_column.is_empty() {
            rules = rules.with_rule(
                self.priority_column.clone(),
                ColumnRule::WholeNumber {
                    min: self.priority_min,
                    max: self.priority_max,
                },
            );
        }
        if !self.json_column.is_empty() {
            rules = rules.with_rule(self.json_column.clone(), ColumnRule::Json);
        }
        rules
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvSettings {
    /// Field delimiter used when writing tables
    pub delimiter: char,
}

impl Default for CsvSettings {
    fn default() -> Self {
        Self { delimiter: ',' }
    }
}

impl CsvSettings {
    /// Delimiter as a byte; non-ASCII falls back to comma.
    pub fn delimiter_byte(&self) -> u8 {
        if self.delimiter.is_ascii() {
            self.delimiter as u8
        } else {
            log::warn!("non-ASCII delimiter {:?} ignored, using ','", self.delimiter);
            b','
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ai: AISettings,
    pub validation: ValidationSettings,
    pub csv: CsvSettings,
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(SETTINGS_ENV) {
            return PathBuf::from(path);
        }
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("data-alchemist");
        config_dir.join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            let settings = Self::default();
            settings.create_default_file(&path);
            return settings;
        }

        Self::load_from(&path)
    }

    /// Load a specific settings file; parse errors fall back to defaults
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("error parsing {}: {}; using default settings", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings text. Lines starting with // are comments.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    /// Create default settings file with comments
    fn create_default_file(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("error creating config directory: {}", e);
                return;
            }
        }

        let default_config = r#"{
    // AI backend
    // Provider options: "none", "openai"
    // API keys are read from the keychain or environment, never from this file
    "ai": {
        "provider": "openai",
        "model": "",
        "timeout_secs": 60,
        "temperatures": {
            "validate": 0.3,
            "fix": 0.2,
            "modify": 0.3,
            "convert_rule": 0.0,
            "recommend_rules": 0.4
        }
    },

    // Cell validation
    "validation": {
        "priority_column": "PriorityLevel",
        "priority_min": 1,
        "priority_max": 5,
        "json_column": "AttributesJSON"
    },

    // CSV output
    "csv": {
        "delimiter": ","
    }
}
"#;

        if let Err(e) = fs::write(path, default_config) {
            log::warn!("error writing default {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.ai.provider, AIProvider::OpenAI);
        assert_eq!(s.ai.effective_model(), "gpt-3.5-turbo");
        assert_eq!(s.ai.effective_base_url(), "https://api.openai.com");
        assert_eq!(s.ai.temperatures.convert_rule, 0.0);
        assert_eq!(s.csv.delimiter_byte(), b',');
    }

    #[test]
    fn test_parse_with_comments_and_partial_sections() {
        let text = r#"{
            // only override what we care about
            "ai": { "model": "gpt-4o-mini" },
            "validation": { "priority_max": 10 }
        }"#;
        let s = Settings::parse(text).unwrap();
        assert_eq!(s.ai.effective_model(), "gpt-4o-mini");
        assert_eq!(s.ai.timeout_secs, 60);
        assert_eq!(s.validation.priority_max, 10);
        assert_eq!(s.validation.priority_column, "PriorityLevel");
    }

    #[test]
    fn test_default_file_parses_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        Settings::default().create_default_file(&path);

        let loaded = Settings::load_from(&path);
        assert_eq!(loaded.ai.provider, AIProvider::OpenAI);
        assert_eq!(loaded.ai.temperatures, Temperatures::default());
        assert_eq!(loaded.validation, ValidationSettings::default());
    }

    #[test]
    fn test_column_rules_from_settings() {
        let v = ValidationSettings {
            priority_column: "Urgency".into(),
            priority_min: 0,
            priority_max: 3,
            json_column: String::new(),
        };
        let rules = v.column_rules();
        assert_eq!(rules.validate("4", "Urgency"), Some("Urgency must be between 0 and 3".into()));
        assert_eq!(rules.validate("{", "AttributesJSON"), None);
    }

    #[test]
    fn test_provider_none_parses() {
        let s = Settings::parse(r#"{"ai": {"provider": "none"}}"#).unwrap();
        assert!(!s.ai.provider.is_enabled());
    }
}
