// AI configuration and secrets management
//
// API keys are looked up in:
// 1. System keychain (when built with the `keychain` feature)
// 2. ALCHEMIST_OPENAI_KEY
// 3. OPENAI_API_KEY
//
// Keys are NEVER stored in settings.json

use std::env;
use std::time::Duration;

use crate::settings::{AIProvider, AISettings, Temperatures};

/// Service name for keychain storage
#[cfg_attr(not(feature = "keychain"), allow(dead_code))]
const KEYCHAIN_SERVICE: &str = "data-alchemist";

/// Overrides the API base URL (useful for proxies and local test servers)
pub const BASE_URL_ENV: &str = "ALCHEMIST_OPENAI_BASE_URL";
/// Overrides the model name
pub const MODEL_ENV: &str = "ALCHEMIST_MODEL";
/// Standard key variable honoured by most OpenAI tooling
pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

/// Source of an API key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Keychain,
    Environment,
    None,
}

impl KeySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeySource::Keychain => "keychain",
            KeySource::Environment => "environment",
            KeySource::None => "none",
        }
    }
}

/// Result of key lookup
#[derive(Debug, Clone)]
pub struct KeyLookup {
    pub key: Option<String>,
    pub source: KeySource,
}

/// Application-specific environment variable for a provider's key
fn env_var_name(provider: &str) -> String {
    format!("ALCHEMIST_{}_KEY", provider.to_uppercase())
}

#[cfg_attr(not(feature = "keychain"), allow(dead_code))]
fn keychain_account(provider: &str) -> String {
    format!("ai/{}", provider.to_lowercase())
}

/// Environment variables checked for a provider's key, in order
fn key_env_vars(provider: &str) -> Vec<String> {
    let mut names = vec![env_var_name(provider)];
    if provider.eq_ignore_ascii_case("openai") {
        names.push(OPENAI_KEY_ENV.to_string());
    }
    names
}

/// Get an API key for the specified provider. The environment is injected so
/// callers and tests can resolve without touching process state.
pub fn get_api_key_with(provider: &str, env_lookup: impl Fn(&str) -> Option<String>) -> KeyLookup {
    #[cfg(feature = "keychain")]
    {
        if let Ok(entry) = keyring::Entry::new(KEYCHAIN_SERVICE, &keychain_account(provider)) {
            if let Ok(key) = entry.get_password() {
                return KeyLookup {
                    key: Some(key),
                    source: KeySource::Keychain,
                };
            }
        }
    }

    for name in key_env_vars(provider) {
        if let Some(key) = env_lookup(&name) {
            if !key.trim().is_empty() {
                return KeyLookup {
                    key: Some(key.trim().to_string()),
                    source: KeySource::Environment,
                };
            }
        }
    }

    KeyLookup {
        key: None,
        source: KeySource::None,
    }
}

/// Store an API key in the system keychain
#[cfg(feature = "keychain")]
pub fn set_api_key(provider: &str, key: &str) -> Result<(), String> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, &keychain_account(provider))
        .map_err(|e| format!("Failed to create keychain entry: {}", e))?;

    entry
        .set_password(key)
        .map_err(|e| format!("Failed to store key in keychain: {}", e))
}

#[cfg(not(feature = "keychain"))]
pub fn set_api_key(_provider: &str, _key: &str) -> Result<(), String> {
    Err("Keychain support not enabled. Set ALCHEMIST_OPENAI_KEY or OPENAI_API_KEY instead.".to_string())
}

/// Check if keychain support is available
pub fn keychain_available() -> bool {
    #[cfg(feature = "keychain")]
    {
        keyring::Entry::new(KEYCHAIN_SERVICE, "test").is_ok()
    }
    #[cfg(not(feature = "keychain"))]
    {
        false
    }
}

// ============================================================================
// Resolved AI Configuration
// ============================================================================

/// The effective AI configuration, resolved from settings, environment
/// overrides and the key store.
#[derive(Clone)]
pub struct ResolvedAIConfig {
    pub provider: AIProvider,
    pub model: String,
    /// API base URL without trailing slash
    pub base_url: String,
    /// None means no request timeout
    pub timeout: Option<Duration>,
    pub temperatures: Temperatures,
    pub api_key: Option<String>,
    pub key_source: KeySource,
    pub status: AIConfigStatus,
    /// Human-readable reason if not ready
    pub blocking_reason: Option<String>,
}

// Hand-written so the key never reaches a log line.
impl std::fmt::Debug for ResolvedAIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedAIConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("temperatures", &self.temperatures)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("key_source", &self.key_source)
            .field("status", &self.status)
            .field("blocking_reason", &self.blocking_reason)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AIConfigStatus {
    /// provider = none
    Disabled,
    Ready,
    MissingKey,
}

impl AIConfigStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Ready => "ready",
            Self::MissingKey => "missing_key",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl ResolvedAIConfig {
    /// Resolve from settings and the process environment.
    pub fn from_settings(settings: &AISettings) -> Self {
        Self::from_settings_with_env(settings, |name| env::var(name).ok())
    }

    pub fn from_settings_with_env(
        settings: &AISettings,
        env_lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let provider = settings.provider;
        let non_empty = |name: &str| env_lookup(name).filter(|v| !v.trim().is_empty());

        let model = non_empty(MODEL_ENV).unwrap_or_else(|| settings.effective_model().to_string());
        let base_url = non_empty(BASE_URL_ENV)
            .unwrap_or_else(|| settings.effective_base_url().to_string())
            .trim_end_matches('/')
            .to_string();
        let timeout = match settings.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        if !provider.is_enabled() {
            return Self {
                provider,
                model,
                base_url,
                timeout,
                temperatures: settings.temperatures,
                api_key: None,
                key_source: KeySource::None,
                status: AIConfigStatus::Disabled,
                blocking_reason: Some("AI is disabled (ai.provider = \"none\")".to_string()),
            };
        }

        let lookup = get_api_key_with(provider.name(), &env_lookup);
        let (status, blocking_reason) = match lookup.key {
            Some(_) => (AIConfigStatus::Ready, None),
            None => (
                AIConfigStatus::MissingKey,
                Some(format!(
                    "No API key found. Set {} or {}",
                    env_var_name(provider.name()),
                    OPENAI_KEY_ENV
                )),
            ),
        };

        Self {
            provider,
            model,
            base_url,
            timeout,
            temperatures: settings.temperatures,
            api_key: lookup.key,
            key_source: lookup.source,
            status,
            blocking_reason,
        }
    }

    /// Load settings and resolve in one call
    pub fn load() -> Self {
        let settings = crate::settings::Settings::load();
        Self::from_settings(&settings.ai)
    }
}

// ============================================================================
// Diagnostics (for `ai doctor`)
// ============================================================================

#[derive(Debug, serde::Serialize)]
pub struct AIDiagnostics {
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: Option<u64>,
    pub status: &'static str,
    pub key_present: bool,
    pub key_source: &'static str,
    pub keychain_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocking_reason: Option<String>,
}

impl AIDiagnostics {
    pub fn from_resolved(config: &ResolvedAIConfig) -> Self {
        Self {
            provider: config.provider.name().to_string(),
            model: config.model.clone(),
            base_url: config.base_url.clone(),
            timeout_secs: config.timeout.map(|t| t.as_secs()),
            status: config.status.as_str(),
            key_present: config.api_key.is_some(),
            key_source: config.key_source.as_str(),
            keychain_available: keychain_available(),
            blocking_reason: config.blocking_reason.clone(),
        }
    }
}

impl std::fmt::Display for AIDiagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "AI Configuration")?;
        writeln!(f, "──────────────────────────────")?;
        writeln!(f, "Provider:          {}", self.provider)?;
        writeln!(f, "Status:            {}", self.status)?;
        writeln!(f, "Model:             {}", self.model)?;
        writeln!(f, "Base URL:          {}", self.base_url)?;
        match self.timeout_secs {
            Some(secs) => writeln!(f, "Timeout:           {}s", secs)?,
            None => writeln!(f, "Timeout:           none")?,
        }
        writeln!(f, "Key present:       {}", if self.key_present { "yes" } else { "no" })?;
        writeln!(f, "Key source:        {}", self.key_source)?;
        writeln!(f, "Keychain available:{}", if self.keychain_available { "yes" } else { "no" })?;
        if let Some(reason) = &self.blocking_reason {
            writeln!(f, "Blocked:           {}", reason)?;
        }
        Ok(())
    }
}
