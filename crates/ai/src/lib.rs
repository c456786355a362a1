//! AI bridge for Data Alchemist
//!
//! Builds prompts from tables and rule text, sends them through a
//! [`Completion`] backend, and parses replies back into typed values.

pub mod bridge;
pub mod client;
pub mod prompts;
pub mod routes;

pub use bridge::AiBridge;
pub use client::{AiError, Completion, CompletionRequest, OpenAIClient};

use alchemist_config::ai::ResolvedAIConfig;

/// Bridge over the configured OpenAI-compatible endpoint.
pub fn bridge_from_config(config: &ResolvedAIConfig) -> Result<AiBridge<OpenAIClient>, AiError> {
    let client = OpenAIClient::from_config(config)?;
    Ok(AiBridge::new(client, config.temperatures))
}
