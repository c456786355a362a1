//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, bad route)    |
//! | 3-9     | data             | File, parse and validation outcomes      |
//! | 10-19   | ai               | AI provider/keychain/service codes       |
//!
//! The AI range is 10 disabled, 11 missing key, 12 keychain, 13 service,
//! 14 response.
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use alchemist_ai::AiError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Data (3-9)
// =============================================================================

/// Could not read or write a file.
pub const EXIT_IO: u8 = 3;

/// Input file is not well-formed (CSV structure, JSON syntax).
pub const EXIT_PARSE: u8 = 4;

/// The table has invalid cells (`check`, `edit`).
pub const EXIT_INVALID_CELLS: u8 = 5;

/// A rule was rejected (unknown kind, missing target).
pub const EXIT_RULE_REJECTED: u8 = 6;

// =============================================================================
// AI (10-19)
// =============================================================================

/// AI disabled (provider=none).
pub const EXIT_AI_DISABLED: u8 = 10;

/// AI provider configured but API key missing.
pub const EXIT_AI_MISSING_KEY: u8 = 11;

/// Keychain error (cannot store the key, or built without keychain support).
pub const EXIT_AI_KEYCHAIN_ERR: u8 = 12;

/// The service could not be reached or answered with an error status.
pub const EXIT_AI_SERVICE: u8 = 13;

/// The service answered, but the reply did not have the expected shape.
pub const EXIT_AI_RESPONSE: u8 = 14;

/// Map an AI error to its exit code.
pub fn ai_exit_code(err: &AiError) -> u8 {
    match err {
        AiError::NotConfigured(_) => EXIT_AI_DISABLED,
        AiError::MissingKey => EXIT_AI_MISSING_KEY,
        AiError::Network(_) | AiError::Api { .. } | AiError::EmptyResponse => EXIT_AI_SERVICE,
        AiError::Parse(_) => EXIT_AI_RESPONSE,
        AiError::InvalidInput(_) => EXIT_USAGE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_codes_are_in_range() {
        let errors = [
            AiError::NotConfigured("off".into()),
            AiError::MissingKey,
            AiError::Network("refused".into()),
            AiError::Api { status: 500, message: "boom".into() },
            AiError::EmptyResponse,
            AiError::Parse("not json".into()),
        ];
        for err in &errors {
            let code = ai_exit_code(err);
            assert!((10..=19).contains(&code), "{:?} -> {}", err, code);
        }
        assert_eq!(ai_exit_code(&AiError::InvalidInput("blank".into())), EXIT_USAGE);
    }
}
