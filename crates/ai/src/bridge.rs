// AI Bridge: table/text in, prompt out, strict parse of whatever comes back.
//
// Every operation is serialize -> prompt -> complete -> deserialize. The
// apply_* helpers only touch the store or rule book after the whole response
// has parsed, so a failed call leaves prior state as it was.

use alchemist_config::settings::Temperatures;
use alchemist_engine::{Alignment, Rule, RuleBook, Table, TableStore};
use alchemist_io::csv;

use crate::client::{AiError, Completion};
use crate::prompts;

pub struct AiBridge<C> {
    client: C,
    temperatures: Temperatures,
}

impl<C: Completion> AiBridge<C> {
    pub fn new(client: C, temperatures: Temperatures) -> Self {
        Self { client, temperatures }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Free-text list of data-quality findings.
    pub fn validate(&self, table: &Table) -> Result<String, AiError> {
        let csv = table_to_csv(table)?;
        self.client.complete(&prompts::validate(&csv, &self.temperatures))
    }

    /// Ask the model to repair the table. The reply must be a complete,
    /// aligned CSV table.
    pub fn fix(&self, table: &Table) -> Result<Table, AiError> {
        let csv = table_to_csv(table)?;
        let reply = self.client.complete(&prompts::fix(&csv, &self.temperatures))?;
        let fixed = parse_table_reply(&reply)?;
        if fixed.headers() != table.headers() {
            log::warn!("fix changed the header row");
        }
        Ok(fixed)
    }

    /// Apply a natural-language instruction to the table.
    pub fn modify(&self, table: &Table, instruction: &str) -> Result<Table, AiError> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(AiError::InvalidInput("instruction must not be empty".to_string()));
        }
        let csv = table_to_csv(table)?;
        let reply = self
            .client
            .complete(&prompts::modify(&csv, instruction, &self.temperatures))?;
        parse_table_reply(&reply)
    }

    /// Turn a natural-language rule into one or more typed rules.
    pub fn convert_rule(&self, text: &str) -> Result<Vec<Rule>, AiError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AiError::InvalidInput("rule text must not be empty".to_string()));
        }
        let reply = self
            .client
            .complete(&prompts::convert_rule(text, &self.temperatures))?;
        parse_rules_reply(&reply)
    }

    /// Free-text rule suggestions for the table.
    pub fn recommend_rules(&self, table: &Table) -> Result<String, AiError> {
        let csv = table_to_csv(table)?;
        self.client
            .complete(&prompts::recommend_rules(&csv, &self.temperatures))
    }

    /// Fix the store's table and swap the result in. Returns the number of
    /// invalid cells left after revalidation.
    pub fn apply_fix(&self, store: &mut TableStore) -> Result<usize, AiError> {
        let fixed = self.fix(store.table())?;
        store.replace_table(fixed);
        Ok(store.errors().len())
    }

    pub fn apply_modify(&self, store: &mut TableStore, instruction: &str) -> Result<usize, AiError> {
        let modified = self.modify(store.table(), instruction)?;
        store.replace_table(modified);
        Ok(store.errors().len())
    }

    /// Convert and append. Nothing is appended unless every rule is valid.
    pub fn apply_converted_rules(&self, book: &mut RuleBook, text: &str) -> Result<usize, AiError> {
        let rules = self.convert_rule(text)?;
        Ok(book.extend(rules))
    }
}

fn table_to_csv(table: &Table) -> Result<String, AiError> {
    csv::serialize(table).map_err(|e| AiError::InvalidInput(e.to_string()))
}

/// Parse a CSV reply with strict alignment. A surrounding code fence is
/// tolerated.
pub fn parse_table_reply(reply: &str) -> Result<Table, AiError> {
    let body = strip_code_fence(reply);
    csv::parse(body, Alignment::Strict).map_err(|e| AiError::Parse(e.to_string()))
}

/// Parse a rule reply: a JSON object or non-empty array of rule objects. A
/// surrounding code fence is tolerated; any other text is not.
pub fn parse_rules_reply(reply: &str) -> Result<Vec<Rule>, AiError> {
    Rule::parse_many(strip_code_fence(reply)).map_err(|e| AiError::Parse(e.to_string()))
}

/// Remove a leading ```lang line and trailing ``` if present.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    log::warn!("AI response was wrapped in a code fence");
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end().trim_end_matches("```").trim()
}
