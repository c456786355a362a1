// Prompt builders for the five AI operations

use alchemist_config::settings::Temperatures;

use crate::client::CompletionRequest;

pub const VALIDATE_SYSTEM: &str = "You are a senior data QA assistant.";
pub const FIX_SYSTEM: &str = "You fix and return clean data tables.";
pub const MODIFY_SYSTEM: &str = "You modify data tables.";
pub const CONVERT_RULE_SYSTEM: &str = "You are a JSON rule generator.";
pub const RECOMMEND_SYSTEM: &str = "You are a smart AI that analyzes CSV data and suggests useful task allocation rules. Return 3–5 clear rule suggestions. Do NOT explain.";

pub fn validate(csv: &str, temps: &Temperatures) -> CompletionRequest {
    let user = format!(
        "Analyze the following CSV data and return any data quality or logical issues.
Examples:
- Missing values in important columns
- Invalid PriorityLevel
- Conflicting Task-Group associations
- Odd patterns or anomalies

Respond with a plain list of issues.

CSV:
{csv}"
    );
    request(VALIDATE_SYSTEM, user, temps.validate)
}

pub fn fix(csv: &str, temps: &Temperatures) -> CompletionRequest {
    let user = format!(
        "Below is a CSV table. Fix any data issues such as:
- Broken or missing JSON in AttributesJSON
- Invalid PriorityLevel (should be 1–5)
- Missing required fields (fill with defaults)

Return the entire corrected table in CSV format, same structure.
NO explanation — only the corrected CSV.

CSV:
{csv}"
    );
    request(FIX_SYSTEM, user, temps.fix)
}

pub fn modify(csv: &str, instruction: &str, temps: &Temperatures) -> CompletionRequest {
    let user = format!(
        "Here's a table (CSV format):

{csv}

Instruction: {instruction}

Respond ONLY with the modified table as CSV. No explanation or commentary."
    );
    request(MODIFY_SYSTEM, user, temps.modify)
}

pub fn convert_rule(text: &str, temps: &Temperatures) -> CompletionRequest {
    let user = format!(
        "Convert the following natural language rule to a JSON object with keys like \"type\", \"target1\", \"target2\", \"value\" if applicable.
\"type\" must be one of: co-run, not-co-run, phase-window, slot-requirement.

Example:
Input: Co-run T1 and T2
Output: {{ \"type\": \"co-run\", \"target1\": \"T1\", \"target2\": \"T2\" }}

Now convert:
\"{text}\""
    );
    request(CONVERT_RULE_SYSTEM, user, temps.convert_rule)
}

pub fn recommend_rules(csv: &str, temps: &Temperatures) -> CompletionRequest {
    let user = format!("Analyze the following CSV data and suggest rules:\n\n{csv}");
    request(RECOMMEND_SYSTEM, user, temps.recommend_rules)
}

fn request(system: &str, user: String, temperature: f32) -> CompletionRequest {
    CompletionRequest {
        system: system.to_string(),
        user,
        temperature,
    }
}
