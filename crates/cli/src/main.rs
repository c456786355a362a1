// Data Alchemist CLI - headless validation, editing and AI-assisted cleanup of CSV tables

mod exit_codes;

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use alchemist_ai::{routes, AiBridge, AiError, OpenAIClient};
use alchemist_config::ai::{self as ai_config, AIConfigStatus, AIDiagnostics, ResolvedAIConfig};
use alchemist_config::{AIProvider, Settings};
use alchemist_engine::{
    CellCoord, PriorityError, PriorityKey, PriorityTemplate, PriorityWeights, RuleBook,
    RuleError, Table, TableError, TableStore,
};
use alchemist_io::{csv, json, CsvError, JsonError};
use alchemist_protocol::{Route, RouteResponse};

use exit_codes::{
    ai_exit_code, EXIT_AI_DISABLED, EXIT_AI_KEYCHAIN_ERR, EXIT_AI_MISSING_KEY, EXIT_ERROR, EXIT_INVALID_CELLS, EXIT_IO,
    EXIT_PARSE, EXIT_RULE_REJECTED, EXIT_SUCCESS, EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "alchemist")]
#[command(about = "Validate, edit and clean up CSV resource tables, with optional AI assistance")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every cell of a CSV file
    #[command(after_help = "\
Examples:
  alchemist check clients.csv
  alchemist check tasks.csv --json
  cat workers.csv | alchemist check -")]
    Check {
        /// CSV file (- for stdin)
        file: PathBuf,

        /// Print the report as a single JSON object
        #[arg(long)]
        json: bool,
    },

    /// Set one cell and revalidate it
    #[command(after_help = "\
Rows and columns are 0-based; the header row is not counted.

Examples:
  alchemist edit clients.csv --row 0 --column PriorityLevel --value 3
  alchemist edit clients.csv --row 2 --col 4 --value '{}' -o fixed.csv")]
    Edit {
        /// CSV file (- for stdin)
        file: PathBuf,

        #[arg(long)]
        row: usize,

        /// Column index
        #[arg(long, conflicts_with = "column", required_unless_present = "column")]
        col: Option<usize>,

        /// Column header name
        #[arg(long)]
        column: Option<String>,

        /// New cell value
        #[arg(long, allow_hyphen_values = true)]
        value: String,

        /// Output file (default: overwrite the input; stdout when reading stdin)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Print the edit result as JSON
        #[arg(long)]
        json: bool,
    },

    /// AI-assisted operations
    Ai {
        #[command(subcommand)]
        command: AiCommands,
    },

    /// Manage the allocation rule list
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },

    /// Adjust and export prioritization weights
    #[command(after_help = "\
Templates: \"Maximize Fulfillment\", \"Minimize Cost\", \"Balanced\"

Examples:
  alchemist priorities --template balanced
  alchemist priorities --set fulfillment=70 -o priorities.json
  alchemist priorities --from priorities.json --set speed=0")]
    Priorities {
        /// Start from a saved weights file
        #[arg(long)]
        from: Option<PathBuf>,

        /// Apply a preset
        #[arg(long)]
        template: Option<String>,

        /// Set one weight and renormalize; repeatable
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Write the weights to a file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Run a data route: request JSON on stdin, response JSON on stdout
    #[command(after_help = "\
Routes: convert-rule, fix-data, modify-data, validate-ai, recommend-rules

Example:
  echo '{\"headers\":[\"A\",\"B\"],\"data\":[[\"1\",\"2\"]]}' | alchemist api fix-data")]
    Api {
        route: Route,
    },
}

#[derive(Subcommand)]
enum AiCommands {
    /// List data-quality findings
    Validate {
        /// CSV file (- for stdin)
        file: PathBuf,
    },

    /// Suggest allocation rules for the data
    RecommendRules {
        /// CSV file (- for stdin)
        file: PathBuf,
    },

    /// Repair the table and print or save the result
    Fix {
        /// CSV file (- for stdin)
        file: PathBuf,

        /// Output file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Apply a natural-language instruction to the table
    Modify {
        /// CSV file (- for stdin)
        file: PathBuf,

        /// Instruction, e.g. "set PriorityLevel to 3 for all GroupA clients"
        #[arg(long, short = 'p')]
        prompt: String,

        /// Output file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Diagnose AI configuration
    Doctor {
        #[arg(long)]
        json: bool,
    },

    /// Store the OpenAI API key in the system keychain (key read from stdin)
    #[command(after_help = "\
Requires a build with the `keychain` feature.

Example:
  printf '%s' \"$OPENAI_API_KEY\" | alchemist ai set-key")]
    SetKey,
}

#[derive(Subcommand)]
enum RulesCommands {
    /// Add a rule from explicit fields
    #[command(after_help = "\
Kinds: co-run, not-co-run, phase-window, slot-requirement

Examples:
  alchemist rules add --type co-run --target1 T1 --target2 T2
  alchemist rules add --type slot-requirement --target1 GroupA --value 2")]
    Add {
        #[arg(long = "type", value_name = "KIND")]
        kind: String,

        #[arg(long)]
        target1: String,

        /// Required for co-run and not-co-run
        #[arg(long)]
        target2: Option<String>,

        #[arg(long)]
        value: Option<String>,

        /// Rule list file
        #[arg(long, default_value = "rules.json")]
        rules: PathBuf,
    },

    /// Convert a natural-language rule with the AI and add it
    Convert {
        text: String,

        /// Rule list file
        #[arg(long, default_value = "rules.json")]
        rules: PathBuf,
    },

    /// Show the rule list
    List {
        /// Rule list file
        #[arg(long, default_value = "rules.json")]
        rules: PathBuf,

        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { file, json } => cmd_check(&file, json),
        Commands::Edit { file, row, col, column, value, output, json } => {
            cmd_edit(&file, row, col, column, value, output, json)
        }
        Commands::Ai { command } => match command {
            AiCommands::Validate { file } => cmd_ai_validate(&file),
            AiCommands::RecommendRules { file } => cmd_ai_recommend_rules(&file),
            AiCommands::Fix { file, output } => cmd_ai_fix(&file, output),
            AiCommands::Modify { file, prompt, output } => cmd_ai_modify(&file, &prompt, output),
            AiCommands::Doctor { json } => cmd_ai_doctor(json),
            AiCommands::SetKey => cmd_ai_set_key(),
        },
        Commands::Rules { command } => match command {
            RulesCommands::Add { kind, target1, target2, value, rules } => {
                cmd_rules_add(&rules, &kind, &target1, target2.as_deref(), value.as_deref())
            }
            RulesCommands::Convert { text, rules } => cmd_rules_convert(&rules, &text),
            RulesCommands::List { rules, json } => cmd_rules_list(&rules, json),
        },
        Commands::Priorities { from, template, set, output } => {
            cmd_priorities(from, template, set, output)
        }
        Commands::Api { route } => cmd_api(route),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    /// Create error from an AI failure with its registry exit code.
    pub fn ai(err: AiError) -> Self {
        let hint = match &err {
            AiError::MissingKey => Some("set ALCHEMIST_OPENAI_KEY or OPENAI_API_KEY".to_string()),
            AiError::NotConfigured(_) => Some(format!(
                "set ai.provider to \"openai\" in {}",
                Settings::config_path().display()
            )),
            AiError::Api { status: 401, .. } => Some("check that the API key is valid".to_string()),
            AiError::Network(_) => Some("run `alchemist ai doctor` to check the base URL".to_string()),
            _ => None,
        };
        Self { code: ai_exit_code(&err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<CsvError> for CliError {
    fn from(err: CsvError) -> Self {
        match err {
            CsvError::Io(msg) => CliError::io(msg),
            other => CliError::parse(other.to_string()),
        }
    }
}

impl From<JsonError> for CliError {
    fn from(err: JsonError) -> Self {
        match err {
            JsonError::Io(msg) => CliError::io(msg),
            other => CliError::parse(other.to_string()),
        }
    }
}

impl From<RuleError> for CliError {
    fn from(err: RuleError) -> Self {
        Self { code: EXIT_RULE_REJECTED, message: err.to_string(), hint: None }
    }
}

impl From<TableError> for CliError {
    fn from(err: TableError) -> Self {
        CliError::args(err.to_string())
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

fn is_stdio(path: &Path) -> bool {
    path == Path::new("-")
}

/// Read a table from a file or stdin, with the delimiter it was sniffed with.
/// Short rows are padded.
fn load_table(path: &Path) -> Result<(Table, u8), CliError> {
    if !is_stdio(path) {
        return Ok(csv::load_path(path)?);
    }
    let mut bytes = Vec::new();
    io::stdin()
        .read_to_end(&mut bytes)
        .map_err(|e| CliError::io(format!("stdin: {}", e)))?;
    Ok(csv::parse_sniffed(&csv::decode_bytes(bytes))?)
}

/// Write a table to a file, or to stdout when `output` is None or `-`.
fn write_table(table: &Table, output: Option<&Path>, delimiter: u8) -> Result<(), CliError> {
    match output {
        Some(path) if !is_stdio(path) => {
            csv::save_path(table, path, delimiter)?;
            log::info!("wrote {}", path.display());
            Ok(())
        }
        _ => {
            println!("{}", csv::serialize_with_delimiter(table, delimiter)?);
            Ok(())
        }
    }
}

/// Load and validate every cell. Also returns the source delimiter.
fn open_store(path: &Path, settings: &Settings) -> Result<(TableStore, u8), CliError> {
    let (table, delimiter) = load_table(path)?;
    let mut store = TableStore::new(settings.validation.column_rules());
    store.load_table(table);
    store.validate_all();
    Ok((store, delimiter))
}

fn ai_bridge(settings: &Settings) -> Result<AiBridge<OpenAIClient>, CliError> {
    let config = ResolvedAIConfig::from_settings(&settings.ai);
    alchemist_ai::bridge_from_config(&config).map_err(CliError::ai)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError { code: EXIT_ERROR, message: e.to_string(), hint: None })?;
    println!("{}", text);
    Ok(())
}

// ============================================================================
// check
// ============================================================================

#[derive(serde::Serialize)]
struct CheckReport<'a> {
    file: String,
    rows: usize,
    columns: usize,
    valid: bool,
    errors: Vec<CellReport<'a>>,
}

#[derive(serde::Serialize)]
struct CellReport<'a> {
    row: usize,
    col: usize,
    column: &'a str,
    value: &'a str,
    message: &'a str,
}

fn cmd_check(file: &Path, json: bool) -> Result<(), CliError> {
    let settings = Settings::load();
    let (store, _) = open_store(file, &settings)?;
    let table = store.table();

    let errors: Vec<CellReport> = store
        .errors()
        .iter()
        .map(|(coord, message)| CellReport {
            row: coord.row,
            col: coord.col,
            column: table.header(coord.col).unwrap_or(""),
            value: table.get(*coord).unwrap_or(""),
            message,
        })
        .collect();

    let invalid = errors.len();
    if json {
        print_json(&CheckReport {
            file: file.display().to_string(),
            rows: table.row_count(),
            columns: table.col_count(),
            valid: invalid == 0,
            errors,
        })?;
    } else {
        println!(
            "{}: {} rows x {} columns",
            file.display(),
            table.row_count(),
            table.col_count()
        );
        for cell in &errors {
            println!("{}-{}  {:<16} {}", cell.row, cell.col, cell.column, cell.message);
        }
        if invalid == 0 {
            println!("all cells valid");
        }
    }

    if invalid > 0 {
        return Err(CliError {
            code: EXIT_INVALID_CELLS,
            message: format!("{} invalid cell{}", invalid, if invalid == 1 { "" } else { "s" }),
            hint: None,
        });
    }
    Ok(())
}

// ============================================================================
// edit
// ============================================================================

fn cmd_edit(
    file: &Path,
    row: usize,
    col: Option<usize>,
    column: Option<String>,
    value: String,
    output: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let settings = Settings::load();
    let (mut store, source_delimiter) = open_store(file, &settings)?;

    let col = match (col, column) {
        (Some(col), _) => col,
        (None, Some(name)) => store.table().column_index(&name).ok_or_else(|| {
            CliError::args(format!("no column named \"{}\"", name))
                .with_hint(format!("available columns: {}", store.table().headers().join(", ")))
        })?,
        (None, None) => return Err(CliError::args("--col or --column is required")),
    };

    let destination = output.or_else(|| (!is_stdio(file)).then(|| file.to_path_buf()));
    if json && destination.as_deref().map_or(true, is_stdio) {
        return Err(CliError::args("--json needs --output when the table goes to stdout"));
    }

    let error = store.edit_cell(row, col, value.clone())?;
    let coord = CellCoord { row, col };
    let column_name = store.table().header(col).unwrap_or("").to_string();

    // Rewriting the source keeps its delimiter
    let delimiter = if destination.as_deref() == Some(file) {
        source_delimiter
    } else {
        settings.csv.delimiter_byte()
    };
    write_table(store.table(), destination.as_deref(), delimiter)?;

    if json {
        print_json(&serde_json::json!({
            "row": row,
            "col": col,
            "column": column_name,
            "value": &value,
            "error": &error,
            "invalid_cells": store.errors().len(),
        }))?;
    } else {
        match &error {
            Some(message) => eprintln!("{} {}: {}", coord, column_name, message),
            None => eprintln!("{} {}: ok", coord, column_name),
        }
    }

    let invalid = store.errors().len();
    if invalid == 0 {
        return Ok(());
    }
    let message = error.unwrap_or_else(|| {
        format!("{} invalid cell{} elsewhere in the table", invalid, if invalid == 1 { "" } else { "s" })
    });
    Err(CliError {
        code: EXIT_INVALID_CELLS,
        message,
        hint: Some("run `alchemist check` to list them".to_string()),
    })
}

// ============================================================================
// ai
// ============================================================================

fn cmd_ai_validate(file: &Path) -> Result<(), CliError> {
    let settings = Settings::load();
    let (table, _) = load_table(file)?;
    let bridge = ai_bridge(&settings)?;
    let findings = bridge.validate(&table).map_err(CliError::ai)?;
    println!("{}", findings);
    Ok(())
}

fn cmd_ai_recommend_rules(file: &Path) -> Result<(), CliError> {
    let settings = Settings::load();
    let (table, _) = load_table(file)?;
    let bridge = ai_bridge(&settings)?;
    let suggestions = bridge.recommend_rules(&table).map_err(CliError::ai)?;
    println!("{}", suggestions);
    Ok(())
}

fn cmd_ai_fix(file: &Path, output: Option<PathBuf>) -> Result<(), CliError> {
    let settings = Settings::load();
    let (mut store, _) = open_store(file, &settings)?;
    let bridge = ai_bridge(&settings)?;

    let before = store.errors().len();
    let remaining = bridge.apply_fix(&mut store).map_err(CliError::ai)?;
    write_table(store.table(), output.as_deref(), settings.csv.delimiter_byte())?;
    eprintln!("invalid cells: {} before, {} after", before, remaining);
    Ok(())
}

fn cmd_ai_modify(file: &Path, prompt: &str, output: Option<PathBuf>) -> Result<(), CliError> {
    let settings = Settings::load();
    let (mut store, _) = open_store(file, &settings)?;
    let bridge = ai_bridge(&settings)?;

    let remaining = bridge.apply_modify(&mut store, prompt).map_err(CliError::ai)?;
    write_table(store.table(), output.as_deref(), settings.csv.delimiter_byte())?;
    if remaining > 0 {
        eprintln!("invalid cells after modify: {}", remaining);
    }
    Ok(())
}

fn cmd_ai_doctor(json: bool) -> Result<(), CliError> {
    let config = ResolvedAIConfig::load();
    let diag = AIDiagnostics::from_resolved(&config);

    if json {
        print_json(&diag)?;
    } else {
        print!("{}", diag);
        match config.status {
            AIConfigStatus::Disabled => {
                println!();
                println!("AI is disabled. To enable:");
                println!("  Set ai.provider in {}", Settings::config_path().display());
            }
            AIConfigStatus::MissingKey => {
                println!();
                println!("Fix: set ALCHEMIST_OPENAI_KEY or OPENAI_API_KEY");
            }
            AIConfigStatus::Ready => {}
        }
    }

    match config.status {
        AIConfigStatus::Disabled => {
            Err(CliError { code: EXIT_AI_DISABLED, message: "AI is disabled".to_string(), hint: None })
        }
        AIConfigStatus::MissingKey => Err(CliError {
            code: EXIT_AI_MISSING_KEY,
            message: "AI misconfigured: missing API key".to_string(),
            hint: None,
        }),
        AIConfigStatus::Ready => Ok(()),
    }
}

fn cmd_ai_set_key() -> Result<(), CliError> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| CliError::io(format!("stdin: {}", e)))?;
    let key = input.trim();
    if key.is_empty() {
        return Err(CliError::args("no API key on stdin"));
    }

    ai_config::set_api_key(AIProvider::OpenAI.name(), key).map_err(|message| CliError {
        code: EXIT_AI_KEYCHAIN_ERR,
        message,
        hint: None,
    })?;
    eprintln!("stored API key in the system keychain");
    Ok(())
}

// ============================================================================
// rules
// ============================================================================

fn cmd_rules_add(
    rules: &Path,
    kind: &str,
    target1: &str,
    target2: Option<&str>,
    value: Option<&str>,
) -> Result<(), CliError> {
    let mut book = json::load_rules(rules)?;
    let added = book
        .add_manual_with_value(kind, target1, target2, value)
        .map_err(|e| match e {
            RuleError::UnknownKind(_) => CliError::from(e)
                .with_hint("kinds: co-run, not-co-run, phase-window, slot-requirement"),
            other => CliError::from(other),
        })?
        .to_string();
    json::save_rules(&book, rules)?;
    println!("added: {}", added);
    Ok(())
}

fn cmd_rules_convert(rules: &Path, text: &str) -> Result<(), CliError> {
    let settings = Settings::load();
    let mut book = json::load_rules(rules)?;
    let bridge = ai_bridge(&settings)?;

    let before = book.len();
    bridge
        .apply_converted_rules(&mut book, text)
        .map_err(CliError::ai)?;
    json::save_rules(&book, rules)?;

    for rule in &book.rules()[before..] {
        println!("added: {}", rule);
    }
    Ok(())
}

fn cmd_rules_list(rules: &Path, json: bool) -> Result<(), CliError> {
    let book: RuleBook = json::load_rules(rules)?;
    if json {
        return print_json(&book);
    }
    if book.is_empty() {
        println!("no rules");
    }
    for (i, rule) in book.rules().iter().enumerate() {
        println!("{}. {}", i + 1, rule);
    }
    Ok(())
}

// ============================================================================
// priorities
// ============================================================================

fn cmd_priorities(
    from: Option<PathBuf>,
    template: Option<String>,
    set: Vec<String>,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let mut weights = match &from {
        Some(path) => json::load_priorities(path)?,
        None => PriorityWeights::default(),
    };

    if let Some(name) = template {
        let template: PriorityTemplate = name.parse().map_err(|e: PriorityError| {
            let names: Vec<&str> = PriorityTemplate::ALL.iter().map(|t| t.name()).collect();
            CliError::args(e.to_string()).with_hint(format!("templates: {}", names.join(", ")))
        })?;
        weights.apply_template(template);
    }

    for assignment in &set {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| CliError::args(format!("expected KEY=VALUE, got \"{}\"", assignment)))?;
        let key: PriorityKey = key.parse().map_err(|e: PriorityError| CliError::args(e.to_string()))?;
        let value: u32 = value
            .trim()
            .parse()
            .map_err(|_| CliError::args(format!("\"{}\" is not a whole number", value.trim())))?;
        weights
            .set(key, value)
            .map_err(|e| CliError::args(e.to_string()))?;
    }

    match output {
        Some(path) if !is_stdio(&path) => {
            json::export_priorities(&weights, &path)?;
            println!(
                "fulfillment={} cost={} speed={} -> {}",
                weights.fulfillment,
                weights.cost,
                weights.speed,
                path.display()
            );
            Ok(())
        }
        _ => print_json(&weights),
    }
}

// ============================================================================
// api
// ============================================================================

fn cmd_api(route: Route) -> Result<(), CliError> {
    let mut body = String::new();
    io::stdin()
        .read_to_string(&mut body)
        .map_err(|e| CliError::io(format!("stdin: {}", e)))?;

    let settings = Settings::load();
    let config = ResolvedAIConfig::from_settings(&settings.ai);
    let (response, failure_code) = match alchemist_ai::bridge_from_config(&config) {
        Ok(bridge) => (routes::handle(&bridge, route, &body), EXIT_ERROR),
        Err(e) => {
            let code = ai_exit_code(&e);
            (RouteResponse::failure(e.to_string()), code)
        }
    };

    let text = serde_json::to_string(&response)
        .map_err(|e| CliError { code: EXIT_ERROR, message: e.to_string(), hint: None })?;
    println!("{}", text);

    if response.is_success() {
        Ok(())
    } else {
        // The envelope on stdout already carries the message
        Err(CliError { code: failure_code, message: String::new(), hint: None })
    }
}
