// Integration tests for the offline commands and the --json stdout contract.
//
// Every --json command must print exactly one JSON value on stdout.
//
// Run with: cargo test -p alchemist-cli --test cli_tests -- --nocapture

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use serde_json::{json, Value};
use tempfile::TempDir;

fn alchemist(dir: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_alchemist"));
    cmd.current_dir(dir.path())
        .env("ALCHEMIST_SETTINGS", dir.path().join("settings.json"))
        .env_remove("ALCHEMIST_OPENAI_KEY")
        .env_remove("OPENAI_API_KEY")
        .env_remove("ALCHEMIST_OPENAI_BASE_URL")
        .env_remove("ALCHEMIST_MODEL")
        .env_remove("RUST_LOG");
    cmd
}

fn run_with_stdin(mut cmd: Command, input: &str) -> Output {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn alchemist");
    child.stdin.take().unwrap().write_all(input.as_bytes()).unwrap();
    child.wait_with_output().unwrap()
}

/// Assert stdout is a single, parseable JSON value with no extra lines.
fn assert_single_json(stdout: &[u8]) -> Value {
    let text = String::from_utf8_lossy(stdout);
    let trimmed = text.trim();
    assert!(!trimmed.is_empty(), "stdout should not be empty");
    serde_json::from_str(trimmed)
        .unwrap_or_else(|e| panic!("stdout must be one JSON value.\nParse error: {}\nstdout:\n{}", e, trimmed))
}

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

const CLIENTS: &str = "\
ClientID,ClientName,PriorityLevel,AttributesJSON
C1,Acme,3,{}
C2,Globex,9,\"{\"\"budget\"\": 100}\"
C3,,2,{
";

// ===========================================================================
// check
// ===========================================================================

#[test]
fn check_valid_file_exits_zero() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "ok.csv", "ClientID,PriorityLevel\nC1,1\nC2,5\n");

    let output = alchemist(&dir).args(["check", file.to_str().unwrap()]).output().unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("2 rows x 2 columns"));
    assert!(stdout.contains("all cells valid"));
}

#[test]
fn check_json_reports_every_invalid_cell() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "clients.csv", CLIENTS);

    let output = alchemist(&dir)
        .args(["check", file.to_str().unwrap(), "--json"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(5), "stderr: {}", stderr(&output));
    let val = assert_single_json(&output.stdout);
    assert_eq!(val["rows"], json!(3));
    assert_eq!(val["columns"], json!(4));
    assert_eq!(val["valid"], json!(false));
    assert_eq!(
        val["errors"],
        json!([
            {"row": 1, "col": 2, "column": "PriorityLevel", "value": "9",
             "message": "PriorityLevel must be between 1 and 5"},
            {"row": 2, "col": 1, "column": "ClientName", "value": "",
             "message": "Missing value in ClientName"},
            {"row": 2, "col": 3, "column": "AttributesJSON", "value": "{",
             "message": "Invalid JSON"}
        ])
    );
    assert!(stderr(&output).contains("error: 3 invalid cells"));
}

#[test]
fn check_reads_stdin_and_pads_short_rows() {
    let dir = TempDir::new().unwrap();
    let mut cmd = alchemist(&dir);
    cmd.args(["check", "-", "--json"]);
    let output = run_with_stdin(cmd, "ClientID;PriorityLevel\nC1;2\nC2\n");

    assert_eq!(output.status.code(), Some(5));
    let val = assert_single_json(&output.stdout);
    assert_eq!(val["errors"][0]["message"], json!("Missing value in PriorityLevel"));
}

#[test]
fn check_honours_validation_settings() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "settings.json",
        r#"{
            // urgency scale runs 0-9 here
            "validation": {"priority_column": "Urgency", "priority_min": 0, "priority_max": 9}
        }"#,
    );
    let file = write(&dir, "t.csv", "TaskID,Urgency\nT1,0\nT2,9\n");

    let output = alchemist(&dir).args(["check", file.to_str().unwrap()]).output().unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
}

#[test]
fn check_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let output = alchemist(&dir).args(["check", "nope.csv"]).output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).starts_with("error:"));
}

#[test]
fn check_ragged_surplus_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "bad.csv", "A,B\n1,2,3\n");
    let output = alchemist(&dir).args(["check", file.to_str().unwrap()]).output().unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("row 0 has 3 fields, expected 2"));
}

// ===========================================================================
// edit
// ===========================================================================

#[test]
fn edit_by_column_name_rewrites_file() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "clients.csv", "ClientID,PriorityLevel\nC1,9\n");

    let output = alchemist(&dir)
        .args(["edit", file.to_str().unwrap(), "--row", "0", "--column", "PriorityLevel", "--value", "4"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "ClientID,PriorityLevel\nC1,4\n");
    assert!(stderr(&output).contains("0-1 PriorityLevel: ok"));
}

#[test]
fn edit_invalid_value_is_kept_and_reported() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "clients.csv", "ClientID,PriorityLevel\nC1,2\n");
    let out = dir.path().join("out.csv");

    let output = alchemist(&dir)
        .args([
            "edit", file.to_str().unwrap(),
            "--row", "0", "--col", "1", "--value", "0",
            "-o", out.to_str().unwrap(), "--json",
        ])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(5));
    let val = assert_single_json(&output.stdout);
    assert_eq!(val["error"], json!("PriorityLevel must be between 1 and 5"));
    assert_eq!(val["invalid_cells"], json!(1));
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "ClientID,PriorityLevel\nC1,0\n");
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "ClientID,PriorityLevel\nC1,2\n");
}

#[test]
fn edit_valid_cell_still_fails_when_other_cells_are_invalid() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "clients.csv", "ClientID,PriorityLevel\nC1,9\nC2,3\n");

    let output = alchemist(&dir)
        .args(["edit", file.to_str().unwrap(), "--row", "1", "--col", "1", "--value", "4"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(5), "stderr: {}", stderr(&output));
    let err = stderr(&output);
    assert!(err.contains("1-1 PriorityLevel: ok"));
    assert!(err.contains("error: 1 invalid cell elsewhere in the table"));
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "ClientID,PriorityLevel\nC1,9\nC2,4\n");
}

#[test]
fn edit_in_place_keeps_source_delimiter() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "clients.csv", "ClientID;PriorityLevel\nC1;2\nC2;3\n");

    let output = alchemist(&dir)
        .args(["edit", file.to_str().unwrap(), "--row", "0", "--col", "1", "--value", "4"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "ClientID;PriorityLevel\nC1;4\nC2;3\n");
}

#[test]
fn edit_to_new_output_uses_configured_delimiter() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "clients.csv", "ClientID;PriorityLevel\nC1;2\n");
    let out = dir.path().join("out.csv");

    let output = alchemist(&dir)
        .args([
            "edit", file.to_str().unwrap(),
            "--row", "0", "--col", "1", "--value", "4",
            "-o", out.to_str().unwrap(),
        ])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "ClientID,PriorityLevel\nC1,4\n");
}

#[test]
fn edit_unknown_column_lists_headers() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "clients.csv", "ClientID,PriorityLevel\nC1,2\n");

    let output = alchemist(&dir)
        .args(["edit", file.to_str().unwrap(), "--row", "0", "--column", "Nope", "--value", "x"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("available columns: ClientID, PriorityLevel"));
}

#[test]
fn edit_out_of_bounds_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "clients.csv", "ClientID,PriorityLevel\nC1,2\n");

    let output = alchemist(&dir)
        .args(["edit", file.to_str().unwrap(), "--row", "5", "--col", "0", "--value", "x"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "ClientID,PriorityLevel\nC1,2\n");
}

// ===========================================================================
// rules
// ===========================================================================

#[test]
fn rules_add_then_list_json() {
    let dir = TempDir::new().unwrap();

    let output = alchemist(&dir)
        .args(["rules", "add", "--type", "co-run", "--target1", "T1", "--target2", "T2"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "added: co-run -> T1 & T2");

    let output = alchemist(&dir)
        .args(["rules", "add", "--type", "slot-requirement", "--target1", "GroupA", "--value", "2"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let output = alchemist(&dir).args(["rules", "list", "--json"]).output().unwrap();
    assert!(output.status.success());
    assert_eq!(
        assert_single_json(&output.stdout),
        json!([
            {"type": "co-run", "target1": "T1", "target2": "T2"},
            {"type": "slot-requirement", "target1": "GroupA", "value": "2"}
        ])
    );
}

#[test]
fn rules_add_rejects_missing_target2() {
    let dir = TempDir::new().unwrap();

    let output = alchemist(&dir)
        .args(["rules", "add", "--type", "co-run", "--target1", "T1"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(6));
    assert!(!dir.path().join("rules.json").exists());
}

#[test]
fn rules_add_unknown_kind_has_hint() {
    let dir = TempDir::new().unwrap();

    let output = alchemist(&dir)
        .args(["rules", "add", "--type", "load-limit", "--target1", "W1"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(6));
    assert!(stderr(&output).contains("hint:  kinds: co-run"));
}

#[test]
fn rules_list_empty() {
    let dir = TempDir::new().unwrap();
    let output = alchemist(&dir).args(["rules", "list"]).output().unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "no rules");
}

// ===========================================================================
// priorities
// ===========================================================================

#[test]
fn priorities_default_and_template() {
    let dir = TempDir::new().unwrap();

    let output = alchemist(&dir).args(["priorities"]).output().unwrap();
    assert_eq!(
        assert_single_json(&output.stdout),
        json!({"fulfillment": 40, "cost": 30, "speed": 30})
    );

    let output = alchemist(&dir).args(["priorities", "--template", "balanced"]).output().unwrap();
    assert_eq!(
        assert_single_json(&output.stdout),
        json!({"fulfillment": 33, "cost": 33, "speed": 34})
    );
}

#[test]
fn priorities_set_and_export() {
    let dir = TempDir::new().unwrap();

    let output = alchemist(&dir)
        .args(["priorities", "--set", "fulfillment=70", "-o", "priorities.json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let saved: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("priorities.json")).unwrap()).unwrap();
    assert_eq!(saved, json!({"fulfillment": 54, "cost": 23, "speed": 23}));

    let output = alchemist(&dir)
        .args(["priorities", "--from", "priorities.json", "--template", "Minimize Cost"])
        .output()
        .unwrap();
    assert_eq!(
        assert_single_json(&output.stdout),
        json!({"fulfillment": 20, "cost": 70, "speed": 10})
    );
}

#[test]
fn priorities_bad_assignment() {
    let dir = TempDir::new().unwrap();
    for bad in ["quality=10", "speed", "cost=101", "cost=abc"] {
        let output = alchemist(&dir).args(["priorities", "--set", bad]).output().unwrap();
        assert_eq!(output.status.code(), Some(2), "{}", bad);
    }
}

// ===========================================================================
// ai doctor / api without a key
// ===========================================================================

#[test]
fn ai_doctor_json_missing_key() {
    let dir = TempDir::new().unwrap();
    let output = alchemist(&dir).args(["ai", "doctor", "--json"]).output().unwrap();

    assert_eq!(output.status.code(), Some(11));
    let val = assert_single_json(&output.stdout);
    assert_eq!(val["status"], json!("missing_key"));
    assert_eq!(val["provider"], json!("openai"));
    assert_eq!(val["model"], json!("gpt-3.5-turbo"));
    assert_eq!(val["key_present"], json!(false));
}

#[test]
fn ai_doctor_disabled() {
    let dir = TempDir::new().unwrap();
    write(&dir, "settings.json", r#"{"ai": {"provider": "none"}}"#);
    let output = alchemist(&dir).args(["ai", "doctor"]).output().unwrap();
    assert_eq!(output.status.code(), Some(10));
    assert!(String::from_utf8_lossy(&output.stdout).contains("AI is disabled"));
}

#[test]
fn ai_doctor_never_prints_key() {
    let dir = TempDir::new().unwrap();
    let output = alchemist(&dir)
        .env("OPENAI_API_KEY", "sk-very-secret")
        .args(["ai", "doctor", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let val = assert_single_json(&output.stdout);
    assert_eq!(val["key_source"], json!("environment"));
    assert!(!String::from_utf8_lossy(&output.stdout).contains("sk-very-secret"));
}

#[cfg(not(feature = "keychain"))]
#[test]
fn ai_set_key_without_keychain_support() {
    let dir = TempDir::new().unwrap();
    let mut cmd = alchemist(&dir);
    cmd.args(["ai", "set-key"]);
    let output = run_with_stdin(cmd, "sk-very-secret\n");

    assert_eq!(output.status.code(), Some(12));
    let err = stderr(&output);
    assert!(err.contains("Keychain support not enabled"));
    assert!(!err.contains("sk-very-secret"));
}

#[test]
fn ai_set_key_rejects_empty_stdin() {
    let dir = TempDir::new().unwrap();
    let mut cmd = alchemist(&dir);
    cmd.args(["ai", "set-key"]);
    let output = run_with_stdin(cmd, "  \n");

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("no API key on stdin"));
}

#[test]
fn api_without_key_returns_failure_envelope() {
    let dir = TempDir::new().unwrap();
    let mut cmd = alchemist(&dir);
    cmd.args(["api", "convert-rule"]);
    let output = run_with_stdin(cmd, r#"{"prompt": "Co-run T1 and T2"}"#);

    assert_eq!(output.status.code(), Some(11));
    assert_eq!(
        assert_single_json(&output.stdout),
        json!({"success": false, "error": "API key not configured"})
    );
}

#[test]
fn api_unknown_route_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let output = alchemist(&dir).args(["api", "explode"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn settings_file_created_on_first_run() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "ok.csv", "A\n1\n");
    alchemist(&dir).args(["check", file.to_str().unwrap()]).output().unwrap();
    let settings = Path::new(dir.path()).join("settings.json");
    assert!(std::fs::read_to_string(settings).unwrap().contains("\"provider\": \"openai\""));
}
