use std::io::Write;

use assert_cmd::Command;
use tempfile::NamedTempFile;

fn file_with(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

fn path(file: &NamedTempFile) -> &str {
    file.path().to_str().expect("utf-8 path")
}

#[test]
fn test_cli_exits_with_success_on_help() {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_parvograph"));
    cmd.arg("--help");
    cmd.assert().success();
}

#[test]
fn test_cli_runs_query_from_stdin() {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_parvograph"));
    cmd.write_stdin(
        "CREATE {'tag':'NNP'}(1), {'w':'WRITES'}(1,2), {'tag':'NN'}(2)\n\
         MATCH {'tag':'NNP'}(a), {'w':'WRITES'}(a,b), {'tag':'NN'}(b) RETURN a, b\n",
    );
    let output = cmd.output().expect("run");
    assert!(output.status.success());
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(rows[0]["a"]["name"], "1");
    assert_eq!(rows[0]["b"]["tag"], "NN");
}

#[test]
fn test_cli_loads_graph_and_query_files() {
    let graph = file_with("{'k': 1}(v1), {'k': 2}(v2), {'type': 'X'}(v1,v2)");
    let query = file_with("# rename\nMATCH {}(a), {'type': 'X'}(a,b) SET (assoc b \"k\" 7);\nRETURN\n");
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_parvograph"));
    cmd.args(["--graph", path(&graph), "--print-graph", path(&query)]);
    let output = cmd.output().expect("run");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf-8");
    assert!(stdout.contains("\"GRAPH\""), "{stdout}");
    assert!(stdout.trim_end().ends_with("{'k': 1}(v1), {'k': 7}(v2), {'type': 'X'}(v1,v2)"), "{stdout}");
}

#[test]
fn test_cli_reports_malformed_query_with_exit_code_one() {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_parvograph"));
    cmd.write_stdin("MATCH {}(a) WHERE (= 1");
    cmd.assert().code(1);
}

#[test]
fn test_cli_usage_and_config_errors_exit_with_two() {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_parvograph"));
    cmd.args(["--repeat", "lots"]);
    cmd.assert().code(2);

    let config = file_with(r#"{"unknown_option": true}"#);
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_parvograph"));
    cmd.args(["--config", path(&config)]);
    cmd.write_stdin("RETURN");
    cmd.assert().code(2);
}

#[test]
fn test_cli_repeat_flag_overrides_policy() {
    let graph = file_with("{'k': 1}(a), {'k': 1}(b), {'k': 1}(c)");
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_parvograph"));
    cmd.args(["--graph", path(&graph), "--repeat", "1", "-"]);
    cmd.write_stdin("MATCH {'k': 1}(x) RETURN x");
    let output = cmd.output().expect("run");
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(rows.as_array().map(Vec::len), Some(1));
}
