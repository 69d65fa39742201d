use assert_cmd::Command;
use serde_json::Value;

fn marketscout(config_dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("marketscout").expect("binary built");
    cmd.env_remove("RUST_LOG")
        .arg("--config")
        .arg(config_dir.path().join("none.yaml"));
    cmd
}

#[test]
fn tools_lists_the_catalog_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let assert = marketscout(&dir)
        .args(["--output", "json", "tools"])
        .assert()
        .success();

    let payload: Value = serde_json::from_slice(&assert.get_output().stdout).expect("valid JSON");
    let kinds: Vec<_> = payload
        .as_array()
        .expect("array of tools")
        .iter()
        .map(|tool| tool["kind"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(kinds.len(), 4);
}

#[test]
fn parse_reads_model_output_from_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let assert = marketscout(&dir)
        .args(["--output", "json", "parse"])
        .write_stdin("Let me look.\n```json\n{\"tool\": \"search\", \"args\": {\"keyword\": \"x\"}}\n```")
        .assert()
        .success();

    let payload: Value = serde_json::from_slice(&assert.get_output().stdout).expect("valid JSON");
    assert_eq!(payload["toolCall"]["name"], "search");
    assert_eq!(payload["toolCall"]["args"]["keyword"], "x");
}

#[test]
fn parse_without_a_call_is_a_final_answer() {
    let dir = tempfile::tempdir().unwrap();
    let assert = marketscout(&dir)
        .arg("parse")
        .write_stdin("Show thinking\nKettle A is the pick.")
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(stdout.starts_with("final answer:"));
    assert!(stdout.contains("Kettle A is the pick."));
    assert!(!stdout.contains("Show thinking"));
}

#[test]
fn config_show_redacts_keys() {
    let dir = tempfile::tempdir().unwrap();
    let assert = marketscout(&dir)
        .env("MARKETSCOUT_LLM_API_KEY", "super-secret")
        .args(["config", "show"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(!stdout.contains("super-secret"));
    assert!(stdout.contains("***"));
}
