use std::io::Write;
use std::path::PathBuf;

use marketscout_cli::{load_config, Config, LogFormat};
use serial_test::serial;
use tokio_test::assert_ok;

const KEY_VARS: [&str; 4] = [
    "MARKETSCOUT_LLM_API_KEY",
    "GEMINI_API_KEY",
    "OPENAI_API_KEY",
    "SERPER_API_KEY",
];

fn clear_env() {
    for key in KEY_VARS {
        std::env::remove_var(key);
    }
    std::env::remove_var("MARKETSCOUT_LOG");
}

fn write_config(body: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file
}

#[tokio::test]
#[serial]
async fn explicit_file_is_parsed() {
    clear_env();
    let file = write_config(
        "log_level: warn\nlog_format: json\nengine:\n  max_turns: 6\n  limits:\n    search: 1\nllm:\n  api_keys: [k1, k2]\n",
    );
    let path = file.path().to_path_buf();

    let loaded = assert_ok!(load_config(Some(&path)).await);
    assert_eq!(loaded.path, path);
    assert_eq!(loaded.config.log_level, "warn");
    assert_eq!(loaded.config.log_format, LogFormat::Json);
    assert_eq!(loaded.config.engine.max_turns, 6);
    assert_eq!(loaded.config.engine.limits.search, 1);
    assert_eq!(loaded.config.engine.limits.external_search, 5);
    assert_eq!(loaded.config.llm.api_keys, vec!["k1", "k2"]);
}

#[tokio::test]
#[serial]
async fn missing_file_falls_back_to_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path: PathBuf = dir.path().join("absent.yaml");

    let loaded = assert_ok!(load_config(Some(&path)).await);
    assert_eq!(loaded.config, Config::default());
}

#[tokio::test]
#[serial]
async fn malformed_file_names_the_path() {
    clear_env();
    let file = write_config("engine: [not, a, map]\n");
    let path = file.path().to_path_buf();

    let err = load_config(Some(&path)).await.err().unwrap();
    assert!(format!("{err:#}").contains(&path.display().to_string()));
}

#[tokio::test]
#[serial]
async fn environment_keys_override_the_file() {
    clear_env();
    let file = write_config("llm:\n  api_keys: [from-file]\n");
    let path = file.path().to_path_buf();
    std::env::set_var("OPENAI_API_KEY", "from-env");
    std::env::set_var("SERPER_API_KEY", "serp");

    let loaded = load_config(Some(&path)).await;
    clear_env();

    let config = assert_ok!(loaded).config;
    assert_eq!(config.llm.api_keys, vec!["from-env", "from-file"]);
    assert_eq!(config.search.api_key.as_deref(), Some("serp"));
}
