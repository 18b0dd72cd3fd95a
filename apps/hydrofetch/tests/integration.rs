//! Integration tests for hydrofetch CLI

use std::process::Command;

fn hydrofetch() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_hydrofetch"));
    // Keep the user's configuration and environment out of the tests
    command
        .env_remove("RUST_LOG")
        .env_remove("HYDROFETCH_OUTPUT")
        .env_remove("HYDROFETCH_COLOR")
        .env_remove("HYDROFETCH_RESOLVER")
        .env_remove("HYDROFETCH_POLL_INTERVAL")
        .env_remove("HYDROFETCH_MAX_WAIT")
        .env_remove("HYDROFETCH_SCRATCH_DIR");
    command
}

fn empty_config() -> tempfile::NamedTempFile {
    tempfile::NamedTempFile::new().expect("Failed to create config file")
}

#[test]
fn test_cli_version() {
    let output = hydrofetch()
        .arg("--version")
        .output()
        .expect("Failed to execute hydrofetch");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("hydrofetch"));
}

#[test]
fn test_cli_help() {
    let output = hydrofetch()
        .arg("--help")
        .output()
        .expect("Failed to execute hydrofetch");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Fetch HydroShare resources by DOI or URL"));
    assert!(stdout.contains("detect"));
    assert!(stdout.contains("fetch"));
    assert!(stdout.contains("hosts"));
}

#[test]
fn test_cli_invalid_command() {
    let output = hydrofetch()
        .arg("invalid-command")
        .output()
        .expect("Failed to execute hydrofetch");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unrecognized subcommand"));
}

#[test]
fn test_fetch_requires_output_dir() {
    let output = hydrofetch()
        .args(["fetch", "10.4211/hs.abc"])
        .output()
        .expect("Failed to execute hydrofetch");

    assert!(!output.status.success());
}

#[test]
fn test_hosts_json_lists_hydroshare() {
    let config = empty_config();
    let output = hydrofetch()
        .arg("--config")
        .arg(config.path())
        .args(["--json", "hosts"])
        .output()
        .expect("Failed to execute hydrofetch");

    assert!(output.status.success());
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("hosts --json prints JSON");
    assert_eq!(json["kind"], "hosts");
    assert_eq!(json["result"][0]["name"], "HydroShare");
    assert_eq!(
        json["result"][0]["bag_endpoint"],
        "https://www.hydroshare.org/django_irods/download/bags/"
    );
}

#[test]
fn test_output_env_selects_json() {
    let config = empty_config();
    let output = hydrofetch()
        .env("HYDROFETCH_OUTPUT", "json")
        .arg("--config")
        .arg(config.path())
        .arg("hosts")
        .output()
        .expect("Failed to execute hydrofetch");

    assert!(output.status.success());
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("HYDROFETCH_OUTPUT=json prints JSON");
    assert_eq!(json["kind"], "hosts");
}

#[test]
fn test_config_default_output_selects_json() {
    let config = empty_config();
    std::fs::write(config.path(), "[general]\ndefault_output = \"json\"\n").unwrap();

    let output = hydrofetch()
        .arg("--config")
        .arg(config.path())
        .args(["detect", "https://example.org/not/a/resource"])
        .output()
        .expect("Failed to execute hydrofetch");

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["kind"], "detection");
}

#[test]
fn test_plain_output_is_text() {
    let config = empty_config();
    std::fs::write(config.path(), "[general]\ndefault_output = \"plain\"\n").unwrap();

    let output = hydrofetch()
        .arg("--config")
        .arg(config.path())
        .args(["detect", "https://example.org/not/a/resource"])
        .output()
        .expect("Failed to execute hydrofetch");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No provider applies to https://example.org/not/a/resource"));
    assert!(!stdout.contains('\u{1b}'));
}

#[test]
fn test_non_http_bag_endpoint_is_rejected() {
    let config = empty_config();
    std::fs::write(
        config.path(),
        r#"
[[hosts]]
name = "Mirror"
hostnames = ["https://mirror.example.org/resource/"]
bag_endpoint = "ftp://mirror.example.org/bags/"
"#,
    )
    .unwrap();

    let output = hydrofetch()
        .arg("--config")
        .arg(config.path())
        .arg("hosts")
        .output()
        .expect("Failed to execute hydrofetch");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ftp"));
}

#[test]
fn test_fetch_unknown_url_fails_without_output() {
    let config = empty_config();
    let target = tempfile::tempdir().expect("Failed to create temp dir");
    let output_dir = target.path().join("out");

    let output = hydrofetch()
        .arg("--config")
        .arg(config.path())
        .args(["fetch", "https://example.org/not/a/resource"])
        .arg(&output_dir)
        .output()
        .expect("Failed to execute hydrofetch");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("provider.not_applicable"));
    assert!(!output_dir.exists());
}

#[test]
fn test_detect_unknown_url_is_not_applicable() {
    let config = empty_config();
    let output = hydrofetch()
        .arg("--config")
        .arg(config.path())
        .args(["--json", "detect", "https://example.org/not/a/resource"])
        .output()
        .expect("Failed to execute hydrofetch");

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["kind"], "detection");
    assert!(json["result"]["spec"].is_null());
}

#[test]
fn test_detect_resource_url_without_network() {
    let config = empty_config();
    let output = hydrofetch()
        .arg("--config")
        .arg(config.path())
        .args([
            "--json",
            "detect",
            "https://www.hydroshare.org/resource/b8f6eae9d89241cf8b5904033460af61/",
        ])
        .output()
        .expect("Failed to execute hydrofetch");

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["result"]["provider"], "hydroshare");
    assert_eq!(
        json["result"]["spec"]["resource"],
        "b8f6eae9d89241cf8b5904033460af61"
    );
}

#[test]
fn test_invalid_config_fails() {
    let config = empty_config();
    std::fs::write(config.path(), "[polling]\nbackoff_multiplier = 0.5\n").unwrap();

    let output = hydrofetch()
        .arg("--config")
        .arg(config.path())
        .arg("hosts")
        .output()
        .expect("Failed to execute hydrofetch");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("polling.backoff_multiplier"));
}
