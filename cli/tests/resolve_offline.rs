use assert_cmd::Command;
use predicates::str::contains;
use pretty_assertions::assert_eq;
use serde_json::Value;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

/// Working directory two levels down so no candidate escapes the tempdir.
fn site(root: &TempDir) -> Result<std::path::PathBuf, Box<dyn std::error::Error>> {
    let site = root.path().join("www").join("dashboard");
    std::fs::create_dir_all(&site)?;
    Ok(site)
}

fn auctiondash(home: &Path, cwd: &Path) -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("auctiondash")?;
    cmd.current_dir(cwd)
        .env_remove("RUST_LOG")
        .arg("--home")
        .arg(home);
    Ok(cmd)
}

#[test]
fn resolve_without_sources_serves_sample() -> Result<(), Box<dyn std::error::Error>> {
    let root = TempDir::new()?;
    let site = site(&root)?;

    auctiondash(&root.path().join("home"), &site)?
        .args(["resolve", "--no-remote"])
        .assert()
        .success()
        .stdout(contains("source: sample-data"))
        .stdout(contains("records: 2"));

    Ok(())
}

#[test]
fn resolve_prefers_local_export_over_sample() -> Result<(), Box<dyn std::error::Error>> {
    let root = TempDir::new()?;
    let site = site(&root)?;
    let export = json!({
        "data": [
            { "uid": 1, "address": "서울특별시 마포구", "maemulinfo": "오피스텔" },
            { "uid": 2, "naddress": "경기도 성남시", "type": "아파트" },
            { "uid": 3, "address": "서울특별시 노원구", "maemulinfo": "아파트" }
        ],
        "last_updated": "2026-03-14 06:00:00"
    });
    std::fs::write(
        root.path().join("www").join("dashboard_data.json"),
        serde_json::to_vec(&export)?,
    )?;

    let output = auctiondash(&root.path().join("home"), &site)?
        .args(["resolve", "--no-remote", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let dataset: Value = serde_json::from_slice(&output)?;
    assert_eq!(dataset["source"], json!("local-file"));
    assert_eq!(dataset["is_sample"], json!(false));
    assert_eq!(dataset["data"].as_array().map(Vec::len), Some(3));
    assert!(dataset.get("loadedAt").is_some(), "loadedAt missing");

    Ok(())
}

#[test]
fn status_and_clear_on_empty_home() -> Result<(), Box<dyn std::error::Error>> {
    let root = TempDir::new()?;
    let site = site(&root)?;
    let home = root.path().join("home");

    auctiondash(&home, &site)?
        .arg("status")
        .assert()
        .success()
        .stdout(contains("live: none"))
        .stdout(contains("backup: none"));

    auctiondash(&home, &site)?
        .arg("clear-cache")
        .assert()
        .success()
        .stdout(contains("cleared cache"));

    Ok(())
}

#[test]
fn malformed_config_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let root = TempDir::new()?;
    let site = site(&root)?;
    let home = root.path().join("home");
    std::fs::create_dir_all(&home)?;
    std::fs::write(home.join("config.toml"), "[retry]\nmax_attempts = \"many\"\n")?;

    auctiondash(&home, &site)?
        .arg("status")
        .assert()
        .failure()
        .stderr(contains("invalid config file"));

    Ok(())
}
