use assert_cmd::Command;
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::header;
use wiremock::matchers::method;
use wiremock::matchers::path;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn watch_refreshes_after_server_cancels_subscription() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auction_data.json"))
        .and(header("accept", "text/event-stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string("event: cancel\ndata: null\n\n"),
        )
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auction_data.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "uid": 402604, "address": "서울특별시 강서구", "maemulinfo": "아파트" }],
            "last_updated": "2026-03-14 06:00:00"
        })))
        .mount(&server)
        .await;

    let root = TempDir::new()?;
    let home = root.path().join("home");
    std::fs::create_dir_all(&home)?;
    std::fs::write(
        home.join("config.toml"),
        format!(
            "[remote]\ndatabase_url = \"{}\"\nsubscribe = true\n",
            server.uri()
        ),
    )?;

    let cwd = root.path().to_path_buf();
    let output = tokio::task::spawn_blocking(move || {
        Command::cargo_bin("auctiondash").map(|mut cmd| {
            cmd.current_dir(&cwd)
                .env_remove("RUST_LOG")
                .arg("--home")
                .arg(&home)
                .args(["watch", "--interval-secs", "1"])
                .timeout(Duration::from_secs(5))
                .output()
        })
    })
    .await??;
    let output = output?;

    let stdout = String::from_utf8(output.stdout)?;
    let updates = stdout
        .lines()
        .filter(|line| line.starts_with("remote-db"))
        .count();
    assert!(updates >= 2, "expected periodic refreshes, got:\n{stdout}");

    Ok(())
}
