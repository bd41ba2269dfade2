use assert_cmd::Command;
use mockito::{Matcher, Server};
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn mf() -> Command {
    Command::cargo_bin("mf").unwrap()
}

#[test]
fn test_timestamp_prints_wire_format() {
    mf().arg("timestamp")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{6}\n$").unwrap());

    mf().args(["timestamp", "--millis"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}\n$").unwrap());
}

#[test]
fn test_new_without_server_fails() {
    mf().args(["new", "--user", "test_user"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("server"));
}

#[test]
fn test_new_prints_experiment_id() {
    let mut server = Server::new();
    let m = server
        .mock("POST", "/v1/mf/users/test_user/uniqueId123/create")
        .with_status(200)
        .with_body("uniqueId123")
        .create();

    mf().args([
        "new",
        "--server",
        &server.url(),
        "--user",
        "Test_User",
        "--experiment-id",
        "uniqueId123",
        "--hostname",
        "testhost",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("uniqueId123"))
    .stdout(predicate::str::contains("_all"));
    m.assert();
}

#[test]
fn test_update_from_config_file() {
    let mut server = Server::new();
    server
        .mock("POST", "/v1/mf/users/test_user/create")
        .with_status(200)
        .with_body("exp1")
        .create();
    let m = server
        .mock("POST", "/v1/mf/metrics/test_user/exp1?task=myapp")
        .match_body(Matcher::PartialJson(json!({
            "host": "testhost",
            "type": "foobar",
            "progress (%)": "20",
        })))
        .with_status(200)
        .with_body(r#"{"result":"created"}"#)
        .expect(2)
        .create();

    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("session.yaml");
    std::fs::write(
        &config_path,
        format!(
            "server: {}\nuser: test_user\napplication: myApp\nhostname: testhost\n",
            server.url()
        ),
    )
    .unwrap();

    mf().args(["update", "--config"])
        .arg(&config_path)
        .args([
            "--type",
            "foobar",
            "--name",
            "progress (%)",
            "--value",
            "20",
            "--count",
            "2",
            "--interval-ms",
            "10",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("created"));
    m.assert();
}

#[test]
fn test_register_workflow_rejects_invalid_json() {
    let tmp = TempDir::new().unwrap();
    let body = tmp.path().join("workflow.json");
    std::fs::write(&body, "{ not json").unwrap();

    mf().args(["register-workflow", "--server", "http://127.0.0.1:1", "--workflow", "ms2", "--body"])
        .arg(&body)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not valid JSON"));
}

#[test]
fn test_check_unreachable_server_fails() {
    mf().args(["probe", "http://127.0.0.1:1"]).assert().failure();
}

#[test]
fn test_update_rejects_zero_count() {
    let mut server = Server::new();
    let m = server.mock("POST", Matcher::Any).expect(0).create();

    mf().args([
        "update",
        "--server",
        &server.url(),
        "--user",
        "test_user",
        "--type",
        "foobar",
        "--name",
        "epoch",
        "--value",
        "1",
        "--count",
        "0",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("--count"));
    m.assert();
}

#[test]
fn test_verbose_new_logs_session() {
    let mut server = Server::new();
    server
        .mock("POST", "/v1/mf/users/test_user/create")
        .with_status(200)
        .with_body("exp1")
        .create();

    mf().args([
        "-v",
        "new",
        "--server",
        &server.url(),
        "--user",
        "test_user",
        "--hostname",
        "testhost",
    ])
    .env_remove("RUST_LOG")
    .assert()
    .success()
    .stderr(predicate::str::contains("session ready"));
}
