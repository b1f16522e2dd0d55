//! Smoke tests -- verify the binary runs and its subcommands are wired up.

use assert_cmd::Command;

#[test]
fn test_cli_help() {
    Command::cargo_bin("anomalyscope")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("security log-anomaly"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("anomalyscope")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("anomalyscope"));
}

#[test]
fn test_upload_subcommand_exists() {
    Command::cargo_bin("anomalyscope")
        .unwrap()
        .args(["upload", "--help"])
        .assert()
        .success();
}

#[test]
fn test_watch_subcommand_exists() {
    Command::cargo_bin("anomalyscope")
        .unwrap()
        .args(["watch", "--help"])
        .assert()
        .success()
        .stdout(predicates::str::contains("--interval"));
}

#[test]
fn test_export_subcommand_exists() {
    Command::cargo_bin("anomalyscope")
        .unwrap()
        .args(["export", "--help"])
        .assert()
        .success()
        .stdout(predicates::str::contains("--format"));
}

#[test]
fn test_sort_rejects_unknown_key() {
    Command::cargo_bin("anomalyscope")
        .unwrap()
        .args(["--sort", "colour", "show"])
        .assert()
        .failure();
}

#[test]
fn test_show_fails_when_backend_is_down() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    Command::cargo_bin("anomalyscope")
        .unwrap()
        .env_remove("ANOMALYSCOPE_CONFIG")
        .args(["--server", &format!("http://{}", addr), "show"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("Failed to load anomalies."));
}
