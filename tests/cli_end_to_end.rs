use std::process::{Command as StdCommand, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use assert_cmd::Command;
use httpmock::MockServer;
use predicates::str::contains;
use serde_json::json;
use tempfile::NamedTempFile;

fn folio(server: &MockServer) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("folio"));
    cmd.env_remove("FOLIO_CONFIG_FILE")
        .env_remove("FOLIO__SESSION__TOKEN")
        .arg("--api-url")
        .arg(server.url("/api/v2"));
    cmd
}

fn note_body(nid: u64, title: &str) -> String {
    note_json(nid, title, false)
}

fn note_json(nid: u64, title: &str, hide: bool) -> String {
    json!({
        "data": {
            "id": format!("key-{nid}"),
            "nid": nid,
            "title": title,
            "text": "Rain on the window.",
            "created": "2024-05-01T08:00:00Z",
            "count": { "read": 3, "like": 1 },
            "mood": "calm",
            "weather": "rain",
            "hide": hide
        },
        "prev": { "id": "key-4", "nid": 4, "title": "Before" },
        "next": null
    })
    .to_string()
}

#[test]
fn read_prints_the_note() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/api/v2/notes/nid/5");
        then.status(200)
            .header("content-type", "application/json")
            .body(note_body(5, "Morning"));
    });

    let assert = folio(&server).arg("read").arg("/notes/5").assert().success();

    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(output.starts_with("Morning\n"));
    assert!(output.contains("calm · rain"));
    assert!(output.contains("Rain on the window."));
    assert!(output.contains("<- Before (/notes/4)"));
    mock.assert();
}

#[test]
fn prerendered_payload_hydrates_read() {
    let origin = MockServer::start();
    let origin_mock = origin.mock(|when, then| {
        when.method("GET").path("/api/v2/notes/nid/5");
        then.status(200)
            .header("content-type", "application/json")
            .body(note_body(5, "Prerendered"));
    });

    let handoff = NamedTempFile::new().expect("tmp file");
    folio(&origin)
        .arg("prerender")
        .arg("/notes/5")
        .arg("--output")
        .arg(handoff.path())
        .assert()
        .success();
    origin_mock.assert();

    let payload: serde_json::Value =
        serde_json::from_slice(&std::fs::read(handoff.path()).expect("read payload"))
            .expect("payload is JSON");
    assert_eq!(payload["__marker"], "/notes/5");
    assert_eq!(payload["nid"], 5);

    // The reader only goes back to the API for the sibling relation.
    let reader = MockServer::start();
    let relation_mock = reader.mock(|when, then| {
        when.method("GET").path("/api/v2/notes/nid/5");
        then.status(200)
            .header("content-type", "application/json")
            .body(note_body(5, "Prerendered"));
    });

    folio(&reader)
        .arg("read")
        .arg("/notes/5")
        .arg("--handoff")
        .arg(handoff.path())
        .assert()
        .success()
        .stdout(contains("Prerendered"))
        .stdout(contains("<- Before (/notes/4)"));
    relation_mock.assert();
}

#[test]
fn protected_note_asks_for_password() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/api/v2/notes/nid/7");
        then.status(403)
            .header("content-type", "application/json")
            .body(r#"{"message":"password required"}"#);
    });

    folio(&server)
        .arg("read")
        .arg("/notes/7")
        .assert()
        .success()
        .stdout(contains("Note 7"))
        .stdout(contains("--password"));
    mock.assert();
}

#[test]
fn missing_note_prints_not_found() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/api/v2/notes/nid/404");
        then.status(404)
            .header("content-type", "application/json")
            .body(r#"{"message":"gone"}"#);
    });

    folio(&server)
        .arg("read")
        .arg("/notes/404")
        .assert()
        .success()
        .stdout(contains("404 Not Found"));
    mock.assert();
}

#[test]
fn prerender_failure_exits_non_zero() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/api/v2/notes/nid/404");
        then.status(404);
    });

    folio(&server)
        .arg("prerender")
        .arg("/notes/404")
        .assert()
        .failure()
        .stderr(contains("document not found"));
}

#[test]
fn unknown_route_fails_fast() {
    let server = MockServer::start();
    folio(&server)
        .arg("read")
        .arg("/notes/1/comments/2")
        .assert()
        .failure()
        .stderr(contains("does not address a document"));
}

fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    done()
}

#[test]
fn watch_prints_once_and_stops_when_the_note_is_hidden() {
    let server = MockServer::start();
    let mut visible = server.mock(|when, then| {
        when.method("GET").path("/api/v2/notes/nid/5");
        then.status(200)
            .header("content-type", "application/json")
            .body(note_json(5, "Morning", false));
    });

    let mut child = StdCommand::new(assert_cmd::cargo::cargo_bin!("folio"))
        .env_remove("FOLIO_CONFIG_FILE")
        .env_remove("FOLIO__SESSION__TOKEN")
        .arg("--api-url")
        .arg(server.url("/api/v2"))
        .args(["watch", "/notes/5", "--interval-seconds", "1"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn folio");

    // Initial load plus two refreshes with unchanged content.
    assert!(
        wait_until(Duration::from_secs(20), || visible.hits() >= 3),
        "watch never refreshed"
    );
    visible.delete();
    server.mock(|when, then| {
        when.method("GET").path("/api/v2/notes/nid/5");
        then.status(200)
            .header("content-type", "application/json")
            .body(note_json(5, "Morning", true));
    });

    let exited = wait_until(Duration::from_secs(20), || {
        matches!(child.try_wait(), Ok(Some(_)))
    });
    if !exited {
        let _ = child.kill();
    }
    let output = child.wait_with_output().expect("collect output");
    assert!(exited, "watch kept running after the note was hidden");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("Rain on the window.").count(), 1);
    assert!(stdout.contains("-> /notes"));
}
