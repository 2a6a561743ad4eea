// ABOUTME: Integration tests for the sift CLI binary.
// ABOUTME: Covers HTML file extraction, exit codes per failure kind, and the cache subcommands.

use assert_cmd::assert::OutputAssertExt;
use assert_cmd::cargo::CommandCargoExt;
use httpmock::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const CHAPTER_URL: &str = "https://site.example/chapter/1";

const CHAPTER_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>Chapter 1</title></head>
<body>
  <div class="reader-content">
    <img data-src="https://cdn.example.com/1.jpg" src="placeholder.gif">
    <img data-src="https://cdn.example.com/2.jpg" src="placeholder.gif">
    <img src="https://cdn.example.com/ad-banner.jpg">
  </div>
</body>
</html>"#;

fn sift_cmd(store: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sift").unwrap();
    cmd.arg("--store-dir").arg(store).env("RUST_LOG", "off");
    cmd
}

fn write_fixture(dir: &TempDir, html: &str) -> std::path::PathBuf {
    let path = dir.path().join("chapter.html");
    fs::write(&path, html).unwrap();
    path
}

#[test]
fn extract_html_prints_urls_in_order() {
    let tmp = TempDir::new().unwrap();
    let html = write_fixture(&tmp, CHAPTER_HTML);

    let output = sift_cmd(tmp.path())
        .args(["extract", CHAPTER_URL, "--html"])
        .arg(&html)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec!["https://cdn.example.com/1.jpg", "https://cdn.example.com/2.jpg"]
    );
}

#[test]
fn extract_json_output() {
    let tmp = TempDir::new().unwrap();
    let html = write_fixture(&tmp, CHAPTER_HTML);

    sift_cmd(tmp.path())
        .args(["extract", CHAPTER_URL, "--json", "--html"])
        .arg(&html)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"canonical_url\""))
        .stdout(predicate::str::contains("\"title\": \"Chapter 1\""))
        .stdout(predicate::str::contains("ad-banner").not());
}

#[test]
fn page_without_content_exits_2() {
    let tmp = TempDir::new().unwrap();
    let html = write_fixture(&tmp, "<html><body><p>Nothing</p></body></html>");

    sift_cmd(tmp.path())
        .args(["extract", CHAPTER_URL, "--html"])
        .arg(&html)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no content found"));
}

#[test]
fn http_error_exits_3() {
    let tmp = TempDir::new().unwrap();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/gone");
        then.status(404);
    });

    sift_cmd(tmp.path())
        .arg("extract")
        .arg(server.url("/gone"))
        .assert()
        .code(3)
        .stderr(predicate::str::contains("HTTP status 404"));
    mock.assert();
}

#[test]
fn non_markup_payload_exits_4() {
    let tmp = TempDir::new().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/feed");
        then.status(200)
            .header("content-type", "application/pdf")
            .body("%PDF-1.7");
    });

    sift_cmd(tmp.path())
        .arg("extract")
        .arg(server.url("/feed"))
        .assert()
        .code(4);
}

#[test]
fn relative_url_exits_1() {
    let tmp = TempDir::new().unwrap();
    sift_cmd(tmp.path())
        .args(["extract", "/chapter/1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid URL"));
}

#[test]
fn fetch_with_deny_flag() {
    let tmp = TempDir::new().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/chapter/1");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(CHAPTER_HTML);
    });

    sift_cmd(tmp.path())
        .arg("extract")
        .arg(server.url("/chapter/1"))
        .args(["--deny", "2.jpg"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://cdn.example.com/1.jpg"))
        .stdout(predicate::str::contains("2.jpg").not());
}

#[test]
fn persist_then_list_and_mark_cached() {
    let tmp = TempDir::new().unwrap();
    let html = write_fixture(&tmp, CHAPTER_HTML);

    for _ in 0..2 {
        sift_cmd(tmp.path())
            .args(["extract", CHAPTER_URL, "--persist", "--html"])
            .arg(&html)
            .assert()
            .success();
    }

    let output = sift_cmd(tmp.path())
        .args(["list", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let listed: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let entries = listed.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["canonical_url"], CHAPTER_URL);
    assert_eq!(entries[0]["cached"], false);
    assert_eq!(entries[0]["assets"][1], "https://cdn.example.com/2.jpg");

    sift_cmd(tmp.path())
        .args(["mark-cached", CHAPTER_URL, "/library/chapter-1"])
        .assert()
        .success();

    sift_cmd(tmp.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("* https://site.example/chapter/1"));
}

#[test]
fn mark_cached_unknown_exits_2() {
    let tmp = TempDir::new().unwrap();
    sift_cmd(tmp.path())
        .args(["mark-cached", "https://site.example/missing", "/tmp/x"])
        .assert()
        .code(2);
}
