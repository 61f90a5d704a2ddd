//! Integration tests for the pasp binary

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Run pasp inside `dir` with an isolated home directory.
fn pasp(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pasp"))
        .args(args)
        .current_dir(dir)
        .env("HOME", dir)
        .env_remove("PASP_DOCUMENT_ROOT")
        .env_remove("PASP_TABLE_CAPACITY")
        .env_remove("PASP_ACQUIRE_TIMEOUT_MS")
        .output()
        .expect("Failed to execute pasp")
}

fn site() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("site/sub")).unwrap();
    fs::write(dir.path().join("site/index.pasp"), b"Hello\r\n").unwrap();
    fs::write(
        dir.path().join("site/sub/list.pasp"),
        b"<% Response.Write \"x\" %>\r\n",
    )
    .unwrap();
    let old = filetime::FileTime::from_unix_time(1_000_000_000, 0);
    filetime::set_file_mtime(dir.path().join("site/index.pasp"), old).unwrap();
    filetime::set_file_mtime(dir.path().join("site/sub/list.pasp"), old).unwrap();
    dir
}

#[test]
fn test_build_recursive_then_up_to_date() {
    let dir = site();

    let output = pasp(dir.path(), &["build", "-r", "site"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{stdout}");
    assert!(stdout.contains("rebuilt    /site/__index.asp"));
    assert!(stdout.contains("rebuilt    /site/sub/__list.asp"));

    let script = fs::read_to_string(dir.path().join("site/sub/__list.asp")).unwrap();
    assert!(script.contains("XMLServDoc.Write \"x\""));

    let output = pasp(dir.path(), &["build", "-r", "-j", "2", "site"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("up-to-date /site/__index.asp"));
    assert!(stdout.contains("up-to-date /site/sub/__list.asp"));
}

#[test]
fn test_build_with_explicit_root() {
    let dir = site();
    let elsewhere = tempfile::tempdir().unwrap();
    let root = dir.path().join("site");

    let output = pasp(
        elsewhere.path(),
        &["build", "--root", root.to_str().unwrap(), "/index.pasp"],
    );
    assert!(output.status.success());
    assert!(root.join("__index.asp").exists());
}

#[test]
fn test_build_reports_failures() {
    let dir = site();
    fs::write(dir.path().join("site/bad.pasp"), b"<% x = 1").unwrap();

    let output = pasp(dir.path(), &["build", "site/bad.pasp", "site/index.pasp"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("/site/bad.pasp"));
    assert!(dir.path().join("site/__index.asp").exists());
    assert!(!dir.path().join("site/__bad.asp").exists());
}

#[test]
fn test_translate_to_stdout_and_file() {
    let dir = site();

    let output = pasp(dir.path(), &["translate", "site/index.pasp"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("XMLServDoc.WriteLine \"Hello\""));

    let output = pasp(dir.path(), &["translate", "site/index.pasp", "-o", "out.asp"]);
    assert!(output.status.success());
    let written = fs::read_to_string(dir.path().join("out.asp")).unwrap();
    assert_eq!(written, stdout);
}

#[test]
fn test_failed_translate_leaves_no_output_file() {
    let dir = site();
    fs::write(dir.path().join("bad.pasp"), b"Hello\r\n<% x = 1").unwrap();

    let output = pasp(dir.path(), &["translate", "bad.pasp", "-o", "out.asp"]);
    assert!(!output.status.success());
    assert!(!dir.path().join("out.asp").exists());

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}

#[test]
fn test_failed_translate_keeps_previous_output() {
    let dir = site();
    fs::write(dir.path().join("bad.pasp"), b"Hello\r\n<% x = 1").unwrap();
    fs::write(dir.path().join("out.asp"), b"previous good script").unwrap();

    let output = pasp(dir.path(), &["translate", "bad.pasp", "-o", "out.asp"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("bad.pasp"), "{stderr}");
    assert_eq!(
        fs::read(dir.path().join("out.asp")).unwrap(),
        b"previous good script"
    );
}

#[test]
fn test_config_show_outputs_toml() {
    let dir = tempfile::tempdir().unwrap();
    let output = pasp(dir.path(), &["config", "show"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("[table]"));
    assert!(stdout.contains("capacity = 64"));
    assert!(stdout.contains("acquire_timeout_ms = 5000"));
    assert!(stdout.contains("[build]"));
}

#[test]
fn test_config_show_reads_project_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join(".pasp")).unwrap();
    fs::write(
        dir.path().join(".pasp/config.toml"),
        "[table]\ncapacity = 8\n",
    )
    .unwrap();

    let output = pasp(dir.path(), &["config", "show"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("capacity = 8"));
}

#[test]
fn test_config_path() {
    let dir = tempfile::tempdir().unwrap();
    let output = pasp(dir.path(), &["config", "path"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("Global:"));
    assert!(stdout.contains("Project: .pasp/config.toml"));
}
