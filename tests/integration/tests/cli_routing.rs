//! CLI binary integration tests.
//!
//! These tests exercise the compiled `coursehub` binary to verify command
//! routing, help text, error handling and the database-backed commands.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Locate the compiled `coursehub` binary in the workspace target directory.
///
/// Cargo sets `CARGO_MANIFEST_DIR` to this package's directory; the binary
/// lives under the workspace `target/debug/` unless `CARGO_TARGET_DIR` says
/// otherwise. Returns `None` when the binary has not been built.
fn coursehub_bin() -> Option<PathBuf> {
    let target = match std::env::var_os("CARGO_TARGET_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
            // tests/integration -> workspace root
            manifest_dir.parent()?.parent()?.join("target")
        }
    };
    let bin = target
        .join("debug")
        .join(format!("coursehub{}", std::env::consts::EXE_SUFFIX));
    if bin.exists() {
        Some(bin)
    } else {
        eprintln!(
            "coursehub binary not found at {}; run `cargo build -p coursehub-cli` first",
            bin.display()
        );
        None
    }
}

/// A scratch config pointing at a database inside `dir`.
fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("config.json5");
    let db = dir.join("coursehub.db");
    let content = format!(
        "{{ storage: {{ database: {} }} }}",
        serde_json::to_string(&db.to_string_lossy()).unwrap()
    );
    std::fs::write(&path, content).unwrap();
    path
}

fn run(bin: &Path, config: Option<&Path>, args: &[&str]) -> Output {
    let mut cmd = Command::new(bin);
    cmd.env_remove("COURSEHUB_CONFIG")
        .env_remove("COURSEHUB_DATABASE")
        .env_remove("RUST_LOG");
    if let Some(config) = config {
        cmd.arg("--config").arg(config);
    }
    cmd.args(args).output().expect("failed to run coursehub")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_cli_version() {
    let Some(bin) = coursehub_bin() else { return };
    let output = run(&bin, None, &["version"]);
    assert!(output.status.success(), "version command should succeed");
    assert!(
        stdout(&output).contains("coursehub"),
        "version output should contain 'coursehub', got: {}",
        stdout(&output)
    );
}

#[test]
fn test_cli_help() {
    let Some(bin) = coursehub_bin() else { return };
    let output = run(&bin, None, &["--help"]);
    assert!(output.status.success(), "--help should succeed");
    let text = stdout(&output);
    for command in ["gateway", "users", "sessions", "seed", "config"] {
        assert!(
            text.contains(command),
            "help output should mention '{}', got: {}",
            command,
            text
        );
    }
}

#[test]
fn test_cli_unknown_command() {
    let Some(bin) = coursehub_bin() else { return };
    let output = run(&bin, None, &["nonexistent-command"]);
    assert!(
        !output.status.success(),
        "unknown command should return non-zero exit code"
    );
}

#[test]
fn test_cli_config_path_follows_flag() {
    let Some(bin) = coursehub_bin() else { return };
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    let output = run(&bin, Some(&config), &["config", "path"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), config.display().to_string());

    let output = run(&bin, Some(&config), &["config", "validate"]);
    assert!(output.status.success(), "config validate should succeed");
}

#[test]
fn test_cli_users_and_sessions() {
    let Some(bin) = coursehub_bin() else { return };
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    let output = run(&bin, Some(&config), &["users", "add", "ada", "--name", "Ada Lovelace"]);
    assert!(output.status.success(), "users add should succeed");

    let output = run(&bin, Some(&config), &["users", "add", "ada"]);
    assert!(!output.status.success(), "duplicate users should be rejected");

    let output = run(&bin, Some(&config), &["users", "list"]);
    assert!(stdout(&output).contains("Ada Lovelace"));

    let output = run(&bin, Some(&config), &["sessions", "issue", "ada"]);
    assert!(output.status.success(), "sessions issue should succeed");
    let token = stdout(&output).trim().to_string();
    assert!(!token.is_empty());

    let output = run(&bin, Some(&config), &["sessions", "revoke", &token]);
    assert!(output.status.success(), "sessions revoke should succeed");

    let output = run(&bin, Some(&config), &["sessions", "issue", "nobody"]);
    assert!(!output.status.success(), "unknown users get no session");
}

#[test]
fn test_cli_seed() {
    let Some(bin) = coursehub_bin() else { return };
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    let output = run(&bin, Some(&config), &["seed"]);
    assert!(output.status.success(), "seed should succeed");
    let text = stdout(&output);
    assert!(text.contains("prof_davis"), "seed should print sessions, got: {}", text);
    assert!(text.contains("emma1"), "seed should print sessions, got: {}", text);

    let output = run(&bin, Some(&config), &["users", "list"]);
    assert!(stdout(&output).contains("James Davis"));
}
