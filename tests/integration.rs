use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn logwin_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("logwin");
    path
}

fn setup_test_env() -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let logs_dir = root.join("logs");
    fs::create_dir_all(&logs_dir).unwrap();

    let mut app_log = String::new();
    for i in 1..=1000 {
        let level = if i % 10 == 0 { "ERROR" } else { "INFO" };
        app_log.push_str(&format!("{} request {} handled\n", level, i));
    }
    fs::write(logs_dir.join("app.log"), app_log).unwrap();
    fs::write(logs_dir.join("small.log"), "a\nb\ncc\na\n").unwrap();
    fs::write(logs_dir.join("empty.log"), "").unwrap();

    let config_content = format!(
        r#"[retrieval]
allowed_roots = ["{}/logs"]
default_lines = 20
max_lines = 5000
timeout_secs = 5

[codec]
default = "zstd"

[server]
bind = "127.0.0.1:7341"
"#,
        root.display()
    );

    let config_path = config_dir.join("logwin.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path, logs_dir)
}

fn run_logwin(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    run_logwin_in(&std::env::current_dir().unwrap(), config_path, args)
}

fn run_logwin_in(dir: &Path, config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = logwin_binary();
    let output = Command::new(&binary)
        .current_dir(dir)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run logwin binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_tail_last_lines() {
    let (_tmp, config_path, logs) = setup_test_env();
    let path = logs.join("small.log");

    let (stdout, stderr, success) =
        run_logwin(&config_path, &["tail", path.to_str().unwrap(), "-n", "2"]);
    assert!(success, "tail failed: stdout={}, stderr={}", stdout, stderr);
    assert_eq!(stdout, "cc\na\n");
}

#[test]
fn test_tail_default_lines_from_config() {
    let (_tmp, config_path, logs) = setup_test_env();
    let path = logs.join("app.log");

    let (stdout, _, success) = run_logwin(&config_path, &["tail", path.to_str().unwrap()]);
    assert!(success);
    assert_eq!(stdout.lines().count(), 20);
    assert_eq!(stdout.lines().last(), Some("ERROR request 1000 handled"));
}

#[test]
fn test_tail_grep_case_insensitive() {
    let (_tmp, config_path, logs) = setup_test_env();
    let path = logs.join("app.log");

    let (stdout, stderr, success) = run_logwin(
        &config_path,
        &["tail", path.to_str().unwrap(), "-n", "100", "--grep", "error"],
    );
    assert!(success, "tail failed: {}", stderr);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 10);
    assert!(lines.iter().all(|l| l.starts_with("ERROR")));
}

#[test]
fn test_tail_grep_invert() {
    let (_tmp, config_path, logs) = setup_test_env();
    let path = logs.join("app.log");

    let (stdout, _, success) = run_logwin(
        &config_path,
        &[
            "tail",
            path.to_str().unwrap(),
            "-n",
            "100",
            "--grep",
            "ERROR",
            "--invert",
        ],
    );
    assert!(success);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 90);
    assert!(lines.iter().all(|l| l.starts_with("INFO")));
}

#[test]
fn test_tail_no_match() {
    let (_tmp, config_path, logs) = setup_test_env();
    let path = logs.join("app.log");

    let (stdout, _, success) = run_logwin(
        &config_path,
        &["tail", path.to_str().unwrap(), "--grep", "panic"],
    );
    assert!(success);
    assert!(stdout.contains("No matching lines."));
}

#[test]
fn test_tail_shell_metacharacters_are_literal() {
    let (_tmp, config_path, logs) = setup_test_env();
    let path = logs.join("small.log");

    let (stdout, _, success) = run_logwin(
        &config_path,
        &["tail", path.to_str().unwrap(), "--grep", "a\" ; echo pwned; \""],
    );
    assert!(success);
    assert!(!stdout.contains("pwned"));
    assert!(stdout.contains("No matching lines."));
}

#[test]
fn test_tail_output_and_decode() {
    let (tmp, config_path, logs) = setup_test_env();
    let path = logs.join("app.log");
    let frame = tmp.path().join("window.lw");
    let decoded = tmp.path().join("window.txt");

    for codec in ["zstd", "lz4"] {
        let (stdout, stderr, success) = run_logwin(
            &config_path,
            &[
                "tail",
                path.to_str().unwrap(),
                "-n",
                "500",
                "--codec",
                codec,
                "--output",
                frame.to_str().unwrap(),
            ],
        );
        assert!(success, "tail --output failed: {}", stderr);
        assert!(stdout.contains("Wrote 500 lines"));
        assert!(stdout.contains(codec));

        let (_, stderr, success) = run_logwin(
            &config_path,
            &[
                "decode",
                frame.to_str().unwrap(),
                "--output",
                decoded.to_str().unwrap(),
            ],
        );
        assert!(success, "decode failed: {}", stderr);

        let text = fs::read_to_string(&decoded).unwrap();
        let original = fs::read_to_string(&path).unwrap();
        let expected: Vec<&str> = original.lines().skip(500).collect();
        assert_eq!(text.lines().collect::<Vec<_>>(), expected);
    }
}

#[test]
fn test_decode_rejects_garbage() {
    let (tmp, config_path, _logs) = setup_test_env();
    let frame = tmp.path().join("bad.lw");
    fs::write(&frame, b"not a frame at all").unwrap();

    let (_, stderr, success) = run_logwin(&config_path, &["decode", frame.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("codec error"), "got: {}", stderr);
}

#[test]
fn test_tail_traversal_rejected() {
    let (_tmp, config_path, _logs) = setup_test_env();

    let (_, stderr, success) = run_logwin(&config_path, &["tail", "../../etc/passwd"]);
    assert!(!success);
    assert!(stderr.contains("forbidden fragment"), "got: {}", stderr);
}

#[test]
fn test_tail_outside_allowed_root_rejected() {
    let (tmp, config_path, _logs) = setup_test_env();
    let outside = tmp.path().join("config").join("logwin.toml");

    let (_, stderr, success) = run_logwin(&config_path, &["tail", outside.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("outside the allowed"), "got: {}", stderr);
}

#[test]
fn test_tail_missing_and_empty_files() {
    let (_tmp, config_path, logs) = setup_test_env();

    let missing = logs.join("missing.log");
    let (_, stderr, success) = run_logwin(&config_path, &["tail", missing.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("not found"), "got: {}", stderr);

    let empty = logs.join("empty.log");
    let (_, stderr, success) = run_logwin(&config_path, &["tail", empty.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("empty"), "got: {}", stderr);
}

#[test]
fn test_check_command() {
    let (_tmp, config_path, _logs) = setup_test_env();

    let (stdout, _, success) = run_logwin(&config_path, &["check", "/data/app.log"]);
    assert!(success);
    assert_eq!(stdout.trim(), "accepted");

    let (stdout, _, success) = run_logwin(&config_path, &["check", "abc"]);
    assert!(!success);
    assert!(stdout.starts_with("rejected"));

    let (_, _, success) = run_logwin(
        &config_path,
        &["check", "/home/app.log", "--must-contain", "/data/"],
    );
    assert!(!success);
}

#[test]
fn test_stat_command() {
    let (_tmp, config_path, logs) = setup_test_env();
    let path = logs.join("app.log");

    let (stdout, stderr, success) = run_logwin(&config_path, &["stat", path.to_str().unwrap()]);
    assert!(success, "stat failed: {}", stderr);
    assert!(stdout.contains("lines:         1000"));
    assert!(stdout.contains("last_modified:"));
}

#[test]
fn test_missing_config_uses_defaults() {
    let tmp = TempDir::new().unwrap();
    let logs = tmp.path().join("logs");
    fs::create_dir_all(&logs).unwrap();
    let log = logs.join("app.log");
    fs::write(&log, "one\ntwo\nthree\n").unwrap();
    let outside = tmp.path().join("other.log");
    fs::write(&outside, "secret\n").unwrap();
    let config_path = tmp.path().join("absent.toml");

    // Built-in defaults only allow ./logs under the working directory.
    let (stdout, stderr, success) = run_logwin_in(
        tmp.path(),
        &config_path,
        &["tail", log.to_str().unwrap(), "-n", "1"],
    );
    assert!(success, "tail failed: {}", stderr);
    assert_eq!(stdout, "three\n");

    let (_, stderr, success) =
        run_logwin_in(tmp.path(), &config_path, &["tail", outside.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("outside the allowed"), "got: {}", stderr);
}

#[test]
fn test_decode_rejects_huge_declared_length() {
    let (tmp, config_path, _logs) = setup_test_env();
    let frame = tmp.path().join("huge.lw");
    let mut bytes = b"LW\x01\x01".to_vec();
    bytes.extend_from_slice(&u64::MAX.to_le_bytes());
    bytes.push(0);
    bytes.extend_from_slice(b"junk");
    fs::write(&frame, bytes).unwrap();

    let (_, stderr, success) = run_logwin(&config_path, &["decode", frame.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("codec error"), "got: {}", stderr);
    assert!(!stderr.contains("panicked"), "got: {}", stderr);
}

#[test]
fn test_empty_allowed_roots_is_config_error() {
    let (tmp, _config_path, logs) = setup_test_env();
    let bad = tmp.path().join("open.toml");
    fs::write(&bad, "[retrieval]\nallowed_roots = []\n").unwrap();
    let path = logs.join("app.log");

    let (_, stderr, success) = run_logwin(&bad, &["tail", path.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("allowed_roots"), "got: {}", stderr);
}

#[test]
fn test_invalid_config_errors() {
    let (tmp, _config_path, logs) = setup_test_env();
    let bad = tmp.path().join("bad.toml");
    fs::write(&bad, "[retrieval]\nmax_lines = 0\n").unwrap();
    let path = logs.join("app.log");

    let (_, stderr, success) = run_logwin(&bad, &["tail", path.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("max_lines"), "got: {}", stderr);
}
