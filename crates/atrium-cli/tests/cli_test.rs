//! CLI integration tests against the built binary.
//!
//! Run with: `cargo test -p atrium-cli --test cli_test`

use std::process::Command;

fn atrium(dir: &std::path::Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_atrium"));
    command.current_dir(dir);
    for var in [
        "RUST_LOG",
        "LOG_FORMAT",
        "PUBLIC_ROOT",
        "DATABASE_URL",
        "MAX_UPLOAD_SIZE_MB",
    ] {
        command.env_remove(var);
    }
    command
}

#[test]
fn test_logging_settings_are_read_from_dotenv() {
    let dir = tempfile::tempdir().unwrap();
    let public = dir.path().join("public");
    std::fs::write(
        dir.path().join(".env"),
        format!(
            "LOG_FORMAT=json\nRUST_LOG=info\nPUBLIC_ROOT={}\n",
            public.display()
        ),
    )
    .unwrap();
    let source = dir.path().join("note.txt");
    std::fs::write(&source, b"hello").unwrap();

    let output = atrium(dir.path())
        .args(["files", "upload", "articles", "7"])
        .arg(&source)
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stored: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stored["url"], "/articles/files/7/note.txt");
    assert!(public.join("articles/files/7/note.txt").is_file());

    let stderr = String::from_utf8_lossy(&output.stderr);
    let upload_log = stderr
        .lines()
        .find(|line| line.contains("File upload stored"))
        .unwrap_or_else(|| panic!("no upload log line in {stderr}"));
    let event: serde_json::Value = serde_json::from_str(upload_log).unwrap();
    assert_eq!(event["level"], "INFO");
}
