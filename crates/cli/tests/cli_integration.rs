use std::process::Command;

fn discord_notify() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_discord-notify"));
    cmd.env_remove("DISCORD_BOT_TOKEN").env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_cli_version() {
    let output = discord_notify()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("discord-notify"));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_help() {
    let output = discord_notify()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    for command in ["send", "delete", "messages", "joined", "dm", "auth"] {
        assert!(stdout.contains(command), "help is missing `{command}`");
    }
}

#[test]
fn test_send_help() {
    let output = discord_notify()
        .args(["send", "--help"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--content"));
    assert!(stdout.contains("--json"));
}

#[test]
fn test_missing_token_fails_with_message() {
    let dir = tempfile::TempDir::new().unwrap();
    let output = discord_notify()
        .env("HOME", dir.path())
        .args(["--config"])
        .arg(dir.path().join("config.yaml"))
        .args(["messages", "123"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No bot token found"));
}
