use std::process::{Command, Output};
use std::str;

fn schema(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_schema"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to spawn schema binary")
}

#[test]
fn no_command_is_a_usage_error() {
    let out = schema(&[]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn unknown_command_is_a_usage_error() {
    let out = schema(&["migrate"]);
    assert_eq!(out.status.code(), Some(2));
    let stderr = str::from_utf8(&out.stderr).unwrap();
    assert!(stderr.contains("migrate"), "stderr: {stderr}");
}

#[test]
fn help_lists_commands() {
    let out = schema(&["--help"]);
    assert!(out.status.success());
    let stdout = str::from_utf8(&out.stdout).unwrap();
    assert!(stdout.contains("build"));
    assert!(stdout.contains("destroy"));
}

#[test]
fn build_without_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = schema(&["-dir", dir.path().to_str().unwrap(), "-env=test", "build"]);

    assert_eq!(out.status.code(), Some(1));
    let stderr = str::from_utf8(&out.stderr).unwrap();
    assert!(stderr.contains("failed to load migration config"), "stderr: {stderr}");
    assert!(stderr.contains("cannot read file"), "stderr: {stderr}");
}

#[test]
fn destroy_with_unknown_environment_fails() {
    let dir = tempfile::tempdir().unwrap();
    let create = dir.path().join("create");
    std::fs::create_dir_all(&create).unwrap();
    std::fs::write(
        create.join("dbconf.toml"),
        "[development]\ndriver = \"postgres\"\nopen = \"dbname=postgres\"\n",
    )
    .unwrap();

    let out = schema(&["destroy", "--dir", dir.path().to_str().unwrap(), "--env", "staging"]);

    assert_eq!(out.status.code(), Some(1));
    let stderr = str::from_utf8(&out.stderr).unwrap();
    assert!(stderr.contains(r#"environment "staging" not found"#), "stderr: {stderr}");
}
