use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn drive_cli() -> Command {
    Command::cargo_bin("drive-cli").expect("binary is built")
}

#[test]
fn help_lists_commands() {
    drive_cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("upload"))
        .stdout(predicate::str::contains("count"));
}

#[test]
fn upload_requires_a_file_argument() {
    drive_cli()
        .args(["upload", "--name", "Jane Doe", "--email", "a@b.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--file"));
}

#[test]
fn unreadable_file_is_reported_with_its_path() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.pdf");

    drive_cli()
        .args(["count", "--file"])
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.pdf"));
}

#[test]
fn blank_name_fails_before_contacting_the_server() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("notes.txt");
    std::fs::write(&file, "not a pdf").unwrap();

    drive_cli()
        .args(["--server-url", "http://127.0.0.1:9", "upload"])
        .args(["--name", " ", "--email", "a@b.com", "--file"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Name, email and file are required."));
}
