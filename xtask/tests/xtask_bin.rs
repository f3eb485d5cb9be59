use std::process::Command;

fn xtask(arg: &str) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_xtask"))
        .arg(arg)
        .output()
        .expect("run xtask")
}

#[test]
fn help_lists_commands() {
    let output = xtask("help");
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("xtask commands"));
    assert!(stderr.contains("conform"));
}

#[test]
fn fixture_reports_conform() {
    let output = xtask("conform");
    assert!(
        output.status.success(),
        "stdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn engine_codes_have_explanations() {
    assert!(xtask("explain-coverage").status.success());
}

#[test]
fn unknown_command_fails() {
    assert!(!xtask("nope").status.success());
}

#[test]
fn checked_in_schemas_are_current() {
    let output = xtask("validate-schemas");
    assert!(
        output.status.success(),
        "stdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}
