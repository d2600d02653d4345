use assert_cmd::prelude::*;
use std::path::PathBuf;
use std::process::Command;
use std::{env, fs};

fn write_temp(name: &str, contents: &str) -> PathBuf {
    let path = env::temp_dir().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn runs_without_arguments() {
    let mut cmd = Command::cargo_bin("braid").unwrap();
    cmd.assert().success();
}

#[test]
fn run_minimal_prints_registers() {
    let path = write_temp("braid_it_add.asm", "MOV AX, 5\nMOV BX, 3\nADD AX, BX\nHLT\n");
    let output = Command::cargo_bin("braid")
        .unwrap()
        .args(["run", "--minimal"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("AX: 8"), "{stdout}");
    assert!(stdout.contains("BX: 3"), "{stdout}");
    assert!(stdout.contains("FLAGS: 0"), "{stdout}");
}

#[test]
fn check_accepts_good_source() {
    let path = write_temp("braid_it_good.asm", "// loop demo\nMOV CX, 2\nSUB CX, 1\nCMP CX, 0\nJNE 3\nHLT\n");
    let mut cmd = Command::cargo_bin("braid").unwrap();
    cmd.arg("check").arg(&path);
    cmd.assert().success();
}

#[test]
fn check_rejects_bad_source() {
    let path = write_temp("braid_it_bad.asm", "FOO AX, 1\n");
    let mut cmd = Command::cargo_bin("braid").unwrap();
    cmd.arg("check").arg(&path);
    cmd.assert().failure();
}
