use assert_cmd::prelude::*;
use color_eyre::Result;
use std::path::Path;
use std::process::{Command, Output};

fn kiln(dir: &Path, args: &[&str]) -> Result<Output> {
    let config = dir.join("kiln.yaml");
    let output = Command::cargo_bin("kiln")?
        .arg("--config")
        .arg(&config)
        .args(args)
        .current_dir(dir)
        .output()?;
    println!("-- stdout --\n{}", String::from_utf8_lossy(&output.stdout));
    println!("-- stderr --\n{}", String::from_utf8_lossy(&output.stderr));
    Ok(output)
}

/// Config that keeps every file the build touches inside `dir`
fn write_config(dir: &Path) -> Result<()> {
    std::fs::write(
        dir.join("kiln.yaml"),
        format!(
            "sequencer:\n  backoff_ms: 0\ncheckpoint:\n  path: {}\nfiles:\n  root: {}\n",
            dir.join("state.json").display(),
            dir.join("target").display()
        ),
    )?;
    Ok(())
}

#[test]
fn test_actions_lists_builtins() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_config(dir.path())?;

    let output = kiln(dir.path(), &["actions"])?;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["disk.SetSize", "files.MkDir", "files.Write", "system.Reboot"] {
        assert!(stdout.contains(name), "Missing {} in action list", name);
    }
    Ok(())
}

#[test]
fn test_run_to_completion() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_config(dir.path())?;
    std::fs::write(
        dir.path().join("build.yaml"),
        "- files.MkDir: [\"/etc/kiln\"]\n- files.Write: [\"/etc/kiln/motd\", \"hello\"]\n",
    )?;

    let output = kiln(dir.path(), &["run", "build.yaml"])?;

    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Build complete"));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("target/etc/kiln/motd"))?,
        "hello"
    );
    assert!(!dir.path().join("state.json").exists());
    Ok(())
}

#[test]
fn test_restart_then_resume() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_config(dir.path())?;
    std::fs::write(
        dir.path().join("build.yaml"),
        "- files.MkDir: [\"/a\"]\n- system.Reboot: [0, \"drivers\"]\n- files.MkDir: [\"/b\"]\n",
    )?;

    let output = kiln(dir.path(), &["run", "build.yaml"])?;
    assert_eq!(output.status.code(), Some(3));
    assert!(dir.path().join("state.json").exists());
    assert!(!dir.path().join("target/b").exists());

    let output = kiln(dir.path(), &["run", "build.yaml", "--resume"])?;
    assert_eq!(output.status.code(), Some(0));
    assert!(dir.path().join("target/b").is_dir());
    Ok(())
}

#[test]
fn test_failing_action_exits_one() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_config(dir.path())?;
    std::fs::write(
        dir.path().join("build.yaml"),
        "- files.Write: [\"/blocker\", \"x\"]\n- files.MkDir: [\"/blocker/sub\"]\n- files.MkDir: [\"/never\"]\n",
    )?;

    let output = kiln(dir.path(), &["run", "build.yaml"])?;

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("action 1 (files.MkDir)"), "Missing failing action in diagnostic");
    assert!(!dir.path().join("target/never").exists());
    Ok(())
}

#[test]
fn test_validate() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_config(dir.path())?;
    std::fs::write(dir.path().join("good.json"), r#"[{"type": "system.Sleep", "args": [1]}]"#)?;
    std::fs::write(dir.path().join("bad.yaml"), "- system.Sleep: [1]\n- disk.Explode: []\n")?;

    assert_eq!(kiln(dir.path(), &["validate", "good.json"])?.status.code(), Some(0));

    let output = kiln(dir.path(), &["validate", "bad.yaml"])?;
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown action type: disk.Explode"));
    Ok(())
}

#[test]
fn test_usage_errors_exit_two() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_config(dir.path())?;

    let output = kiln(dir.path(), &["run", "missing.yaml"])?;
    assert_eq!(output.status.code(), Some(2));

    std::fs::write(dir.path().join("kiln.yaml"), "sequencer:\n  retries: 3\n")?;
    std::fs::write(dir.path().join("build.yaml"), "[]\n")?;
    let output = kiln(dir.path(), &["run", "build.yaml"])?;
    assert_eq!(output.status.code(), Some(2));
    Ok(())
}
