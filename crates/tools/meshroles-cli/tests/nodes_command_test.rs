use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/info.txt")
}

fn meshroles(data_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("meshroles").unwrap();
    cmd.env("MESHROLES_DATA_DIR", data_dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_nodes_lists_all_sorted() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempdir()?;
    let output = meshroles(temp_dir.path())
        .arg("nodes")
        .arg("--input")
        .arg(fixture())
        .output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("All Nodes (Filtered & Sorted):"));
    let base = stdout.find("Base Camp").unwrap();
    let ridge = stdout.find("Ridge {north} Relay").unwrap();
    let car = stdout.find("CAR").unwrap();
    let silo = stdout.find("Grain Silo").unwrap();
    assert!(base < ridge && ridge < car && car < silo, "unexpected order:\n{stdout}");
    Ok(())
}

#[test]
fn test_nodes_direct_mode_and_legacy_flag_agree() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempdir()?;
    for args in [vec!["--mode", "direct"], vec!["--direct"]] {
        meshroles(temp_dir.path())
            .arg("nodes")
            .arg("--input")
            .arg(fixture())
            .args(&args)
            .assert()
            .success()
            .stdout(predicate::str::contains("Directly Connected Nodes"))
            .stdout(predicate::str::contains("Ridge {north} Relay"))
            .stdout(predicate::str::contains("Grain Silo"))
            .stdout(predicate::str::contains("Base Camp").not());
    }
    Ok(())
}

#[test]
fn test_nodes_routers_json_output() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempdir()?;
    let output = meshroles(temp_dir.path())
        .args(["nodes", "--routers", "--output", "json", "--input"])
        .arg(fixture())
        .output()?;
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let roles: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["ROUTER", "REPEATER"]);
    Ok(())
}

#[test]
fn test_nodes_age_filter_keeps_never_heard() -> Result<(), Box<dyn std::error::Error>> {
    // Fixture timestamps are from 2023, so only the node with no lastHeard survives.
    let temp_dir = tempdir()?;
    meshroles(temp_dir.path())
        .args(["nodes", "--age", "1d", "--input"])
        .arg(fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("Grain Silo"))
        .stdout(predicate::str::contains("Base Camp").not());
    Ok(())
}

#[test]
fn test_nodes_json_out_writes_report() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempdir()?;
    let report = temp_dir.path().join("report.json");
    meshroles(temp_dir.path())
        .args(["nodes", "--input"])
        .arg(fixture())
        .arg("--json-out")
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains("JSON report saved to"));

    let rows: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report)?)?;
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0]["id"], "!aabbccdd");
    assert_eq!(rows[2]["name"], "CAR");
    assert_eq!(rows[2]["role"], "UNKNOWN");
    assert!(rows[3]["last_heard"].is_null());
    assert_eq!(rows[3]["last_heard_str"], "N/A");
    Ok(())
}

#[test]
fn test_nodes_age_older_than_the_calendar_keeps_everything() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempdir()?;
    meshroles(temp_dir.path())
        .args(["nodes", "--age", "100000000d", "--input"])
        .arg(fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("Base Camp"))
        .stdout(predicate::str::contains("Grain Silo"));
    Ok(())
}

#[test]
fn test_nodes_rejects_bad_age() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempdir()?;
    meshroles(temp_dir.path())
        .args(["nodes", "--age", "3w", "--input"])
        .arg(fixture())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid age '3w'"));
    Ok(())
}

#[test]
fn test_nodes_without_marker_fails() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempdir()?;
    let capture = temp_dir.path().join("info.txt");
    fs::write(&capture, "Connected to radio\nOwner: nobody\n")?;
    meshroles(temp_dir.path())
        .args(["nodes", "--input"])
        .arg(&capture)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No 'Nodes in mesh' section found"));
    Ok(())
}

#[test]
fn test_nodes_without_port_fails() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempdir()?;
    meshroles(temp_dir.path())
        .arg("nodes")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No serial port given"));
    Ok(())
}

#[test]
fn test_nodes_reports_missing_meshtastic_binary() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempdir()?;
    let config = temp_dir.path().join("config.toml");
    fs::write(&config, "[meshtastic]\nbinary = \"meshtastic-not-installed-xyz\"\n")?;
    meshroles(temp_dir.path())
        .args(["nodes", "/dev/ttyUSB0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("meshtastic-not-installed-xyz"))
        .stderr(predicate::str::contains("not found"));
    Ok(())
}
