// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod pipelines;

use std::process::Output;
use std::str::from_utf8;

use assert_cmd::{output::OutputError, Command};

fn hyperimage() -> Command {
    Command::cargo_bin("hyperimage").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

/// Arguments for a small and quick simulated observation.
const SMALL_OBSERVATION: &[&str] = &[
    "--no-progress-bars",
    "--npixel",
    "16",
    "--num-timesteps",
    "2",
    "--nmajor",
    "1",
];

#[test]
fn test_continuum_imaging_cli() {
    let cmd = hyperimage()
        .arg("continuum-imaging")
        .args(SMALL_OBSERVATION)
        .ok();
    let ok = cmd.is_ok();
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(ok, "continuum-imaging failed:\n{stdout}\n{stderr}");
    assert!(stdout.contains("Results"), "{stdout}");
    assert!(stdout.contains("continuum-imaging complete"), "{stdout}");
}

#[test]
fn test_ical_cli_dry_run_and_save_toml() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let toml_path = tmp_dir.path().join("ical.toml");
    let cmd = hyperimage()
        .arg("ical")
        .args(SMALL_OBSERVATION)
        .args(["--calibration-context", "T", "--dry-run", "--save-toml"])
        .arg(&toml_path)
        .ok();
    let ok = cmd.is_ok();
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(ok, "ical failed:\n{stdout}\n{stderr}");
    assert!(stdout.contains("Dry run"), "{stdout}");
    assert!(!stdout.contains("Results"), "{stdout}");

    // The saved arguments run again, and CLI arguments still take priority.
    let saved = std::fs::read_to_string(&toml_path).unwrap();
    assert!(saved.contains("calibration_context = \"T\""), "{saved}");
    let cmd = hyperimage()
        .arg("ical")
        .arg(&toml_path)
        .args(["--calibration-context", "G", "--dry-run"])
        .ok();
    let ok = cmd.is_ok();
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(ok, "ical failed:\n{stdout}\n{stderr}");
    assert!(stdout.contains("Calibration context: G"), "{stdout}");
}

#[test]
fn test_bad_arguments_are_reported() {
    let cmd = hyperimage()
        .args(["continuum-imaging", "--context", "3d", "--dry-run"])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("Unknown imaging context '3d'"), "{stderr}");

    let cmd = hyperimage()
        .args(["ical", "--calibration-context", "TQ", "--dry-run"])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("CALIBRATION"), "{stderr}");
}
