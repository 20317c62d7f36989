//! Integration tests for the `plategen` binary.
//!
//! Each test runs the compiled CLI with `HOME` pointed at a temporary
//! directory, so config and log files never touch the real home.
//!
//! Run with: `cargo test -p plategen-cli --test cli_workflow`

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use image::{Rgba, RgbaImage};
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

/// Run the CLI with `home` as the home directory.
fn run_cli(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_plategen"))
        .args(args)
        .env("HOME", home)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command")
}

/// Assert a command succeeded.
fn assert_success(output: &Output, context: &str) {
    if !output.status.success() {
        panic!(
            "{} failed:\nstdout: {}\nstderr: {}",
            context,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

fn write_source(dir: &Path) -> PathBuf {
    let path = dir.join("world.png");
    RgbaImage::from_fn(512, 256, |x, y| Rgba([(x / 2) as u8, y as u8, 64, 255]))
        .save(&path)
        .unwrap();
    path
}

// ============================================================================
// generate
// ============================================================================

#[test]
fn test_generate_json_reports_output() {
    let temp = TempDir::new().unwrap();
    let source = write_source(temp.path());
    let out = temp.path().join("out");

    let output = run_cli(
        temp.path(),
        &[
            "generate",
            source.to_str().unwrap(),
            "--bounds",
            "90",
            "-180",
            "-90",
            "180",
            "--output",
            out.to_str().unwrap(),
            "--json",
        ],
    );
    assert_success(&output, "generate --json");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("every stdout line is JSON"))
        .collect();
    assert!(lines.len() >= 2);

    let result = lines.last().unwrap();
    assert_eq!(result["max_level"], 1);
    assert_eq!(result["plates"].as_array().unwrap().len(), 2);

    let output_dir = PathBuf::from(result["output_dir"].as_str().unwrap());
    assert!(output_dir.starts_with(&out));
    assert!(output_dir.join("level_0.plate").exists());
    assert!(output_dir.join("level_1.plate").exists());
    assert!(output_dir.join("thumbnail.png").exists());

    // The log file lands under the temporary home
    assert!(temp.path().join(".plategen").join("plategen.log").exists());
}

#[test]
fn test_generate_rejects_inverted_bounds() {
    let temp = TempDir::new().unwrap();
    let source = write_source(temp.path());
    let out = temp.path().join("out");

    let output = run_cli(
        temp.path(),
        &[
            "generate",
            source.to_str().unwrap(),
            "--bounds",
            "-90",
            "-180",
            "90",
            "180",
            "--output",
            out.to_str().unwrap(),
        ],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--bounds"));
    assert!(!out.exists());
}

// ============================================================================
// inspect
// ============================================================================

#[test]
fn test_inspect_and_extract_generated_plate() {
    let temp = TempDir::new().unwrap();
    let source = write_source(temp.path());
    let out = temp.path().join("out");

    let generate = run_cli(
        temp.path(),
        &[
            "generate",
            source.to_str().unwrap(),
            "--bounds",
            "90",
            "-180",
            "-90",
            "180",
            "--output",
            out.to_str().unwrap(),
            "--encoding",
            "deflate",
            "--json",
        ],
    );
    assert_success(&generate, "generate");

    let output_dir = fs::read_dir(&out).unwrap().next().unwrap().unwrap().path();
    let plate = output_dir.join("level_1.plate");
    let tile = temp.path().join("tile.png");

    let inspect = run_cli(
        temp.path(),
        &[
            "inspect",
            plate.to_str().unwrap(),
            "--extract",
            "0,1",
            "--out",
            tile.to_str().unwrap(),
        ],
    );
    assert_success(&inspect, "inspect");

    let stdout = String::from_utf8_lossy(&inspect.stdout);
    assert!(stdout.contains("Level:       1"));
    assert!(stdout.contains("deflate"));
    assert!(stdout.contains("Tiles:       4 of 4"));

    let image = image::open(&tile).unwrap();
    assert_eq!((image.width(), image.height()), (256, 256));
}

// ============================================================================
// config
// ============================================================================

#[test]
fn test_config_init_then_show() {
    let temp = TempDir::new().unwrap();

    let path = run_cli(temp.path(), &["config", "path"]);
    assert_success(&path, "config path");
    let expected = temp.path().join(".plategen").join("config.ini");
    assert_eq!(
        String::from_utf8_lossy(&path.stdout).trim(),
        expected.to_str().unwrap()
    );

    let init = run_cli(temp.path(), &["config", "init"]);
    assert_success(&init, "config init");
    assert!(expected.exists());

    let show = run_cli(temp.path(), &["config", "show"]);
    assert_success(&show, "config show");
    assert!(String::from_utf8_lossy(&show.stdout).contains("tile_encoding = png"));
}
