//! Common test utilities

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Create a temporary project directory containing a Quakefile
pub fn create_project(quakefile: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("Quakefile");
    fs::write(&path, quakefile).unwrap();
    (temp_dir, path)
}

/// Write a task fragment relative to the project root, creating directories
pub fn write_fragment(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Lines appended to a marker file by task commands, empty if it was never written
pub fn read_marker(root: &Path, name: &str) -> Vec<String> {
    fs::read_to_string(root.join(name))
        .map(|s| s.lines().map(String::from).collect())
        .unwrap_or_default()
}

/// The compiled binary, run from `dir` with a clean environment for discovery
pub fn quake(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("quake").unwrap();
    cmd.current_dir(dir)
        .env_remove("QUAKEFILE")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}
