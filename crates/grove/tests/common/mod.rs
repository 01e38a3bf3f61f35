#![allow(dead_code)]

use anyhow::{Context, Result, ensure};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Return the path to the compiled `grove` binary for integration-style tests.
pub fn grove_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_grove"))
}

/// Run a git command inside `repo_path`, ensuring it succeeds.
pub fn git(repo_path: &Path, args: &[&str]) -> Result<Output> {
    let output = Command::new("git")
        .current_dir(repo_path)
        .args(args)
        .output()
        .with_context(|| format!("failed to run git {}", args.join(" ")))?;

    ensure!(
        output.status.success(),
        "git command failed: git {}\nstdout: {}\nstderr: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    Ok(output)
}

/// Initialise a new repository on `main` at `repo_path` with a README commit.
pub fn init_repository(repo_path: &Path) -> Result<()> {
    if !repo_path.exists() {
        fs::create_dir_all(repo_path)?;
    }

    git(repo_path, &["init", "-b", "main"])?;
    git(repo_path, &["config", "user.email", "test@example.com"])?;
    git(repo_path, &["config", "user.name", "Test User"])?;

    fs::write(repo_path.join("README.md"), "# Test Project")?;
    git(repo_path, &["add", "README.md"])?;
    git(repo_path, &["commit", "-m", "Initial commit"])?;

    Ok(())
}

/// Create a temporary repository with the provided name relative to the temp dir.
pub fn create_repo(repo_name: &str) -> Result<(TempDir, PathBuf)> {
    let temp_dir = TempDir::new()?;
    let repo_path = temp_dir.path().join(repo_name);
    init_repository(&repo_path)?;
    Ok((temp_dir, repo_path))
}

/// Create a bare origin carrying `main` plus `branches`; returns its `file://` URL.
pub fn create_origin(branches: &[&str]) -> Result<(TempDir, String)> {
    let temp_dir = TempDir::new()?;
    let seed = temp_dir.path().join("seed");
    init_repository(&seed)?;
    for branch in branches {
        git(&seed, &["branch", branch])?;
    }
    git(
        temp_dir.path(),
        &["clone", "--bare", "--quiet", "seed", "origin.git"],
    )?;
    let url = format!("file://{}", temp_dir.path().join("origin.git").display());
    Ok((temp_dir, url))
}

/// Prepare a `Command` running `grove` in `cwd`, isolated from user config.
pub fn grove_command(cwd: &Path) -> Command {
    let mut cmd = Command::new(grove_binary());
    cmd.current_dir(cwd);
    cmd.env("GROVE_CONFIG", cwd.join(".grove-test-config-missing.toml"));
    for var in ["GROVE_GIT", "GROVE_REMOTE", "GROVE_LOG", "NO_COLOR"] {
        cmd.env_remove(var);
    }
    cmd.arg("--no-color");
    cmd
}

/// Run `grove` with the provided arguments, returning the command output.
pub fn run_grove(cwd: &Path, args: &[&str]) -> Result<Output> {
    grove_command(cwd)
        .args(args)
        .output()
        .with_context(|| format!("failed to run grove {}", args.join(" ")))
}

/// Captured stdout as text.
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Captured stderr as text.
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
