use std::{
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::{Context, Result};
use tracing::debug;

/// Capability for issuing git subcommands.
///
/// Every call names the directory it runs in explicitly; nothing in this
/// crate changes the process working directory.
pub trait GitExecutor {
    /// Run `git <args>` inside `dir` and return its captured standard output.
    fn run(&self, dir: &Path, args: &[&str]) -> Result<String>;
}

/// [`GitExecutor`] backed by a `git` executable on the host.
#[derive(Debug, Clone)]
pub struct SystemGit {
    /// Program invoked for every command.
    program: PathBuf,
}

impl SystemGit {
    /// Create an executor that invokes `program` (e.g. `git` or an absolute path).
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SystemGit {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitExecutor for SystemGit {
    fn run(&self, dir: &Path, args: &[&str]) -> Result<String> {
        debug!(dir = %dir.display(), "git {}", args.join(" "));
        let output = Command::new(&self.program)
            .current_dir(dir)
            .args(args)
            .output()
            .with_context(|| format!("Failed to execute git command: git {}", args.join(" ")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let command = format!("git {}", args.join(" "));
            anyhow::bail!("Git command failed: {}\nError: {}", command, stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Convert `path` to UTF-8 for use as a git argument.
fn path_arg(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| anyhow::anyhow!("Path is not valid UTF-8: {}", path.display()))
}

/// Initialize an empty bare store at `bare_path`.
pub fn init_bare(git: &dyn GitExecutor, dir: &Path, bare_path: &Path) -> Result<()> {
    git.run(dir, &["init", "--bare", "--quiet", path_arg(bare_path)?])?;
    Ok(())
}

/// Bare-clone `url` into `bare_path`.
pub fn clone_bare(
    git: &dyn GitExecutor,
    dir: &Path,
    url: &str,
    remote: &str,
    bare_path: &Path,
) -> Result<()> {
    git.run(
        dir,
        &["clone", "--bare", "--quiet", "--origin", remote, url, path_arg(bare_path)?],
    )?;
    Ok(())
}

/// Set a repository config value.
pub fn set_config(git: &dyn GitExecutor, dir: &Path, key: &str, value: &str) -> Result<()> {
    git.run(dir, &["config", key, value])?;
    Ok(())
}

/// Set a repository config value on an explicitly named git directory.
pub fn set_config_in(
    git: &dyn GitExecutor,
    dir: &Path,
    git_dir: &Path,
    key: &str,
    value: &str,
) -> Result<()> {
    git.run(dir, &["--git-dir", path_arg(git_dir)?, "config", key, value])?;
    Ok(())
}

/// Fetch `remote` using its configured refspecs.
pub fn fetch(git: &dyn GitExecutor, dir: &Path, remote: &str) -> Result<()> {
    git.run(dir, &["fetch", "--quiet", remote])?;
    Ok(())
}

/// Fetch a single `refspec` from `remote`.
pub fn fetch_refspec(
    git: &dyn GitExecutor,
    dir: &Path,
    remote: &str,
    refspec: &str,
) -> Result<()> {
    git.run(dir, &["fetch", "--quiet", remote, refspec])?;
    Ok(())
}

/// Point `refs/remotes/<remote>/HEAD` at the remote's default branch.
pub fn set_remote_head(git: &dyn GitExecutor, dir: &Path, remote: &str) -> Result<()> {
    git.run(dir, &["remote", "set-head", remote, "--auto"])?;
    Ok(())
}

/// Enumerate branches that exist under `refs/remotes/<remote>/`, sans prefix.
pub fn remote_branches(git: &dyn GitExecutor, dir: &Path, remote: &str) -> Result<Vec<String>> {
    let output = git.run(dir, &["branch", "-r", "--format=%(refname)"])?;
    let prefix = format!("refs/remotes/{remote}/");

    Ok(output
        .lines()
        .filter_map(|line| line.trim().strip_prefix(&prefix))
        .filter(|branch| !branch.is_empty() && *branch != "HEAD")
        .map(str::to_string)
        .collect())
}

/// Determine if a local branch named `branch_name` exists.
pub fn has_branch(git: &dyn GitExecutor, dir: &Path, branch_name: &str) -> Result<bool> {
    let output = git.run(dir, &["branch", "--list", branch_name])?;
    Ok(!output.trim().is_empty())
}

/// Detect the default branch advertised by `remote`.
///
/// Prefers `refs/remotes/<remote>/HEAD` and falls back to the store's own
/// `HEAD`, which a bare clone points at the remote's default branch.
pub fn default_branch(git: &dyn GitExecutor, dir: &Path, remote: &str) -> Option<String> {
    let remote_head = format!("refs/remotes/{remote}/HEAD");
    if let Ok(output) = git.run(dir, &["symbolic-ref", "--short", &remote_head]) {
        let prefix = format!("{remote}/");
        let name = output.trim();
        if let Some(branch) = name.strip_prefix(&prefix)
            && !branch.is_empty()
        {
            return Some(branch.to_string());
        }
    }

    current_branch(git, dir)
}

/// Return the branch `HEAD` refers to, or `None` when detached or unreadable.
pub fn current_branch(git: &dyn GitExecutor, dir: &Path) -> Option<String> {
    git.run(dir, &["symbolic-ref", "--short", "-q", "HEAD"])
        .ok()
        .map(|output| output.trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Whether `HEAD` resolves to a commit.
pub fn has_commits(git: &dyn GitExecutor, dir: &Path) -> bool {
    git.run(dir, &["rev-parse", "--verify", "--quiet", "HEAD"]).is_ok()
}

/// Check out the existing local `branch` into a new worktree at `path`.
pub fn add_worktree(git: &dyn GitExecutor, dir: &Path, path: &Path, branch: &str) -> Result<()> {
    git.run(dir, &["worktree", "add", "--quiet", path_arg(path)?, branch])?;
    Ok(())
}

/// Create local `branch` tracking `start_point` and check it out at `path`.
pub fn add_tracking_worktree(
    git: &dyn GitExecutor,
    dir: &Path,
    path: &Path,
    branch: &str,
    start_point: &str,
) -> Result<()> {
    git.run(
        dir,
        &[
            "worktree",
            "add",
            "--quiet",
            "--track",
            "-b",
            branch,
            path_arg(path)?,
            start_point,
        ],
    )?;
    Ok(())
}

/// Register a worktree for `branch` at `path` without populating its files.
pub fn add_worktree_no_checkout(
    git: &dyn GitExecutor,
    dir: &Path,
    path: &Path,
    branch: &str,
) -> Result<()> {
    git.run(
        dir,
        &["worktree", "add", "--quiet", "--no-checkout", path_arg(path)?, branch],
    )?;
    Ok(())
}

/// Rebuild the index of the worktree at `dir` from `HEAD` without touching files.
pub fn reset_index(git: &dyn GitExecutor, dir: &Path) -> Result<()> {
    git.run(dir, &["reset", "--quiet"])?;
    Ok(())
}

/// Make `branch` track `upstream` (e.g. `origin/main`).
pub fn set_upstream(
    git: &dyn GitExecutor,
    dir: &Path,
    branch: &str,
    upstream: &str,
) -> Result<()> {
    let flag = format!("--set-upstream-to={upstream}");
    git.run(dir, &["branch", "--quiet", &flag, branch])?;
    Ok(())
}

/// Count staged and unstaged changes to tracked files.
pub fn uncommitted_changes(git: &dyn GitExecutor, dir: &Path) -> Result<usize> {
    let output = git.run(dir, &["status", "--porcelain"])?;
    Ok(output
        .lines()
        .filter(|line| {
            !line.trim().is_empty() && !line.starts_with("??") && !line.starts_with("!!")
        })
        .count())
}

/// Count stash entries.
pub fn stash_count(git: &dyn GitExecutor, dir: &Path) -> Result<usize> {
    let output = git.run(dir, &["stash", "list"])?;
    Ok(output.lines().filter(|line| !line.trim().is_empty()).count())
}

/// List untracked files that are not ignored.
pub fn untracked_files(git: &dyn GitExecutor, dir: &Path) -> Result<Vec<PathBuf>> {
    let output = git.run(dir, &["ls-files", "--others", "--exclude-standard"])?;
    Ok(output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}

/// Count worktrees other than the main one.
pub fn linked_worktree_count(git: &dyn GitExecutor, dir: &Path) -> Result<usize> {
    let output = git.run(dir, &["worktree", "list", "--porcelain"])?;
    let total = output
        .lines()
        .filter(|line| line.starts_with("worktree "))
        .count();
    Ok(total.saturating_sub(1))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted executor for exercising failure policies without real git.

    use std::{cell::RefCell, fs};

    use super::*;

    /// A canned reply for calls whose arguments start with `prefix`.
    struct Reply {
        /// Leading arguments this reply applies to.
        prefix: Vec<String>,
        /// Output returned, or the error message to fail with.
        result: StdResult,
    }

    /// Output or error message for a scripted reply.
    type StdResult = std::result::Result<String, String>;

    /// Records every call and answers from a script; unscripted calls succeed
    /// with empty output.
    #[derive(Default)]
    pub(crate) struct FakeGit {
        /// Scripted replies, matched first to last.
        replies: Vec<Reply>,
        /// Arguments of every call, in order.
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl FakeGit {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn respond(mut self, prefix: &[&str], output: &str) -> Self {
            self.replies.push(Reply {
                prefix: prefix.iter().map(|s| s.to_string()).collect(),
                result: Ok(output.to_string()),
            });
            self
        }

        pub(crate) fn fail(mut self, prefix: &[&str], message: &str) -> Self {
            self.replies.push(Reply {
                prefix: prefix.iter().map(|s| s.to_string()).collect(),
                result: Err(message.to_string()),
            });
            self
        }

        pub(crate) fn calls(&self) -> Vec<Vec<String>> {
            self.calls.borrow().clone()
        }

        pub(crate) fn was_called(&self, prefix: &[&str]) -> bool {
            self.calls.borrow().iter().any(|call| {
                call.len() >= prefix.len() && call.iter().zip(prefix).all(|(a, b)| a == b)
            })
        }
    }

    /// Run a real git command, panicking on failure.
    pub(crate) fn run_git(dir: &Path, args: &[&str]) -> String {
        SystemGit::default()
            .run(dir, args)
            .unwrap_or_else(|e| panic!("git {args:?} failed: {e}"))
    }

    /// Create a repository on `main` at `path` with one commit.
    pub(crate) fn init_repo(path: &Path) {
        fs::create_dir_all(path).unwrap();
        run_git(path, &["init", "-b", "main"]);
        run_git(path, &["config", "user.name", "Test User"]);
        run_git(path, &["config", "user.email", "test@example.com"]);
        fs::write(path.join("README.md"), "# Test").unwrap();
        run_git(path, &["add", "."]);
        run_git(path, &["commit", "-m", "Initial commit"]);
    }

    /// Create a bare `origin.git` under `parent` carrying `main` plus
    /// `branches`, and return its `file://` URL.
    pub(crate) fn init_origin(parent: &Path, branches: &[&str]) -> String {
        let seed = parent.join("seed");
        init_repo(&seed);
        for branch in branches {
            run_git(&seed, &["branch", branch]);
        }
        let origin = parent.join("origin.git");
        run_git(parent, &["clone", "--bare", "--quiet", "seed", "origin.git"]);
        format!("file://{}", origin.display())
    }

    impl GitExecutor for FakeGit {
        fn run(&self, _dir: &Path, args: &[&str]) -> Result<String> {
            self.calls
                .borrow_mut()
                .push(args.iter().map(|s| s.to_string()).collect());

            let reply = self.replies.iter().find(|reply| {
                reply.prefix.len() <= args.len()
                    && reply.prefix.iter().zip(args).all(|(a, b)| a == b)
            });

            match reply.map(|r| &r.result) {
                Some(Ok(output)) => Ok(output.clone()),
                Some(Err(message)) => anyhow::bail!("{message}"),
                None => Ok(String::new()),
            }
        }
    }
}
