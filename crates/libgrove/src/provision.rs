use std::{collections::HashSet, path::Path};

use tracing::{debug, info, warn};

use crate::{
    branch::worktree_dir_name,
    git::{self, GitExecutor},
    platform::Platform,
};

/// What happened when provisioning one worktree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorktreeStatus {
    /// A new worktree was checked out.
    Created,
    /// The branch does not exist on the remote.
    SkippedNotFound,
    /// The worktree directory already exists and was left untouched.
    SkippedExists,
    /// Creating the worktree failed.
    Failed(String),
}

/// Per-branch provisioning result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeOutcome {
    /// Branch the worktree is for.
    pub branch: String,
    /// Worktree directory name under the repository root.
    pub directory: String,
    /// Result of the attempt.
    pub status: WorktreeStatus,
}

impl WorktreeOutcome {
    /// Build an outcome for `branch`, deriving its directory name.
    pub(crate) fn new(branch: &str, status: WorktreeStatus) -> Self {
        Self {
            branch: branch.to_string(),
            directory: worktree_dir_name(branch),
            status,
        }
    }

    /// Whether a usable worktree exists for the branch afterwards.
    pub fn is_success(&self) -> bool {
        matches!(
            self.status,
            WorktreeStatus::Created | WorktreeStatus::SkippedExists
        )
    }

    /// User-facing warning for outcomes that did not produce a worktree.
    pub fn warning(&self) -> Option<String> {
        match &self.status {
            WorktreeStatus::SkippedNotFound => Some(format!(
                "Branch '{}' not found on remote, skipping",
                self.branch
            )),
            WorktreeStatus::Failed(reason) => Some(format!(
                "Failed to create worktree for '{}': {reason}",
                self.branch
            )),
            WorktreeStatus::Created | WorktreeStatus::SkippedExists => None,
        }
    }

    /// Log the warning, if any, and pass the outcome through.
    pub(crate) fn logged(self) -> Self {
        if let Some(warning) = self.warning() {
            warn!("{warning}");
        }
        self
    }
}

/// Creates branch worktrees next to a bare store.
///
/// Individual failures are recorded in the returned outcomes and never abort
/// the remaining work.
pub struct Provisioner<'a> {
    /// Executor for every git step.
    git: &'a dyn GitExecutor,
    /// Repository root holding the `.git` pointer.
    root: &'a Path,
    /// Remote that requested branches must exist on.
    remote: &'a str,
}

impl<'a> Provisioner<'a> {
    /// Provision worktrees under `root`, resolving branches against `remote`.
    pub fn new(git: &'a dyn GitExecutor, root: &'a Path, remote: &'a str) -> Self {
        Self { git, root, remote }
    }

    /// Create the worktree for the repository's primary branch.
    pub fn default_worktree(&self, branch: &str) -> WorktreeOutcome {
        WorktreeOutcome::new(branch, self.add(branch)).logged()
    }

    /// Create worktrees for `requested`, in order.
    ///
    /// Branches absent from the remote are skipped; existing directories are
    /// treated as already provisioned.
    pub fn branches(&self, requested: &[String]) -> Vec<WorktreeOutcome> {
        if requested.is_empty() {
            return Vec::new();
        }

        let available: HashSet<String> =
            match git::remote_branches(self.git, self.root, self.remote) {
                Ok(branches) => branches.into_iter().collect(),
                Err(e) => {
                    let reason = format!("could not list branches on {}: {e:#}", self.remote);
                    return requested
                        .iter()
                        .map(|b| {
                            WorktreeOutcome::new(b, WorktreeStatus::Failed(reason.clone()))
                                .logged()
                        })
                        .collect();
                }
            };
        debug!(count = available.len(), remote = self.remote, "remote branches");

        requested
            .iter()
            .map(|branch| {
                let status = if available.contains(branch) {
                    self.add(branch)
                } else {
                    WorktreeStatus::SkippedNotFound
                };
                WorktreeOutcome::new(branch, status).logged()
            })
            .collect()
    }

    /// Fetch pull request `number` into branch `pr-<number>` and check it out.
    pub fn pull_request(&self, platform: Platform, number: &str) -> WorktreeOutcome {
        let branch = format!("pr-{number}");
        let outcome = |status| WorktreeOutcome::new(&branch, status).logged();

        if self.root.join(worktree_dir_name(&branch)).exists() {
            return outcome(WorktreeStatus::SkippedExists);
        }
        let Some(pr_ref) = platform.pull_request_ref(number) else {
            return outcome(WorktreeStatus::Failed(format!(
                "{platform} does not expose pull request refs"
            )));
        };

        let refspec = format!("{pr_ref}:refs/heads/{branch}");
        if let Err(e) = git::fetch_refspec(self.git, self.root, self.remote, &refspec) {
            return outcome(WorktreeStatus::Failed(format!("{e:#}")));
        }
        outcome(self.add(&branch))
    }

    /// Point each created worktree's branch at `<remote>/<branch>`.
    ///
    /// Returns one warning per branch whose upstream could not be set.
    pub fn track_upstream(&self, outcomes: &[WorktreeOutcome]) -> Vec<String> {
        outcomes
            .iter()
            .filter(|o| o.status == WorktreeStatus::Created)
            .filter_map(|o| {
                let upstream = format!("{}/{}", self.remote, o.branch);
                match git::set_upstream(self.git, self.root, &o.branch, &upstream) {
                    Ok(()) => None,
                    Err(e) => {
                        let warning = format!(
                            "Could not set upstream of '{}' to {upstream}: {e:#}",
                            o.branch
                        );
                        warn!("{warning}");
                        Some(warning)
                    }
                }
            })
            .collect()
    }

    /// Check out `branch`, creating a tracking branch when none exists locally.
    fn add(&self, branch: &str) -> WorktreeStatus {
        let path = self.root.join(worktree_dir_name(branch));
        if path.exists() {
            debug!(path = %path.display(), "worktree directory exists, skipping");
            return WorktreeStatus::SkippedExists;
        }

        let result = match git::has_branch(self.git, self.root, branch) {
            Ok(true) => git::add_worktree(self.git, self.root, &path, branch),
            Ok(false) => {
                let start = format!("{}/{branch}", self.remote);
                git::add_tracking_worktree(self.git, self.root, &path, branch, &start)
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!(branch, path = %path.display(), "created worktree");
                WorktreeStatus::Created
            }
            Err(e) => WorktreeStatus::Failed(format!("{e:#}")),
        }
    }
}
