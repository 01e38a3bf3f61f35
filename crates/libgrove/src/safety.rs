use std::{fs, path::Path};

use tracing::debug;

use crate::{
    error::{GroveError, Result, git_error},
    git::{self, GitExecutor},
    layout::{BARE_DIR, GIT_POINTER},
};

/// What kind of repository, if any, lives at a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryKind {
    /// A `.git` directory holding the repository store.
    Traditional,
    /// A `.git` pointer file referencing a `.bare` store directory.
    Grove,
    /// Neither of the above.
    None,
}

/// Classify the repository at `dir` by inspecting `.git` and `.bare`.
pub fn repository_kind(dir: &Path) -> RepositoryKind {
    let git_path = dir.join(GIT_POINTER);
    let bare_path = dir.join(BARE_DIR);

    if git_path.is_dir() {
        return RepositoryKind::Traditional;
    }

    if git_path.is_file()
        && bare_path.is_dir()
        && let Ok(contents) = fs::read_to_string(&git_path)
    {
        let target = contents.trim().strip_prefix("gitdir:").map(str::trim);
        if target.is_some_and(|t| Path::new(t).ends_with(BARE_DIR)) {
            return RepositoryKind::Grove;
        }
    }

    RepositoryKind::None
}

/// Require that `dir` has no visible entries.
///
/// Hidden entries (names starting with `.`) are permitted. A missing
/// directory counts as empty.
pub fn ensure_empty(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_name().to_string_lossy().starts_with('.') {
            return Err(GroveError::NotEmpty {
                path: dir.to_path_buf(),
            });
        }
    }
    Ok(())
}

/// Require that neither a `.git` entry nor a `.bare` directory exists in `dir`.
pub fn ensure_no_conflicts(dir: &Path) -> Result<()> {
    let git_path = dir.join(GIT_POINTER);
    if git_path.is_dir() {
        return Err(GroveError::AlreadyExists {
            path: git_path,
            kind: "git directory".to_string(),
        });
    }
    if git_path.exists() {
        return Err(GroveError::AlreadyExists {
            path: git_path,
            kind: "git pointer".to_string(),
        });
    }

    let bare_path = dir.join(BARE_DIR);
    if bare_path.is_dir() {
        return Err(GroveError::AlreadyExists {
            path: bare_path,
            kind: "bare store".to_string(),
        });
    }
    Ok(())
}

/// Require that the repository at `dir` can be converted without losing work.
///
/// Every violated category is collected and reported together.
pub fn ensure_convertible(git: &dyn GitExecutor, dir: &Path) -> Result<()> {
    match repository_kind(dir) {
        RepositoryKind::Traditional => {}
        RepositoryKind::Grove => {
            return Err(GroveError::AlreadyExists {
                path: dir.to_path_buf(),
                kind: "Grove repository".to_string(),
            });
        }
        RepositoryKind::None => {
            return Err(GroveError::NotFound {
                path: dir.to_path_buf(),
                expected: "traditional Git repository".to_string(),
            });
        }
    }

    let mut violations = Vec::new();

    let changes = git::uncommitted_changes(git, dir)
        .map_err(|e| git_error("Failed to check for uncommitted changes", &e))?;
    if changes > 0 {
        violations.push(format!("{changes} uncommitted change(s)"));
    }

    let stashes =
        git::stash_count(git, dir).map_err(|e| git_error("Failed to list stashes", &e))?;
    if stashes > 0 {
        violations.push(format!("{stashes} stash(es)"));
    }

    let untracked = git::untracked_files(git, dir)
        .map_err(|e| git_error("Failed to list untracked files", &e))?;
    if !untracked.is_empty() {
        violations.push(format!("{} untracked file(s)", untracked.len()));
    }

    if !git::has_commits(git, dir) {
        violations.push("no commits".to_string());
    } else if git::current_branch(git, dir).is_none() {
        violations.push("detached HEAD".to_string());
    }

    let linked = git::linked_worktree_count(git, dir)
        .map_err(|e| git_error("Failed to list worktrees", &e))?;
    if linked > 0 {
        violations.push(format!("{linked} linked worktree(s)"));
    }

    if dir.join(BARE_DIR).exists() {
        violations.push(format!("{BARE_DIR} already exists"));
    }

    if violations.is_empty() {
        return Ok(());
    }

    debug!(path = %dir.display(), ?violations, "repository is not convertible");
    Err(GroveError::UnsafeToConvert {
        path: dir.to_path_buf(),
        violations,
    })
}
