use std::{io, path::PathBuf, result::Result as StdResult};

use thiserror::Error;

/// Custom Result type for grove operations.
pub type Result<T> = StdResult<T, GroveError>;

/// Grove-specific error types.
#[derive(Error, Debug)]
pub enum GroveError {
    /// The caller combined flags or arguments that cannot be used together.
    #[error("Usage error: {0}")]
    Usage(String),

    /// An artifact already occupies the location a repository would be created at.
    #[error("repository already exists at {} (type: {kind})", path.display())]
    AlreadyExists {
        /// Path of the conflicting artifact.
        path: PathBuf,
        /// What kind of artifact was found.
        kind: String,
    },

    /// The target directory contains visible entries.
    #[error("directory is not empty: {}", path.display())]
    NotEmpty {
        /// Directory that was expected to be empty.
        path: PathBuf,
    },

    /// No repository of the required kind exists at the target.
    #[error("repository not found at {} (expected: {expected})", path.display())]
    NotFound {
        /// Directory that was inspected.
        path: PathBuf,
        /// Description of the repository kind that was expected.
        expected: String,
    },

    /// The repository is in a state that would lose work if converted.
    #[error("cannot convert {}: {}", path.display(), violations.join(", "))]
    UnsafeToConvert {
        /// Root of the repository that was checked.
        path: PathBuf,
        /// Each offending category, e.g. `2 untracked file(s)`.
        violations: Vec<String>,
    },

    /// A git command that the operation depends on failed.
    #[error("Git error: {0}")]
    GitError(String),

    /// An underlying I/O operation failed.
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl GroveError {
    /// Return the recommended process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            Self::AlreadyExists { .. }
            | Self::NotEmpty { .. }
            | Self::NotFound { .. }
            | Self::UnsafeToConvert { .. } => 3,
            Self::GitError(_) => 4,
            Self::IoError(_) => 1,
        }
    }
}

/// Wrap a failure from the git layer, naming the step that was running.
pub(crate) fn git_error(step: &str, err: &anyhow::Error) -> GroveError {
    GroveError::GitError(format!("{step}: {err:#}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_taxonomy() {
        assert_eq!(GroveError::Usage("x".into()).exit_code(), 2);
        assert_eq!(
            GroveError::NotEmpty {
                path: PathBuf::from("/tmp/x")
            }
            .exit_code(),
            3
        );
        assert_eq!(GroveError::GitError("boom".into()).exit_code(), 4);
        assert_eq!(
            GroveError::IoError(io::Error::other("disk")).exit_code(),
            1
        );
    }

    #[test]
    fn unsafe_to_convert_lists_every_violation() {
        let err = GroveError::UnsafeToConvert {
            path: PathBuf::from("/work/repo"),
            violations: vec![
                "1 uncommitted change(s)".to_string(),
                "2 untracked file(s)".to_string(),
            ],
        };
        assert_eq!(err.exit_code(), 3);
        assert_eq!(
            err.to_string(),
            "cannot convert /work/repo: 1 uncommitted change(s), 2 untracked file(s)"
        );
    }

    #[test]
    fn already_exists_names_artifact() {
        let err = GroveError::AlreadyExists {
            path: PathBuf::from("/work/repo/.git"),
            kind: "git pointer".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "repository already exists at /work/repo/.git (type: git pointer)"
        );
    }
}
