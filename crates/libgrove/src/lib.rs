#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
//! Core library for turning Git repositories into grove layouts.
//!
//! A grove repository keeps its objects in a hidden `.bare` store next to a
//! one-line `.git` pointer file, and checks every branch out into its own
//! sibling worktree directory. This crate creates such layouts from scratch,
//! from a remote clone, or by converting a traditional repository in place.
//! The CLI binary in `crates/grove` builds on top of this library.

/// Branch name validation and branch list parsing.
mod branch;
/// Error taxonomy shared by every operation.
mod error;
/// The git executor capability and typed git queries.
mod git;
/// Top-level orchestration of `grove init`.
mod init;
/// Structural transformations producing the bare store layout.
mod layout;
/// Hosting platform URL resolution.
mod platform;
/// Worktree provisioning for requested branches.
mod provision;
/// Filesystem preconditions checked before mutating a directory.
mod safety;

pub use branch::{is_valid_branch_name, merge_url_branch, parse_branch_list, worktree_dir_name};
pub use error::{GroveError, Result};
pub use git::{GitExecutor, SystemGit};
pub use init::{InitMode, InitPlan, InitReport, InitRequest, InitState, Initializer};
pub use layout::{BARE_DIR, BareStore, GIT_POINTER, POINTER_CONTENTS};
pub use platform::{Platform, PlatformUrlInfo, is_git_url, resolve_platform_url};
pub use provision::{Provisioner, WorktreeOutcome, WorktreeStatus};
pub use safety::{
    RepositoryKind, ensure_convertible, ensure_empty, ensure_no_conflicts, repository_kind,
};
