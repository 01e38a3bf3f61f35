use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use crate::{
    branch::worktree_dir_name,
    error::{GroveError, Result, git_error},
    git::{self, GitExecutor},
    provision::{WorktreeOutcome, WorktreeStatus},
    safety::ensure_no_conflicts,
};

/// Name of the hidden bare store directory at a repository root.
pub const BARE_DIR: &str = ".bare";

/// Name of the pointer file at a repository root.
pub const GIT_POINTER: &str = ".git";

/// Exact contents of the pointer file.
pub const POINTER_CONTENTS: &str = "gitdir: .bare\n";

/// A repository root and the bare store backing it.
///
/// A value of this type only exists once both the store directory and the
/// pointer file have been written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BareStore {
    /// Absolute repository root.
    pub root: PathBuf,
    /// Absolute path of the `.bare` store.
    pub bare_dir: PathBuf,
}

impl BareStore {
    /// Describe the store for `root`.
    fn at(root: PathBuf) -> Self {
        let bare_dir = root.join(BARE_DIR);
        Self { root, bare_dir }
    }

    /// Path of the pointer file.
    pub fn pointer(&self) -> PathBuf {
        self.root.join(GIT_POINTER)
    }

    /// Write the pointer file referencing the store.
    fn write_pointer(&self) -> io::Result<()> {
        fs::write(self.pointer(), POINTER_CONTENTS)
    }

    /// Remove the pointer and store, ignoring whichever is already absent.
    fn discard(&self) {
        if let Err(e) = remove_if_exists(&self.pointer()) {
            warn!(path = %self.pointer().display(), "failed to remove pointer: {e}");
        }
        if let Err(e) = remove_if_exists(&self.bare_dir) {
            warn!(path = %self.bare_dir.display(), "failed to remove bare store: {e}");
        }
    }

    /// Create a fresh bare store at `root`, creating the directory if needed.
    ///
    /// Fails without touching anything when `root` already holds a `.git`
    /// entry or a `.bare` directory.
    pub fn init_local(git: &dyn GitExecutor, root: &Path) -> Result<Self> {
        ensure_no_conflicts(root)?;
        fs::create_dir_all(root)?;
        let store = Self::at(root.canonicalize()?);

        if let Err(e) = git::init_bare(git, &store.root, &store.bare_dir) {
            store.discard();
            return Err(git_error(
                &format!("Failed to initialize bare store at {}", store.bare_dir.display()),
                &e,
            ));
        }
        if let Err(e) = store.write_pointer() {
            store.discard();
            return Err(e.into());
        }

        info!(root = %store.root.display(), "initialized bare store");
        Ok(store)
    }

    /// Bare-clone `url` into `root` and configure remote-tracking refs.
    ///
    /// Returns the store plus any non-fatal warnings. Failing to configure or
    /// fetch remote-tracking refs is fatal and removes the partial clone.
    pub fn clone_remote(
        git: &dyn GitExecutor,
        root: &Path,
        url: &str,
        remote: &str,
    ) -> Result<(Self, Vec<String>)> {
        let store = Self::at(root.canonicalize()?);

        if let Err(e) = git::clone_bare(git, &store.root, url, remote, &store.bare_dir) {
            store.discard();
            return Err(git_error(&format!("Failed to clone {url}"), &e));
        }
        if let Err(e) = store.write_pointer() {
            store.discard();
            return Err(e.into());
        }

        let refspec = format!("+refs/heads/*:refs/remotes/{remote}/*");
        let tracking = git::set_config(
            git,
            &store.root,
            &format!("remote.{remote}.fetch"),
            &refspec,
        )
        .and_then(|()| git::fetch(git, &store.root, remote));
        if let Err(e) = tracking {
            store.discard();
            return Err(git_error(
                &format!("Failed to configure remote-tracking refs for {remote}"),
                &e,
            ));
        }

        let mut warnings = Vec::new();
        if let Err(e) = git::set_remote_head(git, &store.root, remote) {
            let warning = format!("Could not determine the default branch of {remote}: {e:#}");
            warn!("{warning}");
            warnings.push(warning);
        }

        info!(root = %store.root.display(), url, "cloned bare store");
        Ok((store, warnings))
    }

    /// Convert the traditional repository at `root` in place.
    ///
    /// The `.git` directory becomes the `.bare` store and every other entry at
    /// the root, tracked or ignored, moves into a worktree for `branch`. If the
    /// store cannot be relocated the traditional layout is restored and the
    /// error returned. Once the store is in place, a worktree that cannot be
    /// populated leaves the working files at the root and comes back as a
    /// failed outcome.
    pub fn convert_in_place(
        git: &dyn GitExecutor,
        root: &Path,
        branch: &str,
    ) -> Result<(Self, WorktreeOutcome)> {
        let store = Self::at(root.canonicalize()?);
        let dir_name = worktree_dir_name(branch);
        let worktree = store.root.join(&dir_name);

        if worktree.exists() {
            return Err(GroveError::AlreadyExists {
                path: worktree,
                kind: "worktree directory".to_string(),
            });
        }

        let mut conversion = Conversion {
            git,
            store: &store,
            dir_name: &dir_name,
            worktree: &worktree,
            moved: Vec::new(),
            relocated: false,
        };
        if let Err(e) = conversion.relocate() {
            conversion.rollback();
            return Err(e);
        }

        let status = match conversion.populate(branch) {
            Ok(()) => {
                info!(root = %store.root.display(), branch, "converted repository");
                WorktreeStatus::Created
            }
            Err(e) => {
                conversion.abandon_worktree();
                let reason = match e {
                    GroveError::GitError(message) => message,
                    other => other.to_string(),
                };
                WorktreeStatus::Failed(reason)
            }
        };
        let outcome = WorktreeOutcome::new(branch, status).logged();
        Ok((store, outcome))
    }
}

/// Progress of one in-place conversion, kept so it can be undone.
struct Conversion<'a> {
    /// Executor used for every git step.
    git: &'a dyn GitExecutor,
    /// Store being produced.
    store: &'a BareStore,
    /// Worktree directory name under the root.
    dir_name: &'a str,
    /// Absolute worktree path.
    worktree: &'a Path,
    /// Root entries already moved into the worktree.
    moved: Vec<PathBuf>,
    /// Whether `.git` has been renamed to `.bare`.
    relocated: bool,
}

impl Conversion<'_> {
    /// Turn `.git` into the `.bare` store behind a pointer file.
    fn relocate(&mut self) -> Result<()> {
        let root = &self.store.root;

        fs::rename(root.join(GIT_POINTER), &self.store.bare_dir)?;
        self.relocated = true;
        self.store.write_pointer()?;

        git::set_config(self.git, root, "core.bare", "true")
            .map_err(|e| git_error("Failed to mark the store as bare", &e))
    }

    /// Register the worktree and move the working files into it.
    fn populate(&mut self, branch: &str) -> Result<()> {
        let root = &self.store.root;

        git::add_worktree_no_checkout(self.git, root, self.worktree, branch)
            .map_err(|e| git_error("worktree add", &e))?;
        fs::create_dir_all(self.worktree)?;

        let skip = [BARE_DIR, GIT_POINTER, self.dir_name];
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            if skip.iter().any(|s| entry.file_name() == *s) {
                continue;
            }
            let target = self.worktree.join(entry.file_name());
            fs::rename(entry.path(), &target)?;
            self.moved.push(target);
        }
        debug!(count = self.moved.len(), "moved working files into worktree");

        git::reset_index(self.git, self.worktree).map_err(|e| git_error("index reset", &e))
    }

    /// Move working files back to the root and drop the half-made worktree.
    fn abandon_worktree(&mut self) {
        let root = &self.store.root;

        let mut stranded = false;
        for moved in self.moved.drain(..).rev() {
            if let Some(name) = moved.file_name()
                && let Err(e) = fs::rename(&moved, root.join(name))
            {
                warn!(path = %moved.display(), "failed to move entry back: {e}");
                stranded = true;
            }
        }
        // Never delete a worktree that still holds user files.
        if !stranded && let Err(e) = remove_if_exists(self.worktree) {
            warn!(path = %self.worktree.display(), "failed to remove worktree: {e}");
        }
        let metadata = self.store.bare_dir.join("worktrees").join(self.dir_name);
        if let Err(e) = remove_if_exists(&metadata) {
            warn!(path = %metadata.display(), "failed to remove worktree metadata: {e}");
        }
    }

    /// Restore the traditional layout after a failed relocation. Each step is
    /// best effort.
    fn rollback(&self) {
        if !self.relocated {
            return;
        }
        warn!(root = %self.store.root.display(), "conversion failed, restoring repository");
        let root = &self.store.root;

        if let Err(e) = remove_if_exists(&self.store.pointer()) {
            warn!("failed to remove pointer: {e}");
        }
        let git_dir = root.join(GIT_POINTER);
        if let Err(e) = fs::rename(&self.store.bare_dir, &git_dir) {
            warn!("failed to restore {}: {e}", git_dir.display());
            return;
        }
        if let Err(e) = git::set_config_in(self.git, root, &git_dir, "core.bare", "false") {
            warn!("failed to reset core.bare: {e:#}");
        }
    }
}

/// Remove a file or directory tree, succeeding when nothing is there.
fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
