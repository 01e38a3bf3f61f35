use std::{fmt, path::PathBuf};

use tracing::{debug, info, warn};

use crate::{
    branch::{is_valid_branch_name, merge_url_branch, parse_branch_list},
    error::{GroveError, Result},
    git::{self, GitExecutor},
    layout::BareStore,
    platform::{PlatformUrlInfo, is_git_url, resolve_platform_url},
    provision::{Provisioner, WorktreeOutcome},
    safety::{ensure_convertible, ensure_empty, ensure_no_conflicts},
};

/// Remote name used when none is configured.
const DEFAULT_REMOTE: &str = "origin";

/// Raw caller input for one `init` invocation.
#[derive(Debug, Clone, Default)]
pub struct InitRequest {
    /// The positional directory or remote URL, if any.
    pub argument: Option<String>,
    /// Convert the repository in the working directory in place.
    pub convert: bool,
    /// Comma-separated branches to provision after a clone.
    pub branches: Option<String>,
}

/// Which structural transformation a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitMode {
    /// Fresh bare store in a local directory.
    Local,
    /// Bare clone of a remote into the working directory.
    Clone,
    /// In-place conversion of a traditional repository.
    Convert,
}

impl fmt::Display for InitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Local => "local",
            Self::Clone => "clone",
            Self::Convert => "convert",
        };
        f.write_str(name)
    }
}

/// Stages of an initialization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    /// Nothing has happened yet.
    Idle,
    /// Classifying the caller's input.
    ResolvingInput,
    /// Checking directory and repository preconditions.
    ValidatingSafety,
    /// Creating, cloning or converting the bare store.
    ConvertingStructure,
    /// Creating branch worktrees.
    ProvisioningWorktrees,
    /// Assembling the report.
    Reporting,
    /// Finished successfully.
    Done,
    /// Aborted by a fatal error.
    Failed,
}

/// Resolved input: everything decided before the filesystem is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitPlan {
    /// Selected transformation.
    pub mode: InitMode,
    /// Absolute repository root.
    pub root: PathBuf,
    /// Resolved remote, for clones.
    pub source: Option<PlatformUrlInfo>,
    /// Validated branches to provision, URL-derived branch first.
    pub branches: Vec<String>,
    /// Non-fatal problems found while resolving input.
    pub warnings: Vec<String>,
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitReport {
    /// Transformation that was performed.
    pub mode: InitMode,
    /// Absolute repository root.
    pub root: PathBuf,
    /// Absolute path of the bare store.
    pub bare_dir: PathBuf,
    /// Resolved remote, for clones.
    pub source: Option<PlatformUrlInfo>,
    /// Worktree outcomes, default worktree first.
    pub worktrees: Vec<WorktreeOutcome>,
    /// Non-fatal problems not tied to a single worktree.
    pub warnings: Vec<String>,
}

impl InitReport {
    /// Every warning in the report, run-level warnings first.
    pub fn all_warnings(&self) -> Vec<String> {
        self.warnings
            .iter()
            .cloned()
            .chain(self.worktrees.iter().filter_map(WorktreeOutcome::warning))
            .collect()
    }
}

/// Sequences input resolution, safety checks, structural conversion and
/// worktree provisioning for `grove init`.
pub struct Initializer<'a> {
    /// Executor for every git step.
    git: &'a dyn GitExecutor,
    /// Directory the run was invoked from.
    cwd: PathBuf,
    /// Remote name for clones.
    remote: String,
    /// Current stage.
    state: InitState,
}

impl<'a> Initializer<'a> {
    /// Create an initializer rooted at the absolute invocation directory `cwd`.
    pub fn new(git: &'a dyn GitExecutor, cwd: PathBuf) -> Self {
        Self {
            git,
            cwd,
            remote: DEFAULT_REMOTE.to_string(),
            state: InitState::Idle,
        }
    }

    /// Use `remote` instead of `origin` as the clone's remote name.
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    /// Current stage of the run.
    pub fn state(&self) -> InitState {
        self.state
    }

    /// Resolve and execute `request`.
    pub fn run(&mut self, request: &InitRequest) -> Result<InitReport> {
        let plan = self.plan(request)?;
        self.execute(plan)
    }

    /// Classify `request` without touching the filesystem.
    pub fn plan(&mut self, request: &InitRequest) -> Result<InitPlan> {
        self.step(InitState::ResolvingInput, |this| this.resolve(request))
    }

    /// Carry out a resolved plan.
    pub fn execute(&mut self, plan: InitPlan) -> Result<InitReport> {
        let branch = self.step(InitState::ValidatingSafety, |this| this.validate(&plan))?;

        let (store, structure_warnings, converted) =
            self.step(InitState::ConvertingStructure, |this| {
                this.convert(&plan, branch.as_deref())
            })?;
        let mut warnings = plan.warnings.clone();
        warnings.extend(structure_warnings);

        self.transition(InitState::ProvisioningWorktrees);
        let worktrees = match plan.mode {
            InitMode::Local | InitMode::Convert => converted.into_iter().collect(),
            InitMode::Clone => self.provision(&store, &plan, &mut warnings),
        };

        self.transition(InitState::Reporting);
        let report = InitReport {
            mode: plan.mode,
            root: store.root,
            bare_dir: store.bare_dir,
            source: plan.source,
            worktrees,
            warnings,
        };
        info!(mode = %report.mode, root = %report.root.display(), "initialization complete");

        self.transition(InitState::Done);
        Ok(report)
    }

    /// Enter `state`, run `f`, and move to `Failed` if it errors.
    fn step<T>(&mut self, state: InitState, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        self.transition(state);
        let result = f(self);
        if let Err(e) = &result {
            debug!(?state, "step failed: {e}");
            self.transition(InitState::Failed);
        }
        result
    }

    /// Record a state change.
    fn transition(&mut self, state: InitState) {
        debug!(from = ?self.state, to = ?state, "init state");
        self.state = state;
    }

    /// Input classification for [`Initializer::plan`].
    fn resolve(&self, request: &InitRequest) -> Result<InitPlan> {
        let argument = request
            .argument
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty());

        if request.convert {
            if let Some(argument) = argument {
                return Err(GroveError::Usage(format!(
                    "--convert cannot be combined with a directory or URL argument ('{argument}')"
                )));
            }
            if request.branches.is_some() {
                return Err(GroveError::Usage(
                    "--convert cannot be combined with --branches".to_string(),
                ));
            }
            return Ok(self.plan_for(InitMode::Convert, self.cwd.clone()));
        }

        let source = argument.and_then(|a| {
            resolve_platform_url(a).or_else(|| is_git_url(a).then(|| PlatformUrlInfo::plain(a)))
        });

        let Some(mut source) = source else {
            if request.branches.is_some() {
                return Err(GroveError::Usage(
                    "--branches requires a remote URL".to_string(),
                ));
            }
            let root = argument.map_or_else(|| self.cwd.clone(), |a| self.cwd.join(a));
            return Ok(self.plan_for(InitMode::Local, root));
        };

        let mut plan = self.plan_for(InitMode::Clone, self.cwd.clone());
        if let Some(branch) = source.branch.take_if(|b| !is_valid_branch_name(b)) {
            let warning = format!("Ignoring invalid branch name '{branch}' from URL");
            warn!("{warning}");
            plan.warnings.push(warning);
        }
        let requested = parse_branch_list(request.branches.as_deref().unwrap_or_default());
        plan.branches = merge_url_branch(requested, source.branch.as_deref());
        plan.source = Some(source);
        Ok(plan)
    }

    /// An empty plan for `mode` at `root`.
    fn plan_for(&self, mode: InitMode, root: PathBuf) -> InitPlan {
        InitPlan {
            mode,
            root,
            source: None,
            branches: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Mode-specific preconditions. Returns the branch being converted.
    fn validate(&self, plan: &InitPlan) -> Result<Option<String>> {
        match plan.mode {
            InitMode::Local => {
                ensure_no_conflicts(&plan.root)?;
                Ok(None)
            }
            InitMode::Clone => {
                ensure_empty(&plan.root)?;
                ensure_no_conflicts(&plan.root)?;
                Ok(None)
            }
            InitMode::Convert => {
                ensure_convertible(self.git, &plan.root)?;
                let branch = git::current_branch(self.git, &plan.root).ok_or_else(|| {
                    GroveError::GitError(format!(
                        "Failed to determine the current branch of {}",
                        plan.root.display()
                    ))
                })?;
                Ok(Some(branch))
            }
        }
    }

    /// Mode-specific structural transformation. Conversion also yields the
    /// outcome of its single worktree.
    fn convert(
        &self,
        plan: &InitPlan,
        branch: Option<&str>,
    ) -> Result<(BareStore, Vec<String>, Option<WorktreeOutcome>)> {
        match (plan.mode, &plan.source, branch) {
            (InitMode::Local, ..) => Ok((
                BareStore::init_local(self.git, &plan.root)?,
                Vec::new(),
                None,
            )),
            (InitMode::Clone, Some(source), _) => {
                let (store, warnings) =
                    BareStore::clone_remote(self.git, &plan.root, &source.clone_url, &self.remote)?;
                Ok((store, warnings, None))
            }
            (InitMode::Convert, _, Some(branch)) => {
                let (store, outcome) = BareStore::convert_in_place(self.git, &plan.root, branch)?;
                Ok((store, Vec::new(), Some(outcome)))
            }
            (mode, ..) => Err(GroveError::Usage(format!(
                "incomplete plan for {mode} mode"
            ))),
        }
    }

    /// Default worktree, requested branches and pull request for a clone.
    fn provision(
        &self,
        store: &BareStore,
        plan: &InitPlan,
        warnings: &mut Vec<String>,
    ) -> Vec<WorktreeOutcome> {
        let provisioner = Provisioner::new(self.git, &store.root, &self.remote);
        let mut outcomes = Vec::new();

        let default = git::default_branch(self.git, &store.root, &self.remote);
        match &default {
            Some(branch) => outcomes.push(provisioner.default_worktree(branch)),
            None => {
                let warning = "Could not determine the default branch; no default worktree created";
                warn!("{warning}");
                warnings.push(warning.to_string());
            }
        }

        let requested: Vec<String> = plan
            .branches
            .iter()
            .filter(|b| default.as_ref() != Some(*b))
            .cloned()
            .collect();
        outcomes.extend(provisioner.branches(&requested));
        warnings.extend(provisioner.track_upstream(&outcomes));

        if let Some(source) = &plan.source
            && let (Some(platform), Some(number)) = (source.platform, &source.pull_request)
        {
            outcomes.push(provisioner.pull_request(platform, number));
        }
        outcomes
    }
}
