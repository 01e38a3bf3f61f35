use std::result::Result as StdResult;

use anyhow::Result;
use grove_term::{Output, OutputError};
use libgrove::{GroveError, InitMode, InitReport, PlatformUrlInfo, WorktreeOutcome, WorktreeStatus};

/// Convert output-layer failures into domain errors.
pub fn map_output_error(err: OutputError) -> GroveError {
    match err {
        OutputError::Io(e) => GroveError::IoError(e),
    }
}

/// Emit an output result, mapping errors into `GroveError`.
pub fn emit(result: StdResult<(), OutputError>) -> Result<()> {
    result.map_err(map_output_error)?;
    Ok(())
}

/// Print what was detected in a remote URL.
pub fn render_detection(output: &dyn Output, source: &PlatformUrlInfo) -> Result<()> {
    let Some(platform) = source.platform else {
        return Ok(());
    };

    emit(output.message(&format!("Detected {platform} URL")))?;
    if let Some(branch) = &source.branch {
        emit(output.item("Branch", branch))?;
    }
    if let Some(number) = &source.pull_request {
        emit(output.item("Pull request", &format!("#{number}")))?;
    }
    emit(output.item("Clone URL", &source.clone_url))
}

/// One-line summary of a worktree outcome.
fn describe(outcome: &WorktreeOutcome) -> String {
    let WorktreeOutcome {
        branch, directory, ..
    } = outcome;
    match &outcome.status {
        WorktreeStatus::Created => format!("{branch} -> {directory}/"),
        WorktreeStatus::SkippedExists => format!("{branch} -> {directory}/ (already exists)"),
        WorktreeStatus::SkippedNotFound => format!("{branch}: not found on remote, skipped"),
        WorktreeStatus::Failed(reason) => format!("{branch}: failed: {reason}"),
    }
}

/// Render the result of `grove init`.
pub fn render_report(output: &dyn Output, report: &InitReport) -> Result<()> {
    let root = report.root.display();
    let headline = match report.mode {
        InitMode::Local => "Initialized bare repository".to_string(),
        InitMode::Clone => match &report.source {
            Some(source) => format!("Cloned {}", source.clone_url),
            None => "Cloned repository".to_string(),
        },
        InitMode::Convert => "Converted repository to bare-store layout".to_string(),
    };
    emit(output.success(&headline))?;
    emit(output.item("Location", &root.to_string()))?;
    emit(output.item("Bare store", &report.bare_dir.display().to_string()))?;

    let provisioned: Vec<_> = report.worktrees.iter().filter(|o| o.is_success()).collect();
    if !provisioned.is_empty() {
        let section = output.section("Worktrees:");
        for outcome in provisioned {
            emit(section.success(&describe(outcome)))?;
        }
    }

    for warning in report.all_warnings() {
        emit(output.warn(&format!("Warning: {warning}")))?;
    }

    let steps = output.section("Next steps:");
    emit(steps.message(&format!("cd {root}")))?;
    emit(steps.message("git worktree add <directory> <branch>"))?;
    emit(output.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(branch: &str, directory: &str, status: WorktreeStatus) -> WorktreeOutcome {
        WorktreeOutcome {
            branch: branch.to_string(),
            directory: directory.to_string(),
            status,
        }
    }

    #[test]
    fn describes_each_status() {
        assert_eq!(
            describe(&outcome("feature/auth", "feature-auth", WorktreeStatus::Created)),
            "feature/auth -> feature-auth/"
        );
        assert_eq!(
            describe(&outcome("main", "main", WorktreeStatus::SkippedExists)),
            "main -> main/ (already exists)"
        );
        assert_eq!(
            describe(&outcome("gone", "gone", WorktreeStatus::SkippedNotFound)),
            "gone: not found on remote, skipped"
        );
        assert_eq!(
            describe(&outcome(
                "dev",
                "dev",
                WorktreeStatus::Failed("locked".to_string())
            )),
            "dev: failed: locked"
        );
    }
}
