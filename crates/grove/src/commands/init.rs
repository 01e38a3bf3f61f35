use std::path::PathBuf;

use anyhow::Result;
use grove_term::Output;
use libgrove::{GitExecutor, InitMode, InitRequest, Initializer};

use crate::ui::{render_detection, render_report};

/// Run the `grove init` command logic.
pub fn init(
    git: &dyn GitExecutor,
    output: &dyn Output,
    cwd: PathBuf,
    remote: &str,
    request: &InitRequest,
) -> Result<()> {
    let mut initializer = Initializer::new(git, cwd).with_remote(remote);
    let plan = initializer.plan(request)?;

    if let Some(source) = &plan.source {
        render_detection(output, source)?;
    }

    let spinner = match (&plan.mode, &plan.source) {
        (InitMode::Clone, Some(source)) => {
            Some(output.spinner(&format!("Cloning {}...", source.clone_url)))
        }
        _ => None,
    };

    let result = initializer.execute(plan);
    if let Some(spinner) = spinner {
        match &result {
            Ok(_) => spinner.finish_clear(),
            Err(_) => spinner.finish_fail("Clone failed"),
        }
    }

    render_report(output, &result?)
}
