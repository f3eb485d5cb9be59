use crate::ids;
use camino::Utf8Path;
use checkguard_engine::{CheckContext, CheckError, CheckOutcome};
use checkguard_types::{ErrorRecord, RepoPath};

const MAKEFILE: &str = "Makefile";

/// Repositories without a Makefile pass.
pub fn help_target(ctx: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
    let fs = ctx.fs();
    let path = Utf8Path::new(MAKEFILE);
    if !fs.exists(path) {
        return Ok(CheckOutcome::pass());
    }
    let text = fs.read_to_string(path)?;
    if text.lines().any(declares_help) {
        return Ok(CheckOutcome::pass());
    }
    Ok(CheckOutcome::fail(vec![
        ErrorRecord::new(
            ids::CODE_MISSING_HELP_TARGET,
            "Makefile has no `help` target",
        )
        .with_path(RepoPath::new(MAKEFILE)),
    ]))
}

fn declares_help(line: &str) -> bool {
    let Some((targets, _)) = line.split_once(':') else {
        return false;
    };
    !line.starts_with(['\t', '#']) && targets.split_whitespace().any(|t| t == "help")
}
