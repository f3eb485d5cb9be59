use crate::ids;
use checkguard_engine::{CheckContext, CheckError, CheckOutcome};
use checkguard_types::{ErrorRecord, RepoPath};

/// `git status --porcelain` must print nothing.
pub fn worktree_clean(ctx: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
    let output = ctx
        .process()
        .run("git", &["status", "--porcelain", "--untracked-files=no"])?;
    if !output.success() {
        return Err(CheckError::Failed(format!(
            "git status failed: {}",
            output.stderr.trim()
        )));
    }
    let errors = output
        .stdout
        .lines()
        .filter_map(dirty_path)
        .map(|path| {
            ErrorRecord::new(
                ids::CODE_DIRTY_WORKTREE,
                format!("uncommitted change: {path}"),
            )
            .with_path(path)
        })
        .collect();
    Ok(CheckOutcome::from_errors(errors))
}

/// Porcelain v1 lines are `XY <path>` or `XY <from> -> <to>`.
fn dirty_path(line: &str) -> Option<RepoPath> {
    let rest = line.get(3..)?.trim();
    if rest.is_empty() {
        return None;
    }
    let path = rest.rsplit(" -> ").next().unwrap_or(rest);
    Some(RepoPath::new(path.trim_matches('"')))
}
