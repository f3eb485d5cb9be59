use crate::ids;
use camino::Utf8Path;
use checkguard_engine::{CheckContext, CheckError, CheckOutcome};
use checkguard_types::{ErrorRecord, RepoPath};

const README_NAMES: &[&str] = &["README.md", "README", "README.rst", "README.txt"];
const LICENSE_NAMES: &[&str] = &[
    "LICENSE",
    "LICENSE.md",
    "LICENSE.txt",
    "LICENSE-MIT",
    "LICENSE-APACHE",
    "COPYING",
];
const STRAY_SUFFIXES: &[&str] = &[".orig", ".rej", ".swp", ".tmp", "~"];
const STRAY_NAMES: &[&str] = &[".DS_Store", "Thumbs.db"];
const PRUNED_DIRS: &[&str] = &["target", "node_modules", "artifacts"];

pub fn readme_present(ctx: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
    require_any(ctx, README_NAMES, "README")
}

pub fn license_present(ctx: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
    require_any(ctx, LICENSE_NAMES, "license file")
}

fn require_any(
    ctx: &CheckContext<'_>,
    names: &[&str],
    what: &str,
) -> Result<CheckOutcome, CheckError> {
    let fs = ctx.fs();
    if names.iter().any(|name| fs.exists(Utf8Path::new(name))) {
        return Ok(CheckOutcome::pass());
    }
    Ok(CheckOutcome::fail(vec![
        ErrorRecord::new(
            ids::CODE_MISSING_FILE,
            format!("no {what} at the repository root (expected one of: {})", names.join(", ")),
        )
        .with_path(RepoPath::new(names[0])),
    ]))
}

pub fn no_stray_files(ctx: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
    let files = ctx.fs().walk_files(Utf8Path::new("."), PRUNED_DIRS)?;
    let errors = files
        .into_iter()
        .filter(|path| is_stray(path.as_str()))
        .map(|path| {
            ErrorRecord::new(
                ids::CODE_STRAY_FILE,
                format!("leftover file should not be committed: {path}"),
            )
            .with_path(path)
        })
        .collect();
    Ok(CheckOutcome::from_errors(errors))
}

fn is_stray(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    STRAY_NAMES.contains(&name) || STRAY_SUFFIXES.iter().any(|s| name.ends_with(s))
}
