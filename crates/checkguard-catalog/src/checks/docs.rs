use crate::ids;
use camino::Utf8Path;
use checkguard_engine::{CheckContext, CheckError, CheckOutcome};
use checkguard_types::{ErrorRecord, RepoPath};

const INDEX_PAGES: &[&str] = &["docs/index.md", "docs/README.md"];

pub fn index_present(ctx: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
    let fs = ctx.fs();
    if INDEX_PAGES.iter().any(|p| fs.exists(Utf8Path::new(p))) {
        return Ok(CheckOutcome::pass());
    }
    Ok(CheckOutcome::fail(vec![
        ErrorRecord::new(
            ids::CODE_MISSING_FILE,
            "documentation index page is missing",
        )
        .with_path(RepoPath::new(INDEX_PAGES[0])),
    ]))
}
