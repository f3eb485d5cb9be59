use camino::Utf8Path;
use checkguard_engine::{CheckContext, CheckError, CheckOutcome};

const INVENTORY_FILE: &str = "inventory.txt";

/// Writes the sorted list of repository files into the evidence root.
pub fn tree_inventory(ctx: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
    let files = ctx
        .fs()
        .walk_files(Utf8Path::new("."), &["target", "node_modules", "artifacts"])?;
    let mut listing = String::new();
    for file in &files {
        listing.push_str(file.as_str());
        listing.push('\n');
    }
    ctx.fs().write(Utf8Path::new(INVENTORY_FILE), listing)?;
    Ok(CheckOutcome::pass())
}
