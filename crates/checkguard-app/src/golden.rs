//! Golden-file comparison for rendered reports.

use anyhow::Context;
use camino::Utf8Path;
use similar::TextDiff;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GoldenOutcome {
    Match,
    /// Unified diff, `expected` (golden) against `actual`.
    Mismatch { diff: String },
    Missing,
}

impl GoldenOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, GoldenOutcome::Match)
    }
}

/// Compare `actual` byte-for-byte with the golden file at `path`.
pub fn compare_golden(path: &Utf8Path, actual: &str) -> anyhow::Result<GoldenOutcome> {
    let expected = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(GoldenOutcome::Missing);
        }
        Err(err) => return Err(err).with_context(|| format!("read golden {}", path)),
    };
    if expected == actual {
        return Ok(GoldenOutcome::Match);
    }
    Ok(GoldenOutcome::Mismatch {
        diff: unified_diff(&expected, actual),
    })
}

pub fn unified_diff(expected: &str, actual: &str) -> String {
    let diff = TextDiff::from_lines(expected, actual);
    let mut unified = diff.unified_diff();
    unified.context_radius(3).header("expected", "actual");
    unified.to_string()
}

/// Overwrite the golden file with `actual`.
pub fn bless_golden(path: &Utf8Path, actual: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent))?;
    }
    std::fs::write(path, actual).with_context(|| format!("write golden {}", path))?;
    tracing::info!(path = %path, "golden file blessed");
    Ok(())
}
