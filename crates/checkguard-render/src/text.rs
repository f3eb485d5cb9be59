use crate::{RenderableReport, RenderableStatus};

/// Summary line, then one line per non-passing check with its first error.
pub fn render_text(report: &RenderableReport) -> String {
    let mut out = format!(
        "{}: run {}: {} checks, {} passed, {} failed\n",
        report.tool, report.run_id, report.total, report.passed, report.failed
    );

    for check in report
        .checks
        .iter()
        .filter(|c| c.status != RenderableStatus::Pass)
    {
        out.push_str(check.status.label());
        out.push(' ');
        out.push_str(&check.id);
        match check.errors.first() {
            Some(err) => {
                out.push_str(&format!(": [{}] {}", err.code, err.message));
                if let Some(loc) = err.location() {
                    out.push_str(&format!(" ({loc})"));
                }
            }
            None => out.push_str(": (no details)"),
        }
        out.push('\n');
    }

    out
}
