use crate::{RenderableReport, RenderableStatus};

pub fn render_markdown(report: &RenderableReport) -> String {
    let mut out = String::new();

    out.push_str("# Checkguard report\n\n");
    let verdict = if report.failed == 0 { "PASS" } else { "FAIL" };
    out.push_str(&format!(
        "- Run: `{}`\n- Verdict: **{}**\n- Checks: {} total, {} passed, {} failed\n\n",
        report.run_id, verdict, report.total, report.passed, report.failed
    ));

    if report.checks.is_empty() {
        out.push_str("No checks selected.\n");
        return out;
    }

    out.push_str("## Checks\n\n");
    for check in &report.checks {
        out.push_str(&format!(
            "- [{}] `{}` ({}, {} ms)\n",
            check.status.label(),
            check.id,
            check.domain,
            check.duration_ms
        ));
        if check.status == RenderableStatus::Pass {
            continue;
        }
        for err in &check.errors {
            match err.location() {
                Some(loc) => out.push_str(&format!(
                    "  - `{}`: {} (`{}`)\n",
                    err.code, err.message, loc
                )),
                None => out.push_str(&format!("  - `{}`: {}\n", err.code, err.message)),
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RenderableCheck, RenderableError};

    #[test]
    fn renders_empty_report() {
        let report = RenderableReport {
            tool: "checkguard".to_string(),
            run_id: "r1".to_string(),
            total: 0,
            passed: 0,
            failed: 0,
            checks: Vec::new(),
        };
        let md = render_markdown(&report);
        assert!(md.contains("Verdict: **PASS**"));
        assert!(md.contains("No checks selected"));
    }

    #[test]
    fn renders_every_check_and_failing_errors() {
        let report = RenderableReport {
            tool: "checkguard".to_string(),
            run_id: "r2".to_string(),
            total: 2,
            passed: 1,
            failed: 1,
            checks: vec![
                RenderableCheck {
                    id: "docs.index_present".to_string(),
                    domain: "docs".to_string(),
                    status: RenderableStatus::Pass,
                    duration_ms: 0,
                    errors: Vec::new(),
                },
                RenderableCheck {
                    id: "repo.readme_present".to_string(),
                    domain: "repo".to_string(),
                    status: RenderableStatus::Fail,
                    duration_ms: 4,
                    errors: vec![RenderableError {
                        code: "missing_file".to_string(),
                        message: "README.md is missing".to_string(),
                        path: Some("README.md".to_string()),
                        line: Some(1),
                    }],
                },
            ],
        };

        let md = render_markdown(&report);
        assert!(md.contains("- Run: `r2`"));
        assert!(md.contains("Verdict: **FAIL**"));
        assert!(md.contains("- [PASS] `docs.index_present` (docs, 0 ms)"));
        assert!(md.contains("- [FAIL] `repo.readme_present` (repo, 4 ms)"));
        assert!(md.contains("  - `missing_file`: README.md is missing (`README.md:1`)"));
    }
}
