//! Report builder: aggregate results into an [`EngineReport`], render it, write it.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use checkguard_engine::{CheckResult, RunId};
use checkguard_render::{RenderableCheck, RenderableError, RenderableReport, RenderableStatus};
use checkguard_types::{CheckEntry, CheckStatus, EngineReport, SCHEMA_VERSION};

/// Placeholder written in place of the run id in golden files.
pub const GOLDEN_RUN_ID: &str = "<run_id>";

pub use checkguard_engine::context::{REPORT_JSON, REPORT_MD};

/// Aggregate results into a report. Entries are ordered by check identifier.
pub fn build(results: &[CheckResult], run_id: &RunId, tool: &str) -> EngineReport {
    let mut checks: Vec<CheckEntry> = results
        .iter()
        .map(|r| CheckEntry {
            domain: r.domain.as_str().to_string(),
            duration_ms: r.duration_ms(),
            errors: r.errors.clone(),
            id: r.id.as_str().to_string(),
            status: r.status,
        })
        .collect();
    checks.sort_by(|a, b| a.id.cmp(&b.id));

    let total = checks.len() as u32;
    let passed = checks.iter().filter(|c| c.status.is_pass()).count() as u32;
    EngineReport {
        checks,
        failed: total - passed,
        passed,
        run_id: run_id.as_str().to_string(),
        schema_version: SCHEMA_VERSION,
        tool: tool.to_string(),
        total,
    }
}

/// Pretty JSON with a trailing newline. Byte-identical for equal reports.
pub fn render_json(report: &EngineReport) -> anyhow::Result<String> {
    let mut out = serde_json::to_string_pretty(report).context("serialize report")?;
    out.push('\n');
    Ok(out)
}

pub fn render_text(report: &EngineReport) -> String {
    checkguard_render::render_text(&to_renderable(report))
}

pub fn render_markdown(report: &EngineReport) -> String {
    checkguard_render::render_markdown(&to_renderable(report))
}

pub fn parse_report_json(text: &str) -> anyhow::Result<EngineReport> {
    let report: EngineReport = serde_json::from_str(text).context("parse report json")?;
    if report.schema_version != SCHEMA_VERSION {
        anyhow::bail!(
            "unsupported report schema_version: {} (expected {SCHEMA_VERSION})",
            report.schema_version
        );
    }
    Ok(report)
}

pub fn to_renderable(report: &EngineReport) -> RenderableReport {
    RenderableReport {
        tool: report.tool.clone(),
        run_id: report.run_id.clone(),
        total: report.total,
        passed: report.passed,
        failed: report.failed,
        checks: report
            .checks
            .iter()
            .map(|c| RenderableCheck {
                id: c.id.clone(),
                domain: c.domain.clone(),
                status: match c.status {
                    CheckStatus::Pass => RenderableStatus::Pass,
                    CheckStatus::Fail => RenderableStatus::Fail,
                    CheckStatus::Error => RenderableStatus::Error,
                },
                duration_ms: c.duration_ms,
                errors: c
                    .errors
                    .iter()
                    .map(|e| RenderableError {
                        code: e.code.clone(),
                        message: e.message.clone(),
                        path: e.path.as_ref().map(|p| p.as_str().to_string()),
                        line: e.line,
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// Strip the fields that legitimately differ between runs.
pub fn normalize_for_golden(report: &EngineReport) -> EngineReport {
    let mut report = report.clone();
    report.run_id = GOLDEN_RUN_ID.to_string();
    for check in &mut report.checks {
        check.duration_ms = 0;
    }
    report
}

/// Where [`write_report`] put the artifacts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportPaths {
    pub json: Utf8PathBuf,
    pub markdown: Option<Utf8PathBuf>,
}

/// Write `report.json` (and optionally `report.md`) into the evidence root.
///
/// Each file is written to a sibling temp file and renamed into place.
pub fn write_report(
    evidence_root: &Utf8Path,
    report: &EngineReport,
    markdown: bool,
) -> anyhow::Result<ReportPaths> {
    let json = evidence_root.join(REPORT_JSON);
    write_atomic(&json, render_json(report)?.as_bytes())?;

    let markdown = if markdown {
        let path = evidence_root.join(REPORT_MD);
        write_atomic(&path, render_markdown(report).as_bytes())?;
        Some(path)
    } else {
        None
    };

    tracing::debug!(path = %json, "report written");
    Ok(ReportPaths { json, markdown })
}

fn write_atomic(path: &Utf8Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent))?;
    }
    let file_name = path.file_name().unwrap_or(REPORT_JSON);
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    std::fs::write(&tmp, bytes).with_context(|| format!("write {}", tmp))?;
    std::fs::rename(&tmp, path).with_context(|| format!("rename {} to {}", tmp, path))?;
    Ok(())
}
