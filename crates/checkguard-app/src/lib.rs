//! Use case orchestration for checkguard.
//!
//! This crate is the application layer: it wires the registry, settings, engine, and
//! renderers together. The CLI crate depends on this; it only handles argument parsing,
//! environment capture, and process exit codes.

#![forbid(unsafe_code)]

mod explain;
mod golden;
mod list;
mod report;
mod run;

pub use explain::{
    CheckSummary, ExplainOutput, format_check, format_explanation, format_not_found, run_explain,
};
pub use golden::{GoldenOutcome, bless_golden, compare_golden, unified_diff};
pub use list::{format_check_list, format_command_list};
pub use report::{
    GOLDEN_RUN_ID, ReportPaths, build, normalize_for_golden, parse_report_json, render_json,
    render_markdown, render_text, to_renderable, write_report,
};
pub use run::{
    CommandOutput, RunInput, RunOutput, exit_code, load_registry, run_checks, run_command,
};
