//! The `run` and `command` use cases: resolve config, build the run context,
//! execute the selected checks, and write the report into the evidence root.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use checkguard_engine::{
    ConfigError, ContextDefaults, Engine, EngineOptions, Filters, RegistrySnapshot, RunEnv,
    RunFlags, new_run_context, resolve_repo_root,
};
use checkguard_settings::{CONFIG_FILE_NAME, CheckguardConfigV1, OutputFormat, Overrides};
use checkguard_types::{EngineReport, ids};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::golden::{GoldenOutcome, bless_golden, compare_golden};
use crate::report::{ReportPaths, build, normalize_for_golden, render_json, render_text, write_report};

/// Input shared by the run and command use cases.
#[derive(Clone, Debug, Default)]
pub struct RunInput {
    /// Run-context flags; `flags.defaults` is filled from the config file.
    pub flags: RunFlags,
    /// Environment captured by the binary.
    pub env: RunEnv,
    /// Config file path. Defaults to `checkguard.toml` at the repository root, which may be absent.
    pub config_path: Option<Utf8PathBuf>,
    /// Command-line overrides of config values.
    pub overrides: Overrides,
    /// Polled between checks. Whoever embeds the run owns setting it; the CLI never does.
    pub interrupt: Option<Arc<AtomicBool>>,
}

/// Output from the run use case.
#[derive(Clone, Debug)]
pub struct RunOutput {
    pub report: EngineReport,
    /// The report rendered in `format`.
    pub rendered: String,
    pub format: OutputFormat,
    pub repo_root: Utf8PathBuf,
    pub evidence_root: Utf8PathBuf,
    pub paths: ReportPaths,
    pub stopped_early: bool,
    pub interrupted: bool,
}

impl RunOutput {
    /// An interrupted run exits `1` even when everything that ran passed.
    pub fn exit_code(&self) -> i32 {
        if self.interrupted {
            1
        } else {
            exit_code(&self.report)
        }
    }
}

/// Output from the command use case.
#[derive(Clone, Debug)]
pub struct CommandOutput {
    pub run: RunOutput,
    /// Golden file declared by the command, resolved against the repository root.
    pub golden_path: Option<Utf8PathBuf>,
    pub golden: Option<GoldenOutcome>,
}

impl CommandOutput {
    /// A golden mismatch fails the command even if every check passed.
    pub fn exit_code(&self) -> i32 {
        match &self.golden {
            Some(outcome) if !outcome.is_match() => 1,
            _ => self.run.exit_code(),
        }
    }
}

/// `0` when every reported check passed, `1` otherwise.
pub fn exit_code(report: &EngineReport) -> i32 {
    if report.failed == 0 { 0 } else { 1 }
}

/// Load the built-in catalog into a validated snapshot.
pub fn load_registry() -> anyhow::Result<RegistrySnapshot> {
    checkguard_engine::load(&[checkguard_catalog::builtin()]).context("load check registry")
}

/// Run the checks selected by `filters`.
pub fn run_checks(input: RunInput, filters: &Filters) -> anyhow::Result<RunOutput> {
    let registry = load_registry()?;
    execute(&registry, input, filters)
}

/// Run a registered command and compare against its golden file, if it declares one.
///
/// With `bless`, the golden file is rewritten instead of compared.
pub fn run_command(
    input: RunInput,
    group: &str,
    name: &str,
    bless: bool,
) -> anyhow::Result<CommandOutput> {
    let registry = load_registry()?;
    let command = registry
        .command(group, name)
        .with_context(|| format!("unknown command `{group} {name}`"))?;
    let run = execute(&registry, input, &command.target)
        .with_context(|| format!("run command `{group} {name}`"))?;

    let Some(golden) = &command.golden else {
        return Ok(CommandOutput {
            run,
            golden_path: None,
            golden: None,
        });
    };
    let golden_path = run.repo_root.join(golden);
    let actual = render_json(&normalize_for_golden(&run.report))?;
    let outcome = if bless {
        bless_golden(&golden_path, &actual)?;
        GoldenOutcome::Match
    } else {
        compare_golden(&golden_path, &actual)?
    };
    tracing::info!(
        command = %format!("{group} {name}"),
        golden = %golden_path,
        matched = outcome.is_match(),
        "golden compared"
    );

    Ok(CommandOutput {
        run,
        golden_path: Some(golden_path),
        golden: Some(outcome),
    })
}

fn execute(
    registry: &RegistrySnapshot,
    input: RunInput,
    filters: &Filters,
) -> anyhow::Result<RunOutput> {
    let selection = filters
        .compile()
        .map_err(ConfigError::from)
        .context("compile filters")?;

    let RunInput {
        mut flags,
        env,
        config_path,
        overrides,
        interrupt,
    } = input;

    let repo_root = resolve_repo_root(&flags).context("locate repository root")?;
    let cfg = read_config(&repo_root, &flags.start_dir, config_path.as_deref())?;
    let resolved = checkguard_settings::resolve_config(cfg, overrides).context("resolve config")?;

    flags.repo_root = Some(repo_root);
    flags.defaults = ContextDefaults {
        evidence_dir: resolved.evidence_dir.clone(),
        area: resolved.area.clone(),
        network: resolved.network,
    };
    let ctx = new_run_context(&flags, &env).context("build run context")?;

    let mut engine = Engine::new(
        registry,
        EngineOptions {
            fail_fast: resolved.fail_fast,
            max_failures: resolved.max_failures,
            interrupt,
        },
    );
    let output = engine.run(&ctx, &selection)?;

    let report = build(&output.results, ctx.run_id(), ids::TOOL_NAME);
    let paths = write_report(ctx.evidence_root(), &report, resolved.write_markdown)
        .context("write report")?;
    let rendered = match resolved.format {
        OutputFormat::Json => render_json(&report)?,
        OutputFormat::Text => render_text(&report),
    };

    Ok(RunOutput {
        report,
        rendered,
        format: resolved.format,
        repo_root: ctx.repo_root().to_path_buf(),
        evidence_root: ctx.evidence_root().to_path_buf(),
        paths,
        stopped_early: output.stopped_early,
        interrupted: output.interrupted,
    })
}

/// An explicit config path must exist; the default one is optional.
fn read_config(
    repo_root: &Utf8Path,
    start_dir: &Utf8Path,
    explicit: Option<&Utf8Path>,
) -> anyhow::Result<CheckguardConfigV1> {
    let path = match explicit {
        Some(p) if p.is_absolute() => p.to_path_buf(),
        Some(p) => start_dir.join(p),
        None => repo_root.join(CONFIG_FILE_NAME),
    };
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && explicit.is_none() => {
            return Ok(CheckguardConfigV1::default());
        }
        Err(err) => return Err(err).with_context(|| format!("read config {}", path)),
    };
    if text.trim().is_empty() {
        return Ok(CheckguardConfigV1::default());
    }
    checkguard_settings::parse_config_toml(&text).with_context(|| format!("parse config {}", path))
}
