//! CLI entry point for checkguard.
//!
//! This module is intentionally thin: it parses arguments, captures the environment,
//! initializes logging, and maps outcomes to exit codes. All business logic lives in
//! the `checkguard-app` crate.
//!
//! Exit codes: `0` every check passed, `1` a check failed or a golden file differs,
//! `2` configuration, registry, or tool errors.

use anyhow::Context;
use camino::Utf8PathBuf;
use checkguard_app::{
    ExplainOutput, GoldenOutcome, RunInput, format_check, format_check_list, format_command_list,
    format_explanation, format_not_found, load_registry, parse_report_json, render_markdown,
    run_checks, run_command, run_explain,
};
use checkguard_engine::{
    ConfigError, FilterError, Filters, RegistryError, RunEnv, RunFlags, Verbosity,
    context::{ENV_EVIDENCE_DIR, ENV_NETWORK, ENV_RUN_ID},
};
use checkguard_settings::Overrides;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const EXIT_FAILED: i32 = 1;
const EXIT_TOOL_ERROR: i32 = 2;

/// Environment variable holding the tracing filter directive.
const ENV_LOG: &str = "CHECKGUARD_LOG";

#[derive(Parser, Debug)]
#[command(
    name = "checkguard",
    version,
    about = "Sandboxed repository checks with deterministic evidence reports"
)]
struct Cli {
    /// Repository root. Discovered from the working directory when omitted.
    #[arg(long, global = true)]
    repo_root: Option<Utf8PathBuf>,

    /// Path to the config TOML (default: checkguard.toml at the repository root).
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    /// Run identifier ([A-Za-z0-9_-], at most 128 characters).
    #[arg(long, global = true)]
    run_id: Option<String>,

    /// Directory holding evidence roots, relative to the repository root.
    #[arg(long, global = true)]
    evidence_dir: Option<Utf8PathBuf>,

    /// Evidence area between the evidence directory and the run id.
    #[arg(long, global = true)]
    area: Option<String>,

    /// Network mode exported to checks (allow|forbid).
    #[arg(long, global = true)]
    network: Option<String>,

    /// Only log errors.
    #[arg(long, short, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Log progress at info level.
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Only checks in this domain.
    #[arg(long)]
    domain: Option<String>,

    /// Only checks carrying this tag.
    #[arg(long)]
    tag: Option<String>,

    /// Only checks at or above this severity (info|warning|error).
    #[arg(long)]
    min_severity: Option<String>,

    /// Only checks whose identifier matches this glob (e.g. `repo.*`).
    #[arg(long = "id")]
    id_glob: Option<String>,
}

impl From<FilterArgs> for Filters {
    fn from(args: FilterArgs) -> Self {
        Filters {
            domain: args.domain,
            tag: args.tag,
            min_severity: args.min_severity,
            id_glob: args.id_glob,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the selected checks and write the report into the evidence root.
    Run {
        #[command(flatten)]
        filters: FilterArgs,

        /// Output format on stdout (text|json).
        #[arg(long)]
        format: Option<String>,

        /// Stop at the first failing check.
        #[arg(long)]
        fail_fast: bool,

        /// Stop after this many failing checks.
        #[arg(long)]
        max_failures: Option<u32>,

        /// Also write report.md into the evidence root.
        #[arg(long)]
        write_markdown: bool,
    },

    /// Run a registered command, comparing against its golden file when it declares one.
    Command {
        group: String,
        name: String,

        /// Output format on stdout (text|json).
        #[arg(long)]
        format: Option<String>,

        /// Rewrite the golden file instead of comparing.
        #[arg(long)]
        bless: bool,
    },

    /// List registered checks (after filtering) or commands.
    List {
        #[command(flatten)]
        filters: FilterArgs,

        /// List commands instead of checks.
        #[arg(long)]
        commands: bool,
    },

    /// Explain an engine code or a check id.
    Explain {
        /// The code (e.g. "forbidden_write_path") or check id (e.g. "repo.readme_present").
        identifier: String,
    },

    /// Render Markdown from an existing JSON report.
    Md {
        /// Path to the JSON report file.
        #[arg(long)]
        report: Utf8PathBuf,

        /// Where to write the Markdown output (if not specified, prints to stdout).
        #[arg(long, short)]
        output: Option<Utf8PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(verbosity(&cli), cli.log_json);

    match dispatch(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("checkguard: {}: {err:#}", classify(&err));
            std::process::exit(EXIT_TOOL_ERROR);
        }
    }
}

fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let input = run_input(&cli)?;
    match cli.cmd {
        Commands::Run {
            filters,
            format,
            fail_fast,
            max_failures,
            write_markdown,
        } => {
            let overrides = Overrides {
                fail_fast: fail_fast.then_some(true),
                max_failures,
                format,
                write_markdown: write_markdown.then_some(true),
            };
            cmd_run(input, overrides, filters.into())
        }
        Commands::Command {
            group,
            name,
            format,
            bless,
        } => {
            let overrides = Overrides {
                format,
                ..Overrides::default()
            };
            cmd_command(input, overrides, &group, &name, bless)
        }
        Commands::List { filters, commands } => cmd_list(filters.into(), commands),
        Commands::Explain { identifier } => cmd_explain(&identifier),
        Commands::Md { report, output } => cmd_md(report, output),
    }
}

fn cmd_run(mut input: RunInput, overrides: Overrides, filters: Filters) -> anyhow::Result<i32> {
    input.overrides = overrides;
    let output = run_checks(input, &filters)?;
    print!("{}", output.rendered);
    Ok(output.exit_code())
}

fn cmd_command(
    mut input: RunInput,
    overrides: Overrides,
    group: &str,
    name: &str,
    bless: bool,
) -> anyhow::Result<i32> {
    input.overrides = overrides;
    let output = run_command(input, group, name, bless)?;
    print!("{}", output.run.rendered);

    if let (Some(path), Some(outcome)) = (&output.golden_path, &output.golden) {
        match outcome {
            GoldenOutcome::Match if bless => eprintln!("checkguard: blessed {path}"),
            GoldenOutcome::Match => {}
            GoldenOutcome::Mismatch { diff } => {
                eprintln!("checkguard: golden mismatch for {path}");
                eprint!("{diff}");
            }
            GoldenOutcome::Missing => {
                eprintln!("checkguard: golden file {path} is missing (re-run with --bless)");
            }
        }
    }
    Ok(output.exit_code())
}

fn cmd_list(filters: Filters, commands: bool) -> anyhow::Result<i32> {
    let registry = load_registry()?;
    if commands {
        print!("{}", format_command_list(&registry));
    } else {
        let selection = filters
            .compile()
            .map_err(ConfigError::from)
            .context("compile filters")?;
        print!("{}", format_check_list(&registry, &selection));
    }
    Ok(0)
}

fn cmd_explain(identifier: &str) -> anyhow::Result<i32> {
    let registry = load_registry()?;
    match run_explain(&registry, identifier) {
        ExplainOutput::Code(exp) => print!("{}", format_explanation(&exp)),
        ExplainOutput::Check(summary) => print!("{}", format_check(&summary)),
        ExplainOutput::NotFound {
            identifier,
            available_check_ids,
            available_codes,
        } => {
            eprint!(
                "{}",
                format_not_found(&identifier, &available_check_ids, available_codes)
            );
            return Ok(EXIT_FAILED);
        }
    }
    Ok(0)
}

fn cmd_md(report_path: Utf8PathBuf, output: Option<Utf8PathBuf>) -> anyhow::Result<i32> {
    let report_text = std::fs::read_to_string(&report_path)
        .with_context(|| format!("read report: {}", report_path))?;
    let report = parse_report_json(&report_text)?;
    let md = render_markdown(&report);

    match output {
        Some(out_path) => write_text_file(&out_path, &md).context("write markdown output")?,
        None => print!("{}", md),
    }
    Ok(0)
}

fn run_input(cli: &Cli) -> anyhow::Result<RunInput> {
    let cwd = std::env::current_dir().context("read working directory")?;
    let start_dir = Utf8PathBuf::from_path_buf(cwd)
        .map_err(|p| anyhow::anyhow!("working directory is not UTF-8: {}", p.display()))?;

    Ok(RunInput {
        flags: RunFlags {
            start_dir,
            repo_root: cli.repo_root.clone(),
            run_id: cli.run_id.clone(),
            evidence_dir: cli.evidence_dir.clone(),
            area: cli.area.clone(),
            network: cli.network.clone(),
            verbosity: verbosity(cli),
            ..RunFlags::default()
        },
        env: capture_env(),
        config_path: cli.config.clone(),
        ..RunInput::default()
    })
}

/// The only place process environment is read for the run.
fn capture_env() -> RunEnv {
    RunEnv::from_pairs(
        [ENV_RUN_ID, ENV_EVIDENCE_DIR, ENV_NETWORK]
            .into_iter()
            .filter_map(|name| std::env::var(name).ok().map(|value| (name, value))),
    )
}

fn verbosity(cli: &Cli) -> Verbosity {
    if cli.quiet {
        Verbosity::Quiet
    } else if cli.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

fn init_tracing(verbosity: Verbosity, log_json: bool) {
    let default = match verbosity {
        Verbosity::Quiet => "error",
        Verbosity::Normal => "warn",
        Verbosity::Verbose => "info",
    };
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new(default));
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn classify(err: &anyhow::Error) -> &'static str {
    if err.downcast_ref::<ConfigError>().is_some() || err.downcast_ref::<FilterError>().is_some()
    {
        "configuration error"
    } else if err.downcast_ref::<RegistryError>().is_some() {
        "registry error"
    } else {
        "error"
    }
}

fn write_text_file(path: &camino::Utf8Path, text: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("create directory: {}", parent))?;
    }
    std::fs::write(path, text).with_context(|| format!("write text: {}", path))?;
    Ok(())
}
