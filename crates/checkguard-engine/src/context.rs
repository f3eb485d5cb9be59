//! Run context: the explicit, immutable per-invocation state handed to every check.

use crate::selector::FilterError;
use camino::{Utf8Path, Utf8PathBuf};
use checkguard_types::{NetworkMode, ParseVocabError};
use std::collections::BTreeMap;
use std::fmt;
use time::OffsetDateTime;
use time::macros::format_description;

pub const ENV_RUN_ID: &str = "CHECKGUARD_RUN_ID";
pub const ENV_EVIDENCE_DIR: &str = "CHECKGUARD_EVIDENCE_DIR";
pub const ENV_NETWORK: &str = "CHECKGUARD_NETWORK";

/// Files or directories whose presence marks a repository root.
pub const REPO_MARKERS: &[&str] = &[".git", "checkguard.toml"];

pub const DEFAULT_EVIDENCE_DIR: &str = "artifacts/evidence";
pub const DEFAULT_AREA: &str = "checks";

pub const REPORT_JSON: &str = "report.json";
pub const REPORT_MD: &str = "report.md";

/// Top-level evidence-root names owned by the engine, temp files included.
/// Checks may not write to them or below them.
pub const RESERVED_ARTIFACTS: &[&str] = &[
    REPORT_JSON,
    REPORT_MD,
    ".report.json.tmp",
    ".report.md.tmp",
];

const MAX_RUN_ID_LEN: usize = 128;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("repository root not found from {start} (looked for {})", REPO_MARKERS.join(", "))]
    RepoRootNotFound { start: Utf8PathBuf },
    #[error("invalid run id `{value}`: {reason}")]
    InvalidRunId { value: String, reason: &'static str },
    #[error("invalid evidence area `{value}`: only [A-Za-z0-9_-] is allowed")]
    InvalidArea { value: String },
    #[error(transparent)]
    InvalidNetworkMode(ParseVocabError),
    #[error("invalid filter: {0}")]
    InvalidFilter(#[from] FilterError),
    #[error("{op} {path}: {source}")]
    Io {
        op: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Token scoping one run; names its evidence root.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(String);

impl RunId {
    /// Accepts 1..=128 characters of `[A-Za-z0-9_-]`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = |reason| ConfigError::InvalidRunId {
            value: raw.to_string(),
            reason,
        };
        if raw.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if raw.len() > MAX_RUN_ID_LEN {
            return Err(invalid("must be at most 128 characters"));
        }
        if !is_token(raw) {
            return Err(invalid("only [A-Za-z0-9_-] is allowed"));
        }
        Ok(Self(raw.to_string()))
    }

    /// `<UTC yyyymmddThhmmssZ>-<8 hex>`.
    pub fn generate() -> Self {
        let now = OffsetDateTime::now_utc();
        let stamp = now
            .format(format_description!(
                "[year][month][day]T[hour][minute][second]Z"
            ))
            .unwrap_or_else(|_| now.unix_timestamp().to_string());
        let salt: u32 = rand::random();
        Self(format!("{stamp}-{salt:08x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_token(raw: &str) -> bool {
    raw.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

/// Environment captured once by the binary. Nothing else reads process state.
#[derive(Clone, Debug, Default)]
pub struct RunEnv {
    vars: BTreeMap<String, String>,
}

impl RunEnv {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Values from the repository config file; lowest precedence above built-ins.
#[derive(Clone, Debug, Default)]
pub struct ContextDefaults {
    pub evidence_dir: Option<Utf8PathBuf>,
    pub area: Option<String>,
    pub network: Option<NetworkMode>,
}

/// Explicit flags. Precedence: flag > environment > config defaults > built-in.
#[derive(Clone, Debug, Default)]
pub struct RunFlags {
    /// Where repository discovery starts (usually the working directory).
    pub start_dir: Utf8PathBuf,
    pub repo_root: Option<Utf8PathBuf>,
    pub run_id: Option<String>,
    pub evidence_dir: Option<Utf8PathBuf>,
    pub area: Option<String>,
    pub network: Option<String>,
    pub verbosity: Verbosity,
    pub defaults: ContextDefaults,
}

/// Per-run state. Built once by [`new_run_context`], immutable afterward.
#[derive(Clone, Debug)]
pub struct RunContext {
    run_id: RunId,
    repo_root: Utf8PathBuf,
    evidence_dir: Utf8PathBuf,
    evidence_root: Utf8PathBuf,
    network: NetworkMode,
    verbosity: Verbosity,
}

impl RunContext {
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Absolute, canonical. Read-only for checks.
    pub fn repo_root(&self) -> &Utf8Path {
        &self.repo_root
    }

    /// Absolute, canonical. Holds the evidence roots of every run, this one included.
    pub fn evidence_dir(&self) -> &Utf8Path {
        &self.evidence_dir
    }

    /// Absolute, canonical. The only writable subtree of the run.
    pub fn evidence_root(&self) -> &Utf8Path {
        &self.evidence_root
    }

    pub fn network(&self) -> NetworkMode {
        self.network
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }
}

/// Walk `start` and its ancestors until a directory carrying a repository marker is found.
pub fn discover_repo_root(start: &Utf8Path) -> Result<Utf8PathBuf, ConfigError> {
    let start = start
        .canonicalize_utf8()
        .map_err(|_| ConfigError::RepoRootNotFound {
            start: start.to_path_buf(),
        })?;
    let found = start
        .ancestors()
        .find(|dir| REPO_MARKERS.iter().any(|m| dir.join(m).exists()))
        .map(Utf8Path::to_path_buf);
    found.ok_or(ConfigError::RepoRootNotFound { start })
}

/// An explicit `--repo-root` is used as-is (it must be an existing directory);
/// otherwise the root is discovered from `start_dir`.
pub fn resolve_repo_root(flags: &RunFlags) -> Result<Utf8PathBuf, ConfigError> {
    match &flags.repo_root {
        Some(explicit) => {
            let explicit = absolutize(&flags.start_dir, explicit);
            match explicit.canonicalize_utf8() {
                Ok(root) if root.is_dir() => Ok(root),
                _ => Err(ConfigError::RepoRootNotFound { start: explicit }),
            }
        }
        None => discover_repo_root(&flags.start_dir),
    }
}

/// Build the run context and create its evidence root.
///
/// Creates `<evidence_dir>/<area>/<run_id>` (idempotently) and nothing else.
pub fn new_run_context(flags: &RunFlags, env: &RunEnv) -> Result<RunContext, ConfigError> {
    let repo_root = resolve_repo_root(flags)?;

    let run_id = match flags.run_id.as_deref().or_else(|| env.get(ENV_RUN_ID)) {
        Some(raw) => RunId::parse(raw)?,
        None => RunId::generate(),
    };

    let area = flags
        .area
        .clone()
        .or_else(|| flags.defaults.area.clone())
        .unwrap_or_else(|| DEFAULT_AREA.to_string());
    if area.is_empty() || !is_token(&area) {
        return Err(ConfigError::InvalidArea { value: area });
    }

    let network = match flags.network.as_deref().or_else(|| env.get(ENV_NETWORK)) {
        Some(raw) => raw
            .parse::<NetworkMode>()
            .map_err(ConfigError::InvalidNetworkMode)?,
        None => flags.defaults.network.unwrap_or_default(),
    };

    let evidence_dir = flags
        .evidence_dir
        .clone()
        .or_else(|| env.get(ENV_EVIDENCE_DIR).map(Utf8PathBuf::from))
        .or_else(|| flags.defaults.evidence_dir.clone())
        .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_EVIDENCE_DIR));
    let evidence_root = absolutize(&repo_root, &evidence_dir)
        .join(&area)
        .join(run_id.as_str());

    std::fs::create_dir_all(&evidence_root).map_err(|source| ConfigError::Io {
        op: "create evidence root",
        path: evidence_root.clone(),
        source,
    })?;
    let evidence_root = evidence_root
        .canonicalize_utf8()
        .map_err(|source| ConfigError::Io {
            op: "canonicalize evidence root",
            path: evidence_root.clone(),
            source,
        })?;

    // `<evidence_dir>/<area>/<run_id>`, both tail components single tokens.
    let evidence_dir = evidence_root
        .ancestors()
        .nth(2)
        .map_or_else(|| evidence_root.clone(), Utf8Path::to_path_buf);

    tracing::debug!(
        run_id = %run_id,
        repo_root = %repo_root,
        evidence_root = %evidence_root,
        network = network.as_str(),
        "run context ready"
    );

    Ok(RunContext {
        run_id,
        repo_root,
        evidence_dir,
        evidence_root,
        network,
        verbosity: flags.verbosity,
    })
}

fn absolutize(base: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
