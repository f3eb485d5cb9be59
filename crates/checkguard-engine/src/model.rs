use crate::capability::{CheckContext, EffectDenied};
use crate::selector::Filters;
use camino::Utf8PathBuf;
use checkguard_types::{CheckStatus, Effect, ErrorRecord, Severity};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

/// Signature every check implements.
///
/// Effects are reachable only through the handles on [`CheckContext`].
pub type CheckFn = fn(&CheckContext<'_>) -> Result<CheckOutcome, CheckError>;

/// Globally unique, dotted check identifier (e.g. `repo.readme_present`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CheckId(String);

impl CheckId {
    pub fn parse(raw: &str) -> Result<Self, String> {
        validate_identifier(raw)?;
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Coarse grouping of checks (`repo`, `docs`, ...).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DomainId(String);

impl DomainId {
    pub fn parse(raw: &str) -> Result<Self, String> {
        validate_identifier(raw)?;
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifiers, domains, and tags: lowercase ASCII letters, digits, `_`, `.`, `-`,
/// starting with a letter.
pub(crate) fn validate_identifier(raw: &str) -> Result<(), String> {
    let mut chars = raw.chars();
    match chars.next() {
        None => return Err("must not be empty".to_string()),
        Some(c) if !c.is_ascii_lowercase() => {
            return Err(format!("`{raw}` must start with a lowercase letter"));
        }
        Some(_) => {}
    }
    if let Some(bad) = chars.find(|c| {
        !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-'))
    }) {
        return Err(format!("`{raw}` contains invalid character `{bad}`"));
    }
    Ok(())
}

/// A small set over [`Effect`].
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EffectSet {
    bits: u8,
}

impl EffectSet {
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    pub fn from_effects(effects: &[Effect]) -> Self {
        let mut set = Self::empty();
        for effect in effects {
            set.insert(*effect);
        }
        set
    }

    fn bit(effect: Effect) -> u8 {
        match effect {
            Effect::FsRead => 1,
            Effect::FsWrite => 1 << 1,
            Effect::Subprocess => 1 << 2,
        }
    }

    pub fn insert(&mut self, effect: Effect) {
        self.bits |= Self::bit(effect);
    }

    pub fn contains(&self, effect: Effect) -> bool {
        self.bits & Self::bit(effect) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Iterates in `fs_read, fs_write, subprocess` order.
    pub fn iter(&self) -> impl Iterator<Item = Effect> + '_ {
        Effect::ALL.into_iter().filter(|e| self.contains(*e))
    }
}

impl fmt::Debug for EffectSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(Effect::as_str)).finish()
    }
}

impl fmt::Display for EffectSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Effect::as_str).collect();
        f.write_str(&names.join(","))
    }
}

/// A registered check. Immutable once loaded into a snapshot.
#[derive(Clone, Debug)]
pub struct CheckDefinition {
    pub id: CheckId,
    pub domain: DomainId,
    pub title: String,
    pub tags: BTreeSet<String>,
    pub severity: Severity,
    /// Maximal set of effects `run` may exercise.
    pub effects: EffectSet,
    pub owner: String,
    pub timeout: Duration,
    pub run: CheckFn,
}

/// A named, grouped selection of checks (`suite/ci`, ...).
#[derive(Clone, Debug)]
pub struct CommandDefinition {
    pub group: String,
    pub name: String,
    pub summary: String,
    pub tags: BTreeSet<String>,
    pub target: Filters,
    /// Repo-relative golden file the rendered report is compared against.
    pub golden: Option<Utf8PathBuf>,
}

/// What a check returns when it ran to completion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckOutcome {
    pub exit_code: i32,
    pub errors: Vec<ErrorRecord>,
}

impl CheckOutcome {
    pub fn pass() -> Self {
        Self::default()
    }

    pub fn fail(errors: Vec<ErrorRecord>) -> Self {
        Self {
            exit_code: 1,
            errors,
        }
    }

    /// Fails when any error record is present, passes otherwise.
    pub fn from_errors(errors: Vec<ErrorRecord>) -> Self {
        if errors.is_empty() {
            Self::pass()
        } else {
            Self::fail(errors)
        }
    }

    pub fn is_pass(&self) -> bool {
        self.exit_code == 0 && self.errors.is_empty()
    }
}

/// Errors a check body may raise.
///
/// `Denied` is a sandbox verdict and yields `fail`; every other variant means the
/// check itself broke and yields `error`.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error(transparent)]
    Denied(#[from] EffectDenied),
    #[error("{op} {path}: {source}")]
    Io {
        op: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Failed(String),
}

/// The recorded outcome of one sandboxed check. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckResult {
    pub id: CheckId,
    pub domain: DomainId,
    pub status: CheckStatus,
    pub errors: Vec<ErrorRecord>,
    pub duration: Duration,
    pub effects_observed: EffectSet,
}

impl CheckResult {
    pub fn duration_ms(&self) -> u64 {
        u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX)
    }
}
