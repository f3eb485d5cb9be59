//! Capability handles: the only way a check reaches the filesystem or spawns a process.
//!
//! Every call is attributed to the check currently running and recorded in its
//! ledger. Reads are always granted. Writes must land under the evidence root and
//! require `fs_write`; the engine's own report files at the top of the evidence root
//! are off limits. Process invocation requires `subprocess`. A denied operation is
//! recorded as a violation and never performed.

use crate::context::{ENV_NETWORK, ENV_RUN_ID, RESERVED_ARTIFACTS, RunContext};
use crate::model::{CheckDefinition, CheckError, CheckId, EffectSet};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use checkguard_types::{Effect, ErrorRecord, RepoPath, ids};
use std::cell::{Cell, RefCell};
use std::process::{Command, Stdio};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EffectDenied {
    #[error("write to `{path}` is outside the evidence root")]
    ForbiddenWritePath { path: RepoPath },
    #[error("write to `{path}` targets a report artifact reserved for the engine")]
    ReservedArtifact { path: RepoPath },
    #[error("check `{check}` used undeclared effect `{effect}`")]
    UndeclaredEffect { check: String, effect: Effect },
}

impl EffectDenied {
    pub fn code(&self) -> &'static str {
        match self {
            EffectDenied::ForbiddenWritePath { .. } | EffectDenied::ReservedArtifact { .. } => {
                ids::CODE_FORBIDDEN_WRITE_PATH
            }
            EffectDenied::UndeclaredEffect { .. } => ids::CODE_UNDECLARED_EFFECT,
        }
    }

    pub fn to_record(&self) -> ErrorRecord {
        let record = ErrorRecord::new(self.code(), self.to_string());
        match self {
            EffectDenied::ForbiddenWritePath { path } | EffectDenied::ReservedArtifact { path } => {
                record.with_path(path.clone())
            }
            EffectDenied::UndeclaredEffect { .. } => record,
        }
    }
}

/// Declared versus observed effects of one check, plus its violations in occurrence order.
#[derive(Debug)]
pub(crate) struct EffectLedger {
    declared: EffectSet,
    observed: Cell<EffectSet>,
    reported: Cell<EffectSet>,
    violations: RefCell<Vec<ErrorRecord>>,
}

impl EffectLedger {
    fn new(declared: EffectSet) -> Self {
        Self {
            declared,
            observed: Cell::new(EffectSet::empty()),
            reported: Cell::new(EffectSet::empty()),
            violations: RefCell::new(Vec::new()),
        }
    }

    fn observe(&self, effect: Effect) {
        let mut observed = self.observed.get();
        observed.insert(effect);
        self.observed.set(observed);
    }

    /// Undeclared use is recorded once per effect, but denied every time.
    fn permit(&self, check: &CheckId, effect: Effect) -> Result<(), EffectDenied> {
        self.observe(effect);
        if self.declared.contains(effect) {
            return Ok(());
        }
        let denied = EffectDenied::UndeclaredEffect {
            check: check.to_string(),
            effect,
        };
        let mut reported = self.reported.get();
        if !reported.contains(effect) {
            reported.insert(effect);
            self.reported.set(reported);
            self.record(&denied);
        }
        Err(denied)
    }

    fn record(&self, denied: &EffectDenied) {
        tracing::warn!(code = denied.code(), "{denied}");
        self.violations.borrow_mut().push(denied.to_record());
    }
}

/// What a check receives: run metadata and effect handles.
#[derive(Debug)]
pub struct CheckContext<'a> {
    run: &'a RunContext,
    check: &'a CheckDefinition,
    ledger: EffectLedger,
}

impl<'a> CheckContext<'a> {
    pub(crate) fn new(run: &'a RunContext, check: &'a CheckDefinition) -> Self {
        Self {
            run,
            check,
            ledger: EffectLedger::new(check.effects),
        }
    }

    pub fn run(&self) -> &RunContext {
        self.run
    }

    pub fn check_id(&self) -> &CheckId {
        &self.check.id
    }

    pub fn fs(&self) -> SandboxFs<'_> {
        SandboxFs { ctx: self }
    }

    pub fn process(&self) -> SandboxProcess<'_> {
        SandboxProcess { ctx: self }
    }

    /// Observed effects and recorded violations.
    pub(crate) fn finish(self) -> (EffectSet, Vec<ErrorRecord>) {
        (self.ledger.observed.get(), self.ledger.violations.into_inner())
    }
}

/// Filesystem handle. Relative read paths resolve against the repository root,
/// relative write paths against the evidence root.
#[derive(Debug, Clone, Copy)]
pub struct SandboxFs<'c> {
    ctx: &'c CheckContext<'c>,
}

impl SandboxFs<'_> {
    pub fn read_to_string(&self, path: &Utf8Path) -> Result<String, CheckError> {
        self.ctx.ledger.observe(Effect::FsRead);
        let full = absolutize(self.ctx.run.repo_root(), path);
        std::fs::read_to_string(&full).map_err(|source| CheckError::Io {
            op: "read",
            path: full,
            source,
        })
    }

    pub fn exists(&self, path: &Utf8Path) -> bool {
        self.ctx.ledger.observe(Effect::FsRead);
        absolutize(self.ctx.run.repo_root(), path).exists()
    }

    /// Files under `dir`, repo-relative and sorted.
    ///
    /// Directories named in `prune` are not descended into; `.git` and the evidence
    /// directory never are. When the evidence directory is the repository root
    /// itself, the evidence area is skipped instead.
    pub fn walk_files(&self, dir: &Utf8Path, prune: &[&str]) -> Result<Vec<RepoPath>, CheckError> {
        self.ctx.ledger.observe(Effect::FsRead);
        let run = self.ctx.run;
        let repo_root = run.repo_root();
        let evidence = if run.evidence_dir() == repo_root {
            run.evidence_root().parent().unwrap_or(run.evidence_root())
        } else {
            run.evidence_dir()
        };
        let full = absolutize(repo_root, dir);

        let mut files = Vec::new();
        let walker = walkdir::WalkDir::new(&full)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let name = e.file_name();
                if e.file_type().is_dir() && (name == ".git" || prune.iter().any(|p| name == *p)) {
                    return false;
                }
                e.path() != evidence.as_std_path()
            });
        for entry in walker {
            let entry = entry.map_err(|err| CheckError::Io {
                op: "walk",
                path: full.clone(),
                source: err.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(path) = Utf8PathBuf::from_path_buf(entry.into_path()) {
                files.push(RepoPath::relative_to(&path, repo_root));
            }
        }
        files.sort();
        Ok(files)
    }

    /// Write `contents`, creating parent directories inside the evidence root.
    ///
    /// Returns the absolute path written.
    pub fn write(
        &self,
        path: &Utf8Path,
        contents: impl AsRef<[u8]>,
    ) -> Result<Utf8PathBuf, CheckError> {
        let ledger = &self.ctx.ledger;
        let run = self.ctx.run;
        ledger.observe(Effect::FsWrite);

        let target = normalize_lexically(&absolutize(run.evidence_root(), path));
        let denied = if !is_confined(&target, run.evidence_root()) {
            Some(EffectDenied::ForbiddenWritePath {
                path: RepoPath::relative_to(&target, run.repo_root()),
            })
        } else if is_reserved(&target, run.evidence_root()) {
            Some(EffectDenied::ReservedArtifact {
                path: RepoPath::relative_to(&target, run.repo_root()),
            })
        } else {
            None
        };
        if let Some(denied) = denied {
            ledger.record(&denied);
            let _ = ledger.permit(self.ctx.check_id(), Effect::FsWrite);
            return Err(denied.into());
        }
        ledger.permit(self.ctx.check_id(), Effect::FsWrite)?;

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CheckError::Io {
                op: "create directory",
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&target, contents).map_err(|source| CheckError::Io {
            op: "write",
            path: target.clone(),
            source,
        })?;
        Ok(target)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// External process handle. Processes run in the repository root with stdin closed.
#[derive(Debug, Clone, Copy)]
pub struct SandboxProcess<'c> {
    ctx: &'c CheckContext<'c>,
}

impl SandboxProcess<'_> {
    pub fn run(&self, program: &str, args: &[&str]) -> Result<ProcessOutput, CheckError> {
        self.ctx
            .ledger
            .permit(self.ctx.check_id(), Effect::Subprocess)?;

        let run = self.ctx.run;
        let output = Command::new(program)
            .args(args)
            .current_dir(run.repo_root())
            .env(ENV_RUN_ID, run.run_id().as_str())
            .env(ENV_NETWORK, run.network().as_str())
            .stdin(Stdio::null())
            .output()
            .map_err(|source| CheckError::Spawn {
                program: program.to_string(),
                source,
            })?;

        Ok(ProcessOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

fn absolutize(base: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Resolve `.` and `..` without touching the filesystem.
fn normalize_lexically(path: &Utf8Path) -> Utf8PathBuf {
    let mut out = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_str()),
        }
    }
    out
}

/// `target` is, or lies below, one of the engine's report artifacts in `root`.
fn is_reserved(target: &Utf8Path, root: &Utf8Path) -> bool {
    target
        .strip_prefix(root)
        .ok()
        .and_then(|rel| rel.components().next())
        .is_some_and(|first| RESERVED_ARTIFACTS.contains(&first.as_str()))
}

/// `target` is lexically under `root` and its deepest existing ancestor does not
/// resolve (through symlinks) to somewhere else.
fn is_confined(target: &Utf8Path, root: &Utf8Path) -> bool {
    if !target.starts_with(root) {
        return false;
    }
    let mut ancestor = target;
    loop {
        if ancestor.symlink_metadata().is_ok() {
            return match ancestor.canonicalize_utf8() {
                Ok(real) => real.starts_with(root),
                Err(_) => false,
            };
        }
        match ancestor.parent() {
            Some(parent) => ancestor = parent,
            None => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexical_normalization() {
        assert_eq!(
            normalize_lexically(Utf8Path::new("/a/b/./c/../d")),
            Utf8PathBuf::from("/a/b/d")
        );
        assert_eq!(
            normalize_lexically(Utf8Path::new("/a/../../x")),
            Utf8PathBuf::from("/x")
        );
    }

    #[test]
    fn confinement_is_component_wise() {
        let tmp = tempfile::tempdir().unwrap();
        let base = Utf8PathBuf::from_path_buf(tmp.path().canonicalize().unwrap()).unwrap();
        let root = base.join("evidence");
        std::fs::create_dir_all(&root).unwrap();

        assert!(is_confined(&root.join("a/b.txt"), &root));
        assert!(!is_confined(&base.join("evidence-other/x"), &root));
        assert!(!is_confined(&base.join("x"), &root));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_escape_is_not_confined() {
        let tmp = tempfile::tempdir().unwrap();
        let base = Utf8PathBuf::from_path_buf(tmp.path().canonicalize().unwrap()).unwrap();
        let root = base.join("evidence");
        let outside = base.join("outside");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::create_dir_all(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, root.join("link")).unwrap();

        assert!(!is_confined(&root.join("link/file.txt"), &root));
    }

    #[test]
    fn report_artifacts_are_reserved_only_at_the_top() {
        let root = Utf8Path::new("/repo/artifacts/evidence/checks/r1");
        assert!(is_reserved(&root.join("report.json"), root));
        assert!(is_reserved(&root.join("report.json/evidence.txt"), root));
        assert!(is_reserved(&root.join(".report.json.tmp"), root));
        assert!(is_reserved(&root.join("report.md"), root));
        assert!(!is_reserved(&root.join("nested/report.json"), root));
        assert!(!is_reserved(&root.join("report.json.bak"), root));
    }

    #[test]
    fn denial_records_carry_code_and_path() {
        let record = EffectDenied::ForbiddenWritePath {
            path: RepoPath::new("outside.txt"),
        }
        .to_record();
        assert_eq!(record.code, ids::CODE_FORBIDDEN_WRITE_PATH);
        assert_eq!(record.path, Some(RepoPath::new("outside.txt")));
        assert!(record.message.contains("outside.txt"));

        let record = EffectDenied::UndeclaredEffect {
            check: "vcs.clean".to_string(),
            effect: Effect::Subprocess,
        }
        .to_record();
        assert_eq!(record.code, ids::CODE_UNDECLARED_EFFECT);
        assert_eq!(
            record.message,
            "check `vcs.clean` used undeclared effect `subprocess`"
        );
    }
}
