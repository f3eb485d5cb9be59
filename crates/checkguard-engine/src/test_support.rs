use crate::capability::CheckContext;
use crate::context::{RunContext, RunEnv, RunFlags, new_run_context};
use crate::model::{CheckDefinition, CheckError, CheckFn, CheckOutcome};
use crate::registry::{Catalog, CheckRegistration, CommandRegistration, load};
use crate::selector::Filters;
use camino::{Utf8Path, Utf8PathBuf};
use checkguard_types::{Effect, Severity};
use tempfile::TempDir;

pub fn noop(_: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
    Ok(CheckOutcome::pass())
}

pub fn registration(id: &'static str, domain: &'static str) -> CheckRegistration {
    CheckRegistration {
        id,
        domain: Some(domain),
        title: "test check",
        tags: &["fast"],
        severity: Some(Severity::Error),
        effects: Some(&[]),
        owner: "platform",
        timeout_ms: Some(1_000),
        run: noop,
    }
}

pub fn command(group: &'static str, name: &'static str) -> CommandRegistration {
    CommandRegistration {
        group,
        name,
        summary: "test command",
        tags: &[],
        target: Filters::default(),
        golden: None,
    }
}

pub fn catalog(name: &'static str, checks: Vec<CheckRegistration>) -> Catalog {
    Catalog {
        name,
        checks,
        commands: Vec::new(),
    }
}

/// A loaded definition with a generous budget, for sandbox tests.
pub fn definition(
    id: &'static str,
    domain: &'static str,
    effects: &'static [Effect],
    run: CheckFn,
) -> CheckDefinition {
    let reg = CheckRegistration {
        effects: Some(effects),
        timeout_ms: Some(60_000),
        run,
        ..registration(id, domain)
    };
    let snapshot = load(&[catalog("test", vec![reg])]).expect("valid registration");
    snapshot.checks()[0].clone()
}

/// Temporary repository with a `.git` marker; returns its canonical root.
pub fn repo() -> (TempDir, Utf8PathBuf) {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(tmp.path().canonicalize().expect("canonicalize"))
        .expect("utf8 temp path");
    std::fs::create_dir_all(root.join(".git")).expect("create .git");
    (tmp, root)
}

pub fn run_context(root: &Utf8Path) -> RunContext {
    let flags = RunFlags {
        start_dir: root.to_path_buf(),
        run_id: Some("test-run".to_string()),
        ..RunFlags::default()
    };
    new_run_context(&flags, &RunEnv::default()).expect("run context")
}
