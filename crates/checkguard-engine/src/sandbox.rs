//! Effect sandbox: runs one check and normalizes whatever happens into a [`CheckResult`].

use crate::capability::CheckContext;
use crate::context::RunContext;
use crate::model::{CheckDefinition, CheckError, CheckResult};
use checkguard_types::{CheckStatus, ErrorRecord, ids};
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;
use std::time::Instant;

thread_local! {
    static IN_CHECK: Cell<bool> = const { Cell::new(false) };
}

static QUIET_PANIC_HOOK: Once = Once::new();

/// Chains a hook that keeps panics inside a check body off stderr. The payload
/// still reaches the result as a `check_error` record.
fn install_quiet_panic_hook() {
    QUIET_PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if IN_CHECK.with(Cell::get) {
                tracing::debug!(
                    location = %info.location().map(ToString::to_string).unwrap_or_default(),
                    "check panicked"
                );
            } else {
                previous(info);
            }
        }));
    });
}

/// Marks the current thread as running a check until dropped.
struct CheckScope;

impl CheckScope {
    fn enter() -> Self {
        IN_CHECK.with(|flag| flag.set(true));
        CheckScope
    }
}

impl Drop for CheckScope {
    fn drop(&mut self) {
        IN_CHECK.with(|flag| flag.set(false));
    }
}

/// Run `check` against `ctx`.
///
/// Status precedence is `error > fail > pass`:
/// - sandbox violations and budget overruns raise the status to at least `fail`
/// - a panic or a non-sandbox error yields `error` with the message verbatim
///
/// Error records are ordered: violations, the check's own records, `check_error`,
/// `budget_exceeded`. A panic is not printed to stderr. Aborting failures (stack
/// overflow, out of memory) are not caught.
pub fn run_sandboxed(check: &CheckDefinition, ctx: &RunContext) -> CheckResult {
    let check_ctx = CheckContext::new(ctx, check);
    let started = Instant::now();
    install_quiet_panic_hook();
    let outcome = {
        let _scope = CheckScope::enter();
        panic::catch_unwind(AssertUnwindSafe(|| (check.run)(&check_ctx)))
    };
    let duration = started.elapsed();
    let (effects_observed, violations) = check_ctx.finish();

    let mut status = if violations.is_empty() {
        CheckStatus::Pass
    } else {
        CheckStatus::Fail
    };
    let mut errors = violations;

    match outcome {
        Ok(Ok(outcome)) => {
            if !outcome.is_pass() {
                status = status.max(CheckStatus::Fail);
            }
            errors.extend(outcome.errors);
        }
        Ok(Err(CheckError::Denied(denied))) => {
            status = status.max(CheckStatus::Fail);
            if errors.is_empty() {
                errors.push(denied.to_record());
            }
        }
        Ok(Err(err)) => {
            status = CheckStatus::Error;
            errors.push(ErrorRecord::new(ids::CODE_CHECK_ERROR, err.to_string()));
        }
        Err(payload) => {
            status = CheckStatus::Error;
            errors.push(ErrorRecord::new(
                ids::CODE_CHECK_ERROR,
                panic_message(payload.as_ref()),
            ));
        }
    }

    if duration > check.timeout {
        tracing::warn!(
            check = %check.id,
            duration_ms = duration.as_millis() as u64,
            budget_ms = check.timeout.as_millis() as u64,
            "check exceeded its time budget"
        );
        errors.push(ErrorRecord::new(
            ids::CODE_BUDGET_EXCEEDED,
            format!(
                "took {}ms, budget is {}ms",
                duration.as_millis(),
                check.timeout.as_millis()
            ),
        ));
        status = status.max(CheckStatus::Fail);
    }

    CheckResult {
        id: check.id.clone(),
        domain: check.domain.clone(),
        status,
        errors,
        duration,
        effects_observed,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "check panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CheckOutcome;
    use crate::test_support::{definition, repo, run_context};
    use camino::Utf8Path;
    use checkguard_types::{Effect, RepoPath};
    use std::time::Duration;

    fn passes(_: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
        Ok(CheckOutcome::pass())
    }

    fn reports_problem(_: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
        Ok(CheckOutcome::fail(vec![
            ErrorRecord::new("missing_file", "README.md is missing")
                .with_path(RepoPath::new("README.md")),
        ]))
    }

    fn writes_inside(ctx: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
        ctx.fs().write(Utf8Path::new("nested/inventory.txt"), "ok")?;
        Ok(CheckOutcome::pass())
    }

    fn writes_over_report(ctx: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
        ctx.fs().write(Utf8Path::new("report.json/evidence.txt"), "mine")?;
        Ok(CheckOutcome::pass())
    }

    fn writes_one_level_up(ctx: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
        ctx.fs().write(Utf8Path::new("../escaped.txt"), "nope")?;
        Ok(CheckOutcome::pass())
    }

    fn writes_repo_root(ctx: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
        let target = ctx.run().repo_root().join("outside.txt");
        ctx.fs().write(&target, "nope")?;
        Ok(CheckOutcome::pass())
    }

    fn swallows_denial(ctx: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
        let _ = ctx.fs().write(Utf8Path::new("../swallowed.txt"), "nope");
        Ok(CheckOutcome::pass())
    }

    fn spawns_cargo(ctx: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
        let _ = ctx.process().run(env!("CARGO"), &["--version"]);
        Ok(CheckOutcome::pass())
    }

    fn spawns_cargo_twice(ctx: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
        let _ = ctx.process().run(env!("CARGO"), &["--version"]);
        let _ = ctx.process().run(env!("CARGO"), &["--version"]);
        Ok(CheckOutcome::pass())
    }

    fn panics(_: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
        panic!("index out of range in fixture parser")
    }

    fn breaks(_: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
        Err(CheckError::Failed("could not parse Makefile".to_string()))
    }

    fn violates_then_breaks(ctx: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
        let _ = ctx.fs().write(Utf8Path::new("../x.txt"), "nope");
        Err(CheckError::Failed("gave up".to_string()))
    }

    fn sleeps(_: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
        std::thread::sleep(Duration::from_millis(50));
        Ok(CheckOutcome::pass())
    }

    fn reads_readme(ctx: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
        ctx.fs().read_to_string(Utf8Path::new("README.md"))?;
        Ok(CheckOutcome::pass())
    }

    fn codes(result: &CheckResult) -> Vec<&str> {
        result.errors.iter().map(|e| e.code.as_str()).collect()
    }

    #[test]
    fn passing_check() {
        let (_tmp, root) = repo();
        let ctx = run_context(&root);
        let result = run_sandboxed(&definition("a.pass", "x", &[], passes), &ctx);
        assert_eq!(result.status, CheckStatus::Pass);
        assert!(result.errors.is_empty());
        assert!(result.effects_observed.is_empty());
    }

    #[test]
    fn reported_problem_is_fail_with_check_records() {
        let (_tmp, root) = repo();
        let ctx = run_context(&root);
        let result = run_sandboxed(&definition("a.fail", "x", &[], reports_problem), &ctx);
        assert_eq!(result.status, CheckStatus::Fail);
        assert_eq!(codes(&result), vec!["missing_file"]);
    }

    #[test]
    fn write_inside_evidence_root_is_allowed() {
        let (_tmp, root) = repo();
        let ctx = run_context(&root);
        let result = run_sandboxed(
            &definition("a.write", "x", &[Effect::FsWrite], writes_inside),
            &ctx,
        );
        assert_eq!(result.status, CheckStatus::Pass, "{:?}", result.errors);
        assert!(result.effects_observed.contains(Effect::FsWrite));
        assert!(ctx.evidence_root().join("nested/inventory.txt").is_file());
    }

    #[test]
    fn write_one_component_outside_is_forbidden_and_not_performed() {
        let (_tmp, root) = repo();
        let ctx = run_context(&root);
        let result = run_sandboxed(
            &definition("a.escape", "x", &[Effect::FsWrite], writes_one_level_up),
            &ctx,
        );
        assert_eq!(result.status, CheckStatus::Fail);
        assert_eq!(codes(&result), vec![ids::CODE_FORBIDDEN_WRITE_PATH]);
        let escaped = ctx.evidence_root().parent().unwrap().join("escaped.txt");
        assert!(!escaped.exists());
        assert_eq!(
            result.errors[0].path,
            Some(RepoPath::relative_to(&escaped, ctx.repo_root()))
        );
    }

    #[test]
    fn write_to_repo_root_names_the_path() {
        let (_tmp, root) = repo();
        let ctx = run_context(&root);
        let result = run_sandboxed(
            &definition("b.escape", "y", &[Effect::FsWrite], writes_repo_root),
            &ctx,
        );
        assert_eq!(result.status, CheckStatus::Fail);
        assert_eq!(result.errors[0].path, Some(RepoPath::new("outside.txt")));
        assert!(!root.join("outside.txt").exists());
    }

    #[test]
    fn write_into_report_artifact_is_forbidden() {
        let (_tmp, root) = repo();
        let ctx = run_context(&root);
        let result = run_sandboxed(
            &definition("a.squat", "x", &[Effect::FsWrite], writes_over_report),
            &ctx,
        );
        assert_eq!(result.status, CheckStatus::Fail);
        assert_eq!(codes(&result), vec![ids::CODE_FORBIDDEN_WRITE_PATH]);
        assert!(!ctx.evidence_root().join("report.json").exists());
        assert_eq!(
            result.errors[0].path,
            Some(RepoPath::relative_to(
                &ctx.evidence_root().join("report.json/evidence.txt"),
                ctx.repo_root()
            ))
        );
    }

    #[test]
    fn swallowed_denial_still_fails() {
        let (_tmp, root) = repo();
        let ctx = run_context(&root);
        let result = run_sandboxed(
            &definition("a.sneaky", "x", &[Effect::FsWrite], swallows_denial),
            &ctx,
        );
        assert_eq!(result.status, CheckStatus::Fail);
        assert_eq!(codes(&result), vec![ids::CODE_FORBIDDEN_WRITE_PATH]);
    }

    #[test]
    fn write_without_declaration_is_undeclared_effect() {
        let (_tmp, root) = repo();
        let ctx = run_context(&root);
        let result = run_sandboxed(&definition("a.write", "x", &[], writes_inside), &ctx);
        assert_eq!(result.status, CheckStatus::Fail);
        assert_eq!(codes(&result), vec![ids::CODE_UNDECLARED_EFFECT]);
        assert!(!ctx.evidence_root().join("nested/inventory.txt").exists());
    }

    #[test]
    fn undeclared_subprocess_fails_and_declared_passes() {
        let (_tmp, root) = repo();
        let ctx = run_context(&root);

        let undeclared = run_sandboxed(&definition("a.spawn", "x", &[], spawns_cargo), &ctx);
        assert_eq!(undeclared.status, CheckStatus::Fail);
        assert_eq!(codes(&undeclared), vec![ids::CODE_UNDECLARED_EFFECT]);
        assert!(undeclared.errors[0].message.contains("a.spawn"));
        assert!(undeclared.errors[0].message.contains("subprocess"));
        assert!(undeclared.effects_observed.contains(Effect::Subprocess));

        let declared = run_sandboxed(
            &definition("a.spawn", "x", &[Effect::Subprocess], spawns_cargo),
            &ctx,
        );
        assert_eq!(declared.status, CheckStatus::Pass, "{:?}", declared.errors);
    }

    #[test]
    fn undeclared_effect_is_reported_once() {
        let (_tmp, root) = repo();
        let ctx = run_context(&root);
        let result = run_sandboxed(&definition("a.spawn", "x", &[], spawns_cargo_twice), &ctx);
        assert_eq!(codes(&result), vec![ids::CODE_UNDECLARED_EFFECT]);
    }

    #[test]
    fn panic_becomes_error_with_message() {
        let (_tmp, root) = repo();
        let ctx = run_context(&root);
        let result = run_sandboxed(&definition("a.panic", "x", &[], panics), &ctx);
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(codes(&result), vec![ids::CODE_CHECK_ERROR]);
        assert_eq!(result.errors[0].message, "index out of range in fixture parser");
    }

    const QUIET_PANIC_CHILD: &str = "CHECKGUARD_SANDBOX_PANIC_CHILD";

    #[test]
    fn panic_in_check_is_not_printed() {
        if std::env::var_os(QUIET_PANIC_CHILD).is_some() {
            let (_tmp, root) = repo();
            let ctx = run_context(&root);
            let result = run_sandboxed(&definition("a.panic", "x", &[], panics), &ctx);
            assert_eq!(result.status, CheckStatus::Error);
            return;
        }

        let output = std::process::Command::new(std::env::current_exe().unwrap())
            .args([
                "--exact",
                "sandbox::tests::panic_in_check_is_not_printed",
                "--nocapture",
                "--test-threads=1",
            ])
            .env(QUIET_PANIC_CHILD, "1")
            .output()
            .unwrap();
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(output.status.success(), "stdout: {stdout}\nstderr: {stderr}");
        assert!(stdout.contains("1 passed"), "{stdout}");
        assert!(!stderr.contains("panicked"), "{stderr}");
        assert!(!stderr.contains("index out of range in fixture parser"), "{stderr}");
    }

    #[test]
    fn returned_error_becomes_error_verbatim() {
        let (_tmp, root) = repo();
        let ctx = run_context(&root);
        let result = run_sandboxed(&definition("a.broken", "x", &[], breaks), &ctx);
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.errors[0].message, "could not parse Makefile");
    }

    #[test]
    fn error_outranks_violation() {
        let (_tmp, root) = repo();
        let ctx = run_context(&root);
        let result = run_sandboxed(
            &definition("a.both", "x", &[Effect::FsWrite], violates_then_breaks),
            &ctx,
        );
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(
            codes(&result),
            vec![ids::CODE_FORBIDDEN_WRITE_PATH, ids::CODE_CHECK_ERROR]
        );
    }

    #[test]
    fn budget_overrun_fails_and_records_actual_duration() {
        let (_tmp, root) = repo();
        let ctx = run_context(&root);
        let mut check = definition("a.slow", "x", &[], sleeps);
        check.timeout = Duration::from_millis(10);
        let result = run_sandboxed(&check, &ctx);
        assert_eq!(result.status, CheckStatus::Fail);
        assert_eq!(codes(&result), vec![ids::CODE_BUDGET_EXCEEDED]);
        assert!(result.duration_ms() >= 50, "{}", result.duration_ms());
    }

    #[test]
    fn missing_read_is_error_and_read_is_observed() {
        let (_tmp, root) = repo();
        let ctx = run_context(&root);
        let result = run_sandboxed(&definition("a.read", "x", &[], reads_readme), &ctx);
        assert_eq!(result.status, CheckStatus::Error);
        assert!(result.effects_observed.contains(Effect::FsRead));

        std::fs::write(root.join("README.md"), "# hi\n").unwrap();
        let result = run_sandboxed(&definition("a.read", "x", &[], reads_readme), &ctx);
        assert_eq!(result.status, CheckStatus::Pass);
    }
}
