//! Explain registry for engine codes.
//!
//! Maps the codes raised by the sandbox and the execution engine to human-readable
//! explanations with remediation guidance. Check identifiers are explained from the
//! registry itself, since their metadata lives with the registration.

use crate::ids;

/// Explanation entry for an engine code.
#[derive(Debug, Clone)]
pub struct Explanation {
    /// Short description of the code.
    pub title: &'static str,
    /// What triggers the code.
    pub description: &'static str,
    /// How to fix it.
    pub remediation: &'static str,
    /// Before/after check code.
    pub examples: ExamplePair,
}

/// Before and after check code.
#[derive(Debug, Clone)]
pub struct ExamplePair {
    pub before: &'static str,
    pub after: &'static str,
}

/// Look up an explanation by code.
///
/// Returns `None` if the code is not an engine code.
pub fn lookup_explanation(code: &str) -> Option<Explanation> {
    match code {
        ids::CODE_FORBIDDEN_WRITE_PATH => Some(explain_forbidden_write_path()),
        ids::CODE_UNDECLARED_EFFECT => Some(explain_undeclared_effect()),
        ids::CODE_BUDGET_EXCEEDED => Some(explain_budget_exceeded()),
        ids::CODE_CHECK_ERROR => Some(explain_check_error()),
        _ => None,
    }
}

/// List all engine codes.
pub fn all_codes() -> &'static [&'static str] {
    &[
        ids::CODE_FORBIDDEN_WRITE_PATH,
        ids::CODE_UNDECLARED_EFFECT,
        ids::CODE_BUDGET_EXCEEDED,
        ids::CODE_CHECK_ERROR,
    ]
}

fn explain_forbidden_write_path() -> Explanation {
    Explanation {
        title: "Forbidden Write Path",
        description: "\
A check attempted to write a file outside the evidence root of the current run.

The evidence root (`<evidence_dir>/<area>/<run_id>`) is the only location a check
may write to. The write was intercepted and never performed; the check is marked
`fail` and the error names the attempted path.",
        remediation: "\
Write evidence through a path relative to the evidence root:
- pass a relative path to `ctx.fs().write(..)`, which resolves it under the evidence root
- never build absolute paths from the repository root for output files
- make sure no path component walks upward with `..`",
        examples: ExamplePair {
            before: r#"ctx.fs().write(&ctx.run().repo_root().join("out.txt"), b"data")?;"#,
            after: r#"ctx.fs().write(Utf8Path::new("out.txt"), b"data")?;"#,
        },
    }
}

fn explain_undeclared_effect() -> Explanation {
    Explanation {
        title: "Undeclared Effect",
        description: "\
A check exercised a side effect it did not declare at registration time.

Every check declares the maximal set of effects it may use (`fs_read`, `fs_write`,
`subprocess`). Writing a file without `fs_write`, or invoking an external process
without `subprocess`, is denied at the capability boundary and marks the check
`fail`, whether or not the operation itself would have succeeded.",
        remediation: "\
Either add the effect to the check's registration, or remove the effectful call
from the check body. Prefer the smallest effect set that lets the check run.",
        examples: ExamplePair {
            before: r#"CheckRegistration { id: "vcs.clean", effects: Some(&[]), .. }"#,
            after: r#"CheckRegistration { id: "vcs.clean", effects: Some(&[Effect::Subprocess]), .. }"#,
        },
    }
}

fn explain_budget_exceeded() -> Explanation {
    Explanation {
        title: "Time Budget Exceeded",
        description: "\
A check ran longer than its declared timeout budget.

Checks are not cancelled: the check completes, its actual duration is recorded,
and the result is raised to at least `fail`.",
        remediation: "\
Make the check cheaper (narrow the walked tree, avoid spawning processes), or
raise `timeout_ms` in its registration if the work is legitimately larger.",
        examples: ExamplePair {
            before: r#"timeout_ms: Some(10),"#,
            after: r#"timeout_ms: Some(500),"#,
        },
    }
}

fn explain_check_error() -> Explanation {
    Explanation {
        title: "Check Error",
        description: "\
The check itself broke: it panicked or returned an error that is not a sandbox
denial. The result is recorded with status `error` (not `fail`) and the message is
captured verbatim, so a broken checker is distinguishable from a found problem.",
        remediation: "\
Read the captured message, fix the check body, and re-run. Return error records
through `CheckOutcome` for problems the check finds in the repository.",
        examples: ExamplePair {
            before: r#"let text = std::str::from_utf8(&bytes).unwrap();"#,
            after: r#"let text = ctx.fs().read_to_string(path)?;"#,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_code() {
        assert!(lookup_explanation(ids::CODE_FORBIDDEN_WRITE_PATH).is_some());
        assert!(lookup_explanation(ids::CODE_UNDECLARED_EFFECT).is_some());
        assert!(lookup_explanation(ids::CODE_BUDGET_EXCEEDED).is_some());
        assert!(lookup_explanation(ids::CODE_CHECK_ERROR).is_some());
    }

    #[test]
    fn lookup_unknown_returns_none() {
        assert!(lookup_explanation("unknown_code").is_none());
    }

    #[test]
    fn all_codes_are_valid() {
        for code in all_codes() {
            assert!(
                lookup_explanation(code).is_some(),
                "code {} should be in registry",
                code
            );
        }
    }
}
