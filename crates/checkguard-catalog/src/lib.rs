//! Built-in checks and commands.
//!
//! Every check is a plain function registered here with its full metadata; the
//! engine validates the registrations before anything runs.

#![forbid(unsafe_code)]

mod checks;
pub mod ids;

use checkguard_engine::{Catalog, CheckRegistration, CommandRegistration, Filters};
use checkguard_types::{Effect, Severity};

pub const CATALOG_NAME: &str = "builtin";

const READ: &[Effect] = &[Effect::FsRead];

/// The built-in catalog.
pub fn builtin() -> Catalog {
    Catalog {
        name: CATALOG_NAME,
        checks: builtin_checks(),
        commands: builtin_commands(),
    }
}

fn builtin_checks() -> Vec<CheckRegistration> {
    vec![
        CheckRegistration {
            id: ids::CHECK_REPO_README_PRESENT,
            domain: Some("repo"),
            title: "Repository has a README",
            tags: &["fast", "layout"],
            severity: Some(Severity::Error),
            effects: Some(READ),
            owner: "platform",
            timeout_ms: Some(500),
            run: checks::repo::readme_present,
        },
        CheckRegistration {
            id: ids::CHECK_REPO_LICENSE_PRESENT,
            domain: Some("repo"),
            title: "Repository has a license file",
            tags: &["fast", "layout"],
            severity: Some(Severity::Warning),
            effects: Some(READ),
            owner: "platform",
            timeout_ms: Some(500),
            run: checks::repo::license_present,
        },
        CheckRegistration {
            id: ids::CHECK_REPO_NO_STRAY_FILES,
            domain: Some("repo"),
            title: "No editor, merge, or temporary leftovers are checked in",
            tags: &["hygiene"],
            severity: Some(Severity::Warning),
            effects: Some(READ),
            owner: "platform",
            timeout_ms: Some(2_000),
            run: checks::repo::no_stray_files,
        },
        CheckRegistration {
            id: ids::CHECK_DOCS_INDEX_PRESENT,
            domain: Some("docs"),
            title: "Documentation tree has an index page",
            tags: &["fast", "docs"],
            severity: Some(Severity::Warning),
            effects: Some(READ),
            owner: "docs",
            timeout_ms: Some(500),
            run: checks::docs::index_present,
        },
        CheckRegistration {
            id: ids::CHECK_MAKE_HELP_TARGET,
            domain: Some("make"),
            title: "Makefile exposes a help target",
            tags: &["fast"],
            severity: Some(Severity::Info),
            effects: Some(READ),
            owner: "platform",
            timeout_ms: Some(500),
            run: checks::make::help_target,
        },
        CheckRegistration {
            id: ids::CHECK_EVIDENCE_TREE_INVENTORY,
            domain: Some("evidence"),
            title: "Record an inventory of repository files as run evidence",
            tags: &["evidence"],
            severity: Some(Severity::Info),
            effects: Some(&[Effect::FsRead, Effect::FsWrite]),
            owner: "platform",
            timeout_ms: Some(2_000),
            run: checks::evidence::tree_inventory,
        },
        CheckRegistration {
            id: ids::CHECK_VCS_WORKTREE_CLEAN,
            domain: Some("vcs"),
            title: "Git worktree has no uncommitted changes",
            tags: &["ci"],
            severity: Some(Severity::Warning),
            effects: Some(&[Effect::Subprocess]),
            owner: "platform",
            timeout_ms: Some(5_000),
            run: checks::vcs::worktree_clean,
        },
    ]
}

fn builtin_commands() -> Vec<CommandRegistration> {
    vec![
        CommandRegistration {
            group: "suite",
            name: "all",
            summary: "Every built-in check",
            tags: &[],
            target: Filters::default(),
            golden: None,
        },
        CommandRegistration {
            group: "suite",
            name: "ci",
            summary: "Checks with severity warning or above",
            tags: &["ci"],
            target: Filters {
                min_severity: Some("warning".to_string()),
                ..Filters::default()
            },
            golden: None,
        },
        CommandRegistration {
            group: "suite",
            name: "docs",
            summary: "Documentation checks, compared against a golden report",
            tags: &["docs"],
            target: Filters {
                domain: Some("docs".to_string()),
                ..Filters::default()
            },
            golden: Some("tests/golden/suite-docs.json"),
        },
        CommandRegistration {
            group: "repo",
            name: "hygiene",
            summary: "Fast repository layout and hygiene checks",
            tags: &[],
            target: Filters {
                domain: Some("repo".to_string()),
                ..Filters::default()
            },
            golden: None,
        },
    ]
}
