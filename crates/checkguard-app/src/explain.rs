//! The `explain` use case: look up engine codes and registered checks.

use checkguard_engine::{CheckDefinition, RegistrySnapshot};
use checkguard_types::explain::{self, Explanation};

/// Output from the explain use case.
#[derive(Clone, Debug)]
pub enum ExplainOutput {
    /// An engine code with remediation guidance.
    Code(Explanation),
    /// A registered check; its metadata is its documentation.
    Check(CheckSummary),
    /// Unknown identifier; includes available check ids and codes.
    NotFound {
        identifier: String,
        available_check_ids: Vec<String>,
        available_codes: &'static [&'static str],
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckSummary {
    pub id: String,
    pub title: String,
    pub domain: String,
    pub tags: Vec<String>,
    pub severity: String,
    pub effects: String,
    pub owner: String,
    pub timeout_ms: u128,
}

impl From<&CheckDefinition> for CheckSummary {
    fn from(def: &CheckDefinition) -> Self {
        Self {
            id: def.id.as_str().to_string(),
            title: def.title.clone(),
            domain: def.domain.as_str().to_string(),
            tags: def.tags.iter().cloned().collect(),
            severity: def.severity.as_str().to_string(),
            effects: def.effects.to_string(),
            owner: def.owner.clone(),
            timeout_ms: def.timeout.as_millis(),
        }
    }
}

/// Engine codes win over check ids; the two namespaces do not overlap in practice.
pub fn run_explain(registry: &RegistrySnapshot, identifier: &str) -> ExplainOutput {
    if let Some(exp) = explain::lookup_explanation(identifier) {
        return ExplainOutput::Code(exp);
    }
    match registry.check(identifier) {
        Some(def) => ExplainOutput::Check(CheckSummary::from(def)),
        None => ExplainOutput::NotFound {
            identifier: identifier.to_string(),
            available_check_ids: registry
                .checks()
                .iter()
                .map(|c| c.id.as_str().to_string())
                .collect(),
            available_codes: explain::all_codes(),
        },
    }
}

/// Format an engine-code explanation for terminal display.
pub fn format_explanation(exp: &Explanation) -> String {
    let mut out = String::new();

    out.push_str(exp.title);
    out.push('\n');
    out.push_str(&"=".repeat(exp.title.len()));
    out.push_str("\n\n");
    out.push_str(exp.description);
    out.push_str("\n\n");
    out.push_str("Remediation\n");
    out.push_str("-----------\n");
    out.push_str(exp.remediation);
    out.push_str("\n\n");
    out.push_str("Examples\n");
    out.push_str("--------\n\n");
    out.push_str("Before (violation):\n");
    out.push_str("```rust\n");
    out.push_str(exp.examples.before);
    out.push('\n');
    out.push_str("```\n\n");
    out.push_str("After (fixed):\n");
    out.push_str("```rust\n");
    out.push_str(exp.examples.after);
    out.push('\n');
    out.push_str("```\n");

    out
}

pub fn format_check(summary: &CheckSummary) -> String {
    let mut out = String::new();

    out.push_str(&format!("{} ({})\n", summary.title, summary.id));
    out.push_str(&"=".repeat(summary.title.len() + summary.id.len() + 3));
    out.push_str("\n\n");
    out.push_str(&format!("domain:   {}\n", summary.domain));
    out.push_str(&format!("severity: {}\n", summary.severity));
    out.push_str(&format!("tags:     {}\n", summary.tags.join(", ")));
    let effects = if summary.effects.is_empty() {
        "none"
    } else {
        summary.effects.as_str()
    };
    out.push_str(&format!("effects:  {effects}\n"));
    out.push_str(&format!("owner:    {}\n", summary.owner));
    out.push_str(&format!("budget:   {} ms\n", summary.timeout_ms));

    out
}

/// Format the "not found" error message for terminal display.
pub fn format_not_found(identifier: &str, check_ids: &[String], codes: &[&'static str]) -> String {
    let mut out = String::new();

    out.push_str(&format!("Unknown check id or code: {}\n\n", identifier));
    out.push_str("Available check ids:\n");
    for id in check_ids {
        out.push_str(&format!("  - {}\n", id));
    }
    out.push_str("\nAvailable codes:\n");
    for code in codes {
        out.push_str(&format!("  - {}\n", code));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::load_registry;

    #[test]
    fn engine_codes_resolve_to_explanations() {
        let registry = load_registry().unwrap();
        for code in explain::all_codes() {
            match run_explain(&registry, code) {
                ExplainOutput::Code(exp) => {
                    let text = format_explanation(&exp);
                    assert!(text.starts_with(exp.title));
                    assert!(text.contains("Remediation"));
                }
                other => panic!("expected explanation for {code}, got {other:?}"),
            }
        }
    }

    #[test]
    fn check_ids_resolve_to_metadata() {
        let registry = load_registry().unwrap();
        let ExplainOutput::Check(summary) = run_explain(&registry, "vcs.worktree_clean") else {
            panic!("expected check summary");
        };
        assert_eq!(summary.domain, "vcs");
        assert_eq!(summary.effects, "subprocess");
        let text = format_check(&summary);
        assert!(text.contains("severity: warning\n"), "{text}");
        assert!(text.contains("budget:   5000 ms\n"), "{text}");
    }

    #[test]
    fn unknown_identifier_lists_alternatives() {
        let registry = load_registry().unwrap();
        let ExplainOutput::NotFound {
            identifier,
            available_check_ids,
            available_codes,
        } = run_explain(&registry, "nope")
        else {
            panic!("expected not found");
        };
        let text = format_not_found(&identifier, &available_check_ids, available_codes);
        assert!(text.starts_with("Unknown check id or code: nope\n"));
        assert!(text.contains("  - repo.readme_present\n"));
        assert!(text.contains("  - budget_exceeded\n"));
    }
}
