//! Property-based tests for selection and run identifiers.

use crate::context::RunId;
use crate::registry::{CheckRegistration, load};
use crate::selector::{Filters, select};
use crate::test_support::{catalog, registration};
use checkguard_types::Severity;
use proptest::prelude::*;
use std::collections::BTreeMap;

// Registrations borrow `&'static str`; leak the generated strings for the test's lifetime.
fn leak(s: String) -> &'static str {
    Box::leak(s.into_boxed_str())
}

fn arb_severity() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Info),
        Just(Severity::Warning),
        Just(Severity::Error)
    ]
}

fn arb_registration() -> impl Strategy<Value = (String, String, Severity, bool)> {
    (
        "[a-d][a-z0-9_]{0,6}\\.[a-z][a-z0-9_]{0,6}",
        "[a-c]",
        arb_severity(),
        any::<bool>(),
    )
}

fn arb_filters() -> impl Strategy<Value = Filters> {
    (
        proptest::option::of("[a-c]"),
        proptest::option::of(Just("fast".to_string())),
        proptest::option::of(prop_oneof![
            Just("info".to_string()),
            Just("warning".to_string()),
            Just("error".to_string())
        ]),
        proptest::option::of(prop_oneof![
            Just("a*".to_string()),
            Just("*.b*".to_string()),
            Just("c?.*".to_string())
        ]),
    )
        .prop_map(|(domain, tag, min_severity, id_glob)| Filters {
            domain,
            tag,
            min_severity,
            id_glob,
        })
}

fn build(regs: Vec<(String, String, Severity, bool)>) -> Vec<CheckRegistration> {
    let unique: BTreeMap<String, (String, Severity, bool)> = regs
        .into_iter()
        .map(|(id, domain, sev, tagged)| (id, (domain, sev, tagged)))
        .collect();
    unique
        .into_iter()
        .map(|(id, (domain, sev, tagged))| CheckRegistration {
            severity: Some(sev),
            tags: if tagged { &["fast"] } else { &[] },
            ..registration(leak(id), leak(domain))
        })
        .collect()
}

proptest! {
    #[test]
    fn select_is_sorted_subset(regs in prop::collection::vec(arb_registration(), 0..24), filters in arb_filters()) {
        let snapshot = load(&[catalog("prop", build(regs))]).unwrap();
        let selection = filters.compile().unwrap();
        let selected = select(&snapshot, &selection);

        for check in &selected {
            prop_assert!(snapshot.check(check.id.as_str()).is_some());
            prop_assert!(selection.matches(check));
        }
        for pair in selected.windows(2) {
            prop_assert!((&pair[0].domain, &pair[0].id) < (&pair[1].domain, &pair[1].id));
        }
        let expected = snapshot.checks().iter().filter(|c| selection.matches(c)).count();
        prop_assert_eq!(selected.len(), expected);
    }

    #[test]
    fn no_filters_selects_everything(regs in prop::collection::vec(arb_registration(), 0..24)) {
        let snapshot = load(&[catalog("prop", build(regs))]).unwrap();
        let selected = select(&snapshot, &Filters::default().compile().unwrap());
        prop_assert_eq!(selected.len(), snapshot.len());
    }

    #[test]
    fn run_id_accepts_exactly_token_alphabet(raw in "[ -~]{1,40}") {
        let valid = raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        prop_assert_eq!(RunId::parse(&raw).is_ok(), valid);
    }
}
