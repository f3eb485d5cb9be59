//! Pure query layer over a registry snapshot.

use crate::model::CheckDefinition;
use crate::registry::RegistrySnapshot;
use checkguard_types::{ParseVocabError, Severity};
use globset::{Glob, GlobMatcher};

/// Raw selection criteria as supplied by a caller. All criteria combine with AND.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filters {
    pub domain: Option<String>,
    pub tag: Option<String>,
    /// Severity floor (`info|warning|error`).
    pub min_severity: Option<String>,
    /// Identifier glob, e.g. `repo.*`.
    pub id_glob: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("invalid identifier glob `{pattern}`: {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
    #[error("invalid severity floor: {0}")]
    InvalidSeverity(#[from] ParseVocabError),
    #[error("empty {field} filter")]
    Empty { field: &'static str },
}

/// Compiled, validated filters.
#[derive(Clone, Debug, Default)]
pub struct Selection {
    domain: Option<String>,
    tag: Option<String>,
    min_severity: Option<Severity>,
    id_glob: Option<GlobMatcher>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self == &Filters::default()
    }

    pub fn compile(&self) -> Result<Selection, FilterError> {
        let non_empty = |value: &Option<String>, field: &'static str| match value {
            Some(v) if v.trim().is_empty() => Err(FilterError::Empty { field }),
            other => Ok(other.clone()),
        };

        let domain = non_empty(&self.domain, "domain")?;
        let tag = non_empty(&self.tag, "tag")?;
        let min_severity = match &self.min_severity {
            Some(raw) => Some(raw.parse::<Severity>()?),
            None => None,
        };
        let id_glob = match non_empty(&self.id_glob, "identifier")? {
            Some(pattern) => Some(
                Glob::new(&pattern)
                    .map_err(|source| FilterError::InvalidGlob {
                        pattern: pattern.clone(),
                        source,
                    })?
                    .compile_matcher(),
            ),
            None => None,
        };

        Ok(Selection {
            domain,
            tag,
            min_severity,
            id_glob,
        })
    }
}

impl Selection {
    /// Matches every check.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matches(&self, check: &CheckDefinition) -> bool {
        if let Some(domain) = &self.domain
            && check.domain.as_str() != domain
        {
            return false;
        }
        if let Some(tag) = &self.tag
            && !check.tags.contains(tag)
        {
            return false;
        }
        if let Some(floor) = self.min_severity
            && check.severity < floor
        {
            return false;
        }
        if let Some(glob) = &self.id_glob
            && !glob.is_match(check.id.as_str())
        {
            return false;
        }
        true
    }
}

/// Checks matching `selection`, ordered by `(domain, id)`.
///
/// An empty result is not an error; callers decide whether it is fatal.
pub fn select<'r>(snapshot: &'r RegistrySnapshot, selection: &Selection) -> Vec<&'r CheckDefinition> {
    let mut selected: Vec<&CheckDefinition> = snapshot
        .checks()
        .iter()
        .filter(|c| selection.matches(c))
        .collect();
    selected.sort_by(|a, b| (&a.domain, &a.id).cmp(&(&b.domain, &b.id)));
    selected
}
