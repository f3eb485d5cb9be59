//! Registry store: loads check and command definitions once into an immutable snapshot.

use crate::model::{
    CheckDefinition, CheckFn, CheckId, CommandDefinition, DomainId, EffectSet,
    validate_identifier,
};
use crate::selector::Filters;
use camino::{Utf8Path, Utf8PathBuf};
use checkguard_types::{Effect, Severity};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// One statically registered check, as written in a catalog.
///
/// Metadata fields are optional so that the loader, not the compiler, reports
/// which one is missing.
#[derive(Clone, Debug)]
pub struct CheckRegistration {
    pub id: &'static str,
    pub domain: Option<&'static str>,
    pub title: &'static str,
    pub tags: &'static [&'static str],
    pub severity: Option<Severity>,
    pub effects: Option<&'static [Effect]>,
    pub owner: &'static str,
    pub timeout_ms: Option<u64>,
    pub run: CheckFn,
}

#[derive(Clone, Debug)]
pub struct CommandRegistration {
    pub group: &'static str,
    pub name: &'static str,
    pub summary: &'static str,
    pub tags: &'static [&'static str],
    pub target: Filters,
    pub golden: Option<&'static str>,
}

/// A named source of definitions.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub name: &'static str,
    pub checks: Vec<CheckRegistration>,
    pub commands: Vec<CommandRegistration>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate check identifier `{id}` (registered by `{first}` and `{second}`)")]
    DuplicateIdentifier {
        id: String,
        first: String,
        second: String,
    },
    #[error("duplicate command `{group} {name}`")]
    DuplicateCommand { group: String, name: String },
    #[error("check `{id}` is missing required metadata `{field}`")]
    MissingMetadata { id: String, field: &'static str },
    #[error("invalid definition `{id}`: {reason}")]
    InvalidDefinition { id: String, reason: String },
}

/// Immutable view over every loaded definition.
///
/// Checks iterate sorted by identifier, commands by `(group, name)`.
#[derive(Clone, Debug, Default)]
pub struct RegistrySnapshot {
    checks: Vec<CheckDefinition>,
    commands: Vec<CommandDefinition>,
}

impl RegistrySnapshot {
    pub fn checks(&self) -> &[CheckDefinition] {
        &self.checks
    }

    pub fn check(&self, id: &str) -> Option<&CheckDefinition> {
        self.checks
            .binary_search_by(|c| c.id.as_str().cmp(id))
            .ok()
            .map(|idx| &self.checks[idx])
    }

    pub fn commands(&self) -> &[CommandDefinition] {
        &self.commands
    }

    pub fn command(&self, group: &str, name: &str) -> Option<&CommandDefinition> {
        self.commands
            .iter()
            .find(|c| c.group == group && c.name == name)
    }

    pub fn domains(&self) -> Vec<&str> {
        let set: BTreeSet<&str> = self.checks.iter().map(|c| c.domain.as_str()).collect();
        set.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

/// Load every catalog into a snapshot.
///
/// Reads nothing but the given catalogs; calling it twice yields equal snapshots.
/// The first problem found is returned.
pub fn load(sources: &[Catalog]) -> Result<RegistrySnapshot, RegistryError> {
    let mut owners: BTreeMap<&'static str, &'static str> = BTreeMap::new();
    let mut checks = Vec::new();
    for source in sources {
        for reg in &source.checks {
            if let Some(first) = owners.insert(reg.id, source.name) {
                return Err(RegistryError::DuplicateIdentifier {
                    id: reg.id.to_string(),
                    first: first.to_string(),
                    second: source.name.to_string(),
                });
            }
            checks.push(check_definition(reg)?);
        }
    }

    let mut seen_commands = BTreeSet::new();
    let mut commands = Vec::new();
    for source in sources {
        for reg in &source.commands {
            if !seen_commands.insert((reg.group, reg.name)) {
                return Err(RegistryError::DuplicateCommand {
                    group: reg.group.to_string(),
                    name: reg.name.to_string(),
                });
            }
            commands.push(command_definition(reg)?);
        }
    }

    checks.sort_by(|a, b| a.id.cmp(&b.id));
    commands.sort_by(|a, b| (&a.group, &a.name).cmp(&(&b.group, &b.name)));

    Ok(RegistrySnapshot { checks, commands })
}

fn check_definition(reg: &CheckRegistration) -> Result<CheckDefinition, RegistryError> {
    let invalid = |reason: String| RegistryError::InvalidDefinition {
        id: reg.id.to_string(),
        reason,
    };
    let missing = |field: &'static str| RegistryError::MissingMetadata {
        id: reg.id.to_string(),
        field,
    };

    let id = CheckId::parse(reg.id).map_err(|e| invalid(format!("identifier {e}")))?;
    let domain = reg.domain.ok_or_else(|| missing("domain"))?;
    let severity = reg.severity.ok_or_else(|| missing("severity"))?;
    let effects = reg.effects.ok_or_else(|| missing("effects"))?;
    let timeout_ms = reg.timeout_ms.ok_or_else(|| missing("timeout_ms"))?;

    let domain = DomainId::parse(domain).map_err(|e| invalid(format!("domain {e}")))?;
    if timeout_ms == 0 {
        return Err(invalid("timeout_ms must be greater than zero".to_string()));
    }
    let mut tags = BTreeSet::new();
    for tag in reg.tags {
        validate_identifier(tag).map_err(|e| invalid(format!("tag {e}")))?;
        tags.insert((*tag).to_string());
    }

    Ok(CheckDefinition {
        id,
        domain,
        title: reg.title.to_string(),
        tags,
        severity,
        effects: EffectSet::from_effects(effects),
        owner: reg.owner.to_string(),
        timeout: Duration::from_millis(timeout_ms),
        run: reg.run,
    })
}

fn command_definition(reg: &CommandRegistration) -> Result<CommandDefinition, RegistryError> {
    let label = format!("{} {}", reg.group, reg.name);
    let invalid = |reason: String| RegistryError::InvalidDefinition {
        id: label.clone(),
        reason,
    };

    validate_identifier(reg.group).map_err(|e| invalid(format!("group {e}")))?;
    validate_identifier(reg.name).map_err(|e| invalid(format!("name {e}")))?;
    for tag in reg.tags {
        validate_identifier(tag).map_err(|e| invalid(format!("tag {e}")))?;
    }
    reg.target
        .compile()
        .map_err(|e| invalid(format!("target {e}")))?;
    let golden = match reg.golden {
        Some(path) => {
            let path = Utf8Path::new(path);
            if path.is_absolute() {
                return Err(invalid(format!("golden path `{path}` must be repo-relative")));
            }
            Some(Utf8PathBuf::from(path))
        }
        None => None,
    };

    Ok(CommandDefinition {
        group: reg.group.to_string(),
        name: reg.name.to_string(),
        summary: reg.summary.to_string(),
        tags: reg.tags.iter().map(|t| (*t).to_string()).collect(),
        target: reg.target.clone(),
        golden,
    })
}
