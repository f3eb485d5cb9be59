//! The `list` use case.

use checkguard_engine::{RegistrySnapshot, Selection, select};

/// One line per selected check, in execution order:
/// `<id>  <domain>  <severity>  <effects>  <title>`.
pub fn format_check_list(registry: &RegistrySnapshot, selection: &Selection) -> String {
    let checks = select(registry, selection);
    let width = checks.iter().map(|c| c.id.as_str().len()).max().unwrap_or(0);

    let mut out = String::new();
    for check in checks {
        let effects = if check.effects.is_empty() {
            "-".to_string()
        } else {
            check.effects.to_string()
        };
        out.push_str(&format!(
            "{:<width$}  {:<8}  {:<7}  {:<15}  {}\n",
            check.id.as_str(),
            check.domain.as_str(),
            check.severity.as_str(),
            effects,
            check.title,
        ));
    }
    out
}

/// One line per registered command: `<group> <name>  <summary>`.
pub fn format_command_list(registry: &RegistrySnapshot) -> String {
    let mut out = String::new();
    for command in registry.commands() {
        let mut line = format!("{} {}  {}", command.group, command.name, command.summary);
        if let Some(golden) = &command.golden {
            line.push_str(&format!(" [golden: {golden}]"));
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}
