use crate::model::{CheckguardConfigV1, SCHEMA_CONFIG_V1};
use anyhow::Context;
use camino::Utf8PathBuf;
use checkguard_types::NetworkMode;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(v: &str) -> anyhow::Result<Self> {
        match v {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => anyhow::bail!("unknown format: {other} (expected text|json)"),
        }
    }
}

/// Command-line values that beat the config file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub fail_fast: Option<bool>,
    pub max_failures: Option<u32>,
    pub format: Option<String>,
    pub write_markdown: Option<bool>,
}

/// Effective settings.
///
/// `evidence_dir`, `area`, and `network` stay optional: they are defaults for the
/// run context, below flags and environment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub evidence_dir: Option<Utf8PathBuf>,
    pub area: Option<String>,
    pub network: Option<NetworkMode>,
    pub fail_fast: bool,
    pub max_failures: Option<usize>,
    pub format: OutputFormat,
    pub write_markdown: bool,
}

pub fn resolve_config(
    cfg: CheckguardConfigV1,
    overrides: Overrides,
) -> anyhow::Result<ResolvedConfig> {
    if let Some(schema) = cfg.schema.as_deref()
        && schema != SCHEMA_CONFIG_V1
    {
        anyhow::bail!("unsupported config schema: {schema} (expected {SCHEMA_CONFIG_V1})");
    }

    let network = match cfg.network.as_deref() {
        Some(raw) => Some(
            raw.parse::<NetworkMode>()
                .context("invalid network in config")?,
        ),
        None => None,
    };

    let format = match overrides.format.as_deref().or(cfg.format.as_deref()) {
        Some(raw) => OutputFormat::parse(raw)?,
        None => OutputFormat::default(),
    };

    let max_failures = match overrides.max_failures.or(cfg.max_failures) {
        Some(0) => anyhow::bail!("max_failures must be greater than zero"),
        Some(n) => Some(n as usize),
        None => None,
    };

    Ok(ResolvedConfig {
        evidence_dir: cfg.evidence_dir.map(Utf8PathBuf::from),
        area: cfg.area,
        network,
        fail_fast: overrides.fail_fast.or(cfg.fail_fast).unwrap_or(false),
        max_failures,
        format,
        write_markdown: overrides
            .write_markdown
            .or(cfg.write_markdown)
            .unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_config_toml;

    #[test]
    fn empty_config_resolves_to_defaults() {
        let resolved = resolve_config(CheckguardConfigV1::default(), Overrides::default()).unwrap();
        assert_eq!(resolved, ResolvedConfig::default());
    }

    #[test]
    fn file_values_are_read() {
        let cfg = parse_config_toml(
            r#"
schema = "checkguard.config.v1"
evidence_dir = "out/evidence"
area = "nightly"
network = "allow"
fail_fast = true
max_failures = 3
format = "json"
write_markdown = true
"#,
        )
        .unwrap();
        let resolved = resolve_config(cfg, Overrides::default()).unwrap();
        assert_eq!(resolved.evidence_dir, Some(Utf8PathBuf::from("out/evidence")));
        assert_eq!(resolved.area.as_deref(), Some("nightly"));
        assert_eq!(resolved.network, Some(NetworkMode::Allow));
        assert!(resolved.fail_fast);
        assert_eq!(resolved.max_failures, Some(3));
        assert_eq!(resolved.format, OutputFormat::Json);
        assert!(resolved.write_markdown);
    }

    #[test]
    fn overrides_beat_file() {
        let cfg = parse_config_toml("fail_fast = true\nformat = \"json\"\n").unwrap();
        let resolved = resolve_config(
            cfg,
            Overrides {
                fail_fast: Some(false),
                format: Some("text".to_string()),
                ..Overrides::default()
            },
        )
        .unwrap();
        assert!(!resolved.fail_fast);
        assert_eq!(resolved.format, OutputFormat::Text);
    }

    #[test]
    fn rejects_bad_values() {
        let bad_network = parse_config_toml("network = \"sometimes\"\n").unwrap();
        assert!(resolve_config(bad_network, Overrides::default()).is_err());

        let bad_format = parse_config_toml("format = \"xml\"\n").unwrap();
        assert!(resolve_config(bad_format, Overrides::default()).is_err());

        let bad_schema = parse_config_toml("schema = \"other.v9\"\n").unwrap();
        assert!(resolve_config(bad_schema, Overrides::default()).is_err());

        let zero = parse_config_toml("max_failures = 0\n").unwrap();
        assert!(resolve_config(zero, Overrides::default()).is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse_config_toml("profile = \"strict\"\n").is_err());
    }
}
