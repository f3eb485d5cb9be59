//! Config parsing and resolution.
//!
//! This crate is intentionally IO-free: it parses and resolves configuration provided as strings.

#![forbid(unsafe_code)]

mod model;
mod resolve;

pub use model::{CONFIG_FILE_NAME, CheckguardConfigV1, SCHEMA_CONFIG_V1};
pub use resolve::{OutputFormat, Overrides, ResolvedConfig};

/// Parse `checkguard.toml` into a typed model.
pub fn parse_config_toml(input: &str) -> anyhow::Result<CheckguardConfigV1> {
    let cfg: CheckguardConfigV1 = toml::from_str(input)?;
    Ok(cfg)
}

/// Resolve the effective config (file values under command-line overrides).
pub fn resolve_config(
    cfg: CheckguardConfigV1,
    overrides: Overrides,
) -> anyhow::Result<ResolvedConfig> {
    resolve::resolve_config(cfg, overrides)
}
