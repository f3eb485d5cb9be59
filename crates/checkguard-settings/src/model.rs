use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "checkguard.toml";
pub const SCHEMA_CONFIG_V1: &str = "checkguard.config.v1";

/// `checkguard.toml` schema v1.
///
/// Every key is optional; unknown keys are rejected so typos surface as configuration errors.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CheckguardConfigV1 {
    /// Optional schema string for tooling (`checkguard.config.v1`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Directory holding evidence roots, relative to the repository root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_dir: Option<String>,

    /// Evidence area between `evidence_dir` and the run id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,

    /// `allow` or `forbid` (default).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_fast: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_failures: Option<u32>,

    /// `text` (default) or `json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Also write `report.md` into the evidence root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_markdown: Option<bool>,
}
