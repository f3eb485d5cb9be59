use crate::RepoPath;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version of the engine report layout. Bump on any breaking field change.
pub const SCHEMA_VERSION: u32 = 1;

/// Raised when a vocabulary string (severity, effect, network mode) is not recognized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseVocabError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

impl fmt::Display for ParseVocabError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown {}: {} (expected {})",
            self.kind, self.value, self.expected
        )
    }
}

impl std::error::Error for ParseVocabError {}

/// Ordered severity: `info < warning < error`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl FromStr for Severity {
    type Err = ParseVocabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            other => Err(ParseVocabError {
                kind: "severity",
                value: other.to_string(),
                expected: "info|warning|error",
            }),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side-effect categories a check may declare and the sandbox observes.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    FsRead,
    FsWrite,
    Subprocess,
}

impl Effect {
    pub const ALL: [Effect; 3] = [Effect::FsRead, Effect::FsWrite, Effect::Subprocess];

    pub fn as_str(self) -> &'static str {
        match self {
            Effect::FsRead => "fs_read",
            Effect::FsWrite => "fs_write",
            Effect::Subprocess => "subprocess",
        }
    }
}

impl FromStr for Effect {
    type Err = ParseVocabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fs_read" => Ok(Effect::FsRead),
            "fs_write" => Ok(Effect::FsWrite),
            "subprocess" => Ok(Effect::Subprocess),
            other => Err(ParseVocabError {
                kind: "effect",
                value: other.to_string(),
                expected: "fs_read|fs_write|subprocess",
            }),
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    Allow,
    #[default]
    Forbid,
}

impl NetworkMode {
    pub fn as_str(self) -> &'static str {
        match self {
            NetworkMode::Allow => "allow",
            NetworkMode::Forbid => "forbid",
        }
    }
}

impl FromStr for NetworkMode {
    type Err = ParseVocabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(NetworkMode::Allow),
            "forbid" => Ok(NetworkMode::Forbid),
            other => Err(ParseVocabError {
                kind: "network mode",
                value: other.to_string(),
                expected: "allow|forbid",
            }),
        }
    }
}

/// Outcome of one check. Variants are ordered by precedence: `pass < fail < error`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
    Error,
}

impl CheckStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckStatus::Pass => "pass",
            CheckStatus::Fail => "fail",
            CheckStatus::Error => "error",
        }
    }

    pub fn is_pass(self) -> bool {
        self == CheckStatus::Pass
    }
}

// Every struct below declares its fields in lexicographic order; that order is
// the serialized key order of the report.

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorRecord {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<RepoPath>,
}

impl ErrorRecord {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            line: None,
            message: message.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: RepoPath) -> Self {
        self.path = Some(path);
        self
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CheckEntry {
    pub domain: String,
    pub duration_ms: u64,
    pub errors: Vec<ErrorRecord>,
    pub id: String,
    pub status: CheckStatus,
}

/// The machine-readable result of one engine run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EngineReport {
    pub checks: Vec<CheckEntry>,
    pub failed: u32,
    pub passed: u32,
    pub run_id: String,
    pub schema_version: u32,
    pub tool: String,
    pub total: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_is_ordered() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn status_precedence_is_pass_fail_error() {
        assert!(CheckStatus::Pass < CheckStatus::Fail);
        assert!(CheckStatus::Fail < CheckStatus::Error);
        assert_eq!(CheckStatus::Pass.max(CheckStatus::Error), CheckStatus::Error);
    }

    #[test]
    fn vocabularies_parse_and_reject() {
        assert_eq!("warn".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("fs_write".parse::<Effect>().unwrap(), Effect::FsWrite);
        assert_eq!("allow".parse::<NetworkMode>().unwrap(), NetworkMode::Allow);

        let err = "loud".parse::<Severity>().unwrap_err();
        assert_eq!(err.to_string(), "unknown severity: loud (expected info|warning|error)");
        assert!("net".parse::<Effect>().is_err());
        assert!("maybe".parse::<NetworkMode>().is_err());
    }

    #[test]
    fn serializes_keys_in_sorted_order() {
        let report = EngineReport {
            checks: vec![CheckEntry {
                domain: "repo".to_string(),
                duration_ms: 3,
                errors: vec![
                    ErrorRecord::new("missing", "README.md is missing")
                        .with_path(RepoPath::new("README.md"))
                        .with_line(1),
                ],
                id: "repo.readme_present".to_string(),
                status: CheckStatus::Fail,
            }],
            failed: 1,
            passed: 0,
            run_id: "r1".to_string(),
            schema_version: SCHEMA_VERSION,
            tool: "checkguard".to_string(),
            total: 1,
        };

        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"checks":[{"domain":"repo","duration_ms":3,"errors":[{"code":"missing","line":1,"#,
                r#""message":"README.md is missing","path":"README.md"}],"id":"repo.readme_present","#,
                r#""status":"fail"}],"failed":1,"passed":0,"run_id":"r1","schema_version":1,"#,
                r#""tool":"checkguard","total":1}"#
            )
        );
    }

    #[test]
    fn optional_fields_are_omitted() {
        let json = serde_json::to_value(ErrorRecord::new("c", "m")).unwrap();
        assert_eq!(json, serde_json::json!({"code": "c", "message": "m"}));
    }
}
