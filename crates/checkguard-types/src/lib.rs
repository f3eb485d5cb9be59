//! Stable DTOs and codes used across the checkguard workspace.
//!
//! This crate is intentionally boring:
//! - data types for the emitted engine report
//! - severity, effect, and status vocabularies
//! - stable error codes raised by the engine itself
//! - canonical repo-relative path handling
//! - explain registry for the engine codes

#![forbid(unsafe_code)]

pub mod explain;
pub mod ids;
pub mod path;
pub mod report;

pub use explain::{ExamplePair, Explanation, lookup_explanation};
pub use path::RepoPath;
pub use report::{
    CheckEntry, CheckStatus, Effect, EngineReport, ErrorRecord, NetworkMode, ParseVocabError,
    SCHEMA_VERSION, Severity,
};
