//! Check execution engine.
//!
//! Data flows one way:
//! registry snapshot -> selector -> engine -> (sandbox x run context) -> results.
//!
//! - [`registry`] and [`selector`] are pure: no IO, no process state.
//! - [`context`] is the only module that touches the filesystem before checks run
//!   (repository discovery and evidence root creation).
//! - [`capability`] holds the handles through which checks reach the filesystem
//!   and external processes; [`sandbox`] wraps one check invocation around them.

#![forbid(unsafe_code)]

pub mod capability;
pub mod context;
pub mod engine;
pub mod model;
pub mod registry;
pub mod sandbox;
pub mod selector;

#[cfg(test)]
mod proptests;
#[cfg(test)]
mod test_support;

pub use capability::{CheckContext, EffectDenied, ProcessOutput, SandboxFs, SandboxProcess};
pub use context::{
    ConfigError, ContextDefaults, RunContext, RunEnv, RunFlags, RunId, Verbosity,
    discover_repo_root, new_run_context, resolve_repo_root,
};
pub use engine::{Engine, EngineError, EngineOptions, EngineOutput, EngineState};
pub use model::{
    CheckDefinition, CheckError, CheckFn, CheckId, CheckOutcome, CheckResult, CommandDefinition,
    DomainId, EffectSet,
};
pub use registry::{
    Catalog, CheckRegistration, CommandRegistration, RegistryError, RegistrySnapshot, load,
};
pub use sandbox::run_sandboxed;
pub use selector::{FilterError, Filters, Selection, select};
