//! Stable identifiers for the tool and the codes the engine emits on its own.
//!
//! Checks are free to emit their own codes. The codes below are reserved for
//! the sandbox and the execution engine.

pub const TOOL_NAME: &str = "checkguard";

// Codes: sandbox violations
pub const CODE_FORBIDDEN_WRITE_PATH: &str = "forbidden_write_path";
pub const CODE_UNDECLARED_EFFECT: &str = "undeclared_effect";

// Codes: execution engine
pub const CODE_BUDGET_EXCEEDED: &str = "budget_exceeded";
pub const CODE_CHECK_ERROR: &str = "check_error";
