//! Execution engine: `Idle -> Selecting -> Running -> Aggregating -> Done`, exactly once.

use crate::context::RunContext;
use crate::model::CheckResult;
use crate::registry::RegistrySnapshot;
use crate::sandbox::run_sandboxed;
use crate::selector::{Selection, select};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Selecting,
    Running,
    Aggregating,
    Done,
}

#[derive(Clone, Debug, Default)]
pub struct EngineOptions {
    /// Stop after the first non-pass result. Remaining checks are not reported.
    pub fail_fast: bool,
    /// Stop once this many non-pass results were collected.
    pub max_failures: Option<usize>,
    /// Polled between checks. Set by the embedding caller; the CLI installs no handler.
    pub interrupt: Option<Arc<AtomicBool>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineOutput {
    /// In execution order, which is selection order.
    pub results: Vec<CheckResult>,
    pub selected: usize,
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    /// Fewer checks ran than were selected because of `fail_fast`/`max_failures`.
    pub stopped_early: bool,
    pub interrupted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("engine already ran; create a new engine for another run")]
    AlreadyRun,
}

pub struct Engine<'r> {
    registry: &'r RegistrySnapshot,
    options: EngineOptions,
    state: EngineState,
}

impl<'r> Engine<'r> {
    pub fn new(registry: &'r RegistrySnapshot, options: EngineOptions) -> Self {
        Self {
            registry,
            options,
            state: EngineState::Idle,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn run(
        &mut self,
        ctx: &RunContext,
        selection: &Selection,
    ) -> Result<EngineOutput, EngineError> {
        if self.state != EngineState::Idle {
            return Err(EngineError::AlreadyRun);
        }
        let span = tracing::info_span!("run", run_id = %ctx.run_id());
        let _guard = span.enter();

        self.state = EngineState::Selecting;
        let selected = select(self.registry, selection);
        tracing::info!(selected = selected.len(), "checks selected");

        self.state = EngineState::Running;
        let mut results = Vec::with_capacity(selected.len());
        let mut failures = 0usize;
        let mut stopped_early = false;
        let mut interrupted = false;
        for check in &selected {
            if self.interrupted() {
                tracing::warn!(completed = results.len(), "run interrupted");
                interrupted = true;
                break;
            }
            let result = run_sandboxed(check, ctx);
            tracing::debug!(
                check = %result.id,
                status = result.status.as_str(),
                duration_ms = result.duration_ms(),
                "check finished"
            );
            let failed = !result.status.is_pass();
            results.push(result);
            if failed {
                failures += 1;
                let limit_hit = self.options.max_failures.is_some_and(|max| failures >= max);
                if self.options.fail_fast || limit_hit {
                    stopped_early = results.len() < selected.len();
                    break;
                }
            }
        }

        self.state = EngineState::Aggregating;
        let total = results.len() as u32;
        let passed = results.iter().filter(|r| r.status.is_pass()).count() as u32;
        let output = EngineOutput {
            selected: selected.len(),
            total,
            passed,
            failed: total - passed,
            stopped_early,
            interrupted,
            results,
        };
        tracing::info!(
            total = output.total,
            passed = output.passed,
            failed = output.failed,
            "run complete"
        );

        self.state = EngineState::Done;
        Ok(output)
    }

    fn interrupted(&self) -> bool {
        self.options
            .interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}
