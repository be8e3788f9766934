//! Remote executor, running inside the target execution context.

use crate::{InvocationOutcome, RemoteFailure, UnitRegistry, WorkUnitEnvelope};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Rebuilds and runs work units against the live ambient context.
///
/// Failures, including panics during construction or execution, are
/// returned as [`InvocationOutcome::Failed`]; nothing escapes `execute`.
pub struct RemoteExecutor<C> {
    registry: UnitRegistry<C>,
    context: Arc<C>,
}

impl<C: Send + Sync + 'static> RemoteExecutor<C> {
    pub fn new(registry: UnitRegistry<C>, context: Arc<C>) -> Self {
        Self { registry, context }
    }

    /// The ambient context bound into every rebuilt unit.
    pub fn context(&self) -> &Arc<C> {
        &self.context
    }

    pub fn registry(&self) -> &UnitRegistry<C> {
        &self.registry
    }

    /// Execute one envelope.
    pub fn execute(&self, envelope: &WorkUnitEnvelope) -> InvocationOutcome {
        debug!(unit_type = %envelope.unit_type, args = envelope.args.len(), "executing work unit");

        let run = catch_unwind(AssertUnwindSafe(|| {
            self.registry.run(envelope, self.context.clone())
        }));
        let outcome = match run {
            Ok(Ok(result)) => InvocationOutcome::Completed { result },
            Ok(Err(failure)) => InvocationOutcome::Failed { failure },
            Err(panic) => InvocationOutcome::Failed {
                failure: RemoteFailure::panic(panic_message(panic.as_ref())),
            },
        };

        match &outcome {
            InvocationOutcome::Completed { .. } => {
                debug!(unit_type = %envelope.unit_type, "work unit completed")
            }
            InvocationOutcome::Failed { failure } => {
                warn!(unit_type = %envelope.unit_type, kind = ?failure.kind, error = %failure, "work unit failed")
            }
        }
        outcome
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "work unit panicked".to_string())
}
