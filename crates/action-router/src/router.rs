//! Action dispatch.
//!
//! Each action maps to exactly one [`Route`]. Handler faults, whether
//! returned or raised as panics, end the request as
//! [`DispatchError::InternalFault`] and never reach the caller.

use crate::{DispatchError, DispatchResult, HandlerFault, TargetController, TargetSet};
use gatehouse_protocol_types::Action;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// How a handler consumes the target set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// One call with every target; the handler reports the failed subset.
    Batch,
    /// One call per target.
    PerItem,
    /// Exactly one target, addressed with the single-target scheme.
    Single,
}

/// Controller operation, with its polarity where the action has a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SetActive(bool),
    SetSuspended(bool),
    Launch,
}

/// Routing table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub action: Action,
    pub shape: Shape,
    pub operation: Operation,
}

const ROUTES: [Route; 5] = [
    Route {
        action: Action::ActivateTarget,
        shape: Shape::PerItem,
        operation: Operation::SetActive(true),
    },
    Route {
        action: Action::DeactivateTarget,
        shape: Shape::PerItem,
        operation: Operation::SetActive(false),
    },
    Route {
        action: Action::LaunchTarget,
        shape: Shape::Single,
        operation: Operation::Launch,
    },
    Route {
        action: Action::SuspendTargets,
        shape: Shape::Batch,
        operation: Operation::SetSuspended(true),
    },
    Route {
        action: Action::UnsuspendTargets,
        shape: Shape::Batch,
        operation: Operation::SetSuspended(false),
    },
];

impl Route {
    /// Look up the route of an action name.
    pub fn lookup(action: &str) -> Option<Route> {
        ROUTES.iter().copied().find(|route| route.action.name() == action)
    }
}

/// Routes authenticated requests to a [`TargetController`].
pub struct ActionRouter {
    controller: Arc<dyn TargetController>,
}

impl ActionRouter {
    pub fn new(controller: Arc<dyn TargetController>) -> Self {
        Self { controller }
    }

    /// Dispatch an action. Parsing failures are returned before any handler
    /// runs.
    pub fn dispatch(&self, action: &str, payload: Option<&str>) -> DispatchResult<()> {
        let route = Route::lookup(action)
            .ok_or_else(|| DispatchError::UnsupportedAction(action.to_string()))?;
        let targets = TargetSet::parse(payload)?;

        debug!(action = %route.action, targets = targets.len(), "dispatching");

        match (route.shape, route.operation) {
            (Shape::Batch, Operation::SetSuspended(suspended)) => {
                self.dispatch_batch(&targets, suspended)
            }
            (Shape::PerItem, Operation::SetActive(active)) => {
                self.dispatch_per_item(&targets, active)
            }
            (Shape::Single, Operation::Launch) => self.dispatch_launch(&targets, payload),
            (shape, operation) => Err(DispatchError::InternalFault(format!(
                "no handler for {:?} {:?}",
                shape, operation
            ))),
        }
    }

    fn dispatch_batch(&self, targets: &TargetSet, suspended: bool) -> DispatchResult<()> {
        let failed = guarded(|| {
            self.controller
                .set_targets_suspended(targets.targets(), suspended)
        })?;
        if failed.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::PartialBatchFailure(failed))
        }
    }

    fn dispatch_per_item(&self, targets: &TargetSet, active: bool) -> DispatchResult<()> {
        let mut failed = Vec::new();
        for target in targets.targets() {
            if !guarded(|| self.controller.set_target_active(target, active))? {
                failed.push(target.clone());
            }
        }

        if failed.is_empty() {
            return Ok(());
        }
        if targets.is_single() {
            return Err(DispatchError::TargetFailed(failed.remove(0)));
        }
        Err(DispatchError::TargetsFailed(failed))
    }

    fn dispatch_launch(&self, targets: &TargetSet, payload: Option<&str>) -> DispatchResult<()> {
        if !targets.is_single() {
            return Err(DispatchError::MalformedPayload(format!(
                "Unsupported payload scheme: {}",
                payload.unwrap_or_default()
            )));
        }
        let target = &targets.targets()[0];

        if let Some(reason) = guarded(|| self.controller.ensure_free_to_launch(target))? {
            if !reason.is_empty() {
                return Err(DispatchError::LaunchRefused(reason));
            }
        }
        if guarded(|| self.controller.launch(target))? {
            Ok(())
        } else {
            Err(DispatchError::NoLauncher)
        }
    }
}

/// Run a controller call, turning returned faults and panics into
/// [`DispatchError::InternalFault`].
fn guarded<T>(call: impl FnOnce() -> Result<T, HandlerFault>) -> DispatchResult<T> {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result.map_err(|fault| {
            warn!(error = %fault, "controller fault");
            fault.into()
        }),
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "controller panicked".to_string());
            warn!(error = %message, "controller panicked");
            Err(DispatchError::InternalFault(message))
        }
    }
}
