//! Target controller that runs every operation inside the execution context.

use crate::units::{EnsureFreeToLaunch, LaunchTarget, SetTargetActive, SetTargetsSuspended};
use action_router::{HandlerFault, TargetController};
use method_shuttle::{MethodShuttle, ValueUnit};

/// Shuttles each controller call as a work unit and blocks for its outcome.
///
/// Must be called from a blocking thread, never from an async task.
pub struct ShuttledController {
    shuttle: MethodShuttle,
}

impl ShuttledController {
    pub fn new(shuttle: MethodShuttle) -> Self {
        Self { shuttle }
    }

    fn call<U: ValueUnit>(&self, unit: U) -> Result<U::Output, HandlerFault> {
        self.shuttle
            .run(&unit)
            .and_then(|handle| handle.wait())
            .map_err(|e| HandlerFault::new(e.to_string()))
    }
}

impl TargetController for ShuttledController {
    fn set_target_active(&self, target: &str, active: bool) -> Result<bool, HandlerFault> {
        self.call(SetTargetActive::new(target, active))
    }

    fn set_targets_suspended(
        &self,
        targets: &[String],
        suspended: bool,
    ) -> Result<Vec<String>, HandlerFault> {
        self.call(SetTargetsSuspended::new(targets, suspended))
    }

    fn ensure_free_to_launch(&self, target: &str) -> Result<Option<String>, HandlerFault> {
        self.call(EnsureFreeToLaunch::new(target))
    }

    fn launch(&self, target: &str) -> Result<bool, HandlerFault> {
        self.call(LaunchTarget::new(target))
    }
}
