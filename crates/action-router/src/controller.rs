//! The target controller seam.
//!
//! The router only knows how to address targets; what activating, suspending
//! or launching means is up to the controller.

use crate::HandlerFault;

/// Operations the router dispatches to.
///
/// Calls are synchronous and run on the dispatching thread. A returned
/// [`HandlerFault`] or a panic aborts the request with an internal fault.
pub trait TargetController: Send + Sync {
    /// Make a target active or inactive. Returns whether the target ended up
    /// in the requested state.
    fn set_target_active(&self, target: &str, active: bool) -> Result<bool, HandlerFault>;

    /// Suspend or unsuspend targets in one batch. Returns the targets that
    /// could not be processed.
    fn set_targets_suspended(
        &self,
        targets: &[String],
        suspended: bool,
    ) -> Result<Vec<String>, HandlerFault>;

    /// Prepare a target for launch. `Some(reason)` refuses the launch.
    fn ensure_free_to_launch(&self, target: &str) -> Result<Option<String>, HandlerFault>;

    /// Launch a target. Returns `false` when it has nothing to launch.
    fn launch(&self, target: &str) -> Result<bool, HandlerFault>;
}
