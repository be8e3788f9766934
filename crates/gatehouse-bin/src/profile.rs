//! Ambient context of an execution context: its target table.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Reason returned when a launch names an unknown target.
pub const TARGET_NOT_FOUND: &str = "target_not_found";

/// State of one controlled target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetState {
    pub active: bool,
    pub suspended: bool,
    /// Whether the target has an entry point to launch.
    pub launchable: bool,
    pub launches: u32,
}

impl Default for TargetState {
    fn default() -> Self {
        Self {
            active: true,
            suspended: false,
            launchable: true,
            launches: 0,
        }
    }
}

/// Targets of one execution context.
pub struct ProfileContext {
    name: String,
    targets: Mutex<HashMap<String, TargetState>>,
}

impl ProfileContext {
    /// Create a context whose known targets start active and unsuspended.
    pub fn new(name: &str, known_targets: &[String]) -> Self {
        let targets = known_targets
            .iter()
            .map(|t| (t.clone(), TargetState::default()))
            .collect();
        Self {
            name: name.to_string(),
            targets: Mutex::new(targets),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn insert_target(&self, target: &str, state: TargetState) {
        self.targets.lock().insert(target.to_string(), state);
    }

    pub fn state(&self, target: &str) -> Option<TargetState> {
        self.targets.lock().get(target).copied()
    }

    /// Returns false for unknown targets.
    pub fn set_active(&self, target: &str, active: bool) -> bool {
        match self.targets.lock().get_mut(target) {
            Some(state) => {
                state.active = active;
                true
            }
            None => false,
        }
    }

    /// Returns the targets that are unknown.
    pub fn set_suspended(&self, targets: &[String], suspended: bool) -> Vec<String> {
        let mut table = self.targets.lock();
        targets
            .iter()
            .filter(|target| match table.get_mut(target.as_str()) {
                Some(state) => {
                    state.suspended = suspended;
                    false
                }
                None => true,
            })
            .cloned()
            .collect()
    }

    /// Make a target active and unsuspended. `Some(reason)` if it cannot be.
    pub fn ensure_free_to_launch(&self, target: &str) -> Option<String> {
        match self.targets.lock().get_mut(target) {
            Some(state) => {
                state.active = true;
                state.suspended = false;
                None
            }
            None => Some(TARGET_NOT_FOUND.to_string()),
        }
    }

    /// Returns false when the target is unknown or has nothing to launch.
    pub fn launch(&self, target: &str) -> bool {
        match self.targets.lock().get_mut(target) {
            Some(state) if state.launchable => {
                state.launches += 1;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ProfileContext {
        ProfileContext::new("work", &["a".to_string(), "b".to_string()])
    }

    #[test]
    fn known_targets_start_active() {
        let ctx = context();
        assert_eq!(ctx.name(), "work");
        assert_eq!(ctx.state("a"), Some(TargetState::default()));
        assert_eq!(ctx.state("z"), None);
    }

    #[test]
    fn set_active_reports_unknown_targets() {
        let ctx = context();
        assert!(ctx.set_active("a", false));
        assert!(!ctx.state("a").unwrap().active);
        assert!(!ctx.set_active("z", false));
    }

    #[test]
    fn set_suspended_returns_failed_subset() {
        let ctx = context();
        let failed = ctx.set_suspended(&["a".into(), "z".into(), "b".into()], true);
        assert_eq!(failed, vec!["z"]);
        assert!(ctx.state("a").unwrap().suspended);
        assert!(ctx.state("b").unwrap().suspended);
    }

    #[test]
    fn free_to_launch_revives_target() {
        let ctx = context();
        ctx.set_active("a", false);
        ctx.set_suspended(&["a".into()], true);

        assert_eq!(ctx.ensure_free_to_launch("a"), None);
        let state = ctx.state("a").unwrap();
        assert!(state.active && !state.suspended);
        assert_eq!(
            ctx.ensure_free_to_launch("z").as_deref(),
            Some(TARGET_NOT_FOUND)
        );
    }

    #[test]
    fn launch_needs_an_entry_point() {
        let ctx = context();
        ctx.insert_target(
            "headless",
            TargetState {
                launchable: false,
                ..Default::default()
            },
        );
        assert!(ctx.launch("a"));
        assert_eq!(ctx.state("a").unwrap().launches, 1);
        assert!(!ctx.launch("headless"));
        assert!(!ctx.launch("z"));
    }
}
