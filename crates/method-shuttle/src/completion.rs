//! Origin-side completion handles.
//!
//! A handle is resolved exactly once, by the transport's completion task.
//! Continuations registered before resolution run on that task's thread in
//! registration order; a continuation registered after resolution runs at
//! once on the registering thread.

use crate::{ShuttleError, ShuttleResult};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use tokio::sync::oneshot;

type Continuation<T> = Box<dyn FnOnce(&ShuttleResult<T>) + Send>;

struct State<T> {
    outcome: Option<ShuttleResult<T>>,
    continuations: Vec<Continuation<T>>,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    resolved: Condvar,
}

/// Result of a submitted work unit, available once the channel returns.
///
/// Clones observe the same outcome.
pub struct CompletionHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for CompletionHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> std::fmt::Debug for CompletionHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionHandle").finish_non_exhaustive()
    }
}

impl<T: Clone + Send + 'static> CompletionHandle<T> {
    pub(crate) fn pending() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    outcome: None,
                    continuations: Vec::new(),
                }),
                resolved: Condvar::new(),
            }),
        }
    }

    /// A handle that is already resolved.
    pub fn resolved(result: ShuttleResult<T>) -> Self {
        let handle = Self::pending();
        handle.resolve(result);
        handle
    }

    /// Store the outcome and run pending continuations. Only the first call
    /// has an effect; returns whether this call resolved the handle.
    pub(crate) fn resolve(&self, result: ShuttleResult<T>) -> bool {
        let continuations = {
            let mut state = self.shared.state.lock();
            if state.outcome.is_some() {
                return false;
            }
            state.outcome = Some(result.clone());
            std::mem::take(&mut state.continuations)
        };
        self.shared.resolved.notify_all();

        for continuation in continuations {
            continuation(&result);
        }
        true
    }

    pub fn is_resolved(&self) -> bool {
        self.shared.state.lock().outcome.is_some()
    }

    /// The outcome, if already resolved.
    pub fn try_result(&self) -> Option<ShuttleResult<T>> {
        self.shared.state.lock().outcome.clone()
    }

    /// Block the current thread until resolved.
    ///
    /// Blocks forever if the remote side never answers. Async callers use
    /// [`CompletionHandle::outcome`] instead.
    pub fn wait(&self) -> ShuttleResult<T> {
        let mut state = self.shared.state.lock();
        loop {
            if let Some(outcome) = &state.outcome {
                return outcome.clone();
            }
            self.shared.resolved.wait(&mut state);
        }
    }

    /// Run `continuation` once resolved.
    pub fn on_complete<F>(&self, continuation: F)
    where
        F: FnOnce(&ShuttleResult<T>) + Send + 'static,
    {
        let mut state = self.shared.state.lock();
        match &state.outcome {
            Some(outcome) => {
                let outcome = outcome.clone();
                drop(state);
                continuation(&outcome);
            }
            None => state.continuations.push(Box::new(continuation)),
        }
    }

    /// Await the outcome.
    pub async fn outcome(&self) -> ShuttleResult<T> {
        let (tx, rx) = oneshot::channel();
        self.on_complete(move |outcome| {
            let _ = tx.send(outcome.clone());
        });
        rx.await
            .map_err(|_| ShuttleError::Transport("completion handle dropped".to_string()))?
    }
}
