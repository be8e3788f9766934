//! Shuttle channels.

use crate::{InvocationOutcome, RemoteExecutor, ShuttleError, ShuttleResult, WorkUnitEnvelope};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Boxed future returned by channel operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Request/response conduit into an execution context.
///
/// One delivery carries one envelope and yields one outcome. A channel
/// that cannot reach the executor returns [`ShuttleError::Transport`].
/// Channels never retry.
pub trait ShuttleChannel: Send + Sync {
    fn deliver(&self, envelope: WorkUnitEnvelope) -> BoxFuture<'_, ShuttleResult<InvocationOutcome>>;
}

/// Channel to an executor living in this process.
///
/// The envelope still goes through its wire form, so the executing side
/// sees exactly what a socket peer would. Units run one at a time on a
/// dedicated executor thread, never on the runtime's blocking pool.
pub struct InProcessChannel {
    jobs: mpsc::UnboundedSender<Job>,
}

type Job = (String, oneshot::Sender<ShuttleResult<InvocationOutcome>>);

impl InProcessChannel {
    /// Start the executor thread. It exits once the channel is dropped.
    pub fn new<C: Send + Sync + 'static>(executor: Arc<RemoteExecutor<C>>) -> ShuttleResult<Self> {
        let (jobs, mut queue) = mpsc::unbounded_channel::<Job>();
        std::thread::Builder::new()
            .name("shuttle-executor".to_string())
            .spawn(move || {
                while let Some((line, reply)) = queue.blocking_recv() {
                    let outcome = WorkUnitEnvelope::from_json(&line)
                        .map(|envelope| executor.execute(&envelope))
                        .map_err(|e| ShuttleError::Transport(format!("Malformed envelope: {}", e)));
                    let _ = reply.send(outcome);
                }
                debug!("in-process executor stopped");
            })
            .map_err(|e| ShuttleError::Transport(format!("Failed to start executor thread: {}", e)))?;
        Ok(Self { jobs })
    }
}

impl ShuttleChannel for InProcessChannel {
    fn deliver(&self, envelope: WorkUnitEnvelope) -> BoxFuture<'_, ShuttleResult<InvocationOutcome>> {
        Box::pin(async move {
            let line = envelope
                .to_json()
                .map_err(|e| ShuttleError::Capture(e.to_string()))?;
            let (reply, outcome) = oneshot::channel();
            self.jobs
                .send((line, reply))
                .map_err(|_| ShuttleError::Transport("Executor thread is gone".to_string()))?;
            outcome
                .await
                .map_err(|_| ShuttleError::Transport("Executor dropped the invocation".to_string()))?
        })
    }
}
