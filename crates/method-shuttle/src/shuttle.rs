//! Origin-side entry point.

use crate::{
    CompletionHandle, InvocationOutcome, ShuttleChannel, ShuttleError, ShuttleResult, ValueUnit,
    VoidUnit, WorkUnit, WorkUnitEnvelope,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// Submits work units to an execution context.
///
/// `submit` and the `run*` methods return at once. Delivery, remote
/// execution and resolution of the handle happen on a task of the given
/// runtime, never on the submitting thread.
#[derive(Clone)]
pub struct MethodShuttle {
    channel: Arc<dyn ShuttleChannel>,
    runtime: Handle,
}

impl MethodShuttle {
    pub fn new(channel: Arc<dyn ShuttleChannel>, runtime: Handle) -> Self {
        Self { channel, runtime }
    }

    /// Submit a captured envelope. The handle carries the raw result value.
    pub fn submit(&self, envelope: WorkUnitEnvelope) -> CompletionHandle<Option<serde_json::Value>> {
        self.dispatch(envelope, Ok)
    }

    /// Capture and submit a unit without a return value.
    pub fn run_void<U: VoidUnit>(&self, unit: &U) -> ShuttleResult<CompletionHandle<()>> {
        let envelope = WorkUnitEnvelope::capture(unit)?;
        Ok(self.dispatch(envelope, |_| Ok(())))
    }

    /// Capture and submit a unit, decoding its result.
    pub fn run<U: ValueUnit>(&self, unit: &U) -> ShuttleResult<CompletionHandle<U::Output>> {
        let envelope = WorkUnitEnvelope::capture(unit)?;
        Ok(self.dispatch(envelope, decode::<U::Output>))
    }

    /// Capture and submit a unit; `consumer` receives the result if the unit
    /// succeeds. Failures are logged and dropped.
    pub fn run_with_consumer<U, F>(&self, unit: &U, consumer: F) -> ShuttleResult<()>
    where
        U: ValueUnit,
        F: FnOnce(U::Output) + Send + 'static,
    {
        let handle = self.run(unit)?;
        handle.on_complete(move |outcome| match outcome {
            Ok(value) => consumer(value.clone()),
            Err(e) => warn!(unit_type = U::UNIT_TYPE, error = %e, "error executing work unit"),
        });
        Ok(())
    }

    fn dispatch<T, F>(&self, envelope: WorkUnitEnvelope, decode: F) -> CompletionHandle<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce(Option<serde_json::Value>) -> ShuttleResult<T> + Send + 'static,
    {
        let handle = CompletionHandle::pending();
        let completer = Completer(handle.clone());
        let channel = self.channel.clone();
        let unit_type = envelope.unit_type.clone();

        debug!(unit_type = %unit_type, "submitting work unit");
        self.runtime.spawn(async move {
            let result = channel
                .deliver(envelope)
                .await
                .and_then(InvocationOutcome::into_result)
                .and_then(decode);
            if let Err(e) = &result {
                debug!(unit_type = %unit_type, error = %e, "work unit did not complete");
            }
            completer.0.resolve(result);
        });
        handle
    }
}

/// Resolves its handle with a transport error if the delivery task is lost
/// (runtime shut down, or a panic) before producing an outcome.
struct Completer<T: Clone + Send + 'static>(CompletionHandle<T>);

impl<T: Clone + Send + 'static> Drop for Completer<T> {
    fn drop(&mut self) {
        if self.0.resolve(Err(ShuttleError::Transport(
            "Delivery task ended without an outcome".to_string(),
        ))) {
            warn!("work unit delivery was abandoned");
        }
    }
}

fn decode<T: DeserializeOwned>(value: Option<serde_json::Value>) -> ShuttleResult<T> {
    serde_json::from_value(value.unwrap_or(serde_json::Value::Null))
        .map_err(|e| ShuttleError::ResultDecode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Ambient, ArgKind, ArgReader, BoxFuture, CapturedArg, InProcessChannel, RemoteExecutor,
        UnitRegistry,
    };
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    struct Counter {
        hits: AtomicUsize,
        log: Mutex<Vec<String>>,
    }

    struct Bump {
        ctx: Ambient<Counter>,
        by: i64,
    }

    impl WorkUnit for Bump {
        type Context = Counter;
        const UNIT_TYPE: &'static str = "test.bump";
        const PARAMS: &'static [ArgKind] = &[ArgKind::Ambient, ArgKind::Int];

        fn capture(&self) -> Vec<CapturedArg> {
            vec![CapturedArg::Ambient, self.by.into()]
        }

        fn reconstruct(args: &mut ArgReader<Counter>) -> ShuttleResult<Self> {
            Ok(Self {
                ctx: args.ambient()?,
                by: args.int()?,
            })
        }
    }

    impl ValueUnit for Bump {
        type Output = usize;

        fn invoke(self) -> anyhow::Result<usize> {
            if self.by < 0 {
                anyhow::bail!("negative bump");
            }
            let ctx = self.ctx.get()?;
            Ok(ctx.hits.fetch_add(self.by as usize, Ordering::SeqCst) + self.by as usize)
        }
    }

    struct Note {
        ctx: Ambient<Counter>,
        text: String,
    }

    impl WorkUnit for Note {
        type Context = Counter;
        const UNIT_TYPE: &'static str = "test.note";
        const PARAMS: &'static [ArgKind] = &[ArgKind::Ambient, ArgKind::Text];

        fn capture(&self) -> Vec<CapturedArg> {
            vec![CapturedArg::Ambient, self.text.as_str().into()]
        }

        fn reconstruct(args: &mut ArgReader<Counter>) -> ShuttleResult<Self> {
            Ok(Self {
                ctx: args.ambient()?,
                text: args.text()?,
            })
        }
    }

    impl VoidUnit for Note {
        fn invoke(self) -> anyhow::Result<()> {
            self.ctx.get()?.log.lock().push(self.text);
            Ok(())
        }
    }

    /// Captures one field fewer than it declares.
    struct Broken;

    impl WorkUnit for Broken {
        type Context = Counter;
        const UNIT_TYPE: &'static str = "test.broken";
        const PARAMS: &'static [ArgKind] = &[ArgKind::Ambient, ArgKind::Int];

        fn capture(&self) -> Vec<CapturedArg> {
            vec![CapturedArg::Ambient]
        }

        fn reconstruct(_args: &mut ArgReader<Counter>) -> ShuttleResult<Self> {
            Ok(Self)
        }
    }

    impl VoidUnit for Broken {
        fn invoke(self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct Unreachable;

    impl ShuttleChannel for Unreachable {
        fn deliver(
            &self,
            _envelope: WorkUnitEnvelope,
        ) -> BoxFuture<'_, ShuttleResult<InvocationOutcome>> {
            Box::pin(async { Err(ShuttleError::Transport("endpoint unreachable".to_string())) })
        }
    }

    /// Panics mid-delivery.
    struct Exploding {
        explode: bool,
    }

    impl ShuttleChannel for Exploding {
        fn deliver(
            &self,
            _envelope: WorkUnitEnvelope,
        ) -> BoxFuture<'_, ShuttleResult<InvocationOutcome>> {
            let explode = self.explode;
            Box::pin(async move {
                assert!(!explode, "channel exploded");
                Err(ShuttleError::Transport("not reached".to_string()))
            })
        }
    }

    fn in_process() -> (MethodShuttle, Arc<RemoteExecutor<Counter>>) {
        let mut registry = UnitRegistry::new();
        registry.register_value::<Bump>().register_void::<Note>();
        let executor = Arc::new(RemoteExecutor::new(
            registry,
            Arc::new(Counter {
                hits: AtomicUsize::new(0),
                log: Mutex::new(Vec::new()),
            }),
        ));
        let channel = Arc::new(InProcessChannel::new(executor.clone()).unwrap());
        (MethodShuttle::new(channel, Handle::current()), executor)
    }

    #[tokio::test]
    async fn run_resolves_with_the_remote_value() {
        let (shuttle, executor) = in_process();
        let handle = shuttle
            .run(&Bump {
                ctx: Ambient::placeholder(),
                by: 3,
            })
            .unwrap();
        assert_eq!(handle.outcome().await, Ok(3));
        assert_eq!(executor.context().hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn run_void_executes_remotely() {
        let (shuttle, executor) = in_process();
        let handle = shuttle
            .run_void(&Note {
                ctx: Ambient::placeholder(),
                text: "hello".into(),
            })
            .unwrap();
        assert_eq!(handle.outcome().await, Ok(()));
        assert_eq!(*executor.context().log.lock(), vec!["hello"]);
    }

    #[tokio::test]
    async fn capture_errors_are_synchronous() {
        let (shuttle, _) = in_process();
        let err = shuttle.run_void(&Broken).unwrap_err();
        assert!(matches!(err, ShuttleError::Capture(_)));
    }

    #[tokio::test]
    async fn unregistered_unit_fails_reconstruction() {
        let mut registry = UnitRegistry::<Counter>::new();
        registry.register_void::<Note>();
        let executor = Arc::new(RemoteExecutor::new(
            registry,
            Arc::new(Counter {
                hits: AtomicUsize::new(0),
                log: Mutex::new(Vec::new()),
            }),
        ));
        let shuttle = MethodShuttle::new(
            Arc::new(InProcessChannel::new(executor).unwrap()),
            Handle::current(),
        );

        let handle = shuttle
            .run(&Bump {
                ctx: Ambient::placeholder(),
                by: 1,
            })
            .unwrap();
        assert!(matches!(
            handle.outcome().await,
            Err(ShuttleError::Reconstruction(_))
        ));
    }

    #[tokio::test]
    async fn remote_failure_resolves_the_handle() {
        let (shuttle, _) = in_process();
        let handle = shuttle
            .run(&Bump {
                ctx: Ambient::placeholder(),
                by: -1,
            })
            .unwrap();
        match handle.outcome().await {
            Err(ShuttleError::RemoteExecution(failure)) => {
                assert_eq!(failure.message, "negative bump")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let shuttle = MethodShuttle::new(Arc::new(Unreachable), Handle::current());
        let handle = shuttle
            .run(&Bump {
                ctx: Ambient::placeholder(),
                by: 1,
            })
            .unwrap();
        assert_eq!(
            handle.outcome().await,
            Err(ShuttleError::Transport("endpoint unreachable".to_string()))
        );
    }

    #[tokio::test]
    async fn raw_submit_returns_the_value() {
        let (shuttle, _) = in_process();
        let envelope = WorkUnitEnvelope {
            unit_type: "test.bump".to_string(),
            args: vec![CapturedArg::Ambient, CapturedArg::Int(5)],
        };
        let value = shuttle.submit(envelope).outcome().await.unwrap();
        assert_eq!(value, Some(serde_json::json!(5)));
    }

    #[tokio::test]
    async fn consumer_receives_successful_results_only() {
        let (shuttle, _) = in_process();

        let (tx, rx) = oneshot::channel();
        shuttle
            .run_with_consumer(
                &Bump {
                    ctx: Ambient::placeholder(),
                    by: 2,
                },
                move |value| {
                    let _ = tx.send(value);
                },
            )
            .unwrap();
        assert_eq!(rx.await.unwrap(), 2);

        let (tx, rx) = oneshot::channel::<usize>();
        shuttle
            .run_with_consumer(
                &Bump {
                    ctx: Ambient::placeholder(),
                    by: -5,
                },
                move |value| {
                    let _ = tx.send(value);
                },
            )
            .unwrap();
        // The consumer is dropped unused, closing the channel.
        assert!(rx.await.is_err());
    }

    #[test]
    fn wait_from_a_plain_thread() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut registry = UnitRegistry::new();
        registry.register_value::<Bump>();
        let executor = Arc::new(RemoteExecutor::new(
            registry,
            Arc::new(Counter {
                hits: AtomicUsize::new(10),
                log: Mutex::new(Vec::new()),
            }),
        ));
        let shuttle = MethodShuttle::new(
            Arc::new(InProcessChannel::new(executor).unwrap()),
            runtime.handle().clone(),
        );

        let handle = shuttle
            .run(&Bump {
                ctx: Ambient::placeholder(),
                by: 1,
            })
            .unwrap();
        assert_eq!(handle.wait(), Ok(11));
    }

    #[tokio::test]
    async fn panicking_delivery_resolves_the_handle() {
        let shuttle = MethodShuttle::new(Arc::new(Exploding { explode: true }), Handle::current());
        let handle = shuttle
            .run(&Bump {
                ctx: Ambient::placeholder(),
                by: 1,
            })
            .unwrap();
        assert!(matches!(handle.outcome().await, Err(ShuttleError::Transport(_))));
    }

    #[test]
    fn submit_after_runtime_shutdown_resolves_the_handle() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let shuttle = MethodShuttle::new(Arc::new(Unreachable), runtime.handle().clone());
        drop(runtime);

        let handle = shuttle
            .run_void(&Note {
                ctx: Ambient::placeholder(),
                text: "late".into(),
            })
            .unwrap();
        assert_eq!(
            handle.wait(),
            Err(ShuttleError::Transport(
                "Delivery task ended without an outcome".to_string()
            ))
        );
    }
}
