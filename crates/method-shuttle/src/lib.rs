//! Cross-context method shuttle.
//!
//! A work unit is a named value object whose fields are captured into a
//! [`WorkUnitEnvelope`]. The envelope crosses a [`ShuttleChannel`] into
//! another execution context, where a [`RemoteExecutor`] rebuilds the unit
//! with the live ambient context in place of the [`Ambient`] placeholder,
//! runs it, and sends back an [`InvocationOutcome`]. The origin observes the
//! outcome through a [`CompletionHandle`].
//!
//! ```text
//! origin                                   execution context
//! MethodShuttle::run(unit)
//!   -> WorkUnitEnvelope::capture     ---->  RemoteExecutor::execute
//!   <- CompletionHandle              <----  InvocationOutcome
//! ```

mod completion;
mod envelope;
mod error;
mod executor;
mod outcome;
mod registry;
mod shuttle;
mod socket;
mod transport;
mod unit;

pub use completion::CompletionHandle;
pub use envelope::{ArgKind, CapturedArg, WorkUnitEnvelope};
pub use error::{ShuttleError, ShuttleResult};
pub use executor::RemoteExecutor;
pub use outcome::{FailureKind, InvocationOutcome, RemoteFailure};
pub use registry::UnitRegistry;
pub use shuttle::MethodShuttle;
pub use socket::{ShuttleService, UnixSocketChannel};
pub use transport::{BoxFuture, InProcessChannel, ShuttleChannel};
pub use unit::{Ambient, ArgReader, ValueUnit, VoidUnit, WorkUnit};
