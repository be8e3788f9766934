//! Action routing for the Gatehouse API.
//!
//! This crate provides:
//! - Payload parsing into target sets (`single-target:` / `multi-target:`)
//! - The static action table (operation, polarity, handler shape)
//! - Dispatch with batch and per-item failure aggregation
//! - The gateway that authenticates a request before dispatching it

mod controller;
mod error;
mod gateway;
mod router;
mod target_set;

pub use controller::TargetController;
pub use error::{DispatchError, DispatchResult, HandlerFault};
pub use gateway::ApiGateway;
pub use router::{ActionRouter, Operation, Route, Shape};
pub use target_set::TargetSet;
