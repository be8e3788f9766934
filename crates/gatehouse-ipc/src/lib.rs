//! IPC layer between API callers and the controller.
//!
//! This crate provides:
//! - Unix domain socket server reporting each peer's uid
//! - NDJSON request/response framing of `ApiRequest` / `ApiResponse`
//! - A client for one-shot calls

mod error;
mod server;

pub use error::{IpcError, IpcResult};
pub use gatehouse_protocol_types::{ApiRequest, ApiResponse};
pub use server::{ApiClient, ApiServer, HandlerFn};
