//! Core configuration and utilities shared by the Gatehouse processes.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, PackageRecord, TrustedPartner, DEFAULT_EXECUTION_CONTEXT, DEFAULT_LOG_LEVEL,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, init_logging_for_service, parse_level};
pub use paths::Paths;
