//! CREBAS Telemetry - logging and operation context for the capability authority.
//!
//! This crate provides:
//! - Configurable logging setup with multiple formats and targets
//! - Per-operation context spans for correlating concurrent operations
//!
//! # Example
//!
//! ```rust,no_run
//! use crebas_telemetry::{LogConfig, LogFormat, RequestContext, RequestGuard, setup_logging};
//!
//! # fn main() -> Result<(), crebas_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("crebas_capabilities=debug");
//! setup_logging(&config)?;
//!
//! let _guard = RequestGuard::new(
//!     RequestContext::new("dispatch").with_operation("submit-capabilities"),
//! );
//! tracing::info!("offers accepted");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::{RequestContext, RequestGuard};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
