//! Structured logging and request correlation for the conductor agent runtime.
//!
//! This crate provides:
//! - Configurable `tracing-subscriber` setup with multiple output formats
//! - A `RequestContext` for correlating logs/spans across a turn
//! - Integration with the tracing ecosystem
//!
//! # Example
//!
//! ```rust,no_run
//! use conductor_telemetry::{LogConfig, LogFormat, setup_logging, RequestContext};
//!
//! # fn main() -> Result<(), conductor_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Pretty)
//!     .with_directive("conductor_tools=trace");
//!
//! setup_logging(&config)?;
//!
//! let ctx = RequestContext::new("kernel").with_operation("sendMessage");
//! let span = ctx.span();
//! let _guard = span.enter();
//! tracing::info!("processing turn");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::{RequestContext, RequestGuard};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
