//! # genbridge telemetry
//!
//! Structured logging for genbridge adapters, built on `tracing`.
//!
//! ## Usage
//!
//! ```rust
//! use genbridge_telemetry::{init_telemetry, info, model_call_span};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_telemetry("my-host")?;
//!
//!     let span = model_call_span("gpt-4o", "prompt-1", false);
//!     let _enter = span.enter();
//!     info!("calling provider");
//!     Ok(())
//! }
//! ```

pub mod init;
pub mod spans;

// Re-export tracing macros for convenience
pub use tracing::{Instrument, Span, debug, error, info, instrument, trace, warn};

pub use init::{init_json_telemetry, init_telemetry};
pub use spans::*;
