//! # aiyview Diagnostics
//!
//! Logging setup and session diagnostics for aiyview.
//! Provides subscriber initialisation and the counters and connection
//! snapshot used for status reporting.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod connection_analyzer;
pub mod debug_logger;

// Re-export main types
pub use connection_analyzer::{ConnectionInfo, SessionStats};
pub use debug_logger::{init_logging, DEFAULT_DIRECTIVE};
