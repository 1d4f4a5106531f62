//! # Utility Modules
//!
//! Supporting utilities for logging, diagnostics, and observability.
//!
//! ## Components
//! - **Logging**: Structured logging configuration
//! - **Hexdump**: Bounded hex rendering of frame bytes for error logs
//! - **Metrics**: Thread-safe observability counters

pub mod hexdump;
pub mod logging;
pub mod metrics;

pub use metrics::{Metrics, MetricsSnapshot};
