//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! loader, routing, http:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape, opt-in)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every request span
//! - Metric calls are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
