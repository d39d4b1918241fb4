//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID and session ID are attached as structured fields
//! - Metrics are recorded through the `metrics` facade; without an installed
//!   exporter they are no-ops

pub mod logging;
pub mod metrics;
