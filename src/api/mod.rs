//! Operational API endpoints
//!
//! - Metrics (Prometheus)

pub mod metrics;

pub use metrics::metrics_router;
