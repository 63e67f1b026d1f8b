//! Attendance analytics: per-subject status and class projections, shortfall
//! fines, and the aggregate fine state that sits between a subject roster and
//! whatever displays it.

pub mod aggregator;
pub mod config;
pub mod fine;
pub mod logging;
pub mod models;
pub mod report;
pub mod stats;
pub mod store;

pub use aggregator::{FineAggregator, FineConfig, FineConfigError};
pub use fine::{calculate_fine, DEFAULT_FINE_RATE};
pub use models::{AttendanceStats, AttendanceStatus, Fine, Subject};
pub use stats::{compute_stats, summarize};
