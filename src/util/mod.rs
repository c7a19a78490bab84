//! Utility functions module
//!
//! Contains helper functions for units and duration formatting used by
//! download progress and run summaries.

pub mod units;

// Re-export commonly used functions
pub use units::{calculate_throughput_mbps, format_bytes, format_duration, parse_bytes};
