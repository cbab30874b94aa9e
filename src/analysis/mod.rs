//! Analysis modules.
//!
//! Aggregation of judge scores into run statistics.

pub mod aggregator;

pub use aggregator::*;
