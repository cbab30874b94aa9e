//! Report generation and the cumulative run log.

pub mod generator;
pub mod log;

pub use generator::*;
pub use log::RunLog;
