//! The security-review agent under evaluation.
//!
//! This module sends code samples to the reasoning backend and fans
//! the requests out with a bounded concurrency limit.

pub mod fanout;
pub mod invoker;

pub use fanout::ItemError;
pub use invoker::{AnalysisInvoker, InvokerConfig};
