//! Repository scanning: cloning, flattening to a document, and analysis.

pub mod cloner;
pub mod converter;
pub mod scan;

pub use scan::{scan_repository, ScanSettings};
