//! Output: SVG charts and the run summary.

pub mod generator;
pub mod plots;

pub use generator::write_report;
