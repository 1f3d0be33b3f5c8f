//! Analysis modules.
//!
//! Trial aggregation for the bar charts and profile reduction for the
//! stacked CPU-cycle charts.

pub mod aggregator;
pub mod profile;

pub use aggregator::*;
pub use profile::*;
