//! Chart analysis helpers

pub mod charts;
pub mod trend;

pub use charts::{correlation_from_description, split_by_outcome, CountTotals};
pub use trend::TrendLine;
