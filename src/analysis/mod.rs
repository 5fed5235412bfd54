//! Analysis modules.
//!
//! `aggregator` holds the individual pipeline steps; `dashboard` bundles
//! them into one recomputation per filter state.

pub mod aggregator;
pub mod dashboard;

pub use aggregator::*;
pub use dashboard::{segment_focus, Dashboard, FilterState, SegmentFocus};
