//! npsboard - Net Promoter Score survey dashboard
//!
//! Loads a classified survey results table, segments every response and
//! derives the dashboard views (KPIs, weekly trend, agent by month NPS,
//! category breakdowns, recoverability) as plain values that the report
//! layer turns into Markdown or JSON.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod report;

pub use analysis::{Dashboard, FilterState};
pub use error::{PipelineError, Result};
pub use models::{Segment, SurveyRecord};
