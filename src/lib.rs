//! # signature-insights
//!
//! Reporting for centrally managed email signatures: adoption by department
//! and team, deployment outcomes, template performance and campaign click
//! attribution.
//!
//! Records are fetched per organization from Postgres ([`db`]) and folded into
//! an [`AnalyticsData`] snapshot by pure functions ([`snapshot::build_snapshot`]).
//! The snapshot is rebuilt in full on every load.

pub use config::Config;
pub use coverage::{TeamCategory, TeamMapping};
pub use error::{Error, Result};
pub use models::*;

pub mod campaigns;
pub mod config;
pub mod coverage;
pub mod db;
pub mod error;
pub mod grouping;
pub mod health;
pub mod logging;
pub mod models;
pub mod refresh;
pub mod report;
pub mod snapshot;
pub mod templates;
pub mod timeseries;
