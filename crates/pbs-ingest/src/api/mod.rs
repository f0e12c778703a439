//! PBS data API import
//!
//! Downloads every table of the current schedule from the PBS REST API and
//! loads it into SQLite, parents before children.
//!
//! # Architecture
//!
//! - [`client`]: paced HTTP client behind the [`TableSource`] trait
//! - [`models`]: response envelope and [`Schedule`]
//! - [`tables`]: static table declarations
//! - [`version_discovery`]: current schedule selection
//! - [`pipeline`]: dependency-ordered [`Loader`] and [`run_api_import`]

pub mod client;
pub mod models;
pub mod pipeline;
pub mod tables;
pub mod version_discovery;

pub use client::{FetchOutcome, PbsApiClient, RequestPacer, TableSource};
pub use models::{ApiEnvelope, Schedule};
pub use pipeline::{load_table, run_api_import, ApiImportResult, LoadSummary, Loader};
pub use tables::{API_TABLES, SCHEDULES};
pub use version_discovery::{resolve_latest_schedule, ScheduleList};
