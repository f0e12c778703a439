//! PBS Ingest Library
//!
//! Imports Pharmaceutical Benefits Scheme schedule data into a single SQLite
//! database file, from either of two sources.
//!
//! # Supported Data Sources
//!
//! - **API**: the PBS data REST API, one endpoint per table, loaded in
//!   foreign-key dependency order for the most recent schedule
//! - **Text**: the monthly zip of delimited text extracts
//!
//! # Example
//!
//! ```no_run
//! use pbs_ingest::{api, config::ApiConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let result = api::run_api_import(ApiConfig::from_env()).await?;
//!     println!("{}", result.database.display());
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod api;
pub mod common;
pub mod config;
pub mod error;
pub mod schema;
pub mod storage;
pub mod text;

pub use config::{ApiConfig, TextConfig};
pub use error::{IngestError, Result};
