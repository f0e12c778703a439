//! PBS Common Library
//!
//! Shared utilities for the PBS import workspace.
//!
//! - **Error Handling**: [`PbsError`] and the [`Result`] alias
//! - **Logging**: `tracing` subscriber configuration shared by every binary
//! - **Decompression**: gzip and charset decoding of downloaded payloads
//!
//! # Example
//!
//! ```no_run
//! use pbs_common::decompression::decode_payload;
//!
//! fn read_body(body: &[u8]) -> pbs_common::Result<String> {
//!     decode_payload(body, Some("gzip"), Some("application/json; charset=utf-8"))
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod decompression;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{PbsError, Result};
