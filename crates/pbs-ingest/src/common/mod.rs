//! Shared building blocks for both import pipelines

pub mod generation;

pub use generation::{latest_generation, DateSuffix, Generation};
