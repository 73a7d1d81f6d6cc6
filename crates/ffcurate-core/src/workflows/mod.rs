//! # Workflows Module
//!
//! Top-level entry points that tie the core algorithms to the engine's
//! batching, progress reporting, and resumable output.
//!
//! ## Architecture
//!
//! - **Curation** ([`curate`]) - Labeling, coverage aggregation, and parameter selection
//! - **Benchmarking** ([`benchmark`]) - Per-group relative-energy and geometry scoring
//! - **Parameter Comparison** ([`compare`]) - Per-parameter geometry differences
//!
//! Every workflow reports per-item failures alongside its results and only
//! returns an error when the run as a whole cannot continue.

pub mod benchmark;
pub mod compare;
pub mod curate;
mod runner;
