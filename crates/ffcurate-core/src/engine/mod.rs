//! # Engine Module
//!
//! Execution machinery shared by every workflow: validated run configuration,
//! progress reporting, deterministic batching, and resumable batch output.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Builders that validate thresholds and batch sizes
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Batching** ([`batch`]) - Partitioning and the [`batch::BatchExecutor`] seam
//! - **Batch Output** ([`store`]) - Numbered CSV batches keyed for resumption
//! - **Error Handling** ([`error`]) - Errors that abort a whole run
//!
//! Per-item failures never surface as [`error::EngineError`]; they are
//! collected as strings next to the successful results.

pub mod batch;
pub mod config;
pub mod error;
pub mod progress;
pub mod store;
