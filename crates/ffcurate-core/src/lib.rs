//! # ffcurate
//!
//! Curation and benchmarking of molecular-mechanics force-field parameters
//! against quantum-chemistry reference data.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless chemistry models (`Molecule`,
//!   `Record`, `Conformer`) and pure algorithms: the pattern labeler, the
//!   coverage aggregator, the parameter selector, and the benchmark scorer.
//!
//! - **[`engine`]: The Execution Layer.** Validated configuration, batch
//!   partitioning and execution, resumable batch output, progress reporting,
//!   and the aggregated error type.
//!
//! - **[`workflows`]: The Public API.** Complete procedures (label a corpus,
//!   select parameters, benchmark a force field, compare one parameter) that
//!   tie the `engine` and `core` together.

pub mod core;
pub mod engine;
pub mod workflows;
