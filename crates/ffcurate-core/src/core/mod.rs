//! # Core Module
//!
//! Stateless data models and algorithms for force-field parameter curation
//! and benchmarking.
//!
//! ## Architecture
//!
//! - **Chemistry Models** ([`models`]) - Elements, molecular graphs, QM records, and conformers
//! - **Input Parsing** ([`io`]) - Mapped SMILES and JSON/TOML record loaders
//! - **Parameter Curation** ([`curation`]) - Labeling, coverage aggregation, and parameter selection
//! - **Conformer Analysis** ([`analysis`]) - Symmetry-aware RMSD, TFD, and internal coordinates
//! - **Benchmarking** ([`benchmark`]) - Per-group metric tables and per-parameter comparisons
//! - **Geometry** ([`utils`]) - Superposition and internal-coordinate primitives
//!
//! Everything in this layer is a pure function of its inputs; scheduling,
//! persistence, and progress reporting live in [`crate::engine`].

pub mod analysis;
pub mod benchmark;
pub mod curation;
pub mod io;
pub mod models;
pub mod utils;
