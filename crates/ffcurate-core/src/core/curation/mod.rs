//! # Curation Module
//!
//! Turns a corpus of QM records into the set of force-field parameters worth
//! fitting.
//!
//! ## Overview
//!
//! Records are labeled with the parameters and patterns that apply to them
//! ([`labeler`]), the labels are counted across the corpus ([`coverage`]), and
//! every tag that is both well covered and uniquely defined is selected
//! ([`selector`]). Parameter assignment itself is delegated to an external
//! cheminformatics toolkit behind the [`oracle::LabelingOracle`] trait.
//!
//! ## Key Components
//!
//! - [`tags`] - Tag categories, assignments, and labeled records
//! - [`oracle`] - The labeling oracle seam and a tabulated implementation
//! - [`patterns`] - Built-in catalogue of auxiliary substructure patterns
//! - [`labeler`] - Per-record labeling with torsion-drive policies
//! - [`coverage`] - Order-independent per-tag coverage counting
//! - [`definitions`] - Parameter pattern definitions and their resolver
//! - [`selector`] - Threshold-based parameter selection

pub mod coverage;
pub mod definitions;
pub mod labeler;
pub mod oracle;
pub mod patterns;
pub mod selector;
pub mod tags;
