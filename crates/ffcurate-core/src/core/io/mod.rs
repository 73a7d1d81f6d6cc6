//! Reading the inputs of the curation and benchmarking pipelines.
//!
//! Molecules arrive as atom-mapped SMILES descriptors ([`smiles`]); record and
//! conformer collections arrive as JSON documents written by the external
//! data-retrieval tooling ([`records`]).

pub mod records;
pub mod smiles;
