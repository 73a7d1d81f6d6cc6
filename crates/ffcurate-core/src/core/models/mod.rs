//! # Core Models Module
//!
//! Data structures describing the chemistry that flows through the curation and
//! benchmarking pipelines.
//!
//! ## Overview
//!
//! Everything here is immutable once built: records and conformers are read from
//! an external data source, and molecules are parsed from a record's atom-mapped
//! descriptor. Downstream algorithms only ever borrow these values.
//!
//! ## Key Components
//!
//! - [`element`] - Chemical elements and symbol parsing
//! - [`molecule`] - Molecular graph with bonds, ring membership, and internal coordinates
//! - [`record`] - QM records, conformers, and reference/candidate comparison pairs
//!
//! ## Usage
//!
//! ```ignore
//! use ffcurate::core::io::smiles::parse_mapped_smiles;
//!
//! let molecule = parse_mapped_smiles("[C:1]([H:2])([H:3])([H:4])[H:5]")?;
//! assert_eq!(molecule.heavy_atom_count(), 1);
//! ```

pub mod element;
pub mod molecule;
pub mod record;
