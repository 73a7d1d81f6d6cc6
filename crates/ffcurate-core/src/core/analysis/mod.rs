//! Geometric comparison of two conformers of the same molecule.
//!
//! - [`symmetry`] - Atom equivalence classes, automorphisms, and symmetry-aware RMSD
//! - [`tfd`] - Torsion fingerprint deviation
//! - [`internal`] - Bond, angle, dihedral, and improper deviations

pub mod internal;
pub mod symmetry;
pub mod tfd;
