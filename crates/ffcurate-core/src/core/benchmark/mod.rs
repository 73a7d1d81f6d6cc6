//! # Benchmark Module
//!
//! Scores candidate force-field conformers against reference QM conformers.
//!
//! [`scorer`] produces one metric row per record: symmetry-aware RMSDs, the
//! torsion fingerprint deviation, internal-coordinate deviations, and relative
//! energies measured from a per-group zero point. [`compare`] drills into a
//! single parameter and reports how its bond, angle, or torsion differs
//! between the two geometries.

pub mod compare;
pub mod scorer;
