use super::oracle::{LabelingOracle, OracleError};
use super::patterns::auxiliary_patterns;
use super::tags::{LabeledRecord, TagAssignment, TagCategory};
use crate::core::io::smiles::{SmilesError, parse_mapped_smiles};
use crate::core::models::molecule::{Molecule, ordered_pair};
use crate::core::models::record::{Record, RecordId};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LabelError {
    #[error("Record {record_id}: malformed descriptor: {source}")]
    Parse {
        record_id: RecordId,
        source: SmilesError,
    },
    #[error("Record {record_id}: {source}")]
    Oracle {
        record_id: RecordId,
        source: OracleError,
    },
    #[error("Record {record_id}: {category} assignment {indices:?} is outside the molecule ({n_atoms} atoms)")]
    IndexOutOfRange {
        record_id: RecordId,
        category: TagCategory,
        indices: Vec<usize>,
        n_atoms: usize,
    },
    #[error("Record {record_id}: scanned dihedral {dihedral:?} is outside the molecule ({n_atoms} atoms)")]
    DihedralOutOfRange {
        record_id: RecordId,
        dihedral: [usize; 4],
        n_atoms: usize,
    },
}

/// Controls which tags the labeler emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelPolicy {
    /// Categories to keep; empty keeps every category.
    pub categories: Vec<TagCategory>,
    /// Torsion ids kept even when all three of their bonds are ring bonds.
    pub ring_torsions: BTreeSet<String>,
    /// Whether to match the auxiliary pattern catalogue.
    pub auxiliary: bool,
}

impl Default for LabelPolicy {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            ring_torsions: BTreeSet::new(),
            auxiliary: true,
        }
    }
}

impl LabelPolicy {
    pub fn wants(&self, category: &TagCategory) -> bool {
        self.categories.is_empty() || self.categories.contains(category)
    }
}

/// Labels one record with the parameters and patterns that apply to it.
///
/// For torsion drives, torsion parameters are only kept when they share the
/// scanned central bond and do not lie entirely inside a ring (unless the id
/// is on the policy's ring-torsion list). Optimizations are kept as assigned.
pub fn label<O>(
    record: &Record,
    oracle: &O,
    policy: &LabelPolicy,
) -> Result<LabeledRecord, LabelError>
where
    O: LabelingOracle + ?Sized,
{
    let record_id = record.id;
    let molecule = parse_mapped_smiles(&record.mapped_smiles)
        .map_err(|source| LabelError::Parse { record_id, source })?;
    let oracle_err = |source| LabelError::Oracle { record_id, source };

    let scanned = record.kind.scanned_dihedral();
    if let Some(dihedral) = scanned {
        if dihedral.iter().any(|&i| i >= molecule.len()) {
            return Err(LabelError::DihedralOutOfRange {
                record_id,
                dihedral,
                n_atoms: molecule.len(),
            });
        }
    }

    let mut tags = BTreeSet::new();
    let assignments = oracle
        .assign_structural_parameters(&molecule)
        .map_err(oracle_err)?;
    for (category, by_indices) in assignments {
        if !policy.wants(&category) {
            continue;
        }
        for (indices, tag_id) in by_indices {
            if indices.iter().any(|&i| i >= molecule.len()) {
                return Err(LabelError::IndexOutOfRange {
                    record_id,
                    category,
                    indices,
                    n_atoms: molecule.len(),
                });
            }
            if category == TagCategory::ProperTorsions {
                if let Some(dihedral) = scanned {
                    if !passes_torsion_policy(&molecule, &indices, &tag_id, dihedral, policy) {
                        trace!(record_id, tag = %tag_id, ?indices, "Torsion excluded by policy");
                        continue;
                    }
                }
            }
            tags.insert(TagAssignment::new(category.clone(), &tag_id));
        }
    }

    if policy.wants(&TagCategory::FunctionalGroup) {
        for group in oracle.functional_groups(&molecule).map_err(oracle_err)? {
            tags.insert(TagAssignment::new(TagCategory::FunctionalGroup, &group));
        }
    }

    if policy.auxiliary && policy.wants(&TagCategory::Additional) {
        for (id, smarts) in auxiliary_patterns() {
            if !oracle.match_pattern(&molecule, smarts).map_err(oracle_err)?.is_empty() {
                tags.insert(TagAssignment::new(TagCategory::Additional, id));
            }
        }
    }

    Ok(LabeledRecord {
        record_id,
        heavy_atoms: molecule.heavy_atom_count(),
        tags,
    })
}

fn passes_torsion_policy(
    molecule: &Molecule,
    indices: &[usize],
    tag_id: &str,
    dihedral: [usize; 4],
    policy: &LabelPolicy,
) -> bool {
    let Ok(torsion) = <[usize; 4]>::try_from(indices) else {
        return false;
    };
    if ordered_pair(torsion[1], torsion[2]) != ordered_pair(dihedral[1], dihedral[2]) {
        return false;
    }
    if molecule.torsion_in_ring(torsion) == Some(true) && !policy.ring_torsions.contains(tag_id) {
        return false;
    }
    true
}
