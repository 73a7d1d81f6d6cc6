use super::scorer::{MetricError, validated_coordinates};
use crate::core::analysis::internal::improper_degrees;
use crate::core::curation::oracle::{LabelingOracle, OracleError};
use crate::core::curation::patterns::auxiliary_pattern;
use crate::core::io::smiles::parse_mapped_smiles;
use crate::core::models::record::{ComparisonPair, ConformerSource, RecordId};
use crate::core::utils::geometry::{
    angle_degrees, dihedral_degrees, distance, periodic_difference_degrees,
};
use nalgebra::Point3;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// The internal coordinate a parameter constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MeasureKind {
    Bond,
    Angle,
    Dihedral,
    Improper,
}

impl MeasureKind {
    /// Infers the kind from a force-field parameter id prefix (`b`, `a`, `t`, `i`).
    pub fn from_parameter_id(tag_id: &str) -> Option<Self> {
        match tag_id.chars().next()? {
            'b' => Some(MeasureKind::Bond),
            'a' => Some(MeasureKind::Angle),
            't' => Some(MeasureKind::Dihedral),
            'i' => Some(MeasureKind::Improper),
            _ => None,
        }
    }

    fn from_arity(arity: usize) -> Option<Self> {
        match arity {
            2 => Some(MeasureKind::Bond),
            3 => Some(MeasureKind::Angle),
            4 => Some(MeasureKind::Dihedral),
            _ => None,
        }
    }

    pub fn arity(self) -> usize {
        match self {
            MeasureKind::Bond => 2,
            MeasureKind::Angle => 3,
            MeasureKind::Dihedral | MeasureKind::Improper => 4,
        }
    }

    fn measure(self, coords: &[Point3<f64>], atoms: &[usize]) -> f64 {
        match self {
            MeasureKind::Bond => distance(&coords[atoms[0]], &coords[atoms[1]]),
            MeasureKind::Angle => {
                angle_degrees(&coords[atoms[0]], &coords[atoms[1]], &coords[atoms[2]])
            }
            MeasureKind::Dihedral => dihedral_degrees(
                &coords[atoms[0]],
                &coords[atoms[1]],
                &coords[atoms[2]],
                &coords[atoms[3]],
            ),
            MeasureKind::Improper => {
                improper_degrees(coords, [atoms[0], atoms[1], atoms[2], atoms[3]])
            }
        }
    }

    fn difference(self, reference: f64, candidate: f64) -> f64 {
        match self {
            MeasureKind::Bond | MeasureKind::Angle => candidate - reference,
            MeasureKind::Dihedral | MeasureKind::Improper => {
                periodic_difference_degrees(reference, candidate)
            }
        }
    }

    // One representative per symmetric duplicate; impropers keep the centre first.
    fn canonical(self, atoms: &[usize]) -> Vec<usize> {
        match self {
            MeasureKind::Improper => {
                let mut outer = atoms[1..].to_vec();
                outer.sort_unstable();
                std::iter::once(atoms[0]).chain(outer).collect()
            }
            _ => {
                let reversed: Vec<usize> = atoms.iter().rev().copied().collect();
                if reversed.as_slice() < atoms {
                    reversed
                } else {
                    atoms.to_vec()
                }
            }
        }
    }
}

impl fmt::Display for MeasureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MeasureKind::Bond => "bond",
            MeasureKind::Angle => "angle",
            MeasureKind::Dihedral => "dihedral",
            MeasureKind::Improper => "improper",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum CompareError {
    #[error("cannot infer what parameter '{0}' measures")]
    UnknownKind(String),
    #[error("pattern for '{tag_id}' matched {arity} atoms; expected {expected}")]
    ArityMismatch {
        tag_id: String,
        arity: usize,
        expected: usize,
    },
    #[error("pattern match {indices:?} is outside the molecule ({n_atoms} atoms)")]
    IndexOutOfRange { indices: Vec<usize>, n_atoms: usize },
    #[error(transparent)]
    Metric(#[from] MetricError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

/// One occurrence of a parameter's internal coordinate in a reference and a
/// candidate conformer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeometryComparison {
    pub record_id: RecordId,
    pub group_key: String,
    pub name: String,
    pub tag_id: String,
    pub kind: MeasureKind,
    #[serde(serialize_with = "serialize_indices")]
    pub indices: Vec<usize>,
    pub reference: f64,
    pub candidate: f64,
    pub difference: f64,
}

fn serialize_indices<S: Serializer>(indices: &[usize], serializer: S) -> Result<S::Ok, S::Error> {
    let joined = indices
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("-");
    serializer.serialize_str(&joined)
}

/// Measures every match of `pattern` in both conformers of `pair`.
///
/// The coordinate kind comes from the id prefix; auxiliary pattern ids are
/// measured according to how many atoms their pattern tags. Improper matches
/// arrive with the centre second and are reordered to put it first.
pub fn compare_parameter_geometry<O>(
    pair: &ComparisonPair,
    tag_id: &str,
    pattern: &str,
    oracle: &O,
) -> Result<Vec<GeometryComparison>, CompareError>
where
    O: LabelingOracle + ?Sized,
{
    let molecule = parse_mapped_smiles(&pair.record.mapped_smiles).map_err(MetricError::from)?;
    let (reference, candidate) = validated_coordinates(&molecule, pair)?;
    let declared = if auxiliary_pattern(tag_id).is_some() {
        None
    } else {
        Some(
            MeasureKind::from_parameter_id(tag_id)
                .ok_or_else(|| CompareError::UnknownKind(tag_id.to_string()))?,
        )
    };

    let mut seen = BTreeSet::new();
    let mut comparisons = Vec::new();
    for matched in oracle.match_pattern(&molecule, pattern)? {
        let kind = match declared {
            Some(kind) => kind,
            None => MeasureKind::from_arity(matched.len()).ok_or_else(|| {
                CompareError::ArityMismatch {
                    tag_id: tag_id.to_string(),
                    arity: matched.len(),
                    expected: 4,
                }
            })?,
        };
        if matched.len() != kind.arity() {
            return Err(CompareError::ArityMismatch {
                tag_id: tag_id.to_string(),
                arity: matched.len(),
                expected: kind.arity(),
            });
        }
        if matched.iter().any(|&i| i >= molecule.len()) {
            return Err(CompareError::IndexOutOfRange {
                indices: matched,
                n_atoms: molecule.len(),
            });
        }
        let atoms = match kind {
            MeasureKind::Improper => vec![matched[1], matched[0], matched[2], matched[3]],
            _ => matched,
        };
        if !seen.insert(kind.canonical(&atoms)) {
            continue;
        }

        let reference_value = kind.measure(&reference, &atoms);
        let candidate_value = kind.measure(&candidate, &atoms);
        comparisons.push(GeometryComparison {
            record_id: pair.record_id(),
            group_key: pair.group_key.clone(),
            name: match &pair.candidate.source {
                ConformerSource::Candidate(name) => name.clone(),
                ConformerSource::Reference => String::new(),
            },
            tag_id: tag_id.to_string(),
            kind,
            indices: atoms,
            reference: reference_value,
            candidate: candidate_value,
            difference: kind.difference(reference_value, candidate_value),
        });
    }
    Ok(comparisons)
}
