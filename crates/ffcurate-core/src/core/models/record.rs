use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Archive identifier of a quantum-chemistry record.
pub type RecordId = u64;

/// What kind of QM calculation a record holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RecordKind {
    /// A single geometry optimization.
    Optimization,
    /// A constrained scan around the torsion `dihedral`.
    TorsionDrive { dihedral: [usize; 4] },
}

impl RecordKind {
    pub fn scanned_dihedral(&self) -> Option<[usize; 4]> {
        match self {
            RecordKind::TorsionDrive { dihedral } => Some(*dihedral),
            RecordKind::Optimization => None,
        }
    }
}

/// One chemistry data point: a molecule plus the computation it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub mapped_smiles: String,
    /// Stereochemistry-aware identity of the molecule (e.g. an InChIKey).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_key: Option<String>,
    #[serde(flatten)]
    pub kind: RecordKind,
}

impl Record {
    pub fn optimization(id: RecordId, mapped_smiles: &str) -> Self {
        Self {
            id,
            mapped_smiles: mapped_smiles.to_string(),
            group_key: None,
            kind: RecordKind::Optimization,
        }
    }

    pub fn torsion_drive(id: RecordId, mapped_smiles: &str, dihedral: [usize; 4]) -> Self {
        Self {
            id,
            mapped_smiles: mapped_smiles.to_string(),
            group_key: None,
            kind: RecordKind::TorsionDrive { dihedral },
        }
    }

    pub fn with_group_key(mut self, key: &str) -> Self {
        self.group_key = Some(key.to_string());
        self
    }
}

/// Where a conformer's geometry and energy came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConformerSource {
    Reference,
    /// A force-field variant, identified by name.
    Candidate(String),
}

impl fmt::Display for ConformerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConformerSource::Reference => write!(f, "reference"),
            ConformerSource::Candidate(name) => write!(f, "candidate:{}", name),
        }
    }
}

/// A 3-D geometry and scalar energy (kcal/mol) for one record from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conformer {
    pub record_id: RecordId,
    pub source: ConformerSource,
    /// Cartesian coordinates in Angstroms, in atom-map order.
    pub coordinates: Vec<[f64; 3]>,
    pub energy: f64,
    /// Optional per-term energy breakdown (kcal/mol).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub components: BTreeMap<String, f64>,
}

impl Conformer {
    pub fn new(
        record_id: RecordId,
        source: ConformerSource,
        coordinates: Vec<[f64; 3]>,
        energy: f64,
    ) -> Self {
        Self {
            record_id,
            source,
            coordinates,
            energy,
            components: BTreeMap::new(),
        }
    }

    pub fn points(&self) -> Vec<Point3<f64>> {
        self.coordinates
            .iter()
            .map(|&[x, y, z]| Point3::new(x, y, z))
            .collect()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PairError {
    #[error("Conformer for record {found} cannot be paired with record {expected}")]
    RecordMismatch { expected: RecordId, found: RecordId },
    #[error("Expected a reference conformer for record {0}")]
    NotReference(RecordId),
    #[error("Expected a candidate conformer for record {0}")]
    NotCandidate(RecordId),
    #[error("Record {0} has no group key")]
    MissingGroupKey(RecordId),
}

/// A reference and a candidate conformer of the same record.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonPair {
    pub record: Record,
    pub group_key: String,
    pub reference: Conformer,
    pub candidate: Conformer,
}

impl ComparisonPair {
    pub fn new(
        record: Record,
        reference: Conformer,
        candidate: Conformer,
    ) -> Result<Self, PairError> {
        for conformer in [&reference, &candidate] {
            if conformer.record_id != record.id {
                return Err(PairError::RecordMismatch {
                    expected: record.id,
                    found: conformer.record_id,
                });
            }
        }
        if reference.source != ConformerSource::Reference {
            return Err(PairError::NotReference(record.id));
        }
        if !matches!(candidate.source, ConformerSource::Candidate(_)) {
            return Err(PairError::NotCandidate(record.id));
        }
        let group_key = record
            .group_key
            .clone()
            .ok_or(PairError::MissingGroupKey(record.id))?;
        Ok(Self {
            record,
            group_key,
            reference,
            candidate,
        })
    }

    pub fn record_id(&self) -> RecordId {
        self.record.id
    }
}
