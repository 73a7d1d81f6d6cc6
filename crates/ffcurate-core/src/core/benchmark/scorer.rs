use crate::core::analysis::internal::internal_coordinate_rmsd;
use crate::core::analysis::symmetry::symmetric_rmsd;
use crate::core::analysis::tfd::torsion_fingerprint_deviation;
use crate::core::curation::labeler::{LabelPolicy, label};
use crate::core::curation::oracle::LabelingOracle;
use crate::core::curation::tags::{TagAssignment, format_tags};
use crate::core::io::smiles::{SmilesError, parse_mapped_smiles};
use crate::core::models::molecule::Molecule;
use crate::core::models::record::{ComparisonPair, ConformerSource, RecordId};
use crate::core::utils::geometry::{all_finite, distance};
use nalgebra::Point3;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_RMSD_THRESHOLD: f64 = 0.4;
pub const DEFAULT_MAX_AUTOMORPHISMS: usize = 10_000;
/// Bonded atoms closer than this (Angstroms) make a conformer degenerate.
pub const MIN_BOND_LENGTH: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringOptions {
    /// Pairs with an all-atom RMSD above this (Angstroms) are left out of the
    /// filtered relative energies.
    pub rmsd_threshold: f64,
    pub max_automorphisms: usize,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            rmsd_threshold: DEFAULT_RMSD_THRESHOLD,
            max_automorphisms: DEFAULT_MAX_AUTOMORPHISMS,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum MetricError {
    #[error("malformed descriptor: {0}")]
    Parse(#[from] SmilesError),
    #[error("molecule has no atoms")]
    EmptyMolecule,
    #[error(
        "atom count mismatch: molecule has {molecule}, reference has {reference}, candidate has {candidate}"
    )]
    AtomCountMismatch {
        molecule: usize,
        reference: usize,
        candidate: usize,
    },
    #[error("{0} conformer has non-finite coordinates")]
    NonFinite(ConformerSource),
    #[error("{0} conformer has a non-finite energy")]
    NonFiniteEnergy(ConformerSource),
    #[error("{conformer} conformer has a degenerate bond {i}-{j} ({length:.2e} A)")]
    DegenerateGeometry {
        conformer: ConformerSource,
        i: usize,
        j: usize,
        length: f64,
    },
    #[error("{0} is not finite")]
    NonFiniteMetric(&'static str),
}

/// Metrics for one reference/candidate pair.
///
/// `dde` and `dde_filtered` are relative-energy scores in kcal/mol;
/// `NaN` means undefined (the zero point itself, or excluded by the filter).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkEntry {
    pub record_id: RecordId,
    pub group_key: String,
    pub name: String,
    pub mapped_smiles: String,
    pub n_atoms: usize,
    pub n_heavy_atoms: usize,
    pub rmsd: f64,
    pub rmsd_all_atom: f64,
    pub tfd: f64,
    pub bond_rmsd: Option<f64>,
    pub angle_rmsd: Option<f64>,
    pub dihedral_rmsd: Option<f64>,
    pub improper_rmsd: Option<f64>,
    pub reference_energy: f64,
    pub candidate_energy: f64,
    #[serde(serialize_with = "serialize_components")]
    pub components: BTreeMap<String, f64>,
    pub dde: f64,
    pub dde_filtered: f64,
    pub zero_point_id: Option<RecordId>,
    pub filtered_zero_point_id: Option<RecordId>,
    #[serde(serialize_with = "serialize_tags")]
    pub tags: BTreeSet<TagAssignment>,
}

fn serialize_components<S: Serializer>(
    components: &BTreeMap<String, f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let joined = components
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(";");
    serializer.serialize_str(&joined)
}

fn serialize_tags<S: Serializer>(
    tags: &BTreeSet<TagAssignment>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_tags(tags))
}

/// Scored entries of one molecule group plus the pairs that could not be scored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupScore {
    pub entries: Vec<BenchmarkEntry>,
    pub errors: Vec<String>,
}

/// Splits pairs into molecule groups by their group key, keeping input order
/// within each group.
pub fn group_pairs(pairs: Vec<ComparisonPair>) -> BTreeMap<String, Vec<ComparisonPair>> {
    let mut groups: BTreeMap<String, Vec<ComparisonPair>> = BTreeMap::new();
    for pair in pairs {
        groups.entry(pair.group_key.clone()).or_default().push(pair);
    }
    groups
}

/// Checks a pair against its molecule and returns both coordinate sets.
pub(crate) fn validated_coordinates(
    molecule: &Molecule,
    pair: &ComparisonPair,
) -> Result<(Vec<Point3<f64>>, Vec<Point3<f64>>), MetricError> {
    if molecule.is_empty() {
        return Err(MetricError::EmptyMolecule);
    }
    let reference = pair.reference.points();
    let candidate = pair.candidate.points();
    if reference.len() != molecule.len() || candidate.len() != molecule.len() {
        return Err(MetricError::AtomCountMismatch {
            molecule: molecule.len(),
            reference: reference.len(),
            candidate: candidate.len(),
        });
    }
    if !all_finite(&reference) {
        return Err(MetricError::NonFinite(pair.reference.source.clone()));
    }
    if !all_finite(&candidate) {
        return Err(MetricError::NonFinite(pair.candidate.source.clone()));
    }
    for (coords, source) in [
        (&reference, &pair.reference.source),
        (&candidate, &pair.candidate.source),
    ] {
        for bond in molecule.bonds() {
            let length = distance(&coords[bond.i], &coords[bond.j]);
            if length < MIN_BOND_LENGTH {
                return Err(MetricError::DegenerateGeometry {
                    conformer: source.clone(),
                    i: bond.i.min(bond.j),
                    j: bond.i.max(bond.j),
                    length,
                });
            }
        }
    }
    Ok((reference, candidate))
}

/// Computes the per-pair metrics; relative energies are filled in by [`score_group`].
pub fn score_pair(
    pair: &ComparisonPair,
    options: &ScoringOptions,
    oracle: Option<&(dyn LabelingOracle + Sync)>,
) -> Result<BenchmarkEntry, MetricError> {
    let molecule = parse_mapped_smiles(&pair.record.mapped_smiles)?;
    let (reference, candidate) = validated_coordinates(&molecule, pair)?;
    for conformer in [&pair.reference, &pair.candidate] {
        if !conformer.energy.is_finite() {
            return Err(MetricError::NonFiniteEnergy(conformer.source.clone()));
        }
    }

    let all_atoms: Vec<usize> = (0..molecule.len()).collect();
    let heavy_atoms = molecule.heavy_atom_indices();
    let rmsd_all_atom = symmetric_rmsd(
        &molecule,
        &reference,
        &candidate,
        &all_atoms,
        options.max_automorphisms,
    )
    .unwrap_or(f64::NAN);
    let rmsd = symmetric_rmsd(
        &molecule,
        &reference,
        &candidate,
        &heavy_atoms,
        options.max_automorphisms,
    )
    .unwrap_or(f64::NAN);
    let tfd = torsion_fingerprint_deviation(&molecule, &reference, &candidate);
    let internal = internal_coordinate_rmsd(&molecule, &reference, &candidate);
    let metrics = [
        ("rmsd", Some(rmsd)),
        ("rmsd_all_atom", Some(rmsd_all_atom)),
        ("bond_rmsd", internal.bond),
        ("angle_rmsd", internal.angle),
        ("dihedral_rmsd", internal.dihedral),
        ("improper_rmsd", internal.improper),
    ];
    if let Some((name, _)) = metrics
        .into_iter()
        .find(|(_, v)| v.is_some_and(|v| !v.is_finite()))
    {
        return Err(MetricError::NonFiniteMetric(name));
    }

    let tags = match oracle {
        Some(oracle) => match label(&pair.record, oracle, &LabelPolicy::default()) {
            Ok(labeled) => labeled.tags,
            Err(e) => {
                warn!(record_id = pair.record_id(), error = %e, "Labeling failed; tags left empty");
                BTreeSet::new()
            }
        },
        None => BTreeSet::new(),
    };

    let name = match &pair.candidate.source {
        ConformerSource::Candidate(name) => name.clone(),
        ConformerSource::Reference => String::new(),
    };

    Ok(BenchmarkEntry {
        record_id: pair.record_id(),
        group_key: pair.group_key.clone(),
        name,
        mapped_smiles: pair.record.mapped_smiles.clone(),
        n_atoms: molecule.len(),
        n_heavy_atoms: molecule.heavy_atom_count(),
        rmsd,
        rmsd_all_atom,
        tfd,
        bond_rmsd: internal.bond,
        angle_rmsd: internal.angle,
        dihedral_rmsd: internal.dihedral,
        improper_rmsd: internal.improper,
        reference_energy: pair.reference.energy,
        candidate_energy: pair.candidate.energy,
        components: pair.candidate.components.clone(),
        dde: f64::NAN,
        dde_filtered: f64::NAN,
        zero_point_id: None,
        filtered_zero_point_id: None,
        tags,
    })
}

/// Scores every pair of one molecule group.
///
/// The zero point is the first pair with the lowest reference energy; every
/// other pair scores `(candidate - candidate_0) - (reference - reference_0)`.
/// The filtered stage repeats this over the pairs whose all-atom RMSD is
/// within the threshold. Pairs that cannot be scored are reported in
/// `errors` and take no part in either stage.
pub fn score_group(
    pairs: &[ComparisonPair],
    options: &ScoringOptions,
    oracle: Option<&(dyn LabelingOracle + Sync)>,
) -> GroupScore {
    let mut score = GroupScore::default();
    let Some(group_key) = pairs.first().map(|p| p.group_key.as_str()) else {
        return score;
    };

    for pair in pairs {
        if pair.group_key != group_key {
            score.errors.push(format!(
                "record {}: group key '{}' does not match group '{}'",
                pair.record_id(),
                pair.group_key,
                group_key
            ));
            continue;
        }
        match score_pair(pair, options, oracle) {
            Ok(entry) => score.entries.push(entry),
            Err(e) => score.errors.push(format!("record {}: {}", pair.record_id(), e)),
        }
    }

    let (dde, zero_point) = relative_scores(&score.entries, |_| true);
    let threshold = options.rmsd_threshold;
    let (dde_filtered, filtered_zero_point) =
        relative_scores(&score.entries, |e| e.rmsd_all_atom <= threshold);
    for (i, entry) in score.entries.iter_mut().enumerate() {
        entry.dde = dde[i];
        entry.dde_filtered = dde_filtered[i];
        entry.zero_point_id = zero_point;
        entry.filtered_zero_point_id = filtered_zero_point;
    }

    debug!(
        group = group_key,
        scored = score.entries.len(),
        failed = score.errors.len(),
        "Group scored"
    );
    score
}

fn relative_scores(
    entries: &[BenchmarkEntry],
    include: impl Fn(&BenchmarkEntry) -> bool,
) -> (Vec<f64>, Option<RecordId>) {
    let mut zero: Option<usize> = None;
    for (i, entry) in entries.iter().enumerate() {
        if !include(entry) {
            continue;
        }
        if zero.is_none_or(|z| entry.reference_energy < entries[z].reference_energy) {
            zero = Some(i);
        }
    }
    let Some(z) = zero else {
        return (vec![f64::NAN; entries.len()], None);
    };
    let (reference_0, candidate_0) = (entries[z].reference_energy, entries[z].candidate_energy);
    let scores = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            if i == z || !include(entry) {
                f64::NAN
            } else {
                (entry.candidate_energy - candidate_0) - (entry.reference_energy - reference_0)
            }
        })
        .collect();
    (scores, Some(entries[z].record_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::curation::oracle::{MoleculeLabels, ParameterMatch, TabulatedOracle};
    use crate::core::curation::tags::TagCategory;
    use crate::core::analysis::symmetry::tests::{NEOPENTANE, relabeled_neopentane};
    use crate::core::models::record::{Conformer, Record};

    const WATER: &str = "[O:1]([H:2])[H:3]";

    fn water(scale: f64) -> Vec<[f64; 3]> {
        vec![
            [0.0, 0.0, 0.0],
            [0.96 * scale, 0.0, 0.0],
            [-0.24 * scale, 0.93 * scale, 0.0],
        ]
    }

    fn pair(
        id: RecordId,
        reference_energy: f64,
        candidate_energy: f64,
        candidate_scale: f64,
    ) -> ComparisonPair {
        let record = Record::optimization(id, WATER).with_group_key("WATER");
        let reference =
            Conformer::new(id, ConformerSource::Reference, water(1.0), reference_energy);
        let candidate = Conformer::new(
            id,
            ConformerSource::Candidate("ff".into()),
            water(candidate_scale),
            candidate_energy,
        );
        ComparisonPair::new(record, reference, candidate).unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn relative_energies_follow_the_zero_point() {
        let pairs = vec![pair(1, 0.0, 0.5, 1.0), pair(2, 1.0, 1.2, 1.0), pair(3, 2.0, 2.1, 1.0)];
        let score = score_group(&pairs, &ScoringOptions::default(), None);
        assert!(score.errors.is_empty());
        let dde: Vec<f64> = score.entries.iter().map(|e| e.dde).collect();
        assert!(dde[0].is_nan());
        assert!(close(dde[1], -0.3));
        assert!(close(dde[2], -0.4));
        assert!(score.entries.iter().all(|e| e.zero_point_id == Some(1)));
        assert_eq!(score.entries[0].name, "ff");
    }

    #[test]
    fn zero_point_is_the_minimum_reference_energy() {
        let pairs = vec![pair(1, 3.0, 3.0, 1.0), pair(2, -1.0, 0.0, 1.0), pair(3, 2.0, 2.5, 1.0)];
        let score = score_group(&pairs, &ScoringOptions::default(), None);
        assert!(score.entries[1].dde.is_nan());
        assert!(close(score.entries[0].dde, (3.0 - 0.0) - (3.0 + 1.0)));
        assert!(close(score.entries[2].dde, (2.5 - 0.0) - (2.0 + 1.0)));
        assert_eq!(score.entries[0].zero_point_id, Some(2));
    }

    #[test]
    fn single_pair_group_has_nan_score_and_metrics() {
        let score = score_group(&[pair(7, 1.0, 2.0, 1.0)], &ScoringOptions::default(), None);
        assert_eq!(score.entries.len(), 1);
        let entry = &score.entries[0];
        assert!(entry.dde.is_nan());
        assert!(entry.dde_filtered.is_nan());
        assert!(entry.rmsd_all_atom < 1e-9);
        assert!(entry.rmsd < 1e-9);
        assert_eq!(entry.n_atoms, 3);
        assert_eq!(entry.n_heavy_atoms, 1);
        assert!(entry.tfd.is_nan());
        assert_eq!(entry.filtered_zero_point_id, Some(7));
    }

    #[test]
    fn equal_reference_energies_score_candidate_differences() {
        let pairs = vec![pair(1, 5.0, 1.0, 1.0), pair(2, 5.0, 1.7, 1.0), pair(3, 5.0, 0.4, 1.0)];
        let score = score_group(&pairs, &ScoringOptions::default(), None);
        let nan_count = score.entries.iter().filter(|e| e.dde.is_nan()).count();
        assert_eq!(nan_count, 1);
        assert!(score.entries[0].dde.is_nan());
        assert!(close(score.entries[1].dde, 0.7));
        assert!(close(score.entries[2].dde, -0.6));
    }

    #[test]
    fn infinite_threshold_reproduces_unfiltered_scores() {
        let pairs = vec![pair(1, 0.0, 0.5, 1.0), pair(2, 1.0, 1.2, 1.6), pair(3, 2.0, 2.1, 1.0)];
        let options = ScoringOptions {
            rmsd_threshold: f64::INFINITY,
            ..ScoringOptions::default()
        };
        let score = score_group(&pairs, &options, None);
        for entry in &score.entries {
            assert_eq!(entry.dde.is_nan(), entry.dde_filtered.is_nan());
            if !entry.dde.is_nan() {
                assert!(close(entry.dde, entry.dde_filtered));
            }
            assert_eq!(entry.zero_point_id, entry.filtered_zero_point_id);
        }
    }

    #[test]
    fn filter_excludes_distorted_geometries() {
        // Pair 1 is the global zero point but its candidate is badly distorted.
        let pairs = vec![pair(1, 0.0, 0.5, 2.0), pair(2, 1.0, 1.2, 1.0), pair(3, 2.0, 2.1, 1.0)];
        let score = score_group(&pairs, &ScoringOptions::default(), None);
        assert!(score.entries[0].rmsd_all_atom > DEFAULT_RMSD_THRESHOLD);
        assert!(score.entries[0].dde_filtered.is_nan());
        assert!(score.entries[1].dde_filtered.is_nan());
        assert!(close(score.entries[2].dde_filtered, (2.1 - 1.2) - (2.0 - 1.0)));
        assert_eq!(score.entries[0].filtered_zero_point_id, Some(2));
        assert_eq!(score.entries[0].zero_point_id, Some(1));

        let strict = ScoringOptions {
            rmsd_threshold: 1e-12,
            ..ScoringOptions::default()
        };
        let only_distorted = vec![pair(1, 0.0, 0.5, 2.0)];
        let score = score_group(&only_distorted, &strict, None);
        assert!(score.entries[0].dde_filtered.is_nan());
        assert_eq!(score.entries[0].filtered_zero_point_id, None);
    }

    #[test]
    fn degenerate_pairs_are_excluded_with_errors() {
        let mut short = pair(2, 1.0, 1.0, 1.0);
        short.candidate.coordinates.pop();
        let mut broken = pair(3, 1.0, 1.0, 1.0);
        broken.reference.coordinates[1][0] = f64::NAN;
        let mut other_group = pair(4, 1.0, 1.0, 1.0);
        other_group.group_key = "OTHER".into();

        let pairs = vec![pair(1, 0.0, 0.0, 1.0), short, broken, other_group];
        let score = score_group(&pairs, &ScoringOptions::default(), None);
        assert_eq!(score.entries.len(), 1);
        assert_eq!(score.errors.len(), 3);
        assert!(score.errors[0].contains("atom count mismatch"));
        assert!(score.errors[1].contains("non-finite"));
        assert!(score.errors[2].contains("does not match group"));
    }

    #[test]
    fn coincident_bonded_atoms_are_reported() {
        let mut collapsed = pair(2, 1.0, 1.0, 1.0);
        collapsed.candidate.coordinates[1] = [0.0, 0.0, 0.0];
        let pairs = vec![pair(1, 0.0, 0.0, 1.0), collapsed, pair(3, 2.0, 2.5, 1.0)];
        let score = score_group(&pairs, &ScoringOptions::default(), None);
        assert_eq!(score.entries.len(), 2);
        assert_eq!(score.errors.len(), 1);
        assert!(score.errors[0].starts_with("record 2"));
        assert!(score.errors[0].contains("degenerate bond 0-1"));
        assert!(score.entries.iter().all(|e| e.angle_rmsd.is_some_and(f64::is_finite)));
        assert!(close(score.entries[1].dde, 0.5));

        let err = score_pair(&collapsed_pair(), &ScoringOptions::default(), None).unwrap_err();
        assert!(matches!(
            err,
            MetricError::DegenerateGeometry {
                conformer: ConformerSource::Reference,
                i: 0,
                j: 2,
                ..
            }
        ));
    }

    fn collapsed_pair() -> ComparisonPair {
        let mut collapsed = pair(4, 0.0, 0.0, 1.0);
        collapsed.reference.coordinates[2] = [1e-4, 0.0, 0.0];
        collapsed
    }

    #[test]
    fn relabeled_symmetric_molecule_stays_in_the_filtered_stage() {
        let (reference, candidate) = relabeled_neopentane();
        let as_arrays = |points: &[Point3<f64>]| -> Vec<[f64; 3]> {
            points.iter().map(|p| [p.x, p.y, p.z]).collect()
        };
        let pairs: Vec<ComparisonPair> = (1..=2)
            .map(|id| {
                let record = Record::optimization(id, NEOPENTANE).with_group_key("C5H12");
                let energy = id as f64;
                ComparisonPair::new(
                    record,
                    Conformer::new(id, ConformerSource::Reference, as_arrays(&reference), energy),
                    Conformer::new(
                        id,
                        ConformerSource::Candidate("ff".into()),
                        as_arrays(&candidate),
                        2.0 * energy,
                    ),
                )
                .unwrap()
            })
            .collect();
        let score = score_group(&pairs, &ScoringOptions::default(), None);
        assert!(score.errors.is_empty());
        let entry = &score.entries[1];
        assert!(entry.rmsd < 1e-6);
        assert!(entry.rmsd_all_atom < 1e-6);
        assert!(close(entry.dde_filtered, 1.0));
    }

    #[test]
    fn oracle_tags_are_attached() {
        let mut labels = MoleculeLabels::default();
        labels.parameters.insert(
            TagCategory::Bonds,
            vec![ParameterMatch {
                atoms: vec![0, 1],
                id: "b88".into(),
            }],
        );
        let mut oracle = TabulatedOracle::new();
        oracle.insert(WATER, labels);

        let score = score_group(
            &[pair(1, 0.0, 0.0, 1.0)],
            &ScoringOptions::default(),
            Some(&oracle),
        );
        let entry = &score.entries[0];
        assert!(entry.tags.contains(&TagAssignment::new(TagCategory::Bonds, "b88")));
    }

    #[test]
    fn entries_serialize_to_flat_csv_rows() {
        let mut entry = score_group(&[pair(1, 0.0, 0.0, 1.0)], &ScoringOptions::default(), None)
            .entries
            .remove(0);
        entry.components.insert("Bonds".into(), 1.5);
        entry.components.insert("vdW".into(), -0.25);
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(&entry).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("record_id,group_key,name,mapped_smiles"));
        let row = lines.next().unwrap();
        assert!(row.contains("Bonds=1.5;vdW=-0.25"));
        assert!(row.contains("NaN"));
    }

    #[test]
    fn group_pairs_partitions_by_key() {
        let mut other = pair(9, 0.0, 0.0, 1.0);
        other.group_key = "A".into();
        let groups = group_pairs(vec![pair(1, 0.0, 0.0, 1.0), other, pair(2, 0.0, 0.0, 1.0)]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["WATER"].iter().map(|p| p.record_id()).collect::<Vec<_>>(), vec![1, 2]);
    }
}
