use super::symmetry::atom_classes;
use crate::core::models::molecule::{BondOrder, Molecule};
use crate::core::utils::geometry::{dihedral_degrees, periodic_difference_degrees};
use nalgebra::Point3;

/// A torsion contributing to the fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct FingerprintTorsion {
    pub atoms: [usize; 4],
    /// Atoms symmetry-equivalent to `atoms[0]` (including it).
    pub first_equivalents: Vec<usize>,
    /// Atoms symmetry-equivalent to `atoms[3]` (including it).
    pub last_equivalents: Vec<usize>,
    pub weight: f64,
}

/// Torsions over every bond between two non-terminal heavy atoms.
///
/// Each torsion is defined by the lowest-index heavy neighbour on either side.
/// Weights fall off linearly with topological distance from the molecule's
/// centre: `1 - d / (d_max + 1)`. Triple bonds are skipped.
pub fn fingerprint_torsions(molecule: &Molecule) -> Vec<FingerprintTorsion> {
    let classes = atom_classes(molecule);
    let (center_distances, max_distance) = central_distances(molecule);

    let mut torsions = Vec::new();
    for bond in molecule.bonds() {
        let (j, k) = (bond.i, bond.j);
        if bond.order == BondOrder::Triple || !molecule.is_heavy(j) || !molecule.is_heavy(k) {
            continue;
        }
        let side = |center: usize, across: usize| -> Vec<usize> {
            molecule
                .neighbors(center)
                .iter()
                .copied()
                .filter(|&n| n != across && molecule.is_heavy(n))
                .collect()
        };
        let first_side = side(j, k);
        let Some(&i) = first_side.first() else {
            continue;
        };
        let last_side: Vec<usize> = side(k, j).into_iter().filter(|&l| l != i).collect();
        let Some(&l) = last_side.first() else {
            continue;
        };

        let first_equivalents = first_side
            .iter()
            .copied()
            .filter(|&n| classes[n] == classes[i])
            .collect();
        let last_equivalents = last_side
            .iter()
            .copied()
            .filter(|&n| classes[n] == classes[l])
            .collect();

        let d = match (center_distances[j], center_distances[k]) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => max_distance,
        };
        let weight = 1.0 - d as f64 / (max_distance as f64 + 1.0);

        torsions.push(FingerprintTorsion {
            atoms: [i, j, k, l],
            first_equivalents,
            last_equivalents,
            weight,
        });
    }
    torsions
}

// Distances from the heavy atom with the smallest eccentricity (lowest index on ties).
fn central_distances(molecule: &Molecule) -> (Vec<Option<usize>>, usize) {
    let heavy = molecule.heavy_atom_indices();
    let mut best: Option<(usize, Vec<Option<usize>>)> = None;
    for &atom in &heavy {
        let distances = molecule.topological_distances(atom);
        let eccentricity = heavy
            .iter()
            .filter_map(|&h| distances[h])
            .max()
            .unwrap_or(0);
        if best.as_ref().is_none_or(|(e, _)| eccentricity < *e) {
            best = Some((eccentricity, distances));
        }
    }
    match best {
        Some((eccentricity, distances)) => (distances, eccentricity),
        None => (vec![None; molecule.len()], 0),
    }
}

/// Torsion fingerprint deviation between two conformers of one molecule.
///
/// The weighted mean over all fingerprint torsions of the normalised absolute
/// torsion difference (0 identical, 1 maximally different). The candidate
/// side is matched over symmetry-equivalent end atoms. `NaN` when the
/// molecule has no such torsions.
pub fn torsion_fingerprint_deviation(
    molecule: &Molecule,
    reference: &[Point3<f64>],
    candidate: &[Point3<f64>],
) -> f64 {
    let torsions = fingerprint_torsions(molecule);
    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    for torsion in &torsions {
        let [i, j, k, l] = torsion.atoms;
        let reference_angle =
            dihedral_degrees(&reference[i], &reference[j], &reference[k], &reference[l]);
        let mut deviation = f64::INFINITY;
        for &a in &torsion.first_equivalents {
            for &d in torsion.last_equivalents.iter().filter(|&&d| d != a) {
                let candidate_angle =
                    dihedral_degrees(&candidate[a], &candidate[j], &candidate[k], &candidate[d]);
                let diff =
                    periodic_difference_degrees(reference_angle, candidate_angle).abs() / 180.0;
                deviation = deviation.min(diff);
            }
        }
        if deviation.is_finite() {
            weighted += torsion.weight * deviation;
            total_weight += torsion.weight;
        }
    }
    if total_weight == 0.0 {
        f64::NAN
    } else {
        weighted / total_weight
    }
}
