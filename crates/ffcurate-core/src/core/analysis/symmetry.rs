use crate::core::models::molecule::Molecule;
use crate::core::utils::geometry::{Superposition, superposed_rmsd};
use itertools::Itertools;
use nalgebra::Point3;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::warn;

const MAX_REFINEMENTS: usize = 10;

/// Partitions atoms into classes of topologically equivalent atoms.
///
/// Classes start from element, aromaticity, charge, and degree, and are
/// refined by neighbour classes and bond orders until stable. Equivalent atoms
/// always share a class; atoms sharing a class are candidates for equivalence.
pub fn atom_classes(molecule: &Molecule) -> Vec<usize> {
    let initial: Vec<_> = molecule
        .atoms()
        .iter()
        .enumerate()
        .map(|(i, atom)| {
            (
                atom.element.atomic_number(),
                atom.aromatic,
                atom.formal_charge,
                molecule.degree(i),
            )
        })
        .collect();
    let mut classes = rank(&initial);
    let mut n_classes = count_distinct(&classes);

    loop {
        let keys: Vec<_> = (0..molecule.len())
            .map(|i| {
                let mut environment: Vec<(usize, u8)> = molecule
                    .neighbors(i)
                    .iter()
                    .map(|&n| {
                        let order = molecule.bond_between(i, n).map_or(0, |b| b.order as u8);
                        (classes[n], order)
                    })
                    .collect();
                environment.sort_unstable();
                (classes[i], environment)
            })
            .collect();
        let refined = rank(&keys);
        let refined_count = count_distinct(&refined);
        if refined_count == n_classes {
            return refined;
        }
        classes = refined;
        n_classes = refined_count;
    }
}

fn rank<K: Ord + Clone>(keys: &[K]) -> Vec<usize> {
    let ids: BTreeMap<K, usize> = keys
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .enumerate()
        .map(|(id, key)| (key, id))
        .collect();
    keys.iter().map(|k| ids[k]).collect()
}

fn count_distinct(classes: &[usize]) -> usize {
    classes.iter().max().map_or(0, |m| m + 1)
}

/// Enumerates graph automorphisms of the subgraph induced by `atoms`.
///
/// Each mapping lists, for every position of `atoms`, the atom it maps to.
/// Mappings preserve atom classes and bond orders. The identity always comes
/// first and at most `max` mappings are returned.
pub fn automorphisms(molecule: &Molecule, atoms: &[usize], max: usize) -> Vec<Vec<usize>> {
    if atoms.is_empty() || max == 0 {
        return Vec::new();
    }
    let classes = atom_classes(molecule);
    let mut search = Search {
        molecule,
        atoms,
        classes: atoms.iter().map(|&a| classes[a]).collect(),
        order: search_order(molecule, atoms),
        mapping: vec![None; atoms.len()],
        used: vec![false; atoms.len()],
        results: vec![atoms.to_vec()],
        max,
    };
    search.extend(0);
    search.results
}

// Breadth-first over the induced subgraph so every position after the first
// of its component has an already-mapped neighbour.
fn search_order(molecule: &Molecule, atoms: &[usize]) -> Vec<usize> {
    let position: BTreeMap<usize, usize> =
        atoms.iter().enumerate().map(|(p, &a)| (a, p)).collect();
    let mut seen = vec![false; atoms.len()];
    let mut order = Vec::with_capacity(atoms.len());
    for start in 0..atoms.len() {
        if seen[start] {
            continue;
        }
        seen[start] = true;
        let mut queue = VecDeque::from([start]);
        while let Some(p) = queue.pop_front() {
            order.push(p);
            for n in molecule.neighbors(atoms[p]) {
                if let Some(&q) = position.get(n) {
                    if !seen[q] {
                        seen[q] = true;
                        queue.push_back(q);
                    }
                }
            }
        }
    }
    order
}

struct Search<'a> {
    molecule: &'a Molecule,
    atoms: &'a [usize],
    classes: Vec<usize>,
    order: Vec<usize>,
    mapping: Vec<Option<usize>>,
    used: Vec<bool>,
    results: Vec<Vec<usize>>,
    max: usize,
}

impl Search<'_> {
    fn extend(&mut self, depth: usize) {
        if self.results.len() >= self.max {
            return;
        }
        if depth == self.order.len() {
            let mapping: Vec<usize> = self
                .mapping
                .iter()
                .map(|q| q.map_or(0, |q| self.atoms[q]))
                .collect();
            if mapping != self.atoms {
                self.results.push(mapping);
            }
            return;
        }
        let p = self.order[depth];
        for q in 0..self.atoms.len() {
            if self.used[q] || self.classes[q] != self.classes[p] || !self.consistent(depth, p, q) {
                continue;
            }
            self.mapping[p] = Some(q);
            self.used[q] = true;
            self.extend(depth + 1);
            self.mapping[p] = None;
            self.used[q] = false;
            if self.results.len() >= self.max {
                return;
            }
        }
    }

    fn consistent(&self, depth: usize, p: usize, q: usize) -> bool {
        let (a, image) = (self.atoms[p], self.atoms[q]);
        self.order[..depth].iter().all(|&r| {
            let Some(s) = self.mapping[r] else {
                return true;
            };
            let original = self.molecule.bond_between(a, self.atoms[r]);
            let mapped = self.molecule.bond_between(image, self.atoms[s]);
            match (original, mapped) {
                (None, None) => true,
                (Some(x), Some(y)) => x.order == y.order,
                _ => false,
            }
        })
    }
}

/// Hydrogens of `atoms` bonded only to a heavy atom of `atoms`, keyed by that atom.
fn terminal_hydrogens(molecule: &Molecule, atoms: &[usize]) -> BTreeMap<usize, Vec<usize>> {
    let members: BTreeSet<usize> = atoms.iter().copied().collect();
    let is_hydrogen = |a: usize| molecule.atoms()[a].element.is_hydrogen();
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for &a in atoms {
        if !is_hydrogen(a) || molecule.degree(a) != 1 {
            continue;
        }
        let parent = molecule.neighbors(a)[0];
        if members.contains(&parent) && !is_hydrogen(parent) {
            groups.entry(parent).or_default().push(a);
        }
    }
    groups
}

/// Smallest superposed RMSD over the symmetry-equivalent atom mappings of the
/// `atoms` subgraph.
///
/// `reference` and `candidate` are full-molecule coordinate sets. Automorphisms
/// are enumerated over the atoms that are not terminal hydrogens; hydrogens on
/// the same parent are interchangeable and are matched to the reference per
/// parent. When every combination fits within `max_automorphisms` they are all
/// tried, otherwise each parent's hydrogens are assigned by closest match after
/// superposition and the fit is refined until the assignment is stable.
pub fn symmetric_rmsd(
    molecule: &Molecule,
    reference: &[Point3<f64>],
    candidate: &[Point3<f64>],
    atoms: &[usize],
    max_automorphisms: usize,
) -> Option<f64> {
    if atoms.iter().any(|&a| a >= reference.len() || a >= candidate.len()) {
        return None;
    }
    let hydrogens = terminal_hydrogens(molecule, atoms);
    let terminal: BTreeSet<usize> = hydrogens.values().flatten().copied().collect();
    let core: Vec<usize> = atoms.iter().copied().filter(|a| !terminal.contains(a)).collect();

    let limit = max_automorphisms.max(1);
    let mut mappings = automorphisms(molecule, &core, limit.saturating_add(1));
    if mappings.len() > limit {
        warn!(
            atoms = core.len(),
            limit, "Automorphism enumeration truncated; symmetric RMSD may be overestimated"
        );
        mappings.truncate(limit);
    }

    let parents: Vec<(usize, &[usize])> = core
        .iter()
        .enumerate()
        .filter_map(|(p, a)| hydrogens.get(a).map(|hs| (p, hs.as_slice())))
        .collect();
    let fixed: Vec<Point3<f64>> = core
        .iter()
        .chain(parents.iter().flat_map(|(_, hs)| hs.iter()))
        .map(|&a| reference[a])
        .collect();
    let orderings = parents
        .iter()
        .map(|(_, hs)| (1..=hs.len()).fold(1usize, usize::saturating_mul))
        .fold(1usize, usize::saturating_mul);
    let exhaustive = mappings.len().saturating_mul(orderings) <= limit;

    mappings
        .iter()
        .filter_map(|mapping| {
            let images: Vec<&[usize]> = parents
                .iter()
                .map(|(p, _)| hydrogens.get(&mapping[*p]).map_or(&[][..], Vec::as_slice))
                .collect();
            if images.iter().zip(&parents).any(|(img, (_, hs))| img.len() != hs.len()) {
                return None;
            }
            let matching = HydrogenMatching {
                reference,
                candidate,
                fixed: &fixed,
                core: mapping,
                groups: parents.iter().map(|(_, hs)| *hs).collect(),
                images,
            };
            if exhaustive {
                matching.best_of_all()
            } else {
                matching.refined()
            }
        })
        .min_by(|a, b| a.total_cmp(b))
}

// One core mapping with its hydrogen groups: `groups[g]` holds reference
// hydrogens, `images[g]` the candidate hydrogens of the mapped parent.
struct HydrogenMatching<'a> {
    reference: &'a [Point3<f64>],
    candidate: &'a [Point3<f64>],
    fixed: &'a [Point3<f64>],
    core: &'a [usize],
    groups: Vec<&'a [usize]>,
    images: Vec<&'a [usize]>,
}

impl HydrogenMatching<'_> {
    fn assemble(&self, orders: &[Vec<usize>]) -> Vec<Point3<f64>> {
        self.core
            .iter()
            .chain(orders.iter().flatten())
            .map(|&a| self.candidate[a])
            .collect()
    }

    fn best_of_all(&self) -> Option<f64> {
        if self.images.is_empty() {
            return superposed_rmsd(self.fixed, &self.assemble(&[]));
        }
        self.images
            .iter()
            .map(|img| img.iter().copied().permutations(img.len()).collect_vec().into_iter())
            .multi_cartesian_product()
            .filter_map(|orders| superposed_rmsd(self.fixed, &self.assemble(&orders)))
            .min_by(|a, b| a.total_cmp(b))
    }

    fn refined(&self) -> Option<f64> {
        let mut orders: Vec<Vec<usize>> = self.images.iter().map(|img| img.to_vec()).collect();
        let core_len = self.core.len();
        let mut fit = if core_len >= 3 {
            let moved: Vec<Point3<f64>> = self.core.iter().map(|&a| self.candidate[a]).collect();
            Superposition::fit(&self.fixed[..core_len], &moved)?
        } else {
            Superposition::fit(self.fixed, &self.assemble(&orders))?
        };
        for _ in 0..MAX_REFINEMENTS {
            let assigned: Vec<Vec<usize>> = self
                .groups
                .iter()
                .zip(&self.images)
                .map(|(hs, img)| self.closest_order(hs, img, &fit))
                .collect();
            let converged = assigned == orders;
            orders = assigned;
            fit = Superposition::fit(self.fixed, &self.assemble(&orders))?;
            if converged {
                break;
            }
        }
        fit.rmsd(self.fixed, &self.assemble(&orders))
    }

    fn closest_order(&self, hs: &[usize], img: &[usize], fit: &Superposition) -> Vec<usize> {
        let cost = |order: &[usize]| -> f64 {
            hs.iter()
                .zip(order)
                .map(|(&h, &c)| (fit.apply(&self.candidate[c]) - self.reference[h]).norm_squared())
                .sum()
        };
        img.iter()
            .copied()
            .permutations(img.len())
            .min_by(|a, b| cost(a.as_slice()).total_cmp(&cost(b.as_slice())))
            .unwrap_or_else(|| img.to_vec())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::io::smiles::parse_mapped_smiles;
    use nalgebra::{Rotation3, Unit, Vector3};

    pub(crate) const NEOPENTANE: &str = concat!(
        "[C:1]([C:2]([H:6])([H:7])[H:8])([C:3]([H:9])([H:10])[H:11])",
        "([C:4]([H:12])([H:13])[H:14])[C:5]([H:15])([H:16])[H:17]",
    );

    /// A distorted neopentane conformer and the same conformer relabelled by a
    /// symmetry (methyls 2 and 5 exchanged with their hydrogens, two hydrogens
    /// of methyl 3 exchanged), then rotated and translated.
    pub(crate) fn relabeled_neopentane() -> (Vec<Point3<f64>>, Vec<Point3<f64>>) {
        let directions = [
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(1.0, -1.0, -1.0),
            Vector3::new(-1.0, 1.0, -1.0),
            Vector3::new(-1.0, -1.0, 1.0),
        ];
        let mut reference = vec![Point3::new(0.0, 0.0, 0.0); 17];
        for (m, direction) in directions.iter().enumerate() {
            let stretch = 1.50 + 0.03 * m as f64;
            let carbon = Point3::from(direction.normalize() * stretch);
            reference[1 + m] = carbon;
            for k in 0..3 {
                let tilt = Vector3::new(
                    0.4 * k as f64 - 0.4,
                    0.25 * m as f64 - 0.3,
                    0.6 - 0.35 * k as f64,
                );
                reference[5 + 3 * m + k] = carbon + (direction + tilt).normalize() * 1.09;
            }
        }

        let mut image: Vec<usize> = (0..17).collect();
        image.swap(1, 4);
        for k in 0..3 {
            image.swap(5 + k, 14 + k);
        }
        image.swap(8, 9);
        let rotation = Rotation3::from_axis_angle(
            &Unit::new_normalize(Vector3::new(0.3, -1.0, 0.7)),
            2.1,
        );
        let shift = Vector3::new(-3.0, 0.5, 12.0);
        let candidate = image.iter().map(|&a| rotation * reference[a] + shift).collect();
        (reference, candidate)
    }

    const WATER: &str = "[O:1]([H:2])[H:3]";
    // Methane: any permutation of the four hydrogens is an automorphism.
    const METHANE: &str = "[C:1]([H:2])([H:3])([H:4])[H:5]";

    #[test]
    fn classes_separate_inequivalent_atoms() {
        let ethanol =
            parse_mapped_smiles("[C:1]([C:2]([O:3][H:9])([H:7])[H:8])([H:4])([H:5])[H:6]")
                .unwrap();
        let classes = atom_classes(&ethanol);
        assert_eq!(classes[3], classes[4]);
        assert_eq!(classes[4], classes[5]);
        assert_eq!(classes[6], classes[7]);
        assert_ne!(classes[3], classes[6]);
        assert_ne!(classes[6], classes[8]);
        assert_ne!(classes[0], classes[1]);
    }

    #[test]
    fn enumerates_all_automorphisms_with_identity_first() {
        let water = parse_mapped_smiles(WATER).unwrap();
        let all = automorphisms(&water, &[0, 1, 2], 100);
        assert_eq!(all, vec![vec![0, 1, 2], vec![0, 2, 1]]);

        let methane = parse_mapped_smiles(METHANE).unwrap();
        assert_eq!(automorphisms(&methane, &[0, 1, 2, 3, 4], 1000).len(), 24);
        assert_eq!(automorphisms(&methane, &[0, 1, 2, 3, 4], 5).len(), 5);
        assert_eq!(automorphisms(&methane, &[0], 10), vec![vec![0]]);
    }

    #[test]
    fn bond_orders_restrict_automorphisms() {
        // Acetic acid: the two oxygens differ by bond order.
        let acid =
            parse_mapped_smiles("[C:1]([H:5])([H:6])([H:7])[C:2](=[O:3])[O:4][H:8]").unwrap();
        let heavy = acid.heavy_atom_indices();
        assert_eq!(automorphisms(&acid, &heavy, 100).len(), 1);
    }

    #[test]
    fn symmetric_rmsd_undoes_hydrogen_relabeling() {
        let water = parse_mapped_smiles(WATER).unwrap();
        let reference = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.96, 0.0, 0.0),
            Point3::new(-0.24, 0.93, 0.0),
        ];
        // Same geometry with the hydrogens swapped.
        let swapped = vec![reference[0], reference[2], reference[1]];
        let rmsd = symmetric_rmsd(&water, &reference, &swapped, &[0, 1, 2], 10).unwrap();
        assert!(rmsd < 1e-9);
        assert!(symmetric_rmsd(&water, &reference, &swapped[..2], &[0, 1, 2], 10).is_none());
    }

    #[test]
    fn hydrogens_are_grouped_by_parent() {
        let neopentane = parse_mapped_smiles(NEOPENTANE).unwrap();
        let all: Vec<usize> = (0..neopentane.len()).collect();
        let groups = terminal_hydrogens(&neopentane, &all);
        assert_eq!(groups.len(), 4);
        assert_eq!(groups[&1], vec![5, 6, 7]);
        assert_eq!(groups[&4], vec![14, 15, 16]);
        assert!(terminal_hydrogens(&neopentane, &neopentane.heavy_atom_indices()).is_empty());
    }

    #[test]
    fn relabeled_symmetric_molecule_beyond_the_cap_has_zero_rmsd() {
        let neopentane = parse_mapped_smiles(NEOPENTANE).unwrap();
        let all: Vec<usize> = (0..neopentane.len()).collect();
        // 24 carbon mappings times 6^4 hydrogen orderings exceeds the cap.
        let carbons = neopentane.heavy_atom_indices();
        assert_eq!(automorphisms(&neopentane, &carbons, 1000).len(), 24);
        let (reference, candidate) = relabeled_neopentane();
        for cap in [10_000, 100] {
            let rmsd = symmetric_rmsd(&neopentane, &reference, &candidate, &all, cap).unwrap();
            assert!(rmsd < 1e-6, "cap {}: rmsd {}", cap, rmsd);
        }
    }

    #[test]
    fn exhaustive_and_refined_matching_agree_on_small_molecules() {
        let methane = parse_mapped_smiles(METHANE).unwrap();
        let reference = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.63, 0.63, 0.63),
            Point3::new(0.63, -0.63, -0.63),
            Point3::new(-0.63, 0.63, -0.63),
            Point3::new(-0.63, -0.63, 0.63),
        ];
        // A three-fold rotation of the hydrogens, one of them slightly displaced.
        let mut candidate = vec![
            reference[0],
            reference[2],
            reference[3],
            reference[1],
            reference[4],
        ];
        candidate[2].x += 0.05;
        let all = [0, 1, 2, 3, 4];
        let exhaustive = symmetric_rmsd(&methane, &reference, &candidate, &all, 1000).unwrap();
        let refined = symmetric_rmsd(&methane, &reference, &candidate, &all, 1).unwrap();
        assert!(exhaustive < 0.05);
        assert!((exhaustive - refined).abs() < 1e-9);
    }
}
