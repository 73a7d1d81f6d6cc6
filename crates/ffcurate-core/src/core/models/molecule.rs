use super::element::Element;
use itertools::Itertools;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
}

#[derive(Debug, Error)]
#[error("Invalid bond order string")]
pub struct ParseBondOrderError;

impl FromStr for BondOrder {
    type Err = ParseBondOrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1" | "-" | "single" => Ok(Self::Single),
            "2" | "=" | "double" => Ok(Self::Double),
            "3" | "#" | "triple" => Ok(Self::Triple),
            ":" | "ar" | "aromatic" => Ok(Self::Aromatic),
            _ => Err(ParseBondOrderError),
        }
    }
}

impl fmt::Display for BondOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Single => "Single",
                Self::Double => "Double",
                Self::Triple => "Triple",
                Self::Aromatic => "Aromatic",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bond {
    pub i: usize,
    pub j: usize,
    pub order: BondOrder,
}

impl Bond {
    pub fn new(i: usize, j: usize, order: BondOrder) -> Self {
        Self { i, j, order }
    }

    pub fn contains(&self, atom: usize) -> bool {
        self.i == atom || self.j == atom
    }

    pub fn other(&self, atom: usize) -> Option<usize> {
        if self.i == atom {
            Some(self.j)
        } else if self.j == atom {
            Some(self.i)
        } else {
            None
        }
    }

    /// The bond's atom pair with the lower index first.
    pub fn key(&self) -> (usize, usize) {
        ordered_pair(self.i, self.j)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub element: Element,
    pub formal_charge: i8,
    pub aromatic: bool,
    /// Atom-map number from the descriptor, if any.
    pub map_number: Option<u32>,
}

impl Atom {
    pub fn new(element: Element) -> Self {
        Self {
            element,
            formal_charge: 0,
            aromatic: false,
            map_number: None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoleculeError {
    #[error("Bond {i}-{j} references an atom outside the molecule ({n_atoms} atoms)")]
    BondOutOfRange { i: usize, j: usize, n_atoms: usize },
    #[error("Atom {0} is bonded to itself")]
    SelfBond(usize),
    #[error("Duplicate bond between atoms {0} and {1}")]
    DuplicateBond(usize, usize),
}

/// Molecular graph parsed from an atom-mapped descriptor.
///
/// Atom indices follow the descriptor's atom-map order, so they line up with
/// the coordinate rows of any conformer of the same record. Adjacency and ring
/// membership are computed once on construction; the value is immutable
/// afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Molecule {
    ident: String,
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    adjacency: Vec<Vec<usize>>,
    ring_bonds: HashSet<(usize, usize)>,
}

impl Molecule {
    pub fn new(ident: &str, atoms: Vec<Atom>, bonds: Vec<Bond>) -> Result<Self, MoleculeError> {
        let n_atoms = atoms.len();
        let mut adjacency = vec![Vec::new(); n_atoms];
        let mut seen = HashSet::new();
        for bond in &bonds {
            if bond.i >= n_atoms || bond.j >= n_atoms {
                return Err(MoleculeError::BondOutOfRange {
                    i: bond.i,
                    j: bond.j,
                    n_atoms,
                });
            }
            if bond.i == bond.j {
                return Err(MoleculeError::SelfBond(bond.i));
            }
            if !seen.insert(bond.key()) {
                return Err(MoleculeError::DuplicateBond(bond.i, bond.j));
            }
            adjacency[bond.i].push(bond.j);
            adjacency[bond.j].push(bond.i);
        }
        for neighbors in &mut adjacency {
            neighbors.sort_unstable();
        }

        let mut molecule = Self {
            ident: ident.to_string(),
            atoms,
            bonds,
            adjacency,
            ring_bonds: HashSet::new(),
        };
        molecule.ring_bonds = molecule.find_ring_bonds();
        Ok(molecule)
    }

    /// The descriptor this molecule was built from.
    pub fn ident(&self) -> &str {
        &self.ident
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn neighbors(&self, index: usize) -> &[usize] {
        self.adjacency.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn degree(&self, index: usize) -> usize {
        self.neighbors(index).len()
    }

    pub fn bond_between(&self, a: usize, b: usize) -> Option<&Bond> {
        if !self.neighbors(a).contains(&b) {
            return None;
        }
        let key = ordered_pair(a, b);
        self.bonds.iter().find(|bond| bond.key() == key)
    }

    pub fn is_heavy(&self, index: usize) -> bool {
        self.atoms
            .get(index)
            .is_some_and(|atom| !atom.element.is_hydrogen())
    }

    pub fn heavy_atom_indices(&self) -> Vec<usize> {
        (0..self.atoms.len()).filter(|&i| self.is_heavy(i)).collect()
    }

    pub fn heavy_atom_count(&self) -> usize {
        self.atoms
            .iter()
            .filter(|atom| !atom.element.is_hydrogen())
            .count()
    }

    /// Returns `None` when the two atoms are not bonded.
    pub fn is_ring_bond(&self, a: usize, b: usize) -> Option<bool> {
        self.bond_between(a, b)
            .map(|bond| self.ring_bonds.contains(&bond.key()))
    }

    /// Whether all three bonds of the torsion `i-j-k-l` lie on a ring.
    ///
    /// Returns `None` when any consecutive pair is not bonded.
    pub fn torsion_in_ring(&self, indices: [usize; 4]) -> Option<bool> {
        let [i, j, k, l] = indices;
        Some(
            self.is_ring_bond(i, j)?
                && self.is_ring_bond(j, k)?
                && self.is_ring_bond(k, l)?,
        )
    }

    /// All bond angles `i-j-k` with `j` as the vertex and `i < k`.
    pub fn angles(&self) -> Vec<[usize; 3]> {
        let mut angles = Vec::new();
        for (center, neighbors) in self.adjacency.iter().enumerate() {
            for (&a, &b) in neighbors.iter().tuple_combinations() {
                angles.push([a, center, b]);
            }
        }
        angles
    }

    /// All proper torsions `i-j-k-l`, each listed once.
    pub fn proper_torsions(&self) -> Vec<[usize; 4]> {
        let mut torsions = Vec::new();
        for bond in &self.bonds {
            let (j, k) = (bond.i, bond.j);
            for &i in self.neighbors(j).iter().filter(|&&i| i != k) {
                for &l in self.neighbors(k).iter().filter(|&&l| l != j && l != i) {
                    torsions.push([i, j, k, l]);
                }
            }
        }
        torsions
    }

    /// Improper torsions as `[center, a, b, c]` for every trivalent atom.
    pub fn impropers(&self) -> Vec<[usize; 4]> {
        self.adjacency
            .iter()
            .enumerate()
            .filter(|(_, neighbors)| neighbors.len() == 3)
            .map(|(center, n)| [center, n[0], n[1], n[2]])
            .collect()
    }

    /// Breadth-first topological distances from `start`; unreachable atoms get `None`.
    pub fn topological_distances(&self, start: usize) -> Vec<Option<usize>> {
        let mut distances = vec![None; self.atoms.len()];
        if start >= self.atoms.len() {
            return distances;
        }
        let mut queue = VecDeque::from([start]);
        distances[start] = Some(0);
        while let Some(current) = queue.pop_front() {
            let next = distances[current].unwrap_or(0) + 1;
            for &neighbor in self.neighbors(current) {
                if distances[neighbor].is_none() {
                    distances[neighbor] = Some(next);
                    queue.push_back(neighbor);
                }
            }
        }
        distances
    }

    // A bond is a ring bond iff its endpoints stay connected once it is removed.
    fn find_ring_bonds(&self) -> HashSet<(usize, usize)> {
        self.bonds
            .iter()
            .filter(|bond| self.connected_without(bond.i, bond.j))
            .map(Bond::key)
            .collect()
    }

    fn connected_without(&self, from: usize, to: usize) -> bool {
        let mut visited = vec![false; self.atoms.len()];
        let mut queue = VecDeque::from([from]);
        visited[from] = true;
        while let Some(current) = queue.pop_front() {
            for &neighbor in self.neighbors(current) {
                if current == from && neighbor == to {
                    continue;
                }
                if neighbor == to {
                    return true;
                }
                if !visited[neighbor] {
                    visited[neighbor] = true;
                    queue.push_back(neighbor);
                }
            }
        }
        false
    }
}

pub(crate) fn ordered_pair(a: usize, b: usize) -> (usize, usize) {
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cyclopropane_with_methyl() -> Molecule {
        // C0-C1-C2 ring, C3 hanging off C0.
        let atoms = (0..4).map(|_| Atom::new(Element::C)).collect();
        let bonds = vec![
            Bond::new(0, 1, BondOrder::Single),
            Bond::new(1, 2, BondOrder::Single),
            Bond::new(2, 0, BondOrder::Single),
            Bond::new(0, 3, BondOrder::Single),
        ];
        Molecule::new("test", atoms, bonds).unwrap()
    }

    #[test]
    fn bond_order_from_str_parses_valid_strings() {
        assert_eq!("1".parse::<BondOrder>().unwrap(), BondOrder::Single);
        assert_eq!("=".parse::<BondOrder>().unwrap(), BondOrder::Double);
        assert_eq!("triple".parse::<BondOrder>().unwrap(), BondOrder::Triple);
        assert_eq!(":".parse::<BondOrder>().unwrap(), BondOrder::Aromatic);
        assert!("quadruple".parse::<BondOrder>().is_err());
    }

    #[test]
    fn bond_other_returns_partner_or_none() {
        let bond = Bond::new(2, 5, BondOrder::Double);
        assert_eq!(bond.other(2), Some(5));
        assert_eq!(bond.other(5), Some(2));
        assert_eq!(bond.other(7), None);
        assert_eq!(Bond::new(5, 2, BondOrder::Single).key(), (2, 5));
    }

    #[test]
    fn ring_bonds_are_detected() {
        let mol = cyclopropane_with_methyl();
        assert_eq!(mol.is_ring_bond(0, 1), Some(true));
        assert_eq!(mol.is_ring_bond(2, 0), Some(true));
        assert_eq!(mol.is_ring_bond(0, 3), Some(false));
        assert_eq!(mol.is_ring_bond(1, 3), None);
    }

    #[test]
    fn torsion_in_ring_requires_all_three_bonds_on_ring() {
        let mol = cyclopropane_with_methyl();
        assert_eq!(mol.torsion_in_ring([3, 0, 1, 2]), Some(false));
        assert_eq!(mol.torsion_in_ring([2, 0, 1, 2]), Some(true));
        assert_eq!(mol.torsion_in_ring([3, 1, 0, 2]), None);
    }

    #[test]
    fn internal_coordinates_are_enumerated() {
        let mol = cyclopropane_with_methyl();
        // C0 has 3 neighbours (3 angles), C1 and C2 have 2 (1 angle each).
        assert_eq!(mol.angles().len(), 5);
        assert_eq!(mol.impropers(), vec![[0, 1, 2, 3]]);
        let torsions = mol.proper_torsions();
        assert!(torsions.contains(&[3, 0, 1, 2]));
        assert!(torsions.iter().all(|t| t[0] != t[3]));
    }

    #[test]
    fn rejects_invalid_bonds() {
        let atoms = vec![Atom::new(Element::C), Atom::new(Element::O)];
        assert_eq!(
            Molecule::new("x", atoms.clone(), vec![Bond::new(0, 2, BondOrder::Single)]),
            Err(MoleculeError::BondOutOfRange {
                i: 0,
                j: 2,
                n_atoms: 2
            })
        );
        assert_eq!(
            Molecule::new("x", atoms.clone(), vec![Bond::new(1, 1, BondOrder::Single)]),
            Err(MoleculeError::SelfBond(1))
        );
        assert_eq!(
            Molecule::new(
                "x",
                atoms,
                vec![
                    Bond::new(0, 1, BondOrder::Single),
                    Bond::new(1, 0, BondOrder::Double)
                ]
            ),
            Err(MoleculeError::DuplicateBond(1, 0))
        );
    }

    #[test]
    fn heavy_atoms_and_distances() {
        let atoms = vec![
            Atom::new(Element::O),
            Atom::new(Element::H),
            Atom::new(Element::H),
        ];
        let bonds = vec![
            Bond::new(0, 1, BondOrder::Single),
            Bond::new(0, 2, BondOrder::Single),
        ];
        let water = Molecule::new("[O:1]([H:2])[H:3]", atoms, bonds).unwrap();
        assert_eq!(water.heavy_atom_count(), 1);
        assert_eq!(water.heavy_atom_indices(), vec![0]);
        assert_eq!(
            water.topological_distances(1),
            vec![Some(1), Some(0), Some(2)]
        );
    }
}
