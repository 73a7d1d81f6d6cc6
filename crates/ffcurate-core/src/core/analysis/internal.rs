use crate::core::models::molecule::Molecule;
use crate::core::utils::geometry::{
    angle_degrees, dihedral_degrees, distance, periodic_difference_degrees,
};
use nalgebra::Point3;
use serde::Serialize;

/// RMS deviations of internal coordinates between two conformers.
///
/// Bonds are in Angstroms; angles, dihedrals, and impropers in degrees.
/// A field is `None` when the molecule has no term of that kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct InternalCoordinateRmsd {
    pub bond: Option<f64>,
    pub angle: Option<f64>,
    pub dihedral: Option<f64>,
    pub improper: Option<f64>,
}

fn rms(deviations: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = deviations.fold((0.0, 0usize), |(sum, n), d| (sum + d * d, n + 1));
    (n > 0).then(|| (sum / n as f64).sqrt())
}

/// Improper angle of `[center, a, b, c]`, measured as the `center-a-b-c` dihedral.
pub fn improper_degrees(coords: &[Point3<f64>], improper: [usize; 4]) -> f64 {
    let [center, a, b, c] = improper;
    dihedral_degrees(&coords[center], &coords[a], &coords[b], &coords[c])
}

pub fn internal_coordinate_rmsd(
    molecule: &Molecule,
    reference: &[Point3<f64>],
    candidate: &[Point3<f64>],
) -> InternalCoordinateRmsd {
    let bond = rms(molecule.bonds().iter().map(|b| {
        distance(&candidate[b.i], &candidate[b.j]) - distance(&reference[b.i], &reference[b.j])
    }));
    let angle = rms(molecule.angles().into_iter().map(|[i, j, k]| {
        angle_degrees(&candidate[i], &candidate[j], &candidate[k])
            - angle_degrees(&reference[i], &reference[j], &reference[k])
    }));
    let dihedral = rms(molecule.proper_torsions().into_iter().map(|[i, j, k, l]| {
        periodic_difference_degrees(
            dihedral_degrees(&reference[i], &reference[j], &reference[k], &reference[l]),
            dihedral_degrees(&candidate[i], &candidate[j], &candidate[k], &candidate[l]),
        )
    }));
    let improper = rms(molecule.impropers().into_iter().map(|improper| {
        periodic_difference_degrees(
            improper_degrees(reference, improper),
            improper_degrees(candidate, improper),
        )
    }));
    InternalCoordinateRmsd {
        bond,
        angle,
        dihedral,
        improper,
    }
}
