use nalgebra::{Matrix3, Point3, Vector3};

pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum: Vector3<f64> = points.iter().map(|p| p.coords).sum();
    Some(Point3::from(sum / points.len() as f64))
}

pub fn all_finite(points: &[Point3<f64>]) -> bool {
    points.iter().all(|p| p.coords.iter().all(|c| c.is_finite()))
}

/// Rigid transform that superposes a mobile point set onto a reference (Kabsch).
///
/// Reflections are excluded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Superposition {
    rotation: Matrix3<f64>,
    mobile_center: Point3<f64>,
    reference_center: Point3<f64>,
}

impl Superposition {
    /// Returns `None` for empty or mismatched inputs.
    pub fn fit(reference: &[Point3<f64>], mobile: &[Point3<f64>]) -> Option<Self> {
        if reference.len() != mobile.len() {
            return None;
        }
        let reference_center = centroid(reference)?;
        let mobile_center = centroid(mobile)?;

        let mut covariance = Matrix3::zeros();
        for (m, r) in mobile.iter().zip(reference) {
            covariance += (m - mobile_center) * (r - reference_center).transpose();
        }

        let svd = covariance.svd(true, true);
        let u = svd.u?;
        let v = svd.v_t?.transpose();
        let d = (v * u.transpose()).determinant().signum();
        let correction = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, d));
        Some(Self {
            rotation: v * correction * u.transpose(),
            mobile_center,
            reference_center,
        })
    }

    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        self.reference_center + self.rotation * (point - self.mobile_center)
    }

    /// RMSD between `reference` and `mobile` once `mobile` is transformed.
    pub fn rmsd(&self, reference: &[Point3<f64>], mobile: &[Point3<f64>]) -> Option<f64> {
        if reference.len() != mobile.len() || reference.is_empty() {
            return None;
        }
        let squared_dist_sum: f64 = mobile
            .iter()
            .zip(reference)
            .map(|(m, r)| (self.apply(m) - r).norm_squared())
            .sum();
        Some((squared_dist_sum / reference.len() as f64).sqrt())
    }
}

/// RMSD after optimal rigid superposition of `mobile` onto `reference`.
///
/// Returns `None` for empty or mismatched inputs.
pub fn superposed_rmsd(reference: &[Point3<f64>], mobile: &[Point3<f64>]) -> Option<f64> {
    Superposition::fit(reference, mobile)?.rmsd(reference, mobile)
}

pub fn distance(a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    (a - b).norm()
}

/// Angle `a-b-c` at vertex `b`, in degrees.
pub fn angle_degrees(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    let ba = a - b;
    let bc = c - b;
    let cos = ba.dot(&bc) / (ba.norm() * bc.norm());
    cos.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Signed dihedral `a-b-c-d` in degrees, in `(-180, 180]`.
pub fn dihedral_degrees(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    d: &Point3<f64>,
) -> f64 {
    let b1 = b - a;
    let b2 = c - b;
    let b3 = d - c;
    let n1 = b1.cross(&b2);
    let n2 = b2.cross(&b3);
    let m1 = n1.cross(&b2.normalize());
    let x = n1.dot(&n2);
    let y = m1.dot(&n2);
    let angle = y.atan2(x).to_degrees();
    // atan2 puts the cis/trans boundary at -180; report it as +180.
    if angle <= -180.0 { angle + 360.0 } else { angle }
}

/// Smallest signed difference `b - a` between two angles, in `[-180, 180]`.
pub fn periodic_difference_degrees(a: f64, b: f64) -> f64 {
    let diff = (b - a).rem_euclid(360.0);
    if diff > 180.0 { diff - 360.0 } else { diff }
}
