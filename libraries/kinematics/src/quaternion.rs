//! Quaternion utilities.
//!
//! The canonical component order inside this crate is **W-first**
//! (`w, x, y, z`). Data coming from files or sensor callbacks must pass
//! through one of the named constructors ([`Quat::from_wxyz`],
//! [`Quat::from_xyzw`], [`Quat::from_components`]) so that the order is
//! converted exactly once, at the edge.
//!
//! Composition convention: `compose(a, b)` is the Hamilton product `a * b`.
//! Rotating a vector by the product applies `b` first and `a` second:
//!
//! ```
//! use kinematics::quaternion::{compose, rotate, Quat, Vec3};
//!
//! let a = Quat::from_axis_angle(&Vec3::z(), 0.3);
//! let b = Quat::from_axis_angle(&Vec3::x(), 1.1);
//! let v = Vec3::new(0.0, -0.4, 0.0);
//! let chained = rotate(&rotate(&v, b), a);
//! assert!((rotate(&v, compose(a, b)) - chained).norm() < 1e-12);
//! ```

use core::ops::Mul;

use nalgebra as na;

/// 3D vector type used for rest vectors and joint positions
pub type Vec3 = na::Vector3<f64>;

/// Quaternions with a norm below this value are degenerate and never rotate
pub const DEGENERATE_NORM: f64 = 1e-6;

/// Component order of a raw 4-tuple at a system boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ComponentOrder {
    /// Scalar first: `[w, x, y, z]`
    #[default]
    Wxyz,
    /// Scalar last: `[x, y, z, w]`
    Xyzw,
}

/// Orientation quaternion stored scalar-first
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quat {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Quat {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quat {
    /// Create a quaternion from scalar-first components
    pub const fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// The rotation that does nothing
    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Build from a `[w, x, y, z]` array
    pub fn from_wxyz(c: [f64; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }

    /// Build from an `[x, y, z, w]` array
    pub fn from_xyzw(c: [f64; 4]) -> Self {
        Self::new(c[3], c[0], c[1], c[2])
    }

    /// Build from a raw array whose order is declared by the caller
    pub fn from_components(c: [f64; 4], order: ComponentOrder) -> Self {
        match order {
            ComponentOrder::Wxyz => Self::from_wxyz(c),
            ComponentOrder::Xyzw => Self::from_xyzw(c),
        }
    }

    /// Components as `[w, x, y, z]`
    pub fn to_wxyz(&self) -> [f64; 4] {
        [self.w, self.x, self.y, self.z]
    }

    /// Components as `[x, y, z, w]`
    pub fn to_xyzw(&self) -> [f64; 4] {
        [self.x, self.y, self.z, self.w]
    }

    /// Rotation of `angle` radians about `axis` (right-hand rule).
    ///
    /// A zero axis yields the identity.
    pub fn from_axis_angle(axis: &Vec3, angle: f64) -> Self {
        match na::Unit::try_new(*axis, DEGENERATE_NORM) {
            Some(axis) => na::UnitQuaternion::from_axis_angle(&axis, angle).into(),
            None => Self::identity(),
        }
    }

    /// Vector (imaginary) part
    pub fn vector(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Euclidean norm over all four components
    pub fn norm(&self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// True if this quaternion must not be used for rotation
    pub fn is_degenerate(&self) -> bool {
        let n = self.norm();
        !n.is_finite() || n < DEGENERATE_NORM
    }

    /// Unit-norm copy, or `None` if degenerate
    pub fn normalized(&self) -> Option<Self> {
        normalize(*self)
    }

    /// Conjugate, the inverse of a unit quaternion
    pub fn conjugate(&self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Angle in radians of the rotation taking `self` onto `other`.
    ///
    /// Returns `None` if either side is degenerate.
    pub fn angle_to(&self, other: &Quat) -> Option<f64> {
        let a = self.normalized()?;
        let b = other.normalized()?;
        let dot = (a.w * b.w + a.x * b.x + a.y * b.y + a.z * b.z).abs();
        Some(2.0 * dot.min(1.0).acos())
    }

    /// True if this rotates by at most `tolerance` radians (q and -q alike).
    /// Degenerate quaternions are never the identity.
    pub fn is_identity(&self, tolerance: f64) -> bool {
        match self.normalized() {
            // atan2 keeps full precision for tiny angles, unlike acos(w)
            Some(q) => 2.0 * q.vector().norm().atan2(q.w.abs()) <= tolerance,
            None => false,
        }
    }

    /// nalgebra quaternion with the same components
    pub fn to_quaternion(&self) -> na::Quaternion<f64> {
        na::Quaternion::new(self.w, self.x, self.y, self.z)
    }

    /// nalgebra unit quaternion, or `None` if degenerate
    pub fn to_unit_quaternion(&self) -> Option<na::UnitQuaternion<f64>> {
        self.normalized()
            .map(|q| na::UnitQuaternion::new_unchecked(q.to_quaternion()))
    }
}

impl From<na::Quaternion<f64>> for Quat {
    fn from(q: na::Quaternion<f64>) -> Self {
        Self::new(q.w, q.i, q.j, q.k)
    }
}

impl From<na::UnitQuaternion<f64>> for Quat {
    fn from(q: na::UnitQuaternion<f64>) -> Self {
        q.into_inner().into()
    }
}

impl Mul for Quat {
    type Output = Quat;

    fn mul(self, rhs: Quat) -> Quat {
        compose(self, rhs)
    }
}

/// Divide `q` by its norm.
///
/// Returns `None` when the norm is below [`DEGENERATE_NORM`] or not finite;
/// the caller picks the fallback.
pub fn normalize(q: Quat) -> Option<Quat> {
    if q.is_degenerate() {
        return None;
    }
    let n = q.norm();
    Some(Quat::new(q.w / n, q.x / n, q.y / n, q.z / n))
}

/// Rotate `v` by `q`.
///
/// `q` is normalized first. A degenerate `q` rotates as the identity, so the
/// result is always finite for a finite `v`.
pub fn rotate(v: &Vec3, q: Quat) -> Vec3 {
    let Some(q) = normalize(q) else {
        return *v;
    };
    let qv = q.vector();
    // v' = v + w t + q_vec x t, with t = 2 (q_vec x v)
    let t = 2.0 * qv.cross(v);
    v + q.w * t + qv.cross(&t)
}

/// Hamilton product `a * b`: apply `b`, then `a`.
pub fn compose(a: Quat, b: Quat) -> Quat {
    (a.to_quaternion() * b.to_quaternion()).into()
}

/// Inverse of a unit quaternion (its conjugate)
pub fn inverse(q: Quat) -> Quat {
    q.conjugate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use core::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    fn sample_rotations() -> Vec<Quat> {
        let axes = [
            Vec3::x(),
            Vec3::y(),
            Vec3::z(),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-0.3, 0.8, 0.5),
            Vec3::new(2.0, -1.0, 3.0),
        ];
        let angles = [0.0, 0.1, FRAC_PI_4, FRAC_PI_2, 2.0, 3.1, -1.3];
        axes.iter()
            .flat_map(|axis| angles.iter().map(move |&a| Quat::from_axis_angle(axis, a)))
            .collect()
    }

    #[test]
    fn test_component_order_conversions() {
        let q = Quat::from_xyzw([0.1, 0.2, 0.3, 0.9]);
        assert_eq!(q, Quat::new(0.9, 0.1, 0.2, 0.3));
        assert_eq!(q.to_wxyz(), [0.9, 0.1, 0.2, 0.3]);
        assert_eq!(q.to_xyzw(), [0.1, 0.2, 0.3, 0.9]);
        assert_eq!(Quat::from_components(q.to_xyzw(), ComponentOrder::Xyzw), q);
        assert_eq!(Quat::from_components(q.to_wxyz(), ComponentOrder::Wxyz), q);
    }

    #[test]
    fn test_normalize() {
        let q = normalize(Quat::new(2.0, 0.0, 0.0, 0.0)).unwrap();
        assert_eq!(q, Quat::identity());

        let q = normalize(Quat::new(1.0, 1.0, 1.0, 1.0)).unwrap();
        assert_relative_eq!(q.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(q.w, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_degenerate() {
        assert!(normalize(Quat::new(0.0, 0.0, 0.0, 0.0)).is_none());
        assert!(normalize(Quat::new(1e-7, 0.0, 0.0, 0.0)).is_none());
        assert!(normalize(Quat::new(f64::NAN, 0.0, 0.0, 1.0)).is_none());
        assert!(normalize(Quat::new(f64::INFINITY, 0.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_rotate_preserves_norm() {
        let vectors = [
            Vec3::new(0.0, -0.4, 0.0),
            Vec3::new(0.35, 0.0, 0.0),
            Vec3::new(1.0, -2.0, 3.5),
            Vec3::new(-1e-3, 4e-3, 2e-3),
        ];
        for q in sample_rotations() {
            for v in &vectors {
                let r = rotate(v, q);
                assert_relative_eq!(r.norm(), v.norm(), max_relative = 1e-9);
            }
        }
    }

    #[test]
    fn test_rotate_matches_nalgebra() {
        let v = Vec3::new(0.2, -0.4, 0.7);
        for q in sample_rotations() {
            let expected = q.to_unit_quaternion().unwrap() * v;
            assert_relative_eq!(rotate(&v, q), expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rotate_normalizes_input() {
        let v = Vec3::new(0.0, -0.4, 0.0);
        let unit = Quat::from_axis_angle(&Vec3::z(), 0.7);
        let scaled = Quat::new(unit.w * 3.0, unit.x * 3.0, unit.y * 3.0, unit.z * 3.0);
        assert_relative_eq!(rotate(&v, scaled), rotate(&v, unit), epsilon = 1e-12);
    }

    #[test]
    fn test_rotate_degenerate_is_identity() {
        let v = Vec3::new(0.3, -0.4, 0.5);
        let r = rotate(&v, Quat::new(0.0, 0.0, 0.0, 0.0));
        assert_eq!(r, v);
        assert!(r.iter().all(|c| c.is_finite()));

        let r = rotate(&v, Quat::new(f64::NAN, 1.0, 0.0, 0.0));
        assert_eq!(r, v);
    }

    #[test]
    fn test_rotate_identity() {
        let v = Vec3::new(0.3, -0.4, 0.5);
        assert_eq!(rotate(&v, Quat::identity()), v);
    }

    #[test]
    fn test_quarter_turn_about_z() {
        // [cos 45, 0, 0, sin 45] turns -Y onto +X
        let q = Quat::from_wxyz([FRAC_PI_4.cos(), 0.0, 0.0, FRAC_PI_4.sin()]);
        let r = rotate(&Vec3::new(0.0, -0.4, 0.0), q);
        assert_relative_eq!(r, Vec3::new(0.4, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_compose_applies_right_operand_first() {
        let v = Vec3::new(0.0, -0.35, 0.1);
        let rotations = sample_rotations();
        for a in rotations.iter().step_by(5) {
            for b in rotations.iter().step_by(3) {
                let chained = rotate(&rotate(&v, *b), *a);
                assert_relative_eq!(rotate(&v, compose(*a, *b)), chained, epsilon = 1e-12);
                assert_eq!(*a * *b, compose(*a, *b));
            }
        }
    }

    #[test]
    fn test_compose_with_inverse_is_identity() {
        for q in sample_rotations() {
            assert!(compose(q, inverse(q)).is_identity(1e-12));
            assert!(compose(inverse(q), q).is_identity(1e-12));
        }
    }

    #[test]
    fn test_is_identity_is_an_angle_bound() {
        let small = Quat::from_axis_angle(&Vec3::new(1.0, 2.0, -1.0), 1e-3);
        assert!(small.is_identity(2e-3));
        assert!(!small.is_identity(5e-4));
        assert!(Quat::new(-2.0, 0.0, 0.0, 0.0).is_identity(0.0));
        assert!(!Quat::new(0.0, 0.0, 0.0, 0.0).is_identity(1.0));
    }

    #[test]
    fn test_from_axis_angle_zero_axis() {
        assert_eq!(Quat::from_axis_angle(&Vec3::zeros(), 1.0), Quat::identity());
    }

    #[test]
    fn test_angle_to() {
        let a = Quat::identity();
        let b = Quat::from_axis_angle(&Vec3::y(), FRAC_PI_2);
        assert_relative_eq!(a.angle_to(&b).unwrap(), FRAC_PI_2, epsilon = 1e-12);
        // q and -q are the same orientation
        let neg = Quat::new(-b.w, -b.x, -b.y, -b.z);
        assert_relative_eq!(b.angle_to(&neg).unwrap(), 0.0, epsilon = 1e-6);
        assert!(a.angle_to(&Quat::new(0.0, 0.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_nalgebra_round_trip() {
        let q = Quat::from_axis_angle(&Vec3::new(1.0, 2.0, 3.0), 0.8);
        let back: Quat = q.to_unit_quaternion().unwrap().into();
        assert_relative_eq!(
            na::Vector4::from(back.to_wxyz()),
            na::Vector4::from(q.to_wxyz()),
            epsilon = 1e-12
        );
        assert!(Quat::new(0.0, 0.0, 0.0, 0.0).to_unit_quaternion().is_none());
    }
}
