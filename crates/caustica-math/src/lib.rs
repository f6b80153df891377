#![warn(missing_docs)]

//! Math types for the caustica rendering kernel.
//!
//! Thin wrappers around nalgebra providing the handful of types the
//! intersection and manifold-walk code needs: points, vectors, directions,
//! affine transforms, packed 2x2 blocks and local frame helpers.

use nalgebra::{Matrix2, Matrix3, Matrix4, Unit, Vector2, Vector3, Vector4};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in 2D parameter space.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in 2D space.
pub type Vec2 = Vector2<f64>;

/// A 2x2 block, built row-major with `Mat22::new(xx, xy, yx, yy)`.
pub type Mat22 = Matrix2<f64>;

/// Invert a 2x2 block.
///
/// Returns `None` when `|det| < min_determinant`, otherwise the inverse
/// together with the determinant of `m`.
#[inline]
pub fn mat22_inverse(m: &Mat22, min_determinant: f64) -> Option<(Mat22, f64)> {
    let det = m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)];
    if det.abs() < min_determinant {
        return None;
    }
    let inv = Mat22::new(m[(1, 1)], -m[(0, 1)], -m[(1, 0)], m[(0, 0)]) / det;
    Some((inv, det))
}

/// Build a 2x2 block from two tangent derivatives projected onto `(s, t)`.
///
/// Row 0 holds the `s` components, row 1 the `t` components; column 0 is the
/// derivative along `u`, column 1 along `v`.
#[inline]
pub fn mat22_project(d_du: &Vec3, d_dv: &Vec3, s: &Vec3, t: &Vec3) -> Mat22 {
    Mat22::new(d_du.dot(s), d_dv.dot(s), d_du.dot(t), d_dv.dot(t))
}

/// Build two unit vectors orthogonal to `n` and to each other.
///
/// The result depends only on `n`, so two frames built from the same normal
/// are identical regardless of how the surface was parameterized.
/// `a.cross(&b)` equals `n` for unit `n`.
pub fn make_orthonormals(n: &Vec3) -> (Vec3, Vec3) {
    let a = if n.x != n.y || n.x != n.z {
        Vec3::new(n.z - n.y, n.x - n.z, n.y - n.x)
    } else {
        Vec3::new(n.z - n.y, n.x + n.z, -n.y - n.x)
    };
    let a = safe_normalize(&a);
    let b = n.cross(&a);
    (a, b)
}

/// Normalize `v`, returning the zero vector when its length is zero.
#[inline]
pub fn safe_normalize(v: &Vec3) -> Vec3 {
    let len = v.norm();
    if len > 0.0 {
        v / len
    } else {
        Vec3::zeros()
    }
}

/// Normalize `v` and return its original length alongside.
#[inline]
pub fn normalize_len(v: &Vec3) -> (Vec3, f64) {
    let len = v.norm();
    if len > 0.0 {
        (v / len, len)
    } else {
        (Vec3::zeros(), 0.0)
    }
}

/// The next representable `f64` above a non-negative ray distance.
///
/// Used to restart a ray just past a surface it already hit.
#[inline]
pub fn next_ray_distance(t: f64) -> f64 {
    if t.is_finite() && t >= 0.0 {
        f64::from_bits(t.to_bits() + 1)
    } else {
        t
    }
}

/// A 4x4 affine transformation matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            matrix: Matrix4::new_translation(&Vec3::new(dx, dy, dz)),
        }
    }

    /// Non-uniform scale by `(sx, sy, sz)`.
    pub fn scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            matrix: Matrix4::new_nonuniform_scaling(&Vec3::new(sx, sy, sz)),
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }

    /// Upper-left 3x3 block.
    pub fn linear(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Inverse transpose of the linear part, used for normals.
    ///
    /// A degenerate transform yields the identity so normals pass through.
    pub fn normal_matrix(&self) -> Matrix3<f64> {
        self.linear()
            .try_inverse()
            .map(|inv| inv.transpose())
            .unwrap_or_else(Matrix3::identity)
    }

    /// Whether the transform flips orientation (negative determinant).
    pub fn is_mirroring(&self) -> bool {
        self.linear().determinant() < 0.0
    }

    /// Inverse of this transform, if it exists.
    pub fn inverse(&self) -> Option<Self> {
        self.matrix.try_inverse().map(|matrix| Self { matrix })
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
