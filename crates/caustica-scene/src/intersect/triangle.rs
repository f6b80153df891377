//! Ray-triangle intersection.

use caustica_math::Point3;

use super::TriangleHit;
use crate::Ray;

/// Determinants smaller than this are treated as rays parallel to the plane.
const PARALLEL_EPSILON: f64 = 1e-14;

/// Intersect a ray with a triangle using the Möller-Trumbore algorithm.
///
/// Hits are accepted in `[ray.tmin, tmax]`; `u` weights `verts[1]` and `v`
/// weights `verts[2]`. Both faces are hit.
pub fn intersect_triangle(ray: &Ray, verts: &[Point3; 3], tmax: f64) -> Option<TriangleHit> {
    let e1 = verts[1] - verts[0];
    let e2 = verts[2] - verts[0];
    let d = ray.direction.as_ref();

    let pvec = d.cross(&e2);
    let det = e1.dot(&pvec);
    if det.abs() < PARALLEL_EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;

    let tvec = ray.origin - verts[0];
    let u = tvec.dot(&pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let qvec = tvec.cross(&e1);
    let v = d.dot(&qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = e2.dot(&qvec) * inv_det;
    if t < ray.tmin || t > tmax {
        return None;
    }

    Some(TriangleHit { t, u, v })
}
