//! Ray intersection with keyframed triangles.

use super::{intersect_triangle, TriangleHit};
use crate::object::Object;
use crate::ray::PrimitiveKind;
use crate::Ray;

/// Intersect a ray with triangle `prim` of `object` as it stands at
/// `ray.time`.
pub fn intersect_motion_triangle(
    ray: &Ray,
    object: &Object,
    prim: u32,
    tmax: f64,
) -> Option<TriangleHit> {
    let verts = object.triangle_vertices(prim, PrimitiveKind::MotionTriangle, ray.time);
    intersect_triangle(ray, &verts, tmax)
}
