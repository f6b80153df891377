//! Ray-primitive intersection algorithms.
//!
//! Each primitive kind has a dedicated intersector; [`intersect_primitive`]
//! dispatches on the object's kind and applies self-exclusion.

mod motion_triangle;
mod triangle;

pub use motion_triangle::intersect_motion_triangle;
pub use triangle::intersect_triangle;

use crate::object::Object;
use crate::ray::{Intersection, ObjectId, PrimRef, PrimitiveKind};
use crate::Ray;

/// Result of a ray-triangle test before it is tagged with its primitive.
#[derive(Debug, Clone, Copy)]
pub struct TriangleHit {
    /// Parameter along the ray.
    pub t: f64,
    /// Barycentric weight of the second vertex.
    pub u: f64,
    /// Barycentric weight of the third vertex.
    pub v: f64,
}

/// Intersect a ray with triangle `prim` of object `id`.
///
/// Returns `None` when the primitive is the ray's excluded primitive or is
/// not hit in `[ray.tmin, tmax]`.
pub fn intersect_primitive(
    ray: &Ray,
    object: &Object,
    id: ObjectId,
    prim: u32,
    tmax: f64,
) -> Option<Intersection> {
    if ray.self_prim == Some(PrimRef::new(id, prim)) {
        return None;
    }
    let kind = object.primitive_kind();
    let hit = match kind {
        PrimitiveKind::Triangle => {
            let verts = object.triangle_vertices(prim, kind, ray.time);
            intersect_triangle(ray, &verts, tmax)
        }
        PrimitiveKind::MotionTriangle => intersect_motion_triangle(ray, object, prim, tmax),
    }?;
    Some(Intersection {
        t: hit.t,
        u: hit.u,
        v: hit.v,
        object: id,
        prim,
        kind,
    })
}
