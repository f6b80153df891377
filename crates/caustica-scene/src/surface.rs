//! Shading points reconstructed from ray hits.

use caustica_math::{Point3, Vec3};

use crate::ray::{ObjectId, PrimRef, PrimitiveKind};

/// Local geometry at a ray hit, as handed to shaders and integrators.
///
/// `n` and `ng` face the incoming ray; `backfacing` records whether they
/// were flipped to do so.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePoint {
    /// World-space position.
    pub p: Point3,
    /// Geometric normal.
    pub ng: Vec3,
    /// Shading normal.
    pub n: Vec3,
    /// Barycentric `u`.
    pub u: f64,
    /// Barycentric `v`.
    pub v: f64,
    /// Object that was hit.
    pub object: ObjectId,
    /// Triangle index.
    pub prim: u32,
    /// Primitive kind.
    pub kind: PrimitiveKind,
    /// Shader id of the triangle.
    pub shader: u32,
    /// Ray time.
    pub time: f64,
    /// Compact footprint of the incoming ray at the hit.
    pub dp: f64,
    /// Whether the ray arrived from behind the geometric normal.
    pub backfacing: bool,
    /// Whether the triangle interpolates vertex normals.
    pub smooth: bool,
}

impl SurfacePoint {
    /// The primitive this point lies on.
    pub fn prim_ref(&self) -> PrimRef {
        PrimRef::new(self.object, self.prim)
    }
}
