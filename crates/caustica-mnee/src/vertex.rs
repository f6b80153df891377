//! Manifold vertices and their local differential geometry.

use caustica_math::{make_orthonormals, normalize_len, Mat22, Point3, Vec2, Vec3};
use caustica_scene::{Intersection, ObjectId, PrimRef, PrimitiveKind, Ray, Scene};
use caustica_shading::MicrofacetBsdf;

/// A point on a refractive interface together with everything the walk
/// needs to move it.
///
/// `dp_du` and `dp_dv` form an orthonormal tangent frame derived from the
/// geometric normal alone; `dn_du` and `dn_dv` are the shading normal's
/// derivatives along that frame. `a`, `b` and `c` are the constraint
/// derivatives with respect to the previous, current and next vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManifoldVertex {
    /// Position.
    pub p: Point3,
    /// First tangent.
    pub dp_du: Vec3,
    /// Second tangent.
    pub dp_dv: Vec3,
    /// Shading normal.
    pub n: Vec3,
    /// Geometric normal.
    pub ng: Vec3,
    /// Shading normal derivative along `dp_du`.
    pub dn_du: Vec3,
    /// Shading normal derivative along `dp_dv`.
    pub dn_dv: Vec3,
    /// Barycentric coordinates on the triangle.
    pub uv: Vec2,
    /// Object the vertex lies on.
    pub object: ObjectId,
    /// Triangle index.
    pub prim: u32,
    /// Primitive kind.
    pub kind: PrimitiveKind,
    /// Shader id of the triangle.
    pub shader: u32,
    /// Index of refraction on the front side, relative to the back side.
    pub eta: f64,
    /// Interface closure captured at seeding.
    pub bsdf: MicrofacetBsdf,
    /// Target half-vector offset in the local shading frame.
    pub n_offset: Vec2,
    /// Current constraint value.
    pub constraint: Vec2,
    /// Derivative of the constraint w.r.t. the previous vertex.
    pub a: Mat22,
    /// Derivative of the constraint w.r.t. this vertex.
    pub b: Mat22,
    /// Derivative of the constraint w.r.t. the next vertex.
    pub c: Mat22,
}

impl ManifoldVertex {
    /// A vertex at the origin with identity `b` and everything else zero.
    pub fn empty() -> Self {
        Self {
            p: Point3::origin(),
            dp_du: Vec3::zeros(),
            dp_dv: Vec3::zeros(),
            n: Vec3::zeros(),
            ng: Vec3::zeros(),
            dn_du: Vec3::zeros(),
            dn_dv: Vec3::zeros(),
            uv: Vec2::zeros(),
            object: ObjectId::default(),
            prim: 0,
            kind: PrimitiveKind::default(),
            shader: 0,
            eta: 1.0,
            bsdf: MicrofacetBsdf::default(),
            n_offset: Vec2::zeros(),
            constraint: Vec2::zeros(),
            a: Mat22::zeros(),
            b: Mat22::identity(),
            c: Mat22::zeros(),
        }
    }

    /// The primitive this vertex lies on.
    pub fn prim_ref(&self) -> PrimRef {
        PrimRef::new(self.object, self.prim)
    }
}

impl Default for ManifoldVertex {
    fn default() -> Self {
        Self::empty()
    }
}

/// Build a manifold vertex at a ray hit.
///
/// The shading normal is the normalized blend of the vertex normals; its
/// derivatives follow the triangle's edge parameterization until the edge
/// frame is orthonormalized and finally re-expressed in the frame
/// `make_orthonormals(ng)`. Two hits with the same geometric normal
/// therefore share their tangent frame regardless of vertex ordering.
///
/// Returns `None` only when the hit names an object outside `scene`.
pub fn setup_manifold_vertex(
    scene: &Scene,
    ray: &Ray,
    isect: &Intersection,
    bsdf: MicrofacetBsdf,
    eta: f64,
    n_offset: Vec2,
) -> Option<ManifoldVertex> {
    let object = scene.object(isect.object)?;
    let geom = object.triangle_vertices_and_normals(isect.prim, isect.kind, ray.time);
    let [n0, n1, n2] = geom.normals;

    let (mut dp_du, mut dp_dv) = geom.edges();

    let (n, n_len) = normalize_len(&geom.blended_normal(isect.u, isect.v));
    let mut dn_du = (n1 - n0) / n_len;
    dn_du -= n * n.dot(&dn_du);
    let mut dn_dv = (n2 - n0) / n_len;
    dn_dv -= n * n.dot(&dn_dv);

    let ng = geom.geometric_normal(object.has_negative_scale());

    // Gram-Schmidt on the edges, carrying the normal derivatives along.
    let inv_len_dp_du = 1.0 / dp_du.norm();
    dp_du *= inv_len_dp_du;
    dn_du *= inv_len_dp_du;

    let dpdu_dot_dpdv = dp_du.dot(&dp_dv);
    dp_dv -= dpdu_dot_dpdv * dp_du;
    dn_dv -= dpdu_dot_dpdv * dn_du;

    let inv_len_dp_dv = 1.0 / dp_dv.norm();
    dp_dv *= inv_len_dp_dv;
    dn_dv *= inv_len_dp_dv;

    let (s, t) = make_orthonormals(&ng);
    let dn_ds = s.dot(&dp_du) * dn_du + s.dot(&dp_dv) * dn_dv;
    let dn_dt = t.dot(&dp_du) * dn_du + t.dot(&dp_dv) * dn_dv;

    Some(ManifoldVertex {
        p: geom.point(isect.u, isect.v),
        dp_du: s,
        dp_dv: t,
        n,
        ng,
        dn_du: dn_ds,
        dn_dv: dn_dt,
        uv: Vec2::new(isect.u, isect.v),
        object: isect.object,
        prim: isect.prim,
        kind: isect.kind,
        shader: object.shader(isect.prim),
        eta,
        bsdf,
        n_offset,
        ..ManifoldVertex::empty()
    })
}
