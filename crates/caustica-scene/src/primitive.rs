//! Geometric primitive interpolation.
//!
//! Fetches the world-space vertices and vertex normals of a triangle at a
//! given time, blending keyframes for motion triangles and applying the
//! object transform when it has not been baked.

use caustica_math::{safe_normalize, Point3, Vec3};

use crate::bbox::Aabb3;
use crate::object::Object;
use crate::ray::PrimitiveKind;

/// Vertex positions and normals of one triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleGeometry {
    /// Corner positions.
    pub verts: [Point3; 3],
    /// Corner normals.
    pub normals: [Vec3; 3],
}

impl TriangleGeometry {
    /// Position at barycentric `(u, v)`.
    #[inline]
    pub fn point(&self, u: f64, v: f64) -> Point3 {
        triangle_point_from_uv(&self.verts, u, v)
    }

    /// `(v1 - v0, v2 - v0)`, the position derivatives along `u` and `v`.
    #[inline]
    pub fn edges(&self) -> (Vec3, Vec3) {
        (self.verts[1] - self.verts[0], self.verts[2] - self.verts[0])
    }

    /// Unit geometric normal; reversed for mirrored objects.
    pub fn geometric_normal(&self, negative_scale: bool) -> Vec3 {
        let (e1, e2) = self.edges();
        let ng = safe_normalize(&e1.cross(&e2));
        if negative_scale {
            -ng
        } else {
            ng
        }
    }

    /// Unnormalized barycentric blend of the corner normals.
    #[inline]
    pub fn blended_normal(&self, u: f64, v: f64) -> Vec3 {
        (1.0 - u - v) * self.normals[0] + u * self.normals[1] + v * self.normals[2]
    }
}

/// `v0 + u (v1 - v0) + v (v2 - v0)`.
#[inline]
pub fn triangle_point_from_uv(verts: &[Point3; 3], u: f64, v: f64) -> Point3 {
    verts[0] + u * (verts[1] - verts[0]) + v * (verts[2] - verts[0])
}

/// Bracketing keyframe and blend fraction for `time` in `[0, 1]`.
#[inline]
pub fn motion_step(num_steps: usize, time: f64) -> (usize, f64) {
    let max_step = num_steps.saturating_sub(2);
    let step_time = time.clamp(0.0, 1.0) * (num_steps.saturating_sub(1)) as f64;
    let step = (step_time.floor() as usize).min(max_step);
    (step, step_time - step as f64)
}

impl Object {
    /// World-space vertex positions of triangle `prim` at `time`.
    pub fn triangle_vertices(&self, prim: u32, kind: PrimitiveKind, time: f64) -> [Point3; 3] {
        let verts = self.stored_vertices(prim, kind, time);
        if self.transform_applied() {
            verts
        } else {
            verts.map(|p| self.transform.apply_point(&p))
        }
    }

    /// World-space vertex positions and normals of triangle `prim` at `time`.
    pub fn triangle_vertices_and_normals(
        &self,
        prim: u32,
        kind: PrimitiveKind,
        time: f64,
    ) -> TriangleGeometry {
        let verts = self.stored_vertices(prim, kind, time);
        let normals = self.stored_normals(prim, kind, time);
        if self.transform_applied() {
            TriangleGeometry { verts, normals }
        } else {
            let nm = self.normal_matrix();
            TriangleGeometry {
                verts: verts.map(|p| self.transform.apply_point(&p)),
                normals: normals.map(|n| safe_normalize(&(nm * n))),
            }
        }
    }

    /// World-space bounds of triangle `prim` over the whole shutter.
    pub(crate) fn triangle_bounds(&self, prim: u32) -> Aabb3 {
        let mut aabb = Aabb3::empty();
        let mut include = |verts: [Point3; 3]| {
            for p in &verts {
                let p = if self.transform_applied() {
                    *p
                } else {
                    self.transform.apply_point(p)
                };
                aabb.include_point(&p);
            }
        };
        let idx = self.mesh.triangle_indices(prim);
        include(idx.map(|i| self.mesh.positions[i]));
        if let Some(motion) = &self.mesh.motion {
            for step in &motion.positions {
                include(idx.map(|i| step[i]));
            }
        }
        aabb
    }

    fn stored_vertices(&self, prim: u32, kind: PrimitiveKind, time: f64) -> [Point3; 3] {
        let idx = self.mesh.triangle_indices(prim);
        match (kind, &self.mesh.motion) {
            (PrimitiveKind::MotionTriangle, Some(motion)) => {
                let (step, frac) = motion_step(motion.num_steps(), time);
                let (a, b) = (&motion.positions[step], &motion.positions[step + 1]);
                idx.map(|i| a[i] + (b[i] - a[i]) * frac)
            }
            _ => idx.map(|i| self.mesh.positions[i]),
        }
    }

    fn stored_normals(&self, prim: u32, kind: PrimitiveKind, time: f64) -> [Vec3; 3] {
        let idx = self.mesh.triangle_indices(prim);
        match (kind, &self.mesh.motion) {
            (PrimitiveKind::MotionTriangle, Some(motion)) => {
                let (step, frac) = motion_step(motion.num_steps(), time);
                let (a, b) = (&motion.normals[step], &motion.normals[step + 1]);
                idx.map(|i| safe_normalize(&(a[i] * (1.0 - frac) + b[i] * frac)))
            }
            _ => idx.map(|i| self.mesh.normals[i]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Mesh, MotionKeys};
    use crate::object::ObjectFlags;
    use approx::assert_abs_diff_eq;
    use caustica_math::Transform;

    fn triangle_mesh() -> Mesh {
        Mesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
    }

    fn moving_mesh() -> Mesh {
        let base = triangle_mesh();
        let shifted = |dz: f64| -> Vec<Point3> {
            base.positions.iter().map(|p| p + Vec3::new(0.0, 0.0, dz)).collect()
        };
        let motion = MotionKeys {
            positions: vec![shifted(0.0), shifted(1.0), shifted(4.0)],
            normals: vec![base.normals.clone(); 3],
        };
        base.with_motion(motion)
    }

    #[test]
    fn test_point_from_uv() {
        let g = Object::new(triangle_mesh()).triangle_vertices_and_normals(
            0,
            PrimitiveKind::Triangle,
            0.0,
        );
        assert_abs_diff_eq!(g.point(0.0, 0.0), g.verts[0], epsilon = 1e-12);
        assert_abs_diff_eq!(g.point(1.0, 0.0), g.verts[1], epsilon = 1e-12);
        assert_abs_diff_eq!(g.point(0.0, 1.0), g.verts[2], epsilon = 1e-12);
        assert_abs_diff_eq!(g.point(0.25, 0.5), Point3::new(0.25, 0.5, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_geometric_normal_and_mirror() {
        let g = Object::new(triangle_mesh()).triangle_vertices_and_normals(
            0,
            PrimitiveKind::Triangle,
            0.0,
        );
        assert_abs_diff_eq!(g.geometric_normal(false), Vec3::z(), epsilon = 1e-12);
        assert_abs_diff_eq!(g.geometric_normal(true), -Vec3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_mirrored_object_keeps_outward_normal() {
        // Mirroring along x reverses winding; the flag restores the normal.
        let obj = Object::new(triangle_mesh()).with_transform(Transform::scale(-1.0, 1.0, 1.0));
        let g = obj.triangle_vertices_and_normals(0, PrimitiveKind::Triangle, 0.0);
        assert_abs_diff_eq!(
            g.geometric_normal(obj.has_negative_scale()),
            Vec3::z(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_transform_applied_only_when_unbaked() {
        let mut obj =
            Object::new(triangle_mesh()).with_transform(Transform::translation(2.0, 0.0, 0.0));
        let before = obj.triangle_vertices(0, PrimitiveKind::Triangle, 0.0);
        obj.bake_transform();
        assert!(obj.flags.contains(ObjectFlags::TRANSFORM_APPLIED));
        let after = obj.triangle_vertices(0, PrimitiveKind::Triangle, 0.0);
        for (a, b) in before.iter().zip(&after) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(after[0].x, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_motion_step_blend() {
        assert_eq!(motion_step(3, 0.0), (0, 0.0));
        let (step, frac) = motion_step(3, 0.75);
        assert_eq!(step, 1);
        assert_abs_diff_eq!(frac, 0.5, epsilon = 1e-12);
        // The last step clamps so there is always a following key.
        let (step, frac) = motion_step(3, 1.0);
        assert_eq!(step, 1);
        assert_abs_diff_eq!(frac, 1.0, epsilon = 1e-12);
        assert_eq!(motion_step(2, 7.0).0, 0);
    }

    #[test]
    fn test_motion_triangle_interpolates() {
        let obj = Object::new(moving_mesh());
        assert_eq!(obj.primitive_kind(), PrimitiveKind::MotionTriangle);
        let z = |time| obj.triangle_vertices(0, PrimitiveKind::MotionTriangle, time)[0].z;
        assert_abs_diff_eq!(z(0.0), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(z(0.25), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(z(0.75), 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(z(1.0), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_motion_bounds_cover_shutter() {
        let obj = Object::new(moving_mesh());
        let b = obj.triangle_bounds(0);
        assert_abs_diff_eq!(b.min.z, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(b.max.z, 4.0, epsilon = 1e-12);
    }
}
