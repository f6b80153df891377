//! Scene objects: a mesh placed in the world with flags.

use bitflags::bitflags;
use caustica_math::{safe_normalize, Transform};
use nalgebra::Matrix3;

use crate::mesh::Mesh;
use crate::ray::PrimitiveKind;

bitflags! {
    /// Per-object flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ObjectFlags: u32 {
        /// The object refracts light toward receivers and can appear in a
        /// specular chain.
        const CAUSTICS_CASTER = 1 << 0;
        /// Shading points on the object may gather caustics.
        const CAUSTICS_RECEIVER = 1 << 1;
        /// Vertex data is already in world space.
        const TRANSFORM_APPLIED = 1 << 2;
        /// The transform mirrors, so winding is reversed.
        const NEGATIVE_SCALE = 1 << 3;
    }
}

/// A mesh instance.
#[derive(Debug, Clone)]
pub struct Object {
    /// Geometry in object space, or world space once the transform is baked.
    pub mesh: Mesh,
    /// Object-to-world transform.
    pub transform: Transform,
    /// Object flags.
    pub flags: ObjectFlags,
    normal_matrix: Matrix3<f64>,
}

impl Object {
    /// An object with the identity transform and no flags.
    pub fn new(mesh: Mesh) -> Self {
        Self {
            mesh,
            transform: Transform::identity(),
            flags: ObjectFlags::empty(),
            normal_matrix: Matrix3::identity(),
        }
    }

    /// Place the object with `transform`.
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.normal_matrix = transform.normal_matrix();
        self.flags
            .set(ObjectFlags::NEGATIVE_SCALE, transform.is_mirroring());
        self.flags.remove(ObjectFlags::TRANSFORM_APPLIED);
        self.transform = transform;
        self
    }

    /// Add flags.
    pub fn with_flags(mut self, flags: ObjectFlags) -> Self {
        self.flags.insert(flags);
        self
    }

    /// Whether the object is a caustic caster.
    pub fn is_caustics_caster(&self) -> bool {
        self.flags.contains(ObjectFlags::CAUSTICS_CASTER)
    }

    /// Whether the object receives caustics.
    pub fn is_caustics_receiver(&self) -> bool {
        self.flags.contains(ObjectFlags::CAUSTICS_RECEIVER)
    }

    /// Whether vertex data is stored in world space.
    pub fn transform_applied(&self) -> bool {
        self.flags.contains(ObjectFlags::TRANSFORM_APPLIED)
    }

    /// Whether the transform mirrors.
    pub fn has_negative_scale(&self) -> bool {
        self.flags.contains(ObjectFlags::NEGATIVE_SCALE)
    }

    /// Primitive kind of every triangle in this object.
    pub fn primitive_kind(&self) -> PrimitiveKind {
        if self.mesh.motion.is_some() {
            PrimitiveKind::MotionTriangle
        } else {
            PrimitiveKind::Triangle
        }
    }

    /// Shader id of triangle `prim`.
    pub fn shader(&self, prim: u32) -> u32 {
        self.mesh.shaders[prim as usize]
    }

    /// Whether triangle `prim` interpolates vertex normals.
    pub fn is_smooth(&self, prim: u32) -> bool {
        self.mesh.smooth[prim as usize]
    }

    /// Inverse transpose of the transform's linear part.
    pub(crate) fn normal_matrix(&self) -> &Matrix3<f64> {
        &self.normal_matrix
    }

    /// Move vertex data into world space and mark the transform applied.
    pub(crate) fn bake_transform(&mut self) {
        if self.transform_applied() {
            return;
        }
        let transform = &self.transform;
        let normal_matrix = self.normal_matrix;
        for p in &mut self.mesh.positions {
            *p = transform.apply_point(p);
        }
        for n in &mut self.mesh.normals {
            *n = safe_normalize(&(normal_matrix * *n));
        }
        if let Some(motion) = &mut self.mesh.motion {
            for step in &mut motion.positions {
                for p in step.iter_mut() {
                    *p = transform.apply_point(p);
                }
            }
            for step in &mut motion.normals {
                for n in step.iter_mut() {
                    *n = safe_normalize(&(normal_matrix * *n));
                }
            }
        }
        self.flags.insert(ObjectFlags::TRANSFORM_APPLIED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caustica_math::{Point3, Vec3};

    fn triangle() -> Mesh {
        Mesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn test_flags() {
        let obj = Object::new(triangle())
            .with_flags(ObjectFlags::CAUSTICS_CASTER)
            .with_flags(ObjectFlags::CAUSTICS_RECEIVER);
        assert!(obj.is_caustics_caster());
        assert!(obj.is_caustics_receiver());
        assert!(!obj.has_negative_scale());
        assert_eq!(obj.primitive_kind(), PrimitiveKind::Triangle);
    }

    #[test]
    fn test_mirror_sets_negative_scale() {
        let obj = Object::new(triangle()).with_transform(Transform::scale(1.0, 1.0, -1.0));
        assert!(obj.has_negative_scale());
    }

    #[test]
    fn test_bake_transform() {
        let mut obj =
            Object::new(triangle()).with_transform(Transform::translation(0.0, 0.0, 5.0));
        obj.bake_transform();
        assert!(obj.transform_applied());
        assert!((obj.mesh.positions[1] - Point3::new(1.0, 0.0, 5.0)).norm() < 1e-12);
        assert!((obj.mesh.normals[0] - Vec3::z()).norm() < 1e-12);

        // Baking twice is a no-op.
        obj.bake_transform();
        assert!((obj.mesh.positions[1].z - 5.0).abs() < 1e-12);
    }
}
