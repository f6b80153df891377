#![warn(missing_docs)]

//! Triangle scenes and ray queries for the caustica kernel.
//!
//! This crate stores meshes placed as objects, builds an SAH bounding volume
//! hierarchy over their triangles and answers the closest-hit queries that
//! the manifold walk relies on. Keyframed meshes are intersected at the ray
//! time.
//!
//! # Architecture
//!
//! - [`Ray`] - Ray with distance range, time, self-exclusion and differentials
//! - [`Intersection`] - Hit record tagged with object, triangle and kind
//! - [`mesh`] / [`object`] - Geometry storage and per-object flags
//! - [`primitive`] - World-space triangle data at a given time
//! - [`intersect`] - Ray-triangle intersection for static and motion triangles
//! - [`bvh`] - Bounding volume hierarchy for acceleration
//! - [`Scene`] - The [`Intersector`] implementation and shading-point setup
//!
//! # Example
//!
//! ```ignore
//! use caustica_scene::{Intersector, Mesh, Object, Ray, Scene, SceneOptions};
//!
//! let mut builder = Scene::builder(SceneOptions::default());
//! builder.add_object(Object::new(Mesh::quad(corners)))?;
//! let scene = builder.build();
//!
//! let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), -Vec3::z());
//! let hit = scene.intersect(&ray);
//! ```

pub mod bbox;
pub mod bvh;
pub mod error;
pub mod intersect;
pub mod mesh;
pub mod object;
pub mod primitive;
mod ray;
pub mod reservoir;
mod scene;
mod surface;

pub use bbox::Aabb3;
pub use bvh::Bvh;
pub use error::{Result, SceneError};
pub use mesh::{Mesh, MotionKeys};
pub use object::{Object, ObjectFlags};
pub use primitive::{triangle_point_from_uv, TriangleGeometry};
pub use ray::{Intersection, ObjectId, PrimRef, PrimitiveKind, Ray};
pub use reservoir::ReservoirSampler;
pub use scene::{Intersector, LocalHits, Scene, SceneBuilder, SceneOptions};
pub use surface::SurfacePoint;
