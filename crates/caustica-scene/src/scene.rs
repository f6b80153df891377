//! In-memory scene implementing the intersection oracle.

use caustica_math::{safe_normalize, Vec3};
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::bvh::Bvh;
use crate::error::{Result, SceneError};
use crate::object::Object;
use crate::ray::{Intersection, ObjectId};
use crate::reservoir::ReservoirSampler;
use crate::surface::SurfacePoint;
use crate::Ray;

/// Closest-hit ray queries against a scene.
pub trait Intersector: Sync {
    /// Closest hit in `[ray.tmin, ray.tmax]`, skipping `ray.self_prim`.
    fn intersect(&self, ray: &Ray) -> Option<Intersection>;
}

/// Scene construction options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneOptions {
    /// Bake object transforms into vertex data at build time.
    pub apply_static_transforms: bool,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            apply_static_transforms: true,
        }
    }
}

/// Hits on one object returned by [`Scene::intersect_local`].
#[derive(Debug, Clone, Default)]
pub struct LocalHits {
    /// Kept hits, at most the requested maximum.
    pub hits: Vec<Intersection>,
    /// Total number of hits found along the ray.
    pub num_hits: usize,
}

/// Collects objects and builds a [`Scene`].
#[derive(Debug, Default)]
pub struct SceneBuilder {
    objects: Vec<Object>,
    options: SceneOptions,
}

impl SceneBuilder {
    /// An empty builder.
    pub fn new(options: SceneOptions) -> Self {
        Self {
            objects: Vec::new(),
            options,
        }
    }

    /// Validate and add an object.
    pub fn add_object(&mut self, mut object: Object) -> Result<ObjectId> {
        object.mesh.validate()?;
        if object.transform.inverse().is_none() {
            return Err(SceneError::SingularTransform);
        }
        if self.options.apply_static_transforms {
            object.bake_transform();
        }
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(object);
        Ok(id)
    }

    /// Build the acceleration structure.
    pub fn build(self) -> Scene {
        let bvh = Bvh::build(&self.objects);
        let num_triangles: usize = self.objects.iter().map(|o| o.mesh.num_triangles()).sum();
        debug!(
            "built scene with {} objects, {} triangles",
            self.objects.len(),
            num_triangles
        );
        Scene {
            objects: self.objects,
            bvh,
        }
    }
}

/// Triangle scene with an SAH BVH.
#[derive(Debug, Clone)]
pub struct Scene {
    objects: Vec<Object>,
    bvh: Bvh,
}

impl Scene {
    /// Start building a scene.
    pub fn builder(options: SceneOptions) -> SceneBuilder {
        SceneBuilder::new(options)
    }

    /// Object by id, or `None` if `id` does not belong to this scene.
    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id.index())
    }

    /// All objects, indexed by [`ObjectId`].
    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    /// Reconstruct the shading geometry at a hit.
    ///
    /// Returns `None` when the hit names an object outside this scene.
    pub fn surface_point(&self, ray: &Ray, isect: &Intersection) -> Option<SurfacePoint> {
        let object = self.object(isect.object)?;
        let geom = object.triangle_vertices_and_normals(isect.prim, isect.kind, ray.time);
        let mut ng = geom.geometric_normal(object.has_negative_scale());
        let smooth = object.is_smooth(isect.prim);
        let mut n = if smooth {
            let n = safe_normalize(&geom.blended_normal(isect.u, isect.v));
            if n == Vec3::zeros() {
                ng
            } else {
                n
            }
        } else {
            ng
        };

        let wi = -ray.direction.into_inner();
        let backfacing = ng.dot(&wi) < 0.0;
        if backfacing {
            ng = -ng;
            n = -n;
        }

        Some(SurfacePoint {
            p: geom.point(isect.u, isect.v),
            ng,
            n,
            u: isect.u,
            v: isect.v,
            object: isect.object,
            prim: isect.prim,
            kind: isect.kind,
            shader: object.shader(isect.prim),
            time: ray.time,
            dp: ray.footprint_at(isect.t),
            backfacing,
            smooth,
        })
    }

    /// Every hit on `object` along the ray, keeping at most `max_hits` of
    /// them by reservoir sampling.
    pub fn intersect_local<R: Rng + ?Sized>(
        &self,
        ray: &Ray,
        object: ObjectId,
        max_hits: usize,
        rng: &mut R,
    ) -> LocalHits {
        let mut reservoir = ReservoirSampler::new(max_hits);
        for hit in self.bvh.trace_object(ray, &self.objects, object) {
            reservoir.observe(hit, rng);
        }
        let num_hits = reservoir.seen();
        let mut hits = reservoir.into_samples();
        hits.sort_by(|a, b| a.t.total_cmp(&b.t));
        LocalHits { hits, num_hits }
    }
}

impl Intersector for Scene {
    fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        self.bvh.trace_closest(ray, &self.objects)
    }
}
