//! Rays, intersection records and compact ray differentials.

use caustica_math::{next_ray_distance, normalize_len, Dir3, Point3, Vec3};

use crate::bbox::Aabb3;

/// Index of an object in a [`Scene`](crate::Scene).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObjectId(pub u32);

impl ObjectId {
    /// Index into the scene's object array.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kind of primitive an intersection landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveKind {
    /// Static triangle.
    #[default]
    Triangle,
    /// Triangle interpolated between motion keyframes at the ray time.
    MotionTriangle,
}

/// Reference to one triangle of one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PrimRef {
    /// Owning object.
    pub object: ObjectId,
    /// Triangle index within the object's mesh.
    pub prim: u32,
}

impl PrimRef {
    /// Create a primitive reference.
    pub fn new(object: ObjectId, prim: u32) -> Self {
        Self { object, prim }
    }
}

/// A ray in 3D space.
///
/// Besides origin and direction, a ray carries the valid distance interval,
/// a time for motion blur, an optional primitive it must not hit again and
/// compact differentials of origin (`dp`) and direction (`dd`).
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray.
    pub origin: Point3,
    /// Unit direction of the ray.
    pub direction: Dir3,
    /// Closest accepted hit distance.
    pub tmin: f64,
    /// Furthest accepted hit distance.
    pub tmax: f64,
    /// Shutter time in `[0, 1]`.
    pub time: f64,
    /// Primitive skipped during traversal.
    pub self_prim: Option<PrimRef>,
    /// Compact differential of the origin.
    pub dp: f64,
    /// Compact differential of the direction.
    pub dd: f64,
    /// Precomputed reciprocal of direction components for fast AABB tests.
    inv_direction: Vec3,
    /// Sign of direction components (0 if positive, 1 if negative).
    sign: [usize; 3],
}

impl Ray {
    /// Create a new unbounded ray from origin and direction.
    ///
    /// The direction will be normalized.
    pub fn new(origin: Point3, direction: Vec3) -> Self {
        let dir = Dir3::new_normalize(direction);
        let inv = Vec3::new(1.0 / dir.x, 1.0 / dir.y, 1.0 / dir.z);
        let sign = [
            usize::from(inv.x < 0.0),
            usize::from(inv.y < 0.0),
            usize::from(inv.z < 0.0),
        ];
        Self {
            origin,
            direction: dir,
            tmin: 0.0,
            tmax: f64::INFINITY,
            time: 0.0,
            self_prim: None,
            dp: 0.0,
            dd: 0.0,
            inv_direction: inv,
            sign,
        }
    }

    /// Ray from `origin` toward `target`, bounded at the target.
    ///
    /// Returns `None` when the two points coincide.
    pub fn between(origin: Point3, target: Point3) -> Option<Self> {
        let (dir, len) = normalize_len(&(target - origin));
        if len <= 0.0 {
            return None;
        }
        Some(Self::new(origin, dir).with_range(0.0, len))
    }

    /// Restrict the accepted distance interval.
    pub fn with_range(mut self, tmin: f64, tmax: f64) -> Self {
        self.tmin = tmin;
        self.tmax = tmax;
        self
    }

    /// Set the shutter time.
    pub fn with_time(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    /// Skip `prim` during traversal.
    pub fn excluding(mut self, prim: Option<PrimRef>) -> Self {
        self.self_prim = prim;
        self
    }

    /// Attach compact differentials.
    pub fn with_differentials(mut self, dp: f64, dd: f64) -> Self {
        self.dp = dp;
        self.dd = dd;
        self
    }

    /// Continue past a hit: exclude its primitive and restart just beyond it.
    pub fn skip_hit(&mut self, hit: &Intersection) {
        self.self_prim = Some(hit.prim_ref());
        self.tmin = next_ray_distance(hit.t);
    }

    /// Compact footprint of the ray after travelling distance `t`.
    #[inline]
    pub fn footprint_at(&self, t: f64) -> f64 {
        self.dp + t * self.dd
    }

    /// Test ray-AABB intersection using the slab method.
    ///
    /// Returns the entry and exit distances clipped to `[tmin, tmax]`, or
    /// `None` when the box is missed within that interval.
    #[inline]
    pub fn intersect_aabb(&self, aabb: &Aabb3) -> Option<(f64, f64)> {
        let bounds = [aabb.min, aabb.max];

        let tx1 = (bounds[self.sign[0]].x - self.origin.x) * self.inv_direction.x;
        let tx2 = (bounds[1 - self.sign[0]].x - self.origin.x) * self.inv_direction.x;

        let mut t_min = tx1;
        let mut t_max = tx2;

        let ty1 = (bounds[self.sign[1]].y - self.origin.y) * self.inv_direction.y;
        let ty2 = (bounds[1 - self.sign[1]].y - self.origin.y) * self.inv_direction.y;

        t_min = t_min.max(ty1);
        t_max = t_max.min(ty2);

        let tz1 = (bounds[self.sign[2]].z - self.origin.z) * self.inv_direction.z;
        let tz2 = (bounds[1 - self.sign[2]].z - self.origin.z) * self.inv_direction.z;

        t_min = t_min.max(tz1).max(self.tmin);
        t_max = t_max.min(tz2).min(self.tmax);

        if t_max >= t_min {
            Some((t_min, t_max))
        } else {
            None
        }
    }
}

/// Result of a ray-primitive intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    /// Distance along the ray.
    pub t: f64,
    /// Barycentric weight of the second triangle vertex.
    pub u: f64,
    /// Barycentric weight of the third triangle vertex.
    pub v: f64,
    /// Object that was hit.
    pub object: ObjectId,
    /// Triangle index within the object's mesh.
    pub prim: u32,
    /// Primitive kind.
    pub kind: PrimitiveKind,
}

impl Intersection {
    /// The primitive this hit landed on.
    pub fn prim_ref(&self) -> PrimRef {
        PrimRef::new(self.object, self.prim)
    }
}
