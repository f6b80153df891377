//! Bounding Volume Hierarchy over scene triangles.
//!
//! Uses Surface Area Heuristic (SAH) for construction. Leaves hold
//! references into the scene's object array; bounds of motion triangles
//! cover every keyframe.

use caustica_math::Point3;

use crate::bbox::Aabb3;
use crate::intersect::intersect_primitive;
use crate::object::Object;
use crate::ray::{Intersection, ObjectId, PrimRef};
use crate::Ray;

/// Maximum number of primitives in a leaf.
const MAX_LEAF_SIZE: usize = 4;

/// Number of SAH buckets per axis.
const NUM_BUCKETS: usize = 12;

/// Relative cost of visiting an inner node.
const TRAVERSAL_COST: f64 = 0.125;

/// A BVH node - either a leaf containing triangles or an internal node with children.
#[derive(Debug, Clone)]
pub enum BvhNode {
    /// Leaf node containing primitive references.
    Leaf {
        /// Axis-aligned bounding box of this node.
        aabb: Aabb3,
        /// Triangles contained in this leaf.
        prims: Vec<PrimRef>,
    },
    /// Internal node with two children.
    Internal {
        /// Axis-aligned bounding box of this node.
        aabb: Aabb3,
        /// Left child node.
        left: Box<BvhNode>,
        /// Right child node.
        right: Box<BvhNode>,
    },
}

impl BvhNode {
    /// Bounds of this node.
    pub fn aabb(&self) -> &Aabb3 {
        match self {
            BvhNode::Leaf { aabb, .. } | BvhNode::Internal { aabb, .. } => aabb,
        }
    }
}

type PrimData = (PrimRef, Aabb3, Point3);

/// Bounding Volume Hierarchy for accelerated ray-scene intersection.
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    root: Option<BvhNode>,
}

impl Bvh {
    /// Build a BVH over every triangle of `objects` using SAH construction.
    pub fn build(objects: &[Object]) -> Self {
        let mut prim_data: Vec<PrimData> = objects
            .iter()
            .enumerate()
            .flat_map(|(index, object)| {
                let id = ObjectId(index as u32);
                (0..object.mesh.num_triangles() as u32).map(move |prim| {
                    let aabb = object.triangle_bounds(prim);
                    (PrimRef::new(id, prim), aabb, aabb.centroid())
                })
            })
            .collect();

        let root = if prim_data.is_empty() {
            None
        } else {
            Some(build_node(&mut prim_data))
        };

        Self { root }
    }

    #[cfg(test)]
    fn root(&self) -> Option<&BvhNode> {
        self.root.as_ref()
    }

    /// Trace a ray and return only the closest hit.
    pub fn trace_closest(&self, ray: &Ray, objects: &[Object]) -> Option<Intersection> {
        let mut closest: Option<Intersection> = None;
        let mut closest_t = ray.tmax;

        if let Some(ref root) = self.root {
            trace_node_closest(ray, objects, root, &mut closest, &mut closest_t);
        }

        closest
    }

    /// Trace a ray, returning every hit on `object` sorted by t.
    pub fn trace_object(&self, ray: &Ray, objects: &[Object], object: ObjectId) -> Vec<Intersection> {
        let mut hits = Vec::new();

        if let Some(ref root) = self.root {
            trace_node_object(ray, objects, root, object, &mut hits);
        }

        hits.sort_by(|a, b| a.t.total_cmp(&b.t));
        hits
    }
}

/// Trace a ray through a single node, collecting hits on one object.
fn trace_node_object(
    ray: &Ray,
    objects: &[Object],
    node: &BvhNode,
    object: ObjectId,
    hits: &mut Vec<Intersection>,
) {
    match node {
        BvhNode::Leaf { aabb, prims } => {
            if ray.intersect_aabb(aabb).is_some() {
                for prim in prims.iter().filter(|p| p.object == object) {
                    let obj = &objects[prim.object.index()];
                    if let Some(hit) = intersect_primitive(ray, obj, prim.object, prim.prim, ray.tmax)
                    {
                        hits.push(hit);
                    }
                }
            }
        }
        BvhNode::Internal { aabb, left, right } => {
            if ray.intersect_aabb(aabb).is_some() {
                trace_node_object(ray, objects, left, object, hits);
                trace_node_object(ray, objects, right, object, hits);
            }
        }
    }
}

/// Trace a ray, keeping only the closest hit.
fn trace_node_closest(
    ray: &Ray,
    objects: &[Object],
    node: &BvhNode,
    closest: &mut Option<Intersection>,
    closest_t: &mut f64,
) {
    match node {
        BvhNode::Leaf { aabb, prims } => {
            if let Some((t_min, _)) = ray.intersect_aabb(aabb) {
                // Early out if AABB entry is beyond current closest
                if t_min > *closest_t {
                    return;
                }

                for prim in prims {
                    let obj = &objects[prim.object.index()];
                    if let Some(hit) = intersect_primitive(ray, obj, prim.object, prim.prim, *closest_t)
                    {
                        if closest.is_none() || hit.t < *closest_t {
                            *closest_t = hit.t;
                            *closest = Some(hit);
                        }
                    }
                }
            }
        }
        BvhNode::Internal { aabb, left, right } => {
            if let Some((t_min, _)) = ray.intersect_aabb(aabb) {
                if t_min > *closest_t {
                    return;
                }

                // Test children in order of AABB distance
                let left_t = ray.intersect_aabb(left.aabb()).map(|(t, _)| t);
                let right_t = ray.intersect_aabb(right.aabb()).map(|(t, _)| t);

                match (left_t, right_t) {
                    (Some(lt), Some(rt)) => {
                        if lt <= rt {
                            trace_node_closest(ray, objects, left, closest, closest_t);
                            trace_node_closest(ray, objects, right, closest, closest_t);
                        } else {
                            trace_node_closest(ray, objects, right, closest, closest_t);
                            trace_node_closest(ray, objects, left, closest, closest_t);
                        }
                    }
                    (Some(_), None) => {
                        trace_node_closest(ray, objects, left, closest, closest_t);
                    }
                    (None, Some(_)) => {
                        trace_node_closest(ray, objects, right, closest, closest_t);
                    }
                    (None, None) => {}
                }
            }
        }
    }
}

/// Build a BVH node recursively using SAH.
fn build_node(prim_data: &mut [PrimData]) -> BvhNode {
    let mut bounds = Aabb3::empty();
    for (_, aabb, _) in prim_data.iter() {
        bounds.include_box(aabb);
    }

    if prim_data.len() <= MAX_LEAF_SIZE {
        return BvhNode::Leaf {
            aabb: bounds,
            prims: prim_data.iter().map(|(prim, _, _)| *prim).collect(),
        };
    }

    let mid = match find_best_split(prim_data, &bounds) {
        Some((axis, pos)) => partition_prims(prim_data, axis, pos),
        None => 0,
    };

    // Fall back to a median split when SAH finds nothing useful.
    let mid = if mid == 0 || mid == prim_data.len() {
        prim_data.len() / 2
    } else {
        mid
    };

    let (left_data, right_data) = prim_data.split_at_mut(mid);

    BvhNode::Internal {
        aabb: bounds,
        left: Box::new(build_node(left_data)),
        right: Box::new(build_node(right_data)),
    }
}

/// Find the best split axis and position using SAH.
fn find_best_split(prim_data: &[PrimData], bounds: &Aabb3) -> Option<(usize, f64)> {
    let extent = bounds.extent();
    let total_area = bounds.surface_area();

    let mut best: Option<(usize, f64)> = None;
    let mut best_cost = f64::INFINITY;

    for axis in 0..3 {
        let axis_extent = extent[axis];
        if axis_extent < 1e-10 {
            continue;
        }
        let axis_min = bounds.min[axis];

        let mut bucket_counts = [0usize; NUM_BUCKETS];
        let mut bucket_bounds = [Aabb3::empty(); NUM_BUCKETS];

        for (_, aabb, centroid) in prim_data {
            let b = ((centroid[axis] - axis_min) / axis_extent * NUM_BUCKETS as f64) as usize;
            let b = b.min(NUM_BUCKETS - 1);
            bucket_counts[b] += 1;
            bucket_bounds[b].include_box(aabb);
        }

        for split in 1..NUM_BUCKETS {
            let mut left_count = 0;
            let mut left_bounds = Aabb3::empty();
            for i in 0..split {
                left_count += bucket_counts[i];
                left_bounds.include_box(&bucket_bounds[i]);
            }

            let mut right_count = 0;
            let mut right_bounds = Aabb3::empty();
            for i in split..NUM_BUCKETS {
                right_count += bucket_counts[i];
                right_bounds.include_box(&bucket_bounds[i]);
            }

            if left_count == 0 || right_count == 0 {
                continue;
            }

            // SAH cost: traversal + P(left) * N_left + P(right) * N_right
            let cost = TRAVERSAL_COST
                + left_bounds.surface_area() / total_area * left_count as f64
                + right_bounds.surface_area() / total_area * right_count as f64;

            if cost < best_cost {
                best_cost = cost;
                best = Some((axis, axis_min + (split as f64 / NUM_BUCKETS as f64) * axis_extent));
            }
        }
    }

    best
}

/// Partition primitives by centroid along an axis.
fn partition_prims(prim_data: &mut [PrimData], axis: usize, pos: f64) -> usize {
    let mut left = 0;
    let mut right = prim_data.len();

    while left < right {
        if prim_data[left].2[axis] < pos {
            left += 1;
        } else {
            right -= 1;
            prim_data.swap(left, right);
        }
    }

    left
}
