//! Generalized half-vector constraints and their derivatives.
//!
//! Every vertex of a chain must refract the path from its predecessor into
//! its successor. Writing `wi` and `wo` for the unit directions toward the
//! two neighbours and `eta` for the index ratio across the interface, the
//! generalized half vector `H = -(wi + eta * wo)` is parallel to the
//! shading normal exactly when Snell's law holds. The constraint is `H`
//! projected onto the vertex's local shading frame, minus the sampled
//! microfacet offset.

use caustica_math::{mat22_project, normalize_len, Mat22, Point3, Vec2, Vec3};
use caustica_shading::LightSample;

use crate::constants::MIN_DISTANCE;
use crate::vertex::ManifoldVertex;

/// Where the last vertex of a chain connects to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightTarget {
    /// A point on a light.
    Position(Point3),
    /// A fixed unit direction toward a distant light.
    Direction(Vec3),
}

impl LightTarget {
    /// The target of a light sample.
    pub fn from_sample(ls: &LightSample) -> Self {
        if ls.fixed_direction {
            LightTarget::Direction(ls.d)
        } else {
            LightTarget::Position(ls.p)
        }
    }

    /// Unnormalized direction from `p` toward the light.
    pub fn direction_from(&self, p: &Point3) -> Vec3 {
        match self {
            LightTarget::Position(lp) => lp - p,
            LightTarget::Direction(d) => *d,
        }
    }
}

/// Shading frame `(s, t)` of a vertex: `dp_du` projected onto the shading
/// tangent plane, plus `n x s`.
pub(crate) fn shading_frame(v: &ManifoldVertex) -> (Vec3, Vec3, f64) {
    let s = v.dp_du - v.dp_du.dot(&v.n) * v.n;
    let inv_len_s = 1.0 / s.norm();
    let s = s * inv_len_s;
    let t = v.n.cross(&s);
    (s, t, inv_len_s)
}

/// Derivative of the normalized half vector for a change `d_raw` of the
/// unnormalized one, negated to match `H = -(...)`.
#[inline]
fn half_vector_derivative(d_raw: Vec3, h: &Vec3) -> Vec3 {
    -(d_raw - h * d_raw.dot(h))
}

/// Evaluate the constraint and the `a`, `b`, `c` blocks of every vertex.
///
/// `surface` is the shading point the chain starts from. Returns the
/// largest constraint norm, or `None` when two consecutive chain elements
/// are closer than [`MIN_DISTANCE`] or a half vector vanishes.
pub fn compute_constraint_derivatives(
    chain: &mut [ManifoldVertex],
    surface: &Point3,
    light: &LightTarget,
) -> Option<f64> {
    let count = chain.len();
    let mut max_norm: f64 = 0.0;

    for vi in 0..count {
        let v = chain[vi];
        let is_last = vi + 1 == count;

        let prev_p = if vi == 0 { *surface } else { chain[vi - 1].p };
        let (wi, len_wi) = normalize_len(&(prev_p - v.p));
        if len_wi < MIN_DISTANCE {
            return None;
        }
        let mut ili = 1.0 / len_wi;

        let to_next = if is_last {
            light.direction_from(&v.p)
        } else {
            chain[vi + 1].p - v.p
        };
        let (wo, len_wo) = normalize_len(&to_next);
        if len_wo < MIN_DISTANCE {
            return None;
        }
        let mut ilo = 1.0 / len_wo;

        let eta = if wi.dot(&v.ng) < 0.0 { 1.0 / v.eta } else { v.eta };

        let (h, len_h) = normalize_len(&-(wi + eta * wo));
        if len_h <= 0.0 {
            return None;
        }
        let ilh = 1.0 / len_h;
        ilo *= eta * ilh;
        ili *= ilh;

        let (s, t, inv_len_s) = shading_frame(&v);
        let dp_du_dot_n = v.dp_du.dot(&v.n);

        if vi > 0 {
            let prev = &chain[vi - 1];
            let dh_du = half_vector_derivative((prev.dp_du - wi * wi.dot(&prev.dp_du)) * ili, &h);
            let dh_dv = half_vector_derivative((prev.dp_dv - wi * wi.dot(&prev.dp_dv)) * ili, &h);
            chain[vi].a = mat22_project(&dh_du, &dh_dv, &s, &t);
        }

        let (dh_du, dh_dv) = if is_last && matches!(light, LightTarget::Direction(_)) {
            (
                half_vector_derivative(ili * (-v.dp_du + wi * wi.dot(&v.dp_du)), &h),
                half_vector_derivative(ili * (-v.dp_dv + wi * wi.dot(&v.dp_dv)), &h),
            )
        } else {
            let raw = |dp: &Vec3| {
                -dp * (ili + ilo) + wi * (wi.dot(dp) * ili) + wo * (wo.dot(dp) * ilo)
            };
            (
                half_vector_derivative(raw(&v.dp_du), &h),
                half_vector_derivative(raw(&v.dp_dv), &h),
            )
        };

        // The shading frame turns with the normal.
        let mut ds_du = -inv_len_s * (v.dp_du.dot(&v.dn_du) * v.n + dp_du_dot_n * v.dn_du);
        let mut ds_dv = -inv_len_s * (v.dp_du.dot(&v.dn_dv) * v.n + dp_du_dot_n * v.dn_dv);
        ds_du -= s * s.dot(&ds_du);
        ds_dv -= s * s.dot(&ds_dv);
        let dt_du = v.dn_du.cross(&s) + v.n.cross(&ds_du);
        let dt_dv = v.dn_dv.cross(&s) + v.n.cross(&ds_dv);

        chain[vi].b = mat22_project(&dh_du, &dh_dv, &s, &t)
            + Mat22::new(h.dot(&ds_du), h.dot(&ds_dv), h.dot(&dt_du), h.dot(&dt_dv));

        if !is_last {
            let next = &chain[vi + 1];
            let dh_du = half_vector_derivative((next.dp_du - wo * wo.dot(&next.dp_du)) * ilo, &h);
            let dh_dv = half_vector_derivative((next.dp_dv - wo * wo.dot(&next.dp_dv)) * ilo, &h);
            chain[vi].c = mat22_project(&dh_du, &dh_dv, &s, &t);
        }

        let constraint = Vec2::new(s.dot(&h), t.dot(&h)) - v.n_offset;
        chain[vi].constraint = constraint;
        max_norm = max_norm.max(constraint.norm());
    }

    Some(max_norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use caustica_math::make_orthonormals;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// A vertex on a surface with normal field `n(q)` around `p`.
    fn vertex(p: Point3, ng: Vec3, n: Vec3, dn: (Vec3, Vec3), eta: f64) -> ManifoldVertex {
        let (s, t) = make_orthonormals(&ng);
        ManifoldVertex {
            p,
            dp_du: s,
            dp_dv: t,
            n,
            ng,
            dn_du: dn.0,
            dn_dv: dn.1,
            eta,
            ..ManifoldVertex::empty()
        }
    }

    /// Move vertex `vi` by `(du, dv)` along its tangents, updating the
    /// normal to first order.
    fn displaced(chain: &[ManifoldVertex], vi: usize, du: f64, dv: f64) -> Vec<ManifoldVertex> {
        let mut moved = chain.to_vec();
        let v = &mut moved[vi];
        v.p += du * v.dp_du + dv * v.dp_dv;
        v.n = (v.n + du * v.dn_du + dv * v.dn_dv).normalize();
        moved
    }

    fn two_vertex_chain() -> Vec<ManifoldVertex> {
        vec![
            vertex(
                Point3::new(0.2, -0.1, 0.0),
                Vec3::z(),
                Vec3::new(0.05, -0.02, 1.0).normalize(),
                (Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 0.0)),
                1.5,
            ),
            vertex(
                Point3::new(0.4, 0.1, 0.5),
                Vec3::new(0.1, 0.0, 1.0).normalize(),
                Vec3::new(0.1, 0.0, 1.0).normalize(),
                (Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 0.0)),
                1.33,
            ),
        ]
    }

    fn constraints(chain: &mut [ManifoldVertex], surface: &Point3, light: &LightTarget) -> Vec<Vec2> {
        compute_constraint_derivatives(chain, surface, light).unwrap();
        chain.iter().map(|v| v.constraint).collect()
    }

    #[test]
    fn test_snell_satisfied_gives_zero_constraint() {
        // Straight down through a horizontal interface.
        let mut chain = vec![vertex(Point3::origin(), Vec3::z(), Vec3::z(), (Vec3::zeros(), Vec3::zeros()), 1.5)];
        let surface = Point3::new(0.0, 0.0, -1.0);
        let light = LightTarget::Position(Point3::new(0.0, 0.0, 2.0));
        let norm = compute_constraint_derivatives(&mut chain, &surface, &light).unwrap();
        assert_abs_diff_eq!(norm, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_too_close_fails() {
        let mut chain = vec![vertex(Point3::origin(), Vec3::z(), Vec3::z(), (Vec3::zeros(), Vec3::zeros()), 1.5)];
        let surface = Point3::new(0.0, 0.0, -0.0005);
        let light = LightTarget::Position(Point3::new(0.0, 0.0, 2.0));
        assert!(compute_constraint_derivatives(&mut chain, &surface, &light).is_none());
    }

    #[test]
    fn test_unit_ratio_is_degenerate() {
        // eta = 1 along a straight line cancels the half vector.
        let mut chain = vec![vertex(Point3::origin(), Vec3::z(), Vec3::z(), (Vec3::zeros(), Vec3::zeros()), 1.0)];
        let surface = Point3::new(0.0, 0.0, -1.0);
        let light = LightTarget::Position(Point3::new(0.0, 0.0, 1.0));
        assert!(compute_constraint_derivatives(&mut chain, &surface, &light).is_none());
    }

    #[test]
    fn test_blocks_match_finite_differences() {
        let surface = Point3::new(-0.3, 0.2, -1.0);
        let light = LightTarget::Position(Point3::new(1.0, 0.5, 1.5));
        let mut chain = two_vertex_chain();
        let base = constraints(&mut chain, &surface, &light);
        let h = 1e-6;

        for vi in 0..chain.len() {
            for (col, (du, dv)) in [(h, 0.0), (0.0, h)].into_iter().enumerate() {
                let mut moved = displaced(&chain, vi, du, dv);
                let shifted = constraints(&mut moved, &surface, &light);
                for ci in 0..chain.len() {
                    let fd = (shifted[ci] - base[ci]) / h;
                    let block: Mat22 = if ci == vi {
                        chain[ci].b
                    } else if ci + 1 == vi {
                        chain[ci].c
                    } else if ci == vi + 1 {
                        chain[ci].a
                    } else {
                        Mat22::zeros()
                    };
                    assert_abs_diff_eq!(fd.x, block[(0, col)], epsilon = 1e-4);
                    assert_abs_diff_eq!(fd.y, block[(1, col)], epsilon = 1e-4);
                }
            }
        }
    }

    #[test]
    fn test_curved_b_block_matches_finite_differences() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let k = rng.gen_range(-0.5..0.5);
            let n = Vec3::new(rng.gen_range(-0.2..0.2), rng.gen_range(-0.2..0.2), 1.0).normalize();
            let (s, t) = make_orthonormals(&Vec3::z());
            // A normal field bending along both tangents.
            let dn_du = k * (s - n * n.dot(&s));
            let dn_dv = 0.5 * k * (t - n * n.dot(&t));
            let mut chain = vec![vertex(Point3::origin(), Vec3::z(), n, (dn_du, dn_dv), 1.5)];
            let surface = Point3::new(rng.gen_range(-0.5..0.5), rng.gen_range(-0.5..0.5), -1.0);
            let light = LightTarget::Position(Point3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                1.0,
            ));
            let base = constraints(&mut chain, &surface, &light)[0];
            let h = 1e-6;
            for (col, (du, dv)) in [(h, 0.0), (0.0, h)].into_iter().enumerate() {
                let mut moved = displaced(&chain, 0, du, dv);
                let fd = (constraints(&mut moved, &surface, &light)[0] - base) / h;
                assert_abs_diff_eq!(fd.x, chain[0].b[(0, col)], epsilon = 1e-4);
                assert_abs_diff_eq!(fd.y, chain[0].b[(1, col)], epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_fixed_direction_drops_outgoing_term() {
        let surface = Point3::new(-0.3, 0.2, -1.0);
        let light = LightTarget::Direction(Vec3::new(0.2, 0.1, 1.0).normalize());
        let mut chain = two_vertex_chain();
        let base = constraints(&mut chain, &surface, &light);
        let h = 1e-6;
        let last = chain.len() - 1;
        for (col, (du, dv)) in [(h, 0.0), (0.0, h)].into_iter().enumerate() {
            let mut moved = displaced(&chain, last, du, dv);
            let fd = (constraints(&mut moved, &surface, &light)[last] - base[last]) / h;
            assert_abs_diff_eq!(fd.x, chain[last].b[(0, col)], epsilon = 1e-4);
            assert_abs_diff_eq!(fd.y, chain[last].b[(1, col)], epsilon = 1e-4);
        }
    }
}
