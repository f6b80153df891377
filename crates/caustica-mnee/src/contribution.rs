//! Throughput of a solved chain.

use std::ops::{Deref, DerefMut};

use caustica_math::normalize_len;
use caustica_scene::{Intersection, Intersector, Ray, Scene, SurfacePoint};
use caustica_shading::{LightEvaluator, LightSample, PathState, ShaderEvaluator, Spectrum};

use crate::chain::Chain;
use crate::constants::{MAX_GEOMETRY_TERM, MIN_DISTANCE};
use crate::constraint::LightTarget;
use crate::transfer::{compute_transfer_matrix, TransferTerms};

/// A caustic connection found by the solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MneeContribution {
    /// Receiver BSDF times light over pdf, geometry term and every
    /// interface's transmission.
    pub throughput: Spectrum,
    /// Generalized geometry term, clamped to [`MAX_GEOMETRY_TERM`].
    pub geometry_term: f64,
    /// Change-of-variable terms of the chain.
    pub transfer: TransferTerms,
    /// The solved vertices.
    pub chain: Chain,
}

impl MneeContribution {
    /// Number of refractive interfaces crossed.
    pub fn vertex_count(&self) -> usize {
        self.chain.len()
    }
}

/// Bumps path bounce counters for the duration of a contribution
/// evaluation and restores them when dropped.
pub struct BounceGuard<'s> {
    state: &'s mut PathState,
    bounce: u32,
    diffuse_bounce: u32,
    transmission_bounce: u32,
}

impl<'s> BounceGuard<'s> {
    /// Remember the counters of `state`.
    pub fn new(state: &'s mut PathState) -> Self {
        Self {
            bounce: state.bounce,
            diffuse_bounce: state.diffuse_bounce,
            transmission_bounce: state.transmission_bounce,
            state,
        }
    }
}

impl Deref for BounceGuard<'_> {
    type Target = PathState;

    fn deref(&self) -> &PathState {
        self.state
    }
}

impl DerefMut for BounceGuard<'_> {
    fn deref_mut(&mut self) -> &mut PathState {
        self.state
    }
}

impl Drop for BounceGuard<'_> {
    fn drop(&mut self) {
        self.state.bounce = self.bounce;
        self.state.diffuse_bounce = self.diffuse_bounce;
        self.state.transmission_bounce = self.transmission_bounce;
    }
}

/// Evaluate the throughput of a converged chain.
///
/// Shaders along the chain see the path's bounce counters advanced past
/// the chain; `state` is restored before returning. Returns `None` when
/// any vertex is occluded or misplaced, an interface lost its refractive
/// closure, the light is blocked or a pdf or transfer term degenerates.
pub fn evaluate_path_contribution<S, L>(
    scene: &Scene,
    shaders: &S,
    lights: &L,
    surface: &SurfacePoint,
    state: &mut PathState,
    ls: &LightSample,
    chain: &Chain,
) -> Option<MneeContribution>
where
    S: ShaderEvaluator + ?Sized,
    L: LightEvaluator + ?Sized,
{
    let count = chain.len();
    let first = chain.first()?;
    let last = chain.last()?;

    let (mut wo, wo_len) = normalize_len(&(first.p - surface.p));
    if wo_len <= 0.0 {
        return None;
    }
    let mut throughput = shaders.eval_surface(surface, state).eval(&wo);

    let mut ls = *ls;
    lights.update_position(&mut ls, last.p);
    if ls.pdf <= 0.0 {
        return None;
    }
    let target = LightTarget::from_sample(&ls);

    let mut guard = BounceGuard::new(state);
    guard.diffuse_bounce += 1;

    let light_eval = lights.eval(&ls, surface.time);
    throughput = throughput.component_mul(&light_eval) / ls.pdf;

    let transfer = compute_transfer_matrix(chain, &surface.p, &ls)?;
    let dw0_dx1 = wo.dot(&first.n).abs() / (wo_len * wo_len);
    let geometry_term = (dw0_dx1 * transfer.dx1_dxlight).min(MAX_GEOMETRY_TERM);
    throughput *= geometry_term;

    guard.transmission_bounce += count as u32 - 1;
    guard.bounce += count as u32;

    let mut origin = surface.p;
    let mut exclude = surface.prim_ref();
    for (vi, v) in chain.iter().enumerate() {
        let (dir, dist) = normalize_len(&(v.p - origin));
        if dist <= 0.0 {
            return None;
        }
        let probe = Ray::new(origin, dir)
            .with_range(0.0, dist)
            .with_time(surface.time)
            .excluding(Some(exclude))
            .with_differentials(surface.dp, 0.0);
        if let Some(hit) = scene.intersect(&probe) {
            if hit.object != v.object || (dist - hit.t).abs() > MIN_DISTANCE {
                return None;
            }
        }

        let wi = -wo;
        let to_next = match chain.get(vi + 1) {
            Some(next) => next.p - v.p,
            None => target.direction_from(&v.p),
        };
        let (next_wo, next_len) = normalize_len(&to_next);
        if next_len <= 0.0 {
            return None;
        }
        wo = next_wo;

        let isect = Intersection {
            t: dist,
            u: v.uv.x,
            v: v.uv.y,
            object: v.object,
            prim: v.prim,
            kind: v.kind,
        };
        let sp = scene.surface_point(&probe, &isect)?;
        let bsdf = shaders.eval_surface(&sp, &guard).first_refractive()?;
        throughput = throughput.component_mul(&bsdf.refraction_contribution(&wi, &wo));

        origin = v.p;
        exclude = v.prim_ref();
    }

    let shadow = if ls.fixed_direction {
        Ray::new(origin, ls.d)
    } else {
        Ray::between(origin, ls.p)?
    };
    let shadow = shadow
        .with_time(surface.time)
        .excluding(Some(exclude))
        .with_differentials(surface.dp, 0.0);
    if scene.intersect(&shadow).is_some() {
        return None;
    }

    Some(MneeContribution {
        throughput,
        geometry_term,
        transfer,
        chain: *chain,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use caustica_math::{Point3, Vec3};
    use caustica_scene::{Mesh, Object, ObjectFlags, SceneOptions};
    use caustica_shading::{ClosureSet, Light};

    use crate::fixtures::{PaneScene, PaneSetup};
    use crate::walk::NewtonWalk;

    fn solved(fixture: &PaneScene, surface: &SurfacePoint, ls: &LightSample) -> Chain {
        let light = match LightTarget::from_sample(ls) {
            LightTarget::Position(p) => p,
            LightTarget::Direction(_) => unreachable!(),
        };
        let chain = fixture.seed(surface, &light).unwrap();
        let mut walk = NewtonWalk::new(&fixture.scene, surface, LightTarget::Position(light), chain);
        assert!(walk.run().is_converged());
        walk.into_chain()
    }

    /// Records the bounce counters it was evaluated with.
    struct Spy<'a> {
        inner: &'a dyn ShaderEvaluator,
        seen: std::sync::Mutex<Vec<PathState>>,
    }

    impl ShaderEvaluator for Spy<'_> {
        fn eval_surface(&self, sp: &SurfacePoint, state: &PathState) -> ClosureSet {
            self.seen.lock().unwrap().push(*state);
            self.inner.eval_surface(sp, state)
        }
    }

    #[test]
    fn test_bounce_guard_restores() {
        let mut state = PathState {
            bounce: 2,
            diffuse_bounce: 1,
            transmission_bounce: 0,
            ..Default::default()
        };
        {
            let mut guard = BounceGuard::new(&mut state);
            guard.bounce += 3;
            guard.diffuse_bounce += 1;
            guard.transmission_bounce += 2;
            assert_eq!(guard.bounce, 5);
        }
        assert_eq!(state.bounce, 2);
        assert_eq!(state.diffuse_bounce, 1);
        assert_eq!(state.transmission_bounce, 0);
    }

    #[test]
    fn test_flat_pane_contribution() {
        let fixture = PaneScene::new(PaneSetup::default());
        let surface = fixture.receiver_point();
        let ls = fixture.light_sample(&surface);
        let chain = solved(&fixture, &surface, &ls);

        let spy = Spy {
            inner: &fixture.shaders,
            seen: Default::default(),
        };
        let mut state = PathState::default();
        let result = evaluate_path_contribution(
            &fixture.scene,
            &spy,
            &fixture.lights,
            &surface,
            &mut state,
            &ls,
            &chain,
        )
        .unwrap();

        assert!(result.throughput.x > 0.0 && result.throughput.x.is_finite());
        assert!(result.geometry_term > 0.0 && result.geometry_term <= MAX_GEOMETRY_TERM);
        assert_eq!(result.vertex_count(), 1);
        assert_eq!(state, PathState::default());

        // Receiver first with the original counters, then the interface
        // with the chain counted in.
        let seen = spy.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], PathState::default());
        assert_eq!(seen[1].bounce, 1);
        assert_eq!(seen[1].diffuse_bounce, 1);
        assert_eq!(seen[1].transmission_bounce, 0);
    }

    #[test]
    fn test_contribution_scales_with_light() {
        let dim = PaneScene::new(PaneSetup::default());
        let bright = PaneScene::with_light(
            PaneSetup::default(),
            Light::Point {
                position: Point3::new(1.0, -0.5, 1.0),
                intensity: Spectrum::repeat(20.0),
            },
        );
        let surface = dim.receiver_point();
        let ls = dim.light_sample(&surface);
        let chain = solved(&dim, &surface, &ls);

        let eval = |fixture: &PaneScene| {
            let mut state = PathState::default();
            evaluate_path_contribution(
                &fixture.scene,
                &fixture.shaders,
                &fixture.lights,
                &surface,
                &mut state,
                &ls,
                &chain,
            )
            .unwrap()
            .throughput
        };
        assert_relative_eq!(eval(&bright), 2.0 * eval(&dim), max_relative = 1e-12);
    }

    #[test]
    fn test_blocked_light_rejects() {
        let fixture = PaneScene::new(PaneSetup::default());
        let surface = fixture.receiver_point();
        let ls = fixture.light_sample(&surface);
        let chain = solved(&fixture, &surface, &ls);

        // Same scene plus an opaque plate just under the light.
        let mut builder = Scene::builder(SceneOptions::default());
        for object in fixture.scene.objects() {
            builder.add_object(object.clone()).unwrap();
        }
        let plate = Mesh::quad([
            Point3::new(0.5, -1.0, 0.9),
            Point3::new(1.5, -1.0, 0.9),
            Point3::new(1.5, 0.5, 0.9),
            Point3::new(0.5, 0.5, 0.9),
        ]);
        builder
            .add_object(Object::new(plate).with_flags(ObjectFlags::empty()))
            .unwrap();
        let blocked = builder.build();

        let mut state = PathState::default();
        assert!(evaluate_path_contribution(
            &blocked,
            &fixture.shaders,
            &fixture.lights,
            &surface,
            &mut state,
            &ls,
            &chain,
        )
        .is_none());
        assert_eq!(state, PathState::default());
    }

    #[test]
    fn test_moved_vertex_rejects() {
        let fixture = PaneScene::new(PaneSetup::default());
        let surface = fixture.receiver_point();
        let ls = fixture.light_sample(&surface);
        let mut chain = solved(&fixture, &surface, &ls);
        // Claim the vertex sits above the pane.
        chain[0].p += Vec3::new(0.0, 0.0, 0.05);
        let mut state = PathState::default();
        assert!(evaluate_path_contribution(
            &fixture.scene,
            &fixture.shaders,
            &fixture.lights,
            &surface,
            &mut state,
            &ls,
            &chain,
        )
        .is_none());
    }
}
