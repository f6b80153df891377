//! Caustic connections from a diffuse shading point to a light sample.

use caustica_math::{Point2, Vec2};
use caustica_scene::{Intersector, Ray, Scene, SurfacePoint};
use caustica_shading::{
    sample_microfacet_dh, LightEvaluator, LightSample, PathFlags, PathState, ShaderEvaluator,
};
use rayon::prelude::*;

use crate::chain::Chain;
use crate::constants::MAX_INTERSECTION_COUNT;
use crate::constraint::LightTarget;
use crate::contribution::{evaluate_path_contribution, MneeContribution};
use crate::settings::MneeSettings;
use crate::vertex::setup_manifold_vertex;
use crate::walk::NewtonWalk;

/// Collect the refractive interfaces between `surface` and the light.
///
/// A ray toward the light sample (or along its fixed direction) records
/// every caustic caster it crosses, ignoring other occluders. Returns
/// `None` when nothing was crossed, more casters than a chain holds were
/// crossed, or a caster lacks smooth normals or a refractive closure.
///
/// Rough interfaces get a half-vector offset sampled with `bsdf_rand`.
pub fn seed_chain<S: ShaderEvaluator + ?Sized>(
    scene: &Scene,
    shaders: &S,
    surface: &SurfacePoint,
    state: &PathState,
    ls: &LightSample,
    bsdf_rand: Point2,
) -> Option<Chain> {
    let ray = if ls.fixed_direction {
        Ray::new(surface.p, ls.d)
    } else {
        Ray::between(surface.p, ls.p)?
    };
    let mut ray = ray
        .with_time(surface.time)
        .excluding(Some(surface.prim_ref()))
        .with_differentials(surface.dp, 0.0);

    let mut chain = Chain::new();
    for _ in 0..MAX_INTERSECTION_COUNT {
        let Some(hit) = scene.intersect(&ray) else {
            break;
        };
        let object = scene.object(hit.object)?;
        if object.is_caustics_caster() {
            if chain.is_full() || !object.is_smooth(hit.prim) {
                return None;
            }
            let sp = scene.surface_point(&ray, &hit)?;
            let bsdf = shaders.eval_surface(&sp, state).first_refractive()?;

            // Closures are oriented toward the ray; vertices keep the
            // front-side ratio.
            let eta = if sp.backfacing { 1.0 / bsdf.ior } else { bsdf.ior };
            let n_offset = if bsdf.alpha_x > 0.0 && bsdf.alpha_y > 0.0 {
                sample_microfacet_dh(bsdf.distribution, bsdf.alpha_x, bsdf.alpha_y, bsdf_rand)
            } else {
                Vec2::zeros()
            };
            chain.push(setup_manifold_vertex(scene, &ray, &hit, bsdf, eta, n_offset)?);
        }
        ray.skip_hit(&hit);
    }

    if chain.is_empty() {
        None
    } else {
        Some(chain)
    }
}

/// A single caustic connection request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MneeQuery {
    /// Diffuse shading point on a receiver.
    pub surface: SurfacePoint,
    /// Path state at the shading point.
    pub state: PathState,
    /// Light sample taken from the shading point.
    pub light: LightSample,
    /// Random numbers for half-vector sampling.
    pub bsdf_rand: Point2,
}

/// Everything the solver reads: scene, shaders, lights and settings.
pub struct MneeContext<'a, S: ?Sized, L: ?Sized> {
    /// Scene geometry.
    pub scene: &'a Scene,
    /// Shader evaluator.
    pub shaders: &'a S,
    /// Light evaluator.
    pub lights: &'a L,
    /// Integrator settings.
    pub settings: &'a MneeSettings,
}

impl<'a, S, L> MneeContext<'a, S, L>
where
    S: ShaderEvaluator + ?Sized,
    L: LightEvaluator + ?Sized,
{
    /// Bundle the solver inputs.
    pub fn new(scene: &'a Scene, shaders: &'a S, lights: &'a L, settings: &'a MneeSettings) -> Self {
        Self {
            scene,
            shaders,
            lights,
            settings,
        }
    }

    /// Try to connect `surface` to the light sample through refractive
    /// interfaces.
    ///
    /// On return `state` carries [`PathFlags::MNEE_VALID`] when a chain
    /// passed seeding and the depth limits, and [`PathFlags::MNEE_SUCCESS`]
    /// when a contribution was produced. Bounce counters are left as they
    /// were.
    pub fn sample(
        &self,
        surface: &SurfacePoint,
        state: &mut PathState,
        ls: &LightSample,
        bsdf_rand: Point2,
    ) -> Option<MneeContribution> {
        state
            .flags
            .remove(PathFlags::MNEE_VALID | PathFlags::MNEE_SUCCESS);

        let receiver = self.scene.object(surface.object);
        if !self.settings.enabled || !receiver.is_some_and(|o| o.is_caustics_receiver()) {
            return None;
        }

        let chain = seed_chain(self.scene, self.shaders, surface, state, ls, bsdf_rand)?;
        if !self.within_depth_limits(state, chain.len() as u32) {
            return None;
        }
        state.flags.insert(PathFlags::MNEE_VALID);

        let mut walk = NewtonWalk::new(self.scene, surface, LightTarget::from_sample(ls), chain);
        if !walk.run().is_converged() {
            return None;
        }
        let chain = walk.into_chain();

        let contribution = evaluate_path_contribution(
            self.scene,
            self.shaders,
            self.lights,
            surface,
            state,
            ls,
            &chain,
        )?;
        state.flags.insert(PathFlags::MNEE_SUCCESS);
        Some(contribution)
    }

    /// Evaluate independent queries in parallel.
    ///
    /// Each query works on its own copy of the path state, so the results
    /// equal evaluating the queries one by one.
    pub fn estimate_batch(&self, queries: &[MneeQuery]) -> Vec<Option<MneeContribution>> {
        log::debug!("estimating {} caustic connections", queries.len());
        queries
            .par_iter()
            .map(|query| {
                let mut state = query.state;
                self.sample(&query.surface, &mut state, &query.light, query.bsdf_rand)
            })
            .collect()
    }

    fn within_depth_limits(&self, state: &PathState, count: u32) -> bool {
        state.transmission_bounce + count - 1 < self.settings.max_transmission_bounce
            && state.diffuse_bounce + 1 < self.settings.max_diffuse_bounce
            && state.bounce + count < self.settings.max_bounce
    }
}
