//! Newton walk on the specular manifold.
//!
//! Each iteration evaluates the chain constraints, solves for a tangent
//! space step, moves every vertex along its tangent plane by a damped
//! fraction `beta` of that step and projects it back onto its surface with
//! a ray cast. A step that misses a surface or stops refracting halves
//! `beta`; an accepted step doubles it up to one.

use caustica_math::{normalize_len, Point3, Vec2};
use caustica_scene::{Intersection, Intersector, ObjectId, PrimRef, Ray, Scene, SurfacePoint};

use crate::chain::Chain;
use crate::constants::{
    INITIAL_STEP_SIZE, MAX_CAUSTIC_CASTERS, MAX_INTERSECTION_COUNT, MAX_ITERATIONS,
    MINIMUM_STEP_SIZE, MIN_PROGRESS_DISTANCE, PROJECTION_DISTANCE_MULTIPLIER, SOLVER_THRESHOLD,
};
use crate::constraint::{compute_constraint_derivatives, LightTarget};
use crate::solve::{solve_block_tridiagonal, Displacements};
use crate::vertex::setup_manifold_vertex;

/// Why a walk stopped without converging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkFailure {
    /// Two chain elements came closer than the minimum distance.
    DegenerateDistance,
    /// A pivot block of the constraint Jacobian was singular.
    SingularBlock,
    /// The step scale shrank below the minimum.
    StepUnderflow,
    /// A vertex stopped moving.
    NoProgress,
    /// The iteration budget ran out.
    IterationBudget,
}

/// Result of a single Newton iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStep {
    /// The tentative chain was committed.
    Accepted,
    /// The tentative chain was discarded and the step scale halved.
    Rejected,
    /// The constraints are satisfied.
    Converged,
    /// The walk cannot continue.
    Failed(WalkFailure),
}

/// Final result of a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    /// The constraints are satisfied after `iterations` iterations.
    Converged {
        /// Iterations used, including the one that detected convergence.
        iterations: usize,
    },
    /// The walk stopped without a solution.
    Failed(WalkFailure),
}

impl WalkOutcome {
    /// Whether the walk found a solution.
    pub fn is_converged(&self) -> bool {
        matches!(self, WalkOutcome::Converged { .. })
    }
}

/// Newton solver state for one chain.
///
/// The walk owns the chain it moves plus its scratch. Once a terminal
/// result is reached, further calls to [`step`](Self::step) repeat it.
pub struct NewtonWalk<'a> {
    scene: &'a Scene,
    surface: &'a SurfacePoint,
    light: LightTarget,
    chain: Chain,
    tentative: Chain,
    dx: Displacements,
    beta: f64,
    resolve_constraint: bool,
    iterations: usize,
    finished: Option<WalkStep>,
}

impl<'a> NewtonWalk<'a> {
    /// Prepare a walk of `chain` between `surface` and `light`.
    pub fn new(scene: &'a Scene, surface: &'a SurfacePoint, light: LightTarget, chain: Chain) -> Self {
        Self {
            scene,
            surface,
            light,
            chain,
            tentative: chain,
            dx: [Vec2::zeros(); MAX_CAUSTIC_CASTERS],
            beta: INITIAL_STEP_SIZE,
            resolve_constraint: true,
            iterations: 0,
            finished: None,
        }
    }

    /// Current step scale.
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Iterations run so far.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// The committed chain.
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Give up the walk and keep the committed chain.
    pub fn into_chain(self) -> Chain {
        self.chain
    }

    /// Run one Newton iteration.
    pub fn step(&mut self) -> WalkStep {
        if let Some(done) = self.finished {
            return done;
        }
        let result = self.iterate();
        if matches!(result, WalkStep::Converged | WalkStep::Failed(_)) {
            self.finished = Some(result);
        }
        result
    }

    /// Iterate until convergence, failure or the iteration budget.
    pub fn run(&mut self) -> WalkOutcome {
        loop {
            match self.step() {
                WalkStep::Converged => {
                    return WalkOutcome::Converged {
                        iterations: self.iterations,
                    }
                }
                WalkStep::Failed(failure) => return WalkOutcome::Failed(failure),
                WalkStep::Accepted | WalkStep::Rejected => {}
            }
        }
    }

    fn iterate(&mut self) -> WalkStep {
        if self.iterations >= MAX_ITERATIONS {
            return WalkStep::Failed(WalkFailure::IterationBudget);
        }
        self.iterations += 1;

        if self.resolve_constraint {
            let Some(residual) =
                compute_constraint_derivatives(&mut self.chain, &self.surface.p, &self.light)
            else {
                return WalkStep::Failed(WalkFailure::DegenerateDistance);
            };
            if residual < SOLVER_THRESHOLD {
                return WalkStep::Converged;
            }
            match solve_block_tridiagonal(&self.chain) {
                Some(dx) => self.dx = dx,
                None => return WalkStep::Failed(WalkFailure::SingularBlock),
            }
        }

        match self.propose() {
            Err(failure) => WalkStep::Failed(failure),
            Ok(false) => {
                self.resolve_constraint = false;
                self.beta *= 0.5;
                if self.beta < MINIMUM_STEP_SIZE {
                    WalkStep::Failed(WalkFailure::StepUnderflow)
                } else {
                    WalkStep::Rejected
                }
            }
            Ok(true) => {
                self.chain = self.tentative;
                self.resolve_constraint = true;
                self.beta = (2.0 * self.beta).min(1.0);
                WalkStep::Accepted
            }
        }
    }

    /// Build the tentative chain. `Ok(false)` rejects the step.
    fn propose(&mut self) -> Result<bool, WalkFailure> {
        let count = self.chain.len();
        self.tentative = self.chain;

        for vi in 0..count {
            let mv = self.chain[vi];
            let offset = self.dx[vi].x * mv.dp_du + self.dx[vi].y * mv.dp_dv;
            let mut tentative_p = mv.p - self.beta * offset;

            // Early steps can push the first vertex behind the receiver.
            if vi == 0 && self.surface.ng.dot(&(tentative_p - self.surface.p)) <= 0.0 {
                tentative_p = mv.p + self.beta * offset;
            }

            let (origin, exclude) = if vi == 0 {
                (self.surface.p, self.surface.prim_ref())
            } else {
                let pv = &self.tentative[vi - 1];
                (pv.p, pv.prim_ref())
            };

            let Some((ray, hit)) = self.project(origin, exclude, &tentative_p, mv.object) else {
                return Ok(false);
            };

            let Some(tv) =
                setup_manifold_vertex(self.scene, &ray, &hit, mv.bsdf, mv.eta, mv.n_offset)
            else {
                return Ok(false);
            };
            if (tv.p - mv.p).norm() < MIN_PROGRESS_DISTANCE {
                return Err(WalkFailure::NoProgress);
            }
            self.tentative[vi] = tv;
        }

        for vi in 0..count {
            let tv = &self.tentative[vi];
            let prev_p = if vi == 0 { self.surface.p } else { self.tentative[vi - 1].p };
            let wi = prev_p - tv.p;
            let wo = if vi + 1 == count {
                self.light.direction_from(&tv.p)
            } else {
                self.tentative[vi + 1].p - tv.p
            };
            if tv.n.dot(&wi) * tv.n.dot(&wo) >= 0.0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Cast from `origin` toward `target` until `owner` is hit, skipping
    /// other surfaces.
    fn project(
        &self,
        origin: Point3,
        exclude: PrimRef,
        target: &Point3,
        owner: ObjectId,
    ) -> Option<(Ray, Intersection)> {
        let (dir, dist) = normalize_len(&(target - origin));
        if dist <= 0.0 {
            return None;
        }
        let mut ray = Ray::new(origin, dir)
            .with_range(0.0, dist * PROJECTION_DISTANCE_MULTIPLIER)
            .with_time(self.surface.time)
            .excluding(Some(exclude))
            .with_differentials(self.surface.dp, 0.0);

        for _ in 0..MAX_INTERSECTION_COUNT {
            let hit = self.scene.intersect(&ray)?;
            if hit.object == owner {
                return Some((ray, hit));
            }
            ray.skip_hit(&hit);
        }
        None
    }
}
