#![warn(missing_docs)]

//! Manifold next event estimation for caustics through refractive surfaces.
//!
//! Direct light reaching a diffuse receiver through glass cannot be found by
//! shadow rays. This crate seeds a chain of refractive vertices along the
//! straight line to a light sample and walks it with Newton iterations over
//! the surfaces until every vertex satisfies the generalized law of
//! refraction, then weighs the connection by its geometry term and the
//! transmission of each interface.
//!
//! # Architecture
//!
//! - [`vertex`] - Manifold vertices with tangent frames and normal derivatives
//! - [`chain`] - Fixed-capacity vertex chains
//! - [`constraint`] - Half-vector constraints and their block derivatives
//! - [`solve`] - Block tridiagonal solver for the Newton step
//! - [`walk`] - The Newton walk over the surface manifold
//! - [`transfer`] - Light-to-vertex transfer matrix and geometry term inputs
//! - [`contribution`] - Throughput of a converged chain
//! - [`sample`] - Seeding, depth limits and the [`MneeContext`] entry point
//! - [`settings`] - Serializable [`MneeSettings`]
//!
//! # Example
//!
//! ```ignore
//! use caustica_mnee::{MneeContext, MneeSettings};
//!
//! let settings = MneeSettings::from_path("render.toml")?;
//! let ctx = MneeContext::new(&scene, &shaders, &lights, &settings);
//!
//! let mut state = PathState::default();
//! if let Some(hit) = ctx.sample(&surface, &mut state, &light_sample, bsdf_rand) {
//!     radiance += hit.throughput;
//! }
//! ```

pub mod chain;
pub mod constants;
pub mod constraint;
pub mod contribution;
pub mod error;
pub mod sample;
pub mod settings;
pub mod solve;
pub mod transfer;
pub mod vertex;
pub mod walk;

#[cfg(test)]
mod fixtures;

pub use chain::Chain;
pub use constraint::{compute_constraint_derivatives, LightTarget};
pub use contribution::{evaluate_path_contribution, BounceGuard, MneeContribution};
pub use error::{Result, SettingsError};
pub use sample::{seed_chain, MneeContext, MneeQuery};
pub use settings::MneeSettings;
pub use solve::{solve_block_tridiagonal, Displacements};
pub use transfer::{compute_transfer_matrix, TransferTerms};
pub use vertex::{setup_manifold_vertex, ManifoldVertex};
pub use walk::{NewtonWalk, WalkFailure, WalkOutcome, WalkStep};
