#![warn(missing_docs)]

//! Shading interfaces for the caustica kernel.
//!
//! Closures, microfacet helpers, the shader evaluator, lights and path
//! state. The specular solver only sees these through the
//! [`ShaderEvaluator`] and [`LightEvaluator`] traits.
//!
//! # Architecture
//!
//! - [`closure`] - BSDF lobes and the fixed-capacity [`ClosureSet`]
//! - [`microfacet`] - Shadowing terms, half-vector sampling, interface throughput
//! - [`shader`] - [`ShaderEvaluator`] and the table-driven [`ShaderTable`]
//! - [`light`] - Point, rectangular and distant lights
//! - [`path`] - Bounce counters and [`PathFlags`]

pub mod closure;
pub mod light;
pub mod microfacet;
pub mod path;
pub mod shader;

/// RGB spectrum.
pub type Spectrum = nalgebra::Vector3<f64>;

pub use closure::{
    Closure, ClosureSet, DiffuseBsdf, MicrofacetBsdf, MicrofacetDistribution, MAX_CLOSURES,
};
pub use light::{Light, LightEvaluator, LightList, LightSample};
pub use microfacet::sample_microfacet_dh;
pub use path::{PathFlags, PathState};
pub use shader::{Material, ShaderEvaluator, ShaderTable};
