//! Shader evaluation.

use caustica_scene::SurfacePoint;
use serde::{Deserialize, Serialize};

use crate::closure::{Closure, ClosureSet, DiffuseBsdf, MicrofacetBsdf, MicrofacetDistribution};
use crate::path::PathState;
use crate::Spectrum;

/// Evaluates the closures of the shader attached to a surface point.
pub trait ShaderEvaluator: Sync {
    /// Closures at `sp` for a path in `state`.
    fn eval_surface(&self, sp: &SurfacePoint, state: &PathState) -> ClosureSet;
}

/// A fixed material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Material {
    /// Lambertian surface.
    Diffuse {
        /// Albedo.
        color: [f64; 3],
    },
    /// Dielectric that only transmits.
    Refraction {
        /// Transmission tint.
        color: [f64; 3],
        /// Roughness along the first tangent.
        alpha_x: f64,
        /// Roughness along the second tangent.
        alpha_y: f64,
        /// Index of refraction inside the surface.
        ior: f64,
        /// Normal distribution.
        #[serde(default)]
        distribution: MicrofacetDistribution,
    },
    /// Dielectric with reflection and transmission.
    Glass {
        /// Tint.
        color: [f64; 3],
        /// Isotropic roughness.
        roughness: f64,
        /// Index of refraction inside the surface.
        ior: f64,
        /// Normal distribution.
        #[serde(default)]
        distribution: MicrofacetDistribution,
    },
}

/// Shader table indexed by the triangle's shader id.
///
/// Unknown ids evaluate to an empty closure set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShaderTable {
    /// Materials by shader id.
    pub materials: Vec<Material>,
}

impl ShaderTable {
    /// A table holding `materials`.
    pub fn new(materials: Vec<Material>) -> Self {
        Self { materials }
    }

    /// Append a material and return its shader id.
    pub fn add(&mut self, material: Material) -> u32 {
        self.materials.push(material);
        (self.materials.len() - 1) as u32
    }
}

fn interface(
    sp: &SurfacePoint,
    color: &[f64; 3],
    alpha_x: f64,
    alpha_y: f64,
    ior: f64,
    distribution: MicrofacetDistribution,
) -> MicrofacetBsdf {
    MicrofacetBsdf {
        weight: Spectrum::from(*color),
        n: sp.n,
        alpha_x,
        alpha_y,
        // Seen from inside, the ratio is reversed.
        ior: if sp.backfacing { 1.0 / ior } else { ior },
        distribution,
    }
}

impl ShaderEvaluator for ShaderTable {
    fn eval_surface(&self, sp: &SurfacePoint, _state: &PathState) -> ClosureSet {
        let mut closures = ClosureSet::new();
        let Some(material) = self.materials.get(sp.shader as usize) else {
            return closures;
        };
        match material {
            Material::Diffuse { color } => {
                closures.push(Closure::Diffuse(DiffuseBsdf {
                    weight: Spectrum::from(*color),
                    n: sp.n,
                }));
            }
            Material::Refraction {
                color,
                alpha_x,
                alpha_y,
                ior,
                distribution,
            } => {
                closures.push(Closure::MicrofacetRefraction(interface(
                    sp,
                    color,
                    *alpha_x,
                    *alpha_y,
                    *ior,
                    *distribution,
                )));
            }
            Material::Glass {
                color,
                roughness,
                ior,
                distribution,
            } => {
                closures.push(Closure::MicrofacetGlass(interface(
                    sp,
                    color,
                    *roughness,
                    *roughness,
                    *ior,
                    *distribution,
                )));
            }
        }
        closures
    }
}
