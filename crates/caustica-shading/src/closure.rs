//! BSDF closures produced by shader evaluation.

use std::f64::consts::FRAC_1_PI;

use caustica_math::Vec3;

use crate::Spectrum;

/// Maximum number of closures a single shader evaluation can produce.
pub const MAX_CLOSURES: usize = 8;

/// Microfacet normal distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MicrofacetDistribution {
    /// Trowbridge-Reitz.
    #[default]
    Ggx,
    /// Beckmann-Spizzichino.
    Beckmann,
}

/// Lambertian reflection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffuseBsdf {
    /// Closure weight.
    pub weight: Spectrum,
    /// Shading normal.
    pub n: Vec3,
}

impl Default for DiffuseBsdf {
    fn default() -> Self {
        Self {
            weight: Spectrum::zeros(),
            n: Vec3::zeros(),
        }
    }
}

impl DiffuseBsdf {
    /// `weight * cos / pi` toward `omega_in`, zero below the surface.
    pub fn eval(&self, omega_in: &Vec3) -> Spectrum {
        let cos = self.n.dot(omega_in);
        if cos > 0.0 {
            self.weight * (cos * FRAC_1_PI)
        } else {
            Spectrum::zeros()
        }
    }
}

/// Rough dielectric interface.
///
/// `ior` is the ratio across the interface as seen from the side the
/// shading point was reached from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MicrofacetBsdf {
    /// Closure weight.
    pub weight: Spectrum,
    /// Shading normal.
    pub n: Vec3,
    /// Roughness along the first tangent.
    pub alpha_x: f64,
    /// Roughness along the second tangent.
    pub alpha_y: f64,
    /// Relative index of refraction.
    pub ior: f64,
    /// Normal distribution.
    pub distribution: MicrofacetDistribution,
}

impl Default for MicrofacetBsdf {
    fn default() -> Self {
        Self {
            weight: Spectrum::zeros(),
            n: Vec3::zeros(),
            alpha_x: 0.0,
            alpha_y: 0.0,
            ior: 1.0,
            distribution: MicrofacetDistribution::Ggx,
        }
    }
}

/// A single BSDF lobe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Closure {
    /// Lambertian reflection.
    Diffuse(DiffuseBsdf),
    /// Refraction only.
    MicrofacetRefraction(MicrofacetBsdf),
    /// Reflection and refraction with Fresnel weighting.
    MicrofacetGlass(MicrofacetBsdf),
}

impl Default for Closure {
    fn default() -> Self {
        Closure::Diffuse(DiffuseBsdf::default())
    }
}

impl Closure {
    /// The microfacet interface if this lobe transmits light.
    pub fn refractive(&self) -> Option<&MicrofacetBsdf> {
        match self {
            Closure::MicrofacetRefraction(bsdf) | Closure::MicrofacetGlass(bsdf) => Some(bsdf),
            Closure::Diffuse(_) => None,
        }
    }

    /// BSDF times cosine toward `omega_in`.
    ///
    /// Only diffuse lobes respond to explicit light directions; microfacet
    /// interfaces are handled by the specular solver.
    pub fn eval(&self, omega_in: &Vec3) -> Spectrum {
        match self {
            Closure::Diffuse(bsdf) => bsdf.eval(omega_in),
            Closure::MicrofacetRefraction(_) | Closure::MicrofacetGlass(_) => Spectrum::zeros(),
        }
    }
}

/// Fixed-capacity list of closures.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClosureSet {
    closures: [Closure; MAX_CLOSURES],
    len: usize,
}

impl ClosureSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a closure. Returns `false` when the set is full.
    pub fn push(&mut self, closure: Closure) -> bool {
        if self.len == MAX_CLOSURES {
            return false;
        }
        self.closures[self.len] = closure;
        self.len += 1;
        true
    }

    /// Number of closures.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the set holds no closures.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate over the closures.
    pub fn iter(&self) -> impl Iterator<Item = &Closure> {
        self.closures[..self.len].iter()
    }

    /// First transmissive microfacet lobe, copied out.
    pub fn first_refractive(&self) -> Option<MicrofacetBsdf> {
        self.iter().find_map(Closure::refractive).copied()
    }

    /// Sum of BSDF times cosine over every lobe toward `omega_in`.
    pub fn eval(&self, omega_in: &Vec3) -> Spectrum {
        self.iter().map(|c| c.eval(omega_in)).sum()
    }
}
