//! Microfacet shadowing, half-vector sampling and refraction throughput.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use caustica_math::{safe_normalize, Point2, Vec2, Vec3};

use crate::closure::{MicrofacetBsdf, MicrofacetDistribution};
use crate::Spectrum;

#[inline]
fn safe_sqrt(x: f64) -> f64 {
    x.max(0.0).sqrt()
}

/// Smith shadowing term of the GGX distribution.
#[inline]
pub fn ggx_g1(alpha2: f64, cos_n: f64) -> f64 {
    let cos2 = cos_n * cos_n;
    2.0 / (1.0 + safe_sqrt(1.0 + alpha2 * (1.0 - cos2) / cos2))
}

/// Rational approximation of the Beckmann shadowing term.
#[inline]
pub fn beckmann_g1(alpha: f64, cos_n: f64) -> f64 {
    let cos2 = cos_n * cos_n;
    let inv_a = alpha * safe_sqrt((1.0 - cos2) / cos2);
    if inv_a < 0.625 {
        return 1.0;
    }
    let a = 1.0 / inv_a;
    ((2.181 * a + 3.535) * a) / ((2.577 * a + 2.276) * a + 1.0)
}

/// Sample the projected half-vector offset `(h.s, h.t)` of a microfacet
/// distribution.
///
/// Anisotropic roughness uses the stretched azimuth. Zero roughness gives
/// the zero offset.
pub fn sample_microfacet_dh(
    distribution: MicrofacetDistribution,
    alpha_x: f64,
    alpha_y: f64,
    rand: Point2,
) -> Vec2 {
    let (sample_u, sample_v) = (rand.x, rand.y);
    let (sin_phi, cos_phi, alpha2) = if alpha_x == alpha_y {
        let (s, c) = (sample_v * TAU).sin_cos();
        (s, c, alpha_x * alpha_x)
    } else {
        let mut phi = (alpha_y / alpha_x * (TAU * sample_v + FRAC_PI_2).tan()).atan();
        if sample_v > 0.5 {
            phi += PI;
        }
        let (s, c) = phi.sin_cos();
        let alpha2 = 1.0 / (c * c / (alpha_x * alpha_x) + s * s / (alpha_y * alpha_y));
        (s, c, alpha2)
    };

    let tan2_theta = alpha2
        * match distribution {
            MicrofacetDistribution::Beckmann => -(1.0 - sample_u).ln(),
            MicrofacetDistribution::Ggx => sample_u / (1.0 - sample_u),
        };
    let cos2_theta = 1.0 / (1.0 + tan2_theta);
    let sin_theta = safe_sqrt(1.0 - cos2_theta);
    Vec2::new(cos_phi * sin_theta, sin_phi * sin_theta)
}

impl MicrofacetBsdf {
    /// Smith shadowing for direction cosine `cos_n`.
    pub fn g1(&self, cos_n: f64) -> f64 {
        match self.distribution {
            MicrofacetDistribution::Beckmann => beckmann_g1(self.alpha_x, cos_n),
            MicrofacetDistribution::Ggx => ggx_g1(self.alpha_x * self.alpha_y, cos_n),
        }
    }

    /// Throughput across the interface divided by the half-vector pdf.
    ///
    /// `wi` points back along the path toward the receiver, `wo` onward
    /// toward the light.
    pub fn refraction_contribution(&self, wi: &Vec3, wo: &Vec3) -> Spectrum {
        let cos_no = self.n.dot(wi);
        let cos_ni = self.n.dot(wo);
        let ht = safe_normalize(&-(self.ior * wo + wi));
        if ht == Vec3::zeros() {
            return Spectrum::zeros();
        }
        let cos_ho = ht.dot(wi);
        let cos_theta_m = self.n.dot(&ht);
        let g = self.g1(cos_no) * self.g1(cos_ni);
        let value = g * (cos_ho / (cos_no * cos_theta_m)).abs();
        if value.is_finite() {
            self.weight * value
        } else {
            Spectrum::zeros()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_g1_limits() {
        assert!((ggx_g1(0.0, 0.3) - 1.0).abs() < 1e-12);
        assert!((ggx_g1(0.25, 1.0) - 1.0).abs() < 1e-12);
        assert!(ggx_g1(0.25, 0.0).abs() < 1e-12);
        assert_eq!(beckmann_g1(0.1, 0.9), 1.0);
        let grazing = beckmann_g1(0.5, 0.05);
        assert!(grazing > 0.0 && grazing < 1.0);
        // Shadowing grows with roughness.
        assert!(ggx_g1(0.5, 0.4) < ggx_g1(0.1, 0.4));
    }

    #[test]
    fn test_sample_dh_zero_roughness() {
        let dh = sample_microfacet_dh(MicrofacetDistribution::Ggx, 0.0, 0.0, Point2::new(0.3, 0.7));
        assert_eq!(dh, Vec2::zeros());
    }

    #[test]
    fn test_sample_dh_inside_unit_disk() {
        let mut rng = StdRng::seed_from_u64(3);
        for distribution in [MicrofacetDistribution::Ggx, MicrofacetDistribution::Beckmann] {
            for &(ax, ay) in &[(0.2, 0.2), (0.1, 0.6), (0.8, 0.3)] {
                for _ in 0..200 {
                    let rand = Point2::new(rng.gen::<f64>(), rng.gen::<f64>());
                    let dh = sample_microfacet_dh(distribution, ax, ay, rand);
                    assert!(dh.norm() <= 1.0 + 1e-12);
                    assert!(dh.x.is_finite() && dh.y.is_finite());
                }
            }
        }
    }

    #[test]
    fn test_sample_dh_anisotropy_stretches() {
        let mut rng = StdRng::seed_from_u64(5);
        let (mut sx, mut sy) = (0.0, 0.0);
        for _ in 0..2000 {
            let rand = Point2::new(rng.gen::<f64>(), rng.gen::<f64>());
            let dh = sample_microfacet_dh(MicrofacetDistribution::Ggx, 0.05, 0.5, rand);
            sx += dh.x * dh.x;
            sy += dh.y * dh.y;
        }
        assert!(sy > 4.0 * sx);
    }

    #[test]
    fn test_refraction_contribution_smooth_interface() {
        let bsdf = MicrofacetBsdf {
            weight: Spectrum::repeat(1.0),
            n: Vec3::z(),
            ior: 1.5,
            ..Default::default()
        };
        // Normal incidence: wi above, wo straight through.
        let c = bsdf.refraction_contribution(&Vec3::z(), &-Vec3::z());
        assert!((c.x - 1.0).abs() < 1e-12);

        // Oblique, Snell-consistent pair.
        let sin_i: f64 = 0.5;
        let sin_t = sin_i / 1.5;
        let wi = Vec3::new(-sin_i, 0.0, (1.0 - sin_i * sin_i).sqrt());
        let wo = Vec3::new(sin_t, 0.0, -(1.0 - sin_t * sin_t).sqrt());
        let c = bsdf.refraction_contribution(&wi, &wo);
        assert!(c.x.is_finite() && c.x > 0.0);
    }

    #[test]
    fn test_refraction_contribution_degenerate_half_vector() {
        let bsdf = MicrofacetBsdf {
            weight: Spectrum::repeat(1.0),
            n: Vec3::z(),
            ior: 1.0,
            ..Default::default()
        };
        let c = bsdf.refraction_contribution(&Vec3::z(), &-Vec3::z());
        assert_eq!(c, Spectrum::zeros());
    }
}
