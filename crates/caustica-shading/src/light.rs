//! Lights and light samples.
//!
//! Sample pdfs are expressed in solid angle as seen from the point the
//! sample was taken (or last updated) for. Point lights use the convention
//! `pdf = t^2`, so `eval / pdf` gives the familiar inverse-square falloff.

use caustica_math::{normalize_len, Point2, Point3, Vec3};

use crate::Spectrum;

/// A light source.
#[derive(Debug, Clone, PartialEq)]
pub enum Light {
    /// Isotropic point emitter.
    Point {
        /// Position.
        position: Point3,
        /// Radiant intensity.
        intensity: Spectrum,
    },
    /// One-sided parallelogram emitting along `edge_u x edge_v`.
    Rect {
        /// First corner.
        corner: Point3,
        /// First edge.
        edge_u: Vec3,
        /// Second edge.
        edge_v: Vec3,
        /// Emitted radiance.
        radiance: Spectrum,
    },
    /// Light arriving from a fixed direction.
    Distant {
        /// Unit direction from the scene toward the light.
        to_light: Vec3,
        /// Irradiance on a surface facing the light.
        irradiance: Spectrum,
    },
}

/// A sampled connection from a shading point to a light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSample {
    /// Sampled position on the light.
    pub p: Point3,
    /// Unit direction toward the light.
    pub d: Vec3,
    /// Light surface normal.
    pub ng: Vec3,
    /// Distance to the light, infinite for distant lights.
    pub t: f64,
    /// Solid-angle pdf including light selection.
    pub pdf: f64,
    /// Emission scale, zero when the light faces away.
    pub eval_fac: f64,
    /// Index into the light list.
    pub light: usize,
    /// Probability of having picked this light.
    pub selection_pdf: f64,
    /// The light is reached along `d` regardless of position.
    pub fixed_direction: bool,
}

/// Updates and evaluates light samples.
pub trait LightEvaluator: Sync {
    /// Re-target `ls` so it is seen from `p`.
    fn update_position(&self, ls: &mut LightSample, p: Point3);

    /// Emission carried by `ls` at `time`.
    fn eval(&self, ls: &LightSample, time: f64) -> Spectrum;
}

/// All lights of a scene.
#[derive(Debug, Clone, Default)]
pub struct LightList {
    lights: Vec<Light>,
}

impl LightList {
    /// A list holding `lights`.
    pub fn new(lights: Vec<Light>) -> Self {
        Self { lights }
    }

    /// Pick a light uniformly with `rand_light` and a point on it with
    /// `rand_uv`, as seen from `p`.
    ///
    /// Returns `None` when there are no lights, the point coincides with a
    /// point light or the sampled area light faces away.
    pub fn sample(&self, p: &Point3, rand_light: f64, rand_uv: Point2) -> Option<LightSample> {
        let count = self.lights.len();
        if count == 0 {
            return None;
        }
        let index = ((rand_light * count as f64) as usize).min(count - 1);
        let selection_pdf = 1.0 / count as f64;

        let mut ls = match &self.lights[index] {
            Light::Point { position, .. } => LightSample {
                p: *position,
                d: Vec3::zeros(),
                ng: Vec3::zeros(),
                t: 0.0,
                pdf: 0.0,
                eval_fac: 1.0,
                light: index,
                selection_pdf,
                fixed_direction: false,
            },
            Light::Rect {
                corner,
                edge_u,
                edge_v,
                ..
            } => LightSample {
                p: corner + rand_uv.x * edge_u + rand_uv.y * edge_v,
                d: Vec3::zeros(),
                ng: edge_u.cross(edge_v).normalize(),
                t: 0.0,
                pdf: 0.0,
                eval_fac: 1.0,
                light: index,
                selection_pdf,
                fixed_direction: false,
            },
            Light::Distant { to_light, .. } => LightSample {
                p: *p,
                d: *to_light,
                ng: -to_light,
                t: f64::INFINITY,
                pdf: selection_pdf,
                eval_fac: 1.0,
                light: index,
                selection_pdf,
                fixed_direction: true,
            },
        };

        self.update_position(&mut ls, *p);
        if ls.pdf > 0.0 && ls.eval_fac > 0.0 {
            Some(ls)
        } else {
            None
        }
    }
}

impl LightEvaluator for LightList {
    fn update_position(&self, ls: &mut LightSample, p: Point3) {
        let Some(light) = self.lights.get(ls.light) else {
            ls.pdf = 0.0;
            ls.eval_fac = 0.0;
            return;
        };
        match light {
            Light::Distant { .. } => {}
            Light::Point { .. } => {
                let (d, t) = normalize_len(&(ls.p - p));
                ls.d = d;
                ls.t = t;
                ls.ng = -d;
                ls.pdf = ls.selection_pdf * t * t;
                ls.eval_fac = if t > 0.0 { 1.0 } else { 0.0 };
            }
            Light::Rect { edge_u, edge_v, .. } => {
                let (d, t) = normalize_len(&(ls.p - p));
                let area = edge_u.cross(edge_v).norm();
                let cos_light = -ls.ng.dot(&d);
                ls.d = d;
                ls.t = t;
                if cos_light > 0.0 && t > 0.0 && area > 0.0 {
                    ls.pdf = ls.selection_pdf * t * t / (cos_light * area);
                    ls.eval_fac = 1.0;
                } else {
                    ls.pdf = 0.0;
                    ls.eval_fac = 0.0;
                }
            }
        }
    }

    fn eval(&self, ls: &LightSample, _time: f64) -> Spectrum {
        let emission = match self.lights.get(ls.light) {
            Some(Light::Point { intensity, .. }) => *intensity,
            Some(Light::Rect { radiance, .. }) => *radiance,
            Some(Light::Distant { irradiance, .. }) => *irradiance,
            None => return Spectrum::zeros(),
        };
        emission * ls.eval_fac
    }
}
