//! Test scenes: a diffuse floor under a stack of flat refractive panes.

use caustica_math::{normalize_len, Point2, Point3, Vec3};
use caustica_scene::{
    Intersector, Mesh, Object, ObjectFlags, Ray, Scene, SceneOptions, SurfacePoint,
};
use caustica_shading::{Light, LightList, LightSample, Material, PathState, ShaderTable, Spectrum};

use crate::chain::Chain;
use crate::sample::seed_chain;

pub(crate) struct PaneSetup {
    pub ior: f64,
    pub roughness: f64,
    pub panes: usize,
    pub spacing: f64,
    /// The receiver sits at `(0, y, -1)`.
    pub y: f64,
}

impl Default for PaneSetup {
    fn default() -> Self {
        Self {
            ior: 1.5,
            roughness: 0.0,
            panes: 1,
            spacing: 0.1,
            y: -0.5,
        }
    }
}

impl PaneSetup {
    /// Height one unit above the top pane.
    pub fn light_height(&self) -> f64 {
        self.panes.saturating_sub(1) as f64 * self.spacing + 1.0
    }
}

pub(crate) struct PaneScene {
    pub setup: PaneSetup,
    pub scene: Scene,
    pub shaders: ShaderTable,
    pub lights: LightList,
}

impl PaneScene {
    /// Point light of intensity 10 at `(1, y, light_height)`.
    pub fn new(setup: PaneSetup) -> Self {
        let light = Light::Point {
            position: Point3::new(1.0, setup.y, setup.light_height()),
            intensity: Spectrum::repeat(10.0),
        };
        Self::with_light(setup, light)
    }

    pub fn with_light(setup: PaneSetup, light: Light) -> Self {
        let mut shaders = ShaderTable::default();
        let floor_shader = shaders.add(Material::Diffuse {
            color: [0.8, 0.8, 0.8],
        });
        let pane_shader = shaders.add(Material::Refraction {
            color: [1.0, 1.0, 1.0],
            alpha_x: setup.roughness,
            alpha_y: setup.roughness,
            ior: setup.ior,
            distribution: Default::default(),
        });

        let mut builder = Scene::builder(SceneOptions::default());
        let floor = Mesh::quad([
            Point3::new(-5.0, -5.0, -1.0),
            Point3::new(5.0, -5.0, -1.0),
            Point3::new(5.0, 5.0, -1.0),
            Point3::new(-5.0, 5.0, -1.0),
        ])
        .with_shader(floor_shader);
        builder
            .add_object(Object::new(floor).with_flags(ObjectFlags::CAUSTICS_RECEIVER))
            .unwrap();

        for k in 0..setup.panes {
            let z = k as f64 * setup.spacing;
            let pane = Mesh::quad([
                Point3::new(-2.0, -2.0, z),
                Point3::new(2.0, -2.0, z),
                Point3::new(2.0, 2.0, z),
                Point3::new(-2.0, 2.0, z),
            ])
            .with_shader(pane_shader)
            .with_smooth(true);
            builder
                .add_object(Object::new(pane).with_flags(ObjectFlags::CAUSTICS_CASTER))
                .unwrap();
        }

        Self {
            setup,
            scene: builder.build(),
            shaders,
            lights: LightList::new(vec![light]),
        }
    }

    /// Shading point on the floor at `(0, y, -1)`, seen from above.
    pub fn receiver_point(&self) -> SurfacePoint {
        let ray = Ray::new(Point3::new(0.0, self.setup.y, -0.5), -Vec3::z());
        let hit = self.scene.intersect(&ray).unwrap();
        self.scene.surface_point(&ray, &hit).unwrap()
    }

    /// Light sample of the scene's light from `surface`.
    pub fn light_sample(&self, surface: &SurfacePoint) -> LightSample {
        self.lights
            .sample(&surface.p, 0.5, Point2::new(0.5, 0.5))
            .unwrap()
    }

    /// Seed a chain toward a point light at `light`.
    pub fn seed(&self, surface: &SurfacePoint, light: &Point3) -> Option<Chain> {
        seed_chain(
            &self.scene,
            &self.shaders,
            surface,
            &PathState::default(),
            &point_sample(light, &surface.p),
            Point2::new(0.5, 0.5),
        )
    }
}

/// Unit-intensity point light sample at `light` seen from `from`.
pub(crate) fn point_sample(light: &Point3, from: &Point3) -> LightSample {
    let (d, t) = normalize_len(&(light - from));
    LightSample {
        p: *light,
        d,
        ng: -d,
        t,
        pdf: t * t,
        eval_fac: 1.0,
        light: 0,
        selection_pdf: 1.0,
        fixed_direction: false,
    }
}

/// Horizontal distance from the receiver to the refraction point of a
/// single interface, by bisection.
///
/// The receiver sits `depth` below the interface inside a medium of index
/// `ior`; the light is `height` above it at horizontal distance `reach`.
pub(crate) fn snell_root(reach: f64, height: f64, depth: f64, ior: f64) -> f64 {
    let f = |x: f64| {
        ior * x / (x * x + depth * depth).sqrt()
            - (reach - x) / ((reach - x).powi(2) + height * height).sqrt()
    };
    let (mut lo, mut hi) = (0.0, reach);
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if f(mid) > 0.0 {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    0.5 * (lo + hi)
}
