//! Scene bootstrapping and the owned viewer session.
//!
//! A [`ViewerSession`] holds everything the page used to keep in globals:
//! camera, optional orbit controller, lights, starfield and the single
//! attached cup. Hosts pass it explicitly to the frame driver.

use nalgebra::{Point3, Vector3};

use crate::catalog::DrinkRecord;
use crate::color::Rgb;
use crate::config::{ControlsMode, ViewerConfig};
use crate::controls::OrbitControls;
use crate::cup::{layer_stack, CupBuilder, CupGroup, ACCENT_GOLD};
use crate::error::BuildError;
use crate::material::{Material, MaterialKind};
use crate::projection::Camera;
use crate::resources::ResourceTracker;
use crate::rng::SeededRng;
use crate::starfield::StarField;

/// Used when the host reports a zero-sized surface (e.g. still hidden)
pub const FALLBACK_SURFACE_SIZE: u32 = 350;

pub const BACKGROUND: u32 = 0x1a1a1a;

/// Drawing target dimensions as reported by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixel_ratio: 1.0,
        }
    }

    pub fn with_pixel_ratio(mut self, ratio: f32) -> Self {
        self.pixel_ratio = if ratio > 0.0 { ratio } else { 1.0 };
        self
    }

    /// Replace zero dimensions with the fallback size
    pub fn effective(self) -> Self {
        let fix = |v: u32| if v == 0 { FALLBACK_SURFACE_SIZE } else { v };
        Self {
            width: fix(self.width),
            height: fix(self.height),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Light {
    Ambient {
        color: Rgb,
        intensity: f32,
    },
    Directional {
        color: Rgb,
        intensity: f32,
        position: Point3<f32>,
        casts_shadow: bool,
    },
    Point {
        color: Rgb,
        intensity: f32,
        range: f32,
        position: Point3<f32>,
    },
}

/// Key, fill, rim and warm accent lights
pub fn default_lights() -> Vec<Light> {
    vec![
        Light::Ambient {
            color: Rgb::WHITE,
            intensity: 0.6,
        },
        Light::Directional {
            color: Rgb::WHITE,
            intensity: 1.0,
            position: Point3::new(5.0, 5.0, 5.0),
            casts_shadow: true,
        },
        Light::Directional {
            color: Rgb::WHITE,
            intensity: 0.5,
            position: Point3::new(-5.0, 3.0, -5.0),
            casts_shadow: false,
        },
        Light::Point {
            color: Rgb::from_u32(ACCENT_GOLD),
            intensity: 0.3,
            range: 10.0,
            position: Point3::new(0.0, 2.0, 2.0),
        },
    ]
}

/// Lambert term and mixed light color at a surface point
pub fn illuminate(lights: &[Light], normal: &Vector3<f32>, at: &Point3<f32>) -> (f32, Rgb) {
    let mut brightness = 0.0;
    let mut color = Rgb::BLACK;

    for light in lights {
        let (light_color, contribution) = match light {
            Light::Ambient { color, intensity } => (*color, *intensity),
            Light::Directional {
                color,
                intensity,
                position,
                ..
            } => {
                let dir = position.coords.normalize();
                (*color, intensity * normal.dot(&dir).max(0.0))
            }
            Light::Point {
                color,
                intensity,
                range,
                position,
            } => {
                let to_light = position - at;
                let falloff = (1.0 - to_light.norm() / range).max(0.0);
                let dir = to_light.try_normalize(1e-6).unwrap_or_else(Vector3::zeros);
                (*color, intensity * falloff * normal.dot(&dir).max(0.0))
            }
        };
        brightness += contribution;
        color = color + light_color.scale(contribution);
    }

    let color = if brightness > 0.0 {
        color.scale(1.0 / brightness)
    } else {
        Rgb::WHITE
    };
    (brightness.min(1.0), color)
}

/// Brightness and lit color of `material` at a surface point. Unlit
/// materials come back at full brightness.
pub fn shade(lights: &[Light], material: &Material, normal: &Vector3<f32>, at: &Point3<f32>) -> (f32, Rgb) {
    shade_base(lights, material, material.surface_color(), normal, at)
}

/// Like [`shade`] with the texture taken as white, for hosts that paint the
/// texture themselves and multiply this colour over it
pub fn shade_untextured(
    lights: &[Light],
    material: &Material,
    normal: &Vector3<f32>,
    at: &Point3<f32>,
) -> (f32, Rgb) {
    shade_base(lights, material, material.color, normal, at)
}

fn shade_base(lights: &[Light], material: &Material, base: Rgb, normal: &Vector3<f32>, at: &Point3<f32>) -> (f32, Rgb) {
    if material.kind == MaterialKind::Basic {
        return (1.0, base);
    }
    let (brightness, light_color) = illuminate(lights, normal, at);
    let glow = material.emissive.scale(material.emissive_intensity);
    (brightness, (base.tint(light_color).scale(brightness) + glow).clamped())
}

/// Output settings a renderer should honour
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
    pub antialias: bool,
    pub soft_shadows: bool,
}

impl RenderSettings {
    fn for_surface(surface: SurfaceSize) -> Self {
        Self {
            width: surface.width,
            height: surface.height,
            pixel_ratio: surface.pixel_ratio,
            antialias: true,
            soft_shadows: true,
        }
    }
}

/// Renderable world: lights, stars and at most one cup
#[derive(Debug)]
pub struct Scene {
    pub background: Rgb,
    pub lights: Vec<Light>,
    pub starfield: StarField,
    cup: Option<CupGroup>,
    resources: ResourceTracker,
}

impl Scene {
    pub fn new(background: Rgb, lights: Vec<Light>, starfield: StarField) -> Self {
        Self {
            background,
            lights,
            starfield,
            cup: None,
            resources: ResourceTracker::new(),
        }
    }

    pub fn cup(&self) -> Option<&CupGroup> {
        self.cup.as_ref()
    }

    pub fn cup_mut(&mut self) -> Option<&mut CupGroup> {
        self.cup.as_mut()
    }

    pub fn resources(&self) -> &ResourceTracker {
        &self.resources
    }

    /// Detach and dispose the current cup. Returns the number of handles released.
    pub fn clear_cup(&mut self) -> usize {
        match self.cup.take() {
            Some(group) => group.dispose(&mut self.resources),
            None => 0,
        }
    }

    /// Swap the attached cup for one built from `record`.
    ///
    /// The ingredient stack is validated first; an invalid record leaves the
    /// current cup untouched. Otherwise the current cup is disposed before
    /// any new primitive is allocated.
    pub fn replace_cup(
        &mut self,
        record: &DrinkRecord,
        builder: &CupBuilder,
        rng: &mut SeededRng,
    ) -> Result<(), BuildError> {
        let stack = layer_stack(&record.ingredients, builder.config())?;
        self.clear_cup();
        let group = builder.assemble(record, &stack, &mut self.resources, rng);
        self.cup = Some(group);
        Ok(())
    }
}

/// Everything one viewer on the page owns
#[derive(Debug)]
pub struct ViewerSession {
    pub config: ViewerConfig,
    pub camera: Camera,
    pub controls: Option<OrbitControls>,
    pub scene: Scene,
    pub settings: RenderSettings,
    builder: CupBuilder,
    rng: SeededRng,
}

impl ViewerSession {
    /// Build camera, lights, starfield and (when enabled) the orbit controller.
    ///
    /// Calling this twice creates two independent sessions; hosts guard
    /// against re-initialisation themselves.
    pub fn init(surface: SurfaceSize, config: ViewerConfig) -> Self {
        let surface = surface.effective();
        let mut camera = Camera::new(surface.width, surface.height);
        let mut rng = SeededRng::new(config.seed);

        let controls = match config.controls {
            ControlsMode::Orbit => {
                let mut controls = OrbitControls::new(&camera);
                controls.update(&mut camera);
                Some(controls)
            }
            ControlsMode::Static => {
                log::warn!("orbit controls unavailable, viewer will be static");
                camera.look_from(Point3::new(2.0, 1.0, 3.0), Point3::origin());
                None
            }
        };

        let starfield = StarField::generate(config.device.star_count(), &mut rng);
        let scene = Scene::new(Rgb::from_u32(BACKGROUND), default_lights(), starfield);

        log::info!(
            "viewer initialised at {}x{} with {} stars",
            surface.width,
            surface.height,
            scene.starfield.len()
        );

        Self {
            builder: CupBuilder::new(config.cup.clone()),
            config,
            camera,
            controls,
            scene,
            settings: RenderSettings::for_surface(surface),
            rng,
        }
    }

    /// Viewport changed size
    pub fn resize(&mut self, surface: SurfaceSize) {
        let surface = surface.effective();
        self.camera.set_aspect(surface.width, surface.height);
        self.settings.width = surface.width;
        self.settings.height = surface.height;
        self.settings.pixel_ratio = surface.pixel_ratio;
    }

    /// Show `record`'s cup, replacing whatever is attached
    pub fn show_drink(&mut self, record: &DrinkRecord) -> Result<(), BuildError> {
        self.scene.replace_cup(record, &self.builder, &mut self.rng)
    }

    pub fn hide_drink(&mut self) {
        self.scene.clear_cup();
    }

    pub fn active_drink(&self) -> Option<&str> {
        self.scene.cup().map(|c| c.drink_key.as_str())
    }

    pub fn is_interactive(&self) -> bool {
        self.controls.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::DeviceProfile;
    use crate::resources::ResourceKind;

    fn session(config: ViewerConfig) -> ViewerSession {
        ViewerSession::init(SurfaceSize::new(640, 480), config)
    }

    #[test]
    fn test_init_builds_lights_and_stars() {
        let s = session(ViewerConfig::default());
        assert_eq!(s.scene.lights.len(), 4);
        assert_eq!(s.scene.starfield.len(), 2000);
        assert!(s.is_interactive());
        assert!(s.settings.soft_shadows);
        assert!((s.camera.aspect - 640.0 / 480.0).abs() < 1e-6);
        assert!(s.scene.cup().is_none());
    }

    #[test]
    fn test_constrained_device_gets_fewer_stars() {
        let s = session(ViewerConfig {
            device: DeviceProfile::Constrained,
            ..ViewerConfig::default()
        });
        assert_eq!(s.scene.starfield.len(), 800);
    }

    #[test]
    fn test_static_fallback_pose() {
        let s = session(ViewerConfig {
            controls: ControlsMode::Static,
            ..ViewerConfig::default()
        });
        assert!(!s.is_interactive());
        assert_eq!(s.camera.position, Point3::new(2.0, 1.0, 3.0));
    }

    #[test]
    fn test_lit_side_is_brighter() {
        let lights = default_lights();
        let facing = Vector3::new(1.0, 1.0, 1.0).normalize();
        let (front, _) = illuminate(&lights, &facing, &Point3::origin());
        let (back, _) = illuminate(&lights, &-facing, &Point3::origin());
        assert!(front > back);
        assert!(back >= 0.6 - 1e-6);
    }

    #[test]
    fn test_unlit_material_ignores_lights() {
        let material = Material::basic(Rgb::from_u32(0x336699));
        let (brightness, color) = shade(&[], &material, &Vector3::z(), &Point3::origin());
        assert_eq!(brightness, 1.0);
        assert_eq!(color, material.color);
    }

    #[test]
    fn test_untextured_shade_skips_texture_mean() {
        let mut material = Material::standard(Rgb::WHITE);
        material.map = Some(crate::texture::CanvasTexture::sleeve());
        let light = [Light::Ambient {
            color: Rgb::WHITE,
            intensity: 1.0,
        }];
        let (_, plain) = shade_untextured(&light, &material, &Vector3::y(), &Point3::origin());
        let (_, textured) = shade(&light, &material, &Vector3::y(), &Point3::origin());
        assert_eq!(plain, Rgb::WHITE);
        assert!(textured.b < plain.b);
    }

    #[test]
    fn test_zero_surface_uses_fallback() {
        let s = ViewerSession::init(SurfaceSize::new(0, 0), ViewerConfig::default());
        assert_eq!(s.settings.width, FALLBACK_SURFACE_SIZE);
        assert_eq!(s.camera.aspect, 1.0);
    }

    #[test]
    fn test_resize_updates_aspect_and_settings() {
        let mut s = session(ViewerConfig::default());
        s.resize(SurfaceSize::new(1000, 500).with_pixel_ratio(2.0));
        assert!((s.camera.aspect - 2.0).abs() < 1e-6);
        assert_eq!(s.settings.width, 1000);
        assert_eq!(s.settings.pixel_ratio, 2.0);
    }

    #[test]
    fn test_consecutive_selections_do_not_leak() {
        let catalog = Catalog::embedded().unwrap();
        let mut s = session(ViewerConfig::default());

        for record in catalog.iter().chain(catalog.iter()).chain(catalog.iter()) {
            s.show_drink(record).unwrap();
            let cup = s.scene.cup().unwrap();
            assert_eq!(cup.drink_key, record.key);

            let tracker = s.scene.resources();
            assert_eq!(tracker.live_count(), cup.primitives.len() * 2);
            assert_eq!(tracker.live_of(ResourceKind::Geometry), cup.primitives.len());
            assert!(cup.handles().all(|id| tracker.is_live(id)));
        }

        let tracker = s.scene.resources();
        assert_eq!(
            tracker.allocated_total(),
            tracker.released_total() + tracker.live_count() as u64
        );

        s.hide_drink();
        assert_eq!(s.scene.resources().live_count(), 0);
    }

    #[test]
    fn test_previous_handles_released_before_new_ones_allocated() {
        let catalog = Catalog::embedded().unwrap();
        let mut s = session(ViewerConfig::default());
        s.show_drink(catalog.get("espresso").unwrap()).unwrap();
        let old: Vec<_> = s.scene.cup().unwrap().handles().collect();
        let newest_old = *old.iter().max().unwrap();

        s.show_drink(catalog.get("cold-brew").unwrap()).unwrap();
        let tracker = s.scene.resources();
        assert!(old.iter().all(|id| !tracker.is_live(*id)));
        assert!(s.scene.cup().unwrap().handles().all(|id| id > newest_old));
    }

    #[test]
    fn test_invalid_record_keeps_current_cup() {
        let catalog = Catalog::embedded().unwrap();
        let mut s = session(ViewerConfig::default());
        s.show_drink(catalog.get("espresso").unwrap()).unwrap();

        let mut broken = catalog.get("cortado").unwrap().clone();
        broken.ingredients.clear();
        assert_eq!(s.show_drink(&broken), Err(BuildError::EmptyIngredients));
        assert_eq!(s.active_drink(), Some("espresso"));
    }
}
