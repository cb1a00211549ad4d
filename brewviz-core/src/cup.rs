//! Cup builder: turns a [`DrinkRecord`] into a disposable group of primitives.
//!
//! Assembly order is fixed: body, rim, lid, sleeve, lid opening, one frustum
//! per ingredient layer (bottom-up), then the vapor emitter when the drink has
//! a steam color.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;
use std::f64::consts::TAU;

use crate::catalog::{DrinkRecord, IngredientLayer};
use crate::color::Rgb;
use crate::error::BuildError;
use crate::geometry::{Mesh, PointCloud};
use crate::material::{Blending, Material, Side};
use crate::resources::{ResourceId, ResourceKind, ResourceTracker};
use crate::rng::SeededRng;
use crate::texture::CanvasTexture;
use crate::transform::Transform;

/// Brand accent used for the rim and the warm point light
pub const ACCENT_GOLD: u32 = 0xE8A317;

/// Entrance animation length in seconds
pub const ENTRANCE_SECONDS: f64 = 0.5;
const ENTRANCE_START_SCALE: f32 = 0.1;

/// Fixed cup geometry. Units are scene units, the cup is centred on the origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CupConfig {
    pub top_radius: f32,
    pub bottom_radius: f32,
    pub height: f32,
    pub segments: u32,

    pub rim_radius: f32,
    pub rim_tube_radius: f32,
    pub rim_radial_segments: u32,
    pub rim_tubular_segments: u32,

    pub lid_top_radius: f32,
    pub lid_bottom_radius: f32,
    pub lid_height: f32,
    pub lid_y: f32,

    pub sleeve_top_radius: f32,
    pub sleeve_bottom_radius: f32,
    pub sleeve_height: f32,
    pub sleeve_y: f32,

    pub opening_radius: f32,
    pub opening_height: f32,
    pub opening_x: f32,
    pub opening_y: f32,
    pub opening_segments: u32,

    /// Bottom of the ingredient stack
    pub stack_base: f32,
    /// Total height shared by all ingredient layers
    pub stack_span: f32,
    pub layer_segments: u32,
    /// Gap between liquid and cup wall
    pub liquid_inset: f32,
    pub layer_brighten: f32,
    pub layer_glow: f32,

    pub vapor_count: usize,
    pub vapor_spread: f32,
    pub vapor_base_y: f32,
    pub vapor_height: f32,
    /// Particles above this height wrap back to `vapor_base_y`
    pub vapor_ceiling: f32,
    /// Per-frame vertical step
    pub vapor_rise: f32,
}

impl Default for CupConfig {
    fn default() -> Self {
        Self {
            top_radius: 0.4,
            bottom_radius: 0.35,
            height: 1.2,
            segments: 64,

            rim_radius: 0.4,
            rim_tube_radius: 0.02,
            rim_radial_segments: 8,
            rim_tubular_segments: 32,

            lid_top_radius: 0.42,
            lid_bottom_radius: 0.41,
            lid_height: 0.1,
            lid_y: 0.65,

            sleeve_top_radius: 0.405,
            sleeve_bottom_radius: 0.375,
            sleeve_height: 0.4,
            sleeve_y: 0.1,

            opening_radius: 0.08,
            opening_height: 0.12,
            opening_x: 0.15,
            opening_y: 0.65,
            opening_segments: 16,

            stack_base: -0.5,
            stack_span: 0.9,
            layer_segments: 32,
            liquid_inset: 0.01,
            layer_brighten: 1.2,
            layer_glow: 0.05,

            vapor_count: 30,
            vapor_spread: 0.3,
            vapor_base_y: 0.7,
            vapor_height: 0.5,
            vapor_ceiling: 1.5,
            vapor_rise: 0.005,
        }
    }
}

impl CupConfig {
    /// Outer radius of the cup wall at height `y`
    pub fn radius_at(&self, y: f32) -> f32 {
        let t = (y + self.height / 2.0) / self.height;
        self.bottom_radius + t * (self.top_radius - self.bottom_radius)
    }
}

/// Vertical extent of one ingredient inside the cup
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSlice {
    pub index: usize,
    pub name: String,
    pub color: Rgb,
    pub bottom: f32,
    pub height: f32,
    pub bottom_radius: f32,
    pub top_radius: f32,
}

impl LayerSlice {
    pub fn top(&self) -> f32 {
        self.bottom + self.height
    }
}

/// Split the stack span between ingredients by volume share, bottom-up.
pub fn layer_stack(ingredients: &[IngredientLayer], config: &CupConfig) -> Result<Vec<LayerSlice>, BuildError> {
    if ingredients.is_empty() {
        return Err(BuildError::EmptyIngredients);
    }
    if let Some(bad) = ingredients
        .iter()
        .find(|i| !(i.volume.is_finite() && i.volume > 0.0))
    {
        return Err(BuildError::InvalidVolume {
            name: bad.name.clone(),
            volume: bad.volume,
        });
    }

    // f64 so large finite volumes cannot overflow the total
    let total: f64 = ingredients.iter().map(|i| f64::from(i.volume)).sum();
    let mut current = config.stack_base;

    Ok(ingredients
        .iter()
        .enumerate()
        .map(|(index, ingredient)| {
            let height = (f64::from(ingredient.volume) / total * f64::from(config.stack_span)) as f32;
            let bottom = current;
            current = bottom + height;
            LayerSlice {
                index,
                name: ingredient.name.clone(),
                color: ingredient.color,
                bottom,
                height,
                bottom_radius: config.radius_at(bottom) - config.liquid_inset,
                top_radius: config.radius_at(current) - config.liquid_inset,
            }
        })
        .collect())
}

/// What a primitive represents inside the cup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Body,
    Rim,
    Lid,
    Sleeve,
    LidOpening,
    Layer { index: usize },
    Vapor,
}

#[derive(Debug, Clone)]
pub enum Shape {
    Mesh(Mesh),
    Points(PointCloud),
}

#[derive(Debug, Clone)]
pub struct Primitive {
    pub kind: PrimitiveKind,
    pub shape: Shape,
    pub material: Material,
    pub transform: Transform,
    geometry_handle: ResourceId,
    material_handle: ResourceId,
}

impl Primitive {
    fn new(
        kind: PrimitiveKind,
        shape: Shape,
        material: Material,
        transform: Transform,
        tracker: &mut ResourceTracker,
    ) -> Self {
        Self {
            kind,
            shape,
            material,
            transform,
            geometry_handle: tracker.allocate(ResourceKind::Geometry),
            material_handle: tracker.allocate(ResourceKind::Material),
        }
    }

    pub fn geometry_handle(&self) -> ResourceId {
        self.geometry_handle
    }

    pub fn material_handle(&self) -> ResourceId {
        self.material_handle
    }
}

/// Cubic ease-out scale-up and full turn played when a cup is attached
#[derive(Debug, Clone, Copy, Default)]
pub struct Entrance {
    started_at: Option<f64>,
    finished: bool,
}

impl Entrance {
    /// Returns `(scale, yaw, finished)` for time `now` (seconds).
    /// The first call fixes the start time.
    pub fn sample(&mut self, now: f64) -> (f32, f32, bool) {
        let start = *self.started_at.get_or_insert(now);
        let progress = ((now - start) / ENTRANCE_SECONDS).clamp(0.0, 1.0);
        let eased = 1.0 - (1.0 - progress).powi(3);
        self.finished = progress >= 1.0;
        let scale = ENTRANCE_START_SCALE + (1.0 - ENTRANCE_START_SCALE) * eased as f32;
        (scale, (eased * TAU) as f32, self.finished)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// All primitives built for one drink
#[derive(Debug)]
pub struct CupGroup {
    pub drink_key: String,
    pub primitives: Vec<Primitive>,
    pub transform: Transform,
    entrance: Entrance,
}

impl CupGroup {
    pub fn primitive(&self, kind: PrimitiveKind) -> Option<&Primitive> {
        self.primitives.iter().find(|p| p.kind == kind)
    }

    pub fn count_of(&self, wanted: impl Fn(PrimitiveKind) -> bool) -> usize {
        self.primitives.iter().filter(|p| wanted(p.kind)).count()
    }

    pub fn vapor_count(&self) -> usize {
        self.count_of(|k| k == PrimitiveKind::Vapor)
    }

    pub fn layer_count(&self) -> usize {
        self.count_of(|k| matches!(k, PrimitiveKind::Layer { .. }))
    }

    /// Handles this group currently owns
    pub fn handles(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.primitives
            .iter()
            .flat_map(|p| [p.geometry_handle, p.material_handle])
    }

    pub fn entrance_finished(&self) -> bool {
        self.entrance.is_finished()
    }

    /// Play the entrance animation, or spin by `yaw_step` once it is done
    pub fn animate(&mut self, now: f64, yaw_step: f32) {
        if self.entrance.is_finished() {
            self.transform.rotation.y += yaw_step;
            return;
        }
        let (scale, yaw, _) = self.entrance.sample(now);
        self.transform.scale = scale;
        self.transform.rotation.y = yaw;
    }

    /// Raise vapor particles by `rise`, wrapping above `ceiling` back to `base`
    pub fn drift_vapor(&mut self, rise: f32, base: f32, ceiling: f32, yaw_step: f32) {
        for primitive in &mut self.primitives {
            if primitive.kind != PrimitiveKind::Vapor {
                continue;
            }
            primitive.transform.rotation.y += yaw_step;
            if let Shape::Points(cloud) = &mut primitive.shape {
                for p in &mut cloud.positions {
                    p.y += rise;
                    if p.y > ceiling {
                        p.y = base;
                    }
                }
            }
        }
    }

    /// Release every geometry and material handle. Returns how many were released.
    pub fn dispose(self, tracker: &mut ResourceTracker) -> usize {
        let released = self
            .handles()
            .filter(|id| tracker.release(*id))
            .count();
        log::debug!("disposed cup `{}` ({released} handles)", self.drink_key);
        released
    }
}

/// Builds cup groups from catalog records
#[derive(Debug, Clone, Default)]
pub struct CupBuilder {
    config: CupConfig,
}

impl CupBuilder {
    pub fn new(config: CupConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CupConfig {
        &self.config
    }

    pub fn build(
        &self,
        record: &DrinkRecord,
        tracker: &mut ResourceTracker,
        rng: &mut SeededRng,
    ) -> Result<CupGroup, BuildError> {
        let stack = layer_stack(&record.ingredients, &self.config)?;
        Ok(self.assemble(record, &stack, tracker, rng))
    }

    /// Build from an already validated layer stack
    pub fn assemble(
        &self,
        record: &DrinkRecord,
        stack: &[LayerSlice],
        tracker: &mut ResourceTracker,
        rng: &mut SeededRng,
    ) -> CupGroup {
        let c = &self.config;
        let mut primitives = Vec::with_capacity(stack.len() + 6);

        let mut body = Material::physical(record.cup_color)
            .translucent(0.5)
            .finish(0.8, 0.0);
        body.side = Side::Double;
        body.transmission = 0.3;
        body.map = Some(CanvasTexture::paper_cup());
        primitives.push(Primitive::new(
            PrimitiveKind::Body,
            Shape::Mesh(Mesh::frustum(c.top_radius, c.bottom_radius, c.height, c.segments)),
            body,
            Transform::identity(),
            tracker,
        ));

        primitives.push(Primitive::new(
            PrimitiveKind::Rim,
            Shape::Mesh(Mesh::torus(
                c.rim_radius,
                c.rim_tube_radius,
                c.rim_radial_segments,
                c.rim_tubular_segments,
            )),
            Material::basic(Rgb::from_u32(ACCENT_GOLD)).translucent(0.5),
            Transform::at(0.0, c.height / 2.0, 0.0).rotated(FRAC_PI_2, 0.0, 0.0),
            tracker,
        ));

        primitives.push(Primitive::new(
            PrimitiveKind::Lid,
            Shape::Mesh(Mesh::frustum(c.lid_top_radius, c.lid_bottom_radius, c.lid_height, c.segments)),
            Material::physical(record.cup_color.scale(0.8)).finish(0.2, 0.1),
            Transform::at(0.0, c.lid_y, 0.0),
            tracker,
        ));

        let mut sleeve = Material::standard(Rgb::WHITE).finish(0.9, 0.0);
        sleeve.map = Some(CanvasTexture::sleeve());
        primitives.push(Primitive::new(
            PrimitiveKind::Sleeve,
            Shape::Mesh(Mesh::frustum(
                c.sleeve_top_radius,
                c.sleeve_bottom_radius,
                c.sleeve_height,
                c.segments,
            )),
            sleeve,
            Transform::at(0.0, c.sleeve_y, 0.0),
            tracker,
        ));

        primitives.push(Primitive::new(
            PrimitiveKind::LidOpening,
            Shape::Mesh(Mesh::frustum(
                c.opening_radius,
                c.opening_radius,
                c.opening_height,
                c.opening_segments,
            )),
            Material::standard(Rgb::BLACK),
            Transform::at(c.opening_x, c.opening_y, 0.0),
            tracker,
        ));

        for slice in stack {
            let mut liquid = Material::physical(slice.color.scale(c.layer_brighten))
                .translucent(0.85)
                .finish(0.1, 0.0)
                .glowing(slice.color.scale(c.layer_glow), 0.1);
            liquid.transmission = 0.3;
            primitives.push(Primitive::new(
                PrimitiveKind::Layer { index: slice.index },
                Shape::Mesh(Mesh::frustum(
                    slice.top_radius,
                    slice.bottom_radius,
                    slice.height,
                    c.layer_segments,
                )),
                liquid,
                Transform::at(0.0, slice.bottom + slice.height / 2.0, 0.0),
                tracker,
            ));
        }

        if let Some(steam) = record.steam_color {
            let half = c.vapor_spread / 2.0;
            let positions = (0..c.vapor_count)
                .map(|_| {
                    Point3::new(
                        rng.range(-half, half),
                        rng.range(c.vapor_base_y, c.vapor_base_y + c.vapor_height),
                        rng.range(-half, half),
                    )
                })
                .collect();
            let mut vapor = Material::points(steam, 0.1).translucent(0.3);
            vapor.blending = Blending::Additive;
            primitives.push(Primitive::new(
                PrimitiveKind::Vapor,
                Shape::Points(PointCloud::new(positions)),
                vapor,
                Transform::identity(),
                tracker,
            ));
        }

        log::debug!(
            "built cup `{}`: {} primitives, {} layers",
            record.key,
            primitives.len(),
            stack.len()
        );

        CupGroup {
            drink_key: record.key.clone(),
            primitives,
            transform: Transform::identity(),
            entrance: Entrance::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use proptest::prelude::*;

    fn ingredient(name: &str, volume: f32) -> IngredientLayer {
        IngredientLayer {
            name: name.to_string(),
            volume,
            color: Rgb::from_u32(0x4B2E2B),
        }
    }

    fn build(key: &str) -> (CupGroup, ResourceTracker) {
        let catalog = Catalog::embedded().unwrap();
        let mut tracker = ResourceTracker::new();
        let group = CupBuilder::default()
            .build(catalog.get(key).unwrap(), &mut tracker, &mut SeededRng::default())
            .unwrap();
        (group, tracker)
    }

    #[test]
    fn test_assembly_order() {
        let (group, _) = build("call-the-cops");
        let kinds: Vec<PrimitiveKind> = group.primitives.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                PrimitiveKind::Body,
                PrimitiveKind::Rim,
                PrimitiveKind::Lid,
                PrimitiveKind::Sleeve,
                PrimitiveKind::LidOpening,
                PrimitiveKind::Layer { index: 0 },
                PrimitiveKind::Layer { index: 1 },
                PrimitiveKind::Layer { index: 2 },
                PrimitiveKind::Layer { index: 3 },
                PrimitiveKind::Layer { index: 4 },
                PrimitiveKind::Layer { index: 5 },
                PrimitiveKind::Vapor,
            ]
        );
    }

    #[test]
    fn test_vapor_presence_follows_steam_color() {
        let (cold, _) = build("cold-brew");
        assert_eq!(cold.vapor_count(), 0);

        let (espresso, _) = build("espresso");
        assert_eq!(espresso.vapor_count(), 1);
    }

    #[test]
    fn test_vapor_particles_start_above_lid() {
        let (group, _) = build("espresso");
        let config = CupConfig::default();
        let vapor = group.primitive(PrimitiveKind::Vapor).unwrap();
        let Shape::Points(cloud) = &vapor.shape else {
            panic!("vapor should be a point cloud");
        };
        assert_eq!(cloud.len(), config.vapor_count);
        for p in &cloud.positions {
            assert!(p.x.abs() <= config.vapor_spread / 2.0);
            assert!(p.z.abs() <= config.vapor_spread / 2.0);
            assert!(p.y >= config.vapor_base_y && p.y < config.vapor_base_y + config.vapor_height);
        }
        assert_eq!(vapor.material.blending, Blending::Additive);
    }

    #[test]
    fn test_lid_is_darker_than_cup() {
        let (group, _) = build("wendys");
        let lid = group.primitive(PrimitiveKind::Lid).unwrap();
        let body = group.primitive(PrimitiveKind::Body).unwrap();
        assert!(lid.material.color.luminance() < body.material.color.luminance());
    }

    #[test]
    fn test_layer_colors_are_brightened() {
        let (group, _) = build("espresso");
        let layer = group.primitive(PrimitiveKind::Layer { index: 0 }).unwrap();
        let espresso = Rgb::from_u32(0x4B2E2B);
        assert_eq!(layer.material.color, espresso.scale(1.2));
        assert_eq!(layer.material.emissive, espresso.scale(0.05));
    }

    #[test]
    fn test_layers_follow_cup_taper() {
        let config = CupConfig::default();
        let stack = layer_stack(&[ingredient("a", 1.0), ingredient("b", 1.0)], &config).unwrap();
        for slice in &stack {
            assert!(slice.top_radius > slice.bottom_radius);
            assert!(slice.top_radius < config.radius_at(slice.top()));
        }
    }

    #[test]
    fn test_dispose_releases_every_handle() {
        let (group, mut tracker) = build("call-the-cops");
        let owned = group.primitives.len() * 2;
        assert_eq!(tracker.live_count(), owned);
        assert_eq!(group.dispose(&mut tracker), owned);
        assert_eq!(tracker.live_count(), 0);
    }

    #[test]
    fn test_empty_ingredients_is_an_error() {
        let config = CupConfig::default();
        assert_eq!(layer_stack(&[], &config), Err(BuildError::EmptyIngredients));
    }

    #[test]
    fn test_zero_volume_is_an_error() {
        let config = CupConfig::default();
        let err = layer_stack(&[ingredient("water", 0.0)], &config).unwrap_err();
        assert!(matches!(err, BuildError::InvalidVolume { .. }));
    }

    #[test]
    fn test_huge_volumes_still_fill_span() {
        let config = CupConfig::default();
        let stack = layer_stack(&[ingredient("a", 3e38), ingredient("b", 3e38)], &config).unwrap();
        for slice in &stack {
            assert!((slice.height - config.stack_span / 2.0).abs() < 1e-5);
        }
        let top = stack[1].top();
        assert!((top - (config.stack_base + config.stack_span)).abs() < 1e-5);
    }

    #[test]
    fn test_entrance_then_spin() {
        let (mut group, _) = build("espresso");
        group.animate(10.0, 0.005);
        assert!((group.transform.scale - 0.1).abs() < 1e-6);
        assert_eq!(group.transform.rotation.y, 0.0);

        group.animate(10.25, 0.005);
        assert!(group.transform.scale > 0.1 && group.transform.scale < 1.0);

        group.animate(10.5, 0.005);
        assert!(group.entrance_finished());
        assert!((group.transform.scale - 1.0).abs() < 1e-6);
        let settled = group.transform.rotation.y;

        group.animate(10.6, 0.005);
        assert!((group.transform.rotation.y - settled - 0.005).abs() < 1e-6);
    }

    #[test]
    fn test_vapor_wraps_at_ceiling() {
        let (mut group, _) = build("espresso");
        for _ in 0..200 {
            group.drift_vapor(0.005, 0.7, 1.5, 0.005);
        }
        let vapor = group.primitive(PrimitiveKind::Vapor).unwrap();
        let Shape::Points(cloud) = &vapor.shape else {
            panic!("vapor should be a point cloud");
        };
        for p in &cloud.positions {
            assert!(p.y >= 0.7 && p.y <= 1.5);
        }
        assert!((vapor.transform.rotation.y - 1.0).abs() < 1e-3);
    }

    proptest! {
        #[test]
        fn prop_layer_heights_fill_span_contiguously(
            volumes in proptest::collection::vec(0.01f32..500.0, 1..12)
        ) {
            let config = CupConfig::default();
            let ingredients: Vec<IngredientLayer> = volumes
                .iter()
                .enumerate()
                .map(|(i, v)| ingredient(&format!("layer{i}"), *v))
                .collect();
            let stack = layer_stack(&ingredients, &config).unwrap();

            prop_assert_eq!(stack.len(), ingredients.len());
            prop_assert_eq!(stack[0].bottom, config.stack_base);

            let total: f32 = stack.iter().map(|s| s.height).sum();
            prop_assert!((total - config.stack_span).abs() < 1e-4);

            for pair in stack.windows(2) {
                prop_assert_eq!(pair[1].bottom, pair[0].top());
            }

            let last = stack.last().unwrap();
            prop_assert!((last.top() - (config.stack_base + config.stack_span)).abs() < 1e-4);
        }
    }
}
