//! Twinkling background starfield.
//!
//! Stars are placed once per session on a shell of radius 50..100 around the
//! origin. Only their sizes change afterwards.

use nalgebra::Point3;
use std::f32::consts::PI;

use crate::color::Rgb;
use crate::material::{Blending, Material};
use crate::rng::SeededRng;

pub const DESKTOP_STAR_COUNT: usize = 2000;
pub const CONSTRAINED_STAR_COUNT: usize = 800;

/// Size multiplier never drops below this fraction of the base size
pub const MIN_TWINKLE: f32 = 0.3;

/// Sprite size and opacity used for every star
pub const STAR_SPRITE_SIZE: f32 = 0.5;
pub const STAR_OPACITY: f32 = 0.6;

const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);
const WARM_WHITE: Rgb = Rgb::new(1.0, 0.95, 0.8);
const DIM_GOLD: Rgb = Rgb::new(0.84 * 0.7, 0.6 * 0.7, 0.13 * 0.7);

#[derive(Debug, Clone, PartialEq)]
pub struct Star {
    pub position: Point3<f32>,
    pub color: Rgb,
    pub base_size: f32,
    pub phase: f32,
    pub speed: f32,
    /// Current size, rewritten by [`StarField::twinkle`]
    pub size: f32,
}

impl Star {
    pub fn size_at(&self, time: f64) -> f32 {
        twinkle_size(self.base_size, self.speed, self.phase, time)
    }
}

/// `base * (0.3 + 0.7 * (0.5 + 0.5 * sin(time * speed + phase)))`
///
/// Evaluated in f64 so large wall-clock timestamps keep their precision.
pub fn twinkle_size(base: f32, speed: f32, phase: f32, time: f64) -> f32 {
    let wave = (time * speed as f64 + phase as f64).sin() * 0.5 + 0.5;
    base * (MIN_TWINKLE + (1.0 - MIN_TWINKLE) * wave as f32)
}

#[derive(Debug, Clone, Default)]
pub struct StarField {
    stars: Vec<Star>,
}

impl StarField {
    pub fn generate(count: usize, rng: &mut SeededRng) -> Self {
        let stars = (0..count)
            .map(|_| {
                let radius = 50.0 + rng.next_f32() * 50.0;
                let theta = rng.angle();
                let phi = rng.next_f32() * PI;
                let position = Point3::new(
                    radius * phi.sin() * theta.cos(),
                    radius * phi.sin() * theta.sin(),
                    radius * phi.cos(),
                );

                let pick = rng.next_f32();
                let color = if pick < 0.3 {
                    WHITE
                } else if pick < 0.6 {
                    WARM_WHITE
                } else {
                    DIM_GOLD
                };

                let base_size = rng.next_f32() * 0.5 + 0.1;
                Star {
                    position,
                    color,
                    base_size,
                    phase: rng.angle(),
                    speed: 0.5 + rng.next_f32() * 2.0,
                    size: base_size,
                }
            })
            .collect();

        Self { stars }
    }

    /// Recompute every star's size for `time` (seconds)
    pub fn twinkle(&mut self, time: f64) {
        for star in &mut self.stars {
            star.size = star.size_at(time);
        }
    }

    /// Translucent additive sprite material shared by every star
    pub fn material() -> Material {
        let mut material = Material::points(WHITE, STAR_SPRITE_SIZE).translucent(STAR_OPACITY);
        material.blending = Blending::Additive;
        material
    }

    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }
}
