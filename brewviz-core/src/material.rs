//! Surface appearance of scene primitives

use crate::color::Rgb;
use crate::texture::CanvasTexture;

/// Lighting model a renderer should approximate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialKind {
    /// Physically based with clearcoat/transmission
    Physical,
    /// Physically based, no extras
    Standard,
    /// Unlit flat color
    Basic,
    /// Point sprites
    Points,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Blending {
    #[default]
    Normal,
    Additive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Side {
    #[default]
    Front,
    Double,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub kind: MaterialKind,
    pub color: Rgb,
    pub opacity: f32,
    pub transparent: bool,
    pub side: Side,
    pub blending: Blending,
    pub roughness: f32,
    pub metalness: f32,
    pub transmission: f32,
    pub emissive: Rgb,
    pub emissive_intensity: f32,
    /// Sprite size for point materials
    pub point_size: f32,
    pub map: Option<CanvasTexture>,
}

impl Material {
    fn with_kind(kind: MaterialKind, color: Rgb) -> Self {
        Self {
            kind,
            color,
            opacity: 1.0,
            transparent: false,
            side: Side::Front,
            blending: Blending::Normal,
            roughness: 1.0,
            metalness: 0.0,
            transmission: 0.0,
            emissive: Rgb::BLACK,
            emissive_intensity: 1.0,
            point_size: 1.0,
            map: None,
        }
    }

    pub fn physical(color: Rgb) -> Self {
        Self::with_kind(MaterialKind::Physical, color)
    }

    pub fn standard(color: Rgb) -> Self {
        Self::with_kind(MaterialKind::Standard, color)
    }

    pub fn basic(color: Rgb) -> Self {
        Self::with_kind(MaterialKind::Basic, color)
    }

    pub fn points(color: Rgb, size: f32) -> Self {
        Self {
            point_size: size,
            ..Self::with_kind(MaterialKind::Points, color)
        }
    }

    /// Mark transparent with the given opacity
    pub fn translucent(mut self, opacity: f32) -> Self {
        self.transparent = true;
        self.opacity = opacity;
        self
    }

    pub fn finish(mut self, roughness: f32, metalness: f32) -> Self {
        self.roughness = roughness;
        self.metalness = metalness;
        self
    }

    pub fn glowing(mut self, emissive: Rgb, intensity: f32) -> Self {
        self.emissive = emissive;
        self.emissive_intensity = intensity;
        self
    }

    /// Color a renderer without texture sampling should use
    pub fn surface_color(&self) -> Rgb {
        match &self.map {
            Some(map) => map.mean_color().tint(self.color),
            None => self.color,
        }
    }

    /// Effective opacity, 1.0 for opaque materials
    pub fn alpha(&self) -> f32 {
        if self.transparent {
            self.opacity
        } else {
            1.0
        }
    }
}
