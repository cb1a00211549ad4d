//! Procedural canvas textures described as replayable 2D draw commands.
//!
//! The Canvas2D host replays the commands onto an offscreen canvas and
//! samples it as a pattern. Hosts without texture sampling shade with
//! [`CanvasTexture::mean_color`].

use crate::color::{Rgb, Rgba};

/// Horizontal alignment for text commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

/// How texture coordinates outside `0..1` are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrap {
    Clamp,
    Repeat,
}

/// One 2D canvas drawing step
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    FillRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgba,
    },
    StrokePolyline {
        points: Vec<(f32, f32)>,
        color: Rgba,
        line_width: f32,
    },
    FillText {
        text: String,
        x: f32,
        y: f32,
        /// Glyph height in pixels
        size: f32,
        family: &'static str,
        align: TextAlign,
        color: Rgba,
    },
}

/// CSS font shorthand for a bold face
pub fn css_font(size: f32, family: &str) -> String {
    format!("bold {size}px {family}")
}

/// Share of a glyph's em box covered by ink, for colour estimates
const GLYPH_INK: f32 = 0.35;

/// A texture painted on an offscreen canvas at load time
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasTexture {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub wrap_s: Wrap,
    pub wrap_t: Wrap,
    pub repeat: (f32, f32),
    pub commands: Vec<DrawCommand>,
}

const PAPER: Rgb = Rgb::new(0xf5 as f32 / 255.0, 0xf5 as f32 / 255.0, 0xf0 as f32 / 255.0);
const BURGUNDY: Rgb = Rgb::new(114.0 / 255.0, 47.0 / 255.0, 55.0 / 255.0);
const SLEEVE_ORANGE: Rgb = Rgb::new(0xd2 as f32 / 255.0, 0x69 as f32 / 255.0, 0x1e as f32 / 255.0);

/// Wordmark tiled around the sleeve
pub const WORDMARK: &str = "GRATIFIED";

impl CanvasTexture {
    fn blank(label: &'static str, width: u32, height: u32) -> Self {
        Self {
            label,
            width,
            height,
            wrap_s: Wrap::Clamp,
            wrap_t: Wrap::Clamp,
            repeat: (1.0, 1.0),
            commands: Vec::new(),
        }
    }

    /// Off-white paper with rows of faint zigzag lines
    pub fn paper_cup() -> Self {
        let mut texture = Self::blank("paper-cup", 256, 256);
        texture.wrap_s = Wrap::Repeat;
        texture.wrap_t = Wrap::Repeat;
        texture.repeat = (2.0, 1.0);
        texture.commands.push(DrawCommand::FillRect {
            x: 0.0,
            y: 0.0,
            width: 256.0,
            height: 256.0,
            color: Rgba::opaque(PAPER),
        });

        for row in 0..8 {
            let y = row as f32 * 32.0 + 16.0;
            let mut points = vec![(0.0, y)];
            let mut x = 0.0;
            while x < 256.0 {
                points.push((x + 8.0, y - 8.0));
                points.push((x + 16.0, y));
                x += 16.0;
            }
            texture.commands.push(DrawCommand::StrokePolyline {
                points,
                color: Rgba::new(BURGUNDY, 0.1),
                line_width: 1.0,
            });
        }

        texture
    }

    /// Orange band with chevrons and the tiled wordmark
    pub fn sleeve() -> Self {
        let mut texture = Self::blank("sleeve", 512, 128);
        texture.wrap_s = Wrap::Repeat;
        texture.commands.push(DrawCommand::FillRect {
            x: 0.0,
            y: 0.0,
            width: 512.0,
            height: 128.0,
            color: Rgba::opaque(SLEEVE_ORANGE),
        });

        let mut x = 0.0;
        while x < 512.0 {
            texture.commands.push(DrawCommand::StrokePolyline {
                points: vec![(x, 0.0), (x + 16.0, 64.0), (x, 128.0)],
                color: Rgba::new(BURGUNDY, 0.3),
                line_width: 2.0,
            });
            x += 32.0;
        }

        for i in 0..4 {
            texture.commands.push(DrawCommand::FillText {
                text: WORDMARK.to_string(),
                x: 128.0 + i as f32 * 128.0,
                y: 64.0,
                size: 20.0,
                family: "Amiri, serif",
                align: TextAlign::Center,
                color: Rgba::new(BURGUNDY, 0.5),
            });
        }

        texture
    }

    /// Area-weighted average of everything painted, starting from a white
    /// canvas. Strokes and text count by their approximate ink area.
    pub fn mean_color(&self) -> Rgb {
        let area = self.width as f32 * self.height as f32;
        if area <= 0.0 {
            return Rgb::WHITE;
        }

        self.commands.iter().fold(Rgb::WHITE, |mean, command| {
            let (color, ink) = match command {
                DrawCommand::FillRect {
                    x,
                    y,
                    width,
                    height,
                    color,
                } => {
                    let w = (x + width).min(self.width as f32) - x.max(0.0);
                    let h = (y + height).min(self.height as f32) - y.max(0.0);
                    (color, w.max(0.0) * h.max(0.0))
                }
                DrawCommand::StrokePolyline {
                    points,
                    color,
                    line_width,
                } => {
                    let length: f32 = points
                        .windows(2)
                        .map(|pair| ((pair[1].0 - pair[0].0).powi(2) + (pair[1].1 - pair[0].1).powi(2)).sqrt())
                        .sum();
                    (color, length * line_width)
                }
                DrawCommand::FillText { text, size, color, .. } => {
                    (color, text.chars().count() as f32 * size * size * GLYPH_INK)
                }
            };
            mean.lerp(color.rgb, (ink / area).min(1.0) * color.alpha)
        })
    }

    /// `createPattern` repetition for the wrap modes
    pub fn repetition(&self) -> &'static str {
        match (self.wrap_s, self.wrap_t) {
            (Wrap::Repeat, Wrap::Repeat) => "repeat",
            (Wrap::Repeat, Wrap::Clamp) => "repeat-x",
            (Wrap::Clamp, Wrap::Repeat) => "repeat-y",
            (Wrap::Clamp, Wrap::Clamp) => "no-repeat",
        }
    }

    /// Texture pixel for a `(u, v)` coordinate, `v` running bottom to top
    pub fn texel(&self, uv: [f32; 2]) -> (f32, f32) {
        (
            uv[0] * self.repeat.0 * self.width as f32,
            (1.0 - uv[1]) * self.repeat.1 * self.height as f32,
        )
    }
}
