//! Canvas2D scene renderer.
//!
//! No depth buffer: every visible face and sprite is projected, sorted far to
//! near and painted in order. Additive materials paint with the `lighter`
//! composite operation. Textured materials are replayed once onto an
//! offscreen canvas and painted as a pattern, affinely mapped per triangle,
//! with the lighting multiplied over it.

use std::collections::HashMap;

use brewviz_core::frame::SceneRenderer;
use brewviz_core::material::Side;
use brewviz_core::projection::project_with;
use brewviz_core::resources::ResourceId;
use brewviz_core::scene::{shade, shade_untextured};
use brewviz_core::texture::{css_font, CanvasTexture, DrawCommand};
use brewviz_core::{Blending, Camera, Rgb, Scene, Shape, StarField};
use nalgebra::Vector3;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasPattern, CanvasRenderingContext2d, HtmlCanvasElement};

/// Screen-space radius of one world unit of sprite size at unit distance
const SPRITE_SCALE: f32 = 6.0;

/// Screen radius per unit of star size times sprite size
const STAR_PIXELS: f32 = 4.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Outline {
    Polygon([(f32, f32); 3]),
    Dot { x: f32, y: f32, radius: f32 },
}

/// Pattern lookup for a textured triangle
#[derive(Debug, Clone, PartialEq)]
pub struct TextureFill {
    pub material: ResourceId,
    /// Texture pixel under each polygon corner
    pub texels: [(f32, f32); 3],
    /// Lighting to multiply over the pattern
    pub light: Rgb,
}

/// One paintable item with its sort depth
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    pub outline: Outline,
    pub depth: f32,
    /// Flat colour, also the fallback when the pattern is unavailable
    pub color: Rgb,
    pub alpha: f32,
    pub blending: Blending,
    pub texture: Option<TextureFill>,
}

/// Project the scene into paint order (farthest first)
pub fn collect_faces(scene: &Scene, camera: &Camera, width: u32, height: u32) -> Vec<Face> {
    let view_projection = camera.view_projection();
    let mut faces = Vec::new();

    let star_material = StarField::material();
    for star in scene.starfield.stars() {
        if let Some((x, y, depth)) = project_with(&view_projection, &star.position, width, height) {
            faces.push(Face {
                outline: Outline::Dot {
                    x,
                    y,
                    radius: (star.size * star_material.point_size * STAR_PIXELS).max(0.5),
                },
                depth,
                color: star.color,
                alpha: star_material.alpha(),
                blending: star_material.blending,
                texture: None,
            });
        }
    }

    if let Some(cup) = scene.cup() {
        let group = cup.transform.matrix();
        for primitive in &cup.primitives {
            let model = group * primitive.transform.matrix();
            let mvp = view_projection * model;
            let material = &primitive.material;

            match &primitive.shape {
                Shape::Mesh(mesh) => {
                    for triangle in &mesh.triangles {
                        let normal = model.transform_vector(&triangle.calculate_normal());
                        let normal = normal.try_normalize(1e-6).unwrap_or_else(Vector3::z);
                        let centroid = model.transform_point(&triangle.centroid());

                        if material.side == Side::Front && normal.dot(&(centroid - camera.position)) > 0.0 {
                            continue;
                        }

                        let mut points = [(0.0, 0.0); 3];
                        let mut depth = 0.0;
                        let mut visible = true;
                        for (slot, vertex) in points.iter_mut().zip(&triangle.vertices) {
                            match project_with(&mvp, &vertex.position, width, height) {
                                Some((x, y, z)) => {
                                    *slot = (x, y);
                                    depth += z / 3.0;
                                }
                                None => {
                                    visible = false;
                                    break;
                                }
                            }
                        }
                        if !visible {
                            continue;
                        }

                        let (_, color) = shade(&scene.lights, material, &normal, &centroid);
                        let texture = material.map.as_ref().map(|map| {
                            let [a, b, c] = &triangle.vertices;
                            TextureFill {
                                material: primitive.material_handle(),
                                texels: [map.texel(a.uv), map.texel(b.uv), map.texel(c.uv)],
                                light: shade_untextured(&scene.lights, material, &normal, &centroid).1,
                            }
                        });
                        faces.push(Face {
                            outline: Outline::Polygon(points),
                            depth,
                            color,
                            alpha: material.alpha(),
                            blending: material.blending,
                            texture,
                        });
                    }
                }
                Shape::Points(cloud) => {
                    for point in &cloud.positions {
                        let Some((x, y, depth)) = project_with(&mvp, point, width, height) else {
                            continue;
                        };
                        let distance = (camera.position - model.transform_point(point)).norm().max(0.1);
                        faces.push(Face {
                            outline: Outline::Dot {
                                x,
                                y,
                                radius: (material.point_size * SPRITE_SCALE / distance).max(0.5),
                            },
                            depth,
                            color: material.surface_color(),
                            alpha: material.alpha(),
                            blending: material.blending,
                            texture: None,
                        });
                    }
                }
            }
        }
    }

    faces.sort_by(|a, b| b.depth.total_cmp(&a.depth));
    faces
}

/// Textured materials of the attached cup, keyed by material handle
pub fn textured_materials(scene: &Scene) -> Vec<(ResourceId, &CanvasTexture)> {
    scene
        .cup()
        .map(|cup| {
            cup.primitives
                .iter()
                .filter_map(|p| p.material.map.as_ref().map(|map| (p.material_handle(), map)))
                .collect()
        })
        .unwrap_or_default()
}

/// Canvas `setTransform` arguments taking texture pixels `from` onto screen
/// points `to`, or `None` when the texels are collinear.
pub fn texture_affine(from: [(f32, f32); 3], to: [(f32, f32); 3]) -> Option<[f64; 6]> {
    let [(u0, v0), (u1, v1), (u2, v2)] = from.map(|(u, v)| (u as f64, v as f64));
    let [(x0, y0), (x1, y1), (x2, y2)] = to.map(|(x, y)| (x as f64, y as f64));

    let (du1, dv1, du2, dv2) = (u1 - u0, v1 - v0, u2 - u0, v2 - v0);
    let det = du1 * dv2 - du2 * dv1;
    if det.abs() < 1e-9 {
        return None;
    }

    let (dx1, dy1, dx2, dy2) = (x1 - x0, y1 - y0, x2 - x0, y2 - y0);
    let a = (dx1 * dv2 - dx2 * dv1) / det;
    let c = (dx2 * du1 - dx1 * du2) / det;
    let b = (dy1 * dv2 - dy2 * dv1) / det;
    let d = (dy2 * du1 - dy1 * du2) / det;
    Some([a, b, c, d, x0 - a * u0 - c * v0, y0 - b * u0 - d * v0])
}

/// Paint a texture's commands onto a context sized to it
fn replay(ctx: &CanvasRenderingContext2d, commands: &[DrawCommand]) -> Result<(), JsValue> {
    for command in commands {
        match command {
            DrawCommand::FillRect {
                x,
                y,
                width,
                height,
                color,
            } => {
                ctx.set_fill_style_str(&color.to_css());
                ctx.fill_rect(*x as f64, *y as f64, *width as f64, *height as f64);
            }
            DrawCommand::StrokePolyline {
                points,
                color,
                line_width,
            } => {
                let Some(((x, y), rest)) = points.split_first() else {
                    continue;
                };
                ctx.begin_path();
                ctx.move_to(*x as f64, *y as f64);
                for (x, y) in rest {
                    ctx.line_to(*x as f64, *y as f64);
                }
                ctx.set_stroke_style_str(&color.to_css());
                ctx.set_line_width(*line_width as f64);
                ctx.stroke();
            }
            DrawCommand::FillText {
                text,
                x,
                y,
                size,
                family,
                align,
                color,
            } => {
                ctx.set_font(&css_font(*size, family));
                ctx.set_text_align(align.as_css());
                ctx.set_text_baseline("middle");
                ctx.set_fill_style_str(&color.to_css());
                ctx.fill_text(text, *x as f64, *y as f64)?;
            }
        }
    }
    Ok(())
}

fn trace_triangle(ctx: &CanvasRenderingContext2d, [a, b, c]: &[(f32, f32); 3]) {
    ctx.begin_path();
    ctx.move_to(a.0 as f64, a.1 as f64);
    ctx.line_to(b.0 as f64, b.1 as f64);
    ctx.line_to(c.0 as f64, c.1 as f64);
    ctx.close_path();
}

pub struct CanvasRenderer {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    patterns: HashMap<ResourceId, CanvasPattern>,
}

impl CanvasRenderer {
    pub fn new(canvas: HtmlCanvasElement, context: CanvasRenderingContext2d) -> Self {
        Self {
            canvas,
            context,
            patterns: HashMap::new(),
        }
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    /// Match the backing store to the CSS size times the pixel ratio
    pub fn resize(&self, width: u32, height: u32, pixel_ratio: f32) {
        self.canvas.set_width((width as f32 * pixel_ratio).round() as u32);
        self.canvas.set_height((height as f32 * pixel_ratio).round() as u32);
    }

    /// Build patterns for new textured materials and drop the ones whose
    /// material left the scene
    fn sync_patterns(&mut self, scene: &Scene) {
        let textured = textured_materials(scene);
        self.patterns.retain(|id, _| textured.iter().any(|(live, _)| live == id));

        for (id, texture) in textured {
            if self.patterns.contains_key(&id) {
                continue;
            }
            match self.build_pattern(texture) {
                Ok(pattern) => {
                    self.patterns.insert(id, pattern);
                }
                Err(e) => log::debug!("`{}` texture unavailable, painting flat: {e:?}", texture.label),
            }
        }
    }

    fn build_pattern(&self, texture: &CanvasTexture) -> Result<CanvasPattern, JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let offscreen = document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| JsValue::from_str("created element is not a canvas"))?;
        offscreen.set_width(texture.width);
        offscreen.set_height(texture.height);

        let ctx = offscreen
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        replay(&ctx, &texture.commands)?;

        self.context
            .create_pattern_with_html_canvas_element(&offscreen, texture.repetition())?
            .ok_or_else(|| JsValue::from_str("pattern unavailable"))
    }

    fn paint(&self, face: &Face) {
        let ctx = &self.context;
        let operation = match face.blending {
            Blending::Normal => "source-over",
            Blending::Additive => "lighter",
        };
        if let Err(e) = ctx.set_global_composite_operation(operation) {
            log::debug!("composite operation rejected: {e:?}");
        }

        if let (Outline::Polygon(points), Some(fill)) = (&face.outline, &face.texture) {
            if self.paint_textured(points, fill, face.alpha) {
                return;
            }
        }

        ctx.set_fill_style_str(&face.color.to_css_rgba(face.alpha));
        match &face.outline {
            Outline::Polygon(points) => trace_triangle(ctx, points),
            Outline::Dot { x, y, radius } => {
                ctx.begin_path();
                if ctx
                    .arc(*x as f64, *y as f64, *radius as f64, 0.0, std::f64::consts::TAU)
                    .is_err()
                {
                    return;
                }
            }
        }
        ctx.fill();
    }

    /// Pattern clipped to the triangle, then the lighting multiplied over it.
    /// Returns false when the flat colour has to be used instead.
    fn paint_textured(&self, points: &[(f32, f32); 3], fill: &TextureFill, alpha: f32) -> bool {
        let Some(pattern) = self.patterns.get(&fill.material) else {
            return false;
        };
        let Some([a, b, c, d, e, f]) = texture_affine(fill.texels, *points) else {
            return false;
        };

        let ctx = &self.context;
        ctx.save();
        ctx.set_global_alpha(alpha as f64);
        trace_triangle(ctx, points);
        ctx.clip();

        let painted = ctx.set_transform(a, b, c, d, e, f).is_ok();
        if painted {
            let (min_u, max_u) = fill.texels.iter().fold((f32::MAX, f32::MIN), |(lo, hi), t| (lo.min(t.0), hi.max(t.0)));
            let (min_v, max_v) = fill.texels.iter().fold((f32::MAX, f32::MIN), |(lo, hi), t| (lo.min(t.1), hi.max(t.1)));
            ctx.set_fill_style_canvas_pattern(pattern);
            ctx.fill_rect(
                min_u as f64 - 1.0,
                min_v as f64 - 1.0,
                (max_u - min_u) as f64 + 2.0,
                (max_v - min_v) as f64 + 2.0,
            );

            if ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0).is_ok() {
                if let Err(e) = ctx.set_global_composite_operation("multiply") {
                    log::debug!("multiply unsupported: {e:?}");
                }
                ctx.set_fill_style_str(&fill.light.to_hex());
                trace_triangle(ctx, points);
                ctx.fill();
            }
        }

        ctx.restore();
        painted
    }
}

impl SceneRenderer for CanvasRenderer {
    fn render(&mut self, scene: &Scene, camera: &Camera) {
        let width = self.canvas.width();
        let height = self.canvas.height();
        self.sync_patterns(scene);

        self.context.set_global_alpha(1.0);
        self.context.set_global_composite_operation("source-over").ok();
        self.context.set_fill_style_str(&scene.background.to_hex());
        self.context.fill_rect(0.0, 0.0, width as f64, height as f64);

        for face in collect_faces(scene, camera, width, height) {
            self.paint(&face);
        }
    }
}
