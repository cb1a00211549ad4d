//! ASCII rasterizer for terminal rendering

use brewviz_core::frame::SceneRenderer;
use brewviz_core::projection::project_with;
use brewviz_core::scene::{shade, Light};
use brewviz_core::{Blending, Camera, Material, Mesh, PointCloud, Rgb, Scene, Shape, StarField};
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use nalgebra::{Matrix4, Vector3};
use std::io::Write;

/// Character luminosity ramp for depth/shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

const VAPOR_CHAR: char = '~';

/// Stars at or above this size are drawn bright
const BRIGHT_STAR_SIZE: f32 = 0.4;

/// How one rasterized primitive writes into the buffers
#[derive(Debug, Clone, Copy)]
struct Fill {
    character: char,
    color: Rgb,
    alpha: f32,
    blending: Blending,
    write_depth: bool,
}

impl Fill {
    fn for_material(character: char, color: Rgb, material: &Material) -> Self {
        let write_depth = is_opaque(material);
        Self {
            character,
            color,
            alpha: material.alpha(),
            blending: material.blending,
            write_depth,
        }
    }
}

/// ASCII renderer that converts the cup scene to terminal characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    char_buffer: Vec<char>,
    color_buffer: Vec<Rgb>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            char_buffer: vec![' '; size],
            color_buffer: vec![Rgb::BLACK; size],
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Self::new(width, height);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Character at a cell, mostly for tests
    pub fn cell(&self, x: usize, y: usize) -> Option<char> {
        (x < self.width && y < self.height).then(|| self.char_buffer[y * self.width + x])
    }

    pub fn covered_cells(&self) -> usize {
        self.char_buffer.iter().filter(|c| **c != ' ').count()
    }

    pub fn clear(&mut self, background: Rgb) {
        self.depth_buffer.fill(f32::INFINITY);
        self.char_buffer.fill(' ');
        self.color_buffer.fill(background);
    }

    fn render_stars(&mut self, starfield: &StarField, view_projection: &Matrix4<f32>) {
        let material = StarField::material();
        for star in starfield.stars() {
            let Some((x, y, depth)) = project_with(
                view_projection,
                &star.position,
                self.width as u32,
                self.height as u32,
            ) else {
                continue;
            };
            let character = if star.size >= BRIGHT_STAR_SIZE { '*' } else { '.' };
            self.plot(x as i32, y as i32, depth, Fill::for_material(character, star.color, &material));
        }
    }

    pub fn render_mesh(
        &mut self,
        mesh: &Mesh,
        model: &Matrix4<f32>,
        view_projection: &Matrix4<f32>,
        material: &Material,
        lights: &[Light],
    ) {
        let mvp = view_projection * model;

        for triangle in &mesh.triangles {
            // Project vertices to screen space
            let mut screen_coords = [(0.0, 0.0, 0.0); 3];
            let mut clipped = false;
            for (slot, vertex) in screen_coords.iter_mut().zip(&triangle.vertices) {
                match project_with(&mvp, &vertex.position, self.width as u32, self.height as u32) {
                    Some(coords) => *slot = coords,
                    None => {
                        clipped = true;
                        break;
                    }
                }
            }
            if clipped {
                continue;
            }

            let normal = model.transform_vector(&triangle.calculate_normal());
            let normal = normal.try_normalize(1e-6).unwrap_or_else(Vector3::z);
            let centroid = model.transform_point(&triangle.centroid());

            let (brightness, color) = shade(lights, material, &normal, &centroid);
            let fill = Fill::for_material(ramp_char(brightness), color, material);

            self.rasterize_triangle(&screen_coords, fill);
        }
    }

    fn render_points(
        &mut self,
        cloud: &PointCloud,
        model: &Matrix4<f32>,
        view_projection: &Matrix4<f32>,
        material: &Material,
    ) {
        let mvp = view_projection * model;
        let fill = Fill::for_material(VAPOR_CHAR, material.surface_color(), material);
        for point in &cloud.positions {
            if let Some((x, y, depth)) = project_with(&mvp, point, self.width as u32, self.height as u32) {
                self.plot(x as i32, y as i32, depth, fill);
            }
        }
    }

    fn rasterize_triangle(&mut self, coords: &[(f32, f32, f32); 3], fill: Fill) {
        let (v0, v1, v2) = (coords[0], coords[1], coords[2]);

        // Bounding box
        let min_x = v0.0.min(v1.0).min(v2.0).floor() as i32;
        let max_x = v0.0.max(v1.0).max(v2.0).ceil() as i32;
        let min_y = v0.1.min(v1.1).min(v2.1).floor() as i32;
        let max_y = v0.1.max(v1.1).max(v2.1).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                if let Some((w0, w1, w2)) = barycentric(
                    (v0.0, v0.1),
                    (v1.0, v1.1),
                    (v2.0, v2.1),
                    (px, py),
                ) {
                    if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                        let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                        self.plot(x, y, depth, fill);
                    }
                }
            }
        }
    }

    /// Depth-tested write of one cell. Translucent fills blend over what is
    /// already there and leave the depth buffer alone.
    fn plot(&mut self, x: i32, y: i32, depth: f32, fill: Fill) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        if depth >= self.depth_buffer[idx] {
            return;
        }

        if fill.write_depth {
            self.depth_buffer[idx] = depth;
            self.char_buffer[idx] = fill.character;
            self.color_buffer[idx] = fill.color.scale(fill.alpha).clamped();
            return;
        }

        let under = self.color_buffer[idx];
        self.color_buffer[idx] = match fill.blending {
            Blending::Normal => under.lerp(fill.color, fill.alpha),
            Blending::Additive => (under + fill.color.scale(fill.alpha)).clamped(),
        };
        if self.char_buffer[idx] == ' ' || fill.alpha >= 0.5 {
            self.char_buffer[idx] = fill.character;
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for y in 0..self.height {
            for x in 0..self.width {
                let idx = y * self.width + x;
                let [r, g, b] = self.color_buffer[idx].to_rgb8();

                writer.queue(SetForegroundColor(Color::Rgb { r, g, b }))?;
                writer.queue(Print(self.char_buffer[idx]))?;
            }
            if y + 1 < self.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

impl SceneRenderer for AsciiRenderer {
    fn render(&mut self, scene: &Scene, camera: &Camera) {
        self.clear(scene.background);
        let view_projection = camera.view_projection();
        self.render_stars(&scene.starfield, &view_projection);

        let Some(cup) = scene.cup() else {
            return;
        };
        let group = cup.transform.matrix();

        // Opaque pass first so translucent shells blend over finished depth
        let (opaque, blended): (Vec<_>, Vec<_>) = cup
            .primitives
            .iter()
            .partition(|p| is_opaque(&p.material));

        for primitive in opaque.into_iter().chain(blended) {
            let model = group * primitive.transform.matrix();
            match &primitive.shape {
                Shape::Mesh(mesh) => {
                    self.render_mesh(mesh, &model, &view_projection, &primitive.material, &scene.lights)
                }
                Shape::Points(cloud) => {
                    self.render_points(cloud, &model, &view_projection, &primitive.material)
                }
            }
        }
    }
}

fn is_opaque(material: &Material) -> bool {
    material.alpha() >= 1.0 && material.blending == Blending::Normal
}

fn ramp_char(brightness: f32) -> char {
    // Index 0 is blank, so covered surfaces start at '.'
    let steps = (LUMINOSITY_RAMP.len() - 2) as f32;
    let index = 1 + (brightness.clamp(0.0, 1.0) * steps).round() as usize;
    LUMINOSITY_RAMP[index.min(LUMINOSITY_RAMP.len() - 1)]
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use brewviz_core::{Catalog, SurfaceSize, ViewerConfig, ViewerSession};

    fn session_with(key: &str) -> ViewerSession {
        let catalog = Catalog::embedded().unwrap();
        let mut session = ViewerSession::init(SurfaceSize::new(80, 48), ViewerConfig::default());
        session.show_drink(catalog.get(key).unwrap()).unwrap();
        session
    }

    #[test]
    fn test_barycentric_center() {
        let (w0, w1, w2) = barycentric((0.0, 0.0), (4.0, 0.0), (0.0, 4.0), (1.0, 1.0)).unwrap();
        assert!((w0 + w1 + w2 - 1.0).abs() < 1e-6);
        assert!(w0 > 0.0 && w1 > 0.0 && w2 > 0.0);
    }

    #[test]
    fn test_degenerate_triangle() {
        assert!(barycentric((0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (1.0, 1.0)).is_none());
    }

    #[test]
    fn test_ramp_never_blank_for_covered_surface() {
        assert_eq!(ramp_char(0.0), '.');
        assert_eq!(ramp_char(1.0), '@');
        assert_eq!(ramp_char(7.0), '@');
    }

    #[test]
    fn test_cup_covers_center_of_screen() {
        let session = session_with("espresso");
        let mut renderer = AsciiRenderer::new(80, 24);
        renderer.render(&session.scene, &session.camera);
        assert_ne!(renderer.cell(40, 12), Some(' '));
        assert!(renderer.covered_cells() > 40);
    }

    #[test]
    fn test_empty_scene_draws_only_stars() {
        let mut session = session_with("espresso");
        session.hide_drink();
        let mut renderer = AsciiRenderer::new(80, 24);
        renderer.render(&session.scene, &session.camera);
        assert!(renderer
            .char_buffer
            .iter()
            .all(|c| matches!(c, ' ' | '.' | '*')));
    }

    #[test]
    fn test_translucent_fill_keeps_depth() {
        let mut renderer = AsciiRenderer::new(4, 4);
        renderer.clear(Rgb::BLACK);
        let fill = Fill {
            character: '~',
            color: Rgb::WHITE,
            alpha: 0.25,
            blending: Blending::Additive,
            write_depth: false,
        };
        renderer.plot(1, 1, 0.5, fill);
        assert_eq!(renderer.cell(1, 1), Some('~'));
        assert_eq!(renderer.depth_buffer[5], f32::INFINITY);
        assert!((renderer.color_buffer[5].r - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_stars_add_light_over_background() {
        let mut session = session_with("espresso");
        session.hide_drink();
        let mut renderer = AsciiRenderer::new(80, 24);
        renderer.render(&session.scene, &session.camera);

        let background = session.scene.background;
        let lit: Vec<usize> = (0..renderer.char_buffer.len())
            .filter(|&i| renderer.char_buffer[i] != ' ')
            .collect();
        assert!(!lit.is_empty());
        for i in lit {
            let c = renderer.color_buffer[i];
            assert!(c.r >= background.r && c.g >= background.g && c.b >= background.b);
            // Stars never claim depth
            assert_eq!(renderer.depth_buffer[i], f32::INFINITY);
        }
    }

    #[test]
    fn test_draw_emits_every_row() {
        let renderer = AsciiRenderer::new(3, 2);
        let mut out = Vec::new();
        renderer.draw(&mut out).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert_eq!(text.matches("\r\n").count(), 1);
    }
}
