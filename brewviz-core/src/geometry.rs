//! Geometry primitives for 3D rendering

use nalgebra::{Point3, Vector3};
use std::f32::consts::TAU;

/// A 3D vertex with position, normal and texture coordinate
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
    /// `(u, v)` with `v` increasing upwards
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(x: f32, y: f32, z: f32, nx: f32, ny: f32, nz: f32) -> Self {
        Self::from_parts(Point3::new(x, y, z), Vector3::new(nx, ny, nz))
    }

    fn from_parts(position: Point3<f32>, normal: Vector3<f32>) -> Self {
        Self {
            position,
            normal,
            uv: [0.0, 0.0],
        }
    }

    pub fn with_uv(mut self, u: f32, v: f32) -> Self {
        self.uv = [u, v];
        self
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Calculate the face normal from the triangle's vertices
    pub fn calculate_normal(&self) -> Vector3<f32> {
        let v0 = self.vertices[0].position;
        let v1 = self.vertices[1].position;
        let v2 = self.vertices[2].position;

        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        edge1.cross(&edge2).normalize()
    }

    pub fn centroid(&self) -> Point3<f32> {
        let [a, b, c] = &self.vertices;
        Point3::from((a.position.coords + b.position.coords + c.position.coords) / 3.0)
    }
}

/// A 3D mesh composed of triangles
#[derive(Debug, Clone)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            triangles: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Capped tapered cylinder centred on the origin, axis along +Y.
    ///
    /// `top_radius` sits at `y = height / 2`, `bottom_radius` at `-height / 2`.
    /// The wall's `u` runs once around, `v` from bottom to top; caps are
    /// mapped from above.
    pub fn frustum(top_radius: f32, bottom_radius: f32, height: f32, segments: u32) -> Self {
        let segments = segments.max(3);
        let half = height / 2.0;
        let slope = if height.abs() > f32::EPSILON {
            (bottom_radius - top_radius) / height
        } else {
            0.0
        };
        let mut mesh = Self::with_capacity(segments as usize * 4);

        let top_center = Vertex::new(0.0, half, 0.0, 0.0, 1.0, 0.0).with_uv(0.5, 0.5);
        let bottom_center = Vertex::new(0.0, -half, 0.0, 0.0, -1.0, 0.0).with_uv(0.5, 0.5);
        let cap_uv = |v: Vertex, normal: Vector3<f32>, (sin, cos): (f32, f32)| {
            Vertex::from_parts(v.position, normal).with_uv(cos * 0.5 + 0.5, sin * 0.5 + 0.5)
        };

        for i in 0..segments {
            let theta0 = i as f32 / segments as f32 * TAU;
            let theta1 = (i + 1) as f32 / segments as f32 * TAU;
            let (s0, c0) = theta0.sin_cos();
            let (s1, c1) = theta1.sin_cos();

            let n0 = Vector3::new(c0, slope, s0).normalize();
            let n1 = Vector3::new(c1, slope, s1).normalize();

            let u0 = i as f32 / segments as f32;
            let u1 = (i + 1) as f32 / segments as f32;

            let b0 = Vertex::from_parts(Point3::new(bottom_radius * c0, -half, bottom_radius * s0), n0).with_uv(u0, 0.0);
            let b1 = Vertex::from_parts(Point3::new(bottom_radius * c1, -half, bottom_radius * s1), n1).with_uv(u1, 0.0);
            let t0 = Vertex::from_parts(Point3::new(top_radius * c0, half, top_radius * s0), n0).with_uv(u0, 1.0);
            let t1 = Vertex::from_parts(Point3::new(top_radius * c1, half, top_radius * s1), n1).with_uv(u1, 1.0);

            // Side wall, outward facing
            mesh.add_triangle(Triangle::new(b0, t0, b1));
            mesh.add_triangle(Triangle::new(b1, t0, t1));

            // Caps
            let up = Vector3::new(0.0, 1.0, 0.0);
            let down = Vector3::new(0.0, -1.0, 0.0);
            mesh.add_triangle(Triangle::new(
                top_center,
                cap_uv(t1, up, (s1, c1)),
                cap_uv(t0, up, (s0, c0)),
            ));
            mesh.add_triangle(Triangle::new(
                bottom_center,
                cap_uv(b0, down, (s0, c0)),
                cap_uv(b1, down, (s1, c1)),
            ));
        }

        mesh
    }

    /// Torus lying in the XY plane, centred on the origin
    pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> Self {
        let radial_segments = radial_segments.max(3);
        let tubular_segments = tubular_segments.max(3);
        let mut mesh = Self::with_capacity((radial_segments * tubular_segments * 2) as usize);

        let vertex = |i: u32, j: u32| {
            let u = i as f32 / tubular_segments as f32 * TAU;
            let v = j as f32 / radial_segments as f32 * TAU;
            let (su, cu) = u.sin_cos();
            let (sv, cv) = v.sin_cos();
            let ring = radius + tube * cv;
            let position = Point3::new(ring * cu, ring * su, tube * sv);
            let center = Point3::new(radius * cu, radius * su, 0.0);
            Vertex::from_parts(position, (position - center).normalize())
                .with_uv(i as f32 / tubular_segments as f32, j as f32 / radial_segments as f32)
        };

        for i in 0..tubular_segments {
            for j in 0..radial_segments {
                let a = vertex(i, j);
                let b = vertex(i + 1, j);
                let c = vertex(i + 1, j + 1);
                let d = vertex(i, j + 1);
                mesh.add_triangle(Triangle::new(a, b, d));
                mesh.add_triangle(Triangle::new(b, c, d));
            }
        }

        mesh
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

/// A set of points rendered as sprites (particles)
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    pub positions: Vec<Point3<f32>>,
}

impl PointCloud {
    pub fn new(positions: Vec<Point3<f32>>) -> Self {
        Self { positions }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
