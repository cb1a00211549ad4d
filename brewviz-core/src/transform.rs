//! Object placement: Euler rotation plus translation and uniform scale

use nalgebra::{Matrix4, Vector3};

/// Rotation around the X, Y and Z axes (radians), applied Z then Y then X
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RotationState {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl RotationState {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        let rx = Matrix4::new_rotation(Vector3::x() * self.x);
        let ry = Matrix4::new_rotation(Vector3::y() * self.y);
        let rz = Matrix4::new_rotation(Vector3::z() * self.z);
        rz * ry * rx
    }
}

/// Position, rotation and uniform scale of a scene object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: RotationState,
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: RotationState::default(),
            scale: 1.0,
        }
    }

    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Vector3::new(x, y, z),
            ..Self::identity()
        }
    }

    pub fn rotated(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = RotationState::new(x, y, z);
        self
    }

    /// Model matrix: translate * rotate * scale
    pub fn matrix(&self) -> Matrix4<f32> {
        Matrix4::new_translation(&self.position) * self.rotation.matrix() * Matrix4::new_scaling(self.scale)
    }
}
