//! Damped orbit camera controller: rotate and zoom around a fixed target.

use nalgebra::{Point3, Vector3};
use std::f32::consts::{PI, TAU};

use crate::projection::Camera;

const POLAR_EPSILON: f32 = 1e-4;
const ZOOM_STEP: f32 = 0.95;

#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Point3<f32>,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub enable_zoom: bool,
    radius: f32,
    theta: f32,
    phi: f32,
    delta_theta: f32,
    delta_phi: f32,
    zoom_scale: f32,
}

impl OrbitControls {
    /// Attach to `camera`, orbiting around its current target
    pub fn new(camera: &Camera) -> Self {
        let offset = camera.position - camera.target;
        let radius = offset.norm();
        let mut controls = Self {
            target: camera.target,
            damping_factor: 0.25,
            rotate_speed: 0.5,
            min_distance: 2.0,
            max_distance: 8.0,
            enable_zoom: true,
            radius,
            theta: offset.x.atan2(offset.z),
            phi: if radius > 0.0 {
                (offset.y / radius).clamp(-1.0, 1.0).acos()
            } else {
                PI / 2.0
            },
            delta_theta: 0.0,
            delta_phi: 0.0,
            zoom_scale: 1.0,
        };
        controls.radius = controls.radius.clamp(controls.min_distance, controls.max_distance);
        controls
    }

    /// Pointer drag in pixels on a viewport `viewport_height` pixels tall
    pub fn drag(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        if viewport_height <= 0.0 {
            return;
        }
        self.delta_theta -= TAU * dx / viewport_height * self.rotate_speed;
        self.delta_phi -= TAU * dy / viewport_height * self.rotate_speed;
    }

    /// Wheel input; positive `delta` zooms out
    pub fn wheel(&mut self, delta: f32) {
        if !self.enable_zoom || delta == 0.0 {
            return;
        }
        if delta > 0.0 {
            self.zoom_scale /= ZOOM_STEP;
        } else {
            self.zoom_scale *= ZOOM_STEP;
        }
    }

    pub fn distance(&self) -> f32 {
        self.radius
    }

    /// Apply one damping step and move the camera. Returns true while the
    /// camera is still settling.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        self.theta += self.delta_theta * self.damping_factor;
        self.phi = (self.phi + self.delta_phi * self.damping_factor).clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        self.radius = (self.radius * self.zoom_scale).clamp(self.min_distance, self.max_distance);

        self.delta_theta *= 1.0 - self.damping_factor;
        self.delta_phi *= 1.0 - self.damping_factor;
        self.zoom_scale = 1.0;

        let sin_phi = self.phi.sin();
        let offset = Vector3::new(
            self.radius * sin_phi * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * sin_phi * self.theta.cos(),
        );
        camera.look_from(self.target + offset, self.target);

        self.delta_theta.abs() > 1e-5 || self.delta_phi.abs() > 1e-5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::new(400, 400)
    }

    #[test]
    fn test_update_without_input_keeps_pose() {
        let mut cam = camera();
        let start = cam.position;
        let mut controls = OrbitControls::new(&cam);
        assert!(!controls.update(&mut cam));
        assert!((cam.position - start).norm() < 1e-4);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(&cam);
        for _ in 0..200 {
            controls.wheel(-1.0);
            controls.update(&mut cam);
        }
        assert!((controls.distance() - 2.0).abs() < 1e-5);

        for _ in 0..200 {
            controls.wheel(1.0);
            controls.update(&mut cam);
        }
        assert!((controls.distance() - 8.0).abs() < 1e-5);
        assert!(((cam.position - cam.target).norm() - 8.0).abs() < 1e-3);
    }

    #[test]
    fn test_drag_is_damped() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(&cam);
        controls.drag(100.0, 0.0, 400.0);
        assert!(controls.update(&mut cam));
        let first = cam.position;
        controls.update(&mut cam);
        let second = cam.position;
        // Keeps drifting after the input stopped, by a shrinking amount
        assert!((second - first).norm() > 0.0);
        controls.update(&mut cam);
        assert!((cam.position - second).norm() < (second - first).norm());
    }

    #[test]
    fn test_orbit_keeps_target_fixed() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(&cam);
        controls.drag(40.0, -25.0, 400.0);
        controls.wheel(1.0);
        for _ in 0..10 {
            controls.update(&mut cam);
        }
        assert_eq!(controls.target, Point3::origin());
        assert_eq!(cam.target, Point3::origin());
    }
}
