//! Per-frame update and draw.
//!
//! The host owns scheduling (a terminal loop, `requestAnimationFrame`, a
//! test) and calls [`FrameDriver::tick`] once per refresh. Stopping the loop
//! means not calling it again.

use crate::projection::Camera;
use crate::scene::{Scene, ViewerSession};

/// Something that can draw a scene from a camera
pub trait SceneRenderer {
    fn render(&mut self, scene: &Scene, camera: &Camera);
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    pub twinkled: bool,
    pub camera_settling: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FrameDriver {
    frame: u64,
}

impl FrameDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Advance the session to `time` (seconds) and draw it
    pub fn tick(
        &mut self,
        session: &mut ViewerSession,
        time: f64,
        renderer: &mut dyn SceneRenderer,
    ) -> FrameReport {
        self.frame += 1;
        let config = &session.config;

        let twinkled = self.frame % config.device.twinkle_cadence() == 0;
        if twinkled {
            session.scene.starfield.twinkle(time);
        }

        if let Some(cup) = session.scene.cup_mut() {
            cup.animate(time, config.spin_per_frame);
            cup.drift_vapor(
                config.cup.vapor_rise,
                config.cup.vapor_base_y,
                config.cup.vapor_ceiling,
                config.spin_per_frame,
            );
        }

        let camera_settling = match session.controls.as_mut() {
            Some(controls) => controls.update(&mut session.camera),
            None => false,
        };

        renderer.render(&session.scene, &session.camera);

        FrameReport {
            frame: self.frame,
            twinkled,
            camera_settling,
        }
    }
}
