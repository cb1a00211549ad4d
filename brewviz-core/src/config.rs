//! Viewer configuration.
//!
//! Every field has a default, so a host can deserialize a partial JSON
//! document (or none at all).

use serde::{Deserialize, Serialize};

use crate::cup::CupConfig;
use crate::rng::DEFAULT_SEED;
use crate::starfield::{CONSTRAINED_STAR_COUNT, DESKTOP_STAR_COUNT};

/// Device class, picked by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceProfile {
    #[default]
    Desktop,
    /// Phones and tablets: fewer stars, twinkle every third frame
    Constrained,
}

impl DeviceProfile {
    pub fn star_count(self) -> usize {
        match self {
            Self::Desktop => DESKTOP_STAR_COUNT,
            Self::Constrained => CONSTRAINED_STAR_COUNT,
        }
    }

    /// Twinkle runs on frames where `frame % cadence == 0`
    pub fn twinkle_cadence(self) -> u64 {
        match self {
            Self::Desktop => 1,
            Self::Constrained => 3,
        }
    }
}

/// Camera interaction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlsMode {
    #[default]
    Orbit,
    /// No controller available: fixed camera pose
    Static,
}

/// What happens when the pointer leaves the menu and the delay expires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeavePolicy {
    /// Fall back to showing the featured drink
    #[default]
    RevertToFeatured,
    /// Hide the viewer entirely
    Hide,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub device: DeviceProfile,
    pub controls: ControlsMode,
    pub featured_key: String,
    pub leave_policy: LeavePolicy,
    pub hover_leave_ms: f64,
    pub inactivity_ms: f64,
    pub status_ms: f64,
    pub seed: u64,
    /// Per-frame yaw applied to the cup and the vapor emitter
    pub spin_per_frame: f32,
    pub cup: CupConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            device: DeviceProfile::Desktop,
            controls: ControlsMode::Orbit,
            featured_key: "call-the-cops".to_string(),
            leave_policy: LeavePolicy::RevertToFeatured,
            hover_leave_ms: 300.0,
            inactivity_ms: 30_000.0,
            status_ms: 3_000.0,
            seed: DEFAULT_SEED,
            spin_per_frame: 0.005,
            cup: CupConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}
