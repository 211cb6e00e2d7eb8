//! Runner configuration with layered loading
//!
//! Configuration is loaded from multiple sources (lowest to highest priority):
//! 1. Compiled defaults
//! 2. `mobsight.ron` file (if exists)
//! 3. Environment variables prefixed with `MOBSIGHT_`
//!
//! Example environment variable: `MOBSIGHT_WORLD__CREAKING__ATTACK_COOLDOWN=20`

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use mobsight_core::WorldConfig;
use mobsight_culling::CullingConfig;
use serde::{Deserialize, Serialize};

/// Top-level runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Ticks to simulate when the scenario does not say
    pub ticks: u64,

    /// Log a status sample every this many ticks (0 disables sampling)
    pub sample_every: u64,

    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default)]
    pub culling: CullingConfig,

    /// World tuning; the scenario supplies the terrain
    #[serde(default)]
    pub world: WorldConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            ticks: 400,
            sample_every: 20,
            camera: CameraConfig::default(),
            culling: CullingConfig::default(),
            world: WorldConfig::default(),
        }
    }
}

/// Player camera projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 70.0,
            aspect_ratio: 16.0 / 9.0,
            near: 0.05,
            far: 256.0,
        }
    }
}

impl RunnerConfig {
    /// Load configuration with layered priority:
    /// 1. Compiled defaults (lowest priority)
    /// 2. `mobsight.ron` file (if exists)
    /// 3. Environment variables prefixed with `MOBSIGHT_` (highest priority)
    pub fn load() -> Result<Self> {
        Self::load_from("mobsight")
    }

    /// Same layering with an explicit config file name (extension optional).
    pub fn load_from(file: &str) -> Result<Self> {
        let defaults =
            Config::try_from(&RunnerConfig::default()).context("Failed to encode default configuration")?;

        let builder = Config::builder()
            // Layer 1: Compiled defaults
            .add_source(defaults)
            // Layer 2: Config file (optional, won't error if missing)
            .add_source(
                File::with_name(file)
                    .format(config::FileFormat::Ron)
                    .required(false),
            )
            // Layer 3: Environment variables (MOBSIGHT_TICKS, MOBSIGHT_CAMERA__FAR, etc.)
            .add_source(Environment::with_prefix("MOBSIGHT").separator("__"));

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
