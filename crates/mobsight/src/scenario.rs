//! Scenario definition and RON file loading

use anyhow::{Context, Result};
use glam::DVec3;
use mobsight_core::world::TerrainConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level scenario definition loaded from RON files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    /// Scenario name
    pub name: String,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Ticks to run; falls back to the runner configuration
    #[serde(default)]
    pub ticks: Option<u64>,

    #[serde(default)]
    pub terrain: TerrainConfig,

    #[serde(default)]
    pub players: Vec<PlayerSetup>,

    /// Creaking spawn positions
    #[serde(default)]
    pub creakings: Vec<DVec3>,

    /// Brainless bystander spawn positions
    #[serde(default)]
    pub creatures: Vec<DVec3>,
}

/// A player and the gaze script it follows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSetup {
    pub position: DVec3,

    #[serde(default = "default_attackable")]
    pub attackable: bool,

    /// Gaze changes, applied from their tick onwards
    #[serde(default)]
    pub script: Vec<LookCommand>,
}

fn default_attackable() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LookCommand {
    pub at_tick: u64,
    pub look: Look,
}

/// Where a scripted player points its camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Look {
    /// Track the eye of the nearest Creaking every tick
    AtNearestCreaking,
    /// Turn the back to the nearest Creaking every tick
    AwayFromNearestCreaking,
    /// Fixed direction
    Direction(DVec3),
}

impl PlayerSetup {
    /// The command in force at `tick`, if any.
    pub fn look_at_tick(&self, tick: u64) -> Option<Look> {
        self.script
            .iter()
            .filter(|command| command.at_tick <= tick)
            .max_by_key(|command| command.at_tick)
            .map(|command| command.look)
    }
}

impl ScenarioDefinition {
    /// Load scenario from RON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario file: {}", path.display()))?;

        let scenario = ron::from_str(&content)
            .with_context(|| format!("Failed to parse RON scenario: {}", path.display()))?;

        Ok(scenario)
    }

    /// Save scenario to RON file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let ron = self.to_ron()?;

        std::fs::write(path.as_ref(), ron).with_context(|| {
            format!("Failed to write scenario file: {}", path.as_ref().display())
        })?;

        Ok(())
    }

    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .context("Failed to serialize scenario to RON")
    }

    /// Built-in "red light, green light" demo: a player alternates between
    /// watching a Creaking and turning away from it.
    pub fn demo() -> Self {
        ScenarioDefinition {
            name: "Red Light".to_string(),
            description: "A Creaking closes in whenever the player turns away".to_string(),
            ticks: Some(400),
            terrain: TerrainConfig::default(),
            players: vec![PlayerSetup {
                position: DVec3::new(0.5, 0.0, 10.5),
                attackable: true,
                script: vec![
                    LookCommand {
                        at_tick: 0,
                        look: Look::AtNearestCreaking,
                    },
                    LookCommand {
                        at_tick: 60,
                        look: Look::AwayFromNearestCreaking,
                    },
                    LookCommand {
                        at_tick: 75,
                        look: Look::AtNearestCreaking,
                    },
                    LookCommand {
                        at_tick: 140,
                        look: Look::AwayFromNearestCreaking,
                    },
                ],
            }],
            creakings: vec![DVec3::new(0.5, 0.0, 0.5)],
            creatures: vec![DVec3::new(8.5, 0.0, 4.5)],
        }
    }
}
