//! Flat block terrain: a floor layer, solid walls and water pools

use glam::{DVec3, IVec3};
use mobsight_culling::BlockBox;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Standable region; entities stand in the layer `bounds.min.y`
    pub bounds: BlockBox,
    /// Solid blocks that stop movement and sight
    pub walls: Vec<BlockBox>,
    pub water: Vec<BlockBox>,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            bounds: BlockBox::new(IVec3::new(-32, 0, -32), IVec3::new(32, 0, 32)),
            walls: Vec::new(),
            water: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Terrain {
    config: TerrainConfig,
}

impl Terrain {
    pub fn new(config: TerrainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn floor_y(&self) -> i32 {
        self.config.bounds.min.y
    }

    pub fn is_solid(&self, pos: IVec3) -> bool {
        self.config.walls.iter().any(|wall| wall.contains(pos))
    }

    pub fn is_water(&self, pos: IVec3) -> bool {
        self.config.water.iter().any(|pool| pool.contains(pos))
    }

    /// Inside the bounds with room for a two block tall body.
    pub fn is_walkable(&self, pos: IVec3) -> bool {
        self.config.bounds.contains(pos) && !self.is_solid(pos) && !self.is_solid(pos + IVec3::Y)
    }

    /// No wall crosses the segment
    pub fn has_clear_line(&self, from: DVec3, to: DVec3) -> bool {
        !self
            .config
            .walls
            .iter()
            .any(|wall| wall.to_aabb().intersects_segment(from, to))
    }

    /// Nearest standable feet position to `position` within the bounds.
    pub fn snap_to_floor(&self, position: DVec3) -> DVec3 {
        let bounds = self.config.bounds;
        DVec3::new(
            position.x.clamp(f64::from(bounds.min.x), f64::from(bounds.max.x) + 0.999),
            f64::from(self.floor_y()),
            position.z.clamp(f64::from(bounds.min.z), f64::from(bounds.max.z) + 0.999),
        )
    }
}
