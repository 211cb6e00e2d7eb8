//! World state, spatial queries and navigation

mod navigation;
mod snapshot;
mod terrain;
#[allow(clippy::module_inception)]
mod world;

pub use navigation::{StraightLineNavigation, MAX_PATH_NODES, STUCK_AFTER_TICKS};
pub use snapshot::WorldSnapshot;
pub use terrain::{Terrain, TerrainConfig};
pub use world::{TickReport, World, WorldConfig, WorldError};
