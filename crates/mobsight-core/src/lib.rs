//! mobsight-core - the simulated world mobsight brains live in
//!
//! - `world`: terrain, the per-tick R-tree snapshot brains sense through,
//!   straight-line navigation and the fixed-tick loop
//! - `entity`: players and brainless bystanders
//! - `creaking`: the Creaking, a mob frozen by a player's gaze

pub mod creaking;
pub mod entity;
pub mod world;

pub use creaking::{Creaking, CreakingBody, CreakingConfig};
pub use entity::{Creature, Health, Player};
pub use world::{TickReport, World, WorldConfig, WorldError, WorldSnapshot};
