//! mobsight-brain - memory, sensors, behaviors and activity scheduling
//!
//! A mob's AI is a [`Brain`]: typed memories with optional expiry, periodic
//! sensors that fill them, and behaviors grouped into prioritized activities.
//! The brain only sees the world through [`WorldQuery`] and drives its body
//! through [`Mob`], so it runs equally against the simulation world and the
//! in-memory doubles used by tests.

pub mod behavior;
pub mod behaviors;
pub mod brain;
pub mod memory;
pub mod nearest;
pub mod sensor;
pub mod traits;
pub mod types;

#[cfg(test)]
mod testing;

use rand::SeedableRng;

pub use behavior::{Behavior, BehaviorContext, BehaviorControl, BehaviorKind, BehaviorStatus, Guard, Started};
pub use brain::{Activity, Brain, BrainBuilder, BrainConfig, BrainError, Provider};
pub use memory::{
    EmptyPolicy, ExpirableValue, MemoryKey, MemoryKind, MemoryRequirement, MemoryStatus, MemoryStore,
    MemoryValue, PositionTracker, WalkTarget,
};
pub use nearest::{NearestVisibleLivingEntities, SensedEntity};
pub use sensor::{Sensor, SensorConfig, SensorKind, DEFAULT_SCAN_RATE};
pub use traits::{Mob, MobAction, Navigation, Path, WorldQuery};
pub use types::{Attributes, EntityId, EntityKind, EntitySnapshot};

/// Random source of one brain
pub type BrainRng = rand_xoshiro::Xoshiro256PlusPlus;

pub fn brain_rng(seed: u64) -> BrainRng {
    BrainRng::seed_from_u64(seed)
}
