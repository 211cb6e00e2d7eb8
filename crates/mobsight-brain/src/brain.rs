//! Activity scheduling
//!
//! A `Brain` owns one mob's memories, sensors and prioritized behaviors. Each
//! tick it expires memories, runs due sensors, starts every eligible behavior
//! of the active activities and then ticks (or stops) the running ones.
//!
//! Brains are assembled by a [`BrainBuilder`] obtained from a [`Provider`],
//! which declares the memory keys and sensors of an entity kind. `build`
//! rejects behaviors that depend on keys nobody registers, and behaviors
//! that wait for a sensor-written key none of the brain's sensors writes.

use ahash::HashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::behavior::{Behavior, BehaviorContext, BehaviorStatus};
use crate::memory::{MemoryKey, MemoryRequirement, MemoryStatus, MemoryStore};
use crate::sensor::{Sensor, SensorConfig, SensorKind};
use crate::traits::{Mob, WorldQuery};
use crate::BrainRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Activity {
    Core,
    Idle,
    Fight,
}

impl std::fmt::Display for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Activity::Core => "core",
            Activity::Idle => "idle",
            Activity::Fight => "fight",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BrainError {
    #[error("{behavior} depends on unregistered memory {key:?}")]
    UnregisteredMemory {
        behavior: &'static str,
        key: MemoryKey,
    },
    #[error("{behavior} needs {key:?}, which no sensor of this brain writes")]
    UncoveredSensorMemory {
        behavior: &'static str,
        key: MemoryKey,
    },
    #[error("activity {0} has no behaviors registered")]
    UnknownActivity(Activity),
    #[error("no default activity set")]
    MissingDefaultActivity,
    #[error("no core activity set")]
    NoCoreActivity,
}

/// Per-brain tuning shared by every mob of a kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainConfig {
    pub sensors: SensorConfig,
}

/// Memory keys and sensors an entity kind's brain is built from.
#[derive(Debug, Clone)]
pub struct Provider {
    memories: Vec<MemoryKey>,
    sensors: Vec<SensorKind>,
}

impl Provider {
    pub fn new(memories: &[MemoryKey], sensors: &[SensorKind]) -> Self {
        Self {
            memories: memories.to_vec(),
            sensors: sensors.to_vec(),
        }
    }

    pub fn memories(&self) -> &[MemoryKey] {
        &self.memories
    }

    pub fn sensors(&self) -> &[SensorKind] {
        &self.sensors
    }

    /// Fresh brain with every declared key and every sensor-written key registered.
    pub fn make_brain<M: Mob>(&self, config: &BrainConfig, seed: u64) -> BrainBuilder<M> {
        let mut rng = crate::brain_rng(seed);
        let sensors: Vec<Sensor> = self
            .sensors
            .iter()
            .map(|kind| Sensor::from_config(*kind, &config.sensors, &mut rng))
            .collect();

        let mut memory = MemoryStore::new(self.memories.iter().copied());
        for sensor in &sensors {
            for key in sensor.requires() {
                memory.register(*key);
            }
        }

        BrainBuilder {
            memory,
            sensors,
            behaviors: Vec::new(),
            activities: HashMap::default(),
            core_activities: SmallVec::new(),
            default_activity: None,
            rng,
        }
    }
}

/// Entry conditions and deactivation cleanup of one activity.
#[derive(Debug, Clone, Default)]
struct ActivitySettings {
    requirements: SmallVec<[MemoryRequirement; 2]>,
    erase_on_stop: SmallVec<[MemoryKey; 2]>,
}

struct ScheduledBehavior<M> {
    activity: Activity,
    priority: u32,
    behavior: Behavior<M>,
}

pub struct BrainBuilder<M> {
    memory: MemoryStore,
    sensors: Vec<Sensor>,
    behaviors: Vec<ScheduledBehavior<M>>,
    activities: HashMap<Activity, ActivitySettings>,
    core_activities: SmallVec<[Activity; 2]>,
    default_activity: Option<Activity>,
    rng: BrainRng,
}

impl<M: Mob> BrainBuilder<M> {
    /// Register `behaviors` under `activity`; behavior `i` gets priority `priority + i`.
    pub fn add_activity(self, activity: Activity, priority: u32, behaviors: Vec<Behavior<M>>) -> Self {
        self.add_activity_with_conditions(activity, priority, behaviors, &[])
    }

    /// Like [`add_activity`](Self::add_activity), but the activity can only
    /// become active while `requirements` hold.
    pub fn add_activity_with_conditions(
        mut self,
        activity: Activity,
        priority: u32,
        behaviors: Vec<Behavior<M>>,
        requirements: &[MemoryRequirement],
    ) -> Self {
        let settings = self.activities.entry(activity).or_default();
        settings.requirements.extend(requirements.iter().copied());

        for (offset, behavior) in (0u32..).zip(behaviors) {
            self.behaviors.push(ScheduledBehavior {
                activity,
                priority: priority + offset,
                behavior,
            });
        }
        self
    }

    /// Activity that requires `key` to enter and erases it when deactivated.
    pub fn add_activity_and_remove_memory_when_stopped(
        mut self,
        activity: Activity,
        priority: u32,
        behaviors: Vec<Behavior<M>>,
        key: MemoryKey,
    ) -> Self {
        self.activities
            .entry(activity)
            .or_default()
            .erase_on_stop
            .push(key);
        self.add_activity_with_conditions(activity, priority, behaviors, &[MemoryRequirement::present(key)])
    }

    pub fn core_activities(mut self, activities: &[Activity]) -> Self {
        self.core_activities = activities.iter().copied().collect();
        self
    }

    pub fn default_activity(mut self, activity: Activity) -> Self {
        self.default_activity = Some(activity);
        self
    }

    fn validate(&self) -> Result<Activity, BrainError> {
        for scheduled in &self.behaviors {
            if let Some(key) = scheduled
                .behavior
                .memory_keys()
                .into_iter()
                .find(|key| !self.memory.is_registered(*key))
            {
                return Err(BrainError::UnregisteredMemory {
                    behavior: scheduled.behavior.name(),
                    key,
                });
            }
        }
        for settings in self.activities.values() {
            let keys = settings
                .requirements
                .iter()
                .map(|r| r.key)
                .chain(settings.erase_on_stop.iter().copied());
            for key in keys {
                if !self.memory.is_registered(key) {
                    return Err(BrainError::UnregisteredMemory {
                        behavior: "activity requirements",
                        key,
                    });
                }
            }
        }

        for scheduled in &self.behaviors {
            for key in scheduled.behavior.required_present_keys() {
                self.check_sensor_coverage(scheduled.behavior.name(), key)?;
            }
        }
        for settings in self.activities.values() {
            for requirement in &settings.requirements {
                if requirement.status == MemoryStatus::Present {
                    self.check_sensor_coverage("activity requirements", requirement.key)?;
                }
            }
        }

        if self.core_activities.is_empty() {
            return Err(BrainError::NoCoreActivity);
        }
        if let Some(core) = self
            .core_activities
            .iter()
            .find(|core| !self.activities.contains_key(*core))
        {
            return Err(BrainError::UnknownActivity(*core));
        }
        let default = self.default_activity.ok_or(BrainError::MissingDefaultActivity)?;
        if !self.activities.contains_key(&default) {
            return Err(BrainError::UnknownActivity(default));
        }
        Ok(default)
    }

    /// Sensor-written keys only ever get a value from a sensor of this brain.
    fn check_sensor_coverage(&self, behavior: &'static str, key: MemoryKey) -> Result<(), BrainError> {
        let covered = SensorKind::writer_of(key).is_none()
            || self.sensors.iter().any(|sensor| sensor.requires().contains(&key));
        if covered {
            Ok(())
        } else {
            Err(BrainError::UncoveredSensorMemory { behavior, key })
        }
    }

    pub fn build(self) -> Result<Brain<M>, BrainError> {
        let default_activity = self.validate()?;

        let mut behaviors = self.behaviors;
        // Stable: equal priorities keep registration order
        behaviors.sort_by_key(|scheduled| scheduled.priority);

        let mut active_activities: SmallVec<[Activity; 3]> = self.core_activities.iter().copied().collect();
        if !active_activities.contains(&default_activity) {
            active_activities.push(default_activity);
        }

        log::info!(
            "Built brain with {} behaviors, {} sensors, {} memories",
            behaviors.len(),
            self.sensors.len(),
            self.memory.registered_keys().count()
        );

        Ok(Brain {
            memory: self.memory,
            sensors: self.sensors,
            behaviors,
            activities: self.activities,
            core_activities: self.core_activities,
            default_activity,
            active_activities,
            rng: self.rng,
        })
    }
}

pub struct Brain<M> {
    memory: MemoryStore,
    sensors: Vec<Sensor>,
    /// Sorted by ascending priority
    behaviors: Vec<ScheduledBehavior<M>>,
    activities: HashMap<Activity, ActivitySettings>,
    core_activities: SmallVec<[Activity; 2]>,
    default_activity: Activity,
    active_activities: SmallVec<[Activity; 3]>,
    rng: BrainRng,
}

impl<M: Mob> Brain<M> {
    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MemoryStore {
        &mut self.memory
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn default_activity(&self) -> Activity {
        self.default_activity
    }

    pub fn active_activities(&self) -> &[Activity] {
        &self.active_activities
    }

    pub fn is_active(&self, activity: Activity) -> bool {
        self.active_activities.contains(&activity)
    }

    pub fn active_non_core_activity(&self) -> Option<Activity> {
        self.active_activities
            .iter()
            .copied()
            .find(|activity| !self.core_activities.contains(activity))
    }

    /// Running behaviors in execution order
    pub fn running_behaviors(&self) -> impl Iterator<Item = &Behavior<M>> {
        self.behaviors
            .iter()
            .map(|scheduled| &scheduled.behavior)
            .filter(|behavior| behavior.is_running())
    }

    pub fn running_behavior_names(&self) -> Vec<&'static str> {
        self.running_behaviors().map(Behavior::name).collect()
    }

    pub fn tick(&mut self, world: &dyn WorldQuery, mob: &mut M) {
        self.memory.forget_outdated();
        for sensor in &mut self.sensors {
            sensor.tick(world, &*mob, &mut self.memory);
        }
        self.start_eligible_behaviors(world, mob);
        self.tick_or_stop_running_behaviors(world, mob);
    }

    fn start_eligible_behaviors(&mut self, world: &dyn WorldQuery, mob: &mut M) {
        let mut ctx = BehaviorContext {
            game_time: world.game_time(),
            world,
            mob,
            memory: &mut self.memory,
            rng: &mut self.rng,
        };
        for scheduled in &mut self.behaviors {
            if scheduled.behavior.status() == BehaviorStatus::Stopped
                && self.active_activities.contains(&scheduled.activity)
            {
                scheduled.behavior.try_start(&mut ctx);
            }
        }
    }

    fn tick_or_stop_running_behaviors(&mut self, world: &dyn WorldQuery, mob: &mut M) {
        let mut ctx = BehaviorContext {
            game_time: world.game_time(),
            world,
            mob,
            memory: &mut self.memory,
            rng: &mut self.rng,
        };
        for scheduled in &mut self.behaviors {
            scheduled.behavior.tick_or_stop(&mut ctx);
        }
    }

    /// Stop every running behavior, whatever its activity.
    pub fn stop_all(&mut self, world: &dyn WorldQuery, mob: &mut M) {
        let mut ctx = BehaviorContext {
            game_time: world.game_time(),
            world,
            mob,
            memory: &mut self.memory,
            rng: &mut self.rng,
        };
        for scheduled in &mut self.behaviors {
            if scheduled.behavior.is_running() {
                scheduled.behavior.do_stop(&mut ctx);
            }
        }
    }

    fn can_enter(&self, activity: Activity) -> bool {
        self.activities.get(&activity).is_some_and(|settings| {
            settings
                .requirements
                .iter()
                .all(|requirement| self.memory.meets(requirement))
        })
    }

    /// Make `activity` the active non-core activity.
    ///
    /// Running behaviors of the deactivated activity are stopped and its
    /// bound memories erased before anything of `activity` can start.
    pub fn set_active_activity(&mut self, activity: Activity, world: &dyn WorldQuery, mob: &mut M) {
        if self.is_active(activity) {
            return;
        }
        if !self.activities.contains_key(&activity) {
            log::warn!("Ignoring switch to unregistered activity {}", activity);
            return;
        }

        let deactivated: SmallVec<[Activity; 2]> = self
            .active_activities
            .iter()
            .copied()
            .filter(|active| !self.core_activities.contains(active))
            .collect();

        let mut ctx = BehaviorContext {
            game_time: world.game_time(),
            world,
            mob: &mut *mob,
            memory: &mut self.memory,
            rng: &mut self.rng,
        };
        for scheduled in &mut self.behaviors {
            if scheduled.behavior.is_running() && deactivated.contains(&scheduled.activity) {
                scheduled.behavior.do_stop(&mut ctx);
            }
        }
        for old in &deactivated {
            if let Some(settings) = self.activities.get(old) {
                for key in &settings.erase_on_stop {
                    self.memory.erase(*key);
                }
            }
        }

        self.active_activities
            .retain(|active| self.core_activities.contains(active));
        self.active_activities.push(activity);
        log::debug!(
            "{} switched activity {:?} -> {}",
            mob.id(),
            deactivated.first(),
            activity
        );
    }

    /// Switch to `activity` if its entry requirements hold. Returns whether it is active now.
    pub fn set_active_activity_if_possible(
        &mut self,
        activity: Activity,
        world: &dyn WorldQuery,
        mob: &mut M,
    ) -> bool {
        if self.can_enter(activity) {
            self.set_active_activity(activity, world, mob);
        }
        self.is_active(activity)
    }

    /// Activate the first candidate whose entry requirements hold.
    pub fn set_active_activity_to_first_valid(
        &mut self,
        candidates: &[Activity],
        world: &dyn WorldQuery,
        mob: &mut M,
    ) {
        if let Some(activity) = candidates.iter().copied().find(|a| self.can_enter(*a)) {
            self.set_active_activity(activity, world, mob);
        }
    }

    pub fn use_default_activity(&mut self, world: &dyn WorldQuery, mob: &mut M) {
        self.set_active_activity(self.default_activity, world, mob);
    }
}
