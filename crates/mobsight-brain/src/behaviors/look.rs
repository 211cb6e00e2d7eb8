//! Head-turning behaviors

use rand::Rng;

use crate::behavior::{BehaviorContext, BehaviorControl, Started};
use crate::memory::{MemoryKey, MemoryRequirement, MemoryValue, PositionTracker};
use crate::traits::Mob;
use crate::types::EntityId;
use crate::BrainRng;

static LOOK_AT_TARGET_REQUIREMENTS: [MemoryRequirement; 1] =
    [MemoryRequirement::present(MemoryKey::LookTarget)];

/// Keep the head on `LookTarget` while it stays visible.
#[derive(Debug, Clone)]
pub struct LookAtTargetSink {
    min_duration: u64,
    max_duration: u64,
}

impl LookAtTargetSink {
    pub fn new(min_duration: u64, max_duration: u64) -> Self {
        Self {
            min_duration,
            max_duration,
        }
    }
}

impl<M: Mob> BehaviorControl<M> for LookAtTargetSink {
    fn name(&self) -> &'static str {
        "LookAtTargetSink"
    }

    fn requirements(&self) -> &'static [MemoryRequirement] {
        &LOOK_AT_TARGET_REQUIREMENTS
    }

    fn duration(&self) -> Option<(u64, u64)> {
        Some((self.min_duration, self.max_duration))
    }

    fn start(&mut self, _ctx: &mut BehaviorContext<'_, M>) -> Started {
        Started::Running
    }

    fn can_still_use(&self, ctx: &BehaviorContext<'_, M>) -> bool {
        ctx.memory
            .look_target()
            .is_some_and(|tracker| tracker.is_visible(ctx.world, ctx.memory))
    }

    fn tick(&mut self, ctx: &mut BehaviorContext<'_, M>) {
        let target = ctx
            .memory
            .look_target()
            .and_then(|tracker| tracker.look_position(ctx.world));
        if let Some(target) = target {
            ctx.mob.look_at(target);
        }
    }

    fn stop(&mut self, ctx: &mut BehaviorContext<'_, M>) {
        ctx.memory.erase(MemoryKey::LookTarget);
    }
}

/// Fires on its first check, then waits a random interval between firings.
#[derive(Debug, Clone)]
pub struct Ticker {
    min_interval: u64,
    max_interval: u64,
    ticks_until_next: u64,
}

impl Ticker {
    pub fn new(min_interval: u64, max_interval: u64) -> Self {
        Self {
            min_interval: min_interval.min(max_interval),
            max_interval: max_interval.max(min_interval),
            ticks_until_next: 0,
        }
    }

    pub fn tick_down_and_check(&mut self, rng: &mut BrainRng) -> bool {
        if self.ticks_until_next == 0 {
            self.ticks_until_next = rng.gen_range(self.min_interval..=self.max_interval);
            true
        } else {
            self.ticks_until_next -= 1;
            false
        }
    }
}

static LOOK_SOMETIMES_REQUIREMENTS: [MemoryRequirement; 2] = [
    MemoryRequirement::absent(MemoryKey::LookTarget),
    MemoryRequirement::present(MemoryKey::NearestVisibleLivingEntities),
];

/// Now and then, look at the closest visible entity within range.
#[derive(Debug, Clone)]
pub struct SetEntityLookTargetSometimes {
    max_distance_sq: f64,
    ticker: Ticker,
    candidate: Option<EntityId>,
}

impl SetEntityLookTargetSometimes {
    pub fn new(max_distance: f64, min_interval: u64, max_interval: u64) -> Self {
        Self {
            max_distance_sq: max_distance * max_distance,
            ticker: Ticker::new(min_interval, max_interval),
            candidate: None,
        }
    }
}

impl<M: Mob> BehaviorControl<M> for SetEntityLookTargetSometimes {
    fn name(&self) -> &'static str {
        "SetEntityLookTargetSometimes"
    }

    fn requirements(&self) -> &'static [MemoryRequirement] {
        &LOOK_SOMETIMES_REQUIREMENTS
    }

    fn check_extra_start_conditions(&mut self, ctx: &mut BehaviorContext<'_, M>) -> bool {
        if !self.ticker.tick_down_and_check(ctx.rng) {
            return false;
        }
        let max_distance_sq = self.max_distance_sq;
        self.candidate = ctx
            .memory
            .nearest_visible()
            .and_then(|nearest| nearest.find_closest(|e| e.distance_sq <= max_distance_sq))
            .map(|e| e.snapshot.id);
        self.candidate.is_some()
    }

    fn start(&mut self, ctx: &mut BehaviorContext<'_, M>) -> Started {
        if let Some(id) = self.candidate.take() {
            ctx.memory
                .set(MemoryKey::LookTarget, MemoryValue::Look(PositionTracker::entity(id)));
        }
        Started::Finished
    }
}
