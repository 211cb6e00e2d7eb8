//! Walking and swimming behaviors

use glam::IVec3;
use rand::Rng;

use crate::behavior::{BehaviorContext, BehaviorControl, Started};
use crate::memory::{MemoryKey, MemoryRequirement, MemoryValue, PositionTracker, WalkTarget};
use crate::traits::{Mob, Navigation, Path, WorldQuery};

/// Jump while in water to stay afloat.
#[derive(Debug, Clone)]
pub struct Swim {
    chance: f32,
}

impl Swim {
    pub fn new(chance: f32) -> Self {
        Self { chance }
    }
}

impl<M: Mob> BehaviorControl<M> for Swim {
    fn name(&self) -> &'static str {
        "Swim"
    }

    fn duration(&self) -> Option<(u64, u64)> {
        Some((60, 60))
    }

    fn check_extra_start_conditions(&mut self, ctx: &mut BehaviorContext<'_, M>) -> bool {
        ctx.mob.is_in_water()
    }

    fn start(&mut self, _ctx: &mut BehaviorContext<'_, M>) -> Started {
        Started::Running
    }

    fn can_still_use(&self, ctx: &BehaviorContext<'_, M>) -> bool {
        ctx.mob.is_in_water()
    }

    fn tick(&mut self, ctx: &mut BehaviorContext<'_, M>) {
        if ctx.rng.gen::<f32>() < self.chance {
            ctx.mob.jump();
        }
    }
}

/// Upper bound (exclusive) of the random retry delay after getting stuck.
pub const MAX_COOLDOWN_BEFORE_RETRYING: u32 = 40;

static MOVE_TO_TARGET_REQUIREMENTS: [MemoryRequirement; 3] = [
    MemoryRequirement::registered(MemoryKey::CantReachWalkTargetSince),
    MemoryRequirement::absent(MemoryKey::Path),
    MemoryRequirement::present(MemoryKey::WalkTarget),
];

/// Turns `WalkTarget` into a followed path.
#[derive(Debug, Clone)]
pub struct MoveToTargetSink {
    min_duration: u64,
    max_duration: u64,
    remaining_cooldown: u32,
    path: Option<Path>,
    last_target: Option<IVec3>,
    speed_modifier: f64,
}

impl Default for MoveToTargetSink {
    fn default() -> Self {
        Self::new(150, 250)
    }
}

impl MoveToTargetSink {
    pub fn new(min_duration: u64, max_duration: u64) -> Self {
        Self {
            min_duration,
            max_duration,
            remaining_cooldown: 0,
            path: None,
            last_target: None,
            speed_modifier: 1.0,
        }
    }

    fn try_compute_path<M: Mob>(&mut self, ctx: &mut BehaviorContext<'_, M>, walk: &WalkTarget) -> bool {
        let Some(target) = walk.target.position(ctx.world) else {
            return false;
        };
        let from = ctx.mob.position();
        self.path = ctx.mob.navigation().create_path(from, target, walk.close_enough);
        self.speed_modifier = walk.speed_modifier;

        if self.path.as_ref().is_some_and(Path::can_reach) {
            ctx.memory.erase(MemoryKey::CantReachWalkTargetSince);
        } else if !ctx.memory.has_value(MemoryKey::CantReachWalkTargetSince) {
            ctx.memory.set(
                MemoryKey::CantReachWalkTargetSince,
                MemoryValue::Tick(ctx.game_time),
            );
        }
        self.path.is_some()
    }

    fn follow_path<M: Mob>(&mut self, ctx: &mut BehaviorContext<'_, M>) {
        let Some(path) = self.path.clone() else {
            return;
        };
        ctx.memory.set(MemoryKey::Path, MemoryValue::Path(path.clone()));
        let speed = self.speed_modifier * ctx.mob.attributes().movement_speed;
        ctx.mob.navigation_mut().follow(path, speed);
    }
}

/// Manhattan distance to the target block is within `close_enough`.
/// A target that no longer resolves counts as reached.
fn reached_target<M: Mob>(mob: &M, world: &dyn WorldQuery, walk: &WalkTarget) -> bool {
    walk.target.block_position(world).map_or(true, |target| {
        let delta = (target - mob.block_position()).abs();
        delta.x + delta.y + delta.z <= walk.close_enough as i32
    })
}

impl<M: Mob> BehaviorControl<M> for MoveToTargetSink {
    fn name(&self) -> &'static str {
        "MoveToTargetSink"
    }

    fn requirements(&self) -> &'static [MemoryRequirement] {
        &MOVE_TO_TARGET_REQUIREMENTS
    }

    fn duration(&self) -> Option<(u64, u64)> {
        Some((self.min_duration, self.max_duration))
    }

    fn check_extra_start_conditions(&mut self, ctx: &mut BehaviorContext<'_, M>) -> bool {
        if self.remaining_cooldown > 0 {
            self.remaining_cooldown -= 1;
            return false;
        }
        let Some(walk) = ctx.memory.walk_target() else {
            return false;
        };

        let reached = reached_target(&*ctx.mob, ctx.world, &walk);
        if !reached && self.try_compute_path(ctx, &walk) {
            self.last_target = walk.target.block_position(ctx.world);
            return true;
        }

        ctx.memory.erase(MemoryKey::WalkTarget);
        if reached {
            ctx.memory.erase(MemoryKey::CantReachWalkTargetSince);
        }
        false
    }

    fn start(&mut self, ctx: &mut BehaviorContext<'_, M>) -> Started {
        self.follow_path(ctx);
        Started::Running
    }

    fn can_still_use(&self, ctx: &BehaviorContext<'_, M>) -> bool {
        if self.path.is_none() || self.last_target.is_none() {
            return false;
        }
        let Some(walk) = ctx.memory.walk_target() else {
            return false;
        };
        !ctx.mob.navigation().is_done() && !reached_target(&*ctx.mob, ctx.world, &walk)
    }

    fn tick(&mut self, ctx: &mut BehaviorContext<'_, M>) {
        let current = ctx.mob.navigation().current_path().cloned();
        if current != self.path {
            self.path = current.clone();
            ctx.memory.set_or_erase(MemoryKey::Path, current.map(MemoryValue::Path));
        }

        if self.path.is_none() {
            return;
        }
        let (Some(last), Some(walk)) = (self.last_target, ctx.memory.walk_target()) else {
            return;
        };
        let Some(now) = walk.target.block_position(ctx.world) else {
            return;
        };
        // Re-path once a moving target drifted more than two blocks
        if (now - last).length_squared() > 4 && self.try_compute_path(ctx, &walk) {
            self.last_target = Some(now);
            self.follow_path(ctx);
        }
    }

    fn stop(&mut self, ctx: &mut BehaviorContext<'_, M>) {
        if let Some(walk) = ctx.memory.walk_target() {
            if !reached_target(&*ctx.mob, ctx.world, &walk) && ctx.mob.navigation().is_stuck() {
                self.remaining_cooldown = ctx.rng.gen_range(0..MAX_COOLDOWN_BEFORE_RETRYING);
            }
        }
        ctx.mob.navigation_mut().stop();
        ctx.memory.erase(MemoryKey::WalkTarget);
        ctx.memory.erase(MemoryKey::Path);
        self.path = None;
    }
}

static RANDOM_STROLL_REQUIREMENTS: [MemoryRequirement; 1] =
    [MemoryRequirement::absent(MemoryKey::WalkTarget)];

/// Attempts at finding a walkable random position per stroll.
const STROLL_ATTEMPTS: usize = 10;

/// Pick a random walkable block nearby as the new walk target.
#[derive(Debug, Clone)]
pub struct RandomStroll {
    speed_modifier: f64,
    max_horizontal: i32,
    max_vertical: i32,
}

impl RandomStroll {
    pub fn new(speed_modifier: f64) -> Self {
        Self::with_range(speed_modifier, 10, 7)
    }

    pub fn with_range(speed_modifier: f64, max_horizontal: i32, max_vertical: i32) -> Self {
        Self {
            speed_modifier,
            max_horizontal: max_horizontal.max(0),
            max_vertical: max_vertical.max(0),
        }
    }

    fn random_position<M: Mob>(&self, ctx: &mut BehaviorContext<'_, M>) -> Option<IVec3> {
        let origin = ctx.mob.block_position();
        let (h, v) = (self.max_horizontal, self.max_vertical);
        for _ in 0..STROLL_ATTEMPTS {
            let x = origin.x + ctx.rng.gen_range(-h..=h);
            let z = origin.z + ctx.rng.gen_range(-h..=h);
            // Highest standable block in the column within vertical range
            let found = (origin.y - v..=origin.y + v)
                .rev()
                .map(|y| IVec3::new(x, y, z))
                .find(|pos| ctx.world.is_walkable(*pos));
            if found.is_some() {
                return found;
            }
        }
        None
    }
}

impl<M: Mob> BehaviorControl<M> for RandomStroll {
    fn name(&self) -> &'static str {
        "RandomStroll"
    }

    fn requirements(&self) -> &'static [MemoryRequirement] {
        &RANDOM_STROLL_REQUIREMENTS
    }

    fn check_extra_start_conditions(&mut self, ctx: &mut BehaviorContext<'_, M>) -> bool {
        !ctx.mob.is_in_water()
    }

    fn start(&mut self, ctx: &mut BehaviorContext<'_, M>) -> Started {
        let target = self.random_position(ctx).map(|pos| {
            MemoryValue::Walk(WalkTarget {
                target: PositionTracker::Block(pos),
                speed_modifier: self.speed_modifier,
                close_enough: 0,
            })
        });
        ctx.memory.set_or_erase(MemoryKey::WalkTarget, target);
        Started::Finished
    }
}

static WALK_FROM_LOOK_REQUIREMENTS: [MemoryRequirement; 2] = [
    MemoryRequirement::absent(MemoryKey::WalkTarget),
    MemoryRequirement::present(MemoryKey::LookTarget),
];

/// Walk towards whatever the mob is looking at.
#[derive(Debug, Clone)]
pub struct SetWalkTargetFromLookTarget {
    speed_modifier: f64,
    close_enough: u32,
}

impl SetWalkTargetFromLookTarget {
    pub fn new(speed_modifier: f64, close_enough: u32) -> Self {
        Self {
            speed_modifier,
            close_enough,
        }
    }
}

impl<M: Mob> BehaviorControl<M> for SetWalkTargetFromLookTarget {
    fn name(&self) -> &'static str {
        "SetWalkTargetFromLookTarget"
    }

    fn requirements(&self) -> &'static [MemoryRequirement] {
        &WALK_FROM_LOOK_REQUIREMENTS
    }

    fn start(&mut self, ctx: &mut BehaviorContext<'_, M>) -> Started {
        if let Some(look) = ctx.memory.look_target() {
            ctx.memory.set(
                MemoryKey::WalkTarget,
                MemoryValue::Walk(WalkTarget {
                    target: look,
                    speed_modifier: self.speed_modifier,
                    close_enough: self.close_enough,
                }),
            );
        }
        Started::Finished
    }
}
