//! Idle filler and weighted choice between child behaviors

use rand::Rng;

use crate::behavior::{Behavior, BehaviorContext, BehaviorControl, Started};
use crate::memory::MemoryKey;
use crate::traits::Mob;
use crate::BrainRng;

/// Stand still for a random number of ticks.
#[derive(Debug, Clone)]
pub struct DoNothing {
    min_duration: u64,
    max_duration: u64,
}

impl DoNothing {
    pub fn new(min_duration: u64, max_duration: u64) -> Self {
        Self {
            min_duration: min_duration.min(max_duration),
            max_duration: max_duration.max(min_duration),
        }
    }
}

impl<M: Mob> BehaviorControl<M> for DoNothing {
    fn name(&self) -> &'static str {
        "DoNothing"
    }

    fn duration(&self) -> Option<(u64, u64)> {
        Some((self.min_duration, self.max_duration))
    }

    fn start(&mut self, _ctx: &mut BehaviorContext<'_, M>) -> Started {
        Started::Running
    }

    fn can_still_use(&self, _ctx: &BehaviorContext<'_, M>) -> bool {
        true
    }
}

/// Visit order for a weighted shuffle.
///
/// Each index draws `u^(1/w)` for uniform `u`; sorting by that key
/// descending makes the chance of `i` coming first `w_i / sum(w)`.
/// Zero weights always sort last.
pub fn weighted_order(weights: &[u32], rng: &mut BrainRng) -> Vec<usize> {
    let mut keyed: Vec<(f64, usize)> = weights
        .iter()
        .enumerate()
        .map(|(index, &weight)| {
            let key = if weight == 0 {
                -1.0
            } else {
                rng.gen::<f64>().powf(1.0 / f64::from(weight))
            };
            (key, index)
        })
        .collect();
    keyed.sort_by(|a, b| b.0.total_cmp(&a.0));
    keyed.into_iter().map(|(_, index)| index).collect()
}

/// Run the first child, in weighted random order, whose preconditions hold.
pub struct RunOne<M> {
    children: Vec<(Behavior<M>, u32)>,
}

impl<M: Mob> RunOne<M> {
    pub fn new(children: Vec<(Behavior<M>, u32)>) -> Self {
        Self { children }
    }

    pub fn children(&self) -> impl Iterator<Item = &Behavior<M>> {
        self.children.iter().map(|(child, _)| child)
    }
}

impl<M: Mob> BehaviorControl<M> for RunOne<M> {
    fn name(&self) -> &'static str {
        "RunOne"
    }

    fn start(&mut self, ctx: &mut BehaviorContext<'_, M>) -> Started {
        let weights: Vec<u32> = self.children.iter().map(|(_, weight)| *weight).collect();
        for index in weighted_order(&weights, ctx.rng) {
            if self.children[index].0.try_start(ctx) {
                break;
            }
        }
        if self.children.iter().any(|(child, _)| child.is_running()) {
            Started::Running
        } else {
            Started::Finished
        }
    }

    fn can_still_use(&self, _ctx: &BehaviorContext<'_, M>) -> bool {
        self.children.iter().any(|(child, _)| child.is_running())
    }

    fn tick(&mut self, ctx: &mut BehaviorContext<'_, M>) {
        for (child, _) in self.children.iter_mut().filter(|(child, _)| child.is_running()) {
            child.tick_or_stop(ctx);
        }
    }

    fn stop(&mut self, ctx: &mut BehaviorContext<'_, M>) {
        for (child, _) in self.children.iter_mut().filter(|(child, _)| child.is_running()) {
            child.do_stop(ctx);
        }
    }

    fn collect_memory_keys(&self, keys: &mut Vec<MemoryKey>) {
        for (child, _) in &self.children {
            keys.extend(child.memory_keys());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::BehaviorStatus;
    use crate::behaviors::{RandomStroll, SetWalkTargetFromLookTarget};
    use crate::memory::{MemoryValue, PositionTracker};
    use crate::testing::{Harness, TestMob};
    use glam::IVec3;

    #[test]
    fn test_weighted_order_is_a_permutation() {
        let mut rng = crate::brain_rng(5);
        let mut order = weighted_order(&[3, 1, 0, 7], &mut rng);
        assert_eq!(order.last(), Some(&2));
        order.sort_unstable();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_weighted_order_first_choice_frequency() {
        let mut rng = crate::brain_rng(42);
        let weights = [1, 1, 2];
        let trials = 20_000;
        let mut firsts = [0u32; 3];
        for _ in 0..trials {
            firsts[weighted_order(&weights, &mut rng)[0]] += 1;
        }
        let share = |i: usize| f64::from(firsts[i]) / f64::from(trials);
        assert!((share(0) - 0.25).abs() < 0.02, "share 0 = {}", share(0));
        assert!((share(1) - 0.25).abs() < 0.02, "share 1 = {}", share(1));
        assert!((share(2) - 0.50).abs() < 0.02, "share 2 = {}", share(2));
    }

    fn idle_gate() -> Behavior<TestMob> {
        Behavior::new(RunOne::new(vec![
            (Behavior::new(DoNothing::new(3, 3)), 1),
            (Behavior::new(SetWalkTargetFromLookTarget::new(1.0, 3)), 1),
        ]))
    }

    #[test]
    fn test_run_one_skips_children_without_memories() {
        let mut h = Harness::new(&[MemoryKey::WalkTarget, MemoryKey::LookTarget]);
        let mut gate = idle_gate();

        // No look target: only DoNothing can start
        for _ in 0..20 {
            if gate.status() == BehaviorStatus::Stopped {
                h.step(&mut gate);
                assert!(gate.is_running());
            } else {
                h.step(&mut gate);
            }
            assert!(!h.memory.has_value(MemoryKey::WalkTarget));
        }
    }

    #[test]
    fn test_run_one_finishes_with_one_shot_child() {
        let mut h = Harness::new(&[MemoryKey::WalkTarget, MemoryKey::LookTarget]);
        h.memory.set(
            MemoryKey::LookTarget,
            MemoryValue::Look(PositionTracker::Block(IVec3::new(5, 0, 5))),
        );
        let mut gate: Behavior<TestMob> = Behavior::new(RunOne::new(vec![(
            Behavior::new(SetWalkTargetFromLookTarget::new(1.0, 3)),
            1,
        )]));

        h.step(&mut gate);
        assert_eq!(gate.status(), BehaviorStatus::Stopped);
        assert!(h.memory.has_value(MemoryKey::WalkTarget));
    }

    #[test]
    fn test_run_one_stops_with_last_child() {
        let mut h = Harness::new(&[MemoryKey::WalkTarget]);
        let mut gate: Behavior<TestMob> =
            Behavior::new(RunOne::new(vec![(Behavior::new(DoNothing::new(2, 2)), 1)]));

        h.step(&mut gate);
        h.step(&mut gate);
        h.step(&mut gate);
        assert!(gate.is_running());
        // Child times out at tick 3 and the gate follows in the same tick
        h.step(&mut gate);
        assert_eq!(gate.status(), BehaviorStatus::Stopped);
    }

    #[test]
    fn test_run_one_collects_child_keys() {
        let gate: Behavior<TestMob> = Behavior::new(RunOne::new(vec![
            (Behavior::new(RandomStroll::new(1.0)), 2),
            (Behavior::new(SetWalkTargetFromLookTarget::new(1.0, 3)), 2),
        ]));
        let keys = gate.memory_keys();
        assert!(keys.contains(&MemoryKey::WalkTarget));
        assert!(keys.contains(&MemoryKey::LookTarget));
    }
}
