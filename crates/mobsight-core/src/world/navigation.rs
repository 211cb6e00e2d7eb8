//! Straight-line path planning over the terrain floor

use std::sync::Arc;

use glam::{DVec3, IVec3};
use mobsight_brain::{Navigation, Path};

use super::terrain::Terrain;

/// Upper bound on nodes in one planned path
pub const MAX_PATH_NODES: usize = 128;

/// Ticks without progress before a follower counts as stuck
pub const STUCK_AFTER_TICKS: u32 = 20;

/// Walks the straight segment towards the target, cutting the path short at
/// the first block that cannot be stood on.
#[derive(Debug, Clone)]
pub struct StraightLineNavigation {
    terrain: Arc<Terrain>,
    path: Option<Path>,
    next_node: usize,
    speed: f64,
    stuck_ticks: u32,
}

fn horizontal_manhattan(a: IVec3, b: IVec3) -> u32 {
    a.x.abs_diff(b.x) + a.z.abs_diff(b.z)
}

fn node_center(node: IVec3) -> DVec3 {
    DVec3::new(f64::from(node.x) + 0.5, f64::from(node.y), f64::from(node.z) + 0.5)
}

impl StraightLineNavigation {
    pub fn new(terrain: Arc<Terrain>) -> Self {
        Self {
            terrain,
            path: None,
            next_node: 0,
            speed: 0.0,
            stuck_ticks: 0,
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Move `position` along the followed path by one tick's worth of speed.
    pub fn advance(&mut self, position: DVec3) -> DVec3 {
        let Some(path) = self.path.as_ref() else {
            return position;
        };

        let mut position = position;
        let mut budget = self.speed;
        while budget > 0.0 {
            let Some(node) = path.nodes.get(self.next_node).copied() else {
                break;
            };
            if !self.terrain.is_walkable(node) {
                break;
            }
            let goal = node_center(node);
            let to_goal = goal - position;
            let distance = to_goal.length();
            if distance <= budget {
                position = goal;
                budget -= distance;
                self.next_node += 1;
            } else {
                position += to_goal / distance * budget;
                budget = 0.0;
            }
        }

        if budget < self.speed {
            self.stuck_ticks = 0;
        } else {
            self.stuck_ticks += 1;
        }
        if self.next_node >= path.nodes.len() {
            self.path = None;
        }
        position
    }
}

impl Navigation for StraightLineNavigation {
    fn create_path(&self, from: DVec3, target: DVec3, reach: u32) -> Option<Path> {
        let floor = self.terrain.floor_y();
        let start = IVec3::new(from.x.floor() as i32, floor, from.z.floor() as i32);
        let goal = IVec3::new(target.x.floor() as i32, floor, target.z.floor() as i32);
        if !self.terrain.is_walkable(start) {
            return None;
        }

        let mut nodes = vec![start];
        let from_center = node_center(start);
        let to_center = node_center(goal);
        let steps = (from_center.distance(to_center) * 2.0).ceil() as usize;
        for step in 1..=steps {
            if nodes.len() >= MAX_PATH_NODES {
                break;
            }
            if nodes.last().is_some_and(|last| horizontal_manhattan(*last, goal) <= reach) {
                break;
            }
            let point = from_center.lerp(to_center, step as f64 / steps as f64);
            let block = IVec3::new(point.x.floor() as i32, floor, point.z.floor() as i32);
            if nodes.last() == Some(&block) {
                continue;
            }
            if !self.terrain.is_walkable(block) {
                break;
            }
            nodes.push(block);
        }

        let reaches_target = nodes
            .last()
            .is_some_and(|last| horizontal_manhattan(*last, goal) <= reach);
        Some(Path {
            nodes,
            target: goal,
            reaches_target,
        })
    }

    fn follow(&mut self, path: Path, speed: f64) -> bool {
        if path.nodes.is_empty() {
            return false;
        }
        self.path = Some(path);
        self.next_node = 0;
        self.speed = speed.max(0.0);
        self.stuck_ticks = 0;
        true
    }

    fn stop(&mut self) {
        self.path = None;
        self.next_node = 0;
        self.stuck_ticks = 0;
    }

    fn is_done(&self) -> bool {
        self.path.is_none()
    }

    fn is_stuck(&self) -> bool {
        self.stuck_ticks >= STUCK_AFTER_TICKS
    }

    fn current_path(&self) -> Option<&Path> {
        self.path.as_ref()
    }
}
