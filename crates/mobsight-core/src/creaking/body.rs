use glam::DVec3;
use mobsight_brain::{Attributes, EntityId, EntityKind, EntitySnapshot, Mob, MobAction, Navigation};

use crate::world::{StraightLineNavigation, Terrain};

/// Ticks the arm swing stays visible after a hit
const ATTACK_ANIMATION_TICKS: u32 = 15;

/// The Creaking's physical state, driven by its brain.
pub struct CreakingBody {
    id: EntityId,
    position: DVec3,
    look_direction: DVec3,
    attributes: Attributes,
    navigation: StraightLineNavigation,
    in_water: bool,
    can_move: bool,
    active: bool,
    jumps: u32,
    attack_animation: u32,
    actions: Vec<MobAction>,
}

impl CreakingBody {
    pub const EYE_HEIGHT: f64 = 2.3;
    pub const HALF_WIDTH: f64 = 0.45;
    pub const HEIGHT: f64 = 2.7;

    pub fn new(id: EntityId, position: DVec3, attributes: Attributes, navigation: StraightLineNavigation) -> Self {
        Self {
            id,
            position,
            look_direction: DVec3::NEG_Z,
            attributes,
            navigation,
            in_water: false,
            can_move: true,
            active: false,
            jumps: 0,
            attack_animation: 0,
            actions: Vec::new(),
        }
    }

    pub fn can_move(&self) -> bool {
        self.can_move
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn look_direction(&self) -> DVec3 {
        self.look_direction
    }

    pub fn eye_position(&self) -> DVec3 {
        self.position + DVec3::new(0.0, Self::EYE_HEIGHT, 0.0)
    }

    pub fn jumps(&self) -> u32 {
        self.jumps
    }

    pub fn is_swinging(&self) -> bool {
        self.attack_animation > 0
    }

    /// Freeze or release the body. Freezing drops the current path.
    pub(crate) fn set_can_move(&mut self, can_move: bool) {
        if self.can_move && !can_move {
            self.navigation.stop();
        }
        self.can_move = can_move;
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub(crate) fn set_in_water(&mut self, in_water: bool) {
        self.in_water = in_water;
    }

    pub(crate) fn take_actions(&mut self) -> Vec<MobAction> {
        std::mem::take(&mut self.actions)
    }

    /// Follow the current path for one tick unless frozen.
    pub(crate) fn travel(&mut self, terrain: &Terrain) {
        self.attack_animation = self.attack_animation.saturating_sub(1);
        if !self.can_move {
            return;
        }
        let next = self.navigation.advance(self.position);
        self.position = terrain.snap_to_floor(next);
    }
}

impl Mob for CreakingBody {
    type Nav = StraightLineNavigation;

    fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            kind: EntityKind::Creaking,
            position: self.position,
            look_direction: self.look_direction,
            eye_height: Self::EYE_HEIGHT,
            half_width: Self::HALF_WIDTH,
            height: Self::HEIGHT,
            alive: true,
            attackable: false,
            no_culling: false,
        }
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> DVec3 {
        self.position
    }

    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn navigation(&self) -> &StraightLineNavigation {
        &self.navigation
    }

    fn navigation_mut(&mut self) -> &mut StraightLineNavigation {
        &mut self.navigation
    }

    fn is_in_water(&self) -> bool {
        self.in_water
    }

    fn jump(&mut self) {
        self.jumps += 1;
    }

    fn look_at(&mut self, target: DVec3) {
        if !self.can_move {
            return;
        }
        let direction = (target - self.eye_position()).normalize_or_zero();
        if direction != DVec3::ZERO {
            self.look_direction = direction;
        }
    }

    fn swing(&mut self) {
        self.attack_animation = ATTACK_ANIMATION_TICKS;
    }

    fn push_action(&mut self, action: MobAction) {
        self.actions.push(action);
    }
}
