use serde::{Deserialize, Serialize};

/// Hit points of a damageable entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Health { current: max, max }
    }

    /// Returns true if this hit was fatal
    pub fn take_damage(&mut self, amount: f32) -> bool {
        let was_dead = self.is_dead();
        self.current = (self.current - amount.max(0.0)).max(0.0);
        !was_dead && self.is_dead()
    }

    pub fn heal(&mut self, amount: f32) {
        if !self.is_dead() {
            self.current = (self.current + amount.max(0.0)).min(self.max);
        }
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }

    /// Health as a fraction (0.0 - 1.0)
    pub fn percentage(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            (self.current / self.max).clamp(0.0, 1.0)
        }
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(20.0)
    }
}
