//! Non-AI entities

mod creature;
pub mod health;
mod player;

pub use creature::Creature;
pub use health::Health;
pub use player::Player;
