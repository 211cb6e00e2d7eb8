//! Frustum culling for mobsight
//!
//! This crate provides:
//! - `Frustum`: plane extraction, box/sphere/point classification, camera offset walk
//! - `Aabb` and `BlockBox` world-space boxes
//! - `SectionGrid`: 16³ render-section culling around a camera

mod aabb;
mod frustum;
mod section;

pub use aabb::{Aabb, BlockBox};
pub use frustum::{Containment, Frustum, FrustumError, MAX_OFFSET_STEPS, OFFSET_STEP, Plane};
pub use section::{CullingConfig, SECTION_SIZE, SectionGrid};
