//! Axis-aligned boxes in world space
//!
//! Two flavours are used throughout mobsight:
//! - `Aabb`: double-precision box for entities and queries
//! - `BlockBox`: inclusive integer block range, e.g. a 16³ render section

use glam::{DVec3, IVec3};
use serde::{Deserialize, Serialize};

/// Double-precision axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    /// Reserved box meaning "unbounded extent"; frustum tests short-circuit on it.
    pub const INFINITE: Aabb = Aabb {
        min: DVec3::splat(f64::NEG_INFINITY),
        max: DVec3::splat(f64::INFINITY),
    };

    /// Create a box from two corners (components are sorted per axis).
    pub fn new(a: DVec3, b: DVec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Box of `half_width` around `feet` horizontally and `height` tall.
    pub fn from_feet(feet: DVec3, half_width: f64, height: f64) -> Self {
        Self {
            min: DVec3::new(feet.x - half_width, feet.y, feet.z - half_width),
            max: DVec3::new(feet.x + half_width, feet.y + height, feet.z + half_width),
        }
    }

    pub fn is_infinite(&self) -> bool {
        *self == Self::INFINITE
    }

    /// Grow the box by `amount` on every side.
    pub fn inflate(&self, amount: f64) -> Self {
        let grow = DVec3::splat(amount);
        Self {
            min: self.min - grow,
            max: self.max + grow,
        }
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn contains_point(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Overlap test, touching faces count as intersecting.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    /// Slab test for the segment `from -> to`.
    pub fn intersects_segment(&self, from: DVec3, to: DVec3) -> bool {
        let delta = to - from;
        let mut t_min = 0.0_f64;
        let mut t_max = 1.0_f64;

        for axis in 0..3 {
            let origin = from[axis];
            let dir = delta[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if dir.abs() < f64::EPSILON {
                if origin < lo || origin > hi {
                    return false;
                }
                continue;
            }

            let inv = 1.0 / dir;
            let mut t0 = (lo - origin) * inv;
            let mut t1 = (hi - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return false;
            }
        }

        true
    }
}

/// Inclusive integer block range: `max` is the last block inside the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockBox {
    pub min: IVec3,
    pub max: IVec3,
}

impl BlockBox {
    pub fn new(a: IVec3, b: IVec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// A single block.
    pub fn block(pos: IVec3) -> Self {
        Self { min: pos, max: pos }
    }

    pub fn contains(&self, pos: IVec3) -> bool {
        pos.cmpge(self.min).all() && pos.cmple(self.max).all()
    }

    /// Clamp a block position into this range.
    pub fn clamp(&self, pos: IVec3) -> IVec3 {
        pos.clamp(self.min, self.max)
    }

    /// World-space box covering every block in the range (max corner + 1).
    pub fn to_aabb(&self) -> Aabb {
        Aabb {
            min: self.min.as_dvec3(),
            max: (self.max + IVec3::ONE).as_dvec3(),
        }
    }
}
