//! Per-tick snapshot of the living entities around a mob

use crate::types::{EntityId, EntitySnapshot};

/// One sensed entity with its precomputed visibility.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensedEntity {
    pub snapshot: EntitySnapshot,
    pub distance_sq: f64,
    /// In follow range and in line of sight at sensing time
    pub visible: bool,
}

/// Living entities ordered by ascending squared distance.
///
/// Lookups only ever answer with visible entries; the invisible ones are kept
/// so `len` and `iter_all` reflect everything the sensor saw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NearestVisibleLivingEntities {
    entries: Vec<SensedEntity>,
}

impl NearestVisibleLivingEntities {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from entries in any order; they are sorted by distance.
    pub fn new(mut entries: Vec<SensedEntity>) -> Self {
        entries.sort_by(|a, b| a.distance_sq.total_cmp(&b.distance_sq));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `id` was seen this tick.
    pub fn contains(&self, id: EntityId) -> bool {
        self.iter().any(|entry| entry.snapshot.id == id)
    }

    pub fn find_closest(&self, predicate: impl Fn(&SensedEntity) -> bool) -> Option<&SensedEntity> {
        self.iter().find(|entry| predicate(entry))
    }

    pub fn find_all<'a>(
        &'a self,
        predicate: impl Fn(&SensedEntity) -> bool + 'a,
    ) -> impl Iterator<Item = &'a SensedEntity> + 'a {
        self.iter().filter(move |entry| predicate(entry))
    }

    /// Visible entries, nearest first.
    pub fn iter(&self) -> impl Iterator<Item = &SensedEntity> {
        self.entries.iter().filter(|entry| entry.visible)
    }

    pub fn iter_all(&self) -> impl Iterator<Item = &SensedEntity> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityKind;
    use glam::DVec3;

    fn sensed(id: u64, distance: f64, visible: bool) -> SensedEntity {
        SensedEntity {
            snapshot: EntitySnapshot {
                id: EntityId::from_raw(id),
                kind: EntityKind::Creature,
                position: DVec3::new(distance, 0.0, 0.0),
                look_direction: DVec3::X,
                eye_height: 1.0,
                half_width: 0.3,
                height: 1.8,
                alive: true,
                attackable: true,
                no_culling: false,
            },
            distance_sq: distance * distance,
            visible,
        }
    }

    #[test]
    fn test_entries_sorted_by_distance() {
        let nearest = NearestVisibleLivingEntities::new(vec![
            sensed(3, 9.0, true),
            sensed(1, 2.0, true),
            sensed(2, 5.0, true),
        ]);
        let order: Vec<u64> = nearest.iter().map(|e| e.snapshot.id.raw()).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_invisible_entries_are_skipped() {
        let nearest = NearestVisibleLivingEntities::new(vec![
            sensed(10, 1.0, false),
            sensed(11, 4.0, true),
        ]);
        assert!(!nearest.contains(EntityId::from_raw(10)));
        assert!(nearest.contains(EntityId::from_raw(11)));
        assert_eq!(
            nearest.find_closest(|_| true).map(|e| e.snapshot.id.raw()),
            Some(11)
        );
        assert_eq!(nearest.len(), 2);
    }

    #[test]
    fn test_find_all_filters() {
        let nearest = NearestVisibleLivingEntities::new(vec![
            sensed(20, 1.0, true),
            sensed(21, 3.0, true),
            sensed(22, 12.0, true),
        ]);
        let close: Vec<u64> = nearest
            .find_all(|e| e.distance_sq < 16.0)
            .map(|e| e.snapshot.id.raw())
            .collect();
        assert_eq!(close, vec![20, 21]);
    }
}
