//! Immutable per-tick view of the world handed to every brain

use std::sync::Arc;

use ahash::HashMap;
use glam::IVec3;
use mobsight_brain::{EntityId, EntitySnapshot, WorldQuery};
use mobsight_culling::Aabb;
use rstar::{RTree, RTreeObject, AABB};

use super::terrain::Terrain;

/// Entity bounds wrapper to implement R-tree traits
#[derive(Debug, Clone, Copy)]
struct IndexedEntity(EntitySnapshot);

impl RTreeObject for IndexedEntity {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        let bounds = self.0.bounding_box();
        AABB::from_corners(bounds.min.to_array(), bounds.max.to_array())
    }
}

/// Every entity as it was when the tick began, indexed for box queries.
///
/// Brains sense through this snapshot while their bodies are mutated, so the
/// order in which mobs are ticked cannot change what they see.
pub struct WorldSnapshot {
    game_time: u64,
    terrain: Arc<Terrain>,
    index: RTree<IndexedEntity>,
    by_id: HashMap<EntityId, EntitySnapshot>,
}

impl WorldSnapshot {
    pub fn capture(
        game_time: u64,
        terrain: Arc<Terrain>,
        entities: impl IntoIterator<Item = EntitySnapshot>,
    ) -> Self {
        let entities: Vec<EntitySnapshot> = entities.into_iter().collect();
        let by_id = entities.iter().map(|e| (e.id, *e)).collect();
        let index = RTree::bulk_load(entities.into_iter().map(IndexedEntity).collect());
        Self {
            game_time,
            terrain,
            index,
            by_id,
        }
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl WorldQuery for WorldSnapshot {
    fn game_time(&self) -> u64 {
        self.game_time
    }

    fn entity(&self, id: EntityId) -> Option<EntitySnapshot> {
        self.by_id.get(&id).copied()
    }

    fn entities_in(&self, region: &Aabb, filter: &dyn Fn(&EntitySnapshot) -> bool) -> Vec<EntitySnapshot> {
        let mut found: Vec<EntitySnapshot> = if region.is_infinite() {
            self.by_id.values().filter(|e| filter(e)).copied().collect()
        } else {
            let envelope = AABB::from_corners(region.min.to_array(), region.max.to_array());
            self.index
                .locate_in_envelope_intersecting(&envelope)
                .map(|indexed| indexed.0)
                .filter(|e| filter(e))
                .collect()
        };
        found.sort_by_key(|e| e.id);
        found
    }

    fn has_line_of_sight(&self, from: EntityId, to: EntityId) -> bool {
        match (self.by_id.get(&from), self.by_id.get(&to)) {
            (Some(from), Some(to)) => self
                .terrain
                .has_clear_line(from.eye_position(), to.eye_position()),
            _ => false,
        }
    }

    fn is_walkable(&self, pos: IVec3) -> bool {
        self.terrain.is_walkable(pos)
    }
}
