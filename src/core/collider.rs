//! Collider component: a shape attached to a body with a local transform and material.

use crate::collision::shapes::Shape;
use crate::config::{DEFAULT_CATEGORY, DEFAULT_FILTER};
use crate::core::types::Material;
use crate::utils::math::Transform2;
use crate::utils::Entity;
use std::collections::HashSet;

/// 16-bit category/filter bitmasks. Two colliders may collide iff
/// `a.category & b.filter != 0 && b.category & a.filter != 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionFilter {
    pub category: u16,
    pub filter: u16,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self { category: DEFAULT_CATEGORY, filter: DEFAULT_FILTER }
    }
}

impl CollisionFilter {
    pub fn allows(a: CollisionFilter, b: CollisionFilter) -> bool {
        (a.category & b.filter) != 0 && (b.category & a.filter) != 0
    }
}

pub struct ColliderData {
    pub body: Entity,
    pub shape: Shape,
    pub local_transform: Transform2,
    /// Recomputed each frame from `body_transform.combine(local_transform)`.
    pub world_transform: Transform2,
    pub material: Material,
    pub filter: CollisionFilter,
    /// `-1` when not yet registered with the broad phase.
    pub tree_id: i32,
    pub overlap_pair_ids: HashSet<u64>,
    pub is_trigger: bool,
    /// Set by shape mutations to force tree reinsertion on the next broad-phase update.
    pub size_changed: bool,
}

impl ColliderData {
    pub fn new(body: Entity, shape: Shape, local_transform: Transform2, material: Material) -> Self {
        Self {
            body,
            shape,
            local_transform,
            world_transform: local_transform,
            material,
            filter: CollisionFilter::default(),
            tree_id: -1,
            overlap_pair_ids: HashSet::new(),
            is_trigger: false,
            size_changed: true,
        }
    }

    pub fn sync_world_transform(&mut self, body_transform: &Transform2) {
        self.world_transform = body_transform.combine(&self.local_transform);
    }
}

pub type ColliderSet = crate::utils::PartitionedPool<ColliderData>;
