//! Wraps the dynamic tree with a "moved" set of tree ids that need retesting this frame,
//! and turns tree motion into candidate collider pairs.

use crate::collision::aabb::Aabb;
use crate::collision::tree::DynamicTree;
use std::collections::HashSet;

pub struct BroadPhase {
    tree: DynamicTree,
    moved: HashSet<i32>,
}

impl Default for BroadPhase {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadPhase {
    pub fn new() -> Self {
        Self { tree: DynamicTree::new(), moved: HashSet::new() }
    }

    pub fn tree(&self) -> &DynamicTree {
        &self.tree
    }

    /// `user_data` is the collider's owning `Entity`, packed via `Entity::raw`.
    pub fn add_collider(&mut self, tight_aabb: Aabb, user_data: u32) -> i32 {
        let fat = tight_aabb.fattened(crate::config::AABB_FAT_INFLATION);
        let id = self.tree.insert_leaf(fat, user_data);
        self.moved.insert(id);
        id
    }

    pub fn remove_collider(&mut self, tree_id: i32) {
        self.tree.remove_leaf(tree_id);
        self.moved.remove(&tree_id);
    }

    /// Re-syncs a leaf's AABB. Returns true when the tree actually reinserted the leaf
    /// (its AABB moved far enough, or `force` was set after a shape resize) — the caller
    /// should then mark every overlap pair touching this collider for retest.
    pub fn update_collider(&mut self, tree_id: i32, tight_aabb: Aabb, force: bool) -> bool {
        let reinserted = self.tree.update_leaf(tree_id, tight_aabb, force);
        if reinserted {
            self.moved.insert(tree_id);
        }
        reinserted
    }

    /// Drains the moved set; for each moved leaf, emits every `(moved_id, other_id)` pair
    /// the tree considers overlapping. Duplicates are expected; the overlap-pair table
    /// deduplicates by `pairId`.
    pub fn compute_overlap_pairs(&mut self, mut emit: impl FnMut(i32, i32)) {
        let moved: Vec<i32> = self.moved.drain().collect();
        for moved_id in moved {
            let query_aabb = self.tree.aabb(moved_id);
            self.tree.query(&query_aabb, |other_id| {
                if other_id != moved_id {
                    emit(moved_id, other_id);
                }
            });
        }
    }

    pub fn user_data(&self, tree_id: i32) -> u32 {
        self.tree.user_data(tree_id)
    }

    pub fn aabb(&self, tree_id: i32) -> Aabb {
        self.tree.aabb(tree_id)
    }
}
