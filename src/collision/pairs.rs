//! The overlap-pair table: candidate pairs from the broad phase, deduplicated and kept
//! alive across frames by a symmetric pair id (Szudzik's "elegant pairing").

use crate::collision::shapes::ShapeKind;
use crate::utils::Entity;
use std::collections::HashMap;

/// Szudzik's elegant pairing function, made symmetric by ordering the inputs first.
/// Unique per unordered pair of non-negative integers.
pub fn elegant_pair(a: i32, b: i32) -> u64 {
    let (x, y) = if a < b { (a as u64, b as u64) } else { (b as u64, a as u64) };
    if x == y {
        y * y + y + x
    } else {
        y * y + x
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OverlapPair {
    pub pair_id: u64,
    pub tree_id_a: i32,
    pub tree_id_b: i32,
    pub collider_a: Entity,
    pub collider_b: Entity,
    pub algorithm: (ShapeKind, ShapeKind),
    pub retest: bool,
}

/// Append-only vector of live overlap pairs plus a `pairId -> slot` index.
#[derive(Default)]
pub struct OverlapPairTable {
    pairs: Vec<OverlapPair>,
    slot_of: HashMap<u64, usize>,
}

impl OverlapPairTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[OverlapPair] {
        &self.pairs
    }

    pub fn pairs_mut(&mut self) -> &mut [OverlapPair] {
        &mut self.pairs
    }

    pub fn contains(&self, pair_id: u64) -> bool {
        self.slot_of.contains_key(&pair_id)
    }

    pub fn get_mut(&mut self, pair_id: u64) -> Option<&mut OverlapPair> {
        let slot = *self.slot_of.get(&pair_id)?;
        Some(&mut self.pairs[slot])
    }

    /// Inserts a new pair if `pair_id` is unseen; clears `retest` if it already exists.
    pub fn reconcile(
        &mut self,
        tree_id_a: i32,
        tree_id_b: i32,
        collider_a: Entity,
        collider_b: Entity,
        algorithm: (ShapeKind, ShapeKind),
    ) {
        let pair_id = elegant_pair(tree_id_a, tree_id_b);
        if let Some(existing) = self.get_mut(pair_id) {
            existing.retest = false;
            return;
        }
        let slot = self.pairs.len();
        self.pairs.push(OverlapPair {
            pair_id,
            tree_id_a,
            tree_id_b,
            collider_a,
            collider_b,
            algorithm,
            retest: false,
        });
        self.slot_of.insert(pair_id, slot);
    }

    /// Marks every pair touching `tree_id` for retest. Called when a leaf's fat AABB had
    /// to be reinserted, since a reinserted leaf's old overlap partners may no longer
    /// actually be touching and won't necessarily be re-emitted by the next broad-phase
    /// query.
    pub fn mark_touching_retest(&mut self, tree_id: i32) {
        for pair in &mut self.pairs {
            if pair.tree_id_a == tree_id || pair.tree_id_b == tree_id {
                pair.retest = true;
            }
        }
    }

    /// Removes the pair at `slot`, swapping the last element into its place.
    pub fn remove_slot(&mut self, slot: usize) {
        let removed = self.pairs.swap_remove(slot);
        self.slot_of.remove(&removed.pair_id);
        if slot < self.pairs.len() {
            let moved_id = self.pairs[slot].pair_id;
            self.slot_of.insert(moved_id, slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_id_is_symmetric() {
        assert_eq!(elegant_pair(3, 9), elegant_pair(9, 3));
        assert_eq!(elegant_pair(0, 0), elegant_pair(0, 0));
        assert_ne!(elegant_pair(1, 2), elegant_pair(1, 3));
    }

    #[test]
    fn reconcile_dedupes_by_pair_id() {
        let mut table = OverlapPairTable::new();
        let a = Entity::new(0, 0);
        let b = Entity::new(1, 0);
        table.reconcile(5, 9, a, b, (ShapeKind::Circle, ShapeKind::Circle));
        table.reconcile(9, 5, a, b, (ShapeKind::Circle, ShapeKind::Circle));
        assert_eq!(table.len(), 1);
    }
}
