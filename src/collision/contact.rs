//! Collision detection orchestration: broad phase -> overlap-pair reconciliation ->
//! narrow phase -> frame-scoped contact pairs, double-buffered so last frame's impulses
//! remain addressable for warm starting.

use std::collections::HashMap;
use std::time::Duration;

use crate::collision::broadphase::BroadPhase;
use crate::collision::narrowphase::{self, LocalManifold};
use crate::collision::pairs::OverlapPairTable;
use crate::core::{BodySet, ColliderSet};
use crate::utils::logging::ScopedTimer as TraceTimer;
use crate::utils::profiling::ScopedTimer as ProfileTimer;
use crate::utils::Entity;

/// A frame-scoped contact: one narrow-phase manifold between two colliders/bodies.
#[derive(Debug, Clone, Copy)]
pub struct ContactPair {
    pub pair_id: u64,
    pub body_a: Entity,
    pub body_b: Entity,
    pub collider_a: Entity,
    pub collider_b: Entity,
    /// Index of this pair's manifold in the owning frame buffer.
    pub manifold_index: usize,
    pub in_island: bool,
}

#[derive(Default)]
struct FrameBuffer {
    pairs: Vec<ContactPair>,
    manifolds: Vec<LocalManifold>,
    slot_of_pair: HashMap<u64, usize>,
}

impl FrameBuffer {
    fn clear(&mut self) {
        self.pairs.clear();
        self.manifolds.clear();
        self.slot_of_pair.clear();
    }
}

/// Owns the broad phase, the overlap-pair table, and the double-buffered contact-pair
/// and manifold arrays. `run` populates the current buffer; `prepare_for_solver`
/// reorders it into island-traversal order, warm-starts from the previous frame, and
/// flips which buffer is "current".
pub struct CollisionDetection {
    broad_phase: BroadPhase,
    overlap_pairs: OverlapPairTable,
    buffers: [FrameBuffer; 2],
    current: usize,
    /// Island-ordered pairs/manifolds ready for the solver; rebuilt by `prepare_for_solver`.
    pub ordered_pairs: Vec<ContactPair>,
    pub ordered_manifolds: Vec<LocalManifold>,
    last_broad_phase_time: Duration,
    last_narrow_phase_time: Duration,
}

impl Default for CollisionDetection {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionDetection {
    pub fn new() -> Self {
        Self {
            broad_phase: BroadPhase::new(),
            overlap_pairs: OverlapPairTable::new(),
            buffers: [FrameBuffer::default(), FrameBuffer::default()],
            current: 0,
            ordered_pairs: Vec::new(),
            ordered_manifolds: Vec::new(),
            last_broad_phase_time: Duration::ZERO,
            last_narrow_phase_time: Duration::ZERO,
        }
    }

    pub fn broad_phase(&self) -> &BroadPhase {
        &self.broad_phase
    }

    /// Wall-clock time spent in `run`'s broad-phase/reconciliation work last call.
    pub fn last_broad_phase_time(&self) -> Duration {
        self.last_broad_phase_time
    }

    /// Wall-clock time spent in `run`'s per-pair narrow-phase loop last call.
    pub fn last_narrow_phase_time(&self) -> Duration {
        self.last_narrow_phase_time
    }

    /// Inserts a freshly created collider's shape into the tree. Sets `tree_id` on the
    /// component; call once right after the collider is added to its `ColliderSet`.
    pub fn register_collider(&mut self, colliders: &mut ColliderSet, entity: Entity) {
        let Some(collider) = colliders.get_mut(entity) else { return };
        let tight = collider.shape.compute_aabb(&collider.world_transform);
        let tree_id = self.broad_phase.add_collider(tight, entity.raw());
        collider.tree_id = tree_id;
        collider.size_changed = false;
    }

    /// Removes a collider from the tree and drops any overlap pairs referencing it.
    pub fn remove_collider(&mut self, tree_id: i32) {
        self.broad_phase.remove_collider(tree_id);
        let stale: Vec<usize> = self
            .overlap_pairs
            .pairs()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.tree_id_a == tree_id || p.tree_id_b == tree_id)
            .map(|(i, _)| i)
            .collect();
        for slot in stale.into_iter().rev() {
            self.overlap_pairs.remove_slot(slot);
        }
    }

    /// Re-syncs every awake collider's world transform and tree leaf from its body's
    /// current pose. Called after the dynamics stage writes back integrated positions.
    pub fn update_colliders(&mut self, colliders: &mut ColliderSet, bodies: &BodySet) {
        for (_, collider) in colliders.iter_mut() {
            let Some(body) = bodies.get(collider.body) else { continue };
            if body.is_sleeping() {
                continue;
            }
            collider.sync_world_transform(&body.transform());
            let tight = collider.shape.compute_aabb(&collider.world_transform);
            let force = collider.size_changed;
            if self.broad_phase.update_collider(collider.tree_id, tight, force) {
                self.overlap_pairs.mark_touching_retest(collider.tree_id);
            }
            collider.size_changed = false;
        }
    }

    /// Runs the broad phase, reconciles the overlap-pair table, and runs the narrow
    /// phase over every live overlap pair, writing into the current frame buffer and
    /// registering each new contact pair on both bodies' contact-pair lists.
    pub fn run(&mut self, colliders: &ColliderSet, bodies: &mut BodySet) {
        let cur = self.current;
        self.buffers[cur].clear();

        {
            let _trace = TraceTimer::new("broad_phase");
            let _prof = ProfileTimer::new(&mut self.last_broad_phase_time);

            let broad_phase = &mut self.broad_phase;
            let mut candidate_pairs = Vec::new();
            broad_phase.compute_overlap_pairs(|tree_a, tree_b| {
                candidate_pairs.push((tree_a, tree_b));
            });

            let overlap_pairs = &mut self.overlap_pairs;
            for (tree_a, tree_b) in candidate_pairs {
                let entity_a = Entity::from_raw(broad_phase.user_data(tree_a));
                let entity_b = Entity::from_raw(broad_phase.user_data(tree_b));
                let (Some(a), Some(b)) = (colliders.get(entity_a), colliders.get(entity_b)) else {
                    continue;
                };
                overlap_pairs.reconcile(tree_a, tree_b, entity_a, entity_b, (a.shape.kind(), b.shape.kind()));
            }

            // Reconciliation step 2: a pair whose leaf was reinserted and that the
            // broad-phase query above did not re-confirm as touching (so `reconcile`
            // never cleared its `retest` flag) gets a direct tree-AABB check; drop it if
            // the two leaves truly no longer overlap, otherwise clear the flag.
            let broad_phase = &self.broad_phase;
            let mut retest_dead = Vec::new();
            for (slot, pair) in self.overlap_pairs.pairs_mut().iter_mut().enumerate() {
                if !pair.retest {
                    continue;
                }
                if broad_phase.aabb(pair.tree_id_a).overlaps(&broad_phase.aabb(pair.tree_id_b)) {
                    pair.retest = false;
                } else {
                    retest_dead.push(slot);
                }
            }
            for slot in retest_dead.into_iter().rev() {
                self.overlap_pairs.remove_slot(slot);
            }
        }

        let _trace = TraceTimer::new("narrow_phase");
        let _prof = ProfileTimer::new(&mut self.last_narrow_phase_time);

        let mut dead_slots = Vec::new();
        for (slot, overlap) in self.overlap_pairs.pairs().iter().enumerate() {
            let (Some(collider_a), Some(collider_b)) =
                (colliders.get(overlap.collider_a), colliders.get(overlap.collider_b))
            else {
                dead_slots.push(slot);
                continue;
            };

            if collider_a.is_trigger || collider_b.is_trigger {
                continue;
            }
            if !crate::core::CollisionFilter::allows(collider_a.filter, collider_b.filter) {
                continue;
            }
            if collider_a.body == collider_b.body {
                continue;
            }
            let a_asleep = bodies.get(collider_a.body).map(|b| b.is_sleeping()).unwrap_or(false);
            let b_asleep = bodies.get(collider_b.body).map(|b| b.is_sleeping()).unwrap_or(false);
            if a_asleep && b_asleep {
                continue;
            }
            let fat_a = self.broad_phase.aabb(overlap.tree_id_a);
            let fat_b = self.broad_phase.aabb(overlap.tree_id_b);
            if !fat_a.overlaps(&fat_b) {
                continue;
            }

            // Canonical shape order: the narrow phase only implements (lo, hi) by
            // ShapeKind ordinal, so swap which collider plays "a" when necessary.
            let (shape_lo, xf_lo, ent_lo, shape_hi, xf_hi, ent_hi) =
                if collider_a.shape.kind() <= collider_b.shape.kind() {
                    (
                        &collider_a.shape,
                        &collider_a.world_transform,
                        overlap.collider_a,
                        &collider_b.shape,
                        &collider_b.world_transform,
                        overlap.collider_b,
                    )
                } else {
                    (
                        &collider_b.shape,
                        &collider_b.world_transform,
                        overlap.collider_b,
                        &collider_a.shape,
                        &collider_a.world_transform,
                        overlap.collider_a,
                    )
                };

            let Some(manifold) = narrowphase::collide(shape_lo, xf_lo, shape_hi, xf_hi) else {
                continue;
            };

            let body_a = colliders.get(ent_lo).map(|c| c.body).unwrap();
            let body_b = colliders.get(ent_hi).map(|c| c.body).unwrap();

            let manifold_index = self.buffers[cur].manifolds.len();
            let pair = ContactPair {
                pair_id: overlap.pair_id,
                body_a,
                body_b,
                collider_a: ent_lo,
                collider_b: ent_hi,
                manifold_index,
                in_island: false,
            };
            let pair_index = self.buffers[cur].pairs.len();
            self.buffers[cur].slot_of_pair.insert(pair.pair_id, pair_index);
            self.buffers[cur].pairs.push(pair);
            self.buffers[cur].manifolds.push(manifold);

            if let Some(b) = bodies.get_mut(body_a) {
                b.contact_pairs.push(pair_index);
            }
            if let Some(b) = bodies.get_mut(body_b) {
                b.contact_pairs.push(pair_index);
            }
        }

        for slot in dead_slots.into_iter().rev() {
            self.overlap_pairs.remove_slot(slot);
        }
    }

    pub fn pairs(&self) -> &[ContactPair] {
        &self.buffers[self.current].pairs
    }

    /// Mutable access to the current frame's pairs, for the island builder to flag
    /// `in_island` as it consumes them.
    pub fn pairs_mut(&mut self) -> &mut [ContactPair] {
        &mut self.buffers[self.current].pairs
    }

    pub fn manifolds(&self) -> &[LocalManifold] {
        &self.buffers[self.current].manifolds
    }

    pub fn manifolds_mut(&mut self) -> &mut [LocalManifold] {
        &mut self.buffers[self.current].manifolds
    }

    /// Reorders the current frame's pairs/manifolds into island-traversal order
    /// (`order` holds current-buffer pair indices), warm-starts each point from the
    /// matching `contactKey` in last frame's manifold for the same `pairId`, and flips
    /// the active buffer so this frame's data becomes queryable as "last" next step.
    pub fn prepare_for_solver(&mut self, order: &[usize]) {
        let cur = self.current;
        let last = 1 - cur;

        self.ordered_pairs.clear();
        self.ordered_manifolds.clear();
        self.ordered_pairs.reserve(order.len());
        self.ordered_manifolds.reserve(order.len());

        for &pair_index in order {
            let mut pair = self.buffers[cur].pairs[pair_index];
            let mut manifold = self.buffers[cur].manifolds[pair.manifold_index];

            if let Some(&last_slot) = self.buffers[last].slot_of_pair.get(&pair.pair_id) {
                let last_pair = &self.buffers[last].pairs[last_slot];
                let last_manifold = &self.buffers[last].manifolds[last_pair.manifold_index];
                for point in &mut manifold.points[..manifold.count] {
                    if let Some(prev) = last_manifold.points[..last_manifold.count]
                        .iter()
                        .find(|p| p.contact_key == point.contact_key)
                    {
                        point.normal_impulse = prev.normal_impulse;
                        point.tangent_impulse = prev.tangent_impulse;
                    }
                }
            }

            pair.in_island = true;
            pair.manifold_index = self.ordered_manifolds.len();
            self.ordered_pairs.push(pair);
            self.ordered_manifolds.push(manifold);
        }

        self.buffers[last].clear();
        self.current = last;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::shapes::{Circle, Shape};
    use crate::core::types::{BodyType, Material};
    use crate::core::{BodyData, ColliderData};
    use crate::utils::math::{Transform2, Vec2};
    use crate::utils::EntityAllocator;

    fn spawn_circle(
        alloc: &mut EntityAllocator,
        bodies: &mut BodySet,
        colliders: &mut ColliderSet,
        detection: &mut CollisionDetection,
        x: f32,
    ) -> Entity {
        let body_entity = alloc.allocate();
        let body = BodyData::new(BodyType::Dynamic, Transform2::new(Vec2::new(x, 0.0), Default::default()));
        bodies.insert_awake(body_entity, body);

        let collider_entity = alloc.allocate();
        let shape = Shape::Circle(Circle { radius: 0.5, center: Vec2::ZERO });
        let mut collider = ColliderData::new(body_entity, shape, Transform2::identity(), Material::default());
        collider.sync_world_transform(&bodies.get(body_entity).unwrap().transform());
        colliders.insert_awake(collider_entity, collider);
        bodies.get_mut(body_entity).unwrap().colliders.push(collider_entity);
        detection.register_collider(colliders, collider_entity);
        body_entity
    }

    #[test]
    fn overlapping_circles_produce_a_contact_pair_on_both_bodies() {
        let mut alloc = EntityAllocator::new();
        let mut bodies = BodySet::new();
        let mut colliders = ColliderSet::new();
        let mut detection = CollisionDetection::new();

        let body_a = spawn_circle(&mut alloc, &mut bodies, &mut colliders, &mut detection, 0.0);
        let body_b = spawn_circle(&mut alloc, &mut bodies, &mut colliders, &mut detection, 0.8);

        detection.run(&colliders, &mut bodies);

        assert_eq!(detection.pairs().len(), 1);
        let pair_index = 0;
        assert!(bodies.get(body_a).unwrap().contact_pairs.contains(&pair_index));
        assert!(bodies.get(body_b).unwrap().contact_pairs.contains(&pair_index));
    }

    #[test]
    fn separated_bodies_are_pruned_from_the_overlap_table() {
        let mut alloc = EntityAllocator::new();
        let mut bodies = BodySet::new();
        let mut colliders = ColliderSet::new();
        let mut detection = CollisionDetection::new();

        let body_a = spawn_circle(&mut alloc, &mut bodies, &mut colliders, &mut detection, 0.0);
        let body_b = spawn_circle(&mut alloc, &mut bodies, &mut colliders, &mut detection, 0.8);

        detection.run(&colliders, &mut bodies);
        assert_eq!(detection.pairs().len(), 1);
        let _ = body_a;

        // Move body_b far away; the next `update_colliders` call reinserts its leaf and
        // should flag the stale pair for retest.
        let moved = Vec2::new(100.0, 0.0);
        bodies.get_mut(body_b).unwrap().position = moved;
        bodies.get_mut(body_b).unwrap().world_center = moved;
        detection.update_colliders(&mut colliders, &bodies);

        for (_, body) in bodies.iter_mut() {
            body.contact_pairs.clear();
        }
        detection.run(&colliders, &mut bodies);
        assert_eq!(detection.pairs().len(), 0, "a pair whose colliders separated must be pruned, not kept alive forever");
    }

    #[test]
    fn warm_start_carries_impulse_across_frames() {
        let mut alloc = EntityAllocator::new();
        let mut bodies = BodySet::new();
        let mut colliders = ColliderSet::new();
        let mut detection = CollisionDetection::new();

        spawn_circle(&mut alloc, &mut bodies, &mut colliders, &mut detection, 0.0);
        spawn_circle(&mut alloc, &mut bodies, &mut colliders, &mut detection, 0.8);

        detection.run(&colliders, &mut bodies);
        detection.manifolds_mut()[0].points[0].normal_impulse = 4.2;
        let order: Vec<usize> = (0..detection.pairs().len()).collect();
        detection.prepare_for_solver(&order);
        assert_eq!(detection.ordered_manifolds[0].points[0].normal_impulse, 4.2);

        for (_, body) in bodies.iter_mut() {
            body.contact_pairs.clear();
        }
        detection.run(&colliders, &mut bodies);
        let order: Vec<usize> = (0..detection.pairs().len()).collect();
        detection.prepare_for_solver(&order);
        assert_eq!(detection.ordered_manifolds[0].points[0].normal_impulse, 4.2);
    }
}
