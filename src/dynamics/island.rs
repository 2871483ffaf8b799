//! Island construction: groups bodies connected by active contact pairs into
//! independent solver groups via a stack-based DFS over each body's contact-pair list.

use std::collections::HashSet;

use crate::collision::ContactPair;
use crate::core::BodySet;
use crate::utils::Entity;

#[derive(Debug, Clone, Copy)]
pub struct Island {
    pub manifold_start: usize,
    pub manifold_count: usize,
    pub body_start: usize,
    pub body_count: usize,
    /// Set by the position solver; cleared when an island fails to reach an acceptable
    /// minimum separation within its iteration budget.
    pub solved: bool,
}

impl Island {
    pub fn manifold_range(&self) -> std::ops::Range<usize> {
        self.manifold_start..self.manifold_start + self.manifold_count
    }

    pub fn body_range(&self) -> std::ops::Range<usize> {
        self.body_start..self.body_start + self.body_count
    }
}

/// Builds islands from the current frame's contact pairs and exposes the resulting
/// DFS-ordered manifold/body index lists the solver walks for cache locality.
#[derive(Default)]
pub struct IslandBuilder {
    pub islands: Vec<Island>,
    /// Indices into the collision detection's current-frame pair/manifold arrays, in
    /// island-traversal order.
    pub ordered_pair_indices: Vec<usize>,
    pub ordered_bodies: Vec<Entity>,
}

impl IslandBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the DFS over every awake, not-yet-in-island body. `contact_pairs` is the
    /// current frame's pair array (indices referenced by `BodyData::contact_pairs`);
    /// its `in_island` flags are set in place as pairs are claimed.
    pub fn build(&mut self, bodies: &mut BodySet, contact_pairs: &mut [ContactPair]) {
        self.islands.clear();
        self.ordered_pair_indices.clear();
        self.ordered_bodies.clear();

        let awake: Vec<Entity> = bodies.awake_entities().to_vec();
        for start in awake {
            let Some(body) = bodies.get(start) else { continue };
            if body.is_static() || body.is_in_island() {
                continue;
            }

            let body_start = self.ordered_bodies.len();
            let manifold_start = self.ordered_pair_indices.len();

            let mut stack = vec![start];
            let mut seen = HashSet::new();
            seen.insert(start);
            bodies.get_mut(start).unwrap().set_in_island(true);

            while let Some(current) = stack.pop() {
                self.ordered_bodies.push(current);

                let Some(current_body) = bodies.get(current) else { continue };
                if current_body.is_static() {
                    continue;
                }

                let touching = current_body.contact_pairs.clone();
                for pair_index in touching {
                    if contact_pairs[pair_index].in_island {
                        continue;
                    }
                    contact_pairs[pair_index].in_island = true;
                    self.ordered_pair_indices.push(pair_index);

                    let pair = &contact_pairs[pair_index];
                    let other = if pair.body_a == current { pair.body_b } else { pair.body_a };
                    if seen.insert(other) {
                        let other_is_static = match bodies.get_mut(other) {
                            Some(other_body) => {
                                if !other_body.is_static() {
                                    // Contact with an awake body wakes a sleeping neighbor
                                    // so the DFS can continue through it.
                                    other_body.wake();
                                    other_body.set_in_island(true);
                                }
                                other_body.is_static()
                            }
                            None => continue,
                        };
                        if !other_is_static {
                            bodies.set_awake(other, true);
                        }
                        stack.push(other);
                    }
                }
            }

            let body_count = self.ordered_bodies.len() - body_start;
            let manifold_count = self.ordered_pair_indices.len() - manifold_start;
            self.islands.push(Island { manifold_start, manifold_count, body_start, body_count, solved: true });
        }
    }

    /// Locates the island owning a given position in the ordered manifold array.
    pub fn island_of_manifold(&self, manifold_index: usize) -> Option<usize> {
        self.islands.iter().position(|island| island.manifold_range().contains(&manifold_index))
    }

    /// Clears every body's in-island flag and frame-scoped contact-pair list. Call once
    /// the solver has finished consuming this frame's islands.
    pub fn reset(&self, bodies: &mut BodySet) {
        for (_, body) in bodies.iter_mut() {
            body.set_in_island(false);
            body.contact_pairs.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::BodyType;
    use crate::core::BodyData;
    use crate::utils::math::Transform2;
    use crate::utils::EntityAllocator;

    fn body(alloc: &mut EntityAllocator, bodies: &mut BodySet, ty: BodyType) -> Entity {
        let e = alloc.allocate();
        bodies.insert_awake(e, BodyData::new(ty, Transform2::identity()));
        e
    }

    fn pair(body_a: Entity, body_b: Entity) -> ContactPair {
        ContactPair {
            pair_id: 0,
            body_a,
            body_b,
            collider_a: Entity::NULL,
            collider_b: Entity::NULL,
            manifold_index: 0,
            in_island: false,
        }
    }

    #[test]
    fn chain_of_dynamic_bodies_forms_one_island() {
        let mut alloc = EntityAllocator::new();
        let mut bodies = BodySet::new();
        let a = body(&mut alloc, &mut bodies, BodyType::Dynamic);
        let b = body(&mut alloc, &mut bodies, BodyType::Dynamic);
        let c = body(&mut alloc, &mut bodies, BodyType::Dynamic);

        bodies.get_mut(a).unwrap().contact_pairs.push(0);
        bodies.get_mut(b).unwrap().contact_pairs.push(0);
        bodies.get_mut(b).unwrap().contact_pairs.push(1);
        bodies.get_mut(c).unwrap().contact_pairs.push(1);

        let mut pairs = vec![pair(a, b), pair(b, c)];
        let mut builder = IslandBuilder::new();
        builder.build(&mut bodies, &mut pairs);

        assert_eq!(builder.islands.len(), 1);
        assert_eq!(builder.islands[0].body_count, 3);
        assert_eq!(builder.islands[0].manifold_count, 2);
    }

    #[test]
    fn static_body_does_not_propagate_but_is_included() {
        let mut alloc = EntityAllocator::new();
        let mut bodies = BodySet::new();
        let ground = body(&mut alloc, &mut bodies, BodyType::Static);
        let a = body(&mut alloc, &mut bodies, BodyType::Dynamic);
        let b = body(&mut alloc, &mut bodies, BodyType::Dynamic);

        bodies.get_mut(a).unwrap().contact_pairs.push(0);
        bodies.get_mut(b).unwrap().contact_pairs.push(1);

        let mut pairs = vec![pair(a, ground), pair(b, ground)];
        let mut builder = IslandBuilder::new();
        builder.build(&mut bodies, &mut pairs);

        assert_eq!(builder.islands.len(), 2, "static body must not merge unrelated dynamic bodies into one island");
    }

    #[test]
    fn disconnected_bodies_form_separate_islands() {
        let mut alloc = EntityAllocator::new();
        let mut bodies = BodySet::new();
        let a = body(&mut alloc, &mut bodies, BodyType::Dynamic);
        let b = body(&mut alloc, &mut bodies, BodyType::Dynamic);

        let mut pairs: Vec<ContactPair> = Vec::new();
        let mut builder = IslandBuilder::new();
        builder.build(&mut bodies, &mut pairs);

        assert_eq!(builder.islands.len(), 2);
        let _ = a;
        let _ = b;
    }
}
