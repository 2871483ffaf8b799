//! Sequential-impulse contact solver: per-manifold velocity constraints (with a 2-point
//! block solver for two-point manifolds) followed by a Baumgarte-biased pseudo-velocity
//! position solver. Operates on the island-ordered manifold array for cache locality.

use crate::collision::{ContactPair, LocalManifold, ManifoldType};
use crate::config::{
    BAUMGARTE, LINEAR_SLOP, LINEAR_SLOP_SLEEP_MULTIPLIER, MAX_ANGULAR_CORRECTION,
    MAX_BLOCK_CONDITION_NUMBER, MAX_LINEAR_CORRECTION,
};
use crate::core::{BodyData, BodySet, ColliderSet, Material};
use crate::dynamics::island::Island;
use crate::utils::math::{cross2, cross_scalar_vec, right_perp, Transform2, Vec2};
use crate::utils::Entity;

#[derive(Debug, Clone, Copy, Default)]
struct VelocityConstraintPoint {
    r_a: Vec2,
    r_b: Vec2,
    normal_mass: f32,
    tangent_mass: f32,
    velocity_bias: f32,
    normal_impulse: f32,
    tangent_impulse: f32,
}

/// A 2x2 matrix, used only for the two-point block solver.
#[derive(Debug, Clone, Copy)]
struct Block {
    k11: f32,
    k12: f32,
    k22: f32,
    inv11: f32,
    inv12: f32,
    inv21: f32,
    inv22: f32,
}

struct VelocityConstraint {
    body_a: Entity,
    body_b: Entity,
    normal: Vec2,
    friction: f32,
    points: [VelocityConstraintPoint; 2],
    count: usize,
    block: Option<Block>,
}

struct PositionConstraint {
    body_a: Entity,
    body_b: Entity,
    local_normal: Vec2,
    local_point: Vec2,
    local_points: [Vec2; 2],
    count: usize,
    kind: ManifoldType,
    radius: f32,
}

/// Builds and iterates velocity/position constraints for one step's island-ordered
/// manifold array. Constraint storage is reused frame to frame via `reset`.
#[derive(Default)]
pub struct ContactSolver {
    velocity_constraints: Vec<VelocityConstraint>,
    position_constraints: Vec<PositionConstraint>,
}

fn relative_velocity(a: &BodyData, b: &BodyData, r_a: Vec2, r_b: Vec2) -> Vec2 {
    let va = a.constrained_linear_velocity + cross_scalar_vec(a.constrained_angular_speed, r_a);
    let vb = b.constrained_linear_velocity + cross_scalar_vec(b.constrained_angular_speed, r_b);
    vb - va
}

fn apply_impulse(body: &mut BodyData, r: Vec2, impulse: Vec2, sign: f32) {
    body.constrained_linear_velocity += sign * body.inverse_mass * impulse;
    body.constrained_angular_speed += sign * body.inverse_inertia * cross2(r, impulse);
}

fn collider_world_transform(body: &BodyData, local_transform: &Transform2) -> Transform2 {
    body.transform().combine(local_transform)
}

impl ContactSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds velocity and position constraints from the island-ordered pairs/manifolds,
    /// then applies each point's warm-started (and `dt_ratio`-scaled) impulse.
    pub fn init(
        &mut self,
        bodies: &mut BodySet,
        colliders: &ColliderSet,
        pairs: &[ContactPair],
        manifolds: &[LocalManifold],
        restitution_threshold: f32,
        dt_ratio: f32,
    ) {
        self.velocity_constraints.clear();
        self.position_constraints.clear();
        self.velocity_constraints.reserve(pairs.len());
        self.position_constraints.reserve(pairs.len());

        for (pair, manifold) in pairs.iter().zip(manifolds.iter()) {
            let (Some(collider_a), Some(collider_b)) = (colliders.get(pair.collider_a), colliders.get(pair.collider_b))
            else {
                continue;
            };
            let (Some(body_a), Some(body_b)) = (bodies.get(pair.body_a), bodies.get(pair.body_b)) else {
                continue;
            };

            let xf_a = collider_world_transform(body_a, &collider_a.local_transform);
            let xf_b = collider_world_transform(body_b, &collider_b.local_transform);
            let (normal, world_points) = crate::collision::narrowphase::world_manifold(manifold, &xf_a, &xf_b);
            let (friction, restitution) = Material::mix(&collider_a.material, &collider_b.material);
            let tangent = right_perp(normal);

            let mut vc = VelocityConstraint {
                body_a: pair.body_a,
                body_b: pair.body_b,
                normal,
                friction,
                points: [VelocityConstraintPoint::default(); 2],
                count: manifold.count,
                block: None,
            };

            for k in 0..manifold.count {
                let Some(wp) = &world_points[k] else { continue };
                let r_a = wp.point - body_a.world_center;
                let r_b = wp.point - body_b.world_center;
                let rn_a = cross2(r_a, normal);
                let rn_b = cross2(r_b, normal);
                let k_normal =
                    body_a.inverse_mass + body_b.inverse_mass + body_a.inverse_inertia * rn_a * rn_a + body_b.inverse_inertia * rn_b * rn_b;
                let rt_a = cross2(r_a, tangent);
                let rt_b = cross2(r_b, tangent);
                let k_tangent =
                    body_a.inverse_mass + body_b.inverse_mass + body_a.inverse_inertia * rt_a * rt_a + body_b.inverse_inertia * rt_b * rt_b;

                let rel_vel = relative_velocity(body_a, body_b, r_a, r_b);
                let vn = rel_vel.dot(normal);
                let velocity_bias = if vn < -restitution_threshold { -restitution * vn } else { 0.0 };

                vc.points[k] = VelocityConstraintPoint {
                    r_a,
                    r_b,
                    normal_mass: if k_normal > 0.0 { 1.0 / k_normal } else { 0.0 },
                    tangent_mass: if k_tangent > 0.0 { 1.0 / k_tangent } else { 0.0 },
                    velocity_bias,
                    normal_impulse: manifold.points[k].normal_impulse * dt_ratio,
                    tangent_impulse: manifold.points[k].tangent_impulse * dt_ratio,
                };
            }

            if vc.count == 2 {
                let p0 = &vc.points[0];
                let p1 = &vc.points[1];
                let k11 = body_a.inverse_mass
                    + body_b.inverse_mass
                    + body_a.inverse_inertia * cross2(p0.r_a, normal) * cross2(p0.r_a, normal)
                    + body_b.inverse_inertia * cross2(p0.r_b, normal) * cross2(p0.r_b, normal);
                let k22 = body_a.inverse_mass
                    + body_b.inverse_mass
                    + body_a.inverse_inertia * cross2(p1.r_a, normal) * cross2(p1.r_a, normal)
                    + body_b.inverse_inertia * cross2(p1.r_b, normal) * cross2(p1.r_b, normal);
                let k12 = body_a.inverse_mass
                    + body_b.inverse_mass
                    + body_a.inverse_inertia * cross2(p0.r_a, normal) * cross2(p1.r_a, normal)
                    + body_b.inverse_inertia * cross2(p0.r_b, normal) * cross2(p1.r_b, normal);

                if k11 * k11 < MAX_BLOCK_CONDITION_NUMBER * (k11 * k22 - k12 * k12) {
                    let det = k11 * k22 - k12 * k12;
                    let inv_det = if det.abs() > 1e-12 { 1.0 / det } else { 0.0 };
                    vc.block = Some(Block {
                        k11,
                        k12,
                        k22,
                        inv11: k22 * inv_det,
                        inv12: -k12 * inv_det,
                        inv21: -k12 * inv_det,
                        inv22: k11 * inv_det,
                    });
                }
            }

            // Warm start: apply the scaled impulses carried over from last frame.
            if let Some((a, b)) = bodies.get2_mut(vc.body_a, vc.body_b) {
                for point in &vc.points[..vc.count] {
                    let impulse = normal * point.normal_impulse + tangent * point.tangent_impulse;
                    apply_impulse(a, point.r_a, impulse, -1.0);
                    apply_impulse(b, point.r_b, impulse, 1.0);
                }
            }

            self.velocity_constraints.push(vc);
            self.position_constraints.push(PositionConstraint {
                body_a: pair.body_a,
                body_b: pair.body_b,
                local_normal: manifold.local_normal,
                local_point: manifold.local_point,
                local_points: [manifold.points[0].local_point, manifold.points[1].local_point],
                count: manifold.count,
                kind: manifold.kind,
                radius: collider_a.shape.radius() + collider_b.shape.radius(),
            });
        }
    }

    /// One velocity-iteration pass: tangent (friction) then normal, 1-point or 2-point
    /// block, over every constraint.
    pub fn solve_velocity(&mut self, bodies: &mut BodySet) {
        for vc in &mut self.velocity_constraints {
            let Some((a, b)) = bodies.get2_mut(vc.body_a, vc.body_b) else { continue };
            let tangent = right_perp(vc.normal);

            for point in &mut vc.points[..vc.count] {
                let rel_vel = relative_velocity(a, b, point.r_a, point.r_b);
                let vt = rel_vel.dot(tangent);
                let mut lambda = -point.tangent_mass * vt;
                let max_friction = vc.friction * point.normal_impulse;
                let new_impulse = (point.tangent_impulse + lambda).clamp(-max_friction, max_friction);
                lambda = new_impulse - point.tangent_impulse;
                point.tangent_impulse = new_impulse;

                let impulse = tangent * lambda;
                apply_impulse(a, point.r_a, impulse, -1.0);
                apply_impulse(b, point.r_b, impulse, 1.0);
            }

            match (vc.count, vc.block) {
                (1, _) => {
                    let point = &mut vc.points[0];
                    let rel_vel = relative_velocity(a, b, point.r_a, point.r_b);
                    let vn = rel_vel.dot(vc.normal);
                    let mut lambda = -point.normal_mass * (vn - point.velocity_bias);
                    let new_impulse = (point.normal_impulse + lambda).max(0.0);
                    lambda = new_impulse - point.normal_impulse;
                    point.normal_impulse = new_impulse;

                    let impulse = vc.normal * lambda;
                    apply_impulse(a, point.r_a, impulse, -1.0);
                    apply_impulse(b, point.r_b, impulse, 1.0);
                }
                (2, Some(block)) => {
                    solve_block(a, b, vc.normal, &mut vc.points, &block);
                }
                (2, None) => {
                    for point in &mut vc.points[..2] {
                        let rel_vel = relative_velocity(a, b, point.r_a, point.r_b);
                        let vn = rel_vel.dot(vc.normal);
                        let mut lambda = -point.normal_mass * (vn - point.velocity_bias);
                        let new_impulse = (point.normal_impulse + lambda).max(0.0);
                        lambda = new_impulse - point.normal_impulse;
                        point.normal_impulse = new_impulse;

                        let impulse = vc.normal * lambda;
                        apply_impulse(a, point.r_a, impulse, -1.0);
                        apply_impulse(b, point.r_b, impulse, 1.0);
                    }
                }
                _ => {}
            }
        }
    }

    /// Writes accumulated normal/tangent impulses back into the current frame's
    /// manifolds so the next frame can warm start from them.
    pub fn store_impulses(&self, manifolds: &mut [LocalManifold]) {
        for (vc, manifold) in self.velocity_constraints.iter().zip(manifolds.iter_mut()) {
            for k in 0..vc.count {
                manifold.points[k].normal_impulse = vc.points[k].normal_impulse;
                manifold.points[k].tangent_impulse = vc.points[k].tangent_impulse;
            }
        }
    }

    /// One pseudo-velocity position-correction pass over `island`'s manifold range.
    /// Clears `island.solved` if any manifold's minimum separation is still too deep.
    pub fn solve_position(&self, bodies: &mut BodySet, island: &mut Island) {
        for pc in &self.position_constraints[island.manifold_range()] {
            let Some((a, b)) = bodies.get2_mut(pc.body_a, pc.body_b) else { continue };
            let xf_a = Transform2::new(a.constrained_position - a.constrained_orientation.rotate(a.local_center), a.constrained_orientation);
            let xf_b = Transform2::new(b.constrained_position - b.constrained_orientation.rotate(b.local_center), b.constrained_orientation);

            let (normal, points) = position_world_manifold(pc, &xf_a, &xf_b);
            let mut min_separation = f32::MAX;

            for maybe_point in points.into_iter().flatten() {
                let (world_point, separation) = maybe_point;
                min_separation = min_separation.min(separation);

                let r_a = world_point - a.constrained_position;
                let r_b = world_point - b.constrained_position;
                let rn_a = cross2(r_a, normal);
                let rn_b = cross2(r_b, normal);
                let k_normal = a.inverse_mass + b.inverse_mass + a.inverse_inertia * rn_a * rn_a + b.inverse_inertia * rn_b * rn_b;

                let c = (BAUMGARTE * (separation + LINEAR_SLOP)).clamp(-MAX_LINEAR_CORRECTION, 0.0);
                let impulse = if k_normal > 0.0 { -c / k_normal } else { 0.0 };
                let p = normal * impulse;

                let delta_a = (-a.inverse_inertia * cross2(r_a, p)).clamp(-MAX_ANGULAR_CORRECTION, MAX_ANGULAR_CORRECTION);
                let delta_b = (b.inverse_inertia * cross2(r_b, p)).clamp(-MAX_ANGULAR_CORRECTION, MAX_ANGULAR_CORRECTION);

                a.constrained_position -= a.inverse_mass * p;
                a.constrained_orientation = a.constrained_orientation.integrate(delta_a, 1.0);
                b.constrained_position += b.inverse_mass * p;
                b.constrained_orientation = b.constrained_orientation.integrate(delta_b, 1.0);
            }

            if min_separation < -LINEAR_SLOP_SLEEP_MULTIPLIER * LINEAR_SLOP {
                island.solved = false;
            }
        }
    }

    pub fn reset(&mut self) {
        self.velocity_constraints.clear();
        self.position_constraints.clear();
    }
}

fn solve_block(a: &mut BodyData, b: &mut BodyData, normal: Vec2, points: &mut [VelocityConstraintPoint; 2], block: &Block) {
    let a_old = Vec2::new(points[0].normal_impulse, points[1].normal_impulse);
    debug_assert!(a_old.x >= 0.0 && a_old.y >= 0.0);

    let dv1 = relative_velocity(a, b, points[0].r_a, points[0].r_b);
    let dv2 = relative_velocity(a, b, points[1].r_a, points[1].r_b);

    let mut bias = Vec2::new(
        dv1.dot(normal) - points[0].velocity_bias,
        dv2.dot(normal) - points[1].velocity_bias,
    );
    bias -= Vec2::new(
        block.k11 * a_old.x + block.k12 * a_old.y,
        block.k12 * a_old.x + block.k22 * a_old.y,
    );

    // Case 1: both contacts active.
    let x = Vec2::new(
        -(block.inv11 * bias.x + block.inv12 * bias.y),
        -(block.inv21 * bias.x + block.inv22 * bias.y),
    );
    if x.x >= 0.0 && x.y >= 0.0 {
        apply_block(a, b, normal, points, a_old, x);
        return;
    }

    // Case 2: only point 0 active.
    let x0 = -points[0].normal_mass * bias.x;
    let vn2 = block.k12 * x0 + bias.y;
    if x0 >= 0.0 && vn2 >= 0.0 {
        apply_block(a, b, normal, points, a_old, Vec2::new(x0, 0.0));
        return;
    }

    // Case 3: only point 1 active.
    let x1 = -points[1].normal_mass * bias.y;
    let vn1 = block.k12 * x1 + bias.x;
    if x1 >= 0.0 && vn1 >= 0.0 {
        apply_block(a, b, normal, points, a_old, Vec2::new(0.0, x1));
        return;
    }

    // Case 4: neither contact active.
    if bias.x >= 0.0 && bias.y >= 0.0 {
        apply_block(a, b, normal, points, a_old, Vec2::ZERO);
    }
    // Otherwise no case holds; leave impulses unchanged this iteration.
}

fn apply_block(a: &mut BodyData, b: &mut BodyData, normal: Vec2, points: &mut [VelocityConstraintPoint; 2], a_old: Vec2, x: Vec2) {
    let d = x - a_old;
    let p1 = normal * d.x;
    let p2 = normal * d.y;
    apply_impulse(a, points[0].r_a, p1, -1.0);
    apply_impulse(a, points[1].r_a, p2, -1.0);
    apply_impulse(b, points[0].r_b, p1, 1.0);
    apply_impulse(b, points[1].r_b, p2, 1.0);
    points[0].normal_impulse = x.x;
    points[1].normal_impulse = x.y;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::narrowphase;
    use crate::collision::shapes::{Circle, Polygon, Shape};
    use crate::core::types::{BodyType, Material};
    use crate::core::ColliderData;
    use crate::dynamics::island::Island;
    use crate::utils::math::Rotation;
    use crate::utils::EntityAllocator;

    struct Fixture {
        bodies: BodySet,
        colliders: ColliderSet,
        pairs: Vec<ContactPair>,
        manifolds: Vec<LocalManifold>,
    }

    fn build_fixture(shape_a: Shape, xf_a: Transform2, shape_b: Shape, xf_b: Transform2, dynamic_mass: f32, dynamic_inertia: f32) -> Fixture {
        let mut alloc = EntityAllocator::new();
        let mut bodies = BodySet::new();
        let mut colliders = ColliderSet::new();

        let body_a = alloc.allocate();
        let mut a = BodyData::new(BodyType::Static, xf_a);
        a.set_mass_data(crate::core::types::MassData { mass: 0.0, inverse_mass: 0.0, inertia: 0.0, inverse_inertia: 0.0, local_center: Vec2::ZERO });
        bodies.insert_awake(body_a, a);

        let body_b = alloc.allocate();
        let mut b = BodyData::new(BodyType::Dynamic, xf_b);
        b.set_mass_data(crate::core::types::MassData {
            mass: dynamic_mass,
            inverse_mass: 1.0 / dynamic_mass,
            inertia: dynamic_inertia,
            inverse_inertia: if dynamic_inertia > 0.0 { 1.0 / dynamic_inertia } else { 0.0 },
            local_center: Vec2::ZERO,
        });
        bodies.insert_awake(body_b, b);

        let collider_a = alloc.allocate();
        let mut ca = ColliderData::new(body_a, shape_a.clone(), Transform2::identity(), Material::new(1.0, 0.3, 0.0));
        ca.sync_world_transform(&bodies.get(body_a).unwrap().transform());
        colliders.insert_awake(collider_a, ca);

        let collider_b = alloc.allocate();
        let mut cb = ColliderData::new(body_b, shape_b.clone(), Transform2::identity(), Material::new(1.0, 0.3, 0.0));
        cb.sync_world_transform(&bodies.get(body_b).unwrap().transform());
        colliders.insert_awake(collider_b, cb);

        let manifold = narrowphase::collide(&shape_a, &xf_a, &shape_b, &xf_b).expect("shapes must overlap for this fixture");
        let pair = ContactPair { pair_id: 0, body_a, body_b, collider_a, collider_b, manifold_index: 0, in_island: false };

        Fixture { bodies, colliders, pairs: vec![pair], manifolds: vec![manifold] }
    }

    #[test]
    fn single_point_normal_impulse_stops_approach() {
        let xf_a = Transform2::identity();
        let xf_b = Transform2::new(Vec2::new(0.0, 1.9), Rotation::IDENTITY);
        let mut fx = build_fixture(
            Shape::Circle(Circle { radius: 1.0, center: Vec2::ZERO }),
            xf_a,
            Shape::Circle(Circle { radius: 1.0, center: Vec2::ZERO }),
            xf_b,
            1.0,
            1.0,
        );
        fx.bodies.get_mut(fx.pairs[0].body_b).unwrap().constrained_linear_velocity = Vec2::new(0.0, -5.0);

        let mut solver = ContactSolver::new();
        solver.init(&mut fx.bodies, &fx.colliders, &fx.pairs, &fx.manifolds, 1.0, 1.0);
        for _ in 0..10 {
            solver.solve_velocity(&mut fx.bodies);
        }

        let vy = fx.bodies.get(fx.pairs[0].body_b).unwrap().constrained_linear_velocity.y;
        assert!(vy >= -1e-3, "normal impulse should have arrested the approach velocity, got vy={vy}");
    }

    #[test]
    fn two_point_manifold_uses_block_solver_and_keeps_both_impulses_nonnegative() {
        let xf_a = Transform2::identity();
        let xf_b = Transform2::new(Vec2::new(0.0, 1.999), Rotation::IDENTITY);
        let mut fx = build_fixture(
            Shape::Polygon(Polygon::box_half_extents(1.0, 1.0)),
            xf_a,
            Shape::Polygon(Polygon::box_half_extents(1.0, 1.0)),
            xf_b,
            1.0,
            1.0,
        );
        assert_eq!(fx.manifolds[0].count, 2, "stacked boxes should produce a 2-point manifold");
        fx.bodies.get_mut(fx.pairs[0].body_b).unwrap().constrained_linear_velocity = Vec2::new(0.0, -3.0);

        let mut solver = ContactSolver::new();
        solver.init(&mut fx.bodies, &fx.colliders, &fx.pairs, &fx.manifolds, 1.0, 1.0);
        for _ in 0..10 {
            solver.solve_velocity(&mut fx.bodies);
        }

        for vc in &solver.velocity_constraints {
            for point in &vc.points[..vc.count] {
                assert!(point.normal_impulse >= 0.0, "normal impulse must never go negative (no pulling contacts)");
            }
        }
        let vy = fx.bodies.get(fx.pairs[0].body_b).unwrap().constrained_linear_velocity.y;
        assert!(vy >= -1e-3, "block solver should have arrested the approach velocity, got vy={vy}");
    }

    #[test]
    fn position_solver_reduces_penetration() {
        let xf_a = Transform2::identity();
        let xf_b = Transform2::new(Vec2::new(0.0, 1.5), Rotation::IDENTITY);
        let mut fx = build_fixture(
            Shape::Circle(Circle { radius: 1.0, center: Vec2::ZERO }),
            xf_a,
            Shape::Circle(Circle { radius: 1.0, center: Vec2::ZERO }),
            xf_b,
            1.0,
            1.0,
        );

        let mut solver = ContactSolver::new();
        solver.init(&mut fx.bodies, &fx.colliders, &fx.pairs, &fx.manifolds, 1.0, 1.0);

        let mut island = Island { manifold_start: 0, manifold_count: 1, body_start: 0, body_count: 0, solved: true };
        let y_before = fx.bodies.get(fx.pairs[0].body_b).unwrap().constrained_position.y;
        for _ in 0..4 {
            solver.solve_position(&mut fx.bodies, &mut island);
        }
        let y_after = fx.bodies.get(fx.pairs[0].body_b).unwrap().constrained_position.y;

        assert!(y_after > y_before, "position solver should push the penetrating body apart, before={y_before} after={y_after}");
    }
}

fn position_world_manifold(
    pc: &PositionConstraint,
    xf_a: &Transform2,
    xf_b: &Transform2,
) -> (Vec2, [Option<(Vec2, f32)>; 2]) {
    match pc.kind {
        ManifoldType::Circles => {
            let point_a = xf_a.transform_point(pc.local_point);
            let point_b = xf_a.transform_point(pc.local_points[0]);
            let normal = (point_b - point_a).normalize_or_zero();
            let separation = (point_b - point_a).dot(normal) - pc.radius;
            let mid = point_a + (point_b - point_a) * 0.5;
            (normal, [Some((mid, separation)), None])
        }
        ManifoldType::FaceA | ManifoldType::FaceB => {
            let reference_xf = if pc.kind == ManifoldType::FaceA { xf_a } else { xf_b };
            let normal = reference_xf.transform_vector(pc.local_normal).normalize_or_zero();
            let plane_point = reference_xf.transform_point(pc.local_point);
            let mut out = [None, None];
            for i in 0..pc.count {
                let world_point = reference_xf.transform_point(pc.local_points[i]);
                let separation = (world_point - plane_point).dot(normal) - pc.radius;
                out[i] = Some((world_point, separation));
            }
            (normal, out)
        }
    }
}
