//! The dynamics stage: gravity/damping velocity integration, clamped symplectic
//! position integration, and write-back of the solver's constrained state.

use crate::config::{MAX_ROTATION, MAX_TRANSLATION};
use crate::core::{BodySet, BodyType, ColliderSet};
use crate::utils::math::{Transform2, Vec2};

/// Stateless stepping logic shared by every body in the set; owns no per-body data.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dynamics;

impl Dynamics {
    pub fn new() -> Self {
        Self
    }

    /// Copies each awake body's current pose into its constrained scratch fields.
    pub fn init_constraints(&self, bodies: &mut BodySet) {
        for body in bodies.awake_slice_mut() {
            body.constrained_position = body.world_center;
            body.constrained_orientation = body.orientation;
            body.constrained_linear_velocity = body.linear_velocity;
            body.constrained_angular_speed = body.angular_speed;
        }
    }

    /// `v' = v + dt*(F/m + g)`, `w' = w + dt*tau/I`, then multiplies by `1/(1+damping*dt)`.
    pub fn integrate_velocities(&self, bodies: &mut BodySet, gravity: Vec2, dt: f32) {
        for body in bodies.awake_slice_mut() {
            if body.body_type != BodyType::Dynamic {
                continue;
            }
            let g = if body.gravity_enabled() { gravity } else { Vec2::ZERO };
            body.constrained_linear_velocity += dt * (body.force * body.inverse_mass + g);
            body.constrained_angular_speed += dt * body.torque * body.inverse_inertia;

            body.constrained_linear_velocity *= 1.0 / (1.0 + body.linear_damping * dt);
            body.constrained_angular_speed *= 1.0 / (1.0 + body.angular_damping * dt);
        }
    }

    /// `p' = p + dt*v`, `theta' = theta + dt*w`, clamping the per-step displacement.
    pub fn integrate_positions(&self, bodies: &mut BodySet, dt: f32) {
        for body in bodies.awake_slice_mut() {
            if body.body_type == BodyType::Static {
                continue;
            }
            let mut v = body.constrained_linear_velocity;
            let mut w = body.constrained_angular_speed;

            let translation = dt * v;
            if translation.length_squared() > MAX_TRANSLATION * MAX_TRANSLATION {
                v *= MAX_TRANSLATION / translation.length();
            }
            let rotation = dt * w;
            if rotation.abs() > MAX_ROTATION {
                w *= MAX_ROTATION / rotation.abs();
            }

            body.constrained_linear_velocity = v;
            body.constrained_angular_speed = w;
            body.constrained_position += dt * v;
            body.constrained_orientation = body.constrained_orientation.integrate(w, dt);
        }
    }

    /// Commits the solver's constrained state back into each body's canonical pose and
    /// velocity, then re-syncs every collider's world transform.
    pub fn write_back(&self, bodies: &mut BodySet, colliders: &mut ColliderSet) {
        for body in bodies.awake_slice_mut() {
            body.world_center = body.constrained_position;
            body.orientation = body.constrained_orientation;
            body.position = body.world_center - body.orientation.rotate(body.local_center);
            body.linear_velocity = body.constrained_linear_velocity;
            body.angular_speed = body.constrained_angular_speed;
        }
        for (_, collider) in colliders.iter_mut() {
            if let Some(body) = bodies.get(collider.body) {
                if !body.is_sleeping() {
                    collider.sync_world_transform(&Transform2::new(body.position, body.orientation));
                }
            }
        }
    }

    /// Clears per-step force/torque accumulators on every awake body.
    pub fn clear_external_stimuli(&self, bodies: &mut BodySet) {
        for body in bodies.awake_slice_mut() {
            body.clear_forces();
            body.clear_torques();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BodyData;
    use crate::utils::EntityAllocator;

    fn dynamic_body() -> BodyData {
        let mut b = BodyData::new(BodyType::Dynamic, Transform2::identity());
        b.inverse_mass = 1.0;
        b.mass = 1.0;
        b.inverse_inertia = 1.0;
        b.inertia = 1.0;
        b
    }

    #[test]
    fn gravity_accelerates_constrained_velocity() {
        let mut bodies = BodySet::new();
        let mut alloc = EntityAllocator::new();
        let e = alloc.allocate();
        bodies.insert_awake(e, dynamic_body());

        let dynamics = Dynamics::new();
        dynamics.init_constraints(&mut bodies);
        dynamics.integrate_velocities(&mut bodies, Vec2::new(0.0, -10.0), 1.0 / 60.0);

        let v = bodies.get(e).unwrap().constrained_linear_velocity;
        assert!(v.y < 0.0);
    }

    #[test]
    fn damping_attenuates_velocity_smoothly() {
        let mut bodies = BodySet::new();
        let mut alloc = EntityAllocator::new();
        let e = alloc.allocate();
        let mut body = dynamic_body();
        body.linear_velocity = Vec2::new(10.0, 0.0);
        body.linear_damping = 2.0;
        bodies.insert_awake(e, body);

        let dynamics = Dynamics::new();
        dynamics.init_constraints(&mut bodies);
        dynamics.integrate_velocities(&mut bodies, Vec2::ZERO, 1.0 / 60.0);

        let v = bodies.get(e).unwrap().constrained_linear_velocity.x;
        let dt = 1.0 / 60.0_f32;
        let expected = 10.0 / (1.0 + 2.0 * dt);
        assert!((v - expected).abs() < 1e-5);
    }

    #[test]
    fn large_velocity_is_clamped_before_position_integration() {
        let mut bodies = BodySet::new();
        let mut alloc = EntityAllocator::new();
        let e = alloc.allocate();
        let mut body = dynamic_body();
        body.linear_velocity = Vec2::new(10_000.0, 0.0);
        bodies.insert_awake(e, body);

        let dynamics = Dynamics::new();
        dynamics.init_constraints(&mut bodies);
        dynamics.integrate_positions(&mut bodies, 1.0 / 60.0);

        let translation = bodies.get(e).unwrap().constrained_position;
        assert!(translation.x <= MAX_TRANSLATION + 1e-4);
    }
}
