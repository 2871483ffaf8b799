//! The body component: pose, velocity, mass, and the solver-scratch fields the dynamics
//! stage reads and writes each step.

use crate::core::types::{BodyType, MassData};
use crate::utils::math::{Rotation, Transform2, Vec2};
use crate::utils::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BodyFlags {
    pub gravity_enabled: bool,
    pub allowed_to_sleep: bool,
    pub sleeping: bool,
    pub in_island: bool,
}

/// Per-body kinematic and mass state, plus frame-scoped solver scratch fields.
#[derive(Debug, Clone)]
pub struct BodyData {
    pub body_type: BodyType,
    pub position: Vec2,
    pub orientation: Rotation,
    pub linear_velocity: Vec2,
    pub angular_speed: f32,
    pub force: Vec2,
    pub torque: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub mass: f32,
    pub inverse_mass: f32,
    pub inertia: f32,
    pub inverse_inertia: f32,
    pub local_center: Vec2,
    pub world_center: Vec2,
    pub sleep_time: f32,
    pub flags: BodyFlags,
    pub colliders: Vec<Entity>,
    /// Contact-pair indices touching this body this frame; cleared at island end.
    pub contact_pairs: Vec<usize>,

    pub constrained_position: Vec2,
    pub constrained_orientation: Rotation,
    pub constrained_linear_velocity: Vec2,
    pub constrained_angular_speed: f32,
}

impl BodyData {
    pub fn new(body_type: BodyType, transform: Transform2) -> Self {
        let flags = match body_type {
            BodyType::Static => BodyFlags::default(),
            _ => BodyFlags { gravity_enabled: true, allowed_to_sleep: true, ..Default::default() },
        };
        Self {
            body_type,
            position: transform.position,
            orientation: transform.rotation,
            linear_velocity: Vec2::ZERO,
            angular_speed: 0.0,
            force: Vec2::ZERO,
            torque: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            mass: 0.0,
            inverse_mass: 0.0,
            inertia: 0.0,
            inverse_inertia: 0.0,
            local_center: Vec2::ZERO,
            world_center: transform.position,
            sleep_time: 0.0,
            flags,
            colliders: Vec::new(),
            contact_pairs: Vec::new(),
            constrained_position: transform.position,
            constrained_orientation: transform.rotation,
            constrained_linear_velocity: Vec2::ZERO,
            constrained_angular_speed: 0.0,
        }
    }

    pub fn transform(&self) -> Transform2 {
        Transform2::new(self.position, self.orientation)
    }

    pub fn is_static(&self) -> bool {
        self.body_type == BodyType::Static
    }

    pub fn is_sleeping(&self) -> bool {
        self.flags.sleeping
    }

    pub fn is_allowed_to_sleep(&self) -> bool {
        self.flags.allowed_to_sleep
    }

    pub fn gravity_enabled(&self) -> bool {
        self.flags.gravity_enabled
    }

    pub fn is_in_island(&self) -> bool {
        self.flags.in_island
    }

    pub fn set_in_island(&mut self, value: bool) {
        self.flags.in_island = value;
    }

    /// Wakes the body and resets its sleep-time accumulator. Static bodies are unaffected.
    pub fn wake(&mut self) {
        if self.is_static() {
            return;
        }
        self.flags.sleeping = false;
        self.sleep_time = 0.0;
    }

    pub fn sleep(&mut self) {
        self.flags.sleeping = true;
        self.linear_velocity = Vec2::ZERO;
        self.angular_speed = 0.0;
    }

    pub fn apply_force(&mut self, force: Vec2, world_point: Vec2) {
        if self.inverse_mass == 0.0 {
            return;
        }
        self.force += force;
        self.torque += (world_point - self.world_center).perp_dot(force);
        self.wake();
    }

    pub fn apply_force_to_center(&mut self, force: Vec2) {
        if self.inverse_mass == 0.0 {
            return;
        }
        self.force += force;
        self.wake();
    }

    pub fn apply_torque(&mut self, torque: f32) {
        if self.inverse_inertia == 0.0 {
            return;
        }
        self.torque += torque;
        self.wake();
    }

    pub fn clear_forces(&mut self) {
        self.force = Vec2::ZERO;
    }

    pub fn clear_torques(&mut self) {
        self.torque = 0.0;
    }

    /// Sets aggregated mass data, zeroing inverses for non-dynamic bodies.
    pub fn set_mass_data(&mut self, mass_data: MassData) {
        self.local_center = mass_data.local_center;
        if self.body_type == BodyType::Dynamic {
            self.mass = mass_data.mass;
            self.inverse_mass = mass_data.inverse_mass;
            self.inertia = mass_data.inertia;
            self.inverse_inertia = mass_data.inverse_inertia;
        } else {
            self.mass = 0.0;
            self.inverse_mass = 0.0;
            self.inertia = 0.0;
            self.inverse_inertia = 0.0;
        }
        self.world_center = self.position + self.orientation.rotate(self.local_center);
    }
}

pub type BodySet = crate::utils::PartitionedPool<BodyData>;
