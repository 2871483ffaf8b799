//! Shared component-level types: body kind, material, aggregated mass data.

use crate::utils::math::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    Static,
    Dynamic,
    Kinematic,
}

/// Per-collider material. Density must be > 0, friction >= 0, restitution in [0, 1].
#[derive(Debug, Clone, Copy)]
pub struct Material {
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self { density: 1.0, friction: 0.3, restitution: 0.5 }
    }
}

impl Material {
    pub fn new(density: f32, friction: f32, restitution: f32) -> Self {
        debug_assert!(density > 0.0, "collider density must be positive");
        debug_assert!(friction >= 0.0, "collider friction must be non-negative");
        debug_assert!((0.0..=1.0).contains(&restitution), "collider restitution must be in [0, 1]");
        Self { density, friction, restitution }
    }

    /// Mixes two materials the way the contact solver does: geometric-mean friction,
    /// max restitution.
    pub fn mix(a: &Material, b: &Material) -> (f32, f32) {
        let friction = (a.friction * b.friction).sqrt();
        let restitution = a.restitution.max(b.restitution);
        (friction, restitution)
    }
}

/// Aggregated mass properties for a body, summed over its colliders.
#[derive(Debug, Clone, Copy, Default)]
pub struct MassData {
    pub mass: f32,
    pub inverse_mass: f32,
    pub inertia: f32,
    pub inverse_inertia: f32,
    pub local_center: Vec2,
}

impl MassData {
    pub fn zero() -> Self {
        Self::default()
    }
}
