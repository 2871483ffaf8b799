//! 2D math helpers layered on top of `glam`. Orientation is always carried as a
//! `(sin, cos)` pair and never as a raw angle in a hot path.

pub use glam::Vec2;

/// 2D rigid orientation stored as `(sin, cos)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    pub sin: f32,
    pub cos: f32,
}

impl Default for Rotation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Rotation {
    pub const IDENTITY: Rotation = Rotation { sin: 0.0, cos: 1.0 };

    pub fn from_angle(angle: f32) -> Self {
        Self { sin: angle.sin(), cos: angle.cos() }
    }

    pub fn angle(&self) -> f32 {
        self.sin.atan2(self.cos)
    }

    /// Rotates `v` by this orientation.
    pub fn rotate(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.cos * v.x - self.sin * v.y, self.sin * v.x + self.cos * v.y)
    }

    /// Rotates `v` by the inverse of this orientation.
    pub fn inverse_rotate(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.cos * v.x + self.sin * v.y, -self.sin * v.x + self.cos * v.y)
    }

    /// Integrates this orientation forward by an angular speed over `dt`, renormalizing.
    pub fn integrate(&self, angular_speed: f32, dt: f32) -> Rotation {
        let mut sin = self.sin + angular_speed * dt * self.cos;
        let mut cos = self.cos - angular_speed * dt * self.sin;
        let mag = (sin * sin + cos * cos).sqrt();
        let inv = if mag > 0.0 { 1.0 / mag } else { 0.0 };
        sin *= inv;
        cos *= inv;
        Rotation { sin, cos }
    }

    pub fn mul(&self, other: &Rotation) -> Rotation {
        Rotation {
            sin: self.sin * other.cos + self.cos * other.sin,
            cos: self.cos * other.cos - self.sin * other.sin,
        }
    }
}

/// A 2D rigid transform: position plus orientation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transform2 {
    pub position: Vec2,
    pub rotation: Rotation,
}

impl Transform2 {
    pub fn new(position: Vec2, rotation: Rotation) -> Self {
        Self { position, rotation }
    }

    pub fn identity() -> Self {
        Self::default()
    }

    /// Maps a point from local space to world space.
    pub fn transform_point(&self, local: Vec2) -> Vec2 {
        self.position + self.rotation.rotate(local)
    }

    /// Maps a point from world space to local space.
    pub fn inverse_transform_point(&self, world: Vec2) -> Vec2 {
        self.rotation.inverse_rotate(world - self.position)
    }

    /// Maps a direction vector from local space to world space.
    pub fn transform_vector(&self, local: Vec2) -> Vec2 {
        self.rotation.rotate(local)
    }

    pub fn inverse_transform_vector(&self, world: Vec2) -> Vec2 {
        self.rotation.inverse_rotate(world)
    }

    /// Composes `self * other`: express `other`'s local frame in `self`'s space.
    pub fn combine(&self, other: &Transform2) -> Transform2 {
        Transform2 {
            position: self.transform_point(other.position),
            rotation: self.rotation.mul(&other.rotation),
        }
    }

    pub fn inverse(&self) -> Transform2 {
        let inv_rotation = Rotation { sin: -self.rotation.sin, cos: self.rotation.cos };
        Transform2 { position: self.rotation.inverse_rotate(-self.position), rotation: inv_rotation }
    }
}

/// Expresses `other` in `base`'s local frame: `base.combine(relative_transform(base, other)) == other`.
pub fn relative_transform(base: &Transform2, other: &Transform2) -> Transform2 {
    base.inverse().combine(other)
}

/// 2D scalar cross product: `a.x * b.y - a.y * b.x`.
#[inline]
pub fn cross2(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Cross of a scalar (out-of-plane angular quantity) with a 2D vector: `s * perp(v)`.
#[inline]
pub fn cross_scalar_vec(s: f32, v: Vec2) -> Vec2 {
    Vec2::new(-s * v.y, s * v.x)
}

/// Cross of a 2D vector with a scalar: `perp(v) * -s`, i.e. `v x s`.
#[inline]
pub fn cross_vec_scalar(v: Vec2, s: f32) -> Vec2 {
    Vec2::new(s * v.y, -s * v.x)
}

/// The right-hand perpendicular of `v` (rotate -90 degrees).
#[inline]
pub fn right_perp(v: Vec2) -> Vec2 {
    Vec2::new(v.y, -v.x)
}
