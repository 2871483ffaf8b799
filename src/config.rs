//! Tuning constants and the per-world [`Settings`] struct.

use crate::utils::math::Vec2;

/// Default gravity vector (Y-up).
pub const DEFAULT_GRAVITY: Vec2 = Vec2::new(0.0, -9.81);

/// Default fixed timestep (seconds).
pub const DEFAULT_TIME_STEP: f32 = 1.0 / 60.0;

/// Allowed penetration slop before the position solver starts correcting.
pub const LINEAR_SLOP: f32 = 0.005;

/// Baumgarte stabilization factor for the position solver.
pub const BAUMGARTE: f32 = 0.2;

/// Clamp on a single position-solver correction step.
pub const MAX_LINEAR_CORRECTION: f32 = 0.2;

/// Clamp on a single position-solver angular correction step.
pub const MAX_ANGULAR_CORRECTION: f32 = 8.0_f32 * std::f32::consts::PI / 180.0;

/// Fat-AABB inflation factor applied to a leaf's half-extents.
pub const AABB_FAT_INFLATION: f32 = 0.1;

/// Skin radius added around polygon/edge shapes.
pub const POLYGON_RADIUS: f32 = 0.005;

/// Minimum freed entity indices before one is handed back out.
pub const MIN_FREED_INDICES: usize = crate::utils::allocator::MIN_FREED_INDICES;

/// Condition-number threshold below which the 2-point block solver is trusted.
pub const MAX_BLOCK_CONDITION_NUMBER: f32 = 1000.0;

/// Per-step translation clamp (meters), to keep CCD-less integration sane.
pub const MAX_TRANSLATION: f32 = 2.0;

/// Per-step rotation clamp (radians).
pub const MAX_ROTATION: f32 = 0.5 * std::f32::consts::PI;

/// A manifold is an island sleep-blocker once its minimum separation is worse than this.
pub const LINEAR_SLOP_SLEEP_MULTIPLIER: f32 = 3.0;

/// Default collision category/filter bitmasks.
pub const DEFAULT_CATEGORY: u16 = 0x0001;
pub const DEFAULT_FILTER: u16 = 0xFFFF;

/// Per-world tunables, set at `World` construction and otherwise immutable.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub gravity: Vec2,
    pub default_restitution: f32,
    pub restitution_threshold: f32,
    pub default_friction: f32,
    pub sleeping_enabled: bool,
    pub sleep_linear_velocity: f32,
    pub sleep_angular_speed: f32,
    pub sleep_time: f32,
    pub velocity_iterations: u32,
    pub position_iterations: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            default_restitution: 0.5,
            restitution_threshold: 1.0,
            default_friction: 0.3,
            sleeping_enabled: true,
            sleep_linear_velocity: 0.02,
            sleep_angular_speed: 3.0_f32.to_radians(),
            sleep_time: 1.0,
            velocity_iterations: 10,
            position_iterations: 8,
        }
    }
}
