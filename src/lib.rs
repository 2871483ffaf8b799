//! impulse2d - a 2D rigid-body physics engine.
//!
//! Dynamic AABB tree broad phase, circle/polygon narrow phase, island-based
//! sequential-impulse contact solver with warm starting, symplectic integration, and
//! sleeping. Entities are stable handles into partitioned component pools; there are no
//! owning pointers between bodies, colliders, and shapes.

pub mod collision;
pub mod config;
pub mod core;
pub mod dynamics;
pub mod factory;
pub mod utils;
pub mod world;

pub use collision::{BroadPhase, Circle, CollisionDetection, ContactPair, Edge, Polygon, Shape, ShapeKind};
pub use config::Settings;
pub use core::{BodyData, BodyFlags, BodySet, BodyType, ColliderData, ColliderSet, CollisionFilter, MassData, Material};
pub use dynamics::{ContactSolver, Dynamics, Island, IslandBuilder};
pub use factory::Factory;
pub use utils::{Entity, EntityAllocator, PartitionedPool};
pub use world::World;
