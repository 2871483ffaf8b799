//! Collision detection: shapes, the dynamic AABB tree, broad/narrow phase, and the
//! frame-scoped contact pairs that feed the island builder and solver.

pub mod aabb;
pub mod broadphase;
pub mod clipping;
pub mod contact;
pub mod narrowphase;
pub mod pairs;
pub mod shapes;
pub mod tree;

pub use aabb::Aabb;
pub use broadphase::BroadPhase;
pub use contact::{CollisionDetection, ContactPair};
pub use narrowphase::{LocalManifold, ManifoldPoint, ManifoldType};
pub use pairs::{elegant_pair, OverlapPair, OverlapPairTable};
pub use shapes::{Circle, Edge, Polygon, Shape, ShapeKind};
