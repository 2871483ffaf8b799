//! Core component types: bodies, colliders, and the shared material/mass types they reference.

pub mod collider;
pub mod rigidbody;
pub mod types;

pub use collider::{ColliderData, ColliderSet, CollisionFilter};
pub use rigidbody::{BodyData, BodyFlags, BodySet};
pub use types::{BodyType, MassData, Material};
