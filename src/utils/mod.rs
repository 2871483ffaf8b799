//! Utility helpers: entity allocation/storage, 2D math extensions, logging, profiling.

pub mod allocator;
pub mod logging;
pub mod math;
pub mod profiling;

pub use allocator::{Entity, EntityAllocator, PartitionedPool};
pub use math::*;
