//! Per-step phase timing, grounded on the teacher's `PhysicsProfiler`, renamed and
//! retargeted at this crate's pipeline phases. Read-only; never required for correctness.

use std::time::{Duration, Instant};

#[derive(Debug, Default, Clone, Copy)]
pub struct StepProfile {
    pub broad_phase: Duration,
    pub narrow_phase: Duration,
    pub island_build: Duration,
    pub solver: Duration,
    pub integration: Duration,
    pub total: Duration,

    pub body_count: usize,
    pub contact_count: usize,
    pub island_count: usize,
}

impl StepProfile {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

pub struct ScopedTimer<'a> {
    start: Instant,
    output: &'a mut Duration,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(output: &'a mut Duration) -> Self {
        Self { start: Instant::now(), output }
    }
}

impl<'a> Drop for ScopedTimer<'a> {
    fn drop(&mut self) {
        *self.output += self.start.elapsed();
    }
}
