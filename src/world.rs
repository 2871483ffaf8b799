//! The top-level simulation orchestrator. Owns every component pool and pipeline stage
//! and drives the fixed sequence in `step`.

use crate::collision::{CollisionDetection, Shape};
use crate::config::Settings;
use crate::core::{BodyData, BodySet, BodyType, ColliderData, ColliderSet, CollisionFilter};
use crate::core::types::{MassData, Material};
use crate::dynamics::{ContactSolver, Dynamics, IslandBuilder};
use crate::utils::logging::ScopedTimer as TraceTimer;
use crate::utils::math::Transform2;
use crate::utils::profiling::{ScopedTimer as ProfileTimer, StepProfile};
use crate::utils::{Entity, EntityAllocator};

/// Owns the bodies, colliders, and pipeline stages for one simulation. Entities created
/// by one `World` must not be used with another.
pub struct World {
    settings: Settings,
    allocator: EntityAllocator,
    bodies: BodySet,
    colliders: ColliderSet,
    collision: CollisionDetection,
    islands: IslandBuilder,
    dynamics: Dynamics,
    solver: ContactSolver,
    last_dt: f32,
    profile: StepProfile,
}

impl World {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            allocator: EntityAllocator::new(),
            bodies: BodySet::new(),
            colliders: ColliderSet::new(),
            collision: CollisionDetection::new(),
            islands: IslandBuilder::new(),
            dynamics: Dynamics::new(),
            solver: ContactSolver::new(),
            last_dt: crate::config::DEFAULT_TIME_STEP,
            profile: StepProfile::default(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Per-phase timings and counts from the most recent `step` call.
    pub fn profile(&self) -> &StepProfile {
        &self.profile
    }

    // ---- body lifecycle -------------------------------------------------

    pub fn create_body(&mut self, body_type: BodyType, transform: Transform2) -> Entity {
        let entity = self.allocator.allocate();
        self.bodies.insert_awake(entity, BodyData::new(body_type, transform));
        entity
    }

    /// Removes a body and every collider it owns.
    pub fn destroy_body(&mut self, entity: Entity) {
        let Some(body) = self.bodies.get(entity) else { return };
        let colliders: Vec<Entity> = body.colliders.clone();
        for collider in colliders {
            self.remove_collider(collider);
        }
        self.bodies.remove(entity);
        self.allocator.free(entity);
    }

    pub fn body(&self, entity: Entity) -> Option<&BodyData> {
        self.bodies.get(entity)
    }

    pub fn bodies(&self) -> &BodySet {
        &self.bodies
    }

    pub fn colliders(&self) -> &ColliderSet {
        &self.colliders
    }

    /// Wakes a body, moving its slot across the awake/sleeping partition if needed.
    fn wake_body(&mut self, entity: Entity) {
        if let Some(body) = self.bodies.get_mut(entity) {
            if body.is_static() {
                return;
            }
            body.wake();
        }
        self.bodies.set_awake(entity, true);
    }

    pub fn set_transform(&mut self, entity: Entity, transform: Transform2) {
        if let Some(body) = self.bodies.get_mut(entity) {
            body.position = transform.position;
            body.orientation = transform.rotation;
            body.world_center = transform.position + transform.rotation.rotate(body.local_center);
        }
        self.wake_body(entity);
        if let Some(body) = self.bodies.get(entity) {
            let world_transform = body.transform();
            for &collider_entity in &body.colliders.clone() {
                if let Some(collider) = self.colliders.get_mut(collider_entity) {
                    collider.sync_world_transform(&world_transform);
                }
            }
        }
    }

    pub fn set_linear_velocity(&mut self, entity: Entity, velocity: crate::utils::math::Vec2) {
        if let Some(body) = self.bodies.get_mut(entity) {
            body.linear_velocity = velocity;
        }
        self.wake_body(entity);
    }

    pub fn set_angular_speed(&mut self, entity: Entity, speed: f32) {
        if let Some(body) = self.bodies.get_mut(entity) {
            body.angular_speed = speed;
        }
        self.wake_body(entity);
    }

    pub fn set_damping(&mut self, entity: Entity, linear: f32, angular: f32) {
        if let Some(body) = self.bodies.get_mut(entity) {
            body.linear_damping = linear;
            body.angular_damping = angular;
        }
    }

    pub fn set_gravity_enabled(&mut self, entity: Entity, enabled: bool) {
        if let Some(body) = self.bodies.get_mut(entity) {
            body.flags.gravity_enabled = enabled;
        }
        self.wake_body(entity);
    }

    pub fn set_allowed_to_sleep(&mut self, entity: Entity, allowed: bool) {
        if let Some(body) = self.bodies.get_mut(entity) {
            body.flags.allowed_to_sleep = allowed;
            if !allowed {
                body.sleep_time = 0.0;
            }
        }
        if !allowed {
            self.wake_body(entity);
        }
    }

    pub fn set_body_type(&mut self, entity: Entity, body_type: BodyType) {
        if let Some(body) = self.bodies.get_mut(entity) {
            body.body_type = body_type;
            if body_type != BodyType::Dynamic {
                body.mass = 0.0;
                body.inverse_mass = 0.0;
                body.inertia = 0.0;
                body.inverse_inertia = 0.0;
            }
        }
        self.wake_body(entity);
    }

    pub fn apply_force(&mut self, entity: Entity, force: crate::utils::math::Vec2, world_point: crate::utils::math::Vec2) {
        if let Some(body) = self.bodies.get_mut(entity) {
            body.apply_force(force, world_point);
        }
        self.bodies.set_awake(entity, true);
    }

    pub fn apply_force_to_center(&mut self, entity: Entity, force: crate::utils::math::Vec2) {
        if let Some(body) = self.bodies.get_mut(entity) {
            body.apply_force_to_center(force);
        }
        self.bodies.set_awake(entity, true);
    }

    pub fn apply_torque(&mut self, entity: Entity, torque: f32) {
        if let Some(body) = self.bodies.get_mut(entity) {
            body.apply_torque(torque);
        }
        self.bodies.set_awake(entity, true);
    }

    pub fn clear_forces(&mut self, entity: Entity) {
        if let Some(body) = self.bodies.get_mut(entity) {
            body.clear_forces();
        }
    }

    pub fn clear_torques(&mut self, entity: Entity) {
        if let Some(body) = self.bodies.get_mut(entity) {
            body.clear_torques();
        }
    }

    // ---- colliders --------------------------------------------------------

    pub fn add_collider(&mut self, body: Entity, shape: Shape, local_transform: Transform2, material: Material) -> Option<Entity> {
        let body_transform = self.bodies.get(body)?.transform();
        let entity = self.allocator.allocate();
        let mut collider = ColliderData::new(body, shape, local_transform, material);
        collider.sync_world_transform(&body_transform);
        self.colliders.insert_awake(entity, collider);
        self.collision.register_collider(&mut self.colliders, entity);
        if let Some(owner) = self.bodies.get_mut(body) {
            owner.colliders.push(entity);
        }
        self.wake_body(body);
        Some(entity)
    }

    pub fn remove_collider(&mut self, entity: Entity) {
        let Some(collider) = self.colliders.get(entity) else { return };
        let tree_id = collider.tree_id;
        let owner = collider.body;
        self.collision.remove_collider(tree_id);
        self.colliders.remove(entity);
        if let Some(body) = self.bodies.get_mut(owner) {
            body.colliders.retain(|&c| c != entity);
        }
        self.wake_body(owner);
    }

    pub fn collider(&self, entity: Entity) -> Option<&ColliderData> {
        self.colliders.get(entity)
    }

    pub fn set_collider_filter(&mut self, entity: Entity, filter: CollisionFilter) {
        if let Some(collider) = self.colliders.get_mut(entity) {
            collider.filter = filter;
        }
    }

    pub fn set_collider_material(&mut self, entity: Entity, material: Material) {
        if let Some(collider) = self.colliders.get_mut(entity) {
            collider.material = material;
        }
    }

    /// Sums `density*area`-weighted mass, centroid, and parallel-axis-shifted inertia
    /// over the body's colliders. Static/kinematic bodies always report zero.
    pub fn set_mass_properties_using_colliders(&mut self, entity: Entity) {
        let Some(body) = self.bodies.get(entity) else { return };
        if body.body_type != BodyType::Dynamic {
            if let Some(body) = self.bodies.get_mut(entity) {
                body.set_mass_data(MassData::zero());
            }
            return;
        }

        let collider_entities = body.colliders.clone();
        let mut total_mass = 0.0_f32;
        let mut center = crate::utils::math::Vec2::ZERO;
        let mut total_inertia = 0.0_f32;
        let mut per_shape = Vec::with_capacity(collider_entities.len());

        for collider_entity in &collider_entities {
            let Some(collider) = self.colliders.get(*collider_entity) else { continue };
            let mass_data = collider.shape.compute_mass(collider.material.density);
            let local_center = collider.local_transform.transform_point(mass_data.local_center);
            total_mass += mass_data.mass;
            center += mass_data.mass * local_center;
            per_shape.push((mass_data, local_center));
        }

        if total_mass > 0.0 {
            center /= total_mass;
        } else {
            total_mass = 1.0;
        }

        for (mass_data, local_center) in &per_shape {
            let offset = *local_center - center;
            total_inertia += mass_data.inertia + mass_data.mass * offset.dot(offset);
        }

        let inverse_mass = if total_mass > 0.0 { 1.0 / total_mass } else { 0.0 };
        let inverse_inertia = if total_inertia > 0.0 { 1.0 / total_inertia } else { 0.0 };

        if let Some(body) = self.bodies.get_mut(entity) {
            body.set_mass_data(MassData {
                mass: total_mass,
                inverse_mass,
                inertia: total_inertia,
                inverse_inertia,
                local_center: center,
            });
        }
    }

    // ---- simulation ---------------------------------------------------------

    /// Advances the simulation by exactly `dt` seconds, running the full collision ->
    /// island -> solve -> integrate -> sleep pipeline once.
    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.profile.reset();
        let _total_trace = TraceTimer::new("world_step");
        let total_start = std::time::Instant::now();

        self.collision.run(&self.colliders, &mut self.bodies);
        self.profile.broad_phase = self.collision.last_broad_phase_time();
        self.profile.narrow_phase = self.collision.last_narrow_phase_time();

        {
            let _trace = TraceTimer::new("island_build");
            let _prof = ProfileTimer::new(&mut self.profile.island_build);
            self.islands.build(&mut self.bodies, self.collision.pairs_mut());
        }
        self.collision.prepare_for_solver(&self.islands.ordered_pair_indices);

        self.dynamics.init_constraints(&mut self.bodies);
        self.dynamics.integrate_velocities(&mut self.bodies, self.settings.gravity, dt);

        let dt_ratio = if self.last_dt > 0.0 { dt / self.last_dt } else { 1.0 };
        {
            let _trace = TraceTimer::new("solver");
            let _prof = ProfileTimer::new(&mut self.profile.solver);

            self.solver.init(
                &mut self.bodies,
                &self.colliders,
                &self.collision.ordered_pairs,
                &self.collision.ordered_manifolds,
                self.settings.restitution_threshold,
                dt_ratio,
            );
            for _ in 0..self.settings.velocity_iterations {
                self.solver.solve_velocity(&mut self.bodies);
            }
            self.solver.store_impulses(&mut self.collision.ordered_manifolds);
        }

        {
            let _trace = TraceTimer::new("integration");
            let _prof = ProfileTimer::new(&mut self.profile.integration);
            self.dynamics.integrate_positions(&mut self.bodies, dt);
        }

        {
            let _trace = TraceTimer::new("solver");
            let _prof = ProfileTimer::new(&mut self.profile.solver);
            for _ in 0..self.settings.position_iterations {
                for island in &mut self.islands.islands {
                    self.solver.solve_position(&mut self.bodies, island);
                }
            }
            self.solver.reset();
        }

        self.dynamics.write_back(&mut self.bodies, &mut self.colliders);
        self.collision.update_colliders(&mut self.colliders, &self.bodies);

        if self.settings.sleeping_enabled {
            self.sleep_bodies(dt);
        }

        self.dynamics.clear_external_stimuli(&mut self.bodies);
        self.islands.reset(&mut self.bodies);
        self.last_dt = dt;

        self.profile.body_count = self.bodies.len();
        self.profile.contact_count = self.collision.ordered_pairs.len();
        self.profile.island_count = self.islands.islands.len();
        self.profile.total = total_start.elapsed();
    }

    /// Per spec: accumulates each island's minimum sleep time and puts every body in an
    /// island to sleep once that minimum clears `sleepTime` and the island `solved`.
    fn sleep_bodies(&mut self, dt: f32) {
        let sleep_linear_sq = self.settings.sleep_linear_velocity * self.settings.sleep_linear_velocity;
        let sleep_angular_sq = self.settings.sleep_angular_speed * self.settings.sleep_angular_speed;

        for island in &self.islands.islands {
            let mut min_sleep_time = f32::MAX;
            for &entity in &self.islands.ordered_bodies[island.body_range()] {
                let Some(body) = self.bodies.get_mut(entity) else { continue };
                if body.is_static() {
                    continue;
                }
                let too_fast = body.linear_velocity.length_squared() > sleep_linear_sq
                    || body.angular_speed * body.angular_speed > sleep_angular_sq;
                if !body.is_allowed_to_sleep() || too_fast {
                    body.sleep_time = 0.0;
                    min_sleep_time = 0.0;
                } else {
                    body.sleep_time += dt;
                    min_sleep_time = min_sleep_time.min(body.sleep_time);
                }
            }

            if island.solved && min_sleep_time >= self.settings.sleep_time {
                for &entity in &self.islands.ordered_bodies[island.body_range()] {
                    let is_static = match self.bodies.get_mut(entity) {
                        Some(body) if !body.is_static() => {
                            body.sleep();
                            false
                        }
                        _ => true,
                    };
                    if !is_static {
                        self.bodies.set_awake(entity, false);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::shapes::{Circle, Polygon};
    use crate::utils::math::{Rotation, Vec2};

    fn circle_body(world: &mut World, y: f32) -> Entity {
        let body = world.create_body(BodyType::Dynamic, Transform2::new(Vec2::new(0.0, y), Rotation::IDENTITY));
        world
            .add_collider(body, Shape::Circle(Circle { radius: 1.0, center: Vec2::ZERO }), Transform2::identity(), Material::new(1.0, 0.0, 0.0))
            .unwrap();
        world.set_mass_properties_using_colliders(body);
        body
    }

    #[test]
    fn circles_come_to_rest_on_static_ground_and_sleep() {
        let mut settings = Settings::default();
        settings.gravity = Vec2::new(0.0, -10.0);
        let mut world = World::new(settings);

        let ground = world.create_body(BodyType::Static, Transform2::identity());
        world
            .add_collider(ground, Shape::Polygon(Polygon::box_half_extents(50.0, 1.0)), Transform2::identity(), Material::default())
            .unwrap();

        let a = circle_body(&mut world, 2.0);
        let b = circle_body(&mut world, 4.0);

        for _ in 0..240 {
            world.step(1.0 / 60.0);
        }

        assert!(world.body(a).unwrap().is_sleeping());
        assert!(world.body(b).unwrap().is_sleeping());
        assert!(world.body(a).unwrap().linear_velocity.length() < 0.02);
    }

    #[test]
    fn filtered_colliders_never_touch() {
        let mut settings = Settings::default();
        settings.gravity = Vec2::new(0.0, -10.0);
        let mut world = World::new(settings);
        let a = world.create_body(BodyType::Dynamic, Transform2::new(Vec2::new(0.0, 0.0), Rotation::IDENTITY));
        let b = world.create_body(BodyType::Dynamic, Transform2::new(Vec2::new(0.5, 0.0), Rotation::IDENTITY));

        let ca = world.add_collider(a, Shape::Circle(Circle { radius: 1.0, center: Vec2::ZERO }), Transform2::identity(), Material::default()).unwrap();
        let cb = world.add_collider(b, Shape::Circle(Circle { radius: 1.0, center: Vec2::ZERO }), Transform2::identity(), Material::default()).unwrap();
        world.set_mass_properties_using_colliders(a);
        world.set_mass_properties_using_colliders(b);
        world.set_collider_filter(ca, CollisionFilter { category: 0x0001, filter: 0x0002 });
        world.set_collider_filter(cb, CollisionFilter { category: 0x0004, filter: 0xFFFF });

        // Both circles start heavily overlapping. If the filter suppresses the contact as
        // it should, nothing ever pushes them apart and both simply free-fall together.
        for _ in 0..10 {
            world.step(1.0 / 60.0);
        }

        let vel_a = world.body(a).unwrap().linear_velocity;
        let vel_b = world.body(b).unwrap().linear_velocity;
        assert!((vel_a.x - vel_b.x).abs() < 1e-6, "filtered-out bodies must not push each other apart horizontally");
        assert!((vel_a.y - vel_b.y).abs() < 1e-6, "filtered-out bodies should share the same free-fall velocity");
    }

    #[test]
    fn sleeping_body_wakes_on_force() {
        let mut settings = Settings::default();
        settings.gravity = Vec2::ZERO;
        let mut world = World::new(settings);
        let body = circle_body(&mut world, 0.0);

        world.bodies.get_mut(body).unwrap().sleep();
        world.bodies.set_awake(body, false);
        assert!(world.body(body).unwrap().is_sleeping());

        world.apply_force_to_center(body, Vec2::new(0.0, 10.0));
        assert!(!world.body(body).unwrap().is_sleeping());
    }
}
