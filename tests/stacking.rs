//! Scenario: three boxes stacked on a static ground settle to rest with minimal drift.

use impulse2d::collision::shapes::Polygon;
use impulse2d::collision::Shape;
use impulse2d::core::types::{BodyType, Material};
use impulse2d::utils::math::{Rotation, Transform2, Vec2};
use impulse2d::{Settings, World};

fn spawn_box(world: &mut World, y: f32) -> impulse2d::Entity {
    let body = world.create_body(BodyType::Dynamic, Transform2::new(Vec2::new(0.0, y), Rotation::IDENTITY));
    world
        .add_collider(body, Shape::Polygon(Polygon::box_half_extents(1.0, 1.0)), Transform2::identity(), Material::new(1.0, 0.3, 0.0))
        .unwrap();
    world.set_mass_properties_using_colliders(body);
    body
}

#[test]
fn three_box_stack_settles_with_little_drift() {
    let mut settings = Settings::default();
    settings.gravity = Vec2::new(0.0, -10.0);
    let mut world = World::new(settings);

    let ground = world.create_body(BodyType::Static, Transform2::identity());
    world
        .add_collider(ground, Shape::Polygon(Polygon::box_half_extents(50.0, 1.0)), Transform2::identity(), Material::default())
        .unwrap();

    let bottom = spawn_box(&mut world, 1.0);
    let middle = spawn_box(&mut world, 3.0);
    let top = spawn_box(&mut world, 5.0);
    let top_start_x = world.body(top).unwrap().position.x;

    for _ in 0..300 {
        world.step(1.0 / 60.0);
    }

    for entity in [bottom, middle, top] {
        assert!(world.body(entity).unwrap().is_sleeping(), "every box should be asleep after settling");
    }

    let top_drift = (world.body(top).unwrap().position.x - top_start_x).abs();
    assert!(top_drift < 0.05, "top box drifted {top_drift} laterally");
}
