//! Scenario: two overlapping bodies whose collision categories/filters never match
//! should never produce a contact pair or wake each other.

use impulse2d::collision::shapes::Circle;
use impulse2d::collision::Shape;
use impulse2d::core::types::{BodyType, Material};
use impulse2d::core::CollisionFilter;
use impulse2d::utils::math::{Rotation, Transform2, Vec2};
use impulse2d::{Settings, World};

#[test]
fn non_matching_filters_never_collide() {
    let mut settings = Settings::default();
    settings.gravity = Vec2::new(0.0, -10.0);
    let mut world = World::new(settings);

    let a = world.create_body(BodyType::Dynamic, Transform2::new(Vec2::new(0.0, 0.0), Rotation::IDENTITY));
    let b = world.create_body(BodyType::Dynamic, Transform2::new(Vec2::new(0.3, 0.0), Rotation::IDENTITY));

    let ca = world.add_collider(a, Shape::Circle(Circle { radius: 1.0, center: Vec2::ZERO }), Transform2::identity(), Material::default()).unwrap();
    let cb = world.add_collider(b, Shape::Circle(Circle { radius: 1.0, center: Vec2::ZERO }), Transform2::identity(), Material::default()).unwrap();
    world.set_mass_properties_using_colliders(a);
    world.set_mass_properties_using_colliders(b);

    world.set_collider_filter(ca, CollisionFilter { category: 0x0001, filter: 0x0002 });
    world.set_collider_filter(cb, CollisionFilter { category: 0x0004, filter: 0xFFFF });

    // Both circles start overlapping and at rest under gravity alone. If the filter
    // correctly suppresses the contact, nothing ever pushes them apart sideways and
    // both simply free-fall straight down.
    for _ in 0..30 {
        world.step(1.0 / 60.0);
    }

    assert!(world.body(a).unwrap().linear_velocity.x.abs() < 1e-6, "filtered bodies must not exert contact forces on each other");
    assert!(world.body(b).unwrap().linear_velocity.x.abs() < 1e-6, "filtered bodies must not exert contact forces on each other");
    let fall_a = world.body(a).unwrap().linear_velocity.y;
    let fall_b = world.body(b).unwrap().linear_velocity.y;
    assert!((fall_a - fall_b).abs() < 1e-5, "unaffected free-falling bodies should share the same vertical velocity");
}
