//! Scenario: a settled, sleeping body wakes up and starts integrating again as soon as
//! a force is applied to it.

use impulse2d::collision::shapes::{Circle, Polygon};
use impulse2d::collision::Shape;
use impulse2d::core::types::{BodyType, Material};
use impulse2d::utils::math::{Rotation, Transform2, Vec2};
use impulse2d::{Settings, World};

#[test]
fn sleeping_body_wakes_and_integrates_on_force() {
    let mut settings = Settings::default();
    settings.gravity = Vec2::new(0.0, -10.0);
    let mut world = World::new(settings);

    let ground = world.create_body(BodyType::Static, Transform2::identity());
    world
        .add_collider(ground, Shape::Polygon(Polygon::box_half_extents(50.0, 1.0)), Transform2::identity(), Material::default())
        .unwrap();

    let body = world.create_body(BodyType::Dynamic, Transform2::new(Vec2::new(0.0, 2.0), Rotation::IDENTITY));
    world
        .add_collider(body, Shape::Circle(Circle { radius: 1.0, center: Vec2::ZERO }), Transform2::identity(), Material::new(1.0, 0.3, 0.0))
        .unwrap();
    world.set_mass_properties_using_colliders(body);

    for _ in 0..120 {
        world.step(1.0 / 60.0);
    }
    assert!(world.body(body).unwrap().is_sleeping(), "body should have settled to sleep");

    let y_before = world.body(body).unwrap().position.y;
    world.apply_force_to_center(body, Vec2::new(0.0, 500.0));
    assert!(!world.body(body).unwrap().is_sleeping(), "applying a force must wake the body immediately");

    world.step(1.0 / 60.0);
    assert!(world.body(body).unwrap().position.y > y_before, "an awake body under an upward force should integrate upward");
}
