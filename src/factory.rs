//! Shape construction: boxes, circles, and welded convex polygons from an input point
//! cloud. Shapes are value types; nothing here is arena-owned.

use crate::collision::shapes::{Circle, Polygon};
use crate::collision::Shape;
use crate::config::Settings;
use crate::utils::math::Vec2;
use crate::world::World;

/// Weld tolerance for `create_polygon`: points closer than this to an already-kept hull
/// vertex are merged into it before the hull is built.
const WELD_TOLERANCE: f32 = 0.005;

/// Builds a `World` and constructs the shapes it will be populated with. Stateless
/// beyond the weld tolerance; exists mainly to mirror the source's C-style entry point.
#[derive(Debug, Default, Clone, Copy)]
pub struct Factory;

impl Factory {
    pub fn new() -> Self {
        Self
    }

    pub fn create_world(&self, settings: Settings) -> World {
        World::new(settings)
    }

    pub fn create_box(&self, hx: f32, hy: f32) -> Shape {
        debug_assert!(hx > 0.0 && hy > 0.0, "box half-extents must be positive");
        Shape::Polygon(Polygon::box_half_extents(hx, hy))
    }

    pub fn create_circle(&self, radius: f32) -> Shape {
        debug_assert!(radius > 0.0, "circle radius must be positive");
        Shape::Circle(Circle { radius, center: Vec2::ZERO })
    }

    /// Welds near-duplicate points, runs a QuickHull, and returns a convex polygon of at
    /// most [`crate::collision::shapes::MAX_POLYGON_VERTICES`] vertices. `None` if fewer
    /// than 3 vertices survive welding or the hull degenerates to a line.
    pub fn create_polygon(&self, points: &[Vec2]) -> Option<Shape> {
        if points.len() < 3 {
            return None;
        }
        let welded = weld(points, WELD_TOLERANCE);
        if welded.len() < 3 {
            return None;
        }
        let hull = quickhull(&welded)?;
        Polygon::from_convex_hull(&hull).map(Shape::Polygon)
    }
}

/// Merges points within `tolerance` of an already-kept point.
fn weld(points: &[Vec2], tolerance: f32) -> Vec<Vec2> {
    let mut kept: Vec<Vec2> = Vec::with_capacity(points.len());
    for &p in points {
        if !kept.iter().any(|&k| (k - p).length_squared() < tolerance * tolerance) {
            kept.push(p);
        }
    }
    kept
}

/// Andrew's monotone chain convex hull, CCW-wound. Returns `None` for collinear input
/// or a hull that exceeds the engine's vertex cap.
fn quickhull(points: &[Vec2]) -> Option<Vec<Vec2>> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap().then(a.y.partial_cmp(&b.y).unwrap()));
    sorted.dedup_by(|a, b| (*a - *b).length_squared() < 1e-12);
    if sorted.len() < 3 {
        return None;
    }

    let cross = |o: Vec2, a: Vec2, b: Vec2| (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x);

    let mut lower: Vec<Vec2> = Vec::new();
    for &p in &sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Vec2> = Vec::new();
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);

    if lower.len() < 3 || lower.len() > crate::collision::shapes::MAX_POLYGON_VERTICES {
        return None;
    }
    Some(lower)
}
