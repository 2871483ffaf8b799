//! The shape tagged union: Circle, Polygon (<= 8 vertices, includes boxes), Edge.
//! Dispatch in the narrow phase is by matching on this enum, never virtual calls.

use crate::collision::aabb::Aabb;
use crate::config::POLYGON_RADIUS;
use crate::core::types::MassData;
use crate::utils::math::{cross2, Transform2, Vec2};

pub const MAX_POLYGON_VERTICES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShapeKind {
    Circle = 0,
    Polygon = 1,
    Edge = 2,
}

#[derive(Debug, Clone)]
pub struct Circle {
    pub radius: f32,
    pub center: Vec2,
}

#[derive(Debug, Clone)]
pub struct Polygon {
    pub radius: f32,
    pub count: usize,
    pub vertices: [Vec2; MAX_POLYGON_VERTICES],
    pub normals: [Vec2; MAX_POLYGON_VERTICES],
    pub centroid: Vec2,
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub radius: f32,
    pub v1: Vec2,
    pub v2: Vec2,
}

#[derive(Debug, Clone)]
pub enum Shape {
    Circle(Circle),
    Polygon(Polygon),
    Edge(Edge),
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Circle(_) => ShapeKind::Circle,
            Shape::Polygon(_) => ShapeKind::Polygon,
            Shape::Edge(_) => ShapeKind::Edge,
        }
    }

    pub fn radius(&self) -> f32 {
        match self {
            Shape::Circle(c) => c.radius,
            Shape::Polygon(p) => p.radius,
            Shape::Edge(e) => e.radius,
        }
    }

    /// World-space AABB of this shape under `transform`.
    pub fn compute_aabb(&self, transform: &Transform2) -> Aabb {
        match self {
            Shape::Circle(c) => {
                let center = transform.transform_point(c.center);
                Aabb::new(center - Vec2::splat(c.radius), center + Vec2::splat(c.radius))
            }
            Shape::Polygon(p) => {
                let mut lower = Vec2::splat(f32::MAX);
                let mut upper = Vec2::splat(f32::MIN);
                for i in 0..p.count {
                    let world = transform.transform_point(p.vertices[i]);
                    lower = lower.min(world);
                    upper = upper.max(world);
                }
                Aabb::new(lower - Vec2::splat(p.radius), upper + Vec2::splat(p.radius))
            }
            Shape::Edge(e) => {
                let a = transform.transform_point(e.v1);
                let b = transform.transform_point(e.v2);
                Aabb::new(a.min(b) - Vec2::splat(e.radius), a.max(b) + Vec2::splat(e.radius))
            }
        }
    }

    /// Density-weighted mass, centroid, and rotational inertia about the shape's own centroid.
    pub fn compute_mass(&self, density: f32) -> MassData {
        match self {
            Shape::Circle(c) => {
                let mass = density * std::f32::consts::PI * c.radius * c.radius;
                let inertia = mass * (0.5 * c.radius * c.radius + c.center.dot(c.center));
                MassData { mass, inverse_mass: 0.0, inertia, inverse_inertia: 0.0, local_center: c.center }
            }
            Shape::Polygon(p) => polygon_mass(p, density),
            Shape::Edge(_) => MassData::zero(),
        }
    }

    pub fn contains_point(&self, transform: &Transform2, world_point: Vec2) -> bool {
        let local = transform.inverse_transform_point(world_point);
        match self {
            Shape::Circle(c) => (local - c.center).length_squared() <= c.radius * c.radius,
            Shape::Polygon(p) => {
                for i in 0..p.count {
                    if p.normals[i].dot(local - p.vertices[i]) > 0.0 {
                        return false;
                    }
                }
                true
            }
            Shape::Edge(_) => false,
        }
    }
}

/// Area, centroid and inertia of a convex polygon via triangle-fan decomposition about
/// an interior reference point.
fn polygon_mass(p: &Polygon, density: f32) -> MassData {
    debug_assert!(p.count >= 3);
    let mut area = 0.0_f32;
    let mut centroid = Vec2::ZERO;
    let mut inertia = 0.0_f32;

    let reference = p.vertices[0];
    const INV3: f32 = 1.0 / 3.0;

    for i in 1..p.count - 1 {
        let e1 = p.vertices[i] - reference;
        let e2 = p.vertices[i + 1] - reference;
        let d = cross2(e1, e2);
        let triangle_area = 0.5 * d;
        area += triangle_area;
        centroid += triangle_area * INV3 * (e1 + e2);

        let intx2 = e1.x * e1.x + e1.x * e2.x + e2.x * e2.x;
        let inty2 = e1.y * e1.y + e1.y * e2.y + e2.y * e2.y;
        inertia += (0.25 * INV3 * d) * (intx2 + inty2);
    }

    let mass = density * area;
    let centroid = if area > 1e-9 { centroid / area + reference } else { reference };

    // Shift inertia from the reference point to the centroid, then to the body origin.
    let mut inertia = density * inertia;
    inertia -= mass * (centroid - reference).dot(centroid - reference);
    inertia += mass * centroid.dot(centroid);

    MassData { mass, inverse_mass: 0.0, inertia, inverse_inertia: 0.0, local_center: centroid }
}

impl Polygon {
    /// Builds a polygon from an already-convex, CCW-wound vertex list (<= 8 vertices).
    /// Computes outward edge normals and the centroid. Returns `None` for degenerate input.
    pub fn from_convex_hull(vertices: &[Vec2]) -> Option<Polygon> {
        if vertices.len() < 3 || vertices.len() > MAX_POLYGON_VERTICES {
            return None;
        }
        let mut verts = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        let mut normals = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        let count = vertices.len();
        verts[..count].copy_from_slice(vertices);

        for i in 0..count {
            let edge = verts[(i + 1) % count] - verts[i];
            if edge.length_squared() < 1e-10 {
                return None;
            }
            normals[i] = Vec2::new(edge.y, -edge.x).normalize();
        }

        let mut area = 0.0;
        for i in 1..count - 1 {
            area += cross2(verts[i] - verts[0], verts[i + 1] - verts[0]);
        }
        if area.abs() * 0.5 <= 1e-8 {
            return None;
        }

        let mut centroid = Vec2::ZERO;
        for i in 0..count {
            centroid += verts[i];
        }
        centroid /= count as f32;

        Some(Polygon { radius: POLYGON_RADIUS, count, vertices: verts, normals, centroid })
    }

    pub fn box_half_extents(hx: f32, hy: f32) -> Polygon {
        let vertices = [Vec2::new(-hx, -hy), Vec2::new(hx, -hy), Vec2::new(hx, hy), Vec2::new(-hx, hy)];
        Polygon::from_convex_hull(&vertices).expect("axis-aligned box is always a valid hull")
    }

    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices[..self.count]
    }

    pub fn normals(&self) -> &[Vec2] {
        &self.normals[..self.count]
    }
}
