//! Per-pair narrow-phase algorithms: circle-circle, circle-polygon, polygon-polygon.
//! Each produces a [`LocalManifold`] expressed in the reference shape's local frame.
//! Dispatch is a plain match on shape variant, never virtual calls.

use crate::collision::clipping::{clip_segment_to_line, ClipVertex};
use crate::collision::shapes::{Circle, Polygon, Shape};
use crate::config::LINEAR_SLOP;
use crate::utils::math::{relative_transform, Transform2, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifoldType {
    Circles,
    FaceA,
    FaceB,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ManifoldPoint {
    /// Contact location in the manifold's reference local frame.
    pub local_point: Vec2,
    /// Persistent feature id: survives small relative motion, used to match warm-start
    /// impulses across frames.
    pub contact_key: u32,
    pub normal_impulse: f32,
    pub tangent_impulse: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct LocalManifold {
    pub kind: ManifoldType,
    pub local_normal: Vec2,
    pub local_point: Vec2,
    pub points: [ManifoldPoint; 2],
    pub count: usize,
}

impl LocalManifold {
    fn empty() -> Self {
        Self {
            kind: ManifoldType::Circles,
            local_normal: Vec2::ZERO,
            local_point: Vec2::ZERO,
            points: [ManifoldPoint::default(); 2],
            count: 0,
        }
    }

    pub fn points(&self) -> &[ManifoldPoint] {
        &self.points[..self.count]
    }
}

/// Collides two shapes. The manifold is local to `a` unless `kind` is `FaceB`, in which
/// case it is local to `b`.
pub fn collide(shape_a: &Shape, xf_a: &Transform2, shape_b: &Shape, xf_b: &Transform2) -> Option<LocalManifold> {
    match (shape_a, shape_b) {
        (Shape::Circle(a), Shape::Circle(b)) => circle_vs_circle(a, xf_a, b, xf_b),
        (Shape::Circle(a), Shape::Polygon(b)) => circle_vs_polygon(a, xf_a, b, xf_b),
        (Shape::Polygon(a), Shape::Polygon(b)) => polygon_vs_polygon(a, xf_a, b, xf_b),
        _ => None,
    }
}

fn circle_vs_circle(a: &Circle, xf_a: &Transform2, b: &Circle, xf_b: &Transform2) -> Option<LocalManifold> {
    let center_b_in_a = xf_a.inverse_transform_point(xf_b.transform_point(b.center));
    let d = center_b_in_a - a.center;
    let radius_sum = a.radius + b.radius;
    if d.length_squared() > radius_sum * radius_sum {
        return None;
    }
    let mut m = LocalManifold::empty();
    m.kind = ManifoldType::Circles;
    m.local_normal = Vec2::ZERO;
    m.local_point = a.center;
    m.points[0] = ManifoldPoint { local_point: center_b_in_a, contact_key: 0, ..Default::default() };
    m.count = 1;
    Some(m)
}

/// Circle `a` (world `xf_a`) against polygon `b` (world `xf_b`); manifold is local to `b`.
fn circle_vs_polygon(a: &Circle, xf_a: &Transform2, b: &Polygon, xf_b: &Transform2) -> Option<LocalManifold> {
    let center = xf_b.inverse_transform_point(xf_a.transform_point(a.center));

    let mut separation = f32::MIN;
    let mut normal_index = 0usize;
    for i in 0..b.count {
        let s = b.normals[i].dot(center - b.vertices[i]);
        if s > separation {
            separation = s;
            normal_index = i;
        }
    }

    let radius = a.radius + b.radius;
    if separation > radius {
        return None;
    }

    let v1 = b.vertices[normal_index];
    let v2 = b.vertices[(normal_index + 1) % b.count];

    let mut m = LocalManifold::empty();
    m.kind = ManifoldType::FaceB;
    m.count = 1;
    m.points[0] = ManifoldPoint { local_point: center, contact_key: 0, ..Default::default() };

    if separation < 1e-5 {
        m.local_normal = b.normals[normal_index];
        m.local_point = (v1 + v2) * 0.5;
        return Some(m);
    }

    let u1 = (center - v1).dot(v2 - v1);
    let u2 = (center - v2).dot(v1 - v2);

    if u1 <= 0.0 {
        if (center - v1).length_squared() > radius * radius {
            return None;
        }
        m.local_normal = (center - v1).normalize_or_zero();
        m.local_point = v1;
    } else if u2 <= 0.0 {
        if (center - v2).length_squared() > radius * radius {
            return None;
        }
        m.local_normal = (center - v2).normalize_or_zero();
        m.local_point = v2;
    } else {
        m.local_normal = b.normals[normal_index];
        m.local_point = (v1 + v2) * 0.5;
    }
    Some(m)
}

/// Max separation of `a`'s faces against `b`'s vertices, with `b` expressed in `a`'s frame.
fn max_separation(a: &Polygon, b: &Polygon, xf_b_in_a: &Transform2) -> (f32, usize) {
    let mut best_separation = f32::MIN;
    let mut best_edge = 0;
    for i in 0..a.count {
        let n = a.normals[i];
        let v1 = a.vertices[i];
        let mut min_sep = f32::MAX;
        for j in 0..b.count {
            let vb = xf_b_in_a.transform_point(b.vertices[j]);
            let sep = n.dot(vb - v1);
            if sep < min_sep {
                min_sep = sep;
            }
        }
        if min_sep > best_separation {
            best_separation = min_sep;
            best_edge = i;
        }
    }
    (best_separation, best_edge)
}

fn polygon_vs_polygon(a: &Polygon, xf_a: &Transform2, b: &Polygon, xf_b: &Transform2) -> Option<LocalManifold> {
    let xf_b_in_a = relative_transform(xf_a, xf_b);
    let xf_a_in_b = relative_transform(xf_b, xf_a);

    let (sep_a, edge_a) = max_separation(a, b, &xf_b_in_a);
    let (sep_b, edge_b) = max_separation(b, a, &xf_a_in_b);

    let combined_radius = a.radius + b.radius;
    if sep_a > combined_radius || sep_b > combined_radius {
        return None;
    }

    let flip = sep_b > sep_a + 0.1 * LINEAR_SLOP;
    let (reference, incident, xf_incident_in_ref, ref_edge) =
        if flip { (b, a, xf_a_in_b, edge_b) } else { (a, b, xf_b_in_a, edge_a) };

    // Incident edge: the one whose world normal most opposes the reference normal.
    let ref_normal = reference.normals[ref_edge];
    let mut incident_edge = 0usize;
    let mut min_dot = f32::MAX;
    for i in 0..incident.count {
        let n_in_ref = xf_incident_in_ref.rotation.rotate(incident.normals[i]);
        let d = ref_normal.dot(n_in_ref);
        if d < min_dot {
            min_dot = d;
            incident_edge = i;
        }
    }

    let i1 = incident_edge;
    let i2 = (incident_edge + 1) % incident.count;
    let incident_v1 = xf_incident_in_ref.transform_point(incident.vertices[i1]);
    let incident_v2 = xf_incident_in_ref.transform_point(incident.vertices[i2]);

    let v1 = reference.vertices[ref_edge];
    let v2 = reference.vertices[(ref_edge + 1) % reference.count];
    let tangent = (v2 - v1).normalize_or_zero();

    let key = |incident_vertex: usize| -> u32 { (ref_edge as u32) | ((incident_vertex as u32) << 8) | (1 << 16) };

    let clip_points = [
        ClipVertex { point: incident_v1, contact_key: key(i1) },
        ClipVertex { point: incident_v2, contact_key: key(i2) },
    ];

    let clipped = clip_segment_to_line(clip_points, -tangent, -tangent.dot(v1), key(i1))?;
    let clipped = clip_segment_to_line(clipped, tangent, tangent.dot(v2), key(i2))?;

    let mut m = LocalManifold::empty();
    m.kind = if flip { ManifoldType::FaceB } else { ManifoldType::FaceA };
    m.local_normal = ref_normal;
    m.local_point = (v1 + v2) * 0.5;

    let mut count = 0;
    for cv in clipped {
        let separation = ref_normal.dot(cv.point - v1);
        if separation <= combined_radius {
            m.points[count] = ManifoldPoint { local_point: cv.point, contact_key: cv.contact_key, ..Default::default() };
            count += 1;
        }
    }
    m.count = count;
    if m.count == 0 {
        return None;
    }
    Some(m)
}

/// A reconstructed world-space contact point.
pub struct WorldPoint {
    pub point: Vec2,
    pub separation: f32,
}

/// Reconstructs the world normal and per-point world positions/separations from a local
/// manifold plus the two bodies' current transforms.
pub fn world_manifold(manifold: &LocalManifold, xf_a: &Transform2, xf_b: &Transform2) -> (Vec2, [Option<WorldPoint>; 2]) {
    let mut points: [Option<WorldPoint>; 2] = [None, None];
    match manifold.kind {
        ManifoldType::Circles => {
            let point_a = xf_a.transform_point(manifold.local_point);
            let point_b = xf_a.transform_point(manifold.points[0].local_point);
            let normal = (point_b - point_a).normalize_or_zero();
            let separation = (point_b - point_a).dot(normal);
            points[0] = Some(WorldPoint { point: point_a + (point_b - point_a) * 0.5, separation });
            (normal, points)
        }
        ManifoldType::FaceA | ManifoldType::FaceB => {
            let ref_xf = if manifold.kind == ManifoldType::FaceA { xf_a } else { xf_b };
            let normal = ref_xf.transform_vector(manifold.local_normal).normalize_or_zero();
            let plane_point = ref_xf.transform_point(manifold.local_point);
            for i in 0..manifold.count {
                let world_point = ref_xf.transform_point(manifold.points[i].local_point);
                let separation = (world_point - plane_point).dot(normal);
                points[i] = Some(WorldPoint { point: world_point, separation });
            }
            (normal, points)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::math::Rotation;

    #[test]
    fn circles_overlap_detected() {
        let a = Circle { radius: 1.0, center: Vec2::ZERO };
        let b = Circle { radius: 1.0, center: Vec2::ZERO };
        let xf_a = Transform2::identity();
        let xf_b = Transform2::new(Vec2::new(1.5, 0.0), Rotation::IDENTITY);
        let m = circle_vs_circle(&a, &xf_a, &b, &xf_b).unwrap();
        assert_eq!(m.count, 1);
    }

    #[test]
    fn circles_far_apart_no_contact() {
        let a = Circle { radius: 1.0, center: Vec2::ZERO };
        let b = Circle { radius: 1.0, center: Vec2::ZERO };
        let xf_a = Transform2::identity();
        let xf_b = Transform2::new(Vec2::new(10.0, 0.0), Rotation::IDENTITY);
        assert!(circle_vs_circle(&a, &xf_a, &b, &xf_b).is_none());
    }

    #[test]
    fn stacked_boxes_produce_two_point_manifold() {
        let a = Polygon::box_half_extents(1.0, 1.0);
        let b = Polygon::box_half_extents(1.0, 1.0);
        let xf_a = Transform2::identity();
        let xf_b = Transform2::new(Vec2::new(0.0, 2.0 - 0.001), Rotation::IDENTITY);
        let m = polygon_vs_polygon(&a, &xf_a, &b, &xf_b).expect("boxes should touch");
        assert_eq!(m.count, 2);
    }

    #[test]
    fn circle_resting_on_box_face() {
        let poly = Polygon::box_half_extents(1.0, 1.0);
        let circle = Circle { radius: 0.5, center: Vec2::ZERO };
        let xf_poly = Transform2::identity();
        let xf_circle = Transform2::new(Vec2::new(0.0, 1.4), Rotation::IDENTITY);
        let m = circle_vs_polygon(&circle, &xf_circle, &poly, &xf_poly).expect("circle should touch top face");
        assert_eq!(m.kind, ManifoldType::FaceB);
    }
}
