//! Point- and edge-vs-solid classification by ray casting against a closed
//! mesh (`examples/original_source/src/srf/raycast.cpp`).
//!
//! The original classifies a query against a shell of trimmed NURBS
//! surfaces, walking each candidate surface's own trim curves and UV space.
//! This engine triangulates before classification ever runs, so there's no
//! persistent trim-boundary layer to walk; a "surface" here is just the one
//! triangle a point or edge happens to land on, and edge-on-face / UV
//! containment collapses to the same barycentric test `classify` already
//! uses for point coincidence. `classify_edge`'s edge-on-edge step keeps the
//! original's separate sign-pattern table, since that's genuine information
//! (two adjacent face normals) a bare point query never has. Ray-casting
//! against the mesh's triangle soup uses the Moller-Trumbore test; the
//! determinism the original gets from `srand(0)` is reproduced with a
//! freshly-seeded `StdRng` per call rather than process-global state, so
//! repeated classification of the same query against the same mesh always
//! retries through the same sequence of directions.

use crate::{Mesh, MeshError, Tri};
use kernel_geom::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MAX_ATTEMPTS: u32 = 20;
const ON_FACE_EPS: f64 = 1e-7;
const EDGE_EPS: f64 = 1e-6;
/// `SShell::DOTP_TOL`: how close to perpendicular a dot product has to be
/// before `classify_edge` treats it as "edge-on" rather than a clear
/// inside/outside sign.
const DOTP_TOL: f64 = 1e-5;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Classification {
    Inside,
    Outside,
    /// The point lies on the mesh, on a triangle whose normal agrees with
    /// the caller's `outward_hint`.
    CoincSame,
    /// The point lies on the mesh, on a triangle whose normal opposes the
    /// caller's `outward_hint`.
    CoincOpp,
}

/// Classifies `p` against the solid `mesh` bounds. `outward_hint` resolves
/// the coincident case: it should be the outward normal of whatever
/// surface `p` was sampled from, so a point shared between two abutting
/// shells can tell which one it agrees with.
pub fn classify(mesh: &Mesh, p: Vec3, outward_hint: Vec3) -> Result<Classification, MeshError> {
    if let Some(tri) = find_coincident_triangle(mesh, p) {
        let n = mesh.triangle_normal(tri);
        return Ok(if n.dot(outward_hint) > 0.0 { Classification::CoincSame } else { Classification::CoincOpp });
    }

    let mut rng = StdRng::seed_from_u64(0);
    for _ in 0..MAX_ATTEMPTS {
        let dir = random_direction(&mut rng);
        if let Some(hit) = cast(mesh, p, dir) {
            return Ok(if hit.dot(dir) > 0.0 { Classification::Inside } else { Classification::Outside });
        }
    }
    Err(MeshError::NakedEdge { attempts: MAX_ATTEMPTS })
}

/// Classifies the edge `(a, b)` against `mesh`, the way `classify` handles
/// a bare point but with the two special cases an edge query can hit that a
/// point query can't: the edge running exactly along another edge of the
/// shell ("edge-on-edge"), and the edge running exactly along a face's
/// interior ("edge-on-face"). `face_normal` is the outward normal of the
/// caller's own face that owns this edge — the `surf_n` the original's
/// `SShell::ClassifyEdge` takes as a parameter — used to resolve the
/// same-normal/opposite-normal sense of a coincident match.
///
/// Tested at the edge's midpoint, per `spec.md` §4.10. Edge-on-face and the
/// ray-cast fallback are exactly `classify`'s own point-coincidence and
/// ray-cast logic; only edge-on-edge is new behaviour, since a bare point
/// query has no second edge to compare against.
pub fn classify_edge(
    mesh: &Mesh,
    a: Vec3,
    b: Vec3,
    face_normal: Vec3,
    outward_hint: Vec3,
) -> Result<Classification, MeshError> {
    let midpoint = a.lerp(b, 0.5);
    if let Some(c) = classify_edge_on_edge(mesh, a, b, face_normal, outward_hint) {
        return Ok(c);
    }
    classify(mesh, midpoint, outward_hint)
}

/// Finds every mesh edge coincident with `(a, b)` (shared endpoints, either
/// order) and, if the sign pattern of their normals against `outward_hint`
/// resolves cleanly, returns the classification. Mirrors
/// `SShell::ClassifyEdge`'s edge-on-edge step: a single coincident edge (an
/// open mesh's boundary) or two (an edge shared between two faces) are both
/// handled by the same dot-product sign table; a mixed, non-near-zero
/// pattern is tangent and not resolvable here, so the caller falls through
/// to edge-on-face / ray-cast instead.
fn classify_edge_on_edge(
    mesh: &Mesh,
    a: Vec3,
    b: Vec3,
    face_normal: Vec3,
    outward_hint: Vec3,
) -> Option<Classification> {
    let normals: Vec<Vec3> = matching_edge_triangles(mesh, a, b).into_iter().map(|t| mesh.triangle_normal(t)).collect();
    if normals.is_empty() {
        return None;
    }
    let dots: Vec<f64> = normals.iter().map(|n| n.dot(outward_hint)).collect();
    let coincident = if face_normal.dot(normals[0]) > 0.0 { Classification::CoincSame } else { Classification::CoincOpp };

    if dots.iter().all(|d| d.abs() < DOTP_TOL) {
        Some(coincident)
    } else if dots.iter().all(|&d| d > DOTP_TOL) {
        Some(Classification::Outside)
    } else if dots.iter().all(|&d| d < -DOTP_TOL) {
        Some(Classification::Inside)
    } else if dots.len() == 2 {
        let clear = if dots[0].abs() >= DOTP_TOL { dots[0] } else { dots[1] };
        if dots[0].abs() < DOTP_TOL || dots[1].abs() < DOTP_TOL {
            Some(if clear > 0.0 { Classification::Outside } else { Classification::Inside })
        } else {
            None
        }
    } else {
        None
    }
}

fn matching_edge_triangles<'a>(mesh: &'a Mesh, a: Vec3, b: Vec3) -> Vec<&'a Tri> {
    mesh.triangles
        .iter()
        .filter(|t| {
            let (p0, p1, p2) = mesh.triangle_points(t);
            [(p0, p1), (p1, p2), (p2, p0)]
                .iter()
                .any(|&(ea, eb)| (coincident(ea, a) && coincident(eb, b)) || (coincident(ea, b) && coincident(eb, a)))
        })
        .collect()
}

fn coincident(p: Vec3, q: Vec3) -> bool {
    (p - q).magnitude() < EDGE_EPS
}

fn random_direction(rng: &mut StdRng) -> Vec3 {
    loop {
        let v = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
        if v.magnitude() > 1e-6 {
            return v.normalize();
        }
    }
}

fn find_coincident_triangle(mesh: &Mesh, p: Vec3) -> Option<&Tri> {
    mesh.triangles.iter().find(|t| {
        let (a, b, c) = mesh.triangle_points(t);
        point_on_triangle(p, a, b, c, ON_FACE_EPS)
    })
}

fn point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3, eps: f64) -> bool {
    let n = (b - a).cross(c - a);
    let area2 = n.magnitude();
    if area2 < 1e-18 {
        return false;
    }
    if (p - a).dot(n.normalize()).abs() > eps {
        return false;
    }
    let v0 = c - a;
    let v1 = b - a;
    let v2 = p - a;
    let dot00 = v0.dot(v0);
    let dot01 = v0.dot(v1);
    let dot02 = v0.dot(v2);
    let dot11 = v1.dot(v1);
    let dot12 = v1.dot(v2);
    let denom = dot00 * dot11 - dot01 * dot01;
    if denom.abs() < 1e-18 {
        return false;
    }
    let u = (dot11 * dot02 - dot01 * dot12) / denom;
    let v = (dot00 * dot12 - dot01 * dot02) / denom;
    u >= -1e-9 && v >= -1e-9 && u + v <= 1.0 + 1e-9
}

/// Returns the outward normal of the first triangle `origin + t * dir`
/// (`t > 0`) hits, cast via Moller-Trumbore. `None` if the ray misses
/// entirely or grazes too close to a triangle's edge to trust (the caller
/// retries with a fresh direction in that case, mirroring the original's
/// "ray passed too close to an edge, try again" retry loop).
fn cast(mesh: &Mesh, origin: Vec3, dir: Vec3) -> Option<Vec3> {
    let mut nearest: Option<(f64, Vec3)> = None;
    let mut ambiguous = false;
    for t in &mesh.triangles {
        let (a, b, c) = mesh.triangle_points(t);
        match moller_trumbore(origin, dir, a, b, c) {
            Some(Hit::Clean(dist)) => {
                if nearest.map_or(true, |(best, _)| dist < best) {
                    nearest = Some((dist, mesh.triangle_normal(t)));
                }
            }
            Some(Hit::Grazing) => ambiguous = true,
            None => {}
        }
    }
    if ambiguous {
        return None;
    }
    nearest.map(|(_, n)| n)
}

enum Hit {
    Clean(f64),
    Grazing,
}

fn moller_trumbore(origin: Vec3, dir: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<Hit> {
    let e1 = b - a;
    let e2 = c - a;
    let pvec = dir.cross(e2);
    let det = e1.dot(pvec);
    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;
    let tvec = origin - a;
    let u = tvec.dot(pvec) * inv_det;
    if u < -EDGE_EPS || u > 1.0 + EDGE_EPS {
        return None;
    }
    let qvec = tvec.cross(e1);
    let v = dir.dot(qvec) * inv_det;
    if v < -EDGE_EPS || u + v > 1.0 + EDGE_EPS {
        return None;
    }
    let t = e2.dot(qvec) * inv_det;
    if t <= 1e-9 {
        return None;
    }
    let w = 1.0 - u - v;
    if u.abs() < EDGE_EPS || v.abs() < EDGE_EPS || w.abs() < EDGE_EPS {
        return Some(Hit::Grazing);
    }
    Some(Hit::Clean(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tri;
    use kernel_geom::vec3;

    fn unit_cube() -> Mesh {
        let mut mesh = Mesh::new();
        let p = |x: f64, y: f64, z: f64| vec3(x, y, z);
        let mut quad = |a: Vec3, b: Vec3, c: Vec3, d: Vec3, face: u32| {
            let base = mesh.vertices.len() as u32;
            mesh.vertices.extend_from_slice(&[a, b, c, d]);
            mesh.triangles.push(Tri { a: base, b: base + 1, c: base + 2, face });
            mesh.triangles.push(Tri { a: base, b: base + 2, c: base + 3, face });
        };
        quad(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0), p(0.0, 1.0, 0.0), 0);
        quad(p(0.0, 0.0, 1.0), p(0.0, 1.0, 1.0), p(1.0, 1.0, 1.0), p(1.0, 0.0, 1.0), 1);
        quad(p(0.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(0.0, 1.0, 1.0), p(0.0, 0.0, 1.0), 2);
        quad(p(1.0, 0.0, 0.0), p(1.0, 0.0, 1.0), p(1.0, 1.0, 1.0), p(1.0, 1.0, 0.0), 3);
        quad(p(0.0, 0.0, 0.0), p(0.0, 0.0, 1.0), p(1.0, 0.0, 1.0), p(1.0, 0.0, 0.0), 4);
        quad(p(0.0, 1.0, 0.0), p(1.0, 1.0, 0.0), p(1.0, 1.0, 1.0), p(0.0, 1.0, 1.0), 5);
        mesh
    }

    #[test]
    fn interior_point_classifies_inside() {
        let mesh = unit_cube();
        let result = classify(&mesh, vec3(0.5, 0.5, 0.5), vec3(0.0, 0.0, 1.0)).unwrap();
        assert_eq!(result, Classification::Inside);
    }

    #[test]
    fn far_away_point_classifies_outside() {
        let mesh = unit_cube();
        let result = classify(&mesh, vec3(10.0, 10.0, 10.0), vec3(0.0, 0.0, 1.0)).unwrap();
        assert_eq!(result, Classification::Outside);
    }

    #[test]
    fn point_on_a_face_is_coincident_with_matching_sign() {
        let mesh = unit_cube();
        let on_top_face = vec3(0.5, 0.5, 1.0);
        let same = classify(&mesh, on_top_face, vec3(0.0, 0.0, 1.0)).unwrap();
        let opp = classify(&mesh, on_top_face, vec3(0.0, 0.0, -1.0)).unwrap();
        assert_eq!(same, Classification::CoincSame);
        assert_eq!(opp, Classification::CoincOpp);
    }

    #[test]
    fn edge_shared_by_two_faces_resolves_via_the_outward_hint() {
        let mesh = unit_cube();
        // the bottom edge from (0,0,0) to (1,0,0) is shared by the bottom
        // face (normal -z) and the front face (normal -y); looking straight
        // down through the bottom face exits the solid.
        let result = classify_edge(&mesh, vec3(0.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0), vec3(0.0, 0.0, -1.0), vec3(0.0, 0.0, -1.0))
            .unwrap();
        assert_eq!(result, Classification::Outside);
    }

    #[test]
    fn edge_shared_by_two_faces_is_coincident_when_the_hint_is_edge_on() {
        let mesh = unit_cube();
        let a = vec3(0.0, 0.0, 0.0);
        let b = vec3(1.0, 0.0, 0.0);
        // (1,0,0) is perpendicular to both adjacent faces' normals, so
        // neither resolves the sign and the match falls back to coincidence.
        let same = classify_edge(&mesh, a, b, vec3(0.0, 0.0, -1.0), vec3(1.0, 0.0, 0.0)).unwrap();
        let opp = classify_edge(&mesh, a, b, vec3(0.0, 0.0, 1.0), vec3(1.0, 0.0, 0.0)).unwrap();
        assert_eq!(same, Classification::CoincSame);
        assert_eq!(opp, Classification::CoincOpp);
    }

    #[test]
    fn edge_with_no_shell_incidence_falls_back_to_ray_casting() {
        let mesh = unit_cube();
        let result =
            classify_edge(&mesh, vec3(5.0, 5.0, 5.0), vec3(6.0, 5.0, 5.0), vec3(0.0, 0.0, 1.0), vec3(0.0, 0.0, 1.0))
                .unwrap();
        assert_eq!(result, Classification::Outside);
    }
}
