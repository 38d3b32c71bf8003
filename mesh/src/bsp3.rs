//! 3D BSP construction, triangle/plane splitting, boolean composition and
//! paint-order emission (`examples/original_source/mesh.cpp`'s `SBsp3`).
//!
//! This builds a BSP over the mesh's OWN triangles (each internal node's
//! splitting plane partitions the triangles straddling it, not the whole of
//! space), rather than the fully auto-partitioned space-filling tree a
//! from-scratch CSG kernel would use. Classifying a foreign triangle against
//! the tree therefore relies on one assumption, documented at [`walk`]: an
//! empty leaf reached by descending the *negative* side of the last node
//! visited is interior to the solid, reached via the *positive* side is
//! exterior. This holds for the closed, reasonably well-split meshes this
//! engine's per-group builders produce; see `DESIGN.md` for the tradeoff
//! against the original's full auto-partition.

use crate::bsp2::{Bsp2, Edge2};
use kernel_geom::{plane_basis, vec3, Bbox, Plane, Vec3};

const EPS: f64 = 1e-6;

/// A free-floating triangle (not indexed into a shared vertex array, since
/// splitting against a plane manufactures new vertices that belong to no
/// other triangle).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Tri3 {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
    pub face: u32,
}

impl Tri3 {
    pub fn normal(&self) -> Vec3 {
        (self.b - self.a).cross(self.c - self.a).normalize()
    }

    pub fn flipped(&self) -> Tri3 {
        Tri3 { a: self.a, b: self.c, c: self.b, face: self.face }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Side {
    Pos,
    Neg,
    Coplanar,
    Straddle,
}

fn classify_tri(t: &Tri3, plane: &Plane) -> Side {
    let ds = [
        plane.signed_distance(t.a),
        plane.signed_distance(t.b),
        plane.signed_distance(t.c),
    ];
    let pos = ds.iter().any(|d| *d > EPS);
    let neg = ds.iter().any(|d| *d < -EPS);
    match (pos, neg) {
        (true, true) => Side::Straddle,
        (true, false) => Side::Pos,
        (false, true) => Side::Neg,
        (false, false) => Side::Coplanar,
    }
}

/// Clips a triangle against `plane`, returning its positive-side and
/// negative-side fragments (one triangle on the lone-vertex side, two on
/// the other, per `spec.md` §4.9).
fn split_triangle(t: &Tri3, plane: &Plane) -> (Vec<Tri3>, Vec<Tri3>) {
    let verts = [t.a, t.b, t.c];
    let ds: Vec<f64> = verts.iter().map(|&v| plane.signed_distance(v)).collect();
    let mut pos_pts = Vec::new();
    let mut neg_pts = Vec::new();
    for i in 0..3 {
        let j = (i + 1) % 3;
        let (vi, vj) = (verts[i], verts[j]);
        let (di, dj) = (ds[i], ds[j]);
        if di >= -EPS {
            pos_pts.push(vi);
        }
        if di <= EPS {
            neg_pts.push(vi);
        }
        if (di > EPS && dj < -EPS) || (di < -EPS && dj > EPS) {
            let ip = vi.lerp(vj, di / (di - dj));
            pos_pts.push(ip);
            neg_pts.push(ip);
        }
    }
    (fan(&pos_pts, t.face), fan(&neg_pts, t.face))
}

fn fan(pts: &[Vec3], face: u32) -> Vec<Tri3> {
    if pts.len() < 3 {
        return Vec::new();
    }
    (1..pts.len() - 1).map(|i| Tri3 { a: pts[0], b: pts[i], c: pts[i + 1], face }).collect()
}

fn bbox_of(tris: &[Tri3]) -> Bbox {
    let pts: Vec<Vec3> = tris.iter().flat_map(|t| [t.a, t.b, t.c]).collect();
    Bbox::of_points(&pts)
}

/// `SBsp3::ChoosePartition`'s split-factor heuristic: candidate axis-aligned
/// cuts through the bounding box centroid are scored by how evenly they
/// balance positive/negative triangle counts while minimising straddles,
/// and the best-scoring axis wins (ties broken X, Y, Z). Meshes under 20
/// triangles skip the search and split on the first triangle's own plane.
fn choose_partition(tris: &[Tri3]) -> Plane {
    if tris.len() < 20 {
        return Plane::new(tris[0].a, tris[0].normal());
    }
    let bbox = bbox_of(tris);
    let center = bbox.center();
    let mut best: Option<(f64, Plane)> = None;
    for axis in [vec3(1.0, 0.0, 0.0), vec3(0.0, 1.0, 0.0), vec3(0.0, 0.0, 1.0)] {
        let plane = Plane::new(center, axis);
        let (mut pos, mut neg, mut straddle) = (0usize, 0usize, 0usize);
        for t in tris {
            match classify_tri(t, &plane) {
                Side::Pos => pos += 1,
                Side::Neg => neg += 1,
                Side::Coplanar => {}
                Side::Straddle => straddle += 1,
            }
        }
        let total = (pos + neg + straddle) as f64;
        if total < 1.0 {
            continue;
        }
        let mut r = pos.min(neg) as f64 / total;
        r *= ((pos + neg) as f64 / total).powi(3);
        if best.as_ref().map_or(true, |(best_r, _)| r > *best_r) {
            best = Some((r, plane));
        }
    }
    best.map(|(_, p)| p).unwrap_or_else(|| Plane::new(tris[0].a, tris[0].normal()))
}

fn coplanar_edge_bsp(plane: &Plane, more: &[Tri3]) -> Bsp2 {
    let (u, v) = plane_basis(plane.normal);
    let mut edges = Vec::with_capacity(more.len() * 3);
    for t in more {
        let proj: Vec<(f64, f64)> = [t.a, t.b, t.c]
            .iter()
            .map(|&p| {
                let rel = p - plane.origin;
                (rel.dot(u), rel.dot(v))
            })
            .collect();
        for i in 0..3 {
            edges.push(Edge2 { a: proj[i], b: proj[(i + 1) % 3] });
        }
    }
    Bsp2::build(edges)
}

#[derive(Clone, Debug)]
pub enum Bsp3 {
    Leaf,
    Node {
        plane: Plane,
        /// Triangles coplanar with `plane`, kept at this node rather than
        /// recursed further; the same/opposite-normal distinction between
        /// these and an inserted coplanar triangle decides keep/flip
        /// during boolean composition.
        more: Vec<Tri3>,
        /// Auxiliary 2D classification of `more`'s edges, so a later query
        /// can tell which side of this node's own coplanar geometry a
        /// point falls on (see [`crate::bsp2`]'s doc comment on the
        /// simplification this takes).
        edge_bsp: Bsp2,
        pos: Box<Bsp3>,
        neg: Box<Bsp3>,
    },
}

impl Bsp3 {
    pub fn build(tris: Vec<Tri3>) -> Bsp3 {
        if tris.is_empty() {
            return Bsp3::Leaf;
        }
        let plane = choose_partition(&tris);
        let mut more = Vec::new();
        let mut pos_tris = Vec::new();
        let mut neg_tris = Vec::new();
        for t in tris {
            match classify_tri(&t, &plane) {
                Side::Pos => pos_tris.push(t),
                Side::Neg => neg_tris.push(t),
                Side::Coplanar => more.push(t),
                Side::Straddle => {
                    let (p, n) = split_triangle(&t, &plane);
                    pos_tris.extend(p);
                    neg_tris.extend(n);
                }
            }
        }
        let edge_bsp = coplanar_edge_bsp(&plane, &more);
        Bsp3::Node {
            plane,
            more,
            edge_bsp,
            pos: Box::new(Bsp3::build(pos_tris)),
            neg: Box::new(Bsp3::build(neg_tris)),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Bsp3::Leaf)
    }
}

/// Classifies a bare point against the solid the tree bounds, using the
/// same leaf-typing convention [`walk`] documents.
pub fn classify_point(p: Vec3, tree: &Bsp3) -> bool {
    let mut node = tree;
    let mut came_from_neg = false;
    loop {
        match node {
            Bsp3::Leaf => return !came_from_neg,
            Bsp3::Node { plane, pos, neg, .. } => {
                if plane.signed_distance(p) >= 0.0 {
                    came_from_neg = false;
                    node = pos.as_ref();
                } else {
                    came_from_neg = true;
                    node = neg.as_ref();
                }
            }
        }
    }
}

/// Where a fragment produced by [`walk`] lands relative to the tree it was
/// walked against. `CoincSame`/`CoincOpp` are the two coplanar cases
/// `spec.md` §4.9 calls out separately from plain inside/outside: a
/// fragment exactly coplanar with a node's own coincident geometry, either
/// wound the same way (the two surfaces are duplicates of each other) or
/// the opposite way (the two solids are flush against each other there).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Placement {
    Outside,
    Inside,
    CoincSame,
    CoincOpp,
}

/// Walks `tri` down `tree`, splitting it at every straddling node, and
/// calls `f` with each terminal fragment's [`Placement`]. A fragment
/// exactly coplanar with a node's plane is routed by comparing its winding
/// normal against the plane's (same-normal vs opposite-normal, per
/// `spec.md` §4.9's boolean rule) rather than descending further.
fn walk<F: FnMut(Tri3, Placement)>(tri: Tri3, node: &Bsp3, came_from_neg: bool, f: &mut F) {
    match node {
        Bsp3::Leaf => f(tri, if came_from_neg { Placement::Inside } else { Placement::Outside }),
        Bsp3::Node { plane, pos, neg, .. } => match classify_tri(&tri, plane) {
            Side::Pos => walk(tri, pos, false, f),
            Side::Neg => walk(tri, neg, true, f),
            Side::Coplanar => {
                let same = tri.normal().dot(plane.normal) > 0.0;
                f(tri, if same { Placement::CoincSame } else { Placement::CoincOpp });
            }
            Side::Straddle => {
                let (p_tris, n_tris) = split_triangle(&tri, plane);
                for t in p_tris {
                    walk(t, pos, false, f);
                }
                for t in n_tris {
                    walk(t, neg, true, f);
                }
            }
        },
    }
}

pub fn classify_against(tri: Tri3, tree: &Bsp3) -> Vec<(Tri3, Placement)> {
    let mut out = Vec::new();
    walk(tri, tree, false, &mut |t, placement| out.push((t, placement)));
    out
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BooleanOp {
    Union,
    Difference,
    Interference,
}

#[derive(Clone, Debug, Default)]
pub struct BooleanResult {
    pub kept: Vec<Tri3>,
    pub interference: Vec<Tri3>,
}

/// Combines two meshes under `op`, each already built into a [`Bsp3`] of
/// its own triangles. Interference doesn't filter anything out: both
/// meshes pass through unmodified into `kept`, and whichever fragments
/// truly overlap the other solid's interior are recorded into
/// `interference` instead, per `spec.md` §4.9's "records, rather than
/// outputs" rule.
///
/// Coplanar fragments are resolved per `Placement`: a same-normal match
/// means the two operands carry an identical face there, so a union keeps
/// one copy (A's) and a difference drops both (A's surface stops exactly
/// at B's coincident boundary). An opposite-normal match means the two
/// operands are flush against each other without overlapping volume, so a
/// union drops both (the wall becomes interior) and a difference keeps A's
/// copy untouched (B only touches A's boundary, it doesn't cut into it).
pub fn boolean(op: BooleanOp, a: &[Tri3], a_tree: &Bsp3, b: &[Tri3], b_tree: &Bsp3) -> BooleanResult {
    use Placement::{CoincOpp, CoincSame, Inside, Outside};

    let a_frags: Vec<(Tri3, Placement)> = a.iter().flat_map(|t| classify_against(*t, b_tree)).collect();
    let b_frags: Vec<(Tri3, Placement)> = b.iter().flat_map(|t| classify_against(*t, a_tree)).collect();

    let mut result = BooleanResult::default();
    match op {
        BooleanOp::Union => {
            result
                .kept
                .extend(a_frags.into_iter().filter(|(_, p)| matches!(p, Outside | CoincSame)).map(|(t, _)| t));
            result.kept.extend(b_frags.into_iter().filter(|(_, p)| matches!(p, Outside)).map(|(t, _)| t));
        }
        BooleanOp::Difference => {
            result
                .kept
                .extend(a_frags.into_iter().filter(|(_, p)| matches!(p, Outside | CoincOpp)).map(|(t, _)| t));
            result
                .kept
                .extend(b_frags.into_iter().filter(|(_, p)| matches!(p, Inside)).map(|(t, _)| t.flipped()));
        }
        BooleanOp::Interference => {
            result.kept.extend(a.iter().copied());
            result.kept.extend(b.iter().copied());
            result.interference.extend(a_frags.into_iter().filter(|(_, p)| matches!(p, Inside)).map(|(t, _)| t));
            result.interference.extend(b_frags.into_iter().filter(|(_, p)| matches!(p, Inside)).map(|(t, _)| t));
        }
    }
    result
}

/// Back-to-front traversal with respect to `view_dir`: at each node, the
/// half the direction points into is drawn first (it's farther away),
/// coplanar triangles next, then the near half.
pub fn paint_order(tree: &Bsp3, view_dir: Vec3, out: &mut Vec<Tri3>) {
    match tree {
        Bsp3::Leaf => {}
        Bsp3::Node { plane, more, pos, neg, .. } => {
            let pos_is_far = view_dir.dot(plane.normal) >= 0.0;
            if pos_is_far {
                paint_order(pos, view_dir, out);
                out.extend(more.iter().copied());
                paint_order(neg, view_dir, out);
            } else {
                paint_order(neg, view_dir, out);
                out.extend(more.iter().copied());
                paint_order(pos, view_dir, out);
            }
        }
    }
}
