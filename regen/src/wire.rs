//! Assembles closed 2D contours and open 3D trajectories out of a Group's
//! LineSegment/ArcOfCircle entities, by position rather than by handle: a
//! `PointsCoincident` constraint makes two distinct point Entities solve to
//! the same location, it never merges their handles, so wires have to be
//! traced the way the original's `Group::GeneratePolygon` effectively
//! behaves once the solver has run, by matching endpoints within tolerance.

use std::collections::HashMap;

use kernel_geom::Vec3;
use kernel_mesh::triangulate::{point2, Contour, Point2, Polygon2};
use kernel_sketch::{EntityKind, HGroup, Sketch};

use crate::numeric::{distance_numeric, point_local_uv, point_numeric};
use crate::RegenError;

const VERTEX_EPS: f64 = 1e-6;
const ARC_SEGMENTS: usize = 24;

fn key2(p: (f64, f64)) -> (i64, i64) {
    ((p.0 / VERTEX_EPS).round() as i64, (p.1 / VERTEX_EPS).round() as i64)
}

fn key3(p: Vec3) -> (i64, i64, i64) {
    ((p.x / VERTEX_EPS).round() as i64, (p.y / VERTEX_EPS).round() as i64, (p.z / VERTEX_EPS).round() as i64)
}

/// Flattens an arc into a polyline in its workplane's local `(u, v)`,
/// walking counterclockwise from `start` to `end` about `center`. Arcs in
/// this model are always wound counterclockwise with respect to their
/// normal, matching the convention `kernel_solver`'s angle constraints
/// assume.
fn flatten_arc_uv(center: (f64, f64), start: (f64, f64), end: (f64, f64)) -> Vec<(f64, f64)> {
    let radius = ((start.0 - center.0).powi(2) + (start.1 - center.1).powi(2)).sqrt();
    let a0 = (start.1 - center.1).atan2(start.0 - center.0);
    let mut a1 = (end.1 - center.1).atan2(end.0 - center.0);
    while a1 < a0 {
        a1 += std::f64::consts::TAU;
    }
    (0..=ARC_SEGMENTS)
        .map(|i| {
            let t = a0 + (a1 - a0) * (i as f64) / (ARC_SEGMENTS as f64);
            (center.0 + radius * t.cos(), center.1 + radius * t.sin())
        })
        .collect()
}

/// Traces every simple closed loop out of an undirected edge graph given by
/// vertex indices, consuming each edge exactly once.
fn trace_loops(edges: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let mut adjacency: HashMap<usize, Vec<usize>> = HashMap::new();
    for &(a, b) in edges {
        adjacency.entry(a).or_default().push(b);
        adjacency.entry(b).or_default().push(a);
    }
    let mut visited: std::collections::HashSet<(usize, usize)> = std::collections::HashSet::new();
    let mut loops = Vec::new();
    for &(start, _) in edges {
        if adjacency.get(&start).map_or(true, |ns| ns.iter().all(|&n| visited.contains(&(start, n)) && visited.contains(&(n, start)))) {
            continue;
        }
        let mut loop_pts = vec![start];
        let mut cur = start;
        loop {
            let next = adjacency[&cur].iter().copied().find(|&n| !visited.contains(&(cur, n)));
            let Some(next) = next else { break };
            visited.insert((cur, next));
            visited.insert((next, cur));
            if next == start {
                break;
            }
            loop_pts.push(next);
            cur = next;
        }
        if loop_pts.len() >= 3 {
            loops.push(loop_pts);
        }
    }
    loops
}

/// Flattens a full circle into a closed polyline in its workplane's local
/// `(u, v)`, the same sampling density as [`flatten_arc_uv`].
fn flatten_circle_uv(center: (f64, f64), radius: f64) -> Vec<(f64, f64)> {
    (0..=ARC_SEGMENTS)
        .map(|i| {
            let t = std::f64::consts::TAU * (i as f64) / (ARC_SEGMENTS as f64);
            (center.0 + radius * t.cos(), center.1 + radius * t.sin())
        })
        .collect()
}

/// Assembles every LineSegment/ArcOfCircle/Circle belonging to `group` into a
/// (possibly multiply-connected) polygon in the group's own workplane `u,
/// v`. Returns [`RegenError::EmptyContour`] if the group has no such
/// entities, or if what it has doesn't close into at least one loop.
pub fn planar_contours(sketch: &Sketch, group: HGroup) -> Result<Polygon2, RegenError> {
    let mut segments: Vec<((f64, f64), (f64, f64))> = Vec::new();
    for e in sketch.entities.iter() {
        if e.group != group || e.construction {
            continue;
        }
        match &e.kind {
            EntityKind::LineSegment { point0, point1 } => {
                segments.push((point_local_uv(sketch, *point0), point_local_uv(sketch, *point1)));
            }
            EntityKind::ArcOfCircle { center, start, end, .. } => {
                let pts = flatten_arc_uv(
                    point_local_uv(sketch, *center),
                    point_local_uv(sketch, *start),
                    point_local_uv(sketch, *end),
                );
                for w in pts.windows(2) {
                    segments.push((w[0], w[1]));
                }
            }
            EntityKind::Circle { center, radius, .. } => {
                let pts = flatten_circle_uv(point_local_uv(sketch, *center), distance_numeric(sketch, *radius));
                for w in pts.windows(2) {
                    segments.push((w[0], w[1]));
                }
            }
            _ => {}
        }
    }
    if segments.is_empty() {
        return Err(RegenError::EmptyContour(group));
    }

    let mut points: Vec<(f64, f64)> = Vec::new();
    let mut index: HashMap<(i64, i64), usize> = HashMap::new();
    let mut canon = |p: (f64, f64)| -> usize {
        *index.entry(key2(p)).or_insert_with(|| {
            points.push(p);
            points.len() - 1
        })
    };
    let edges: Vec<(usize, usize)> = segments.iter().map(|&(a, b)| (canon(a), canon(b))).collect();

    let loops = trace_loops(&edges);
    if loops.is_empty() {
        return Err(RegenError::EmptyContour(group));
    }

    let ring_points: Vec<Vec<Point2>> =
        loops.iter().map(|l| l.iter().map(|&i| point2(points[i].0, points[i].1)).collect()).collect();

    let contours = ring_points
        .iter()
        .enumerate()
        .map(|(i, pts)| {
            let sample = pts[0];
            let enclosed = ring_points
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .filter(|(_, other)| {
                    let edges: Vec<kernel_mesh::bsp2::Edge2> = other
                        .windows(2)
                        .map(|w| kernel_mesh::bsp2::Edge2 { a: (w[0].u, w[0].v), b: (w[1].u, w[1].v) })
                        .chain(std::iter::once(kernel_mesh::bsp2::Edge2 {
                            a: (other[other.len() - 1].u, other[other.len() - 1].v),
                            b: (other[0].u, other[0].v),
                        }))
                        .collect();
                    kernel_mesh::Bsp2::build(edges).contains_point((sample.u, sample.v))
                })
                .count() as u32;
            Contour { points: pts.clone(), enclosed }
        })
        .collect();

    Ok(Polygon2 { contours })
}

/// Assembles a Group's own LineSegment entities (expected to be in 3D,
/// `Drawing3d`) into an ordered polyline: the trajectory a sweep follows.
///
/// Per the start-selection rule, a non-closed trajectory starts at whichever
/// endpoint isn't shared with any other edge; a closed trajectory (every
/// vertex has degree 2) starts arbitrarily at its first edge, since a loop
/// has no distinguished start.
pub fn trajectory_points_3d(sketch: &Sketch, group: HGroup) -> Result<Vec<Vec3>, RegenError> {
    let mut segments: Vec<(Vec3, Vec3)> = Vec::new();
    for e in sketch.entities.iter() {
        if e.group != group || e.construction {
            continue;
        }
        if let EntityKind::LineSegment { point0, point1 } = &e.kind {
            segments.push((point_numeric(sketch, *point0), point_numeric(sketch, *point1)));
        }
    }
    if segments.is_empty() {
        return Err(RegenError::EmptyContour(group));
    }

    let mut points: Vec<Vec3> = Vec::new();
    let mut index: HashMap<(i64, i64, i64), usize> = HashMap::new();
    let mut canon = |p: Vec3| -> usize {
        *index.entry(key3(p)).or_insert_with(|| {
            points.push(p);
            points.len() - 1
        })
    };
    let edges: Vec<(usize, usize)> = segments.iter().map(|&(a, b)| (canon(a), canon(b))).collect();

    let mut adjacency: HashMap<usize, Vec<usize>> = HashMap::new();
    for &(a, b) in &edges {
        adjacency.entry(a).or_default().push(b);
        adjacency.entry(b).or_default().push(a);
    }
    let start = adjacency.iter().find(|(_, ns)| ns.len() == 1).map(|(&v, _)| v).unwrap_or(edges[0].0);

    let mut visited: std::collections::HashSet<(usize, usize)> = std::collections::HashSet::new();
    let mut ordered = vec![start];
    let mut cur = start;
    loop {
        let next = adjacency[&cur].iter().copied().find(|&n| !visited.contains(&(cur, n)));
        let Some(next) = next else { break };
        visited.insert((cur, next));
        visited.insert((next, cur));
        ordered.push(next);
        cur = next;
        if next == start {
            break;
        }
    }

    Ok(ordered.into_iter().map(|i| points[i]).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_arc_walks_counterclockwise_a_quarter_turn() {
        let pts = flatten_arc_uv((0.0, 0.0), (1.0, 0.0), (0.0, 1.0));
        assert_eq!(pts.len(), ARC_SEGMENTS + 1);
        assert!((pts[0].0 - 1.0).abs() < 1e-9 && pts[0].1.abs() < 1e-9);
        assert!(pts.last().unwrap().0.abs() < 1e-9 && (pts.last().unwrap().1 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn trace_loops_finds_a_single_closed_square() {
        let edges = vec![(0, 1), (1, 2), (2, 3), (3, 0)];
        let loops = trace_loops(&edges);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 4);
    }
}
