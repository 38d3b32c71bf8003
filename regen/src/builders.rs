//! Per-Group mesh builders (`spec.md` §4.7): extrude, lathe, sweep, helical
//! sweep, and the rigid-copy builders (step-translate, step-rotate,
//! imported), all funneling through [`loft`], the shared "connect a ring of
//! section polygons" primitive every swept shape reduces to.

use kernel_geom::{Quaternion, Vec3};
use kernel_mesh::triangulate::{triangulate_polygon, Point2, Polygon2};
use kernel_mesh::{Mesh, Tri};

use crate::RegenError;

pub const LATHE_SLICES: usize = 48;
pub const HELIX_STEPS_PER_TURN: usize = 32;

fn add_cap(mesh: &mut Mesh, pts: &[Vec3], tris: &[[usize; 3]], face: u32, reversed: bool) {
    let base = mesh.vertices.len() as u32;
    mesh.vertices.extend_from_slice(pts);
    for t in tris {
        let (a, b, c) = if reversed { (t[0], t[2], t[1]) } else { (t[0], t[1], t[2]) };
        mesh.triangles.push(Tri { a: base + a as u32, b: base + b as u32, c: base + c as u32, face });
    }
}

/// Connects `steps` transformed copies of `poly`'s rings into a lateral
/// surface, one band per polygon edge per adjacent step pair. `closed`
/// selects whether the last step wraps back to the first (lathe, a closed
/// trajectory sweep) or gets its own end cap (extrude, an open sweep).
pub fn loft(poly: &Polygon2, transform: impl Fn(usize, Point2) -> Vec3, steps: usize, closed: bool) -> Result<Mesh, RegenError> {
    let mut mesh = Mesh::new();
    let mut face = 0u32;

    if !closed {
        let (merged, tris) = triangulate_polygon(poly)?;
        let bottom: Vec<Vec3> = merged.iter().map(|&p| transform(0, p)).collect();
        add_cap(&mut mesh, &bottom, &tris, face, true);
        face += 1;
        let top: Vec<Vec3> = merged.iter().map(|&p| transform(steps - 1, p)).collect();
        add_cap(&mut mesh, &top, &tris, face, false);
        face += 1;
    }

    let step_pairs: Vec<(usize, usize)> = if closed {
        (0..steps).map(|s| (s, (s + 1) % steps)).collect()
    } else {
        (0..steps - 1).map(|s| (s, s + 1)).collect()
    };

    for contour in &poly.contours {
        let n = contour.points.len();
        for &(s0, s1) in &step_pairs {
            for i in 0..n {
                let j = (i + 1) % n;
                let a0 = transform(s0, contour.points[i]);
                let a1 = transform(s0, contour.points[j]);
                let b0 = transform(s1, contour.points[i]);
                let b1 = transform(s1, contour.points[j]);
                let base = mesh.vertices.len() as u32;
                mesh.vertices.extend_from_slice(&[a0, a1, b1, b0]);
                mesh.triangles.push(Tri { a: base, b: base + 1, c: base + 2, face });
                mesh.triangles.push(Tri { a: base, b: base + 2, c: base + 3, face });
            }
            face += 1;
        }
    }

    Ok(mesh)
}

/// Builds the two offset copies of `poly` (its own plane plus `direction`)
/// and the side walls between them (`GroupKind::Extrude`).
pub fn extrude(poly: &Polygon2, to_world: impl Fn(Point2) -> Vec3, direction: Vec3, two_sided: bool) -> Result<Mesh, RegenError> {
    let (bottom, top) = if two_sided {
        (direction.scaled_by(-0.5), direction.scaled_by(0.5))
    } else {
        (Vec3::ZERO, direction)
    };
    loft(poly, move |step, p| to_world(p) + if step == 0 { bottom } else { top }, 2, false)
}

/// Revolves `poly` a full turn about the line through `axis_point` in
/// direction `axis_dir` (`GroupKind::Lathe` carries no sweep-angle field, so
/// a lathe is always a closed 2-pi revolve).
pub fn lathe(poly: &Polygon2, to_world: impl Fn(Point2) -> Vec3, axis_point: Vec3, axis_dir: Vec3, slices: usize) -> Result<Mesh, RegenError> {
    loft(
        poly,
        move |step, p| {
            let base = to_world(p);
            let angle = std::f64::consts::TAU * (step as f64) / (slices as f64);
            let q = Quaternion::from_axis_angle(axis_dir, angle);
            axis_point + q.rotate(base - axis_point)
        },
        slices,
        true,
    )
}

/// Parallel-transported frames along `trajectory`: each frame's `u, v` is
/// the previous frame's, rotated by the minimal rotation that carries the
/// previous segment's tangent onto the next one's — the "minimum twist"
/// rule `spec.md` §4.7 asks a sweep's section to hold to.
fn parallel_transport_frames(trajectory: &[Vec3]) -> Vec<(Vec3, Vec3, Vec3)> {
    let n = trajectory.len();
    let mut frames = Vec::with_capacity(n);
    let t0 = (trajectory[1] - trajectory[0]).normalize();
    let (mut u, mut v) = kernel_geom::plane_basis(t0);
    frames.push((trajectory[0], u, v));
    let mut prev_tangent = t0;
    for i in 1..n {
        let next_index = if i + 1 < n { i + 1 } else { i };
        let tangent = if next_index != i {
            (trajectory[next_index] - trajectory[i]).normalize()
        } else {
            prev_tangent
        };
        let axis = prev_tangent.cross(tangent);
        if axis.magnitude() > 1e-12 {
            let angle = prev_tangent.dot(tangent).clamp(-1.0, 1.0).acos();
            let q = Quaternion::from_axis_angle(axis.normalize(), angle);
            u = q.rotate(u);
            v = q.rotate(v);
        }
        frames.push((trajectory[i], u, v));
        prev_tangent = tangent;
    }
    frames
}

fn is_closed_loop(trajectory: &[Vec3]) -> bool {
    trajectory.len() > 2 && trajectory[0].approx_eq(trajectory[trajectory.len() - 1], 1e-6)
}

/// Sweeps `poly` along `trajectory`, holding its section normal to the
/// trajectory with minimum twist (`GroupKind::Sweep`). `poly`'s points are
/// its own local `(u, v)`, reinterpreted directly against each trajectory
/// frame's transported basis rather than against the profile's originating
/// workplane: a swept section carries no meaning tied to where its source
/// sketch happened to sit, only to the trajectory it's carried along.
pub fn sweep(poly: &Polygon2, trajectory: &[Vec3]) -> Result<Mesh, RegenError> {
    if trajectory.len() < 2 {
        return Err(RegenError::EmptyTrajectory);
    }
    let frames = parallel_transport_frames(trajectory);
    let closed = is_closed_loop(trajectory);
    let steps = frames.len();
    loft(
        poly,
        move |step, p| {
            let (origin, u, v) = frames[step.min(steps - 1)];
            origin + u.scaled_by(p.u) + v.scaled_by(p.v)
        },
        steps,
        closed,
    )
}

/// Generates a parametric helix trajectory from `axis_point`/`axis_dir`,
/// the start radius implied by `on_helix_point`, `turns`, `pitch` and
/// `d_radius` (radius gained per turn), then hands off to [`sweep`]
/// (`GroupKind::HelicalSweep`).
#[allow(clippy::too_many_arguments)]
pub fn helical_sweep(
    poly: &Polygon2,
    axis_point: Vec3,
    axis_dir: Vec3,
    on_helix_point: Vec3,
    turns: f64,
    pitch: f64,
    d_radius: f64,
    left_handed: bool,
) -> Result<Mesh, RegenError> {
    let axis_dir = axis_dir.normalize();
    let radial = on_helix_point - axis_point - axis_dir.scaled_by((on_helix_point - axis_point).dot(axis_dir));
    let radius0 = radial.magnitude();
    if radius0 < 1e-9 {
        return Err(RegenError::BadAxis);
    }
    let u0 = radial.normalize();
    let v0 = axis_dir.cross(u0).normalize();
    let sign = if left_handed { -1.0 } else { 1.0 };
    let total_steps = ((HELIX_STEPS_PER_TURN as f64) * turns).round().max(2.0) as usize;

    let trajectory: Vec<Vec3> = (0..=total_steps)
        .map(|i| {
            let t = i as f64 / HELIX_STEPS_PER_TURN as f64;
            let angle = sign * std::f64::consts::TAU * t;
            let radius = radius0 + d_radius * t;
            axis_point + axis_dir.scaled_by(pitch * t) + u0.scaled_by(angle.cos() * radius) + v0.scaled_by(angle.sin() * radius)
        })
        .collect();

    sweep(poly, &trajectory)
}

fn copy_indices(n: u32, two_sided: bool, skip_first: bool) -> Vec<i64> {
    let range: Vec<i64> = if two_sided {
        let half = n as i64 / 2;
        (-half..=half).collect()
    } else {
        (0..n as i64).collect()
    };
    range.into_iter().filter(|k| !(skip_first && *k == 0)).collect()
}

/// `n` translated copies of `base` (`GroupKind::StepTranslate`).
pub fn step_translate(base: &Mesh, n: u32, delta: Vec3, two_sided: bool, skip_first: bool) -> Mesh {
    let mut out = Mesh::new();
    for k in copy_indices(n, two_sided, skip_first) {
        let offset = delta.scaled_by(k as f64);
        let mut copy = base.clone();
        for v in copy.vertices.iter_mut() {
            *v = *v + offset;
        }
        out.append(&copy);
    }
    out
}

/// `n` copies of `base` rotated about the `axis_point`/`axis_dir` line by
/// successive multiples of `angle_step` (`GroupKind::StepRotate`).
pub fn step_rotate(base: &Mesh, n: u32, axis_point: Vec3, axis_dir: Vec3, angle_step: f64, two_sided: bool, skip_first: bool) -> Mesh {
    let mut out = Mesh::new();
    for k in copy_indices(n, two_sided, skip_first) {
        let q = Quaternion::from_axis_angle(axis_dir, angle_step * k as f64);
        let mut copy = base.clone();
        for v in copy.vertices.iter_mut() {
            *v = axis_point + q.rotate(*v - axis_point);
        }
        out.append(&copy);
    }
    out
}

/// Applies a rigid transform to an already-triangulated mesh
/// (`GroupKind::Linked`'s import case, once the file is loaded).
pub fn imported(cached: &Mesh, translate: Vec3, rotation: Quaternion) -> Mesh {
    let mut m = cached.clone();
    for v in m.vertices.iter_mut() {
        *v = translate + rotation.rotate(*v);
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_geom::vec3;
    use kernel_mesh::triangulate::{point2, Contour};

    fn unit_square() -> Polygon2 {
        Polygon2 {
            contours: vec![Contour {
                points: vec![point2(0.0, 0.0), point2(1.0, 0.0), point2(1.0, 1.0), point2(0.0, 1.0)],
                enclosed: 0,
            }],
        }
    }

    #[test]
    fn extrude_produces_two_caps_and_four_side_bands() {
        let poly = unit_square();
        let mesh = extrude(&poly, |p| vec3(p.u, p.v, 0.0), vec3(0.0, 0.0, 1.0), false).unwrap();
        let faces: std::collections::HashSet<u32> = mesh.triangles.iter().map(|t| t.face).collect();
        // 2 caps + 4 side bands.
        assert_eq!(faces.len(), 6);
        assert_eq!(mesh.bbox().min, vec3(0.0, 0.0, 0.0));
        assert_eq!(mesh.bbox().max, vec3(1.0, 1.0, 1.0));
    }

    #[test]
    fn lathe_of_a_square_about_its_own_edge_closes_up() {
        let poly = unit_square();
        let mesh = lathe(&poly, |p| vec3(p.u + 2.0, 0.0, p.v), vec3(0.0, 0.0, 0.0), vec3(0.0, 0.0, 1.0), 8).unwrap();
        // No caps for a closed revolve: only side bands, one per edge per slice.
        let faces: std::collections::HashSet<u32> = mesh.triangles.iter().map(|t| t.face).collect();
        assert_eq!(faces.len(), 4 * 8);
    }

    #[test]
    fn step_translate_skipping_the_first_copy_omits_the_original_position() {
        let mut base = Mesh::new();
        base.vertices.push(vec3(0.0, 0.0, 0.0));
        base.triangles.push(Tri { a: 0, b: 0, c: 0, face: 0 });
        let out = step_translate(&base, 3, vec3(1.0, 0.0, 0.0), false, true);
        let xs: Vec<f64> = out.vertices.iter().map(|v| v.x).collect();
        assert!(!xs.contains(&0.0));
        assert_eq!(xs.len(), 2);
    }
}
