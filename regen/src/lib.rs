//! The regeneration pipeline (`spec.md` §4.6): walks every dirty Group in
//! order, regenerates its Requests into Entities/Params, solves it, builds
//! its own mesh and folds that into the running assembly.
//!
//! Deliberately the one crate that depends on both `kernel_sketch` and
//! `kernel_mesh` — see `kernel_sketch::group`'s doc comment for why the
//! mesh caches and remap tables live here rather than on `Group` itself.

pub mod builders;
pub mod numeric;
pub mod wire;

use std::collections::HashMap;

use kernel_mesh::bsp3::{boolean, BooleanOp, Bsp3};
use kernel_mesh::{Mesh, MeshError};
use kernel_sketch::{
    CombinePolicy, CopyRange, Entity, EntityKind, GenerationError, Group, GroupError, GroupKind, GroupSolveStatus,
    HEntity, HGroup, HRequest, Sketch,
};
use kernel_solver::{SolveStatus, SolverConfig};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RegenError {
    #[error("request generation failed: {0:?}")]
    Generation(#[from] GenerationError),
    #[error("group {0:?} does not exist")]
    MissingGroup(HGroup),
    #[error("group {0:?} has no source group to build from")]
    MissingSource(HGroup),
    #[error("group {0:?}'s source isn't a 2D drawing group")]
    SourceNotPlanar(HGroup),
    #[error("group {0:?} has no closed contour to build from")]
    EmptyContour(HGroup),
    #[error("a sweep trajectory needs at least two points")]
    EmptyTrajectory,
    #[error("a lathe or helical sweep axis can't pass through the profile's own reference point")]
    BadAxis,
    #[error("mesh construction failed: {0}")]
    Mesh(#[from] MeshError),
}

/// Everything a regenerated Group produces and caches: its own mesh, the
/// running assembly through this Group (`runningMesh` in the original), and
/// the stable face-entity handles later Groups can reference.
#[derive(Clone, Debug, Default)]
pub struct GroupMeshes {
    pub this_mesh: Mesh,
    pub running_mesh: Mesh,
    pub faces: HashMap<u32, HEntity>,
}

/// Regenerates every dirty Group, in ascending handle order (a Group's
/// handle is always greater than its predecessor's, since groups are
/// created in sequence — the original's `SS.group` list order). A Group
/// already clean and already cached is skipped entirely, which is what
/// makes running this twice with no intervening mutation idempotent
/// (`spec.md` §8 invariant 5): the second pass touches nothing.
pub fn regenerate_all(sketch: &mut Sketch, config: &SolverConfig, caches: &mut HashMap<HGroup, GroupMeshes>) -> Result<(), RegenError> {
    let mut order: Vec<HGroup> = sketch.groups.iter().map(|g| g.id).collect();
    order.sort_by_key(|h| h.v());
    for g in order {
        regenerate_one(sketch, g, config, caches)?;
    }
    Ok(())
}

fn regenerate_one(sketch: &mut Sketch, g: HGroup, config: &SolverConfig, caches: &mut HashMap<HGroup, GroupMeshes>) -> Result<(), RegenError> {
    let dirty = sketch.groups.get(g).ok_or(RegenError::MissingGroup(g))?.dirty;
    if !dirty && caches.contains_key(&g) {
        return Ok(());
    }

    regenerate_requests(sketch, g)?;

    let status = kernel_solver::solve(sketch, g, config);
    if let Some(group) = sketch.groups.get_mut(g) {
        group.solve_status = to_group_status(&status);
    }

    let kind = sketch.groups.get(g).ok_or(RegenError::MissingGroup(g))?.kind.clone();
    let this_mesh = build_group_mesh(sketch, g, &kind, caches)?;
    let faces = register_faces(sketch, g, &this_mesh);

    let predecessor = sketch.groups.get(g).ok_or(RegenError::MissingGroup(g))?.predecessor;
    let combine = sketch.groups.get(g).ok_or(RegenError::MissingGroup(g))?.combine;
    let running_mesh = combine_meshes(sketch, g, predecessor, combine, &this_mesh, caches);

    caches.insert(g, GroupMeshes { this_mesh, running_mesh, faces });
    if let Some(group) = sketch.groups.get_mut(g) {
        group.dirty = false;
    }
    Ok(())
}

/// Clears every Entity/Param this Group's Requests own and regenerates them
/// fresh. `Request::generate` is itself idempotent (same id, same shape
/// every time), so this whole step is a no-op if nothing about the
/// Requests changed since the last regen.
fn regenerate_requests(sketch: &mut Sketch, g: HGroup) -> Result<(), RegenError> {
    let group = sketch.groups.get(g).ok_or(RegenError::MissingGroup(g))?;
    let owned = group.own_params();
    sketch.entities.remove_tagged(|e| e.group == g);
    sketch.params.remove_tagged(|p| p.group == g && !owned.contains(&p.id));

    let request_ids: Vec<HRequest> = sketch.groups.get(g).ok_or(RegenError::MissingGroup(g))?.requests.clone();
    for rid in request_ids {
        let req = sketch.requests.get(rid).expect("group references a request it doesn't own").clone();
        let (entities, params) = req.generate()?;
        for e in entities {
            sketch.entities.insert(e.id, e);
        }
        for p in params {
            sketch.params.insert(p.id, p);
        }
    }
    Ok(())
}

fn to_group_status(status: &SolveStatus) -> GroupSolveStatus {
    match status {
        SolveStatus::Okay { dof } => GroupSolveStatus::Okay { dof: (*dof).max(0) as u32 },
        SolveStatus::DidntConverge { .. } => GroupSolveStatus::DidntConverge,
        SolveStatus::RedundantOkay { dof } => GroupSolveStatus::RedundantOkay { dof: (*dof).max(0) as u32 },
        SolveStatus::RedundantDidntConverge { .. } => GroupSolveStatus::RedundantDidntConverge,
        SolveStatus::TooManyUnknowns => GroupSolveStatus::TooManyUnknowns,
    }
}

fn workplane_of(sketch: &Sketch, source: HGroup) -> Result<HEntity, RegenError> {
    let group = sketch.groups.get(source).ok_or(RegenError::MissingSource(source))?;
    match &group.kind {
        GroupKind::DrawingWorkplane { workplane } => Ok(*workplane),
        _ => Err(RegenError::SourceNotPlanar(source)),
    }
}

fn build_group_mesh(
    sketch: &Sketch,
    g: HGroup,
    kind: &GroupKind,
    caches: &HashMap<HGroup, GroupMeshes>,
) -> Result<Mesh, RegenError> {
    match kind {
        GroupKind::Drawing3d | GroupKind::DrawingWorkplane { .. } | GroupKind::Linked { .. } => {
            if matches!(kind, GroupKind::Linked { path }  if !path.is_empty()) {
                tracing::warn!(group = g.v(), "linked-file import is not wired up at the regen layer; producing an empty mesh");
            }
            Ok(Mesh::new())
        }
        GroupKind::Extrude { source, direction, range } => {
            let workplane = workplane_of(sketch, *source)?;
            let poly = wire::planar_contours(sketch, *source)?;
            let dir = numeric::params_vec3(sketch, *direction);
            let to_world = move |p: kernel_mesh::triangulate::Point2| numeric::workplane_to_world_numeric(sketch, workplane, (p.u, p.v));
            builders::extrude(&poly, to_world, dir, *range == CopyRange::TwoSided)
        }
        GroupKind::Lathe { source, axis_point, axis_dir } => {
            let workplane = workplane_of(sketch, *source)?;
            let poly = wire::planar_contours(sketch, *source)?;
            let ap = numeric::point_numeric(sketch, *axis_point);
            let ad = numeric::point_numeric(sketch, *axis_dir);
            let dir = (ad - ap).normalize();
            let to_world = move |p: kernel_mesh::triangulate::Point2| numeric::workplane_to_world_numeric(sketch, workplane, (p.u, p.v));
            builders::lathe(&poly, to_world, ap, dir, builders::LATHE_SLICES)
        }
        GroupKind::Sweep { source, trajectory } => {
            // Just a validity check here: the profile's own world position
            // plays no part in a sweep, only its local (u, v) — see `builders::sweep`.
            let _ = workplane_of(sketch, *source)?;
            let poly = wire::planar_contours(sketch, *source)?;
            let traj = wire::trajectory_points_3d(sketch, *trajectory)?;
            builders::sweep(&poly, &traj)
        }
        GroupKind::HelicalSweep { source, axis_point, axis_dir, turns, pitch, d_radius, left_handed } => {
            let workplane = workplane_of(sketch, *source)?;
            let poly = wire::planar_contours(sketch, *source)?;
            let ap = numeric::point_numeric(sketch, *axis_point);
            let ad = numeric::point_numeric(sketch, *axis_dir);
            let dir = (ad - ap).normalize();
            let turns_v = sketch.params.get(*turns).map(|p| p.val).unwrap_or(1.0);
            let pitch_v = sketch.params.get(*pitch).map(|p| p.val).unwrap_or(0.0);
            let d_radius_v = sketch.params.get(*d_radius).map(|p| p.val).unwrap_or(0.0);
            // The profile's own first contour point, mapped through its
            // source workplane, fixes where the helix starts: `GroupKind`
            // carries no separate on-helix-point field to read instead.
            let first_point = first_contour_point(&poly)?;
            let on_helix = numeric::workplane_to_world_numeric(sketch, workplane, (first_point.u, first_point.v));
            builders::helical_sweep(&poly, ap, dir, on_helix, turns_v, pitch_v, d_radius_v, *left_handed)
        }
        GroupKind::StepTranslate { n, translate, range, skip_first } => {
            let predecessor = sketch.groups.get(g).ok_or(RegenError::MissingGroup(g))?.predecessor;
            let base = caches.get(&predecessor).map(|c| c.this_mesh.clone()).unwrap_or_default();
            let delta = numeric::params_vec3(sketch, *translate);
            Ok(builders::step_translate(&base, *n, delta, *range == CopyRange::TwoSided, *skip_first))
        }
        GroupKind::StepRotate { n, axis_point, axis_dir, angle, range, skip_first } => {
            let predecessor = sketch.groups.get(g).ok_or(RegenError::MissingGroup(g))?.predecessor;
            let base = caches.get(&predecessor).map(|c| c.this_mesh.clone()).unwrap_or_default();
            let ap = numeric::point_numeric(sketch, *axis_point);
            let ad = numeric::point_numeric(sketch, *axis_dir);
            let dir = (ad - ap).normalize();
            let angle_v = sketch.params.get(*angle).map(|p| p.val).unwrap_or(0.0);
            Ok(builders::step_rotate(&base, *n, ap, dir, angle_v, *range == CopyRange::TwoSided, *skip_first))
        }
    }
}

fn first_contour_point(poly: &kernel_mesh::triangulate::Polygon2) -> Result<kernel_mesh::triangulate::Point2, RegenError> {
    poly.contours.first().and_then(|c| c.points.first()).copied().ok_or(RegenError::EmptyContour(HGroup::NONE))
}

/// Creates one `Face` entity per distinct face tag this Group's mesh uses,
/// so later Groups (a constraint, a selection) have a stable handle to
/// reference it by (`spec.md` §4.7's remap tables).
fn register_faces(sketch: &mut Sketch, g: HGroup, mesh: &Mesh) -> HashMap<u32, HEntity> {
    let mut tags: Vec<u32> = mesh.triangles.iter().map(|t| t.face).collect();
    tags.sort_unstable();
    tags.dedup();
    tags.into_iter()
        .map(|tag| {
            let id = sketch.entities.add_and_assign_id(|id| Entity {
                id,
                group: g,
                request: HRequest::NONE,
                workplane: HEntity::NONE,
                construction: false,
                kind: EntityKind::Face { plane: None },
            });
            (tag, id)
        })
        .collect()
}

fn combine_meshes(
    sketch: &mut Sketch,
    g: HGroup,
    predecessor: HGroup,
    combine: CombinePolicy,
    this_mesh: &Mesh,
    caches: &HashMap<HGroup, GroupMeshes>,
) -> Mesh {
    let running_pred = caches.get(&predecessor).map(|c| c.running_mesh.clone()).unwrap_or_default();

    match combine {
        CombinePolicy::Assemble => {
            let mut m = running_pred;
            m.append(this_mesh);
            m
        }
        CombinePolicy::Union | CombinePolicy::Difference => {
            let a = running_pred.as_bsp_triangles();
            let b = this_mesh.as_bsp_triangles();
            let a_tree = Bsp3::build(a.clone());
            let b_tree = Bsp3::build(b.clone());
            let op = if combine == CombinePolicy::Union { BooleanOp::Union } else { BooleanOp::Difference };
            let result = boolean(op, &a, &a_tree, &b, &b_tree);
            Mesh::from_bsp_triangles(&result.kept)
        }
        CombinePolicy::InterferenceCheck => {
            let a = running_pred.as_bsp_triangles();
            let b = this_mesh.as_bsp_triangles();
            let a_tree = Bsp3::build(a.clone());
            let b_tree = Bsp3::build(b.clone());
            let result = boolean(BooleanOp::Interference, &a, &a_tree, &b, &b_tree);
            if !result.interference.is_empty() {
                if let Some(group) = sketch.groups.get_mut(g) {
                    group.error = Some(GroupError::InterferenceDetected);
                }
            }
            let mut m = running_pred;
            m.append(this_mesh);
            m
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_geom::vec3;
    use kernel_mesh::Tri;

    fn two_triangle_mesh(face_a: u32, face_b: u32) -> Mesh {
        let mut m = Mesh::new();
        m.vertices.push(vec3(0.0, 0.0, 0.0));
        m.vertices.push(vec3(1.0, 0.0, 0.0));
        m.vertices.push(vec3(0.0, 1.0, 0.0));
        m.vertices.push(vec3(1.0, 1.0, 0.0));
        m.triangles.push(Tri { a: 0, b: 1, c: 2, face: face_a });
        m.triangles.push(Tri { a: 1, b: 3, c: 2, face: face_b });
        m
    }

    #[test]
    fn register_faces_assigns_one_entity_per_distinct_tag() {
        let mut sk = Sketch::new();
        let g = sk.groups.add_and_assign_id(|id| Group::new(id, kernel_sketch::HGROUP_REFERENCES, GroupKind::Drawing3d));
        let mesh = two_triangle_mesh(7, 7);
        // Both triangles share face 7: exactly one Face entity should be created.
        let faces = register_faces(&mut sk, g, &mesh);
        assert_eq!(faces.len(), 1);
        assert!(faces.contains_key(&7));
        assert!(sk.entities.get(faces[&7]).is_some());
    }

    #[test]
    fn register_faces_distinguishes_two_tags() {
        let mut sk = Sketch::new();
        let g = sk.groups.add_and_assign_id(|id| Group::new(id, kernel_sketch::HGROUP_REFERENCES, GroupKind::Drawing3d));
        let mesh = two_triangle_mesh(0, 1);
        let faces = register_faces(&mut sk, g, &mesh);
        assert_eq!(faces.len(), 2);
        assert_ne!(faces[&0], faces[&1]);
    }

    #[test]
    fn assemble_combine_appends_this_mesh_onto_the_predecessors_running_mesh() {
        let mut sk = Sketch::new();
        let g = sk.groups.add_and_assign_id(|id| Group::new(id, kernel_sketch::HGROUP_REFERENCES, GroupKind::Drawing3d));
        let predecessor = kernel_sketch::HGROUP_REFERENCES;
        let mut caches = HashMap::new();
        caches.insert(predecessor, GroupMeshes { this_mesh: Mesh::new(), running_mesh: two_triangle_mesh(0, 1), faces: HashMap::new() });
        let this_mesh = two_triangle_mesh(2, 2);
        let combined = combine_meshes(&mut sk, g, predecessor, CombinePolicy::Assemble, &this_mesh, &caches);
        assert_eq!(combined.triangles.len(), 4);
        assert_eq!(combined.vertices.len(), 8);
    }

    #[test]
    fn to_group_status_maps_every_solver_outcome() {
        assert_eq!(to_group_status(&SolveStatus::Okay { dof: 3 }), GroupSolveStatus::Okay { dof: 3 });
        assert_eq!(to_group_status(&SolveStatus::TooManyUnknowns), GroupSolveStatus::TooManyUnknowns);
        assert_eq!(to_group_status(&SolveStatus::DidntConverge { bad: vec![] }), GroupSolveStatus::DidntConverge);
    }

    #[test]
    fn regenerate_all_on_a_fresh_sketch_with_no_buildable_groups_is_a_no_op() {
        let mut sk = Sketch::new();
        let config = SolverConfig::default();
        let mut caches = HashMap::new();
        regenerate_all(&mut sk, &config, &mut caches).unwrap();
        // The references group itself has no mesh-producing kind.
        assert!(caches.get(&kernel_sketch::HGROUP_REFERENCES).unwrap().this_mesh.triangles.is_empty());

        // A second pass with nothing dirty must leave the cache untouched
        // (spec.md's idempotent-regeneration invariant).
        let before = caches.get(&kernel_sketch::HGROUP_REFERENCES).unwrap().running_mesh.vertices.len();
        regenerate_all(&mut sk, &config, &mut caches).unwrap();
        let after = caches.get(&kernel_sketch::HGROUP_REFERENCES).unwrap().running_mesh.vertices.len();
        assert_eq!(before, after);
    }
}
