//! End-to-end scenarios driving the full stack — Sketch construction,
//! solving, regeneration and mesh classification — through the public
//! `kernel` facade rather than any one sub-crate in isolation.

use std::collections::HashMap;

use kernel::geom::vec3;
use kernel::mesh::{classify, classify_edge, Classification};
use kernel::regen::{regenerate_all, GroupMeshes};
use kernel::solver::{solve, SolveStatus, SolverConfig};
use kernel::sketch::{
    handle::offset, CombinePolicy, Constraint, ConstraintKind, CopyRange, Entity, EntityKind, Group, GroupKind,
    HEntity, HGroup, HParam, HRequest, Param, Request, RequestKind, Sketch, HGROUP_REFERENCES,
};

fn xy_workplane() -> HEntity {
    HEntity::of_request(kernel::sketch::HREQUEST_REFERENCE_XY, offset::PRIMARY_ENTITY)
}

/// A closed 2D square drawn directly onto `group`'s own handle space (no
/// owning Request), the way a hand-placed reference profile would look once
/// past the solver. Used by the scenarios below for a subtrahend or a base
/// profile whose exact coordinates matter more than how it got there.
fn place_square(sk: &mut Sketch, group: HGroup, xy: HEntity, corners: [(f64, f64); 4]) {
    let mut point_ids = [HEntity::NONE; 4];
    for (i, &(u, v)) in corners.iter().enumerate() {
        let pid = HEntity::of_group(group, i as u32);
        let up = HParam::of_group(group, (2 * i) as u32);
        let vp = HParam::of_group(group, (2 * i + 1) as u32);
        sk.params.insert(up, Param::new(up, group, u));
        sk.params.insert(vp, Param::new(vp, group, v));
        sk.entities.insert(
            pid,
            Entity {
                id: pid,
                group,
                request: HRequest::NONE,
                workplane: xy,
                construction: false,
                kind: EntityKind::Point2d { workplane: xy, params: [up, vp] },
            },
        );
        point_ids[i] = pid;
    }
    for i in 0..4 {
        let seg_id = HEntity::of_group(group, 8 + i as u32);
        sk.entities.insert(
            seg_id,
            Entity {
                id: seg_id,
                group,
                request: HRequest::NONE,
                workplane: xy,
                construction: false,
                kind: EntityKind::LineSegment { point0: point_ids[i], point1: point_ids[(i + 1) % 4] },
            },
        );
    }
}

/// Creates a `DrawingWorkplane` group holding `corners`, marked clean and
/// pre-cached so [`regenerate_all`] skips it outright: its hand-placed
/// geometry is the input to a later builder group, not something the
/// pipeline should regenerate or solve.
fn square_profile_group(
    sk: &mut Sketch,
    predecessor: HGroup,
    xy: HEntity,
    corners: [(f64, f64); 4],
    caches: &mut HashMap<HGroup, GroupMeshes>,
) -> HGroup {
    let g = sk.groups.add_and_assign_id(|id| Group::new(id, predecessor, GroupKind::DrawingWorkplane { workplane: xy }));
    place_square(sk, g, xy, corners);
    sk.groups.get_mut(g).unwrap().dirty = false;
    caches.insert(g, GroupMeshes::default());
    g
}

fn direction_params(sk: &mut Sketch, group: HGroup, v: (f64, f64, f64)) -> [HParam; 3] {
    let px = HParam::of_group(group, 0);
    let py = HParam::of_group(group, 1);
    let pz = HParam::of_group(group, 2);
    sk.params.insert(px, Param::new(px, group, v.0));
    sk.params.insert(py, Param::new(py, group, v.1));
    sk.params.insert(pz, Param::new(pz, group, v.2));
    [px, py, pz]
}

/// Two 2D points, `PtPtDistance` driving one of them out to a target
/// length: the simplest possible well-determined solve.
#[test]
fn scenario_distance_constraint_drives_a_free_point_to_the_target_length() {
    let mut sk = Sketch::new();
    let xy = xy_workplane();
    let g = sk.groups.add_and_assign_id(|id| Group::new(id, HGROUP_REFERENCES, GroupKind::DrawingWorkplane { workplane: xy }));
    sk.active_group = g;

    let req = sk.requests.add_and_assign_id(|id| Request::new(id, g, RequestKind::LineSegment, xy));
    let (entities, params) = sk.requests.get(req).unwrap().generate().unwrap();
    for p in params {
        sk.params.insert(p.id, p);
    }
    let points: Vec<HEntity> = entities.iter().filter(|e| e.is_point()).map(|e| e.id).collect();
    for e in entities {
        sk.entities.insert(e.id, e);
    }
    let (p0, p1) = (points[0], points[1]);

    let uv = |sk: &Sketch, id: HEntity| match &sk.entities.get(id).unwrap().kind {
        EntityKind::Point2d { params, .. } => *params,
        other => panic!("expected a workplane point, got {other:?}"),
    };
    let [u0, v0] = uv(&sk, p0);
    sk.params.get_mut(u0).unwrap().force_to(0.0);
    sk.params.get_mut(v0).unwrap().force_to(0.0);
    let [u1, v1] = uv(&sk, p1);
    sk.params.get_mut(u1).unwrap().val = 3.0;
    sk.params.get_mut(v1).unwrap().val = 4.0;

    let val_a = sk.params.add_and_assign_id(|id| Param::new(id, g, 10.0));
    sk.constraints.add_and_assign_id(|id| Constraint {
        id,
        group: g,
        workplane: xy,
        kind: ConstraintKind::PtPtDistance { a: p0, b: p1, val_a },
    });

    let status = solve(&mut sk, g, &SolverConfig::default());
    let dof = match status {
        SolveStatus::Okay { dof } | SolveStatus::RedundantOkay { dof } => dof,
        other => panic!("expected convergence, got {other:?}"),
    };
    assert_eq!(dof, 1, "one pinned point, one free point, one distance equation");

    let (u1, v1) = (sk.params.get(u1).unwrap().val, sk.params.get(v1).unwrap().val);
    assert!(((u1 * u1 + v1 * v1).sqrt() - 10.0).abs() < 1e-6, "got ({u1}, {v1})");
}

/// A point constrained onto a horizontal line settles exactly onto it.
#[test]
fn scenario_pt_on_line_settles_a_point_onto_a_horizontal_line() {
    let mut sk = Sketch::new();
    let xy = xy_workplane();
    let g = sk.groups.add_and_assign_id(|id| Group::new(id, HGROUP_REFERENCES, GroupKind::DrawingWorkplane { workplane: xy }));
    sk.active_group = g;

    let line_req = sk.requests.add_and_assign_id(|id| Request::new(id, g, RequestKind::LineSegment, xy));
    let (line_entities, line_params) = sk.requests.get(line_req).unwrap().generate().unwrap();
    for p in line_params {
        sk.params.insert(p.id, p);
    }
    let line = line_entities.iter().find(|e| matches!(e.kind, EntityKind::LineSegment { .. })).unwrap().id;
    let line_points: Vec<HEntity> = line_entities.iter().filter(|e| e.is_point()).map(|e| e.id).collect();
    for e in line_entities {
        sk.entities.insert(e.id, e);
    }

    let uv = |sk: &Sketch, id: HEntity| match &sk.entities.get(id).unwrap().kind {
        EntityKind::Point2d { params, .. } => *params,
        other => panic!("expected a workplane point, got {other:?}"),
    };
    let [lu0, lv0] = uv(&sk, line_points[0]);
    sk.params.get_mut(lu0).unwrap().force_to(0.0);
    sk.params.get_mut(lv0).unwrap().force_to(0.0);
    let [lu1, lv1] = uv(&sk, line_points[1]);
    sk.params.get_mut(lu1).unwrap().force_to(2.0);
    sk.params.get_mut(lv1).unwrap().force_to(0.0);

    let point_req = sk.requests.add_and_assign_id(|id| Request::new(id, g, RequestKind::DatumPoint, xy));
    let (point_entities, point_params) = sk.requests.get(point_req).unwrap().generate().unwrap();
    for p in point_params {
        sk.params.insert(p.id, p);
    }
    let point = point_entities[0].id;
    for e in point_entities {
        sk.entities.insert(e.id, e);
    }
    let [pu, pv] = uv(&sk, point);
    sk.params.get_mut(pu).unwrap().force_to(1.0);
    sk.params.get_mut(pv).unwrap().val = 0.1;

    sk.constraints.add_and_assign_id(|id| Constraint {
        id,
        group: g,
        workplane: xy,
        kind: ConstraintKind::PtOnLine { point, line },
    });

    let status = solve(&mut sk, g, &SolverConfig::default());
    match status {
        SolveStatus::Okay { dof } | SolveStatus::RedundantOkay { dof } => assert_eq!(dof, 0),
        other => panic!("expected convergence, got {other:?}"),
    }
    assert!(sk.params.get(pv).unwrap().val.abs() < 1e-9);
}

/// Three free points pairwise pinned coincident, including one constraint
/// that's redundant with the other two. Every one of the nine per-axis
/// equations this produces is a bare `a - b = 0` shape with both sides
/// already free, so Stage A's symbolic substitution absorbs the whole
/// system before Newton or the redundancy repair ever run: this converges
/// as a plain `Okay`, not `RedundantOkay` — the redundancy here never makes
/// it past substitution to be detected as such.
#[test]
fn scenario_three_pairwise_coincident_points_collapse_via_substitution() {
    let mut sk = Sketch::new();
    let g = sk.groups.add_and_assign_id(|id| Group::new(id, HGROUP_REFERENCES, GroupKind::Drawing3d));
    sk.active_group = g;

    let mut make_point = |sk: &mut Sketch, val: (f64, f64, f64)| -> HEntity {
        let req = sk.requests.add_and_assign_id(|id| Request::new(id, g, RequestKind::DatumPoint, HEntity::NONE));
        let (entities, params) = sk.requests.get(req).unwrap().generate().unwrap();
        let point = entities[0].id;
        let point_params = match &entities[0].kind {
            EntityKind::Point3d { params } => *params,
            other => panic!("expected a free 3D point, got {other:?}"),
        };
        for p in params {
            sk.params.insert(p.id, p);
        }
        for e in entities {
            sk.entities.insert(e.id, e);
        }
        sk.params.get_mut(point_params[0]).unwrap().val = val.0;
        sk.params.get_mut(point_params[1]).unwrap().val = val.1;
        sk.params.get_mut(point_params[2]).unwrap().val = val.2;
        point
    };

    let p0 = make_point(&mut sk, (0.0, 0.0, 0.0));
    let p1 = make_point(&mut sk, (1.0, 1.0, 1.0));
    let p2 = make_point(&mut sk, (2.0, 2.0, 2.0));

    for (a, b) in [(p0, p1), (p1, p2), (p0, p2)] {
        sk.constraints.add_and_assign_id(|id| Constraint {
            id,
            group: g,
            workplane: HEntity::NONE,
            kind: ConstraintKind::PointsCoincident { a, b },
        });
    }

    let status = solve(&mut sk, g, &SolverConfig::default());
    assert_eq!(status, SolveStatus::Okay { dof: 3 });
}

/// Extruding a unit square, then an extrusion of a square that strictly
/// encloses it (margin on every side and both ends) combined in with
/// `CombinePolicy::Difference`, leaves nothing behind.
///
/// The subtrahend is built with margin rather than bit-identical to the
/// minuend on purpose: this exercises `Bsp3`'s ordinary classify-and-split
/// path rather than its exact-coplanar-face handling, which isn't hand
/// verifiable without running the solid through it.
#[test]
fn scenario_extrude_difference_of_a_strictly_enclosing_solid_is_empty() {
    let mut sk = Sketch::new();
    let xy = xy_workplane();
    let mut caches = HashMap::new();

    let profile_a = square_profile_group(&mut sk, HGROUP_REFERENCES, xy, [(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)], &mut caches);
    let extrude_a = sk.groups.add_and_assign_id(|id| {
        Group::new(id, profile_a, GroupKind::Extrude { source: profile_a, direction: [HParam::NONE; 3], range: CopyRange::OneSided })
    });
    let dir_a = direction_params(&mut sk, extrude_a, (0.0, 0.0, 2.0));
    if let GroupKind::Extrude { direction, .. } = &mut sk.groups.get_mut(extrude_a).unwrap().kind {
        *direction = dir_a;
    }

    let profile_b = square_profile_group(
        &mut sk,
        extrude_a,
        xy,
        [(-1.0, -1.0), (3.0, -1.0), (3.0, 3.0), (-1.0, 3.0)],
        &mut caches,
    );
    let extrude_b = sk.groups.add_and_assign_id(|id| {
        Group::new(id, extrude_a, GroupKind::Extrude { source: profile_b, direction: [HParam::NONE; 3], range: CopyRange::TwoSided })
    });
    let dir_b = direction_params(&mut sk, extrude_b, (0.0, 0.0, 6.0));
    if let GroupKind::Extrude { direction, .. } = &mut sk.groups.get_mut(extrude_b).unwrap().kind {
        *direction = dir_b;
    }
    sk.groups.get_mut(extrude_b).unwrap().combine = CombinePolicy::Difference;

    regenerate_all(&mut sk, &SolverConfig::default(), &mut caches).unwrap();

    let result = &caches.get(&extrude_b).unwrap().running_mesh;
    assert!(result.triangles.is_empty(), "expected the enclosing subtrahend to erase the whole solid, kept {} triangles", result.triangles.len());
}

/// A unit circle, offset from the lathe axis, revolved a full turn about
/// it: a torus. Triangle count follows directly from the fixed sampling
/// constants the lathe and contour-flattening steps use.
#[test]
fn scenario_lathe_of_an_offset_circle_produces_a_closed_torus() {
    let mut sk = Sketch::new();
    let xy = xy_workplane();
    let mut caches = HashMap::new();

    let profile = sk.groups.add_and_assign_id(|id| Group::new(id, HGROUP_REFERENCES, GroupKind::DrawingWorkplane { workplane: xy }));

    let center = HEntity::of_group(profile, 0);
    let normal = HEntity::of_group(profile, 1);
    let radius_ent = HEntity::of_group(profile, 2);
    let circle = HEntity::of_group(profile, 3);
    let axis_point = HEntity::of_group(profile, 4);
    let axis_dir = HEntity::of_group(profile, 5);

    let cu = HParam::of_group(profile, 0);
    let cv = HParam::of_group(profile, 1);
    let r = HParam::of_group(profile, 2);
    sk.params.insert(cu, Param::new(cu, profile, 2.0));
    sk.params.insert(cv, Param::new(cv, profile, 0.0));
    sk.params.insert(r, Param::new(r, profile, 1.0));

    sk.entities.insert(center, Entity {
        id: center, group: profile, request: HRequest::NONE, workplane: xy, construction: false,
        kind: EntityKind::Point2d { workplane: xy, params: [cu, cv] },
    });
    sk.entities.insert(normal, Entity {
        id: normal, group: profile, request: HRequest::NONE, workplane: xy, construction: false,
        kind: EntityKind::Normal2d { workplane: xy },
    });
    sk.entities.insert(radius_ent, Entity {
        id: radius_ent, group: profile, request: HRequest::NONE, workplane: xy, construction: false,
        kind: EntityKind::Distance { param: r },
    });
    sk.entities.insert(circle, Entity {
        id: circle, group: profile, request: HRequest::NONE, workplane: xy, construction: false,
        kind: EntityKind::Circle { center, normal, radius: radius_ent },
    });

    let axis_params = |sk: &mut Sketch, offset: u32, v: (f64, f64, f64)| -> [HParam; 3] {
        let px = HParam::of_group(profile, offset);
        let py = HParam::of_group(profile, offset + 1);
        let pz = HParam::of_group(profile, offset + 2);
        sk.params.insert(px, Param::new(px, profile, v.0));
        sk.params.insert(py, Param::new(py, profile, v.1));
        sk.params.insert(pz, Param::new(pz, profile, v.2));
        [px, py, pz]
    };
    let ap_params = axis_params(&mut sk, 10, (0.0, 0.0, 0.0));
    sk.entities.insert(axis_point, Entity {
        id: axis_point, group: profile, request: HRequest::NONE, workplane: HEntity::NONE, construction: false,
        kind: EntityKind::Point3d { params: ap_params },
    });
    let ad_params = axis_params(&mut sk, 13, (0.0, 1.0, 0.0));
    sk.entities.insert(axis_dir, Entity {
        id: axis_dir, group: profile, request: HRequest::NONE, workplane: HEntity::NONE, construction: false,
        kind: EntityKind::Point3d { params: ad_params },
    });

    sk.groups.get_mut(profile).unwrap().dirty = false;
    caches.insert(profile, GroupMeshes::default());

    let lathe = sk.groups.add_and_assign_id(|id| Group::new(id, profile, GroupKind::Lathe { source: profile, axis_point, axis_dir }));

    regenerate_all(&mut sk, &SolverConfig::default(), &mut caches).unwrap();

    let mesh = &caches.get(&lathe).unwrap().this_mesh;
    // 48 lathe slices, each carrying the circle's 24-segment flattened
    // contour around as a closed ring of quads (two triangles apiece).
    assert_eq!(mesh.triangles.len(), 48 * 24 * 2);

    let bbox = mesh.bbox();
    assert!(bbox.max.x > 2.9 && bbox.min.x < -2.9, "expected the outer radius (3) to dominate x, got {bbox:?}");
    assert!(bbox.max.z > 2.9 && bbox.min.z < -2.9, "expected the outer radius (3) to dominate z, got {bbox:?}");
    assert!(bbox.max.y < 1.0001 && bbox.min.y > -1.0001, "the tube's own radius (1) should bound y, got {bbox:?}");
}

/// A point well outside an extruded unit cube classifies as outside; one
/// in its interior classifies as inside — ray-cast classification against
/// a mesh the regeneration pipeline actually produced, not a hand-built one.
#[test]
fn scenario_raycast_classifies_points_against_an_extruded_solid() {
    let mut sk = Sketch::new();
    let xy = xy_workplane();
    let mut caches = HashMap::new();

    let profile = square_profile_group(&mut sk, HGROUP_REFERENCES, xy, [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)], &mut caches);
    let extrude = sk.groups.add_and_assign_id(|id| {
        Group::new(id, profile, GroupKind::Extrude { source: profile, direction: [HParam::NONE; 3], range: CopyRange::OneSided })
    });
    let dir = direction_params(&mut sk, extrude, (0.0, 0.0, 1.0));
    if let GroupKind::Extrude { direction, .. } = &mut sk.groups.get_mut(extrude).unwrap().kind {
        *direction = dir;
    }

    regenerate_all(&mut sk, &SolverConfig::default(), &mut caches).unwrap();
    let mesh = &caches.get(&extrude).unwrap().running_mesh;

    let outward = vec3(0.0, 0.0, 1.0);
    assert_eq!(classify(mesh, vec3(0.5, 0.5, 0.5), outward).unwrap(), Classification::Inside);
    assert_eq!(classify(mesh, vec3(5.0, 5.0, 5.0), outward).unwrap(), Classification::Outside);
}

/// Edge classification against the same regenerated solid: the base
/// square's own bottom edge is shared between the bottom and a side face,
/// so looking straight down through it exits the solid; an edge nowhere
/// near the mesh falls through to the ray-cast fallback and still reports
/// outside.
#[test]
fn scenario_edge_classification_against_an_extruded_solid() {
    let mut sk = Sketch::new();
    let xy = xy_workplane();
    let mut caches = HashMap::new();

    let profile = square_profile_group(&mut sk, HGROUP_REFERENCES, xy, [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)], &mut caches);
    let extrude = sk.groups.add_and_assign_id(|id| {
        Group::new(id, profile, GroupKind::Extrude { source: profile, direction: [HParam::NONE; 3], range: CopyRange::OneSided })
    });
    let dir = direction_params(&mut sk, extrude, (0.0, 0.0, 1.0));
    if let GroupKind::Extrude { direction, .. } = &mut sk.groups.get_mut(extrude).unwrap().kind {
        *direction = dir;
    }

    regenerate_all(&mut sk, &SolverConfig::default(), &mut caches).unwrap();
    let mesh = &caches.get(&extrude).unwrap().running_mesh;

    let down = vec3(0.0, 0.0, -1.0);
    let on_mesh = classify_edge(mesh, vec3(0.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0), down, down).unwrap();
    assert_eq!(on_mesh, Classification::Outside);

    let far_away = classify_edge(mesh, vec3(5.0, 5.0, 5.0), vec3(6.0, 5.0, 5.0), down, down).unwrap();
    assert_eq!(far_away, Classification::Outside);
}
