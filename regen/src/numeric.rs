//! Numeric twins of `kernel_solver::entity_expr`'s symbolic helpers.
//!
//! The solver builds `Expr`/`ExprVec3`/`ExprQuaternion` trees over a
//! Group's free Params so Newton's method can differentiate them. Once a
//! Group is solved, the mesh builders only ever need the concrete `f64`
//! values those Params settled on, read straight out of the `Sketch` — this
//! module is that read path, one function per `entity_expr` counterpart.

use kernel_geom::{vec3, Quaternion, Vec3};
use kernel_sketch::{Entity, EntityKind, HEntity, HParam, Sketch};

fn val(sketch: &Sketch, p: HParam) -> f64 {
    sketch.params.get(p).expect("dangling param handle").val
}

/// The 3-Param vector a Group's own direction/translate fields reference
/// (an extrude direction, a step-translate delta).
pub fn params_vec3(sketch: &Sketch, params: [HParam; 3]) -> Vec3 {
    vec3(val(sketch, params[0]), val(sketch, params[1]), val(sketch, params[2]))
}

fn point_local(sketch: &Sketch, e: &Entity) -> Vec3 {
    match &e.kind {
        EntityKind::Point3d { params } => params_vec3(sketch, *params),
        EntityKind::Point2d { params, .. } => vec3(val(sketch, params[0]), val(sketch, params[1]), 0.0),
        other => panic!("entity is not a point: {other:?}"),
    }
}

/// A point entity's world position. Mirrors
/// `kernel_solver::entity_expr::point_world`, including its treatment of
/// `PointTransformed`: the copy's own rigid transform lives on the Group
/// that produced the copy, not on the entity, so this resolves straight
/// through to the basis point's position (the mesh builder that actually
/// applies the transform does so after calling this, not through it).
pub fn point_numeric(sketch: &Sketch, id: HEntity) -> Vec3 {
    let e = sketch.entities.get(id).expect("dangling point handle");
    match &e.kind {
        EntityKind::Point3d { .. } => point_local(sketch, e),
        EntityKind::Point2d { workplane, .. } => {
            let local = point_local(sketch, e);
            workplane_to_world_numeric(sketch, *workplane, (local.x, local.y))
        }
        EntityKind::PointTransformed { basis } => point_numeric(sketch, *basis),
        other => panic!("entity is not a point: {other:?}"),
    }
}

/// The local (u, v) of a workplane-bound point, without the workplane
/// transform applied. Used when assembling a 2D contour directly in its
/// own workplane's coordinates, where `point_numeric`'s world transform
/// would just have to be inverted straight back out again.
pub fn point_local_uv(sketch: &Sketch, id: HEntity) -> (f64, f64) {
    let e = sketch.entities.get(id).expect("dangling point handle");
    match &e.kind {
        EntityKind::Point2d { params, .. } => (val(sketch, params[0]), val(sketch, params[1])),
        other => panic!("entity is not a workplane-bound point: {other:?}"),
    }
}

pub fn normal_quaternion_numeric(sketch: &Sketch, id: HEntity) -> Quaternion {
    let e = sketch.entities.get(id).expect("dangling normal handle");
    match &e.kind {
        EntityKind::Normal3d { params } => {
            Quaternion::new(val(sketch, params[0]), val(sketch, params[1]), val(sketch, params[2]), val(sketch, params[3]))
        }
        EntityKind::Normal2d { workplane } => workplane_quaternion_numeric(sketch, *workplane),
        EntityKind::NormalTransformed { basis } => normal_quaternion_numeric(sketch, *basis),
        other => panic!("entity is not a normal: {other:?}"),
    }
}

pub fn workplane_quaternion_numeric(sketch: &Sketch, workplane: HEntity) -> Quaternion {
    let wp = sketch.entities.get(workplane).expect("dangling workplane handle");
    match &wp.kind {
        EntityKind::Workplane { normal, .. } => normal_quaternion_numeric(sketch, *normal),
        other => panic!("entity is not a workplane: {other:?}"),
    }
}

pub fn workplane_origin_numeric(sketch: &Sketch, workplane: HEntity) -> Vec3 {
    let wp = sketch.entities.get(workplane).expect("dangling workplane handle");
    match &wp.kind {
        EntityKind::Workplane { origin, .. } => point_numeric(sketch, *origin),
        other => panic!("entity is not a workplane: {other:?}"),
    }
}

/// Maps a point local to `workplane` (in its own `u, v`) into world space.
pub fn workplane_to_world_numeric(sketch: &Sketch, workplane: HEntity, local: (f64, f64)) -> Vec3 {
    let origin = workplane_origin_numeric(sketch, workplane);
    let q = workplane_quaternion_numeric(sketch, workplane);
    origin + q.rotation_u().scaled_by(local.0) + q.rotation_v().scaled_by(local.1)
}

pub fn distance_numeric(sketch: &Sketch, id: HEntity) -> f64 {
    let e = sketch.entities.get(id).expect("dangling distance handle");
    match &e.kind {
        EntityKind::Distance { param } => val(sketch, *param),
        other => panic!("entity is not a distance: {other:?}"),
    }
}

pub fn line_endpoints_numeric(sketch: &Sketch, id: HEntity) -> (Vec3, Vec3) {
    let e = sketch.entities.get(id).expect("dangling line handle");
    match &e.kind {
        EntityKind::LineSegment { point0, point1 } => (point_numeric(sketch, *point0), point_numeric(sketch, *point1)),
        other => panic!("entity is not a line segment: {other:?}"),
    }
}

pub fn circle_parts_numeric(sketch: &Sketch, id: HEntity) -> (Vec3, Quaternion, f64) {
    let e = sketch.entities.get(id).expect("dangling circle handle");
    match &e.kind {
        EntityKind::Circle { center, normal, radius } => {
            (point_numeric(sketch, *center), normal_quaternion_numeric(sketch, *normal), distance_numeric(sketch, *radius))
        }
        other => panic!("entity is not a circle: {other:?}"),
    }
}
