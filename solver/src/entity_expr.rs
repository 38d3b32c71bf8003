//! Builds symbolic [`ExprVec3`]/[`ExprQuaternion`] views over `kernel_sketch`
//! entities, the bridge `kernel_solver` needs between the data model and the
//! algebra crate.

use kernel_expr::Expr;
use kernel_geom::{ExprQuaternion, ExprVec3};
use kernel_sketch::{Entity, EntityKind, HEntity, Sketch};

fn param_expr(id: kernel_sketch::HParam) -> Expr {
    Expr::param(id.v())
}

/// The symbolic position of a point entity (3D free or 2D workplane-bound —
/// a 2D point's `z` is implicitly the workplane's own origin/orientation,
/// which constraint reduction folds in separately via
/// [`workplane_to_world`] when it needs world coordinates).
pub fn point_local(e: &Entity) -> ExprVec3 {
    match &e.kind {
        EntityKind::Point3d { params } => {
            ExprVec3::new(param_expr(params[0]), param_expr(params[1]), param_expr(params[2]))
        }
        EntityKind::Point2d { params, .. } => {
            ExprVec3::new(param_expr(params[0]), param_expr(params[1]), Expr::constant(0.0))
        }
        other => panic!("entity is not a point: {other:?}"),
    }
}

/// Resolves a point entity to its symbolic position in world coordinates,
/// transforming through its workplane's origin/orientation when the point
/// is 2D. Mirrors how the original's constraint equations call
/// `Entity::PointGetExprs` and then `WorkplaneToExpr` when needed.
pub fn point_world(sketch: &Sketch, id: HEntity) -> ExprVec3 {
    let e = sketch.entities.get(id).expect("dangling point handle");
    match &e.kind {
        EntityKind::Point3d { .. } => point_local(e),
        EntityKind::Point2d { workplane, .. } => {
            let local = point_local(e);
            workplane_to_world(sketch, *workplane, &local)
        }
        EntityKind::PointTransformed { basis } => point_world(sketch, *basis),
        other => panic!("entity is not a point: {other:?}"),
    }
}

/// The symbolic quaternion orientation of a normal entity, resolving a
/// workplane-bound 2D normal to its workplane's own quaternion.
pub fn normal_quaternion(sketch: &Sketch, id: HEntity) -> ExprQuaternion {
    let e = sketch.entities.get(id).expect("dangling normal handle");
    match &e.kind {
        EntityKind::Normal3d { params } => ExprQuaternion::new(
            param_expr(params[0]),
            param_expr(params[1]),
            param_expr(params[2]),
            param_expr(params[3]),
        ),
        EntityKind::Normal2d { workplane } => workplane_quaternion(sketch, *workplane),
        EntityKind::NormalTransformed { basis } => normal_quaternion(sketch, *basis),
        other => panic!("entity is not a normal: {other:?}"),
    }
}

pub fn workplane_quaternion(sketch: &Sketch, workplane: HEntity) -> ExprQuaternion {
    let wp = sketch.entities.get(workplane).expect("dangling workplane handle");
    match &wp.kind {
        EntityKind::Workplane { normal, .. } => normal_quaternion(sketch, *normal),
        other => panic!("entity is not a workplane: {other:?}"),
    }
}

fn workplane_to_world(sketch: &Sketch, workplane: HEntity, local: &ExprVec3) -> ExprVec3 {
    let wp = sketch.entities.get(workplane).expect("dangling workplane handle");
    let (origin, normal) = match &wp.kind {
        EntityKind::Workplane { origin, normal } => (*origin, *normal),
        other => panic!("entity is not a workplane: {other:?}"),
    };
    let origin_expr = point_world(sketch, origin);
    let q = normal_quaternion(sketch, normal);
    let u = q.rotation_u();
    let v = q.rotation_v();
    origin_expr.plus(&u.scaled_by(local.x.clone())).plus(&v.scaled_by(local.y.clone()))
}

pub fn distance_value(sketch: &Sketch, id: HEntity) -> Expr {
    let e = sketch.entities.get(id).expect("dangling distance handle");
    match &e.kind {
        EntityKind::Distance { param } => param_expr(*param),
        other => panic!("entity is not a distance: {other:?}"),
    }
}

pub fn line_endpoints(sketch: &Sketch, id: HEntity) -> (ExprVec3, ExprVec3) {
    let e = sketch.entities.get(id).expect("dangling line handle");
    match &e.kind {
        EntityKind::LineSegment { point0, point1 } => {
            (point_world(sketch, *point0), point_world(sketch, *point1))
        }
        other => panic!("entity is not a line segment: {other:?}"),
    }
}

pub fn circle_parts(sketch: &Sketch, id: HEntity) -> (ExprVec3, ExprQuaternion, Expr) {
    let e = sketch.entities.get(id).expect("dangling circle handle");
    match &e.kind {
        EntityKind::Circle { center, normal, radius } => (
            point_world(sketch, *center),
            normal_quaternion(sketch, *normal),
            distance_value(sketch, *radius),
        ),
        other => panic!("entity is not a circle: {other:?}"),
    }
}
