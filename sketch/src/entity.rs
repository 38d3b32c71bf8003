//! Geometric primitives produced by a Request or a Group (`spec.md` §3
//! "Entity"). Variant shapes follow `examples/original_source/sketch.h`'s
//! `EntityBase` union of point/normal/distance/workplane/curve kinds.

use crate::handle::{HEntity, HGroup, HParam, HRequest};

/// Dispatch tag + payload, one `match` arm per kind at generation, reduction
/// and mesh-building time — the original's sum-type-dispatch idiom
/// (`spec.md` §9).
#[derive(Clone, Debug)]
pub enum EntityKind {
    /// A point free in 3D space, owning 3 Params (x, y, z).
    Point3d { params: [HParam; 3] },
    /// A point bound to a workplane, owning 2 Params (u, v).
    Point2d { workplane: HEntity, params: [HParam; 2] },
    /// A point produced by applying a Group's rigid transform to a base
    /// point from a predecessor group; no Params of its own.
    PointTransformed { basis: HEntity },
    /// A free-standing 3D orientation, owning 4 Params (a unit quaternion).
    Normal3d { params: [HParam; 4] },
    /// A workplane-bound normal: a parameter-less copy of the workplane's
    /// own orientation.
    Normal2d { workplane: HEntity },
    /// A normal produced by a Group's rigid transform of a base normal.
    NormalTransformed { basis: HEntity },
    /// A scalar distance (e.g. a circle's radius), owning 1 Param.
    Distance { param: HParam },
    Workplane { origin: HEntity, normal: HEntity },
    LineSegment { point0: HEntity, point1: HEntity },
    /// A non-rational Bezier of degree `points.len() - 1` (>= 3 control
    /// points; the original's `CUBIC` is always degree 3 plus `extraPoints`
    /// more control points for higher-degree splines chained end to end).
    Cubic { points: Vec<HEntity> },
    /// Like `Cubic` but the control polygon wraps: `points[0]` is implicitly
    /// the successor of `points[last]`.
    CubicPeriodic { points: Vec<HEntity> },
    Circle { center: HEntity, normal: HEntity, radius: HEntity },
    ArcOfCircle { center: HEntity, start: HEntity, end: HEntity, normal: HEntity },
    TtfText { origin: HEntity, other: HEntity, normal: HEntity, text: String },
    /// A mesh face tagged for later selection/constraint reference — the
    /// original's face Entity variants produced by extrude/lathe/sweep
    /// builders (`spec.md` §4.7's remap tables assign these).
    Face { plane: Option<HEntity> },
}

#[derive(Clone, Debug)]
pub struct Entity {
    pub id: HEntity,
    pub group: HGroup,
    pub request: HRequest,
    /// The workplane this entity is expressed in, or `HEntity::NONE` for a
    /// free (3D) entity.
    pub workplane: HEntity,
    pub construction: bool,
    pub kind: EntityKind,
}

impl Entity {
    pub fn is_point(&self) -> bool {
        matches!(
            self.kind,
            EntityKind::Point3d { .. } | EntityKind::Point2d { .. } | EntityKind::PointTransformed { .. }
        )
    }

    pub fn is_normal(&self) -> bool {
        matches!(
            self.kind,
            EntityKind::Normal3d { .. } | EntityKind::Normal2d { .. } | EntityKind::NormalTransformed { .. }
        )
    }

    /// Params this entity directly owns (not its sub-entities'), used by the
    /// solver to collect `g`'s free Params (`spec.md` §4.5).
    pub fn own_params(&self) -> Vec<HParam> {
        match &self.kind {
            EntityKind::Point3d { params } => params.to_vec(),
            EntityKind::Point2d { params, .. } => params.to_vec(),
            EntityKind::Normal3d { params } => params.to_vec(),
            EntityKind::Distance { param } => vec![*param],
            _ => Vec::new(),
        }
    }
}
