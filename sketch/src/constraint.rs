//! A declarative relation between entities (`spec.md` §3 "Constraint", §4.4
//! "Constraint reduction"). This module only carries the data shape; turning
//! a `Constraint` into residual `Expr`s is `kernel_solver`'s job (the
//! original keeps `ConstraintBase` and `Constraint::GenerateEquations` in
//! separate translation units the same way).

use crate::handle::{HConstraint, HEntity, HGroup, HParam};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SymmetryAxis {
    AboutPoint(HEntity),
    Horizontal,
    Vertical,
    AboutLine(HEntity),
}

/// One Constraint kind per case in `spec.md` §3's list. Each variant carries
/// the entity handles it relates and, where the original introduces a
/// private Param (a parametric position or a sign slack), an `HParam` slot
/// for it.
#[derive(Clone, Debug)]
pub enum ConstraintKind {
    PointsCoincident { a: HEntity, b: HEntity },
    PtPtDistance { a: HEntity, b: HEntity, val_a: HParam },
    PtPlaneDistance { point: HEntity, plane: HEntity, val_a: HParam },
    PtLineDistance { point: HEntity, line: HEntity, val_a: HParam },
    PtFaceDistance { point: HEntity, face: HEntity, val_a: HParam },
    PtInPlane { point: HEntity, plane: HEntity },
    PtOnLine { point: HEntity, line: HEntity },
    PtOnFace { point: HEntity, face: HEntity },
    PtOnCircle { point: HEntity, circle: HEntity },
    EqualLengthLines { a: HEntity, b: HEntity },
    LengthRatio { a: HEntity, b: HEntity, val_a: HParam },
    LengthDifference { a: HEntity, b: HEntity, val_a: HParam },
    ArcArcLenRatio { a: HEntity, b: HEntity, val_a: HParam },
    ArcArcLenDifference { a: HEntity, b: HEntity, val_a: HParam },
    EqualAngle { a0: HEntity, a1: HEntity, b0: HEntity, b1: HEntity, other: bool },
    Midpoint { point: HEntity, line: HEntity },
    Horizontal { line: HEntity },
    Vertical { line: HEntity },
    Diameter { circle: HEntity, val_a: HParam },
    SameOrientation { a: HEntity, b: HEntity },
    Angle { a: HEntity, b: HEntity, val_a: HParam, other: bool },
    Parallel { a: HEntity, b: HEntity },
    Perpendicular { a: HEntity, b: HEntity, other: bool },
    ArcLineTangent { arc: HEntity, line: HEntity, other: bool },
    CubicLineTangent { cubic: HEntity, line: HEntity, other: bool },
    CurveCurveTangent { a: HEntity, b: HEntity, other: bool },
    EqualRadius { a: HEntity, b: HEntity },
    ProjectedDistance { a: HEntity, b: HEntity, projected_on: HEntity, val_a: HParam },
    Symmetric { a: HEntity, b: HEntity, axis: SymmetryAxis },
    WhereDragged { point: HEntity },
    Comment { text: String },
}

#[derive(Clone, Debug)]
pub struct Constraint {
    pub id: HConstraint,
    pub group: HGroup,
    pub workplane: HEntity,
    pub kind: ConstraintKind,
}

impl Constraint {
    /// Constraints that never contribute equations (`spec.md` §4.4
    /// "comment: no equations").
    pub fn is_reference_only(&self) -> bool {
        matches!(self.kind, ConstraintKind::Comment { .. })
    }

    /// Every `HParam` this constraint privately owns (its `valA`/sign-slack
    /// param), not the entities' own params.
    pub fn own_param(&self) -> Option<HParam> {
        use ConstraintKind::*;
        match &self.kind {
            PtPtDistance { val_a, .. }
            | PtPlaneDistance { val_a, .. }
            | PtLineDistance { val_a, .. }
            | PtFaceDistance { val_a, .. }
            | LengthRatio { val_a, .. }
            | LengthDifference { val_a, .. }
            | ArcArcLenRatio { val_a, .. }
            | ArcArcLenDifference { val_a, .. }
            | Diameter { val_a, .. }
            | Angle { val_a, .. }
            | ProjectedDistance { val_a, .. } => Some(*val_a),
            _ => None,
        }
    }

    /// Entities directly referenced by this constraint, used to check
    /// visibility (`spec.md` §8 invariant 2).
    pub fn referenced_entities(&self) -> Vec<HEntity> {
        use ConstraintKind::*;
        match &self.kind {
            PointsCoincident { a, b }
            | EqualLengthLines { a, b }
            | LengthRatio { a, b, .. }
            | LengthDifference { a, b, .. }
            | ArcArcLenRatio { a, b, .. }
            | ArcArcLenDifference { a, b, .. }
            | SameOrientation { a, b }
            | Parallel { a, b }
            | Perpendicular { a, b, .. }
            | CurveCurveTangent { a, b, .. }
            | EqualRadius { a, b }
            | PtPtDistance { a, b, .. } => vec![*a, *b],
            PtPlaneDistance { point, plane, .. } => vec![*point, *plane],
            PtLineDistance { point, line, .. } => vec![*point, *line],
            PtFaceDistance { point, face, .. } => vec![*point, *face],
            PtInPlane { point, plane } => vec![*point, *plane],
            PtOnLine { point, line } => vec![*point, *line],
            PtOnFace { point, face } => vec![*point, *face],
            PtOnCircle { point, circle } => vec![*point, *circle],
            EqualAngle { a0, a1, b0, b1, .. } => vec![*a0, *a1, *b0, *b1],
            Midpoint { point, line } => vec![*point, *line],
            Horizontal { line } | Vertical { line } => vec![*line],
            Diameter { circle, .. } => vec![*circle],
            Angle { a, b, .. } => vec![*a, *b],
            ArcLineTangent { arc, line, .. } => vec![*arc, *line],
            CubicLineTangent { cubic, line, .. } => vec![*cubic, *line],
            ProjectedDistance { a, b, projected_on, .. } => vec![*a, *b, *projected_on],
            Symmetric { a, b, axis } => {
                let mut v = vec![*a, *b];
                match axis {
                    SymmetryAxis::AboutPoint(p) => v.push(*p),
                    SymmetryAxis::AboutLine(l) => v.push(*l),
                    SymmetryAxis::Horizontal | SymmetryAxis::Vertical => {}
                }
                v
            }
            WhereDragged { point } => vec![*point],
            Comment { .. } => Vec::new(),
        }
    }
}
