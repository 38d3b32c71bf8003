//! Per-group errors recorded rather than raised (`spec.md` §7 "Generation").

use crate::handle::{HConstraint, HEntity, HGroup};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("entity {0:?} has a dangling handle")]
    MissingEntity(HEntity),
    #[error("entity expected a 2D workplane but none is bound")]
    BadWorkplane,
    #[error("group {0:?} is not a planar sketch, cannot extrude")]
    BadExtrudeSource(HGroup),
    #[error("polygon is not coplanar")]
    NonCoplanarPolygon,
    #[error("polygon is not closed")]
    NotClosedPolygon,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SketchError {
    #[error("constraint {0:?} references a dangling entity")]
    DanglingConstraintEntity(HConstraint),
    #[error("entity {0:?} belongs to a group that does not exist")]
    OrphanEntity(HEntity),
}
