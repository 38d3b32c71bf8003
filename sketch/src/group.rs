//! An ordered stage in the regeneration pipeline (`spec.md` §3 "Group").
//!
//! Mesh caches (`thisMesh`/`runningMesh`) and remap tables are *not* stored
//! here: they're produced and owned by `kernel_regen`, which is the crate
//! that actually depends on `kernel_mesh`. Keeping them out of this struct
//! avoids a dependency cycle (`kernel_mesh` has no reason to know about
//! `Group` at all) — see `DESIGN.md`'s note on this split.

use crate::errors::GenerationError;
use crate::handle::{HEntity, HGroup, HParam, HRequest, HStyle};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CombinePolicy {
    Union,
    Difference,
    Assemble,
    InterferenceCheck,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CopyRange {
    OneSided,
    TwoSided,
}

#[derive(Clone, Debug)]
pub enum GroupKind {
    Drawing3d,
    DrawingWorkplane { workplane: HEntity },
    StepTranslate { n: u32, translate: [HParam; 3], range: CopyRange, skip_first: bool },
    StepRotate { n: u32, axis_point: HEntity, axis_dir: HEntity, angle: HParam, range: CopyRange, skip_first: bool },
    Extrude { source: HGroup, direction: [HParam; 3], range: CopyRange },
    Lathe { source: HGroup, axis_point: HEntity, axis_dir: HEntity },
    Sweep { source: HGroup, trajectory: HGroup },
    HelicalSweep { source: HGroup, axis_point: HEntity, axis_dir: HEntity, turns: HParam, pitch: HParam, d_radius: HParam, left_handed: bool },
    Linked { path: String },
}

/// Mirrors `spec.md` §4.5's result taxonomy; `kernel_solver::SolveStatus`
/// carries the richer failure detail (suspect constraint handles), this is
/// just what the data model persists on the Group itself.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum GroupSolveStatus {
    #[default]
    Unsolved,
    Okay { dof: u32 },
    DidntConverge,
    RedundantOkay { dof: u32 },
    RedundantDidntConverge,
    TooManyUnknowns,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GroupError {
    Generation(GenerationError),
    InterferenceDetected,
    NakedEdge,
    TriangulationBail,
}

#[derive(Clone, Debug)]
pub struct Group {
    pub id: HGroup,
    pub requests: Vec<HRequest>,
    pub predecessor: HGroup,
    pub combine: CombinePolicy,
    pub kind: GroupKind,
    pub style: HStyle,
    pub construction: bool,
    pub solve_status: GroupSolveStatus,
    pub error: Option<GroupError>,
    pub dirty: bool,
}

impl Group {
    pub fn new(id: HGroup, predecessor: HGroup, kind: GroupKind) -> Group {
        Group {
            id,
            requests: Vec::new(),
            predecessor,
            combine: CombinePolicy::Assemble,
            kind,
            style: HStyle::NONE,
            construction: false,
            solve_status: GroupSolveStatus::default(),
            error: None,
            dirty: true,
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Params this Group itself introduces (e.g. an extrude direction, a
    /// helix's turns/pitch), distinct from the Params its Requests'
    /// generated Entities own.
    pub fn own_params(&self) -> Vec<HParam> {
        match &self.kind {
            GroupKind::StepTranslate { translate, .. } => translate.to_vec(),
            GroupKind::StepRotate { angle, .. } => vec![*angle],
            GroupKind::Extrude { direction, .. } => direction.to_vec(),
            GroupKind::HelicalSweep { turns, pitch, d_radius, .. } => vec![*turns, *pitch, *d_radius],
            _ => Vec::new(),
        }
    }
}
