//! A scalar unknown of the constraint system (`spec.md` §3 "Param").

use crate::handle::{HGroup, HParam};

/// Scratch state the solver writes onto a Param during one solve pass,
/// mirroring the original's `Param::Tag` constants
/// (`examples/original_source/solvespace.h`'s `VAR_ASSUMED`/`VAR_SUBSTITUTED`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum ParamTag {
    #[default]
    None,
    Assumed,
    Substituted,
}

#[derive(Clone, Debug)]
pub struct Param {
    pub id: HParam,
    pub group: HGroup,
    pub val: f64,
    pub known: bool,
    pub tag: ParamTag,
}

impl Param {
    pub fn new(id: HParam, group: HGroup, val: f64) -> Param {
        Param { id, group, val, known: false, tag: ParamTag::None }
    }

    /// Pins the param to a fixed value, the way a `where_dragged` constraint
    /// or a style default forces an initial value before the first solve.
    pub fn force_to(&mut self, v: f64) {
        self.val = v;
        self.known = true;
    }
}
