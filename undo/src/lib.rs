//! Whole-sketch undo/redo (`spec.md` §4.12): a bounded stack of deep
//! snapshots of the Group/Request/Constraint/Param stores plus the
//! active-group handle. Entities and the per-group mesh caches are left out
//! on purpose — they're wholly derived from what *is* snapshotted, and
//! restoring marks every Group dirty so the regeneration driver rebuilds
//! them, the same "transient caches are not copied" rule `spec.md` states
//! for `thisMesh`/`runningMesh`/polygon caches. Styles are left untouched
//! too: the spec's snapshot list names Group/Request/Constraint/Param and
//! the active group only.

use std::collections::VecDeque;

use kernel_sketch::{Constraint, Group, HConstraint, HGroup, HParam, HRequest, Param, Request, Sketch, Store};

/// Snapshots stacked past this depth are discarded from the far end —
/// unbounded undo history would otherwise grow forever across a long
/// editing session.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// A deep copy of everything an undo needs to restore: not the whole
/// `Sketch`, just the stores the spec calls out plus the active group.
#[derive(Clone)]
pub struct UndoSnapshot {
    params: Store<HParam, Param>,
    requests: Store<HRequest, Request>,
    constraints: Store<HConstraint, Constraint>,
    groups: Store<HGroup, Group>,
    active_group: HGroup,
}

impl UndoSnapshot {
    fn capture(sketch: &Sketch) -> UndoSnapshot {
        UndoSnapshot {
            params: sketch.params.clone(),
            requests: sketch.requests.clone(),
            constraints: sketch.constraints.clone(),
            groups: sketch.groups.clone(),
            active_group: sketch.active_group,
        }
    }

    /// Writes this snapshot's stores back into `sketch`, drops its (now
    /// stale) derived entities, and marks every surviving Group dirty so the
    /// next regeneration pass rebuilds everything from the restored state.
    fn restore_into(mut self, sketch: &mut Sketch) {
        std::mem::swap(&mut sketch.params, &mut self.params);
        std::mem::swap(&mut sketch.requests, &mut self.requests);
        std::mem::swap(&mut sketch.constraints, &mut self.constraints);
        std::mem::swap(&mut sketch.groups, &mut self.groups);
        sketch.active_group = self.active_group;
        sketch.entities = Store::new();
        sketch.groups.iter_mut().for_each(|g| g.dirty = true);
    }
}

/// An undo/redo stack of whole-sketch snapshots (`spec.md` §4.12). Use
/// [`UndoStack::checkpoint`] right before an editor-driven mutation, and
/// [`UndoStack::undo`]/[`UndoStack::redo`] to step through the resulting
/// history.
pub struct UndoStack {
    undo: VecDeque<UndoSnapshot>,
    redo: VecDeque<UndoSnapshot>,
    max_depth: usize,
}

impl UndoStack {
    pub fn new(max_depth: usize) -> UndoStack {
        UndoStack { undo: VecDeque::new(), redo: VecDeque::new(), max_depth }
    }

    /// Records `sketch`'s current state so a later [`undo`](Self::undo) can
    /// return to it. Any pending redo history is discarded — the original's
    /// `UndoRemember` does the same, since a fresh edit invalidates whatever
    /// was undone before it.
    pub fn checkpoint(&mut self, sketch: &Sketch) {
        self.redo.clear();
        self.undo.push_back(UndoSnapshot::capture(sketch));
        if self.undo.len() > self.max_depth {
            self.undo.pop_front();
        }
    }

    /// Restores the most recently checkpointed state, stashing the state
    /// `sketch` was in beforehand onto the redo stack. Returns `false`
    /// (leaving `sketch` untouched) if there's nothing to undo.
    pub fn undo(&mut self, sketch: &mut Sketch) -> bool {
        let Some(snapshot) = self.undo.pop_back() else {
            tracing::debug!("undo requested with an empty history");
            return false;
        };
        self.redo.push_back(UndoSnapshot::capture(sketch));
        if self.redo.len() > self.max_depth {
            self.redo.pop_front();
        }
        snapshot.restore_into(sketch);
        true
    }

    /// The inverse of [`undo`](Self::undo): restores the state most
    /// recently undone, stashing the pre-redo state back onto the undo
    /// stack. Returns `false` if there's nothing to redo.
    pub fn redo(&mut self, sketch: &mut Sketch) -> bool {
        let Some(snapshot) = self.redo.pop_back() else {
            tracing::debug!("redo requested with an empty history");
            return false;
        };
        self.undo.push_back(UndoSnapshot::capture(sketch));
        if self.undo.len() > self.max_depth {
            self.undo.pop_front();
        }
        snapshot.restore_into(sketch);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        UndoStack::new(DEFAULT_MAX_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_sketch::GroupKind;

    fn param_values(sketch: &Sketch) -> Vec<(HParam, f64)> {
        let mut out: Vec<(HParam, f64)> = sketch.params.iter().map(|p| (p.id, p.val)).collect();
        out.sort_by_key(|(id, _)| id.v());
        out
    }

    #[test]
    fn undo_restores_earlier_param_values() {
        let mut sk = Sketch::new();
        let mut stack = UndoStack::default();

        let p = sk.params.iter().next().unwrap().id;
        let before = param_values(&sk);

        stack.checkpoint(&sk);
        sk.params.get_mut(p).unwrap().val = 99.0;
        assert_ne!(param_values(&sk), before);

        assert!(stack.undo(&mut sk));
        assert_eq!(param_values(&sk), before);
    }

    #[test]
    fn undo_then_redo_restores_byte_identical_param_values() {
        let mut sk = Sketch::new();
        let mut stack = UndoStack::default();
        let p = sk.params.iter().next().unwrap().id;

        stack.checkpoint(&sk);
        sk.params.get_mut(p).unwrap().val = 42.5;
        let after_edit = param_values(&sk);

        assert!(stack.undo(&mut sk));
        assert!(stack.redo(&mut sk));
        assert_eq!(param_values(&sk), after_edit);
    }

    #[test]
    fn undo_marks_every_surviving_group_dirty() {
        let mut sk = Sketch::new();
        let mut stack = UndoStack::default();
        stack.checkpoint(&sk);
        sk.groups.add_and_assign_id(|id| Group::new(id, kernel_sketch::HGROUP_REFERENCES, GroupKind::Drawing3d));
        for g in sk.groups.iter_mut() {
            g.dirty = false;
        }
        stack.undo(&mut sk);
        assert!(sk.groups.iter().all(|g| g.dirty));
    }

    #[test]
    fn undo_on_an_empty_history_is_a_no_op() {
        let mut sk = Sketch::new();
        let mut stack = UndoStack::default();
        assert!(!stack.undo(&mut sk));
        assert!(!stack.can_undo());
    }

    #[test]
    fn checkpoints_beyond_max_depth_discard_the_oldest() {
        let mut sk = Sketch::new();
        let mut stack = UndoStack::new(2);
        let p = sk.params.iter().next().unwrap().id;

        stack.checkpoint(&sk); // snapshot holds the sketch's initial value
        sk.params.get_mut(p).unwrap().val = 1.0;
        stack.checkpoint(&sk); // snapshot holds 1.0
        sk.params.get_mut(p).unwrap().val = 2.0;
        stack.checkpoint(&sk); // snapshot holds 2.0, pushes `initial` out
        sk.params.get_mut(p).unwrap().val = 3.0;

        assert!(stack.undo(&mut sk));
        assert_eq!(sk.params.get(p).unwrap().val, 2.0);
        assert!(stack.undo(&mut sk));
        assert_eq!(sk.params.get(p).unwrap().val, 1.0);
        // The initial-value checkpoint was evicted; nothing left to undo to.
        assert!(!stack.undo(&mut sk));
        assert_eq!(sk.params.get(p).unwrap().val, 1.0);
    }
}
