//! The sketch object graph: Param, Entity, Request, Constraint, Group,
//! Style, keyed by stable handles (`spec.md` §3).
//!
//! `kernel_sketch` owns the data model only; turning it into equations
//! (`kernel_solver`), meshes (`kernel_regen`/`kernel_mesh`) or snapshots
//! (`kernel_undo`) is each of those crates' job, the same layering the
//! original keeps between `sketch.{h,cpp}` (data) and `system.cpp`/
//! `srf/*.cpp`/`undoredo.cpp` (behavior built on top of it).

pub mod constraint;
pub mod entity;
pub mod errors;
pub mod group;
pub mod handle;
pub mod param;
pub mod request;
pub mod store;
pub mod style;

pub use constraint::{Constraint, ConstraintKind, SymmetryAxis};
pub use entity::{Entity, EntityKind};
pub use errors::{GenerationError, SketchError};
pub use group::{CombinePolicy, CopyRange, Group, GroupError, GroupKind, GroupSolveStatus};
pub use handle::{
    HConstraint, HEntity, HGroup, HParam, HRequest, HStyle, HGROUP_REFERENCES, HREQUEST_REFERENCE_XY,
    HREQUEST_REFERENCE_YZ, HREQUEST_REFERENCE_ZX,
};
pub use param::{Param, ParamTag};
pub use request::{Request, RequestKind};
pub use store::Store;
pub use style::{factory as style_factory, Color, Style};

use kernel_geom::Quaternion;

/// The whole parametric model: every store plus the currently-active Group.
/// This is the `Sketch`/`SS`+`SK` aggregate the original keeps as a pair of
/// process-wide globals (`spec.md` §9's note on `SS`/`SK`), passed explicitly
/// here instead of hidden behind module statics — `kernel_undo` snapshots
/// exactly this struct.
#[derive(Default)]
pub struct Sketch {
    pub params: Store<HParam, Param>,
    pub entities: Store<HEntity, Entity>,
    pub requests: Store<HRequest, Request>,
    pub constraints: Store<HConstraint, Constraint>,
    pub groups: Store<HGroup, Group>,
    pub styles: Store<HStyle, Style>,
    pub active_group: HGroup,
}

impl Sketch {
    /// Builds an empty sketch pre-populated with the references group, the
    /// three reference-frame workplane requests, and the factory style
    /// palette — matching `SolveSpace::Init`'s bootstrap in the original.
    pub fn new() -> Sketch {
        let mut sk = Sketch::default();

        for s in style_factory::defaults() {
            sk.styles.insert(s.id, s);
        }

        sk.groups.skip_reserved(HGROUP_REFERENCES.v());
        sk.groups.insert(
            HGROUP_REFERENCES,
            Group::new(HGROUP_REFERENCES, HGroup::NONE, GroupKind::Drawing3d),
        );
        sk.active_group = HGROUP_REFERENCES;

        sk.requests.skip_reserved(HREQUEST_REFERENCE_ZX.v());
        let planes = [
            (HREQUEST_REFERENCE_XY, kernel_geom::vec3(1.0, 0.0, 0.0), kernel_geom::vec3(0.0, 1.0, 0.0)),
            (HREQUEST_REFERENCE_YZ, kernel_geom::vec3(0.0, 1.0, 0.0), kernel_geom::vec3(0.0, 0.0, 1.0)),
            (HREQUEST_REFERENCE_ZX, kernel_geom::vec3(0.0, 0.0, 1.0), kernel_geom::vec3(1.0, 0.0, 0.0)),
        ];
        for (id, u, v) in planes {
            let req = Request::new(id, HGROUP_REFERENCES, RequestKind::Workplane, HEntity::NONE);
            let (entities, mut params) = req.generate().expect("reference workplane always generates");
            let q = Quaternion::from_basis(u, v);
            if let Some(normal) = entities.iter().find(|e| e.is_normal()) {
                if let EntityKind::Normal3d { params: np } = &normal.kind {
                    for p in params.iter_mut() {
                        if p.id == np[0] {
                            p.force_to(q.w);
                        } else if p.id == np[1] {
                            p.force_to(q.vx);
                        } else if p.id == np[2] {
                            p.force_to(q.vy);
                        } else if p.id == np[3] {
                            p.force_to(q.vz);
                        }
                    }
                }
            }
            sk.requests.insert(id, req);
            for e in entities {
                sk.entities.insert(e.id, e);
            }
            for p in params {
                sk.params.insert(p.id, p);
            }
        }

        sk
    }

    /// Invariant 1 (`spec.md` §8): every Entity's `group` points to a Group
    /// that exists.
    pub fn check_entities_have_existing_group(&self) -> Result<(), SketchError> {
        for e in self.entities.iter() {
            if !self.groups.contains(e.group) {
                return Err(SketchError::OrphanEntity(e.id));
            }
        }
        Ok(())
    }

    /// Invariant 2 (`spec.md` §8): every Constraint's referenced entities
    /// exist and are visible from the constraint's group (predecessor
    /// groups, transitively, plus its own).
    pub fn check_constraints_see_their_entities(&self) -> Result<(), SketchError> {
        for c in self.constraints.iter() {
            let visible = self.groups_visible_from(c.group);
            for eh in c.referenced_entities() {
                let e = self
                    .entities
                    .get(eh)
                    .ok_or(SketchError::DanglingConstraintEntity(c.id))?;
                if !visible.contains(&e.group) {
                    return Err(SketchError::DanglingConstraintEntity(c.id));
                }
            }
        }
        Ok(())
    }

    /// A group's own entities plus every (transitive) predecessor's.
    fn groups_visible_from(&self, g: HGroup) -> Vec<HGroup> {
        let mut out = Vec::new();
        let mut cur = g;
        while !cur.is_none() {
            out.push(cur);
            cur = match self.groups.get(cur) {
                Some(group) => group.predecessor,
                None => break,
            };
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sketch_has_three_reference_workplanes() {
        let sk = Sketch::new();
        assert_eq!(sk.requests.len(), 3);
        assert!(sk.requests.get(HREQUEST_REFERENCE_XY).is_some());
        assert!(sk.requests.get(HREQUEST_REFERENCE_YZ).is_some());
        assert!(sk.requests.get(HREQUEST_REFERENCE_ZX).is_some());
    }

    #[test]
    fn reference_workplane_normals_are_unit_quaternions() {
        let sk = Sketch::new();
        for e in sk.entities.iter() {
            if let EntityKind::Normal3d { params } = &e.kind {
                let vals: Vec<f64> = params.iter().map(|p| sk.params.get(*p).unwrap().val).collect();
                let mag_sq: f64 = vals.iter().map(|v| v * v).sum();
                assert!((mag_sq - 1.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn fresh_sketch_satisfies_entity_and_constraint_invariants() {
        let sk = Sketch::new();
        assert!(sk.check_entities_have_existing_group().is_ok());
        assert!(sk.check_constraints_see_their_entities().is_ok());
    }

    #[test]
    fn orphan_entity_is_detected() {
        let mut sk = Sketch::new();
        let bogus = Entity {
            id: HEntity(0xdead),
            group: HGroup(9999),
            request: HRequest::NONE,
            workplane: HEntity::NONE,
            construction: false,
            kind: EntityKind::Point3d { params: [HParam(1), HParam(2), HParam(3)] },
        };
        sk.entities.insert(bogus.id, bogus);
        assert!(sk.check_entities_have_existing_group().is_err());
    }

    #[test]
    fn constraint_invisible_to_its_group_is_detected() {
        let mut sk = Sketch::new();
        let later = sk.groups.add_and_assign_id(|id| Group::new(id, HGROUP_REFERENCES, GroupKind::Drawing3d));
        let earlier_entity = sk.entities.iter().next().unwrap().id;
        // Move the only entity we can find into a group that does not
        // precede `later`, to exercise the visibility check.
        let unrelated = sk.groups.add_and_assign_id(|id| Group::new(id, HGroup::NONE, GroupKind::Drawing3d));
        if let Some(e) = sk.entities.get_mut(earlier_entity) {
            e.group = unrelated;
        }
        let c = Constraint {
            id: HConstraint(1),
            group: later,
            workplane: HEntity::NONE,
            kind: ConstraintKind::WhereDragged { point: earlier_entity },
        };
        sk.constraints.insert(c.id, c);
        assert!(sk.check_constraints_see_their_entities().is_err());
    }
}
