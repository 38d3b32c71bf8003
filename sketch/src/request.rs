//! A user-level template that expands into a fixed set of Entities and
//! Params (`spec.md` §3 "Request", §4.3 "Request/Entity generation").
//!
//! The per-type table and handle offsets below are taken directly from
//! `examples/original_source/request.cpp`'s `Request::Generate`; see
//! `SPEC_FULL.md` §3.1/§4.3.1 for the resolved arithmetic this reproduces.

use crate::entity::{Entity, EntityKind};
use crate::handle::{offset, HEntity, HGroup, HParam, HRequest, HStyle};
use crate::param::Param;
use crate::GenerationError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RequestKind {
    Workplane,
    DatumPoint,
    LineSegment,
    Circle,
    ArcOfCircle,
    Cubic,
    CubicPeriodic,
    TtfText,
}

#[derive(Clone, Debug)]
pub struct Request {
    pub id: HRequest,
    pub group: HGroup,
    pub kind: RequestKind,
    /// `HEntity::NONE` for a request free in 3D space.
    pub workplane: HEntity,
    pub construction: bool,
    /// Extra control points beyond the fixed minimum, only meaningful for
    /// `Cubic`/`CubicPeriodic`.
    pub extra_points: u32,
    /// Embedded text, only meaningful for `TtfText`.
    pub text: String,
    pub style: HStyle,
}

impl Request {
    pub fn new(id: HRequest, group: HGroup, kind: RequestKind, workplane: HEntity) -> Request {
        Request {
            id,
            group,
            kind,
            workplane,
            construction: false,
            extra_points: 0,
            text: String::new(),
            style: HStyle::NONE,
        }
    }

    fn is_2d(&self) -> bool {
        !self.workplane.is_none()
    }

    fn new_point(&self, group: HGroup, i: u32, et: u32, out_params: &mut Vec<Param>) -> Entity {
        let ent_id = HEntity::of_request(self.id, offset::point_entity(i, et));
        let base = offset::point_params(i);
        let kind = if self.is_2d() {
            let params = [HParam::of_request(self.id, base), HParam::of_request(self.id, base + 1)];
            for p in params {
                out_params.push(Param::new(p, group, 0.0));
            }
            EntityKind::Point2d { workplane: self.workplane, params }
        } else {
            let params = [
                HParam::of_request(self.id, base),
                HParam::of_request(self.id, base + 1),
                HParam::of_request(self.id, base + 2),
            ];
            for p in params {
                out_params.push(Param::new(p, group, 0.0));
            }
            EntityKind::Point3d { params }
        };
        Entity {
            id: ent_id,
            group,
            request: self.id,
            workplane: self.workplane,
            construction: self.construction,
            kind,
        }
    }

    fn new_normal(&self, group: HGroup, out_params: &mut Vec<Param>) -> Entity {
        let ent_id = HEntity::of_request(self.id, offset::NORMAL_ENTITY);
        let kind = if self.is_2d() {
            EntityKind::Normal2d { workplane: self.workplane }
        } else {
            let params = [
                HParam::of_request(self.id, offset::NORMAL_PARAMS),
                HParam::of_request(self.id, offset::NORMAL_PARAMS + 1),
                HParam::of_request(self.id, offset::NORMAL_PARAMS + 2),
                HParam::of_request(self.id, offset::NORMAL_PARAMS + 3),
            ];
            for p in params {
                out_params.push(Param::new(p, group, 0.0));
            }
            EntityKind::Normal3d { params }
        };
        Entity {
            id: ent_id,
            group,
            request: self.id,
            workplane: self.workplane,
            construction: self.construction,
            kind,
        }
    }

    fn new_distance(&self, group: HGroup, out_params: &mut Vec<Param>) -> Entity {
        let ent_id = HEntity::of_request(self.id, offset::DISTANCE_ENTITY);
        let param = HParam::of_request(self.id, offset::DISTANCE_PARAM);
        out_params.push(Param::new(param, group, 0.0));
        Entity {
            id: ent_id,
            group,
            request: self.id,
            workplane: self.workplane,
            construction: self.construction,
            kind: EntityKind::Distance { param },
        }
    }

    /// Expands this Request into its Entities and Params, matching
    /// `Request::Generate`'s per-type table exactly. Re-running this on the
    /// same Request (same id, same options) yields identical handles and
    /// entity/param shapes, satisfying the idempotency requirement in
    /// `spec.md` §4.3/§4.6.
    pub fn generate(&self) -> Result<(Vec<Entity>, Vec<Param>), GenerationError> {
        let group = self.group;
        let mut entities = Vec::new();
        let mut params = Vec::new();

        match self.kind {
            RequestKind::Workplane => {
                let origin = self.new_point(group, 0, 1, &mut params);
                let normal = self.new_normal(group, &mut params);
                let primary = Entity {
                    id: HEntity::of_request(self.id, offset::PRIMARY_ENTITY),
                    group,
                    request: self.id,
                    workplane: self.workplane,
                    construction: self.construction,
                    kind: EntityKind::Workplane { origin: origin.id, normal: normal.id },
                };
                entities.push(origin);
                entities.push(normal);
                entities.push(primary);
            }
            RequestKind::DatumPoint => {
                // et = 0: the point itself sits at offset 0, there is no
                // separate primary entity.
                let point = self.new_point(group, 0, 0, &mut params);
                entities.push(point);
            }
            RequestKind::LineSegment => {
                let p0 = self.new_point(group, 0, 1, &mut params);
                let p1 = self.new_point(group, 1, 1, &mut params);
                let primary = Entity {
                    id: HEntity::of_request(self.id, offset::PRIMARY_ENTITY),
                    group,
                    request: self.id,
                    workplane: self.workplane,
                    construction: self.construction,
                    kind: EntityKind::LineSegment { point0: p0.id, point1: p1.id },
                };
                entities.push(p0);
                entities.push(p1);
                entities.push(primary);
            }
            RequestKind::Circle => {
                let center = self.new_point(group, 0, 1, &mut params);
                let normal = self.new_normal(group, &mut params);
                let radius = self.new_distance(group, &mut params);
                let primary = Entity {
                    id: HEntity::of_request(self.id, offset::PRIMARY_ENTITY),
                    group,
                    request: self.id,
                    workplane: self.workplane,
                    construction: self.construction,
                    kind: EntityKind::Circle { center: center.id, normal: normal.id, radius: radius.id },
                };
                entities.push(center);
                entities.push(normal);
                entities.push(radius);
                entities.push(primary);
            }
            RequestKind::ArcOfCircle => {
                let center = self.new_point(group, 0, 1, &mut params);
                let start = self.new_point(group, 1, 1, &mut params);
                let end = self.new_point(group, 2, 1, &mut params);
                let normal = self.new_normal(group, &mut params);
                let primary = Entity {
                    id: HEntity::of_request(self.id, offset::PRIMARY_ENTITY),
                    group,
                    request: self.id,
                    workplane: self.workplane,
                    construction: self.construction,
                    kind: EntityKind::ArcOfCircle {
                        center: center.id,
                        start: start.id,
                        end: end.id,
                        normal: normal.id,
                    },
                };
                entities.push(center);
                entities.push(start);
                entities.push(end);
                entities.push(normal);
                entities.push(primary);
            }
            RequestKind::Cubic => {
                let n = 4 + self.extra_points;
                let mut pts = Vec::with_capacity(n as usize);
                for i in 0..n {
                    let p = self.new_point(group, i, 1, &mut params);
                    pts.push(p.id);
                    entities.push(p);
                }
                let primary = Entity {
                    id: HEntity::of_request(self.id, offset::PRIMARY_ENTITY),
                    group,
                    request: self.id,
                    workplane: self.workplane,
                    construction: self.construction,
                    kind: EntityKind::Cubic { points: pts },
                };
                entities.push(primary);
            }
            RequestKind::CubicPeriodic => {
                let n = 3 + self.extra_points;
                let mut pts = Vec::with_capacity(n as usize);
                for i in 0..n {
                    let p = self.new_point(group, i, 1, &mut params);
                    pts.push(p.id);
                    entities.push(p);
                }
                let primary = Entity {
                    id: HEntity::of_request(self.id, offset::PRIMARY_ENTITY),
                    group,
                    request: self.id,
                    workplane: self.workplane,
                    construction: self.construction,
                    kind: EntityKind::CubicPeriodic { points: pts },
                };
                entities.push(primary);
            }
            RequestKind::TtfText => {
                let origin = self.new_point(group, 0, 1, &mut params);
                let other = self.new_point(group, 1, 1, &mut params);
                let normal = self.new_normal(group, &mut params);
                let primary = Entity {
                    id: HEntity::of_request(self.id, offset::PRIMARY_ENTITY),
                    group,
                    request: self.id,
                    workplane: self.workplane,
                    construction: self.construction,
                    kind: EntityKind::TtfText {
                        origin: origin.id,
                        other: other.id,
                        normal: normal.id,
                        text: self.text.clone(),
                    },
                };
                entities.push(origin);
                entities.push(other);
                entities.push(normal);
                entities.push(primary);
            }
        }

        Ok((entities, params))
    }

    /// Handle-hex + type-name description, matching the original's
    /// `DescriptionString`'s `"r%03x-%s"` format.
    pub fn description(&self) -> String {
        let name = match self.kind {
            RequestKind::Workplane => "workplane",
            RequestKind::DatumPoint => "datum-point",
            RequestKind::LineSegment => "line-segment",
            RequestKind::Circle => "circle",
            RequestKind::ArcOfCircle => "arc-of-circle",
            RequestKind::Cubic => "cubic",
            RequestKind::CubicPeriodic => "cubic-periodic",
            RequestKind::TtfText => "ttf-text",
        };
        format!("r{:03x}-{}", self.id.v(), name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_segment_generates_two_points_and_a_primary() {
        let req = Request::new(HRequest(10), HGroup(1), RequestKind::LineSegment, HEntity::NONE);
        let (entities, params) = req.generate().unwrap();
        assert_eq!(entities.len(), 3);
        assert_eq!(params.len(), 6); // two free 3D points, 3 params each
        assert!(matches!(entities[2].kind, EntityKind::LineSegment { .. }));
    }

    #[test]
    fn regenerating_a_request_is_idempotent() {
        let req = Request::new(HRequest(20), HGroup(1), RequestKind::Circle, HEntity::NONE);
        let (e1, p1) = req.generate().unwrap();
        let (e2, p2) = req.generate().unwrap();
        let ids1: Vec<_> = e1.iter().map(|e| e.id.v()).collect();
        let ids2: Vec<_> = e2.iter().map(|e| e.id.v()).collect();
        assert_eq!(ids1, ids2);
        let pids1: Vec<_> = p1.iter().map(|p| p.id.v()).collect();
        let pids2: Vec<_> = p2.iter().map(|p| p.id.v()).collect();
        assert_eq!(pids1, pids2);
    }

    #[test]
    fn workplane_bound_point_uses_two_params() {
        let wp = HEntity::of_request(HRequest(1), offset::PRIMARY_ENTITY);
        let req = Request::new(HRequest(30), HGroup(1), RequestKind::DatumPoint, wp);
        let (entities, params) = req.generate().unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(params.len(), 2);
        assert!(matches!(entities[0].kind, EntityKind::Point2d { .. }));
    }

    #[test]
    fn cubic_with_extra_points_extends_the_control_polygon() {
        let mut req = Request::new(HRequest(40), HGroup(1), RequestKind::Cubic, HEntity::NONE);
        req.extra_points = 2;
        let (entities, _params) = req.generate().unwrap();
        // 4 + 2 points, plus the primary Cubic entity.
        assert_eq!(entities.len(), 7);
        match &entities[6].kind {
            EntityKind::Cubic { points } => assert_eq!(points.len(), 6),
            _ => panic!("expected Cubic primary"),
        }
    }
}
