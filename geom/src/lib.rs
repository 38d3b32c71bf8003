//! 3D vector, quaternion and surface primitives shared by the sketch store,
//! solver and mesh pipeline.
//!
//! This crate sits below `kernel_expr` in the dependency graph only in the
//! symbolic half (`ExprVec3`, `ExprQuaternion`); the numeric half (`Vec3`,
//! `Quaternion`, `Plane`, `Cylinder`) has no dependency on it at all, the
//! same layering the teacher uses between `lyon_geom` (numeric) and the
//! crates that build expression trees over it.

mod expr_quat;
mod expr_vec;
mod line;
mod quaternion;
mod surface;
mod vec3;

pub use expr_quat::ExprQuaternion;
pub use expr_vec::ExprVec3;
pub use line::LineSegment3;
pub use quaternion::Quaternion;
pub use surface::{
    intersect_plane_cylinder, intersect_plane_plane, plane_basis, subdivide_intersection,
    Cylinder, IntersectionCurve, Plane, Surface,
};
pub use vec3::{vec3, Bbox, Vec3};
