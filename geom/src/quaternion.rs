//! Numeric quaternion arithmetic, used to orient workplanes and 3D normals.
//!
//! Mirrors the original's `Quaternion` (used throughout
//! `examples/original_source/` wherever a workplane or 3D normal entity
//! needs an orientation) and its `ExprQuaternion` symbolic twin
//! (`examples/original_source/expr.h`), which [`crate::expr_quat::ExprQuaternion`]
//! reproduces structurally.

use crate::vec3::{vec3, Vec3};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Quaternion {
    pub w: f64,
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion { w: 1.0, vx: 0.0, vy: 0.0, vz: 0.0 };

    pub fn new(w: f64, vx: f64, vy: f64, vz: f64) -> Quaternion {
        Quaternion { w, vx, vy, vz }
    }

    /// Builds the quaternion whose local `u`, `v` axes (and, implicitly,
    /// `n = u x v`) are the given orthonormal basis vectors — the
    /// constructor a workplane's normal entity uses when the workplane is
    /// first created from a pair of in-plane directions.
    pub fn from_basis(u: Vec3, v: Vec3) -> Quaternion {
        let n = u.cross(v);
        // Standard rotation-matrix-to-quaternion conversion (Shepperd's
        // method), columns of the matrix are u, v, n.
        let m = [
            [u.x, v.x, n.x],
            [u.y, v.y, n.y],
            [u.z, v.z, n.z],
        ];
        let trace = m[0][0] + m[1][1] + m[2][2];
        if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            Quaternion {
                w: 0.25 * s,
                vx: (m[2][1] - m[1][2]) / s,
                vy: (m[0][2] - m[2][0]) / s,
                vz: (m[1][0] - m[0][1]) / s,
            }
        } else if m[0][0] > m[1][1] && m[0][0] > m[2][2] {
            let s = (1.0 + m[0][0] - m[1][1] - m[2][2]).sqrt() * 2.0;
            Quaternion {
                w: (m[2][1] - m[1][2]) / s,
                vx: 0.25 * s,
                vy: (m[0][1] + m[1][0]) / s,
                vz: (m[0][2] + m[2][0]) / s,
            }
        } else if m[1][1] > m[2][2] {
            let s = (1.0 + m[1][1] - m[0][0] - m[2][2]).sqrt() * 2.0;
            Quaternion {
                w: (m[0][2] - m[2][0]) / s,
                vx: (m[0][1] + m[1][0]) / s,
                vy: 0.25 * s,
                vz: (m[1][2] + m[2][1]) / s,
            }
        } else {
            let s = (1.0 + m[2][2] - m[0][0] - m[1][1]).sqrt() * 2.0;
            Quaternion {
                w: (m[1][0] - m[0][1]) / s,
                vx: (m[0][2] + m[2][0]) / s,
                vy: (m[1][2] + m[2][1]) / s,
                vz: 0.25 * s,
            }
        }
        .normalize()
    }

    /// The rotation by `angle` radians about `axis` (assumed nonzero;
    /// normalized internally), via the standard axis-angle-to-quaternion
    /// formula. Used to step a lathe/step-rotate copy around its axis.
    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Quaternion {
        let axis = axis.normalize();
        let half = angle * 0.5;
        let s = half.sin();
        Quaternion { w: half.cos(), vx: axis.x * s, vy: axis.y * s, vz: axis.z * s }
    }

    pub fn magnitude(&self) -> f64 {
        (self.w * self.w + self.vx * self.vx + self.vy * self.vy + self.vz * self.vz).sqrt()
    }

    pub fn normalize(&self) -> Quaternion {
        let m = self.magnitude();
        Quaternion { w: self.w / m, vx: self.vx / m, vy: self.vy / m, vz: self.vz / m }
    }

    pub fn conjugate(&self) -> Quaternion {
        Quaternion { w: self.w, vx: -self.vx, vy: -self.vy, vz: -self.vz }
    }

    pub fn times(&self, b: Quaternion) -> Quaternion {
        let a = self;
        Quaternion {
            w: a.w * b.w - a.vx * b.vx - a.vy * b.vy - a.vz * b.vz,
            vx: a.w * b.vx + a.vx * b.w + a.vy * b.vz - a.vz * b.vy,
            vy: a.w * b.vy - a.vx * b.vz + a.vy * b.w + a.vz * b.vx,
            vz: a.w * b.vz + a.vx * b.vy - a.vy * b.vx + a.vz * b.w,
        }
    }

    /// Rotates `p` by this quaternion (assumed unit).
    pub fn rotate(&self, p: Vec3) -> Vec3 {
        let p = Quaternion { w: 0.0, vx: p.x, vy: p.y, vz: p.z };
        let r = self.times(p).times(self.conjugate());
        vec3(r.vx, r.vy, r.vz)
    }

    /// Local `u` (workplane "horizontal") axis in world coordinates.
    pub fn rotation_u(&self) -> Vec3 {
        self.rotate(vec3(1.0, 0.0, 0.0))
    }

    /// Local `v` (workplane "vertical") axis in world coordinates.
    pub fn rotation_v(&self) -> Vec3 {
        self.rotate(vec3(0.0, 1.0, 0.0))
    }

    /// Local `n` (workplane normal) axis in world coordinates.
    pub fn rotation_n(&self) -> Vec3 {
        self.rotate(vec3(0.0, 0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_rotation_is_no_op() {
        let p = vec3(1.0, 2.0, 3.0);
        assert!(Quaternion::IDENTITY.rotate(p).approx_eq(p, 1e-12));
    }

    #[test]
    fn from_basis_round_trips_axes() {
        let q = Quaternion::from_basis(vec3(0.0, 1.0, 0.0), vec3(0.0, 0.0, 1.0));
        assert!(q.rotation_u().approx_eq(vec3(0.0, 1.0, 0.0), 1e-9));
        assert!(q.rotation_v().approx_eq(vec3(0.0, 0.0, 1.0), 1e-9));
        assert!(q.rotation_n().approx_eq(vec3(1.0, 0.0, 0.0), 1e-9));
    }

    #[test]
    fn conjugate_undoes_rotation() {
        let q = Quaternion::from_basis(vec3(0.0, 1.0, 0.0), vec3(0.0, 0.0, 1.0)).normalize();
        let p = vec3(2.0, -1.0, 4.0);
        let back = q.conjugate().rotate(q.rotate(p));
        assert!(back.approx_eq(p, 1e-9));
    }
}
