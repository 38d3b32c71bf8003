//! Symbolic quaternion over [`Expr`], mirroring the original's
//! `ExprQuaternion` (`examples/original_source/expr.h`).
//!
//! Built when a normal entity's own orientation is itself being solved for
//! (rather than read as a fixed numeric value), so that the Jacobian can
//! differentiate a rotated vector's components with respect to the
//! quaternion's four parameters directly.

use kernel_expr::{Expr, ParamSource};

use crate::expr_vec::ExprVec3;
use crate::quaternion::Quaternion;

#[derive(Clone, Debug)]
pub struct ExprQuaternion {
    pub w: Expr,
    pub vx: Expr,
    pub vy: Expr,
    pub vz: Expr,
}

impl ExprQuaternion {
    pub fn new(w: Expr, vx: Expr, vy: Expr, vz: Expr) -> ExprQuaternion {
        ExprQuaternion { w, vx, vy, vz }
    }

    pub fn from_constant(q: Quaternion) -> ExprQuaternion {
        ExprQuaternion {
            w: Expr::constant(q.w),
            vx: Expr::constant(q.vx),
            vy: Expr::constant(q.vy),
            vz: Expr::constant(q.vz),
        }
    }

    pub fn magnitude(&self) -> Expr {
        self.w
            .clone()
            .square()
            .plus(self.vx.clone().square())
            .plus(self.vy.clone().square())
            .plus(self.vz.clone().square())
            .sqrt()
    }

    /// Quaternion product, same component formulas as [`Quaternion::times`]
    /// but built from `Expr` arithmetic.
    pub fn times(&self, b: &ExprQuaternion) -> ExprQuaternion {
        let (aw, ax, ay, az) = (self.w.clone(), self.vx.clone(), self.vy.clone(), self.vz.clone());
        let (bw, bx, by, bz) = (b.w.clone(), b.vx.clone(), b.vy.clone(), b.vz.clone());
        ExprQuaternion {
            w: aw.clone().times(bw.clone())
                .minus(ax.clone().times(bx.clone()))
                .minus(ay.clone().times(by.clone()))
                .minus(az.clone().times(bz.clone())),
            vx: aw.clone().times(bx.clone())
                .plus(ax.clone().times(bw.clone()))
                .plus(ay.clone().times(bz.clone()))
                .minus(az.clone().times(by.clone())),
            vy: aw.clone().times(by.clone())
                .minus(ax.clone().times(bz.clone()))
                .plus(ay.clone().times(bw.clone()))
                .plus(az.clone().times(bx.clone())),
            vz: aw.times(bz).plus(ax.times(by)).minus(ay.times(bx)).plus(az.times(bw)),
        }
    }

    fn conjugate(&self) -> ExprQuaternion {
        ExprQuaternion {
            w: self.w.clone(),
            vx: self.vx.clone().negate(),
            vy: self.vy.clone().negate(),
            vz: self.vz.clone().negate(),
        }
    }

    /// Rotates a vector `p` by this quaternion (assumed unit), matching the
    /// original's `ExprQuaternion::Rotate`.
    pub fn rotate(&self, p: &ExprVec3) -> ExprVec3 {
        let p = ExprQuaternion::new(Expr::constant(0.0), p.x.clone(), p.y.clone(), p.z.clone());
        let r = self.times(&p).times(&self.conjugate());
        ExprVec3::new(r.vx, r.vy, r.vz)
    }

    pub fn rotation_u(&self) -> ExprVec3 {
        self.rotate(&ExprVec3::new(Expr::constant(1.0), Expr::constant(0.0), Expr::constant(0.0)))
    }

    pub fn rotation_v(&self) -> ExprVec3 {
        self.rotate(&ExprVec3::new(Expr::constant(0.0), Expr::constant(1.0), Expr::constant(0.0)))
    }

    pub fn rotation_n(&self) -> ExprVec3 {
        self.rotate(&ExprVec3::new(Expr::constant(0.0), Expr::constant(0.0), Expr::constant(1.0)))
    }

    pub fn eval(&self, src: &dyn ParamSource) -> Quaternion {
        Quaternion::new(self.w.eval(src), self.vx.eval(src), self.vy.eval(src), self.vz.eval(src))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_expr::ParamTable;

    #[test]
    fn symbolic_rotation_matches_numeric_quaternion() {
        let q = Quaternion::from_basis(
            crate::vec3::vec3(0.0, 1.0, 0.0),
            crate::vec3::vec3(0.0, 0.0, 1.0),
        );
        let eq = ExprQuaternion::from_constant(q);
        let src = ParamTable::new();
        let u = eq.rotation_u().eval(&src);
        assert!(u.approx_eq(q.rotation_u(), 1e-9));
    }

    #[test]
    fn magnitude_of_unit_quaternion_is_one() {
        let eq = ExprQuaternion::from_constant(Quaternion::IDENTITY);
        let src = ParamTable::new();
        assert!((eq.magnitude().eval(&src) - 1.0).abs() < 1e-12);
    }
}
