//! Symbolic 3D vector over [`Expr`], mirroring the original's `ExprVector`
//! (`examples/original_source/expr.h`).
//!
//! Every component is an independent scalar expression rather than a vector
//! primitive, exactly as the original keeps `x, y, z: Expr` rather than a
//! single vector-valued node — that's what lets `partial_wrt` differentiate
//! one component against one parameter without touching the others.

use kernel_expr::{Expr, ParamSource};

use crate::vec3::Vec3;

#[derive(Clone, Debug)]
pub struct ExprVec3 {
    pub x: Expr,
    pub y: Expr,
    pub z: Expr,
}

impl ExprVec3 {
    pub fn new(x: Expr, y: Expr, z: Expr) -> ExprVec3 {
        ExprVec3 { x, y, z }
    }

    pub fn from_constant(v: Vec3) -> ExprVec3 {
        ExprVec3 { x: Expr::constant(v.x), y: Expr::constant(v.y), z: Expr::constant(v.z) }
    }

    pub fn plus(&self, b: &ExprVec3) -> ExprVec3 {
        ExprVec3 {
            x: self.x.clone().plus(b.x.clone()),
            y: self.y.clone().plus(b.y.clone()),
            z: self.z.clone().plus(b.z.clone()),
        }
    }

    pub fn minus(&self, b: &ExprVec3) -> ExprVec3 {
        ExprVec3 {
            x: self.x.clone().minus(b.x.clone()),
            y: self.y.clone().minus(b.y.clone()),
            z: self.z.clone().minus(b.z.clone()),
        }
    }

    pub fn dot(&self, b: &ExprVec3) -> Expr {
        self.x
            .clone()
            .times(b.x.clone())
            .plus(self.y.clone().times(b.y.clone()))
            .plus(self.z.clone().times(b.z.clone()))
    }

    pub fn cross(&self, b: &ExprVec3) -> ExprVec3 {
        ExprVec3 {
            x: self.y.clone().times(b.z.clone()).minus(self.z.clone().times(b.y.clone())),
            y: self.z.clone().times(b.x.clone()).minus(self.x.clone().times(b.z.clone())),
            z: self.x.clone().times(b.y.clone()).minus(self.y.clone().times(b.x.clone())),
        }
    }

    pub fn scaled_by(&self, s: Expr) -> ExprVec3 {
        ExprVec3 {
            x: self.x.clone().times(s.clone()),
            y: self.y.clone().times(s.clone()),
            z: self.z.clone().times(s),
        }
    }

    pub fn magnitude(&self) -> Expr {
        self.dot(self).sqrt()
    }

    /// Scales to the given (expression-valued) magnitude, matching the
    /// original's `ExprVector::WithMagnitude`, used to build direction
    /// constraints where the target length is itself a parameter.
    pub fn with_magnitude(&self, s: Expr) -> ExprVec3 {
        let m = self.magnitude();
        self.scaled_by(s.div(m))
    }

    pub fn eval(&self, src: &dyn ParamSource) -> Vec3 {
        Vec3::new(self.x.eval(src), self.y.eval(src), self.z.eval(src))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_expr::ParamTable;

    #[test]
    fn cross_product_eval_matches_numeric() {
        let a = ExprVec3::new(Expr::param(0), Expr::param(1), Expr::param(2));
        let b = ExprVec3::new(Expr::param(3), Expr::param(4), Expr::param(5));
        let c = a.cross(&b);
        let mut t = ParamTable::new();
        for (i, v) in [1.0, 0.0, 0.0, 0.0, 1.0, 0.0].iter().enumerate() {
            t.set(i as u32, *v);
        }
        let r = c.eval(&t);
        assert!((r.z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn with_magnitude_scales_symbolically() {
        let v = ExprVec3::new(Expr::param(0), Expr::constant(0.0), Expr::constant(0.0));
        let scaled = v.with_magnitude(Expr::constant(10.0));
        let mut t = ParamTable::new();
        t.set(0, 5.0);
        let r = scaled.eval(&t);
        assert!((r.x - 10.0).abs() < 1e-9);
    }
}
