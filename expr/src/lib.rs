//! Symbolic scalar algebra for the constraint engine.
//!
//! An [`Expr`] is a small tagged tree over parameters and arithmetic
//! operators. Trees are built freely, evaluated numerically against a
//! [`ParamSource`], and differentiated structurally with [`Expr::partial_wrt`].
//! Nothing here knows about entities, constraints or groups — those live in
//! `kernel_sketch` and refer back into this crate only through [`ParamId`].

use std::cell::Cell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

mod parser;
pub use parser::{parse, ParseError};

/// Opaque identifier for a parameter, independent of how the owning store
/// represents its own handles. `kernel_sketch::hParam` converts to and from
/// this type; `kernel_expr` never looks inside it.
pub type ParamId = u32;

/// A parameter's numeric storage, shared between the sketch store and any
/// [`Expr::ParamPtr`] nodes that have been bound directly to it.
///
/// This is the Rust equivalent of the original engine's raw `Param *`
/// embedded in a `PARAM_PTR` node (`examples/original_source/expr.h`'s
/// `x.parp` union member): instead of an unchecked pointer into a table that
/// must never reallocate, we share a reference-counted cell. Reading it is
/// a plain `Cell::get`, just as cheap as the original's pointer dereference.
pub type ParamCell = Rc<Cell<f64>>;

/// Resolves a [`ParamId`] to its current numeric value or its shared cell.
///
/// `deep_copy_with_params_as_pointers` looks a parameter up first in
/// `primary`, then in `secondary` — mirroring the original's
/// `DeepCopyWithParamsAsPointers(IdList<Param,hParam> *firstTry, *thenTry)`,
/// which checks the group being solved before falling back to the
/// references group.
pub trait ParamSource {
    fn value(&self, id: ParamId) -> Option<f64>;
    fn cell(&self, id: ParamId) -> Option<ParamCell>;
}

/// Binary operators, in the original's ordering (`PLUS, MINUS, TIMES, DIV`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Times,
    Div,
}

/// Unary operators (`NEGATE, SQRT, SQUARE, SIN, COS, ASIN, ACOS`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Sqrt,
    Square,
    Sin,
    Cos,
    Asin,
    Acos,
}

/// A node in the symbolic expression tree.
///
/// Trees are plain owned `Box` trees rather than arena-allocated, unlike the
/// original's bump allocator (`AllocTemporary`). Rust's ownership already
/// gives the arena's real benefit — bulk deallocation when a tree goes out
/// of scope — without hand-rolled pointer bookkeeping; see `DESIGN.md`.
#[derive(Clone, Debug)]
pub enum Expr {
    Constant(f64),
    Param(ParamId),
    ParamPtr(ParamCell),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
}

/// Approximate summary of which parameters an [`Expr`] depends on, used to
/// group equations for the solver's structural rank analysis.
///
/// Bit `i` of `Bits` is set when some parameter `p` referenced by the
/// expression satisfies `p % 64 == i`. This is a hash-bucket test, not an
/// exact membership test — two expressions whose bitsets don't intersect
/// definitely don't share a parameter, but an intersection is only a hint.
/// `Many` is returned once an expression references more than 64 distinct
/// parameters, at which point the bitset stops being a useful fast-reject.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParamUsage {
    Bits(u64),
    Many,
}

impl ParamUsage {
    pub fn intersects(&self, other: &ParamUsage) -> bool {
        match (self, other) {
            (ParamUsage::Bits(a), ParamUsage::Bits(b)) => (a & b) != 0,
            _ => true,
        }
    }
}

const PARAM_USAGE_CARDINALITY_THRESHOLD: usize = 64;

impl Expr {
    pub fn constant(v: f64) -> Expr {
        Expr::Constant(v)
    }

    pub fn param(id: ParamId) -> Expr {
        Expr::Param(id)
    }

    pub fn param_ptr(cell: ParamCell) -> Expr {
        Expr::ParamPtr(cell)
    }

    pub fn plus(self, other: Expr) -> Expr {
        Expr::Binary(BinaryOp::Plus, Box::new(self), Box::new(other))
    }

    pub fn minus(self, other: Expr) -> Expr {
        Expr::Binary(BinaryOp::Minus, Box::new(self), Box::new(other))
    }

    pub fn times(self, other: Expr) -> Expr {
        Expr::Binary(BinaryOp::Times, Box::new(self), Box::new(other))
    }

    pub fn div(self, other: Expr) -> Expr {
        Expr::Binary(BinaryOp::Div, Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Expr {
        Expr::Unary(UnaryOp::Negate, Box::new(self))
    }

    pub fn sqrt(self) -> Expr {
        Expr::Unary(UnaryOp::Sqrt, Box::new(self))
    }

    pub fn square(self) -> Expr {
        Expr::Unary(UnaryOp::Square, Box::new(self))
    }

    pub fn sin(self) -> Expr {
        Expr::Unary(UnaryOp::Sin, Box::new(self))
    }

    pub fn cos(self) -> Expr {
        Expr::Unary(UnaryOp::Cos, Box::new(self))
    }

    pub fn asin(self) -> Expr {
        Expr::Unary(UnaryOp::Asin, Box::new(self))
    }

    pub fn acos(self) -> Expr {
        Expr::Unary(UnaryOp::Acos, Box::new(self))
    }

    /// Purely numeric evaluation. A division by a near-zero denominator
    /// yields `NaN`, which downstream solver code treats as a failure
    /// signal rather than panicking.
    pub fn eval(&self, src: &dyn ParamSource) -> f64 {
        match self {
            Expr::Constant(v) => *v,
            Expr::Param(id) => src.value(*id).unwrap_or(f64::NAN),
            Expr::ParamPtr(cell) => cell.get(),
            Expr::Binary(op, a, b) => {
                let (a, b) = (a.eval(src), b.eval(src));
                match op {
                    BinaryOp::Plus => a + b,
                    BinaryOp::Minus => a - b,
                    BinaryOp::Times => a * b,
                    BinaryOp::Div => a / b,
                }
            }
            Expr::Unary(op, a) => {
                let a = a.eval(src);
                match op {
                    UnaryOp::Negate => -a,
                    UnaryOp::Sqrt => a.sqrt(),
                    UnaryOp::Square => a * a,
                    UnaryOp::Sin => a.sin(),
                    UnaryOp::Cos => a.cos(),
                    UnaryOp::Asin => a.asin(),
                    UnaryOp::Acos => a.acos(),
                }
            }
        }
    }

    /// Structural differentiation with respect to `id`. Constant-folds the
    /// common `0 * x` / `1 * x` patterns that a naive product rule produces,
    /// so that repeated differentiation (as the Jacobian needs, one partial
    /// per column per row) doesn't blow the tree up geometrically.
    pub fn partial_wrt(&self, id: ParamId) -> Expr {
        self.partial_wrt_inner(id).fold_constants()
    }

    fn partial_wrt_inner(&self, id: ParamId) -> Expr {
        match self {
            Expr::Constant(_) => Expr::Constant(0.0),
            Expr::Param(p) => Expr::Constant(if *p == id { 1.0 } else { 0.0 }),
            // A bound pointer no longer carries which original param it came
            // from, so differentiating one structurally is only sound when
            // it is not `id`. Solver code never differentiates pointer-bound
            // trees against a param id directly; it differentiates the
            // un-pointered tree first and only then binds pointers for the
            // numeric evaluation pass (see `deep_copy_with_params_as_pointers`
            // doc).
            Expr::ParamPtr(_) => Expr::Constant(0.0),
            Expr::Binary(op, a, b) => {
                let da = a.partial_wrt_inner(id);
                let db = b.partial_wrt_inner(id);
                match op {
                    BinaryOp::Plus => da.plus(db),
                    BinaryOp::Minus => da.minus(db),
                    BinaryOp::Times => {
                        // d(a*b) = da*b + a*db
                        da.times((**b).clone()).plus((**a).clone().times(db))
                    }
                    BinaryOp::Div => {
                        // d(a/b) = (da*b - a*db) / b^2
                        let num = da.times((**b).clone()).minus((**a).clone().times(db));
                        let den = (**b).clone().square();
                        num.div(den)
                    }
                }
            }
            Expr::Unary(op, a) => {
                let da = a.partial_wrt_inner(id);
                match op {
                    UnaryOp::Negate => da.negate(),
                    UnaryOp::Sqrt => {
                        // d(sqrt(a)) = da / (2*sqrt(a))
                        let two_sqrt = Expr::Constant(2.0).times((**a).clone().sqrt());
                        da.div(two_sqrt)
                    }
                    UnaryOp::Square => {
                        // d(a^2) = 2*a*da
                        Expr::Constant(2.0).times((**a).clone()).times(da)
                    }
                    UnaryOp::Sin => da.times((**a).clone().cos()),
                    UnaryOp::Cos => da.times((**a).clone().sin().negate()),
                    UnaryOp::Asin => {
                        // d(asin(a)) = da / sqrt(1 - a^2)
                        let den = Expr::Constant(1.0)
                            .minus((**a).clone().square())
                            .sqrt();
                        da.div(den)
                    }
                    UnaryOp::Acos => {
                        let den = Expr::Constant(1.0)
                            .minus((**a).clone().square())
                            .sqrt();
                        da.div(den).negate()
                    }
                }
            }
        }
    }

    /// Deep-copies the tree, rewriting every [`Expr::Param`] node into an
    /// [`Expr::ParamPtr`] bound directly to the parameter's shared cell,
    /// looked up first in `primary`, then `secondary`.
    ///
    /// This is the step the original calls mandatory before the tight inner
    /// solver loop (`DeepCopyWithParamsAsPointers`): without it, every
    /// Newton iteration re-resolves every `hParam` through a table lookup;
    /// with it, evaluation is a chain of `Cell::get` calls.
    pub fn deep_copy_with_params_as_pointers(
        &self,
        primary: &dyn ParamSource,
        secondary: &dyn ParamSource,
    ) -> Expr {
        match self {
            Expr::Constant(v) => Expr::Constant(*v),
            Expr::Param(id) => {
                let cell = primary
                    .cell(*id)
                    .or_else(|| secondary.cell(*id));
                match cell {
                    Some(cell) => Expr::ParamPtr(cell),
                    None => Expr::Param(*id),
                }
            }
            Expr::ParamPtr(cell) => Expr::ParamPtr(cell.clone()),
            Expr::Binary(op, a, b) => Expr::Binary(
                *op,
                Box::new(a.deep_copy_with_params_as_pointers(primary, secondary)),
                Box::new(b.deep_copy_with_params_as_pointers(primary, secondary)),
            ),
            Expr::Unary(op, a) => Expr::Unary(
                *op,
                Box::new(a.deep_copy_with_params_as_pointers(primary, secondary)),
            ),
        }
    }

    /// Approximate set of referenced parameters, see [`ParamUsage`].
    pub fn params_used(&self) -> ParamUsage {
        let mut seen = HashSet::new();
        self.collect_params(&mut seen);
        if seen.len() > PARAM_USAGE_CARDINALITY_THRESHOLD {
            return ParamUsage::Many;
        }
        let mut bits: u64 = 0;
        for id in seen {
            bits |= 1u64 << (id % 64);
        }
        ParamUsage::Bits(bits)
    }

    fn collect_params(&self, out: &mut HashSet<ParamId>) {
        match self {
            Expr::Constant(_) | Expr::ParamPtr(_) => {}
            Expr::Param(id) => {
                out.insert(*id);
            }
            Expr::Binary(_, a, b) => {
                a.collect_params(out);
                b.collect_params(out);
            }
            Expr::Unary(_, a) => a.collect_params(out),
        }
    }

    pub fn depends_on(&self, id: ParamId) -> bool {
        match self {
            Expr::Constant(_) | Expr::ParamPtr(_) => false,
            Expr::Param(p) => *p == id,
            Expr::Binary(_, a, b) => a.depends_on(id) || b.depends_on(id),
            Expr::Unary(_, a) => a.depends_on(id),
        }
    }

    /// Folds `0*x`, `1*x`, `x+0`, `x-0` and constant-constant subtrees.
    /// Recurses bottom-up so a freshly differentiated tree collapses in one
    /// pass instead of needing repeated fixed-point folding.
    pub fn fold_constants(&self) -> Expr {
        match self {
            Expr::Constant(v) => Expr::Constant(*v),
            Expr::Param(id) => Expr::Param(*id),
            Expr::ParamPtr(cell) => Expr::ParamPtr(cell.clone()),
            Expr::Binary(op, a, b) => {
                let a = a.fold_constants();
                let b = b.fold_constants();
                if let (Expr::Constant(x), Expr::Constant(y)) = (&a, &b) {
                    let v = match op {
                        BinaryOp::Plus => x + y,
                        BinaryOp::Minus => x - y,
                        BinaryOp::Times => x * y,
                        BinaryOp::Div => x / y,
                    };
                    return Expr::Constant(v);
                }
                match (op, &a, &b) {
                    (BinaryOp::Times, Expr::Constant(c), _) if *c == 0.0 => Expr::Constant(0.0),
                    (BinaryOp::Times, _, Expr::Constant(c)) if *c == 0.0 => Expr::Constant(0.0),
                    (BinaryOp::Times, Expr::Constant(c), other) if *c == 1.0 => other.clone(),
                    (BinaryOp::Times, other, Expr::Constant(c)) if *c == 1.0 => other.clone(),
                    (BinaryOp::Plus, Expr::Constant(c), other) if *c == 0.0 => other.clone(),
                    (BinaryOp::Plus, other, Expr::Constant(c)) if *c == 0.0 => other.clone(),
                    (BinaryOp::Minus, other, Expr::Constant(c)) if *c == 0.0 => other.clone(),
                    _ => Expr::Binary(*op, Box::new(a), Box::new(b)),
                }
            }
            Expr::Unary(op, a) => {
                let a = a.fold_constants();
                if let Expr::Constant(x) = &a {
                    let v = match op {
                        UnaryOp::Negate => -x,
                        UnaryOp::Sqrt => x.sqrt(),
                        UnaryOp::Square => x * x,
                        UnaryOp::Sin => x.sin(),
                        UnaryOp::Cos => x.cos(),
                        UnaryOp::Asin => x.asin(),
                        UnaryOp::Acos => x.acos(),
                    };
                    return Expr::Constant(v);
                }
                Expr::Unary(*op, Box::new(a))
            }
        }
    }

    /// Replaces every occurrence of parameter `old` with `new`. Used by the
    /// solver's symbolic substitution pass (Stage A) once a coincident-point
    /// chain has picked a representative parameter.
    pub fn substitute(&self, old: ParamId, new: ParamId) -> Expr {
        match self {
            Expr::Param(id) if *id == old => Expr::Param(new),
            Expr::Constant(_) | Expr::Param(_) | Expr::ParamPtr(_) => self.clone(),
            Expr::Binary(op, a, b) => Expr::Binary(
                *op,
                Box::new(a.substitute(old, new)),
                Box::new(b.substitute(old, new)),
            ),
            Expr::Unary(op, a) => Expr::Unary(*op, Box::new(a.substitute(old, new))),
        }
    }

    /// If this expression is exactly a bare parameter reference (`Param` or
    /// a pointer bound to one), return it. Used by the solver's Stage A to
    /// recognise `a - b = 0` equations where both sides are single params.
    pub fn as_param(&self) -> Option<ParamId> {
        match self {
            Expr::Param(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_constant_zero(&self) -> bool {
        matches!(self, Expr::Constant(v) if *v == 0.0)
    }

    /// Fixed absolute-tolerance comparison, matching the original's
    /// `Expr::Tol`.
    pub fn tol(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(v) => write!(f, "{v}"),
            Expr::Param(id) => write!(f, "p{id}"),
            Expr::ParamPtr(cell) => write!(f, "{}", cell.get()),
            Expr::Binary(op, a, b) => {
                let sym = match op {
                    BinaryOp::Plus => "+",
                    BinaryOp::Minus => "-",
                    BinaryOp::Times => "*",
                    BinaryOp::Div => "/",
                };
                write!(f, "({a} {sym} {b})")
            }
            Expr::Unary(op, a) => {
                let name = match op {
                    UnaryOp::Negate => "-",
                    UnaryOp::Sqrt => "sqrt",
                    UnaryOp::Square => "sq",
                    UnaryOp::Sin => "sin",
                    UnaryOp::Cos => "cos",
                    UnaryOp::Asin => "asin",
                    UnaryOp::Acos => "acos",
                };
                write!(f, "{name}({a})")
            }
        }
    }
}

/// Trivial `ParamSource` over a plain map, handy for tests and for the
/// `value()`-only callers that never need the pointer form.
#[derive(Default)]
pub struct ParamTable {
    values: std::collections::HashMap<ParamId, ParamCell>,
}

impl ParamTable {
    pub fn new() -> Self {
        ParamTable { values: std::collections::HashMap::new() }
    }

    pub fn set(&mut self, id: ParamId, value: f64) {
        match self.values.get(&id) {
            Some(cell) => cell.set(value),
            None => {
                self.values.insert(id, Rc::new(Cell::new(value)));
            }
        }
    }
}

impl ParamSource for ParamTable {
    fn value(&self, id: ParamId) -> Option<f64> {
        self.values.get(&id).map(|c| c.get())
    }

    fn cell(&self, id: ParamId) -> Option<ParamCell> {
        self.values.get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(ParamId, f64)]) -> ParamTable {
        let mut t = ParamTable::new();
        for (id, v) in pairs {
            t.set(*id, *v);
        }
        t
    }

    #[test]
    fn eval_basic_arithmetic() {
        let e = Expr::param(0).plus(Expr::constant(2.0)).times(Expr::constant(3.0));
        let src = table(&[(0, 4.0)]);
        assert_eq!(e.eval(&src), 18.0);
    }

    #[test]
    fn division_by_zero_is_nan_not_panic() {
        let e = Expr::constant(1.0).div(Expr::constant(0.0));
        let src = table(&[]);
        assert!(e.eval(&src).is_nan());
    }

    #[test]
    fn partial_wrt_matches_centred_difference() {
        // f(p0, p1) = p0^2 * sin(p1)
        let f = Expr::param(0).square().times(Expr::param(1).sin());
        let src = table(&[(0, 1.3), (1, 0.7)]);
        let analytic = f.partial_wrt(0).eval(&src);

        let h = 1e-6;
        let plus = table(&[(0, 1.3 + h), (1, 0.7)]);
        let minus = table(&[(0, 1.3 - h), (1, 0.7)]);
        let numeric = (f.eval(&plus) - f.eval(&minus)) / (2.0 * h);

        assert!((analytic - numeric).abs() < 1e-6, "{analytic} vs {numeric}");
    }

    #[test]
    fn fold_constants_collapses_zero_and_one() {
        let e = Expr::param(0).times(Expr::constant(0.0));
        assert!(e.fold_constants().is_constant_zero());

        let e = Expr::param(0).times(Expr::constant(1.0)).fold_constants();
        assert!(matches!(e, Expr::Param(0)));
    }

    #[test]
    fn substitute_replaces_param_everywhere() {
        let e = Expr::param(0).plus(Expr::param(0).times(Expr::param(1)));
        let s = e.substitute(0, 5);
        let src = table(&[(5, 2.0), (1, 3.0)]);
        assert_eq!(s.eval(&src), 2.0 + 2.0 * 3.0);
    }

    #[test]
    fn deep_copy_with_pointers_matches_value_eval() {
        let e = Expr::param(0).plus(Expr::param(1));
        let src = table(&[(0, 1.0), (1, 2.0)]);
        let empty = ParamTable::new();
        let bound = e.deep_copy_with_params_as_pointers(&src, &empty);
        assert_eq!(bound.eval(&empty), 3.0);
    }

    #[test]
    fn params_used_detects_shared_and_disjoint() {
        let a = Expr::param(3).plus(Expr::param(10));
        let b = Expr::param(10).plus(Expr::param(20));
        let c = Expr::param(1).plus(Expr::param(2));
        assert!(a.params_used().intersects(&b.params_used()));
        assert!(!a.params_used().intersects(&c.params_used()));
    }
}
