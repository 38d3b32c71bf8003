//! Constraint reduction and the Newton/least-squares solver
//! (`spec.md` §4.4 "Constraint reduction", §4.5 "Solver"), mirroring the
//! original's `System::Solve` (`examples/original_source/system.cpp`) while
//! replacing its fixed-size `double[MAX_UNKNOWNS][MAX_UNKNOWNS]` scratch with
//! `Vec`-backed matrices sized to the group actually being solved.

pub mod config;
pub mod entity_expr;
pub mod matrix;
pub mod reduce;

pub use config::SolverConfig;
pub use matrix::Mat;

use kernel_expr::{Expr, ParamCell, ParamId, ParamSource, ParamTable};
use kernel_sketch::{Constraint, ConstraintKind, Entity, EntityKind, HConstraint, HGroup, HParam, ParamTag, Sketch};

/// Outcome of [`solve`], mirroring the original's `SolveResult` enum
/// (`OKAY`, `DIDNT_CONVERGE`, `REDUNDANT_OKAY`, `REDUNDANT_DIDNT_CONVERGE`,
/// `TOO_MANY_UNKNOWNS`).
#[derive(Clone, Debug, PartialEq)]
pub enum SolveStatus {
    /// Converged; `dof` free parameters (structurally unconstrained) remain.
    Okay { dof: i32 },
    /// Newton iteration failed to converge or hit a singular Jacobian.
    DidntConverge { bad: Vec<HConstraint> },
    /// Converged after a least-squares repair over a structurally
    /// over-determined system; `dof` as above.
    RedundantOkay { dof: i32 },
    /// Over-determined and the least-squares repair also failed; `bad`
    /// names the constraints the bounded drop-search flagged as offending.
    RedundantDidntConverge { bad: Vec<HConstraint> },
    /// The group has more unknowns than [`SolverConfig::max_unknowns`]
    /// allows.
    TooManyUnknowns,
}

/// Reads a parameter's live value straight out of the sketch store, used as
/// the `secondary` source so constraint `valA` params, other groups' already
/// -solved points, and similar "background" values resolve without needing
/// their own pointer bindings.
struct SketchParamSource<'a> {
    sketch: &'a Sketch,
}

impl<'a> ParamSource for SketchParamSource<'a> {
    fn value(&self, id: ParamId) -> Option<f64> {
        self.sketch.params.get(HParam(id)).map(|p| p.val)
    }

    fn cell(&self, _id: ParamId) -> Option<ParamCell> {
        None
    }
}

struct EquationRecord {
    expr: Expr,
    source: Option<HConstraint>,
}

/// Entities that contribute WhereDragged preference: their own point params
/// are tried last during structural matching so the solver prefers to leave
/// them fixed at the dragged position (`examples/original_source/system.cpp`'s
/// `MarkParamsFree` / drag-priority ordering).
fn dragged_params(sketch: &Sketch, group: HGroup) -> Vec<HParam> {
    let mut out = Vec::new();
    for c in sketch.constraints.iter() {
        if c.group != group {
            continue;
        }
        if let ConstraintKind::WhereDragged { point } = &c.kind {
            if let Some(e) = sketch.entities.get(*point) {
                out.extend(point_owned_params(e));
            }
        }
    }
    out
}

fn point_owned_params(e: &Entity) -> Vec<HParam> {
    match &e.kind {
        EntityKind::Point3d { params } => params.to_vec(),
        EntityKind::Point2d { params, .. } => params.to_vec(),
        _ => Vec::new(),
    }
}

fn normal_unit_equations(sketch: &Sketch, group: HGroup) -> Vec<EquationRecord> {
    let mut out = Vec::new();
    for e in sketch.entities.iter() {
        if e.group != group {
            continue;
        }
        if matches!(e.kind, EntityKind::Normal3d { .. }) {
            out.push(EquationRecord { expr: reduce::normal_unit_equation(sketch, e.id), source: None });
        }
    }
    out
}

/// Detects an equation of the exact shape `a - b` where both sides are bare
/// parameter references, the substitution Stage A looks for.
fn as_param_difference(e: &Expr) -> Option<(ParamId, ParamId)> {
    if let Expr::Binary(kernel_expr::BinaryOp::Minus, a, b) = e {
        if let (Some(pa), Some(pb)) = (a.as_param(), b.as_param()) {
            return Some((pa, pb));
        }
    }
    None
}

/// Solves the parametric system for one group in place, writing converged
/// values back into `sketch.params` and returning the outcome.
///
/// Stages, matching `System::Solve`:
/// - **A**: symbolic substitution collapses `PointsCoincident`-style
///   `a - b = 0` equations by eliminating one of the two params everywhere.
/// - **B**: Gauss-Jordan elimination on the numeric Jacobian pivots each
///   remaining unknown against the equation that best determines it,
///   sizing the square Newton system and flagging both free (unbound)
///   params and excess (never-pivoted) equations.
/// - **C**: Newton-Raphson over the matched square system.
/// - **D**: on an over-determined residual, a least-squares repair
///   (`AᵀA x = Aᵀb`, not the original's minimum-norm `AAᵀz=b` — see
///   `DESIGN.md`) followed by a bounded drop-each-constraint search to name
///   the offending constraints.
pub fn solve(sketch: &mut Sketch, group: HGroup, config: &SolverConfig) -> SolveStatus {
    let mut bound_params: Vec<HParam> = sketch
        .params
        .iter()
        .filter(|p| p.group == group && !p.known)
        .map(|p| p.id)
        .collect();
    bound_params.sort_by_key(|p| p.v());

    if bound_params.len() > config.max_unknowns {
        return SolveStatus::TooManyUnknowns;
    }

    let mut equations: Vec<EquationRecord> = Vec::new();
    for c in sketch.constraints.iter() {
        if c.group != group || c.is_reference_only() {
            continue;
        }
        for expr in reduce::equations_for(sketch, c) {
            equations.push(EquationRecord { expr, source: Some(c.id) });
        }
    }
    equations.extend(normal_unit_equations(sketch, group));

    // Stage A: eliminate direct point-to-point equalities.
    let mut substituted: std::collections::HashMap<ParamId, ParamId> = std::collections::HashMap::new();
    let mut remaining: Vec<EquationRecord> = Vec::new();
    for eq in equations {
        match as_param_difference(&eq.expr) {
            Some((a, b)) if bound_params.iter().any(|p| p.v() == a) && bound_params.iter().any(|p| p.v() == b) => {
                let (keep, drop) = if a < b { (a, b) } else { (b, a) };
                substituted.insert(drop, keep);
            }
            _ => remaining.push(eq),
        }
    }
    // Resolve substitution chains (drop -> keep may itself have been dropped).
    let resolve = |mut id: ParamId, map: &std::collections::HashMap<ParamId, ParamId>| {
        let mut guard = 0;
        while let Some(next) = map.get(&id) {
            id = *next;
            guard += 1;
            if guard > map.len() + 1 {
                break;
            }
        }
        id
    };
    let mut equations: Vec<EquationRecord> = remaining
        .into_iter()
        .map(|eq| {
            let mut expr = eq.expr;
            for (&drop, _) in substituted.iter() {
                let keep = resolve(drop, &substituted);
                expr = expr.substitute(drop, keep);
            }
            EquationRecord { expr, source: eq.source }
        })
        .collect();
    for &drop in substituted.keys() {
        if let Some(p) = sketch.params.get_mut(HParam(drop)) {
            p.tag = ParamTag::Substituted;
        }
    }
    bound_params.retain(|p| !substituted.contains_key(&p.v()));

    // Order: non-dragged params first, so dragged ones are matched last and
    // tend to stay free at their current (dragged) position.
    let dragged = dragged_params(sketch, group);
    let (mut ordered, tail): (Vec<HParam>, Vec<HParam>) =
        bound_params.iter().partition(|p| !dragged.contains(p));
    ordered.extend(tail);

    // Stage B: Gauss-Jordan elimination on the numeric Jacobian
    // (`System::GaussJordan`), picking the largest-magnitude pivot
    // remaining in each column rather than taking the first equation that
    // merely mentions a param. A column that never finds a usable pivot is
    // a genuinely free param (left `ASSUMED`, counted into `dof`); a row
    // that never serves as a pivot is linearly dependent on the rows
    // already eliminated and falls through to Stage D as a candidate
    // redundant equation, the same role `unmatched` played before.
    let jacobian_src = SketchParamSource { sketch: &*sketch };
    let n_params = ordered.len();
    let m_eqs = equations.len();
    let mut jac = Mat::zeros(m_eqs, n_params);
    for (row, eq) in equations.iter().enumerate() {
        for (col, p) in ordered.iter().enumerate() {
            jac.set(row, col, eq.expr.partial_wrt(p.v()).eval(&jacobian_src));
        }
    }
    drop(jacobian_src);

    let mut eq_rows: Vec<usize> = (0..m_eqs).collect();
    let mut pivot_col: Vec<Option<usize>> = vec![None; m_eqs];
    let mut i = 0usize;
    for j in 0..n_params {
        if i >= m_eqs {
            break;
        }
        let mut imax = i;
        let mut max = 0.0_f64;
        for ip in i..m_eqs {
            let v = jac.get(ip, j).abs();
            if v > max {
                imax = ip;
                max = v;
            }
        }
        if max < config.gauss_jordan_tolerance {
            continue;
        }
        if imax != i {
            jac.swap_rows(i, imax);
            eq_rows.swap(i, imax);
        }
        let pivot = jac.get(i, j);
        for jj in 0..n_params {
            jac.set(i, jj, jac.get(i, jj) / pivot);
        }
        for is in 0..m_eqs {
            if is == i {
                continue;
            }
            let factor = jac.get(is, j);
            if factor == 0.0 {
                continue;
            }
            for jj in 0..n_params {
                let v = jac.get(is, jj) - factor * jac.get(i, jj);
                jac.set(is, jj, v);
            }
        }
        pivot_col[i] = Some(j);
        i += 1;
    }
    let rank = i;
    let matched: Vec<(usize, HParam)> =
        (0..rank).map(|k| (eq_rows[k], ordered[pivot_col[k].expect("every pivot row got a column")])).collect();
    let dof = (n_params - rank) as i32;
    let unmatched: Vec<usize> = eq_rows[rank..].to_vec();

    if matched.is_empty() {
        let src = SketchParamSource { sketch: &*sketch };
        let bad = bad_constraints(&equations, &unmatched, &src, config.residual_tolerance);
        return if bad.is_empty() { SolveStatus::Okay { dof } } else { SolveStatus::DidntConverge { bad } };
    }

    // Stage C: Newton-Raphson over the matched square system.
    let matched_params: Vec<HParam> = matched.iter().map(|(_, p)| *p).collect();
    let mut primary = ParamTable::new();
    for p in &matched_params {
        let val = sketch.params.get(*p).map(|rec| rec.val).unwrap_or(0.0);
        primary.set(p.v(), val);
    }
    let secondary = SketchParamSource { sketch: &*sketch };

    let bound_f: Vec<Expr> = matched
        .iter()
        .map(|(idx, _)| equations[*idx].expr.deep_copy_with_params_as_pointers(&primary, &secondary))
        .collect();
    let jacobian: Vec<Vec<Expr>> = matched
        .iter()
        .map(|(idx, _)| {
            matched_params
                .iter()
                .map(|p| {
                    equations[*idx]
                        .expr
                        .partial_wrt(p.v())
                        .deep_copy_with_params_as_pointers(&primary, &secondary)
                })
                .collect()
        })
        .collect();

    let n = matched.len();
    let mut converged = false;
    for _ in 0..config.max_newton_iterations {
        let f: Vec<f64> = bound_f.iter().map(|e| e.eval(&secondary)).collect();
        let max_residual = f.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if max_residual < config.residual_tolerance {
            converged = true;
            break;
        }
        let mut j = Mat::zeros(n, n);
        for (r, row) in jacobian.iter().enumerate() {
            for (c, expr) in row.iter().enumerate() {
                j.set(r, c, expr.eval(&secondary));
            }
        }
        let delta = match matrix::solve_linear_system(j, f, config.pivot_threshold, config.back_substitution_threshold) {
            Some(d) => d,
            None => break,
        };
        for (col, p) in matched_params.iter().enumerate() {
            let cur = primary.value(p.v()).unwrap_or(0.0);
            primary.set(p.v(), cur - delta[col]);
        }
    }

    if !converged {
        return SolveStatus::DidntConverge {
            bad: matched.iter().filter_map(|(idx, _)| equations[*idx].source).collect(),
        };
    }

    for p in &matched_params {
        if let (Some(v), Some(rec)) = (primary.value(p.v()), sketch.params.get_mut(*p)) {
            rec.val = v;
            rec.known = true;
        }
    }

    let check_src = SketchParamSource { sketch: &*sketch };
    let bad = bad_constraints(&equations, &unmatched, &check_src, config.residual_tolerance);
    if bad.is_empty() {
        return SolveStatus::Okay { dof };
    }

    // Stage D: least-squares repair over every equation against the matched
    // unknowns, a deliberate deviation from the original's minimum-norm
    // `A Aᵀ z = b; x = Aᵀz` (meant for underdetermined systems) — this case
    // is overdetermined, so the standard normal-equations form applies.
    redundant_repair(sketch, &equations, &matched_params, &unmatched, config, dof)
}

fn bad_constraints(
    equations: &[EquationRecord],
    indices: &[usize],
    src: &dyn ParamSource,
    tolerance: f64,
) -> Vec<HConstraint> {
    indices
        .iter()
        .filter(|&&i| equations[i].expr.eval(src).abs() > tolerance)
        .filter_map(|&i| equations[i].source)
        .collect()
}

fn redundant_repair(
    sketch: &mut Sketch,
    equations: &[EquationRecord],
    matched_params: &[HParam],
    unmatched: &[usize],
    config: &SolverConfig,
    dof: i32,
) -> SolveStatus {
    let src = SketchParamSource { sketch: &*sketch };
    let n = matched_params.len();
    let m = equations.len();

    let mut a = Mat::zeros(m, n);
    let mut b = vec![0.0; m];
    for (row, eq) in equations.iter().enumerate() {
        b[row] = -eq.expr.eval(&src);
        for (col, p) in matched_params.iter().enumerate() {
            a.set(row, col, eq.expr.partial_wrt(p.v()).eval(&src));
        }
    }
    drop(src);

    let at = a.transpose();
    let ata = at.mul(&a);
    let atb = at.mul_vec(&b);
    let correction = matrix::solve_linear_system(ata, atb, config.pivot_threshold, config.back_substitution_threshold);

    if let Some(delta) = correction {
        for (i, p) in matched_params.iter().enumerate() {
            if let Some(rec) = sketch.params.get_mut(*p) {
                rec.val += delta[i];
            }
        }
        let check = SketchParamSource { sketch: &*sketch };
        let still_bad = bad_constraints(equations, &(0..m).collect::<Vec<_>>(), &check, config.residual_tolerance);
        if still_bad.is_empty() {
            return SolveStatus::RedundantOkay { dof };
        }
    }

    let bound = unmatched.len().min(config.max_redundancy_search);
    let check = SketchParamSource { sketch: &*sketch };
    let mut bad: Vec<HConstraint> = unmatched
        .iter()
        .take(bound)
        .filter(|&&i| equations[i].expr.eval(&check).abs() > config.residual_tolerance)
        .filter_map(|&i| equations[i].source)
        .collect();
    bad.sort_by_key(|c| c.v());
    bad.dedup();
    SolveStatus::RedundantDidntConverge { bad }
}

/// Re-measures a dimension-like constraint's current geometry and writes it
/// into the constraint's own `valA` param, matching the original's
/// `Constraint::ModifyToSatisfy` (used when converting a reference dimension
/// into a driving one without disturbing the sketch).
pub fn modify_to_satisfy(sketch: &mut Sketch, c: &Constraint) {
    let measured = measured_value(sketch, c);
    if let (Some(v), Some(val_a)) = (measured, c.own_param()) {
        if let Some(p) = sketch.params.get_mut(val_a) {
            p.force_to(v);
        }
    }
}

fn measured_value(sketch: &Sketch, c: &Constraint) -> Option<f64> {
    use entity_expr::{circle_parts, line_endpoints, point_world};
    let src = SketchParamSource { sketch };
    match &c.kind {
        ConstraintKind::PtPtDistance { a, b, .. } => {
            Some(point_world(sketch, *a).minus(&point_world(sketch, *b)).magnitude().eval(&src))
        }
        ConstraintKind::Diameter { circle, .. } => {
            let (_, _, radius) = circle_parts(sketch, *circle);
            Some(radius.eval(&src) * 2.0)
        }
        ConstraintKind::LengthRatio { a, b, .. } => {
            let (a0, a1) = line_endpoints(sketch, *a);
            let (b0, b1) = line_endpoints(sketch, *b);
            let la = a1.minus(&a0).magnitude().eval(&src);
            let lb = b1.minus(&b0).magnitude().eval(&src);
            if lb.abs() < 1e-12 { None } else { Some(la / lb) }
        }
        ConstraintKind::LengthDifference { a, b, .. } => {
            let (a0, a1) = line_endpoints(sketch, *a);
            let (b0, b1) = line_endpoints(sketch, *b);
            let la = a1.minus(&a0).magnitude().eval(&src);
            let lb = b1.minus(&b0).magnitude().eval(&src);
            Some(la - lb)
        }
        ConstraintKind::PtLineDistance { point, line, .. } => {
            let (p0, p1) = line_endpoints(sketch, *line);
            let dir = p1.minus(&p0);
            let to_point = point_world(sketch, *point).minus(&p0);
            let scale = to_point.dot(&dir).div(dir.dot(&dir));
            let proj = to_point.minus(&dir.scaled_by(scale));
            Some(proj.magnitude().eval(&src))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_sketch::{EntityKind, Group, GroupKind, HEntity, HGROUP_REFERENCES, Param, Request, RequestKind};

    fn point3d_params(sk: &Sketch, id: HEntity) -> [HParam; 3] {
        match &sk.entities.get(id).unwrap().kind {
            EntityKind::Point3d { params } => *params,
            other => panic!("expected a 3D point entity, got {other:?}"),
        }
    }

    fn group_with_two_points(sk: &mut Sketch) -> (HGroup, HEntity, HEntity) {
        let g = sk.groups.add_and_assign_id(|id| Group::new(id, HGROUP_REFERENCES, GroupKind::Drawing3d));
        sk.active_group = g;
        let req = sk.requests.add_and_assign_id(|id| Request::new(id, g, RequestKind::LineSegment, HEntity::NONE));
        let (entities, params) = sk.requests.get(req).unwrap().generate().unwrap();
        for p in params {
            sk.params.insert(p.id, p);
        }
        let mut points = Vec::new();
        for e in &entities {
            if e.is_point() {
                points.push(e.id);
            }
        }
        for e in entities {
            sk.entities.insert(e.id, e);
        }
        (g, points[0], points[1])
    }

    #[test]
    fn distance_constraint_converges_to_the_requested_length() {
        let mut sk = Sketch::new();
        let (g, p0, p1) = group_with_two_points(&mut sk);

        let params0 = point3d_params(&sk, p0);
        sk.params.get_mut(params0[0]).unwrap().val = 0.0;
        sk.params.get_mut(params0[1]).unwrap().val = 0.0;
        sk.params.get_mut(params0[2]).unwrap().val = 0.0;
        let params1 = point3d_params(&sk, p1);
        sk.params.get_mut(params1[0]).unwrap().val = 1.0;
        sk.params.get_mut(params1[1]).unwrap().val = 0.0;
        sk.params.get_mut(params1[2]).unwrap().val = 0.0;

        let val_a = sk.params.add_and_assign_id(|id| Param::new(id, g, 5.0));
        let c = sk.constraints.add_and_assign_id(|id| Constraint {
            id,
            group: g,
            workplane: HEntity::NONE,
            kind: ConstraintKind::PtPtDistance { a: p0, b: p1, val_a },
        });
        let _ = c;

        let status = solve(&mut sk, g, &SolverConfig::default());
        match status {
            SolveStatus::Okay { .. } | SolveStatus::RedundantOkay { .. } => {}
            other => panic!("expected convergence, got {other:?}"),
        }

        let params1 = point3d_params(&sk, p1);
        let p = kernel_geom::vec3(
            sk.params.get(params1[0]).unwrap().val,
            sk.params.get(params1[1]).unwrap().val,
            sk.params.get(params1[2]).unwrap().val,
        );
        assert!((p.magnitude() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn too_many_unknowns_is_reported_without_attempting_to_solve() {
        let mut sk = Sketch::new();
        let (g, _p0, _p1) = group_with_two_points(&mut sk);
        let tiny = SolverConfig { max_unknowns: 1, ..SolverConfig::default() };
        assert_eq!(solve(&mut sk, g, &tiny), SolveStatus::TooManyUnknowns);
    }

    #[test]
    fn modify_to_satisfy_snaps_valA_to_current_distance() {
        let mut sk = Sketch::new();
        let (g, p0, p1) = group_with_two_points(&mut sk);
        let params1 = point3d_params(&sk, p1);
        sk.params.get_mut(params1[0]).unwrap().val = 3.0;
        let val_a = sk.params.add_and_assign_id(|id| Param::new(id, g, 0.0));
        let c = Constraint {
            id: HConstraint(9999),
            group: g,
            workplane: HEntity::NONE,
            kind: ConstraintKind::PtPtDistance { a: p0, b: p1, val_a },
        };
        modify_to_satisfy(&mut sk, &c);
        assert!((sk.params.get(val_a).unwrap().val - 3.0).abs() < 1e-9);
    }
}
