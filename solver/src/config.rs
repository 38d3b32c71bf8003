//! Solver tunables, loadable from TOML (`spec.md` §2 ambient "Config"
//! addition; `SPEC_FULL.md` §2).

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// `System::Tol`'s residual-convergence tolerance (`examples/original_source/system.cpp`).
    pub residual_tolerance: f64,
    /// Singular-pivot threshold during Gaussian elimination.
    pub pivot_threshold: f64,
    /// `System::Tol`'s loose pivot-acceptance threshold for Stage B's
    /// structural Gauss-Jordan elimination — deliberately looser than
    /// `pivot_threshold` since it is judging whether a param is determined
    /// by the system at all, not whether a numeric solve is well-conditioned.
    pub gauss_jordan_tolerance: f64,
    /// Singular threshold on the back-substitution diagonal, looser than
    /// `pivot_threshold` by design in the original.
    pub back_substitution_threshold: f64,
    /// Newton iteration cap (`do { ... } while(iter++ < 50)`).
    pub max_newton_iterations: u32,
    /// Soft cap replacing the original's fixed `MAX_UNKNOWNS = 200`
    /// stack-allocated matrix; exceeding it reports `TooManyUnknowns`
    /// instead of growing `Vec`-backed matrices without bound. See
    /// `SPEC_FULL.md` §4.5.1 / §9's resolved Open Question.
    pub max_unknowns: usize,
    /// Bound on how many constraints Stage D will try dropping in turn
    /// while hunting for the offending subset.
    pub max_redundancy_search: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            residual_tolerance: 1e-2,
            pivot_threshold: 1e-12,
            gauss_jordan_tolerance: 1e-2,
            back_substitution_threshold: 1e-10,
            max_newton_iterations: 50,
            max_unknowns: 4096,
            max_redundancy_search: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let cfg = SolverConfig::default();
        let s = toml::to_string(&cfg).unwrap();
        let back: SolverConfig = toml::from_str(&s).unwrap();
        assert_eq!(cfg, back);
    }
}
