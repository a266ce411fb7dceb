//! # Frontier Engine
//!
//! $$
//! \mathcal S = (\text{iteration budget}, \text{tolerances}) \mapsto \{\mathbf{w}^\*_{\mathcal S}\}
//! $$
//!
//! Every frontier optimization bound to one solver configuration.

use anyhow::Result;
use ndarray::Array1;
use ndarray::Array2;

use super::frontier::solve_frontier;
use super::frontier::solve_two_asset_frontier;
use super::metrics::check_covariance;
use super::metrics::check_universe;
use super::optimizers::solve_maximum_sharpe_ratio;
use super::optimizers::solve_minimize_volatility;
use super::optimizers::solve_optimal_weights;
use super::solver::ConstrainedSolver;
use super::solver::SolverConfig;
use super::types::Frontier;
use super::types::FrontierConfig;
use super::types::PortfolioPoint;

/// Frontier optimizations sharing one solver configuration.
///
/// The free functions in [`crate::portfolio`] run on `FrontierEngine::default()`.
#[derive(Clone, Debug, Default)]
pub struct FrontierEngine {
  solver: ConstrainedSolver,
}

impl FrontierEngine {
  pub fn new(config: SolverConfig) -> Self {
    Self {
      solver: ConstrainedSolver::new(config),
    }
  }

  pub fn config(&self) -> &SolverConfig {
    self.solver.config()
  }

  pub fn minimize_volatility(
    &self,
    target_return: f64,
    returns: &Array1<f64>,
    cov: &Array2<f64>,
  ) -> Result<Array1<f64>> {
    check_universe(returns, cov)?;
    solve_minimize_volatility(&self.solver, target_return, returns, cov)
  }

  pub fn maximum_sharpe_ratio(
    &self,
    riskfree_rate: f64,
    returns: &Array1<f64>,
    cov: &Array2<f64>,
  ) -> Result<Array1<f64>> {
    check_universe(returns, cov)?;
    solve_maximum_sharpe_ratio(&self.solver, riskfree_rate, returns, cov)
  }

  pub fn global_minimum_variance(&self, cov: &Array2<f64>) -> Result<Array1<f64>> {
    check_covariance(cov)?;
    solve_maximum_sharpe_ratio(&self.solver, 0.0, &Array1::ones(cov.nrows()), cov)
  }

  pub fn optimal_weights(
    &self,
    n_points: usize,
    returns: &Array1<f64>,
    cov: &Array2<f64>,
  ) -> Result<Vec<Array1<f64>>> {
    check_universe(returns, cov)?;
    solve_optimal_weights(&self.solver, n_points, returns, cov)
  }

  pub fn compute_frontier(
    &self,
    returns: &Array1<f64>,
    cov: &Array2<f64>,
    config: &FrontierConfig,
  ) -> Result<Frontier> {
    solve_frontier(&self.solver, returns, cov, config)
  }

  /// No optimization involved; kept here so the engine covers every frontier.
  pub fn two_asset_frontier(
    &self,
    n_points: usize,
    returns: &Array1<f64>,
    cov: &Array2<f64>,
  ) -> Result<Vec<PortfolioPoint>> {
    solve_two_asset_frontier(n_points, returns, cov)
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;

  use super::*;

  #[test]
  fn engine_matches_free_functions() {
    let er = array![0.1, 0.2];
    let cov = array![[0.04, 0.01], [0.01, 0.09]];
    let engine = FrontierEngine::default();

    let w = engine.minimize_volatility(0.15, &er, &cov).unwrap();
    assert_abs_diff_eq!(w, array![0.5, 0.5], epsilon = 1e-6);

    let gmv = engine.global_minimum_variance(&cov).unwrap();
    assert_abs_diff_eq!(
      gmv,
      crate::portfolio::global_minimum_variance(&cov).unwrap(),
      epsilon = 1e-9
    );
  }

  #[test]
  fn custom_budget_is_used() {
    let engine = FrontierEngine::new(SolverConfig {
      max_outer_iters: 20,
      max_inner_iters: 500,
      ..SolverConfig::default()
    });
    assert_eq!(engine.config().max_outer_iters, 20);

    let er = array![0.08, 0.1, 0.12];
    let cov = array![[0.04, 0.01, 0.0], [0.01, 0.09, 0.02], [0.0, 0.02, 0.16]];
    let w = engine.minimize_volatility(0.5, &er, &cov).unwrap();

    assert!(w.iter().all(|v| v.is_finite() && (0.0..=1.0).contains(v)));
  }

  #[test]
  fn sweep_and_frontier_agree() {
    let er = array![0.08, 0.1, 0.12];
    let cov = array![[0.04, 0.01, 0.0], [0.01, 0.09, 0.02], [0.0, 0.02, 0.16]];
    let engine = FrontierEngine::default();

    let sweep = engine.optimal_weights(4, &er, &cov).unwrap();
    let frontier = engine
      .compute_frontier(
        &er,
        &cov,
        &FrontierConfig {
          n_points: 4,
          ..FrontierConfig::default()
        },
      )
      .unwrap();

    for (w, point) in sweep.iter().zip(&frontier.points) {
      assert_abs_diff_eq!(*w, point.weights, epsilon = 1e-12);
    }
    assert!(engine.two_asset_frontier(3, &er, &cov).is_err());
  }
}
