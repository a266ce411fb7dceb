//! # Portfolio Optimizers
//!
//! $$
//! \min_{\mathbf{w}} \ \sqrt{\mathbf{w}^\top\Sigma\mathbf{w}}
//! \quad\text{s.t.}\quad \mathbf{1}^\top\mathbf{w}=1,\ \mu^\top\mathbf{w}=r^\*,\ 0\le w_i\le 1
//! $$
//!
//! Long-only, fully invested optimizers behind the efficient frontier. All
//! start from equal weights. Infeasible target returns are not rejected; the
//! solver's best attempt is returned.

use anyhow::Result;
use argmin::core::CostFunction;
use argmin::core::Gradient;
use ndarray::Array1;
use ndarray::Array2;
use rayon::prelude::*;
use tracing::debug;

use super::metrics::check_covariance;
use super::metrics::check_universe;
use super::metrics::equal_weights;
use super::metrics::portfolio_volatility;
use super::solver::Bounds;
use super::solver::ConstrainedSolver;
use super::solver::LinearConstraints;

/// Portfolio volatility as an objective over the weights.
pub struct VolatilityCost<'a> {
  pub cov: &'a Array2<f64>,
}

impl CostFunction for VolatilityCost<'_> {
  type Param = Array1<f64>;
  type Output = f64;

  fn cost(&self, w: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
    Ok(portfolio_volatility(w, self.cov)?)
  }
}

impl Gradient for VolatilityCost<'_> {
  type Param = Array1<f64>;
  type Gradient = Array1<f64>;

  fn gradient(&self, w: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
    let sigma_w = self.cov.dot(w);
    let vol = w.dot(&sigma_w).max(0.0).sqrt();
    Ok(sigma_w / vol)
  }
}

/// Negated Sharpe ratio `-(w·μ - r_f) / σ_p`.
pub struct NegativeSharpeCost<'a> {
  pub returns: &'a Array1<f64>,
  pub cov: &'a Array2<f64>,
  pub riskfree_rate: f64,
}

impl CostFunction for NegativeSharpeCost<'_> {
  type Param = Array1<f64>;
  type Output = f64;

  fn cost(&self, w: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
    let excess = w.dot(self.returns) - self.riskfree_rate;
    Ok(-excess / portfolio_volatility(w, self.cov)?)
  }
}

impl Gradient for NegativeSharpeCost<'_> {
  type Param = Array1<f64>;
  type Gradient = Array1<f64>;

  fn gradient(&self, w: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
    let sigma_w = self.cov.dot(w);
    let variance = w.dot(&sigma_w).max(0.0);
    let vol = variance.sqrt();
    let excess = w.dot(self.returns) - self.riskfree_rate;

    Ok(sigma_w * (excess / (vol * variance)) - self.returns / vol)
  }
}

fn long_only(n: usize) -> Bounds {
  Bounds::uniform(n, 0.0, 1.0)
}

fn fully_invested(n: usize) -> Result<LinearConstraints> {
  LinearConstraints::new(n).with(Array1::ones(n), 1.0)
}

/// Minimum-volatility weights for one target return. Inputs must already be validated.
pub(crate) fn solve_minimize_volatility(
  solver: &ConstrainedSolver,
  target_return: f64,
  returns: &Array1<f64>,
  cov: &Array2<f64>,
) -> Result<Array1<f64>> {
  let n = returns.len();
  let constraints = fully_invested(n)?.with(returns.clone(), target_return)?;
  let report = solver.minimize(&VolatilityCost { cov }, equal_weights(n), &constraints, &long_only(n))?;

  debug!(
    target_return,
    iterations = report.iterations,
    volatility = report.cost,
    "minimum-volatility portfolio solved"
  );

  Ok(report.x)
}

pub(crate) fn solve_maximum_sharpe_ratio(
  solver: &ConstrainedSolver,
  riskfree_rate: f64,
  returns: &Array1<f64>,
  cov: &Array2<f64>,
) -> Result<Array1<f64>> {
  let n = returns.len();
  let cost = NegativeSharpeCost {
    returns,
    cov,
    riskfree_rate,
  };
  let report = solver.minimize(&cost, equal_weights(n), &fully_invested(n)?, &long_only(n))?;

  debug!(
    riskfree_rate,
    iterations = report.iterations,
    sharpe = -report.cost,
    "maximum-Sharpe portfolio solved"
  );

  Ok(report.x)
}

pub(crate) fn solve_optimal_weights(
  solver: &ConstrainedSolver,
  n_points: usize,
  returns: &Array1<f64>,
  cov: &Array2<f64>,
) -> Result<Vec<Array1<f64>>> {
  let lo = returns.iter().copied().fold(f64::INFINITY, f64::min);
  let hi = returns.iter().copied().fold(f64::NEG_INFINITY, f64::max);

  Array1::linspace(lo, hi, n_points)
    .to_vec()
    .into_par_iter()
    .map(|target| solve_minimize_volatility(solver, target, returns, cov))
    .collect()
}

/// Weights minimizing volatility subject to a target return.
pub fn minimize_volatility(
  target_return: f64,
  returns: &Array1<f64>,
  cov: &Array2<f64>,
) -> Result<Array1<f64>> {
  check_universe(returns, cov)?;
  solve_minimize_volatility(&ConstrainedSolver::default(), target_return, returns, cov)
}

/// Weights of the maximum Sharpe ratio portfolio.
pub fn maximum_sharpe_ratio(
  riskfree_rate: f64,
  returns: &Array1<f64>,
  cov: &Array2<f64>,
) -> Result<Array1<f64>> {
  check_universe(returns, cov)?;
  solve_maximum_sharpe_ratio(&ConstrainedSolver::default(), riskfree_rate, returns, cov)
}

/// Weights of the global minimum variance portfolio.
///
/// With identical expected returns and a zero risk-free rate the Sharpe
/// ratio only depends on volatility, so the maximum-Sharpe portfolio is the
/// minimum-variance one.
pub fn global_minimum_variance(cov: &Array2<f64>) -> Result<Array1<f64>> {
  check_covariance(cov)?;
  let ones = Array1::ones(cov.nrows());
  solve_maximum_sharpe_ratio(&ConstrainedSolver::default(), 0.0, &ones, cov)
}

/// Minimum-volatility weights at `n_points` evenly spaced target returns
/// from the smallest to the largest expected return.
pub fn optimal_weights(
  n_points: usize,
  returns: &Array1<f64>,
  cov: &Array2<f64>,
) -> Result<Vec<Array1<f64>>> {
  check_universe(returns, cov)?;
  solve_optimal_weights(&ConstrainedSolver::default(), n_points, returns, cov)
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;

  use super::*;
  use crate::portfolio::metrics::portfolio_return;

  fn two_assets() -> (Array1<f64>, Array2<f64>) {
    (array![0.1, 0.2], array![[0.04, 0.01], [0.01, 0.09]])
  }

  fn three_assets() -> (Array1<f64>, Array2<f64>) {
    (
      array![0.08, 0.1, 0.12],
      array![[0.04, 0.01, 0.0], [0.01, 0.09, 0.02], [0.0, 0.02, 0.16]],
    )
  }

  fn assert_long_only(w: &Array1<f64>) {
    assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-6);
    assert!(w.iter().all(|v| (0.0..=1.0).contains(v)), "{w}");
  }

  #[test]
  fn two_asset_regression_fixture() {
    let (er, cov) = two_assets();
    let w = minimize_volatility(0.15, &er, &cov).unwrap();

    assert_abs_diff_eq!(w, array![0.5, 0.5], epsilon = 1e-6);
  }

  #[test]
  fn two_asset_boundaries_hold_single_assets() {
    let (er, cov) = two_assets();

    let low = minimize_volatility(0.1, &er, &cov).unwrap();
    let high = minimize_volatility(0.2, &er, &cov).unwrap();

    assert_abs_diff_eq!(low, array![1.0, 0.0], epsilon = 1e-6);
    assert_abs_diff_eq!(high, array![0.0, 1.0], epsilon = 1e-6);
  }

  #[test]
  fn target_return_round_trips() {
    let (er, cov) = three_assets();

    for target in [0.08, 0.085, 0.093, 0.1, 0.107, 0.115, 0.12] {
      let w = minimize_volatility(target, &er, &cov).unwrap();
      assert_long_only(&w);
      assert_abs_diff_eq!(portfolio_return(&w, &er).unwrap(), target, epsilon = 1e-6);
    }
  }

  #[test]
  fn minimum_volatility_beats_other_weights_with_same_return() {
    let (er, cov) = three_assets();
    let target = 0.1;
    let w = minimize_volatility(target, &er, &cov).unwrap();
    let vol = portfolio_volatility(&w, &cov).unwrap();

    // Feasible set at r* = 0.1 is w = (a, 1 - 2a, a) for a in [0, 0.5].
    for i in 0..=500 {
      let a = i as f64 / 1000.0;
      let other = array![a, 1.0 - 2.0 * a, a];
      assert!(vol <= portfolio_volatility(&other, &cov).unwrap() + 1e-10);
    }
  }

  #[test]
  fn gmv_matches_closed_form_for_two_assets() {
    let (_, cov) = two_assets();
    let w = global_minimum_variance(&cov).unwrap();

    // (σ2² - σ12) / (σ1² + σ2² - 2σ12)
    assert_abs_diff_eq!(w, array![8.0 / 11.0, 3.0 / 11.0], epsilon = 1e-6);
  }

  #[test]
  fn gmv_is_not_beaten_on_a_dense_grid() {
    let (_, cov) = three_assets();
    let w = global_minimum_variance(&cov).unwrap();
    assert_long_only(&w);
    let vol = portfolio_volatility(&w, &cov).unwrap();

    let steps = 100;
    for i in 0..=steps {
      for j in 0..=(steps - i) {
        let a = i as f64 / steps as f64;
        let b = j as f64 / steps as f64;
        let other = array![a, b, 1.0 - a - b];
        assert!(vol <= portfolio_volatility(&other, &cov).unwrap() + 1e-10);
      }
    }
  }

  #[test]
  fn max_sharpe_matches_tangency_portfolio() {
    let (er, cov) = two_assets();
    let w = maximum_sharpe_ratio(0.05, &er, &cov).unwrap();

    // Σ⁻¹(μ - r_f) normalized: (6/17, 11/17).
    assert_abs_diff_eq!(w, array![6.0 / 17.0, 11.0 / 17.0], epsilon = 1e-5);
  }

  #[test]
  fn equal_returns_max_sharpe_is_gmv() {
    let (_, cov) = three_assets();
    let flat = array![0.1, 0.1, 0.1];

    let msr = maximum_sharpe_ratio(0.0, &flat, &cov).unwrap();
    let gmv = global_minimum_variance(&cov).unwrap();

    assert_abs_diff_eq!(msr, gmv, epsilon = 1e-5);
  }

  #[test]
  fn optimal_weights_sweep_in_order() {
    let (er, cov) = three_assets();
    let sweep = optimal_weights(5, &er, &cov).unwrap();

    assert_eq!(sweep.len(), 5);
    let targets = [0.08, 0.09, 0.1, 0.11, 0.12];
    for (w, target) in sweep.iter().zip(targets) {
      assert_long_only(w);
      assert_abs_diff_eq!(portfolio_return(w, &er).unwrap(), target, epsilon = 1e-6);
    }

    assert!(optimal_weights(0, &er, &cov).unwrap().is_empty());
    assert_eq!(optimal_weights(1, &er, &cov).unwrap().len(), 1);
  }

  #[test]
  fn infeasible_target_is_best_effort() {
    let (er, cov) = two_assets();
    let w = minimize_volatility(0.5, &er, &cov).unwrap();

    assert!(w.iter().all(|v| v.is_finite() && (0.0..=1.0).contains(v)));
  }

  #[test]
  fn malformed_inputs_fail_before_solving() {
    let (er, cov) = three_assets();

    assert!(minimize_volatility(0.1, &array![0.1, 0.2], &cov).is_err());
    assert!(maximum_sharpe_ratio(0.0, &er, &array![[0.04, 0.01], [0.01, 0.09]]).is_err());
    assert!(global_minimum_variance(&array![[0.04, 0.01, 0.0], [0.01, 0.09, 0.0]]).is_err());
    assert!(optimal_weights(3, &Array1::zeros(0), &Array2::zeros((0, 0))).is_err());
  }
}
