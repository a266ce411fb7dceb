//! # Efficient Frontier
//!
//! $$
//! \sigma^\*(r^\*) = \min\{\sigma_p(\mathbf{w}) : \mu^\top\mathbf{w}=r^\*,\ \mathbf{1}^\top\mathbf{w}=1,\ \mathbf{w}\ge 0\}
//! $$
//!
//! Frontier sweeps with optional capital-market line, equal-weight and
//! global-minimum-variance markers.

use anyhow::Result;
use anyhow::ensure;
use ndarray::Array1;
use ndarray::Array2;
use tracing::info;

use super::metrics::check_universe;
use super::metrics::equal_weights;
use super::optimizers::solve_maximum_sharpe_ratio;
use super::optimizers::solve_optimal_weights;
use super::solver::ConstrainedSolver;
use super::types::CapitalMarketLine;
use super::types::Frontier;
use super::types::FrontierConfig;
use super::types::PortfolioPoint;

pub(crate) fn solve_frontier(
  solver: &ConstrainedSolver,
  returns: &Array1<f64>,
  cov: &Array2<f64>,
  config: &FrontierConfig,
) -> Result<Frontier> {
  check_universe(returns, cov)?;

  let points = solve_optimal_weights(solver, config.n_points, returns, cov)?
    .into_iter()
    .map(|w| PortfolioPoint::evaluate(w, returns, cov))
    .collect::<Result<Vec<_>>>()?;

  let capital_market_line = if config.show_cml {
    let w = solve_maximum_sharpe_ratio(solver, config.riskfree_rate, returns, cov)?;
    let tangency = PortfolioPoint::evaluate(w, returns, cov)?;
    Some(CapitalMarketLine::new(config.riskfree_rate, tangency))
  } else {
    None
  };

  let equal_weight = if config.show_ew {
    Some(PortfolioPoint::evaluate(equal_weights(returns.len()), returns, cov)?)
  } else {
    None
  };

  let global_minimum_variance = if config.show_gmv {
    let w = solve_maximum_sharpe_ratio(solver, 0.0, &Array1::ones(returns.len()), cov)?;
    Some(PortfolioPoint::evaluate(w, returns, cov)?)
  } else {
    None
  };

  info!(
    assets = returns.len(),
    points = points.len(),
    cml = config.show_cml,
    ew = config.show_ew,
    gmv = config.show_gmv,
    "efficient frontier computed"
  );

  Ok(Frontier {
    points,
    capital_market_line,
    equal_weight,
    global_minimum_variance,
  })
}

pub(crate) fn solve_two_asset_frontier(
  n_points: usize,
  returns: &Array1<f64>,
  cov: &Array2<f64>,
) -> Result<Vec<PortfolioPoint>> {
  ensure!(
    returns.len() == 2,
    "two-asset frontier needs exactly 2 assets, got {}",
    returns.len()
  );
  check_universe(returns, cov)?;

  Array1::linspace(0.0, 1.0, n_points)
    .iter()
    .map(|&a| PortfolioPoint::evaluate(Array1::from(vec![a, 1.0 - a]), returns, cov))
    .collect()
}

/// Minimum-volatility frontier traced at `config.n_points` target returns,
/// plus the markers switched on in `config`.
pub fn compute_frontier(
  returns: &Array1<f64>,
  cov: &Array2<f64>,
  config: &FrontierConfig,
) -> Result<Frontier> {
  solve_frontier(&ConstrainedSolver::default(), returns, cov, config)
}

/// Frontier of every `(a, 1 - a)` mix of two assets, `a` from 0 to 1.
pub fn two_asset_frontier(
  n_points: usize,
  returns: &Array1<f64>,
  cov: &Array2<f64>,
) -> Result<Vec<PortfolioPoint>> {
  solve_two_asset_frontier(n_points, returns, cov)
}
