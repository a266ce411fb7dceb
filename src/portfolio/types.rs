//! # Portfolio Types
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}} \frac{\mathbb E[R_p]-r_f}{\sigma_p}
//! $$
//!
//! Portfolio points, frontier containers and frontier configuration.

use anyhow::Result;
use impl_new_derive::ImplNew;
use ndarray::Array1;
use ndarray::Array2;

use super::metrics::portfolio_return;
use super::metrics::portfolio_volatility;

/// A weight vector with its realized return and volatility.
#[derive(ImplNew, Clone, Debug, PartialEq)]
pub struct PortfolioPoint {
  pub weights: Array1<f64>,
  pub expected_return: f64,
  pub volatility: f64,
}

impl PortfolioPoint {
  /// Price `weights` against expected returns and covariance.
  pub fn evaluate(weights: Array1<f64>, returns: &Array1<f64>, cov: &Array2<f64>) -> Result<Self> {
    let expected_return = portfolio_return(&weights, returns)?;
    let volatility = portfolio_volatility(&weights, cov)?;

    Ok(Self {
      weights,
      expected_return,
      volatility,
    })
  }

  /// `(expected_return - riskfree_rate) / volatility`; not finite at zero volatility.
  pub fn sharpe(&self, riskfree_rate: f64) -> f64 {
    (self.expected_return - riskfree_rate) / self.volatility
  }
}

/// Line from the risk-free asset to the maximum-Sharpe portfolio.
#[derive(ImplNew, Clone, Debug)]
pub struct CapitalMarketLine {
  pub riskfree_rate: f64,
  pub tangency: PortfolioPoint,
}

impl CapitalMarketLine {
  /// `(volatility, return)` at both ends of the line.
  pub fn endpoints(&self) -> [(f64, f64); 2] {
    [
      (0.0, self.riskfree_rate),
      (self.tangency.volatility, self.tangency.expected_return),
    ]
  }

  pub fn slope(&self) -> f64 {
    self.tangency.sharpe(self.riskfree_rate)
  }
}

/// Efficient frontier plus the optional markers requested in [`FrontierConfig`].
#[derive(Clone, Debug, Default)]
pub struct Frontier {
  /// Minimum-volatility portfolios, ordered by target return.
  pub points: Vec<PortfolioPoint>,
  pub capital_market_line: Option<CapitalMarketLine>,
  pub equal_weight: Option<PortfolioPoint>,
  pub global_minimum_variance: Option<PortfolioPoint>,
}

impl Frontier {
  pub fn len(&self) -> usize {
    self.points.len()
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  pub fn returns(&self) -> Vec<f64> {
    self.points.iter().map(|p| p.expected_return).collect()
  }

  pub fn volatilities(&self) -> Vec<f64> {
    self.points.iter().map(|p| p.volatility).collect()
  }
}

/// What [`compute_frontier`](super::compute_frontier) traces.
#[derive(Clone, Debug)]
pub struct FrontierConfig {
  /// Number of target returns between the smallest and largest expected return.
  pub n_points: usize,
  /// Risk-free rate of the capital-market line.
  pub riskfree_rate: f64,
  /// Add the capital-market line.
  pub show_cml: bool,
  /// Add the equal-weight portfolio.
  pub show_ew: bool,
  /// Add the global-minimum-variance portfolio.
  pub show_gmv: bool,
}

impl Default for FrontierConfig {
  fn default() -> Self {
    Self {
      n_points: 20,
      riskfree_rate: 0.0,
      show_cml: false,
      show_ew: false,
      show_gmv: false,
    }
  }
}
