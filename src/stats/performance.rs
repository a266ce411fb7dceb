//! # Performance
//!
//! $$
//! R_{ann} = \Big(\prod_t (1+r_t)\Big)^{P/n} - 1,\qquad
//! \sigma_{ann} = \sigma\sqrt{P},\qquad
//! SR = \frac{R^{ex}_{ann}}{\sigma_{ann}}
//! $$
//!
//! Annualization helpers; `periods_per_year` is 12 for monthly data.

use super::observed;

/// Compounded annual growth rate of a return series.
pub fn annualize_rets(returns: &[f64], periods_per_year: f64) -> f64 {
  let sample = observed(returns);
  if sample.is_empty() {
    return f64::NAN;
  }

  let growth: f64 = sample.iter().map(|r| 1.0 + r).product();
  growth.powf(periods_per_year / sample.len() as f64) - 1.0
}

/// Annualized sample volatility (ddof = 1).
pub fn annualize_vol(returns: &[f64], periods_per_year: f64) -> f64 {
  let sample = observed(returns);
  if sample.len() < 2 {
    return f64::NAN;
  }

  sample.std(1.0) * periods_per_year.sqrt()
}

/// Annualized Sharpe ratio given an annual risk-free rate.
pub fn sharpe_ratio(returns: &[f64], riskfree_rate: f64, periods_per_year: f64) -> f64 {
  let rf_per_period = (1.0 + riskfree_rate).powf(1.0 / periods_per_year) - 1.0;
  let excess: Vec<f64> = returns.iter().map(|r| r - rf_per_period).collect();

  annualize_rets(&excess, periods_per_year) / annualize_vol(returns, periods_per_year)
}
