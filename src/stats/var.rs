//! # Value-at-Risk
//!
//! $$
//! \text{VaR}^{CF}_\alpha = -(\mu + \tilde z_\alpha \sigma),\quad
//! \tilde z = z + \tfrac{(z^2-1)S}{6} + \tfrac{(z^3-3z)(K-3)}{24} - \tfrac{(2z^3-5z)S^2}{36}
//! $$
//!
//! Historic, parametric Gaussian and Cornish-Fisher VaR, plus historic CVaR.
//! Levels are percentages (`5.0` is the 5% tail). Results are reported as
//! positive losses.

use anyhow::Result;
use anyhow::ensure;
use ndarray::Array1;
use ndarray_stats::Quantile1dExt;
use ndarray_stats::interpolate::Linear;
use noisy_float::types::N64;
use noisy_float::types::n64;
use statrs::distribution::ContinuousCDF;
use statrs::distribution::Normal;

use super::moments::kurtosis;
use super::moments::skewness;
use super::observed;
use crate::data::ColumnSummary;
use crate::data::ReturnTable;

/// Default tail level, in percent.
pub const DEFAULT_VAR_LEVEL: f64 = 5.0;

fn check_level(level: f64) -> Result<()> {
  ensure!(
    level > 0.0 && level < 100.0,
    "VaR level must be a percentage in (0, 100), got {level}"
  );
  Ok(())
}

/// Historic VaR: the negated `level` percentile, linearly interpolated.
pub fn var_historic(returns: &[f64], level: f64) -> Result<f64> {
  check_level(level)?;

  let mut sample: Array1<N64> = observed(returns).mapv(n64);
  if sample.is_empty() {
    return Ok(f64::NAN);
  }

  let q = sample.quantile_mut(n64(level / 100.0), &Linear)?;
  Ok(-q.raw())
}

/// Historic CVaR: mean loss over returns at or beyond the historic VaR.
pub fn cvar_historic(returns: &[f64], level: f64) -> Result<f64> {
  let var = var_historic(returns, level)?;
  let tail = observed(returns)
    .iter()
    .copied()
    .filter(|&x| x <= -var)
    .collect::<Array1<f64>>();

  Ok(tail.mean().map_or(f64::NAN, |m| -m))
}

/// Parametric Gaussian VaR; `modified` applies the Cornish-Fisher expansion.
pub fn var_gaussian(returns: &[f64], level: f64, modified: bool) -> Result<f64> {
  check_level(level)?;

  let sample = observed(returns);
  let Some(mean) = sample.mean() else {
    return Ok(f64::NAN);
  };
  let sigma = sample.std(0.0);

  let mut z = Normal::new(0.0, 1.0)?.inverse_cdf(level / 100.0);
  if modified {
    let s = skewness(returns);
    let k = kurtosis(returns);
    z = z + (z.powi(2) - 1.0) * s / 6.0 + (z.powi(3) - 3.0 * z) * (k - 3.0) / 24.0
      - (2.0 * z.powi(3) - 5.0 * z) * s.powi(2) / 36.0;
  }

  Ok(-(mean + z * sigma))
}

pub fn var_historic_table(table: &ReturnTable, level: f64) -> Result<ColumnSummary<f64>> {
  table.try_aggregate(|col| var_historic(col, level))
}

pub fn cvar_historic_table(table: &ReturnTable, level: f64) -> Result<ColumnSummary<f64>> {
  table.try_aggregate(|col| cvar_historic(col, level))
}

pub fn var_gaussian_table(
  table: &ReturnTable,
  level: f64,
  modified: bool,
) -> Result<ColumnSummary<f64>> {
  table.try_aggregate(|col| var_gaussian(col, level, modified))
}
