//! # Normality
//!
//! $$
//! JB = \frac{n}{6}\left(S^2 + \frac{(K-3)^2}{4}\right) \sim \chi^2_2
//! $$
//!
//! Jarque-Bera test over return series and table columns.

use anyhow::Result;
use anyhow::ensure;
use statrs::distribution::ChiSquared;
use statrs::distribution::ContinuousCDF;

use super::observed;
use crate::data::ColumnSummary;
use crate::data::ReturnTable;

/// Default significance level for [`is_normal`].
pub const DEFAULT_NORMALITY_LEVEL: f64 = 0.01;

/// Result of the Jarque-Bera normality test.
#[derive(Debug, Clone, Copy)]
pub struct JarqueBeraResult {
  /// JB test statistic.
  pub statistic: f64,
  /// p-value under chi-square(2) asymptotics.
  pub p_value: f64,
  /// Sample skewness.
  pub skewness: f64,
  /// Sample excess kurtosis.
  pub excess_kurtosis: f64,
}

/// Jarque-Bera test for normality of a return series.
pub fn jarque_bera(returns: &[f64]) -> Result<JarqueBeraResult> {
  let sample = observed(returns);
  ensure!(
    sample.len() >= 2,
    "Jarque-Bera requires at least 2 observations, got {}",
    sample.len()
  );

  let n = sample.len() as f64;
  let mean = sample.sum() / n;

  let mut m2 = 0.0;
  let mut m3 = 0.0;
  let mut m4 = 0.0;
  for &x in sample.iter() {
    let d = x - mean;
    let d2 = d * d;
    m2 += d2;
    m3 += d2 * d;
    m4 += d2 * d2;
  }
  m2 /= n;
  m3 /= n;
  m4 /= n;

  if m2 <= 0.0 || !m2.is_finite() {
    return Ok(JarqueBeraResult {
      statistic: f64::INFINITY,
      p_value: 0.0,
      skewness: 0.0,
      excess_kurtosis: f64::INFINITY,
    });
  }

  let skewness = m3 / m2.powf(1.5);
  let excess_kurtosis = m4 / (m2 * m2) - 3.0;
  let statistic = (n / 6.0) * (skewness * skewness + 0.25 * excess_kurtosis * excess_kurtosis);

  let chi2 = ChiSquared::new(2.0)?;
  let p_value = (1.0 - chi2.cdf(statistic)).clamp(0.0, 1.0);

  Ok(JarqueBeraResult {
    statistic,
    p_value,
    skewness,
    excess_kurtosis,
  })
}

fn check_level(level: f64) -> Result<()> {
  ensure!(
    level > 0.0 && level < 1.0,
    "normality level must be in (0, 1), got {level}"
  );
  Ok(())
}

/// `true` when the Jarque-Bera test does not reject normality at `level`.
pub fn is_normal(returns: &[f64], level: f64) -> Result<bool> {
  check_level(level)?;
  Ok(jarque_bera(returns)?.p_value > level)
}

/// [`is_normal`] per column. Columns too short to test are reported as not normal.
pub fn is_normal_table(table: &ReturnTable, level: f64) -> Result<ColumnSummary<bool>> {
  check_level(level)?;
  Ok(table.aggregate(|col| jarque_bera(col).is_ok_and(|jb| jb.p_value > level)))
}
