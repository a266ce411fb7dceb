//! # Moments
//!
//! $$
//! S = \frac{\mathbb E[(R-\mu)^3]}{\sigma^3},\qquad K = \frac{\mathbb E[(R-\mu)^4]}{\sigma^4}
//! $$
//!
//! Population-moment shape statistics. Kurtosis is the raw fourth
//! standardized moment (a normal sample is close to 3), not excess kurtosis.

use ndarray_stats::SummaryStatisticsExt;

use super::observed;
use crate::data::ColumnSummary;
use crate::data::ReturnTable;

/// Skewness of a return series.
pub fn skewness(returns: &[f64]) -> f64 {
  observed(returns).skewness().unwrap_or(f64::NAN)
}

/// Kurtosis of a return series.
pub fn kurtosis(returns: &[f64]) -> f64 {
  observed(returns).kurtosis().unwrap_or(f64::NAN)
}

/// Population standard deviation of the negative returns only.
pub fn semi_deviation(returns: &[f64]) -> f64 {
  let negative: Vec<f64> = returns.iter().copied().filter(|&x| x < 0.0).collect();
  if negative.is_empty() {
    return f64::NAN;
  }

  observed(&negative).std(0.0)
}

pub fn skewness_table(table: &ReturnTable) -> ColumnSummary<f64> {
  table.aggregate(skewness)
}

pub fn kurtosis_table(table: &ReturnTable) -> ColumnSummary<f64> {
  table.aggregate(kurtosis)
}
