//! # Drawdown
//!
//! $$
//! W_t = W_0\prod_{s\le t}(1+r_s),\qquad D_t = \frac{W_t - \max_{s\le t} W_s}{\max_{s\le t} W_s}
//! $$
//!

use ndarray::Array1;

/// Starting wealth of the drawdown wealth index.
pub const INITIAL_WEALTH: f64 = 1000.0;

/// Wealth index, running peaks and percentage drawdown of one return series.
#[derive(Clone, Debug)]
pub struct Drawdown {
  pub wealth: Array1<f64>,
  pub peaks: Array1<f64>,
  pub drawdown: Array1<f64>,
}

impl Drawdown {
  pub fn len(&self) -> usize {
    self.wealth.len()
  }

  pub fn is_empty(&self) -> bool {
    self.wealth.is_empty()
  }

  /// Deepest drawdown (a non-positive number), `NaN` for an empty series.
  pub fn max_drawdown(&self) -> f64 {
    self
      .drawdown
      .iter()
      .copied()
      .filter(|d| !d.is_nan())
      .reduce(f64::min)
      .unwrap_or(f64::NAN)
  }

  /// Position of the deepest drawdown.
  pub fn max_drawdown_index(&self) -> Option<usize> {
    self
      .drawdown
      .iter()
      .enumerate()
      .filter(|(_, d)| !d.is_nan())
      .min_by(|a, b| a.1.total_cmp(b.1))
      .map(|(i, _)| i)
  }
}

/// Drawdown of a return series. Missing returns stay `NaN` in every output
/// series and do not move the running product or peak.
pub fn drawdown(returns: &[f64]) -> Drawdown {
  let n = returns.len();
  let mut wealth = Array1::from_elem(n, f64::NAN);
  let mut peaks = Array1::from_elem(n, f64::NAN);
  let mut drawdown = Array1::from_elem(n, f64::NAN);

  let mut level = INITIAL_WEALTH;
  let mut peak = f64::NEG_INFINITY;
  for (t, &r) in returns.iter().enumerate() {
    if r.is_nan() {
      continue;
    }
    level *= 1.0 + r;
    peak = peak.max(level);
    wealth[t] = level;
    peaks[t] = peak;
    drawdown[t] = (level - peak) / peak;
  }

  Drawdown {
    wealth,
    peaks,
    drawdown,
  }
}
