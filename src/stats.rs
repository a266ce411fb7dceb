//! # Stats
//!
//! $$
//! \text{VaR}_\alpha = -\inf\{x : P(R \le x) > \alpha\}
//! $$
//!
//! Descriptive risk statistics for return series. Every statistic has a
//! series entry point over `&[f64]`; the ones commonly run over a whole
//! [`ReturnTable`](crate::data::ReturnTable) also get a `*_table` variant.
//! `NaN` observations are skipped.

use ndarray::Array1;

pub mod drawdown;
pub mod moments;
pub mod normality;
pub mod performance;
pub mod var;

pub use drawdown::Drawdown;
pub use drawdown::drawdown;
pub use moments::kurtosis;
pub use moments::kurtosis_table;
pub use moments::semi_deviation;
pub use moments::skewness;
pub use moments::skewness_table;
pub use normality::JarqueBeraResult;
pub use normality::is_normal;
pub use normality::is_normal_table;
pub use normality::jarque_bera;
pub use performance::annualize_rets;
pub use performance::annualize_vol;
pub use performance::sharpe_ratio;
pub use var::cvar_historic;
pub use var::cvar_historic_table;
pub use var::var_gaussian;
pub use var::var_gaussian_table;
pub use var::var_historic;
pub use var::var_historic_table;

/// Observations with missing values removed.
pub(crate) fn observed(returns: &[f64]) -> Array1<f64> {
  returns.iter().copied().filter(|x| !x.is_nan()).collect()
}
