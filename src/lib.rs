//! # portfolio-risk
//!
//! $$
//! \min_{\mathbf{w}\ge 0,\ \mathbf{1}^\top\mathbf{w}=1} \mathbf{w}^\top\Sigma\mathbf{w}
//! $$
//!
//! Return datasets, risk statistics and long-only efficient-frontier
//! optimization.
//!
//! - [`data`]: CSV return tables indexed by month.
//! - [`stats`]: drawdown, moments, normality tests, VaR/CVaR, annualization.
//! - [`portfolio`]: constrained solver, optimizers and frontier construction.
//! - [`visualization`]: plotly charts for frontiers and drawdowns.

pub mod data;
pub mod portfolio;
pub mod stats;
pub mod visualization;
