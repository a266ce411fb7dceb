//! # Portfolio
//!
//! $$
//! \sigma_p^2 = \mathbf{w}^\top \Sigma \mathbf{w}
//! $$
//!
//! Long-only mean-variance optimization: minimum-volatility portfolios for a
//! target return, the maximum Sharpe ratio and global minimum variance
//! portfolios, and efficient frontiers built from them.

pub mod engine;
pub mod frontier;
pub mod metrics;
pub mod optimizers;
pub mod solver;
pub mod types;

pub use engine::FrontierEngine;
pub use frontier::compute_frontier;
pub use frontier::two_asset_frontier;
pub use metrics::equal_weights;
pub use metrics::portfolio_return;
pub use metrics::portfolio_volatility;
pub use optimizers::NegativeSharpeCost;
pub use optimizers::VolatilityCost;
pub use optimizers::global_minimum_variance;
pub use optimizers::maximum_sharpe_ratio;
pub use optimizers::minimize_volatility;
pub use optimizers::optimal_weights;
pub use solver::Bounds;
pub use solver::ConstrainedSolver;
pub use solver::LinearConstraints;
pub use solver::SolverConfig;
pub use solver::SolverReport;
pub use types::CapitalMarketLine;
pub use types::Frontier;
pub use types::FrontierConfig;
pub use types::PortfolioPoint;
