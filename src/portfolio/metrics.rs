//! # Portfolio Metrics
//!
//! $$
//! \mu_p = \mathbf{w}^\top \mu,\qquad \sigma_p = \sqrt{\mathbf{w}^\top \Sigma \mathbf{w}}
//! $$
//!
//! Return and volatility arithmetic plus the shape checks every optimizer
//! runs before touching the solver.

use anyhow::Result;
use anyhow::bail;
use anyhow::ensure;
use ndarray::Array1;
use ndarray::Array2;

/// Negative quadratic forms smaller than this are treated as round-off.
const ROUNDOFF: f64 = 1e-14;
const SYMMETRY_TOL: f64 = 1e-10;

/// Expected portfolio return `w · r`.
pub fn portfolio_return(weights: &Array1<f64>, returns: &Array1<f64>) -> Result<f64> {
  ensure!(
    weights.len() == returns.len(),
    "weights have length {} but returns have length {}",
    weights.len(),
    returns.len()
  );

  Ok(weights.dot(returns))
}

/// Portfolio volatility `sqrt(wᵀ Σ w)`.
///
/// Fails when the quadratic form is negative, i.e. `cov` is not positive
/// semi-definite.
pub fn portfolio_volatility(weights: &Array1<f64>, cov: &Array2<f64>) -> Result<f64> {
  ensure!(
    cov.is_square() && cov.nrows() == weights.len(),
    "covariance matrix is {}x{} but weights have length {}",
    cov.nrows(),
    cov.ncols(),
    weights.len()
  );

  let variance = weights.dot(&cov.dot(weights));
  if variance < 0.0 {
    if variance < -ROUNDOFF {
      bail!("portfolio variance is negative ({variance:e}); covariance matrix is not positive semi-definite");
    }
    return Ok(0.0);
  }

  Ok(variance.sqrt())
}

pub fn equal_weights(n: usize) -> Array1<f64> {
  Array1::from_elem(n, 1.0 / n as f64)
}

/// Square, finite, symmetric, with a non-negative diagonal.
pub(crate) fn check_covariance(cov: &Array2<f64>) -> Result<()> {
  ensure!(
    cov.is_square(),
    "covariance matrix must be square, got {}x{}",
    cov.nrows(),
    cov.ncols()
  );
  ensure!(cov.nrows() > 0, "covariance matrix is empty");
  ensure!(
    cov.iter().all(|v| v.is_finite()),
    "covariance matrix has non-finite entries"
  );

  let n = cov.nrows();
  for i in 0..n {
    ensure!(
      cov[[i, i]] >= 0.0,
      "covariance matrix has negative variance {} for asset {i}",
      cov[[i, i]]
    );
    for j in (i + 1)..n {
      let scale = cov[[i, j]].abs().max(cov[[j, i]].abs()).max(1.0);
      ensure!(
        (cov[[i, j]] - cov[[j, i]]).abs() <= SYMMETRY_TOL * scale,
        "covariance matrix is not symmetric at ({i}, {j})"
      );
    }
  }

  Ok(())
}

/// Expected returns and covariance describe the same non-empty universe.
pub(crate) fn check_universe(returns: &Array1<f64>, cov: &Array2<f64>) -> Result<()> {
  ensure!(!returns.is_empty(), "asset universe is empty");
  ensure!(
    returns.iter().all(|r| r.is_finite()),
    "expected returns must be finite"
  );
  check_covariance(cov)?;
  ensure!(
    cov.nrows() == returns.len(),
    "covariance matrix is {}x{} but there are {} expected returns",
    cov.nrows(),
    cov.ncols(),
    returns.len()
  );

  Ok(())
}
