//! # Constrained Solver
//!
//! $$
//! \mathcal L_\rho(x,\lambda) = f(x) + \lambda^\top (Ax-b) + \tfrac{\rho}{2}\lVert Ax-b\rVert^2,
//! \qquad l \le x \le u
//! $$
//!
//! Augmented-Lagrangian method for smooth objectives under linear equality
//! constraints and box bounds. Each outer iteration minimizes the augmented
//! Lagrangian over the box with a non-monotone spectral projected gradient
//! (Barzilai-Borwein steps, Armijo backtracking), then updates the
//! multipliers and, if the violation did not shrink enough, the penalty.
//!
//! Objectives are anything implementing argmin's [`CostFunction`] and
//! [`Gradient`] over `Array1<f64>`.

use std::collections::VecDeque;

use anyhow::Result;
use anyhow::ensure;
use argmin::core::CostFunction;
use argmin::core::Gradient;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::Zip;
use tracing::debug;
use tracing::warn;

const ARMIJO: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 60;
const STEP_MIN: f64 = 1e-12;
const STEP_MAX: f64 = 1e12;
const MULTIPLIER_MAX: f64 = 1e12;
/// Required relative drop of the violation between outer iterations.
const VIOLATION_DECAY: f64 = 0.25;

/// Iteration budget and tolerances for [`ConstrainedSolver`].
#[derive(Clone, Debug)]
pub struct SolverConfig {
  /// Multiplier updates before giving up.
  pub max_outer_iters: usize,
  /// Projected-gradient steps per subproblem.
  pub max_inner_iters: usize,
  /// Largest accepted equality residual (after row scaling).
  pub feasibility_tol: f64,
  /// Residual accepted once the penalty is capped and the residual stopped shrinking.
  pub stalled_feasibility_tol: f64,
  /// Largest accepted projected-gradient norm.
  pub optimality_tol: f64,
  pub initial_penalty: f64,
  pub penalty_growth: f64,
  pub max_penalty: f64,
  /// Window of the non-monotone line search.
  pub memory: usize,
}

impl Default for SolverConfig {
  fn default() -> Self {
    Self {
      max_outer_iters: 100,
      max_inner_iters: 10_000,
      feasibility_tol: 1e-10,
      stalled_feasibility_tol: 1e-8,
      optimality_tol: 1e-9,
      initial_penalty: 10.0,
      penalty_growth: 10.0,
      max_penalty: 1e10,
      memory: 10,
    }
  }
}

/// Equality constraints `A x = b`, one row at a time.
#[derive(Clone, Debug)]
pub struct LinearConstraints {
  dim: usize,
  rows: Vec<Array1<f64>>,
  rhs: Vec<f64>,
}

impl LinearConstraints {
  pub fn new(dim: usize) -> Self {
    Self {
      dim,
      rows: Vec::new(),
      rhs: Vec::new(),
    }
  }

  /// Add the constraint `row · x = rhs`.
  pub fn with(mut self, row: Array1<f64>, rhs: f64) -> Result<Self> {
    ensure!(
      row.len() == self.dim,
      "constraint row has length {} but the problem has {} variables",
      row.len(),
      self.dim
    );
    self.rows.push(row);
    self.rhs.push(rhs);
    Ok(self)
  }

  pub fn dim(&self) -> usize {
    self.dim
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  /// `A x - b` in the caller's units.
  pub fn residual(&self, x: &Array1<f64>) -> Array1<f64> {
    self
      .rows
      .iter()
      .zip(self.rhs.iter())
      .map(|(row, b)| row.dot(x) - b)
      .collect()
  }

  /// Constraint matrix with every row divided by its largest coefficient.
  fn scaled(&self) -> (Array2<f64>, Array1<f64>) {
    let mut a = Array2::zeros((self.rows.len(), self.dim));
    let mut b = Array1::zeros(self.rows.len());

    for (i, (row, &rhs)) in self.rows.iter().zip(self.rhs.iter()).enumerate() {
      let scale = row.iter().fold(0.0f64, |m, v| m.max(v.abs()));
      let scale = if scale > 0.0 { scale } else { 1.0 };
      a.row_mut(i).assign(&(row / scale));
      b[i] = rhs / scale;
    }

    (a, b)
  }
}

/// Box bounds `lower <= x <= upper`.
#[derive(Clone, Debug)]
pub struct Bounds {
  lower: Array1<f64>,
  upper: Array1<f64>,
}

impl Bounds {
  pub fn new(lower: Array1<f64>, upper: Array1<f64>) -> Result<Self> {
    ensure!(
      lower.len() == upper.len(),
      "lower bounds have length {} but upper bounds have length {}",
      lower.len(),
      upper.len()
    );
    ensure!(
      Zip::from(&lower).and(&upper).all(|l, u| l <= u),
      "every lower bound must not exceed its upper bound"
    );

    Ok(Self { lower, upper })
  }

  /// Same interval for every variable.
  pub fn uniform(dim: usize, lower: f64, upper: f64) -> Self {
    Self {
      lower: Array1::from_elem(dim, lower),
      upper: Array1::from_elem(dim, upper),
    }
  }

  pub fn dim(&self) -> usize {
    self.lower.len()
  }

  /// Clamp `x` into the box. `NaN` entries stay `NaN`.
  pub fn project(&self, x: &Array1<f64>) -> Array1<f64> {
    Zip::from(x)
      .and(&self.lower)
      .and(&self.upper)
      .map_collect(|&v, &l, &u| v.clamp(l, u))
  }
}

/// Outcome of [`ConstrainedSolver::minimize`].
#[derive(Clone, Debug)]
pub struct SolverReport {
  /// Last iterate; always inside the bounds.
  pub x: Array1<f64>,
  /// Objective value at `x`.
  pub cost: f64,
  /// Largest scaled equality residual at `x`.
  pub max_violation: f64,
  /// Total projected-gradient steps.
  pub iterations: usize,
  pub converged: bool,
}

struct AugmentedLagrangian<'a, O> {
  problem: &'a O,
  a: &'a Array2<f64>,
  b: &'a Array1<f64>,
  multipliers: Array1<f64>,
  penalty: f64,
}

impl<O> CostFunction for AugmentedLagrangian<'_, O>
where
  O: CostFunction<Param = Array1<f64>, Output = f64>,
{
  type Param = Array1<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
    let c = self.a.dot(x) - self.b;
    Ok(self.problem.cost(x)? + self.multipliers.dot(&c) + 0.5 * self.penalty * c.dot(&c))
  }
}

impl<O> Gradient for AugmentedLagrangian<'_, O>
where
  O: Gradient<Param = Array1<f64>, Gradient = Array1<f64>>,
{
  type Param = Array1<f64>;
  type Gradient = Array1<f64>;

  fn gradient(&self, x: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
    let c = self.a.dot(x) - self.b;
    let pull = &self.multipliers + &(self.penalty * &c);
    Ok(self.problem.gradient(x)? + self.a.t().dot(&pull))
  }
}

struct Subproblem {
  x: Array1<f64>,
  iterations: usize,
  stationarity: f64,
}

/// Largest absolute entry; `NaN` if any entry is `NaN`.
fn max_abs(v: &Array1<f64>) -> f64 {
  v.iter().fold(0.0, |m: f64, x| {
    if x.is_nan() || x.abs() > m {
      x.abs()
    } else {
      m
    }
  })
}

/// `|P(x - g) - x|_inf`, zero exactly at a box-constrained stationary point.
fn projected_gradient_norm(x: &Array1<f64>, g: &Array1<f64>, bounds: &Bounds) -> f64 {
  max_abs(&(bounds.project(&(x - g)) - x))
}

/// Augmented-Lagrangian solver for linear equalities and box bounds.
#[derive(Clone, Debug, Default)]
pub struct ConstrainedSolver {
  config: SolverConfig,
}

impl ConstrainedSolver {
  pub fn new(config: SolverConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &SolverConfig {
    &self.config
  }

  /// Minimize `problem` from `x0`. Running out of iterations, or a violation
  /// that stays above `stalled_feasibility_tol` at the penalty cap, is not an
  /// error: the last iterate is returned with `converged == false`.
  pub fn minimize<O>(
    &self,
    problem: &O,
    x0: Array1<f64>,
    constraints: &LinearConstraints,
    bounds: &Bounds,
  ) -> Result<SolverReport>
  where
    O: CostFunction<Param = Array1<f64>, Output = f64>
      + Gradient<Param = Array1<f64>, Gradient = Array1<f64>>,
  {
    ensure!(
      x0.len() == bounds.dim(),
      "initial guess has length {} but bounds have length {}",
      x0.len(),
      bounds.dim()
    );
    ensure!(
      constraints.dim() == bounds.dim(),
      "constraints have {} variables but bounds have {}",
      constraints.dim(),
      bounds.dim()
    );

    let (a, b) = constraints.scaled();
    let mut lagrangian = AugmentedLagrangian {
      problem,
      a: &a,
      b: &b,
      multipliers: Array1::zeros(a.nrows()),
      penalty: self.config.initial_penalty,
    };

    let mut x = bounds.project(&x0);
    let mut iterations = 0;
    let mut converged = false;
    let mut violation = max_abs(&(a.dot(&x) - &b));
    let mut previous_violation = f64::INFINITY;

    for _ in 0..self.config.max_outer_iters {
      let sub = self.projected_gradient(&lagrangian, x, bounds)?;
      x = sub.x;
      iterations += sub.iterations;

      let c = a.dot(&x) - &b;
      violation = max_abs(&c);
      if violation <= self.config.feasibility_tol && sub.stationarity <= self.config.optimality_tol {
        converged = true;
        break;
      }

      // NaN never counts as shrinking.
      let shrinking = violation <= VIOLATION_DECAY * previous_violation;
      if !shrinking && lagrangian.penalty >= self.config.max_penalty {
        converged = violation <= self.config.stalled_feasibility_tol;
        debug!(violation, converged, "violation stalled at the penalty cap");
        break;
      }

      lagrangian.multipliers = (&lagrangian.multipliers + &(lagrangian.penalty * &c))
        .mapv(|m| m.clamp(-MULTIPLIER_MAX, MULTIPLIER_MAX));
      if !shrinking {
        lagrangian.penalty = (lagrangian.penalty * self.config.penalty_growth).min(self.config.max_penalty);
      }
      previous_violation = violation;
    }

    let cost = problem.cost(&x)?;
    if converged {
      debug!(iterations, violation, cost, "constrained solve converged");
    } else {
      warn!(
        iterations,
        violation, cost, "constrained solve stopped before converging"
      );
    }

    Ok(SolverReport {
      x,
      cost,
      max_violation: violation,
      iterations,
      converged,
    })
  }

  /// Non-monotone spectral projected gradient over the box.
  fn projected_gradient<L>(&self, objective: &L, x0: Array1<f64>, bounds: &Bounds) -> Result<Subproblem>
  where
    L: CostFunction<Param = Array1<f64>, Output = f64>
      + Gradient<Param = Array1<f64>, Gradient = Array1<f64>>,
  {
    let memory = self.config.memory.max(1);
    let mut x = bounds.project(&x0);
    let mut g = objective.gradient(&x)?;
    let mut history = VecDeque::with_capacity(memory);
    history.push_back(objective.cost(&x)?);

    let mut stationarity = projected_gradient_norm(&x, &g, bounds);
    let mut step = if stationarity > 0.0 {
      (1.0 / stationarity).clamp(STEP_MIN, STEP_MAX)
    } else {
      1.0
    };
    let mut iterations = 0;

    while iterations < self.config.max_inner_iters && stationarity > self.config.optimality_tol {
      iterations += 1;

      let direction = bounds.project(&(&x - &(step * &g))) - &x;
      let slope = g.dot(&direction);
      let reference = history.iter().copied().fold(f64::NEG_INFINITY, f64::max);

      let mut t = 1.0;
      let mut accepted = None;
      for _ in 0..MAX_BACKTRACKS {
        let trial = &x + &(t * &direction);
        let value = objective.cost(&trial)?;
        if value <= reference + ARMIJO * t * slope {
          accepted = Some((trial, value));
          break;
        }
        t *= 0.5;
      }

      // No descent left at machine precision.
      let Some((next, value)) = accepted else {
        break;
      };

      let g_next = objective.gradient(&next)?;
      let s = &next - &x;
      let y = &g_next - &g;
      let sy = s.dot(&y);
      step = if sy > 0.0 {
        (s.dot(&s) / sy).clamp(STEP_MIN, STEP_MAX)
      } else {
        STEP_MAX
      };

      x = next;
      g = g_next;
      if history.len() == memory {
        history.pop_front();
      }
      history.push_back(value);
      stationarity = projected_gradient_norm(&x, &g, bounds);
    }

    Ok(Subproblem {
      x,
      iterations,
      stationarity,
    })
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;
  use tracing_test::traced_test;

  use super::*;
  use crate::portfolio::optimizers::VolatilityCost;

  /// Two-asset volatility problem with the target-return row `[0.1, 0.2]`.
  fn two_asset_report(target: f64, config: SolverConfig) -> SolverReport {
    let cov = array![[0.04, 0.01], [0.01, 0.09]];
    let constraints = LinearConstraints::new(2)
      .with(Array1::ones(2), 1.0)
      .unwrap()
      .with(array![0.1, 0.2], target)
      .unwrap();

    ConstrainedSolver::new(config)
      .minimize(
        &VolatilityCost { cov: &cov },
        array![0.5, 0.5],
        &constraints,
        &Bounds::uniform(2, 0.0, 1.0),
      )
      .unwrap()
  }

  /// `|x - c|^2`
  struct Distance {
    center: Array1<f64>,
  }

  impl CostFunction for Distance {
    type Param = Array1<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
      let d = x - &self.center;
      Ok(d.dot(&d))
    }
  }

  impl Gradient for Distance {
    type Param = Array1<f64>;
    type Gradient = Array1<f64>;

    fn gradient(&self, x: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
      Ok(2.0 * (x - &self.center))
    }
  }

  #[test]
  fn projects_onto_simplex() {
    // Euclidean projection of (0.8, 0.6, -0.4) onto the probability simplex is (0.6, 0.4, 0).
    let problem = Distance {
      center: array![0.8, 0.6, -0.4],
    };
    let constraints = LinearConstraints::new(3)
      .with(Array1::ones(3), 1.0)
      .unwrap();
    let bounds = Bounds::uniform(3, 0.0, 1.0);

    let report = ConstrainedSolver::default()
      .minimize(&problem, Array1::from_elem(3, 1.0 / 3.0), &constraints, &bounds)
      .unwrap();

    assert!(report.converged);
    assert_abs_diff_eq!(report.x, array![0.6, 0.4, 0.0], epsilon = 1e-8);
  }

  #[test]
  fn bounds_only_problem_clamps() {
    let problem = Distance {
      center: array![2.0, -1.0],
    };
    let report = ConstrainedSolver::default()
      .minimize(
        &problem,
        array![0.5, 0.5],
        &LinearConstraints::new(2),
        &Bounds::uniform(2, 0.0, 1.0),
      )
      .unwrap();

    assert!(report.converged);
    assert_eq!(report.x, array![1.0, 0.0]);
  }

  #[test]
  fn residual_is_reported_unscaled() {
    let constraints = LinearConstraints::new(2)
      .with(array![0.1, 0.2], 0.15)
      .unwrap();
    let r = constraints.residual(&array![1.0, 1.0]);
    assert_abs_diff_eq!(r[0], 0.15, epsilon = 1e-15);
  }

  #[test]
  fn mismatched_shapes_fail_fast() {
    assert!(LinearConstraints::new(2).with(array![1.0], 1.0).is_err());
    assert!(Bounds::new(array![0.0, 1.0], array![1.0, 0.0]).is_err());

    let problem = Distance {
      center: array![0.0, 0.0],
    };
    let err = ConstrainedSolver::default().minimize(
      &problem,
      array![0.0, 0.0, 0.0],
      &LinearConstraints::new(2),
      &Bounds::uniform(2, 0.0, 1.0),
    );
    assert!(err.is_err());
  }

  #[traced_test]
  #[test]
  fn incompatible_constraints_return_best_effort() {
    let problem = Distance {
      center: array![0.5, 0.5],
    };
    let constraints = LinearConstraints::new(2)
      .with(array![1.0, 1.0], 1.0)
      .unwrap()
      .with(array![1.0, 1.0], 2.0)
      .unwrap();
    let solver = ConstrainedSolver::new(SolverConfig {
      max_outer_iters: 15,
      max_inner_iters: 500,
      ..SolverConfig::default()
    });

    let report = solver
      .minimize(&problem, array![0.5, 0.5], &constraints, &Bounds::uniform(2, 0.0, 1.0))
      .unwrap();

    assert!(!report.converged);
    assert!(report.x.iter().all(|v| (0.0..=1.0).contains(v)));
    assert!(logs_contain("stopped before converging"));
  }

  #[test]
  fn boundary_targets_converge() {
    let low = two_asset_report(0.1, SolverConfig::default());
    let high = two_asset_report(0.2, SolverConfig::default());

    assert!(low.converged, "violation {}", low.max_violation);
    assert!(high.converged, "violation {}", high.max_violation);
    assert_abs_diff_eq!(low.x, array![1.0, 0.0], epsilon = 1e-6);
    assert_abs_diff_eq!(high.x, array![0.0, 1.0], epsilon = 1e-6);
  }

  #[traced_test]
  #[test]
  fn infeasible_target_stops_at_penalty_cap() {
    let config = SolverConfig {
      max_inner_iters: 2_000,
      ..SolverConfig::default()
    };
    let report = two_asset_report(0.5, config);

    assert!(!report.converged);
    assert!(report.max_violation > 0.1);
    assert!(report.iterations < 20 * 2_000, "{} iterations", report.iterations);
    assert!(report.x.iter().all(|v| (0.0..=1.0).contains(v)));
    assert!(logs_contain("violation stalled at the penalty cap"));
  }
}
