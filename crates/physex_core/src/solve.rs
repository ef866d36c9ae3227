use crate::autodiff::Dual;
use crate::bytecode::{Bytecode, Compiler, VM};
use crate::symbolic::Expr;
use anyhow::{anyhow, bail, Context, Result};
use log::{debug, warn};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fmt;

const SNAP_TOLERANCE: f64 = 1e-6;
const VERIFY_TOLERANCE: f64 = 1e-6;
/// Largest relative step still counted as converged. Stops runaway
/// iterates whose residual decays only because a parameter diverges.
const STEP_TOLERANCE: f64 = 1e-6;
const SVD_EPS: f64 = 1e-12;
const PRIMES: [u32; 8] = [2, 3, 5, 7, 11, 13, 17, 19];

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SolveSettings {
    pub max_steps: usize,
    pub damping: f64,
    pub tolerance: f64,
    /// Initial guesses cover `[guess_min, guess_max]` on every unknown.
    pub guess_min: f64,
    pub guess_max: f64,
    pub guess_samples: usize,
    /// Number of points in free-variable space where the residual is sampled.
    pub sample_count: usize,
}

impl Default for SolveSettings {
    fn default() -> Self {
        Self {
            max_steps: 50,
            damping: 1.0,
            tolerance: 1e-10,
            guess_min: -2.0,
            guess_max: 2.0,
            guess_samples: 9,
            sample_count: 8,
        }
    }
}

/// One assignment of the unknowns, in the order they were requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub values: Vec<f64>,
    pub residual_norm: f64,
    pub iterations: usize,
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, ")")
    }
}

/// Finds every assignment of `unknowns` for which `expr` vanishes for all
/// values of `free_vars`.
///
/// The identity is enforced at a fixed set of sample points and each
/// candidate is re-checked at a second, disjoint set. Roots are found by a
/// damped Gauss–Newton iteration from a grid of starts; the result is
/// deduplicated and sorted. No root is an empty vector, not an error.
///
/// The search is local. Starts cover `[guess_min, guess_max]` on every
/// unknown (`[-2, 2]` by default), so an empty vector means no root was
/// reached from that box. Widen the range before reading it as proof that
/// no root exists.
pub fn solve_parameters(
    expr: &Expr,
    unknowns: &[&str],
    free_vars: &[&str],
    settings: SolveSettings,
) -> Result<Vec<Solution>> {
    if unknowns.is_empty() {
        bail!("At least one unknown is required.");
    }
    if free_vars.len() > PRIMES.len() {
        bail!(
            "At most {} free variables are supported, got {}.",
            PRIMES.len(),
            free_vars.len()
        );
    }
    if settings.max_steps == 0 {
        bail!("max_steps must be greater than zero.");
    }
    if settings.damping <= 0.0 {
        bail!("damping must be positive.");
    }
    if settings.tolerance <= 0.0 {
        bail!("tolerance must be positive.");
    }
    if settings.guess_samples == 0 || settings.guess_max < settings.guess_min {
        bail!("The initial guess range is empty.");
    }
    if settings.sample_count < unknowns.len() {
        bail!(
            "sample_count ({}) must be at least the number of unknowns ({}).",
            settings.sample_count,
            unknowns.len()
        );
    }

    let bytecode = Compiler::new(free_vars, unknowns)
        .compile(expr)
        .context("Failed to compile the residual expression.")?;
    let problem = Problem {
        bytecode,
        samples: halton_points(free_vars.len(), 0, settings.sample_count),
        checks: halton_points(free_vars.len(), settings.sample_count, settings.sample_count),
    };

    let mut solutions: Vec<Solution> = Vec::new();
    let starts = guess_grid(unknowns.len(), &settings);
    debug!(
        "Solving for {:?} with {} starts and {} sample points",
        unknowns,
        starts.len(),
        settings.sample_count
    );

    for start in starts {
        let Some(mut solution) = problem.gauss_newton(start, &settings) else {
            continue;
        };
        snap(&mut solution.values);
        if !problem.verify(&solution.values) {
            debug!("Discarding {solution}: fails at check points");
            continue;
        }
        if solutions.iter().any(|s| same_point(&s.values, &solution.values)) {
            continue;
        }
        solutions.push(solution);
    }

    solutions.sort_by(|a, b| {
        a.values
            .iter()
            .zip(&b.values)
            .map(|(x, y)| x.total_cmp(y))
            .find(|o| o.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    debug!("Found {} solution(s)", solutions.len());
    Ok(solutions)
}

struct Problem {
    bytecode: Bytecode,
    samples: Vec<Vec<f64>>,
    checks: Vec<Vec<f64>>,
}

impl Problem {
    fn residual(&self, points: &[Vec<f64>], params: &[f64]) -> Vec<f64> {
        let mut stack = Vec::with_capacity(64);
        points
            .iter()
            .map(|point| VM::execute(&self.bytecode, point, params, &mut stack))
            .collect()
    }

    /// Jacobian of the residual with respect to the parameters, row-major
    /// `(sample, parameter)`.
    fn jacobian(&self, params: &[f64]) -> DMatrix<f64> {
        let rows = self.samples.len();
        let cols = params.len();
        let mut jacobian = DMatrix::zeros(rows, cols);
        let mut stack = Vec::with_capacity(64);
        let dual_points: Vec<Vec<Dual>> = self
            .samples
            .iter()
            .map(|p| p.iter().map(|&v| Dual::constant(v)).collect())
            .collect();
        for j in 0..cols {
            let dual_params = Dual::seed(params, j);
            for (i, point) in dual_points.iter().enumerate() {
                jacobian[(i, j)] = VM::execute(&self.bytecode, point, &dual_params, &mut stack).eps;
            }
        }
        jacobian
    }

    fn gauss_newton(&self, start: Vec<f64>, settings: &SolveSettings) -> Option<Solution> {
        let mut params = start;
        let mut residual = self.residual(&self.samples, &params);
        let mut residual_norm = l2_norm(&residual);
        let mut iterations = 0usize;
        let mut last_step = 0.0f64;

        loop {
            if !residual_norm.is_finite() {
                debug!("Start abandoned at {params:?}: residual is not finite");
                return None;
            }
            if residual_norm <= settings.tolerance && last_step <= STEP_TOLERANCE {
                return Some(Solution {
                    values: params,
                    residual_norm,
                    iterations,
                });
            }
            if iterations >= settings.max_steps {
                return None;
            }

            let jacobian = self.jacobian(&params);
            let delta = match least_squares_step(jacobian, &residual) {
                Ok(delta) => delta,
                Err(err) => {
                    warn!("Start abandoned at {params:?}: {err}");
                    return None;
                }
            };
            last_step = 0.0;
            for (p, d) in params.iter_mut().zip(delta.iter()) {
                let step = settings.damping * d;
                last_step = last_step.max(step.abs() / (1.0 + p.abs()));
                *p -= step;
            }

            iterations += 1;
            residual = self.residual(&self.samples, &params);
            residual_norm = l2_norm(&residual);
        }
    }

    fn verify(&self, params: &[f64]) -> bool {
        self.residual(&self.checks, params)
            .iter()
            .all(|r| r.abs() <= VERIFY_TOLERANCE)
    }
}

fn least_squares_step(jacobian: DMatrix<f64>, residual: &[f64]) -> Result<DVector<f64>> {
    if jacobian.iter().any(|v| !v.is_finite()) {
        bail!("Jacobian is not finite.");
    }
    let rhs = DVector::from_column_slice(residual);
    jacobian
        .svd(true, true)
        .solve(&rhs, SVD_EPS)
        .map_err(|e| anyhow!("Least-squares solve failed: {e}"))
}

/// Cartesian product of evenly spaced guesses, one axis per unknown.
fn guess_grid(dim: usize, settings: &SolveSettings) -> Vec<Vec<f64>> {
    let n = settings.guess_samples;
    let axis: Vec<f64> = if n == 1 {
        vec![0.5 * (settings.guess_min + settings.guess_max)]
    } else {
        let step = (settings.guess_max - settings.guess_min) / (n - 1) as f64;
        (0..n).map(|i| settings.guess_min + step * i as f64).collect()
    };
    let total = n.pow(dim as u32);
    (0..total)
        .map(|mut index| {
            let mut guess = vec![0.0; dim];
            for slot in guess.iter_mut().rev() {
                *slot = axis[index % n];
                index /= n;
            }
            guess
        })
        .collect()
}

/// Radical inverse of `index` in `base`, in `[0, 1)`.
fn halton(mut index: u32, base: u32) -> f64 {
    let mut result = 0.0;
    let mut fraction = 1.0 / base as f64;
    while index > 0 {
        result += fraction * (index % base) as f64;
        index /= base;
        fraction /= base as f64;
    }
    result
}

/// Low-discrepancy points in `[0.3, 1.7]^dim`. Coordinates stay away from
/// zero so that singular fields such as `1/r` are finite at every sample point.
fn halton_points(dim: usize, offset: usize, count: usize) -> Vec<Vec<f64>> {
    (0..count)
        .map(|i| {
            let index = (offset + i + 1) as u32;
            PRIMES[..dim]
                .iter()
                .map(|&base| 0.3 + 1.4 * halton(index, base))
                .collect()
        })
        .collect()
}

fn snap(values: &mut [f64]) {
    for v in values {
        let rounded = v.round();
        if (*v - rounded).abs() < SNAP_TOLERANCE {
            *v = rounded;
        }
        if *v == 0.0 {
            *v = 0.0; // normalizes -0.0
        }
    }
}

fn same_point(a: &[f64], b: &[f64]) -> bool {
    a.iter().zip(b).all(|(x, y)| (x - y).abs() < SNAP_TOLERANCE)
}

fn l2_norm(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum::<f64>().sqrt()
}
