//! Projected limited-memory BFGS for box-constrained problems.
//!
//! Search directions come from the usual two-loop recursion restricted to
//! the free variables; steps are projected back onto the box and accepted
//! by an Armijo backtracking test on the projected path.

use std::cell::Cell;
use std::collections::VecDeque;

use tracing::debug;

use super::{numerical_gradient, Bounds, OptimizationResult, Termination};
use crate::error::{MathError, MathResult};

/// Configuration for [`lbfgsb`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LbfgsbConfig {
    /// Number of correction pairs kept.
    pub memory: usize,
    /// Maximum number of iterations.
    pub max_iterations: u32,
    /// Stop when the projected gradient infinity norm falls below this.
    pub pgtol: f64,
    /// Stop when the relative objective reduction falls below this.
    pub ftol: f64,
    /// Relative step for finite-difference gradients.
    pub gradient_step: f64,
    /// Maximum backtracking steps per line search.
    pub max_line_search: u32,
}

impl Default for LbfgsbConfig {
    fn default() -> Self {
        Self {
            memory: 10,
            max_iterations: 15_000,
            pgtol: 1e-5,
            ftol: 2.220_446_049_250_313e-9,
            gradient_step: 1e-8,
            max_line_search: 30,
        }
    }
}

impl LbfgsbConfig {
    /// Sets the iteration budget.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the projected-gradient tolerance.
    #[must_use]
    pub fn with_pgtol(mut self, pgtol: f64) -> Self {
        self.pgtol = pgtol;
        self
    }
}

const ARMIJO_C1: f64 = 1e-4;

/// Minimises `f` inside `bounds`, starting from `initial`.
///
/// The starting point is projected onto the box first. A run that exhausts
/// its iteration budget or cannot find a decreasing step returns the best
/// point reached with `converged == false`.
///
/// # Errors
///
/// Returns `MathError::DimensionMismatch` if `initial` does not match the
/// bounds and `MathError::NonFiniteObjective` if `f` is not finite at the
/// projected start.
pub fn lbfgsb<F>(
    f: &F,
    bounds: &Bounds,
    initial: &[f64],
    config: &LbfgsbConfig,
) -> MathResult<OptimizationResult>
where
    F: Fn(&[f64]) -> f64,
{
    bounds.check_dimension(initial)?;
    if config.memory == 0 {
        return Err(MathError::invalid_input("L-BFGS memory must be positive"));
    }

    let evaluations = Cell::new(0usize);
    let objective = |x: &[f64]| {
        evaluations.set(evaluations.get() + 1);
        f(x)
    };

    let mut x = bounds.clamp(initial);
    let mut fx = objective(&x);
    if !fx.is_finite() {
        return Err(MathError::NonFiniteObjective { value: fx });
    }
    let mut g = numerical_gradient(&objective, &x, bounds, config.gradient_step);

    let mut history: VecDeque<(Vec<f64>, Vec<f64>, f64)> = VecDeque::with_capacity(config.memory);
    let mut termination = Termination::MaxIterations;
    let mut iterations = 0;

    for iteration in 0..config.max_iterations {
        iterations = iteration;
        if projected_gradient_norm(&x, &g, bounds) <= config.pgtol {
            termination = Termination::Converged;
            break;
        }

        let free = free_variables(&x, &g, bounds);
        let mut direction = two_loop(&g, &history, &free);
        if dot(&direction, &g) >= 0.0 {
            history.clear();
            direction = steepest(&g, &free);
        }

        let initial_step = if history.is_empty() {
            (1.0 / norm(&direction)).min(1.0)
        } else {
            1.0
        };

        let accepted = line_search(&objective, bounds, &x, fx, &g, &direction, initial_step, config)
            .or_else(|| {
                if history.is_empty() {
                    None
                } else {
                    history.clear();
                    let fallback = steepest(&g, &free);
                    let step = (1.0 / norm(&fallback)).min(1.0);
                    line_search(&objective, bounds, &x, fx, &g, &fallback, step, config)
                }
            });

        let Some((x_new, f_new)) = accepted else {
            termination = Termination::LineSearchFailed;
            break;
        };

        let g_new = numerical_gradient(&objective, &x_new, bounds, config.gradient_step);
        let s: Vec<f64> = x_new.iter().zip(&x).map(|(a, b)| a - b).collect();
        let y: Vec<f64> = g_new.iter().zip(&g).map(|(a, b)| a - b).collect();
        let sy = dot(&s, &y);
        if sy > f64::EPSILON * dot(&y, &y) {
            if history.len() == config.memory {
                history.pop_front();
            }
            history.push_back((s, y, 1.0 / sy));
        }

        let reduction = (fx - f_new) / fx.abs().max(f_new.abs()).max(1.0);
        x = x_new;
        fx = f_new;
        g = g_new;
        iterations = iteration + 1;

        if reduction <= config.ftol {
            termination = Termination::Converged;
            break;
        }
    }

    debug!(
        iterations,
        evaluations = evaluations.get(),
        objective = fx,
        ?termination,
        "L-BFGS-B finished"
    );

    Ok(OptimizationResult {
        parameters: x,
        objective_value: fx,
        iterations,
        evaluations: evaluations.get(),
        converged: termination == Termination::Converged,
        termination,
    })
}

#[allow(clippy::too_many_arguments)]
fn line_search<F>(
    f: &F,
    bounds: &Bounds,
    x: &[f64],
    fx: f64,
    g: &[f64],
    direction: &[f64],
    initial_step: f64,
    config: &LbfgsbConfig,
) -> Option<(Vec<f64>, f64)>
where
    F: Fn(&[f64]) -> f64,
{
    let mut step = initial_step;
    for _ in 0..config.max_line_search {
        let candidate: Vec<f64> = x
            .iter()
            .zip(direction)
            .map(|(xi, di)| xi + step * di)
            .collect();
        let candidate = bounds.clamp(&candidate);
        let moved: Vec<f64> = candidate.iter().zip(x).map(|(a, b)| a - b).collect();
        let decrease = dot(g, &moved);
        if decrease < 0.0 {
            let f_new = f(&candidate);
            if f_new.is_finite() && f_new <= fx + ARMIJO_C1 * decrease {
                return Some((candidate, f_new));
            }
        } else if moved.iter().all(|m| *m == 0.0) {
            return None;
        }
        step *= 0.5;
    }
    None
}

/// Variables not pinned at a bound by a gradient pointing outward.
fn free_variables(x: &[f64], g: &[f64], bounds: &Bounds) -> Vec<bool> {
    x.iter()
        .zip(g)
        .enumerate()
        .map(|(i, (&xi, &gi))| {
            let at_lower = xi <= bounds.lower()[i] && gi > 0.0;
            let at_upper = xi >= bounds.upper()[i] && gi < 0.0;
            !(at_lower || at_upper)
        })
        .collect()
}

fn projected_gradient_norm(x: &[f64], g: &[f64], bounds: &Bounds) -> f64 {
    x.iter()
        .zip(g)
        .enumerate()
        .map(|(i, (&xi, &gi))| {
            let projected = (xi - gi).clamp(bounds.lower()[i], bounds.upper()[i]);
            (projected - xi).abs()
        })
        .fold(0.0, f64::max)
}

fn two_loop(g: &[f64], history: &VecDeque<(Vec<f64>, Vec<f64>, f64)>, free: &[bool]) -> Vec<f64> {
    let mask = |v: &[f64]| -> Vec<f64> {
        v.iter()
            .zip(free)
            .map(|(&vi, &is_free)| if is_free { vi } else { 0.0 })
            .collect()
    };

    let mut q = mask(g);
    let mut alphas = Vec::with_capacity(history.len());
    for (s, y, rho) in history.iter().rev() {
        let s = mask(s);
        let y = mask(y);
        let alpha = rho * dot(&s, &q);
        for (qi, yi) in q.iter_mut().zip(&y) {
            *qi -= alpha * yi;
        }
        alphas.push(alpha);
    }

    if let Some((s, y, _)) = history.back() {
        let yy = dot(y, y);
        if yy > 0.0 {
            let gamma = dot(s, y) / yy;
            for qi in &mut q {
                *qi *= gamma;
            }
        }
    }

    for ((s, y, rho), alpha) in history.iter().zip(alphas.iter().rev()) {
        let s = mask(s);
        let y = mask(y);
        let beta = rho * dot(&y, &q);
        for (qi, si) in q.iter_mut().zip(&s) {
            *qi += (alpha - beta) * si;
        }
    }

    mask(&q).into_iter().map(|v| -v).collect()
}

fn steepest(g: &[f64], free: &[bool]) -> Vec<f64> {
    g.iter()
        .zip(free)
        .map(|(&gi, &is_free)| if is_free { -gi } else { 0.0 })
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt().max(f64::MIN_POSITIVE)
}
