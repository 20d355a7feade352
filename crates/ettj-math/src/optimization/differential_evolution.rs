//! Differential evolution over a bounding box.
//!
//! Trial vectors for a whole generation are drawn from a single seeded
//! generator before any of them is evaluated, so evaluating the population
//! on a rayon pool gives the same result as evaluating it sequentially.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use super::{Bounds, OptimizationResult, Termination};
use crate::error::{MathError, MathResult};

/// Mutation base vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeStrategy {
    /// `best + F (r1 - r2)` with binomial crossover.
    #[default]
    Best1Bin,
    /// `r0 + F (r1 - r2)` with binomial crossover.
    Rand1Bin,
}

/// Configuration for [`differential_evolution`].
#[derive(Debug, Clone, PartialEq)]
pub struct DifferentialEvolutionConfig {
    /// Population size as a multiple of the problem dimension.
    pub population_multiplier: usize,
    /// Maximum number of generations.
    pub max_generations: u32,
    /// Mutation factor range; a value is drawn per generation (dithering).
    pub mutation: (f64, f64),
    /// Crossover probability.
    pub crossover: f64,
    /// Relative convergence tolerance on the population energy spread.
    pub tolerance: f64,
    /// Absolute convergence tolerance on the population energy spread.
    pub abs_tolerance: f64,
    /// Random seed.
    pub seed: u64,
    /// Mutation strategy.
    pub strategy: DeStrategy,
    /// Evaluate each generation on the rayon pool.
    pub parallel: bool,
}

impl Default for DifferentialEvolutionConfig {
    fn default() -> Self {
        Self {
            population_multiplier: 15,
            max_generations: 1000,
            mutation: (0.5, 1.0),
            crossover: 0.7,
            tolerance: 1e-7,
            abs_tolerance: 1e-7,
            seed: 42,
            strategy: DeStrategy::Best1Bin,
            parallel: true,
        }
    }
}

impl DifferentialEvolutionConfig {
    /// Sets the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the generation budget.
    #[must_use]
    pub fn with_max_generations(mut self, max_generations: u32) -> Self {
        self.max_generations = max_generations;
        self
    }

    /// Sets the strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: DeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Enables or disables parallel evaluation.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    fn validate(&self) -> MathResult<()> {
        let (lo, hi) = self.mutation;
        if !(0.0..=2.0).contains(&lo) || !(0.0..=2.0).contains(&hi) || lo > hi {
            return Err(MathError::invalid_input(format!(
                "mutation range ({lo}, {hi}) must satisfy 0 <= lo <= hi <= 2"
            )));
        }
        if !(0.0..=1.0).contains(&self.crossover) {
            return Err(MathError::invalid_input(format!(
                "crossover {} must be in [0, 1]",
                self.crossover
            )));
        }
        if self.population_multiplier == 0 {
            return Err(MathError::invalid_input("population multiplier must be positive"));
        }
        Ok(())
    }
}

/// Minimises `f` over `bounds` by differential evolution.
///
/// The population is initialised by Latin hypercube sampling. When `initial`
/// is given it replaces the first member (projected onto the box). Mutant
/// components that leave the box are redrawn uniformly inside it.
///
/// Convergence: the standard deviation of the population energies falls to
/// `abs_tolerance + tolerance * |mean energy|`.
///
/// # Example
///
/// ```rust
/// use ettj_math::prelude::*;
///
/// let bounds = Bounds::from_pairs(&[(-5.0, 5.0), (-5.0, 5.0)]).unwrap();
/// let f = |x: &[f64]| (x[0] - 1.0).powi(2) + (x[1] + 2.0).powi(2);
/// let result = differential_evolution(&f, &bounds, &DifferentialEvolutionConfig::default(), None).unwrap();
/// assert!((result.parameters[0] - 1.0).abs() < 1e-3);
/// ```
pub fn differential_evolution<F>(
    f: &F,
    bounds: &Bounds,
    config: &DifferentialEvolutionConfig,
    initial: Option<&[f64]>,
) -> MathResult<OptimizationResult>
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    config.validate()?;
    let dim = bounds.dimension();
    let pop_size = (config.population_multiplier * dim).max(5);
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut population = latin_hypercube(bounds, pop_size, &mut rng);
    if let Some(x0) = initial {
        bounds.check_dimension(x0)?;
        population[0] = bounds.clamp(x0);
    }

    let mut energies = evaluate(f, &population, config.parallel);
    let mut evaluations = pop_size;
    let mut best = argmin(&energies);

    let mut generations = 0;
    let mut termination = Termination::MaxIterations;

    if has_converged(&energies, config) {
        termination = Termination::Converged;
    } else {
        for generation in 1..=config.max_generations {
            generations = generation;
            let scale = if config.mutation.0 < config.mutation.1 {
                rng.gen_range(config.mutation.0..config.mutation.1)
            } else {
                config.mutation.0
            };

            let trials: Vec<Vec<f64>> = (0..pop_size)
                .map(|i| {
                    make_trial(
                        i,
                        best,
                        &population,
                        bounds,
                        scale,
                        config,
                        &mut rng,
                    )
                })
                .collect();

            let trial_energies = evaluate(f, &trials, config.parallel);
            evaluations += pop_size;

            for (i, (trial, energy)) in trials.into_iter().zip(trial_energies).enumerate() {
                if energy <= energies[i] {
                    population[i] = trial;
                    energies[i] = energy;
                }
            }
            best = argmin(&energies);

            if has_converged(&energies, config) {
                termination = Termination::Converged;
                break;
            }
        }
    }

    debug!(
        generations,
        evaluations,
        best = energies[best],
        ?termination,
        "differential evolution finished"
    );

    Ok(OptimizationResult {
        parameters: population[best].clone(),
        objective_value: energies[best],
        iterations: generations,
        evaluations,
        converged: termination == Termination::Converged,
        termination,
    })
}

fn make_trial(
    i: usize,
    best: usize,
    population: &[Vec<f64>],
    bounds: &Bounds,
    scale: f64,
    config: &DifferentialEvolutionConfig,
    rng: &mut StdRng,
) -> Vec<f64> {
    let dim = bounds.dimension();
    let mut candidates: Vec<usize> = (0..population.len()).filter(|&k| k != i).collect();
    let (picked, _) = candidates.partial_shuffle(rng, 3);
    let (r0, r1, r2) = (picked[0], picked[1], picked[2]);

    let base = match config.strategy {
        DeStrategy::Best1Bin => &population[best],
        DeStrategy::Rand1Bin => &population[r0],
    };

    let j_rand = rng.gen_range(0..dim);
    let mut trial = population[i].clone();
    for d in 0..dim {
        if d == j_rand || rng.gen::<f64>() < config.crossover {
            let mut value = base[d] + scale * (population[r1][d] - population[r2][d]);
            if value < bounds.lower()[d] || value > bounds.upper()[d] {
                let u: f64 = rng.gen();
                value = bounds.lower()[d] + u * (bounds.upper()[d] - bounds.lower()[d]);
            }
            trial[d] = value;
        }
    }
    trial
}

fn latin_hypercube(bounds: &Bounds, size: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let dim = bounds.dimension();
    let mut unit = vec![vec![0.0; dim]; size];
    let mut strata: Vec<usize> = (0..size).collect();
    for d in 0..dim {
        strata.shuffle(rng);
        for (member, &stratum) in unit.iter_mut().zip(&strata) {
            let u: f64 = rng.gen();
            member[d] = (stratum as f64 + u) / size as f64;
        }
    }
    unit.iter().map(|u| bounds.scale(u)).collect()
}

fn evaluate<F>(f: &F, points: &[Vec<f64>], parallel: bool) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    let energy = |x: &Vec<f64>| {
        let value = f(x);
        if value.is_finite() {
            value
        } else {
            f64::INFINITY
        }
    };
    if parallel {
        points.par_iter().map(energy).collect()
    } else {
        points.iter().map(energy).collect()
    }
}

fn argmin(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map_or(0, |(idx, _)| idx)
}

fn has_converged(energies: &[f64], config: &DifferentialEvolutionConfig) -> bool {
    if energies.iter().any(|e| !e.is_finite()) {
        return false;
    }
    let n = energies.len() as f64;
    let mean = energies.iter().sum::<f64>() / n;
    let variance = energies.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() <= config.abs_tolerance + config.tolerance * mean.abs()
}
