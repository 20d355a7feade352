//! `[fit]` section: parameter box, starting point and optimizer budgets.

use serde::{Deserialize, Serialize};

use ettj_curves::calibration::{InitialGuess, NssFitterConfig, ParameterBounds};
use ettj_curves::NssParameters;
use ettj_math::optimization::{DeStrategy, DifferentialEvolutionConfig, LbfgsbConfig};

use crate::error::{check_range, ConfigError, ConfigResult, Validate, ValidationError};

/// Minimum distinct maturities for a six-parameter fit.
pub const MIN_OBSERVATIONS: usize = 6;

/// Fitting configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitSection {
    /// `"data"` for the data-driven guess, or six fixed parameters.
    pub initial_guess: InitialGuessSetting,
    /// Minimum distinct maturities per fit.
    pub min_observations: usize,
    /// Parameter box.
    pub bounds: BoundsSection,
    /// Differential evolution settings.
    pub global: GlobalSection,
    /// L-BFGS-B settings.
    pub local: LocalSection,
}

impl Default for FitSection {
    fn default() -> Self {
        Self {
            initial_guess: InitialGuessSetting::default(),
            min_observations: MIN_OBSERVATIONS,
            bounds: BoundsSection::default(),
            global: GlobalSection::default(),
            local: LocalSection::default(),
        }
    }
}

impl FitSection {
    /// Builds the runtime fitter configuration.
    pub fn to_fitter_config(&self) -> ConfigResult<NssFitterConfig> {
        self.validate_or_error()?;
        Ok(NssFitterConfig {
            bounds: self.bounds.to_parameter_bounds(),
            initial_guess: self.initial_guess.resolve()?,
            global: self.global.to_de_config(),
            local: self.local.to_lbfgsb_config(),
            min_observations: self.min_observations,
        })
    }
}

impl Validate for FitSection {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.min_observations < MIN_OBSERVATIONS {
            errors.push(ValidationError::with_rule(
                "min_observations",
                format!("At least {MIN_OBSERVATIONS} observations are needed for six parameters"),
                "min_observations",
            ));
        }
        if let Err(e) = self.initial_guess.resolve() {
            errors.push(ValidationError::new("initial_guess", e.to_string()));
        }
        if let InitialGuessSetting::Fixed(values) = self.initial_guess {
            let inside = self
                .bounds
                .pairs()
                .iter()
                .zip(values)
                .all(|(range, v)| v >= range[0] && v <= range[1]);
            if !inside {
                errors.push(ValidationError::with_rule(
                    "initial_guess",
                    "Fixed initial guess lies outside the bounds",
                    "guess_within_bounds",
                ));
            }
        }

        errors.extend(self.bounds.validate().into_iter().map(|e| e.nested("bounds")));
        errors.extend(self.global.validate().into_iter().map(|e| e.nested("global")));
        errors.extend(self.local.validate().into_iter().map(|e| e.nested("local")));
        errors
    }
}

/// Starting point setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InitialGuessSetting {
    /// Named strategy; only `"data"` is recognised.
    Named(String),
    /// `[β0, β1, β2, β3, τ1, τ2]`.
    Fixed([f64; 6]),
}

impl Default for InitialGuessSetting {
    fn default() -> Self {
        Self::Named("data".to_string())
    }
}

impl InitialGuessSetting {
    /// Resolves to the fitter's initial guess.
    pub fn resolve(&self) -> ConfigResult<InitialGuess> {
        match self {
            InitialGuessSetting::Named(name) if name.eq_ignore_ascii_case("data") => {
                Ok(InitialGuess::FromData)
            }
            InitialGuessSetting::Named(name) => Err(ConfigError::invalid_value(
                "fit.initial_guess",
                format!("expected \"data\" or six numbers, got \"{name}\""),
            )),
            InitialGuessSetting::Fixed(values) => NssParameters::from_slice(values)
                .map(InitialGuess::Fixed)
                .map_err(|e| ConfigError::invalid_value("fit.initial_guess", e.to_string())),
        }
    }
}

/// `[lower, upper]` per NSS parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundsSection {
    /// β0 (long-run level).
    pub beta0: [f64; 2],
    /// β1 (slope).
    pub beta1: [f64; 2],
    /// β2 (first hump).
    pub beta2: [f64; 2],
    /// β3 (second hump).
    pub beta3: [f64; 2],
    /// τ1.
    pub tau1: [f64; 2],
    /// τ2.
    pub tau2: [f64; 2],
}

impl Default for BoundsSection {
    fn default() -> Self {
        let defaults = ParameterBounds::default().to_pairs();
        let [beta0, beta1, beta2, beta3, tau1, tau2] = defaults.map(|(lo, hi)| [lo, hi]);
        Self {
            beta0,
            beta1,
            beta2,
            beta3,
            tau1,
            tau2,
        }
    }
}

impl BoundsSection {
    fn pairs(&self) -> [[f64; 2]; 6] {
        [
            self.beta0, self.beta1, self.beta2, self.beta3, self.tau1, self.tau2,
        ]
    }

    /// Converts to fitter bounds.
    #[must_use]
    pub fn to_parameter_bounds(&self) -> ParameterBounds {
        ParameterBounds::from_pairs(self.pairs().map(|[lo, hi]| (lo, hi)))
    }
}

impl Validate for BoundsSection {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let names = ["beta0", "beta1", "beta2", "beta3", "tau1", "tau2"];
        for (name, range) in names.iter().zip(self.pairs()) {
            check_range(name, range, &mut errors);
        }
        for (name, range) in [("tau1", self.tau1), ("tau2", self.tau2)] {
            if range[0] <= 0.0 {
                errors.push(ValidationError::with_rule(
                    name,
                    "Decay parameters need a positive lower bound",
                    "positive_tau",
                ));
            }
        }
        errors
    }
}

/// Mutation strategy name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategySetting {
    /// `best/1/bin`.
    #[default]
    Best1bin,
    /// `rand/1/bin`.
    Rand1bin,
}

impl From<StrategySetting> for DeStrategy {
    fn from(setting: StrategySetting) -> Self {
        match setting {
            StrategySetting::Best1bin => DeStrategy::Best1Bin,
            StrategySetting::Rand1bin => DeStrategy::Rand1Bin,
        }
    }
}

/// Differential evolution settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalSection {
    /// Mutation strategy.
    pub strategy: StrategySetting,
    /// Population size as a multiple of the dimension.
    pub population_multiplier: usize,
    /// Generation budget.
    pub max_generations: u32,
    /// Dithering range for the mutation factor.
    pub mutation: [f64; 2],
    /// Crossover probability.
    pub crossover: f64,
    /// Relative convergence tolerance.
    pub tolerance: f64,
    /// Absolute convergence tolerance.
    pub abs_tolerance: f64,
    /// Random seed.
    pub seed: u64,
    /// Evaluate generations on the rayon pool.
    pub parallel: bool,
}

impl Default for GlobalSection {
    fn default() -> Self {
        let de = DifferentialEvolutionConfig::default();
        Self {
            strategy: StrategySetting::Best1bin,
            population_multiplier: de.population_multiplier,
            max_generations: de.max_generations,
            mutation: [de.mutation.0, de.mutation.1],
            crossover: de.crossover,
            tolerance: de.tolerance,
            abs_tolerance: de.abs_tolerance,
            seed: de.seed,
            parallel: de.parallel,
        }
    }
}

impl GlobalSection {
    /// Converts to the optimizer configuration.
    #[must_use]
    pub fn to_de_config(&self) -> DifferentialEvolutionConfig {
        DifferentialEvolutionConfig {
            population_multiplier: self.population_multiplier,
            max_generations: self.max_generations,
            mutation: (self.mutation[0], self.mutation[1]),
            crossover: self.crossover,
            tolerance: self.tolerance,
            abs_tolerance: self.abs_tolerance,
            seed: self.seed,
            strategy: self.strategy.into(),
            parallel: self.parallel,
        }
    }
}

impl Validate for GlobalSection {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.population_multiplier < 1 {
            errors.push(ValidationError::new(
                "population_multiplier",
                "Population multiplier must be at least 1",
            ));
        }
        if self.max_generations == 0 {
            errors.push(ValidationError::new(
                "max_generations",
                "Generation budget must be positive",
            ));
        }
        check_range("mutation", self.mutation, &mut errors);
        if self.mutation[0] < 0.0 || self.mutation[1] > 2.0 {
            errors.push(ValidationError::with_rule(
                "mutation",
                "Mutation factors must lie in [0, 2]",
                "valid_mutation",
            ));
        }
        if !(0.0..=1.0).contains(&self.crossover) {
            errors.push(ValidationError::with_rule(
                "crossover",
                "Crossover probability must lie in [0, 1]",
                "probability",
            ));
        }
        if !(self.tolerance >= 0.0 && self.abs_tolerance >= 0.0) {
            errors.push(ValidationError::new(
                "tolerance",
                "Tolerances must be non-negative",
            ));
        }
        errors
    }
}

/// L-BFGS-B settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSection {
    /// Iteration budget.
    pub max_iterations: u32,
    /// Correction pairs kept.
    pub memory: usize,
    /// Projected gradient tolerance.
    pub pgtol: f64,
    /// Relative objective reduction tolerance.
    pub ftol: f64,
    /// Finite-difference step.
    pub gradient_step: f64,
}

impl Default for LocalSection {
    fn default() -> Self {
        let local = LbfgsbConfig::default();
        Self {
            max_iterations: local.max_iterations,
            memory: local.memory,
            pgtol: local.pgtol,
            ftol: local.ftol,
            gradient_step: local.gradient_step,
        }
    }
}

impl LocalSection {
    /// Converts to the optimizer configuration.
    #[must_use]
    pub fn to_lbfgsb_config(&self) -> LbfgsbConfig {
        LbfgsbConfig {
            memory: self.memory,
            max_iterations: self.max_iterations,
            pgtol: self.pgtol,
            ftol: self.ftol,
            gradient_step: self.gradient_step,
            ..LbfgsbConfig::default()
        }
    }
}

impl Validate for LocalSection {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.max_iterations == 0 {
            errors.push(ValidationError::new(
                "max_iterations",
                "Iteration budget must be positive",
            ));
        }
        if self.memory == 0 {
            errors.push(ValidationError::new("memory", "Memory must be positive"));
        }
        for (name, value) in [
            ("pgtol", self.pgtol),
            ("ftol", self.ftol),
            ("gradient_step", self.gradient_step),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                errors.push(ValidationError::with_rule(
                    name,
                    format!("{name} must be positive"),
                    "positive",
                ));
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fitter_defaults() {
        let config = FitSection::default().to_fitter_config().unwrap();
        assert_eq!(config, NssFitterConfig::default());
    }

    #[test]
    fn test_fixed_guess() {
        let section = FitSection {
            initial_guess: InitialGuessSetting::Fixed([10.0, 1.0, 0.0, 0.0, 1.0, 5.0]),
            ..FitSection::default()
        };
        let config = section.to_fitter_config().unwrap();
        assert!(matches!(config.initial_guess, InitialGuess::Fixed(p) if p.beta0 == 10.0));
    }

    #[test]
    fn test_guess_outside_bounds() {
        let section = FitSection {
            initial_guess: InitialGuessSetting::Fixed([50.0, 1.0, 0.0, 0.0, 1.0, 5.0]),
            ..FitSection::default()
        };
        let errors = section.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "initial_guess");
    }

    #[test]
    fn test_unknown_guess_name() {
        let section = FitSection {
            initial_guess: InitialGuessSetting::Named("previous".into()),
            ..FitSection::default()
        };
        assert!(section.to_fitter_config().is_err());
    }

    #[test]
    fn test_invalid_sections_are_prefixed() {
        let mut section = FitSection::default();
        section.bounds.tau1 = [0.0, 10.0];
        section.global.crossover = 1.5;
        section.local.memory = 0;
        section.min_observations = 3;

        let fields: Vec<String> = section.validate().into_iter().map(|e| e.field).collect();
        assert!(fields.contains(&"min_observations".to_string()));
        assert!(fields.contains(&"bounds.tau1".to_string()));
        assert!(fields.contains(&"global.crossover".to_string()));
        assert!(fields.contains(&"local.memory".to_string()));
    }

    #[test]
    fn test_strategy_mapping() {
        let global = GlobalSection {
            strategy: StrategySetting::Rand1bin,
            seed: 7,
            ..GlobalSection::default()
        };
        let de = global.to_de_config();
        assert_eq!(de.strategy, DeStrategy::Rand1Bin);
        assert_eq!(de.seed, 7);
    }
}
