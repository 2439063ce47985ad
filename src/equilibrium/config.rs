//! Configuration for the best-response solver.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::equilibrium::solver::SolveError;
use crate::optim::NelderMeadConfig;

/// Configuration for the best-response solver.
///
/// Controls the outer fixed-point loop, the per-agent minimizer, the retry
/// budget and the random initialisation.
///
/// # Example
/// ```
/// use race_equilibrium::equilibrium::SolverConfig;
///
/// let config = SolverConfig::default().with_seed(7).with_retries(0);
/// assert_eq!(config.max_iters, 100);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Relative tolerance on the change in safety investments between rounds.
    pub tol: f64,

    /// Maximum number of outer rounds per attempt.
    pub max_iters: usize,

    /// Minimizer settings used for every best-response search.
    ///
    /// Fields missing from a JSON `minimizer` object keep the values of
    /// [`inner_minimizer_defaults`], not those of `NelderMeadConfig::default()`.
    #[serde(deserialize_with = "deserialize_minimizer")]
    pub minimizer: NelderMeadConfig,

    /// Number of fresh random restarts after the first attempt fails.
    pub retries: usize,

    /// Random seed for reproducibility.
    ///
    /// If `None`, the solver seeds itself from entropy.
    pub seed: Option<u64>,

    /// Mean of the log of the initial investments.
    pub init_mu: f64,

    /// Standard deviation of the log of the initial investments.
    pub init_sigma: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tol: 1e-6,
            max_iters: 100,
            minimizer: inner_minimizer_defaults(),
            retries: 2,
            seed: None,
            init_mu: 0.0,
            init_sigma: 1.0,
        }
    }
}

/// Minimizer settings tuned for best-response searches in log space.
pub fn inner_minimizer_defaults() -> NelderMeadConfig {
    NelderMeadConfig::default()
        .with_tolerance(1e-10)
        .with_max_iterations(100)
        .with_init_simplex_size(10.0)
}

/// Partial minimizer settings as they appear in JSON.
#[derive(Deserialize)]
struct MinimizerOverrides {
    max_iterations: Option<usize>,
    tolerance: Option<f64>,
    init_simplex_size: Option<f64>,
    alpha: Option<f64>,
    gamma: Option<f64>,
    rho: Option<f64>,
    sigma: Option<f64>,
}

fn deserialize_minimizer<'de, D>(deserializer: D) -> Result<NelderMeadConfig, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = MinimizerOverrides::deserialize(deserializer)?;
    let mut config = inner_minimizer_defaults();

    if let Some(v) = overrides.max_iterations {
        config.max_iterations = v;
    }
    if let Some(v) = overrides.tolerance {
        config.tolerance = v;
    }
    if let Some(v) = overrides.init_simplex_size {
        config.init_simplex_size = v;
    }
    if let Some(v) = overrides.alpha {
        config.alpha = v;
    }
    if let Some(v) = overrides.gamma {
        config.gamma = v;
    }
    if let Some(v) = overrides.rho {
        config.rho = v;
    }
    if let Some(v) = overrides.sigma {
        config.sigma = v;
    }
    Ok(config)
}

impl SolverConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the outer tolerance.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Builder method: set the outer round budget.
    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Builder method: set the per-agent minimizer configuration.
    pub fn with_minimizer(mut self, minimizer: NelderMeadConfig) -> Self {
        self.minimizer = minimizer;
        self
    }

    /// Builder method: set the retry budget.
    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    /// Builder method: set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder method: set the log-normal initialisation parameters.
    pub fn with_init(mut self, mu: f64, sigma: f64) -> Self {
        self.init_mu = mu;
        self.init_sigma = sigma;
        self
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, SolveError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| SolveError::Io(e.to_string()))?;
        Self::from_json_str(&content)
    }

    /// Parse a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, SolveError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SolveError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), SolveError> {
        if !(self.tol > 0.0 && self.tol.is_finite()) {
            return Err(SolveError::InvalidConfig {
                field: "tol".to_string(),
                message: format!("{} must be positive and finite", self.tol),
            });
        }

        if self.max_iters == 0 {
            return Err(SolveError::InvalidConfig {
                field: "max_iters".to_string(),
                message: "at least one round is required".to_string(),
            });
        }

        if !self.init_mu.is_finite() || !(self.init_sigma >= 0.0 && self.init_sigma.is_finite()) {
            return Err(SolveError::InvalidConfig {
                field: "init_sigma".to_string(),
                message: format!(
                    "log-normal parameters ({}, {}) must be finite with sigma >= 0",
                    self.init_mu, self.init_sigma
                ),
            });
        }

        self.minimizer
            .validate()
            .map_err(|e| SolveError::InvalidConfig {
                field: "minimizer".to_string(),
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SolverConfig::default();
        assert_eq!(config.tol, 1e-6);
        assert_eq!(config.minimizer.tolerance, 1e-10);
        assert_eq!(config.minimizer.max_iterations, 100);
        assert_eq!(config.minimizer.init_simplex_size, 10.0);
        assert_eq!(config.seed, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let bad_tol = SolverConfig::default().with_tol(0.0);
        assert!(matches!(
            bad_tol.validate(),
            Err(SolveError::InvalidConfig { ref field, .. }) if field == "tol"
        ));

        let bad_iters = SolverConfig::default().with_max_iters(0);
        assert!(bad_iters.validate().is_err());

        let bad_init = SolverConfig::default().with_init(0.0, -1.0);
        assert!(bad_init.validate().is_err());

        let bad_inner = SolverConfig::default()
            .with_minimizer(NelderMeadConfig::default().with_coefficients(1.0, 1.0, 0.5, 2.0));
        assert!(matches!(
            bad_inner.validate(),
            Err(SolveError::InvalidConfig { ref field, .. }) if field == "minimizer"
        ));
    }

    #[test]
    fn test_from_json_str() {
        let json = r#"{
            "tol": 1e-5,
            "retries": 4,
            "seed": 11,
            "minimizer": { "init_simplex_size": 1.0 }
        }"#;
        let config = SolverConfig::from_json_str(json).unwrap();

        assert_eq!(config.tol, 1e-5);
        assert_eq!(config.retries, 4);
        assert_eq!(config.seed, Some(11));
        assert_eq!(config.max_iters, 100);
        assert_eq!(config.minimizer.init_simplex_size, 1.0);
        // Unlisted minimizer fields keep the solver's inner defaults.
        assert_eq!(config.minimizer.tolerance, 1e-10);
        assert_eq!(config.minimizer.max_iterations, 100);
    }

    #[test]
    fn test_partial_minimizer_keeps_inner_defaults() {
        let config =
            SolverConfig::from_json_str(r#"{ "minimizer": { "tolerance": 1e-10 } }"#).unwrap();
        assert_eq!(config, SolverConfig::default());

        let config = SolverConfig::from_json_str(r#"{ "minimizer": { "sigma": 0.25 } }"#).unwrap();
        assert_eq!(config.minimizer.sigma, 0.25);
        assert_eq!(config.minimizer.init_simplex_size, 10.0);
        assert_eq!(config.minimizer.rho, 0.75);
    }

    #[test]
    fn test_json_round_trip_keeps_minimizer() {
        let config = SolverConfig::default()
            .with_minimizer(inner_minimizer_defaults().with_max_iterations(42));
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(SolverConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        assert!(matches!(
            SolverConfig::from_json_str("{ not json"),
            Err(SolveError::Parse(_))
        ));
        assert!(matches!(
            SolverConfig::from_json_str(r#"{ "max_iters": 0 }"#),
            Err(SolveError::InvalidConfig { .. })
        ));
        assert!(matches!(
            SolverConfig::from_json_file("/nonexistent/solver.json"),
            Err(SolveError::Io(_))
        ));
    }
}
