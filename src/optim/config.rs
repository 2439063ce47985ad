//! Configuration options for the Nelder-Mead minimizer.
//!
//! The knobs here are fixed for the duration of one `minimize` call.

use serde::{Deserialize, Serialize};

/// Configuration for a single Nelder-Mead minimization.
///
/// This struct controls:
/// - The iteration budget and convergence tolerance
/// - The edge length of the initial simplex
/// - The four simplex coefficients (reflection, expansion, contraction, shrink)
///
/// # Example
/// ```
/// use race_equilibrium::optim::NelderMeadConfig;
///
/// let config = NelderMeadConfig::default().with_tolerance(1e-12);
/// assert_eq!(config.max_iterations, 500);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NelderMeadConfig {
    /// Maximum number of simplex rounds before giving up.
    pub max_iterations: usize,

    /// Convergence tolerance on the sample standard deviation of the
    /// objective values at the simplex vertices.
    pub tolerance: f64,

    /// Distance from the starting point to each other initial vertex,
    /// along each coordinate axis.
    pub init_simplex_size: f64,

    /// Reflection coefficient.
    pub alpha: f64,

    /// Expansion coefficient.
    ///
    /// A value of 1.0 makes the expanded point coincide with the reflected one.
    pub gamma: f64,

    /// Contraction coefficient, in (0, 1].
    pub rho: f64,

    /// Shrink coefficient, in (0, 1].
    ///
    /// Defaults to 0.5. A value of 1.0 leaves the simplex unchanged on a
    /// shrink step, so a search that needs a shrink stalls until it runs out
    /// of iterations. Pass 1.0 explicitly to reproduce solvers that ship it.
    pub sigma: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            tolerance: 1e-10,
            init_simplex_size: 1.0,
            alpha: 1.0,
            gamma: 1.0,
            rho: 0.75,
            sigma: 0.5,
        }
    }
}

impl NelderMeadConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Textbook coefficients (alpha = 1, gamma = 2, rho = 0.5, sigma = 0.5).
    pub fn standard() -> Self {
        Self {
            gamma: 2.0,
            rho: 0.5,
            ..Default::default()
        }
    }

    /// Builder method: set the iteration budget.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Builder method: set the convergence tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Builder method: set the initial simplex edge length.
    pub fn with_init_simplex_size(mut self, size: f64) -> Self {
        self.init_simplex_size = size;
        self
    }

    /// Builder method: set all four simplex coefficients at once.
    pub fn with_coefficients(mut self, alpha: f64, gamma: f64, rho: f64, sigma: f64) -> Self {
        self.alpha = alpha;
        self.gamma = gamma;
        self.rho = rho;
        self.sigma = sigma;
        self
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }

        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(ConfigError::InvalidTolerance(self.tolerance));
        }

        if !self.init_simplex_size.is_finite() || self.init_simplex_size == 0.0 {
            return Err(ConfigError::InvalidSimplexSize(self.init_simplex_size));
        }

        if !(self.alpha > 0.0 && self.alpha.is_finite()) {
            return Err(ConfigError::InvalidCoefficient("alpha", self.alpha));
        }
        if !(self.gamma > 0.0 && self.gamma.is_finite()) {
            return Err(ConfigError::InvalidCoefficient("gamma", self.gamma));
        }
        if !(self.rho > 0.0 && self.rho <= 1.0) {
            return Err(ConfigError::InvalidCoefficient("rho", self.rho));
        }
        if !(self.sigma > 0.0 && self.sigma <= 1.0) {
            return Err(ConfigError::InvalidCoefficient("sigma", self.sigma));
        }

        Ok(())
    }
}

/// Errors that can occur when validating a minimizer configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The iteration budget is zero.
    ZeroIterations,
    /// Tolerance is not a positive finite number.
    InvalidTolerance(f64),
    /// Initial simplex size is zero or not finite.
    InvalidSimplexSize(f64),
    /// A simplex coefficient is out of range.
    InvalidCoefficient(&'static str, f64),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ZeroIterations => write!(f, "max_iterations must be at least 1"),
            ConfigError::InvalidTolerance(val) => {
                write!(f, "tolerance {} must be positive and finite", val)
            }
            ConfigError::InvalidSimplexSize(val) => {
                write!(f, "init_simplex_size {} must be non-zero and finite", val)
            }
            ConfigError::InvalidCoefficient(name, val) => {
                write!(f, "{} coefficient {} is out of range", name, val)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = NelderMeadConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.alpha, 1.0);
        assert_eq!(config.rho, 0.75);
    }

    #[test]
    fn test_builders() {
        let config = NelderMeadConfig::new()
            .with_max_iterations(42)
            .with_tolerance(1e-6)
            .with_init_simplex_size(10.0)
            .with_coefficients(1.0, 2.0, 0.5, 0.5);
        assert_eq!(config, NelderMeadConfig {
            max_iterations: 42,
            tolerance: 1e-6,
            init_simplex_size: 10.0,
            ..NelderMeadConfig::standard()
        });
    }

    #[test]
    fn test_validation_errors() {
        let zero = NelderMeadConfig::default().with_max_iterations(0);
        assert_eq!(zero.validate(), Err(ConfigError::ZeroIterations));

        let tol = NelderMeadConfig::default().with_tolerance(-1.0);
        assert!(matches!(tol.validate(), Err(ConfigError::InvalidTolerance(_))));

        let size = NelderMeadConfig::default().with_init_simplex_size(f64::NAN);
        assert!(matches!(size.validate(), Err(ConfigError::InvalidSimplexSize(_))));

        let rho = NelderMeadConfig::default().with_coefficients(1.0, 1.0, 1.5, 0.5);
        assert_eq!(rho.validate(), Err(ConfigError::InvalidCoefficient("rho", 1.5)));

        let sigma = NelderMeadConfig::default().with_coefficients(1.0, 1.0, 0.5, 0.0);
        assert_eq!(sigma.validate(), Err(ConfigError::InvalidCoefficient("sigma", 0.0)));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: NelderMeadConfig =
            serde_json::from_str(r#"{ "tolerance": 1e-8, "gamma": 2.0 }"#).unwrap();
        assert_eq!(config.tolerance, 1e-8);
        assert_eq!(config.gamma, 2.0);
        assert_eq!(config.max_iterations, 500);
    }
}
