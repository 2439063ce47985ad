//! The AI safety race.
//!
//! Each agent splits spending between safety (`xs`) and performance (`xp`).
//! Performance wins the race; safety keeps everyone from losing it together.
//!
//! ## Production
//!
//! ```text
//! p_i = b_i * xp_i ^ beta_i
//! s_i = a_i * xs_i ^ alpha_i / p_i ^ theta_i
//! ```
//!
//! `theta` is how much faster performance makes safety harder to come by.
//!
//! ## Payoff
//!
//! ```text
//! S     = prod_j s_j / (1 + s_j)          probability nobody causes a disaster
//! csf_i = p_i / sum_j p_j                 share of the prize
//! u_i   = S * csf_i - (1 - S) * d_i - r_i * (xs_i + xp_i)
//! ```
//!
//! `d_i` is what agent `i` loses in a disaster and `r_i` is the unit price of
//! investment.
//!
//! ## Known Equilibrium
//!
//! With two agents and the default parameters the symmetric equilibrium is
//! `xs = 200/27`, `xp = 100/27`, with payoff `1/9` each.
//!
//! A single agent with `d = 0` has no interior optimum: shrinking both
//! investments at a fixed ratio keeps `S` constant and cuts the cost.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::equilibrium::{total_safety, Outcome, PayoffModel, StrategyProfile};

/// Per-agent production technology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionFunction {
    /// Safety productivity.
    pub a: Vec<f64>,
    /// Returns to safety investment.
    pub alpha: Vec<f64>,
    /// Performance productivity.
    pub b: Vec<f64>,
    /// Returns to performance investment.
    pub beta: Vec<f64>,
    /// Safety penalty from performance.
    pub theta: Vec<f64>,
}

impl ProductionFunction {
    /// Create a production function. All vectors must share the length of `a`.
    pub fn new(
        a: Vec<f64>,
        alpha: Vec<f64>,
        b: Vec<f64>,
        beta: Vec<f64>,
        theta: Vec<f64>,
    ) -> Result<Self, ModelError> {
        let n = a.len();
        check_len("alpha", n, &alpha)?;
        check_len("b", n, &b)?;
        check_len("beta", n, &beta)?;
        check_len("theta", n, &theta)?;
        Ok(Self {
            a,
            alpha,
            b,
            beta,
            theta,
        })
    }

    /// `n` agents with every parameter equal to 1.
    pub fn symmetric(n: usize) -> Self {
        Self {
            a: vec![1.0; n],
            alpha: vec![1.0; n],
            b: vec![1.0; n],
            beta: vec![1.0; n],
            theta: vec![1.0; n],
        }
    }

    /// Number of agents.
    pub fn num_agents(&self) -> usize {
        self.a.len()
    }

    /// Safety and performance production, `(s, p)`.
    pub fn produce(&self, xs: &[f64], xp: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let p: Vec<f64> = xp
            .iter()
            .enumerate()
            .map(|(i, &x)| self.b[i] * x.powf(self.beta[i]))
            .collect();
        let s = xs
            .iter()
            .enumerate()
            .map(|(i, &x)| self.a[i] * x.powf(self.alpha[i]) / p[i].powf(self.theta[i]))
            .collect();
        (s, p)
    }
}

impl Default for ProductionFunction {
    fn default() -> Self {
        Self::symmetric(2)
    }
}

/// The safety race payoff model.
///
/// # Example
/// ```
/// use race_equilibrium::equilibrium::{PayoffModel, StrategyProfile};
/// use race_equilibrium::models::SafetyRace;
///
/// let race = SafetyRace::default();
/// let profile = StrategyProfile::uniform(2, 200.0 / 27.0, 100.0 / 27.0);
///
/// assert!((race.payoff(0, &profile) - 1.0 / 9.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyRace {
    /// Production technology.
    pub production: ProductionFunction,
    /// Disaster cost per agent.
    pub d: Vec<f64>,
    /// Investment price per agent.
    pub r: Vec<f64>,
}

impl SafetyRace {
    /// Create a model. `d` and `r` must match the production function's agents.
    pub fn new(production: ProductionFunction, d: Vec<f64>, r: Vec<f64>) -> Result<Self, ModelError> {
        let n = production.num_agents();
        check_len("d", n, &d)?;
        check_len("r", n, &r)?;
        Ok(Self { production, d, r })
    }

    /// `n` identical agents: unit production parameters, `d = 0`, `r = 0.01`.
    pub fn symmetric(n: usize) -> Self {
        Self {
            production: ProductionFunction::symmetric(n),
            d: vec![0.0; n],
            r: vec![0.01; n],
        }
    }

    /// Payoff of every agent, computed in one pass.
    pub fn payoffs(&self, profile: &StrategyProfile) -> Vec<f64> {
        let (s, p) = self.production.produce(&profile.xs, &profile.xp);
        let safety = total_safety(&s);
        let total_p: f64 = p.iter().sum();

        (0..self.num_agents())
            .map(|i| {
                let csf = p[i] / total_p;
                (csf + self.d[i]) * safety
                    - self.d[i]
                    - self.r[i] * (profile.xs[i] + profile.xp[i])
            })
            .collect()
    }
}

impl Default for SafetyRace {
    fn default() -> Self {
        Self::symmetric(2)
    }
}

impl PayoffModel for SafetyRace {
    fn num_agents(&self) -> usize {
        self.production.num_agents()
    }

    fn payoff(&self, agent: usize, profile: &StrategyProfile) -> f64 {
        let (s, p) = self.production.produce(&profile.xs, &profile.xp);
        let safety = total_safety(&s);
        let csf = p[agent] / p.iter().sum::<f64>();

        safety * csf
            - (1.0 - safety) * self.d[agent]
            - self.r[agent] * (profile.xs[agent] + profile.xp[agent])
    }

    fn outcome(&self, profile: &StrategyProfile) -> Outcome {
        let (safety, performance) = self.production.produce(&profile.xs, &profile.xp);
        Outcome {
            total_safety: total_safety(&safety),
            payoffs: self.payoffs(profile),
            safety,
            performance,
        }
    }
}

fn check_len(param: &'static str, expected: usize, values: &[f64]) -> Result<(), ModelError> {
    if values.len() != expected {
        return Err(ModelError::LengthMismatch {
            param,
            expected,
            found: values.len(),
        });
    }
    Ok(())
}

/// Errors from building models and scenarios.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A parameter vector does not cover every agent.
    LengthMismatch {
        /// Parameter name.
        param: &'static str,
        /// Number of agents.
        expected: usize,
        /// Length supplied.
        found: usize,
    },
    /// A parameter name that is not one of the model's.
    UnknownParam(String),
    /// A sweep that cannot be built.
    InvalidSweep(String),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::LengthMismatch {
                param,
                expected,
                found,
            } => write!(
                f,
                "parameter '{}' has {} values, expected one per agent ({})",
                param, found, expected
            ),
            ModelError::UnknownParam(name) => write!(f, "unknown parameter '{}'", name),
            ModelError::InvalidSweep(msg) => write!(f, "invalid sweep: {}", msg),
        }
    }
}

impl std::error::Error for ModelError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn asymmetric() -> SafetyRace {
        let production = ProductionFunction::new(
            vec![1.0, 2.0, 0.5],
            vec![0.5, 1.0, 1.5],
            vec![1.0, 0.8, 1.2],
            vec![1.0, 0.6, 0.9],
            vec![0.5, 1.0, 0.25],
        )
        .unwrap();
        SafetyRace::new(production, vec![0.5, 1.0, 0.0], vec![0.01, 0.02, 0.05]).unwrap()
    }

    #[test]
    fn test_production() {
        let production = ProductionFunction::default();
        let (s, p) = production.produce(&[1.0, 1.0], &[1.0, 2.0]);

        assert_eq!(p, vec![1.0, 2.0]);
        assert_eq!(s, vec![1.0, 0.5]);
    }

    #[test]
    fn test_payoff_by_hand() {
        let race = SafetyRace::default();
        let profile = StrategyProfile::new(vec![1.0, 1.0], vec![1.0, 2.0]);

        // S = 1/2 * 1/3 = 1/6, shares 1/3 and 2/3.
        assert!((race.payoff(0, &profile) - (1.0 / 18.0 - 0.02)).abs() < 1e-12);
        assert!((race.payoff(1, &profile) - (1.0 / 9.0 - 0.03)).abs() < 1e-12);
    }

    #[test]
    fn test_batch_payoffs_match_single() {
        let race = asymmetric();
        let profile = StrategyProfile::new(vec![0.3, 2.0, 5.0], vec![1.5, 0.7, 3.0]);
        let batch = race.payoffs(&profile);

        for (i, &u) in batch.iter().enumerate() {
            assert!((u - race.payoff(i, &profile)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_outcome() {
        let race = SafetyRace::default();
        let profile = StrategyProfile::new(vec![1.0, 1.0], vec![1.0, 2.0]);
        let outcome = race.outcome(&profile);

        assert_eq!(outcome.performance, vec![1.0, 2.0]);
        assert_eq!(outcome.safety, vec![1.0, 0.5]);
        assert!((outcome.total_safety - 1.0 / 6.0).abs() < 1e-12);
        assert_eq!(outcome.payoffs.len(), 2);
    }

    #[test]
    fn test_known_symmetric_equilibrium() {
        let race = SafetyRace::default();
        let xs = 200.0 / 27.0;
        let xp = 100.0 / 27.0;
        let eq = StrategyProfile::uniform(2, xs, xp);
        let u = race.payoff(0, &eq);

        assert!((u - 1.0 / 9.0).abs() < 1e-12);
        for (fs, fp) in [(1.01, 1.0), (0.99, 1.0), (1.0, 1.01), (1.0, 0.99), (0.95, 0.95)] {
            let deviation = StrategyProfile::new(vec![xs * fs, xs], vec![xp * fp, xp]);
            assert!(race.payoff(0, &deviation) < u);
        }
    }

    #[test]
    fn test_single_agent_prefers_shrinking() {
        let race = SafetyRace::symmetric(1);
        let large = StrategyProfile::new(vec![1.0], vec![0.01]);
        let small = StrategyProfile::new(vec![0.1], vec![0.001]);

        assert!(race.payoff(0, &small) > race.payoff(0, &large));
    }

    #[test]
    fn test_length_mismatch() {
        let err = ProductionFunction::new(
            vec![1.0, 1.0],
            vec![1.0, 1.0],
            vec![1.0],
            vec![1.0, 1.0],
            vec![1.0, 1.0],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ModelError::LengthMismatch {
                param: "b",
                expected: 2,
                found: 1
            }
        );

        let err = SafetyRace::new(ProductionFunction::symmetric(3), vec![0.0; 3], vec![0.01; 2])
            .unwrap_err();
        assert!(matches!(err, ModelError::LengthMismatch { param: "r", .. }));
        assert!(err.to_string().contains("'r'"));
    }
}
