//! Payoff model trait for the best-response solver.
//!
//! Any model that implements `PayoffModel` can be solved for an equilibrium.
//! The solver only ever asks for one agent's payoff at a time; the batch
//! `outcome` is used once, to package the final result.

use serde::{Deserialize, Serialize};

/// A joint strategy: one safety and one performance investment per agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyProfile {
    /// Safety investment per agent (`Xs`).
    pub xs: Vec<f64>,
    /// Performance investment per agent (`Xp`).
    pub xp: Vec<f64>,
}

impl StrategyProfile {
    /// Create a profile from the two investment vectors.
    pub fn new(xs: Vec<f64>, xp: Vec<f64>) -> Self {
        Self { xs, xp }
    }

    /// Profile where every agent invests `safety` and `performance`.
    pub fn uniform(n: usize, safety: f64, performance: f64) -> Self {
        Self {
            xs: vec![safety; n],
            xp: vec![performance; n],
        }
    }

    /// Number of agents covered by the profile.
    pub fn num_agents(&self) -> usize {
        self.xs.len()
    }

    /// Whether every investment is strictly positive and finite.
    pub fn is_positive(&self) -> bool {
        self.xs
            .iter()
            .chain(self.xp.iter())
            .all(|&x| x > 0.0 && x.is_finite())
    }
}

/// Summary of a joint strategy under a payoff model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Safety production per agent.
    pub safety: Vec<f64>,
    /// Performance production per agent.
    pub performance: Vec<f64>,
    /// Aggregate safety across agents.
    pub total_safety: f64,
    /// Payoff per agent.
    pub payoffs: Vec<f64>,
}

/// Trait for payoff models the equilibrium solver can work with.
///
/// # Example
/// ```
/// use race_equilibrium::equilibrium::{Outcome, PayoffModel, StrategyProfile};
///
/// /// Each agent earns sqrt(xs) + sqrt(xp) - xs - xp, independent of the others.
/// struct Separable;
///
/// impl PayoffModel for Separable {
///     fn num_agents(&self) -> usize {
///         1
///     }
///
///     fn payoff(&self, agent: usize, profile: &StrategyProfile) -> f64 {
///         let (s, p) = (profile.xs[agent], profile.xp[agent]);
///         s.sqrt() + p.sqrt() - s - p
///     }
///
///     fn outcome(&self, profile: &StrategyProfile) -> Outcome {
///         Outcome {
///             safety: profile.xs.clone(),
///             performance: profile.xp.clone(),
///             total_safety: 0.0,
///             payoffs: vec![self.payoff(0, profile)],
///         }
///     }
/// }
///
/// let profile = StrategyProfile::uniform(1, 0.25, 0.25);
/// assert_eq!(Separable.payoff(0, &profile), 0.5);
/// ```
pub trait PayoffModel {
    /// Number of agents in the game.
    fn num_agents(&self) -> usize;

    /// Payoff of `agent` given the full joint strategy.
    ///
    /// Called many times per solve; should be pure.
    fn payoff(&self, agent: usize, profile: &StrategyProfile) -> f64;

    /// Production, safety and payoff summary for a joint strategy.
    fn outcome(&self, profile: &StrategyProfile) -> Outcome;
}

impl<M: PayoffModel + ?Sized> PayoffModel for &M {
    fn num_agents(&self) -> usize {
        (**self).num_agents()
    }

    fn payoff(&self, agent: usize, profile: &StrategyProfile) -> f64 {
        (**self).payoff(agent, profile)
    }

    fn outcome(&self, profile: &StrategyProfile) -> Outcome {
        (**self).outcome(profile)
    }
}

/// Probability that no agent causes a disaster: `prod s_i / (1 + s_i)`.
pub fn total_safety(safety: &[f64]) -> f64 {
    safety.iter().map(|s| s / (1.0 + s)).product()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_safety() {
        assert_eq!(total_safety(&[1.0, 1.0]), 0.25);
        assert_eq!(total_safety(&[3.0]), 0.75);
        assert_eq!(total_safety(&[]), 1.0);
        assert_eq!(total_safety(&[0.0, 5.0]), 0.0);
    }

    #[test]
    fn test_profile_positivity() {
        assert!(StrategyProfile::uniform(3, 1.0, 2.0).is_positive());
        assert!(!StrategyProfile::new(vec![1.0, 0.0], vec![1.0, 1.0]).is_positive());
        assert!(!StrategyProfile::new(vec![1.0], vec![f64::INFINITY]).is_positive());
        assert_eq!(StrategyProfile::uniform(4, 1.0, 1.0).num_agents(), 4);
    }
}
