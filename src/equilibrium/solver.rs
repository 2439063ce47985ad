//! Best-response fixed-point solver.
//!
//! Each outer round visits the agents in index order. Agent `i` re-optimises
//! its own `(safety, performance)` pair with everyone else held fixed, by
//! running Nelder-Mead over `(log safety, log performance)` on its negated
//! payoff. Agents later in the order already see the new choices of the
//! agents before them in the same round.
//!
//! A round whose safety investments match the previous round's, component by
//! component within the relative tolerance, is the fixed point. Performance
//! investments are not compared. When an attempt runs out of rounds, the
//! solver restarts from a fresh random profile until the retry budget is
//! spent, then returns the last profile with `success = false`.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::equilibrium::config::SolverConfig;
use crate::equilibrium::model::{Outcome, PayoffModel, StrategyProfile};
use crate::equilibrium::sampling::random_profile;
use crate::optim::{minimize, MinimizeError};

/// Guard added to the denominator of the relative-change test.
pub const RELATIVE_EPS: f64 = 1e-8;

/// The best-response equilibrium solver.
///
/// # Type Parameters
/// - `M`: The payoff model implementing [`PayoffModel`]
///
/// # Example
/// ```
/// use race_equilibrium::equilibrium::{BestResponseSolver, SolverConfig};
/// use race_equilibrium::models::SafetyRace;
///
/// let model = SafetyRace::symmetric(2);
/// let mut solver = BestResponseSolver::new(model, SolverConfig::default().with_seed(3)).unwrap();
/// let result = solver.solve().unwrap();
///
/// assert!(result.success);
/// assert_eq!(result.profile.xs.len(), 2);
/// ```
pub struct BestResponseSolver<M: PayoffModel> {
    /// The model being solved.
    model: M,

    /// Configuration for the solver.
    config: SolverConfig,

    /// Random number generator for initial profiles.
    rng: StdRng,
}

impl<M: PayoffModel> BestResponseSolver<M> {
    /// Create a new solver for the given model.
    ///
    /// # Errors
    /// Fails if the model has no agents or the configuration is invalid.
    pub fn new(model: M, config: SolverConfig) -> Result<Self, SolveError> {
        config.validate()?;
        if model.num_agents() == 0 {
            return Err(SolveError::NoAgents);
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self { model, config, rng })
    }

    /// Run the solver from random starting profiles, retrying on failure.
    pub fn solve(&mut self) -> Result<SolverResult, SolveError> {
        let start = Instant::now();
        let n = self.model.num_agents();
        let mut stats = SolveStats::default();
        let mut attempt = 0;

        loop {
            stats.attempts = attempt + 1;
            let initial = random_profile(
                &mut self.rng,
                n,
                self.config.init_mu,
                self.config.init_sigma,
            );

            let (profile, converged) = self.run_attempt(initial, &mut stats)?;

            if converged {
                tracing::info!(
                    "Equilibrium found after {} rounds (attempt {})",
                    stats.rounds,
                    stats.attempts
                );
                return Ok(self.package(profile, true, stats, start));
            }

            if attempt == self.config.retries {
                tracing::warn!(
                    "No equilibrium after {} attempts of {} rounds; returning best effort",
                    stats.attempts,
                    self.config.max_iters
                );
                return Ok(self.package(profile, false, stats, start));
            }

            attempt += 1;
            tracing::warn!(
                "Attempt {} did not converge in {} rounds, restarting ({} retries left after this one)",
                attempt,
                self.config.max_iters,
                self.config.retries - attempt
            );
        }
    }

    /// Run a single attempt from a given profile, without retries.
    ///
    /// # Errors
    /// Fails if the profile does not cover every agent or has a
    /// non-positive or non-finite investment.
    pub fn solve_from(&self, initial: StrategyProfile) -> Result<SolverResult, SolveError> {
        self.check_profile(&initial)?;

        let start = Instant::now();
        let mut stats = SolveStats {
            attempts: 1,
            ..Default::default()
        };
        let (profile, converged) = self.run_attempt(initial, &mut stats)?;
        Ok(self.package(profile, converged, stats, start))
    }

    /// Best response of `agent` with every other agent held at `profile`.
    ///
    /// # Errors
    /// Fails if `agent` is out of range or `profile` is rejected as in
    /// [`BestResponseSolver::solve_from`].
    pub fn best_response(
        &self,
        agent: usize,
        profile: &StrategyProfile,
    ) -> Result<BestResponse, SolveError> {
        let n = self.model.num_agents();
        if agent >= n {
            return Err(SolveError::AgentOutOfRange { agent, num_agents: n });
        }
        self.check_profile(profile)?;
        self.respond(agent, profile)
    }

    fn respond(&self, agent: usize, profile: &StrategyProfile) -> Result<BestResponse, SolveError> {
        let model = &self.model;
        let objective = |y: &[f64]| {
            let mut trial = profile.clone();
            trial.xs[agent] = y[0].exp();
            trial.xp[agent] = y[1].exp();
            -model.payoff(agent, &trial)
        };
        let x0 = [profile.xs[agent].ln(), profile.xp[agent].ln()];

        let min = minimize(objective, &x0, &self.config.minimizer)?;

        Ok(BestResponse {
            safety: min.x[0].exp(),
            performance: min.x[1].exp(),
            payoff: -min.fx,
            iterations: min.iterations,
            converged: min.success,
        })
    }

    /// One outer round: every agent best-responds in index order.
    pub fn best_response_round(
        &self,
        profile: &StrategyProfile,
    ) -> Result<StrategyProfile, SolveError> {
        self.check_profile(profile)?;
        self.round(profile, &mut SolveStats::default())
    }

    fn check_profile(&self, profile: &StrategyProfile) -> Result<(), SolveError> {
        let n = self.model.num_agents();
        if profile.xs.len() != n || profile.xp.len() != n {
            return Err(SolveError::InvalidProfile(format!(
                "expected {} agents, got {} safety and {} performance entries",
                n,
                profile.xs.len(),
                profile.xp.len()
            )));
        }
        if !profile.is_positive() {
            return Err(SolveError::InvalidProfile(
                "investments must be positive and finite".to_string(),
            ));
        }
        Ok(())
    }

    fn round(
        &self,
        previous: &StrategyProfile,
        stats: &mut SolveStats,
    ) -> Result<StrategyProfile, SolveError> {
        let mut next = previous.clone();

        for agent in 0..self.model.num_agents() {
            let response = self.respond(agent, &next)?;
            stats.inner_calls += 1;
            if !response.converged {
                stats.inner_failures += 1;
            }
            next.xs[agent] = response.safety;
            next.xp[agent] = response.performance;
        }

        Ok(next)
    }

    fn run_attempt(
        &self,
        initial: StrategyProfile,
        stats: &mut SolveStats,
    ) -> Result<(StrategyProfile, bool), SolveError> {
        let mut current = initial;
        stats.rounds = 0;

        for round in 0..self.config.max_iters {
            let next = self.round(&current, stats)?;
            stats.rounds = round + 1;
            stats.total_rounds += 1;

            tracing::debug!(
                "Round {}: max relative change in safety {:e}",
                round,
                max_relative_change(&next.xs, &current.xs)
            );

            if approx_equal(&next.xs, &current.xs, self.config.tol) {
                return Ok((next, true));
            }
            current = next;
        }

        Ok((current, false))
    }

    fn package(
        &self,
        profile: StrategyProfile,
        success: bool,
        mut stats: SolveStats,
        start: Instant,
    ) -> SolverResult {
        stats.elapsed_seconds = start.elapsed().as_secs_f64();
        let outcome = self.model.outcome(&profile);
        SolverResult {
            success,
            profile,
            outcome,
            stats,
        }
    }

    /// Get reference to the model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
}

/// Solve `model` with a fresh solver.
///
/// # Example
/// ```
/// use race_equilibrium::equilibrium::{solve, SolverConfig};
/// use race_equilibrium::models::SafetyRace;
///
/// let result = solve(SafetyRace::symmetric(3), SolverConfig::default().with_seed(1)).unwrap();
/// println!("total safety: {:.4}", result.outcome.total_safety);
/// ```
pub fn solve<M: PayoffModel>(model: M, config: SolverConfig) -> Result<SolverResult, SolveError> {
    BestResponseSolver::new(model, config)?.solve()
}

/// Whether `x` and `y` agree componentwise to relative tolerance `tol`.
///
/// The difference is measured relative to `y + RELATIVE_EPS`. Vectors of
/// different length never agree; a NaN difference never agrees.
pub fn approx_equal(x: &[f64], y: &[f64], tol: f64) -> bool {
    if x.len() != y.len() {
        return false;
    }
    x.iter()
        .zip(y)
        .all(|(new, old)| (new - old).abs() / (old + RELATIVE_EPS) <= tol)
}

fn max_relative_change(x: &[f64], y: &[f64]) -> f64 {
    x.iter()
        .zip(y)
        .map(|(new, old)| (new - old).abs() / (old + RELATIVE_EPS))
        .fold(0.0, f64::max)
}

/// One agent's best response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestResponse {
    /// Optimal safety investment.
    pub safety: f64,
    /// Optimal performance investment.
    pub performance: f64,
    /// Payoff at the optimum.
    pub payoff: f64,
    /// Minimizer rounds used.
    pub iterations: usize,
    /// Whether the minimizer met its tolerance.
    pub converged: bool,
}

/// Statistics tracked during a solve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveStats {
    /// Outer rounds used by the final attempt.
    pub rounds: usize,
    /// Outer rounds used across all attempts.
    pub total_rounds: usize,
    /// Attempts made, including the first.
    pub attempts: usize,
    /// Minimizer calls made.
    pub inner_calls: usize,
    /// Minimizer calls that hit their iteration budget.
    pub inner_failures: usize,
    /// Wall time in seconds.
    pub elapsed_seconds: f64,
}

/// Result of a solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverResult {
    /// Whether a fixed point was reached.
    ///
    /// When `false`, `profile` is the last computed profile and carries no
    /// equilibrium guarantee.
    pub success: bool,
    /// The joint strategy.
    pub profile: StrategyProfile,
    /// Production, safety and payoffs at `profile`.
    pub outcome: Outcome,
    /// Solve statistics.
    pub stats: SolveStats,
}

/// Errors that can occur when constructing or running the solver.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveError {
    /// The model has no agents.
    NoAgents,
    /// An agent index past the end of the model.
    AgentOutOfRange {
        /// Requested agent.
        agent: usize,
        /// Agents in the model.
        num_agents: usize,
    },
    /// A configuration field failed validation.
    InvalidConfig {
        /// Field name.
        field: String,
        /// What is wrong with it.
        message: String,
    },
    /// A starting profile is malformed.
    InvalidProfile(String),
    /// The minimizer rejected its input.
    Minimizer(MinimizeError),
    /// Reading a configuration file failed.
    Io(String),
    /// Parsing a configuration failed.
    Parse(String),
}

impl std::fmt::Display for SolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveError::NoAgents => write!(f, "model has no agents"),
            SolveError::AgentOutOfRange { agent, num_agents } => {
                write!(f, "agent {} out of range for {} agents", agent, num_agents)
            }
            SolveError::InvalidConfig { field, message } => {
                write!(f, "invalid value for '{}': {}", field, message)
            }
            SolveError::InvalidProfile(msg) => write!(f, "invalid profile: {}", msg),
            SolveError::Minimizer(err) => write!(f, "minimizer error: {}", err),
            SolveError::Io(msg) => write!(f, "IO error: {}", msg),
            SolveError::Parse(msg) => write!(f, "parse error: {}", msg),
        }
    }
}

impl std::error::Error for SolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SolveError::Minimizer(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MinimizeError> for SolveError {
    fn from(err: MinimizeError) -> Self {
        SolveError::Minimizer(err)
    }
}
