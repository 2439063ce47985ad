//! Pure-strategy Nash equilibrium search by iterated best response.
//!
//! This module provides a generic solver that works with any model
//! implementing the `PayoffModel` trait.
//!
//! # Overview
//!
//! Each agent chooses a safety investment `xs` and a performance investment
//! `xp`, both strictly positive. The solver repeatedly lets every agent
//! maximise its own payoff with the others held fixed, until no agent's
//! safety investment moves by more than the relative tolerance.
//!
//! # Usage
//!
//! ```
//! use race_equilibrium::equilibrium::{BestResponseSolver, SolverConfig};
//! use race_equilibrium::models::SafetyRace;
//!
//! let config = SolverConfig::default().with_seed(42);
//! let mut solver = BestResponseSolver::new(SafetyRace::symmetric(2), config).unwrap();
//! let result = solver.solve().unwrap();
//!
//! println!("Xs = {:?}", result.profile.xs);
//! println!("payoffs = {:?}", result.outcome.payoffs);
//! ```

pub mod config;
pub mod model;
pub mod sampling;
pub mod solver;

pub use config::{inner_minimizer_defaults, SolverConfig};
pub use model::{total_safety, Outcome, PayoffModel, StrategyProfile};
pub use sampling::{from_log_space, random_profile, sample_log_normal, standard_normal, to_log_space};
pub use solver::{
    approx_equal, solve, BestResponse, BestResponseSolver, SolveError, SolveStats, SolverResult,
};
