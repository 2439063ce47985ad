//! # Race Equilibrium
//!
//! Pure-strategy Nash equilibria of continuous investment games, found by
//! iterated best response with a derivative-free inner search.
//!
//! ## Features
//!
//! - **Generic Solver**: Works with any model implementing the `PayoffModel` trait
//! - **Nelder-Mead**: Self-contained simplex minimizer, no gradients needed
//! - **Reproducible**: Every random draw comes from an explicitly seeded RNG
//! - **Parameter Sweeps**: Solve a family of models in parallel
//!
//! ## Quick Start
//!
//! ```
//! use race_equilibrium::{solve, SafetyRace, SolverConfig};
//!
//! let result = solve(SafetyRace::symmetric(2), SolverConfig::default().with_seed(0)).unwrap();
//!
//! if result.success {
//!     println!("Xs = {:?}, Xp = {:?}", result.profile.xs, result.profile.xp);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`optim`]: Nelder-Mead minimizer
//! - [`equilibrium`]: Best-response solver
//! - [`models`]: The safety race model and parameter sweeps
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 Best-Response Solver (Generic)                  │
//! │  - Gauss-Seidel rounds    - Relative convergence test           │
//! │  - Log-space search       - Seeded random restarts              │
//! └─────────────────────────────────────────────────────────────────┘
//!                │                                 │
//!                │ one call per agent per round    │ implements PayoffModel
//!                ▼                                 ▼
//!        ┌───────────────┐                 ┌───────────────┐
//!        │  Nelder-Mead  │                 │  Safety Race  │
//!        └───────────────┘                 └───────────────┘
//! ```

#![warn(missing_docs)]

/// Derivative-free minimization.
pub mod optim;

/// Best-response equilibrium solver.
///
/// Generic over the payoff model.
pub mod equilibrium;

/// Concrete payoff models.
pub mod models;

// Re-export commonly used types at crate root for convenience
pub use equilibrium::{
    solve, BestResponseSolver, Outcome, PayoffModel, SolveError, SolveStats, SolverConfig,
    SolverResult, StrategyProfile,
};
pub use models::{Param, RaceParams, SafetyRace, Scenario};
pub use optim::{minimize, Minimum, NelderMeadConfig};
