//! Concrete payoff models for the equilibrium solver.
//!
//! ## Available Models
//!
//! - [`safety_race`]: the AI safety race, where agents trade off safety
//!   against performance under a shared disaster risk
//! - [`scenario`]: sweeps of one safety race parameter, solved in parallel
//!
//! ## Adding New Models
//!
//! Implement [`crate::equilibrium::PayoffModel`] and add tests that check
//! the payoff against hand-computed values.

pub mod safety_race;
pub mod scenario;

pub use safety_race::{ModelError, ProductionFunction, SafetyRace};
pub use scenario::{Param, RaceParams, RaceScalars, Scenario, SweepError};
