//! Derivative-free minimization.
//!
//! This module provides a Nelder-Mead simplex minimizer for scalar functions
//! of a small number of continuous variables. It knows nothing about games:
//! the equilibrium solver uses it as a black box, once per agent per round.
//!
//! # Example
//!
//! ```
//! use race_equilibrium::optim::{minimize, NelderMeadConfig};
//!
//! let config = NelderMeadConfig::default();
//! let result = minimize(|x| (x[0] - 1.0).powi(2) + (x[1] + 2.0).powi(2), &[0.0, 0.0], &config)
//!     .expect("valid inputs");
//!
//! assert!(result.success);
//! assert!((result.x[0] - 1.0).abs() < 1e-3);
//! ```
//!
//! # Algorithm
//!
//! Each round evaluates every vertex, sorts them, then tries in order:
//!
//! ```text
//! reflected  = c + alpha * (c - worst)
//! expanded   = c + gamma * (reflected - c)      if reflected beats the best
//! contracted = c + rho   * (reflected - c)      if reflected beats the worst
//!            = c + rho   * (worst - c)          otherwise
//! shrink     : p <- best + sigma * (p - best)   if contraction fails
//! ```
//!
//! where `c` is the centroid of every vertex but the worst.

pub mod config;
pub mod nelder_mead;

pub use config::{ConfigError, NelderMeadConfig};
pub use nelder_mead::{minimize, sample_std_dev, MinimizeError, Minimum, Move, Simplex};
