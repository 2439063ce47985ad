//! Random initialisation and log-space reparameterisation.
//!
//! Investments must stay strictly positive. The solver draws its starting
//! profile from a log-normal distribution and lets the minimizer search over
//! `log` investments, exponentiating before every payoff evaluation, so no
//! explicit constraint is ever needed.

use std::f64::consts::PI;

use rand::Rng;

use crate::equilibrium::model::StrategyProfile;

/// Draw one standard normal variate with the Box-Muller transform.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let mut u = 0.0;
    while u == 0.0 {
        u = rng.gen::<f64>();
    }
    let mut v = 0.0;
    while v == 0.0 {
        v = rng.gen::<f64>();
    }
    (-2.0 * u.ln()).sqrt() * (2.0 * PI * v).cos()
}

/// Draw `n` values `exp(mu + sigma * z)` with `z ~ N(0, 1)`.
pub fn sample_log_normal<R: Rng + ?Sized>(rng: &mut R, n: usize, mu: f64, sigma: f64) -> Vec<f64> {
    (0..n)
        .map(|_| (mu + sigma * standard_normal(rng)).exp())
        .collect()
}

/// Random strictly positive starting profile; `xs` is drawn before `xp`.
pub fn random_profile<R: Rng + ?Sized>(rng: &mut R, n: usize, mu: f64, sigma: f64) -> StrategyProfile {
    let xs = sample_log_normal(rng, n, mu, sigma);
    let xp = sample_log_normal(rng, n, mu, sigma);
    StrategyProfile::new(xs, xp)
}

/// Map positive values to the unconstrained search space.
pub fn to_log_space(x: &[f64]) -> Vec<f64> {
    x.iter().map(|v| v.ln()).collect()
}

/// Inverse of [`to_log_space`].
pub fn from_log_space(y: &[f64]) -> Vec<f64> {
    y.iter().map(|v| v.exp()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_standard_normal_moments() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 20_000;
        let draws: Vec<f64> = (0..n).map(|_| standard_normal(&mut rng)).collect();

        let mean = draws.iter().sum::<f64>() / n as f64;
        let var = draws.iter().map(|z| (z - mean).powi(2)).sum::<f64>() / (n - 1) as f64;

        assert!(mean.abs() < 0.05, "mean = {}", mean);
        assert!((var - 1.0).abs() < 0.05, "var = {}", var);
        assert!(draws.iter().all(|z| z.is_finite()));
    }

    #[test]
    fn test_log_normal_is_positive_and_seeded() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);

        let xs = sample_log_normal(&mut a, 50, 0.0, 1.0);
        let ys = sample_log_normal(&mut b, 50, 0.0, 1.0);

        assert_eq!(xs, ys);
        assert!(xs.iter().all(|&x| x > 0.0));
    }

    #[test]
    fn test_log_normal_without_spread() {
        let mut rng = StdRng::seed_from_u64(1);
        let xs = sample_log_normal(&mut rng, 3, 1.0, 0.0);
        assert_eq!(xs, vec![std::f64::consts::E; 3]);
    }

    #[test]
    fn test_random_profile_shape() {
        let mut rng = StdRng::seed_from_u64(3);
        let profile = random_profile(&mut rng, 4, 0.0, 1.0);

        assert_eq!(profile.num_agents(), 4);
        assert_eq!(profile.xp.len(), 4);
        assert!(profile.is_positive());
    }

    #[test]
    fn test_log_space_round_trip() {
        let x = vec![1e-6, 0.37, 1.0, 42.0, 3.5e7];
        let back = from_log_space(&to_log_space(&x));

        for (a, b) in x.iter().zip(&back) {
            assert!((a - b).abs() <= 1e-12 * a, "{} vs {}", a, b);
        }
    }
}
