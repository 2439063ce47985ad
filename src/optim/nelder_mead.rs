//! Nelder-Mead simplex search.
//!
//! Derivative-free minimization of a scalar function over a handful of
//! continuous variables. The search keeps `d + 1` vertices, ordered best to
//! worst after every evaluation pass, and replaces the worst vertex by
//! reflection, expansion or contraction, or shrinks the whole simplex toward
//! the best vertex.
//!
//! Convergence is declared when the sample standard deviation of the vertex
//! values drops below the configured tolerance. Running out of iterations is
//! not an error: the best vertex is still returned, with `success = false`.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::optim::config::{ConfigError, NelderMeadConfig};

/// Outcome of one `minimize` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Minimum {
    /// Best point found.
    pub x: Vec<f64>,
    /// Objective value at `x`.
    pub fx: f64,
    /// Number of rounds used (`max_iterations` when not converged).
    pub iterations: usize,
    /// Whether the convergence test was met within the budget.
    pub success: bool,
}

/// The operation applied to the simplex by one [`Simplex::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// Worst vertex replaced by its reflection through the centroid.
    Reflection,
    /// Worst vertex replaced by the expanded point.
    Expansion,
    /// Worst vertex replaced by a point between the centroid and the reflection.
    OutsideContraction,
    /// Worst vertex replaced by a point between the centroid and itself.
    InsideContraction,
    /// Every vertex but the best pulled toward the best.
    Shrink,
}

/// A simplex of `d + 1` vertices in `d` dimensions, with their objective values.
///
/// `values` are only meaningful after [`Simplex::order`]; a shrink step
/// invalidates the values of every moved vertex.
#[derive(Debug, Clone)]
pub struct Simplex {
    points: Vec<Vec<f64>>,
    values: Vec<f64>,
}

impl Simplex {
    /// Start at `x0` and step `size` along each coordinate axis.
    pub fn orthogonal(x0: &[f64], size: f64) -> Result<Self, MinimizeError> {
        if x0.is_empty() {
            return Err(MinimizeError::EmptyPoint);
        }

        let mut points = Vec::with_capacity(x0.len() + 1);
        points.push(x0.to_vec());
        for i in 0..x0.len() {
            let mut vertex = x0.to_vec();
            vertex[i] += size;
            points.push(vertex);
        }

        Ok(Self::unevaluated(points))
    }

    /// Build a simplex from explicit vertices.
    ///
    /// Requires `d + 1` vertices of equal length `d >= 1`.
    pub fn from_points(points: Vec<Vec<f64>>) -> Result<Self, MinimizeError> {
        let dim = points.first().map(Vec::len).unwrap_or(0);
        if dim == 0 {
            return Err(MinimizeError::EmptyPoint);
        }
        if points.len() != dim + 1 {
            return Err(MinimizeError::MalformedSimplex(format!(
                "expected {} vertices in {} dimensions, found {}",
                dim + 1,
                dim,
                points.len()
            )));
        }
        if let Some(bad) = points.iter().find(|p| p.len() != dim) {
            return Err(MinimizeError::MalformedSimplex(format!(
                "vertex of length {} in a {}-dimensional simplex",
                bad.len(),
                dim
            )));
        }

        Ok(Self::unevaluated(points))
    }

    fn unevaluated(points: Vec<Vec<f64>>) -> Self {
        let values = vec![f64::NAN; points.len()];
        Self { points, values }
    }

    /// Number of coordinates per vertex.
    pub fn dimension(&self) -> usize {
        self.points.len() - 1
    }

    /// Vertices, best first after [`Simplex::order`].
    pub fn points(&self) -> &[Vec<f64>] {
        &self.points
    }

    /// Objective values matching [`Simplex::points`].
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The best vertex and its value.
    pub fn best(&self) -> (&[f64], f64) {
        (&self.points[0], self.values[0])
    }

    /// Evaluate `f` at every vertex and sort ascending by value.
    ///
    /// The sort is stable. NaN values rank after every number.
    pub fn order<F>(&mut self, f: &mut F)
    where
        F: FnMut(&[f64]) -> f64,
    {
        let mut ranked: Vec<(Vec<f64>, f64)> = self
            .points
            .drain(..)
            .map(|p| {
                let v = f(&p);
                (p, v)
            })
            .collect();
        ranked.sort_by(|a, b| rank(a.1, b.1));

        self.values.clear();
        for (p, v) in ranked {
            self.points.push(p);
            self.values.push(v);
        }
    }

    /// Sample standard deviation of the vertex values.
    pub fn spread(&self) -> f64 {
        sample_std_dev(&self.values)
    }

    /// Centroid of every vertex except the worst.
    pub fn centroid(&self) -> Vec<f64> {
        let d = self.dimension();
        (0..d)
            .map(|i| {
                let sum: f64 = self.points[..d].iter().map(|p| p[i]).sum();
                sum / d as f64
            })
            .collect()
    }

    /// Apply one Nelder-Mead move to an ordered simplex.
    ///
    /// Only the worst vertex is replaced, except on a shrink.
    pub fn step<F>(&mut self, f: &mut F, config: &NelderMeadConfig) -> Move
    where
        F: FnMut(&[f64]) -> f64,
    {
        let d = self.dimension();
        let best = self.values[0];
        let second_worst = self.values[d - 1];
        let worst = self.values[d];

        let centroid = self.centroid();
        let reflected = reflect(&centroid, &self.points[d], config.alpha);
        let f_reflected = f(&reflected);

        if f_reflected >= best && f_reflected < second_worst {
            self.replace_worst(reflected, f_reflected);
            return Move::Reflection;
        }

        if f_reflected < best {
            let expanded = towards(&centroid, &reflected, config.gamma);
            let f_expanded = f(&expanded);
            if f_expanded < f_reflected {
                self.replace_worst(expanded, f_expanded);
                return Move::Expansion;
            }
            self.replace_worst(reflected, f_reflected);
            return Move::Reflection;
        }

        if f_reflected < worst {
            let contracted = towards(&centroid, &reflected, config.rho);
            let f_contracted = f(&contracted);
            if f_contracted < f_reflected {
                self.replace_worst(contracted, f_contracted);
                return Move::OutsideContraction;
            }
        } else {
            let contracted = towards(&centroid, &self.points[d], config.rho);
            let f_contracted = f(&contracted);
            if f_contracted < worst {
                self.replace_worst(contracted, f_contracted);
                return Move::InsideContraction;
            }
        }

        self.shrink(config.sigma);
        Move::Shrink
    }

    fn replace_worst(&mut self, point: Vec<f64>, value: f64) {
        let d = self.dimension();
        self.points[d] = point;
        self.values[d] = value;
    }

    fn shrink(&mut self, sigma: f64) {
        let (best, rest) = self.points.split_at_mut(1);
        let best = &best[0];
        for vertex in rest.iter_mut() {
            for (x, b) in vertex.iter_mut().zip(best) {
                *x = b + sigma * (*x - b);
            }
        }
        for v in self.values.iter_mut().skip(1) {
            *v = f64::NAN;
        }
    }
}

/// Minimize `f` starting from `x0`.
///
/// `x0` is borrowed and never modified. The search is deterministic for a
/// deterministic `f`.
///
/// # Errors
/// Returns [`MinimizeError::EmptyPoint`] for a zero-dimensional start and
/// [`MinimizeError::Config`] for an invalid configuration. Failing to
/// converge is reported through [`Minimum::success`], not as an error.
///
/// # Example
/// ```
/// use race_equilibrium::optim::{minimize, NelderMeadConfig};
///
/// let min = minimize(|x| x[0] * x[0] + x[1] * x[1], &[1.0, 1.0], &NelderMeadConfig::default())
///     .unwrap();
/// assert!(min.success);
/// assert!(min.fx < 1e-8);
/// ```
pub fn minimize<F>(
    mut f: F,
    x0: &[f64],
    config: &NelderMeadConfig,
) -> Result<Minimum, MinimizeError>
where
    F: FnMut(&[f64]) -> f64,
{
    config.validate()?;
    let mut simplex = Simplex::orthogonal(x0, config.init_simplex_size)?;

    for iteration in 0..config.max_iterations {
        simplex.order(&mut f);
        if simplex.spread() < config.tolerance {
            let (x, fx) = simplex.best();
            return Ok(Minimum {
                x: x.to_vec(),
                fx,
                iterations: iteration,
                success: true,
            });
        }
        simplex.step(&mut f, config);
    }

    // The last move may have produced a new best vertex.
    simplex.order(&mut f);
    let (x, fx) = simplex.best();
    tracing::debug!(
        "Nelder-Mead did not converge in {} iterations (spread {:e}, best {:e})",
        config.max_iterations,
        simplex.spread(),
        fx
    );

    Ok(Minimum {
        x: x.to_vec(),
        fx,
        iterations: config.max_iterations,
        success: false,
    })
}

/// Unbiased sample standard deviation of `values`.
///
/// Computed as `sqrt(sum(v^2) / (n - 1) - sum(v)^2 / (n * (n - 1)))`. Rounding
/// can push the radicand slightly below zero, which yields NaN and never
/// passes a `< tolerance` test.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mut squared_sum = 0.0;
    let mut sum = 0.0;
    for &v in values {
        squared_sum += v * v;
        sum += v;
    }
    (squared_sum / (n - 1.0) - sum * sum / (n * (n - 1.0))).sqrt()
}

fn rank(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b)
        .unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}

fn reflect(centroid: &[f64], worst: &[f64], alpha: f64) -> Vec<f64> {
    centroid
        .iter()
        .zip(worst)
        .map(|(c, w)| c + alpha * (c - w))
        .collect()
}

/// `centroid + t * (other - centroid)`
fn towards(centroid: &[f64], other: &[f64], t: f64) -> Vec<f64> {
    centroid
        .iter()
        .zip(other)
        .map(|(c, o)| c + t * (o - c))
        .collect()
}

/// Errors returned by [`minimize`] and simplex construction.
#[derive(Debug, Clone, PartialEq)]
pub enum MinimizeError {
    /// The starting point has no coordinates.
    EmptyPoint,
    /// Explicit simplex vertices do not form a `d + 1` by `d` simplex.
    MalformedSimplex(String),
    /// The configuration failed validation.
    Config(ConfigError),
}

impl std::fmt::Display for MinimizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MinimizeError::EmptyPoint => write!(f, "cannot minimize over zero dimensions"),
            MinimizeError::MalformedSimplex(msg) => write!(f, "malformed simplex: {}", msg),
            MinimizeError::Config(err) => write!(f, "invalid minimizer config: {}", err),
        }
    }
}

impl std::error::Error for MinimizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MinimizeError::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for MinimizeError {
    fn from(err: ConfigError) -> Self {
        MinimizeError::Config(err)
    }
}
