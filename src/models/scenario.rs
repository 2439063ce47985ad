//! Parameter sweeps over the safety race.
//!
//! A scenario holds one full parameter set per step. Exactly one parameter
//! varies between steps; the rest stay at their base values.

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::equilibrium::{solve, SolveError, SolverConfig, SolverResult};
use crate::models::safety_race::{ModelError, ProductionFunction, SafetyRace};

/// A model parameter that a scenario can vary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Param {
    /// Safety productivity.
    A,
    /// Returns to safety investment.
    Alpha,
    /// Performance productivity.
    B,
    /// Returns to performance investment.
    Beta,
    /// Safety penalty from performance.
    Theta,
    /// Disaster cost.
    D,
    /// Investment price.
    R,
}

impl Param {
    /// Every parameter, in model order.
    pub fn all() -> &'static [Param] {
        &[
            Param::A,
            Param::Alpha,
            Param::B,
            Param::Beta,
            Param::Theta,
            Param::D,
            Param::R,
        ]
    }

    /// Lowercase name, as used in JSON and on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Param::A => "a",
            Param::Alpha => "alpha",
            Param::B => "b",
            Param::Beta => "beta",
            Param::Theta => "theta",
            Param::D => "d",
            Param::R => "r",
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Param {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Param::all()
            .iter()
            .copied()
            .find(|p| p.name() == lower)
            .ok_or_else(|| ModelError::UnknownParam(s.to_string()))
    }
}

/// One value per parameter, shared by every agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceScalars {
    /// Safety productivity.
    pub a: f64,
    /// Returns to safety investment.
    pub alpha: f64,
    /// Performance productivity.
    pub b: f64,
    /// Returns to performance investment.
    pub beta: f64,
    /// Safety penalty from performance.
    pub theta: f64,
    /// Disaster cost.
    pub d: f64,
    /// Investment price.
    pub r: f64,
}

impl Default for RaceScalars {
    fn default() -> Self {
        Self {
            a: 1.0,
            alpha: 1.0,
            b: 1.0,
            beta: 1.0,
            theta: 1.0,
            d: 0.0,
            r: 0.01,
        }
    }
}

/// Full per-agent parameter set of a [`SafetyRace`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceParams {
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
    /// Disaster cost.
    pub d: Vec<f64>,
    /// Investment price.
    pub r: Vec<f64>,
}

impl RaceParams {
    /// Give all `n` agents the same scalars.
    pub fn broadcast(n: usize, scalars: &RaceScalars) -> Self {
        Self {
            a: vec![scalars.a; n],
            alpha: vec![scalars.alpha; n],
            b: vec![scalars.b; n],
            beta: vec![scalars.beta; n],
            theta: vec![scalars.theta; n],
            d: vec![scalars.d; n],
            r: vec![scalars.r; n],
        }
    }

    /// Number of agents, taken from `a`.
    pub fn num_agents(&self) -> usize {
        self.a.len()
    }

    /// Values of one parameter.
    pub fn get(&self, param: Param) -> &[f64] {
        match param {
            Param::A => &self.a,
            Param::Alpha => &self.alpha,
            Param::B => &self.b,
            Param::Beta => &self.beta,
            Param::Theta => &self.theta,
            Param::D => &self.d,
            Param::R => &self.r,
        }
    }

    fn get_mut(&mut self, param: Param) -> &mut Vec<f64> {
        match param {
            Param::A => &mut self.a,
            Param::Alpha => &mut self.alpha,
            Param::B => &mut self.b,
            Param::Beta => &mut self.beta,
            Param::Theta => &mut self.theta,
            Param::D => &mut self.d,
            Param::R => &mut self.r,
        }
    }

    /// Replace one parameter's values.
    pub fn set(&mut self, param: Param, values: Vec<f64>) {
        *self.get_mut(param) = values;
    }

    /// Build the model, checking every vector covers every agent.
    pub fn to_model(&self) -> Result<SafetyRace, ModelError> {
        let production = ProductionFunction::new(
            self.a.clone(),
            self.alpha.clone(),
            self.b.clone(),
            self.beta.clone(),
            self.theta.clone(),
        )?;
        SafetyRace::new(production, self.d.clone(), self.r.clone())
    }
}

impl Default for RaceParams {
    fn default() -> Self {
        Self::broadcast(2, &RaceScalars::default())
    }
}

/// A sweep of one parameter.
///
/// # Example
/// ```
/// use race_equilibrium::models::{Param, RaceParams, Scenario};
///
/// let scenario = Scenario::sweep(RaceParams::default(), Param::R, &[0.01], 4).unwrap();
///
/// assert_eq!(scenario.len(), 4);
/// assert!((scenario.params()[3].r[0] - 0.04).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    varying: Param,
    steps: Vec<RaceParams>,
}

impl Scenario {
    /// Vary `varying` as `base + k * step` for `k` in `0..steps`.
    ///
    /// `step` holds one increment per agent, or a single increment shared by
    /// all of them.
    pub fn sweep(
        base: RaceParams,
        varying: Param,
        step: &[f64],
        steps: usize,
    ) -> Result<Self, ModelError> {
        if steps == 0 {
            return Err(ModelError::InvalidSweep("at least one step is required".to_string()));
        }
        base.to_model()?;

        let n = base.num_agents();
        let step: Vec<f64> = match step.len() {
            1 => vec![step[0]; n],
            len if len == n => step.to_vec(),
            len => {
                return Err(ModelError::InvalidSweep(format!(
                    "step has {} values, expected 1 or {}",
                    len, n
                )))
            }
        };
        if step.iter().any(|s| !s.is_finite()) {
            return Err(ModelError::InvalidSweep("step must be finite".to_string()));
        }

        let start = base.get(varying).to_vec();
        let steps = (0..steps)
            .map(|k| {
                let mut params = base.clone();
                let values = start
                    .iter()
                    .zip(&step)
                    .map(|(v, s)| v + k as f64 * s)
                    .collect();
                params.set(varying, values);
                params
            })
            .collect();

        Ok(Self { varying, steps })
    }

    /// Give `varying` an explicit value list at each step.
    ///
    /// Each entry holds one value per agent, or a single value shared by all
    /// of them.
    pub fn from_values(
        base: RaceParams,
        varying: Param,
        values: Vec<Vec<f64>>,
    ) -> Result<Self, ModelError> {
        if values.is_empty() {
            return Err(ModelError::InvalidSweep("at least one step is required".to_string()));
        }
        base.to_model()?;

        let n = base.num_agents();
        let steps = values
            .into_iter()
            .enumerate()
            .map(|(k, v)| {
                let v = match v.len() {
                    1 => vec![v[0]; n],
                    len if len == n => v,
                    len => {
                        return Err(ModelError::InvalidSweep(format!(
                            "step {} has {} values, expected 1 or {}",
                            k, len, n
                        )))
                    }
                };
                if v.iter().any(|x| !x.is_finite()) {
                    return Err(ModelError::InvalidSweep(format!(
                        "step {} has a non-finite value",
                        k
                    )));
                }
                let mut params = base.clone();
                params.set(varying, v);
                Ok(params)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { varying, steps })
    }

    /// The parameter being swept.
    pub fn varying(&self) -> Param {
        self.varying
    }

    /// Parameter set of every step.
    pub fn params(&self) -> &[RaceParams] {
        &self.steps
    }

    /// Values of the swept parameter at every step.
    pub fn values(&self) -> Vec<&[f64]> {
        self.steps.iter().map(|p| p.get(self.varying)).collect()
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the scenario has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// One model per step.
    pub fn models(&self) -> Result<Vec<SafetyRace>, ModelError> {
        self.steps.iter().map(RaceParams::to_model).collect()
    }

    /// Solve every step in parallel. Results are in step order.
    ///
    /// With a seeded config, step `k` uses seed `seed + k`.
    pub fn solve_all(&self, config: &SolverConfig) -> Result<Vec<SolverResult>, SweepError> {
        self.solve_all_with(config, |_, _| {})
    }

    /// Like [`Scenario::solve_all`], calling `on_step` as each step finishes.
    ///
    /// `on_step` runs on worker threads, in completion order.
    pub fn solve_all_with<F>(
        &self,
        config: &SolverConfig,
        on_step: F,
    ) -> Result<Vec<SolverResult>, SweepError>
    where
        F: Fn(usize, &SolverResult) + Sync,
    {
        let models = self.models()?;
        tracing::info!(
            "Solving {} steps of '{}' on {} threads",
            models.len(),
            self.varying,
            rayon::current_num_threads()
        );

        models
            .into_par_iter()
            .enumerate()
            .map(|(k, model)| {
                let mut step_config = config.clone();
                step_config.seed = config.seed.map(|s| s.wrapping_add(k as u64));

                let result = solve(model, step_config)
                    .map_err(|source| SweepError::Solve { step: k, source })?;
                if !result.success {
                    tracing::warn!("Step {} did not reach an equilibrium", k);
                }
                on_step(k, &result);
                Ok(result)
            })
            .collect()
    }
}

/// Errors from solving a scenario.
#[derive(Debug, Clone, PartialEq)]
pub enum SweepError {
    /// A step's parameters do not form a valid model.
    Model(ModelError),
    /// The solver rejected a step.
    Solve {
        /// Step index.
        step: usize,
        /// Underlying error.
        source: SolveError,
    },
}

impl fmt::Display for SweepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepError::Model(err) => write!(f, "{}", err),
            SweepError::Solve { step, source } => write!(f, "step {}: {}", step, source),
        }
    }
}

impl std::error::Error for SweepError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SweepError::Model(err) => Some(err),
            SweepError::Solve { source, .. } => Some(source),
        }
    }
}

impl From<ModelError> for SweepError {
    fn from(err: ModelError) -> Self {
        SweepError::Model(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equilibrium::PayoffModel;

    #[test]
    fn test_param_names() {
        for &param in Param::all() {
            assert_eq!(param.name().parse::<Param>().unwrap(), param);
        }
        assert_eq!("Theta".parse::<Param>().unwrap(), Param::Theta);
        assert_eq!(
            "gamma".parse::<Param>(),
            Err(ModelError::UnknownParam("gamma".to_string()))
        );
        assert_eq!(serde_json::to_string(&Param::Alpha).unwrap(), "\"alpha\"");
    }

    #[test]
    fn test_broadcast() {
        let params = RaceParams::broadcast(3, &RaceScalars::default());

        assert_eq!(params.num_agents(), 3);
        assert_eq!(params.r, vec![0.01; 3]);
        assert_eq!(params.d, vec![0.0; 3]);
        assert_eq!(params.to_model().unwrap(), SafetyRace::symmetric(3));
    }

    #[test]
    fn test_scalars_partial_json() {
        let scalars: RaceScalars = serde_json::from_str(r#"{ "d": 0.5 }"#).unwrap();
        assert_eq!(scalars.d, 0.5);
        assert_eq!(scalars.r, 0.01);
    }

    #[test]
    fn test_sweep_shape() {
        let scenario = Scenario::sweep(RaceParams::default(), Param::D, &[0.1, 0.2], 3).unwrap();

        assert_eq!(scenario.varying(), Param::D);
        assert_eq!(scenario.len(), 3);
        let values = scenario.values();
        assert_eq!(values[0], &[0.0, 0.0]);
        assert!((values[2][0] - 0.2).abs() < 1e-12);
        assert!((values[2][1] - 0.4).abs() < 1e-12);
        for params in scenario.params() {
            assert_eq!(params.r, vec![0.01, 0.01]);
            assert_eq!(params.a, vec![1.0, 1.0]);
        }
    }

    #[test]
    fn test_sweep_rejects_bad_input() {
        let base = RaceParams::default();
        assert!(matches!(
            Scenario::sweep(base.clone(), Param::R, &[0.01], 0),
            Err(ModelError::InvalidSweep(_))
        ));
        assert!(matches!(
            Scenario::sweep(base.clone(), Param::R, &[0.01, 0.01, 0.01], 2),
            Err(ModelError::InvalidSweep(_))
        ));

        let mut ragged = base;
        ragged.theta = vec![1.0];
        assert!(matches!(
            Scenario::sweep(ragged, Param::R, &[0.01], 2),
            Err(ModelError::LengthMismatch { param: "theta", .. })
        ));
    }

    #[test]
    fn test_from_values() {
        let scenario = Scenario::from_values(
            RaceParams::default(),
            Param::R,
            vec![vec![0.01], vec![0.02, 0.05], vec![0.04]],
        )
        .unwrap();

        assert_eq!(scenario.len(), 3);
        let values = scenario.values();
        assert_eq!(values[0], &[0.01, 0.01]);
        assert_eq!(values[1], &[0.02, 0.05]);
        assert_eq!(values[2], &[0.04, 0.04]);
        assert_eq!(scenario.params()[1].d, vec![0.0, 0.0]);

        assert!(matches!(
            Scenario::from_values(RaceParams::default(), Param::R, vec![]),
            Err(ModelError::InvalidSweep(_))
        ));
        assert!(matches!(
            Scenario::from_values(RaceParams::default(), Param::D, vec![vec![0.0, 0.1, 0.2]]),
            Err(ModelError::InvalidSweep(_))
        ));
        assert!(matches!(
            Scenario::from_values(RaceParams::default(), Param::D, vec![vec![f64::NAN]]),
            Err(ModelError::InvalidSweep(_))
        ));
    }

    #[test]
    fn test_models() {
        let scenario = Scenario::sweep(RaceParams::default(), Param::A, &[1.0], 2).unwrap();
        let models = scenario.models().unwrap();

        assert_eq!(models.len(), 2);
        assert_eq!(models[1].production.a, vec![2.0, 2.0]);
        assert_eq!(models[1].num_agents(), 2);
    }

    #[test]
    fn test_solve_all_is_ordered_and_seeded() {
        let scenario = Scenario::sweep(RaceParams::default(), Param::R, &[0.01], 3).unwrap();
        let config = SolverConfig::default().with_seed(17);

        let sweep = scenario.solve_all(&config).unwrap();
        assert_eq!(sweep.len(), 3);

        for (k, result) in sweep.iter().enumerate() {
            let single = solve(
                scenario.params()[k].to_model().unwrap(),
                config.clone().with_seed(17 + k as u64),
            )
            .unwrap();
            assert_eq!(result.profile, single.profile);
            assert!(result.success);
        }

        // Dearer investment means less of it.
        assert!(sweep[2].profile.xs[0] < sweep[0].profile.xs[0]);
    }

    #[test]
    fn test_solve_all_reports_each_step() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let scenario = Scenario::sweep(RaceParams::default(), Param::D, &[0.5], 2).unwrap();
        let done = AtomicUsize::new(0);
        let config = SolverConfig::default().with_seed(4);

        scenario
            .solve_all_with(&config, |_, _| {
                done.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();

        assert_eq!(done.load(Ordering::Relaxed), 2);
    }
}
