//! Derivative-free optimisers.

use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

use anyhow::bail;
use serde::{Deserialize, Serialize};
use tracing::trace;

#[derive(Clone, Debug)]
pub struct UnivariateDescentConfig {
    pub init_value: f64,
    pub init_step: f64,
    pub min_step: f64,
    pub max_steps: u64,
    pub acceptable_residual: f64,
}
impl UnivariateDescentConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.init_step == 0.0 || !self.init_step.is_finite() {
            bail!("initial step must be finite and non-zero")
        }
        if self.min_step <= 0.0 {
            bail!("min step must be positive")
        }
        if self.acceptable_residual.is_nan() {
            bail!("acceptable residual cannot be NaN")
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct UnivariateDescentOutcome {
    pub steps: u64,
    pub optimal_value: f64,
    pub optimal_residual: f64,
}

/// Univariate, derivative-free search. Walks in the direction of the initial step while the
/// residual keeps falling; on overshoot, reverses and halves the step until it drops below
/// `min_step`.
pub fn univariate_descent(
    config: &UnivariateDescentConfig,
    mut loss_f: impl FnMut(f64) -> f64,
) -> UnivariateDescentOutcome {
    config.validate().unwrap();

    let mut steps = 0;
    let mut residual = loss_f(config.init_value);
    if residual <= config.acceptable_residual {
        return UnivariateDescentOutcome {
            steps: 0,
            optimal_value: config.init_value,
            optimal_residual: residual,
        };
    }

    let (mut value, mut step) = (config.init_value, config.init_step);
    let (mut optimal_value, mut optimal_residual) = (value, residual);
    while steps < config.max_steps {
        steps += 1;
        let new_value = value + step;
        let new_residual = loss_f(new_value);

        if new_residual > residual || new_residual.is_nan() {
            step = -step * 0.5;
            if step.abs() < config.min_step {
                break;
            }
        } else if new_residual < optimal_residual {
            optimal_residual = new_residual;
            optimal_value = new_value;

            if optimal_residual <= config.acceptable_residual {
                break;
            }
        }
        if !new_residual.is_nan() {
            residual = new_residual;
            value = new_value;
        }
    }
    UnivariateDescentOutcome {
        steps,
        optimal_value,
        optimal_residual,
    }
}

#[derive(Clone, Debug)]
pub struct HypergridSearchConfig {
    pub max_steps: u64,
    pub acceptable_residual: f64,
    pub bounds: Vec<RangeInclusive<f64>>,
    pub resolution: usize,
}
impl HypergridSearchConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_steps == 0 {
            bail!("at least one step must be specified")
        }
        if self.acceptable_residual < 0.0 {
            bail!("acceptable residual must be non-negative")
        }
        if self.bounds.is_empty() {
            bail!("at least one search dimension must be specified")
        }
        const MIN_RESOLUTION: usize = 3;
        if self.resolution < MIN_RESOLUTION {
            bail!("search resolution must be at least {MIN_RESOLUTION}")
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct HypergridSearchOutcome {
    pub steps: u64,
    pub optimal_values: Vec<f64>,
    pub optimal_residual: f64,
}

/// Evaluates the loss over an evenly spaced grid spanning `bounds`, then repeatedly narrows
/// the grid around the best point found so far. Points failing `constraint_f` are skipped.
pub fn hypergrid_search(
    config: &HypergridSearchConfig,
    mut constraint_f: impl FnMut(&[f64]) -> bool,
    mut loss_f: impl FnMut(&[f64]) -> f64,
) -> HypergridSearchOutcome {
    config.validate().unwrap();

    let dimensions = config.bounds.len();
    let mut steps = 0;
    let mut values = vec![0.0; dimensions];
    let mut optimal_values = config
        .bounds
        .iter()
        .map(|bound| (bound.start() + bound.end()) / 2.0)
        .collect::<Vec<_>>();
    let mut optimal_residual = f64::MAX;
    let mut ordinals = vec![0; dimensions];
    let mut bounds = config.bounds.clone();
    let inv_resolution = 1.0 / (config.resolution - 1) as f64;

    'outer: while steps < config.max_steps {
        steps += 1;
        ordinals.fill(0);

        loop {
            for (dimension, &ordinal) in ordinals.iter().enumerate() {
                let bound = &bounds[dimension];
                let range = bound.end() - bound.start();
                values[dimension] = bound.start() + ordinal as f64 * range * inv_resolution;
            }
            if constraint_f(&values) {
                let residual = loss_f(&values);
                if residual < optimal_residual {
                    optimal_residual = residual;
                    optimal_values.copy_from_slice(&values);

                    if residual <= config.acceptable_residual {
                        break 'outer;
                    }
                }
            }

            // odometer-style increment over the grid ordinals
            let mut dimension = 0;
            loop {
                if dimension == dimensions {
                    break;
                }
                ordinals[dimension] += 1;
                if ordinals[dimension] < config.resolution {
                    break;
                }
                ordinals[dimension] = 0;
                dimension += 1;
            }
            if dimension == dimensions {
                break;
            }
        }

        for (dimension, &value) in optimal_values.iter().enumerate() {
            let hard_bound = &config.bounds[dimension];
            let bound = &mut bounds[dimension];
            let new_range = (bound.end() - bound.start()) * 2.0 / config.resolution as f64;
            let new_start = f64::max(*hard_bound.start(), value - new_range / 2.0);
            let new_end = f64::min(new_start + new_range, *hard_bound.end());
            *bound = new_start..=new_end;
        }
    }

    HypergridSearchOutcome {
        steps,
        optimal_values,
        optimal_residual,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoordinateDescentConfig {
    pub init_step: f64,
    pub min_step: f64,
    pub max_line_steps: u64,
    pub max_sweeps: u64,
    /// A sweep improving the residual by less than `tolerance · max(1, |residual|)` terminates
    /// the search as converged.
    pub tolerance: f64,
    pub time_budget: Option<Duration>,
}
impl CoordinateDescentConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.init_step <= 0.0 || !self.init_step.is_finite() {
            bail!("initial step must be positive and finite")
        }
        if self.min_step <= 0.0 || self.min_step > self.init_step {
            bail!("min step must be positive and no greater than the initial step")
        }
        if self.max_line_steps == 0 {
            bail!("at least one line search step must be specified")
        }
        if self.max_sweeps == 0 {
            bail!("at least one sweep must be specified")
        }
        if self.tolerance < 0.0 || self.tolerance.is_nan() {
            bail!("tolerance must be non-negative")
        }
        if let Some(time_budget) = self.time_budget {
            if time_budget.is_zero() {
                bail!("time budget cannot be zero")
            }
        }
        Ok(())
    }
}

impl Default for CoordinateDescentConfig {
    fn default() -> Self {
        Self {
            init_step: 0.1,
            min_step: 1e-6,
            max_line_steps: 100,
            max_sweeps: 1_000,
            tolerance: 1e-10,
            time_budget: Some(Duration::from_secs(30)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    Converged,
    SweepLimit,
    TimeBudget,
    NonFinite,
}

#[derive(Debug)]
pub struct CoordinateDescentOutcome {
    pub sweeps: u64,
    pub evaluations: u64,
    pub optimal_values: Vec<f64>,
    pub optimal_residual: f64,
    pub termination: Termination,
    pub elapsed: Duration,
}
impl CoordinateDescentOutcome {
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

/// Multivariate, derivative-free minimisation by cyclic coordinate descent. Each sweep runs a
/// [univariate_descent] along every dimension in turn, holding the others fixed. The per-dimension
/// starting step adapts to the distance travelled in the previous sweep.
pub fn coordinate_descent(
    config: &CoordinateDescentConfig,
    init_values: Vec<f64>,
    mut loss_f: impl FnMut(&[f64]) -> f64,
) -> CoordinateDescentOutcome {
    config.validate().unwrap();

    let start_time = Instant::now();
    let mut values = init_values;
    let mut steps = vec![config.init_step; values.len()];
    let step_floor = f64::min(config.min_step * 10.0, config.init_step);
    let mut evaluations = 1;
    let mut residual = loss_f(&values);
    let mut sweeps = 0;

    let termination = if !residual.is_finite() {
        Termination::NonFinite
    } else {
        loop {
            if sweeps == config.max_sweeps {
                break Termination::SweepLimit;
            }
            if let Some(time_budget) = config.time_budget {
                if start_time.elapsed() > time_budget {
                    break Termination::TimeBudget;
                }
            }
            sweeps += 1;

            let sweep_start_residual = residual;
            for dimension in 0..values.len() {
                let init_value = values[dimension];
                let outcome = univariate_descent(
                    &UnivariateDescentConfig {
                        init_value,
                        init_step: steps[dimension],
                        min_step: config.min_step,
                        max_steps: config.max_line_steps,
                        acceptable_residual: f64::NEG_INFINITY,
                    },
                    |value| {
                        values[dimension] = value;
                        evaluations += 1;
                        loss_f(&values)
                    },
                );
                values[dimension] = outcome.optimal_value;
                residual = outcome.optimal_residual;

                let travelled = (outcome.optimal_value - init_value).abs();
                steps[dimension] = (2.0 * travelled).clamp(step_floor, config.init_step);
            }
            trace!("sweep {sweeps}: residual {residual}, evaluations {evaluations}");

            if !residual.is_finite() {
                break Termination::NonFinite;
            }
            let improvement = sweep_start_residual - residual;
            if improvement <= config.tolerance * f64::max(1.0, residual.abs()) {
                break Termination::Converged;
            }
        }
    };

    CoordinateDescentOutcome {
        sweeps,
        evaluations,
        optimal_values: values,
        optimal_residual: residual,
        termination,
        elapsed: start_time.elapsed(),
    }
}
