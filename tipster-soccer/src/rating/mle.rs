//! Time-weighted Dixon-Coles maximum-likelihood fit.
//!
//! The free parameter vector is laid out as `[attack; n] ++ [defense; n] ++ [home_advantage, ρ']`.
//! Attack coefficients are re-centered to zero mean on every evaluation, and `ρ = 0.2·tanh(ρ')`.

use tipster::factorial::{Factorial, Lookup};
use tipster::opt::{coordinate_descent, CoordinateDescentConfig, Termination};

use crate::domain::MatchRecord;
use crate::error::OptimizationDivergence;
use crate::rating::{FitStats, Roster};
use crate::scoregrid::{dixon_coles_tau, RHO_LIMIT};

pub const INIT_HOME_ADVANTAGE: f64 = 0.25;
pub const INIT_RHO: f64 = 0.05;

/// τ is floored here before taking its logarithm.
const TAU_FLOOR: f64 = 1e-12;

#[derive(Debug)]
pub struct MleFit {
    pub attack: Vec<f64>,
    pub defense: Vec<f64>,
    pub home_advantage: f64,
    pub rho: f64,
    pub stats: FitStats,
}

/// Match data in columnar form.
#[derive(Debug)]
pub struct MatchColumns {
    home: Vec<usize>,
    away: Vec<usize>,
    home_goals: Vec<f64>,
    away_goals: Vec<f64>,
    weights: Vec<f64>,
    ln_factorials: Vec<f64>,
    low_score: Vec<Option<(usize, usize)>>,
}
impl MatchColumns {
    pub fn new(roster: &Roster, matches: &[MatchRecord], weights: &[f64]) -> Self {
        assert_eq!(matches.len(), weights.len());
        let factorial = Lookup::default();
        let (home, away) = roster.sides(matches);
        Self {
            home,
            away,
            home_goals: matches.iter().map(|record| record.home_goals as f64).collect(),
            away_goals: matches.iter().map(|record| record.away_goals as f64).collect(),
            weights: weights.to_vec(),
            ln_factorials: matches
                .iter()
                .map(|record| factorial.ln(record.home_goals) + factorial.ln(record.away_goals))
                .collect(),
            low_score: matches
                .iter()
                .map(|record| {
                    (record.home_goals <= 1 && record.away_goals <= 1)
                        .then_some((record.home_goals as usize, record.away_goals as usize))
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.home.len()
    }

    pub fn is_empty(&self) -> bool {
        self.home.is_empty()
    }

    /// Weighted negative log-likelihood of the matches under the given (unpacked) parameters.
    pub fn nll(&self, attack: &[f64], defense: &[f64], home_advantage: f64, rho: f64) -> f64 {
        let log_likelihood: f64 = (0..self.len())
            .map(|i| {
                let (home, away) = (self.home[i], self.away[i]);
                let ln_home_rate = home_advantage + attack[home] - defense[away];
                let ln_away_rate = attack[away] - defense[home];
                let (home_rate, away_rate) = (ln_home_rate.exp(), ln_away_rate.exp());
                let mut ll = self.home_goals[i] * ln_home_rate - home_rate
                    + self.away_goals[i] * ln_away_rate
                    - away_rate
                    - self.ln_factorials[i];
                if let Some((home_goals, away_goals)) = self.low_score[i] {
                    let tau = dixon_coles_tau(home_goals, away_goals, home_rate, away_rate, rho);
                    ll += f64::max(tau, TAU_FLOOR).ln();
                }
                self.weights[i] * ll
            })
            .sum();
        -log_likelihood
    }
}

#[inline]
pub fn squash_rho(raw: f64) -> f64 {
    RHO_LIMIT * raw.tanh()
}

#[inline]
pub fn unsquash_rho(rho: f64) -> f64 {
    (rho / RHO_LIMIT).atanh()
}

/// Copies the attack coefficients out of the raw parameter vector, re-centered to zero mean.
fn center_attack(raw_attack: &[f64], attack: &mut [f64]) {
    let mean = raw_attack.iter().sum::<f64>() / raw_attack.len() as f64;
    for (centered, &raw) in attack.iter_mut().zip(raw_attack) {
        *centered = raw - mean;
    }
}

pub fn fit(
    roster: &Roster,
    matches: &[MatchRecord],
    weights: &[f64],
    config: &CoordinateDescentConfig,
) -> Result<MleFit, OptimizationDivergence> {
    let columns = MatchColumns::new(roster, matches, weights);
    let teams = roster.len();

    let mut init_values = vec![0.0; 2 * teams + 2];
    init_values[2 * teams] = INIT_HOME_ADVANTAGE;
    init_values[2 * teams + 1] = unsquash_rho(INIT_RHO);

    let mut attack = vec![0.0; teams];
    let outcome = coordinate_descent(config, init_values, |values| {
        center_attack(&values[..teams], &mut attack);
        columns.nll(
            &attack,
            &values[teams..2 * teams],
            values[2 * teams],
            squash_rho(values[2 * teams + 1]),
        )
    });

    match outcome.termination {
        Termination::Converged => {}
        Termination::SweepLimit | Termination::TimeBudget => {
            return Err(OptimizationDivergence::BudgetExhausted {
                sweeps: outcome.sweeps,
                elapsed: outcome.elapsed,
            })
        }
        Termination::NonFinite => {
            return Err(OptimizationDivergence::NonFinite {
                sweeps: outcome.sweeps,
            })
        }
    }

    let values = outcome.optimal_values;
    let mut attack = vec![0.0; teams];
    center_attack(&values[..teams], &mut attack);
    let defense = values[teams..2 * teams].to_vec();
    let home_advantage = values[2 * teams];
    let rho = squash_rho(values[2 * teams + 1]);
    if !values.iter().all(|value| value.is_finite()) {
        return Err(OptimizationDivergence::NonFinite {
            sweeps: outcome.sweeps,
        });
    }

    Ok(MleFit {
        attack,
        defense,
        home_advantage,
        rho,
        stats: FitStats {
            sweeps: outcome.sweeps,
            evaluations: outcome.evaluations,
            nll: outcome.optimal_residual,
            elapsed: outcome.elapsed,
        },
    })
}
