//! Estimation of team strengths from historical results.
//!
//! The primary estimator is a time-weighted Dixon-Coles maximum-likelihood fit ([mle]). Where the
//! fit is not attempted or does not converge, a ratio-based rating ([ratio]) is substituted and the
//! substitution is recorded in the [RatingSource] of the resulting [Ratings].

use std::fmt::{Display, Formatter};
use std::time::Duration;

use anyhow::bail;
use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tipster::opt::CoordinateDescentConfig;

use crate::domain::MatchRecord;
use crate::error::{DataInsufficient, FallbackReason};
use crate::rating::ratio::{FallbackConfig, RatioModel};
use crate::scoregrid::Intensities;

pub mod elo;
pub mod mle;
pub mod ratio;
pub mod registry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingConfig {
    pub half_life_days: f64,
    pub min_matches: usize,
    pub optimiser: CoordinateDescentConfig,
    pub fallback: FallbackConfig,
    /// The date from which match ages are measured. Defaults to the date of the latest match.
    pub reference_date: Option<NaiveDate>,
}
impl RatingConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.half_life_days > 0.0 && self.half_life_days.is_finite()) {
            bail!("half-life must be a positive number of days")
        }
        if self.min_matches == 0 {
            bail!("minimum number of matches must be positive")
        }
        self.optimiser.validate()?;
        self.fallback.validate()?;
        Ok(())
    }
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            half_life_days: 180.0,
            min_matches: 30,
            optimiser: CoordinateDescentConfig::default(),
            fallback: FallbackConfig::default(),
            reference_date: None,
        }
    }
}

/// Log-scale strength of a single team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRating {
    pub attack: f64,
    pub defense: f64,
    /// Number of fixtures the team appears in.
    pub fixtures: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RatingSource {
    MaximumLikelihood,
    Fallback(FallbackReason),
}
impl RatingSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, RatingSource::Fallback(_))
    }
}

impl Display for RatingSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RatingSource::MaximumLikelihood => write!(f, "maximum likelihood"),
            RatingSource::Fallback(reason) => write!(f, "fallback ratio ({reason})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitStats {
    pub sweeps: u64,
    pub evaluations: u64,
    pub nll: f64,
    pub elapsed: Duration,
}

/// Teams of a league, indexed in lexicographic order of their names.
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    names: Vec<String>,
    index: FxHashMap<String, usize>,
    fixtures: Vec<usize>,
}
impl Roster {
    pub fn new(matches: &[MatchRecord]) -> Self {
        let mut names: Vec<String> = matches
            .iter()
            .flat_map(|record| [record.home_team.clone(), record.away_team.clone()])
            .collect();
        names.sort();
        names.dedup();
        let index: FxHashMap<_, _> = names
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), index))
            .collect();
        let mut fixtures = vec![0; names.len()];
        for record in matches {
            fixtures[index[&record.home_team]] += 1;
            fixtures[index[&record.away_team]] += 1;
        }
        Self {
            names,
            index,
            fixtures,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn fixtures(&self, index: usize) -> usize {
        self.fixtures[index]
    }

    /// Team indices of the home and away sides of every match.
    pub(crate) fn sides(&self, matches: &[MatchRecord]) -> (Vec<usize>, Vec<usize>) {
        matches
            .iter()
            .map(|record| (self.index[&record.home_team], self.index[&record.away_team]))
            .unzip()
    }
}

/// An immutable rating snapshot of every team in a league.
#[derive(Debug, Clone, PartialEq)]
pub struct Ratings {
    pub roster: Roster,
    pub teams: Vec<TeamRating>,
    pub home_advantage: f64,
    pub rho: f64,
    pub source: RatingSource,
    pub stats: Option<FitStats>,
    pub matches: usize,
    pub reference_date: NaiveDate,
    ratio: Option<RatioModel>,
}
impl Ratings {
    pub fn team(&self, name: &str) -> Result<&TeamRating, DataInsufficient> {
        self.roster
            .index_of(name)
            .map(|index| &self.teams[index])
            .ok_or_else(|| DataInsufficient::UnknownTeam(name.to_string()))
    }

    /// Expected goals of `home` hosting `away`.
    pub fn intensities(&self, home: &str, away: &str) -> Result<Intensities, DataInsufficient> {
        let home_index = self.index_of(home)?;
        let away_index = self.index_of(away)?;
        match &self.ratio {
            Some(ratio) => Ok(ratio.intensities(home_index, away_index)),
            None => {
                let (home, away) = (&self.teams[home_index], &self.teams[away_index]);
                Ok(Intensities {
                    home: f64::exp(self.home_advantage + home.attack - away.defense),
                    away: f64::exp(away.attack - home.defense),
                })
            }
        }
    }

    /// Combined fixture count of both teams.
    pub fn fixtures(&self, home: &str, away: &str) -> Result<usize, DataInsufficient> {
        Ok(self.team(home)?.fixtures + self.team(away)?.fixtures)
    }

    fn index_of(&self, name: &str) -> Result<usize, DataInsufficient> {
        self.roster
            .index_of(name)
            .ok_or_else(|| DataInsufficient::UnknownTeam(name.to_string()))
    }
}

/// Weight of every match, halving with each `half_life_days` elapsed before `reference_date`.
/// Matches dated after the reference date are weighted as if played on it.
pub fn match_weights(
    matches: &[MatchRecord],
    reference_date: NaiveDate,
    half_life_days: f64,
) -> Vec<f64> {
    matches
        .iter()
        .map(|record| {
            let age_days = (reference_date - record.date).num_days().max(0) as f64;
            f64::exp2(-age_days / half_life_days)
        })
        .collect()
}

/// Rates every team in the league. Fails only if the league has no matches; every other shortfall
/// is absorbed by the ratio fallback and recorded in [Ratings::source].
pub fn estimate(
    matches: &[MatchRecord],
    config: &RatingConfig,
) -> Result<Ratings, DataInsufficient> {
    let Some(latest_date) = matches.iter().map(|record| record.date).max() else {
        return Err(DataInsufficient::EmptyLeague);
    };
    let reference_date = config.reference_date.unwrap_or(latest_date);

    let roster = Roster::new(matches);
    let weights = match_weights(matches, reference_date, config.half_life_days);

    if matches.len() < config.min_matches {
        let reason = DataInsufficient::TooFewFixtures {
            actual: matches.len(),
            required: config.min_matches,
        };
        warn!("{reason}; using the ratio fallback");
        return Ok(fallback(roster, matches, &weights, config, reference_date, reason.into()));
    }

    match mle::fit(&roster, matches, &weights, &config.optimiser) {
        Ok(fit) => {
            debug!(
                "fitted {} teams over {} matches: nll {:.4}, {} sweeps, {} evaluations, took {:?}",
                roster.len(),
                matches.len(),
                fit.stats.nll,
                fit.stats.sweeps,
                fit.stats.evaluations,
                fit.stats.elapsed
            );
            let teams = fit
                .attack
                .iter()
                .zip(fit.defense.iter())
                .enumerate()
                .map(|(index, (&attack, &defense))| TeamRating {
                    attack,
                    defense,
                    fixtures: roster.fixtures(index),
                })
                .collect();
            Ok(Ratings {
                roster,
                teams,
                home_advantage: fit.home_advantage,
                rho: fit.rho,
                source: RatingSource::MaximumLikelihood,
                stats: Some(fit.stats),
                matches: matches.len(),
                reference_date,
                ratio: None,
            })
        }
        Err(divergence) => {
            warn!("{divergence}; using the ratio fallback");
            Ok(fallback(roster, matches, &weights, config, reference_date, divergence.into()))
        }
    }
}

fn fallback(
    roster: Roster,
    matches: &[MatchRecord],
    weights: &[f64],
    config: &RatingConfig,
    reference_date: NaiveDate,
    reason: FallbackReason,
) -> Ratings {
    let ratio = RatioModel::fit(&roster, matches, weights, &config.fallback);
    let teams = ratio
        .log_ratings()
        .into_iter()
        .enumerate()
        .map(|(index, (attack, defense))| TeamRating {
            attack,
            defense,
            fixtures: roster.fixtures(index),
        })
        .collect();
    Ratings {
        roster,
        teams,
        home_advantage: ratio.home_advantage(),
        rho: 0.0,
        source: RatingSource::Fallback(reason),
        stats: None,
        matches: matches.len(),
        reference_date,
        ratio: Some(ratio),
    }
}
