//! Ratio-based fallback rating.
//!
//! Intensities are built from each side's time-weighted goals for and against, split by venue and
//! taken relative to the league's home and away scoring means.

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::domain::MatchRecord;
use crate::rating::elo::{elo_factor, elo_table, EloConfig};
use crate::rating::Roster;
use crate::scoregrid::Intensities;

/// League scoring means are floored here.
pub const MIN_LEAGUE_MEAN: f64 = 0.05;

/// Goal ratios are floored here before moving to log scale.
const MIN_RATIO: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Weight of the side's own attacking record; the remainder goes to the opponent's defensive
    /// record.
    pub attack_weight: f64,
    pub elo: Option<EloConfig>,
}
impl FallbackConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(0.0..=1.0).contains(&self.attack_weight) {
            bail!("attack weight must lie in [0, 1]")
        }
        if let Some(elo) = &self.elo {
            elo.validate()?;
        }
        Ok(())
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            attack_weight: 0.55,
            elo: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeagueMeans {
    pub home: f64,
    pub away: f64,
}
impl LeagueMeans {
    /// Unweighted mean goals of home and away sides, each floored at [MIN_LEAGUE_MEAN].
    pub fn new(matches: &[MatchRecord]) -> Self {
        let count = usize::max(1, matches.len()) as f64;
        let home = matches.iter().map(|record| record.home_goals as f64).sum::<f64>() / count;
        let away = matches.iter().map(|record| record.away_goals as f64).sum::<f64>() / count;
        Self {
            home: f64::max(MIN_LEAGUE_MEAN, home),
            away: f64::max(MIN_LEAGUE_MEAN, away),
        }
    }
}

/// Weighted goals scored and conceded by a team, split by venue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamAverages {
    pub home_for: f64,
    pub home_against: f64,
    pub away_for: f64,
    pub away_against: f64,
}

#[derive(Default)]
struct Accumulator {
    weight: f64,
    goals_for: f64,
    goals_against: f64,
}
impl Accumulator {
    fn add(&mut self, weight: f64, goals_for: u8, goals_against: u8) {
        self.weight += weight;
        self.goals_for += weight * goals_for as f64;
        self.goals_against += weight * goals_against as f64;
    }

    /// Weighted means, or the given defaults if nothing was accumulated.
    fn means(&self, default_for: f64, default_against: f64) -> (f64, f64) {
        if self.weight > 0.0 {
            (self.goals_for / self.weight, self.goals_against / self.weight)
        } else {
            (default_for, default_against)
        }
    }
}

/// Per-team averages in roster order. A team that never played at a venue takes the league means
/// for that venue.
pub fn team_averages(
    roster: &Roster,
    matches: &[MatchRecord],
    weights: &[f64],
    league: &LeagueMeans,
) -> Vec<TeamAverages> {
    let mut home = Vec::with_capacity(roster.len());
    let mut away = Vec::with_capacity(roster.len());
    home.resize_with(roster.len(), Accumulator::default);
    away.resize_with(roster.len(), Accumulator::default);

    let (home_sides, away_sides) = roster.sides(matches);
    for (i, record) in matches.iter().enumerate() {
        home[home_sides[i]].add(weights[i], record.home_goals, record.away_goals);
        away[away_sides[i]].add(weights[i], record.away_goals, record.home_goals);
    }

    home.iter()
        .zip(away.iter())
        .map(|(home, away)| {
            let (home_for, home_against) = home.means(league.home, league.away);
            let (away_for, away_against) = away.means(league.away, league.home);
            TeamAverages {
                home_for,
                home_against,
                away_for,
                away_against,
            }
        })
        .collect()
}

/// Fallback intensities of `home` hosting `away`:
///
/// `λh = Lh·(a·home.home_for/Lh + (1 − a)·away.away_against/Lh)`,
/// `λa = La·(a·away.away_for/La + (1 − a)·home.home_against/La)`,
///
/// where `Lh`, `La` are the league means and `a` is the attack weight.
pub fn fallback_intensities(
    league: &LeagueMeans,
    home: &TeamAverages,
    away: &TeamAverages,
    attack_weight: f64,
) -> Intensities {
    let defense_weight = 1.0 - attack_weight;
    let home_attack = home.home_for / league.home;
    let away_defense = away.away_against / league.home;
    let away_attack = away.away_for / league.away;
    let home_defense = home.home_against / league.away;
    Intensities {
        home: league.home * (attack_weight * home_attack + defense_weight * away_defense),
        away: league.away * (attack_weight * away_attack + defense_weight * home_defense),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatioModel {
    league: LeagueMeans,
    teams: Vec<TeamAverages>,
    attack_weight: f64,
    elo: Option<(EloConfig, Vec<f64>)>,
}
impl RatioModel {
    pub fn fit(
        roster: &Roster,
        matches: &[MatchRecord],
        weights: &[f64],
        config: &FallbackConfig,
    ) -> Self {
        let league = LeagueMeans::new(matches);
        let teams = team_averages(roster, matches, weights, &league);
        let elo = config
            .elo
            .as_ref()
            .map(|elo_config| (elo_config.clone(), elo_table(roster, matches, elo_config)));
        Self {
            league,
            teams,
            attack_weight: config.attack_weight,
            elo,
        }
    }

    pub fn league(&self) -> &LeagueMeans {
        &self.league
    }

    pub fn intensities(&self, home: usize, away: usize) -> Intensities {
        let mut intensities = fallback_intensities(
            &self.league,
            &self.teams[home],
            &self.teams[away],
            self.attack_weight,
        );
        if let Some((config, table)) = &self.elo {
            let factor = elo_factor(table[home], table[away], config);
            intensities.home *= factor;
            intensities.away /= factor;
        }
        intensities
    }

    /// Log-scale (attack, defense) of every team, for reporting. Attack is centered to zero mean.
    pub fn log_ratings(&self) -> Vec<(f64, f64)> {
        let mut ratings: Vec<_> = self
            .teams
            .iter()
            .map(|team| {
                let (league_home, league_away) = (self.league.home, self.league.away);
                let attack = (team.home_for / league_home + team.away_for / league_away) / 2.0;
                let against =
                    (team.home_against / league_away + team.away_against / league_home) / 2.0;
                (f64::max(MIN_RATIO, attack).ln(), -f64::max(MIN_RATIO, against).ln())
            })
            .collect();
        if !ratings.is_empty() {
            let mean = ratings.iter().map(|(attack, _)| attack).sum::<f64>() / ratings.len() as f64;
            for (attack, _) in &mut ratings {
                *attack -= mean;
            }
        }
        ratings
    }

    pub fn home_advantage(&self) -> f64 {
        (self.league.home / self.league.away).ln()
    }
}
