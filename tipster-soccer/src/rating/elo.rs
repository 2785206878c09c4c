//! Chronological Elo ratings, used to tilt the fallback intensities.

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::domain::MatchRecord;
use crate::rating::Roster;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EloConfig {
    pub initial: f64,
    pub k: f64,
    pub home_bonus: f64,
    pub scale: f64,
    /// Additional K multiple per goal of winning margin.
    pub goal_bonus: f64,
    /// Sensitivity of the intensity factor to the rating difference.
    pub alpha: f64,
}
impl EloConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.k <= 0.0 {
            bail!("Elo K must be positive")
        }
        if self.scale <= 0.0 {
            bail!("Elo scale must be positive")
        }
        if self.goal_bonus < 0.0 {
            bail!("Elo goal bonus cannot be negative")
        }
        if !self.alpha.is_finite() {
            bail!("Elo alpha must be finite")
        }
        Ok(())
    }
}

impl Default for EloConfig {
    fn default() -> Self {
        Self {
            initial: 1500.0,
            k: 20.0,
            home_bonus: 50.0,
            scale: 400.0,
            goal_bonus: 1.0,
            alpha: 0.1,
        }
    }
}

/// Expected score of the home side.
#[inline]
pub fn expected_home(home_elo: f64, away_elo: f64, config: &EloConfig) -> f64 {
    1.0 / (1.0 + f64::powf(10.0, (away_elo - (home_elo + config.home_bonus)) / config.scale))
}

/// Replays the matches in date order, returning the final Elo of every team in roster order.
pub fn elo_table(roster: &Roster, matches: &[MatchRecord], config: &EloConfig) -> Vec<f64> {
    let mut elo = vec![config.initial; roster.len()];
    let (home_sides, away_sides) = roster.sides(matches);
    let mut order: Vec<_> = (0..matches.len()).collect();
    order.sort_by_key(|&i| matches[i].date);

    for i in order {
        let record = &matches[i];
        let (home, away) = (home_sides[i], away_sides[i]);
        let expected = expected_home(elo[home], elo[away], config);
        let actual = match record.home_goals.cmp(&record.away_goals) {
            std::cmp::Ordering::Greater => 1.0,
            std::cmp::Ordering::Equal => 0.5,
            std::cmp::Ordering::Less => 0.0,
        };
        let margin = record.home_goals.abs_diff(record.away_goals) as f64;
        let k = config.k * (1.0 + config.goal_bonus * margin);
        let delta = k * (actual - expected);
        elo[home] += delta;
        elo[away] -= delta;
    }
    elo
}

/// Multiplier applied to the home intensity (and divisor applied to the away intensity).
#[inline]
pub fn elo_factor(home_elo: f64, away_elo: f64, config: &EloConfig) -> f64 {
    let diff = home_elo + config.home_bonus - away_elo;
    f64::exp(config.alpha * diff / config.scale)
}

#[cfg(test)]
mod tests {
    use assert_float_eq::*;
    use chrono::NaiveDate;

    use super::*;

    fn record(day: u32, home: &str, away: &str, home_goals: u8, away_goals: u8) -> MatchRecord {
        MatchRecord {
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            home_team: home.into(),
            away_team: away.into(),
            home_goals,
            away_goals,
        }
    }

    #[test]
    fn single_home_win() {
        let config = EloConfig::default();
        let matches = vec![record(1, "A", "B", 2, 0)];
        let roster = Roster::new(&matches);
        let table = elo_table(&roster, &matches, &config);
        let expected = expected_home(1500.0, 1500.0, &config);
        let delta = 20.0 * 3.0 * (1.0 - expected);
        assert_float_relative_eq!(1500.0 + delta, table[0]);
        assert_float_relative_eq!(1500.0 - delta, table[1]);
        assert_float_absolute_eq!(3000.0, table.iter().sum::<f64>(), 1e-9);
    }

    #[test]
    fn replays_in_date_order() {
        let config = EloConfig::default();
        let in_order = vec![record(1, "A", "B", 1, 0), record(2, "B", "A", 3, 1)];
        let shuffled = vec![in_order[1].clone(), in_order[0].clone()];
        let roster = Roster::new(&in_order);
        assert_eq!(
            elo_table(&roster, &in_order, &config),
            elo_table(&roster, &shuffled, &config)
        );
    }

    #[test]
    fn factor_favours_stronger_home_side() {
        let config = EloConfig::default();
        assert!(elo_factor(1600.0, 1500.0, &config) > 1.0);
        assert!(elo_factor(1400.0, 1500.0, &config) < 1.0);
        assert_float_relative_eq!(
            f64::exp(0.1 * 50.0 / 400.0),
            elo_factor(1500.0, 1500.0, &config)
        );
    }
}
