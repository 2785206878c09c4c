//! Historical match data of a league, as produced by the ingestion layer.

use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tracing::debug;

use tipster::file::read_json;

use crate::domain::MatchRecord;
use crate::rating::Roster;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueData {
    pub name: String,
    pub matches: Vec<MatchRecord>,
}
impl LeagueData {
    /// Loads and validates a league from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let league: LeagueData = read_json(path)
            .with_context(|| format!("failed to read league data from {}", path.display()))?;
        league.validate()?;
        debug!(
            "loaded {} matches of {} from {}",
            league.matches.len(),
            league.name,
            path.display()
        );
        Ok(league)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.name.trim().is_empty() {
            bail!("league name cannot be blank")
        }
        for (index, record) in self.matches.iter().enumerate() {
            if record.home_team.trim().is_empty() || record.away_team.trim().is_empty() {
                bail!("match {index} is missing a team name")
            }
            if record.home_team == record.away_team {
                bail!("match {index}: {} cannot play itself", record.home_team)
            }
        }
        Ok(())
    }

    /// Every team appearing in the league's matches, at home or away.
    pub fn roster(&self) -> Roster {
        Roster::new(&self.matches)
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use chrono::NaiveDate;
    use tipster::file::WriteJsonFile;

    use super::*;

    fn record(home: &str, away: &str) -> MatchRecord {
        MatchRecord {
            date: NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
            home_team: home.into(),
            away_team: away.into(),
            home_goals: 2,
            away_goals: 1,
        }
    }

    #[test]
    fn load_from_file() {
        let league = LeagueData {
            name: "serie-a".into(),
            matches: vec![record("Inter", "Milan"), record("Roma", "Inter")],
        };
        let path = env::temp_dir().join("tipster_soccer_league_data_test.json");
        league.write_json_file(&path).unwrap();
        let loaded = LeagueData::load(&path).unwrap();
        assert_eq!(league, loaded);
        assert_eq!(&["Inter", "Milan", "Roma"], loaded.roster().names());
    }

    #[test]
    fn load_missing_file() {
        let err = LeagueData::load("/nonexistent/league.json").unwrap_err();
        assert!(err.to_string().starts_with("failed to read league data"), "{err}");
    }

    #[test]
    fn parse_json() {
        let json = r#"{
            "name": "eredivisie",
            "matches": [
                {
                    "date": "2024-03-02",
                    "home_team": "Ajax",
                    "away_team": "PSV",
                    "home_goals": 1,
                    "away_goals": 1
                }
            ]
        }"#;
        let league: LeagueData = serde_json::from_str(json).unwrap();
        assert_eq!(NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(), league.matches[0].date);
        assert!(league.validate().is_ok());
    }

    #[test]
    fn validation() {
        let league = LeagueData {
            name: "x".into(),
            matches: vec![record("Inter", "Inter")],
        };
        assert_eq!(
            "match 0: Inter cannot play itself",
            league.validate().unwrap_err().to_string()
        );
        let league = LeagueData {
            name: " ".into(),
            matches: vec![],
        };
        assert!(league.validate().is_err());
    }
}
