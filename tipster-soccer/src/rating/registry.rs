//! A registry of the latest rating snapshot per league.
//!
//! Each league has its own slot, guarded by an async mutex held for the duration of a fit. At
//! most one fit per league is therefore in flight; concurrent callers wait on it and then share
//! its snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use tipster::timed::Timed;

use crate::data::LeagueData;
use crate::error::DataInsufficient;
use crate::rating::{estimate, RatingConfig, Ratings};

#[derive(Debug)]
pub struct RatingSnapshot {
    pub league: String,
    pub version: u64,
    pub fitted_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub ratings: Ratings,
}

#[derive(Default)]
struct Slot {
    snapshot: Mutex<Option<Arc<RatingSnapshot>>>,
}

pub struct RatingRegistry {
    config: Arc<RatingConfig>,
    slots: Mutex<FxHashMap<String, Arc<Slot>>>,
    next_version: AtomicU64,
    fits: AtomicU64,
}
impl RatingRegistry {
    pub fn new(config: RatingConfig) -> Self {
        Self {
            config: Arc::new(config),
            slots: Mutex::default(),
            next_version: AtomicU64::new(1),
            fits: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    /// Number of fits performed over the registry's lifetime.
    pub fn fits(&self) -> u64 {
        self.fits.load(Ordering::Relaxed)
    }

    async fn slot(&self, league: &str) -> Arc<Slot> {
        let mut slots = self.slots.lock().await;
        slots.entry(league.to_string()).or_default().clone()
    }

    /// The current snapshot for the league, fitting one if none is held.
    pub async fn ratings(
        &self,
        league: Arc<LeagueData>,
    ) -> Result<Arc<RatingSnapshot>, DataInsufficient> {
        let slot = self.slot(&league.name).await;
        let mut snapshot = slot.snapshot.lock().await;
        if let Some(existing) = &*snapshot {
            debug!("reusing ratings v{} for {}", existing.version, league.name);
            return Ok(existing.clone());
        }

        let config = self.config.clone();
        let fit_league = league.clone();
        let timed = tokio::task::spawn_blocking(move || {
            Timed::result(|| estimate(&fit_league.matches, &config))
        })
        .await
        .unwrap_or_else(|err| std::panic::resume_unwind(err.into_panic()))?;
        self.fits.fetch_add(1, Ordering::Relaxed);

        let fitted = Arc::new(RatingSnapshot {
            league: league.name.clone(),
            version: self.next_version.fetch_add(1, Ordering::Relaxed),
            fitted_at: Utc::now(),
            elapsed: timed.elapsed,
            ratings: timed.value,
        });
        info!(
            "rated {} teams of {} from {} matches via {} (v{}), took {:?}",
            fitted.ratings.roster.len(),
            fitted.league,
            fitted.ratings.matches,
            fitted.ratings.source,
            fitted.version,
            fitted.elapsed
        );
        *snapshot = Some(fitted.clone());
        Ok(fitted)
    }

    async fn existing_slot(&self, league: &str) -> Option<Arc<Slot>> {
        let slots = self.slots.lock().await;
        slots.get(league).cloned()
    }

    /// The current snapshot for the league, without fitting.
    pub async fn snapshot(&self, league: &str) -> Option<Arc<RatingSnapshot>> {
        let slot = self.existing_slot(league).await?;
        let snapshot = slot.snapshot.lock().await;
        snapshot.clone()
    }

    /// Drops the league's snapshot, so that the next request refits. Returns `true` if a snapshot
    /// was held.
    pub async fn invalidate(&self, league: &str) -> bool {
        let Some(slot) = self.existing_slot(league).await else {
            return false;
        };
        let mut snapshot = slot.snapshot.lock().await;
        snapshot.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::domain::MatchRecord;
    use crate::rating::RatingSource;

    use super::*;

    fn league(name: &str, rounds: usize) -> Arc<LeagueData> {
        let teams = ["Ajax", "Feyenoord", "PSV", "Twente"];
        let mut matches = vec![];
        for round in 0..rounds {
            for (home_index, home) in teams.iter().enumerate() {
                for (away_index, away) in teams.iter().enumerate() {
                    if home_index != away_index {
                        matches.push(MatchRecord {
                            date: NaiveDate::from_ymd_opt(2024, 1, 1 + round as u32).unwrap(),
                            home_team: home.to_string(),
                            away_team: away.to_string(),
                            home_goals: ((round + home_index) % 4) as u8,
                            away_goals: ((round + away_index) % 3) as u8,
                        });
                    }
                }
            }
        }
        Arc::new(LeagueData {
            name: name.into(),
            matches,
        })
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_fit() {
        let registry = Arc::new(RatingRegistry::new(RatingConfig::default()));
        let eredivisie = league("eredivisie", 4);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                let eredivisie = eredivisie.clone();
                tokio::spawn(async move { registry.ratings(eredivisie).await.unwrap() })
            })
            .collect();
        let mut snapshots = vec![];
        for handle in handles {
            snapshots.push(handle.await.unwrap());
        }
        assert_eq!(1, registry.fits());
        for snapshot in &snapshots {
            assert!(Arc::ptr_eq(&snapshots[0], snapshot));
        }
        assert_eq!(1, snapshots[0].version);
        assert_eq!(RatingSource::MaximumLikelihood, snapshots[0].ratings.source);
    }

    #[tokio::test]
    async fn leagues_are_independent() {
        let registry = RatingRegistry::new(RatingConfig::default());
        let first = registry.ratings(league("first", 3)).await.unwrap();
        let second = registry.ratings(league("second", 1)).await.unwrap();
        assert_eq!(2, registry.fits());
        assert_ne!(first.version, second.version);
        assert!(second.ratings.source.is_fallback());
        assert!(registry.snapshot("third").await.is_none());
        assert!(!registry.invalidate("fourth").await);
        // lookups of unknown leagues leave no slot behind
        assert_eq!(2, registry.slots.lock().await.len());
    }

    #[tokio::test]
    async fn invalidate_forces_refit() {
        let registry = RatingRegistry::new(RatingConfig::default());
        let data = league("eerste", 1);
        let before = registry.ratings(data.clone()).await.unwrap();
        assert!(registry.invalidate("eerste").await);
        assert!(!registry.invalidate("eerste").await);
        assert!(registry.snapshot("eerste").await.is_none());

        let after = registry.ratings(data).await.unwrap();
        assert_eq!(2, registry.fits());
        assert!(after.version > before.version);
        assert!(after.fitted_at >= before.fitted_at);
    }

    #[tokio::test]
    async fn empty_league_is_not_cached() {
        let registry = RatingRegistry::new(RatingConfig::default());
        let empty = Arc::new(LeagueData {
            name: "empty".into(),
            matches: vec![],
        });
        assert_eq!(
            DataInsufficient::EmptyLeague,
            registry.ratings(empty).await.unwrap_err()
        );
        assert!(registry.snapshot("empty").await.is_none());
    }
}
