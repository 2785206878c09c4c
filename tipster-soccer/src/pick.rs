//! Selection of a recommended bet, with its confidence and rationale, and valuation of the
//! quoted markets.

use std::cmp::Ordering;

use anyhow::bail;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::debug;

use crate::domain::{MarketCode, MarketKind, OddsQuote};
use crate::markets::MarketProbabilities;
use crate::rating::RatingSource;
use crate::scoregrid::Intensities;

/// Goal tempo thresholds, on the sum of both intensities.
pub const HIGH_TEMPO: f64 = 2.6;
pub const MEDIUM_TEMPO: f64 = 2.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionPolicy {
    pub min_probability: f64,
    pub max_probability: f64,
}
impl AdmissionPolicy {
    pub fn at_least(min_probability: f64) -> Self {
        Self {
            min_probability,
            max_probability: 1.0,
        }
    }

    pub fn admits(&self, probability: f64) -> bool {
        (self.min_probability..=self.max_probability).contains(&probability)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(0.0 <= self.min_probability
            && self.min_probability <= self.max_probability
            && self.max_probability <= 1.0)
        {
            bail!("admission bounds must satisfy 0 <= min <= max <= 1")
        }
        Ok(())
    }
}

/// Per-kind admission thresholds. A kind without a policy admits every candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatingConfig {
    pub enabled: bool,
    pub policies: FxHashMap<MarketKind, AdmissionPolicy>,
}
impl GatingConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        for (kind, policy) in &self.policies {
            if let Err(err) = policy.validate() {
                bail!("{kind} gating: {err}")
            }
        }
        Ok(())
    }

    pub fn admits(&self, code: &MarketCode, probability: f64) -> bool {
        !self.enabled
            || self
                .policies
                .get(&code.kind())
                .map(|policy| policy.admits(probability))
                .unwrap_or(true)
    }
}

impl Default for GatingConfig {
    fn default() -> Self {
        let policies = MarketKind::iter()
            .map(|kind| {
                let policy = match kind {
                    MarketKind::MatchResult => AdmissionPolicy::at_least(0.55),
                    MarketKind::DoubleChance => AdmissionPolicy::at_least(0.65),
                    MarketKind::TotalGoals => AdmissionPolicy {
                        min_probability: 0.55,
                        max_probability: 0.88,
                    },
                    MarketKind::BothTeamsToScore => AdmissionPolicy::at_least(0.55),
                    MarketKind::Combo => AdmissionPolicy::at_least(0.45),
                };
                (kind, policy)
            })
            .collect();
        Self {
            enabled: false,
            policies,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickConfig {
    /// Total-goals lines evaluated, as the whole part of the half-goal line.
    pub lines: Vec<u8>,
    pub gating: GatingConfig,
}
impl PickConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.lines.is_empty() {
            bail!("at least one total-goals line must be evaluated")
        }
        self.gating.validate()
    }
}

impl Default for PickConfig {
    fn default() -> Self {
        Self {
            lines: vec![1, 2, 3],
            gating: GatingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub code: MarketCode,
    pub probability: f64,
    pub price: Option<f64>,
    pub expected_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub market: MarketKind,
    pub selection: MarketCode,
    pub probability: f64,
    pub confidence: f64,
    pub expected_value: Option<f64>,
    pub odds: Option<f64>,
    pub rationale: Vec<String>,
}

#[inline]
pub fn expected_value(probability: f64, price: f64) -> f64 {
    probability * price - 1.0
}

/// Fraction of the bankroll to stake by the Kelly criterion, floored at zero.
#[inline]
pub fn kelly(probability: f64, price: f64) -> f64 {
    let b = f64::max(price - 1.0, 1e-9);
    f64::max(0.0, (b * probability - (1.0 - probability)) / b)
}

/// Distance of the probability from a coin toss, on a 0–100 scale.
#[inline]
pub fn confidence(probability: f64) -> f64 {
    ((probability - 0.5).abs() * 200.0).clamp(0.0, 100.0)
}

pub fn tempo(intensities: &Intensities) -> &'static str {
    let total = intensities.total();
    if total > HIGH_TEMPO {
        "high"
    } else if total > MEDIUM_TEMPO {
        "medium"
    } else {
        "low"
    }
}

/// One candidate per evaluated selection, in evaluation order.
pub fn candidates(probs: &MarketProbabilities, odds: &OddsQuote) -> Vec<Candidate> {
    probs
        .entries()
        .iter()
        .map(|(code, probability)| {
            let price = odds.price(code);
            Candidate {
                code: *code,
                probability: *probability,
                price,
                expected_value: price.map(|price| expected_value(*probability, price)),
            }
        })
        .collect()
}

/// Chooses among `pool`: the candidate with the highest positive EV (ties going to the more
/// probable), failing that the most probable candidate.
pub fn choose(pool: &[Candidate]) -> Option<&Candidate> {
    let best_value = pool
        .iter()
        .filter(|candidate| candidate.expected_value.is_some_and(|ev| ev > 0.0))
        .min_by(|a, b| {
            let (a_ev, b_ev) = (
                a.expected_value.unwrap_or_default(),
                b.expected_value.unwrap_or_default(),
            );
            b_ev.total_cmp(&a_ev).then(b.probability.total_cmp(&a.probability))
        });
    best_value.or_else(|| most_probable(pool))
}

fn most_probable(pool: &[Candidate]) -> Option<&Candidate> {
    pool.iter().fold(None, |best: Option<&Candidate>, candidate| match best {
        Some(best) if candidate.probability.total_cmp(&best.probability) != Ordering::Greater => {
            Some(best)
        }
        _ => Some(candidate),
    })
}

/// Selects the recommended bet. Candidates failing the admission gate are set aside, unless that
/// would leave none.
pub fn select(
    probs: &MarketProbabilities,
    odds: &OddsQuote,
    intensities: &Intensities,
    source: &RatingSource,
    config: &PickConfig,
) -> Option<Pick> {
    let all = candidates(probs, odds);
    let gated: Vec<_> = all
        .iter()
        .filter(|candidate| config.gating.admits(&candidate.code, candidate.probability))
        .cloned()
        .collect();
    let pool = if gated.is_empty() {
        debug!("admission gating rejected every candidate; using the ungated pool");
        &all
    } else {
        &gated
    };
    let chosen = choose(pool)?;
    Some(Pick {
        market: chosen.code.kind(),
        selection: chosen.code,
        probability: chosen.probability,
        confidence: confidence(chosen.probability),
        expected_value: chosen.expected_value,
        odds: chosen.price,
        rationale: rationale(probs, chosen, intensities, source),
    })
}

fn percent(prob: f64) -> String {
    format!("{:.1}%", prob * 100.0)
}

pub fn rationale(
    probs: &MarketProbabilities,
    chosen: &Candidate,
    intensities: &Intensities,
    source: &RatingSource,
) -> Vec<String> {
    let mut lines = vec![
        format!(
            "λ home {:.2} vs λ away {:.2} → goal tempo {}",
            intensities.home,
            intensities.away,
            tempo(intensities)
        ),
        format!(
            "1X2: home {}, draw {}, away {}",
            percent(probs.home_win()),
            percent(probs.draw()),
            percent(probs.away_win())
        ),
    ];

    let mut totals: Vec<_> = probs
        .lines()
        .into_iter()
        .filter_map(|line| probs.over(line).map(|over| format!("O{line}.5 {}", percent(over))))
        .collect();
    totals.push(format!("BTTS {}", percent(probs.btts())));
    lines.push(format!("Goals: {}", totals.join(", ")));

    if let (Some(price), Some(ev)) = (chosen.price, chosen.expected_value) {
        let edge = chosen.probability - 1.0 / price;
        lines.push(format!(
            "{} at {price:.2}: EV {:+.1}%, edge {:+.1} pts over the implied {}",
            chosen.code.label(),
            ev * 100.0,
            edge * 100.0,
            percent(1.0 / price)
        ));
    }
    if source.is_fallback() {
        lines.push(format!("Ratings from {source}"));
    }
    lines
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRow {
    pub code: MarketCode,
    pub probability: f64,
    pub price: f64,
    pub fair_price: f64,
    /// Model probability less the bookmaker's implied probability.
    pub edge: f64,
    pub expected_value: f64,
    pub kelly: f64,
}

/// Values every quoted selection that has a model probability, sorted by descending EV.
pub fn value_table(probs: &MarketProbabilities, odds: &OddsQuote) -> Vec<ValueRow> {
    let mut rows: Vec<_> = odds
        .prices()
        .into_iter()
        .filter_map(|(code, price)| {
            probs.get(&code).map(|probability| ValueRow {
                code,
                probability,
                price,
                fair_price: 1.0 / f64::max(probability, 1e-9),
                edge: probability - 1.0 / price,
                expected_value: expected_value(probability, price),
                kelly: kelly(probability, price),
            })
        })
        .collect();
    rows.sort_by(|a, b| b.expected_value.total_cmp(&a.expected_value));
    rows
}
