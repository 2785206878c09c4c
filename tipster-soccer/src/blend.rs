//! Posterior blending of model probabilities with bookmaker-implied probabilities.

use std::fmt::Debug;

use anyhow::bail;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tipster::market::{Market, OverroundMethod};
use tipster::opt::{hypergrid_search, HypergridSearchConfig};
use tipster::probs::{clamp_open, logit, sigmoid, SliceExt};

use crate::domain::{MarketCode, OddsQuote};
use crate::error::InvalidOdds;
use crate::markets::MarketProbabilities;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlendStrategy {
    /// Model probabilities pass through unaltered.
    None,
    /// `sigmoid((1 − weight)·logit(p_model) + weight·logit(p_market))`.
    Logit { weight: f64 },
    /// Dirichlet (or Beta) posterior with a market-centered prior of the given strength, updated
    /// by the model probabilities scaled to the effective sample size.
    Conjugate { prior_strength: f64 },
}
impl BlendStrategy {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self {
            BlendStrategy::None => {}
            BlendStrategy::Logit { weight } => {
                if !(0.0..=1.0).contains(weight) {
                    bail!("logit blend weight must lie in [0, 1]")
                }
            }
            BlendStrategy::Conjugate { prior_strength } => {
                if !(*prior_strength >= 0.0 && prior_strength.is_finite()) {
                    bail!("prior strength must be non-negative and finite")
                }
            }
        }
        Ok(())
    }

    /// Mixes a binary probability.
    pub fn mix_binary(&self, p_model: f64, p_market: f64, n_eff: f64) -> f64 {
        match self {
            BlendStrategy::None => p_model,
            BlendStrategy::Logit { weight } => logit_blend(p_model, p_market, *weight),
            BlendStrategy::Conjugate { prior_strength } => {
                beta_blend(p_model, p_market, *prior_strength, n_eff)
            }
        }
    }

    /// Mixes a vector of mutually exclusive probabilities.
    pub fn mix_multinomial(&self, p_model: &[f64], p_market: &[f64], n_eff: f64) -> Vec<f64> {
        match self {
            BlendStrategy::None => p_model.to_vec(),
            BlendStrategy::Logit { weight } => p_model
                .iter()
                .zip(p_market)
                .map(|(&p_model, &p_market)| logit_blend(p_model, p_market, *weight))
                .collect(),
            BlendStrategy::Conjugate { prior_strength } => {
                dirichlet_blend(p_model, p_market, *prior_strength, n_eff)
            }
        }
    }
}

/// Maps the combined fixture count of two teams to an effective sample size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveSample {
    pub per_fixture: f64,
    pub min: f64,
    pub max: f64,
}
impl EffectiveSample {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.per_fixture < 0.0 {
            bail!("effective sample per fixture cannot be negative")
        }
        if !(self.min >= 0.0 && self.max >= self.min) {
            bail!("effective sample range must satisfy 0 <= min <= max")
        }
        Ok(())
    }

    pub fn n_eff(&self, fixtures: usize) -> f64 {
        (fixtures as f64 * self.per_fixture).clamp(self.min, self.max)
    }
}

impl Default for EffectiveSample {
    fn default() -> Self {
        Self {
            per_fixture: 0.5,
            min: 8.0,
            max: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendConfig {
    pub strategy: BlendStrategy,
    pub overround: OverroundMethod,
    pub effective_sample: EffectiveSample,
}
impl BlendConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.strategy.validate()?;
        self.effective_sample.validate()?;
        Ok(())
    }
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            strategy: BlendStrategy::Logit { weight: 0.4 },
            overround: OverroundMethod::Multiplicative,
            effective_sample: EffectiveSample::default(),
        }
    }
}

/// Logit-space blend. The end points of `weight` return the respective input exactly.
pub fn logit_blend(p_model: f64, p_market: f64, weight: f64) -> f64 {
    if weight == 0.0 {
        p_model
    } else if weight == 1.0 {
        p_market
    } else {
        sigmoid((1.0 - weight) * logit(p_model) + weight * logit(p_market))
    }
}

/// Posterior mean of a Beta prior `(S·p_prior, S·(1 − p_prior))` updated by `n_eff` pseudo-trials
/// succeeding at rate `p_model`.
pub fn beta_blend(p_model: f64, p_prior: f64, prior_strength: f64, n_eff: f64) -> f64 {
    let a_post = prior_strength * p_prior + n_eff * p_model;
    let b_post = prior_strength * (1.0 - p_prior) + n_eff * (1.0 - p_model);
    let total = a_post + b_post;
    if total > 0.0 {
        a_post / total
    } else {
        p_model
    }
}

/// Posterior mean of a Dirichlet prior `S·p_market` updated by `n_eff·p_model`.
pub fn dirichlet_blend(
    p_model: &[f64],
    p_market: &[f64],
    prior_strength: f64,
    n_eff: f64,
) -> Vec<f64> {
    assert_eq!(p_model.len(), p_market.len());
    let mut alpha: Vec<_> = p_model
        .iter()
        .zip(p_market)
        .map(|(&p_model, &p_market)| prior_strength * p_market + n_eff * p_model)
        .collect();
    if alpha.sum() > 0.0 {
        alpha.normalise(1.0);
        alpha
    } else {
        p_model.to_vec()
    }
}

/// Fair probabilities of a set of mutually exclusive prices.
pub fn remove_overround(prices: &[f64], method: &OverroundMethod) -> Vec<f64> {
    Market::fit(method, prices.to_vec(), 1.0).probs
}

/// A monotonic map from raw to calibrated probabilities.
pub trait Calibration: Debug + Send + Sync {
    fn apply(&self, prob: f64) -> f64;
}

/// Fits a [Calibration] from historical forecasts and their outcomes.
pub trait Calibrator {
    type Output: Calibration;

    fn fit(&self, probs: &[f64], outcomes: &[bool]) -> Result<Self::Output, anyhow::Error>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identity;

impl Calibration for Identity {
    fn apply(&self, prob: f64) -> f64 {
        prob
    }
}

impl Calibrator for Identity {
    type Output = Identity;

    fn fit(&self, _probs: &[f64], _outcomes: &[bool]) -> Result<Self::Output, anyhow::Error> {
        Ok(Identity)
    }
}

/// Logistic recalibration on the log-odds scale: `sigmoid(intercept + slope·logit(p))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platt {
    pub intercept: f64,
    pub slope: f64,
}
impl Platt {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.slope > 0.0 && self.slope.is_finite()) {
            bail!("Platt slope must be positive and finite")
        }
        if !self.intercept.is_finite() {
            bail!("Platt intercept must be finite")
        }
        Ok(())
    }
}

impl Calibration for Platt {
    fn apply(&self, prob: f64) -> f64 {
        sigmoid(self.intercept + self.slope * logit(prob))
    }
}

/// Fits [Platt] parameters by minimising the log-loss over a hypergrid of intercepts and (positive)
/// slopes.
#[derive(Debug, Clone)]
pub struct PlattCalibrator {
    pub search: HypergridSearchConfig,
}

impl Default for PlattCalibrator {
    fn default() -> Self {
        Self {
            search: HypergridSearchConfig {
                max_steps: 30,
                acceptable_residual: 0.0,
                bounds: vec![-4.0..=4.0, 0.05..=5.0],
                resolution: 9,
            },
        }
    }
}

impl Calibrator for PlattCalibrator {
    type Output = Platt;

    fn fit(&self, probs: &[f64], outcomes: &[bool]) -> Result<Self::Output, anyhow::Error> {
        if probs.len() != outcomes.len() {
            bail!("{} probabilities supplied for {} outcomes", probs.len(), outcomes.len())
        }
        if probs.is_empty() {
            bail!("at least one observation is required")
        }
        self.search.validate()?;
        let log_odds: Vec<_> = probs.iter().map(|&prob| logit(prob)).collect();
        let outcome = hypergrid_search(
            &self.search,
            |values| values[1] > 0.0,
            |values| {
                let (intercept, slope) = (values[0], values[1]);
                log_odds
                    .iter()
                    .zip(outcomes)
                    .map(|(&log_odds, &outcome)| {
                        let prob = clamp_open(sigmoid(intercept + slope * log_odds));
                        if outcome {
                            -prob.ln()
                        } else {
                            -(1.0 - prob).ln()
                        }
                    })
                    .sum::<f64>()
                    / log_odds.len() as f64
            },
        );
        debug!(
            "fitted Platt calibration {:?} with log-loss {:.6} in {} steps",
            outcome.optimal_values, outcome.optimal_residual, outcome.steps
        );
        Ok(Platt {
            intercept: outcome.optimal_values[0],
            slope: outcome.optimal_values[1],
        })
    }
}

/// Applies the calibration to the primary selections (1X2 legs, overs and BTTS), renormalising
/// 1X2 and rederiving the complementary selections.
pub fn calibrate(probs: &mut MarketProbabilities, calibration: &dyn Calibration) {
    let mut result = [MarketCode::HOME, MarketCode::Draw, MarketCode::AWAY]
        .map(|code| calibration.apply(probs.get(&code).unwrap_or_default()));
    result.normalise(1.0);
    probs.set(&MarketCode::HOME, result[0]);
    probs.set(&MarketCode::Draw, result[1]);
    probs.set(&MarketCode::AWAY, result[2]);
    for line in probs.lines() {
        if let Some(over) = probs.over(line) {
            probs.set(&MarketCode::Over(line), calibration.apply(over));
        }
    }
    let btts = probs.btts();
    probs.set(&MarketCode::BttsYes, calibration.apply(btts));
    probs.rederive();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendDetail {
    pub code: MarketCode,
    pub model: f64,
    pub market: f64,
    pub blended: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Blended {
    pub probs: MarketProbabilities,
    pub detail: Vec<BlendDetail>,
    pub warnings: Vec<InvalidOdds>,
}

/// Blends the model probabilities with the quoted odds, group by group: 1X2, each total-goals
/// line and BTTS. A group lacking usable quotes keeps its model probabilities and records a
/// warning; no group's failure affects another.
pub fn blend(
    model: &MarketProbabilities,
    odds: &OddsQuote,
    config: &BlendConfig,
    n_eff: f64,
) -> Blended {
    let mut probs = model.clone();
    let mut detail = vec![];
    let mut warnings = odds.rejected().to_vec();

    if config.strategy == BlendStrategy::None || odds.is_empty() {
        return Blended {
            probs,
            detail,
            warnings,
        };
    }

    // 1X2: the logit blend tolerates a missing leg; the conjugate update requires all three
    let result_codes = [MarketCode::HOME, MarketCode::Draw, MarketCode::AWAY];
    let quoted: Vec<_> = result_codes
        .iter()
        .filter_map(|code| odds.price(code).map(|price| (*code, price)))
        .collect();
    let min_legs = match config.strategy {
        BlendStrategy::Conjugate { .. } => result_codes.len(),
        _ => 2,
    };
    if quoted.len() >= min_legs {
        let prices: Vec<_> = quoted.iter().map(|(_, price)| *price).collect();
        let market_probs = remove_overround(&prices, &config.overround);
        let model_probs: Vec<_> = quoted
            .iter()
            .map(|(code, _)| model.get(code).unwrap_or_default())
            .collect();
        let blended = config.strategy.mix_multinomial(&model_probs, &market_probs, n_eff);
        for (index, (code, _)) in quoted.iter().enumerate() {
            probs.set(code, blended[index]);
            detail.push(BlendDetail {
                code: *code,
                model: model_probs[index],
                market: market_probs[index],
                blended: blended[index],
            });
        }
        let mut result = result_codes.map(|code| probs.get(&code).unwrap_or_default());
        result.normalise(1.0);
        for (code, prob) in result_codes.iter().zip(result) {
            probs.set(code, prob);
        }
    } else if !quoted.is_empty() {
        warnings.push(incomplete("1X2", &result_codes, odds));
    }

    // binary groups
    let primaries = model.lines().into_iter().map(MarketCode::Over).chain([MarketCode::BttsYes]);
    for yes in primaries {
        let Some(no) = yes.complement() else {
            continue;
        };
        match (odds.price(&yes), odds.price(&no)) {
            (Some(yes_price), Some(no_price)) => {
                let market_probs = remove_overround(&[yes_price, no_price], &config.overround);
                let p_model = model.get(&yes).unwrap_or_default();
                let blended = config.strategy.mix_binary(p_model, market_probs[0], n_eff);
                probs.set(&yes, blended);
                detail.push(BlendDetail {
                    code: yes,
                    model: p_model,
                    market: market_probs[0],
                    blended,
                });
            }
            (None, None) => {}
            _ => warnings.push(incomplete(&yes.kind().to_string(), &[yes, no], odds)),
        }
    }

    probs.rederive();
    for warning in &warnings {
        warn!("{warning}; using the model probability");
    }
    Blended {
        probs,
        detail,
        warnings,
    }
}

fn incomplete(group: &str, codes: &[MarketCode], odds: &OddsQuote) -> InvalidOdds {
    let missing: Vec<_> = codes
        .iter()
        .filter(|code| odds.price(code).is_none())
        .map(|code| code.to_string())
        .collect();
    InvalidOdds::Incomplete {
        group: group.to_string(),
        missing: missing.join(", "),
    }
}

#[cfg(test)]
mod tests;
