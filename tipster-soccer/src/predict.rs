//! The per-request prediction pipeline: intensities, scoreline grid, markets, calibration,
//! blending, pick selection and valuation.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::blend::{blend, calibrate, BlendDetail, Calibration};
use crate::config::EngineConfig;
use crate::domain::{MarketCode, OddsQuote};
use crate::error::{InvalidOdds, NumericDegeneracy, PredictionError};
use crate::markets::{aggregate, MarketProbabilities, TopScoreline};
use crate::pick::{select, value_table, Pick, ValueRow};
use crate::rating::{RatingSource, Ratings};
use crate::scoregrid::{dixon_coles_grid, Intensities};

#[derive(Debug, Clone)]
pub struct MatchRequest {
    pub home: String,
    pub away: String,
    pub odds: OddsQuote,
}
impl MatchRequest {
    pub fn new(home: impl Into<String>, away: impl Into<String>) -> Self {
        Self {
            home: home.into(),
            away: away.into(),
            odds: OddsQuote::default(),
        }
    }

    pub fn with_odds(mut self, odds: OddsQuote) -> Self {
        self.odds = odds;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Prediction {
    pub home: String,
    pub away: String,
    pub intensities: Intensities,
    pub rho: f64,
    /// Probabilities as derived from the scoreline grid, before calibration and blending.
    pub model: MarketProbabilities,
    /// Probabilities after calibration and blending.
    pub markets: MarketProbabilities,
    pub pick: Option<Pick>,
    pub value_table: Vec<ValueRow>,
    pub blend_detail: Vec<BlendDetail>,
    pub n_eff: f64,
    pub source: RatingSource,
    pub warnings: Vec<InvalidOdds>,
    pub degeneracy: Option<NumericDegeneracy>,
    pub summary: String,
}
impl Prediction {
    pub fn lambda_home(&self) -> f64 {
        self.intensities.home
    }

    pub fn lambda_away(&self) -> f64 {
        self.intensities.away
    }

    /// Final probability of the selection, as a percentage.
    pub fn percent(&self, code: &MarketCode) -> Option<f64> {
        self.markets.get(code).map(|prob| prob * 100.0)
    }

    /// Model probability of the selection, as a percentage.
    pub fn model_percent(&self, code: &MarketCode) -> Option<f64> {
        self.model.get(code).map(|prob| prob * 100.0)
    }

    pub fn top_scorelines(&self) -> &[TopScoreline] {
        &self.markets.top_scorelines
    }

    pub fn is_blended(&self) -> bool {
        !self.blend_detail.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Predictor {
    config: EngineConfig,
    calibration: Option<Arc<dyn Calibration>>,
}
impl Predictor {
    /// Creates a predictor for a validated `config`. A Platt calibration in the config is applied
    /// to the model probabilities of every prediction.
    pub fn new(config: EngineConfig) -> Self {
        let calibration = config
            .calibration
            .clone()
            .map(|platt| Arc::new(platt) as Arc<dyn Calibration>);
        Self { config, calibration }
    }

    /// Replaces the calibration with one fitted elsewhere.
    pub fn with_calibration(mut self, calibration: Arc<dyn Calibration>) -> Self {
        self.calibration = Some(calibration);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn predict(
        &self,
        ratings: &Ratings,
        request: &MatchRequest,
    ) -> Result<Prediction, PredictionError> {
        let raw_intensities = ratings.intensities(&request.home, &request.away)?;
        let fixtures = ratings.fixtures(&request.home, &request.away)?;
        let (intensities, degeneracy) = raw_intensities.clamp(&self.config.scoregrid.lambda_bounds);
        if let Some(degeneracy) = &degeneracy {
            warn!("{} vs {}: {degeneracy}", request.home, request.away);
        }

        let scoregrid =
            dixon_coles_grid(&intensities, ratings.rho, self.config.scoregrid.max_goals);
        let lines = self.lines(&request.odds);
        let model = aggregate(&scoregrid, &lines, self.config.scoregrid.top_n);

        let mut calibrated = model.clone();
        if let Some(calibration) = &self.calibration {
            calibrate(&mut calibrated, &**calibration);
        }

        let n_eff = self.config.blend.effective_sample.n_eff(fixtures);
        let blended = blend(&calibrated, &request.odds, &self.config.blend, n_eff);
        let markets = blended.probs;
        let pick = select(
            &markets,
            &request.odds,
            &intensities,
            &ratings.source,
            &self.config.pick,
        );
        let value_table = value_table(&markets, &request.odds);
        debug!(
            "{} vs {}: λ ({:.3}, {:.3}), ρ {:.3}, n_eff {n_eff:.1}, {} blended, pick {:?}",
            request.home,
            request.away,
            intensities.home,
            intensities.away,
            ratings.rho,
            blended.detail.len(),
            pick.as_ref().map(|pick| pick.selection)
        );

        let mut prediction = Prediction {
            home: request.home.clone(),
            away: request.away.clone(),
            intensities,
            rho: ratings.rho,
            model,
            markets,
            pick,
            value_table,
            blend_detail: blended.detail,
            n_eff,
            source: ratings.source.clone(),
            warnings: blended.warnings,
            degeneracy,
            summary: String::new(),
        };
        prediction.summary = summarise(&prediction);
        Ok(prediction)
    }

    /// The configured total-goals lines, along with any line that is quoted in the odds.
    fn lines(&self, odds: &OddsQuote) -> Vec<u8> {
        let mut lines = self.config.pick.lines.clone();
        for (code, _) in odds.prices() {
            if let MarketCode::Over(line) | MarketCode::Under(line) = code {
                if (line as u16) < 2 * self.config.scoregrid.max_goals as u16 {
                    lines.push(line);
                }
            }
        }
        lines.sort_unstable();
        lines.dedup();
        lines
    }
}

fn percent(prob: f64) -> String {
    format!("{:.1}%", prob * 100.0)
}

/// A plain-language account of the prediction, drawn only from its fields.
pub fn summarise(prediction: &Prediction) -> String {
    let markets = &prediction.markets;
    let mut sentences = vec![format!(
        "{} vs {}: expected goals {:.2} to {:.2}.",
        prediction.home, prediction.away, prediction.intensities.home, prediction.intensities.away
    )];
    if let Some(top) = markets.top_scorelines.first() {
        sentences.push(format!(
            "Most likely score {} ({}).",
            top.score,
            percent(top.probability)
        ));
    }
    sentences.push(format!(
        "Home {}, draw {}, away {}.",
        percent(markets.home_win()),
        percent(markets.draw()),
        percent(markets.away_win())
    ));
    if let Some(pick) = &prediction.pick {
        let mut sentence = format!(
            "Pick: {} at {} (confidence {:.0}/100",
            pick.selection.label().to_lowercase(),
            percent(pick.probability),
            pick.confidence
        );
        if let (Some(odds), Some(ev)) = (pick.odds, pick.expected_value) {
            sentence.push_str(&format!(", odds {odds:.2}, EV {:+.1}%", ev * 100.0));
        }
        sentence.push_str(").");
        sentences.push(sentence);
    }
    if prediction.is_blended() {
        sentences.push(format!(
            "Blended with the market on {} selections.",
            prediction.blend_detail.len()
        ));
    }
    if prediction.source.is_fallback() {
        sentences.push(format!("Ratings from {}.", prediction.source));
    }
    if !prediction.warnings.is_empty() {
        sentences.push(format!("{} odds entries ignored.", prediction.warnings.len()));
    }
    if prediction.degeneracy.is_some() {
        sentences.push("Expected goals were clamped to a usable range.".to_string());
    }
    sentences.join(" ")
}
