use assert_float_eq::*;
use tipster_testing::{assert_distribution, assert_slice_f64_relative};

use crate::markets::aggregate;
use crate::scoregrid::{dixon_coles_grid, Intensities};

use super::*;

fn model() -> MarketProbabilities {
    let scoregrid = dixon_coles_grid(&Intensities { home: 1.6, away: 1.1 }, -0.05, 10);
    aggregate(&scoregrid, &[1, 2, 3], 10)
}

fn full_quote() -> OddsQuote {
    OddsQuote::parse("1=2.10,X=3.40,2=3.60,O2_5=1.95,U2_5=1.90,BTTS=1.80,NOBTTS=2.00")
}

#[test]
fn logit_blend_endpoints() {
    assert_eq!(0.37, logit_blend(0.37, 0.52, 0.0));
    assert_eq!(0.52, logit_blend(0.37, 0.52, 1.0));
    assert_eq!(0.0, logit_blend(0.0, 0.52, 0.0));
}

#[test]
fn logit_blend_midpoint() {
    assert_float_absolute_eq!(0.5, logit_blend(0.2, 0.8, 0.5), 1e-12);
    let blended = logit_blend(0.4, 0.6, 0.25);
    assert!(blended > 0.4 && blended < 0.5);
}

#[test]
fn beta_blend_limits() {
    assert_float_relative_eq!(0.6, beta_blend(0.3, 0.6, 20.0, 0.0));
    assert_float_relative_eq!(0.3, beta_blend(0.3, 0.6, 0.0, 15.0));
    assert_float_relative_eq!(0.3, beta_blend(0.3, 0.6, 0.0, 0.0));
    assert_float_relative_eq!((20.0 * 0.6 + 10.0 * 0.3) / 30.0, beta_blend(0.3, 0.6, 20.0, 10.0));
}

#[test]
fn dirichlet_blend_limits() {
    let model = [0.5, 0.3, 0.2];
    let market = [0.4, 0.3, 0.3];
    assert_slice_f64_relative(&model, &dirichlet_blend(&model, &market, 0.0, 12.0), 1e-12);
    assert_slice_f64_relative(&market, &dirichlet_blend(&model, &market, 20.0, 0.0), 1e-12);
    assert_slice_f64_relative(&model, &dirichlet_blend(&model, &market, 0.0, 0.0), 1e-12);

    let blended = dirichlet_blend(&model, &market, 20.0, 20.0);
    assert_slice_f64_relative(&[0.45, 0.3, 0.25], &blended, 1e-12);
    assert_distribution(&blended, 1e-12);
}

#[test]
fn overround_removed_multiplicatively() {
    let fair = remove_overround(&[2.0, 3.0, 4.0], &OverroundMethod::Multiplicative);
    assert_slice_f64_relative(&[0.461538, 0.307692, 0.230769], &fair, 1e-5);
    assert_distribution(&fair, 1e-12);
}

#[test]
fn effective_sample_clamped() {
    let sample = EffectiveSample::default();
    assert_eq!(8.0, sample.n_eff(0));
    assert_eq!(20.0, sample.n_eff(40));
    assert_eq!(40.0, sample.n_eff(500));
}

#[test]
fn blend_full_quote() {
    let model = model();
    let config = BlendConfig::default();
    let blended = blend(&model, &full_quote(), &config, 20.0);
    assert!(blended.warnings.is_empty(), "{:?}", blended.warnings);
    assert_eq!(5, blended.detail.len());

    let probs = &blended.probs;
    assert_float_absolute_eq!(1.0, probs.home_win() + probs.draw() + probs.away_win(), 1e-12);
    for line in probs.lines() {
        let total = probs.over(line).unwrap() + probs.under(line).unwrap();
        assert_float_absolute_eq!(1.0, total, 1e-12);
    }
    assert_float_absolute_eq!(1.0, probs.btts() + probs.get(&MarketCode::BttsNo).unwrap(), 1e-12);
    assert_float_absolute_eq!(
        probs.home_win() + probs.draw(),
        probs.get(&MarketCode::HomeOrDraw).unwrap(),
        1e-12
    );

    // each blended probability lies between its model and market inputs
    for detail in &blended.detail {
        let (low, high) = (
            f64::min(detail.model, detail.market),
            f64::max(detail.model, detail.market),
        );
        assert!(detail.blended >= low - 1e-12 && detail.blended <= high + 1e-12, "{detail:?}");
    }

    // lines without quotes keep their model probabilities
    assert_eq!(model.over(1), probs.over(1));
    assert_eq!(model.over(3), probs.over(3));
}

#[test]
fn blend_conjugate() {
    let model = model();
    let config = BlendConfig {
        strategy: BlendStrategy::Conjugate { prior_strength: 20.0 },
        ..BlendConfig::default()
    };
    let blended = blend(&model, &full_quote(), &config, 20.0);
    assert!(blended.warnings.is_empty());
    let over = blended.detail.iter().find(|detail| detail.code == MarketCode::Over(2)).unwrap();
    assert_float_relative_eq!((over.model + over.market) / 2.0, over.blended, 1e-12);
    assert_float_absolute_eq!(
        1.0,
        blended.probs.home_win() + blended.probs.draw() + blended.probs.away_win(),
        1e-12
    );
}

#[test]
fn blend_conjugate_requires_all_result_legs() {
    let model = model();
    let config = BlendConfig {
        strategy: BlendStrategy::Conjugate { prior_strength: 20.0 },
        ..BlendConfig::default()
    };
    let blended = blend(&model, &OddsQuote::parse("1=2.1,2=3.6"), &config, 20.0);
    assert_eq!(model.home_win(), blended.probs.home_win());
    assert_eq!(
        vec![InvalidOdds::Incomplete {
            group: "1X2".into(),
            missing: "X".into()
        }],
        blended.warnings
    );
}

#[test]
fn blend_logit_two_result_legs() {
    let model = model();
    let blended = blend(&model, &OddsQuote::parse("1=2.1,2=3.6"), &BlendConfig::default(), 20.0);
    assert!(blended.warnings.is_empty());
    assert_eq!(2, blended.detail.len());
    assert_ne!(model.home_win(), blended.probs.home_win());
    assert_float_absolute_eq!(
        1.0,
        blended.probs.home_win() + blended.probs.draw() + blended.probs.away_win(),
        1e-12
    );
}

#[test]
fn blend_incomplete_pair_keeps_model() {
    let model = model();
    let blended = blend(&model, &OddsQuote::parse("O2_5=1.9"), &BlendConfig::default(), 20.0);
    assert_eq!(model, blended.probs);
    assert!(blended.detail.is_empty());
    assert_eq!(
        vec![InvalidOdds::Incomplete {
            group: "total goals".into(),
            missing: "U2_5".into()
        }],
        blended.warnings
    );
}

#[test]
fn blend_carries_rejected_entries() {
    let model = model();
    let odds = OddsQuote::parse("1=0.9,foo=2,X=abc");
    let blended = blend(&model, &odds, &BlendConfig::default(), 20.0);
    assert_eq!(model, blended.probs);
    assert_eq!(3, blended.warnings.len());
    assert_eq!(
        InvalidOdds::OutOfRange {
            code: MarketCode::HOME,
            price: 0.9
        },
        blended.warnings[0]
    );
}

#[test]
fn blend_disabled() {
    let model = model();
    let config = BlendConfig {
        strategy: BlendStrategy::None,
        ..BlendConfig::default()
    };
    let blended = blend(&model, &full_quote(), &config, 20.0);
    assert_eq!(model, blended.probs);
    assert!(blended.detail.is_empty());
}

#[test]
fn blend_with_zero_weight_is_model() {
    let model = model();
    let config = BlendConfig {
        strategy: BlendStrategy::Logit { weight: 0.0 },
        ..BlendConfig::default()
    };
    let blended = blend(&model, &full_quote(), &config, 20.0);
    assert_float_absolute_eq!(model.home_win(), blended.probs.home_win(), 1e-12);
    assert_float_absolute_eq!(model.over(2).unwrap(), blended.probs.over(2).unwrap(), 1e-12);
}

#[test]
fn strategy_validation() {
    assert!(BlendConfig::default().validate().is_ok());
    assert_eq!(
        "logit blend weight must lie in [0, 1]",
        BlendStrategy::Logit { weight: 1.5 }.validate().unwrap_err().to_string()
    );
    assert!(BlendStrategy::Conjugate { prior_strength: -1.0 }.validate().is_err());
    let sample = EffectiveSample {
        min: 10.0,
        max: 5.0,
        ..EffectiveSample::default()
    };
    assert!(sample.validate().is_err());
}

#[test]
fn identity_calibration() {
    let identity = Identity.fit(&[0.2], &[true]).unwrap();
    assert_eq!(0.37, identity.apply(0.37));
}

#[test]
fn platt_recovers_overconfidence() {
    // forecasts are twice as extreme on the log-odds scale as the true rates
    let mut probs = vec![];
    let mut outcomes = vec![];
    for raw in [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9] {
        let rate = sigmoid(0.5 * logit(raw));
        let hits = (rate * 200.0).round() as usize;
        for trial in 0..200 {
            probs.push(raw);
            outcomes.push(trial < hits);
        }
    }
    let platt = PlattCalibrator::default().fit(&probs, &outcomes).unwrap();
    assert!(platt.validate().is_ok());
    assert_float_absolute_eq!(0.5, platt.slope, 0.05);
    assert_float_absolute_eq!(0.0, platt.intercept, 0.05);
    assert!(platt.apply(0.9) < 0.9);
    assert!(platt.apply(0.1) > 0.1);
}

#[test]
fn platt_rejects_mismatched_inputs() {
    assert!(PlattCalibrator::default().fit(&[0.5, 0.6], &[true]).is_err());
    assert!(PlattCalibrator::default().fit(&[], &[]).is_err());
}

#[test]
fn calibrate_keeps_invariants() {
    let mut probs = model();
    calibrate(
        &mut probs,
        &Platt {
            intercept: 0.1,
            slope: 0.8,
        },
    );
    assert_float_absolute_eq!(1.0, probs.home_win() + probs.draw() + probs.away_win(), 1e-12);
    assert_float_absolute_eq!(1.0, probs.over(2).unwrap() + probs.under(2).unwrap(), 1e-12);
    assert_float_absolute_eq!(1.0, probs.btts() + probs.get(&MarketCode::BttsNo).unwrap(), 1e-12);

    let mut unchanged = model();
    calibrate(&mut unchanged, &Identity);
    assert_float_absolute_eq!(model().home_win(), unchanged.home_win(), 1e-12);
}
