//! Engine-wide configuration.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use tipster::file::read_json;

use crate::blend::{BlendConfig, Platt};
use crate::pick::PickConfig;
use crate::rating::RatingConfig;
use crate::scoregrid::ScoregridConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rating: RatingConfig,
    pub scoregrid: ScoregridConfig,
    pub blend: BlendConfig,
    pub pick: PickConfig,
    /// Recalibration of the model probabilities, applied before blending.
    pub calibration: Option<Platt>,
}
impl EngineConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.rating.validate().context("rating")?;
        self.scoregrid.validate().context("scoregrid")?;
        self.blend.validate().context("blend")?;
        self.pick.validate().context("pick")?;
        if let Some(calibration) = &self.calibration {
            calibration.validate().context("calibration")?;
        }
        Ok(())
    }

    /// Loads and validates a configuration from a JSON file. Omitted sections take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let config: EngineConfig = read_json(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use crate::blend::BlendStrategy;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json() {
        let json = r#"{
            "rating": {
                "half_life_days": 90.0,
                "min_matches": 20,
                "optimiser": {
                    "init_step": 0.1,
                    "min_step": 1e-6,
                    "max_line_steps": 100,
                    "max_sweeps": 500,
                    "tolerance": 1e-9,
                    "time_budget": null
                },
                "fallback": {"attack_weight": 0.6, "elo": null},
                "reference_date": "2024-05-31"
            },
            "blend": {
                "strategy": {"Conjugate": {"prior_strength": 25.0}},
                "overround": "Power",
                "effective_sample": {"per_fixture": 0.5, "min": 8.0, "max": 40.0}
            }
        }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(90.0, config.rating.half_life_days);
        assert_eq!(BlendStrategy::Conjugate { prior_strength: 25.0 }, config.blend.strategy);
        assert_eq!(ScoregridConfig::default(), config.scoregrid);
        assert_eq!(None, config.calibration);
    }

    #[test]
    fn validation_names_the_section() {
        let mut config = EngineConfig::default();
        config.blend.strategy = BlendStrategy::Logit { weight: -0.1 };
        let err = config.validate().unwrap_err();
        assert_eq!("blend", err.to_string());
        assert_eq!(
            "logit blend weight must lie in [0, 1]",
            err.root_cause().to_string()
        );
    }
}
