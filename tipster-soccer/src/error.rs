use std::time::Duration;

use thiserror::Error;

use crate::domain::MarketCode;

/// The historical record cannot support the requested prediction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataInsufficient {
    #[error("team '{0}' is absent from the league's historical data")]
    UnknownTeam(String),

    #[error("{actual} fixtures on record; at least {required} are required")]
    TooFewFixtures { actual: usize, required: usize },

    #[error("the league has no fixtures on record")]
    EmptyLeague,
}

/// The maximum-likelihood fit did not produce usable ratings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizationDivergence {
    #[error("optimiser budget exhausted after {sweeps} sweeps in {elapsed:?}")]
    BudgetExhausted { sweeps: u64, elapsed: Duration },

    #[error("non-finite likelihood after {sweeps} sweeps")]
    NonFinite { sweeps: u64 },
}

/// A quoted price that could not be used for blending or valuation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidOdds {
    #[error("malformed odds entry '{entry}'")]
    Malformed { entry: String },

    #[error("price {price} for {code} must be finite and greater than 1.0")]
    OutOfRange { code: MarketCode, price: f64 },

    #[error("incomplete {group} quote: {missing} missing")]
    Incomplete { group: String, missing: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("degenerate intensities ({home}, {away}) clamped to ({clamped_home}, {clamped_away})")]
pub struct NumericDegeneracy {
    pub home: f64,
    pub away: f64,
    pub clamped_home: f64,
    pub clamped_away: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown market code '{0}'")]
pub struct UnknownMarketCode(pub String);

/// Why the ratio-based rating was used in place of the maximum-likelihood fit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FallbackReason {
    #[error("{0}")]
    DataInsufficient(#[from] DataInsufficient),

    #[error("{0}")]
    OptimizationDivergence(#[from] OptimizationDivergence),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("{0}")]
    DataInsufficient(#[from] DataInsufficient),
}
