//! Bookmaker markets: removal of the overround from decimal prices.

use serde::{Deserialize, Serialize};

use crate::opt::{univariate_descent, UnivariateDescentConfig};
use crate::probs::SliceExt;

#[derive(Debug, Clone, PartialEq)]
pub struct Overround {
    pub method: OverroundMethod,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverroundMethod {
    Multiplicative,
    Power,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Market {
    pub probs: Vec<f64>,
    pub prices: Vec<f64>,
    pub overround: Overround,
}
impl Market {
    /// Removes the overround from a set of mutually exclusive `prices`, yielding probabilities that
    /// sum to `fair_sum`. An infinite price denotes an outcome that cannot occur.
    pub fn fit(method: &OverroundMethod, prices: Vec<f64>, fair_sum: f64) -> Self {
        match method {
            OverroundMethod::Multiplicative => Self::fit_multiplicative(prices, fair_sum),
            OverroundMethod::Power => Self::fit_power(prices, fair_sum),
        }
    }

    fn fit_multiplicative(prices: Vec<f64>, fair_sum: f64) -> Self {
        let mut probs: Vec<_> = prices.invert().collect();
        let overround = probs.normalise(fair_sum) / fair_sum;
        Self {
            probs,
            prices,
            overround: Overround {
                method: OverroundMethod::Multiplicative,
                value: overround,
            },
        }
    }

    fn fit_power(prices: Vec<f64>, fair_sum: f64) -> Self {
        let implied: Vec<_> = prices.invert().collect();
        let overround = implied.sum() / fair_sum;
        let outcome = univariate_descent(
            &UnivariateDescentConfig {
                init_value: 1.0,
                init_step: 0.1,
                min_step: 1e-9,
                max_steps: 10_000,
                acceptable_residual: 1e-15,
            },
            |exponent| {
                let sum: f64 = implied.iter().map(|prob| prob.powf(exponent)).sum();
                (sum - fair_sum).powi(2)
            },
        );
        let probs = implied
            .iter()
            .map(|prob| prob.powf(outcome.optimal_value))
            .collect();
        Self {
            probs,
            prices,
            overround: Overround {
                method: OverroundMethod::Power,
                value: overround,
            },
        }
    }
}
