//! Scoreline probability grids. Rows index home goals and columns index away goals.

use serde::{Deserialize, Serialize};

use tipster::linear::matrix::Matrix;
use tipster::poisson;
use tipster::probs::SliceExt;

use crate::error::NumericDegeneracy;

/// The low-score correlation parameter ρ is confined to `(-RHO_LIMIT, RHO_LIMIT)`.
pub const RHO_LIMIT: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaBounds {
    pub min: f64,
    pub max: f64,
}
impl LambdaBounds {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.min > 0.0 && self.min.is_finite()) {
            anyhow::bail!("minimum intensity must be positive and finite")
        }
        if !(self.max > self.min && self.max.is_finite()) {
            anyhow::bail!("maximum intensity must be finite and exceed the minimum")
        }
        Ok(())
    }

    /// Clamps a single intensity, mapping non-finite and non-positive values to the floor.
    pub fn clamp(&self, rate: f64) -> f64 {
        if rate.is_finite() && rate > 0.0 {
            rate.clamp(self.min, self.max)
        } else {
            self.min
        }
    }
}

impl Default for LambdaBounds {
    fn default() -> Self {
        Self { min: 0.05, max: 10.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoregridConfig {
    /// Goals per side are truncated at this count; the grid has `max_goals + 1` rows and columns.
    pub max_goals: u8,
    pub lambda_bounds: LambdaBounds,
    /// Number of most probable scorelines reported.
    pub top_n: usize,
}
impl ScoregridConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_goals < 2 {
            anyhow::bail!("at least 2 goals per side must be modelled")
        }
        self.lambda_bounds.validate()
    }
}

impl Default for ScoregridConfig {
    fn default() -> Self {
        Self {
            max_goals: 10,
            lambda_bounds: LambdaBounds::default(),
            top_n: 10,
        }
    }
}

/// Expected goals of the home and away sides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intensities {
    pub home: f64,
    pub away: f64,
}
impl Intensities {
    pub fn total(&self) -> f64 {
        self.home + self.away
    }

    /// Clamps both intensities into `bounds`. A [NumericDegeneracy] is reported when either
    /// intensity was non-finite or non-positive.
    pub fn clamp(&self, bounds: &LambdaBounds) -> (Intensities, Option<NumericDegeneracy>) {
        let clamped = Intensities {
            home: bounds.clamp(self.home),
            away: bounds.clamp(self.away),
        };
        let degenerate = |rate: f64| !rate.is_finite() || rate <= 0.0;
        let degeneracy =
            (degenerate(self.home) || degenerate(self.away)).then(|| NumericDegeneracy {
                home: self.home,
                away: self.away,
                clamped_home: clamped.home,
                clamped_away: clamped.away,
            });
        (clamped, degeneracy)
    }
}

/// The Dixon-Coles correction factor τ for low-scoring outcomes.
#[inline]
pub fn dixon_coles_tau(
    home_goals: usize,
    away_goals: usize,
    home_rate: f64,
    away_rate: f64,
    rho: f64,
) -> f64 {
    match (home_goals, away_goals) {
        (0, 0) => 1.0 - home_rate * away_rate * rho,
        (0, 1) => 1.0 + home_rate * rho,
        (1, 0) => 1.0 + away_rate * rho,
        (1, 1) => 1.0 - rho,
        _ => 1.0,
    }
}

/// Populates the grid with the product of two independent Poisson distributions. The result is
/// not normalised; it sums to less than 1 by the mass truncated beyond the grid.
pub fn from_univariate_poisson(home_rate: f64, away_rate: f64, scoregrid: &mut Matrix<f64>) {
    let mut home_probs = vec![0.0; scoregrid.rows()];
    let mut away_probs = vec![0.0; scoregrid.cols()];
    poisson::fill_univariate(home_rate, &mut home_probs);
    poisson::fill_univariate(away_rate, &mut away_probs);
    for (home_goals, &home_prob) in home_probs.iter().enumerate() {
        for (away_goals, &away_prob) in away_probs.iter().enumerate() {
            scoregrid[(home_goals, away_goals)] = home_prob * away_prob;
        }
    }
}

/// Populates the grid with the Dixon-Coles model: the independent Poisson product adjusted by τ,
/// with negative cells floored at zero and the result normalised to sum to 1.
pub fn from_dixon_coles(home_rate: f64, away_rate: f64, rho: f64, scoregrid: &mut Matrix<f64>) {
    from_univariate_poisson(home_rate, away_rate, scoregrid);
    if rho != 0.0 {
        for home_goals in 0..usize::min(2, scoregrid.rows()) {
            for away_goals in 0..usize::min(2, scoregrid.cols()) {
                let cell = &mut scoregrid[(home_goals, away_goals)];
                let tau = dixon_coles_tau(home_goals, away_goals, home_rate, away_rate, rho);
                *cell = f64::max(0.0, *cell * tau);
            }
        }
    }
    scoregrid.flatten_mut().normalise(1.0);
}

/// Allocates a `(max_goals + 1)²` grid and populates it from the given intensities and ρ.
pub fn dixon_coles_grid(intensities: &Intensities, rho: f64, max_goals: u8) -> Matrix<f64> {
    let dim = max_goals as usize + 1;
    let mut scoregrid = Matrix::allocate(dim, dim);
    from_dixon_coles(intensities.home, intensities.away, rho, &mut scoregrid);
    scoregrid
}

pub fn home_away_expectations(scoregrid: &Matrix<f64>) -> (f64, f64) {
    let (mut home_expectation, mut away_expectation) = (0.0, 0.0);

    for home_goals in 0..scoregrid.rows() {
        for away_goals in 0..scoregrid.cols() {
            let prob = scoregrid[(home_goals, away_goals)];
            home_expectation += home_goals as f64 * prob;
            away_expectation += away_goals as f64 * prob;
        }
    }

    (home_expectation, away_expectation)
}
