//! The Poisson distribution.

use crate::factorial::Factorial;

/// P(X = k) for X ~ Poisson(λ).
#[inline]
pub fn univariate(k: u8, lambda: f64, factorial: &impl Factorial) -> f64 {
    if k <= 20 {
        lambda.powi(k as i32) * f64::exp(-lambda) / factorial.get(k) as f64
    } else {
        f64::exp(ln_univariate(k, lambda, factorial))
    }
}

/// ln P(X = k) for X ~ Poisson(λ). Requires λ > 0.
#[inline]
pub fn ln_univariate(k: u8, lambda: f64, factorial: &impl Factorial) -> f64 {
    k as f64 * lambda.ln() - lambda - factorial.ln(k)
}

/// Fills `probs` with P(X = k) for k in `0..probs.len()`, using the recurrence
/// P(k) = P(k - 1) · λ / k.
pub fn fill_univariate(lambda: f64, probs: &mut [f64]) {
    let mut prob = f64::exp(-lambda);
    for (k, slot) in probs.iter_mut().enumerate() {
        if k > 0 {
            prob *= lambda / k as f64;
        }
        *slot = prob;
    }
}

#[cfg(test)]
mod tests {
    use assert_float_eq::*;

    use crate::factorial::{Calculator, Lookup};

    use super::*;

    #[test]
    pub fn test_univariate() {
        assert_float_relative_eq!(0.36787944117144233, univariate(0, 1.0, &Calculator));
        assert_float_relative_eq!(0.36787944117144233, univariate(1, 1.0, &Calculator));
        assert_float_relative_eq!(0.18393972058572117, univariate(2, 1.0, &Calculator));
        assert_float_relative_eq!(0.0820849986238988, univariate(0, 2.5, &Calculator));
        assert_float_relative_eq!(0.205212496559747, univariate(1, 2.5, &Calculator));
        assert_float_relative_eq!(0.25651562069968376, univariate(2, 2.5, &Calculator));
    }

    #[test]
    pub fn test_univariate_large_k() {
        let lookup = Lookup::default();
        let via_ln = f64::exp(ln_univariate(25, 3.0, &lookup));
        assert_float_relative_eq!(via_ln, univariate(25, 3.0, &lookup), 1e-9);
        assert!(univariate(25, 3.0, &lookup) > 0.0);
    }

    #[test]
    pub fn test_ln_univariate() {
        let lookup = Lookup::default();
        for k in 0..10 {
            assert_float_relative_eq!(
                univariate(k, 1.7, &lookup).ln(),
                ln_univariate(k, 1.7, &lookup),
                1e-12
            );
        }
    }

    #[test]
    pub fn test_fill_univariate() {
        let mut probs = [0.0; 6];
        fill_univariate(2.5, &mut probs);
        for (k, &prob) in probs.iter().enumerate() {
            assert_float_relative_eq!(univariate(k as u8, 2.5, &Calculator), prob, 1e-12);
        }
    }
}
