//! Utilities for working with probabilities.

/// Probabilities are kept this far away from 0 and 1 before moving into log-odds space.
pub const LOGIT_EPSILON: f64 = 1e-6;

pub trait SliceExt {
    fn sum(&self) -> f64;
    fn normalise(&mut self, target: f64) -> f64;
    fn scale(&mut self, factor: f64);
    fn invert(&self) -> impl Iterator<Item = f64>;
    fn is_finite(&self) -> bool;
}
impl SliceExt for [f64] {
    fn sum(&self) -> f64 {
        self.iter().sum()
    }

    fn normalise(&mut self, target: f64) -> f64 {
        let sum = self.sum();
        self.scale(target / sum);
        sum
    }

    fn scale(&mut self, factor: f64) {
        for element in self {
            *element *= factor;
        }
    }

    fn invert(&self) -> impl Iterator<Item = f64> {
        self.iter().map(|value| 1.0 / value)
    }

    fn is_finite(&self) -> bool {
        self.iter().all(|value| value.is_finite())
    }
}

#[inline]
pub fn clamp_open(prob: f64) -> f64 {
    prob.clamp(LOGIT_EPSILON, 1.0 - LOGIT_EPSILON)
}

/// Log-odds of `prob`, after clamping into the open unit interval.
#[inline]
pub fn logit(prob: f64) -> f64 {
    let prob = clamp_open(prob);
    f64::ln(prob / (1.0 - prob))
}

#[inline]
pub fn sigmoid(log_odds: f64) -> f64 {
    1.0 / (1.0 + f64::exp(-log_odds))
}

#[cfg(test)]
mod tests {
    use assert_float_eq::*;
    use tipster_testing::assert_slice_f64_relative;

    use super::*;

    #[test]
    fn sum() {
        let data = [0.0, 0.1, 0.2];
        assert_f64_near!(0.3, data.sum(), 1);
    }

    #[test]
    fn normalise() {
        let mut data = [0.05, 0.1, 0.15, 0.2];
        let sum = data.normalise(1.0);
        assert_f64_near!(0.5, sum, 1);
        assert_slice_f64_relative(&[0.1, 0.2, 0.3, 0.4], &data, 1e-12);
    }

    #[test]
    fn invert() {
        let data = [2.0, 4.0, 0.5];
        assert_eq!(vec![0.5, 0.25, 2.0], data.invert().collect::<Vec<_>>());
    }

    #[test]
    fn is_finite() {
        assert!([0.1, 0.2].is_finite());
        assert!(![0.1, f64::NAN].is_finite());
        assert!(![f64::INFINITY].is_finite());
    }

    #[test]
    fn logit_sigmoid_inverse() {
        for prob in [0.01, 0.25, 0.5, 0.75, 0.99] {
            assert_float_absolute_eq!(prob, sigmoid(logit(prob)), 1e-12);
        }
        assert_eq!(0.0, logit(0.5));
    }

    #[test]
    fn logit_clamps_extremes() {
        assert!(logit(0.0).is_finite());
        assert!(logit(1.0).is_finite());
        assert_float_absolute_eq!(LOGIT_EPSILON, sigmoid(logit(0.0)), 1e-15);
    }
}
