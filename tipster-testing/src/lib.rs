//! Assertion helpers for floating-point slices and probability vectors.

use assert_float_eq::*;

pub fn assert_slice_f64_relative(expected: &[f64], actual: &[f64], epsilon: f64) {
    assert_eq!(
        expected.len(),
        actual.len(),
        "lengths do not match: {} ≠ {}",
        expected.len(),
        actual.len()
    );
    for (index, &expected) in expected.iter().enumerate() {
        let actual = actual[index];
        if actual != expected {
            assert_float_relative_eq!(expected, actual, epsilon);
        }
    }
}

pub fn assert_slice_f64_absolute(expected: &[f64], actual: &[f64], epsilon: f64) {
    assert_eq!(
        expected.len(),
        actual.len(),
        "lengths do not match: {} ≠ {}",
        expected.len(),
        actual.len()
    );
    for (index, &expected) in expected.iter().enumerate() {
        assert_float_absolute_eq!(expected, actual[index], epsilon);
    }
}

/// Asserts that every element lies in `[0, 1]` and that the elements sum to `1 ± epsilon`.
pub fn assert_distribution(probs: &[f64], epsilon: f64) {
    for (index, &prob) in probs.iter().enumerate() {
        assert!(
            (0.0..=1.0).contains(&prob),
            "probability {prob} at index {index} outside of [0, 1]"
        );
    }
    let sum: f64 = probs.iter().sum();
    assert_float_absolute_eq!(1.0, sum, epsilon);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_equal() {
        assert_slice_f64_relative(&[0.1, 0.2], &[0.1, 0.2000001], 1e-3);
    }

    #[test]
    #[should_panic(expected = "lengths do not match")]
    fn relative_length_mismatch() {
        assert_slice_f64_relative(&[0.1, 0.2], &[0.1], 1e-3);
    }

    #[test]
    fn distribution_sums_to_one() {
        assert_distribution(&[0.25, 0.25, 0.5], 1e-12);
    }

    #[test]
    #[should_panic]
    fn distribution_rejects_negative() {
        assert_distribution(&[1.5, -0.5], 1e-12);
    }
}
