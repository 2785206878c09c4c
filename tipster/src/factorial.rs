//! Factorials and their natural logarithms.

pub trait Factorial {
    fn get(&self, n: u8) -> u128;

    /// ln(n!), computed without overflow for any `n`.
    fn ln(&self, n: u8) -> f64 {
        (2..=n).map(|i| f64::ln(i as f64)).sum()
    }
}

#[derive(Default)]
pub struct Calculator;

impl Factorial for Calculator {
    #[inline]
    fn get(&self, n: u8) -> u128 {
        assert!(n <= MAX_EXACT, "{n}! overflows");
        let mut product = 1u128;
        for i in 2..=n {
            product *= i as u128;
        }
        product
    }
}

const MAX_EXACT: u8 = 34;
const MAX_FACTORIAL_ENTRIES: usize = MAX_EXACT as usize + 1;
const MAX_LN_ENTRIES: usize = u8::MAX as usize + 1;

/// Precomputed factorials (exact up to 34!) and log-factorials over the entire `u8` domain.
pub struct Lookup {
    entries: [u128; MAX_FACTORIAL_ENTRIES],
    ln_entries: Vec<f64>,
}
impl Factorial for Lookup {
    #[inline]
    fn get(&self, n: u8) -> u128 {
        self.entries[n as usize]
    }

    #[inline]
    fn ln(&self, n: u8) -> f64 {
        self.ln_entries[n as usize]
    }
}

impl Default for Lookup {
    fn default() -> Self {
        let mut entries = [1u128; MAX_FACTORIAL_ENTRIES];
        for i in 2..MAX_FACTORIAL_ENTRIES {
            entries[i] = i as u128 * entries[i - 1];
        }
        let mut ln_entries = vec![0.0; MAX_LN_ENTRIES];
        for i in 2..MAX_LN_ENTRIES {
            ln_entries[i] = ln_entries[i - 1] + f64::ln(i as f64);
        }
        Self {
            entries,
            ln_entries,
        }
    }
}
