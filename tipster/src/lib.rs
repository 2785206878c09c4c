//! Numerical building blocks for sports pricing: factorials and the Poisson distribution, dense
//! matrices, probability utilities, overround handling and derivative-free optimisers.

pub mod factorial;
pub mod file;
pub mod linear;
pub mod market;
pub mod opt;
pub mod poisson;
pub mod probs;
pub mod timed;
