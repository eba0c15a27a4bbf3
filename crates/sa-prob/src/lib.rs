//! Probability building blocks for STATAU.
//!
//! - stable link helpers (sigmoid, log1pexp, normal pdf/cdf) for the
//!   binary-choice likelihoods
//! - tail probabilities of the t, normal, F and χ² reference distributions

pub mod distributions;
pub mod math;
