//! # sa-inference
//!
//! Estimation engine for STATAU.
//!
//! This crate provides:
//! - the eleven analysis methods (OLS, FE/RE/pooled panel, logit/probit,
//!   descriptive, grouped descriptive, frequency, correlation, VIF)
//! - the standard-error policy shared by every regression (classical, HC1,
//!   one-way cluster)
//! - the result normalizer (rounding, significance, fit diagnostics)
//! - model-comparison tests (F-test, Hausman with optional sigma-more)
//!
//! ## Architecture
//!
//! Estimators return an unrounded [`RawFit`]; [`normalize`] turns it into the
//! canonical [`sa_core::EstimationResult`]. [`run`] validates a spec and
//! dispatches by method.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Logit and probit maximum likelihood.
pub mod binary;
/// F-test and Hausman test.
pub mod comparison;
/// Pearson correlation matrix.
pub mod correlation;
/// Standard-error policy and sandwich estimators.
pub mod covariance;
/// Descriptive statistics.
pub mod descriptive;
/// Method dispatch.
pub mod dispatch;
/// Panel estimators (fixed and random effects).
pub mod econometrics;
/// Frequency tables.
pub mod frequency;
/// Least squares, OLS and pooled OLS.
pub mod linear;
/// Raw fit record and result normalizer.
pub mod normalize;
/// Estimation sample construction.
pub mod sample;
/// Variance inflation factors.
pub mod vif;

pub use binary::Link;
pub use comparison::{HausmanMode, f_test, hausman, run_f_test, run_hausman};
pub use correlation::CorrelationMatrix;
pub use covariance::SePolicy;
pub use descriptive::{DescriptiveTable, GroupSummary, GroupedDescriptive, SummaryRow};
pub use dispatch::{AnalysisOutput, estimate, run};
pub use frequency::{
    CARDINALITY_LIMIT, CardinalityEntry, CardinalityWarning, FrequencyReport, FrequencyRow,
    FrequencyTable,
};
pub use normalize::{RawFit, normalize, round_half_even};
pub use vif::{VifRow, VifTable};
