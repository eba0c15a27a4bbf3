//! # sa-core
//!
//! Core types for STATAU.
//!
//! This crate owns the vocabulary every other crate speaks:
//! - the error taxonomy ([`Error`], [`Result`])
//! - the immutable [`Dataset`] and its complete-case adapter
//! - the [`ModelSpec`] configuration record
//! - canonical result records ([`EstimationResult`], [`ComparisonResult`])

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Immutable dataset and complete-case selection.
pub mod dataset;
/// Error taxonomy.
pub mod error;
/// Model specification.
pub mod spec;
/// Result records.
pub mod types;

pub use dataset::{CategoricalHandling, Column, Dataset, GroupCodes, Level, Selection};
pub use error::{Error, Result};
pub use spec::{DescStat, Method, ModelSpec, SeConfig, SeKind};
pub use types::{
    CONSTANT, CoefficientRow, ComparisonResult, ComparisonTest, EstimationResult, FitStats,
    HausmanAudit, Significance, StatKind,
};

/// Crate version, stamped into serialized outputs.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
