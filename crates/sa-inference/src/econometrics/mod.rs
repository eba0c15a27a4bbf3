//! Panel estimators.
//!
//! - **Fixed effects**: within estimator over one or more absorbed dimensions,
//!   demeaned by alternating projections ([`hdfe`]).
//! - **Random effects**: Swamy–Arora variance components and quasi-demeaned
//!   GLS ([`panel`]).

pub mod hdfe;
pub mod panel;

pub use hdfe::FixedEffects;
pub use panel::{VarianceComponents, fit_fe, fit_re, swamy_arora};
