//! Tail probabilities of the reference distributions used by coefficient
//! tests, correlation tests and the model-comparison tests.
//!
//! Invalid parameters (non-positive degrees of freedom, non-finite
//! statistics) yield `NaN` rather than an error: a `NaN` p-value renders
//! without stars and never reads as significant.

use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, StudentsT};

use crate::math::std_normal_cdf;

/// Two-sided p-value of a Student-t statistic with `df` degrees of freedom.
pub fn t_two_sided(t: f64, df: f64) -> f64 {
    if !t.is_finite() || !(df > 0.0) {
        return f64::NAN;
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(d) => (2.0 * d.sf(t.abs())).min(1.0),
        Err(_) => f64::NAN,
    }
}

/// Two-sided p-value of a standard-normal statistic.
pub fn z_two_sided(z: f64) -> f64 {
    if !z.is_finite() {
        return f64::NAN;
    }
    (2.0 * std_normal_cdf(-z.abs())).min(1.0)
}

/// Upper-tail p-value `P(F > f)` for `F(df1, df2)`.
pub fn f_upper(f: f64, df1: f64, df2: f64) -> f64 {
    if !f.is_finite() || !(df1 > 0.0) || !(df2 > 0.0) {
        return f64::NAN;
    }
    if f <= 0.0 {
        return 1.0;
    }
    match FisherSnedecor::new(df1, df2) {
        Ok(d) => d.sf(f),
        Err(_) => f64::NAN,
    }
}

/// Upper-tail p-value `P(χ² > x)` with `df` degrees of freedom.
pub fn chi2_upper(x: f64, df: f64) -> f64 {
    if !x.is_finite() || !(df > 0.0) {
        return f64::NAN;
    }
    if x <= 0.0 {
        return 1.0;
    }
    match ChiSquared::new(df) {
        Ok(d) => d.sf(x),
        Err(_) => f64::NAN,
    }
}

/// Critical value `c` with `P(F(df1, df2) > c) = alpha`.
pub fn f_critical(alpha: f64, df1: f64, df2: f64) -> f64 {
    match FisherSnedecor::new(df1, df2) {
        Ok(d) => d.inverse_cdf(1.0 - alpha),
        Err(_) => f64::NAN,
    }
}
