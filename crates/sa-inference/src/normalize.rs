//! Raw fit record and the normalizer that turns it into a canonical
//! [`EstimationResult`].
//!
//! Estimators work at full precision. Rounding happens exactly once, here.

use nalgebra::{DMatrix, DVector};
use sa_core::{CoefficientRow, EstimationResult, FitStats, Method, SeKind, Significance, StatKind};
use sa_prob::distributions::{f_upper, t_two_sided, z_two_sided};

/// Unrounded output of one estimator.
#[derive(Debug, Clone)]
pub struct RawFit {
    /// Estimator.
    pub method: Method,
    /// Dependent variable.
    pub dependent: String,
    /// Term names, `Constant` last.
    pub names: Vec<String>,
    /// Coefficients aligned with `names`.
    pub beta: DVector<f64>,
    /// Classical covariance (before the standard-error policy).
    pub cov_raw: DMatrix<f64>,
    /// Covariance under the configured standard-error policy.
    pub cov: DMatrix<f64>,
    /// Variance estimator behind `cov`.
    pub se_kind: SeKind,
    /// Sampling distribution of `coef / se`.
    pub stat_kind: StatKind,
    /// Residuals on the estimation scale (within / quasi-demeaned for panels,
    /// generalized residuals for binary choice).
    pub residuals: DVector<f64>,
    /// Residual sum of squares (`Σ residuals²`).
    pub rss: f64,
    /// Residual degrees of freedom.
    pub df_resid: f64,
    /// Unrounded diagnostics.
    pub stats: FitStats,
    /// Absorbed fixed-effect dimensions.
    pub absorbed: Vec<String>,
}

impl RawFit {
    /// Number of slope coefficients (terms other than `Constant`).
    pub fn n_slopes(&self) -> usize {
        self.names.len().saturating_sub(1)
    }

    /// Standard error of term `j` under the active covariance.
    pub fn std_err(&self, j: usize) -> f64 {
        let v = self.cov[(j, j)];
        if v >= 0.0 { v.sqrt() } else { f64::NAN }
    }

    /// Index of `name` in `names`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// Round to `decimals` places, ties to even.
///
/// Non-finite values pass through unchanged.
pub fn round_half_even(x: f64, decimals: u32) -> f64 {
    if !x.is_finite() || decimals > 15 {
        return x;
    }
    let factor = 10f64.powi(decimals as i32);
    let scaled = x * factor;
    if !scaled.is_finite() {
        return x;
    }
    scaled.round_ties_even() / factor
}

fn round_opt(x: Option<f64>, decimals: u32) -> Option<f64> {
    x.map(|v| round_half_even(v, decimals))
}

/// Two-sided p-value of a coefficient statistic.
pub fn coefficient_p_value(stat: f64, kind: StatKind) -> f64 {
    match kind {
        StatKind::T { df } => t_two_sided(stat, df),
        StatKind::Z => z_two_sided(stat),
    }
}

/// Joint Wald F of the slope coefficients (every term except the trailing
/// constant) under `cov`, with its p-value on `(q, df2)` degrees of freedom.
///
/// Returns `None` when there are no slopes or the slope block of `cov` is
/// not invertible.
pub fn wald_slopes(beta: &DVector<f64>, cov: &DMatrix<f64>, df2: f64) -> Option<(f64, f64)> {
    let q = beta.len().checked_sub(1).filter(|&q| q > 0)?;
    let b = beta.rows(0, q).into_owned();
    let v = cov.view((0, 0), (q, q)).into_owned();
    let v_inv = v.cholesky()?.inverse();
    let f = (b.transpose() * v_inv * &b)[(0, 0)] / q as f64;
    if !f.is_finite() {
        return None;
    }
    Some((f, f_upper(f, q as f64, df2)))
}

/// Package a raw fit as a rounded [`EstimationResult`].
pub fn normalize(raw: &RawFit, decimals: u32) -> EstimationResult {
    let coefficients = raw
        .names
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let coef = raw.beta[j];
            let std_err = raw.std_err(j);
            let stat = coef / std_err;
            let p_value = coefficient_p_value(stat, raw.stat_kind);
            CoefficientRow {
                name: name.clone(),
                coef: round_half_even(coef, decimals),
                std_err: round_half_even(std_err, decimals),
                stat: round_half_even(stat, decimals),
                p_value: round_half_even(p_value, decimals),
                significance: Significance::from_p(p_value),
            }
        })
        .collect();

    let s = &raw.stats;
    let stats = FitStats {
        n_obs: s.n_obs,
        r_squared: round_opt(s.r_squared, decimals),
        adj_r_squared: round_opt(s.adj_r_squared, decimals),
        f_stat: round_opt(s.f_stat, decimals),
        f_p_value: round_opt(s.f_p_value, decimals),
        pseudo_r_squared: round_opt(s.pseudo_r_squared, decimals),
        lr_chi2: round_opt(s.lr_chi2, decimals),
        log_likelihood: round_opt(s.log_likelihood, decimals),
        null_log_likelihood: round_opt(s.null_log_likelihood, decimals),
        aic: round_opt(s.aic, decimals),
        bic: round_opt(s.bic, decimals),
        n_groups: s.n_groups,
        n_clusters: s.n_clusters,
        sigma_e: round_opt(s.sigma_e, decimals),
        sigma_u: round_opt(s.sigma_u, decimals),
        rho: round_opt(s.rho, decimals),
    };

    EstimationResult {
        method: raw.method,
        dependent: raw.dependent.clone(),
        se_kind: raw.se_kind,
        coefficients,
        stats,
        stat_kind: raw.stat_kind,
        absorbed: raw.absorbed.clone(),
        decimals,
    }
}
