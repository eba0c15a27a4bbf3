//! Least-squares estimators: OLS and pooled OLS.
//!
//! Every linear estimator (including the panel ones) runs through
//! [`least_squares`] and [`finish_linear`], so coefficient covariance,
//! standard-error policy and the overall F are computed one way.

use nalgebra::{DMatrix, DVector};
use sa_core::{Dataset, FitStats, Method, ModelSpec, Result, StatKind};

use crate::covariance::{AdjustedCovariance, SePolicy, Sandwich, adjust, ensure_full_rank};
use crate::normalize::{RawFit, wald_slopes};
use crate::sample::EstimationSample;

/// `ln(2π)`.
const LN_2PI: f64 = 1.837_877_066_409_345_3;

/// Least-squares solution of `y = Xβ + e`.
#[derive(Debug, Clone)]
pub struct LeastSquares {
    /// Coefficients.
    pub beta: DVector<f64>,
    /// Residuals `y − Xβ`.
    pub residuals: DVector<f64>,
    /// Residual sum of squares.
    pub rss: f64,
    /// `(X'X)^{-1}`.
    pub xtx_inv: DMatrix<f64>,
}

/// Solve the normal equations by Cholesky after a rank check.
pub fn least_squares(x: &DMatrix<f64>, y: &DVector<f64>, context: &str) -> Result<LeastSquares> {
    ensure_full_rank(x, context)?;
    let xt = x.transpose();
    let chol = (&xt * x).cholesky().ok_or_else(|| sa_core::Error::SingularDesign {
        context: format!("{context}: X'X is not positive definite"),
    })?;
    let beta = chol.solve(&(&xt * y));
    let residuals = y - x * &beta;
    let rss = residuals.norm_squared();
    Ok(LeastSquares { beta, residuals, rss, xtx_inv: chol.inverse() })
}

/// Inputs to [`finish_linear`] beyond the least-squares solution.
#[derive(Debug, Clone)]
pub(crate) struct LinearFit<'a> {
    pub method: Method,
    pub dependent: &'a str,
    pub names: Vec<String>,
    pub design: &'a DMatrix<f64>,
    pub ls: LeastSquares,
    pub df_resid: f64,
    /// Denominator of the classical error variance.
    pub scale_df: f64,
    pub policy: &'a SePolicy,
    pub stats: FitStats,
    pub absorbed: Vec<String>,
}

/// Apply the standard-error policy and the overall Wald F to a linear fit.
pub(crate) fn finish_linear(fit: LinearFit<'_>) -> Result<RawFit> {
    let LinearFit { method, dependent, names, design, ls, df_resid, scale_df, policy, mut stats, absorbed } =
        fit;

    let s2 = if scale_df > 0.0 { ls.rss / scale_df } else { f64::NAN };
    let cov_raw = &ls.xtx_inv * s2;
    let AdjustedCovariance { cov, n_clusters } = adjust(
        &cov_raw,
        &Sandwich { bread: &ls.xtx_inv, design, residuals: &ls.residuals, df_resid },
        policy,
    )?;

    let test_df = match n_clusters {
        Some(g) => (g - 1) as f64,
        None => df_resid,
    };
    if let Some((f, p)) = wald_slopes(&ls.beta, &cov, test_df) {
        stats.f_stat = Some(f);
        stats.f_p_value = Some(p);
    }
    stats.n_clusters = n_clusters;

    log::debug!(
        "{}: n={} k={} rss={:.6e} df_resid={}",
        method.label(),
        stats.n_obs,
        names.len(),
        ls.rss,
        df_resid
    );

    Ok(RawFit {
        method,
        dependent: dependent.to_string(),
        names,
        beta: ls.beta,
        cov_raw,
        cov,
        se_kind: policy.kind(),
        stat_kind: StatKind::T { df: test_df },
        residuals: ls.residuals,
        rss: ls.rss,
        df_resid,
        stats,
        absorbed,
    })
}

/// Centered total sum of squares.
pub(crate) fn centered_tss(y: &[f64]) -> f64 {
    let n = y.len() as f64;
    let mean = y.iter().sum::<f64>() / n;
    y.iter().map(|v| (v - mean) * (v - mean)).sum()
}

/// `(R², adjusted R²)` from sums of squares.
pub(crate) fn r_squared(rss: f64, tss: f64, n: f64, df_resid: f64) -> (f64, f64) {
    let r2 = if tss > 0.0 { 1.0 - rss / tss } else { f64::NAN };
    let adj = if df_resid > 0.0 { 1.0 - (1.0 - r2) * (n - 1.0) / df_resid } else { f64::NAN };
    (r2, adj)
}

/// Gaussian log-likelihood at the ML error variance, with AIC and BIC.
pub(crate) fn gaussian_information(rss: f64, n: f64, n_params: f64) -> (f64, f64, f64) {
    let ll = -0.5 * n * (LN_2PI + (rss / n).ln() + 1.0);
    (ll, -2.0 * ll + 2.0 * n_params, -2.0 * ll + n.ln() * n_params)
}

/// Ordinary least squares with intercept.
pub fn fit_ols(ds: &Dataset, spec: &ModelSpec) -> Result<RawFit> {
    let sample = EstimationSample::build(ds, spec, &[], None)?;
    fit_linear_sample(&sample, Method::Ols)
}

/// Pooled OLS on panel data: entity and time identifiers only shape the
/// sample (complete cases, singleton entities dropped).
pub fn fit_pooled(ds: &Dataset, spec: &ModelSpec) -> Result<RawFit> {
    let (entity, time) = spec.panel_ids()?;
    let sample = EstimationSample::build(ds, spec, &[entity, time], Some(entity))?;
    let mut raw = fit_linear_sample(&sample, Method::Pooled)?;
    raw.stats.n_groups = Some(ds.group_codes(entity, &sample.rows)?.n_levels());
    Ok(raw)
}

/// OLS on a prepared sample. Pooled OLS uses the undebiased `RSS/N` error
/// variance; OLS divides by the residual degrees of freedom.
pub(crate) fn fit_linear_sample(sample: &EstimationSample, method: Method) -> Result<RawFit> {
    let x = sample.design_with_constant();
    let y = sample.y_vector();
    let ls = least_squares(&x, &y, method.label())?;

    let n = sample.n() as f64;
    let n_params = x.ncols() as f64;
    let df_resid = n - n_params;
    let (r2, adj) = r_squared(ls.rss, centered_tss(&sample.y), n, df_resid);
    let (ll, aic, bic) = gaussian_information(ls.rss, n, n_params);

    let stats = FitStats {
        n_obs: sample.n(),
        r_squared: Some(r2),
        adj_r_squared: Some(adj),
        log_likelihood: Some(ll),
        aic: Some(aic),
        bic: Some(bic),
        ..Default::default()
    };
    let scale_df = if method == Method::Pooled { n } else { df_resid };

    finish_linear(LinearFit {
        method,
        dependent: &sample.dependent,
        names: sample.term_names(),
        design: &x,
        ls,
        df_resid,
        scale_df,
        policy: &sample.policy,
        stats,
        absorbed: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sa_core::{CONSTANT, Column, Error};

    fn num(v: &[f64]) -> Column {
        Column::Numeric(v.iter().map(|&x| Some(x)).collect())
    }

    #[test]
    fn test_exact_line() {
        let ds = Dataset::new(vec![
            ("x".into(), num(&[1.0, 2.0, 3.0, 4.0, 5.0])),
            ("y".into(), num(&[3.0, 5.0, 7.0, 9.0, 11.0])),
        ])
        .unwrap();
        let spec = ModelSpec::new(Method::Ols, ["x"]).with_y("y");
        let raw = fit_ols(&ds, &spec).unwrap();
        assert_eq!(raw.names, vec!["x".to_string(), CONSTANT.to_string()]);
        assert_relative_eq!(raw.beta[0], 2.0, epsilon = 1e-10);
        assert_relative_eq!(raw.beta[1], 1.0, epsilon = 1e-10);
        assert!(raw.rss < 1e-20);
        assert_eq!(raw.df_resid, 3.0);
    }

    #[test]
    fn test_small_ols_against_hand_computation() {
        // y = [1, 3, 2, 5], x = [0, 1, 2, 3]
        // x̄ = 1.5, ȳ = 2.75, Sxx = 5, Sxy = 5.5 → b = 1.1, a = 1.1
        let ds = Dataset::new(vec![
            ("x".into(), num(&[0.0, 1.0, 2.0, 3.0])),
            ("y".into(), num(&[1.0, 3.0, 2.0, 5.0])),
        ])
        .unwrap();
        let raw = fit_ols(&ds, &ModelSpec::new(Method::Ols, ["x"]).with_y("y")).unwrap();
        assert_relative_eq!(raw.beta[0], 1.1, epsilon = 1e-12);
        assert_relative_eq!(raw.beta[1], 1.1, epsilon = 1e-12);

        // residuals: [-0.1, 0.8, -1.3, 0.6], rss = 2.7, s² = 1.35
        assert_relative_eq!(raw.rss, 2.7, epsilon = 1e-12);
        assert_relative_eq!(raw.std_err(0), (1.35_f64 / 5.0).sqrt(), epsilon = 1e-12);

        // R² = 1 − 2.7 / 8.75; classical Wald F equals the R² form.
        let r2 = 1.0 - 2.7 / 8.75;
        assert_relative_eq!(raw.stats.r_squared.unwrap(), r2, epsilon = 1e-12);
        let f = (r2 / 1.0) / ((1.0 - r2) / 2.0);
        assert_relative_eq!(raw.stats.f_stat.unwrap(), f, epsilon = 1e-9);
    }

    #[test]
    fn test_collinear_regressors_are_singular() {
        let ds = Dataset::new(vec![
            ("a".into(), num(&[1.0, 2.0, 3.0, 4.0, 5.0])),
            ("b".into(), num(&[2.0, 4.0, 6.0, 8.0, 10.0])),
            ("y".into(), num(&[1.0, 0.0, 2.0, 1.0, 3.0])),
        ])
        .unwrap();
        let spec = ModelSpec::new(Method::Ols, ["a", "b"]).with_y("y");
        assert!(matches!(fit_ols(&ds, &spec), Err(Error::SingularDesign { .. })));
    }
}
