//! Model-comparison tests: F-test of fixed effects against pooled OLS and the
//! Hausman test of fixed against random effects.
//!
//! Both tests consume already-fitted [`RawFit`]s; [`run_f_test`] and
//! [`run_hausman`] fit the required models on a common sample first.
//!
//! # References
//!
//! - Hausman (1978), "Specification tests in econometrics." *Econometrica*.
//! - Stata `hausman` documentation, `sigmamore` option.

use nalgebra::{DMatrix, DVector};
use sa_core::{
    ComparisonResult, ComparisonTest, Dataset, Error, HausmanAudit, Method, ModelSpec, Result,
    SeConfig, Significance,
};
use sa_prob::distributions::{chi2_upper, f_upper};

use crate::econometrics::{fit_fe, fit_re};
use crate::linear::fit_pooled;
use crate::normalize::{RawFit, round_half_even};

/// Rejection threshold behind the conclusion strings.
const CONCLUSION_ALPHA: f64 = 0.05;

/// Relative eigenvalue tolerance for the positive-semidefinite check.
const PSD_REL_TOL: f64 = 1e-10;

/// Covariance convention of the Hausman test.
#[derive(Debug, Clone, Copy)]
pub enum HausmanMode<'a> {
    /// `V_fe − V_re` from each estimator's own classical covariance.
    Default,
    /// Scale `V_fe` by `(σ_re/σ_fe)²` and use the pooled OLS covariance in
    /// place of `V_re`; `σ_re` is the pooled OLS residual standard deviation.
    SigmaMore {
        /// Pooled OLS fit on the same sample.
        pooled: &'a RawFit,
    },
}

fn expect_method(fit: &RawFit, method: Method) -> Result<()> {
    if fit.method != method {
        return Err(Error::Validation(format!(
            "expected a {} fit, got {}",
            method.label(),
            fit.method.label()
        )));
    }
    Ok(())
}

/// F-test of `H0: all entity effects are zero`.
///
/// `F = ((RSS_pooled − RSS_fe)/(n_e − 1)) / (RSS_fe/(N − n_e − k))`.
pub fn f_test(fe: &RawFit, pooled: &RawFit, decimals: u32) -> Result<ComparisonResult> {
    expect_method(fe, Method::Fe)?;
    expect_method(pooled, Method::Pooled)?;
    let n_obs = fe.stats.n_obs;
    if pooled.stats.n_obs != n_obs {
        return Err(Error::Validation(format!(
            "FE and pooled fits use different samples ({} vs {} observations)",
            n_obs, pooled.stats.n_obs
        )));
    }
    let n_entities = fe
        .stats
        .n_groups
        .ok_or_else(|| Error::Validation("FE fit does not report its entity count".into()))?;
    let k = fe.n_slopes();

    let df1 = n_entities.saturating_sub(1);
    let df2 = n_obs as i64 - n_entities as i64 - k as i64;
    if df1 == 0 || df2 <= 0 {
        return Err(Error::Validation(format!(
            "F-test needs at least two entities and positive residual df (entities={n_entities}, df2={df2})"
        )));
    }
    let df2 = df2 as usize;

    let statistic = ((pooled.rss - fe.rss) / df1 as f64) / (fe.rss / df2 as f64);
    let p_value = f_upper(statistic, df1 as f64, df2 as f64);
    log::debug!("F-test: F({df1}, {df2}) = {statistic:.6}, p = {p_value:.6}");

    let conclusion = if p_value < CONCLUSION_ALPHA {
        "reject pooled OLS in favor of fixed effects"
    } else {
        "fail to reject pooled OLS"
    };
    Ok(ComparisonResult {
        test: ComparisonTest::FTest,
        test_name: ComparisonTest::FTest.title().to_string(),
        null_hypothesis: "all entity effects are zero (pooled OLS is adequate)".into(),
        alternative_hypothesis: "at least one entity effect is non-zero (fixed effects preferred)".into(),
        statistic: round_half_even(statistic, decimals),
        df1,
        df2: Some(df2),
        p_value: round_half_even(p_value, decimals),
        significance: Significance::from_p(p_value),
        conclusion: conclusion.into(),
        rss_pooled: Some(round_half_even(pooled.rss, decimals)),
        rss_fe: Some(round_half_even(fe.rss, decimals)),
        n_entities,
        n_obs,
        audit: None,
    })
}

fn sub_vector(fit: &RawFit, idx: &[usize]) -> DVector<f64> {
    DVector::from_iterator(idx.len(), idx.iter().map(|&i| fit.beta[i]))
}

fn sub_matrix(m: &DMatrix<f64>, idx: &[usize]) -> DMatrix<f64> {
    DMatrix::from_fn(idx.len(), idx.len(), |a, b| m[(idx[a], idx[b])])
}

fn positions(fit: &RawFit, names: &[String]) -> Result<Vec<usize>> {
    names
        .iter()
        .map(|n| {
            fit.position(n).ok_or_else(|| {
                Error::Validation(format!("{} fit has no term '{}'", fit.method.label(), n))
            })
        })
        .collect()
}

/// Hausman test of `H0: random effects are consistent`.
///
/// `H = (b_fe − b_re)' (V_fe − V_re)⁺ (b_fe − b_re)` over the terms common to
/// both fits, in FE order, with `df` equal to the number of common terms.
pub fn hausman(
    fe: &RawFit,
    re: &RawFit,
    mode: HausmanMode<'_>,
    decimals: u32,
) -> Result<ComparisonResult> {
    expect_method(fe, Method::Fe)?;
    expect_method(re, Method::Re)?;
    let common: Vec<String> = fe.names.iter().filter(|n| re.position(n).is_some()).cloned().collect();
    if common.is_empty() {
        return Err(Error::Validation("FE and RE fits share no terms".into()));
    }
    let fe_idx = positions(fe, &common)?;
    let re_idx = positions(re, &common)?;

    let b_fe = sub_vector(fe, &fe_idx);
    let b_re = sub_vector(re, &re_idx);
    let (v_fe, v_re, scaling, test) = match mode {
        HausmanMode::Default => {
            (sub_matrix(&fe.cov_raw, &fe_idx), sub_matrix(&re.cov_raw, &re_idx), None, ComparisonTest::Hausman)
        }
        HausmanMode::SigmaMore { pooled } => {
            expect_method(pooled, Method::Pooled)?;
            let pooled_idx = positions(pooled, &common)?;
            let sigma_fe = (fe.rss / fe.df_resid).sqrt();
            let sigma_re = (pooled.rss / pooled.df_resid).sqrt();
            let scaling = (sigma_re / sigma_fe).powi(2);
            if !scaling.is_finite() {
                return Err(Error::Computation(format!(
                    "sigmamore scaling is not finite (sigma_fe={sigma_fe}, sigma_re={sigma_re})"
                )));
            }
            (
                sub_matrix(&fe.cov_raw, &fe_idx) * scaling,
                sub_matrix(&pooled.cov_raw, &pooled_idx),
                Some(scaling),
                ComparisonTest::HausmanSigmaMore,
            )
        }
    };

    let diff = &b_fe - &b_re;
    let v_diff = &v_fe - &v_re;
    let eigen = v_diff.clone().symmetric_eigen().eigenvalues;
    let max_abs = eigen.amax();
    let min_eig = eigen.min();

    if matches!(mode, HausmanMode::Default) && min_eig < -PSD_REL_TOL * max_abs {
        return Err(Error::NonPositiveDefiniteCovariance { variables: common, min_eigenvalue: min_eig });
    }

    let eps = (1e-15 * max_abs).max(f64::MIN_POSITIVE);
    let v_inv = v_diff
        .clone()
        .pseudo_inverse(eps)
        .map_err(|e| Error::Computation(format!("pseudo-inverse of V_fe − V_re failed: {e}")))?;
    let statistic = (diff.transpose() * v_inv * &diff)[(0, 0)];
    if !(statistic >= 0.0) {
        return Err(Error::NonPositiveDefiniteCovariance { variables: common, min_eigenvalue: min_eig });
    }

    let df1 = common.len();
    let p_value = chi2_upper(statistic, df1 as f64);
    log::debug!("Hausman ({test:?}): chi2({df1}) = {statistic:.6}, p = {p_value:.6}");

    let r = |v: f64| round_half_even(v, decimals);
    let audit = HausmanAudit {
        variables: common,
        fe_coef: b_fe.iter().map(|&v| r(v)).collect(),
        re_coef: b_re.iter().map(|&v| r(v)).collect(),
        coef_diff: diff.iter().map(|&v| r(v)).collect(),
        fe_std_err: v_fe.diagonal().iter().map(|&v| r(v.max(0.0).sqrt())).collect(),
        re_std_err: v_re.diagonal().iter().map(|&v| r(v.max(0.0).sqrt())).collect(),
        std_err_diff: v_diff.diagonal().iter().map(|&v| (v > 0.0).then(|| r(v.sqrt()))).collect(),
        scaling,
    };

    let conclusion = if p_value < CONCLUSION_ALPHA {
        "reject random effects in favor of fixed effects"
    } else {
        "fail to reject random effects"
    };
    Ok(ComparisonResult {
        test,
        test_name: test.title().to_string(),
        null_hypothesis: "random effects are consistent (entity effects uncorrelated with regressors)".into(),
        alternative_hypothesis: "fixed effects preferred (entity effects correlated with regressors)".into(),
        statistic: r(statistic),
        df1,
        df2: None,
        p_value: r(p_value),
        significance: Significance::from_p(p_value),
        conclusion: conclusion.into(),
        rss_pooled: None,
        rss_fe: None,
        n_entities: fe.stats.n_groups.unwrap_or(0),
        n_obs: fe.stats.n_obs,
        audit: Some(audit),
    })
}

/// The spec both comparison tests fit under: entity effects only, classical
/// covariance. The caller's spec is validated as written first.
fn comparison_spec(ds: &Dataset, spec: &ModelSpec, method: Method) -> Result<ModelSpec> {
    spec.validate(ds)?;
    spec.panel_ids()?;
    spec.dependent()?;
    let mut s = spec.clone();
    s.method = method;
    s.fe_vars.clear();
    s.se = SeConfig::classical();
    Ok(s)
}

/// Fit FE and pooled OLS on a common sample and run [`f_test`].
pub fn run_f_test(ds: &Dataset, spec: &ModelSpec) -> Result<ComparisonResult> {
    let fe = fit_fe(ds, &comparison_spec(ds, spec, Method::Fe)?)?;
    let pooled = fit_pooled(ds, &comparison_spec(ds, spec, Method::Pooled)?)?;
    f_test(&fe, &pooled, spec.decimals)
}

/// Fit FE, RE (and pooled OLS under `sigmamore`) and run [`hausman`].
pub fn run_hausman(ds: &Dataset, spec: &ModelSpec) -> Result<ComparisonResult> {
    let fe = fit_fe(ds, &comparison_spec(ds, spec, Method::Fe)?)?;
    let re = fit_re(ds, &comparison_spec(ds, spec, Method::Re)?)?;
    if spec.sigmamore {
        let pooled = fit_pooled(ds, &comparison_spec(ds, spec, Method::Pooled)?)?;
        hausman(&fe, &re, HausmanMode::SigmaMore { pooled: &pooled }, spec.decimals)
    } else {
        hausman(&fe, &re, HausmanMode::Default, spec.decimals)
    }
}
