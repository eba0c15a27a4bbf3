//! Panel linear regression: fixed effects (within) and random effects
//! (Swamy–Arora GLS).
//!
//! Both estimators drop singleton entities, report a `Constant` term and feed
//! their transformed design and residuals to the standard-error policy.
//!
//! # References
//!
//! - Wooldridge, *Econometric Analysis of Cross Section and Panel Data*, Ch. 10.
//! - Swamy & Arora (1972), "The exact finite sample properties of the
//!   estimators of coefficients in the error components regression models."
//! - Baltagi, *Econometric Analysis of Panel Data*, Ch. 2.

use nalgebra::{DMatrix, DVector};
use sa_core::{Dataset, Error, FitStats, Method, ModelSpec, Result};

use super::hdfe::FixedEffects;
use crate::linear::{LinearFit, centered_tss, finish_linear, least_squares, r_squared};
use crate::normalize::RawFit;
use crate::sample::EstimationSample;

/// A within-transformed column whose remaining variation falls below this
/// share of its raw variation is treated as absorbed.
const ABSORBED_REL_TOL: f64 = 1e-10;

/// Fixed-effects estimator.
///
/// Absorbs the dimensions in `spec.fe_vars` (entity effects when empty) and
/// runs OLS on the grand-mean-restored data `ỹ = y − ȳ_g + ȳ`,
/// `x̃ = x − x̄_g + x̄` with an explicit intercept, so the reported constant
/// is `ȳ − x̄'β`. Regressors that the fixed effects absorb entirely are
/// dropped.
pub fn fit_fe(ds: &Dataset, spec: &ModelSpec) -> Result<RawFit> {
    let (entity, time) = spec.panel_ids()?;
    let dims: Vec<&str> =
        if spec.fe_vars.is_empty() { vec![entity] } else { spec.fe_vars.iter().map(String::as_str).collect() };
    let mut keys = vec![entity, time];
    for d in &dims {
        if !keys.contains(d) {
            keys.push(*d);
        }
    }

    let sample = EstimationSample::build(ds, spec, &keys, Some(entity))?;
    let n_entities = ds.group_codes(entity, &sample.rows)?.n_levels();
    let codes =
        dims.iter().map(|d| ds.group_codes(d, &sample.rows).map(|g| g.codes)).collect::<Result<Vec<_>>>()?;
    let fe = FixedEffects::new(codes)?;

    let n = sample.n();
    let y_dm = fe.absorb(&sample.y)?;
    let y_bar = mean(&sample.y);

    let mut names = Vec::with_capacity(sample.k() + 1);
    let mut columns: Vec<Vec<f64>> = Vec::with_capacity(sample.k() + 1);
    for (j, name) in sample.names.iter().enumerate() {
        let raw = sample.x_column(j);
        let dm = fe.absorb(&raw)?;
        let within_ss: f64 = dm.iter().map(|v| v * v).sum();
        if within_ss <= ABSORBED_REL_TOL * centered_tss(&raw).max(f64::MIN_POSITIVE) {
            log::warn!("FE: '{name}' is absorbed by the fixed effects and was dropped");
            continue;
        }
        let x_bar = mean(&raw);
        names.push(name.clone());
        columns.push(dm.into_iter().map(|v| v + x_bar).collect());
    }
    if columns.is_empty() {
        return Err(Error::SingularDesign {
            context: "FE: every regressor is absorbed by the fixed effects".into(),
        });
    }
    names.push(sa_core::CONSTANT.to_string());
    columns.push(vec![1.0; n]);

    let k = columns.len();
    let x = DMatrix::from_fn(n, k, |i, j| columns[j][i]);
    let y = DVector::from_iterator(n, y_dm.iter().map(|v| v + y_bar));
    let ls = least_squares(&x, &y, "FE")?;

    let absorbed_df = fe.absorbed_df() as f64;
    let df_resid = n as f64 - k as f64 - absorbed_df;
    if df_resid <= 0.0 {
        return Err(Error::SingularDesign {
            context: format!("FE: no residual degrees of freedom (n={n}, k={k}, absorbed={absorbed_df})"),
        });
    }

    let within_tss: f64 = y_dm.iter().map(|v| v * v).sum();
    let (r2, adj) = r_squared(ls.rss, within_tss, n as f64, df_resid);
    let stats = FitStats {
        n_obs: n,
        r_squared: Some(r2),
        adj_r_squared: Some(adj),
        n_groups: Some(n_entities),
        sigma_e: Some((ls.rss / df_resid).sqrt()),
        ..Default::default()
    };

    finish_linear(LinearFit {
        method: Method::Fe,
        dependent: &sample.dependent,
        names,
        design: &x,
        ls,
        df_resid,
        scale_df: df_resid,
        policy: &sample.policy,
        stats,
        absorbed: dims.iter().map(|d| d.to_string()).collect(),
    })
}

/// Swamy–Arora variance components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarianceComponents {
    /// Idiosyncratic variance σ²_e.
    pub sigma2_e: f64,
    /// Entity-effect variance σ²_u (clipped at zero).
    pub sigma2_u: f64,
}

impl VarianceComponents {
    /// Quasi-demeaning weight of an entity observed `t` times.
    pub fn theta(&self, t: usize) -> f64 {
        let denom = t as f64 * self.sigma2_u + self.sigma2_e;
        if denom > 0.0 { 1.0 - (self.sigma2_e / denom).sqrt() } else { 0.0 }
    }

    /// Share of the composite error variance due to the entity effect.
    pub fn rho(&self) -> f64 {
        let total = self.sigma2_u + self.sigma2_e;
        if total > 0.0 { self.sigma2_u / total } else { 0.0 }
    }
}

/// Estimate σ²_e from the within regression and σ²_u from the between
/// regression.
///
/// `x` is the `n × k` regressor block without a constant.
pub fn swamy_arora(
    y: &[f64],
    x: &DMatrix<f64>,
    entity: &[usize],
    n_entities: usize,
) -> Result<VarianceComponents> {
    let n = y.len();
    let k = x.ncols();
    let mut sizes = vec![0usize; n_entities];
    for &g in entity {
        sizes[g] += 1;
    }

    // Entity means.
    let mut y_mean = vec![0.0; n_entities];
    let mut x_mean = DMatrix::<f64>::zeros(n_entities, k);
    for i in 0..n {
        let g = entity[i];
        y_mean[g] += y[i];
        for j in 0..k {
            x_mean[(g, j)] += x[(i, j)];
        }
    }
    for g in 0..n_entities {
        let t = sizes[g] as f64;
        y_mean[g] /= t;
        for j in 0..k {
            x_mean[(g, j)] /= t;
        }
    }

    // Within regression; time-invariant regressors leave a rank-deficient
    // block, so solve by pseudo-inverse.
    let y_w = DVector::from_fn(n, |i, _| y[i] - y_mean[entity[i]]);
    let x_w = DMatrix::from_fn(n, k, |i, j| x[(i, j)] - x_mean[(entity[i], j)]);
    let ssr_within = pinv_rss(&x_w, &y_w)?;

    let df_within = n as f64 - n_entities as f64 - k as f64;
    if df_within <= 0.0 {
        return Err(Error::SingularDesign {
            context: format!("RE: within regression has no residual degrees of freedom ({df_within})"),
        });
    }
    let sigma2_e = ssr_within / df_within;

    // Between regression on entity means with a constant.
    let df_between = n_entities as f64 - k as f64 - 1.0;
    if df_between <= 0.0 {
        return Err(Error::SingularDesign {
            context: format!("RE: {n_entities} entities cannot identify {} between coefficients", k + 1),
        });
    }
    let x_b = DMatrix::from_fn(n_entities, k + 1, |g, j| if j < k { x_mean[(g, j)] } else { 1.0 });
    let y_b = DVector::from_column_slice(&y_mean);
    let ssr_between = pinv_rss(&x_b, &y_b)?;

    let t_bar = n_entities as f64 / sizes.iter().map(|&t| 1.0 / t as f64).sum::<f64>();
    let sigma2_u = (ssr_between / df_between - sigma2_e / t_bar).max(0.0);
    Ok(VarianceComponents { sigma2_e, sigma2_u })
}

fn pinv_rss(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<f64> {
    if x.ncols() == 0 {
        return Ok(y.norm_squared());
    }
    let pinv = x
        .clone()
        .pseudo_inverse(1e-12)
        .map_err(|e| Error::Computation(format!("pseudo-inverse failed: {e}")))?;
    let beta = pinv * y;
    Ok((y - x * beta).norm_squared())
}

/// Random-effects (GLS) estimator.
///
/// Quasi-demeans `y`, the regressors and the constant by `θ_i` and runs OLS
/// on the transformed data. The classical covariance uses `RSS/N`.
pub fn fit_re(ds: &Dataset, spec: &ModelSpec) -> Result<RawFit> {
    let (entity, time) = spec.panel_ids()?;
    let sample = EstimationSample::build(ds, spec, &[entity, time], Some(entity))?;
    let groups = ds.group_codes(entity, &sample.rows)?;
    let n_entities = groups.n_levels();
    let codes = &groups.codes;

    let n = sample.n();
    let k = sample.k();
    let x_raw = DMatrix::from_row_slice(n, k, &sample.x);
    let vc = swamy_arora(&sample.y, &x_raw, codes, n_entities)?;

    let mut sizes = vec![0usize; n_entities];
    let mut y_mean = vec![0.0; n_entities];
    let mut x_mean = DMatrix::<f64>::zeros(n_entities, k);
    for i in 0..n {
        let g = codes[i];
        sizes[g] += 1;
        y_mean[g] += sample.y[i];
        for j in 0..k {
            x_mean[(g, j)] += x_raw[(i, j)];
        }
    }
    for g in 0..n_entities {
        let t = sizes[g] as f64;
        y_mean[g] /= t;
        for j in 0..k {
            x_mean[(g, j)] /= t;
        }
    }
    let theta: Vec<f64> = sizes.iter().map(|&t| vc.theta(t)).collect();

    let x = DMatrix::from_fn(n, k + 1, |i, j| {
        let g = codes[i];
        if j < k { x_raw[(i, j)] - theta[g] * x_mean[(g, j)] } else { 1.0 - theta[g] }
    });
    let y = DVector::from_fn(n, |i, _| sample.y[i] - theta[codes[i]] * y_mean[codes[i]]);
    let ls = least_squares(&x, &y, "RE")?;

    // Overall R²: squared correlation of y with the untransformed fit.
    let fitted: Vec<f64> = (0..n)
        .map(|i| (0..k).map(|j| x_raw[(i, j)] * ls.beta[j]).sum::<f64>() + ls.beta[k])
        .collect();
    let r2 = squared_correlation(&sample.y, &fitted);
    let df_resid = n as f64 - (k + 1) as f64;
    let adj = if df_resid > 0.0 { 1.0 - (1.0 - r2) * (n as f64 - 1.0) / df_resid } else { f64::NAN };

    log::debug!("RE: sigma2_e={:.6e} sigma2_u={:.6e}", vc.sigma2_e, vc.sigma2_u);
    let stats = FitStats {
        n_obs: n,
        r_squared: Some(r2),
        adj_r_squared: Some(adj),
        n_groups: Some(n_entities),
        sigma_e: Some(vc.sigma2_e.sqrt()),
        sigma_u: Some(vc.sigma2_u.sqrt()),
        rho: Some(vc.rho()),
        ..Default::default()
    };

    finish_linear(LinearFit {
        method: Method::Re,
        dependent: &sample.dependent,
        names: sample.term_names(),
        design: &x,
        ls,
        df_resid,
        scale_df: n as f64,
        policy: &sample.policy,
        stats,
        absorbed: Vec::new(),
    })
}

fn mean(v: &[f64]) -> f64 {
    v.iter().sum::<f64>() / v.len() as f64
}

fn squared_correlation(a: &[f64], b: &[f64]) -> f64 {
    let (ma, mb) = (mean(a), mean(b));
    let mut sab = 0.0;
    let mut saa = 0.0;
    let mut sbb = 0.0;
    for (x, y) in a.iter().zip(b) {
        sab += (x - ma) * (y - mb);
        saa += (x - ma) * (x - ma);
        sbb += (y - mb) * (y - mb);
    }
    if saa > 0.0 && sbb > 0.0 { sab * sab / (saa * sbb) } else { f64::NAN }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sa_core::{CONSTANT, Column};

    fn num(v: &[f64]) -> Column {
        Column::Numeric(v.iter().map(|&x| Some(x)).collect())
    }

    fn two_entities() -> Dataset {
        // Entity 1: y ≈ 5 + 3x, entity 2: y ≈ 10 + 3x, entity 3 observed once.
        Dataset::new(vec![
            ("id".into(), num(&[1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0, 3.0])),
            ("t".into(), num(&[1.0, 2.0, 3.0, 4.0, 1.0, 2.0, 3.0, 4.0, 1.0])),
            ("x".into(), num(&[1.0, 2.0, 3.0, 4.0, 1.0, 2.0, 3.0, 4.0, 9.0])),
            ("y".into(), num(&[8.1, 11.0, 13.9, 17.1, 13.0, 16.1, 18.9, 22.0, 0.0])),
        ])
        .unwrap()
    }

    #[test]
    fn test_fe_recovers_common_slope() {
        let ds = two_entities();
        let spec = ModelSpec::new(Method::Fe, ["x"]).with_y("y").with_panel("id", "t");
        let raw = fit_fe(&ds, &spec).unwrap();
        assert_eq!(raw.stats.n_obs, 8);
        assert_eq!(raw.stats.n_groups, Some(2));
        assert_eq!(raw.names, vec!["x".to_string(), CONSTANT.to_string()]);
        assert!((raw.beta[0] - 3.0).abs() < 0.2, "beta={}", raw.beta[0]);
        // n − k − 1 − (entities − 1)
        assert_eq!(raw.df_resid, 5.0);
        assert_eq!(raw.absorbed, vec!["id".to_string()]);

        // Restored constant is ȳ − x̄β.
        let y_bar = [8.1, 11.0, 13.9, 17.1, 13.0, 16.1, 18.9, 22.0].iter().sum::<f64>() / 8.0;
        assert_relative_eq!(raw.beta[1], y_bar - 2.5 * raw.beta[0], epsilon = 1e-9);
    }

    #[test]
    fn test_fe_drops_time_invariant_regressor() {
        let ds = Dataset::new(vec![
            ("id".into(), num(&[1.0, 1.0, 1.0, 2.0, 2.0, 2.0])),
            ("t".into(), num(&[1.0, 2.0, 3.0, 1.0, 2.0, 3.0])),
            ("x".into(), num(&[1.0, 2.0, 4.0, 2.0, 3.0, 3.5])),
            ("z".into(), num(&[7.0, 7.0, 7.0, 1.0, 1.0, 1.0])),
            ("y".into(), num(&[2.0, 4.1, 8.0, 5.0, 7.1, 8.0])),
        ])
        .unwrap();
        let spec = ModelSpec::new(Method::Fe, ["x", "z"]).with_y("y").with_panel("id", "t");
        let raw = fit_fe(&ds, &spec).unwrap();
        assert_eq!(raw.names, vec!["x".to_string(), CONSTANT.to_string()]);
    }

    #[test]
    fn test_theta_limits() {
        let none = VarianceComponents { sigma2_e: 1.0, sigma2_u: 0.0 };
        assert_eq!(none.theta(5), 0.0);
        assert_eq!(none.rho(), 0.0);
        let strong = VarianceComponents { sigma2_e: 1.0, sigma2_u: 3.0 };
        // 1 − sqrt(1 / (4·3 + 1))
        assert_relative_eq!(strong.theta(4), 1.0 - (1.0_f64 / 13.0).sqrt(), epsilon = 1e-15);
        assert_relative_eq!(strong.rho(), 0.75, epsilon = 1e-15);
    }

    #[test]
    fn test_re_with_zero_entity_variance_matches_pooled() {
        // Every entity has the same means of x and y, so the between
        // regression fits exactly, σ²_u clips to 0 and θ = 0.
        let ds = Dataset::new(vec![
            ("id".into(), num(&[1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0, 4.0, 4.0, 4.0])),
            ("t".into(), num(&[1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 1.0, 2.0, 3.0])),
            ("x".into(), num(&[1.0, 2.0, 4.0, 2.0, 4.0, 1.0, 4.0, 1.0, 2.0, 1.0, 4.0, 2.0])),
            ("y".into(), num(&[2.25, 3.5, 6.25, 3.5, 6.0, 2.5, 5.75, 2.5, 3.75, 2.0, 6.25, 3.75])),
        ])
        .unwrap();
        let spec = ModelSpec::new(Method::Re, ["x"]).with_y("y").with_panel("id", "t");
        let re = fit_re(&ds, &spec).unwrap();
        let pooled = crate::linear::fit_pooled(&ds, &spec).unwrap();
        assert_eq!(re.stats.sigma_u, Some(0.0));
        assert_eq!(re.stats.rho, Some(0.0));
        assert!(re.stats.sigma_e.unwrap() > 0.0);
        assert_relative_eq!(re.beta[0], pooled.beta[0], epsilon = 1e-10);
        assert_relative_eq!(re.beta[1], pooled.beta[1], epsilon = 1e-10);
        assert_eq!(re.stats.n_groups, Some(4));
    }
}
