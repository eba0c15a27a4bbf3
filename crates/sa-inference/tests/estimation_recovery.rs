//! Estimator recovery on synthetic data.
//!
//! Covers:
//! - OLS against the closed-form normal equations
//! - robust vs classical SEs under homoskedastic errors
//! - cluster SEs with one observation per cluster vs HC1
//! - FE with entity and two-way effects recovering the slope
//! - RE diagnostics
//! - logit/probit coefficient recovery

use approx::assert_relative_eq;
use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use sa_core::{Column, Dataset, Method, ModelSpec, SeConfig, SeKind, StatKind};
use sa_inference::{estimate, normalize, run};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn numeric(v: &[f64]) -> Column {
    Column::Numeric(v.iter().map(|&x| Some(x)).collect())
}

fn cross_section(n: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let eps = Normal::new(0.0, 1.0).unwrap();
    let x1: Vec<f64> = (0..n).map(|_| eps.sample(&mut rng)).collect();
    let x2: Vec<f64> = (0..n).map(|_| 2.0 * eps.sample(&mut rng) + 1.0).collect();
    let y: Vec<f64> =
        (0..n).map(|i| 1.0 + 2.0 * x1[i] - 0.5 * x2[i] + eps.sample(&mut rng)).collect();
    let id: Vec<f64> = (0..n).map(|i| i as f64).collect();
    Dataset::new(vec![
        ("y".into(), numeric(&y)),
        ("x1".into(), numeric(&x1)),
        ("x2".into(), numeric(&x2)),
        ("id".into(), numeric(&id)),
    ])
    .unwrap()
}

/// Balanced panel with entity effects `alpha_i` and time effects `gamma_t`.
/// `x` loads on `alpha_i` with weight `corr` so the effects can be made
/// correlated with the regressor.
fn panel(entities: usize, periods: usize, corr: f64, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let eps = Normal::new(0.0, 1.0).unwrap();
    let alpha: Vec<f64> = (0..entities).map(|_| 2.0 * eps.sample(&mut rng)).collect();
    let gamma: Vec<f64> = (0..periods).map(|t| 0.3 * t as f64).collect();

    let (mut y, mut x, mut id, mut t) = (Vec::new(), Vec::new(), Vec::new(), Vec::new());
    for i in 0..entities {
        for p in 0..periods {
            let xi = corr * alpha[i] + eps.sample(&mut rng);
            y.push(1.0 + 1.5 * xi + alpha[i] + gamma[p] + eps.sample(&mut rng));
            x.push(xi);
            id.push(i as f64);
            t.push(p as f64);
        }
    }
    Dataset::new(vec![
        ("y".into(), numeric(&y)),
        ("x".into(), numeric(&x)),
        ("firm".into(), numeric(&id)),
        ("year".into(), numeric(&t)),
    ])
    .unwrap()
}

fn closed_form(ds: &Dataset) -> DVector<f64> {
    let rows: Vec<usize> = (0..ds.n_rows()).collect();
    let x1 = ds.numeric("x1", &rows).unwrap();
    let x2 = ds.numeric("x2", &rows).unwrap();
    let y = DVector::from_vec(ds.numeric("y", &rows).unwrap());
    let x = DMatrix::from_fn(rows.len(), 3, |i, j| match j {
        0 => x1[i],
        1 => x2[i],
        _ => 1.0,
    });
    let xtx = x.transpose() * &x;
    xtx.try_inverse().unwrap() * x.transpose() * y
}

// ---------------------------------------------------------------------------
// OLS and the standard-error policy
// ---------------------------------------------------------------------------

#[test]
fn test_ols_matches_normal_equations() {
    let ds = cross_section(300, 7);
    let spec = ModelSpec::new(Method::Ols, ["x1", "x2"]).with_y("y");
    let raw = estimate(&ds, &spec).unwrap();
    let expected = closed_form(&ds);

    assert_eq!(raw.names, vec!["x1", "x2", "Constant"]);
    for j in 0..3 {
        assert_relative_eq!(raw.beta[j], expected[j], epsilon = 1e-9);
    }
    assert_eq!(raw.df_resid, 297.0);
    assert_eq!(raw.stat_kind, StatKind::T { df: 297.0 });

    let r = normalize(&raw, 3);
    assert_eq!(r.stats.n_obs, 300);
    assert!((r.coefficient("x1").unwrap().coef - 2.0).abs() < 0.2);
    assert!((r.coefficient("x2").unwrap().coef + 0.5).abs() < 0.1);
    assert!(r.stats.r_squared.unwrap() > 0.5);
    assert!(r.stats.aic.is_some() && r.stats.bic.is_some());
}

#[test]
fn test_robust_close_to_classical_under_homoskedasticity() {
    let ds = cross_section(2000, 11);
    let base = ModelSpec::new(Method::Ols, ["x1", "x2"]).with_y("y");
    let classical = estimate(&ds, &base).unwrap();
    let robust = estimate(&ds, &base.clone().with_se(SeConfig::robust())).unwrap();

    assert_eq!(robust.se_kind, SeKind::Robust);
    for j in 0..3 {
        assert_eq!(classical.beta[j], robust.beta[j]);
        let ratio = robust.std_err(j) / classical.std_err(j);
        assert!((0.85..1.15).contains(&ratio), "term {j}: ratio {ratio}");
    }
}

#[test]
fn test_singleton_clusters_reproduce_hc1() {
    let ds = cross_section(150, 3);
    let base = ModelSpec::new(Method::Ols, ["x1", "x2"]).with_y("y");
    let robust = estimate(&ds, &base.clone().with_se(SeConfig::robust())).unwrap();
    let cluster = estimate(&ds, &base.with_se(SeConfig::cluster("id"))).unwrap();

    for j in 0..3 {
        assert_relative_eq!(cluster.std_err(j), robust.std_err(j), max_relative = 1e-10);
    }
    assert_eq!(cluster.stats.n_clusters, Some(150));
    assert_eq!(cluster.stat_kind, StatKind::T { df: 149.0 });
}

// ---------------------------------------------------------------------------
// Panel estimators
// ---------------------------------------------------------------------------

#[test]
fn test_fe_recovers_slope_under_correlated_effects() {
    let ds = panel(60, 6, 1.0, 21);
    let spec = ModelSpec::new(Method::Fe, ["x"]).with_y("y").with_panel("firm", "year");
    let fe = normalize(&estimate(&ds, &spec).unwrap(), 4);
    let slope = fe.coefficient("x").unwrap().coef;
    assert!((slope - 1.5).abs() < 0.15, "FE slope {slope}");
    assert_eq!(fe.stats.n_groups, Some(60));
    assert_eq!(fe.absorbed, vec!["firm"]);
    assert_eq!(fe.names().last(), Some("Constant"));

    // Pooled OLS is biased upward by the correlated entity effect.
    let pooled_spec = ModelSpec::new(Method::Pooled, ["x"]).with_y("y").with_panel("firm", "year");
    let pooled = normalize(&estimate(&ds, &pooled_spec).unwrap(), 4);
    assert!(pooled.coefficient("x").unwrap().coef > slope + 0.2);
}

#[test]
fn test_two_way_fe_absorbs_time_effects() {
    let ds = panel(40, 8, 0.5, 5);
    let mut spec = ModelSpec::new(Method::Fe, ["x"]).with_y("y").with_panel("firm", "year");
    spec.fe_vars = vec!["firm".into(), "year".into()];
    let raw = estimate(&ds, &spec).unwrap();
    let slope = raw.beta[raw.position("x").unwrap()];
    assert!((slope - 1.5).abs() < 0.15, "two-way slope {slope}");
    // N − k − 1 − (entities − 1) − (periods − 1)
    assert_eq!(raw.df_resid, (320 - 1 - 1 - 39 - 7) as f64);
    assert_eq!(raw.absorbed, vec!["firm", "year"]);
}

#[test]
fn test_re_reports_variance_components() {
    let ds = panel(80, 5, 0.0, 9);
    let spec = ModelSpec::new(Method::Re, ["x"]).with_y("y").with_panel("firm", "year");
    let re = normalize(&estimate(&ds, &spec).unwrap(), 4);
    let slope = re.coefficient("x").unwrap().coef;
    assert!((slope - 1.5).abs() < 0.2, "RE slope {slope}");

    let sigma_u = re.stats.sigma_u.unwrap();
    let sigma_e = re.stats.sigma_e.unwrap();
    let rho = re.stats.rho.unwrap();
    assert!(sigma_u > 1.0, "sigma_u {sigma_u}");
    assert!(sigma_e > 0.8 && sigma_e < 1.5, "sigma_e {sigma_e}");
    assert!((rho - sigma_u * sigma_u / (sigma_u * sigma_u + sigma_e * sigma_e)).abs() < 1e-3);
}

// ---------------------------------------------------------------------------
// Binary choice
// ---------------------------------------------------------------------------

fn binary_data(n: usize, probit: bool, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let eps = Normal::new(0.0, 1.0).unwrap();
    let logistic = rand_distr::Uniform::new(0.0f64, 1.0).unwrap();
    let (mut y, mut x) = (Vec::with_capacity(n), Vec::with_capacity(n));
    for _ in 0..n {
        let xi = eps.sample(&mut rng);
        let index = 0.5 + 1.0 * xi;
        let latent = if probit {
            index + eps.sample(&mut rng)
        } else {
            let u: f64 = logistic.sample(&mut rng);
            index + (u / (1.0 - u)).ln()
        };
        y.push(if latent > 0.0 { 1.0 } else { 0.0 });
        x.push(xi);
    }
    Dataset::new(vec![("y".into(), numeric(&y)), ("x".into(), numeric(&x))]).unwrap()
}

#[test]
fn test_logit_and_probit_recover_index() {
    for (method, probit) in [(Method::Logit, false), (Method::Probit, true)] {
        let ds = binary_data(4000, probit, 17);
        let spec = ModelSpec::new(method, ["x"]).with_y("y");
        let out = run(&ds, &spec).unwrap();
        let r = out.as_estimation().unwrap();
        assert_eq!(r.stat_kind, StatKind::Z);
        let b = r.coefficient("x").unwrap().coef;
        let c = r.coefficient("Constant").unwrap().coef;
        assert!((b - 1.0).abs() < 0.15, "{method}: slope {b}");
        assert!((c - 0.5).abs() < 0.15, "{method}: constant {c}");
        assert!(r.stats.pseudo_r_squared.unwrap() > 0.05);
        assert!(r.stats.lr_chi2.unwrap() > 100.0);
    }
}
