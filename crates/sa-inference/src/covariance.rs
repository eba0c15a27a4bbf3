//! Standard-error policy: classical, heteroskedasticity-robust (HC1) and
//! one-way cluster-robust covariance.
//!
//! Every estimator hands the same four ingredients to [`adjust`]: its raw
//! (classical) covariance, the bread of the sandwich, the design it was fitted
//! on and the per-observation residuals that enter the score. For linear
//! models the bread is `(X'X)^{-1}` and the residuals are ordinary residuals;
//! for binary choice the bread is the inverse information and the residuals
//! are the generalized residuals `∂ℓ_i/∂η_i`.
//!
//! # References
//!
//! - White (1980), "A heteroskedasticity-consistent covariance matrix estimator."
//! - Liang & Zeger (1986), "Longitudinal data analysis using generalized linear models."

use nalgebra::{DMatrix, DVector};
use sa_core::{Error, Result, SeKind};

/// Variance estimator selected by configuration, with cluster codes resolved
/// against the estimation sample.
#[derive(Debug, Clone, PartialEq)]
pub enum SePolicy {
    /// Pass the raw covariance through unchanged.
    Classical,
    /// HC1 sandwich.
    Robust,
    /// One-way cluster sandwich.
    Cluster {
        /// Cluster variable name.
        variable: String,
        /// Dense cluster code of every sample row.
        codes: Vec<usize>,
        /// Number of distinct clusters.
        n_clusters: usize,
    },
}

impl SePolicy {
    /// Build a cluster policy, rejecting fewer than two clusters.
    pub fn cluster(variable: impl Into<String>, codes: Vec<usize>) -> Result<Self> {
        let variable = variable.into();
        let n_clusters = codes.iter().copied().max().map_or(0, |m| m + 1);
        if n_clusters < 2 {
            return Err(Error::InsufficientClusters { variable, found: n_clusters });
        }
        Ok(SePolicy::Cluster { variable, codes, n_clusters })
    }

    /// Configuration-level kind.
    pub fn kind(&self) -> SeKind {
        match self {
            SePolicy::Classical => SeKind::Classical,
            SePolicy::Robust => SeKind::Robust,
            SePolicy::Cluster { .. } => SeKind::Cluster,
        }
    }

    /// Cluster count, when clustering.
    pub fn n_clusters(&self) -> Option<usize> {
        match self {
            SePolicy::Cluster { n_clusters, .. } => Some(*n_clusters),
            _ => None,
        }
    }
}

/// Sandwich ingredients of one fitted model.
#[derive(Debug, Clone, Copy)]
pub struct Sandwich<'a> {
    /// `(X'X)^{-1}` or the inverse information matrix, `K × K`.
    pub bread: &'a DMatrix<f64>,
    /// Design the model was fitted on, `N × K`.
    pub design: &'a DMatrix<f64>,
    /// Per-observation residuals entering the score `x_i e_i`.
    pub residuals: &'a DVector<f64>,
    /// Residual degrees of freedom used by the HC1 correction.
    pub df_resid: f64,
}

/// Output of [`adjust`].
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustedCovariance {
    /// Covariance under the selected policy.
    pub cov: DMatrix<f64>,
    /// Cluster count under clustering.
    pub n_clusters: Option<usize>,
}

/// Apply `policy` to a fitted model's raw covariance.
pub fn adjust(
    cov_raw: &DMatrix<f64>,
    sandwich: &Sandwich<'_>,
    policy: &SePolicy,
) -> Result<AdjustedCovariance> {
    let n = sandwich.design.nrows();
    let k = sandwich.design.ncols();
    if sandwich.residuals.len() != n {
        return Err(Error::Validation(format!(
            "residuals length ({}) != design rows ({})",
            sandwich.residuals.len(),
            n
        )));
    }
    if sandwich.bread.nrows() != k || sandwich.bread.ncols() != k {
        return Err(Error::Validation(format!("bread must be {k}x{k}")));
    }

    match policy {
        SePolicy::Classical => Ok(AdjustedCovariance { cov: cov_raw.clone(), n_clusters: None }),
        SePolicy::Robust => {
            ensure_full_rank(sandwich.design, "robust covariance")?;
            // Each observation is its own cluster.
            let codes: Vec<usize> = (0..n).collect();
            let meat = score_outer_products(sandwich.design, sandwich.residuals, &codes, n);
            let nf = n as f64;
            let correction = if sandwich.df_resid > 0.0 { nf / sandwich.df_resid } else { 1.0 };
            let cov = sandwich.bread * meat * sandwich.bread * correction;
            Ok(AdjustedCovariance { cov: symmetrize(cov), n_clusters: None })
        }
        SePolicy::Cluster { variable, codes, n_clusters } => {
            if codes.len() != n {
                return Err(Error::Validation(format!(
                    "cluster codes for '{}' have length {}, expected {}",
                    variable,
                    codes.len(),
                    n
                )));
            }
            if *n_clusters < 2 {
                return Err(Error::InsufficientClusters {
                    variable: variable.clone(),
                    found: *n_clusters,
                });
            }
            ensure_full_rank(sandwich.design, "cluster-robust covariance")?;
            let meat = score_outer_products(sandwich.design, sandwich.residuals, codes, *n_clusters);

            // Small-sample correction: G/(G-1) * (N-1)/(N-K)
            let g = *n_clusters as f64;
            let nf = n as f64;
            let kf = k as f64;
            let correction =
                if nf > kf { (g / (g - 1.0)) * ((nf - 1.0) / (nf - kf)) } else { g / (g - 1.0) };
            let cov = sandwich.bread * meat * sandwich.bread * correction;
            Ok(AdjustedCovariance { cov: symmetrize(cov), n_clusters: Some(*n_clusters) })
        }
    }
}

/// Fail with [`Error::SingularDesign`] when `design` is rank-deficient.
///
/// Uses the numpy `matrix_rank` threshold `max(N, K) · ε · σ_max`.
pub fn ensure_full_rank(design: &DMatrix<f64>, context: &str) -> Result<()> {
    let k = design.ncols();
    if k == 0 {
        return Ok(());
    }
    if design.nrows() < k {
        return Err(Error::SingularDesign {
            context: format!("{context}: {} observations for {} parameters", design.nrows(), k),
        });
    }
    let sv = design.singular_values();
    let s_max = sv.iter().copied().fold(0.0_f64, f64::max);
    let tol = design.nrows().max(k) as f64 * f64::EPSILON * s_max;
    let rank = sv.iter().filter(|&&s| s > tol).count();
    if rank < k || s_max == 0.0 {
        return Err(Error::SingularDesign {
            context: format!("{context}: design has rank {rank} < {k} columns"),
        });
    }
    Ok(())
}

/// `Σ_g s_g s_g'` with `s_g = Σ_{i∈g} x_i e_i`.
fn score_outer_products(
    x: &DMatrix<f64>,
    residuals: &DVector<f64>,
    codes: &[usize],
    n_groups: usize,
) -> DMatrix<f64> {
    let k = x.ncols();
    let mut scores = DMatrix::<f64>::zeros(n_groups, k);
    for (i, &g) in codes.iter().enumerate() {
        let e = residuals[i];
        for j in 0..k {
            scores[(g, j)] += x[(i, j)] * e;
        }
    }
    scores.transpose() * scores
}

fn symmetrize(m: DMatrix<f64>) -> DMatrix<f64> {
    (&m + m.transpose()) * 0.5
}
