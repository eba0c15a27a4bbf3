//! Estimation samples: complete-case rows, expanded design and resolved
//! standard-error policy for one regression request.

use nalgebra::{DMatrix, DVector};
use sa_core::{CONSTANT, CategoricalHandling, Dataset, Error, ModelSpec, Result, SeKind};

use crate::covariance::SePolicy;

/// Rows and columns a regression estimator works on.
#[derive(Debug, Clone)]
pub struct EstimationSample {
    /// Dataset rows in the sample.
    pub rows: Vec<usize>,
    /// Dependent variable name.
    pub dependent: String,
    /// Dependent variable.
    pub y: Vec<f64>,
    /// Regressor names after categorical expansion (no constant).
    pub names: Vec<String>,
    /// Regressors, row-major `n × k`.
    pub x: Vec<f64>,
    /// Standard-error policy resolved on `rows`.
    pub policy: SePolicy,
}

impl EstimationSample {
    /// Build the sample for `spec`.
    ///
    /// `keys` are additional identifiers (entity, time, absorbed dimensions)
    /// that must be present on every row. When `singleton_key` is set, rows
    /// whose level of that variable occurs only once are dropped.
    pub fn build(
        ds: &Dataset,
        spec: &ModelSpec,
        keys: &[&str],
        singleton_key: Option<&str>,
    ) -> Result<Self> {
        let dependent = spec.dependent()?;
        let mut vars: Vec<&str> = vec![dependent];
        vars.extend(spec.x_vars.iter().map(String::as_str));
        vars.extend_from_slice(keys);
        if let Some(c) = spec.se.cluster_var.as_deref() {
            vars.push(c);
        }
        let mut seen = Vec::with_capacity(vars.len());
        vars.retain(|v| {
            let fresh = !seen.contains(v);
            seen.push(*v);
            fresh
        });

        let mut rows = ds.complete_rows(&vars)?;
        if let Some(key) = singleton_key {
            rows = drop_singletons(ds, key, &rows)?;
            if rows.is_empty() {
                return Err(Error::EmptySample { variables: vars.iter().map(|s| s.to_string()).collect() });
            }
        }

        let y = ds.numeric(dependent, &rows)?;
        let x_names: Vec<&str> = spec.x_vars.iter().map(String::as_str).collect();
        let (names, x) = ds.design(&x_names, &rows, CategoricalHandling::Expand)?;

        let policy = match (spec.se.kind, spec.se.cluster_var.as_deref()) {
            (SeKind::Classical, _) => SePolicy::Classical,
            (SeKind::Robust, _) => SePolicy::Robust,
            (SeKind::Cluster, Some(var)) => SePolicy::cluster(var, ds.group_codes(var, &rows)?.codes)?,
            (SeKind::Cluster, None) => {
                return Err(Error::Validation("cluster standard errors require cluster_var".into()));
            }
        };

        Ok(Self { rows, dependent: dependent.to_string(), y, names, x, policy })
    }

    /// Observation count.
    pub fn n(&self) -> usize {
        self.rows.len()
    }

    /// Regressor count (no constant).
    pub fn k(&self) -> usize {
        self.names.len()
    }

    /// Regressor `j` as a column.
    pub fn x_column(&self, j: usize) -> Vec<f64> {
        let k = self.k();
        (0..self.n()).map(|i| self.x[i * k + j]).collect()
    }

    /// `y` as a vector.
    pub fn y_vector(&self) -> DVector<f64> {
        DVector::from_column_slice(&self.y)
    }

    /// Design `[X, 1]`, constant last.
    pub fn design_with_constant(&self) -> DMatrix<f64> {
        let (n, k) = (self.n(), self.k());
        DMatrix::from_fn(n, k + 1, |i, j| if j < k { self.x[i * k + j] } else { 1.0 })
    }

    /// Term names `[names..., Constant]`.
    pub fn term_names(&self) -> Vec<String> {
        let mut out = self.names.clone();
        out.push(CONSTANT.to_string());
        out
    }
}

/// Keep only rows whose `key` level occurs at least twice among `rows`.
pub fn drop_singletons(ds: &Dataset, key: &str, rows: &[usize]) -> Result<Vec<usize>> {
    let g = ds.group_codes(key, rows)?;
    let mut counts = vec![0usize; g.n_levels()];
    for &c in &g.codes {
        counts[c] += 1;
    }
    let kept: Vec<usize> =
        rows.iter().zip(&g.codes).filter(|(_, c)| counts[**c] > 1).map(|(&r, _)| r).collect();
    let dropped = rows.len() - kept.len();
    if dropped > 0 {
        log::debug!("dropped {dropped} singleton observation(s) of '{key}'");
    }
    Ok(kept)
}
