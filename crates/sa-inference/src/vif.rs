//! Variance inflation factors.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use sa_core::{CategoricalHandling, Dataset, Error, ModelSpec, Result};

use crate::linear::{centered_tss, least_squares};
use crate::normalize::round_half_even;

/// Auxiliary R² at or above this counts as perfect collinearity.
const PERFECT_FIT: f64 = 1.0 - 1e-12;

/// VIF of one regressor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VifRow {
    /// Regressor (after categorical expansion).
    pub variable: String,
    /// `1 / (1 − R²_aux)`.
    pub vif: f64,
    /// Tolerance `1 / VIF`.
    pub tolerance: f64,
}

/// Output of `vif`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VifTable {
    /// One row per regressor.
    pub rows: Vec<VifRow>,
    /// Mean VIF.
    pub mean_vif: f64,
    /// Listwise sample size.
    pub n_obs: usize,
    /// Display precision.
    pub decimals: u32,
}

/// Regress each regressor on all others (with a constant).
pub fn variance_inflation(ds: &Dataset, spec: &ModelSpec) -> Result<VifTable> {
    let names: Vec<&str> = spec.x_vars.iter().map(String::as_str).collect();
    let sel = ds.select(&names, CategoricalHandling::Expand)?;
    let n = sel.n_rows();
    let k = sel.n_cols();

    let mut raw = Vec::with_capacity(k);
    for j in 0..k {
        let target = sel.column(j);
        let x = DMatrix::from_fn(n, k, |i, c| match c {
            c if c < j => sel.data[i * k + c],
            c if c + 1 < k => sel.data[i * k + c + 1],
            _ => 1.0,
        });
        let context = format!("VIF auxiliary regression of '{}'", sel.names[j]);
        let ls = least_squares(&x, &DVector::from_column_slice(&target), &context)?;
        let tss = centered_tss(&target);
        let r2 = if tss > 0.0 { 1.0 - ls.rss / tss } else { 1.0 };
        if r2 >= PERFECT_FIT {
            return Err(Error::SingularDesign {
                context: format!("'{}' is perfectly collinear with the other regressors", sel.names[j]),
            });
        }
        raw.push(1.0 / (1.0 - r2));
    }

    let mean_vif = raw.iter().sum::<f64>() / k as f64;
    let d = spec.decimals;
    let rows = sel
        .names
        .iter()
        .zip(&raw)
        .map(|(name, &v)| VifRow {
            variable: name.clone(),
            vif: round_half_even(v, d),
            tolerance: round_half_even(1.0 / v, d),
        })
        .collect();

    Ok(VifTable { rows, mean_vif: round_half_even(mean_vif, d), n_obs: n, decimals: d })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sa_core::{Column, Method};

    fn num(v: &[f64]) -> Column {
        Column::Numeric(v.iter().map(|&x| Some(x)).collect())
    }

    #[test]
    fn test_orthogonal_regressors_have_unit_vif() {
        let ds = Dataset::new(vec![
            ("a".into(), num(&[1.0, -1.0, 1.0, -1.0])),
            ("b".into(), num(&[1.0, 1.0, -1.0, -1.0])),
        ])
        .unwrap();
        let t = variance_inflation(&ds, &ModelSpec::new(Method::Vif, ["a", "b"])).unwrap();
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.rows[0].vif, 1.0);
        assert_eq!(t.rows[1].tolerance, 1.0);
        assert_eq!(t.mean_vif, 1.0);
    }

    #[test]
    fn test_two_regressors_vif_is_one_over_one_minus_r2() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [2.0, 1.0, 4.0, 3.0, 5.0]; // corr(a, b) = 0.8
        let ds = Dataset::new(vec![("a".into(), num(&a)), ("b".into(), num(&b))]).unwrap();
        let t = variance_inflation(&ds, &ModelSpec::new(Method::Vif, ["a", "b"]).with_decimals(6))
            .unwrap();
        let expected = 1.0 / (1.0 - 0.64);
        assert!((t.rows[0].vif - expected).abs() < 1e-6);
        assert!((t.rows[1].vif - expected).abs() < 1e-6);
    }

    #[test]
    fn test_perfect_collinearity_fails() {
        let ds = Dataset::new(vec![
            ("a".into(), num(&[1.0, 2.0, 3.0, 4.0])),
            ("b".into(), num(&[3.0, 1.0, 4.0, 1.0])),
            ("c".into(), num(&[4.0, 3.0, 7.0, 5.0])),
        ])
        .unwrap();
        let spec = ModelSpec::new(Method::Vif, ["a", "b", "c"]);
        assert!(matches!(variance_inflation(&ds, &spec), Err(Error::SingularDesign { .. })));
    }
}
