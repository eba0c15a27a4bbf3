//! Pearson correlation matrix over a listwise-complete sample.

use serde::Serialize;
use sa_core::{Dataset, Error, ModelSpec, Result, Significance};
use sa_prob::distributions::t_two_sided;

use crate::normalize::round_half_even;

/// Output of `corr`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    /// Variables in request order.
    pub variables: Vec<String>,
    /// Common sample size.
    pub n_obs: usize,
    /// `r[i][j]`, rounded.
    pub coefficients: Vec<Vec<f64>>,
    /// Two-sided p-values, rounded (1 on the diagonal).
    pub p_values: Vec<Vec<f64>>,
    /// Stars per cell (none on the diagonal).
    pub significance: Vec<Vec<Significance>>,
    /// Display precision.
    pub decimals: u32,
}

/// Pearson correlation and its two-sided p-value on `n − 2` degrees of freedom.
pub fn pearson(a: &[f64], b: &[f64]) -> (f64, f64) {
    let n = a.len() as f64;
    let ma = a.iter().sum::<f64>() / n;
    let mb = b.iter().sum::<f64>() / n;
    let (mut sab, mut saa, mut sbb) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        sab += (x - ma) * (y - mb);
        saa += (x - ma) * (x - ma);
        sbb += (y - mb) * (y - mb);
    }
    if saa <= 0.0 || sbb <= 0.0 {
        return (f64::NAN, f64::NAN);
    }
    let r = (sab / (saa * sbb).sqrt()).clamp(-1.0, 1.0);
    let df = n - 2.0;
    let p = if df <= 0.0 {
        f64::NAN
    } else if r.abs() >= 1.0 {
        0.0
    } else {
        t_two_sided(r * (df / (1.0 - r * r)).sqrt(), df)
    };
    (r, p)
}

/// Correlation matrix of `x_vars`.
pub fn correlate(ds: &Dataset, spec: &ModelSpec) -> Result<CorrelationMatrix> {
    let names: Vec<&str> = spec.x_vars.iter().map(String::as_str).collect();
    for &name in &names {
        if !ds.column(name)?.is_numeric() {
            return Err(Error::NonNumericVariable { name: name.to_string() });
        }
    }
    let rows = ds.complete_rows(&names)?;
    let columns = names.iter().map(|n| ds.numeric(n, &rows)).collect::<Result<Vec<_>>>()?;

    let k = names.len();
    let d = spec.decimals;
    let mut coefficients = vec![vec![0.0; k]; k];
    let mut p_values = vec![vec![0.0; k]; k];
    let mut significance = vec![vec![Significance::None; k]; k];
    for i in 0..k {
        for j in 0..k {
            if i == j {
                let r = if pearson(&columns[i], &columns[i]).0.is_nan() { f64::NAN } else { 1.0 };
                coefficients[i][j] = r;
                p_values[i][j] = 1.0;
                continue;
            }
            if j < i {
                coefficients[i][j] = coefficients[j][i];
                p_values[i][j] = p_values[j][i];
                significance[i][j] = significance[j][i];
                continue;
            }
            let (r, p) = pearson(&columns[i], &columns[j]);
            if r.is_nan() {
                log::warn!("corr: '{}' or '{}' has zero variance", names[i], names[j]);
            }
            coefficients[i][j] = round_half_even(r, d);
            p_values[i][j] = round_half_even(p, d);
            significance[i][j] = Significance::from_p(p);
        }
    }

    Ok(CorrelationMatrix {
        variables: names.iter().map(|s| s.to_string()).collect(),
        n_obs: rows.len(),
        coefficients,
        p_values,
        significance,
        decimals: d,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sa_core::{Column, Method};

    #[test]
    fn test_pearson_known_value() {
        // r = 0.8 for these points
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [2.0, 1.0, 4.0, 3.0, 5.0];
        let (r, p) = pearson(&a, &b);
        assert!((r - 0.8).abs() < 1e-12);
        // t = 0.8 * sqrt(3 / 0.36) = 2.3094, p ≈ 0.1041
        assert!((p - 0.104_088).abs() < 1e-4, "p={p}");
    }

    #[test]
    fn test_matrix_is_symmetric_without_diagonal_stars() {
        let ds = Dataset::new(vec![
            ("a".into(), Column::Numeric((0..20).map(|i| Some(i as f64)).collect())),
            ("b".into(), Column::Numeric((0..20).map(|i| Some((i * i) as f64)).collect())),
            ("c".into(), Column::Numeric((0..20).map(|i| Some(((i * 7) % 5) as f64)).collect())),
        ])
        .unwrap();
        let m = correlate(&ds, &ModelSpec::new(Method::Corr, ["a", "b", "c"])).unwrap();
        assert_eq!(m.n_obs, 20);
        for i in 0..3 {
            assert_eq!(m.coefficients[i][i], 1.0);
            assert_eq!(m.significance[i][i], Significance::None);
            for j in 0..3 {
                assert_eq!(m.coefficients[i][j], m.coefficients[j][i]);
            }
        }
        assert_eq!(m.significance[0][1], Significance::One);
    }
}
