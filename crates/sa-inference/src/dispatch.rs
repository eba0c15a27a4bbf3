//! Method dispatch: one entry point from a validated [`ModelSpec`] to its
//! output record.

use serde::Serialize;
use sa_core::{Dataset, Error, EstimationResult, Method, ModelSpec, Result};

use crate::binary::{Link, fit_binary};
use crate::correlation::{CorrelationMatrix, correlate};
use crate::descriptive::{DescriptiveTable, GroupedDescriptive, describe, describe_grouped};
use crate::econometrics::{fit_fe, fit_re};
use crate::frequency::{CardinalityWarning, FrequencyOutcome, FrequencyReport, frequencies};
use crate::linear::{fit_ols, fit_pooled};
use crate::normalize::{RawFit, normalize};
use crate::vif::{VifTable, variance_inflation};

/// Output of one analysis request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisOutput {
    /// Coefficient table of a regression method.
    Estimation(EstimationResult),
    /// `desc`.
    Descriptive(DescriptiveTable),
    /// `grouped_desc`.
    GroupedDescriptive(GroupedDescriptive),
    /// `freq`.
    Frequency(FrequencyReport),
    /// `corr`.
    Correlation(CorrelationMatrix),
    /// `vif`.
    Vif(VifTable),
    /// `freq` paused: re-run with `freq_confirmed` to force the tables.
    CardinalityWarning(CardinalityWarning),
}

impl AnalysisOutput {
    /// The estimation result, if this is one.
    pub fn as_estimation(&self) -> Option<&EstimationResult> {
        match self {
            AnalysisOutput::Estimation(r) => Some(r),
            _ => None,
        }
    }
}

/// Fit a regression method without rounding.
pub fn estimate(ds: &Dataset, spec: &ModelSpec) -> Result<RawFit> {
    match spec.method {
        Method::Ols => fit_ols(ds, spec),
        Method::Pooled => fit_pooled(ds, spec),
        Method::Fe => fit_fe(ds, spec),
        Method::Re => fit_re(ds, spec),
        Method::Logit => fit_binary(ds, spec, Link::Logit),
        Method::Probit => fit_binary(ds, spec, Link::Probit),
        other => Err(Error::Validation(format!("{other} is not a regression method"))),
    }
}

/// Validate `spec` against `ds` and run it.
pub fn run(ds: &Dataset, spec: &ModelSpec) -> Result<AnalysisOutput> {
    spec.validate(ds)?;
    log::debug!("dispatch: {} over {} row(s)", spec.method, ds.n_rows());
    let out = match spec.method {
        m if m.is_regression() => AnalysisOutput::Estimation(normalize(&estimate(ds, spec)?, spec.decimals)),
        Method::Desc => AnalysisOutput::Descriptive(describe(ds, spec)?),
        Method::GroupedDesc => AnalysisOutput::GroupedDescriptive(describe_grouped(ds, spec)?),
        Method::Freq => match frequencies(ds, spec)? {
            FrequencyOutcome::Report(r) => AnalysisOutput::Frequency(r),
            FrequencyOutcome::Warning(w) => AnalysisOutput::CardinalityWarning(w),
        },
        Method::Corr => AnalysisOutput::Correlation(correlate(ds, spec)?),
        Method::Vif => AnalysisOutput::Vif(variance_inflation(ds, spec)?),
        other => return Err(Error::Validation(format!("unsupported method {other}"))),
    };
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sa_core::Column;

    fn ds() -> Dataset {
        let col = |v: &[f64]| Column::Numeric(v.iter().map(|&x| Some(x)).collect());
        Dataset::new(vec![
            ("y".into(), col(&[1.0, 3.0, 2.0, 5.0, 4.0])),
            ("x".into(), col(&[1.0, 2.0, 3.0, 4.0, 5.0])),
        ])
        .unwrap()
    }

    #[test]
    fn test_run_routes_by_method() {
        let ols = run(&ds(), &ModelSpec::new(Method::Ols, ["x"]).with_y("y")).unwrap();
        let r = ols.as_estimation().unwrap();
        assert_eq!(r.method, Method::Ols);
        assert_eq!(r.names().collect::<Vec<_>>(), vec!["x", "Constant"]);

        let desc = run(&ds(), &ModelSpec::new(Method::Desc, ["x", "y"])).unwrap();
        assert!(matches!(desc, AnalysisOutput::Descriptive(_)));
        assert!(desc.as_estimation().is_none());
    }

    #[test]
    fn test_run_validates_first() {
        let spec = ModelSpec::new(Method::Ols, ["x"]);
        assert!(matches!(run(&ds(), &spec), Err(Error::Validation(_))));
    }

    #[test]
    fn test_estimate_rejects_non_regression() {
        assert!(estimate(&ds(), &ModelSpec::new(Method::Corr, ["x", "y"])).is_err());
    }

    #[test]
    fn test_output_is_tagged() {
        let out = run(&ds(), &ModelSpec::new(Method::Corr, ["x", "y"])).unwrap();
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["kind"], "correlation");
        assert_eq!(json["n_obs"], 5);
    }
}
