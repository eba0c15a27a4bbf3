//! Result records shared by the estimation engine and the renderer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Method, SeKind};

/// Name of the intercept term in every regression result.
pub const CONSTANT: &str = "Constant";

/// Significance tier of a p-value. Thresholds are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Significance {
    /// p ≥ 0.10 (or undefined).
    #[default]
    None,
    /// p < 0.10
    Ten,
    /// p < 0.05
    Five,
    /// p < 0.01
    One,
}

impl Significance {
    /// Legend printed under every starred table.
    pub const LEGEND: &'static str = "*** p<0.01, ** p<0.05, * p<0.1";

    /// Tier for `p`. NaN maps to [`Significance::None`].
    pub fn from_p(p: f64) -> Self {
        if p < 0.01 {
            Significance::One
        } else if p < 0.05 {
            Significance::Five
        } else if p < 0.10 {
            Significance::Ten
        } else {
            Significance::None
        }
    }

    /// Star suffix.
    pub fn stars(self) -> &'static str {
        match self {
            Significance::None => "",
            Significance::Ten => "*",
            Significance::Five => "**",
            Significance::One => "***",
        }
    }
}

impl fmt::Display for Significance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stars())
    }
}

/// Sampling distribution of a coefficient test statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatKind {
    /// Student t with `df` degrees of freedom.
    T {
        /// Degrees of freedom.
        df: f64,
    },
    /// Standard normal.
    Z,
}

/// One row of a coefficient table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientRow {
    /// Term name (`Constant` for the intercept).
    pub name: String,
    /// Point estimate.
    pub coef: f64,
    /// Standard error under the configured variance estimator.
    pub std_err: f64,
    /// `coef / std_err`.
    pub stat: f64,
    /// Two-sided p-value.
    pub p_value: f64,
    /// Significance tier of `p_value`.
    pub significance: Significance,
}

/// Scalar fit diagnostics. Fields a method does not produce are `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FitStats {
    /// Observations used.
    pub n_obs: usize,
    /// R² (within R² for FE, overall R² for RE).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_squared: Option<f64>,
    /// Adjusted R².
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adj_r_squared: Option<f64>,
    /// Overall F (Wald) statistic on the slope coefficients.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub f_stat: Option<f64>,
    /// p-value of `f_stat`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub f_p_value: Option<f64>,
    /// McFadden pseudo-R² (binary choice).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pseudo_r_squared: Option<f64>,
    /// Likelihood-ratio χ² against the intercept-only model (binary choice).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lr_chi2: Option<f64>,
    /// Log-likelihood.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_likelihood: Option<f64>,
    /// Intercept-only log-likelihood (binary choice).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub null_log_likelihood: Option<f64>,
    /// Akaike information criterion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aic: Option<f64>,
    /// Bayesian information criterion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bic: Option<f64>,
    /// Distinct entities (panel methods).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_groups: Option<usize>,
    /// Distinct clusters under cluster-robust SEs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_clusters: Option<usize>,
    /// Idiosyncratic error standard deviation (panel methods).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sigma_e: Option<f64>,
    /// Entity effect standard deviation (RE).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sigma_u: Option<f64>,
    /// Share of variance due to the entity effect (RE).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rho: Option<f64>,
}

/// Canonical, rounded output of one fitted regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationResult {
    /// Estimator that produced this result.
    pub method: Method,
    /// Dependent variable.
    pub dependent: String,
    /// Variance estimator used for `std_err`.
    pub se_kind: SeKind,
    /// Coefficient rows, `Constant` last.
    pub coefficients: Vec<CoefficientRow>,
    /// Fit diagnostics.
    pub stats: FitStats,
    /// Test-statistic distribution of the coefficient rows.
    pub stat_kind: StatKind,
    /// Fixed-effect dimensions absorbed by the estimator.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub absorbed: Vec<String>,
    /// Rounding precision applied to every value.
    pub decimals: u32,
}

impl EstimationResult {
    /// Coefficient row for `name`, if present.
    pub fn coefficient(&self, name: &str) -> Option<&CoefficientRow> {
        self.coefficients.iter().find(|c| c.name == name)
    }

    /// Term names in table order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.coefficients.iter().map(|c| c.name.as_str())
    }
}

/// Which comparison test produced a [`ComparisonResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonTest {
    /// F-test of fixed effects against pooled OLS.
    FTest,
    /// Hausman test of fixed against random effects.
    Hausman,
    /// Hausman test with the sigma-more covariance convention.
    HausmanSigmaMore,
}

impl ComparisonTest {
    /// Display name.
    pub fn title(self) -> &'static str {
        match self {
            ComparisonTest::FTest => "F Test (Fixed Effects vs Pooled OLS)",
            ComparisonTest::Hausman => "Hausman Test (Fixed Effects vs Random Effects)",
            ComparisonTest::HausmanSigmaMore => {
                "Hausman Test (Fixed Effects vs Random Effects, sigmamore)"
            }
        }
    }
}

/// Per-term vectors behind a Hausman statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HausmanAudit {
    /// Common terms, in FE order.
    pub variables: Vec<String>,
    /// FE coefficients.
    pub fe_coef: Vec<f64>,
    /// RE coefficients.
    pub re_coef: Vec<f64>,
    /// `b_fe − b_re`.
    pub coef_diff: Vec<f64>,
    /// FE standard errors (after sigma-more scaling when active).
    pub fe_std_err: Vec<f64>,
    /// RE standard errors (pooled OLS under sigma-more).
    pub re_std_err: Vec<f64>,
    /// `sqrt(diag(V_fe − V_re))`; `None` where the diagonal is non-positive.
    pub std_err_diff: Vec<Option<f64>>,
    /// `(σ_re / σ_fe)²` under sigma-more.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaling: Option<f64>,
}

/// Outcome of a model-comparison test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Test identity.
    pub test: ComparisonTest,
    /// Human-readable test name.
    pub test_name: String,
    /// Null hypothesis statement.
    pub null_hypothesis: String,
    /// Alternative hypothesis statement.
    pub alternative_hypothesis: String,
    /// Test statistic (F or χ²).
    pub statistic: f64,
    /// Numerator (or only) degrees of freedom.
    pub df1: usize,
    /// Denominator degrees of freedom (F-test only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub df2: Option<usize>,
    /// Upper-tail p-value.
    pub p_value: f64,
    /// Significance tier of `p_value`.
    pub significance: Significance,
    /// Fixed-threshold conclusion.
    pub conclusion: String,
    /// Pooled residual sum of squares (F-test).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rss_pooled: Option<f64>,
    /// FE residual sum of squares (F-test).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rss_fe: Option<f64>,
    /// Entities in the common sample.
    pub n_entities: usize,
    /// Observations in the common sample.
    pub n_obs: usize,
    /// Hausman per-term audit vectors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit: Option<HausmanAudit>,
}
