//! Model specification: what to estimate and how.
//!
//! A [`ModelSpec`] is plain configuration. It deserializes from YAML or JSON
//! with defaults for every optional field, and [`ModelSpec::validate`] checks
//! it against a [`Dataset`] before any estimation runs.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Dataset, Error, Result};

/// The eleven analysis methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Ordinary least squares with intercept.
    Ols,
    /// Panel fixed effects (within estimator).
    Fe,
    /// Panel random effects (Swamy–Arora GLS).
    Re,
    /// Pooled OLS on panel data.
    Pooled,
    /// Binary logit (MLE).
    Logit,
    /// Binary probit (MLE).
    Probit,
    /// Descriptive statistics.
    Desc,
    /// Descriptive statistics by group.
    GroupedDesc,
    /// Frequency tables.
    Freq,
    /// Pearson correlation matrix.
    Corr,
    /// Variance inflation factors.
    Vif,
}

impl Method {
    /// Methods that produce coefficient tables.
    pub fn is_regression(self) -> bool {
        matches!(self, Method::Ols | Method::Fe | Method::Re | Method::Pooled | Method::Logit | Method::Probit)
    }

    /// Methods that require entity/time identifiers.
    pub fn is_panel(self) -> bool {
        matches!(self, Method::Fe | Method::Re | Method::Pooled)
    }

    /// Short label used in table headers.
    pub fn label(self) -> &'static str {
        match self {
            Method::Ols => "OLS",
            Method::Fe => "FE",
            Method::Re => "RE",
            Method::Pooled => "Pooled OLS",
            Method::Logit => "Logit",
            Method::Probit => "Probit",
            Method::Desc => "Desc",
            Method::GroupedDesc => "Grouped Desc",
            Method::Freq => "Freq",
            Method::Corr => "Corr",
            Method::Vif => "VIF",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Variance estimator family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeKind {
    /// Homoskedastic, independent errors.
    #[default]
    #[serde(alias = "iid", alias = "unadjusted")]
    Classical,
    /// HC1 heteroskedasticity-consistent sandwich.
    Robust,
    /// One-way cluster-robust sandwich.
    Cluster,
}

/// Standard-error configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeConfig {
    /// Estimator family.
    #[serde(rename = "type", default)]
    pub kind: SeKind,
    /// Cluster variable; required iff `kind == Cluster`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_var: Option<String>,
}

impl SeConfig {
    /// Classical standard errors.
    pub fn classical() -> Self {
        Self::default()
    }

    /// HC1 robust standard errors.
    pub fn robust() -> Self {
        Self { kind: SeKind::Robust, cluster_var: None }
    }

    /// Cluster-robust standard errors grouped by `var`.
    pub fn cluster(var: impl Into<String>) -> Self {
        Self { kind: SeKind::Cluster, cluster_var: Some(var.into()) }
    }
}

/// Statistic columns available to descriptive tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescStat {
    /// Valid observation count.
    #[serde(alias = "nobs", alias = "n")]
    Count,
    /// Arithmetic mean.
    Mean,
    /// Sample standard deviation (n − 1).
    Std,
    /// Minimum.
    Min,
    /// Maximum.
    Max,
    /// Median.
    #[serde(alias = "p50")]
    Median,
}

impl DescStat {
    /// Default column set.
    pub const DEFAULT: [DescStat; 5] =
        [DescStat::Count, DescStat::Mean, DescStat::Std, DescStat::Min, DescStat::Max];

    /// Column header.
    pub fn header(self) -> &'static str {
        match self {
            DescStat::Count => "N",
            DescStat::Mean => "Mean",
            DescStat::Std => "Std.Dev",
            DescStat::Min => "Min",
            DescStat::Max => "Max",
            DescStat::Median => "Median",
        }
    }
}

fn default_decimals() -> u32 {
    3
}

/// Declarative description of one analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Analysis method.
    pub method: Method,
    /// Dependent variable (regression methods only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_var: Option<String>,
    /// Regressors, or the analysed variables for non-regression methods.
    pub x_vars: Vec<String>,
    /// Panel entity identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panel_entity: Option<String>,
    /// Panel time identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panel_time: Option<String>,
    /// Dimensions absorbed by `fe`; empty means entity effects.
    #[serde(default)]
    pub fe_vars: Vec<String>,
    /// Standard-error configuration.
    #[serde(default, rename = "se_config", alias = "se")]
    pub se: SeConfig,
    /// Decimal places for rounding and display.
    #[serde(default = "default_decimals")]
    pub decimals: u32,
    /// Grouping variable for `grouped_desc`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_var: Option<String>,
    /// Merge several frequency tables into one with subtotal rows.
    #[serde(default)]
    pub merge_freq_tables: bool,
    /// Use the sigma-more covariance convention in the Hausman test.
    #[serde(default)]
    pub sigmamore: bool,
    /// Override the frequency-table cardinality guard.
    #[serde(default)]
    pub freq_confirmed: bool,
    /// Statistic columns for `desc`/`grouped_desc`; empty means the default set.
    #[serde(default)]
    pub desc_stats: Vec<DescStat>,
}

impl ModelSpec {
    /// Minimal spec for `method` over `x_vars` with every option at its default.
    pub fn new<S: Into<String>>(method: Method, x_vars: impl IntoIterator<Item = S>) -> Self {
        Self {
            method,
            y_var: None,
            x_vars: x_vars.into_iter().map(Into::into).collect(),
            panel_entity: None,
            panel_time: None,
            fe_vars: Vec::new(),
            se: SeConfig::default(),
            decimals: default_decimals(),
            group_var: None,
            merge_freq_tables: false,
            sigmamore: false,
            freq_confirmed: false,
            desc_stats: Vec::new(),
        }
    }

    /// Set the dependent variable.
    pub fn with_y(mut self, y: impl Into<String>) -> Self {
        self.y_var = Some(y.into());
        self
    }

    /// Set entity and time identifiers.
    pub fn with_panel(mut self, entity: impl Into<String>, time: impl Into<String>) -> Self {
        self.panel_entity = Some(entity.into());
        self.panel_time = Some(time.into());
        self
    }

    /// Set the standard-error configuration.
    pub fn with_se(mut self, se: SeConfig) -> Self {
        self.se = se;
        self
    }

    /// Set the display precision.
    pub fn with_decimals(mut self, decimals: u32) -> Self {
        self.decimals = decimals;
        self
    }

    /// Statistic columns requested for descriptive tables.
    pub fn desc_columns(&self) -> Vec<DescStat> {
        if self.desc_stats.is_empty() {
            return DescStat::DEFAULT.to_vec();
        }
        let mut seen = HashSet::new();
        self.desc_stats.iter().copied().filter(|s| seen.insert(*s)).collect()
    }

    /// Dependent variable, required for regression methods.
    pub fn dependent(&self) -> Result<&str> {
        self.y_var
            .as_deref()
            .ok_or_else(|| Error::Validation(format!("{} requires a dependent variable", self.method)))
    }

    /// Entity and time identifiers, required for panel methods and the comparison tests.
    pub fn panel_ids(&self) -> Result<(&str, &str)> {
        match (self.panel_entity.as_deref(), self.panel_time.as_deref()) {
            (Some(e), Some(t)) => Ok((e, t)),
            _ => Err(Error::Validation(format!(
                "{} requires panel entity and time identifiers",
                self.method
            ))),
        }
    }

    /// Every variable this spec names, deduplicated, in declaration order.
    pub fn referenced_variables(&self) -> Vec<&str> {
        let optional = [&self.panel_entity, &self.panel_time, &self.se.cluster_var, &self.group_var];
        let all = self
            .y_var
            .iter()
            .chain(&self.x_vars)
            .chain(optional.into_iter().flatten())
            .chain(&self.fe_vars);

        let mut out: Vec<&str> = Vec::new();
        for name in all {
            if !out.contains(&name.as_str()) {
                out.push(name.as_str());
            }
        }
        out
    }

    /// Check the spec's structural invariants against `ds`.
    pub fn validate(&self, ds: &Dataset) -> Result<()> {
        if self.x_vars.is_empty() {
            return Err(Error::Validation("x_vars must be non-empty".into()));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.x_vars.iter().find(|v| !seen.insert(v.as_str())) {
            return Err(Error::Validation(format!("duplicate variable '{dup}' in x_vars")));
        }
        if self.method.is_regression() {
            let y = self.dependent()?;
            if self.x_vars.iter().any(|x| x == y) {
                return Err(Error::Validation(format!("'{y}' is both dependent and regressor")));
            }
        }
        match (self.se.kind, &self.se.cluster_var) {
            (SeKind::Cluster, None) => {
                return Err(Error::Validation("cluster standard errors require cluster_var".into()));
            }
            (SeKind::Classical | SeKind::Robust, Some(_)) => {
                return Err(Error::Validation("cluster_var is only valid with cluster standard errors".into()));
            }
            _ => {}
        }
        if self.method.is_panel() {
            self.panel_ids()?;
        }
        if self.method == Method::GroupedDesc && self.group_var.is_none() {
            return Err(Error::Validation("grouped_desc requires group_var".into()));
        }
        ds.require(&self.referenced_variables())
    }
}
