//! Descriptive statistics, overall and by group.

use serde::Serialize;
use sa_core::{Column, Dataset, DescStat, Error, ModelSpec, Result};

use crate::normalize::round_half_even;

/// Summary of one variable over one sample.
///
/// Statistics are `None` when the sample is empty (and `std` when it has a
/// single observation).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    /// Variable name.
    pub variable: String,
    /// Valid observations.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: Option<f64>,
    /// Sample standard deviation (n − 1 denominator).
    pub std: Option<f64>,
    /// Minimum.
    pub min: Option<f64>,
    /// Maximum.
    pub max: Option<f64>,
    /// Median.
    pub median: Option<f64>,
}

impl SummaryRow {
    /// Summarize `values` (all assumed valid).
    pub fn from_values(variable: &str, values: &[f64]) -> Self {
        let count = values.len();
        if count == 0 {
            return Self {
                variable: variable.to_string(),
                count,
                mean: None,
                std: None,
                min: None,
                max: None,
                median: None,
            };
        }
        let n = count as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = (count > 1).then(|| {
            (values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1.0)).sqrt()
        });
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let median = if count % 2 == 1 {
            sorted[count / 2]
        } else {
            0.5 * (sorted[count / 2 - 1] + sorted[count / 2])
        };
        Self {
            variable: variable.to_string(),
            count,
            mean: Some(mean),
            std,
            min: sorted.first().copied(),
            max: sorted.last().copied(),
            median: Some(median),
        }
    }

    /// Value of `stat` (count as a float).
    pub fn get(&self, stat: DescStat) -> Option<f64> {
        match stat {
            DescStat::Count => Some(self.count as f64),
            DescStat::Mean => self.mean,
            DescStat::Std => self.std,
            DescStat::Min => self.min,
            DescStat::Max => self.max,
            DescStat::Median => self.median,
        }
    }

    fn rounded(mut self, decimals: u32) -> Self {
        for v in [&mut self.mean, &mut self.std, &mut self.min, &mut self.max, &mut self.median] {
            *v = v.map(|x| round_half_even(x, decimals));
        }
        self
    }
}

/// Output of `desc`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptiveTable {
    /// Requested statistic columns.
    pub stats: Vec<DescStat>,
    /// One row per variable, in request order.
    pub rows: Vec<SummaryRow>,
    /// Listwise sample size.
    pub n_obs: usize,
    /// Display precision.
    pub decimals: u32,
}

/// One group of a `grouped_desc` result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    /// Group level as displayed.
    pub level: String,
    /// One row per variable; present even with zero valid observations.
    pub rows: Vec<SummaryRow>,
}

/// Output of `grouped_desc`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedDescriptive {
    /// Grouping variable.
    pub group_var: String,
    /// Requested statistic columns.
    pub stats: Vec<DescStat>,
    /// Groups in ascending level order.
    pub groups: Vec<GroupSummary>,
    /// Display precision.
    pub decimals: u32,
}

fn require_numeric(ds: &Dataset, names: &[&str]) -> Result<()> {
    for &name in names {
        if !ds.column(name)?.is_numeric() {
            return Err(Error::NonNumericVariable { name: name.to_string() });
        }
    }
    Ok(())
}

/// Descriptive statistics over the listwise-complete sample of `x_vars`.
pub fn describe(ds: &Dataset, spec: &ModelSpec) -> Result<DescriptiveTable> {
    let names: Vec<&str> = spec.x_vars.iter().map(String::as_str).collect();
    require_numeric(ds, &names)?;
    let rows = ds.complete_rows(&names)?;
    let summaries = names
        .iter()
        .map(|&name| Ok(SummaryRow::from_values(name, &ds.numeric(name, &rows)?).rounded(spec.decimals)))
        .collect::<Result<Vec<_>>>()?;
    Ok(DescriptiveTable {
        stats: spec.desc_columns(),
        rows: summaries,
        n_obs: rows.len(),
        decimals: spec.decimals,
    })
}

/// Descriptive statistics per level of `group_var`.
///
/// Rows with a missing group are dropped; each (variable, group) cell uses
/// the valid observations of that variable within the group.
pub fn describe_grouped(ds: &Dataset, spec: &ModelSpec) -> Result<GroupedDescriptive> {
    let group_var = spec
        .group_var
        .as_deref()
        .ok_or_else(|| Error::Validation("grouped_desc requires group_var".into()))?;
    let names: Vec<&str> = spec.x_vars.iter().map(String::as_str).collect();
    require_numeric(ds, &names)?;

    let rows = ds.complete_rows(&[group_var])?;
    let groups = ds.group_codes(group_var, &rows)?;

    let mut members: Vec<Vec<usize>> = vec![Vec::new(); groups.n_levels()];
    for (&row, &code) in rows.iter().zip(&groups.codes) {
        members[code].push(row);
    }

    let mut out = Vec::with_capacity(groups.n_levels());
    for (level, group_rows) in groups.levels.iter().zip(&members) {
        let mut summaries = Vec::with_capacity(names.len());
        for &name in &names {
            let values: Vec<f64> = match ds.column(name)? {
                Column::Numeric(v) => {
                    group_rows.iter().filter_map(|&i| v[i]).filter(|x| x.is_finite()).collect()
                }
                Column::Categorical(_) => {
                    return Err(Error::NonNumericVariable { name: name.to_string() });
                }
            };
            summaries.push(SummaryRow::from_values(name, &values).rounded(spec.decimals));
        }
        out.push(GroupSummary { level: level.to_string(), rows: summaries });
    }

    Ok(GroupedDescriptive {
        group_var: group_var.to_string(),
        stats: spec.desc_columns(),
        groups: out,
        decimals: spec.decimals,
    })
}
