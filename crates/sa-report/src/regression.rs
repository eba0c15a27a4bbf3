//! Merged regression tables: several estimation results side by side.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sa_core::{CONSTANT, EstimationResult, Error, FitStats, Result, SeKind, Significance};

use crate::table::{RenderedTable, fmt_num};

/// Footer statistics available to merged tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FooterStat {
    /// Observations.
    Nobs,
    /// R².
    R2,
    /// Adjusted R².
    AdjR2,
    /// Overall F statistic.
    FStat,
    /// McFadden pseudo-R².
    PseudoR2,
    /// Akaike information criterion.
    Aic,
    /// Bayesian information criterion.
    Bic,
    /// Log-likelihood.
    Ll,
}

impl FooterStat {
    /// Default footer.
    pub const DEFAULT: [FooterStat; 4] =
        [FooterStat::Nobs, FooterStat::R2, FooterStat::AdjR2, FooterStat::FStat];

    /// Row label.
    pub fn label(self) -> &'static str {
        match self {
            FooterStat::Nobs => "Observations",
            FooterStat::R2 => "R-squared",
            FooterStat::AdjR2 => "Adj. R-squared",
            FooterStat::FStat => "F-statistic",
            FooterStat::PseudoR2 => "Pseudo R2",
            FooterStat::Aic => "AIC",
            FooterStat::Bic => "BIC",
            FooterStat::Ll => "Log Likelihood",
        }
    }

    fn value(self, s: &FitStats) -> Option<f64> {
        match self {
            FooterStat::Nobs => Some(s.n_obs as f64),
            FooterStat::R2 => s.r_squared,
            FooterStat::AdjR2 => s.adj_r_squared,
            FooterStat::FStat => s.f_stat,
            FooterStat::PseudoR2 => s.pseudo_r_squared,
            FooterStat::Aic => s.aic,
            FooterStat::Bic => s.bic,
            FooterStat::Ll => s.log_likelihood,
        }
    }
}

impl FromStr for FooterStat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "nobs" | "n" => FooterStat::Nobs,
            "r2" => FooterStat::R2,
            "adj_r2" => FooterStat::AdjR2,
            "f_stat" | "f" => FooterStat::FStat,
            "pseudo_r2" => FooterStat::PseudoR2,
            "aic" => FooterStat::Aic,
            "bic" => FooterStat::Bic,
            "ll" => FooterStat::Ll,
            other => return Err(Error::Validation(format!("unknown footer statistic '{other}'"))),
        })
    }
}

/// Caller-supplied indicator row, one cell per model (`None` renders `No`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomRow {
    /// Row label.
    pub label: String,
    /// Cells aligned with the merged models.
    pub values: Vec<Option<String>>,
}

/// Layout options of a merged regression table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableOptions {
    /// Table title.
    pub title: String,
    /// Show t-statistics instead of standard errors in parentheses.
    pub show_tstat: bool,
    /// Footer statistics.
    pub stats: Vec<FooterStat>,
    /// Indicator rows after the statistics.
    pub custom_rows: Vec<CustomRow>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            title: "Regression Results".to_string(),
            show_tstat: false,
            stats: FooterStat::DEFAULT.to_vec(),
            custom_rows: Vec::new(),
        }
    }
}

impl TableOptions {
    fn footer_stats(&self) -> Vec<FooterStat> {
        let mut out: Vec<FooterStat> = Vec::with_capacity(self.stats.len());
        if self.stats.contains(&FooterStat::Nobs) {
            out.push(FooterStat::Nobs);
        }
        for &s in &self.stats {
            if !out.contains(&s) {
                out.push(s);
            }
        }
        out
    }
}

/// Union of term names by first appearance, `Constant` last.
fn term_union(models: &[EstimationResult]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut has_constant = false;
    for name in models.iter().flat_map(EstimationResult::names) {
        if name == CONSTANT {
            has_constant = true;
        } else if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    if has_constant {
        names.push(CONSTANT.to_string());
    }
    names
}

/// Merge estimation results into one table, one column per model.
///
/// Rows: one coefficient line (with stars) and one parenthesized standard
/// error (or t-statistic) line per term; a term a model lacks leaves both
/// cells blank.
pub fn merge_estimations(models: &[EstimationResult], opts: &TableOptions) -> Result<RenderedTable> {
    if models.is_empty() {
        return Err(Error::Validation("no estimation results to merge".into()));
    }
    for row in &opts.custom_rows {
        if row.values.len() > models.len() {
            return Err(Error::Validation(format!(
                "custom row '{}' has {} cells for {} models",
                row.label,
                row.values.len(),
                models.len()
            )));
        }
    }

    let mut table = RenderedTable::new(opts.title.clone(), Vec::new());
    table.header = vec![
        std::iter::once("Variables".to_string())
            .chain((1..=models.len()).map(|i| format!("({i})")))
            .collect(),
        std::iter::once(String::new()).chain(models.iter().map(|m| m.dependent.clone())).collect(),
        std::iter::once(String::new())
            .chain(models.iter().map(|m| format!("({})", m.method.label())))
            .collect(),
    ];

    for name in term_union(models) {
        let mut coef_line = vec![name.clone()];
        let mut paren_line = vec![String::new()];
        for m in models {
            match m.coefficient(&name) {
                Some(c) => {
                    coef_line.push(format!("{}{}", fmt_num(c.coef, m.decimals), c.significance));
                    let inner = if opts.show_tstat { c.stat } else { c.std_err };
                    paren_line.push(format!("({})", fmt_num(inner, m.decimals)));
                }
                None => {
                    coef_line.push(String::new());
                    paren_line.push(String::new());
                }
            }
        }
        table.rows.push(coef_line);
        table.rows.push(paren_line);
    }

    for stat in opts.footer_stats() {
        let values: Vec<Option<f64>> = models.iter().map(|m| stat.value(&m.stats)).collect();
        if values.iter().all(Option::is_none) {
            continue;
        }
        let mut line = vec![stat.label().to_string()];
        for (m, v) in models.iter().zip(values) {
            line.push(match (stat, v) {
                (FooterStat::Nobs, Some(n)) => format!("{}", n as usize),
                (_, Some(x)) => fmt_num(x, m.decimals),
                (_, None) => String::new(),
            });
        }
        table.footer.push(line);
    }

    if models.iter().any(|m| !m.absorbed.is_empty()) {
        let mut line = vec!["Fixed effects".to_string()];
        line.extend(models.iter().map(|m| {
            if m.absorbed.is_empty() { "No".to_string() } else { m.absorbed.join(", ") }
        }));
        table.footer.push(line);
    }
    for row in &opts.custom_rows {
        let mut line = vec![row.label.clone()];
        line.extend((0..models.len()).map(|i| {
            row.values.get(i).cloned().flatten().unwrap_or_else(|| "No".to_string())
        }));
        table.footer.push(line);
    }

    table.notes.push(
        if opts.show_tstat { "t-statistics in parentheses" } else { "Standard errors in parentheses" }
            .to_string(),
    );
    if models.iter().any(|m| m.se_kind == SeKind::Cluster) {
        table.notes.push("Standard errors are clustered.".to_string());
    }
    table.notes.push(Significance::LEGEND.to_string());
    Ok(table)
}
