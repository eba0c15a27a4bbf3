//! Descriptive-statistics layouts, overall and by group.

use sa_core::DescStat;
use sa_inference::{DescriptiveTable, GroupedDescriptive, SummaryRow};

use crate::table::{RenderedTable, fmt_opt};

fn header(stats: &[DescStat]) -> Vec<String> {
    std::iter::once("Variable".to_string()).chain(stats.iter().map(|s| s.header().to_string())).collect()
}

fn line(row: &SummaryRow, stats: &[DescStat], decimals: u32) -> Vec<String> {
    let mut out = vec![row.variable.clone()];
    for &stat in stats {
        out.push(match stat {
            DescStat::Count => row.count.to_string(),
            other => fmt_opt(row.get(other), decimals),
        });
    }
    out
}

/// `desc` layout: one row per variable, one column per chosen statistic.
pub fn descriptive_table(t: &DescriptiveTable) -> RenderedTable {
    let mut table = RenderedTable::new("Descriptive Statistics", header(&t.stats));
    table.rows = t.rows.iter().map(|r| line(r, &t.stats, t.decimals)).collect();
    table.notes.push(format!("Listwise sample: {} observations", t.n_obs));
    table
}

/// `grouped_desc` layout: one table per group, titled `"{group_var} = {level}"`.
pub fn grouped_tables(g: &GroupedDescriptive) -> Vec<RenderedTable> {
    g.groups
        .iter()
        .map(|group| {
            let mut table = RenderedTable::new(format!("{} = {}", g.group_var, group.level), header(&g.stats));
            table.rows = group.rows.iter().map(|r| line(r, &g.stats, g.decimals)).collect();
            table
        })
        .collect()
}
