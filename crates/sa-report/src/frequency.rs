//! Frequency layouts: one table per variable, or one merged table with
//! subtotals.

use sa_inference::{CardinalityWarning, FrequencyReport, FrequencyTable};

use crate::table::{RenderedTable, fmt_num};

const COLUMNS: [&str; 4] = ["Value", "Freq.", "Percent", "Cum."];

fn value_rows(t: &FrequencyTable, decimals: u32) -> impl Iterator<Item = [String; 4]> + '_ {
    t.rows.iter().map(move |r| {
        [r.value.clone(), r.count.to_string(), fmt_num(r.percent, decimals), fmt_num(r.cumulative, decimals)]
    })
}

fn total_row(label: &str, t: &FrequencyTable, decimals: u32) -> [String; 4] {
    [label.to_string(), t.total.to_string(), fmt_num(100.0, decimals), String::new()]
}

/// Render a frequency report.
///
/// Independent mode yields one table per variable with a `Total` row; merged
/// mode yields a single table with a `Subtotal` row after each variable.
pub fn frequency_tables(report: &FrequencyReport) -> Vec<RenderedTable> {
    let d = report.decimals;
    if !report.merged {
        return report
            .tables
            .iter()
            .map(|t| {
                let mut table =
                    RenderedTable::new(format!("Frequency: {}", t.variable), COLUMNS.map(String::from).to_vec());
                table.rows = value_rows(t, d).map(Vec::from).collect();
                table.footer.push(total_row("Total", t, d).to_vec());
                table
            })
            .collect();
    }

    let header = std::iter::once("Variable").chain(COLUMNS).map(String::from).collect();
    let mut table = RenderedTable::new("Frequency Table", header);
    for t in &report.tables {
        for (i, cells) in value_rows(t, d).enumerate() {
            let label = if i == 0 { t.variable.clone() } else { String::new() };
            table.rows.push(std::iter::once(label).chain(cells).collect());
        }
        table.rows.push(std::iter::once(String::new()).chain(total_row("Subtotal", t, d)).collect());
    }
    vec![table]
}

/// Render the cardinality guard's pause notice.
pub fn cardinality_table(w: &CardinalityWarning) -> RenderedTable {
    let mut table = RenderedTable::new(
        "Frequency table not computed",
        vec!["Variable".to_string(), "Distinct values".to_string()],
    );
    table.rows = w.variables.iter().map(|v| vec![v.variable.clone(), v.distinct.to_string()]).collect();
    table.notes.push(format!(
        "More than {} distinct values; re-run with freq_confirmed to compute anyway.",
        w.limit
    ));
    table
}
