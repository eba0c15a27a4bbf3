//! VIF layout.

use sa_inference::VifTable;

use crate::table::{RenderedTable, fmt_num};

/// Variable / VIF / 1/VIF with a trailing mean row.
pub fn vif_table(t: &VifTable) -> RenderedTable {
    let mut table = RenderedTable::new(
        "Variance Inflation Factors",
        vec!["Variable".to_string(), "VIF".to_string(), "1/VIF".to_string()],
    );
    table.rows = t
        .rows
        .iter()
        .map(|r| vec![r.variable.clone(), fmt_num(r.vif, t.decimals), fmt_num(r.tolerance, t.decimals)])
        .collect();
    table.footer.push(vec!["Mean VIF".to_string(), fmt_num(t.mean_vif, t.decimals), String::new()]);
    table
}
