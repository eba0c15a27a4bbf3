//! Correlation-matrix layout.

use sa_inference::CorrelationMatrix;

use crate::table::{RenderedTable, fmt_num};

/// Full matrix with stars on off-diagonal cells.
pub fn correlation_table(m: &CorrelationMatrix) -> RenderedTable {
    let header = std::iter::once(String::new()).chain(m.variables.iter().cloned()).collect();
    let mut table = RenderedTable::new("Correlation Matrix", header);
    for (i, name) in m.variables.iter().enumerate() {
        let mut line = vec![name.clone()];
        for j in 0..m.variables.len() {
            let r = fmt_num(m.coefficients[i][j], m.decimals);
            line.push(if i == j { r } else { format!("{r}{}", m.significance[i][j]) });
        }
        table.rows.push(line);
    }
    table.notes.push(format!("Pearson correlation, listwise sample: {} observations", m.n_obs));
    table.notes.push(sa_core::Significance::LEGEND.to_string());
    table
}
