//! # sa-report
//!
//! Academic table rendering for STATAU.
//!
//! Every layout produces a [`RenderedTable`]: a serializable artifact that also
//! prints as an aligned plain-text grid.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Comparison-test layouts.
pub mod comparison;
/// Correlation-matrix layout.
pub mod corr;
/// Frequency layouts.
pub mod frequency;
/// Merged regression tables.
pub mod regression;
/// Descriptive-statistics layouts.
pub mod summary;
/// Table artifact and cell formatting.
pub mod table;
/// VIF layout.
pub mod vif;

pub use comparison::comparison_tables;
pub use corr::correlation_table;
pub use frequency::{cardinality_table, frequency_tables};
pub use regression::{CustomRow, FooterStat, TableOptions, merge_estimations};
pub use summary::{descriptive_table, grouped_tables};
pub use table::{PLACEHOLDER, RenderedTable, TableMeta};
pub use vif::vif_table;

use sa_core::Result;
use sa_inference::AnalysisOutput;

/// Render one analysis output with its default layout.
///
/// An estimation result becomes a single-column merged table under `opts`.
pub fn render(output: &AnalysisOutput, opts: &TableOptions) -> Result<Vec<RenderedTable>> {
    Ok(match output {
        AnalysisOutput::Estimation(r) => vec![merge_estimations(std::slice::from_ref(r), opts)?],
        AnalysisOutput::Descriptive(t) => vec![descriptive_table(t)],
        AnalysisOutput::GroupedDescriptive(g) => grouped_tables(g),
        AnalysisOutput::Frequency(f) => frequency_tables(f),
        AnalysisOutput::Correlation(m) => vec![correlation_table(m)],
        AnalysisOutput::Vif(v) => vec![vif_table(v)],
        AnalysisOutput::CardinalityWarning(w) => vec![cardinality_table(w)],
    })
}
