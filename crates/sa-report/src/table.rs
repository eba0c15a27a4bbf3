//! Plain-text table artifact shared by every layout.

use std::fmt;

use serde::Serialize;

/// Placeholder for an undefined or absent statistic.
pub const PLACEHOLDER: &str = "-";

const SCHEMA_VERSION: &str = "statau_table_v0";

/// Provenance stamped into every table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableMeta {
    /// Producing tool.
    pub tool: String,
    /// Producing tool version.
    pub tool_version: String,
}

impl Default for TableMeta {
    fn default() -> Self {
        Self { tool: "statau".to_string(), tool_version: sa_core::VERSION.to_string() }
    }
}

/// A rendered table: header rows, body rows, footer rows and notes.
///
/// Every row has the same number of cells; the first cell is the row label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedTable {
    /// Artifact schema identifier.
    pub schema_version: String,
    /// Provenance.
    pub meta: TableMeta,
    /// Table title.
    pub title: String,
    /// Header rows.
    pub header: Vec<Vec<String>>,
    /// Body rows.
    pub rows: Vec<Vec<String>>,
    /// Footer rows (fit statistics, indicator rows).
    pub footer: Vec<Vec<String>>,
    /// Notes printed under the table.
    pub notes: Vec<String>,
}

impl RenderedTable {
    /// Empty table with a single header row.
    pub fn new(title: impl Into<String>, header: Vec<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            meta: TableMeta::default(),
            title: title.into(),
            header: vec![header],
            rows: Vec::new(),
            footer: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Number of columns (label column included).
    pub fn width(&self) -> usize {
        self.header.iter().chain(&self.rows).chain(&self.footer).map(Vec::len).max().unwrap_or(0)
    }

    /// Body row whose label is `label`.
    pub fn row(&self, label: &str) -> Option<&[String]> {
        self.rows.iter().find(|r| r.first().is_some_and(|c| c == label)).map(Vec::as_slice)
    }

    /// Footer row whose label is `label`.
    pub fn footer_row(&self, label: &str) -> Option<&[String]> {
        self.footer.iter().find(|r| r.first().is_some_and(|c| c == label)).map(Vec::as_slice)
    }
}

impl fmt::Display for RenderedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.width();
        let mut widths = vec![0usize; width];
        for row in self.header.iter().chain(&self.rows).chain(&self.footer) {
            for (j, cell) in row.iter().enumerate() {
                widths[j] = widths[j].max(cell.chars().count());
            }
        }
        let total = widths.iter().sum::<usize>() + 2 * width.saturating_sub(1);

        let write_row = |f: &mut fmt::Formatter<'_>, row: &[String]| -> fmt::Result {
            let mut line = String::new();
            for (j, w) in widths.iter().enumerate() {
                let cell = row.get(j).map(String::as_str).unwrap_or("");
                if j == 0 {
                    line.push_str(&format!("{cell:<w$}"));
                } else {
                    line.push_str(&format!("  {cell:>w$}"));
                }
            }
            writeln!(f, "{}", line.trim_end())
        };

        if !self.title.is_empty() {
            writeln!(f, "{}", self.title)?;
        }
        writeln!(f, "{}", "=".repeat(total))?;
        for row in &self.header {
            write_row(f, row)?;
        }
        writeln!(f, "{}", "-".repeat(total))?;
        for row in &self.rows {
            write_row(f, row)?;
        }
        if !self.footer.is_empty() {
            writeln!(f, "{}", "-".repeat(total))?;
            for row in &self.footer {
                write_row(f, row)?;
            }
        }
        writeln!(f, "{}", "=".repeat(total))?;
        for note in &self.notes {
            writeln!(f, "{note}")?;
        }
        Ok(())
    }
}

/// `v` with `decimals` places; [`PLACEHOLDER`] when not finite.
pub fn fmt_num(v: f64, decimals: u32) -> String {
    if !v.is_finite() {
        return PLACEHOLDER.to_string();
    }
    let s = format!("{:.*}", decimals as usize, v);
    // a value that rounds to zero prints unsigned
    match s.strip_prefix('-') {
        Some(rest) if rest.bytes().all(|b| b == b'0' || b == b'.') => rest.to_string(),
        _ => s,
    }
}

/// [`fmt_num`] over an optional value.
pub fn fmt_opt(v: Option<f64>, decimals: u32) -> String {
    v.map_or_else(|| PLACEHOLDER.to_string(), |x| fmt_num(x, decimals))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_formatting() {
        assert_eq!(fmt_num(1.5, 3), "1.500");
        assert_eq!(fmt_num(-0.0, 2), "0.00");
        assert_eq!(fmt_num(-0.0001, 3), "0.000");
        assert_eq!(fmt_num(-0.4, 0), "0");
        assert_eq!(fmt_num(-0.0005001, 3), "-0.001");
        assert_eq!(fmt_num(f64::NAN, 2), PLACEHOLDER);
        assert_eq!(fmt_opt(None, 2), PLACEHOLDER);
        assert_eq!(fmt_opt(Some(2.0), 0), "2");
    }

    #[test]
    fn test_display_aligns_columns() {
        let mut t = RenderedTable::new("Demo", vec!["Variable".into(), "Value".into()]);
        t.rows.push(vec!["a".into(), "1.0".into()]);
        t.rows.push(vec!["longer".into(), "10.25".into()]);
        t.notes.push("note".into());
        let text = t.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Demo");
        assert_eq!(lines[2], "Variable  Value");
        assert_eq!(lines[4], "a           1.0");
        assert_eq!(lines[5], "longer    10.25");
        assert_eq!(lines.last(), Some(&"note"));
        assert_eq!(t.row("longer").unwrap()[1], "10.25");
    }
}
