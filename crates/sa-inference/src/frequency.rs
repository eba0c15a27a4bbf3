//! One-way frequency tables with a cardinality guard.

use serde::Serialize;
use sa_core::{Dataset, Error, ModelSpec, Result};

use crate::normalize::round_half_even;

/// Distinct-value count above which `freq` asks for confirmation.
pub const CARDINALITY_LIMIT: usize = 10_000;

/// One value row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyRow {
    /// Value as displayed.
    pub value: String,
    /// Occurrences.
    pub count: usize,
    /// Share of valid observations, in percent.
    pub percent: f64,
    /// Running share, in percent.
    pub cumulative: f64,
}

/// Frequency table of one variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyTable {
    /// Variable name.
    pub variable: String,
    /// Value rows in ascending order.
    pub rows: Vec<FrequencyRow>,
    /// Valid observations.
    pub total: usize,
}

/// Output of `freq`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyReport {
    /// One merged table with subtotals instead of one table per variable.
    pub merged: bool,
    /// Tables in request order.
    pub tables: Vec<FrequencyTable>,
    /// Display precision.
    pub decimals: u32,
}

/// A variable over the cardinality limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardinalityEntry {
    /// Variable name.
    pub variable: String,
    /// Distinct non-missing values.
    pub distinct: usize,
}

/// Frequency computation paused pending confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardinalityWarning {
    /// Limit that was exceeded.
    pub limit: usize,
    /// Offending variables.
    pub variables: Vec<CardinalityEntry>,
}

/// Either the tables or a request for confirmation.
#[derive(Debug, Clone, PartialEq)]
pub enum FrequencyOutcome {
    /// Computed tables.
    Report(FrequencyReport),
    /// Too many distinct values and `freq_confirmed` unset.
    Warning(CardinalityWarning),
}

/// Frequency tables of `x_vars`, each over its own non-missing values.
pub fn frequencies(ds: &Dataset, spec: &ModelSpec) -> Result<FrequencyOutcome> {
    let names: Vec<&str> = spec.x_vars.iter().map(String::as_str).collect();
    ds.require(&names)?;
    let all_rows: Vec<usize> = (0..ds.n_rows()).collect();

    if !spec.freq_confirmed {
        let mut over = Vec::new();
        for &name in &names {
            let distinct = ds.levels(name, &all_rows)?.len();
            if distinct > CARDINALITY_LIMIT {
                over.push(CardinalityEntry { variable: name.to_string(), distinct });
            }
        }
        if !over.is_empty() {
            log::warn!("freq: {} variable(s) exceed {} distinct values", over.len(), CARDINALITY_LIMIT);
            return Ok(FrequencyOutcome::Warning(CardinalityWarning {
                limit: CARDINALITY_LIMIT,
                variables: over,
            }));
        }
    }

    let mut tables = Vec::with_capacity(names.len());
    for &name in &names {
        let rows = match ds.complete_rows(&[name]) {
            Ok(rows) => rows,
            Err(Error::EmptySample { .. }) => Vec::new(),
            Err(e) => return Err(e),
        };
        if rows.is_empty() {
            if names.len() == 1 {
                return Err(Error::EmptySample { variables: vec![name.to_string()] });
            }
            log::warn!("freq: '{name}' has no valid observations; skipped");
            continue;
        }
        tables.push(table(ds, name, &rows, spec.decimals)?);
    }
    if tables.is_empty() {
        return Err(Error::EmptySample { variables: spec.x_vars.clone() });
    }

    Ok(FrequencyOutcome::Report(FrequencyReport {
        merged: spec.merge_freq_tables && names.len() > 1,
        tables,
        decimals: spec.decimals,
    }))
}

fn table(ds: &Dataset, name: &str, rows: &[usize], decimals: u32) -> Result<FrequencyTable> {
    let g = ds.group_codes(name, rows)?;
    let mut counts = vec![0usize; g.n_levels()];
    for &c in &g.codes {
        counts[c] += 1;
    }
    let total = rows.len();
    let mut cumulative = 0.0;
    let rows = g
        .levels
        .iter()
        .zip(counts)
        .map(|(level, count)| {
            let percent = count as f64 / total as f64 * 100.0;
            cumulative += percent;
            FrequencyRow {
                value: level.to_string(),
                count,
                percent: round_half_even(percent, decimals),
                cumulative: round_half_even(cumulative, decimals),
            }
        })
        .collect();
    Ok(FrequencyTable { variable: name.to_string(), rows, total })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sa_core::{Column, Method};

    fn ds() -> Dataset {
        Dataset::new(vec![
            ("a".into(), Column::Numeric(vec![Some(2.0), Some(1.0), Some(2.0), None, Some(2.0)])),
            (
                "c".into(),
                Column::Categorical(vec![Some("x".into()), None, Some("y".into()), Some("x".into()), None]),
            ),
            ("e".into(), Column::Numeric(vec![None; 5])),
        ])
        .unwrap()
    }

    #[test]
    fn test_single_table_percentages() {
        let spec = ModelSpec::new(Method::Freq, ["a"]).with_decimals(2);
        let FrequencyOutcome::Report(r) = frequencies(&ds(), &spec).unwrap() else {
            panic!("expected report");
        };
        assert!(!r.merged);
        let t = &r.tables[0];
        assert_eq!(t.total, 4);
        assert_eq!(t.rows[0].value, "1");
        assert_eq!(t.rows[0].count, 1);
        assert_eq!(t.rows[0].percent, 25.0);
        assert_eq!(t.rows[1].cumulative, 100.0);
    }

    #[test]
    fn test_empty_variables_are_skipped_in_multi_mode() {
        let mut spec = ModelSpec::new(Method::Freq, ["a", "e", "c"]);
        spec.merge_freq_tables = true;
        let FrequencyOutcome::Report(r) = frequencies(&ds(), &spec).unwrap() else {
            panic!("expected report");
        };
        assert!(r.merged);
        let vars: Vec<&str> = r.tables.iter().map(|t| t.variable.as_str()).collect();
        assert_eq!(vars, vec!["a", "c"]);

        let only_empty = ModelSpec::new(Method::Freq, ["e"]);
        assert!(matches!(frequencies(&ds(), &only_empty), Err(Error::EmptySample { .. })));
    }

    #[test]
    fn test_cardinality_guard_and_override() {
        let n = CARDINALITY_LIMIT + 1;
        let big = Dataset::new(vec![(
            "id".into(),
            Column::Numeric((0..n).map(|i| Some(i as f64)).collect()),
        )])
        .unwrap();
        let mut spec = ModelSpec::new(Method::Freq, ["id"]);
        match frequencies(&big, &spec).unwrap() {
            FrequencyOutcome::Warning(w) => {
                assert_eq!(w.limit, CARDINALITY_LIMIT);
                assert_eq!(w.variables, vec![CardinalityEntry { variable: "id".into(), distinct: n }]);
            }
            other => panic!("expected warning, got {other:?}"),
        }

        spec.freq_confirmed = true;
        match frequencies(&big, &spec).unwrap() {
            FrequencyOutcome::Report(r) => assert_eq!(r.tables[0].rows.len(), n),
            other => panic!("expected report, got {other:?}"),
        }
    }
}
