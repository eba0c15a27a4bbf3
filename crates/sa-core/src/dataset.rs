//! Immutable column-oriented dataset and the adapter operations estimators use
//! to pull complete-case samples out of it.
//!
//! A [`Dataset`] is built once per analysis request from an already-parsed
//! source. It is never mutated: row filtering produces index lists and
//! [`Selection`]s, not new copies of the dataset.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One column of a [`Dataset`].
///
/// `None` marks a missing cell. Non-finite numeric values are treated as
/// missing as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum Column {
    /// Floating-point column.
    Numeric(Vec<Option<f64>>),
    /// Finite, unordered label set.
    Categorical(Vec<Option<String>>),
}

impl Column {
    /// Number of cells.
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Categorical(v) => v.len(),
        }
    }

    /// `true` if the column has no cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` for numeric columns.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Column::Numeric(_))
    }

    /// `true` if cell `i` is missing.
    #[inline]
    pub fn is_missing(&self, i: usize) -> bool {
        match self {
            Column::Numeric(v) => !matches!(v[i], Some(x) if x.is_finite()),
            Column::Categorical(v) => v[i].is_none(),
        }
    }

    /// Level of cell `i`, or `None` when missing.
    pub fn level(&self, i: usize) -> Option<Level> {
        match self {
            Column::Numeric(v) => v[i].filter(|x| x.is_finite()).map(Level::Number),
            Column::Categorical(v) => v[i].clone().map(Level::Label),
        }
    }
}

/// A distinct value of a column, used for grouping, indicator expansion and
/// frequency tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Level {
    /// Numeric value.
    Number(f64),
    /// Categorical label.
    Label(String),
}

impl Level {
    fn cmp_total(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Level::Number(a), Level::Number(b)) => a.total_cmp(b),
            (Level::Label(a), Level::Label(b)) => a.cmp(b),
            (Level::Number(_), Level::Label(_)) => Ordering::Less,
            (Level::Label(_), Level::Number(_)) => Ordering::Greater,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Number(x) if x.fract() == 0.0 && x.abs() < 1e15 => write!(f, "{}", *x as i64),
            Level::Number(x) => write!(f, "{x}"),
            Level::Label(s) => f.write_str(s),
        }
    }
}

/// Dense 0-based level codes for a subset of rows.
#[derive(Debug, Clone)]
pub struct GroupCodes {
    /// `codes[i]` is the level index of the i-th selected row.
    pub codes: Vec<usize>,
    /// Sorted distinct levels; `levels[codes[i]]` is the value of row i.
    pub levels: Vec<Level>,
}

impl GroupCodes {
    /// Number of distinct levels.
    pub fn n_levels(&self) -> usize {
        self.levels.len()
    }
}

/// How categorical regressors enter a design matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoricalHandling {
    /// One indicator column per non-reference level (sorted levels, first
    /// level dropped).
    #[default]
    Expand,
    /// A single column of dense level codes, for estimators that absorb the
    /// variable instead of expanding it.
    Codes,
}

/// Complete-case sample extracted by [`Dataset::select`].
#[derive(Debug, Clone)]
pub struct Selection {
    /// Indices (into the dataset) of rows where every requested variable is present.
    pub rows: Vec<usize>,
    /// Validity mask over all dataset rows.
    pub mask: Vec<bool>,
    /// Design column names after categorical expansion.
    pub names: Vec<String>,
    /// Row-major data, shape `(rows.len(), names.len())`.
    pub data: Vec<f64>,
}

impl Selection {
    /// Number of selected rows.
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of design columns.
    pub fn n_cols(&self) -> usize {
        self.names.len()
    }

    /// Copy of design column `j`.
    pub fn column(&self, j: usize) -> Vec<f64> {
        let p = self.n_cols();
        (0..self.n_rows()).map(|i| self.data[i * p + j]).collect()
    }
}

/// Immutable view over equally long named columns.
#[derive(Debug, Clone)]
pub struct Dataset {
    names: Vec<String>,
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    n_rows: usize,
}

impl Dataset {
    /// Build a dataset from named columns.
    ///
    /// Fails if names repeat or column lengths differ.
    pub fn new(columns: Vec<(String, Column)>) -> Result<Self> {
        let n_rows = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        let mut names = Vec::with_capacity(columns.len());
        let mut cols = Vec::with_capacity(columns.len());
        let mut index = HashMap::with_capacity(columns.len());
        for (name, col) in columns {
            if col.len() != n_rows {
                return Err(Error::Validation(format!(
                    "column '{}' has {} rows, expected {}",
                    name,
                    col.len(),
                    n_rows
                )));
            }
            if index.insert(name.clone(), cols.len()).is_some() {
                return Err(Error::Validation(format!("duplicate column name '{name}'")));
            }
            names.push(name);
            cols.push(col);
        }
        Ok(Self { names, columns: cols, index, n_rows })
    }

    /// Row count N.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Column names in construction order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// `true` if a column with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.index
            .get(name)
            .map(|&i| &self.columns[i])
            .ok_or_else(|| Error::MissingVariable { names: vec![name.to_string()] })
    }

    /// Fail with [`Error::MissingVariable`] listing every absent name.
    pub fn require(&self, names: &[&str]) -> Result<()> {
        let missing: Vec<String> =
            names.iter().filter(|n| !self.contains(n)).map(|n| n.to_string()).collect();
        if missing.is_empty() { Ok(()) } else { Err(Error::MissingVariable { names: missing }) }
    }

    /// Mask of rows where every named variable is non-missing.
    pub fn valid_mask(&self, names: &[&str]) -> Result<Vec<bool>> {
        self.require(names)?;
        let cols: Vec<&Column> = names.iter().map(|n| &self.columns[self.index[*n]]).collect();
        Ok((0..self.n_rows).map(|i| cols.iter().all(|c| !c.is_missing(i))).collect())
    }

    /// Indices of complete-case rows for `names`.
    ///
    /// Fails with [`Error::EmptySample`] when no row survives.
    pub fn complete_rows(&self, names: &[&str]) -> Result<Vec<usize>> {
        let mask = self.valid_mask(names)?;
        let rows: Vec<usize> = mask.iter().enumerate().filter(|(_, ok)| **ok).map(|(i, _)| i).collect();
        if rows.is_empty() {
            return Err(Error::EmptySample { variables: names.iter().map(|s| s.to_string()).collect() });
        }
        Ok(rows)
    }

    /// Values of a numeric column at `rows`.
    ///
    /// Rows are assumed complete for `name`; a missing cell yields `NaN`.
    pub fn numeric(&self, name: &str, rows: &[usize]) -> Result<Vec<f64>> {
        match self.column(name)? {
            Column::Numeric(v) => Ok(rows.iter().map(|&i| v[i].unwrap_or(f64::NAN)).collect()),
            Column::Categorical(_) => Err(Error::NonNumericVariable { name: name.to_string() }),
        }
    }

    /// Sorted distinct non-missing levels of `name` over `rows`.
    pub fn levels(&self, name: &str, rows: &[usize]) -> Result<Vec<Level>> {
        let col = self.column(name)?;
        Ok(match col {
            Column::Numeric(v) => {
                let mut xs: Vec<f64> =
                    rows.iter().filter_map(|&i| v[i]).filter(|x| x.is_finite()).collect();
                xs.sort_by(f64::total_cmp);
                xs.dedup();
                xs.into_iter().map(Level::Number).collect()
            }
            Column::Categorical(v) => {
                let set: BTreeSet<&str> = rows.iter().filter_map(|&i| v[i].as_deref()).collect();
                set.into_iter().map(|s| Level::Label(s.to_string())).collect()
            }
        })
    }

    /// Dense level codes of `name` over `rows` (levels sorted ascending).
    ///
    /// Rows must be complete for `name`.
    pub fn group_codes(&self, name: &str, rows: &[usize]) -> Result<GroupCodes> {
        let levels = self.levels(name, rows)?;
        let col = self.column(name)?;
        let mut codes = Vec::with_capacity(rows.len());
        for &i in rows {
            let lvl = col.level(i).ok_or_else(|| {
                Error::Validation(format!("row {i} of '{name}' is missing in a complete-case sample"))
            })?;
            let code = levels
                .binary_search_by(|probe| probe.cmp_total(&lvl))
                .map_err(|_| Error::Computation(format!("level '{lvl}' of '{name}' not indexed")))?;
            codes.push(code);
        }
        Ok(GroupCodes { codes, levels })
    }

    /// Design columns for `names` over `rows`, expanding categoricals per `handling`.
    ///
    /// Returns the expanded column names and the row-major data.
    pub fn design(
        &self,
        names: &[&str],
        rows: &[usize],
        handling: CategoricalHandling,
    ) -> Result<(Vec<String>, Vec<f64>)> {
        self.require(names)?;
        let mut out_names = Vec::new();
        let mut out_cols: Vec<Vec<f64>> = Vec::new();

        for &name in names {
            match (self.column(name)?, handling) {
                (Column::Numeric(_), _) => {
                    out_names.push(name.to_string());
                    out_cols.push(self.numeric(name, rows)?);
                }
                (Column::Categorical(_), CategoricalHandling::Codes) => {
                    let g = self.group_codes(name, rows)?;
                    out_names.push(name.to_string());
                    out_cols.push(g.codes.iter().map(|&c| c as f64).collect());
                }
                (Column::Categorical(_), CategoricalHandling::Expand) => {
                    let g = self.group_codes(name, rows)?;
                    for (code, lvl) in g.levels.iter().enumerate().skip(1) {
                        out_names.push(format!("{name}={lvl}"));
                        out_cols.push(
                            g.codes.iter().map(|&c| if c == code { 1.0 } else { 0.0 }).collect(),
                        );
                    }
                }
            }
        }

        let n = rows.len();
        let p = out_cols.len();
        let mut data = vec![0.0; n * p];
        for (j, col) in out_cols.iter().enumerate() {
            for (i, &v) in col.iter().enumerate() {
                data[i * p + j] = v;
            }
        }
        Ok((out_names, data))
    }

    /// Complete-case selection of `names`: filters to rows where every
    /// variable is present, then builds the (expanded) design matrix.
    pub fn select(&self, names: &[&str], handling: CategoricalHandling) -> Result<Selection> {
        let mask = self.valid_mask(names)?;
        let rows: Vec<usize> = mask.iter().enumerate().filter(|(_, ok)| **ok).map(|(i, _)| i).collect();
        if rows.is_empty() {
            return Err(Error::EmptySample { variables: names.iter().map(|s| s.to_string()).collect() });
        }
        let (out_names, data) = self.design(names, &rows, handling)?;
        Ok(Selection { rows, mask, names: out_names, data })
    }
}
