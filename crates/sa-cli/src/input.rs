//! Dataset and model-spec readers.
//!
//! Dataset JSON: `{"columns": [{"name": "...", "values": [...]}]}`. A column of
//! numbers and nulls is numeric; any string makes it categorical.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value;

use sa_core::{Column, Dataset, ModelSpec};

#[derive(Debug, Deserialize)]
struct DatasetJson {
    columns: Vec<ColumnJson>,
}

#[derive(Debug, Deserialize)]
struct ColumnJson {
    name: String,
    values: Vec<Value>,
}

fn column(c: &ColumnJson) -> Result<Column> {
    let categorical = c.values.iter().any(Value::is_string);
    let mut numeric = Vec::with_capacity(c.values.len());
    let mut labels = Vec::with_capacity(c.values.len());
    for (i, v) in c.values.iter().enumerate() {
        match v {
            Value::Null => {
                numeric.push(None);
                labels.push(None);
            }
            Value::Number(n) => {
                let x = n.as_f64();
                numeric.push(x);
                labels.push(Some(n.to_string()));
            }
            Value::String(s) => {
                numeric.push(None);
                labels.push(Some(s.clone()));
            }
            other => bail!("column '{}', row {}: unsupported value {}", c.name, i, other),
        }
    }
    Ok(if categorical { Column::Categorical(labels) } else { Column::Numeric(numeric) })
}

/// Parse dataset JSON bytes.
pub fn parse_dataset(bytes: &[u8]) -> Result<Dataset> {
    let raw: DatasetJson = serde_json::from_slice(bytes)?;
    let columns =
        raw.columns.iter().map(|c| Ok((c.name.clone(), column(c)?))).collect::<Result<Vec<_>>>()?;
    Ok(Dataset::new(columns)?)
}

/// Read a dataset JSON file.
pub fn read_dataset(path: &Path) -> Result<Dataset> {
    let bytes = std::fs::read(path).with_context(|| format!("reading dataset {}", path.display()))?;
    parse_dataset(&bytes).with_context(|| format!("parsing dataset {}", path.display()))
}

/// Read a model spec (YAML or JSON; the YAML parser accepts both).
pub fn read_model_spec(path: &Path) -> Result<ModelSpec> {
    let bytes = std::fs::read(path).with_context(|| format!("reading spec {}", path.display()))?;
    serde_yaml_ng::from_slice(&bytes).with_context(|| format!("parsing spec {}", path.display()))
}
