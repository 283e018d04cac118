//! In-memory dataframes held by a [`State`](crate::state::State)
//!
//! Columns carry a pandas-style dtype inferred from their values, so that the
//! state seen by the user matches what the generated pandas code produces.

use std::fmt;

use crate::types::{ColumnHeader, FxIndexSet};

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Parse a raw text value the way a csv reader infers types
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Null;
        }
        if let Ok(value) = trimmed.parse::<i64>() {
            return CellValue::Int(value);
        }
        if let Ok(value) = trimmed.parse::<f64>() {
            if value.is_nan() {
                return CellValue::Null;
            }
            return CellValue::Float(value);
        }
        match trimmed {
            "True" | "TRUE" | "true" => CellValue::Bool(true),
            "False" | "FALSE" | "false" => CellValue::Bool(false),
            _ => CellValue::Str(raw.to_string()),
        }
    }
}

/// Renders the value the way `astype(str)` does in pandas
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => f.write_str("nan"),
            CellValue::Bool(true) => f.write_str("True"),
            CellValue::Bool(false) => f.write_str("False"),
            CellValue::Int(value) => write!(f, "{value}"),
            CellValue::Float(value) if value.is_finite() && value.fract() == 0.0 => {
                write!(f, "{value:.1}")
            }
            CellValue::Float(value) => write!(f, "{value}"),
            CellValue::Str(value) => f.write_str(value),
        }
    }
}

/// Column dtype, mirroring the pandas dtypes the generated code produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dtype {
    Int,
    Float,
    Bool,
    Str,
    Object,
}

impl Dtype {
    /// Infer the dtype pandas would give a column holding these values
    pub fn infer(values: &[CellValue]) -> Self {
        let mut has_null = false;
        let mut has_int = false;
        let mut has_float = false;
        let mut has_bool = false;
        let mut has_str = false;

        for value in values {
            match value {
                CellValue::Null => has_null = true,
                CellValue::Int(_) => has_int = true,
                CellValue::Float(_) => has_float = true,
                CellValue::Bool(_) => has_bool = true,
                CellValue::Str(_) => has_str = true,
            }
        }

        match (has_int || has_float, has_bool, has_str) {
            (true, false, false) if has_float || has_null => Dtype::Float,
            (true, false, false) => Dtype::Int,
            (false, true, false) if !has_null => Dtype::Bool,
            (false, false, true) => Dtype::Str,
            (false, false, false) => Dtype::Float,
            _ => Dtype::Object,
        }
    }

    /// Cast the string form of a cell back into this dtype.
    ///
    /// Returns `None` when the text is not a valid value of the dtype, which
    /// is the case where `astype` raises in pandas.
    pub fn cast(self, text: &str) -> Option<CellValue> {
        match self {
            Dtype::Int => text.trim().parse::<i64>().ok().map(CellValue::Int),
            Dtype::Float => match text.trim() {
                "nan" | "NaN" => Some(CellValue::Null),
                trimmed => trimmed.parse::<f64>().ok().map(CellValue::Float),
            },
            Dtype::Bool => match text {
                "True" => Some(CellValue::Bool(true)),
                "False" => Some(CellValue::Bool(false)),
                _ => None,
            },
            Dtype::Str | Dtype::Object => Some(CellValue::Str(text.to_string())),
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dtype::Int => write!(f, "int64"),
            Dtype::Float => write!(f, "float64"),
            Dtype::Bool => write!(f, "bool"),
            Dtype::Str | Dtype::Object => write!(f, "object"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub header: ColumnHeader,
    pub dtype: Dtype,
    pub values: Vec<CellValue>,
}

impl Column {
    /// Create a column, inferring its dtype and normalizing values to it
    pub fn new(header: impl Into<ColumnHeader>, values: Vec<CellValue>) -> Self {
        let dtype = Dtype::infer(&values);
        let values = if dtype == Dtype::Float {
            values
                .into_iter()
                .map(|value| match value {
                    CellValue::Int(value) => CellValue::Float(value as f64),
                    other => other,
                })
                .collect()
        } else {
            values
        };

        Self {
            header: header.into(),
            dtype,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataFrame {
    columns: Vec<Column>,
}

impl DataFrame {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Build a dataframe from a header row and data rows, the way
    /// `pd.read_excel` names columns: empty headers become `Unnamed: {i}` and
    /// repeated headers get `.1`, `.2` suffixes.
    pub fn from_rows(headers: &[CellValue], rows: &[Vec<CellValue>]) -> Self {
        let mut seen: FxIndexSet<String> = FxIndexSet::default();
        let columns = headers
            .iter()
            .enumerate()
            .map(|(index, header)| {
                let base = match header {
                    CellValue::Null => format!("Unnamed: {index}"),
                    CellValue::Float(value) if value.fract() == 0.0 => format!("{value}"),
                    other => other.to_string(),
                };
                let header = unique_header(&seen, &base);
                seen.insert(header.clone());

                let values = rows
                    .iter()
                    .map(|row| row.get(index).cloned().unwrap_or(CellValue::Null))
                    .collect();
                Column::new(header, values)
            })
            .collect();

        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.header.as_str())
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Replace the column at `index`, returning the previous one
    pub fn replace_column(&mut self, index: usize, column: Column) -> Option<Column> {
        let slot = self.columns.get_mut(index)?;
        Some(std::mem::replace(slot, column))
    }
}

fn unique_header(seen: &FxIndexSet<String>, base: &str) -> String {
    if !seen.contains(base) {
        return base.to_string();
    }
    (1..)
        .map(|suffix| format!("{base}.{suffix}"))
        .find(|candidate| !seen.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}
