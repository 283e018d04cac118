//! Excel range arithmetic and value-based table detection
//!
//! These functions mirror the helpers the generated code calls at runtime
//! (`get_table_range`, `get_read_excel_params_from_range`), so that a step
//! executed here produces the same dataframes the emitted code will.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    dataframe::{CellValue, DataFrame},
    error::{StepError, StepResult},
    types::FxIndexMap,
    workbook::Grid,
};

pub const START_CONDITION_UPPER_LEFT_VALUE: &str = "upper left corner value";
pub const START_CONDITION_UPPER_LEFT_VALUE_STARTS_WITH: &str = "upper left corner value starts with";
pub const START_CONDITION_UPPER_LEFT_VALUE_CONTAINS: &str = "upper left corner value contains";

pub const END_CONDITION_FIRST_EMPTY_VALUE: &str = "first empty cell";
pub const END_CONDITION_BOTTOM_LEFT_CORNER_VALUE: &str = "bottom left corner value";
pub const END_CONDITION_BOTTOM_LEFT_CORNER_VALUE_STARTS_WITH: &str =
    "bottom left corner value starts with";
pub const END_CONDITION_BOTTOM_LEFT_CORNER_VALUE_CONTAINS: &str =
    "bottom left corner value contains";

pub const COLUMN_END_CONDITION_FIRST_EMPTY_CELL: &str = "first empty cell";
pub const COLUMN_END_CONDITION_NUM_COLUMNS: &str = "num columns";

/// Zero-based index of the last column of a worksheet (`XFD`)
pub const MAX_COLUMN_INDEX: usize = 16_383;

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$?([A-Za-z]{1,3})\$?(\d+):\$?([A-Za-z]{1,3})\$?(\d+)$")
        .expect("range pattern is valid")
});

/// Zero-based column index for a column name (`A` is 0, `AA` is 26)
pub fn get_column_index_from_column(column: &str) -> Option<usize> {
    if column.is_empty() {
        return None;
    }
    column.chars().try_fold(0usize, |acc, c| {
        let c = c.to_ascii_uppercase();
        c.is_ascii_uppercase()
            .then(|| acc * 26 + (c as usize - 'A' as usize + 1))
    })
    .map(|index| index - 1)
}

/// Column name for a zero-based column index
pub fn get_column_from_column_index(index: usize) -> String {
    let mut name = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        name.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

/// A rectangle of cells, zero-based and inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub first_row: usize,
    pub first_col: usize,
    pub last_row: usize,
    pub last_col: usize,
}

impl CellRange {
    pub fn parse(range: &str) -> StepResult<Self> {
        let invalid = || StepError::InvalidRange {
            range: range.to_string(),
        };
        let captures = RANGE_RE.captures(range.trim()).ok_or_else(invalid)?;

        let first_col = get_column_index_from_column(&captures[1]).ok_or_else(invalid)?;
        let last_col = get_column_index_from_column(&captures[3]).ok_or_else(invalid)?;
        let first_row = row_index(&captures[2]).ok_or_else(invalid)?;
        let last_row = row_index(&captures[4]).ok_or_else(invalid)?;

        if last_row < first_row || last_col < first_col || last_col > MAX_COLUMN_INDEX {
            return Err(invalid());
        }

        Ok(Self {
            first_row,
            first_col,
            last_row,
            last_col,
        })
    }

    /// The `usecols` selector of the range, e.g. `A:C`
    pub fn usecols(&self) -> String {
        format!(
            "{}:{}",
            get_column_from_column_index(self.first_col),
            get_column_from_column_index(self.last_col)
        )
    }
}

fn row_index(row: &str) -> Option<usize> {
    row.parse::<usize>().ok()?.checked_sub(1)
}

impl std::fmt::Display for CellRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}:{}{}",
            get_column_from_column_index(self.first_col),
            self.first_row + 1,
            get_column_from_column_index(self.last_col),
            self.last_row + 1
        )
    }
}

/// `pd.read_excel` arguments for a range: `(skiprows, nrows, usecols)`.
///
/// The first row of the range is the header row, so `nrows` counts only the
/// data rows below it.
pub fn get_read_excel_params_from_range(range: &str) -> StepResult<(usize, usize, String)> {
    let range = CellRange::parse(range)?;
    Ok((
        range.first_row,
        range.last_row - range.first_row,
        range.usecols(),
    ))
}

/// Read the cells of a range into a dataframe, header row first
pub fn read_range(grid: &Grid, range: &CellRange) -> DataFrame {
    let headers = grid.row_slice(range.first_row, range.first_col, range.last_col);
    let last_data_row = range.last_row.min(grid.height().saturating_sub(1));
    let rows: Vec<Vec<CellValue>> = (range.first_row + 1..=last_data_row)
        .map(|row| grid.row_slice(row, range.first_col, range.last_col))
        .collect();
    DataFrame::from_rows(&headers, &rows)
}

/// A raw range condition as recorded by the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeCondition {
    #[serde(rename = "type")]
    pub condition_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl RangeCondition {
    pub fn new(condition_type: &str, value: Option<Value>) -> Self {
        Self {
            condition_type: condition_type.to_string(),
            value,
        }
    }

    fn required_value(&self, category: &str) -> StepResult<Value> {
        match &self.value {
            Some(Value::Null) | None => Err(StepError::missing(format!("{category}.value"))),
            Some(value) => Ok(value.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StartCondition {
    UpperLeftValue(Value),
    UpperLeftValueStartsWith(Value),
    UpperLeftValueContains(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EndCondition {
    FirstEmptyCell,
    BottomLeftValue(Value),
    BottomLeftValueStartsWith(Value),
    BottomLeftValueContains(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnEndCondition {
    FirstEmptyCell,
    NumColumns(Value),
}

/// Validated conditions for value-based table detection
#[derive(Debug, Clone, PartialEq)]
pub struct TableRangeConditions {
    pub start: StartCondition,
    pub end: EndCondition,
    pub column_end: ColumnEndCondition,
}

impl TableRangeConditions {
    /// Validate raw conditions, failing on the first unknown type tag
    pub fn from_raw(
        start_condition: &RangeCondition,
        end_condition: &RangeCondition,
        column_end_condition: &RangeCondition,
    ) -> StepResult<Self> {
        let start = match start_condition.condition_type.as_str() {
            START_CONDITION_UPPER_LEFT_VALUE => StartCondition::UpperLeftValue(
                start_condition.required_value("start_condition")?,
            ),
            START_CONDITION_UPPER_LEFT_VALUE_STARTS_WITH => {
                StartCondition::UpperLeftValueStartsWith(
                    start_condition.required_value("start_condition")?,
                )
            }
            START_CONDITION_UPPER_LEFT_VALUE_CONTAINS => StartCondition::UpperLeftValueContains(
                start_condition.required_value("start_condition")?,
            ),
            other => {
                return Err(StepError::InvalidCondition {
                    category: "start condition",
                    value: other.to_string(),
                });
            }
        };

        let end = match end_condition.condition_type.as_str() {
            END_CONDITION_FIRST_EMPTY_VALUE => EndCondition::FirstEmptyCell,
            END_CONDITION_BOTTOM_LEFT_CORNER_VALUE => {
                EndCondition::BottomLeftValue(end_condition.required_value("end_condition")?)
            }
            END_CONDITION_BOTTOM_LEFT_CORNER_VALUE_STARTS_WITH => {
                EndCondition::BottomLeftValueStartsWith(
                    end_condition.required_value("end_condition")?,
                )
            }
            END_CONDITION_BOTTOM_LEFT_CORNER_VALUE_CONTAINS => EndCondition::BottomLeftValueContains(
                end_condition.required_value("end_condition")?,
            ),
            other => {
                return Err(StepError::InvalidCondition {
                    category: "end condition",
                    value: other.to_string(),
                });
            }
        };

        let column_end = match column_end_condition.condition_type.as_str() {
            COLUMN_END_CONDITION_FIRST_EMPTY_CELL => ColumnEndCondition::FirstEmptyCell,
            COLUMN_END_CONDITION_NUM_COLUMNS => ColumnEndCondition::NumColumns(
                column_end_condition.required_value("column_end_condition")?,
            ),
            other => {
                return Err(StepError::InvalidCondition {
                    category: "column end condition",
                    value: other.to_string(),
                });
            }
        };

        Ok(Self {
            start,
            end,
            column_end,
        })
    }
}

/// Keyword arguments for the generated `get_table_range` call.
///
/// Every condition category contributes exactly the one value its type tag
/// selects; parameters without a value are left out, in a stable order.
pub fn get_table_range_params(
    file_path: &str,
    sheet_name: &str,
    start_condition: &RangeCondition,
    end_condition: &RangeCondition,
    column_end_condition: &RangeCondition,
) -> StepResult<FxIndexMap<&'static str, Value>> {
    let conditions =
        TableRangeConditions::from_raw(start_condition, end_condition, column_end_condition)?;

    let (upper_left_value, upper_left_value_starts_with, upper_left_value_contains) =
        match conditions.start {
            StartCondition::UpperLeftValue(value) => (Some(value), None, None),
            StartCondition::UpperLeftValueStartsWith(value) => (None, Some(value), None),
            StartCondition::UpperLeftValueContains(value) => (None, None, Some(value)),
        };
    let (bottom_left_value, bottom_left_value_starts_with, bottom_left_value_contains) =
        match conditions.end {
            EndCondition::FirstEmptyCell => (None, None, None),
            EndCondition::BottomLeftValue(value) => (Some(value), None, None),
            EndCondition::BottomLeftValueStartsWith(value) => (None, Some(value), None),
            EndCondition::BottomLeftValueContains(value) => (None, None, Some(value)),
        };
    let num_columns = match conditions.column_end {
        ColumnEndCondition::FirstEmptyCell => None,
        ColumnEndCondition::NumColumns(value) => Some(value),
    };

    let all_params = [
        ("file_path", Some(Value::String(file_path.to_string()))),
        ("sheet_name", Some(Value::String(sheet_name.to_string()))),
        ("upper_left_value", upper_left_value),
        ("upper_left_value_starts_with", upper_left_value_starts_with),
        ("upper_left_value_contains", upper_left_value_contains),
        ("bottom_left_value", bottom_left_value),
        ("bottom_left_value_starts_with", bottom_left_value_starts_with),
        ("bottom_left_value_contains", bottom_left_value_contains),
        ("num_columns", num_columns),
    ];

    Ok(all_params
        .into_iter()
        .filter_map(|(name, value)| value.map(|value| (name, value)))
        .collect())
}

/// Text a condition value is compared against
fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn cell_text(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::Null => None,
        CellValue::Float(value) if value.fract() == 0.0 => Some(format!("{value}")),
        other => Some(other.to_string()),
    }
}

fn cell_matches(cell: &CellValue, pattern: &str, matcher: fn(&str, &str) -> bool) -> bool {
    cell_text(cell).is_some_and(|text| matcher(&text, pattern))
}

fn equals(text: &str, pattern: &str) -> bool {
    text == pattern
}

fn starts_with(text: &str, pattern: &str) -> bool {
    text.starts_with(pattern)
}

fn contains(text: &str, pattern: &str) -> bool {
    text.contains(pattern)
}

/// Find the rectangle described by `conditions` in a sheet.
///
/// The start cell is the first match scanning rows top to bottom, left to
/// right. The end row and last column are searched from the start cell.
pub fn get_table_range(
    grid: &Grid,
    conditions: &TableRangeConditions,
    file_path: &str,
    sheet_name: &str,
) -> StepResult<CellRange> {
    let not_found = || StepError::RangeNotFound {
        file_path: file_path.to_string(),
        sheet_name: sheet_name.to_string(),
    };

    let (start_value, start_matcher): (&Value, fn(&str, &str) -> bool) = match &conditions.start
    {
        StartCondition::UpperLeftValue(value) => (value, equals),
        StartCondition::UpperLeftValueStartsWith(value) => (value, starts_with),
        StartCondition::UpperLeftValueContains(value) => (value, contains),
    };
    let start_pattern = value_text(start_value);

    let width = grid.width();
    let (first_row, first_col) = (0..grid.height())
        .flat_map(|row| (0..width).map(move |col| (row, col)))
        .find(|&(row, col)| cell_matches(grid.cell(row, col), &start_pattern, start_matcher))
        .ok_or_else(not_found)?;

    let end_search: Option<(&Value, fn(&str, &str) -> bool)> = match &conditions.end {
        EndCondition::FirstEmptyCell => None,
        EndCondition::BottomLeftValue(value) => Some((value, equals)),
        EndCondition::BottomLeftValueStartsWith(value) => Some((value, starts_with)),
        EndCondition::BottomLeftValueContains(value) => Some((value, contains)),
    };
    let last_row = match end_search {
        None => {
            let mut row = first_row;
            while row + 1 < grid.height() && !grid.cell(row + 1, first_col).is_null() {
                row += 1;
            }
            row
        }
        Some((value, matcher)) => {
            let pattern = value_text(value);
            (first_row + 1..grid.height())
                .find(|&row| cell_matches(grid.cell(row, first_col), &pattern, matcher))
                .ok_or_else(not_found)?
        }
    };

    let last_col = match &conditions.column_end {
        ColumnEndCondition::FirstEmptyCell => {
            let mut col = first_col;
            while col + 1 < width && !grid.cell(first_row, col + 1).is_null() {
                col += 1;
            }
            col
        }
        ColumnEndCondition::NumColumns(value) => {
            let num_columns = match value {
                Value::Number(number) => number.as_u64(),
                Value::String(text) => text.trim().parse::<u64>().ok(),
                _ => None,
            };
            num_columns
                .filter(|&n| n > 0)
                .and_then(|n| usize::try_from(n - 1).ok())
                .and_then(|extra| first_col.checked_add(extra))
                .filter(|&last| last <= MAX_COLUMN_INDEX)
                .ok_or_else(|| StepError::InvalidNumber {
                    value: value_text(value),
                    expected: "a positive number of columns that fits in the sheet",
                })?
        }
    };

    Ok(CellRange {
        first_row,
        first_col,
        last_row,
        last_col,
    })
}
