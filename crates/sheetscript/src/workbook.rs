//! Reading spreadsheet sheets into cell grids
//!
//! Excel-family files (xlsx, xlsm, xls, xlsb, ods) go through `calamine`;
//! csv files are read with the `csv` crate, which stands in for converting
//! them to a single-sheet workbook first.

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use log::debug;

use crate::{
    dataframe::CellValue,
    error::{StepError, StepResult},
    types::FxIndexMap,
};

/// Cells of one sheet, addressed by zero-based (row, column) from `A1`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<CellValue>>,
}

static NULL_CELL: CellValue = CellValue::Null;

impl Grid {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    /// Build a grid from raw text, inferring cell types
    pub fn from_text_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| CellValue::infer(cell.as_ref()))
                    .collect()
            })
            .collect();
        Self { rows }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Cell at a position; anything outside the stored cells is empty
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .unwrap_or(&NULL_CELL)
    }

    /// Cells of `row` for the columns `first_col..=last_col`
    pub fn row_slice(&self, row: usize, first_col: usize, last_col: usize) -> Vec<CellValue> {
        (first_col..=last_col)
            .map(|col| self.cell(row, col).clone())
            .collect()
    }
}

/// Source of sheet data for import steps
pub trait SheetReader: std::fmt::Debug {
    fn read_sheet(&self, path: &Path, sheet_name: &str) -> StepResult<Grid>;
}

/// Reads sheets from files on disk
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSheetReader;

impl SheetReader for FileSheetReader {
    fn read_sheet(&self, path: &Path, sheet_name: &str) -> StepResult<Grid> {
        if is_csv_path(path) {
            debug!("Reading csv file {}", path.display());
            return read_csv(path);
        }

        debug!("Reading sheet '{sheet_name}' from {}", path.display());
        let mut workbook = open_workbook_auto(path).map_err(|err| StepError::Workbook {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let range = workbook
            .worksheet_range(sheet_name)
            .map_err(|err| StepError::Workbook {
                path: path.to_path_buf(),
                message: format!("sheet '{sheet_name}': {err}"),
            })?;

        let (start_row, start_col) = range
            .start()
            .map_or((0, 0), |(row, col)| (row as usize, col as usize));
        let mut rows = vec![Vec::new(); start_row];
        for row in range.rows() {
            let mut cells = vec![CellValue::Null; start_col];
            cells.extend(row.iter().map(data_to_cell));
            rows.push(cells);
        }

        Ok(Grid::new(rows))
    }
}

/// Whether a path names a csv-like file rather than a workbook
pub fn is_csv_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "csv" | "tsv" | "txt"))
}

fn read_csv(path: &Path) -> StepResult<Grid> {
    let delimiter = if path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("tsv"))
    {
        b'\t'
    } else {
        b','
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|source| StepError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| StepError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        rows.push(record.iter().map(CellValue::infer).collect());
    }
    Ok(Grid::new(rows))
}

fn data_to_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Null,
        Data::String(value) if value.is_empty() => CellValue::Null,
        Data::String(value) => CellValue::Str(value.clone()),
        Data::Int(value) => CellValue::Int(*value),
        Data::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
            CellValue::Int(*value as i64)
        }
        Data::Float(value) => CellValue::Float(*value),
        Data::Bool(value) => CellValue::Bool(*value),
        Data::DateTime(value) => CellValue::Float(value.as_f64()),
        Data::DateTimeIso(value) | Data::DurationIso(value) => CellValue::Str(value.clone()),
        Data::Error(_) => CellValue::Null,
    }
}

/// Sheets held in memory, keyed by file path and sheet name
#[derive(Debug, Default, Clone)]
pub struct InMemorySheetReader {
    sheets: FxIndexMap<(String, String), Grid>,
}

impl InMemorySheetReader {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_sheet(mut self, path: &str, sheet_name: &str, grid: Grid) -> Self {
        self.sheets
            .insert((path.to_string(), sheet_name.to_string()), grid);
        self
    }
}

impl SheetReader for InMemorySheetReader {
    fn read_sheet(&self, path: &Path, sheet_name: &str) -> StepResult<Grid> {
        let key = (path.to_string_lossy().into_owned(), sheet_name.to_string());
        self.sheets
            .get(&key)
            .cloned()
            .ok_or_else(|| StepError::Workbook {
                path: path.to_path_buf(),
                message: format!("sheet '{sheet_name}' does not exist"),
            })
    }
}
