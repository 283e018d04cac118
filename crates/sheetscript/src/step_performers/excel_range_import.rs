//! Import of explicit or value-detected ranges from one sheet
//!
//! The sheet is read once through the context's sheet reader and every range
//! becomes its own dataframe. Csv input is only accepted together with
//! `convert_csv_to_xlsx`, because the generated code reads with
//! `pd.read_excel` and needs the converted workbook.

use std::{path::Path, sync::Arc};

use log::debug;
use rustc_hash::FxHashSet;

use super::{StepContext, StepPerformer, StepType};
use crate::{
    code_chunks::{CodeChunk, ExcelRangeImport, ExcelRangeImportCodeChunk},
    dataframe_names::get_valid_dataframe_names,
    error::{StepError, StepResult},
    excel_utils::{CellRange, TableRangeConditions, get_table_range, read_range},
    params::StepParams,
    state::State,
    types::DataframeSource,
    workbook::is_csv_path,
};

/// Names the new dataframes received, in the order of the range imports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcelRangeImportExecutionData {
    pub new_df_names: Vec<String>,
}

/// Imports several ranges from a single sheet of a workbook or csv file,
/// each into its own dataframe.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExcelRangeImportStepPerformer;

impl StepPerformer for ExcelRangeImportStepPerformer {
    type ExecutionData = ExcelRangeImportExecutionData;

    fn step_version() -> u32 {
        6
    }

    fn step_type() -> StepType {
        StepType::ExcelRangeImport
    }

    fn execute(
        prev_state: &State,
        params: &StepParams,
        ctx: StepContext<'_>,
    ) -> StepResult<(State, ExcelRangeImportExecutionData)> {
        let file_path: String = params.get_param("file_path")?;
        let sheet_name: String = params.get_param("sheet")?;
        let range_imports: Vec<ExcelRangeImport> = params.get_param("range_imports")?;
        let convert_csv_to_xlsx = params
            .get_optional_param("convert_csv_to_xlsx")?
            .unwrap_or(false);
        if is_csv_path(Path::new(&file_path)) && !convert_csv_to_xlsx {
            return Err(StepError::invalid(
                "convert_csv_to_xlsx",
                format!("{file_path} is a csv file and is only read after conversion to xlsx"),
            ));
        }

        let desired: Vec<&str> = range_imports.iter().map(ExcelRangeImport::df_name).collect();
        let new_df_names = get_valid_dataframe_names(prev_state.df_names(), &desired);

        let grid = ctx.sheet_reader.read_sheet(Path::new(&file_path), &sheet_name)?;

        let mut post_state = prev_state.clone();
        for (range_import, df_name) in range_imports.iter().zip(&new_df_names) {
            let range = match range_import {
                ExcelRangeImport::Range { value, .. } => CellRange::parse(value)?,
                ExcelRangeImport::Conditional {
                    start_condition,
                    end_condition,
                    column_end_condition,
                    ..
                } => {
                    let conditions = TableRangeConditions::from_raw(
                        start_condition,
                        end_condition,
                        column_end_condition,
                    )?;
                    get_table_range(&grid, &conditions, &file_path, &sheet_name)?
                }
            };

            debug!("Importing {range} from '{sheet_name}' in {file_path} as {df_name}");
            post_state.push_dataframe(
                df_name.clone(),
                read_range(&grid, &range),
                DataframeSource::Imported,
            );
        }

        Ok((post_state, ExcelRangeImportExecutionData { new_df_names }))
    }

    fn transpile(
        prev_state: &Arc<State>,
        post_state: &Arc<State>,
        params: &StepParams,
        execution_data: &ExcelRangeImportExecutionData,
    ) -> StepResult<Vec<CodeChunk>> {
        let range_imports: Vec<ExcelRangeImport> = params.get_param("range_imports")?;
        if range_imports.len() != execution_data.new_df_names.len() {
            return Err(StepError::ExecutionDataMismatch {
                step_type: Self::step_type().as_str(),
            });
        }

        Ok(vec![CodeChunk::ExcelRangeImport(
            ExcelRangeImportCodeChunk::new(
                Arc::clone(prev_state),
                Arc::clone(post_state),
                params.get_param("file_path")?,
                params.get_param("sheet")?,
                range_imports,
                execution_data.new_df_names.clone(),
                params
                    .get_optional_param("convert_csv_to_xlsx")?
                    .unwrap_or(false),
            ),
        )])
    }

    /// Range imports update live while the user edits them, so every
    /// dataframe is reset when the step is overwritten
    fn get_modified_dataframe_indexes(_params: &StepParams) -> StepResult<FxHashSet<usize>> {
        Ok(FxHashSet::default())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::{
        dataframe::{CellValue, DataFrame},
        importers::ImporterRegistry,
        workbook::{Grid, InMemorySheetReader},
    };

    fn reader() -> InMemorySheetReader {
        InMemorySheetReader::new().with_sheet(
            "data.xlsx",
            "Sheet1",
            Grid::from_text_rows([
                vec!["", "", "", ""],
                vec!["", "Region", "Sales", ""],
                vec!["", "North", "10", ""],
                vec!["", "South", "20", ""],
                vec!["", "", "", ""],
                vec!["", "Total", "30", ""],
            ]),
        )
    }

    fn execute(prev: &State, params: &StepParams) -> StepResult<(State, ExcelRangeImportExecutionData)> {
        let reader = reader();
        let importers = ImporterRegistry::new();
        ExcelRangeImportStepPerformer::execute(
            prev,
            params,
            StepContext {
                sheet_reader: &reader,
                importers: &importers,
            },
        )
    }

    fn params(range_imports: serde_json::Value) -> StepParams {
        StepParams::from_value(json!({
            "file_path": "data.xlsx",
            "sheet": "Sheet1",
            "range_imports": range_imports,
            "convert_csv_to_xlsx": false,
        }))
        .unwrap()
    }

    #[test]
    fn test_explicit_and_detected_ranges() {
        let case_mismatch = params(json!([
            {"type": "range", "df_name": "explicit", "value": "B2:C4"},
            {
                "type": "conditional",
                "df_name": "detected",
                "start_condition": {"type": "upper left corner value", "value": "region"},
                "end_condition": {"type": "first empty cell"},
                "column_end_condition": {"type": "first empty cell"}
            }
        ]));
        // Detection is case sensitive, so the second range is not found
        assert!(matches!(
            execute(&State::default(), &case_mismatch),
            Err(StepError::RangeNotFound { .. })
        ));

        let both = params(json!([
            {"type": "range", "df_name": "explicit", "value": "B2:C4"},
            {
                "type": "conditional",
                "df_name": "detected",
                "start_condition": {"type": "upper left corner value", "value": "Region"},
                "end_condition": {"type": "first empty cell"},
                "column_end_condition": {"type": "num columns", "value": 2}
            }
        ]));
        let (post, data) = execute(&State::default(), &both).unwrap();

        assert_eq!(data.new_df_names, vec!["explicit", "detected"]);
        assert_eq!(post.len(), 2);
        assert_eq!(post.df_sources(), [DataframeSource::Imported, DataframeSource::Imported]);
        for df in post.dfs() {
            assert_eq!(df.headers().collect::<Vec<_>>(), vec!["Region", "Sales"]);
            assert_eq!(
                df.columns()[1].values,
                vec![CellValue::Int(10), CellValue::Int(20)]
            );
        }
    }

    #[test]
    fn test_names_are_resolved_against_existing_dataframes() {
        let prev = State::new(vec![("sales".to_string(), DataFrame::default())]);
        let two_sales = params(json!([
            {"type": "range", "df_name": "sales", "value": "B2:C4"},
            {"type": "range", "df_name": "sales", "value": "B2:C3"}
        ]));
        let (post, data) = execute(&prev, &two_sales).unwrap();

        assert_eq!(data.new_df_names, vec!["sales_1", "sales_2"]);
        assert_eq!(post.df_names(), ["sales", "sales_1", "sales_2"]);
        assert_eq!(prev.len(), 1);
    }

    #[test]
    fn test_transpile_uses_resolved_names() {
        let prev = Arc::new(State::new(vec![("sales".to_string(), DataFrame::default())]));
        let one_sales = params(json!([
            {"type": "range", "df_name": "sales", "value": "B2:C4"}
        ]));
        let (post, data) = execute(&prev, &one_sales).unwrap();
        let post = Arc::new(post);

        let chunks =
            ExcelRangeImportStepPerformer::transpile(&prev, &post, &one_sales, &data).unwrap();
        let (code, _) = chunks[0].get_code().unwrap();
        assert_eq!(
            code,
            vec![
                "sales_1 = pd.read_excel('data.xlsx', sheet_name='Sheet1', skiprows=1, nrows=2, usecols='B:C')"
            ]
        );
        assert_eq!(chunks[0].get_created_sheet_indexes(), Some(vec![1]));
    }

    #[test]
    fn test_unknown_condition_type() {
        let bad_end = params(json!([{
            "type": "conditional",
            "df_name": "df1",
            "start_condition": {"type": "upper left corner value", "value": "Region"},
            "end_condition": {"type": "last row"},
            "column_end_condition": {"type": "first empty cell"}
        }]));
        assert!(matches!(
            execute(&State::default(), &bad_end),
            Err(StepError::InvalidCondition {
                category: "end condition",
                ..
            })
        ));
    }

    #[test]
    fn test_csv_requires_conversion() {
        let reader = InMemorySheetReader::new().with_sheet(
            "data.csv",
            "data",
            Grid::from_text_rows([vec!["a", "b"], vec!["1", "2"]]),
        );
        let importers = ImporterRegistry::new();
        let run = |convert: bool| {
            let params = StepParams::from_value(json!({
                "file_path": "data.csv",
                "sheet": "data",
                "range_imports": [{"type": "range", "df_name": "df1", "value": "A1:B2"}],
                "convert_csv_to_xlsx": convert,
            }))
            .unwrap();
            ExcelRangeImportStepPerformer::execute(
                &State::default(),
                &params,
                StepContext {
                    sheet_reader: &reader,
                    importers: &importers,
                },
            )
        };

        match run(false) {
            Err(StepError::InvalidParameter { name, .. }) => {
                assert_eq!(name, "convert_csv_to_xlsx");
            }
            other => panic!("Expected InvalidParameter, got {other:?}"),
        }

        let (post, data) = run(true).unwrap();
        assert_eq!(data.new_df_names, vec!["df1"]);
        assert_eq!(post.df(0).unwrap().num_rows(), 1);
    }

    #[test]
    fn test_modified_indexes_are_empty() {
        assert!(
            ExcelRangeImportStepPerformer::get_modified_dataframe_indexes(&StepParams::new())
                .unwrap()
                .is_empty()
        );
    }
}
