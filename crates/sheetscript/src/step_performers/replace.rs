//! Case-insensitive find and replace over the cells and headers of a
//! dataframe
//!
//! Cells are matched through their string form and cast back to the column
//! dtype afterwards, so a replacement that produces text the dtype cannot
//! hold fails the step.

use std::sync::Arc;

use log::debug;
use regex::{NoExpand, Regex, RegexBuilder};
use rustc_hash::FxHashSet;

use super::{StepContext, StepPerformer, StepType};
use crate::{
    code_chunks::{CodeChunk, ReplaceCodeChunk},
    dataframe::{Column, DataFrame},
    error::{StepError, StepResult},
    params::StepParams,
    state::State,
    types::ColumnId,
};

/// Replaces a search value with a replace value in the cells and the column
/// headers of a dataframe, matching case-insensitively.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplaceStepPerformer;

impl StepPerformer for ReplaceStepPerformer {
    type ExecutionData = ();

    fn step_version() -> u32 {
        1
    }

    fn step_type() -> StepType {
        StepType::Replace
    }

    fn execute(
        prev_state: &State,
        params: &StepParams,
        _ctx: StepContext<'_>,
    ) -> StepResult<(State, ())> {
        let search_value: String = params.get_param("search_value")?;
        let replace_value: String = params.get_param("replace_value")?;

        match replace_in_state(prev_state, params, &search_value, &replace_value) {
            Ok(post_state) => Ok((post_state, ())),
            Err(err) => {
                debug!("Replacing '{search_value}' with '{replace_value}' failed: {err}");
                Err(StepError::InvalidReplace {
                    search_value,
                    replace_value,
                })
            }
        }
    }

    fn transpile(
        prev_state: &Arc<State>,
        post_state: &Arc<State>,
        params: &StepParams,
        _execution_data: &(),
    ) -> StepResult<Vec<CodeChunk>> {
        Ok(vec![CodeChunk::Replace(ReplaceCodeChunk::new(
            Arc::clone(prev_state),
            Arc::clone(post_state),
            params.get_param("sheet_index")?,
            params.get_param("column_ids")?,
            params.get_param("search_value")?,
            params.get_param("replace_value")?,
        ))])
    }

    fn get_modified_dataframe_indexes(params: &StepParams) -> StepResult<FxHashSet<usize>> {
        let sheet_index: usize = params.get_param("sheet_index")?;
        Ok(FxHashSet::from_iter([sheet_index]))
    }
}

fn replace_in_state(
    prev_state: &State,
    params: &StepParams,
    search_value: &str,
    replace_value: &str,
) -> StepResult<State> {
    let sheet_index: usize = params.get_param("sheet_index")?;
    let column_ids: Vec<ColumnId> = params.get_param("column_ids")?;
    if search_value.is_empty() {
        return Err(StepError::invalid("search_value", "must not be empty"));
    }

    let df = prev_state.df(sheet_index)?;
    let column_indexes: Vec<usize> = if column_ids.is_empty() {
        (0..df.num_columns()).collect()
    } else {
        column_ids
            .iter()
            .map(|column_id| prev_state.column_index(sheet_index, column_id))
            .collect::<StepResult<_>>()?
    };

    let pattern = RegexBuilder::new(&regex::escape(search_value))
        .case_insensitive(true)
        .build()
        .map_err(|err| StepError::invalid("search_value", err.to_string()))?;

    let mut new_df: DataFrame = DataFrame::clone(df);
    for index in column_indexes {
        let column = df
            .column(index)
            .ok_or_else(|| StepError::invalid("column_ids", format!("no column at {index}")))?;
        new_df.replace_column(index, replace_in_column(column, &pattern, replace_value)?);
    }

    let mut post_state = prev_state.clone();
    post_state.replace_dataframe(sheet_index, new_df)?;
    Ok(post_state)
}

/// Replace inside the string form of every cell, then cast back to the
/// column dtype, the way `astype(str).replace(...).astype(dtype)` does
fn replace_in_column(column: &Column, pattern: &Regex, replace_value: &str) -> StepResult<Column> {
    let values = column
        .values
        .iter()
        .map(|value| {
            let text = value.to_string();
            let replaced = pattern.replace_all(&text, NoExpand(replace_value));
            column
                .dtype
                .cast(&replaced)
                .ok_or_else(|| StepError::InvalidNumber {
                    value: replaced.into_owned(),
                    expected: "a value of the column type",
                })
        })
        .collect::<StepResult<Vec<_>>>()?;

    Ok(Column {
        header: pattern
            .replace_all(&column.header, NoExpand(replace_value))
            .into_owned(),
        dtype: column.dtype,
        values,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::{
        dataframe::{CellValue, Dtype},
        importers::ImporterRegistry,
        workbook::InMemorySheetReader,
    };

    fn state() -> State {
        let df = DataFrame::new(vec![
            Column::new(
                "Name",
                vec![
                    CellValue::Str("Bob Smith".to_string()),
                    CellValue::Str("alice".to_string()),
                    CellValue::Null,
                ],
            ),
            Column::new(
                "Amount",
                vec![CellValue::Int(10), CellValue::Int(21), CellValue::Int(1)],
            ),
        ]);
        State::new(vec![("df1".to_string(), df)])
    }

    fn params(column_ids: &[&str], search: &str, replace: &str) -> StepParams {
        StepParams::new()
            .with("sheet_index", 0)
            .with("column_ids", column_ids)
            .with("search_value", search)
            .with("replace_value", replace)
    }

    fn run(prev: &State, params: &StepParams) -> StepResult<State> {
        let reader = InMemorySheetReader::new();
        let importers = ImporterRegistry::new();
        let ctx = StepContext {
            sheet_reader: &reader,
            importers: &importers,
        };
        ReplaceStepPerformer::execute(prev, params, ctx).map(|(state, ())| state)
    }

    #[test]
    fn test_replace_is_case_insensitive_and_renames_headers() {
        let prev = state();
        let post = run(&prev, &params(&["Name"], "BOB", "Rob")).unwrap();

        let df = post.df(0).unwrap();
        assert_eq!(
            df.columns()[0].values,
            vec![
                CellValue::Str("Rob Smith".to_string()),
                CellValue::Str("alice".to_string()),
                CellValue::Str("nan".to_string()),
            ]
        );
        assert_eq!(df.columns()[1].values[0], CellValue::Int(10));

        // Previous state is untouched
        assert_eq!(
            prev.df(0).unwrap().columns()[0].values[0],
            CellValue::Str("Bob Smith".to_string())
        );
    }

    #[test]
    fn test_replace_in_numeric_column_keeps_dtype() {
        let prev = state();
        let post = run(&prev, &params(&["Amount"], "1", "5")).unwrap();

        let column = &post.df(0).unwrap().columns()[1];
        assert_eq!(column.dtype, Dtype::Int);
        assert_eq!(
            column.values,
            vec![CellValue::Int(50), CellValue::Int(25), CellValue::Int(5)]
        );
    }

    #[test]
    fn test_replace_in_bool_column_parses_the_text_back() {
        let df = DataFrame::new(vec![Column::new(
            "active",
            vec![CellValue::Bool(true), CellValue::Bool(false)],
        )]);
        let prev = State::new(vec![("df1".to_string(), df)]);
        let post = run(&prev, &params(&["active"], "true", "False")).unwrap();

        let column = &post.df(0).unwrap().columns()[0];
        assert_eq!(column.dtype, Dtype::Bool);
        assert_eq!(
            column.values,
            vec![CellValue::Bool(false), CellValue::Bool(false)]
        );

        // Text that is neither True nor False cannot go back into a bool column
        assert!(matches!(
            run(&prev, &params(&["active"], "true", "yes")),
            Err(StepError::InvalidReplace { .. })
        ));
    }

    #[test]
    fn test_header_replacement_keeps_column_ids() {
        let prev = state();
        let post = run(&prev, &params(&[], "amount", "Total")).unwrap();

        let headers: Vec<&str> = post.df(0).unwrap().headers().collect();
        assert_eq!(headers, vec!["Name", "Total"]);
        assert_eq!(post.column_index(0, &ColumnId::new("Amount")).unwrap(), 1);
    }

    #[test]
    fn test_invalid_cast_is_invalid_replace() {
        let prev = state();
        let err = run(&prev, &params(&["Amount"], "1", "x")).unwrap_err();
        assert!(matches!(
            err,
            StepError::InvalidReplace { ref search_value, ref replace_value }
                if search_value == "1" && replace_value == "x"
        ));
    }

    #[test]
    fn test_unknown_sheet_or_column_is_invalid_replace() {
        let prev = state();
        let bad_column = run(&prev, &params(&["Missing"], "a", "b"));
        assert!(matches!(bad_column, Err(StepError::InvalidReplace { .. })));

        let bad_sheet = params(&[], "a", "b").with("sheet_index", 4);
        assert!(matches!(
            run(&prev, &bad_sheet),
            Err(StepError::InvalidReplace { .. })
        ));
    }

    #[test]
    fn test_modified_indexes_and_transpile() {
        let params = params(&["Name"], "bob", "Rob");
        assert_eq!(
            ReplaceStepPerformer::get_modified_dataframe_indexes(&params).unwrap(),
            FxHashSet::from_iter([0])
        );

        let prev = Arc::new(state());
        let post = Arc::new(run(&prev, &params).unwrap());
        let chunks = ReplaceStepPerformer::transpile(&prev, &post, &params, &()).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].get_display_name(), "Replace");
    }

    #[test]
    fn test_missing_search_value_fails_fast() {
        let params = StepParams::from_value(json!({"sheet_index": 0, "column_ids": []})).unwrap();
        assert!(matches!(
            run(&state(), &params),
            Err(StepError::MissingParameter { .. })
        ));
    }
}
