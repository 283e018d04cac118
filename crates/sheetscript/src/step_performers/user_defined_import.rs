//! Import through an importer function registered by the host
//!
//! Parameters are converted to typed arguments before the importer runs, so
//! the generated call passes exactly what the importer received.

use std::sync::Arc;

use log::debug;
use rustc_hash::FxHashSet;

use super::{StepContext, StepPerformer, StepType};
use crate::{
    code_chunks::{CodeChunk, UserDefinedImportCodeChunk},
    dataframe_names::get_new_dataframe_names,
    error::StepResult,
    importers::{ImporterParam, convert_importer_params},
    params::StepParams,
    state::State,
    types::{DataframeSource, FxIndexMap},
};

/// Runs an importer registered by the host and appends the dataframes it
/// returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserDefinedImportStepPerformer;

impl StepPerformer for UserDefinedImportStepPerformer {
    type ExecutionData = ();

    fn step_version() -> u32 {
        1
    }

    fn step_type() -> StepType {
        StepType::UserDefinedImport
    }

    fn execute(
        prev_state: &State,
        params: &StepParams,
        ctx: StepContext<'_>,
    ) -> StepResult<(State, ())> {
        let importer: String = params.get_param("importer")?;
        let importer_params: FxIndexMap<String, ImporterParam> =
            params.get_param("importer_params")?;

        let args = convert_importer_params(&importer_params)?;
        let dfs = ctx.importers.call(&importer, &args)?;
        debug!("Importer {importer} returned {} dataframes", dfs.len());

        let new_df_names = get_new_dataframe_names(prev_state.df_names(), dfs.len());
        let mut post_state = prev_state.clone();
        for (df_name, df) in new_df_names.into_iter().zip(dfs) {
            post_state.push_dataframe(df_name, df, DataframeSource::Imported);
        }

        Ok((post_state, ()))
    }

    fn transpile(
        prev_state: &Arc<State>,
        post_state: &Arc<State>,
        params: &StepParams,
        _execution_data: &(),
    ) -> StepResult<Vec<CodeChunk>> {
        let importer_params: FxIndexMap<String, ImporterParam> =
            params.get_param("importer_params")?;

        Ok(vec![CodeChunk::UserDefinedImport(
            UserDefinedImportCodeChunk::new(
                Arc::clone(prev_state),
                Arc::clone(post_state),
                params.get_param("importer")?,
                convert_importer_params(&importer_params)?,
            ),
        )])
    }

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
        dataframe::{CellValue, Column, DataFrame},
        error::StepError,
        importers::{ImporterArg, ImporterRegistry},
        workbook::InMemorySheetReader,
    };

    fn registry() -> ImporterRegistry {
        let mut registry = ImporterRegistry::new();
        registry.register("load_custom", |args| {
            let rows = match args.get("rows") {
                Some(ImporterArg::Int(rows)) => *rows,
                _ => anyhow::bail!("rows is required"),
            };
            let values = (0..rows).map(CellValue::Int).collect();
            Ok(vec![DataFrame::new(vec![Column::new("n", values)])])
        });
        registry
    }

    fn params(rows: &str) -> StepParams {
        StepParams::from_value(json!({
            "importer": "load_custom",
            "importer_params": {
                "path": {"type": "str", "value": "x.csv"},
                "rows": {"type": "int", "value": rows}
            }
        }))
        .unwrap()
    }

    fn execute(prev: &State, params: &StepParams) -> StepResult<State> {
        let reader = InMemorySheetReader::new();
        let importers = registry();
        UserDefinedImportStepPerformer::execute(
            prev,
            params,
            StepContext {
                sheet_reader: &reader,
                importers: &importers,
            },
        )
        .map(|(state, ())| state)
    }

    #[test]
    fn test_import_names_new_dataframes() {
        let prev = State::new(vec![("df1".to_string(), DataFrame::default())]);
        let post = execute(&prev, &params("10")).unwrap();

        assert_eq!(post.df_names(), ["df1", "df2"]);
        assert_eq!(post.df(1).unwrap().num_rows(), 10);
        assert_eq!(post.df_sources()[1], DataframeSource::Imported);
    }

    #[test]
    fn test_transpile_renders_call() {
        let prev = Arc::new(State::default());
        let params = params("10");
        let post = Arc::new(execute(&prev, &params).unwrap());

        let chunks = UserDefinedImportStepPerformer::transpile(&prev, &post, &params, &()).unwrap();
        let (code, imports) = chunks[0].get_code().unwrap();
        assert_eq!(code, vec!["df1 = load_custom(path=\"x.csv\", rows=10)"]);
        assert!(imports.is_empty());
    }

    #[test]
    fn test_bad_number_propagates() {
        assert!(matches!(
            execute(&State::default(), &params("ten")),
            Err(StepError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_unknown_importer() {
        let params = StepParams::from_value(json!({
            "importer": "load_other",
            "importer_params": {}
        }))
        .unwrap();
        assert!(matches!(
            execute(&State::default(), &params),
            Err(StepError::UnknownImporter { .. })
        ));
    }
}
