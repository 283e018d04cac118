//! Code chunk calling a registered importer function

use std::sync::Arc;

use crate::{
    error::StepResult,
    importers::{ImporterArgs, get_transpiled_importer_params},
    state::State,
};

/// Call of a user-defined importer that appends its dataframes
#[derive(Debug, Clone)]
pub struct UserDefinedImportCodeChunk {
    pub prev_state: Arc<State>,
    pub post_state: Arc<State>,
    pub importer: String,
    pub importer_args: ImporterArgs,
}

impl UserDefinedImportCodeChunk {
    pub fn new(
        prev_state: Arc<State>,
        post_state: Arc<State>,
        importer: String,
        importer_args: ImporterArgs,
    ) -> Self {
        Self {
            prev_state,
            post_state,
            importer,
            importer_args,
        }
    }

    /// Names of the dataframes the importer call created
    fn new_df_names(&self) -> &[String] {
        let df_names = self.post_state.df_names();
        df_names.get(self.prev_state.len()..).unwrap_or_default()
    }

    pub fn get_description_comment(&self) -> String {
        let new_df_names = self.new_df_names();
        if new_df_names.is_empty() {
            return format!("Imported no dataframes using {}", self.importer);
        }
        format!("Imported {} using {}", new_df_names.join(", "), self.importer)
    }

    pub fn get_code(&self) -> StepResult<(Vec<String>, Vec<String>)> {
        let call = format!(
            "{}({})",
            self.importer,
            get_transpiled_importer_params(&self.importer_args)
        );
        let new_df_names = self.new_df_names();
        // Nothing to bind when the importer returned no dataframes
        let code = if new_df_names.is_empty() {
            call
        } else {
            format!("{} = {call}", new_df_names.join(", "))
        };
        Ok((vec![code], Vec::new()))
    }

    pub fn get_created_sheet_indexes(&self) -> Vec<usize> {
        (self.prev_state.len()..self.post_state.len()).collect()
    }
}
