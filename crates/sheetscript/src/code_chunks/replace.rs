//! Code chunk replacing a value in the cells and headers of a dataframe

use std::sync::Arc;

use crate::{
    dataframe::Dtype,
    error::{StepError, StepResult},
    state::{ColumnIdMap, State},
    transpile_utils::{escape_regex_replacement, single_quoted_literal, string_list_literal},
    types::ColumnId,
};

/// Case-insensitive replacement within the cells and headers of a dataframe
#[derive(Debug, Clone)]
pub struct ReplaceCodeChunk {
    pub prev_state: Arc<State>,
    pub post_state: Arc<State>,
    pub sheet_index: usize,
    /// Columns to replace in; empty selects the whole dataframe
    pub column_ids: Vec<ColumnId>,
    pub search_value: String,
    pub replace_value: String,
}

impl ReplaceCodeChunk {
    pub fn new(
        prev_state: Arc<State>,
        post_state: Arc<State>,
        sheet_index: usize,
        column_ids: Vec<ColumnId>,
        search_value: String,
        replace_value: String,
    ) -> Self {
        Self {
            prev_state,
            post_state,
            sheet_index,
            column_ids,
            search_value,
            replace_value,
        }
    }

    pub fn get_description_comment(&self) -> String {
        let df_name = self.prev_state.df_name(self.sheet_index).unwrap_or("dataframe");
        format!(
            "Replaced {} with {} in {df_name}",
            self.search_value, self.replace_value
        )
    }

    /// Headers and dtypes of the selected columns in the previous state
    fn selected_columns(&self) -> StepResult<Vec<(&str, Dtype)>> {
        let column_ids = self.prev_state.column_ids(self.sheet_index)?;
        let df = self.prev_state.df(self.sheet_index)?;
        let indexes: Vec<usize> = if self.column_ids.is_empty() {
            (0..column_ids.len()).collect()
        } else {
            self.column_ids
                .iter()
                .map(|column_id| self.prev_state.column_index(self.sheet_index, column_id))
                .collect::<StepResult<_>>()?
        };
        indexes
            .into_iter()
            .map(|index| {
                let dtype = df
                    .column(index)
                    .map(|column| column.dtype)
                    .ok_or_else(|| StepError::invalid("column_ids", format!("no column at {index}")))?;
                Ok((column_ids[index].as_str(), dtype))
            })
            .collect()
    }

    pub fn get_code(&self) -> StepResult<(Vec<String>, Vec<String>)> {
        let df_name = self.prev_state.df_name(self.sheet_index)?;
        let columns = self.selected_columns()?;
        let headers: Vec<&str> = columns.iter().map(|(header, _)| *header).collect();

        let selection = if self.column_ids.is_empty() {
            df_name.to_string()
        } else {
            format!("{df_name}[{}]", string_list_literal(headers.iter().copied()))
        };
        let pattern = format!("(?i){}", regex::escape(&self.search_value));
        let replaced = format!(
            "{selection}.astype(str).replace({}, {}, regex=True)",
            single_quoted_literal(&pattern),
            single_quoted_literal(&escape_regex_replacement(&self.replace_value)),
        );

        // `astype(bool)` treats every non-empty string as True, so bool
        // columns are mapped back from their text explicitly
        let bool_headers: Vec<&str> = columns
            .iter()
            .filter(|(_, dtype)| *dtype == Dtype::Bool)
            .map(|(header, _)| *header)
            .collect();
        let mut code = if bool_headers.is_empty() {
            vec![format!(
                "{selection} = {replaced}.astype({selection}.dtypes.to_dict())"
            )]
        } else {
            let other_headers: Vec<&str> = headers
                .iter()
                .copied()
                .filter(|header| !bool_headers.contains(header))
                .collect();
            let restore = if other_headers.is_empty() {
                String::new()
            } else {
                format!(
                    ".astype({df_name}[{}].dtypes.to_dict())",
                    string_list_literal(other_headers)
                )
            };
            let mut code = vec![format!("{selection} = {replaced}{restore}")];
            code.extend(bool_headers.iter().map(|header| {
                let column = format!("{df_name}[{}]", single_quoted_literal(header));
                format!("{column} = {column}.map({{'True': True, 'False': False}})")
            }));
            code
        };

        let post_column_ids = self.post_state.column_ids(self.sheet_index)?;
        let renames: Vec<String> = headers
            .iter()
            .zip(self.selected_post_headers(post_column_ids, &headers)?)
            .filter(|(old, new)| old != &new)
            .map(|(old, new)| {
                format!(
                    "{}: {}",
                    single_quoted_literal(old),
                    single_quoted_literal(new)
                )
            })
            .collect();
        if !renames.is_empty() {
            code.push(format!(
                "{df_name}.rename(columns={{{}}}, inplace=True)",
                renames.join(", ")
            ));
        }

        Ok((code, Vec::new()))
    }

    fn selected_post_headers<'a>(
        &self,
        post_column_ids: &'a ColumnIdMap,
        prev_headers: &[&str],
    ) -> StepResult<Vec<&'a str>> {
        if self.column_ids.is_empty() {
            return Ok(post_column_ids
                .values()
                .take(prev_headers.len())
                .map(String::as_str)
                .collect());
        }
        self.column_ids
            .iter()
            .map(|column_id| {
                let index = self.post_state.column_index(self.sheet_index, column_id)?;
                Ok(post_column_ids[index].as_str())
            })
            .collect()
    }
}
