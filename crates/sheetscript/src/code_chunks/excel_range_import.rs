//! Code chunk importing ranges of one sheet into new dataframes

use std::{path::Path, sync::Arc};

use serde::{Deserialize, Serialize};

use super::{HELPERS_MODULE, PANDAS_IMPORT};
use crate::{
    error::{StepError, StepResult},
    excel_utils::{RangeCondition, get_read_excel_params_from_range, get_table_range_params},
    state::State,
    transpile_utils::{keyword_call_to_code, single_quoted_literal},
};

/// One range to import, either an explicit cell range or one detected from
/// cell values when the code runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExcelRangeImport {
    Range {
        df_name: String,
        value: String,
    },
    Conditional {
        df_name: String,
        start_condition: RangeCondition,
        end_condition: RangeCondition,
        column_end_condition: RangeCondition,
    },
}

impl ExcelRangeImport {
    /// Name the user asked for; the step resolves it to a unique name
    pub fn df_name(&self) -> &str {
        match self {
            Self::Range { df_name, .. } | Self::Conditional { df_name, .. } => df_name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExcelRangeImportCodeChunk {
    pub prev_state: Arc<State>,
    pub post_state: Arc<State>,
    pub file_path: String,
    pub sheet_name: String,
    pub range_imports: Vec<ExcelRangeImport>,
    pub new_df_names: Vec<String>,
    pub convert_csv_to_xlsx: bool,
}

impl ExcelRangeImportCodeChunk {
    pub fn new(
        prev_state: Arc<State>,
        post_state: Arc<State>,
        file_path: String,
        sheet_name: String,
        range_imports: Vec<ExcelRangeImport>,
        new_df_names: Vec<String>,
        convert_csv_to_xlsx: bool,
    ) -> Self {
        Self {
            prev_state,
            post_state,
            file_path,
            sheet_name,
            range_imports,
            new_df_names,
            convert_csv_to_xlsx,
        }
    }

    pub fn get_description_comment(&self) -> String {
        format!(
            "Imported {} dataframes from {} in {}",
            self.range_imports.len(),
            self.sheet_name,
            self.file_path
        )
    }

    /// Path the generated code reads from: the converted workbook for csv input
    fn read_path(&self) -> String {
        if self.convert_csv_to_xlsx {
            Path::new(&self.file_path)
                .with_extension("xlsx")
                .to_string_lossy()
                .into_owned()
        } else {
            self.file_path.clone()
        }
    }

    pub fn get_code(&self) -> StepResult<(Vec<String>, Vec<String>)> {
        let read_path = self.read_path();
        let path_code = single_quoted_literal(&read_path);
        let sheet_code = single_quoted_literal(&self.sheet_name);

        let mut code = Vec::new();
        let mut imports = vec![PANDAS_IMPORT.to_string()];

        if self.convert_csv_to_xlsx {
            imports.push(format!(
                "from {HELPERS_MODULE} import convert_csv_file_to_xlsx_file"
            ));
            code.push(format!(
                "convert_csv_file_to_xlsx_file({}, {path_code})",
                single_quoted_literal(&self.file_path)
            ));
        }

        for (idx, range_import) in self.range_imports.iter().enumerate() {
            let df_name = self
                .new_df_names
                .get(idx)
                .ok_or(StepError::ExecutionDataMismatch {
                    step_type: "excel_range_import",
                })?;

            match range_import {
                ExcelRangeImport::Range { value, .. } => {
                    let (skiprows, nrows, usecols) = get_read_excel_params_from_range(value)?;
                    code.push(format!(
                        "{df_name} = pd.read_excel({path_code}, sheet_name={sheet_code}, skiprows={skiprows}, nrows={nrows}, usecols={})",
                        single_quoted_literal(&usecols)
                    ));
                }
                ExcelRangeImport::Conditional {
                    start_condition,
                    end_condition,
                    column_end_condition,
                    ..
                } => {
                    let params = get_table_range_params(
                        &read_path,
                        &self.sheet_name,
                        start_condition,
                        end_condition,
                        column_end_condition,
                    )?;
                    imports.push(format!(
                        "from {HELPERS_MODULE} import get_table_range, get_read_excel_params_from_range"
                    ));
                    code.push(format!(
                        "_range = {}",
                        keyword_call_to_code("get_table_range", &params)
                    ));
                    code.push(
                        "skiprows, nrows, usecols = get_read_excel_params_from_range(_range)"
                            .to_string(),
                    );
                    code.push(format!(
                        "{df_name} = pd.read_excel({path_code}, sheet_name={sheet_code}, skiprows=skiprows, nrows=nrows, usecols=usecols)"
                    ));
                }
            }

            // Blank line between imports for readability
            if idx + 1 < self.range_imports.len() {
                code.push(String::new());
            }
        }

        imports.dedup();
        Ok((code, imports))
    }

    pub fn get_created_sheet_indexes(&self) -> Vec<usize> {
        let num_dfs = self.post_state.len();
        (num_dfs.saturating_sub(self.range_imports.len())..num_dfs).collect()
    }

    /// Fuse with the next range import if it reads the same sheet of the same file
    pub fn combine_right(&self, other: &Self) -> Option<Self> {
        if self.file_path != other.file_path
            || self.sheet_name != other.sheet_name
            || self.convert_csv_to_xlsx != other.convert_csv_to_xlsx
        {
            return None;
        }

        let mut range_imports = self.range_imports.clone();
        range_imports.extend(other.range_imports.iter().cloned());
        let mut new_df_names = self.new_df_names.clone();
        new_df_names.extend(other.new_df_names.iter().cloned());

        Some(Self::new(
            Arc::clone(&self.prev_state),
            Arc::clone(&other.post_state),
            self.file_path.clone(),
            self.sheet_name.clone(),
            range_imports,
            new_df_names,
            self.convert_csv_to_xlsx,
        ))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::excel_utils::{
        COLUMN_END_CONDITION_FIRST_EMPTY_CELL, END_CONDITION_FIRST_EMPTY_VALUE,
        START_CONDITION_UPPER_LEFT_VALUE,
    };

    fn explicit(df_name: &str, value: &str) -> ExcelRangeImport {
        ExcelRangeImport::Range {
            df_name: df_name.to_string(),
            value: value.to_string(),
        }
    }

    fn chunk(
        file_path: &str,
        sheet_name: &str,
        range_imports: Vec<ExcelRangeImport>,
    ) -> ExcelRangeImportCodeChunk {
        let names = range_imports
            .iter()
            .map(|range_import| range_import.df_name().to_string())
            .collect();
        ExcelRangeImportCodeChunk::new(
            Arc::new(State::default()),
            Arc::new(State::default()),
            file_path.to_string(),
            sheet_name.to_string(),
            range_imports,
            names,
            false,
        )
    }

    #[test]
    fn test_explicit_range_code() {
        let chunk = chunk("data.xlsx", "Sheet1", vec![explicit("df1", "A1:C10")]);
        let (code, imports) = chunk.get_code().unwrap();

        assert_eq!(
            code,
            vec![
                "df1 = pd.read_excel('data.xlsx', sheet_name='Sheet1', skiprows=0, nrows=9, usecols='A:C')"
            ]
        );
        assert_eq!(imports, vec!["import pandas as pd"]);
    }

    #[test]
    fn test_conditional_range_code_and_separator() {
        let conditional = ExcelRangeImport::Conditional {
            df_name: "totals".to_string(),
            start_condition: RangeCondition::new(
                START_CONDITION_UPPER_LEFT_VALUE,
                Some(json!("Region")),
            ),
            end_condition: RangeCondition::new(END_CONDITION_FIRST_EMPTY_VALUE, None),
            column_end_condition: RangeCondition::new(COLUMN_END_CONDITION_FIRST_EMPTY_CELL, None),
        };
        let chunk = chunk(
            "data.xlsx",
            "Sheet1",
            vec![explicit("df1", "B2:C4"), conditional],
        );
        let (code, imports) = chunk.get_code().unwrap();

        assert_eq!(
            code,
            vec![
                "df1 = pd.read_excel('data.xlsx', sheet_name='Sheet1', skiprows=1, nrows=2, usecols='B:C')",
                "",
                "_range = get_table_range(file_path=\"data.xlsx\", sheet_name=\"Sheet1\", upper_left_value=\"Region\")",
                "skiprows, nrows, usecols = get_read_excel_params_from_range(_range)",
                "totals = pd.read_excel('data.xlsx', sheet_name='Sheet1', skiprows=skiprows, nrows=nrows, usecols=usecols)",
            ]
        );
        assert_eq!(
            imports,
            vec![
                "import pandas as pd",
                "from sheetscript.helpers import get_table_range, get_read_excel_params_from_range",
            ]
        );
    }

    #[test]
    fn test_invalid_condition_fails_before_code() {
        let conditional = ExcelRangeImport::Conditional {
            df_name: "df1".to_string(),
            start_condition: RangeCondition::new("somewhere", Some(json!("x"))),
            end_condition: RangeCondition::new(END_CONDITION_FIRST_EMPTY_VALUE, None),
            column_end_condition: RangeCondition::new(COLUMN_END_CONDITION_FIRST_EMPTY_CELL, None),
        };
        let chunk = chunk("data.xlsx", "Sheet1", vec![conditional]);
        assert!(matches!(
            chunk.get_code(),
            Err(StepError::InvalidCondition {
                category: "start condition",
                ..
            })
        ));
    }

    #[test]
    fn test_awkward_names_render_as_valid_python() {
        let chunk = chunk("Bob's\\data.xlsx", "Q1\0\"final\"", vec![explicit("df1", "A1:B3")]);
        let (code, _) = chunk.get_code().unwrap();

        assert!(!code[0].chars().any(char::is_control), "raw control character in {}", code[0]);
        assert!(
            ruff_python_parser::parse_module(&code[0]).is_ok(),
            "generated code does not parse: {}",
            code[0]
        );
    }

    #[test]
    fn test_csv_conversion_reads_from_xlsx() {
        let mut chunk = chunk("data.csv", "data", vec![explicit("df1", "A1:B3")]);
        chunk.convert_csv_to_xlsx = true;
        let (code, imports) = chunk.get_code().unwrap();

        assert_eq!(
            code,
            vec![
                "convert_csv_file_to_xlsx_file('data.csv', 'data.xlsx')",
                "df1 = pd.read_excel('data.xlsx', sheet_name='data', skiprows=0, nrows=2, usecols='A:B')",
            ]
        );
        assert_eq!(imports.len(), 2);
    }

    #[test]
    fn test_combine_same_sheet_concatenates() {
        let left = chunk("data.xlsx", "Sheet1", vec![explicit("a", "A1:B2")]);
        let right = chunk(
            "data.xlsx",
            "Sheet1",
            vec![explicit("b", "C1:D2"), explicit("c", "E1:F2")],
        );

        let combined = left.combine_right(&right).unwrap();
        assert_eq!(combined.range_imports.len(), 3);
        assert_eq!(combined.new_df_names, vec!["a", "b", "c"]);
        assert!(Arc::ptr_eq(&combined.prev_state, &left.prev_state));
        assert!(Arc::ptr_eq(&combined.post_state, &right.post_state));
    }

    #[test]
    fn test_combine_different_resource_is_noop() {
        let left = chunk("data.xlsx", "Sheet1", vec![explicit("a", "A1:B2")]);
        let other_sheet = chunk("data.xlsx", "Sheet2", vec![explicit("b", "A1:B2")]);
        let other_file = chunk("other.xlsx", "Sheet1", vec![explicit("c", "A1:B2")]);

        assert!(left.combine_right(&other_sheet).is_none());
        assert!(left.combine_right(&other_file).is_none());
    }
}
