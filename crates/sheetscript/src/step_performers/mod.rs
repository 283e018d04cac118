//! Step performers: how each kind of step changes the state and what code
//! it transpiles to
//!
//! A step is applied in two phases. `execute` builds the next [`State`] from
//! the previous one and returns any data computed along the way (such as the
//! resolved names of new dataframes). `transpile` then turns the same
//! transition into [`CodeChunk`]s, reusing that execution data so the code
//! and the state agree.

use std::{fmt, str::FromStr, sync::Arc};

use rustc_hash::FxHashSet;

use crate::{
    code_chunks::CodeChunk,
    error::{StepError, StepResult},
    importers::ImporterRegistry,
    params::StepParams,
    state::State,
    workbook::SheetReader,
};

pub mod excel_range_import;
pub mod replace;
pub mod user_defined_import;

pub use excel_range_import::{ExcelRangeImportExecutionData, ExcelRangeImportStepPerformer};
pub use replace::ReplaceStepPerformer;
pub use user_defined_import::UserDefinedImportStepPerformer;

/// Collaborators a step may use while executing
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    /// Source of sheet data for import steps
    pub sheet_reader: &'a dyn SheetReader,
    /// Importers callable by `user_defined_import` steps
    pub importers: &'a ImporterRegistry,
}

/// Contract every step type implements
pub trait StepPerformer {
    /// Data computed by `execute` that `transpile` needs
    type ExecutionData;

    /// Version of the parameter format this performer understands
    fn step_version() -> u32;

    fn step_type() -> StepType;

    /// Build the state after the step. `prev_state` is left untouched.
    fn execute(
        prev_state: &State,
        params: &StepParams,
        ctx: StepContext<'_>,
    ) -> StepResult<(State, Self::ExecutionData)>;

    /// Code chunks reproducing the `prev_state -> post_state` transition
    fn transpile(
        prev_state: &Arc<State>,
        post_state: &Arc<State>,
        params: &StepParams,
        execution_data: &Self::ExecutionData,
    ) -> StepResult<Vec<CodeChunk>>;

    /// Indexes of the dataframes the step modifies. An empty set means every
    /// dataframe must be treated as modified.
    fn get_modified_dataframe_indexes(params: &StepParams) -> StepResult<FxHashSet<usize>>;
}

/// Every kind of step the history can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepType {
    Replace,
    ExcelRangeImport,
    UserDefinedImport,
}

/// Execution data of any step
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionData {
    Replace,
    ExcelRangeImport(ExcelRangeImportExecutionData),
    UserDefinedImport,
}

impl StepType {
    pub const ALL: [StepType; 3] = [
        StepType::Replace,
        StepType::ExcelRangeImport,
        StepType::UserDefinedImport,
    ];

    /// Stable tag used in saved analyses
    pub fn as_str(self) -> &'static str {
        match self {
            StepType::Replace => "replace",
            StepType::ExcelRangeImport => "excel_range_import",
            StepType::UserDefinedImport => "user_defined_import",
        }
    }

    pub fn step_version(self) -> u32 {
        match self {
            StepType::Replace => ReplaceStepPerformer::step_version(),
            StepType::ExcelRangeImport => ExcelRangeImportStepPerformer::step_version(),
            StepType::UserDefinedImport => UserDefinedImportStepPerformer::step_version(),
        }
    }

    pub fn execute(
        self,
        prev_state: &State,
        params: &StepParams,
        ctx: StepContext<'_>,
    ) -> StepResult<(State, ExecutionData)> {
        match self {
            StepType::Replace => ReplaceStepPerformer::execute(prev_state, params, ctx)
                .map(|(state, ())| (state, ExecutionData::Replace)),
            StepType::ExcelRangeImport => {
                ExcelRangeImportStepPerformer::execute(prev_state, params, ctx)
                    .map(|(state, data)| (state, ExecutionData::ExcelRangeImport(data)))
            }
            StepType::UserDefinedImport => {
                UserDefinedImportStepPerformer::execute(prev_state, params, ctx)
                    .map(|(state, ())| (state, ExecutionData::UserDefinedImport))
            }
        }
    }

    pub fn transpile(
        self,
        prev_state: &Arc<State>,
        post_state: &Arc<State>,
        params: &StepParams,
        execution_data: &ExecutionData,
    ) -> StepResult<Vec<CodeChunk>> {
        match (self, execution_data) {
            (StepType::Replace, ExecutionData::Replace) => {
                ReplaceStepPerformer::transpile(prev_state, post_state, params, &())
            }
            (StepType::ExcelRangeImport, ExecutionData::ExcelRangeImport(data)) => {
                ExcelRangeImportStepPerformer::transpile(prev_state, post_state, params, data)
            }
            (StepType::UserDefinedImport, ExecutionData::UserDefinedImport) => {
                UserDefinedImportStepPerformer::transpile(prev_state, post_state, params, &())
            }
            _ => Err(StepError::ExecutionDataMismatch {
                step_type: self.as_str(),
            }),
        }
    }

    pub fn get_modified_dataframe_indexes(self, params: &StepParams) -> StepResult<FxHashSet<usize>> {
        match self {
            StepType::Replace => ReplaceStepPerformer::get_modified_dataframe_indexes(params),
            StepType::ExcelRangeImport => {
                ExcelRangeImportStepPerformer::get_modified_dataframe_indexes(params)
            }
            StepType::UserDefinedImport => {
                UserDefinedImportStepPerformer::get_modified_dataframe_indexes(params)
            }
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepType {
    type Err = StepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepType::ALL
            .into_iter()
            .find(|step_type| step_type.as_str() == s)
            .ok_or_else(|| StepError::UnknownStepType {
                step_type: s.to_string(),
            })
    }
}
