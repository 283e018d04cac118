//! The ordered list of applied steps and every state they produced
//!
//! `StepHistory` is the only owner of states. Each accepted step keeps the
//! `Arc` of the state before and after it, its execution data and the code
//! chunks it transpiled to. A step that fails to execute or transpile is not
//! recorded, so the current state never reflects a partial step.

use std::sync::Arc;

use log::{debug, warn};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::{
    code_chunks::CodeChunk,
    combine::optimize_code_chunks,
    config::Config,
    error::{StepError, StepResult},
    importers::ImporterRegistry,
    params::StepParams,
    state::State,
    step_performers::{ExecutionData, StepContext, StepType},
    transpiler::{Program, Transpiler},
    workbook::{FileSheetReader, SheetReader},
};

/// A step as written to a saved analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedStep {
    pub step_type: String,
    pub step_version: u32,
    pub params: StepParams,
}

/// A step that was applied to the history
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub step_type: StepType,
    pub params: StepParams,
    pub prev_state: Arc<State>,
    pub post_state: Arc<State>,
    pub execution_data: ExecutionData,
    pub code_chunks: Vec<CodeChunk>,
}

#[derive(Debug)]
pub struct StepHistory {
    initial_state: Arc<State>,
    steps: Vec<StepRecord>,
    sheet_reader: Box<dyn SheetReader>,
    importers: ImporterRegistry,
}

impl Default for StepHistory {
    fn default() -> Self {
        Self::new(State::default())
    }
}

impl StepHistory {
    pub fn new(initial_state: State) -> Self {
        Self {
            initial_state: Arc::new(initial_state),
            steps: Vec::new(),
            sheet_reader: Box::new(FileSheetReader),
            importers: ImporterRegistry::new(),
        }
    }

    #[must_use]
    pub fn with_sheet_reader(mut self, sheet_reader: impl SheetReader + 'static) -> Self {
        self.sheet_reader = Box::new(sheet_reader);
        self
    }

    #[must_use]
    pub fn with_importers(mut self, importers: ImporterRegistry) -> Self {
        self.importers = importers;
        self
    }

    pub fn importers_mut(&mut self) -> &mut ImporterRegistry {
        &mut self.importers
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn curr_state(&self) -> &Arc<State> {
        self.steps
            .last()
            .map_or(&self.initial_state, |step| &step.post_state)
    }

    /// Execute a step on the current state and record it.
    ///
    /// Errors are wrapped with the step type and its parameters.
    pub fn add_step(&mut self, step_type: StepType, params: StepParams) -> StepResult<&StepRecord> {
        let prev_state = Arc::clone(self.curr_state());
        let ctx = StepContext {
            sheet_reader: self.sheet_reader.as_ref(),
            importers: &self.importers,
        };

        let (post_state, execution_data) = step_type
            .execute(&prev_state, &params, ctx)
            .map_err(|err| err.in_step(step_type.as_str(), params.to_string()))?;
        let post_state = Arc::new(post_state);
        let code_chunks = step_type
            .transpile(&prev_state, &post_state, &params, &execution_data)
            .map_err(|err| err.in_step(step_type.as_str(), params.to_string()))?;

        debug!(
            "Applied {step_type} step {}, {} dataframes now",
            self.steps.len(),
            post_state.len()
        );
        self.steps.push(StepRecord {
            step_type,
            params,
            prev_state,
            post_state,
            execution_data,
            code_chunks,
        });
        Ok(&self.steps[self.steps.len() - 1])
    }

    /// Remove the last step, returning it
    pub fn undo(&mut self) -> Option<StepRecord> {
        let step = self.steps.pop();
        if let Some(step) = &step {
            debug!("Undid {} step", step.step_type);
        }
        step
    }

    /// Dataframes changed by the step at `step_index`; empty means all
    pub fn get_modified_dataframe_indexes(&self, step_index: usize) -> StepResult<FxHashSet<usize>> {
        let step = self.steps.get(step_index).ok_or_else(|| {
            StepError::invalid("step_index", format!("there is no step {step_index}"))
        })?;
        step.step_type.get_modified_dataframe_indexes(&step.params)
    }

    /// Code chunks of every step in order, optionally combined
    pub fn code_chunks(&self, optimize: bool) -> Vec<CodeChunk> {
        let code_chunks: Vec<CodeChunk> = self
            .steps
            .iter()
            .flat_map(|step| step.code_chunks.iter().cloned())
            .collect();
        if optimize {
            optimize_code_chunks(code_chunks)
        } else {
            code_chunks
        }
    }

    pub fn transpile(&self, config: &Config) -> StepResult<Program> {
        Transpiler::new(config.description_comments).transpile(&self.code_chunks(config.optimize))
    }

    pub fn saved_steps(&self) -> Vec<SavedStep> {
        self.steps
            .iter()
            .map(|step| SavedStep {
                step_type: step.step_type.as_str().to_string(),
                step_version: step.step_type.step_version(),
                params: step.params.clone(),
            })
            .collect()
    }

    /// Apply saved steps in order, stopping at the first failure
    pub fn replay(&mut self, saved_steps: &[SavedStep]) -> StepResult<()> {
        for saved in saved_steps {
            let step_type: StepType = saved.step_type.parse()?;
            let expected = step_type.step_version();
            if saved.step_version != expected {
                warn!(
                    "Refusing to replay {} step saved with version {}",
                    saved.step_type, saved.step_version
                );
                return Err(StepError::UnsupportedStepVersion {
                    step_type: saved.step_type.clone(),
                    found: saved.step_version,
                    expected,
                });
            }
            self.add_step(step_type, saved.params.clone())?;
        }
        Ok(())
    }
}
