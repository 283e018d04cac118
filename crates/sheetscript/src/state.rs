//! Snapshot of the table collection at one point of the edit history
//!
//! A `State` is never changed once a step has produced it. Dataframes are
//! shared between snapshots through `Arc`, and a step that changes a
//! dataframe swaps in a new `Arc` on its own copy of the state, so chunks
//! holding earlier snapshots keep observing exactly what they captured.

use std::sync::Arc;

use crate::{
    dataframe::DataFrame,
    error::{StepError, StepResult},
    types::{ColumnHeader, ColumnId, DataframeSource, FxIndexMap},
};

/// Mapping from column id to the current header of that column
pub type ColumnIdMap = FxIndexMap<ColumnId, ColumnHeader>;

#[derive(Debug, Clone, Default)]
pub struct State {
    dfs: Vec<Arc<DataFrame>>,
    df_names: Vec<String>,
    df_sources: Vec<DataframeSource>,
    column_ids: Vec<ColumnIdMap>,
}

impl State {
    /// Create the initial state of a session from the dataframes passed in
    pub fn new(dfs: Vec<(String, DataFrame)>) -> Self {
        let mut state = Self::default();
        for (name, df) in dfs {
            state.push_dataframe(name, df, DataframeSource::Passed);
        }
        state
    }

    pub fn dfs(&self) -> &[Arc<DataFrame>] {
        &self.dfs
    }

    pub fn df_names(&self) -> &[String] {
        &self.df_names
    }

    pub fn df_sources(&self) -> &[DataframeSource] {
        &self.df_sources
    }

    pub fn len(&self) -> usize {
        self.dfs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dfs.is_empty()
    }

    pub fn is_valid_sheet_index(&self, sheet_index: usize) -> bool {
        sheet_index < self.dfs.len()
    }

    pub fn df(&self, sheet_index: usize) -> StepResult<&Arc<DataFrame>> {
        self.dfs
            .get(sheet_index)
            .ok_or(StepError::InvalidSheetIndex { sheet_index })
    }

    pub fn df_name(&self, sheet_index: usize) -> StepResult<&str> {
        self.df_names
            .get(sheet_index)
            .map(String::as_str)
            .ok_or(StepError::InvalidSheetIndex { sheet_index })
    }

    pub fn column_ids(&self, sheet_index: usize) -> StepResult<&ColumnIdMap> {
        self.column_ids
            .get(sheet_index)
            .ok_or(StepError::InvalidSheetIndex { sheet_index })
    }

    /// Position of a column within its dataframe
    pub fn column_index(&self, sheet_index: usize, column_id: &ColumnId) -> StepResult<usize> {
        self.column_ids(sheet_index)?
            .get_index_of(column_id)
            .ok_or_else(|| StepError::UnknownColumnId {
                sheet_index,
                column_id: column_id.to_string(),
            })
    }

    /// Append a dataframe, assigning column ids from its current headers
    pub fn push_dataframe(&mut self, name: String, df: DataFrame, source: DataframeSource) {
        let column_ids = df
            .headers()
            .map(|header| (ColumnId::new(header), header.to_string()))
            .collect();

        self.dfs.push(Arc::new(df));
        self.df_names.push(name);
        self.df_sources.push(source);
        self.column_ids.push(column_ids);
    }

    /// Swap in a new version of the dataframe at `sheet_index`.
    ///
    /// The headers of `df` must be positionally aligned with the existing
    /// column ids; the id map is updated to the new headers.
    pub fn replace_dataframe(&mut self, sheet_index: usize, df: DataFrame) -> StepResult<()> {
        let column_ids = self
            .column_ids
            .get_mut(sheet_index)
            .ok_or(StepError::InvalidSheetIndex { sheet_index })?;
        for ((_, header), new_header) in column_ids.iter_mut().zip(df.headers()) {
            if header != new_header {
                *header = new_header.to_string();
            }
        }

        let slot = self
            .dfs
            .get_mut(sheet_index)
            .ok_or(StepError::InvalidSheetIndex { sheet_index })?;
        *slot = Arc::new(df);
        Ok(())
    }
}
