//! Code chunks: the code-generation effect of step transitions
//!
//! Each step transpiles into one or more chunks. A chunk spans a
//! `prev_state → post_state` transition and knows how to render the pandas
//! code for it. Adjacent chunks of the same kind working on the same
//! resource can be fused with [`CodeChunk::combine_right`], see
//! [`crate::combine`].

use std::sync::Arc;

use crate::{error::StepResult, state::State};

pub mod excel_range_import;
pub mod replace;
pub mod user_defined_import;

pub use excel_range_import::{ExcelRangeImport, ExcelRangeImportCodeChunk};
pub use replace::ReplaceCodeChunk;
pub use user_defined_import::UserDefinedImportCodeChunk;

/// Module the generated code imports its runtime helpers from
pub const HELPERS_MODULE: &str = "sheetscript.helpers";

/// Import line every pandas-reading chunk needs
pub const PANDAS_IMPORT: &str = "import pandas as pd";

#[derive(Debug, Clone)]
pub enum CodeChunk {
    ExcelRangeImport(ExcelRangeImportCodeChunk),
    UserDefinedImport(UserDefinedImportCodeChunk),
    Replace(ReplaceCodeChunk),
}

impl CodeChunk {
    pub fn prev_state(&self) -> &Arc<State> {
        match self {
            Self::ExcelRangeImport(chunk) => &chunk.prev_state,
            Self::UserDefinedImport(chunk) => &chunk.prev_state,
            Self::Replace(chunk) => &chunk.prev_state,
        }
    }

    pub fn post_state(&self) -> &Arc<State> {
        match self {
            Self::ExcelRangeImport(chunk) => &chunk.post_state,
            Self::UserDefinedImport(chunk) => &chunk.post_state,
            Self::Replace(chunk) => &chunk.post_state,
        }
    }

    /// Short label for the chunk
    pub fn get_display_name(&self) -> &'static str {
        match self {
            Self::ExcelRangeImport(_) => "Excel Range Import",
            Self::UserDefinedImport(_) => "User Defined Import",
            Self::Replace(_) => "Replace",
        }
    }

    /// One-line summary emitted as a comment above the code
    pub fn get_description_comment(&self) -> String {
        match self {
            Self::ExcelRangeImport(chunk) => chunk.get_description_comment(),
            Self::UserDefinedImport(chunk) => chunk.get_description_comment(),
            Self::Replace(chunk) => chunk.get_description_comment(),
        }
    }

    /// Generated code lines and the import lines they need
    pub fn get_code(&self) -> StepResult<(Vec<String>, Vec<String>)> {
        match self {
            Self::ExcelRangeImport(chunk) => chunk.get_code(),
            Self::UserDefinedImport(chunk) => chunk.get_code(),
            Self::Replace(chunk) => chunk.get_code(),
        }
    }

    /// Indexes of the sheets this chunk creates, `None` when it creates none
    pub fn get_created_sheet_indexes(&self) -> Option<Vec<usize>> {
        let created = match self {
            Self::ExcelRangeImport(chunk) => chunk.get_created_sheet_indexes(),
            Self::UserDefinedImport(chunk) => chunk.get_created_sheet_indexes(),
            Self::Replace(_) => return None,
        };
        (!created.is_empty()).then_some(created)
    }

    /// Fuse this chunk with the chunk that directly follows it.
    ///
    /// Returns `None` when the two cannot be fused; chunks of different
    /// kinds never fuse.
    pub fn combine_right(&self, other: &Self) -> Option<Self> {
        match (self, other) {
            (Self::ExcelRangeImport(left), Self::ExcelRangeImport(right)) => {
                left.combine_right(right).map(Self::ExcelRangeImport)
            }
            _ => None,
        }
    }
}
