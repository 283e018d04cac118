//! Domain errors raised while executing and transpiling steps
//!
//! Every variant renders a message that can be shown to the user as is.
//! `StepError::to_fix` adds a short hint on how to recover where one exists.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for step execution and code generation
pub type StepResult<T> = Result<T, StepError>;

#[derive(Debug, Error)]
pub enum StepError {
    #[error("missing required parameter '{name}'")]
    MissingParameter { name: String },

    #[error("invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("invalid {category} type: {value}")]
    InvalidCondition {
        category: &'static str,
        value: String,
    },

    #[error("'{range}' is not a valid range")]
    InvalidRange { range: String },

    #[error("no range matching the given conditions was found in sheet '{sheet_name}' of {file_path}")]
    RangeNotFound {
        file_path: String,
        sheet_name: String,
    },

    #[error("there is no sheet at index {sheet_index}")]
    InvalidSheetIndex { sheet_index: usize },

    #[error("there is no column with id '{column_id}' in sheet {sheet_index}")]
    UnknownColumnId {
        sheet_index: usize,
        column_id: String,
    },

    #[error("could not replace '{search_value}' with '{replace_value}'")]
    InvalidReplace {
        search_value: String,
        replace_value: String,
    },

    #[error("could not parse '{value}' as {expected}")]
    InvalidNumber {
        value: String,
        expected: &'static str,
    },

    #[error("no importer named '{importer}' is registered")]
    UnknownImporter { importer: String },

    #[error("importer '{importer}' failed: {message}")]
    ImporterFailed { importer: String, message: String },

    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read {}: {message}", path.display())]
    Workbook { path: PathBuf, message: String },

    #[error("could not parse csv file {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("unknown step type '{step_type}'")]
    UnknownStepType { step_type: String },

    #[error("step '{step_type}' was saved with version {found}, but version {expected} is supported")]
    UnsupportedStepVersion {
        step_type: String,
        found: u32,
        expected: u32,
    },

    #[error("execution data does not belong to a '{step_type}' step")]
    ExecutionDataMismatch { step_type: &'static str },

    #[error("{source}")]
    StepExecution {
        step_type: &'static str,
        params: String,
        #[source]
        source: Box<StepError>,
    },
}

impl StepError {
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an execution failure with the step that produced it and the
    /// parameters it was called with, so the caller can display both.
    pub fn in_step(self, step_type: &'static str, params: String) -> Self {
        match self {
            wrapped @ Self::StepExecution { .. } => wrapped,
            source => Self::StepExecution {
                step_type,
                params,
                source: Box::new(source),
            },
        }
    }

    /// The innermost error, skipping any step wrappers
    pub fn root(&self) -> &Self {
        match self {
            Self::StepExecution { source, .. } => source.root(),
            other => other,
        }
    }

    /// Hint for the user on how to recover, if there is a useful one
    pub fn to_fix(&self) -> Option<&'static str> {
        match self.root() {
            Self::RangeNotFound { .. } => Some(
                "Check that the start and end values exist in the sheet, or import an explicit range instead.",
            ),
            Self::InvalidReplace { .. } => Some(
                "Replacing inside a numeric or boolean column must leave a valid value of the same type.",
            ),
            Self::InvalidNumber { .. } => Some("Enter a plain number without separators or units."),
            Self::UnknownImporter { .. } => {
                Some("Register the importer before replaying steps that use it.")
            }
            Self::Io { .. } | Self::Workbook { .. } | Self::Csv { .. } => {
                Some("Make sure the file exists and is not open in another program.")
            }
            _ => None,
        }
    }
}
