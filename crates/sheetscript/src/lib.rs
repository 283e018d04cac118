//! Records spreadsheet edits as replayable steps and transpiles them into
//! pandas code.

pub mod ast_builder;
pub mod code_chunks;
pub mod combine;
pub mod config;
pub mod dataframe;
pub mod dataframe_names;
pub mod error;
pub mod excel_utils;
pub mod history;
pub mod importers;
pub mod params;
pub mod state;
pub mod step_performers;
pub mod transpile_utils;
pub mod transpiler;
pub mod types;
pub mod workbook;

pub use error::{StepError, StepResult};
pub use history::{SavedStep, StepHistory};
pub use params::StepParams;
pub use state::State;
pub use step_performers::StepType;
