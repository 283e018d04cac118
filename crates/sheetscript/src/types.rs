//! Shared type definitions for the sheetscript crate
//!
//! This module contains common types that are used across states, steps and
//! code chunks, ensuring consistency and avoiding circular dependencies.

use std::hash::BuildHasherDefault;

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

/// Insertion-ordered map using the Fx hasher
pub type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Insertion-ordered set using the Fx hasher
pub type FxIndexSet<T> = IndexSet<T, BuildHasherDefault<FxHasher>>;

/// Header of a column as displayed in the sheet and written into generated code
pub type ColumnHeader = String;

/// Stable identifier of a column.
///
/// A column keeps its id for its whole lifetime, even when its header is
/// renamed, so steps can refer to columns independently of their headers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(pub String);

impl ColumnId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ColumnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a dataframe in the state came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataframeSource {
    /// Passed in by the user when the session started
    Passed,

    /// Read from a file or produced by an importer
    Imported,

    /// Computed from other dataframes in the state
    Derived,
}

impl std::fmt::Display for DataframeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataframeSource::Passed => write!(f, "passed"),
            DataframeSource::Imported => write!(f, "imported"),
            DataframeSource::Derived => write!(f, "derived"),
        }
    }
}
