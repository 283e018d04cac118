//! User-defined importers and their typed parameters
//!
//! An importer is a named function registered by the host that produces
//! dataframes from keyword arguments. Parameters arrive from the UI as
//! `{type, value}` pairs where the value is usually text typed by the user.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    dataframe::DataFrame,
    error::{StepError, StepResult},
    transpile_utils::{float_literal, int_literal, string_literal},
    types::FxIndexMap,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImporterParamType {
    #[serde(alias = "string")]
    Str,
    #[serde(alias = "integer")]
    Int,
    Float,
    /// Any other type: the value is passed through as source code
    #[serde(other)]
    Any,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImporterParam {
    #[serde(rename = "type")]
    pub param_type: ImporterParamType,
    pub value: Value,
}

impl ImporterParam {
    pub fn new(param_type: ImporterParamType, value: impl Into<Value>) -> Self {
        Self {
            param_type,
            value: value.into(),
        }
    }

    fn text(&self) -> String {
        match &self.value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }

    /// Convert to a typed argument, parsing numbers from their text form
    pub fn to_arg(&self) -> StepResult<ImporterArg> {
        let text = self.text();
        match self.param_type {
            ImporterParamType::Str => Ok(ImporterArg::Str(text)),
            ImporterParamType::Int => text
                .trim()
                .parse()
                .map(ImporterArg::Int)
                .map_err(|_| StepError::InvalidNumber {
                    value: text,
                    expected: "an integer",
                }),
            ImporterParamType::Float => text
                .trim()
                .parse()
                .map(ImporterArg::Float)
                .map_err(|_| StepError::InvalidNumber {
                    value: text,
                    expected: "a float",
                }),
            ImporterParamType::Any => Ok(ImporterArg::Raw(text)),
        }
    }
}

/// A converted importer argument
#[derive(Debug, Clone, PartialEq)]
pub enum ImporterArg {
    Str(String),
    Int(i64),
    Float(f64),
    /// Source text emitted verbatim
    Raw(String),
}

impl ImporterArg {
    pub fn to_code(&self) -> String {
        match self {
            Self::Str(value) => string_literal(value),
            Self::Int(value) => int_literal(*value),
            Self::Float(value) => float_literal(*value),
            Self::Raw(value) => value.clone(),
        }
    }
}

pub type ImporterArgs = FxIndexMap<String, ImporterArg>;

/// Convert every parameter in order, failing on the first bad one
pub fn convert_importer_params(
    params: &FxIndexMap<String, ImporterParam>,
) -> StepResult<ImporterArgs> {
    params
        .iter()
        .map(|(name, param)| Ok((name.clone(), param.to_arg()?)))
        .collect()
}

/// `name=value, ...` for the generated importer call
pub fn get_transpiled_importer_params(args: &ImporterArgs) -> String {
    args.iter()
        .map(|(name, arg)| format!("{name}={}", arg.to_code()))
        .collect::<Vec<_>>()
        .join(", ")
}

type ImporterFn = Box<dyn Fn(&ImporterArgs) -> anyhow::Result<Vec<DataFrame>>>;

/// Importers available to `user_defined_import` steps, by name
#[derive(Default)]
pub struct ImporterRegistry {
    importers: FxIndexMap<String, ImporterFn>,
}

impl ImporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, importer: F)
    where
        F: Fn(&ImporterArgs) -> anyhow::Result<Vec<DataFrame>> + 'static,
    {
        self.importers.insert(name.into(), Box::new(importer));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.importers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.importers.keys().map(String::as_str)
    }

    pub fn call(&self, name: &str, args: &ImporterArgs) -> StepResult<Vec<DataFrame>> {
        let importer = self
            .importers
            .get(name)
            .ok_or_else(|| StepError::UnknownImporter {
                importer: name.to_string(),
            })?;
        importer(args).map_err(|err| StepError::ImporterFailed {
            importer: name.to_string(),
            message: format!("{err:#}"),
        })
    }
}

impl fmt::Debug for ImporterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImporterRegistry")
            .field("importers", &self.importers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_param_types_deserialize() {
        let param: ImporterParam = serde_json::from_value(json!({"type": "int", "value": "10"})).unwrap();
        assert_eq!(param.param_type, ImporterParamType::Int);

        let param: ImporterParam =
            serde_json::from_value(json!({"type": "dict", "value": "{'a': 1}"})).unwrap();
        assert_eq!(param.param_type, ImporterParamType::Any);
    }

    #[test]
    fn test_args_render_as_python() {
        let mut params = FxIndexMap::default();
        params.insert("path".to_string(), ImporterParam::new(ImporterParamType::Str, "x.csv"));
        params.insert("rows".to_string(), ImporterParam::new(ImporterParamType::Int, " 10"));
        params.insert("ratio".to_string(), ImporterParam::new(ImporterParamType::Float, "2"));
        params.insert("opts".to_string(), ImporterParam::new(ImporterParamType::Any, "{'a': 1}"));

        let args = convert_importer_params(&params).unwrap();
        assert_eq!(
            get_transpiled_importer_params(&args),
            "path=\"x.csv\", rows=10, ratio=2.0, opts={'a': 1}"
        );
    }

    #[test]
    fn test_bad_number_propagates() {
        let param = ImporterParam::new(ImporterParamType::Int, "ten");
        assert!(matches!(
            param.to_arg(),
            Err(StepError::InvalidNumber { expected: "an integer", .. })
        ));
    }

    #[test]
    fn test_registry_calls_and_reports_failures() {
        let mut registry = ImporterRegistry::new();
        registry.register("empty", |_| Ok(Vec::new()));
        registry.register("broken", |_| Err(anyhow::anyhow!("disk on fire")));

        let args = ImporterArgs::default();
        assert!(registry.call("empty", &args).unwrap().is_empty());
        assert!(matches!(
            registry.call("broken", &args),
            Err(StepError::ImporterFailed { .. })
        ));
        assert!(matches!(
            registry.call("missing", &args),
            Err(StepError::UnknownImporter { .. })
        ));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["empty", "broken"]);
    }
}
