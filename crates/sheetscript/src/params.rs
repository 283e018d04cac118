//! Step parameters as recorded from the UI
//!
//! Parameters arrive as a JSON object. Accessors fail fast: a missing key is
//! an error rather than a silent default, so malformed saved histories are
//! reported instead of replayed with guessed values.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::error::{StepError, StepResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepParams(Map<String, Value>);

impl StepParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build params from a JSON value, which must be an object
    pub fn from_value(value: Value) -> StepResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(StepError::invalid(
                "params",
                format!("expected an object, got {other}"),
            )),
        }
    }

    /// Add a parameter; only infallible JSON conversions are accepted
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Get a required parameter, deserialized into `T`
    pub fn get_param<T: DeserializeOwned>(&self, key: &str) -> StepResult<T> {
        let value = self.0.get(key).ok_or_else(|| StepError::missing(key))?;
        serde_json::from_value(value.clone()).map_err(|err| StepError::invalid(key, err.to_string()))
    }

    /// Get an optional parameter; `null` counts as absent
    pub fn get_optional_param<T: DeserializeOwned>(&self, key: &str) -> StepResult<Option<T>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|err| StepError::invalid(key, err.to_string())),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl std::fmt::Display for StepParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Value::Object(self.0.clone()))
    }
}
