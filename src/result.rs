//! Emission and observable-state types.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CombinedError;

/// One value pushed by an engine result stream.
///
/// `data` and `error` are independent; partial data alongside errors is a
/// normal outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    /// Response data, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Network and/or API errors, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CombinedError>,
}

impl OperationResult {
    /// Creates a result carrying only data.
    #[must_use]
    pub fn from_data(data: Value) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    /// Creates a result carrying only an error.
    #[must_use]
    pub fn from_error(error: CombinedError) -> Self {
        Self {
            data: None,
            error: Some(error),
        }
    }

    /// Deserializes `data` into a typed value, if present.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error when `data` does not match `T`.
    pub fn decode_data<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.data.clone().map(serde_json::from_value).transpose()
    }
}

/// The three-field state a controller exposes to its reader.
///
/// `fetching` reports an in-flight subscription or trigger. Query
/// controllers clear `data` and `error` when they start work for a *new*
/// request; pausing only lowers `fetching` and leaves the last terminal pair
/// visible. Mutation controllers clear on every invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    /// Whether a fetch is in flight.
    pub fetching: bool,
    /// Data from the most recent emission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Error from the most recent emission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CombinedError>,
}

impl ExecutionState {
    /// The cleared in-flight state written when new work starts.
    pub(crate) fn started() -> Self {
        Self {
            fetching: true,
            data: None,
            error: None,
        }
    }

    /// Full overwrite from one emission. No merging across emissions.
    pub(crate) fn from_result(result: OperationResult) -> Self {
        Self {
            fetching: false,
            data: result.data,
            error: result.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_data() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Todo {
            id: u32,
            text: String,
        }

        let result = OperationResult::from_data(json!({ "id": 1, "text": "write tests" }));
        let todo: Option<Todo> = result.decode_data().unwrap();
        assert_eq!(
            todo,
            Some(Todo {
                id: 1,
                text: "write tests".to_owned()
            })
        );

        let empty = OperationResult::default();
        let none: Option<Todo> = empty.decode_data().unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn test_state_mirrors_an_emission_in_full() {
        let result = OperationResult {
            data: Some(json!(0)),
            error: Some(CombinedError::network("1")),
        };
        let state = ExecutionState::from_result(result.clone());
        assert!(!state.fetching);
        assert_eq!(state.data, result.data);
        assert_eq!(state.error, result.error);
    }

    #[test]
    fn test_started_clears_previous_terminals() {
        let state = ExecutionState::started();
        assert!(state.fetching);
        assert!(state.data.is_none());
        assert!(state.error.is_none());
    }
}
