//! Error types for request construction and execution.
//!
//! Two families live here. [`RequestError`] and [`MutationError`] are hard
//! failures returned to the caller. [`CombinedError`] is data: it travels
//! inside emissions and observable state, is never returned as `Err`, and
//! may accompany partial data.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to construct a [`Request`](crate::request::Request).
///
/// These are programmer errors and surface immediately from the operation
/// that triggered the build; they are never folded into observable state.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The query or a fragment body failed to parse.
    #[error("failed to parse query document: {0}")]
    Parse(#[from] graphql_parser::query::ParseError),

    /// A fragment map entry parsed to something other than a fragment.
    #[error("fragment `{name}` does not contain a fragment definition")]
    ExpectedFragment {
        /// The fragment map key.
        name: String,
    },

    /// A fragment map entry parsed to an empty document.
    #[error("fragment `{name}` is empty")]
    EmptyFragment {
        /// The fragment map key.
        name: String,
    },
}

/// Failure of a mutation trigger.
#[derive(Debug, Error)]
pub enum MutationError {
    /// The request could not be built; no engine call was made.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// The engine's stream closed before producing a result.
    #[error("mutation result stream closed before producing a result")]
    StreamClosed,
}

/// Location of a GraphQL error within the query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphqlErrorLocation {
    /// Line number (1-based).
    pub line: u32,
    /// Column number (1-based).
    pub column: u32,
}

/// One segment of a GraphQL error path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GraphqlPathSegment {
    /// Field name.
    Key(String),
    /// List index.
    Index(i64),
}

/// An API-reported error, per the GraphQL response spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlError {
    /// Human-readable message.
    pub message: String,
    /// Location(s) within the query.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<GraphqlErrorLocation>,
    /// Path within the response data.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<GraphqlPathSegment>,
    /// Extensions metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
}

impl GraphqlError {
    /// Creates an error carrying only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: Vec::new(),
            extensions: None,
        }
    }
}

/// A network failure and/or a sequence of API-reported errors.
///
/// Both parts may be present at once: a revalidation round trip can fail on
/// the wire while cached data still carries earlier field errors. Consumers
/// must check `data` and `error` independently; the presence of one says
/// nothing about the other.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedError {
    /// Transport-level failure message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_error: Option<String>,
    /// API-reported errors, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub graphql_errors: Vec<GraphqlError>,
}

impl CombinedError {
    /// Creates an error from a transport failure message.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            network_error: Some(message.into()),
            graphql_errors: Vec::new(),
        }
    }

    /// Creates an error from API-reported errors.
    #[must_use]
    pub fn graphql(errors: Vec<GraphqlError>) -> Self {
        Self {
            network_error: None,
            graphql_errors: errors,
        }
    }

    /// Returns `true` if a transport failure is recorded.
    #[must_use]
    pub const fn has_network_error(&self) -> bool {
        self.network_error.is_some()
    }

    /// Returns `true` if any API-reported errors are recorded.
    #[must_use]
    pub fn has_graphql_errors(&self) -> bool {
        !self.graphql_errors.is_empty()
    }
}

impl fmt::Display for CombinedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        if let Some(network) = &self.network_error {
            write!(f, "[Network] {network}")?;
            first = false;
        }
        for error in &self.graphql_errors {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "[GraphQL] {}", error.message)?;
            first = false;
        }
        if first {
            write!(f, "unknown error")?;
        }
        Ok(())
    }
}

impl std::error::Error for CombinedError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_constructor() {
        let error = CombinedError::network("connection refused");
        assert!(error.has_network_error());
        assert!(!error.has_graphql_errors());
        assert_eq!(error.to_string(), "[Network] connection refused");
    }

    #[test]
    fn test_graphql_constructor() {
        let error = CombinedError::graphql(vec![
            GraphqlError::new("field `a` not found"),
            GraphqlError::new("field `b` not found"),
        ]);
        assert!(!error.has_network_error());
        assert!(error.has_graphql_errors());
        assert_eq!(
            error.to_string(),
            "[GraphQL] field `a` not found; [GraphQL] field `b` not found"
        );
    }

    #[test]
    fn test_both_parts_may_be_present() {
        let error = CombinedError {
            network_error: Some("timeout".to_owned()),
            graphql_errors: vec![GraphqlError::new("stale field")],
        };
        assert!(error.has_network_error());
        assert!(error.has_graphql_errors());
        assert_eq!(error.to_string(), "[Network] timeout; [GraphQL] stale field");
    }

    #[test]
    fn test_graphql_error_roundtrips_through_serde() {
        let error = GraphqlError {
            message: "bad field".to_owned(),
            locations: vec![GraphqlErrorLocation { line: 2, column: 7 }],
            path: vec![
                GraphqlPathSegment::Key("todos".to_owned()),
                GraphqlPathSegment::Index(0),
            ],
            extensions: None,
        };
        let json = serde_json::to_value(&error).unwrap();
        let back: GraphqlError = serde_json::from_value(json).unwrap();
        assert_eq!(back, error);
    }
}
