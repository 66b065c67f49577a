//! The mutation execution controller.
//!
//! Unlike queries, mutations never subscribe ambiently. A [`MutationHandle`]
//! is bound to a fixed query; each [`execute`](MutationHandle::execute) call
//! builds a fresh request (mutations are never deduplicated), opens the
//! engine's stream, and converts it into a single settled outcome by taking
//! the first emission.
//!
//! Overlapping invocations are intentionally independent: every call writes
//! into the one shared state, last writer wins, and callers that fire
//! concurrent mutations correlate results through the returned futures.

use std::sync::Arc;

use futures::FutureExt;
use futures::StreamExt;
use futures::future::{self, BoxFuture};
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use crate::engine::{Engine, OperationOptions};
use crate::error::MutationError;
use crate::request::{FragmentMap, QuerySource, Request};
use crate::result::{ExecutionState, OperationResult};

/// A trigger-based mutation bound to an engine and a fixed query.
pub struct MutationHandle {
    engine: Arc<dyn Engine>,
    query: QuerySource,
    fragments: Option<FragmentMap>,
    state: Arc<watch::Sender<ExecutionState>>,
}

impl MutationHandle {
    /// Creates a handle for the given mutation query. Nothing executes
    /// until [`execute`](Self::execute).
    #[must_use]
    pub fn new(engine: Arc<dyn Engine>, query: impl Into<QuerySource>) -> Self {
        let (state, _) = watch::channel(ExecutionState::default());
        Self {
            engine,
            query: query.into(),
            fragments: None,
            state: Arc::new(state),
        }
    }

    /// Attaches a fragment map inlined into every built request.
    #[must_use]
    pub fn with_fragments(mut self, fragments: FragmentMap) -> Self {
        self.fragments = Some(fragments);
        self
    }

    /// Synchronous snapshot of the observable state.
    #[must_use]
    pub fn state(&self) -> ExecutionState {
        self.state.borrow().clone()
    }

    /// A receiver for awaiting state changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ExecutionState> {
        self.state.subscribe()
    }

    /// Triggers the mutation.
    ///
    /// State is cleared to in-flight and the request is built *before* this
    /// returns, so a caller observes `fetching: true` immediately. The
    /// returned future resolves with the first emission in full —
    /// application-level errors ride inside `Ok` — and mirrors the same
    /// values into state just before settling.
    ///
    /// # Errors
    ///
    /// The future resolves to [`MutationError::Request`] when the query or
    /// a fragment fails to parse (no engine call is made), and to
    /// [`MutationError::StreamClosed`] when the engine's stream ends
    /// without emitting.
    pub fn execute(
        &self,
        variables: Option<Value>,
    ) -> BoxFuture<'static, Result<OperationResult, MutationError>> {
        self.state.send_replace(ExecutionState::started());

        let request = match Request::new(self.query.clone(), variables, self.fragments.as_ref()) {
            Ok(request) => Arc::new(request),
            Err(error) => {
                // No request could be formed; don't stay in flight.
                self.state.send_modify(|state| state.fetching = false);
                return future::ready(Err(MutationError::Request(error))).boxed();
            }
        };

        debug!(key = %request.key(), "executing mutation");

        let engine = Arc::clone(&self.engine);
        let state = Arc::clone(&self.state);

        async move {
            let mut stream = engine.execute_mutation(request, OperationOptions::default());
            match stream.next().await {
                Some(result) => {
                    state.send_replace(ExecutionState::from_result(result.clone()));
                    Ok(result)
                }
                None => {
                    state.send_modify(|state| state.fetching = false);
                    Err(MutationError::StreamClosed)
                }
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::MockEngine;

    #[tokio::test]
    async fn test_build_failure_rejects_without_engine_call() {
        let engine = Arc::new(MockEngine::new());
        let handle = MutationHandle::new(engine.clone(), "mutation {");

        let result = handle.execute(None).await;
        assert!(matches!(result, Err(MutationError::Request(_))));
        assert_eq!(engine.calls(), 0);
        assert!(!handle.state().fetching);
        assert!(handle.state().error.is_none());
    }

    #[tokio::test]
    async fn test_execute_sets_fetching_before_returning() {
        let engine = Arc::new(MockEngine::new());
        let handle = MutationHandle::new(
            engine,
            "mutation Create($text: String!) { createTodo(text: $text) { id } }",
        );

        let future = handle.execute(Some(serde_json::json!({ "text": "a" })));
        // The write happened during the call, not at first poll.
        assert!(handle.state().fetching);
        drop(future);
    }
}
