//! Controllable engine for testing.
//!
//! [`MockEngine`] records every operation it is asked to execute and gives
//! the test full control over each call's emission channel, enabling
//! deterministic lifecycle tests without real I/O or time dependencies.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use tether::engine::mock::MockEngine;
//! use tether::result::OperationResult;
//! use serde_json::json;
//!
//! let engine = Arc::new(MockEngine::new());
//!
//! // Either script an automatic response for every call...
//! engine.respond_with([OperationResult::from_data(json!({ "todos": [] }))]);
//!
//! // ...or drive individual calls by hand once they are recorded:
//! // engine.wait_for_calls(1).await;
//! // engine.emit(0, OperationResult::from_data(json!(1)));
//! ```
//!
//! Calls are indexed in the order the engine sees them. `emit` reports
//! whether the subscription was still listening, which makes unsubscription
//! observable from tests.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::engine::{Engine, OperationOptions, RequestPolicy, ResultStream};
use crate::request::{Request, RequestKey};
use crate::result::OperationResult;

/// Which entry point an operation arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// `execute_query`.
    Query,
    /// `execute_mutation`.
    Mutation,
}

/// A snapshot of one recorded engine call.
#[derive(Debug, Clone)]
pub struct RecordedOperation {
    /// Entry point.
    pub kind: OperationKind,
    /// The request's fingerprint.
    pub key: RequestKey,
    /// The request's variables.
    pub variables: serde_json::Value,
    /// The forwarded cache-usage hint.
    pub request_policy: Option<RequestPolicy>,
}

/// An engine whose result streams are driven by the test.
#[derive(Debug)]
pub struct MockEngine {
    next: AtomicUsize,
    counter: watch::Sender<usize>,
    calls: DashMap<usize, RecordedOperation>,
    channels: DashMap<usize, mpsc::UnboundedSender<OperationResult>>,
    script: Mutex<Vec<OperationResult>>,
}

impl MockEngine {
    /// Creates an engine with no scripted responses.
    #[must_use]
    pub fn new() -> Self {
        let (counter, _) = watch::channel(0);
        Self {
            next: AtomicUsize::new(0),
            counter,
            calls: DashMap::new(),
            channels: DashMap::new(),
            script: Mutex::new(Vec::new()),
        }
    }

    /// Scripts results that every subsequent call receives immediately.
    ///
    /// The stream stays open afterwards; use [`close`](Self::close) to end
    /// it explicitly.
    pub fn respond_with(&self, results: impl IntoIterator<Item = OperationResult>) {
        let mut script = self.script.lock().expect("script lock poisoned");
        *script = results.into_iter().collect();
    }

    /// Number of calls seen so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        *self.counter.borrow()
    }

    /// Waits until at least `count` calls have been recorded.
    pub async fn wait_for_calls(&self, count: usize) {
        let mut receiver = self.counter.subscribe();
        // The sender lives in self, so this only fails if self is gone.
        let _ = receiver.wait_for(|seen| *seen >= count).await;
    }

    /// Returns the recorded call at `index`, if it happened.
    #[must_use]
    pub fn operation(&self, index: usize) -> Option<RecordedOperation> {
        self.calls.get(&index).map(|entry| entry.clone())
    }

    /// Pushes a result into the call's stream.
    ///
    /// Returns `false` when the call is unknown or its subscription has
    /// already been dropped.
    pub fn emit(&self, index: usize, result: OperationResult) -> bool {
        self.channels
            .get(&index)
            .is_some_and(|sender| sender.send(result).is_ok())
    }

    /// Ends the call's stream. Returns `false` when the call is unknown or
    /// already closed.
    pub fn close(&self, index: usize) -> bool {
        self.channels.remove(&index).is_some()
    }

    fn open(
        &self,
        kind: OperationKind,
        request: &Request,
        options: OperationOptions,
    ) -> ResultStream {
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = mpsc::unbounded_channel();

        for result in self.script.lock().expect("script lock poisoned").iter() {
            let _ = sender.send(result.clone());
        }

        self.calls.insert(
            index,
            RecordedOperation {
                kind,
                key: request.key(),
                variables: request.variables().clone(),
                request_policy: options.request_policy,
            },
        );
        self.channels.insert(index, sender);
        self.counter.send_modify(|seen| *seen = (*seen).max(index + 1));

        UnboundedReceiverStream::new(receiver).boxed()
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for MockEngine {
    fn execute_query(&self, request: Arc<Request>, options: OperationOptions) -> ResultStream {
        self.open(OperationKind::Query, &request, options)
    }

    fn execute_mutation(&self, request: Arc<Request>, options: OperationOptions) -> ResultStream {
        self.open(OperationKind::Mutation, &request, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> Arc<Request> {
        Arc::new(Request::new("query { todo { id } }", Some(json!({ "id": 1 })), None).unwrap())
    }

    #[tokio::test]
    async fn test_calls_are_recorded_in_order() {
        let engine = MockEngine::new();
        let _query = engine.execute_query(request(), OperationOptions::default());
        let _mutation = engine.execute_mutation(
            request(),
            OperationOptions {
                request_policy: Some(RequestPolicy::NetworkOnly),
            },
        );

        assert_eq!(engine.calls(), 2);
        let first = engine.operation(0).unwrap();
        assert_eq!(first.kind, OperationKind::Query);
        assert_eq!(first.variables, json!({ "id": 1 }));
        assert_eq!(first.request_policy, None);

        let second = engine.operation(1).unwrap();
        assert_eq!(second.kind, OperationKind::Mutation);
        assert_eq!(second.request_policy, Some(RequestPolicy::NetworkOnly));
    }

    #[tokio::test]
    async fn test_emit_reaches_the_stream() {
        let engine = MockEngine::new();
        let mut stream = engine.execute_query(request(), OperationOptions::default());

        assert!(engine.emit(0, OperationResult::from_data(json!(42))));
        let result = stream.next().await.unwrap();
        assert_eq!(result.data, Some(json!(42)));
    }

    #[tokio::test]
    async fn test_emit_after_drop_reports_unsubscribed() {
        let engine = MockEngine::new();
        let stream = engine.execute_query(request(), OperationOptions::default());
        drop(stream);

        assert!(!engine.emit(0, OperationResult::default()));
    }

    #[tokio::test]
    async fn test_close_ends_the_stream() {
        let engine = MockEngine::new();
        let mut stream = engine.execute_query(request(), OperationOptions::default());

        assert!(engine.close(0));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_scripted_responses_arrive_immediately() {
        let engine = MockEngine::new();
        engine.respond_with([
            OperationResult::from_data(json!("cached")),
            OperationResult::from_data(json!("network")),
        ]);

        let mut stream = engine.execute_query(request(), OperationOptions::default());
        assert_eq!(stream.next().await.unwrap().data, Some(json!("cached")));
        assert_eq!(stream.next().await.unwrap().data, Some(json!("network")));
    }
}
