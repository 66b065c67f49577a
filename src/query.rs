//! The query execution controller.
//!
//! [`QueryHandle`] bridges a re-render-driven caller and the engine's
//! push-based result streams. The caller re-derives its inputs on every pass
//! and hands them to [`bind`](QueryHandle::bind); the handle decides whether
//! anything actually changed and manages the subscription accordingly.
//!
//! # Design Pattern: One Live Subscription
//!
//! A handle owns at most one subscription at any time, and it always
//! corresponds to the most recently bound `(request, options)` pair. Two
//! mechanisms enforce this:
//!
//! 1. Teardown cancels and aborts the subscription task.
//! 2. Every subscription carries an epoch. Retiring the epoch happens under
//!    the state lock *before* a replacement is spawned, so an in-flight
//!    emission for a superseded request can never overwrite state belonging
//!    to a newer one, regardless of task scheduling.
//!
//! State is published through a [`watch`] channel: [`state`](QueryHandle::state)
//! reads a snapshot synchronously, [`watch`](QueryHandle::watch) lets a
//! caller await changes.

use std::sync::{Arc, Mutex};

use futures::StreamExt;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::engine::{Engine, OperationOptions, RequestPolicy};
use crate::error::{CombinedError, RequestError};
use crate::request::cell::RequestCell;
use crate::request::{FragmentMap, QuerySource, Request};
use crate::result::{ExecutionState, OperationResult};

/// Declarative inputs for one bind pass.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    query: QuerySource,
    variables: Option<Value>,
    fragments: Option<FragmentMap>,
    request_policy: Option<RequestPolicy>,
    pause: bool,
}

impl QueryConfig {
    /// Creates a config for the given query with no variables, no
    /// fragments, no policy override, and `pause` off.
    pub fn new(query: impl Into<QuerySource>) -> Self {
        Self {
            query: query.into(),
            variables: None,
            fragments: None,
            request_policy: None,
            pause: false,
        }
    }

    /// Sets the variables value.
    #[must_use]
    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = Some(variables);
        self
    }

    /// Sets the fragment map.
    #[must_use]
    pub fn with_fragments(mut self, fragments: FragmentMap) -> Self {
        self.fragments = Some(fragments);
        self
    }

    /// Sets the cache-usage hint forwarded to the engine.
    #[must_use]
    pub fn with_request_policy(mut self, request_policy: RequestPolicy) -> Self {
        self.request_policy = Some(request_policy);
        self
    }

    /// Sets the pause flag. While paused, no subscription is active and
    /// `fetching` stays false.
    #[must_use]
    pub fn with_pause(mut self, pause: bool) -> Self {
        self.pause = pause;
        self
    }
}

/// Subscription lifecycle counters, guarded together with state writes.
struct Lifecycle {
    epoch: u64,
    emitted: bool,
}

/// State shared between a handle and its subscription task.
struct Shared {
    lifecycle: Mutex<Lifecycle>,
    state: watch::Sender<ExecutionState>,
}

impl Shared {
    fn new() -> Self {
        let (state, _) = watch::channel(ExecutionState::default());
        Self {
            lifecycle: Mutex::new(Lifecycle {
                epoch: 0,
                emitted: false,
            }),
            state,
        }
    }

    /// Starts a new subscription epoch: retires the old one and clears
    /// state to in-flight.
    fn begin(&self) -> u64 {
        let mut lifecycle = self.lifecycle.lock().expect("lifecycle lock poisoned");
        lifecycle.epoch += 1;
        lifecycle.emitted = false;
        self.state.send_replace(ExecutionState::started());
        lifecycle.epoch
    }

    /// Retires the current epoch and lowers `fetching`, leaving the last
    /// terminal data/error pair visible.
    fn suspend(&self) {
        let mut lifecycle = self.lifecycle.lock().expect("lifecycle lock poisoned");
        lifecycle.epoch += 1;
        self.state.send_modify(|state| state.fetching = false);
    }

    /// Retires the current epoch without touching state.
    fn retire(&self) {
        let mut lifecycle = self.lifecycle.lock().expect("lifecycle lock poisoned");
        lifecycle.epoch += 1;
    }

    /// Mirrors an emission into state, unless the epoch has been retired.
    fn apply(&self, epoch: u64, result: OperationResult) {
        let mut lifecycle = self.lifecycle.lock().expect("lifecycle lock poisoned");
        if lifecycle.epoch != epoch {
            trace!(epoch, "dropping emission for retired subscription");
            return;
        }
        lifecycle.emitted = true;
        self.state.send_replace(ExecutionState::from_result(result));
    }

    /// Records a stream that closed before its first emission. The state
    /// must not be left in flight forever.
    fn finish(&self, epoch: u64) {
        let lifecycle = self.lifecycle.lock().expect("lifecycle lock poisoned");
        if lifecycle.epoch != epoch || lifecycle.emitted {
            return;
        }
        self.state.send_replace(ExecutionState {
            fetching: false,
            data: None,
            error: Some(CombinedError::network(
                "result stream closed before emitting",
            )),
        });
    }
}

/// Handle for a running subscription task.
struct Subscription {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl Subscription {
    fn cancel(self) {
        self.token.cancel();
        self.join.abort();
    }
}

/// The most recently bound dependency set.
struct Bound {
    request: Arc<Request>,
    request_policy: Option<RequestPolicy>,
    pause: bool,
}

/// A continuously subscribed query bound to an engine.
///
/// Create one handle per call site and keep it alive across passes; the
/// embedded identity cache is what turns structurally equal inputs into
/// no-ops. Must be used within a Tokio runtime.
pub struct QueryHandle {
    engine: Arc<dyn Engine>,
    cell: RequestCell,
    shared: Arc<Shared>,
    subscription: Option<Subscription>,
    bound: Option<Bound>,
}

impl QueryHandle {
    /// Creates an idle handle. No engine call is made until
    /// [`bind`](Self::bind) activates it.
    #[must_use]
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            cell: RequestCell::new(),
            shared: Arc::new(Shared::new()),
            subscription: None,
            bound: None,
        }
    }

    /// Applies one pass of declarative inputs and returns a state snapshot.
    ///
    /// The request is stabilized through the handle's identity cache, so a
    /// pass with structurally unchanged inputs leaves the live subscription
    /// untouched. A change to the request identity, the request policy, or
    /// the pause flag tears the subscription down first, then either clears
    /// state and opens a replacement or, when pausing, opens nothing.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when the query or a fragment fails to
    /// parse. The previous binding stays active in that case.
    pub fn bind(&mut self, config: QueryConfig) -> Result<ExecutionState, RequestError> {
        let QueryConfig {
            query,
            variables,
            fragments,
            request_policy,
            pause,
        } = config;

        let request = self.cell.stable(query, variables, fragments.as_ref())?;

        let unchanged = self.bound.as_ref().is_some_and(|bound| {
            Arc::ptr_eq(&bound.request, &request)
                && bound.request_policy == request_policy
                && bound.pause == pause
        });

        if !unchanged {
            if pause {
                debug!(key = %request.key(), "pausing query");
                self.shared.suspend();
                if let Some(subscription) = self.subscription.take() {
                    subscription.cancel();
                }
            } else {
                self.resubscribe(Arc::clone(&request), request_policy);
            }
            self.bound = Some(Bound {
                request,
                request_policy,
                pause,
            });
        }

        Ok(self.state())
    }

    /// Imperatively refetches: forces a full teardown-and-resubscribe cycle
    /// for the bound request, using `request_policy` if supplied, else the
    /// bound policy. A no-op before the first bind.
    pub fn execute(&mut self, request_policy: Option<RequestPolicy>) {
        let Some(bound) = self.bound.as_ref() else {
            return;
        };
        let policy = request_policy.or(bound.request_policy);
        let request = Arc::clone(&bound.request);
        self.resubscribe(request, policy);
    }

    /// Synchronous snapshot of the observable state.
    #[must_use]
    pub fn state(&self) -> ExecutionState {
        self.shared.state.borrow().clone()
    }

    /// A receiver for awaiting state changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ExecutionState> {
        self.shared.state.subscribe()
    }

    /// Tears down any live subscription and deactivates the handle.
    ///
    /// No state write occurs after this returns; a later
    /// [`bind`](Self::bind) reactivates from scratch.
    pub fn cancel(&mut self) {
        self.shared.retire();
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
        self.bound = None;
    }

    fn resubscribe(&mut self, request: Arc<Request>, request_policy: Option<RequestPolicy>) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }

        // State is cleared and the old epoch retired before the replacement
        // task exists.
        let epoch = self.shared.begin();
        debug!(key = %request.key(), policy = ?request_policy, epoch, "opening query subscription");

        let shared = Arc::clone(&self.shared);
        let engine = Arc::clone(&self.engine);
        let token = CancellationToken::new();
        let guard = token.clone();

        let join = tokio::spawn(async move {
            let mut stream = engine.execute_query(request, OperationOptions { request_policy });
            loop {
                tokio::select! {
                    _ = guard.cancelled() => return,
                    emission = stream.next() => match emission {
                        Some(result) => shared.apply(epoch, result),
                        None => {
                            shared.finish(epoch);
                            return;
                        }
                    },
                }
            }
        });

        self.subscription = Some(Subscription { token, join });
    }
}

impl Drop for QueryHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
