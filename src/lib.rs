//! # Tether - Declarative GraphQL Bindings
//!
//! Tether is the binding layer between a component-style, re-render-driven
//! UI and a push-based GraphQL execution engine. The caller describes *what*
//! to fetch, declaratively, on every pass; tether decides when anything
//! actually changed and owns the subscription lifecycle, deduplication of
//! spurious re-derivations, and the observable fetch state.
//!
//! ## Architecture
//!
//! Three pieces, leaves first:
//!
//! 1. **Request building** ([`request`]): a pure function from
//!    query + variables + fragments to an immutable [`request::Request`]
//!    with a deterministic fingerprint.
//! 2. **Identity stabilization** ([`request::cell`]): a one-slot cache that
//!    preserves reference identity while the fingerprint is unchanged.
//! 3. **Execution controllers** ([`query`], [`mutation`]): lifecycle
//!    objects that react to identity changes by tearing down and reopening
//!    subscriptions against an [`engine::Engine`], mirroring emissions into
//!    a [`result::ExecutionState`].
//!
//! The engine itself — caching, deduplication, transport — is an external
//! collaborator behind the [`engine::Engine`] trait.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use tether::prelude::*;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let engine: Arc<dyn Engine> = Arc::new(MockEngine::new());
//!
//! // One handle per call site; re-binding unchanged inputs is a no-op.
//! let mut todos = QueryHandle::new(engine.clone());
//! let state = todos.bind(
//!     QueryConfig::new("query Todos($done: Boolean!) { todos(done: $done) { id text } }")
//!         .with_variables(json!({ "done": false })),
//! )?;
//! assert!(state.fetching);
//!
//! let create = MutationHandle::new(
//!     engine,
//!     "mutation Create($text: String!) { createTodo(text: $text) { id } }",
//! );
//! let result = create.execute(Some(json!({ "text": "write docs" }))).await?;
//! println!("created: {:?}", result.data);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod mutation;
pub mod prelude;
pub mod query;
pub mod request;
pub mod result;
