//! The execution engine contract.
//!
//! The engine is an external collaborator: it owns caching, deduplication,
//! and transport, and is consumed here only through [`Engine`]. Each call
//! opens a push-based, possibly multi-emission stream of
//! [`OperationResult`]s; dropping the stream is the unsubscribe.

pub mod mock;

use std::sync::Arc;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::request::Request;
use crate::result::OperationResult;

/// A cancellable stream of operation results. Dropping it unsubscribes.
pub type ResultStream = BoxStream<'static, OperationResult>;

/// Cache-usage hint forwarded to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestPolicy {
    /// Serve from cache when possible, hit the network otherwise.
    CacheFirst,
    /// Serve from cache only; never hit the network.
    CacheOnly,
    /// Always hit the network.
    NetworkOnly,
    /// Serve from cache, then revalidate over the network.
    CacheAndNetwork,
}

impl std::fmt::Display for RequestPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::CacheFirst => "cache-first",
            Self::CacheOnly => "cache-only",
            Self::NetworkOnly => "network-only",
            Self::CacheAndNetwork => "cache-and-network",
        };
        f.write_str(name)
    }
}

/// Per-operation options forwarded to the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationOptions {
    /// Cache-usage hint; `None` leaves the choice to the engine.
    pub request_policy: Option<RequestPolicy>,
}

/// A push-based executor of keyed requests.
///
/// Queries may emit any number of results over a subscription's lifetime
/// (cache hit followed by a revalidated network result, for example).
/// Mutations are expected to emit exactly once. A stream that ends without
/// emitting signals a hard transport failure; controllers recover it into a
/// consistent state rather than staying in flight.
pub trait Engine: Send + Sync {
    /// Opens a result stream for a query request.
    fn execute_query(&self, request: Arc<Request>, options: OperationOptions) -> ResultStream;

    /// Opens a result stream for a mutation request.
    fn execute_mutation(&self, request: Arc<Request>, options: OperationOptions) -> ResultStream;
}
