//! Prelude module for convenient imports.
//!
//! ```
//! use tether::prelude::*;
//! ```
//!
//! # What's included
//!
//! - [`Engine`] and [`MockEngine`] - the execution contract and its test double
//! - [`QueryHandle`] / [`QueryConfig`] - declarative query bindings
//! - [`MutationHandle`] - trigger-based mutations
//! - [`Request`], [`RequestCell`], [`RequestKey`] - request identity
//! - [`ExecutionState`], [`OperationResult`] - observable state and emissions
//! - The error types

pub use crate::engine::mock::MockEngine;
pub use crate::engine::{Engine, OperationOptions, RequestPolicy};
pub use crate::error::{CombinedError, GraphqlError, MutationError, RequestError};
pub use crate::mutation::MutationHandle;
pub use crate::query::{QueryConfig, QueryHandle};
pub use crate::request::cell::RequestCell;
pub use crate::request::{FragmentMap, QueryDocument, QuerySource, Request, RequestKey};
pub use crate::result::{ExecutionState, OperationResult};
