//! Todo bindings demo: a query that stays subscribed and a mutation trigger.
//!
//! The engine here is the in-crate mock, scripted to answer every call, so
//! the demo runs without a network. Swap in any [`Engine`] implementation
//! to run against a real GraphQL backend.
//!
//! Run with: `cargo run --example todo`

use std::sync::Arc;

use color_eyre::eyre::Result;
use serde_json::json;
use tether::prelude::*;

const TODOS_QUERY: &str = "query Todos { todos { id text completed } }";
const CREATE_MUTATION: &str =
    "mutation Create($text: String!) { createTodo(text: $text) { id text } }";

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    let engine = Arc::new(MockEngine::new());
    engine.respond_with([OperationResult::from_data(json!({
        "todos": [
            { "id": 1, "text": "read the docs", "completed": true },
            { "id": 2, "text": "bind a query", "completed": false },
        ]
    }))]);

    // The query stays subscribed; every pass re-binds the same inputs and
    // only genuine changes reach the engine.
    let mut todos = QueryHandle::new(engine.clone());
    let mut states = todos.watch();

    todos.bind(QueryConfig::new(TODOS_QUERY).with_request_policy(RequestPolicy::CacheFirst))?;
    println!("after bind: fetching = {}", todos.state().fetching);

    states.wait_for(|state| !state.fetching).await?;
    println!("todos: {}", serde_json::to_string_pretty(&todos.state())?);

    // A second pass with identical inputs is a no-op.
    todos.bind(QueryConfig::new(TODOS_QUERY).with_request_policy(RequestPolicy::CacheFirst))?;
    println!("engine calls after identical re-bind: {}", engine.calls());

    // Mutations are imperative and never deduplicated.
    let create = MutationHandle::new(engine.clone(), CREATE_MUTATION);
    let result = create
        .execute(Some(json!({ "text": "ship the demo" })))
        .await?;
    println!("mutation result: {}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
