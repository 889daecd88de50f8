//! Tool Handlers (spec §4.6) — each exposed tool is a pure-with-respect-to-
//! process-state handler: it reads [`Config`] (immutable), calls the Bridge
//! and/or Build Engine, and returns a structured result.

mod handlers;
pub mod schema;

use crate::bridge::ClientBridge;
use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::VibeCraftError;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared, read-only process state every handler closes over.
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<Catalog>,
    pub bridge: Arc<ClientBridge>,
}

#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// The full set of tool schemas advertised on `tools/list` (spec §4.7).
pub fn list_tools() -> Vec<ToolSpec> {
    schema::all_tool_specs()
}

/// Parse arguments against the target tool's schema shape (handlers perform
/// their own structural validation), invoke it, and return its result.
/// Unrecognized tool names are a [`VibeCraftError::InvalidArgs`].
pub async fn call_tool(
    state: &AppState,
    name: &str,
    args: Value,
    cancel: CancellationToken,
) -> Result<Value, VibeCraftError> {
    if cancel.is_cancelled() {
        return Err(VibeCraftError::RequestCancelled);
    }

    let invocation = handlers::dispatch(state, name, args);
    tokio::select! {
        result = invocation => result,
        _ = cancel.cancelled() => Err(VibeCraftError::RequestCancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tool_spec_has_a_unique_name() {
        let specs = list_tools();
        let mut names: Vec<&str> = specs.iter().map(|s| s.name).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(names.len(), before);
    }

    #[test]
    fn every_tool_spec_has_an_object_schema() {
        for spec in list_tools() {
            assert_eq!(spec.input_schema["type"], "object");
        }
    }
}
