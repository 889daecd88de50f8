//! Stdio transport (spec §4.7): one JSON-RPC object per line in both
//! directions. Every `suppress_stdout` logging setting exists because of this
//! transport — any stray byte on stdout that isn't a response frame corrupts
//! the wire for whichever MCP client is reading it.

use super::{handle_request, InvocationRegistry, RpcRequest};
use crate::tools::AppState;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

/// Read JSON-RPC requests from stdin line by line, dispatching each on its
/// own task so a slow `tools/call` never blocks the next line from being
/// read, and writing responses back to stdout serialized through a mutex so
/// concurrent tasks' writes don't interleave mid-line.
pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let registry = Arc::new(InvocationRegistry::new());
    let stdout = Arc::new(tokio::sync::Mutex::new(tokio::io::stdout()));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let request: RpcRequest = match serde_json::from_str(trimmed) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "ignoring malformed stdio frame");
                continue;
            }
        };

        let state = state.clone();
        let registry = registry.clone();
        let stdout = stdout.clone();
        tokio::spawn(async move {
            if let Some(response) = handle_request(&state, &registry, request).await {
                let mut line = serde_json::to_string(&response).unwrap_or_default();
                line.push('\n');
                let mut out = stdout.lock().await;
                if let Err(e) = out.write_all(line.as_bytes()).await {
                    warn!(error = %e, "failed writing stdio response");
                    return;
                }
                let _ = out.flush().await;
            } else {
                debug!("notification handled, no response frame emitted");
            }
        });
    }

    Ok(())
}
