//! Build Engine (spec §4.5) — normalizes a Build Request into a command
//! list, sanitizes it as a unit, optionally previews or coalesces it, then
//! dispatches it to the Bridge sequentially.

mod coalesce;

use crate::bridge::protocol::MessageType;
use crate::bridge::ClientBridge;
use crate::catalog::Catalog;
use crate::config::{SafetyConfig, WorldEditMode};
use crate::error::VibeCraftError;
use crate::sandbox;
use crate::sanitizer::{sanitize, SanitizeResult};
use crate::schematic::{self, SchematicRequest};
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum BuildSource {
    Script(String),
    Schematic(SchematicRequest),
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub source: BuildSource,
    pub preview_only: bool,
    pub fail_fast: bool,
    pub coalesce: bool,
    pub command_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandStatus {
    Ok,
    Failed(String),
    SkippedPreview,
}

#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub command: String,
    pub status: CommandStatus,
}

#[derive(Debug, Clone)]
pub struct BuildResult {
    pub attempted: usize,
    pub ok: usize,
    pub failed: usize,
    pub outcomes: Vec<CommandOutcome>,
}

/// Run a build end to end. `progress_sink` is invoked after every dispatched
/// command with the cumulative `(attempted, ok, failed)` counts.
pub async fn build(
    request: &BuildRequest,
    catalog: &Catalog,
    bridge: &ClientBridge,
    safety: &SafetyConfig,
    worldedit_mode: WorldEditMode,
    mut progress_sink: impl FnMut(usize, usize, usize),
) -> Result<BuildResult, VibeCraftError> {
    let commands = normalize(&request.source, catalog, bridge).await?;

    for command in &commands {
        if let SanitizeResult::Rejected { reason } = sanitize(command, safety) {
            return Err(VibeCraftError::SanitizationRejected {
                command: command.clone(),
                rule: reason,
            });
        }
    }

    if request.preview_only {
        let outcomes = commands
            .iter()
            .map(|c| CommandOutcome {
                command: c.clone(),
                status: CommandStatus::SkippedPreview,
            })
            .collect();
        return Ok(BuildResult {
            attempted: 0,
            ok: 0,
            failed: 0,
            outcomes,
        });
    }

    let dispatch_list = if request.coalesce {
        coalesce::coalesce_commands(&commands, worldedit_mode)
    } else {
        commands
    };

    let mut outcomes = Vec::with_capacity(dispatch_list.len());
    let mut ok = 0usize;
    let mut failed = 0usize;

    for command in &dispatch_list {
        let result = bridge
            .request(
                MessageType::CommandExecute,
                serde_json::json!({ "command": command }),
                request.command_timeout,
            )
            .await;

        match result {
            Ok(_) => {
                ok += 1;
                outcomes.push(CommandOutcome {
                    command: command.clone(),
                    status: CommandStatus::Ok,
                });
            }
            Err(e) => {
                failed += 1;
                outcomes.push(CommandOutcome {
                    command: command.clone(),
                    status: CommandStatus::Failed(e.to_string()),
                });
            }
        }

        progress_sink(ok + failed, ok, failed);

        if failed > 0 && request.fail_fast {
            break;
        }
    }

    Ok(BuildResult {
        attempted: ok + failed,
        ok,
        failed,
        outcomes,
    })
}

async fn normalize(source: &BuildSource, catalog: &Catalog, bridge: &ClientBridge) -> Result<Vec<String>, VibeCraftError> {
    match source {
        BuildSource::Script(src) => sandbox::run(src, "commands"),
        BuildSource::Schematic(req) => schematic::expand(req, catalog, bridge).await,
        BuildSource::List(list) => Ok(list.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;

    fn safety() -> SafetyConfig {
        SafetyConfig {
            safety_checks_on: true,
            dangerous_allowed: false,
            max_command_length: 1500,
            build_box: None,
        }
    }

    #[tokio::test]
    async fn scenario_c_sanitizer_block_rejects_whole_build_with_zero_bridge_calls() {
        let request = BuildRequest {
            source: BuildSource::List(vec!["//regen".to_string()]),
            preview_only: false,
            fail_fast: false,
            coalesce: false,
            command_timeout: Duration::from_secs(1),
        };
        let catalog = Catalog::load().unwrap();
        let bridge = ClientBridge::new(BridgeConfig::default());
        let result = build(&request, &catalog, &bridge, &safety(), WorldEditMode::Auto, |_, _, _| {}).await;
        assert!(matches!(result, Err(VibeCraftError::SanitizationRejected { .. })));
    }

    #[tokio::test]
    async fn scenario_b_preview_marks_commands_skipped_with_zero_attempts() {
        let request = BuildRequest {
            source: BuildSource::List(vec!["/setblock 100 64 200 stone".to_string()]),
            preview_only: true,
            fail_fast: false,
            coalesce: false,
            command_timeout: Duration::from_secs(1),
        };
        let catalog = Catalog::load().unwrap();
        let bridge = ClientBridge::new(BridgeConfig::default());
        let result = build(&request, &catalog, &bridge, &safety(), WorldEditMode::Auto, |_, _, _| {})
            .await
            .unwrap();
        assert_eq!(result.attempted, 0);
        assert_eq!(result.outcomes.len(), 1);
        assert_eq!(result.outcomes[0].status, CommandStatus::SkippedPreview);
    }

    #[tokio::test]
    async fn dispatch_without_a_connected_bridge_counts_as_failed_not_aborted() {
        let request = BuildRequest {
            source: BuildSource::List(vec![
                "/setblock 0 64 0 stone".to_string(),
                "/setblock 1 64 0 stone".to_string(),
            ]),
            preview_only: false,
            fail_fast: false,
            coalesce: false,
            command_timeout: Duration::from_millis(50),
        };
        let catalog = Catalog::load().unwrap();
        let bridge = ClientBridge::new(BridgeConfig::default());
        let result = build(&request, &catalog, &bridge, &safety(), WorldEditMode::Auto, |_, _, _| {})
            .await
            .unwrap();
        assert_eq!(result.attempted, 2);
        assert_eq!(result.failed, 2);
    }

    #[tokio::test]
    async fn fail_fast_stops_after_first_failure() {
        let request = BuildRequest {
            source: BuildSource::List(vec![
                "/setblock 0 64 0 stone".to_string(),
                "/setblock 1 64 0 stone".to_string(),
                "/setblock 2 64 0 stone".to_string(),
            ]),
            preview_only: false,
            fail_fast: true,
            coalesce: false,
            command_timeout: Duration::from_millis(50),
        };
        let catalog = Catalog::load().unwrap();
        let bridge = ClientBridge::new(BridgeConfig::default());
        let result = build(&request, &catalog, &bridge, &safety(), WorldEditMode::Auto, |_, _, _| {})
            .await
            .unwrap();
        assert_eq!(result.attempted, 1);
    }
}
