//! Handler bodies. Payload validation (dimension bounds, resolution clamp,
//! axis enum) happens before any Bridge call, per spec §4.6.

use super::AppState;
use crate::bridge::protocol::MessageType;
use crate::build_engine::{build as run_build, BuildRequest, BuildSource};
use crate::error::VibeCraftError;
use crate::region::{self, Dimensions, RegionSnapshot};
use crate::schematic::SchematicRequest;
use serde_json::{json, Value};
use std::time::Duration;

const REGION_SCAN_MAX_VOLUME: i64 = 64 * 64 * 64;
const HEIGHTMAP_MAX_COLUMNS: i64 = 256 * 256;
const ANALYZE_MAX_SAMPLES: i64 = 128 * 128 * 128;
const PALETTE_MAX_RADIUS: f64 = 64.0;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn dispatch(state: &AppState, name: &str, args: Value) -> Result<Value, VibeCraftError> {
    match name {
        "command_execute" => command_execute(state, args).await,
        "server_info" => simple_call(state, MessageType::ServerInfo, json!({})).await,
        "player_position" => player_position(state).await,
        "player_context" => player_context(state, args).await,
        "nearby_entities" => nearby_entities(state, args).await,
        "surface_level" => surface_level(state, args).await,
        "screenshot_capture" => screenshot_capture(state, args).await,
        "region_scan" => region_scan(state, args).await,
        "region_heightmap" => region_heightmap(state, args).await,
        "palette_analyze" => palette_analyze(state, args).await,
        "light_analyze" => light_analyze(state, args).await,
        "symmetry_check" => symmetry_check(state, args).await,
        "build" => build(state, args).await,
        "pattern_lookup" => pattern_lookup(state, args),
        "furniture_lookup" => furniture_lookup(state, args),
        "template_lookup" => template_lookup(state, args),
        "describe" => describe(state),
        other => Err(VibeCraftError::InvalidArgs(format!("unknown tool '{other}'"))),
    }
}

fn require_string(args: &Value, field: &str) -> Result<String, VibeCraftError> {
    args.get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| VibeCraftError::InvalidArgs(format!("missing or non-string field '{field}'")))
}

fn require_int(args: &Value, field: &str) -> Result<i64, VibeCraftError> {
    args.get(field)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| VibeCraftError::InvalidArgs(format!("missing or non-integer field '{field}'")))
}

fn optional_number(args: &Value, field: &str, default: f64) -> f64 {
    args.get(field).and_then(|v| v.as_f64()).unwrap_or(default)
}

async fn simple_call(state: &AppState, message_type: MessageType, payload: Value) -> Result<Value, VibeCraftError> {
    state.bridge.request(message_type, payload, DEFAULT_TIMEOUT).await
}

async fn command_execute(state: &AppState, args: Value) -> Result<Value, VibeCraftError> {
    let command = require_string(&args, "command")?;
    if let crate::sanitizer::SanitizeResult::Rejected { reason } = crate::sanitizer::sanitize(&command, &state.config.safety) {
        return Err(VibeCraftError::SanitizationRejected { command, rule: reason });
    }
    simple_call(state, MessageType::CommandExecute, json!({ "command": command })).await
}

async fn player_position(state: &AppState) -> Result<Value, VibeCraftError> {
    let context = simple_call(state, MessageType::PlayerContext, json!({ "reach": 0 })).await?;
    Ok(json!({
        "x": context.get("x"),
        "y": context.get("y"),
        "z": context.get("z"),
    }))
}

async fn player_context(state: &AppState, args: Value) -> Result<Value, VibeCraftError> {
    let reach = optional_number(&args, "reach", 5.0);
    simple_call(state, MessageType::PlayerContext, json!({ "reach": reach })).await
}

async fn nearby_entities(state: &AppState, args: Value) -> Result<Value, VibeCraftError> {
    let radius = optional_number(&args, "radius", 16.0);
    simple_call(state, MessageType::PlayerEntities, json!({ "radius": radius })).await
}

async fn surface_level(state: &AppState, args: Value) -> Result<Value, VibeCraftError> {
    let x = require_int(&args, "x")?;
    let z = require_int(&args, "z")?;
    let result = simple_call(state, MessageType::RegionHeightmap, json!({ "x1": x, "z1": z, "x2": x, "z2": z })).await?;
    Ok(result)
}

async fn screenshot_capture(state: &AppState, args: Value) -> Result<Value, VibeCraftError> {
    let max_width = args.get("max_width").and_then(|v| v.as_i64()).unwrap_or(1280);
    let max_height = args.get("max_height").and_then(|v| v.as_i64()).unwrap_or(720);
    simple_call(
        state,
        MessageType::ScreenshotCapture,
        json!({ "max_width": max_width, "max_height": max_height }),
    )
    .await
}

fn region_bounds(args: &Value) -> Result<(i64, i64, i64, i64, i64, i64), VibeCraftError> {
    Ok((
        require_int(args, "x1")?,
        require_int(args, "y1")?,
        require_int(args, "z1")?,
        require_int(args, "x2")?,
        require_int(args, "y2")?,
        require_int(args, "z2")?,
    ))
}

fn volume(x1: i64, y1: i64, z1: i64, x2: i64, y2: i64, z2: i64) -> i64 {
    ((x2 - x1).abs() + 1) * ((y2 - y1).abs() + 1) * ((z2 - z1).abs() + 1)
}

fn dims_of(x1: i64, y1: i64, z1: i64, x2: i64, y2: i64, z2: i64) -> Dimensions {
    Dimensions {
        x: ((x2 - x1).abs() + 1) as usize,
        y: ((y2 - y1).abs() + 1) as usize,
        z: ((z2 - z1).abs() + 1) as usize,
    }
}

async fn region_scan(state: &AppState, args: Value) -> Result<Value, VibeCraftError> {
    let (x1, y1, z1, x2, y2, z2) = region_bounds(&args)?;
    if volume(x1, y1, z1, x2, y2, z2) > REGION_SCAN_MAX_VOLUME {
        return Err(VibeCraftError::InvalidArgs(format!(
            "region scan exceeds the {REGION_SCAN_MAX_VOLUME}-block cap"
        )));
    }
    let include_states = args.get("include_states").and_then(|v| v.as_bool()).unwrap_or(false);
    let result = simple_call(
        state,
        MessageType::RegionScan,
        json!({ "x1": x1, "y1": y1, "z1": z1, "x2": x2, "y2": y2, "z2": z2, "include_states": include_states }),
    )
    .await?;

    // Validate the peer's Region Snapshot before handing it back: a
    // malformed or malicious snapshot must not pass through unchecked
    // (invariant 7, exercised here rather than only in region::tests).
    let snapshot: RegionSnapshot = serde_json::from_value(result.clone())
        .map_err(|e| VibeCraftError::SchematicMalformed(format!("malformed region snapshot from peer: {e}")))?;
    region::decode(&snapshot, &dims_of(x1, y1, z1, x2, y2, z2))?;

    Ok(result)
}

async fn region_heightmap(state: &AppState, args: Value) -> Result<Value, VibeCraftError> {
    let x1 = require_int(&args, "x1")?;
    let z1 = require_int(&args, "z1")?;
    let x2 = require_int(&args, "x2")?;
    let z2 = require_int(&args, "z2")?;
    let columns = ((x2 - x1).abs() + 1) * ((z2 - z1).abs() + 1);
    if columns > HEIGHTMAP_MAX_COLUMNS {
        return Err(VibeCraftError::InvalidArgs(format!(
            "heightmap exceeds the {HEIGHTMAP_MAX_COLUMNS}-column cap"
        )));
    }
    let result = simple_call(state, MessageType::RegionHeightmap, json!({ "x1": x1, "z1": z1, "x2": x2, "z2": z2 })).await?;

    let rows = result
        .as_array()
        .ok_or_else(|| VibeCraftError::SchematicMalformed("heightmap response is not an array".to_string()))?;
    if rows.len() as i64 != columns {
        return Err(VibeCraftError::SchematicMalformed(format!(
            "heightmap returned {} rows, expected {columns} columns",
            rows.len()
        )));
    }

    Ok(result)
}

async fn palette_analyze(state: &AppState, args: Value) -> Result<Value, VibeCraftError> {
    let x = require_int(&args, "x")?;
    let y = require_int(&args, "y")?;
    let z = require_int(&args, "z")?;
    let radius = args
        .get("radius")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| VibeCraftError::InvalidArgs("missing or non-numeric field 'radius'".to_string()))?;
    if radius > PALETTE_MAX_RADIUS {
        return Err(VibeCraftError::InvalidArgs(format!("radius exceeds the {PALETTE_MAX_RADIUS} cap")));
    }
    simple_call(state, MessageType::PaletteAnalyze, json!({ "x": x, "y": y, "z": z, "radius": radius })).await
}

fn clamp_resolution(args: &Value) -> Result<i64, VibeCraftError> {
    let resolution = args.get("resolution").and_then(|v| v.as_i64()).unwrap_or(1);
    if !(1..=4).contains(&resolution) {
        return Err(VibeCraftError::InvalidArgs("resolution must be between 1 and 4".to_string()));
    }
    Ok(resolution)
}

async fn light_analyze(state: &AppState, args: Value) -> Result<Value, VibeCraftError> {
    let (x1, y1, z1, x2, y2, z2) = region_bounds(&args)?;
    let resolution = clamp_resolution(&args)?;
    let effective = volume(x1, y1, z1, x2, y2, z2) / (resolution * resolution * resolution).max(1);
    if effective > ANALYZE_MAX_SAMPLES {
        return Err(VibeCraftError::InvalidArgs(format!(
            "light analysis exceeds the {ANALYZE_MAX_SAMPLES}-sample cap"
        )));
    }
    simple_call(
        state,
        MessageType::LightAnalyze,
        json!({ "x1": x1, "y1": y1, "z1": z1, "x2": x2, "y2": y2, "z2": z2, "resolution": resolution }),
    )
    .await
}

async fn symmetry_check(state: &AppState, args: Value) -> Result<Value, VibeCraftError> {
    let (x1, y1, z1, x2, y2, z2) = region_bounds(&args)?;
    let resolution = clamp_resolution(&args)?;
    let axis = require_string(&args, "axis")?;
    if !["x", "y", "z"].contains(&axis.as_str()) {
        return Err(VibeCraftError::InvalidArgs("axis must be one of x, y, z".to_string()));
    }
    let effective = volume(x1, y1, z1, x2, y2, z2) / (resolution * resolution * resolution).max(1);
    if effective > ANALYZE_MAX_SAMPLES {
        return Err(VibeCraftError::InvalidArgs(format!(
            "symmetry check exceeds the {ANALYZE_MAX_SAMPLES}-sample cap"
        )));
    }
    let tolerance = optional_number(&args, "tolerance", 0.0);
    simple_call(
        state,
        MessageType::SymmetryCheck,
        json!({ "x1": x1, "y1": y1, "z1": z1, "x2": x2, "y2": y2, "z2": z2, "axis": axis, "tolerance": tolerance, "resolution": resolution }),
    )
    .await
}

async fn build(state: &AppState, args: Value) -> Result<Value, VibeCraftError> {
    let source = if let Some(commands) = args.get("commands").and_then(|v| v.as_array()) {
        let list = commands
            .iter()
            .map(|v| v.as_str().map(|s| s.to_string()))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| VibeCraftError::InvalidArgs("'commands' must be an array of strings".to_string()))?;
        BuildSource::List(list)
    } else if let Some(script) = args.get("script").and_then(|v| v.as_str()) {
        BuildSource::Script(script.to_string())
    } else if let Some(schematic) = args.get("schematic") {
        let request: SchematicRequest = serde_json::from_value(schematic.clone())
            .map_err(|e| VibeCraftError::InvalidArgs(format!("invalid schematic: {e}")))?;
        BuildSource::Schematic(request)
    } else {
        return Err(VibeCraftError::InvalidArgs(
            "build requires one of 'commands', 'script', or 'schematic'".to_string(),
        ));
    };

    let request = BuildRequest {
        source,
        preview_only: args.get("preview_only").and_then(|v| v.as_bool()).unwrap_or(false),
        fail_fast: args.get("fail_fast").and_then(|v| v.as_bool()).unwrap_or(false),
        coalesce: args.get("coalesce").and_then(|v| v.as_bool()).unwrap_or(false),
        command_timeout: Duration::from_secs(state.config.bridge.request_timeout_secs),
    };

    let result = run_build(
        &request,
        &state.catalog,
        &state.bridge,
        &state.config.safety,
        state.config.worldedit_mode,
        |_, _, _| {},
    )
    .await?;

    Ok(json!({
        "attempted": result.attempted,
        "ok": result.ok,
        "failed": result.failed,
        "outcomes": result.outcomes.iter().map(|o| json!({
            "command": o.command,
            "status": match &o.status {
                crate::build_engine::CommandStatus::Ok => "ok".to_string(),
                crate::build_engine::CommandStatus::Failed(e) => format!("failed: {e}"),
                crate::build_engine::CommandStatus::SkippedPreview => "skipped: preview".to_string(),
            },
        })).collect::<Vec<_>>(),
    }))
}

fn pattern_lookup(state: &AppState, args: Value) -> Result<Value, VibeCraftError> {
    let name = require_string(&args, "name")?;
    let palette = state.catalog.palette(&name)?;
    Ok(json!({ "name": palette.name, "blocks": palette.blocks }))
}

fn furniture_lookup(state: &AppState, args: Value) -> Result<Value, VibeCraftError> {
    let name = require_string(&args, "name")?;
    let layout = state.catalog.furniture(&name)?;
    Ok(json!({
        "name": layout.name,
        "description": layout.description,
        "footprint": layout.footprint,
        "pieces": layout.pieces,
    }))
}

fn template_lookup(state: &AppState, args: Value) -> Result<Value, VibeCraftError> {
    let name = require_string(&args, "name")?;
    let template = state.catalog.template(&name)?;
    Ok(json!({
        "name": template.name,
        "description": template.description,
        "schematic": template.schematic,
    }))
}

fn describe(state: &AppState) -> Result<Value, VibeCraftError> {
    Ok(json!({
        "bridge_url": state.config.bridge.url(),
        "worldedit_mode": format!("{:?}", state.config.worldedit_mode),
        "safety_checks_on": state.config.safety.safety_checks_on,
        "dangerous_allowed": state.config.safety.dangerous_allowed,
        "build_box": state.config.safety.build_box,
        "templates": state.catalog.list_templates(),
        "furniture": state.catalog.list_furniture(),
        "patterns": state.catalog.list_palettes(),
    }))
}
