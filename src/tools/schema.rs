//! JSON-schema-shaped argument descriptions for each tool (spec §6.1).

use super::ToolSpec;
use serde_json::{json, Value};

fn object(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn coord_fields() -> Value {
    json!({
        "x": { "type": "integer" },
        "y": { "type": "integer" },
        "z": { "type": "integer" },
    })
}

fn region_fields() -> Value {
    json!({
        "x1": { "type": "integer" }, "y1": { "type": "integer" }, "z1": { "type": "integer" },
        "x2": { "type": "integer" }, "y2": { "type": "integer" }, "z2": { "type": "integer" },
    })
}

pub fn all_tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "command_execute",
            description: "Sanitize and dispatch a single chat command to the game client.",
            input_schema: object(json!({ "command": { "type": "string" } }), &["command"]),
        },
        ToolSpec {
            name: "server_info",
            description: "Fetch player count, world time, and difficulty from the connected world.",
            input_schema: object(json!({}), &[]),
        },
        ToolSpec {
            name: "player_position",
            description: "Fetch the player's current coordinates.",
            input_schema: object(json!({}), &[]),
        },
        ToolSpec {
            name: "player_context",
            description: "Fetch the player's position, facing, held item, and nearby biome/light within a reach radius.",
            input_schema: object(json!({ "reach": { "type": "number", "default": 5 } }), &[]),
        },
        ToolSpec {
            name: "nearby_entities",
            description: "List entities within a radius of the player.",
            input_schema: object(json!({ "radius": { "type": "number", "default": 16 } }), &[]),
        },
        ToolSpec {
            name: "surface_level",
            description: "Return the y of the highest non-air block at a given x,z.",
            input_schema: object(json!({ "x": { "type": "integer" }, "z": { "type": "integer" } }), &["x", "z"]),
        },
        ToolSpec {
            name: "screenshot_capture",
            description: "Capture a PNG screenshot from the player's current view.",
            input_schema: object(
                json!({
                    "max_width": { "type": "integer", "default": 1280 },
                    "max_height": { "type": "integer", "default": 720 },
                }),
                &[],
            ),
        },
        ToolSpec {
            name: "region_scan",
            description: "Scan a bounded region (at most 64^3 blocks) and return a Region Snapshot.",
            input_schema: object(
                {
                    let mut f = region_fields();
                    f["include_states"] = json!({ "type": "boolean", "default": false });
                    f
                },
                &["x1", "y1", "z1", "x2", "y2", "z2"],
            ),
        },
        ToolSpec {
            name: "region_heightmap",
            description: "Compute a surface heightmap over a bounded column range (at most 256^2 columns).",
            input_schema: object(
                json!({
                    "x1": { "type": "integer" }, "z1": { "type": "integer" },
                    "x2": { "type": "integer" }, "z2": { "type": "integer" },
                }),
                &["x1", "z1", "x2", "z2"],
            ),
        },
        ToolSpec {
            name: "palette_analyze",
            description: "Histogram the block palette within a radius of a point (radius at most 64).",
            input_schema: object(
                {
                    let mut f = coord_fields();
                    f["radius"] = json!({ "type": "number" });
                    f
                },
                &["x", "y", "z", "radius"],
            ),
        },
        ToolSpec {
            name: "light_analyze",
            description: "Analyze light distribution and flag dark spots over a bounded region (at most 128^3 effective samples).",
            input_schema: object(
                {
                    let mut f = region_fields();
                    f["resolution"] = json!({ "type": "integer", "minimum": 1, "maximum": 4, "default": 1 });
                    f
                },
                &["x1", "y1", "z1", "x2", "y2", "z2"],
            ),
        },
        ToolSpec {
            name: "symmetry_check",
            description: "Check a region for mirror symmetry across an axis (at most 128^3 effective samples).",
            input_schema: object(
                {
                    let mut f = region_fields();
                    f["axis"] = json!({ "type": "string", "enum": ["x", "y", "z"] });
                    f["tolerance"] = json!({ "type": "number", "default": 0.0 });
                    f["resolution"] = json!({ "type": "integer", "minimum": 1, "maximum": 4, "default": 1 });
                    f
                },
                &["x1", "y1", "z1", "x2", "y2", "z2", "axis"],
            ),
        },
        ToolSpec {
            name: "build",
            description: "Execute a build from a command list, a restricted build script, or a schematic.",
            input_schema: object(
                json!({
                    "commands": { "type": "array", "items": { "type": "string" } },
                    "script": { "type": "string" },
                    "schematic": { "type": "object" },
                    "preview_only": { "type": "boolean", "default": false },
                    "fail_fast": { "type": "boolean", "default": false },
                    "coalesce": { "type": "boolean", "default": false },
                }),
                &[],
            ),
        },
        ToolSpec {
            name: "pattern_lookup",
            description: "Look up a named style pattern (block palette) from the built-in catalog.",
            input_schema: object(json!({ "name": { "type": "string" } }), &["name"]),
        },
        ToolSpec {
            name: "furniture_lookup",
            description: "Look up a named furniture layout from the built-in catalog.",
            input_schema: object(json!({ "name": { "type": "string" } }), &["name"]),
        },
        ToolSpec {
            name: "template_lookup",
            description: "Look up a named structure template from the built-in catalog.",
            input_schema: object(json!({ "name": { "type": "string" } }), &["name"]),
        },
        ToolSpec {
            name: "describe",
            description: "Describe this server's configuration surface and capability set for an orienting agent.",
            input_schema: object(json!({}), &[]),
        },
    ]
}
