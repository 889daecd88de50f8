//! Schematic Expander (spec §4.4) — turns a declarative schematic into an
//! ordered list of placement commands, ready for sanitization and dispatch.
//! Performs no sanitization and no batching itself.

pub mod grammar;
pub mod rotation;
pub mod shapes;

use crate::bridge::protocol::MessageType;
use crate::bridge::ClientBridge;
use crate::catalog::Catalog;
use crate::error::VibeCraftError;
use grammar::{expand_layers, is_air_symbol, YSpec};
use rotation::{rotate_block_spec, rotate_grid, Facing};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anchor {
    Fixed { x: i64, y: i64, z: i64 },
    Player,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchematicRequest {
    pub anchor: Anchor,
    /// Palette symbol -> catalog block name.
    pub palette: HashMap<String, String>,
    /// Raw `[y_or_range, row_string]` pairs; mutually exclusive with `shape`.
    #[serde(default)]
    pub layers: Option<Vec<(String, String)>>,
    #[serde(default)]
    pub shape: Option<String>,
    #[serde(default = "default_facing")]
    pub facing: String,
}

fn default_facing() -> String {
    "north".to_string()
}

/// Resolve the anchor, expand layers, apply rotation, and emit commands in
/// bottom-to-top / north-to-south / west-to-east order, skipping air.
pub async fn expand(
    request: &SchematicRequest,
    catalog: &Catalog,
    bridge: &ClientBridge,
) -> Result<Vec<String>, VibeCraftError> {
    let (ax, ay, az) = resolve_anchor(&request.anchor, bridge).await?;
    let facing = Facing::parse(&request.facing)
        .ok_or_else(|| VibeCraftError::SchematicMalformed(format!("unknown facing '{}'", request.facing)))?;
    let steps = facing_steps(facing);

    let layers = if let Some(shape) = &request.shape {
        if request.layers.is_some() {
            return Err(VibeCraftError::SchematicMalformed(
                "schematic must not specify both 'shape' and 'layers'".to_string(),
            ));
        }
        shapes::parse_shape(shape)?
    } else {
        let raw = request
            .layers
            .as_ref()
            .ok_or_else(|| VibeCraftError::SchematicMalformed("schematic has neither 'shape' nor 'layers'".to_string()))?;
        let mut parsed = Vec::with_capacity(raw.len());
        for (y_raw, row_string) in raw {
            parsed.push((YSpec::parse(y_raw)?, row_string.clone()));
        }
        expand_layers(&parsed)?
    };

    let mut commands = Vec::new();
    for (y, grid) in layers {
        let rotated_grid = rotate_grid(&grid, steps);
        for (row_idx, row) in rotated_grid.iter().enumerate() {
            for (col_idx, symbol) in row.iter().enumerate() {
                if is_air_symbol(symbol) {
                    continue;
                }
                let block_name = request
                    .palette
                    .get(symbol)
                    .ok_or_else(|| VibeCraftError::SchematicMalformed(format!("undefined palette symbol '{symbol}'")))?;
                let spec = catalog.resolve_block(block_name);
                let rotated_spec = rotate_block_spec(&spec, steps);

                let x = ax + col_idx as i64;
                let yy = ay + y;
                let z = az + row_idx as i64;
                commands.push(format!("/setblock {x} {yy} {z} {}", rotated_spec.to_state_string()));
            }
        }
    }

    Ok(commands)
}

fn facing_steps(facing: Facing) -> u8 {
    match facing {
        Facing::North => 0,
        Facing::East => 1,
        Facing::South => 2,
        Facing::West => 3,
    }
}

async fn resolve_anchor(anchor: &Anchor, bridge: &ClientBridge) -> Result<(i64, i64, i64), VibeCraftError> {
    match anchor {
        Anchor::Fixed { x, y, z } => Ok((*x, *y, *z)),
        Anchor::Player => {
            let result = bridge
                .request(MessageType::PlayerContext, serde_json::json!({ "reach": 0 }), std::time::Duration::from_secs(10))
                .await?;
            let x = result.get("x").and_then(|v| v.as_f64()).unwrap_or(0.0) as i64;
            let y = result.get("y").and_then(|v| v.as_f64()).unwrap_or(0.0) as i64;
            let z = result.get("z").and_then(|v| v.as_f64()).unwrap_or(0.0) as i64;
            Ok((x, y, z))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;

    fn sample_catalog() -> Catalog {
        Catalog::load().unwrap()
    }

    #[tokio::test]
    async fn scenario_d_emits_eight_non_center_cells() {
        let request = SchematicRequest {
            anchor: Anchor::Fixed { x: 100, y: 64, z: 200 },
            palette: HashMap::from([("S".to_string(), "stone_bricks".to_string())]),
            layers: Some(vec![("0".to_string(), "S*3|S . S|S*3".to_string())]),
            shape: None,
            facing: "north".to_string(),
        };
        let catalog = sample_catalog();
        let bridge = ClientBridge::new(BridgeConfig::default());
        let commands = expand(&request, &catalog, &bridge).await.unwrap();
        assert_eq!(commands.len(), 8);
        assert!(!commands.iter().any(|c| c.starts_with("/setblock 101 64 201 ")));
        assert_eq!(commands[0], "/setblock 100 64 200 stone_bricks");
    }

    #[tokio::test]
    async fn determinism_same_input_same_output() {
        let request = SchematicRequest {
            anchor: Anchor::Fixed { x: 0, y: 0, z: 0 },
            palette: HashMap::from([("S".to_string(), "stone".to_string())]),
            layers: Some(vec![("0-2".to_string(), "S*2".to_string())]),
            shape: None,
            facing: "east".to_string(),
        };
        let catalog = sample_catalog();
        let bridge = ClientBridge::new(BridgeConfig::default());
        let a = expand(&request, &catalog, &bridge).await.unwrap();
        let b = expand(&request, &catalog, &bridge).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn rotation_east_four_times_equals_north() {
        let mut request = SchematicRequest {
            anchor: Anchor::Fixed { x: 0, y: 0, z: 0 },
            palette: HashMap::from([("S".to_string(), "stone".to_string())]),
            layers: Some(vec![("0".to_string(), "S S . S|S . S S".to_string())]),
            shape: None,
            facing: "north".to_string(),
        };
        let catalog = sample_catalog();
        let bridge = ClientBridge::new(BridgeConfig::default());
        let identity = expand(&request, &catalog, &bridge).await.unwrap();

        request.facing = "east".to_string();
        let once = expand(&request, &catalog, &bridge).await.unwrap();
        assert_ne!(once, identity);

        // Applying `east` once more three times is not expressible through
        // this request shape directly, so instead assert the rotation
        // helper's own 4x = identity property (covered in rotation::tests);
        // here we just confirm north truly is a no-op rotation.
        let north_again = expand(&request.clone_with_facing("north"), &catalog, &bridge).await.unwrap();
        assert_eq!(north_again, identity);
    }

    #[tokio::test]
    async fn missing_palette_symbol_is_schematic_malformed() {
        let request = SchematicRequest {
            anchor: Anchor::Fixed { x: 0, y: 0, z: 0 },
            palette: HashMap::new(),
            layers: Some(vec![("0".to_string(), "S".to_string())]),
            shape: None,
            facing: "north".to_string(),
        };
        let catalog = sample_catalog();
        let bridge = ClientBridge::new(BridgeConfig::default());
        assert!(matches!(expand(&request, &catalog, &bridge).await, Err(VibeCraftError::SchematicMalformed(_))));
    }

    #[tokio::test]
    async fn shape_and_layers_together_is_malformed() {
        let request = SchematicRequest {
            anchor: Anchor::Fixed { x: 0, y: 0, z: 0 },
            palette: HashMap::new(),
            layers: Some(vec![("0".to_string(), "S".to_string())]),
            shape: Some("fill:1x1:S".to_string()),
            facing: "north".to_string(),
        };
        let catalog = sample_catalog();
        let bridge = ClientBridge::new(BridgeConfig::default());
        assert!(matches!(expand(&request, &catalog, &bridge).await, Err(VibeCraftError::SchematicMalformed(_))));
    }

    impl SchematicRequest {
        fn clone_with_facing(&self, facing: &str) -> Self {
            let mut copy = self.clone();
            copy.facing = facing.to_string();
            copy
        }
    }
}
