//! Catalog — static, read-only reference data loaded once at startup
//! (SPEC_FULL.md §4.8): block-spec aliases, furniture layouts, structure
//! templates, and style palettes. Nothing here is mutated after
//! [`Catalog::load`] returns; the Tool Handlers consult it without contact
//! with the Bridge (spec §4.6, "Pattern lookup / furniture lookup / template
//! lookup").

use crate::error::VibeCraftError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const BLOCKS_JSON: &str = include_str!("data/blocks.json");
const FURNITURE_JSON: &str = include_str!("data/furniture.json");
const TEMPLATES_JSON: &str = include_str!("data/templates.json");
const PALETTES_JSON: &str = include_str!("data/palettes.json");

/// A canonical block specification: a base id plus the block-state
/// orientation attributes the Schematic Expander rotates (spec §4.4 step 5).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub half: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hinge: Option<String>,
}

impl BlockSpec {
    pub fn simple(id: &str) -> Self {
        Self {
            id: id.to_string(),
            facing: None,
            axis: None,
            half: None,
            shape: None,
            hinge: None,
        }
    }

    /// The `id[key=value,...]` block-state string used in emitted commands.
    pub fn to_state_string(&self) -> String {
        let mut attrs = Vec::new();
        if let Some(v) = &self.facing {
            attrs.push(format!("facing={v}"));
        }
        if let Some(v) = &self.axis {
            attrs.push(format!("axis={v}"));
        }
        if let Some(v) = &self.half {
            attrs.push(format!("half={v}"));
        }
        if let Some(v) = &self.shape {
            attrs.push(format!("shape={v}"));
        }
        if let Some(v) = &self.hinge {
            attrs.push(format!("hinge={v}"));
        }
        if attrs.is_empty() {
            self.id.clone()
        } else {
            format!("{}[{}]", self.id, attrs.join(","))
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FurnitureLayout {
    pub name: String,
    pub description: String,
    pub footprint: (u32, u32),
    pub pieces: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StructureTemplate {
    pub name: String,
    pub description: String,
    pub schematic: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StylePalette {
    pub name: String,
    pub blocks: HashMap<String, String>,
}

/// All embedded reference data, loaded once at process start.
pub struct Catalog {
    block_aliases: HashMap<String, BlockSpec>,
    furniture: HashMap<String, FurnitureLayout>,
    templates: HashMap<String, StructureTemplate>,
    palettes: HashMap<String, StylePalette>,
}

impl Catalog {
    pub fn load() -> anyhow::Result<Self> {
        let block_aliases: HashMap<String, BlockSpec> = serde_json::from_str(BLOCKS_JSON)?;
        let furniture_list: Vec<FurnitureLayout> = serde_json::from_str(FURNITURE_JSON)?;
        let template_list: Vec<StructureTemplate> = serde_json::from_str(TEMPLATES_JSON)?;
        let palette_list: Vec<StylePalette> = serde_json::from_str(PALETTES_JSON)?;

        Ok(Self {
            block_aliases,
            furniture: furniture_list.into_iter().map(|f| (f.name.clone(), f)).collect(),
            templates: template_list.into_iter().map(|t| (t.name.clone(), t)).collect(),
            palettes: palette_list.into_iter().map(|p| (p.name.clone(), p)).collect(),
        })
    }

    pub fn resolve_block(&self, symbol: &str) -> BlockSpec {
        self.block_aliases
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| BlockSpec::simple(symbol))
    }

    pub fn furniture(&self, name: &str) -> Result<&FurnitureLayout, VibeCraftError> {
        self.furniture
            .get(name)
            .ok_or_else(|| VibeCraftError::CatalogMiss(format!("furniture '{name}'")))
    }

    pub fn template(&self, name: &str) -> Result<&StructureTemplate, VibeCraftError> {
        self.templates
            .get(name)
            .ok_or_else(|| VibeCraftError::CatalogMiss(format!("template '{name}'")))
    }

    pub fn palette(&self, name: &str) -> Result<&StylePalette, VibeCraftError> {
        self.palettes
            .get(name)
            .ok_or_else(|| VibeCraftError::CatalogMiss(format!("palette '{name}'")))
    }

    pub fn list_furniture(&self) -> Vec<&str> {
        self.furniture.keys().map(|s| s.as_str()).collect()
    }

    pub fn list_templates(&self) -> Vec<&str> {
        self.templates.keys().map(|s| s.as_str()).collect()
    }

    pub fn list_palettes(&self) -> Vec<&str> {
        self.palettes.keys().map(|s| s.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_data_parses_at_load_time() {
        let catalog = Catalog::load().expect("embedded catalog JSON must be well-formed");
        assert!(!catalog.list_templates().is_empty());
    }

    #[test]
    fn unknown_symbol_resolves_to_itself_as_a_plain_block_id() {
        let catalog = Catalog::load().unwrap();
        let spec = catalog.resolve_block("totally_unknown_symbol");
        assert_eq!(spec.id, "totally_unknown_symbol");
    }

    #[test]
    fn missing_furniture_is_a_catalog_miss() {
        let catalog = Catalog::load().unwrap();
        assert!(matches!(catalog.furniture("does-not-exist"), Err(VibeCraftError::CatalogMiss(_))));
    }

    #[test]
    fn block_state_string_omits_absent_attributes() {
        let spec = BlockSpec::simple("stone");
        assert_eq!(spec.to_state_string(), "stone");
    }

    #[test]
    fn block_state_string_includes_present_attributes() {
        let mut spec = BlockSpec::simple("oak_stairs");
        spec.facing = Some("east".to_string());
        spec.half = Some("bottom".to_string());
        assert_eq!(spec.to_state_string(), "oak_stairs[facing=east,half=bottom]");
    }
}
