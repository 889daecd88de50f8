//! Region Snapshot RLE encoding/decoding (spec §6.2).
//!
//! A `palette` list of block-id strings, and a `blocks` run sequence whose
//! elements are either a bare palette index (a run of length 1) or a pair
//! `[index, count]`. Iteration order is `y` outermost, then `z`, then `x`.

use crate::error::VibeCraftError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimensions {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl Dimensions {
    pub fn volume(&self) -> usize {
        self.x * self.y * self.z
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionSnapshot {
    pub palette: Vec<String>,
    pub blocks: Vec<Value>,
    #[serde(default)]
    pub entity_count: Option<u32>,
}

/// Encode a flat, `y`-outer/`z`/`x`-inner sequence of block ids into RLE form.
pub fn encode(block_ids: &[String], dims: &Dimensions) -> Result<RegionSnapshot, VibeCraftError> {
    if block_ids.len() != dims.volume() {
        return Err(VibeCraftError::SchematicMalformed(format!(
            "block id sequence length {} does not match dimensions volume {}",
            block_ids.len(),
            dims.volume()
        )));
    }

    let mut palette: Vec<String> = Vec::new();
    let mut indices: Vec<usize> = Vec::with_capacity(block_ids.len());
    for id in block_ids {
        let idx = match palette.iter().position(|p| p == id) {
            Some(i) => i,
            None => {
                palette.push(id.clone());
                palette.len() - 1
            }
        };
        indices.push(idx);
    }

    let mut runs = Vec::new();
    let mut i = 0;
    while i < indices.len() {
        let idx = indices[i];
        let mut count = 1usize;
        while i + count < indices.len() && indices[i + count] == idx {
            count += 1;
        }
        runs.push(if count == 1 {
            Value::from(idx)
        } else {
            Value::from(vec![idx, count])
        });
        i += count;
    }

    Ok(RegionSnapshot {
        palette,
        blocks: runs,
        entity_count: None,
    })
}

/// Decode a snapshot back into a flat, `y`-outer/`z`/`x`-inner sequence of
/// block ids. The result always has exactly `dims.volume()` entries
/// (invariant 7), or the snapshot is malformed.
pub fn decode(snapshot: &RegionSnapshot, dims: &Dimensions) -> Result<Vec<String>, VibeCraftError> {
    let mut out = Vec::with_capacity(dims.volume());

    for run in &snapshot.blocks {
        let (idx, count) = parse_run(run)?;
        let block_id = snapshot
            .palette
            .get(idx)
            .ok_or_else(|| VibeCraftError::SchematicMalformed(format!("palette index {idx} out of range")))?;
        for _ in 0..count {
            out.push(block_id.clone());
        }
    }

    if out.len() != dims.volume() {
        return Err(VibeCraftError::SchematicMalformed(format!(
            "decoded {} blocks, expected {} for dimensions {}x{}x{}",
            out.len(),
            dims.volume(),
            dims.x,
            dims.y,
            dims.z
        )));
    }

    Ok(out)
}

fn parse_run(value: &Value) -> Result<(usize, usize), VibeCraftError> {
    if let Some(idx) = value.as_u64() {
        return Ok((idx as usize, 1));
    }
    if let Some(arr) = value.as_array() {
        if arr.len() == 2 {
            if let (Some(idx), Some(count)) = (arr[0].as_u64(), arr[1].as_u64()) {
                return Ok((idx as usize, count as usize));
            }
        }
    }
    Err(VibeCraftError::SchematicMalformed(format!("ill-formed run entry {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_order_and_length() {
        let dims = Dimensions { x: 2, y: 1, z: 2 };
        let ids = vec!["stone".to_string(), "stone".to_string(), "air".to_string(), "stone".to_string()];
        let snapshot = encode(&ids, &dims).unwrap();
        let decoded = decode(&snapshot, &dims).unwrap();
        assert_eq!(decoded, ids);
    }

    #[test]
    fn single_occurrence_runs_are_bare_indices() {
        let dims = Dimensions { x: 1, y: 1, z: 3 };
        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let snapshot = encode(&ids, &dims).unwrap();
        assert!(snapshot.blocks.iter().all(|v| v.is_u64()));
    }

    #[test]
    fn repeated_runs_are_pairs() {
        let dims = Dimensions { x: 4, y: 1, z: 1 };
        let ids = vec!["stone".to_string(); 4];
        let snapshot = encode(&ids, &dims).unwrap();
        assert_eq!(snapshot.blocks.len(), 1);
        assert!(snapshot.blocks[0].is_array());
    }

    #[test]
    fn decode_rejects_length_mismatch() {
        let dims = Dimensions { x: 2, y: 2, z: 2 };
        let snapshot = RegionSnapshot {
            palette: vec!["stone".to_string()],
            blocks: vec![Value::from(vec![0, 3])],
            entity_count: None,
        };
        assert!(decode(&snapshot, &dims).is_err());
    }

    #[test]
    fn decode_rejects_out_of_range_palette_index() {
        let dims = Dimensions { x: 1, y: 1, z: 1 };
        let snapshot = RegionSnapshot {
            palette: vec![],
            blocks: vec![Value::from(5u64)],
            entity_count: None,
        };
        assert!(decode(&snapshot, &dims).is_err());
    }

    #[test]
    fn encode_rejects_length_mismatch_with_dims() {
        let dims = Dimensions { x: 2, y: 2, z: 2 };
        let ids = vec!["stone".to_string()];
        assert!(encode(&ids, &dims).is_err());
    }
}
