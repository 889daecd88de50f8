//! Compact RLE grammar decoder and layer-spec normalization (spec §6.3).

use crate::error::VibeCraftError;

/// One resolved layer: `grid[row][col]` is a palette symbol, row increasing
/// south, col increasing east, following spec §4.4 step 4.
pub type Grid = Vec<Vec<String>>;

/// `(y, grid)` pairs, sorted ascending by `y`, one per vertical offset from
/// the anchor.
pub type Layers = Vec<(i64, Grid)>;

/// Expand a raw layer list — `[y_or_range, row_string]` pairs — into fully
/// resolved per-y grids. Vertical-offset ranges (`"i-j"`) replicate the same
/// row string across each enumerated `y`.
pub fn expand_layers(raw: &[(YSpec, String)]) -> Result<Layers, VibeCraftError> {
    let mut out = Vec::new();
    for (y_spec, row_string) in raw {
        let grid = decode_rows(row_string)?;
        for y in y_spec.enumerate()? {
            out.push((y, grid.clone()));
        }
    }
    out.sort_by_key(|(y, _)| *y);
    Ok(out)
}

#[derive(Debug, Clone)]
pub enum YSpec {
    Single(i64),
    Range(i64, i64),
}

impl YSpec {
    pub fn parse(raw: &str) -> Result<Self, VibeCraftError> {
        if let Some((lo, hi)) = raw.split_once('-') {
            // Support a leading '-' on `lo` (negative y) by requiring at
            // least one more '-' beyond an optional sign.
            let lo_parsed = lo.parse::<i64>();
            let hi_parsed = hi.parse::<i64>();
            if let (Ok(lo), Ok(hi)) = (lo_parsed, hi_parsed) {
                return Ok(YSpec::Range(lo, hi));
            }
            return Err(VibeCraftError::SchematicMalformed(format!("ill-formed y range '{raw}'")));
        }
        raw.parse::<i64>()
            .map(YSpec::Single)
            .map_err(|_| VibeCraftError::SchematicMalformed(format!("ill-formed y value '{raw}'")))
    }

    fn enumerate(&self) -> Result<Vec<i64>, VibeCraftError> {
        match self {
            YSpec::Single(y) => Ok(vec![*y]),
            YSpec::Range(lo, hi) => {
                if lo > hi {
                    return Err(VibeCraftError::SchematicMalformed(format!(
                        "y range {lo}-{hi} has lo greater than hi"
                    )));
                }
                Ok((*lo..=*hi).collect())
            }
        }
    }
}

/// Decode a row-string into a 2D grid of palette symbols.
///
/// Rows are separated by `|`; within a row, tokens are separated by spaces.
/// A token `S*N` repeats symbol `S` `N` times horizontally. A row suffixed
/// with `~N` (after the last token, no space before `~`) repeats the whole
/// row `N` times vertically (south).
pub fn decode_rows(row_string: &str) -> Result<Grid, VibeCraftError> {
    let mut grid = Vec::new();
    for raw_row in row_string.split('|') {
        let (body, repeat) = split_row_repeat(raw_row)?;
        let row = decode_row_tokens(body)?;
        for _ in 0..repeat {
            grid.push(row.clone());
        }
    }
    Ok(grid)
}

fn split_row_repeat(raw_row: &str) -> Result<(&str, u32), VibeCraftError> {
    if let Some(idx) = raw_row.rfind('~') {
        let (body, suffix) = raw_row.split_at(idx);
        let n: u32 = suffix[1..]
            .trim()
            .parse()
            .map_err(|_| VibeCraftError::SchematicMalformed(format!("ill-formed row repeat '{raw_row}'")))?;
        return Ok((body.trim(), n));
    }
    Ok((raw_row.trim(), 1))
}

fn decode_row_tokens(body: &str) -> Result<Vec<String>, VibeCraftError> {
    let mut row = Vec::new();
    for token in body.split_whitespace() {
        if let Some((symbol, count)) = token.split_once('*') {
            let n: u32 = count
                .parse()
                .map_err(|_| VibeCraftError::SchematicMalformed(format!("ill-formed repeat token '{token}'")))?;
            for _ in 0..n {
                row.push(symbol.to_string());
            }
        } else {
            row.push(token.to_string());
        }
    }
    Ok(row)
}

/// Reserved air symbols (spec §6.3).
pub fn is_air_symbol(symbol: &str) -> bool {
    matches!(symbol, "." | "_" | "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_star_repeat_and_pipe_rows() {
        let grid = decode_rows("S*3|S . S|S*3").unwrap();
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[0], vec!["S", "S", "S"]);
        assert_eq!(grid[1], vec!["S", ".", "S"]);
        assert_eq!(grid[2], vec!["S", "S", "S"]);
    }

    #[test]
    fn decodes_tilde_row_repeat() {
        let grid = decode_rows("S S~3").unwrap();
        assert_eq!(grid.len(), 3);
        assert!(grid.iter().all(|r| r == &vec!["S".to_string(), "S".to_string()]));
    }

    #[test]
    fn y_range_expands_inclusive() {
        let spec = YSpec::parse("1-3").unwrap();
        assert_eq!(spec.enumerate().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn y_range_rejects_inverted_bounds() {
        let spec = YSpec::parse("3-1").unwrap();
        assert!(spec.enumerate().is_err());
    }

    #[test]
    fn air_symbols_recognized() {
        assert!(is_air_symbol("."));
        assert!(is_air_symbol("_"));
        assert!(!is_air_symbol("S"));
    }
}
