//! Shape primitives for the `s` (shape) schematic key (spec §6.3).

use super::grammar::{Grid, Layers};
use crate::error::VibeCraftError;

pub fn parse_shape(spec: &str) -> Result<Layers, VibeCraftError> {
    let parts: Vec<&str> = spec.split(':').collect();
    let malformed = || VibeCraftError::SchematicMalformed(format!("ill-formed shape '{spec}'"));

    match parts.as_slice() {
        ["fill", dims, symbol] => {
            let (w, d) = parse_2d(dims).ok_or_else(malformed)?;
            Ok(vec![(0, fill_grid(w, d, symbol))])
        }
        ["outline", dims, symbol] | ["walls", dims, symbol] => {
            let (w, d) = parse_2d(dims).ok_or_else(malformed)?;
            Ok(vec![(0, border_grid(w, d, symbol, "."))])
        }
        ["frame", dims, border, interior] => {
            let (w, d) = parse_2d(dims).ok_or_else(malformed)?;
            Ok(vec![(0, border_grid(w, d, border, interior))])
        }
        ["box", dims, symbol] => {
            let (w, h, d) = parse_3d(dims).ok_or_else(malformed)?;
            Ok(box_layers(w, h, d, symbol, symbol, symbol))
        }
        ["room", dims, wall, floor] => {
            let (w, h, d) = parse_3d(dims).ok_or_else(malformed)?;
            Ok(box_layers(w, h, d, floor, wall, wall))
        }
        _ => Err(malformed()),
    }
}

fn parse_2d(dims: &str) -> Option<(usize, usize)> {
    let (w, d) = dims.split_once('x')?;
    Some((w.parse().ok()?, d.parse().ok()?))
}

fn parse_3d(dims: &str) -> Option<(usize, usize, usize)> {
    let parts: Vec<&str> = dims.split('x').collect();
    if parts.len() != 3 {
        return None;
    }
    Some((parts[0].parse().ok()?, parts[1].parse().ok()?, parts[2].parse().ok()?))
}

fn fill_grid(cols: usize, rows: usize, symbol: &str) -> Grid {
    vec![vec![symbol.to_string(); cols]; rows]
}

fn border_grid(cols: usize, rows: usize, border: &str, interior: &str) -> Grid {
    let mut grid = vec![vec![interior.to_string(); cols]; rows];
    for (r, row) in grid.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            if r == 0 || r + 1 == rows || c == 0 || c + 1 == cols {
                *cell = border.to_string();
            }
        }
    }
    grid
}

fn box_layers(cols: usize, height: usize, rows: usize, floor: &str, wall: &str, ceiling: &str) -> Layers {
    let mut layers = Vec::with_capacity(height);
    for y in 0..height {
        let grid = if y == 0 {
            fill_grid(cols, rows, floor)
        } else if y + 1 == height {
            fill_grid(cols, rows, ceiling)
        } else {
            border_grid(cols, rows, wall, ".")
        };
        layers.push((y as i64, grid));
    }
    layers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_produces_solid_single_layer() {
        let layers = parse_shape("fill:3x2:S").unwrap();
        assert_eq!(layers.len(), 1);
        let (y, grid) = &layers[0];
        assert_eq!(*y, 0);
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[0].len(), 3);
        assert!(grid.iter().flatten().all(|c| c == "S"));
    }

    #[test]
    fn outline_hollows_the_interior() {
        let layers = parse_shape("outline:3x3:S").unwrap();
        let (_, grid) = &layers[0];
        assert_eq!(grid[1][1], ".");
        assert_eq!(grid[0][0], "S");
    }

    #[test]
    fn box_has_solid_floor_hollow_walls_solid_ceiling() {
        let layers = parse_shape("box:3x4x3:S").unwrap();
        assert_eq!(layers.len(), 4);
        assert!(layers[0].1.iter().flatten().all(|c| c == "S"));
        assert_eq!(layers[1].1[1][1], ".");
        assert!(layers[3].1.iter().flatten().all(|c| c == "S"));
    }

    #[test]
    fn room_uses_distinct_floor_and_wall_symbols() {
        let layers = parse_shape("room:3x3x3:W:F").unwrap();
        assert!(layers[0].1.iter().flatten().all(|c| c == "F"));
        assert_eq!(layers[1].1[0][0], "W");
    }

    #[test]
    fn malformed_shape_is_an_error() {
        assert!(parse_shape("triangle:3x3:S").is_err());
        assert!(parse_shape("fill:notadim:S").is_err());
    }
}
