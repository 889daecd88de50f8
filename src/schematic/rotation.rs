//! Rotation of layer grids and block-state orientation attributes under
//! 90°-multiple facings (spec §4.4 step 5, invariant 4).
//!
//! Open Question resolution (recorded in SPEC_FULL.md): only the `facing`
//! attribute rotates under pure rotation. `shape`, `half`, and `hinge` are
//! orientation-independent in the sense this expander cares about (stairs
//! keep their `shape`/`half`; doors keep their `hinge`) — only the compass
//! direction they face turns with the schematic.

use super::grammar::Grid;
use crate::catalog::BlockSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    North,
    East,
    South,
    West,
}

impl Facing {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "north" => Some(Facing::North),
            "east" => Some(Facing::East),
            "south" => Some(Facing::South),
            "west" => Some(Facing::West),
            _ => None,
        }
    }

    /// Number of 90° clockwise turns from `north`.
    fn steps(&self) -> u8 {
        match self {
            Facing::North => 0,
            Facing::East => 1,
            Facing::South => 2,
            Facing::West => 3,
        }
    }

    fn rotate_cw(&self, by: u8) -> Facing {
        let total = (self.steps() + by) % 4;
        match total {
            0 => Facing::North,
            1 => Facing::East,
            2 => Facing::South,
            _ => Facing::West,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Facing::North => "north",
            Facing::East => "east",
            Facing::South => "south",
            Facing::West => "west",
        }
    }
}

/// Rotate a grid 90° clockwise, `steps` times. `steps=0` returns an
/// unchanged clone; `steps=4` is equivalent to `steps=0` (invariant 4).
pub fn rotate_grid(grid: &Grid, steps: u8) -> Grid {
    let mut current = grid.clone();
    for _ in 0..(steps % 4) {
        current = rotate_cw_once(&current);
    }
    current
}

fn rotate_cw_once(grid: &Grid) -> Grid {
    if grid.is_empty() || grid[0].is_empty() {
        return grid.clone();
    }
    let rows = grid.len();
    let cols = grid[0].len();
    let mut out = vec![vec![String::new(); rows]; cols];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = grid[rows - 1 - j][i].clone();
        }
    }
    out
}

/// Rotate a block spec's orientation attributes for a schematic facing of
/// `steps` 90° clockwise turns from north.
pub fn rotate_block_spec(spec: &BlockSpec, steps: u8) -> BlockSpec {
    let mut rotated = spec.clone();
    if let Some(facing) = spec.facing.as_deref().and_then(Facing::parse) {
        rotated.facing = Some(facing.rotate_cw(steps).as_str().to_string());
    }
    if let Some(axis) = spec.axis.as_deref() {
        // A 90° turn about the vertical axis swaps x and z; y is untouched.
        if steps % 2 == 1 {
            rotated.axis = Some(match axis {
                "x" => "z".to_string(),
                "z" => "x".to_string(),
                other => other.to_string(),
            });
        }
    }
    rotated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_grid() -> Grid {
        vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["c".to_string(), "d".to_string()],
            vec!["e".to_string(), "f".to_string()],
        ]
    }

    #[test]
    fn north_is_identity() {
        let g = sample_grid();
        assert_eq!(rotate_grid(&g, 0), g);
    }

    #[test]
    fn four_east_rotations_equal_identity() {
        let g = sample_grid();
        assert_eq!(rotate_grid(&g, 4), g);
        assert_eq!(rotate_grid(&g, 8), g);
    }

    #[test]
    fn single_rotation_changes_shape() {
        let g = sample_grid();
        let rotated = rotate_grid(&g, 1);
        assert_eq!(rotated.len(), 2);
        assert_eq!(rotated[0].len(), 3);
    }

    #[test]
    fn facing_rotates_through_compass() {
        assert_eq!(Facing::North.rotate_cw(1), Facing::East);
        assert_eq!(Facing::East.rotate_cw(1), Facing::South);
        assert_eq!(Facing::West.rotate_cw(1), Facing::North);
        assert_eq!(Facing::North.rotate_cw(4), Facing::North);
    }

    #[test]
    fn axis_swaps_x_and_z_on_odd_steps_only() {
        let mut spec = BlockSpec::simple("oak_log");
        spec.axis = Some("x".to_string());
        assert_eq!(rotate_block_spec(&spec, 1).axis.as_deref(), Some("z"));
        assert_eq!(rotate_block_spec(&spec, 2).axis.as_deref(), Some("x"));
    }

    #[test]
    fn shape_half_hinge_are_unaffected_by_rotation() {
        let mut spec = BlockSpec::simple("oak_stairs");
        spec.facing = Some("north".to_string());
        spec.shape = Some("inner_left".to_string());
        spec.half = Some("top".to_string());
        spec.hinge = Some("left".to_string());
        let rotated = rotate_block_spec(&spec, 1);
        assert_eq!(rotated.shape, spec.shape);
        assert_eq!(rotated.half, spec.half);
        assert_eq!(rotated.hinge, spec.hinge);
        assert_eq!(rotated.facing.as_deref(), Some("east"));
    }
}
