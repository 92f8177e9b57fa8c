//! Level layouts
//!
//! Levels 1-10 each have a fixed shape over the block grid; block types are
//! rolled per cell from the seeded RNG. Any other level index gets a random
//! sparse board so a level can always be played.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::BlockKind;
use crate::Color;
use crate::consts::{GRID_COLUMNS, GRID_ROWS};

/// Placement of one block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpec {
    pub row: u32,
    pub column: u32,
    pub color_index: u8,
    pub kind: BlockKind,
}

/// A generated board
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    pub blocks: Vec<BlockSpec>,
    /// A heart block was placed
    pub has_heart: bool,
}

/// Level 1 bitmap, `#` marks a block
const LEVEL_ONE: [&str; 6] = [
    "..######..",
    ".########.",
    "##########",
    "###.##.###",
    "##########",
    ".#.#..#.#.",
];

/// Chance that a default-layout cell holds a block
const DEFAULT_FILL: f64 = 0.6;

/// Generate the board for a level
pub fn generate<R: Rng + ?Sized>(level: u32, palette: &[Color], rng: &mut R) -> Layout {
    let mut layout = Layout::default();
    let palette_len = palette.len().max(1) as u32;

    match shape_rows(level) {
        Some(rows) => {
            for row in 0..rows {
                for column in 0..GRID_COLUMNS {
                    if in_shape(level, row, column) {
                        place(&mut layout, row, column, palette_len, rng);
                    }
                }
            }
        }
        None => {
            let rows = (level / 2).clamp(1, GRID_ROWS);
            for row in 0..rows {
                for column in 0..GRID_COLUMNS {
                    if rng.random_bool(DEFAULT_FILL) {
                        place(&mut layout, row, column, palette_len, rng);
                    }
                }
            }
            if layout.blocks.is_empty() {
                place(&mut layout, 0, GRID_COLUMNS / 2, palette_len, rng);
            }
        }
    }

    log::debug!(
        "Level {} layout: {} blocks, heart={}",
        level,
        layout.blocks.len(),
        layout.has_heart
    );
    layout
}

fn place<R: Rng + ?Sized>(layout: &mut Layout, row: u32, column: u32, palette_len: u32, rng: &mut R) {
    let roll = rng.random_range(0..100);
    let kind = classify(roll, layout.has_heart);
    if kind == BlockKind::Heart {
        layout.has_heart = true;
    }
    layout.blocks.push(BlockSpec {
        row,
        column,
        color_index: (column % palette_len) as u8,
        kind,
    });
}

/// Map a roll in `[0, 100)` to a block type; at most one heart per level
fn classify(roll: u32, heart_placed: bool) -> BlockKind {
    match roll {
        0..10 => BlockKind::Random,
        10..15 if !heart_placed => BlockKind::Heart,
        15..20 => BlockKind::GoldenTime,
        _ => BlockKind::Normal,
    }
}

/// Rows scanned by a fixed shape, `None` for levels without one
fn shape_rows(level: u32) -> Option<u32> {
    match level {
        1 => Some(LEVEL_ONE.len() as u32),
        2 | 4 => Some(5),
        3 | 5 | 6 | 8 => Some(6),
        7 => Some(7),
        9 | 10 => Some(GRID_ROWS),
        _ => None,
    }
}

fn in_shape(level: u32, row: u32, col: u32) -> bool {
    let last_col = GRID_COLUMNS - 1;
    match level {
        1 => LEVEL_ONE
            .get(row as usize)
            .and_then(|line| line.as_bytes().get(col as usize))
            .is_some_and(|&cell| cell == b'#'),
        2 => true,
        3 => (row + col) % 2 == 0,
        4 => row <= col && col <= last_col - row,
        5 => col % 3 != 2,
        6 | 9 => (row / 2 + col) % 2 == 0,
        7 => row == 0 || row == 6 || col == 0 || col == last_col,
        8 => col <= row || col >= last_col - row,
        // Manhattan diamond in doubled coordinates around the grid center
        10 => {
            let dr = (2 * row as i32 - (GRID_ROWS as i32 - 1)).abs();
            let dc = (2 * col as i32 - last_col as i32).abs();
            dr + dc <= last_col as i32
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PALETTE;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(classify(0, false), BlockKind::Random);
        assert_eq!(classify(9, false), BlockKind::Random);
        assert_eq!(classify(10, false), BlockKind::Heart);
        assert_eq!(classify(14, false), BlockKind::Heart);
        assert_eq!(classify(12, true), BlockKind::Normal);
        assert_eq!(classify(15, false), BlockKind::GoldenTime);
        assert_eq!(classify(19, true), BlockKind::GoldenTime);
        assert_eq!(classify(20, false), BlockKind::Normal);
        assert_eq!(classify(99, false), BlockKind::Normal);
    }

    #[test]
    fn test_same_seed_same_layout() {
        for level in 0..14 {
            let a = generate(level, &PALETTE, &mut Pcg32::seed_from_u64(7));
            let b = generate(level, &PALETTE, &mut Pcg32::seed_from_u64(7));
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_level_one_matches_bitmap() {
        let layout = generate(1, &PALETTE, &mut Pcg32::seed_from_u64(1));
        let expected: usize = LEVEL_ONE
            .iter()
            .map(|line| line.bytes().filter(|&c| c == b'#').count())
            .sum();
        assert_eq!(layout.blocks.len(), expected);
        assert!(!layout.blocks.iter().any(|b| b.row == 0 && b.column == 0));
    }

    #[test]
    fn test_zigzag_levels() {
        for level in [6, 9] {
            let layout = generate(level, &PALETTE, &mut Pcg32::seed_from_u64(3));
            assert!(!layout.blocks.is_empty());
            for block in &layout.blocks {
                assert_eq!((block.row / 2 + block.column) % 2, 0);
            }
        }
    }

    #[test]
    fn test_diamond_is_symmetric() {
        let layout = generate(10, &PALETTE, &mut Pcg32::seed_from_u64(5));
        let cells: std::collections::HashSet<_> =
            layout.blocks.iter().map(|b| (b.row, b.column)).collect();
        for &(row, col) in &cells {
            assert!(cells.contains(&(GRID_ROWS - 1 - row, GRID_COLUMNS - 1 - col)));
        }
        // Widest rows stop one cell short of the edges
        assert!(cells.contains(&(3, 1)) && cells.contains(&(4, 8)));
        assert!(!cells.contains(&(3, 0)) && !cells.contains(&(0, 0)));
    }

    #[test]
    fn test_out_of_range_levels_are_playable() {
        for level in [0, 11, 12, 40, u32::MAX] {
            for seed in 0..20 {
                let layout = generate(level, &PALETTE, &mut Pcg32::seed_from_u64(seed));
                assert!(!layout.blocks.is_empty(), "level {level} seed {seed}");
                assert!(layout.blocks.iter().all(|b| b.row < GRID_ROWS));
            }
        }
    }

    #[test]
    fn test_color_follows_column() {
        let layout = generate(2, &PALETTE, &mut Pcg32::seed_from_u64(9));
        for block in &layout.blocks {
            assert_eq!(block.color_index as u32, block.column % PALETTE.len() as u32);
        }
        let short = [PALETTE[0], PALETTE[1], PALETTE[2]];
        let layout = generate(2, &short, &mut Pcg32::seed_from_u64(9));
        assert!(layout.blocks.iter().all(|b| b.color_index < 3));
    }

    proptest! {
        #[test]
        fn prop_at_most_one_heart(level in 0u32..16, seed in any::<u64>()) {
            let layout = generate(level, &PALETTE, &mut Pcg32::seed_from_u64(seed));
            let hearts = layout.blocks.iter().filter(|b| b.kind == BlockKind::Heart).count();
            prop_assert!(hearts <= 1);
            prop_assert_eq!(hearts == 1, layout.has_heart);
        }
    }
}
