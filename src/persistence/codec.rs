//! Binary save record
//!
//! Big-endian, fixed scalar preamble followed by the surviving blocks:
//!
//! ```text
//! level i32 | score i32 | lives i32 | destroyed i32
//! ball x f64 | ball y f64 | paddle x f64 | paddle y f64 | paddle center x f64
//! elapsed ms i64 | gold time ms i64 | ball vx f64
//! 8 x flag u8 (heart exists, gold, go down, go right, hit top/bottom/left/right)
//! block count u32 | count x (row i32, column i32, kind i32, color i32)
//! ```

use glam::DVec2;

use crate::PALETTE;
use crate::consts::{GRID_COLUMNS, GRID_ROWS};
use crate::error::PersistError;
use crate::sim::state::{
    Ball, Block, BlockKind, BlockSide, GamePhase, GameState, Paddle, vertical_speed_for,
};

/// Bytes per block entry
const BLOCK_ENTRY_LEN: usize = 16;
/// Offset of the eight flag bytes
const FLAGS_OFFSET: usize = 80;
/// Offset of the block count
const COUNT_OFFSET: usize = FLAGS_OFFSET + 8;
/// Bytes before the first block entry
const PREAMBLE_LEN: usize = COUNT_OFFSET + 4;
/// Blocks a level can hold
const GRID_CELLS: usize = (GRID_ROWS * GRID_COLUMNS) as usize;

/// A surviving block as stored on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedBlock {
    pub row: u32,
    pub column: u32,
    pub kind: BlockKind,
    pub color_index: u8,
}

/// Everything needed to resume a session
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRecord {
    pub level: i32,
    pub score: i32,
    pub lives: i32,
    pub destroyed_count: i32,
    pub ball_x: f64,
    pub ball_y: f64,
    pub paddle_x: f64,
    pub paddle_y: f64,
    pub paddle_center_x: f64,
    pub elapsed_ms: i64,
    pub gold_time_ms: i64,
    pub ball_vx: f64,
    pub heart_block_exists: bool,
    pub gold_status: bool,
    pub go_down: bool,
    pub go_right: bool,
    pub last_hit: Option<BlockSide>,
    pub blocks: Vec<SavedBlock>,
}

impl From<&GameState> for SaveRecord {
    fn from(state: &GameState) -> Self {
        Self {
            level: state.level as i32,
            score: state.score,
            lives: state.lives,
            destroyed_count: state.destroyed_count as i32,
            ball_x: state.ball.pos.x,
            ball_y: state.ball.pos.y,
            paddle_x: state.paddle.x,
            paddle_y: state.paddle.y(),
            paddle_center_x: state.paddle.center_x(),
            elapsed_ms: state.elapsed_ms as i64,
            gold_time_ms: state.gold_time_ms as i64,
            ball_vx: state.ball.vx,
            heart_block_exists: state.heart_block_exists,
            gold_status: state.gold_status,
            go_down: state.ball.go_down,
            go_right: state.ball.go_right,
            last_hit: state.last_block_hit,
            blocks: state
                .surviving_blocks()
                .map(|b| SavedBlock {
                    row: b.row,
                    column: b.column,
                    kind: b.kind,
                    color_index: b.color_index,
                })
                .collect(),
        }
    }
}

impl SaveRecord {
    /// Rebuild a live state
    ///
    /// Destroyed blocks come back as tombstones so the block collection keeps
    /// its full size for level-clear detection. Timed effects are not saved, so
    /// paddle width and ball radius start from their defaults. The vertical
    /// speed is recovered from the constant speed magnitude.
    pub fn into_state(self) -> GameState {
        let mut state = GameState::new(self.level.max(1) as u32, self.lives);
        state.score = self.score;
        state.destroyed_count = self.destroyed_count.max(0) as u32;
        state.elapsed_ms = self.elapsed_ms.max(0) as u64;
        state.gold_time_ms = self.gold_time_ms.max(0) as u64;
        state.gold_status = self.gold_status;
        state.heart_block_exists = self.heart_block_exists;
        state.last_block_hit = self.last_hit;
        state.phase = GamePhase::Playing;

        state.ball = Ball {
            pos: DVec2::new(self.ball_x, self.ball_y),
            vx: self.ball_vx.abs(),
            vy: vertical_speed_for(self.ball_vx.abs()),
            go_down: self.go_down,
            go_right: self.go_right,
            ..Ball::serve()
        };
        state.paddle = Paddle {
            x: self.paddle_x,
            ..Paddle::default()
        };
        state.paddle.clamp_to_scene();

        state.blocks = self
            .blocks
            .iter()
            .map(|b| Block::new(b.row, b.column, b.color_index, b.kind))
            .collect();
        state
            .blocks
            .extend((0..state.destroyed_count).map(|_| Block::tombstone()));
        state
    }
}

/// Serialize a record
pub fn encode(record: &SaveRecord) -> Vec<u8> {
    let mut out = Vec::with_capacity(PREAMBLE_LEN + record.blocks.len() * BLOCK_ENTRY_LEN);
    out.extend_from_slice(&record.level.to_be_bytes());
    out.extend_from_slice(&record.score.to_be_bytes());
    out.extend_from_slice(&record.lives.to_be_bytes());
    out.extend_from_slice(&record.destroyed_count.to_be_bytes());
    out.extend_from_slice(&record.ball_x.to_be_bytes());
    out.extend_from_slice(&record.ball_y.to_be_bytes());
    out.extend_from_slice(&record.paddle_x.to_be_bytes());
    out.extend_from_slice(&record.paddle_y.to_be_bytes());
    out.extend_from_slice(&record.paddle_center_x.to_be_bytes());
    out.extend_from_slice(&record.elapsed_ms.to_be_bytes());
    out.extend_from_slice(&record.gold_time_ms.to_be_bytes());
    out.extend_from_slice(&record.ball_vx.to_be_bytes());

    let flags = [
        record.heart_block_exists,
        record.gold_status,
        record.go_down,
        record.go_right,
        record.last_hit == Some(BlockSide::Top),
        record.last_hit == Some(BlockSide::Bottom),
        record.last_hit == Some(BlockSide::Left),
        record.last_hit == Some(BlockSide::Right),
    ];
    out.extend(flags.iter().map(|&flag| flag as u8));

    out.extend_from_slice(&(record.blocks.len() as u32).to_be_bytes());
    for block in &record.blocks {
        out.extend_from_slice(&(block.row as i32).to_be_bytes());
        out.extend_from_slice(&(block.column as i32).to_be_bytes());
        out.extend_from_slice(&block.kind.code().to_be_bytes());
        out.extend_from_slice(&(block.color_index as i32).to_be_bytes());
    }
    out
}

/// Parse a record, rejecting anything truncated or out of range
pub fn decode(bytes: &[u8]) -> Result<SaveRecord, PersistError> {
    let mut reader = Reader { bytes };

    let level = reader.i32()?;
    let score = reader.i32()?;
    let lives = reader.i32()?;
    let destroyed_count = reader.i32()?;
    let ball_x = reader.f64()?;
    let ball_y = reader.f64()?;
    let paddle_x = reader.f64()?;
    let paddle_y = reader.f64()?;
    let paddle_center_x = reader.f64()?;
    let elapsed_ms = reader.i64()?;
    let gold_time_ms = reader.i64()?;
    let ball_vx = reader.f64()?;

    let heart_block_exists = reader.flag()?;
    let gold_status = reader.flag()?;
    let go_down = reader.flag()?;
    let go_right = reader.flag()?;
    let hit_top = reader.flag()?;
    let hit_bottom = reader.flag()?;
    let hit_left = reader.flag()?;
    let hit_right = reader.flag()?;
    let last_hit = [
        (hit_top, BlockSide::Top),
        (hit_bottom, BlockSide::Bottom),
        (hit_left, BlockSide::Left),
        (hit_right, BlockSide::Right),
    ]
    .into_iter()
    .find_map(|(set, side)| set.then_some(side));

    let count = reader.u32()? as usize;
    let needed = count.saturating_mul(BLOCK_ENTRY_LEN);
    if needed > reader.bytes.len() {
        return Err(PersistError::Truncated {
            needed,
            remaining: reader.bytes.len(),
        });
    }
    let mut blocks = Vec::with_capacity(count);
    for _ in 0..count {
        blocks.push(reader.block()?);
    }

    if !reader.bytes.is_empty() {
        return Err(PersistError::TrailingBytes(reader.bytes.len()));
    }
    if destroyed_count < 0 || destroyed_count as usize + blocks.len() > GRID_CELLS {
        return Err(PersistError::InvalidDestroyedCount {
            destroyed: destroyed_count,
            surviving: blocks.len(),
        });
    }

    Ok(SaveRecord {
        level,
        score,
        lives,
        destroyed_count,
        ball_x,
        ball_y,
        paddle_x,
        paddle_y,
        paddle_center_x,
        elapsed_ms,
        gold_time_ms,
        ball_vx,
        heart_block_exists,
        gold_status,
        go_down,
        go_right,
        last_hit,
        blocks,
    })
}

struct Reader<'a> {
    bytes: &'a [u8],
}

impl Reader<'_> {
    fn array<const N: usize>(&mut self) -> Result<[u8; N], PersistError> {
        if self.bytes.len() < N {
            return Err(PersistError::Truncated {
                needed: N,
                remaining: self.bytes.len(),
            });
        }
        let (head, rest) = self.bytes.split_at(N);
        let mut out = [0u8; N];
        out.copy_from_slice(head);
        self.bytes = rest;
        Ok(out)
    }

    fn i32(&mut self) -> Result<i32, PersistError> {
        self.array().map(i32::from_be_bytes)
    }

    fn u32(&mut self) -> Result<u32, PersistError> {
        self.array().map(u32::from_be_bytes)
    }

    fn i64(&mut self) -> Result<i64, PersistError> {
        self.array().map(i64::from_be_bytes)
    }

    fn f64(&mut self) -> Result<f64, PersistError> {
        self.array().map(f64::from_be_bytes)
    }

    fn flag(&mut self) -> Result<bool, PersistError> {
        match self.array::<1>()?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(PersistError::InvalidFlag(other)),
        }
    }

    fn block(&mut self) -> Result<SavedBlock, PersistError> {
        let row = self.i32()?;
        let column = self.i32()?;
        let kind = self.i32()?;
        let color = self.i32()?;

        if !(0..GRID_ROWS as i32).contains(&row) || !(0..GRID_COLUMNS as i32).contains(&column) {
            return Err(PersistError::InvalidGridCell { row, column });
        }
        let kind = BlockKind::from_code(kind).ok_or(PersistError::UnknownBlockKind(kind))?;
        if !(0..PALETTE.len() as i32).contains(&color) {
            return Err(PersistError::InvalidColor(color));
        }

        Ok(SavedBlock {
            row: row as u32,
            column: column as u32,
            kind,
            color_index: color as u8,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_record() -> SaveRecord {
        SaveRecord {
            level: 3,
            score: 42,
            lives: 2,
            destroyed_count: 5,
            ball_x: 120.5,
            ball_y: 333.25,
            paddle_x: 100.0,
            paddle_y: 680.0,
            paddle_center_x: 145.0,
            elapsed_ms: 12_345,
            gold_time_ms: 10_000,
            ball_vx: 1.75,
            heart_block_exists: true,
            gold_status: true,
            go_down: false,
            go_right: true,
            last_hit: Some(BlockSide::Left),
            blocks: vec![
                SavedBlock {
                    row: 0,
                    column: 9,
                    kind: BlockKind::Heart,
                    color_index: 9,
                },
                SavedBlock {
                    row: 7,
                    column: 0,
                    kind: BlockKind::Random,
                    color_index: 0,
                },
            ],
        }
    }

    #[test]
    fn test_field_order_is_fixed() {
        let bytes = encode(&sample_record());
        assert_eq!(&bytes[0..4], &3i32.to_be_bytes());
        assert_eq!(&bytes[4..8], &42i32.to_be_bytes());
        assert_eq!(&bytes[8..12], &2i32.to_be_bytes());
        assert_eq!(&bytes[12..16], &5i32.to_be_bytes());
        assert_eq!(&bytes[16..24], &120.5f64.to_be_bytes());
        assert_eq!(&bytes[56..64], &12_345i64.to_be_bytes());
        assert_eq!(&bytes[64..72], &10_000i64.to_be_bytes());
        assert_eq!(&bytes[72..FLAGS_OFFSET], &1.75f64.to_be_bytes());
        assert_eq!(&bytes[FLAGS_OFFSET..COUNT_OFFSET], &[1, 1, 0, 1, 0, 0, 1, 0]);
        assert_eq!(&bytes[COUNT_OFFSET..PREAMBLE_LEN], &2u32.to_be_bytes());
        assert_eq!(&bytes[PREAMBLE_LEN..PREAMBLE_LEN + 4], &0i32.to_be_bytes());
        assert_eq!(bytes.len(), PREAMBLE_LEN + 2 * BLOCK_ENTRY_LEN);
    }

    #[test]
    fn test_decode_reverses_encode() {
        let record = sample_record();
        assert_eq!(decode(&encode(&record)).unwrap(), record);
    }

    #[test]
    fn test_truncated_record_is_rejected() {
        let bytes = encode(&sample_record());
        for cut in [0, 3, 50, FLAGS_OFFSET + 3, PREAMBLE_LEN - 1, bytes.len() - 1] {
            assert!(
                matches!(decode(&bytes[..cut]), Err(PersistError::Truncated { .. })),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = encode(&sample_record());
        bytes.push(0);
        assert!(matches!(decode(&bytes), Err(PersistError::TrailingBytes(1))));
    }

    #[test]
    fn test_bad_values_rejected() {
        let bytes = encode(&sample_record());

        let mut bad_flag = bytes.clone();
        bad_flag[FLAGS_OFFSET + 2] = 7;
        assert!(matches!(decode(&bad_flag), Err(PersistError::InvalidFlag(7))));

        let mut bad_kind = bytes.clone();
        bad_kind[PREAMBLE_LEN + 8..PREAMBLE_LEN + 12].copy_from_slice(&9i32.to_be_bytes());
        assert!(matches!(decode(&bad_kind), Err(PersistError::UnknownBlockKind(9))));

        let mut bad_color = bytes.clone();
        bad_color[PREAMBLE_LEN + 12..PREAMBLE_LEN + 16].copy_from_slice(&10i32.to_be_bytes());
        assert!(matches!(decode(&bad_color), Err(PersistError::InvalidColor(10))));

        let mut bad_row = bytes;
        bad_row[PREAMBLE_LEN..PREAMBLE_LEN + 4].copy_from_slice(&(-1i32).to_be_bytes());
        assert!(matches!(
            decode(&bad_row),
            Err(PersistError::InvalidGridCell { row: -1, column: 9 })
        ));
    }

    #[test]
    fn test_huge_block_count_is_truncation() {
        let mut bytes = encode(&sample_record());
        bytes[COUNT_OFFSET..PREAMBLE_LEN].copy_from_slice(&u32::MAX.to_be_bytes());
        assert!(matches!(decode(&bytes), Err(PersistError::Truncated { .. })));
    }

    #[test]
    fn test_impossible_destroyed_count_rejected() {
        let mut record = sample_record();
        record.destroyed_count = 1000;
        assert!(matches!(
            decode(&encode(&record)),
            Err(PersistError::InvalidDestroyedCount { destroyed: 1000, surviving: 2 })
        ));

        record.destroyed_count = i32::MAX;
        assert!(decode(&encode(&record)).is_err());

        record.destroyed_count = -1;
        assert!(matches!(
            decode(&encode(&record)),
            Err(PersistError::InvalidDestroyedCount { destroyed: -1, .. })
        ));

        // A full grid is the limit
        record.destroyed_count = (GRID_CELLS - record.blocks.len()) as i32;
        assert!(decode(&encode(&record)).is_ok());
        record.destroyed_count += 1;
        assert!(decode(&encode(&record)).is_err());
    }

    #[test]
    fn test_state_round_trip_keeps_level_clear_denominator() {
        let mut state = GameState::new(2, 3);
        for column in 0..4 {
            state.blocks.push(Block::new(1, column, column as u8, BlockKind::Normal));
        }
        state.blocks[1].destroyed = true;
        state.destroyed_count = 1;

        let restored = decode(&encode(&SaveRecord::from(&state)))
            .unwrap()
            .into_state();
        assert_eq!(restored.blocks.len(), 4);
        assert_eq!(restored.destroyed_count, 1);
        assert_eq!(restored.surviving_blocks().count(), 3);
        assert!(!restored.is_level_clear());
    }

    proptest! {
        #[test]
        fn prop_any_record_round_trips(
            level in 1i32..100,
            score in 0i32..100_000,
            lives in 0i32..10,
            elapsed in 0i64..10_000_000,
            vx in 0.0f64..2.8,
            flags in any::<[bool; 4]>(),
            cells in proptest::collection::vec((0u32..8, 0u32..10, 0i32..4), 0..40),
        ) {
            let record = SaveRecord {
                level,
                score,
                lives,
                destroyed_count: 0,
                ball_x: 10.0,
                ball_y: 20.0,
                paddle_x: 0.0,
                paddle_y: 680.0,
                paddle_center_x: 45.0,
                elapsed_ms: elapsed,
                gold_time_ms: 0,
                ball_vx: vx,
                heart_block_exists: flags[0],
                gold_status: flags[1],
                go_down: flags[2],
                go_right: flags[3],
                last_hit: None,
                blocks: cells
                    .into_iter()
                    .map(|(row, column, kind)| SavedBlock {
                        row,
                        column,
                        kind: BlockKind::from_code(kind).unwrap_or_default(),
                        color_index: (column % 10) as u8,
                    })
                    .collect(),
            };
            prop_assert_eq!(decode(&encode(&record)).unwrap(), record);
        }
    }
}
