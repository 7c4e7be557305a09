use std::fmt;

use serde::{Deserialize, Serialize};

mod fingerprint;
mod table;

pub use fingerprint::TopologyFingerprint;
pub use table::{LevelDesc, LevelTable, LevelTableError};

pub const DEFAULT_FLOOR_TILE: u16 = 0;
/// Neighbor deltas are signed tile offsets, so a side must fit in `i32`.
pub const MAX_LEVEL_EXTENT: u32 = i32::MAX as u32;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LevelId(pub u32);

impl LevelId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];
}

/// Level ids lying across each cardinal edge. `None` means the edge is a
/// hard border.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpTargets {
    pub north: Option<LevelId>,
    pub south: Option<LevelId>,
    pub east: Option<LevelId>,
    pub west: Option<LevelId>,
}

impl JumpTargets {
    pub fn get(&self, direction: Direction) -> Option<LevelId> {
        match direction {
            Direction::North => self.north,
            Direction::South => self.south,
            Direction::East => self.east,
            Direction::West => self.west,
        }
    }

    pub fn set(&mut self, direction: Direction, target: Option<LevelId>) {
        let slot = match direction {
            Direction::North => &mut self.north,
            Direction::South => &mut self.south,
            Direction::East => &mut self.east,
            Direction::West => &mut self.west,
        };
        *slot = target;
    }
}

/// A rectangular tile grid with its own local origin.
///
/// Local coordinates run over `[0, width) x [0, height)`; tile `(x, y)` covers
/// the unit square starting at that corner. Row 0 is the northern edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    id: LevelId,
    width: u32,
    height: u32,
    jump_targets: JumpTargets,
    tiles: Vec<u16>,
}

impl Level {
    pub fn new(
        id: LevelId,
        width: u32,
        height: u32,
        tiles: Vec<u16>,
    ) -> Result<Self, LevelTableError> {
        check_extent(id, width, height)?;
        let expected = width as usize * height as usize;
        let actual = tiles.len();
        if expected != actual {
            return Err(LevelTableError::TileCountMismatch {
                level: id,
                expected,
                actual,
            });
        }
        Ok(Self {
            id,
            width,
            height,
            jump_targets: JumpTargets::default(),
            tiles,
        })
    }

    pub fn filled(
        id: LevelId,
        width: u32,
        height: u32,
        tile: u16,
    ) -> Result<Self, LevelTableError> {
        check_extent(id, width, height)?;
        let count = width as usize * height as usize;
        Self::new(id, width, height, vec![tile; count])
    }

    pub fn with_jump_target(mut self, direction: Direction, target: LevelId) -> Self {
        self.jump_targets.set(direction, Some(target));
        self
    }

    pub fn id(&self) -> LevelId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn jump_targets(&self) -> &JumpTargets {
        &self.jump_targets
    }

    pub fn jump_target(&self, direction: Direction) -> Option<LevelId> {
        self.jump_targets.get(direction)
    }

    pub fn set_jump_target(&mut self, direction: Direction, target: Option<LevelId>) {
        self.jump_targets.set(direction, target);
    }

    pub fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn tile_at(&self, x: u32, y: u32) -> Option<u16> {
        self.index_of(x, y)
            .and_then(|index| self.tiles.get(index).copied())
    }

    pub fn set_tile(&mut self, x: u32, y: u32, code: u16) -> bool {
        let Some(index) = self.index_of(x, y) else {
            return false;
        };
        self.tiles[index] = code;
        true
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= 0.0 && x < self.width as f32 && y >= 0.0 && y < self.height as f32
    }
}

fn check_extent(id: LevelId, width: u32, height: u32) -> Result<(), LevelTableError> {
    if width == 0 || height == 0 {
        return Err(LevelTableError::EmptyExtent {
            level: id,
            width,
            height,
        });
    }
    if width > MAX_LEVEL_EXTENT || height > MAX_LEVEL_EXTENT {
        return Err(LevelTableError::ExtentTooLarge {
            level: id,
            width,
            height,
            max: MAX_LEVEL_EXTENT,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_rejects_tile_count_mismatch() {
        let result = Level::new(LevelId(0), 3, 2, vec![0; 5]);
        assert_eq!(
            result,
            Err(LevelTableError::TileCountMismatch {
                level: LevelId(0),
                expected: 6,
                actual: 5,
            })
        );
    }

    #[test]
    fn level_rejects_empty_extent() {
        assert!(matches!(
            Level::filled(LevelId(1), 0, 4, 0),
            Err(LevelTableError::EmptyExtent { .. })
        ));
    }

    #[test]
    fn tile_lookup_is_row_major() {
        let level = Level::new(LevelId(0), 3, 2, vec![0, 1, 2, 3, 4, 5]).expect("level");
        assert_eq!(level.tile_at(0, 0), Some(0));
        assert_eq!(level.tile_at(2, 0), Some(2));
        assert_eq!(level.tile_at(0, 1), Some(3));
        assert_eq!(level.tile_at(3, 0), None);
        assert_eq!(level.tile_at(0, 2), None);
    }

    #[test]
    fn contains_excludes_far_edges() {
        let level = Level::filled(LevelId(0), 20, 10, 0).expect("level");
        assert!(level.contains(0.0, 0.0));
        assert!(level.contains(19.99, 9.99));
        assert!(!level.contains(20.0, 5.0));
        assert!(!level.contains(5.0, -0.01));
    }

    #[test]
    fn level_rejects_extent_beyond_signed_range() {
        assert_eq!(
            Level::filled(LevelId(2), MAX_LEVEL_EXTENT + 1, 1, 0),
            Err(LevelTableError::ExtentTooLarge {
                level: LevelId(2),
                width: MAX_LEVEL_EXTENT + 1,
                height: 1,
                max: MAX_LEVEL_EXTENT,
            })
        );
        assert!(matches!(
            Level::new(LevelId(2), 1, u32::MAX, Vec::new()),
            Err(LevelTableError::ExtentTooLarge { .. })
        ));
    }

    #[test]
    fn jump_targets_round_through_setters() {
        let mut level = Level::filled(LevelId(0), 4, 4, 0)
            .expect("level")
            .with_jump_target(Direction::East, LevelId(3));
        assert_eq!(level.jump_target(Direction::East), Some(LevelId(3)));
        level.set_jump_target(Direction::East, None);
        assert_eq!(level.jump_target(Direction::East), None);
        assert_eq!(level.jump_targets(), &JumpTargets::default());
    }
}
