use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::fingerprint::{fingerprint_levels, TopologyFingerprint};
use super::{JumpTargets, Level, LevelId, DEFAULT_FLOOR_TILE};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LevelTableError {
    #[error("level {level} is beyond table capacity {capacity}")]
    IdOutOfRange { level: LevelId, capacity: usize },
    #[error("duplicate level id {level}")]
    DuplicateLevel { level: LevelId },
    #[error("level {level}: tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch {
        level: LevelId,
        expected: usize,
        actual: usize,
    },
    #[error("level {level} has an empty extent {width}x{height}")]
    EmptyExtent {
        level: LevelId,
        width: u32,
        height: u32,
    },
    #[error("level {level} extent {width}x{height} exceeds {max} tiles per side")]
    ExtentTooLarge {
        level: LevelId,
        width: u32,
        height: u32,
        max: u32,
    },
}

/// Already-parsed level geometry as handed over by the level loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDesc {
    pub id: LevelId,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub jump_targets: JumpTargets,
    #[serde(default)]
    pub tiles: Option<Vec<u16>>,
}

impl LevelDesc {
    pub fn into_level(self) -> Result<Level, LevelTableError> {
        let mut level = match self.tiles {
            Some(tiles) => Level::new(self.id, self.width, self.height, tiles)?,
            None => Level::filled(self.id, self.width, self.height, DEFAULT_FLOOR_TILE)?,
        };
        level.jump_targets = self.jump_targets;
        Ok(level)
    }
}

/// Fixed-capacity table of levels indexed by their dense id.
#[derive(Debug, Clone, Default)]
pub struct LevelTable {
    slots: Vec<Option<Level>>,
}

impl LevelTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    pub fn from_descs(
        capacity: usize,
        descs: impl IntoIterator<Item = LevelDesc>,
    ) -> Result<Self, LevelTableError> {
        let mut table = Self::with_capacity(capacity);
        for desc in descs {
            if table.contains(desc.id) {
                return Err(LevelTableError::DuplicateLevel { level: desc.id });
            }
            table.insert(desc.into_level()?)?;
        }
        Ok(table)
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Stores `level` in its slot and returns whatever occupied it before.
    pub fn insert(&mut self, level: Level) -> Result<Option<Level>, LevelTableError> {
        let capacity = self.capacity();
        let level_id = level.id();
        let slot = self
            .slots
            .get_mut(level_id.index())
            .ok_or(LevelTableError::IdOutOfRange {
                level: level_id,
                capacity,
            })?;
        Ok(slot.replace(level))
    }

    pub fn remove(&mut self, id: LevelId) -> Option<Level> {
        self.slots.get_mut(id.index()).and_then(Option::take)
    }

    pub fn get(&self, id: LevelId) -> Option<&Level> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: LevelId) -> Option<&mut Level> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: LevelId) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Level> {
        self.slots.iter().flatten()
    }

    pub fn fingerprint(&self) -> TopologyFingerprint {
        fingerprint_levels(self.iter())
    }
}
