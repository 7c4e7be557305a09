//! Level-relative positions and the transforms between level frames.
//!
//! A [`GpsPosition`] is *real* when it lies inside the level named by its
//! `level` field, and *virtual* when it is expressed in some other level's
//! frame (possibly outside that level's bounds) for sorting or rendering.

use thiserror::Error;
use tracing::warn;

use crate::config::InvalidLevelPolicy;
use crate::level::{Direction, LevelId};

mod graph;
mod project;
mod resolve;
#[cfg(test)]
pub(crate) mod test_support;

pub use graph::{CornerConflict, LevelGraph, NeighborGrid, TransformMatrix};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsPosition {
    pub x: f32,
    pub y: f32,
    /// `None` marks the invalid sentinel; its coordinates carry no meaning.
    pub level: Option<LevelId>,
}

impl GpsPosition {
    pub const INVALID: Self = Self {
        x: -1.0,
        y: -1.0,
        level: None,
    };

    pub fn new(x: f32, y: f32, level: LevelId) -> Self {
        Self {
            x,
            y,
            level: Some(level),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.level.is_some()
    }

    /// Isometric back-to-front ordering key.
    pub fn depth_key(&self) -> f32 {
        self.x + self.y
    }
}

/// Additive offset converting a position in the owning level's frame into
/// `target`'s frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborCell {
    pub delta_x: i32,
    pub delta_y: i32,
    pub target: LevelId,
}

impl NeighborCell {
    pub fn identity(level: LevelId) -> Self {
        Self {
            delta_x: 0,
            delta_y: 0,
            target: level,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (x + self.delta_x as f32, y + self.delta_y as f32)
    }

    /// Chains `self` with a hop taken from `self.target`.
    pub fn then(self, next: NeighborCell) -> NeighborCell {
        NeighborCell {
            delta_x: self.delta_x + next.delta_x,
            delta_y: self.delta_y + next.delta_y,
            target: next.target,
        }
    }
}

/// One of the nine zones around a level, laid out as
///
/// ```text
///        N
///   NW | N | NE
///  W   | C |   E
///   SW | S | SE
///        S
/// ```
///
/// with row 0 north (`y < 0`) and column 0 west (`x < 0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NeighborSlot {
    NorthWest,
    North,
    NorthEast,
    West,
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
}

impl NeighborSlot {
    pub const ALL: [NeighborSlot; 9] = [
        NeighborSlot::NorthWest,
        NeighborSlot::North,
        NeighborSlot::NorthEast,
        NeighborSlot::West,
        NeighborSlot::Center,
        NeighborSlot::East,
        NeighborSlot::SouthWest,
        NeighborSlot::South,
        NeighborSlot::SouthEast,
    ];

    pub const CORNERS: [NeighborSlot; 4] = [
        NeighborSlot::NorthWest,
        NeighborSlot::NorthEast,
        NeighborSlot::SouthWest,
        NeighborSlot::SouthEast,
    ];

    /// `(row, column)` inside the 3x3 grid.
    pub fn indices(self) -> (usize, usize) {
        match self {
            NeighborSlot::NorthWest => (0, 0),
            NeighborSlot::North => (0, 1),
            NeighborSlot::NorthEast => (0, 2),
            NeighborSlot::West => (1, 0),
            NeighborSlot::Center => (1, 1),
            NeighborSlot::East => (1, 2),
            NeighborSlot::SouthWest => (2, 0),
            NeighborSlot::South => (2, 1),
            NeighborSlot::SouthEast => (2, 2),
        }
    }

    pub fn from_indices(row: usize, column: usize) -> Option<Self> {
        if row > 2 || column > 2 {
            return None;
        }
        Some(Self::ALL[row * 3 + column])
    }

    pub fn cardinal(direction: Direction) -> Self {
        match direction {
            Direction::North => NeighborSlot::North,
            Direction::South => NeighborSlot::South,
            Direction::East => NeighborSlot::East,
            Direction::West => NeighborSlot::West,
        }
    }

    /// The two cardinal hops making up a corner, vertical hop first.
    pub fn corner_hops(self) -> Option<(Direction, Direction)> {
        match self {
            NeighborSlot::NorthWest => Some((Direction::North, Direction::West)),
            NeighborSlot::NorthEast => Some((Direction::North, Direction::East)),
            NeighborSlot::SouthWest => Some((Direction::South, Direction::West)),
            NeighborSlot::SouthEast => Some((Direction::South, Direction::East)),
            _ => None,
        }
    }

    /// Zone of `(x, y)` relative to a `width x height` level.
    pub fn classify(x: f32, y: f32, width: u32, height: u32) -> Self {
        let column = axis_index(x, width);
        let row = axis_index(y, height);
        Self::ALL[row * 3 + column]
    }
}

fn axis_index(value: f32, len: u32) -> usize {
    if value < 0.0 {
        0
    } else if value < len as f32 {
        1
    } else {
        2
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GpsError {
    #[error("level {level} is outside the valid level range 0..{max_levels}")]
    LevelOutOfRange { level: LevelId, max_levels: usize },
    #[error("level {level} does not exist")]
    UnknownLevel { level: LevelId },
    #[error("position is the invalid sentinel where a real position is required")]
    InvalidPosition,
    #[error("level graph is stale; topology changed since the last build")]
    TopologyStale,
}

/// Applies `policy` to a failed matrix lookup: under [`InvalidLevelPolicy::Warn`]
/// a bad level id degrades to the invalid sentinel.
pub fn recover_invalid_level(
    result: Result<GpsPosition, GpsError>,
    policy: InvalidLevelPolicy,
) -> Result<GpsPosition, GpsError> {
    match (result, policy) {
        (Err(error @ GpsError::LevelOutOfRange { .. }), InvalidLevelPolicy::Warn) => {
            warn!(error = %error, "gps_invalid_level_id_ignored");
            Ok(GpsPosition::INVALID)
        }
        (result, _) => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_covers_all_nine_zones() {
        assert_eq!(NeighborSlot::classify(-0.5, -0.5, 10, 8), NeighborSlot::NorthWest);
        assert_eq!(NeighborSlot::classify(5.0, -3.0, 10, 8), NeighborSlot::North);
        assert_eq!(NeighborSlot::classify(10.0, -3.0, 10, 8), NeighborSlot::NorthEast);
        assert_eq!(NeighborSlot::classify(-1.0, 4.0, 10, 8), NeighborSlot::West);
        assert_eq!(NeighborSlot::classify(0.0, 0.0, 10, 8), NeighborSlot::Center);
        assert_eq!(NeighborSlot::classify(9.99, 7.99, 10, 8), NeighborSlot::Center);
        assert_eq!(NeighborSlot::classify(12.0, 4.0, 10, 8), NeighborSlot::East);
        assert_eq!(NeighborSlot::classify(-1.0, 8.0, 10, 8), NeighborSlot::SouthWest);
        assert_eq!(NeighborSlot::classify(3.0, 8.0, 10, 8), NeighborSlot::South);
        assert_eq!(NeighborSlot::classify(10.0, 8.0, 10, 8), NeighborSlot::SouthEast);
    }

    #[test]
    fn slot_indices_round_trip() {
        for slot in NeighborSlot::ALL {
            let (row, column) = slot.indices();
            assert_eq!(NeighborSlot::from_indices(row, column), Some(slot));
        }
        assert_eq!(NeighborSlot::from_indices(3, 0), None);
    }

    #[test]
    fn chained_cells_sum_deltas_and_keep_last_target() {
        let north = NeighborCell {
            delta_x: 0,
            delta_y: 15,
            target: LevelId(1),
        };
        let west = NeighborCell {
            delta_x: 12,
            delta_y: 0,
            target: LevelId(2),
        };
        assert_eq!(
            north.then(west),
            NeighborCell {
                delta_x: 12,
                delta_y: 15,
                target: LevelId(2),
            }
        );
        assert_eq!(north.apply(1.5, -2.0), (1.5, 13.0));
    }

    #[test]
    fn warn_policy_turns_bad_ids_into_sentinel() {
        let error = GpsError::LevelOutOfRange {
            level: LevelId(500),
            max_levels: 100,
        };
        assert_eq!(
            recover_invalid_level(Err(error.clone()), InvalidLevelPolicy::Warn),
            Ok(GpsPosition::INVALID)
        );
        assert_eq!(
            recover_invalid_level(Err(error.clone()), InvalidLevelPolicy::Fatal),
            Err(error)
        );
        assert_eq!(
            recover_invalid_level(Err(GpsError::TopologyStale), InvalidLevelPolicy::Warn),
            Err(GpsError::TopologyStale)
        );
    }
}
