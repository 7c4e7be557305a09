pub mod config;
pub mod draw;
pub mod gps;
pub mod level;
pub mod visible;
mod world;

pub use config::{GridConfig, InvalidLevelPolicy, VISIBILITY_MARGIN_ENV_VAR};
pub use draw::{DrawCandidate, DrawKind, DrawList, DrawListEntry, DrawStats, TileRect, ViewBounds};
pub use gps::{
    recover_invalid_level, CornerConflict, GpsError, GpsPosition, LevelGraph, NeighborCell,
    NeighborSlot, TransformMatrix,
};
pub use level::{
    Direction, JumpTargets, Level, LevelDesc, LevelId, LevelTable, LevelTableError,
    TopologyFingerprint,
};
pub use visible::{
    AnimatedObstacle, AnimatedObstacleCache, AnimatedObstacleKind, RefreshReport,
    VisibleLevelEntry, VisibleLevelSet,
};
pub use world::{TileLookup, WorldError, WorldMap};
