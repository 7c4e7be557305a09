use tracing::debug;

use crate::level::LevelId;

use super::{GpsError, GpsPosition, LevelGraph};

impl LevelGraph {
    /// Re-expresses `source` in `target`'s frame without moving anything.
    ///
    /// Returns [`GpsPosition::INVALID`] when the two levels are not joined by a
    /// precomputed transform (more than two hops apart, or unconnected).
    /// Level ids outside `0..max_levels` are a caller bug and come back as
    /// [`GpsError::LevelOutOfRange`].
    pub fn project(&self, source: GpsPosition, target: LevelId) -> Result<GpsPosition, GpsError> {
        let Some(source_level) = source.level else {
            debug!(target = target.0, "gps_project_from_invalid_position");
            return Ok(GpsPosition::INVALID);
        };
        if source_level == target {
            return Ok(source);
        }
        for level in [source_level, target] {
            if !self.matrix().in_range(level) {
                return Err(GpsError::LevelOutOfRange {
                    level,
                    max_levels: self.max_levels(),
                });
            }
        }
        if self.is_dirty() {
            return Err(GpsError::TopologyStale);
        }

        Ok(match self.transform(source_level, target) {
            Some(cell) => {
                let (x, y) = cell.apply(source.x, source.y);
                GpsPosition::new(x, y, target)
            }
            None => GpsPosition::INVALID,
        })
    }
}
