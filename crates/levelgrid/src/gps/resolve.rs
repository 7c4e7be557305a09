use tracing::{debug, warn};

use super::{GpsPosition, LevelGraph, NeighborSlot};

impl LevelGraph {
    /// Maps a virtual position, expressed in its `level`'s frame and possibly
    /// outside that level's bounds, back to the level that really owns it.
    ///
    /// Only the eight direct neighbors are considered. `None` means the point
    /// has no owner (no neighbor in that zone, or it overshoots the neighbor)
    /// and must not be used to index level data.
    pub fn resolve(&self, virtual_pos: GpsPosition) -> Option<GpsPosition> {
        let Some(home) = virtual_pos.level else {
            warn!(
                x = virtual_pos.x,
                y = virtual_pos.y,
                "gps_resolve_called_with_invalid_position"
            );
            return None;
        };
        if self.is_dirty() {
            warn!(level = home.0, "gps_resolve_on_stale_level_graph");
            return None;
        }
        let (width, height) = self.extent(home)?;

        let slot = NeighborSlot::classify(virtual_pos.x, virtual_pos.y, width, height);
        if slot == NeighborSlot::Center {
            return Some(virtual_pos);
        }

        let Some(cell) = self.neighbor(home, slot) else {
            debug!(level = home.0, slot = ?slot, "gps_resolve_no_neighbor");
            return None;
        };
        let (x, y) = cell.apply(virtual_pos.x, virtual_pos.y);
        let (target_width, target_height) = self.extent(cell.target)?;
        if NeighborSlot::classify(x, y, target_width, target_height) != NeighborSlot::Center {
            return None;
        }
        Some(GpsPosition::new(x, y, cell.target))
    }
}
