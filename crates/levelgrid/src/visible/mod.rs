//! Frame-to-frame cache of the levels close enough to the viewer to need
//! drawing and animating.

use tracing::debug;

use crate::gps::{GpsError, GpsPosition, LevelGraph, NeighborSlot};
use crate::level::LevelId;

mod animated;

pub use animated::{AnimatedObstacle, AnimatedObstacleCache, AnimatedObstacleKind};

#[derive(Debug, Clone, PartialEq)]
pub struct VisibleLevelEntry {
    level: LevelId,
    valid: bool,
    boundary_squared_distance: f32,
    animated: AnimatedObstacleCache,
    cache_dirty: bool,
}

impl VisibleLevelEntry {
    fn new(level: LevelId, boundary_squared_distance: f32) -> Self {
        Self {
            level,
            valid: true,
            boundary_squared_distance,
            animated: AnimatedObstacleCache::default(),
            cache_dirty: true,
        }
    }

    pub fn level(&self) -> LevelId {
        self.level
    }

    /// Whether the last refresh found this level inside the viewer's window.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Squared distance from the viewer to the shared boundary with this
    /// level; `0.0` for the viewer's own level.
    pub fn boundary_squared_distance(&self) -> f32 {
        self.boundary_squared_distance
    }

    pub fn animated_obstacles(&self) -> &AnimatedObstacleCache {
        &self.animated
    }

    pub fn is_cache_dirty(&self) -> bool {
        self.cache_dirty
    }

    pub fn invalidate_animated_cache(&mut self) {
        self.cache_dirty = true;
    }

    /// Refills the animated-obstacle cache and marks it clean.
    pub fn rebuild_animated_cache<I>(&mut self, obstacles: I)
    where
        I: IntoIterator<Item = (usize, Option<AnimatedObstacleKind>)>,
    {
        self.animated.fill(obstacles);
        self.cache_dirty = false;
    }

    fn release(&mut self) {
        self.animated.clear();
        self.cache_dirty = true;
    }
}

/// Levels added and dropped by one [`VisibleLevelSet::refresh`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub created: Vec<LevelId>,
    pub evicted: Vec<LevelId>,
}

impl RefreshReport {
    pub fn is_unchanged(&self) -> bool {
        self.created.is_empty() && self.evicted.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct VisibleLevelSet {
    entries: Vec<VisibleLevelEntry>,
    current_level: Option<LevelId>,
}

impl VisibleLevelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Level the viewer stood on during the last refresh.
    pub fn current_level(&self) -> Option<LevelId> {
        self.current_level
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Revalidates entries for the neighbor slots the viewer can see from
    /// `viewer`, creating missing ones.
    ///
    /// Invalid entries are evicted only when the viewer's level changed since
    /// the previous refresh and the entry's level has no transform from the
    /// new current level. On error the set is left untouched.
    pub fn refresh(
        &mut self,
        graph: &LevelGraph,
        viewer: GpsPosition,
        margin: f32,
    ) -> Result<RefreshReport, GpsError> {
        let current = viewer.level.ok_or(GpsError::InvalidPosition)?;
        if !graph.matrix().in_range(current) {
            return Err(GpsError::LevelOutOfRange {
                level: current,
                max_levels: graph.max_levels(),
            });
        }
        if graph.is_dirty() {
            return Err(GpsError::TopologyStale);
        }
        let (width, height) = graph
            .extent(current)
            .ok_or(GpsError::UnknownLevel { level: current })?;

        for entry in &mut self.entries {
            entry.valid = false;
        }

        let mut report = RefreshReport::default();
        let window = VisibilityWindow::around(viewer, width, height, margin);
        for (slot, squared_distance) in window.slots() {
            let Some(cell) = graph.neighbor(current, slot) else {
                continue;
            };
            match self.entries.iter_mut().find(|entry| entry.level == cell.target) {
                // A level wrapping onto itself shows up in more than one slot.
                Some(entry) if entry.valid => {
                    entry.boundary_squared_distance =
                        entry.boundary_squared_distance.min(squared_distance);
                }
                Some(entry) => {
                    entry.valid = true;
                    entry.boundary_squared_distance = squared_distance;
                }
                None => {
                    self.entries
                        .push(VisibleLevelEntry::new(cell.target, squared_distance));
                    report.created.push(cell.target);
                }
            }
        }

        if self.current_level != Some(current) {
            let previous = self.current_level.replace(current);
            self.entries.retain_mut(|entry| {
                if entry.valid || graph.is_connected(current, entry.level) {
                    return true;
                }
                entry.release();
                report.evicted.push(entry.level);
                false
            });
            debug!(
                previous = ?previous.map(|level| level.0),
                current = current.0,
                evicted = report.evicted.len(),
                "visible_levels_current_level_changed"
            );
        }

        if !report.is_unchanged() {
            debug!(
                level = current.0,
                created = report.created.len(),
                evicted = report.evicted.len(),
                entries = self.entries.len(),
                "visible_levels_refreshed"
            );
        }
        Ok(report)
    }

    /// Drops every entry and forgets the current level.
    pub fn reset(&mut self) {
        for entry in &mut self.entries {
            entry.release();
        }
        self.entries.clear();
        self.current_level = None;
    }

    /// The current level always counts as visible, even before its entry
    /// exists.
    pub fn level_is_visible(&self, level: LevelId) -> bool {
        self.current_level == Some(level)
            || self
                .entries
                .iter()
                .any(|entry| entry.valid && entry.level == level)
    }

    /// Drops `level`'s entry, as when the level is unloaded. Returns whether
    /// there was one.
    pub fn forget(&mut self, level: LevelId) -> bool {
        let Some(index) = self.entries.iter().position(|entry| entry.level == level) else {
            return false;
        };
        self.entries.remove(index).release();
        true
    }

    pub fn entry(&self, level: LevelId) -> Option<&VisibleLevelEntry> {
        self.entries.iter().find(|entry| entry.level == level)
    }

    pub fn entry_mut(&mut self, level: LevelId) -> Option<&mut VisibleLevelEntry> {
        self.entries.iter_mut().find(|entry| entry.level == level)
    }

    /// All tracked entries in creation order, including ones kept past their
    /// last validation.
    pub fn iter(&self) -> impl Iterator<Item = &VisibleLevelEntry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut VisibleLevelEntry> {
        self.entries.iter_mut()
    }

    /// Entries validated by the last refresh.
    pub fn visible(&self) -> impl Iterator<Item = &VisibleLevelEntry> {
        self.entries.iter().filter(|entry| entry.valid)
    }

    /// Visible entries whose boundary lies strictly closer than `distance`.
    pub fn nearby(&self, distance: f32) -> impl Iterator<Item = &VisibleLevelEntry> {
        let limit = distance * distance;
        self.visible()
            .filter(move |entry| entry.boundary_squared_distance < limit)
    }
}

/// Sub-rectangle of the 3x3 neighbor grid the viewer can currently see.
#[derive(Debug, Clone, Copy, PartialEq)]
struct VisibilityWindow {
    columns: (usize, usize),
    rows: (usize, usize),
    horizontal_distance: f32,
    vertical_distance: f32,
}

impl VisibilityWindow {
    fn around(viewer: GpsPosition, width: u32, height: u32, margin: f32) -> Self {
        let margin = margin.max(0.0);
        let (columns, horizontal_distance) = window_axis(viewer.x, width, margin);
        let (rows, vertical_distance) = window_axis(viewer.y, height, margin);
        Self {
            columns,
            rows,
            horizontal_distance,
            vertical_distance,
        }
    }

    fn slots(self) -> impl Iterator<Item = (NeighborSlot, f32)> {
        (self.rows.0..=self.rows.1).flat_map(move |row| {
            let latitude = if row == 1 { 0.0 } else { self.vertical_distance };
            (self.columns.0..=self.columns.1).filter_map(move |column| {
                let longitude = if column == 1 {
                    0.0
                } else {
                    self.horizontal_distance
                };
                NeighborSlot::from_indices(row, column)
                    .map(|slot| (slot, longitude * longitude + latitude * latitude))
            })
        })
    }
}

/// Low edge wins when a level is narrower than twice the margin.
fn window_axis(value: f32, len: u32, margin: f32) -> ((usize, usize), f32) {
    let len = len as f32;
    if value < margin {
        ((0, 1), value)
    } else if value >= len - margin {
        ((1, 2), len - value)
    } else {
        ((1, 1), 0.0)
    }
}
