use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{GridConfig, InvalidLevelPolicy};
use crate::draw::{DrawCandidate, DrawList, DrawStats, TileRect, ViewBounds};
use crate::gps::{recover_invalid_level, GpsError, GpsPosition, LevelGraph};
use crate::level::{Level, LevelDesc, LevelId, LevelTable, LevelTableError};
use crate::visible::{RefreshReport, VisibleLevelEntry, VisibleLevelSet};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error(transparent)]
    Gps(#[from] GpsError),
    #[error(transparent)]
    LevelTable(#[from] LevelTableError),
}

/// Result of a floor lookup at a possibly virtual position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileLookup {
    Tile(u16),
    /// No level owns the point; render it fully dark.
    OutOfView,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct FrameState {
    viewer: GpsPosition,
    generation: u64,
}

/// Level table, graph and visible set kept in step for one viewer.
///
/// Per frame: [`WorldMap::begin_frame`] with the viewer's position, then
/// [`WorldMap::build_draw_list`] and any number of lookups.
#[derive(Debug, Clone)]
pub struct WorldMap {
    config: GridConfig,
    levels: LevelTable,
    graph: LevelGraph,
    visible: VisibleLevelSet,
    frame: Option<FrameState>,
}

impl WorldMap {
    pub fn new(config: GridConfig) -> Self {
        let max_levels = config.max_levels;
        Self {
            config,
            levels: LevelTable::with_capacity(max_levels),
            graph: LevelGraph::new(max_levels),
            visible: VisibleLevelSet::new(),
            frame: None,
        }
    }

    pub fn from_descs(
        config: GridConfig,
        descs: impl IntoIterator<Item = LevelDesc>,
    ) -> Result<Self, WorldError> {
        let levels = LevelTable::from_descs(config.max_levels, descs)?;
        let mut world = Self::new(config);
        world.levels = levels;
        Ok(world)
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn levels(&self) -> &LevelTable {
        &self.levels
    }

    pub fn level(&self, id: LevelId) -> Option<&Level> {
        self.levels.get(id)
    }

    /// Mutable access for editors. The topology is assumed to change; the
    /// next [`WorldMap::ensure_graph`] skips the rebuild when it did not.
    /// The level's animated-obstacle cache is always marked dirty.
    pub fn level_mut(&mut self, id: LevelId) -> Option<&mut Level> {
        let level = self.levels.get_mut(id)?;
        self.graph.invalidate();
        if let Some(entry) = self.visible.entry_mut(id) {
            entry.invalidate_animated_cache();
        }
        Some(level)
    }

    pub fn insert_level(&mut self, level: Level) -> Result<Option<Level>, WorldError> {
        let id = level.id();
        let previous = self.levels.insert(level)?;
        if let Some(entry) = self.visible.entry_mut(id) {
            entry.invalidate_animated_cache();
        }
        self.mark_topology_changed();
        Ok(previous)
    }

    pub fn remove_level(&mut self, id: LevelId) -> Option<Level> {
        let removed = self.levels.remove(id)?;
        if self.visible.forget(id) {
            debug!(level = id.0, "visible_level_dropped_with_removed_level");
        }
        self.mark_topology_changed();
        Some(removed)
    }

    /// Signal from the level loader that levels were loaded or unloaded.
    pub fn mark_topology_changed(&mut self) {
        self.graph.invalidate();
    }

    /// Brings the level graph up to date. Returns whether a rebuild ran.
    pub fn ensure_graph(&mut self) -> bool {
        self.graph.build_if_changed(&self.levels)
    }

    pub fn graph(&self) -> &LevelGraph {
        &self.graph
    }

    pub fn visible_levels(&self) -> &VisibleLevelSet {
        &self.visible
    }

    /// For animation consumers that rebuild entry caches.
    pub fn visible_levels_mut(&mut self) -> &mut VisibleLevelSet {
        &mut self.visible
    }

    /// Visible levels within the configured nearby distance.
    pub fn nearby_levels(&self) -> impl Iterator<Item = &VisibleLevelEntry> {
        self.visible.nearby(self.config.effective_nearby_distance())
    }

    /// Drops the visible set, as after loading a saved game.
    pub fn reset_visible_levels(&mut self) {
        self.visible.reset();
        self.frame = None;
    }

    /// Viewer position recorded by the last successful
    /// [`WorldMap::begin_frame`], already resolved onto its owning level.
    pub fn frame_viewer(&self) -> Option<GpsPosition> {
        self.frame.map(|frame| frame.viewer)
    }

    /// Rebuilds the graph if needed and refreshes the visible set around
    /// `viewer`. A viewer slightly past its level's edge is resolved onto
    /// the neighbor it is really standing on.
    pub fn begin_frame(&mut self, viewer: GpsPosition) -> Result<RefreshReport, WorldError> {
        self.frame = None;
        self.ensure_graph();

        let level = viewer.level.ok_or(GpsError::InvalidPosition)?;
        if !self.graph.matrix().in_range(level) {
            return Err(GpsError::LevelOutOfRange {
                level,
                max_levels: self.graph.max_levels(),
            }
            .into());
        }
        if !self.graph.level_exists(level) {
            return Err(GpsError::UnknownLevel { level }.into());
        }
        let real = self
            .graph
            .resolve(viewer)
            .ok_or(GpsError::InvalidPosition)?;
        if real.level != viewer.level {
            debug!(
                from = level.0,
                to = ?real.level.map(|level| level.0),
                "viewer_position_resolved_onto_neighbor"
            );
        }

        let margin = self.config.effective_visibility_margin();
        let report = self.visible.refresh(&self.graph, real, margin)?;
        self.frame = Some(FrameState {
            viewer: real,
            generation: self.graph.generation(),
        });
        Ok(report)
    }

    /// Fills `out` with the candidates on visible levels, projected into the
    /// viewer's frame and depth sorted.
    pub fn build_draw_list<T, I>(
        &self,
        candidates: I,
        view_bounds: Option<&ViewBounds>,
        out: &mut DrawList<T>,
    ) -> Result<DrawStats, WorldError>
    where
        I: IntoIterator<Item = DrawCandidate<T>>,
    {
        let viewer_level = match self.current_frame() {
            Ok(frame) => frame.viewer.level.ok_or(GpsError::InvalidPosition)?,
            Err(error) => {
                out.clear();
                return Err(error.into());
            }
        };
        let stats = out.rebuild(
            &self.graph,
            &self.visible,
            viewer_level,
            candidates,
            view_bounds,
            self.config.invalid_level_policy,
        )?;
        Ok(stats)
    }

    /// Tile rectangles of every visible level's floor that fall inside
    /// `view_bounds`, given in the viewer's frame.
    pub fn visible_floor_rects(
        &self,
        view_bounds: &ViewBounds,
    ) -> Result<Vec<(LevelId, TileRect)>, WorldError> {
        let frame = self.current_frame()?;
        let viewer_level = frame.viewer.level.ok_or(GpsError::InvalidPosition)?;
        let mut rects = Vec::new();
        for entry in self.visible.visible() {
            let Some(cell) = self.graph.transform(entry.level(), viewer_level) else {
                continue;
            };
            let Some((width, height)) = self.graph.extent(entry.level()) else {
                continue;
            };
            let local = ViewBounds {
                min_x: view_bounds.min_x - cell.delta_x as f32,
                max_x: view_bounds.max_x - cell.delta_x as f32,
                min_y: view_bounds.min_y - cell.delta_y as f32,
                max_y: view_bounds.max_y - cell.delta_y as f32,
            };
            if let Some(rect) = local.tile_rect(width, height) {
                rects.push((entry.level(), rect));
            }
        }
        Ok(rects)
    }

    pub fn project(&self, source: GpsPosition, target: LevelId) -> Result<GpsPosition, WorldError> {
        let projected = recover_invalid_level(
            self.graph.project(source, target),
            self.config.invalid_level_policy,
        )?;
        Ok(projected)
    }

    pub fn resolve(&self, virtual_pos: GpsPosition) -> Option<GpsPosition> {
        self.graph.resolve(virtual_pos)
    }

    /// Floor tile under `(x, y)` in `level`'s frame, following the point onto
    /// a neighbor when it lies past the edge.
    pub fn tile_at(&self, level: LevelId, x: f32, y: f32) -> Result<TileLookup, WorldError> {
        if !self.graph.matrix().in_range(level) {
            let error = GpsError::LevelOutOfRange {
                level,
                max_levels: self.graph.max_levels(),
            };
            return match self.config.invalid_level_policy {
                InvalidLevelPolicy::Fatal => Err(error.into()),
                InvalidLevelPolicy::Warn => {
                    warn!(error = %error, "tile_lookup_invalid_level_id_ignored");
                    Ok(TileLookup::OutOfView)
                }
            };
        }
        if self.graph.is_dirty() {
            return Err(GpsError::TopologyStale.into());
        }

        let Some(real) = self.graph.resolve(GpsPosition::new(x, y, level)) else {
            return Ok(TileLookup::OutOfView);
        };
        let tile = real
            .level
            .and_then(|owner| self.levels.get(owner))
            .filter(|owner| owner.contains(real.x, real.y))
            .and_then(|owner| owner.tile_at(real.x.floor() as u32, real.y.floor() as u32));
        Ok(tile.map_or(TileLookup::OutOfView, TileLookup::Tile))
    }

    pub fn level_is_visible(&self, level: LevelId) -> bool {
        self.visible.level_is_visible(level)
    }

    fn current_frame(&self) -> Result<FrameState, GpsError> {
        match self.frame {
            Some(frame)
                if !self.graph.is_dirty() && frame.generation == self.graph.generation() =>
            {
                Ok(frame)
            }
            _ => Err(GpsError::TopologyStale),
        }
    }
}
