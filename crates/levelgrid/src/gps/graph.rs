use tracing::{debug, info, warn};

use crate::level::{Direction, Level, LevelId, LevelTable, TopologyFingerprint};

use super::{NeighborCell, NeighborSlot};

pub type NeighborGrid = [[Option<NeighborCell>; 3]; 3];

const EMPTY_GRID: NeighborGrid = [[None; 3]; 3];

/// Dense `from x to` table of level-to-level transforms.
///
/// Only pairs joined by at most two cardinal hops carry an entry.
#[derive(Debug, Clone, Default)]
pub struct TransformMatrix {
    size: usize,
    cells: Vec<Option<NeighborCell>>,
}

impl TransformMatrix {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn in_range(&self, level: LevelId) -> bool {
        level.index() < self.size
    }

    pub fn get(&self, from: LevelId, to: LevelId) -> Option<NeighborCell> {
        self.index_of(from, to).and_then(|index| self.cells[index])
    }

    pub fn valid_entry_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    fn clear(&mut self) {
        self.cells.iter_mut().for_each(|cell| *cell = None);
    }

    /// Stores `cell` unless the pair already has an entry. Returns whether it
    /// was stored.
    fn insert_if_vacant(&mut self, from: LevelId, cell: NeighborCell) -> bool {
        let Some(index) = self.index_of(from, cell.target) else {
            return false;
        };
        if self.cells[index].is_some() {
            return false;
        }
        self.cells[index] = Some(cell);
        true
    }

    fn index_of(&self, from: LevelId, to: LevelId) -> Option<usize> {
        if !self.in_range(from) || !self.in_range(to) {
            return None;
        }
        Some(from.index() * self.size + to.index())
    }
}

/// Both orderings of a diagonal composition exist but land on different
/// levels or offsets. The first ordering (vertical hop first) was kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CornerConflict {
    pub level: LevelId,
    pub slot: NeighborSlot,
    pub kept: NeighborCell,
    pub rejected: NeighborCell,
}

#[derive(Debug, Clone)]
pub struct LevelGraph {
    matrix: TransformMatrix,
    neighbors: Vec<NeighborGrid>,
    extents: Vec<Option<(u32, u32)>>,
    corner_conflicts: Vec<CornerConflict>,
    built_from: Option<TopologyFingerprint>,
    generation: u64,
    dirty: bool,
}

impl LevelGraph {
    /// Creates an empty graph for ids `0..max_levels`. The graph starts dirty.
    pub fn new(max_levels: usize) -> Self {
        Self {
            matrix: TransformMatrix::new(max_levels),
            neighbors: vec![EMPTY_GRID; max_levels],
            extents: vec![None; max_levels],
            corner_conflicts: Vec::new(),
            built_from: None,
            generation: 0,
            dirty: true,
        }
    }

    pub fn max_levels(&self) -> usize {
        self.matrix.size()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Marks the topology as changed; the next [`LevelGraph::build`] recomputes
    /// everything.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Number of completed rebuilds.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn built_from(&self) -> Option<TopologyFingerprint> {
        self.built_from
    }

    /// Rebuilds when dirty, otherwise does nothing. Returns whether a rebuild
    /// ran.
    pub fn build(&mut self, levels: &LevelTable) -> bool {
        if !self.dirty {
            return false;
        }
        self.rebuild(levels);
        true
    }

    /// Like [`LevelGraph::build`], but a dirty graph whose level table still
    /// hashes to the fingerprint it was built from is only marked clean.
    pub fn build_if_changed(&mut self, levels: &LevelTable) -> bool {
        if !self.dirty {
            return false;
        }
        let fingerprint = levels.fingerprint();
        if self.built_from == Some(fingerprint) {
            debug!(
                fingerprint = %fingerprint,
                generation = self.generation,
                "level_graph_rebuild_skipped_topology_unchanged"
            );
            self.dirty = false;
            return false;
        }
        self.rebuild(levels);
        true
    }

    /// Recomputes the transform matrix and every 3x3 neighbor grid from scratch.
    pub fn rebuild(&mut self, levels: &LevelTable) {
        self.matrix.clear();
        self.neighbors.iter_mut().for_each(|grid| *grid = EMPTY_GRID);
        self.extents.iter_mut().for_each(|extent| *extent = None);
        self.corner_conflicts.clear();

        let mut level_count = 0usize;
        for level in levels.iter() {
            if !self.matrix.in_range(level.id()) {
                warn!(
                    level = level.id().0,
                    max_levels = self.max_levels(),
                    "level_graph_level_out_of_range_skipped"
                );
                continue;
            }
            self.extents[level.id().index()] = Some((level.width(), level.height()));
            let identity = NeighborCell::identity(level.id());
            self.matrix.insert_if_vacant(level.id(), identity);
            self.set_slot(level.id(), NeighborSlot::Center, identity);
            level_count += 1;
        }

        for level in levels.iter() {
            if self.extent(level.id()).is_some() {
                self.link_cardinals(level);
            }
        }

        for index in 0..self.max_levels() {
            let level = LevelId(index as u32);
            if self.extent(level).is_some() {
                self.link_corners(level);
            }
        }

        self.built_from = Some(levels.fingerprint());
        self.generation = self.generation.saturating_add(1);
        self.dirty = false;
        info!(
            levels = level_count,
            transforms = self.matrix.valid_entry_count(),
            corner_conflicts = self.corner_conflicts.len(),
            generation = self.generation,
            "level_graph_rebuilt"
        );
    }

    pub fn matrix(&self) -> &TransformMatrix {
        &self.matrix
    }

    pub fn level_exists(&self, level: LevelId) -> bool {
        self.extent(level).is_some()
    }

    pub fn extent(&self, level: LevelId) -> Option<(u32, u32)> {
        self.extents.get(level.index()).copied().flatten()
    }

    pub fn transform(&self, from: LevelId, to: LevelId) -> Option<NeighborCell> {
        self.matrix.get(from, to)
    }

    pub fn is_connected(&self, from: LevelId, to: LevelId) -> bool {
        self.transform(from, to).is_some()
    }

    pub fn neighbor(&self, level: LevelId, slot: NeighborSlot) -> Option<NeighborCell> {
        let (row, column) = slot.indices();
        self.neighbors
            .get(level.index())
            .and_then(|grid| grid[row][column])
    }

    pub fn neighbor_grid(&self, level: LevelId) -> Option<&NeighborGrid> {
        if !self.level_exists(level) {
            return None;
        }
        self.neighbors.get(level.index())
    }

    pub fn corner_conflicts(&self) -> &[CornerConflict] {
        &self.corner_conflicts
    }

    fn set_slot(&mut self, level: LevelId, slot: NeighborSlot, cell: NeighborCell) {
        let (row, column) = slot.indices();
        self.neighbors[level.index()][row][column] = Some(cell);
    }

    fn link_cardinals(&mut self, level: &Level) {
        for direction in Direction::ALL {
            let Some(target) = level.jump_target(direction) else {
                continue;
            };
            let Some((target_width, target_height)) = self.extent(target) else {
                warn!(
                    level = level.id().0,
                    target = target.0,
                    direction = ?direction,
                    "level_graph_dangling_jump_target"
                );
                continue;
            };
            // Level construction caps every side at `MAX_LEVEL_EXTENT`.
            let (delta_x, delta_y) = match direction {
                Direction::North => (0, target_height as i32),
                Direction::South => (0, -(level.height() as i32)),
                Direction::East => (-(level.width() as i32), 0),
                Direction::West => (target_width as i32, 0),
            };
            let cell = NeighborCell {
                delta_x,
                delta_y,
                target,
            };
            self.set_slot(level.id(), NeighborSlot::cardinal(direction), cell);
            if !self.matrix.insert_if_vacant(level.id(), cell) {
                debug!(
                    level = level.id().0,
                    target = target.0,
                    direction = ?direction,
                    "level_graph_transform_already_present"
                );
            }
        }
    }

    fn link_corners(&mut self, level: LevelId) {
        for slot in NeighborSlot::CORNERS {
            let Some((vertical, horizontal)) = slot.corner_hops() else {
                continue;
            };
            let first = self.compose(level, vertical, horizontal);
            let second = self.compose(level, horizontal, vertical);
            let cell = match (first, second) {
                (Some(kept), Some(rejected)) if kept != rejected => {
                    warn!(
                        level = level.0,
                        slot = ?slot,
                        kept_target = kept.target.0,
                        rejected_target = rejected.target.0,
                        "level_graph_corner_orderings_disagree"
                    );
                    self.corner_conflicts.push(CornerConflict {
                        level,
                        slot,
                        kept,
                        rejected,
                    });
                    kept
                }
                (Some(cell), _) | (None, Some(cell)) => cell,
                (None, None) => continue,
            };
            self.set_slot(level, slot, cell);
            self.matrix.insert_if_vacant(level, cell);
        }
    }

    fn compose(
        &self,
        level: LevelId,
        first: Direction,
        second: Direction,
    ) -> Option<NeighborCell> {
        let hop = self.neighbor(level, NeighborSlot::cardinal(first))?;
        let next = self.neighbor(hop.target, NeighborSlot::cardinal(second))?;
        Some(hop.then(next))
    }
}
