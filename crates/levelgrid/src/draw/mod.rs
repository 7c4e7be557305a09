//! Back-to-front draw ordering across every visible level.

use tracing::{debug, warn};

use crate::config::InvalidLevelPolicy;
use crate::gps::{recover_invalid_level, GpsError, GpsPosition, LevelGraph};
use crate::level::LevelId;
use crate::visible::VisibleLevelSet;

mod bounds;

pub use bounds::{TileRect, ViewBounds};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawKind {
    Obstacle,
    Actor,
    Projectile,
    Effect,
    GroundItem,
    /// The viewer's own marker, already in the viewer frame.
    Viewer,
    MoveCursor,
}

/// Something that wants drawing, at its real position.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCandidate<T> {
    pub position: GpsPosition,
    pub kind: DrawKind,
    pub payload: T,
}

impl<T> DrawCandidate<T> {
    pub fn new(position: GpsPosition, kind: DrawKind, payload: T) -> Self {
        Self {
            position,
            kind,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawListEntry<T> {
    /// `x + y` of `position`.
    pub depth_key: f32,
    /// Position in the viewer level's frame.
    pub position: GpsPosition,
    pub kind: DrawKind,
    pub payload: T,
    sequence: u64,
}

/// Per-frame counters of what happened to the candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub drawn: usize,
    pub hidden_level: usize,
    pub unprojectable: usize,
    pub culled: usize,
    pub non_finite: usize,
}

/// Painter's-algorithm list: entries sorted by non-decreasing depth key,
/// ties kept in insertion order. Draw from the front.
#[derive(Debug, Clone)]
pub struct DrawList<T> {
    entries: Vec<DrawListEntry<T>>,
    viewer_level: Option<LevelId>,
    next_sequence: u64,
    stats: DrawStats,
    warned_non_finite: bool,
}

impl<T> Default for DrawList<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            viewer_level: None,
            next_sequence: 0,
            stats: DrawStats::default(),
            warned_non_finite: false,
        }
    }
}

impl<T> DrawList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn viewer_level(&self) -> Option<LevelId> {
        self.viewer_level
    }

    pub fn stats(&self) -> DrawStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[DrawListEntry<T>] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrawListEntry<T>> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.viewer_level = None;
        self.next_sequence = 0;
        self.stats = DrawStats::default();
    }

    /// Replaces the list with every candidate that lives on a visible level
    /// and projects into `viewer_level`'s frame.
    ///
    /// Candidates that cannot be projected are dropped for this frame; only a
    /// stale graph (or a bad level id under [`InvalidLevelPolicy::Fatal`]) is
    /// an error, in which case the list is left empty.
    pub fn rebuild<I>(
        &mut self,
        graph: &LevelGraph,
        visible: &VisibleLevelSet,
        viewer_level: LevelId,
        candidates: I,
        view_bounds: Option<&ViewBounds>,
        policy: InvalidLevelPolicy,
    ) -> Result<DrawStats, GpsError>
    where
        I: IntoIterator<Item = DrawCandidate<T>>,
    {
        self.clear();
        if graph.is_dirty() {
            return Err(GpsError::TopologyStale);
        }
        self.viewer_level = Some(viewer_level);

        for candidate in candidates {
            let Some(level) = candidate.position.level else {
                self.stats.unprojectable += 1;
                continue;
            };
            if !graph.matrix().in_range(level) {
                let out_of_range = GpsError::LevelOutOfRange {
                    level,
                    max_levels: graph.max_levels(),
                };
                if let Err(error) = recover_invalid_level(Err(out_of_range), policy) {
                    self.clear();
                    return Err(error);
                }
                self.stats.unprojectable += 1;
                continue;
            }
            if !visible.level_is_visible(level) {
                self.stats.hidden_level += 1;
                continue;
            }
            let projected = match recover_invalid_level(
                graph.project(candidate.position, viewer_level),
                policy,
            ) {
                Ok(projected) => projected,
                Err(error) => {
                    self.clear();
                    return Err(error);
                }
            };
            if !projected.is_valid() {
                self.stats.unprojectable += 1;
                continue;
            }
            if let Some(bounds) = view_bounds {
                if !bounds.contains(projected.x, projected.y) {
                    self.stats.culled += 1;
                    continue;
                }
            }
            self.push_entry(projected, candidate.kind, candidate.payload);
        }

        self.entries.sort_by(|left, right| {
            left.depth_key
                .total_cmp(&right.depth_key)
                .then_with(|| left.sequence.cmp(&right.sequence))
        });
        self.stats.drawn = self.entries.len();
        debug!(
            level = viewer_level.0,
            drawn = self.stats.drawn,
            hidden_level = self.stats.hidden_level,
            unprojectable = self.stats.unprojectable,
            culled = self.stats.culled,
            "draw_list_rebuilt"
        );
        Ok(self.stats)
    }

    /// Inserts an entry whose position is already in the viewer's frame,
    /// after any entries with an equal depth key. Returns whether it was kept.
    pub fn push_local(&mut self, x: f32, y: f32, kind: DrawKind, payload: T) -> bool {
        let Some(level) = self.viewer_level else {
            return false;
        };
        let position = GpsPosition::new(x, y, level);
        let depth_key = position.depth_key();
        if !self.accept_depth_key(depth_key) {
            return false;
        }
        let at = self
            .entries
            .partition_point(|entry| entry.depth_key <= depth_key);
        let sequence = self.take_sequence();
        self.entries.insert(
            at,
            DrawListEntry {
                depth_key,
                position,
                kind,
                payload,
                sequence,
            },
        );
        self.stats.drawn = self.entries.len();
        true
    }

    fn push_entry(&mut self, position: GpsPosition, kind: DrawKind, payload: T) {
        let depth_key = position.depth_key();
        if !self.accept_depth_key(depth_key) {
            return;
        }
        let sequence = self.take_sequence();
        self.entries.push(DrawListEntry {
            depth_key,
            position,
            kind,
            payload,
            sequence,
        });
    }

    fn accept_depth_key(&mut self, depth_key: f32) -> bool {
        if depth_key.is_finite() {
            return true;
        }
        self.stats.non_finite += 1;
        if !self.warned_non_finite {
            self.warned_non_finite = true;
            warn!(depth_key, "draw_list_non_finite_depth_key_dropped");
        }
        false
    }

    fn take_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gps::test_support::*;
    use crate::level::{Direction, LevelTable};

    fn visible_from(graph: &LevelGraph, viewer: GpsPosition, margin: f32) -> VisibleLevelSet {
        let mut visible = VisibleLevelSet::new();
        visible.refresh(graph, viewer, margin).expect("refresh");
        visible
    }

    fn obstacle(x: f32, y: f32, level: u32, name: &'static str) -> DrawCandidate<&'static str> {
        DrawCandidate::new(GpsPosition::new(x, y, LevelId(level)), DrawKind::Obstacle, name)
    }

    fn payloads(list: &DrawList<&'static str>) -> Vec<&'static str> {
        list.iter().map(|entry| entry.payload).collect()
    }

    fn rebuild(
        list: &mut DrawList<&'static str>,
        graph: &LevelGraph,
        visible: &VisibleLevelSet,
        candidates: Vec<DrawCandidate<&'static str>>,
    ) -> DrawStats {
        list.rebuild(
            graph,
            visible,
            LevelId(0),
            candidates,
            None,
            InvalidLevelPolicy::Fatal,
        )
        .expect("rebuild")
    }

    #[test]
    fn tied_keys_keep_insertion_order_before_larger_keys() {
        let graph = built(&north_pair_table());
        let visible = visible_from(&graph, GpsPosition::new(10.0, 10.0, LevelId(0)), 5.0);
        let mut list = DrawList::new();

        rebuild(
            &mut list,
            &graph,
            &visible,
            vec![
                obstacle(3.0, 4.0, 0, "far"),
                obstacle(1.0, 2.0, 0, "first_tie"),
                obstacle(2.0, 1.0, 0, "second_tie"),
            ],
        );
        assert_eq!(payloads(&list), vec!["first_tie", "second_tie", "far"]);
        let keys: Vec<f32> = list.iter().map(|entry| entry.depth_key).collect();
        assert_eq!(keys, vec![3.0, 3.0, 7.0]);
    }

    #[test]
    fn neighbor_objects_are_projected_into_viewer_frame() {
        let graph = built(&north_pair_table());
        let visible = visible_from(&graph, GpsPosition::new(10.0, 2.0, LevelId(0)), 5.0);
        let mut list = DrawList::new();

        rebuild(
            &mut list,
            &graph,
            &visible,
            vec![obstacle(10.0, 14.0, 1, "north_crate"), obstacle(3.0, 3.0, 0, "home_crate")],
        );
        assert_eq!(payloads(&list), vec!["home_crate", "north_crate"]);
        assert_eq!(
            list.entries()[1].position,
            GpsPosition::new(10.0, -1.0, LevelId(0))
        );
        assert_eq!(list.entries()[1].depth_key, 9.0);
    }

    #[test]
    fn unprojectable_objects_are_absent() {
        // 0 links east to 1 but 1 has no way back, so nothing on 1 projects.
        let table = table_of(vec![
            level(0, 10, 10).with_jump_target(Direction::East, LevelId(1)),
            level(1, 10, 10),
        ]);
        let graph = built(&table);
        let visible = visible_from(&graph, GpsPosition::new(8.0, 5.0, LevelId(0)), 3.0);
        assert!(visible.level_is_visible(LevelId(1)));
        let mut list = DrawList::new();

        let stats = rebuild(
            &mut list,
            &graph,
            &visible,
            vec![
                obstacle(1.0, 1.0, 1, "stranded"),
                DrawCandidate::new(GpsPosition::INVALID, DrawKind::Effect, "lost"),
                obstacle(2.0, 2.0, 0, "kept"),
            ],
        );
        assert_eq!(payloads(&list), vec!["kept"]);
        assert_eq!(stats.unprojectable, 2);
        assert_eq!(stats.drawn, 1);
    }

    #[test]
    fn objects_on_hidden_levels_are_skipped() {
        let graph = built(&east_chain_table());
        let visible = visible_from(&graph, GpsPosition::new(5.0, 5.0, LevelId(0)), 3.0);
        let mut list = DrawList::new();
        let stats = rebuild(
            &mut list,
            &graph,
            &visible,
            vec![obstacle(1.0, 1.0, 1, "east"), obstacle(1.0, 1.0, 0, "home")],
        );
        assert_eq!(payloads(&list), vec!["home"]);
        assert_eq!(stats.hidden_level, 1);
    }

    #[test]
    fn view_bounds_cull_projected_positions() {
        let graph = built(&north_pair_table());
        let viewer = GpsPosition::new(10.0, 2.0, LevelId(0));
        let visible = visible_from(&graph, viewer, 5.0);
        let bounds = ViewBounds::around(viewer, 4.0);
        let mut list = DrawList::new();

        let stats = list
            .rebuild(
                &graph,
                &visible,
                LevelId(0),
                vec![
                    obstacle(10.0, 14.0, 1, "near_north"),
                    obstacle(10.0, 5.0, 1, "far_north"),
                    obstacle(19.0, 2.0, 0, "far_east"),
                ],
                Some(&bounds),
                InvalidLevelPolicy::Fatal,
            )
            .expect("rebuild");
        assert_eq!(payloads(&list), vec!["near_north"]);
        assert_eq!(stats.culled, 2);
    }

    #[test]
    fn local_entries_slot_in_after_equal_keys() {
        let graph = built(&north_pair_table());
        let visible = visible_from(&graph, GpsPosition::new(10.0, 10.0, LevelId(0)), 5.0);
        let mut list = DrawList::new();
        rebuild(
            &mut list,
            &graph,
            &visible,
            vec![
                obstacle(2.0, 3.0, 0, "five"),
                obstacle(1.0, 1.0, 0, "two"),
                obstacle(4.0, 4.0, 0, "eight"),
            ],
        );

        assert!(list.push_local(3.0, 2.0, DrawKind::Viewer, "viewer"));
        assert!(list.push_local(0.5, 0.5, DrawKind::MoveCursor, "cursor"));
        assert_eq!(payloads(&list), vec!["cursor", "two", "five", "viewer", "eight"]);
        assert_eq!(list.stats().drawn, 5);
    }

    #[test]
    fn push_local_needs_a_built_frame() {
        let mut list: DrawList<&str> = DrawList::new();
        assert!(!list.push_local(1.0, 1.0, DrawKind::Viewer, "viewer"));
        assert!(list.is_empty());
    }

    #[test]
    fn non_finite_keys_are_dropped() {
        let graph = built(&north_pair_table());
        let visible = visible_from(&graph, GpsPosition::new(10.0, 10.0, LevelId(0)), 5.0);
        let mut list = DrawList::new();
        let stats = rebuild(
            &mut list,
            &graph,
            &visible,
            vec![obstacle(f32::NAN, 1.0, 0, "nan"), obstacle(1.0, 1.0, 0, "ok")],
        );
        assert_eq!(payloads(&list), vec!["ok"]);
        assert_eq!(stats.non_finite, 1);
        assert!(!list.push_local(f32::INFINITY, 0.0, DrawKind::MoveCursor, "cursor"));
    }

    #[test]
    fn stale_graph_is_an_error_and_leaves_the_list_empty() {
        let table = north_pair_table();
        let mut graph = built(&table);
        let visible = visible_from(&graph, GpsPosition::new(10.0, 10.0, LevelId(0)), 5.0);
        let mut list = DrawList::new();
        rebuild(&mut list, &graph, &visible, vec![obstacle(1.0, 1.0, 0, "ok")]);
        assert_eq!(list.len(), 1);

        graph.invalidate();
        let result = list.rebuild(
            &graph,
            &visible,
            LevelId(0),
            vec![obstacle(1.0, 1.0, 0, "ok")],
            None,
            InvalidLevelPolicy::Fatal,
        );
        assert_eq!(result, Err(GpsError::TopologyStale));
        assert!(list.is_empty());
        assert_eq!(list.viewer_level(), None);
    }

    #[test]
    fn bad_viewer_level_follows_policy() {
        let graph = built(&north_pair_table());
        let visible = visible_from(&graph, GpsPosition::new(10.0, 10.0, LevelId(0)), 5.0);
        let mut list = DrawList::new();
        let candidates = || vec![obstacle(1.0, 1.0, 1, "north"), obstacle(1.0, 1.0, 0, "home")];

        assert!(matches!(
            list.rebuild(
                &graph,
                &visible,
                LevelId(42),
                candidates(),
                None,
                InvalidLevelPolicy::Fatal
            ),
            Err(GpsError::LevelOutOfRange { .. })
        ));
        assert!(list.is_empty());

        let stats = list
            .rebuild(
                &graph,
                &visible,
                LevelId(42),
                candidates(),
                None,
                InvalidLevelPolicy::Warn,
            )
            .expect("warn policy");
        assert_eq!(stats.drawn, 0);
        assert_eq!(stats.hidden_level, 1);
        assert_eq!(stats.unprojectable, 1);
    }

    #[test]
    fn candidate_with_out_of_range_level_follows_policy() {
        let graph = built(&north_pair_table());
        let visible = visible_from(&graph, GpsPosition::new(10.0, 10.0, LevelId(0)), 5.0);
        let mut list = DrawList::new();
        let candidates = || vec![obstacle(1.0, 1.0, 0, "home"), obstacle(1.0, 1.0, 500, "stray")];

        assert_eq!(
            list.rebuild(
                &graph,
                &visible,
                LevelId(0),
                candidates(),
                None,
                InvalidLevelPolicy::Fatal
            ),
            Err(GpsError::LevelOutOfRange {
                level: LevelId(500),
                max_levels: graph.max_levels(),
            })
        );
        assert!(list.is_empty());

        let stats = list
            .rebuild(
                &graph,
                &visible,
                LevelId(0),
                candidates(),
                None,
                InvalidLevelPolicy::Warn,
            )
            .expect("warn policy");
        assert_eq!(payloads(&list), vec!["home"]);
        assert_eq!(stats.hidden_level, 0);
        assert_eq!(stats.unprojectable, 1);
    }

    #[test]
    fn empty_table_still_builds_an_empty_list() {
        let graph = built(&LevelTable::with_capacity(TEST_MAX_LEVELS));
        let visible = VisibleLevelSet::new();
        let mut list: DrawList<&str> = DrawList::new();
        let stats = list
            .rebuild(
                &graph,
                &visible,
                LevelId(0),
                Vec::new(),
                None,
                InvalidLevelPolicy::Fatal,
            )
            .expect("rebuild");
        assert_eq!(stats, DrawStats::default());
    }
}
