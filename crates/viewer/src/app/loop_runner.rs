use std::process::ExitCode;

use levelgrid::{
    DrawCandidate, DrawKind, DrawList, GpsPosition, GridConfig, LevelId, ViewBounds, WorldError,
    WorldMap,
};
use tracing::{debug, error, info};

use super::bootstrap::AppWiring;
use super::scenario::{Scenario, Waypoint};

const VIEWER_MARKER: &str = "viewer";
const MOVE_CURSOR_MARKER: &str = "cursor";

pub(crate) fn run(app: AppWiring) -> ExitCode {
    match run_scenario(&app.scenario, app.config) {
        Ok(frames) => {
            let final_level = frames
                .last()
                .and_then(|frame| frame.viewer.level)
                .map(|level| level.0);
            info!(
                scenario = %app.source_label,
                frames = frames.len(),
                final_level = ?final_level,
                "scenario_finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(scenario = %app.source_label, error = %err, "scenario_failed");
            ExitCode::FAILURE
        }
    }
}

/// What one frame of the walk produced.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FrameSummary {
    pub(crate) viewer: GpsPosition,
    pub(crate) visible: Vec<LevelId>,
    pub(crate) nearby: Vec<LevelId>,
    pub(crate) created: Vec<LevelId>,
    pub(crate) evicted: Vec<LevelId>,
    pub(crate) animated_obstacles: usize,
    pub(crate) draw_order: Vec<String>,
}

pub(crate) fn run_scenario(
    scenario: &Scenario,
    config: GridConfig,
) -> Result<Vec<FrameSummary>, WorldError> {
    let mut world = WorldMap::from_descs(config, scenario.levels.iter().cloned())?;
    let mut draw_list = DrawList::new();
    let mut frames = Vec::with_capacity(scenario.walk.len());

    for (frame, waypoint) in scenario.walk.iter().enumerate() {
        let report = world.begin_frame(waypoint.position())?;
        let rebuilt = refresh_animated_caches(&mut world, scenario);
        let Some(viewer) = world.frame_viewer() else {
            continue;
        };

        let bounds = ViewBounds::around(viewer, scenario.view_radius);
        let candidates = scenario.objects.iter().map(|object| {
            DrawCandidate::new(object.position(), object.kind.draw_kind(), object.name.clone())
        });
        let stats = world.build_draw_list(candidates, Some(&bounds), &mut draw_list)?;
        draw_list.push_local(viewer.x, viewer.y, DrawKind::Viewer, VIEWER_MARKER.to_string());
        push_move_cursor(&world, waypoint, viewer, &mut draw_list)?;

        let visible = world.visible_levels();
        let summary = FrameSummary {
            viewer,
            visible: visible.visible().map(|entry| entry.level()).collect(),
            nearby: world.nearby_levels().map(|entry| entry.level()).collect(),
            created: report.created,
            evicted: report.evicted,
            animated_obstacles: visible
                .visible()
                .map(|entry| entry.animated_obstacles().len())
                .sum(),
            draw_order: draw_list.iter().map(|entry| entry.payload.clone()).collect(),
        };

        info!(
            frame,
            level = ?viewer.level.map(|level| level.0),
            x = viewer.x,
            y = viewer.y,
            visible = ?summary.visible,
            nearby = ?summary.nearby,
            created = ?summary.created,
            evicted = ?summary.evicted,
            caches_rebuilt = rebuilt,
            animated_obstacles = summary.animated_obstacles,
            drawn = draw_list.len(),
            hidden_level = stats.hidden_level,
            unprojectable = stats.unprojectable,
            culled = stats.culled,
            "frame_built"
        );
        debug!(frame, order = ?summary.draw_order, "frame_draw_order");
        frames.push(summary);
    }

    Ok(frames)
}

/// Rebuilds the animated-obstacle cache of every visible level that is
/// marked dirty. Returns how many were rebuilt.
fn refresh_animated_caches(world: &mut WorldMap, scenario: &Scenario) -> usize {
    let mut rebuilt = 0;
    for entry in world
        .visible_levels_mut()
        .iter_mut()
        .filter(|entry| entry.is_cache_dirty())
    {
        let level = entry.level();
        entry.rebuild_animated_cache(
            scenario
                .objects
                .iter()
                .enumerate()
                .filter(|(_, object)| object.level == level)
                .map(|(index, object)| (index, object.animated)),
        );
        rebuilt += 1;
    }
    rebuilt
}

/// The cursor is authored in the waypoint's level frame, which differs from
/// the viewer's once the viewer resolved onto a neighbor.
fn push_move_cursor(
    world: &WorldMap,
    waypoint: &Waypoint,
    viewer: GpsPosition,
    draw_list: &mut DrawList<String>,
) -> Result<(), WorldError> {
    let (Some(cursor), Some(viewer_level)) = (waypoint.cursor, viewer.level) else {
        return Ok(());
    };
    let local = world.project(
        GpsPosition::new(cursor.x, cursor.y, waypoint.level),
        viewer_level,
    )?;
    if local.is_valid() {
        draw_list.push_local(
            local.x,
            local.y,
            DrawKind::MoveCursor,
            MOVE_CURSOR_MARKER.to_string(),
        );
    } else {
        debug!(
            level = waypoint.level.0,
            viewer_level = viewer_level.0,
            "move_cursor_not_projectable"
        );
    }
    Ok(())
}
