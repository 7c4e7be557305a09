use std::collections::HashSet;
use std::env;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use levelgrid::{AnimatedObstacleKind, DrawKind, GridConfig, GpsPosition, LevelDesc, LevelId};
use serde::Deserialize;
use tracing::warn;

pub(crate) const SCENARIO_ENV_VAR: &str = "LEVELGRID_SCENARIO";
pub(crate) const DEFAULT_VIEW_RADIUS: f32 = 12.0;

const BUILTIN_SCENARIO_NAME: &str = "builtin:junction";
const BUILTIN_SCENARIO_JSON: &str = include_str!("../../scenarios/junction.json");

pub(crate) type ScenarioResult<T> = Result<T, String>;

/// Levels plus a scripted viewer walk, one waypoint per frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    #[serde(default)]
    pub(crate) config: GridConfig,
    pub(crate) levels: Vec<LevelDesc>,
    pub(crate) walk: Vec<Waypoint>,
    #[serde(default)]
    pub(crate) objects: Vec<PlacedObject>,
    #[serde(default = "default_view_radius")]
    pub(crate) view_radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Waypoint {
    pub(crate) level: LevelId,
    pub(crate) x: f32,
    pub(crate) y: f32,
    #[serde(default)]
    pub(crate) cursor: Option<CursorPosition>,
}

impl Waypoint {
    pub(crate) fn position(&self) -> GpsPosition {
        GpsPosition::new(self.x, self.y, self.level)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CursorPosition {
    pub(crate) x: f32,
    pub(crate) y: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PlacedObject {
    pub(crate) name: String,
    pub(crate) kind: ObjectKind,
    pub(crate) level: LevelId,
    pub(crate) x: f32,
    pub(crate) y: f32,
    #[serde(default)]
    pub(crate) animated: Option<AnimatedObstacleKind>,
}

impl PlacedObject {
    pub(crate) fn position(&self) -> GpsPosition {
        GpsPosition::new(self.x, self.y, self.level)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ObjectKind {
    Obstacle,
    Actor,
    Projectile,
    Effect,
    GroundItem,
}

impl ObjectKind {
    pub(crate) fn draw_kind(self) -> DrawKind {
        match self {
            ObjectKind::Obstacle => DrawKind::Obstacle,
            ObjectKind::Actor => DrawKind::Actor,
            ObjectKind::Projectile => DrawKind::Projectile,
            ObjectKind::Effect => DrawKind::Effect,
            ObjectKind::GroundItem => DrawKind::GroundItem,
        }
    }
}

fn default_view_radius() -> f32 {
    DEFAULT_VIEW_RADIUS
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ScenarioSource {
    File(PathBuf),
    Builtin,
}

impl ScenarioSource {
    /// First CLI argument, then the env var, then the bundled scenario.
    pub(crate) fn resolve(cli_arg: Option<String>) -> Self {
        if let Some(path) = cli_arg.filter(|arg| !arg.trim().is_empty()) {
            return ScenarioSource::File(PathBuf::from(path));
        }
        match env::var(SCENARIO_ENV_VAR) {
            Ok(value) if !value.trim().is_empty() => ScenarioSource::File(PathBuf::from(value)),
            Ok(_) | Err(env::VarError::NotPresent) => ScenarioSource::Builtin,
            Err(err) => {
                warn!(
                    env_var = SCENARIO_ENV_VAR,
                    error = %err,
                    "unable to read scenario env var; using builtin scenario"
                );
                ScenarioSource::Builtin
            }
        }
    }

    pub(crate) fn label(&self) -> String {
        match self {
            ScenarioSource::File(path) => path.display().to_string(),
            ScenarioSource::Builtin => BUILTIN_SCENARIO_NAME.to_string(),
        }
    }

    pub(crate) fn load(&self) -> ScenarioResult<Scenario> {
        match self {
            ScenarioSource::File(path) => load_scenario_file(path),
            ScenarioSource::Builtin => parse_and_validate(BUILTIN_SCENARIO_JSON),
        }
    }
}

pub(crate) fn load_scenario_file(path: &Path) -> ScenarioResult<Scenario> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("read scenario '{}': {error}", path.display()))?;
    parse_and_validate(&raw)
}

fn parse_and_validate(raw: &str) -> ScenarioResult<Scenario> {
    let scenario = parse_scenario_json(raw)?;
    validate_scenario(&scenario)?;
    Ok(scenario)
}

fn parse_scenario_json(raw: &str) -> ScenarioResult<Scenario> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, Scenario>(&mut deserializer) {
        Ok(scenario) => Ok(scenario),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(format!("parse scenario json: {source}"))
            } else {
                Err(format!("parse scenario json at {path}: {source}"))
            }
        }
    }
}

fn validation_err(path: &str, message: impl Into<String>) -> String {
    format!("validation failed at {path}: {}", message.into())
}

fn expected_actual(path: &str, expected: impl Display, actual: impl Display) -> String {
    validation_err(path, format!("expected {expected}, got {actual}"))
}

fn require_finite(path: &str, value: f32) -> ScenarioResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(expected_actual(path, "finite number", value))
    }
}

fn validate_scenario(scenario: &Scenario) -> ScenarioResult<()> {
    if scenario.levels.is_empty() {
        return Err(validation_err("levels", "at least one level is required"));
    }
    if scenario.walk.is_empty() {
        return Err(validation_err("walk", "at least one waypoint is required"));
    }
    require_finite("view_radius", scenario.view_radius)?;

    let mut known_levels = HashSet::with_capacity(scenario.levels.len());
    for (index, level) in scenario.levels.iter().enumerate() {
        if level.id.index() >= scenario.config.max_levels {
            return Err(expected_actual(
                &format!("levels[{index}].id"),
                format!("id below max_levels {}", scenario.config.max_levels),
                level.id,
            ));
        }
        if !known_levels.insert(level.id) {
            return Err(validation_err(
                &format!("levels[{index}].id"),
                format!("duplicate level id {}", level.id),
            ));
        }
    }

    for (index, waypoint) in scenario.walk.iter().enumerate() {
        require_finite(&format!("walk[{index}].x"), waypoint.x)?;
        require_finite(&format!("walk[{index}].y"), waypoint.y)?;
        if !known_levels.contains(&waypoint.level) {
            return Err(validation_err(
                &format!("walk[{index}].level"),
                format!("unknown level {}", waypoint.level),
            ));
        }
        if let Some(cursor) = waypoint.cursor {
            require_finite(&format!("walk[{index}].cursor.x"), cursor.x)?;
            require_finite(&format!("walk[{index}].cursor.y"), cursor.y)?;
        }
    }

    for (index, object) in scenario.objects.iter().enumerate() {
        require_finite(&format!("objects[{index}].x"), object.x)?;
        require_finite(&format!("objects[{index}].y"), object.y)?;
        if !known_levels.contains(&object.level) {
            return Err(validation_err(
                &format!("objects[{index}].level"),
                format!("unknown level {}", object.level),
            ));
        }
    }
    Ok(())
}
