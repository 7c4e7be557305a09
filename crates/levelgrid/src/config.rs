use std::env;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const VISIBILITY_MARGIN_ENV_VAR: &str = "LEVELGRID_VISIBILITY_MARGIN";

pub const DEFAULT_MAX_LEVELS: usize = 100;
pub const DEFAULT_VISIBILITY_MARGIN: f32 = 5.0;
pub const DEFAULT_NEARBY_DISTANCE: f32 = 2.0;

/// What to do when a caller hands a level id outside the valid range to a
/// matrix lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidLevelPolicy {
    /// Propagate the error to the host.
    #[default]
    Fatal,
    /// Log it and continue with the invalid sentinel.
    Warn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub max_levels: usize,
    pub visibility_margin: f32,
    pub nearby_distance: f32,
    pub invalid_level_policy: InvalidLevelPolicy,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            max_levels: DEFAULT_MAX_LEVELS,
            visibility_margin: DEFAULT_VISIBILITY_MARGIN,
            nearby_distance: DEFAULT_NEARBY_DISTANCE,
            invalid_level_policy: InvalidLevelPolicy::Fatal,
        }
    }
}

impl GridConfig {
    pub fn with_env_overrides(mut self) -> Self {
        self.visibility_margin = resolve_visibility_margin(self.visibility_margin);
        self
    }

    pub fn effective_visibility_margin(&self) -> f32 {
        sanitize_margin(self.visibility_margin, DEFAULT_VISIBILITY_MARGIN)
    }

    pub fn effective_nearby_distance(&self) -> f32 {
        sanitize_margin(self.nearby_distance, DEFAULT_NEARBY_DISTANCE)
    }
}

fn sanitize_margin(value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        fallback
    }
}

fn resolve_visibility_margin(config_margin: f32) -> f32 {
    match env::var(VISIBILITY_MARGIN_ENV_VAR) {
        Ok(value) => match value.trim().parse::<f32>() {
            Ok(margin) if margin.is_finite() && margin >= 0.0 => margin,
            _ => {
                warn!(
                    env_var = VISIBILITY_MARGIN_ENV_VAR,
                    value = value.as_str(),
                    "invalid visibility margin env var value; falling back to config"
                );
                config_margin
            }
        },
        Err(env::VarError::NotPresent) => config_margin,
        Err(err) => {
            warn!(
                env_var = VISIBILITY_MARGIN_ENV_VAR,
                error = %err,
                "unable to read visibility margin env var; falling back to config"
            );
            config_margin
        }
    }
}
