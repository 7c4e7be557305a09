use levelgrid::GridConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::scenario::{Scenario, ScenarioResult, ScenarioSource};

pub(crate) struct AppWiring {
    pub(crate) config: GridConfig,
    pub(crate) scenario: Scenario,
    pub(crate) source_label: String,
}

pub(crate) fn build_app(cli_arg: Option<String>) -> ScenarioResult<AppWiring> {
    init_tracing();
    info!("=== levelgrid viewer startup ===");

    let source = ScenarioSource::resolve(cli_arg);
    let source_label = source.label();
    let scenario = source.load()?;
    let config = scenario.config.clone().with_env_overrides();
    info!(
        scenario = %source_label,
        levels = scenario.levels.len(),
        waypoints = scenario.walk.len(),
        objects = scenario.objects.len(),
        visibility_margin = config.visibility_margin,
        "scenario_loaded"
    );

    Ok(AppWiring {
        config,
        scenario,
        source_label,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
