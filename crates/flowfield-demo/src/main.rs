mod app;
mod base_mesh;
mod config;

use anyhow::{Context, Result};
use flowfield_engine::logging::{init_logging, LoggingConfig};
use flowfield_engine::window::Runtime;

use app::FlowFieldApp;
use config::DemoConfig;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = DemoConfig::default();
    let app = FlowFieldApp::new(&config).context("failed to set up the particle simulation")?;

    log::info!("keys: 1/2 influence, 3/4 strength, 5/6 frequency, space pause, R reset, esc quit");

    Runtime::run(config.runtime.clone(), config.gpu.clone(), app)
}
