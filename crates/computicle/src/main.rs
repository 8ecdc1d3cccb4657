mod app;

use anyhow::Context;
use winit::dpi::LogicalSize;

use computicle_engine::config::SimConfig;
use computicle_engine::device::GpuInit;
use computicle_engine::logging::{init_logging, LoggingConfig};
use computicle_engine::window::{Runtime, RuntimeConfig};

use app::TrailApp;

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let config = SimConfig::default();
    config.validate().context("invalid simulation constants")?;

    log::info!(
        "computicle: {} particles, field `{}`",
        config.particle_count,
        config.field.name
    );

    Runtime::run(
        RuntimeConfig {
            title: "computicle".to_string(),
            initial_size: LogicalSize::new(800.0, 600.0),
        },
        GpuInit::default(),
        TrailApp::new(config),
    )
}
